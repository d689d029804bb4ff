//! Recursive descent through shape hierarchies
//!
//! Unions fan out, transformed wrappers compose, everything else is a leaf
//! handed to the [`MeshDataHandleFactory`].
//!
//! # Shape-instance indices
//!
//! - root cluster with exactly one available instance: every child gets 0
//! - any other root union: children get their ordinal (0, 1, 2, ...)
//! - non-root union: children inherit the parent's index, nested clusters
//!   included
//! - transformed wrapper: the index passes through unchanged

use super::handle::{ExtractedGeometryDataHandle, MeshDataHandleFactory};
use crate::foundation::math::Transform;
use crate::shapes::{ImplicitObject, ImplicitRef};
use std::sync::Arc;

/// Walks one recording root
pub struct HierarchyWalker<'w, 'a> {
    factory: &'w mut MeshDataHandleFactory<'a>,
    root: ImplicitRef,
    lod_count: usize,
    available_shape_instance_count: usize,
}

impl<'w, 'a> HierarchyWalker<'w, 'a> {
    /// Create a walker for `root`
    pub fn new(
        factory: &'w mut MeshDataHandleFactory<'a>,
        root: ImplicitRef,
        lod_count: usize,
        available_shape_instance_count: usize,
    ) -> Self {
        Self {
            factory,
            root,
            lod_count,
            available_shape_instance_count,
        }
    }

    /// Walk `leaf`, appending one handle per extractable leaf shape to `out`
    pub fn walk(
        &mut self,
        leaf: &ImplicitRef,
        out: &mut Vec<ExtractedGeometryDataHandle>,
        transform: &Transform,
        shape_instance_index: usize,
    ) {
        match leaf.as_ref() {
            ImplicitObject::Union(children) | ImplicitObject::UnionClustered(children) => {
                let is_root = Arc::ptr_eq(&self.root, leaf);
                let shared_slot = is_root && leaf.is_cluster() && self.available_shape_instance_count == 1;

                for (ordinal, child) in children.iter().enumerate() {
                    let index = match (is_root, shared_slot) {
                        (true, true) => 0,
                        (true, false) => ordinal,
                        (false, _) => shape_instance_index,
                    };
                    self.walk(child, out, transform, index);
                }
            }
            ImplicitObject::Transformed {
                transform: local,
                object,
            } => {
                let composed = transform.combine(local);
                self.walk(object, out, &composed, shape_instance_index);
            }
            _ => {
                if let Some(mut handle) =
                    self.factory
                        .extract_geometry_data_for_implicit(leaf, transform, self.lod_count)
                {
                    handle.set_root_shape(self.root.clone());
                    handle.set_shape_instance_index(shape_instance_index);
                    out.push(handle);
                }
            }
        }
    }
}
