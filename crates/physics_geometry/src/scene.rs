//! Owning-scene callbacks
//!
//! The builder keeps only a `Weak` reference to its scene. A scene that has
//! been dropped simply stops receiving notifications.

use crate::components::MaterialKind;
use crate::shapes::GeometryKey;

/// Events the geometry pipeline reports to the scene that owns it
pub trait GeometrySceneEvents: Send + Sync {
    /// A mesh for `key` was applied to a component
    fn on_geometry_loaded(&self, key: GeometryKey);

    /// Returns true once the scene can hand out `material`
    fn is_material_ready(&self, _material: MaterialKind) -> bool {
        true
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Scene double that records loaded keys and gates material readiness
    #[derive(Default)]
    pub(crate) struct RecordingScene {
        pub(crate) loaded: Mutex<Vec<GeometryKey>>,
        pub(crate) materials_blocked: AtomicBool,
    }

    impl RecordingScene {
        pub(crate) fn loaded_keys(&self) -> Vec<GeometryKey> {
            self.loaded.lock().clone()
        }

        pub(crate) fn block_materials(&self, blocked: bool) {
            self.materials_blocked.store(blocked, Ordering::Release);
        }
    }

    impl GeometrySceneEvents for RecordingScene {
        fn on_geometry_loaded(&self, key: GeometryKey) {
            self.loaded.lock().push(key);
        }

        fn is_material_ready(&self, _material: MaterialKind) -> bool {
            !self.materials_blocked.load(Ordering::Acquire)
        }
    }
}
