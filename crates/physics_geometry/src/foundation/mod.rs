//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Math types and transform composition
//! - Time budgets for the per-tick scheduler and shutdown timing
//! - Logging utilities

pub mod math;
pub mod time;
pub mod logging;
