//! # Configuration System
//!
//! Settings consumed by the geometry pipeline, and the file loading shared by
//! every configuration type.
//!
//! The host owns the settings. Hot reload happens by building a new
//! [`GeometrySettings`] snapshot and handing it to
//! [`GeometryBuilder::apply_settings`](crate::builder::GeometryBuilder::apply_settings);
//! nothing in the crate mutates a global.
//!
//! ## Supported formats
//!
//! - **TOML** (`.toml`)
//! - **RON** (`.ron`)

pub use serde::{Deserialize, Serialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;

        // Try different formats
        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Upper bound for the per-tick scheduler budget, in seconds
pub const MAX_TICK_BUDGET_SECONDS: f32 = 0.25;

/// Default number of pooled components kept ready per pool
pub const DEFAULT_POOL_FLOOR_SIZE: usize = 250;

/// # Geometry Settings
///
/// Toggles and budgets for shape extraction, mesh generation and component
/// pooling. Missing fields in a settings file fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometrySettings {
    /// Build meshes through the topology-checked path that repairs
    /// non-manifold triangles. When false, the generator output is copied into
    /// LOD 0 as-is and no further LODs are produced.
    pub use_custom_mesh_generator: bool,

    /// Skip the UV channel of generated meshes
    pub disable_uvs: bool,

    /// Wall-clock budget for one scheduler tick, shared by all three queues
    pub generation_task_launch_budget_seconds: f32,

    /// Share one pre-built mesh between every box and every sphere, sizing
    /// each instance through its transform scale
    pub deduplicate_simple_geometry: bool,

    /// Recycle render components through the object pools
    pub use_pool: bool,

    /// Pools below this size are topped up by a background task
    pub pool_floor_size: usize,

    /// Worker threads for mesh generation (0 = one per logical core)
    pub worker_threads: usize,

    /// Bound on the shutdown wait for in-flight generation tasks
    pub shutdown_timeout_seconds: f32,

    /// Level-of-detail count requested when the caller does not specify one
    pub default_lod_count: usize,
}

impl Default for GeometrySettings {
    fn default() -> Self {
        Self {
            use_custom_mesh_generator: true,
            disable_uvs: false,
            generation_task_launch_budget_seconds: 0.002,
            deduplicate_simple_geometry: true,
            use_pool: true,
            pool_floor_size: DEFAULT_POOL_FLOOR_SIZE,
            worker_threads: 0,
            shutdown_timeout_seconds: 10.0,
            default_lod_count: 1,
        }
    }
}

impl Config for GeometrySettings {}

impl GeometrySettings {
    /// Set the per-tick scheduler budget
    pub fn with_tick_budget(mut self, seconds: f32) -> Self {
        self.generation_task_launch_budget_seconds = seconds;
        self
    }

    /// Enable or disable simple geometry deduplication
    pub fn with_deduplication(mut self, enabled: bool) -> Self {
        self.deduplicate_simple_geometry = enabled;
        self
    }

    /// Enable or disable component pooling
    pub fn with_pool(mut self, enabled: bool) -> Self {
        self.use_pool = enabled;
        self
    }

    /// Set the pool floor size
    pub fn with_pool_floor_size(mut self, floor: usize) -> Self {
        self.pool_floor_size = floor;
        self
    }

    /// Set the number of generation worker threads
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    /// Clamp out-of-range values, logging every adjustment
    pub fn validated(mut self) -> Self {
        let budget = self.generation_task_launch_budget_seconds;
        if !budget.is_finite() || budget < 0.0 {
            log::warn!("Invalid tick budget {budget}, using 0");
            self.generation_task_launch_budget_seconds = 0.0;
        } else if budget > MAX_TICK_BUDGET_SECONDS {
            log::warn!("Tick budget {budget}s exceeds {MAX_TICK_BUDGET_SECONDS}s, clamping");
            self.generation_task_launch_budget_seconds = MAX_TICK_BUDGET_SECONDS;
        }

        let timeout = self.shutdown_timeout_seconds;
        if !timeout.is_finite() || timeout < 0.0 {
            log::warn!("Invalid shutdown timeout {timeout}, using 10s");
            self.shutdown_timeout_seconds = 10.0;
        }

        if self.default_lod_count == 0 {
            self.default_lod_count = 1;
        }

        self
    }
}
