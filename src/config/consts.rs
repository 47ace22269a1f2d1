/// Default number of live instances a context can hold
pub const DEFAULT_MAX_INSTANCES: usize = 64;
/// Default number of dispatches remembered per instance
pub const DEFAULT_HISTORY_DEPTH: usize = 10;
/// Maximum configurable history depth
pub const MAX_HISTORY_DEPTH: usize = 1024;
/// Default tracing filter when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "info";
/// Configuration file the binary loads when none is given
pub const DEFAULT_CONFIG_PATH: &str = "configs/demo.yaml";
