//! 运行时配置
//! Runtime tuning
//!
//! Cluster membership comes from [`crate::topology`]; this covers the
//! per-process knobs of the execution engine.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tessera_kernel::config::{ConfigError, ConfigResult, load_config};

/// Default upper bound on handler invocations running at once.
pub const DEFAULT_MAX_CONCURRENT_HANDLERS: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Shared bound across every agent of the node. Each agent still runs
    /// at most one handler at a time.
    pub max_concurrent_handlers: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_concurrent_handlers: DEFAULT_MAX_CONCURRENT_HANDLERS,
        }
    }
}

impl RuntimeConfig {
    pub fn with_max_concurrent_handlers(mut self, limit: usize) -> Self {
        self.max_concurrent_handlers = limit;
        self
    }

    /// 从文件加载
    /// Loads the `runtime` section of a configuration file. Missing keys
    /// fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        #[derive(Deserialize)]
        struct Wrapper {
            #[serde(default)]
            runtime: RuntimeConfig,
        }

        let config = load_config::<Wrapper>(path)?.runtime;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_concurrent_handlers == 0 {
            return Err(ConfigError::Parse(
                "runtime.max_concurrent_handlers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
