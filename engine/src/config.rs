//! Controller configuration and host-supplied resources.

use std::sync::Arc;
use std::time::Duration;

use crate::options::{EngineOption, HASH, THREADS};
use crate::platform::{Platform, PlatformPolicy};
use crate::variant::Variant;

/// Resources the host reports; the adapter never probes the machine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostResources {
    pub cpu_cores: usize,
    /// Upper bound for the engine hash table, in MB.
    pub max_memory_mb: u32,
}

impl Default for HostResources {
    fn default() -> Self {
        Self {
            cpu_cores: 1,
            max_memory_mb: 16,
        }
    }
}

impl HostResources {
    pub fn threads(&self) -> u32 {
        threads_for_cores(self.cpu_cores)
    }

    pub fn threads_option(&self) -> EngineOption {
        EngineOption::new(THREADS, self.threads())
    }

    pub fn hash_option(&self) -> EngineOption {
        EngineOption::new(HASH, self.max_memory_mb)
    }
}

/// Leave one core to the host when there are more than two.
pub fn threads_for_cores(cores: usize) -> u32 {
    if cores > 2 {
        u32::try_from(cores - 1).unwrap_or(u32::MAX)
    } else {
        1
    }
}

/// Everything a [`GameController`](crate::GameController) needs besides its
/// transport and host.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub variant: Variant,
    pub platform: Arc<dyn PlatformPolicy>,
    pub resources: HostResources,
    /// Deadline for each `uciok` / `readyok` wait. `None` waits forever.
    pub handshake_timeout: Option<Duration>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            variant: Variant::default(),
            platform: Arc::new(Platform::default()),
            resources: HostResources::default(),
            handshake_timeout: None,
        }
    }
}

impl ControllerConfig {
    pub fn new(variant: Variant, platform: impl PlatformPolicy + 'static) -> Self {
        Self {
            variant,
            platform: Arc::new(platform),
            ..Default::default()
        }
    }

    pub fn with_resources(mut self, resources: HostResources) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threads_for_cores() {
        assert_eq!(threads_for_cores(0), 1);
        assert_eq!(threads_for_cores(1), 1);
        assert_eq!(threads_for_cores(2), 1);
        assert_eq!(threads_for_cores(3), 2);
        assert_eq!(threads_for_cores(8), 7);
    }

    #[test]
    fn test_resource_options() {
        let resources = HostResources {
            cpu_cores: 4,
            max_memory_mb: 256,
        };
        assert_eq!(
            resources.threads_option().command(),
            "setoption name Threads value 3"
        );
        assert_eq!(
            resources.hash_option().command(),
            "setoption name Hash value 256"
        );
    }

    #[test]
    fn test_default_config_waits_forever() {
        let config = ControllerConfig::default();
        assert_eq!(config.variant, Variant::Standard);
        assert!(config.handshake_timeout.is_none());
    }
}
