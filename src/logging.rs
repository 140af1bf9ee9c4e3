use tracing::Level;
use tracing_subscriber::EnvFilter;

/// How the CLI wants log output formatted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogConfig {
    pub verbose: bool,
    pub json: bool,
}

impl LogConfig {
    /// Level used when `RUST_LOG` is not set.
    pub fn default_level(&self) -> Level {
        if self.verbose { Level::DEBUG } else { Level::INFO }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.default_level().as_str()))
    }
}

/// Installs the global subscriber. Returns false when one is already set.
pub fn init(config: LogConfig) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.filter())
        .with_target(false);
    if config.json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    }
}
