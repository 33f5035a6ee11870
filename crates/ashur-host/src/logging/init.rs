use std::sync::Once;

/// Default filter: host crates at info, GPU stack internals quieted to
/// warnings (wgpu validation chatter drowns out asset diagnostics otherwise).
const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g.
/// "ashur_host=debug"). `write_style` controls ANSI coloring.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once; later calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = resolve_filter(config.env_filter, std::env::var("RUST_LOG").ok());

        let mut builder = env_logger::Builder::new();
        builder.parse_filters(&filter);
        builder.write_style(config.write_style);
        builder.init();

        log::debug!("logging initialized (filter: {filter})");
    });
}

/// Precedence: explicit filter, then `RUST_LOG`, then the host default.
fn resolve_filter(explicit: Option<String>, env: Option<String>) -> String {
    explicit
        .or(env)
        .unwrap_or_else(|| DEFAULT_FILTER.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_filter_wins_over_environment() {
        let filter = resolve_filter(Some("debug".to_owned()), Some("trace".to_owned()));
        assert_eq!(filter, "debug");
    }

    #[test]
    fn environment_filter_used_when_no_explicit_one() {
        let filter = resolve_filter(None, Some("trace".to_owned()));
        assert_eq!(filter, "trace");
    }

    #[test]
    fn default_filter_quiets_gpu_internals() {
        let filter = resolve_filter(None, None);
        assert!(filter.starts_with("info"));
        assert!(filter.contains("wgpu_core=warn"));
        assert!(filter.contains("naga=warn"));
    }
}
