/// Options for the global tracing subscriber.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub environment: String,
    pub json_format: bool,
    /// Directive used when `RUST_LOG` is unset.
    pub default_filter: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            environment: "local".to_string(),
            json_format: false,
            default_filter: "info,callbatch=debug,tower_http=debug".to_string(),
        }
    }
}
