use freightdoc_core::FreightConfig;

/// Shared application state accessible from all handlers.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub config: FreightConfig,
}
