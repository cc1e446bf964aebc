//! StockCast Runner: dashboard sessions, configuration, report export.
//!
//! This crate builds on `stockcast-core` to provide:
//! - TOML configuration with defaults for every section
//! - Provider construction from config (Yahoo, CSV, synthetic)
//! - A session that runs load, prepare, forecast and diagnostics per request
//! - Report bundles in JSON, CSV and Markdown

pub mod config;
pub mod export;
pub mod report;
pub mod session;

pub use config::{
    ConfigError, DashboardConfig, DataConfig, DisplayConfig, ProviderConfig, ProviderKind,
};
pub use export::{
    export_charts_json, export_forecast_csv, export_json, export_metrics_csv, generate_markdown,
    import_json, load_report, save_report,
};
pub use report::{CrossValidationReport, DashboardReport, ReportCharts, SCHEMA_VERSION};
pub use session::{build_provider, DashboardSession, RunError, Stage};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn report_is_send_sync() {
        assert_send::<DashboardReport>();
        assert_sync::<DashboardReport>();
    }

    #[test]
    fn session_is_send() {
        assert_send::<DashboardSession>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
