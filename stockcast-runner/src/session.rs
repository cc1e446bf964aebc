//! Dashboard session: runs one forecast request end to end.
//!
//! A session owns the data loader (and with it the session cache) and a
//! forecast requestor. Each call to [`DashboardSession::run`] drives the
//! stages in order, load, prepare, forecast, then optional diagnostics, and
//! stops at the first failure. Nothing from a failed request is returned.

use crate::config::{ConfigError, DashboardConfig, ProviderConfig, ProviderKind};
use crate::report::{CrossValidationReport, DashboardReport, ReportCharts, SCHEMA_VERSION};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use stockcast_core::data::{
    AllowedTickers, CacheStats, CircuitBreaker, CsvProvider, DataLoader, DataProvider,
    SyntheticProvider, YahooProvider,
};
use stockcast_core::domain::ForecastRequest;
use stockcast_core::forecast::{
    cross_validate, performance_metrics, AdditiveEngine, ForecastEngine, ForecastRequestor,
    DEFAULT_ROLLING_WINDOW, MIN_TRAINING_POINTS,
};
use stockcast_core::prepare::prepare;
use stockcast_core::presentation::{
    changepoint_chart, components_chart, cv_metric_chart, forecast_chart, forecast_tail,
    metrics_head, price_tail, raw_price_chart,
};
use stockcast_core::{ErrorKind, PipelineError};
use thiserror::Error;

/// Pipeline stage a request failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Load,
    Prepare,
    Forecast,
    Diagnostics,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::Prepare => "prepare",
            Stage::Forecast => "forecast",
            Stage::Diagnostics => "diagnostics",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: PipelineError,
    },

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl RunError {
    fn at(stage: Stage) -> impl FnOnce(PipelineError) -> RunError {
        move |source| RunError::Stage { stage, source }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            RunError::Stage { stage, .. } => Some(*stage),
            RunError::Config(_) => None,
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            RunError::Stage { source, .. } => Some(source.kind()),
            RunError::Config(_) => None,
        }
    }
}

/// Construct the data provider named by the config.
pub fn build_provider(config: &ProviderConfig) -> Result<Box<dyn DataProvider>, ConfigError> {
    let provider: Box<dyn DataProvider> = match config.kind {
        ProviderKind::Yahoo => {
            let breaker = Arc::new(CircuitBreaker::new(
                Duration::from_secs(config.breaker_cooldown_secs),
                3,
            ));
            let yahoo = YahooProvider::new(config.yahoo.clone(), breaker)
                .map_err(|e| ConfigError::Invalid(format!("yahoo provider: {e}")))?;
            Box::new(yahoo)
        }
        ProviderKind::Csv => Box::new(CsvProvider::new(config.csv_dir.clone())),
        ProviderKind::Synthetic => Box::new(SyntheticProvider::default()),
    };
    if !provider.is_available() {
        tracing::warn!(provider = provider.name(), "data provider reports unavailable");
    }
    Ok(provider)
}

pub struct DashboardSession<E: ForecastEngine = AdditiveEngine> {
    config: DashboardConfig,
    loader: DataLoader,
    requestor: ForecastRequestor<E>,
}

impl DashboardSession<AdditiveEngine> {
    /// Session with the configured provider and the additive engine.
    pub fn from_config(config: DashboardConfig) -> Result<Self, RunError> {
        config.validate()?;
        let provider = build_provider(&config.provider)?;
        let engine = AdditiveEngine::new(config.model.clone())
            .map_err(|e| ConfigError::Invalid(format!("model: {e}")))?;
        Self::new(config, provider, engine)
    }
}

impl<E: ForecastEngine> DashboardSession<E> {
    pub fn new(
        config: DashboardConfig,
        provider: Box<dyn DataProvider>,
        engine: E,
    ) -> Result<Self, RunError> {
        config.validate()?;
        let loader = DataLoader::new(provider, config.allowed_tickers(), config.fill_policy());
        Ok(Self {
            loader,
            requestor: ForecastRequestor::new(engine)
                .with_changepoint_threshold(config.display.changepoint_threshold),
            config,
        })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn allowed_tickers(&self) -> &AllowedTickers {
        self.loader.tickers()
    }

    pub fn loader(&self) -> &DataLoader {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut DataLoader {
        &mut self.loader
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.loader.cache().stats()
    }

    /// Drop every cached series.
    pub fn clear_cache(&mut self) {
        let dropped = self.loader.cache().len();
        self.loader.cache_mut().clear();
        tracing::info!(dropped, "session cache cleared");
    }

    /// Run one forecast request through every stage.
    pub fn run(&mut self, request: &ForecastRequest) -> Result<DashboardReport, RunError> {
        let start = self.config.data.start_date;
        let end = self.config.data.resolved_end();
        let display = self.config.display.clone();
        let horizon_days = request.horizon_days();

        let series = self
            .loader
            .load(&request.ticker, start, end)
            .map_err(RunError::at(Stage::Load))?;
        let ticker = series.ticker.clone();

        let training = prepare(&series);
        if training.is_empty() {
            return Err(RunError::at(Stage::Prepare)(PipelineError::InsufficientData {
                available: 0,
                required: MIN_TRAINING_POINTS,
            }));
        }

        let outcome = self
            .requestor
            .forecast(&training, horizon_days)
            .map_err(RunError::at(Stage::Forecast))?;

        let mut charts = ReportCharts {
            raw: raw_price_chart(&series),
            forecast: forecast_chart(&ticker, &training, &outcome.points),
            components: None,
            changepoints: None,
            cross_validation: None,
        };
        if display.show_components {
            let components = outcome.components().map_err(RunError::at(Stage::Forecast))?;
            charts.components = Some(components_chart(&ticker, &components));
        }
        let changepoints = if display.show_changepoints {
            let cps = outcome.changepoints();
            charts.changepoints = Some(changepoint_chart(
                &ticker,
                &training,
                &outcome.points,
                &cps,
            ));
            cps
        } else {
            Vec::new()
        };

        let cross_validation = if display.run_cross_validation {
            let cv_config = self.config.cross_validation.clone();
            let cv = cross_validate(self.requestor.engine(), &training, &cv_config)
                .map_err(RunError::at(Stage::Diagnostics))?;
            let metrics = performance_metrics(&cv.rows, DEFAULT_ROLLING_WINDOW);
            charts.cross_validation = Some(cv_metric_chart(&ticker, &cv.rows, &metrics));
            tracing::info!(
                ticker = %ticker,
                folds = cv.cutoffs.len(),
                rows = cv.rows.len(),
                "cross-validation complete"
            );
            Some(CrossValidationReport {
                metrics_head: metrics_head(&ticker, &metrics, display.tail_rows),
                config: cv_config,
                cutoffs: cv.cutoffs,
                metrics,
            })
        } else {
            None
        };

        tracing::info!(
            ticker = %ticker,
            horizon_years = request.horizon_years,
            points = outcome.points.len(),
            "forecast request complete"
        );

        Ok(DashboardReport {
            schema_version: SCHEMA_VERSION,
            ticker: ticker.clone(),
            horizon_years: request.horizon_years,
            horizon_days,
            start_date: series.start,
            end_date: series.end,
            source: series.source,
            provider: self.loader.provider_name().to_string(),
            dataset_hash: series.dataset_hash(),
            record_count: series.len(),
            training_points: training.len(),
            missing_after_fill: series.missing_counts(),
            raw_tail: price_tail(&series, display.tail_rows),
            forecast_tail: forecast_tail(&ticker, &outcome.points, display.tail_rows),
            forecast: outcome.points,
            changepoints,
            charts,
            cross_validation,
            cache: self.loader.cache().stats(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_are_lowercase() {
        assert_eq!(Stage::Load.to_string(), "load");
        assert_eq!(Stage::Diagnostics.to_string(), "diagnostics");
    }

    #[test]
    fn run_error_names_stage() {
        let err = RunError::at(Stage::Forecast)(PipelineError::FitFailed("singular".into()));
        assert_eq!(err.stage(), Some(Stage::Forecast));
        assert_eq!(err.kind(), Some(ErrorKind::FitFailed));
        assert!(err.to_string().starts_with("forecast stage failed"));
    }

    #[test]
    fn builds_each_offline_provider() {
        let mut cfg = ProviderConfig {
            kind: ProviderKind::Synthetic,
            ..ProviderConfig::default()
        };
        assert_eq!(build_provider(&cfg).unwrap().name(), "synthetic");
        cfg.kind = ProviderKind::Csv;
        assert_eq!(build_provider(&cfg).unwrap().name(), "csv_import");
    }
}
