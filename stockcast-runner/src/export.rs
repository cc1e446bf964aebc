//! Report export: JSON, CSV and Markdown.
//!
//! `report.json` carries a `schema_version`; newer versions are rejected on
//! load. Chart specs are also written on their own as `charts.json` for
//! whatever renders them.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use stockcast_core::domain::ForecastPoint;
use stockcast_core::forecast::HorizonMetrics;

use crate::report::{DashboardReport, ReportCharts, SCHEMA_VERSION};

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_json(report: &DashboardReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize DashboardReport to JSON")
}

/// Deserialize a report, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<DashboardReport> {
    let report: DashboardReport =
        serde_json::from_str(json).context("failed to deserialize DashboardReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

pub fn export_charts_json(charts: &ReportCharts) -> Result<String> {
    serde_json::to_string_pretty(charts).context("failed to serialize chart specs to JSON")
}

// ─── CSV ────────────────────────────────────────────────────────────

fn opt_cell(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.6}")).unwrap_or_default()
}

/// Columns: date, predicted, lower_bound, upper_bound. Missing values are
/// empty cells.
pub fn export_forecast_csv(points: &[ForecastPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "predicted", "lower_bound", "upper_bound"])?;
    for p in points {
        wtr.write_record([
            p.timestamp.to_string(),
            opt_cell(p.predicted),
            opt_cell(p.lower_bound),
            opt_cell(p.upper_bound),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

pub fn export_metrics_csv(metrics: &[HorizonMetrics]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "horizon_days",
        "mse",
        "rmse",
        "mae",
        "mape",
        "mdape",
        "smape",
        "coverage",
    ])?;
    for m in metrics {
        wtr.write_record([
            m.horizon_days.to_string(),
            format!("{:.6}", m.mse),
            format!("{:.6}", m.rmse),
            format!("{:.6}", m.mae),
            opt_cell(m.mape),
            opt_cell(m.mdape),
            format!("{:.6}", m.smape),
            format!("{:.4}", m.coverage),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Report bundle ──────────────────────────────────────────────────

/// Write the report under `output_dir/{ticker}_{years}y_{timestamp}/`:
/// `report.json`, `forecast.csv`, `charts.json`, and `metrics.csv` when
/// cross-validation ran. Returns the created directory.
pub fn save_report(report: &DashboardReport, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!(
        "{}_{}y_{}",
        report.ticker,
        report.horizon_years,
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create report dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("report.json"), export_json(report)?)?;
    std::fs::write(
        run_dir.join("forecast.csv"),
        export_forecast_csv(&report.forecast)?,
    )?;
    std::fs::write(
        run_dir.join("charts.json"),
        export_charts_json(&report.charts)?,
    )?;
    if let Some(cv) = &report.cross_validation {
        std::fs::write(run_dir.join("metrics.csv"), export_metrics_csv(&cv.metrics)?)?;
    }

    tracing::info!(dir = %run_dir.display(), "report saved");
    Ok(run_dir)
}

/// Load `report.json` from a directory written by [`save_report`].
pub fn load_report(dir: &Path) -> Result<DashboardReport> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

// ─── Markdown ───────────────────────────────────────────────────────

fn markdown_table(out: &mut String, table: &stockcast_core::presentation::TableView) {
    let _ = writeln!(out, "| {} |", table.columns.join(" | "));
    let _ = writeln!(
        out,
        "|{}|",
        table.columns.iter().map(|_| "---").collect::<Vec<_>>().join("|")
    );
    for row in &table.rows {
        let _ = writeln!(out, "| {} |", row.join(" | "));
    }
    out.push('\n');
}

/// Human-readable summary of one report.
pub fn generate_markdown(report: &DashboardReport) -> String {
    let mut md = String::new();
    let _ = writeln!(
        md,
        "# {} forecast, {} year(s)\n",
        report.ticker, report.horizon_years
    );
    let _ = writeln!(
        md,
        "- History: {} to {} ({} records, {} usable)",
        report.start_date, report.end_date, report.record_count, report.training_points
    );
    let _ = writeln!(md, "- Provider: {} ({:?})", report.provider, report.source);
    let _ = writeln!(md, "- Dataset: `{}`", report.dataset_hash);
    let _ = writeln!(md, "- Changepoints: {}\n", report.changepoints.len());

    let _ = writeln!(md, "## {}\n", report.raw_tail.title);
    markdown_table(&mut md, &report.raw_tail);
    let _ = writeln!(md, "## {}\n", report.forecast_tail.title);
    markdown_table(&mut md, &report.forecast_tail);

    if let Some(cv) = &report.cross_validation {
        let _ = writeln!(md, "## {}\n", cv.metrics_head.title);
        let _ = writeln!(
            md,
            "{} cutoffs, initial {} days, period {} days, horizon {} days\n",
            cv.cutoffs.len(),
            cv.config.initial_days,
            cv.config.period_days,
            cv.config.horizon_days
        );
        markdown_table(&mut md, &cv.metrics_head);
    }
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn point(day: u32, predicted: Option<f64>) -> ForecastPoint {
        ForecastPoint {
            timestamp: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            predicted,
            lower_bound: predicted.map(|v| v - 1.0),
            upper_bound: predicted.map(|v| v + 1.0),
        }
    }

    #[test]
    fn forecast_csv_leaves_missing_cells_empty() {
        let csv = export_forecast_csv(&[point(1, Some(10.0)), point(2, None)]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "date,predicted,lower_bound,upper_bound");
        assert_eq!(lines[1], "2024-03-01,10.000000,9.000000,11.000000");
        assert_eq!(lines[2], "2024-03-02,,,");
    }

    #[test]
    fn metrics_csv_has_header_and_rows() {
        let m = HorizonMetrics {
            horizon_days: 30,
            mse: 4.0,
            rmse: 2.0,
            mae: 1.5,
            mape: None,
            mdape: Some(0.1),
            smape: 0.2,
            coverage: 0.75,
        };
        let csv = export_metrics_csv(&[m]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("30,4.000000,2.000000,1.500000,,0.100000,"));
    }

    #[test]
    fn import_rejects_bad_json() {
        assert!(import_json("{not json").is_err());
    }
}
