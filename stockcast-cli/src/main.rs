//! StockCast CLI: forecast, interactive session, and ticker commands.
//!
//! Commands:
//! - `forecast` runs one request and prints tables and a summary
//! - `session` reads `TICKER YEARS` lines from stdin against one shared cache
//! - `tickers` lists the allowed tickers
//! - `init-config` prints the default TOML config

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use stockcast_core::domain::{ForecastRequest, MAX_HORIZON_YEARS, MIN_HORIZON_YEARS};
use stockcast_runner::{
    generate_markdown, save_report, DashboardConfig, DashboardReport, DashboardSession,
    ProviderKind,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "stockcast", about = "StockCast: stock price forecasts with uncertainty bands")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct SourceOpts {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Data provider: yahoo, csv or synthetic. Overrides the config.
    #[arg(long)]
    provider: Option<ProviderKind>,

    /// Directory of `<TICKER>.csv` files for the csv provider.
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// Start date (YYYY-MM-DD). Overrides the config.
    #[arg(long)]
    start: Option<NaiveDate>,

    /// End date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Forward-fill gaps only; leading gaps stay missing.
    #[arg(long, default_value_t = false)]
    forward_only: bool,

    /// Run rolling-origin cross-validation after the forecast.
    #[arg(long, default_value_t = false)]
    cross_validate: bool,

    /// Skip the components chart.
    #[arg(long, default_value_t = false)]
    no_components: bool,

    /// Skip changepoint detection.
    #[arg(long, default_value_t = false)]
    no_changepoints: bool,

    /// Minimum absolute rate change for a reported changepoint.
    #[arg(long)]
    changepoint_threshold: Option<f64>,
}

impl SourceOpts {
    fn load_config(&self) -> Result<DashboardConfig> {
        let mut config = match &self.config {
            Some(path) => DashboardConfig::from_file(path)?,
            None => DashboardConfig::default(),
        };
        if let Some(kind) = self.provider {
            config.provider.kind = kind;
        }
        if let Some(dir) = &self.csv_dir {
            config.provider.csv_dir = dir.clone();
        }
        if let Some(start) = self.start {
            config.data.start_date = start;
        }
        if self.end.is_some() {
            config.data.end_date = self.end;
        }
        if self.forward_only {
            config.display.enable_backward_fill = false;
        }
        if self.cross_validate {
            config.display.run_cross_validation = true;
        }
        if self.no_components {
            config.display.show_components = false;
        }
        if self.no_changepoints {
            config.display.show_changepoints = false;
        }
        if let Some(threshold) = self.changepoint_threshold {
            config.display.changepoint_threshold = threshold;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast one ticker.
    Forecast {
        /// Ticker symbol, case-insensitive.
        #[arg(long)]
        ticker: String,

        /// Years to forecast ahead.
        #[arg(long, default_value_t = 1,
              value_parser = clap::value_parser!(u32).range(MIN_HORIZON_YEARS as i64..=MAX_HORIZON_YEARS as i64))]
        years: u32,

        #[command(flatten)]
        source: SourceOpts,

        /// Save report.json, forecast.csv and charts.json under this directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Print the full report as JSON instead of tables.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Print a Markdown summary instead of tables.
        #[arg(long, default_value_t = false, conflicts_with = "json")]
        markdown: bool,
    },
    /// Interactive session: one `TICKER YEARS` request per line, `clear` to
    /// drop cached data, `quit` to exit.
    Session {
        #[command(flatten)]
        source: SourceOpts,
    },
    /// List the allowed tickers.
    Tickers {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the default configuration as TOML.
    InitConfig,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(EnvFilter::from_default_env().add_directive("stockcast=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Forecast {
            ticker,
            years,
            source,
            output_dir,
            json,
            markdown,
        } => run_forecast(&ticker, years, &source, output_dir, json, markdown),
        Commands::Session { source } => run_session(&source),
        Commands::Tickers { config } => {
            let config = match config {
                Some(path) => DashboardConfig::from_file(&path)?,
                None => DashboardConfig::default(),
            };
            for ticker in config.allowed_tickers().iter() {
                println!("{ticker}");
            }
            Ok(())
        }
        Commands::InitConfig => {
            print!("{}", DashboardConfig::default().to_toml()?);
            Ok(())
        }
    }
}

fn run_forecast(
    ticker: &str,
    years: u32,
    source: &SourceOpts,
    output_dir: Option<PathBuf>,
    json: bool,
    markdown: bool,
) -> Result<()> {
    let config = source.load_config()?;
    let mut session = DashboardSession::from_config(config)?;
    let request = ForecastRequest::new(ticker, years)?;
    let report = session.run(&request)?;

    if json {
        println!("{}", stockcast_runner::export_json(&report)?);
    } else if markdown {
        print!("{}", generate_markdown(&report));
    } else {
        print_report(&report);
    }

    if let Some(dir) = output_dir {
        let run_dir = save_report(&report, &dir)?;
        println!("Report saved to: {}", run_dir.display());
    }
    Ok(())
}

fn run_session(source: &SourceOpts) -> Result<()> {
    let config = source.load_config()?;
    let mut session = DashboardSession::from_config(config)?;
    let allowed: Vec<String> = session.allowed_tickers().iter().map(String::from).collect();
    info!(tickers = %allowed.join(","), "session started");

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    write!(stdout, "> ")?;
    stdout.flush()?;

    for line in stdin.lock().lines() {
        let line = line.context("failed to read stdin")?;
        match parse_command(&line) {
            Ok(SessionCommand::Empty) => {}
            Ok(SessionCommand::Quit) => break,
            Ok(SessionCommand::Clear) => {
                session.clear_cache();
                println!("cache cleared");
            }
            Ok(SessionCommand::Request { ticker, years }) => {
                let outcome = ForecastRequest::new(ticker, years)
                    .map_err(anyhow::Error::from)
                    .and_then(|req| session.run(&req).map_err(anyhow::Error::from));
                match outcome {
                    Ok(report) => print_report(&report),
                    Err(e) => eprintln!("error: {e}"),
                }
            }
            Err(e) => eprintln!("error: {e}"),
        }
        write!(stdout, "> ")?;
        stdout.flush()?;
    }

    let stats = session.cache_stats();
    info!(
        entries = stats.entries,
        hits = stats.hits,
        misses = stats.misses,
        "session ended"
    );
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum SessionCommand {
    Empty,
    Quit,
    Clear,
    Request { ticker: String, years: u32 },
}

fn parse_command(line: &str) -> Result<SessionCommand> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        [] => Ok(SessionCommand::Empty),
        [cmd] if cmd.eq_ignore_ascii_case("quit") || cmd.eq_ignore_ascii_case("exit") => {
            Ok(SessionCommand::Quit)
        }
        [cmd] if cmd.eq_ignore_ascii_case("clear") => Ok(SessionCommand::Clear),
        [ticker] => Ok(SessionCommand::Request {
            ticker: ticker.to_string(),
            years: MIN_HORIZON_YEARS,
        }),
        [ticker, years] => {
            let years: u32 = years
                .parse()
                .with_context(|| format!("years must be a whole number, got '{years}'"))?;
            Ok(SessionCommand::Request {
                ticker: ticker.to_string(),
                years,
            })
        }
        _ => bail!("expected 'TICKER YEARS', 'clear' or 'quit'"),
    }
}

fn print_report(report: &DashboardReport) {
    println!("{}", report.raw_tail);
    println!("{}", report.forecast_tail);
    if let Some(cv) = &report.cross_validation {
        println!("{}", cv.metrics_head);
    }
    if !report.changepoints.is_empty() {
        let dates: Vec<String> = report
            .changepoints
            .iter()
            .map(|c| c.timestamp.to_string())
            .collect();
        println!("Changepoints: {}", dates.join(", "));
    }
    if report.source != stockcast_core::data::DataSource::YahooFinance {
        println!("Note: data source is {:?}", report.source);
    }
    println!("{}", report.summary());
}
