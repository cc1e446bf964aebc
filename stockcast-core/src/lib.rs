//! StockCast Core — price data loading, series preparation, forecasting, chart adapters.
//!
//! This crate contains the whole request pipeline:
//! - Domain types (price records, training points, forecast points, requests)
//! - Data providers (Yahoo Finance, CSV import, synthetic) behind one trait
//! - Data loader with type coercion, fill policy and a per-session cache
//! - Series preparer projecting cleaned prices into a training series
//! - Forecast requestor, the additive forecasting engine and cross-validation
//! - Presentation adapter producing chart specs and tail tables

pub mod data;
pub mod domain;
pub mod error;
pub mod forecast;
pub mod prepare;
pub mod presentation;

pub use error::{ErrorKind, PipelineError};
