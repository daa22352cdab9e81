//! stockviz
//!
//! Annotated stock price charts whose labels never overlap the data. Pairs
//! with the `stockviz` CLI.
//!
//! ### Features
//! - Load daily closes (and optional volume) from CSV; save as CSV or JSON
//! - Moving averages, all-time high, period extremes and summary statistics
//! - SVG/PNG charts with annotation labels placed by a collision engine that
//!   treats reference lines, markers, volume bars and the price path itself
//!   as obstacles
//! - Connectors from displaced labels back to their anchor, and a debug
//!   overlay showing every box the engine sees
//!
//! ### Example
//! ```no_run
//! use stockviz::{storage, viz, stats};
//!
//! let series = storage::load_csv("prices.csv", "ACME")?;
//! let report = viz::plot_annotated(&series, "acme.svg", &viz::ChartOptions::default())?;
//! println!("{} passes, {} unresolved", report.resolve.passes, report.resolve.unresolved);
//! println!("{:#?}", stats::summary(&series));
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod collision;
pub mod config;
pub mod models;
pub mod stats;
pub mod storage;
pub mod viz;

pub use collision::{ParticipationRegistry, ResolveReport, Surface, resolve};
pub use config::{CollisionConfig, ConnectorStyle, Movement};
pub use models::{DataError, PricePoint, PriceSeries};
