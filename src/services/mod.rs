//! Services layer
//!
//! Business logic used by the CLI subcommand handlers in `main.rs`:
//!
//! - `RefreshService` - end-to-end data refresh and ranking
//! - `ExportService` - CSV exports

pub mod export_service;
pub mod refresh_service;

pub use export_service::ExportService;
pub use refresh_service::{RefreshService, RefreshSummary};
