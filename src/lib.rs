//! ChurnBoard: telecom customer churn dashboard
//!
//! Loads a customer table once, then answers each interaction (a set of filter
//! predicates) by recomputing the filtered view, the tenure × charge churn grid
//! and seven chart views, which can be exported together as a PDF.

pub mod aggregate;
pub mod bucket;
pub mod charts;
pub mod cli;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod export;
pub mod filter;
pub mod summary;
pub mod viz;

// Re-export public items for easier access
pub use bucket::{compute_bucket_grid, BucketGrid, CHARGE_BANDS, TENURE_BANDS};
pub use charts::{build_chart_set, Chart, ChartKind, ServiceColumn};
pub use cli::Args;
pub use dashboard::{Dashboard, Frame};
pub use data::{load_records, CustomerRecord, FieldDomains, RecordStore};
pub use error::{ExportError, LoadError};
pub use export::export_pdf;
pub use filter::{CategoricalField, FilterSet, FilteredView, NumericRange};
pub use viz::{render_chart, RenderedChart};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
