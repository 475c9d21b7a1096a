//! Chart views built from the filtered records
//!
//! Each builder is a pure function returning an owned [`Chart`]. Drawing happens
//! later in [`crate::viz`]; charts never share state with each other.

use polars::prelude::{col, Expr};

use crate::aggregate::{
    count_by, stacked_percentages, tenure_histogram, GroupedCounts, Histogram, StackedShares,
    TENURE_HISTOGRAM_BINS,
};
use crate::bucket::BucketGrid;
use crate::data::senior_label_expr;
use crate::filter::FilteredView;
use crate::summary;

/// The seven fixed dashboard views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    ChurnByGender,
    ChurnBySeniorCitizen,
    TenureDistribution,
    ChurnByContract,
    ChurnByServices,
    ChurnByPaymentMethod,
    ChurnHeatmap,
}

impl ChartKind {
    /// Page order of the exported document
    pub const ORDER: [ChartKind; 7] = [
        ChartKind::ChurnByGender,
        ChartKind::ChurnBySeniorCitizen,
        ChartKind::TenureDistribution,
        ChartKind::ChurnByContract,
        ChartKind::ChurnByServices,
        ChartKind::ChurnByPaymentMethod,
        ChartKind::ChurnHeatmap,
    ];

    pub fn title(self) -> &'static str {
        match self {
            ChartKind::ChurnByGender => "Churn by Gender",
            ChartKind::ChurnBySeniorCitizen => "Churn by Senior Citizen",
            ChartKind::TenureDistribution => "Tenure Distribution by Churn",
            ChartKind::ChurnByContract => "Churn by Contract Type",
            ChartKind::ChurnByServices => "Churn by Services Used",
            ChartKind::ChurnByPaymentMethod => "Churn by Payment Method",
            ChartKind::ChurnHeatmap => "Churn Rate Heatmap by Tenure and Monthly Charges",
        }
    }

    /// Pixel size of the rendered figure
    pub fn size(self) -> (u32, u32) {
        match self {
            ChartKind::ChurnByGender | ChartKind::ChurnByContract => (600, 400),
            ChartKind::ChurnBySeniorCitizen => (500, 400),
            ChartKind::TenureDistribution => (800, 400),
            ChartKind::ChurnByServices => (1400, 1050),
            ChartKind::ChurnByPaymentMethod => (800, 500),
            ChartKind::ChurnHeatmap => (800, 500),
        }
    }

    pub fn insight(self) -> &'static str {
        summary::insight(self)
    }
}

/// Service columns shown in the services panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceColumn {
    PhoneService,
    MultipleLines,
    InternetService,
    OnlineSecurity,
    OnlineBackup,
    DeviceProtection,
    TechSupport,
    StreamingTv,
    StreamingMovies,
}

impl ServiceColumn {
    /// Panel order
    pub const ALL: [ServiceColumn; 9] = [
        ServiceColumn::PhoneService,
        ServiceColumn::MultipleLines,
        ServiceColumn::InternetService,
        ServiceColumn::OnlineSecurity,
        ServiceColumn::OnlineBackup,
        ServiceColumn::DeviceProtection,
        ServiceColumn::TechSupport,
        ServiceColumn::StreamingTv,
        ServiceColumn::StreamingMovies,
    ];

    /// Source column name
    pub fn column(self) -> &'static str {
        match self {
            ServiceColumn::PhoneService => "PhoneService",
            ServiceColumn::MultipleLines => "MultipleLines",
            ServiceColumn::InternetService => "InternetService",
            ServiceColumn::OnlineSecurity => "OnlineSecurity",
            ServiceColumn::OnlineBackup => "OnlineBackup",
            ServiceColumn::DeviceProtection => "DeviceProtection",
            ServiceColumn::TechSupport => "TechSupport",
            ServiceColumn::StreamingTv => "StreamingTV",
            ServiceColumn::StreamingMovies => "StreamingMovies",
        }
    }
}

/// Columns of the services panel grid
pub const SERVICE_PANEL_COLUMNS: usize = 3;

/// A single count-by-category panel
#[derive(Debug, Clone, PartialEq)]
pub struct CountPanel {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub counts: GroupedCounts,
    /// Draw the count above each bar
    pub bar_labels: bool,
}

/// What a chart draws
#[derive(Debug, Clone, PartialEq)]
pub enum ChartBody {
    Counts(CountPanel),
    /// Several count panels laid out `columns` wide
    Panels {
        columns: usize,
        panels: Vec<CountPanel>,
    },
    Stacked {
        x_label: String,
        y_label: String,
        shares: StackedShares,
    },
    Histogram {
        x_label: String,
        histogram: Histogram,
    },
    Heatmap(BucketGrid),
}

/// A self-contained chart object
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub kind: ChartKind,
    pub title: String,
    pub size: (u32, u32),
    pub body: ChartBody,
}

impl Chart {
    fn new(kind: ChartKind, body: ChartBody) -> Self {
        Self {
            kind,
            title: kind.title().to_string(),
            size: kind.size(),
            body,
        }
    }

    /// True when the chart has nothing to draw
    pub fn is_empty(&self) -> bool {
        match &self.body {
            ChartBody::Counts(panel) => panel.counts.is_empty(),
            ChartBody::Panels { panels, .. } => panels.iter().all(|p| p.counts.is_empty()),
            ChartBody::Stacked { shares, .. } => shares.is_empty(),
            ChartBody::Histogram { histogram, .. } => histogram.is_empty(),
            ChartBody::Heatmap(grid) => grid.is_empty(),
        }
    }
}

fn count_panel(
    view: &FilteredView<'_>,
    title: &str,
    x_label: &str,
    key: Expr,
) -> crate::Result<CountPanel> {
    Ok(CountPanel {
        title: title.to_string(),
        x_label: x_label.to_string(),
        y_label: "Count".to_string(),
        counts: count_by(view, key)?,
        bar_labels: false,
    })
}

pub fn churn_by_gender(view: &FilteredView<'_>) -> crate::Result<Chart> {
    let title = ChartKind::ChurnByGender.title();
    let panel = count_panel(view, title, "gender", col("gender"))?;
    Ok(Chart::new(ChartKind::ChurnByGender, ChartBody::Counts(panel)))
}

pub fn churn_by_senior_citizen(view: &FilteredView<'_>) -> crate::Result<Chart> {
    Ok(Chart::new(
        ChartKind::ChurnBySeniorCitizen,
        ChartBody::Stacked {
            x_label: "Senior Citizen".to_string(),
            y_label: "Percentage (%)".to_string(),
            shares: stacked_percentages(view, senior_label_expr())?,
        },
    ))
}

pub fn tenure_distribution(view: &FilteredView<'_>) -> Chart {
    Chart::new(
        ChartKind::TenureDistribution,
        ChartBody::Histogram {
            x_label: "tenure".to_string(),
            histogram: tenure_histogram(view, TENURE_HISTOGRAM_BINS),
        },
    )
}

pub fn churn_by_contract(view: &FilteredView<'_>) -> crate::Result<Chart> {
    let title = ChartKind::ChurnByContract.title();
    let panel = count_panel(view, title, "Contract", col("Contract"))?;
    Ok(Chart::new(ChartKind::ChurnByContract, ChartBody::Counts(panel)))
}

pub fn churn_by_services(view: &FilteredView<'_>) -> crate::Result<Chart> {
    let panels = ServiceColumn::ALL
        .iter()
        .map(|service| {
            let column = service.column();
            count_panel(view, &format!("Churn by {}", column), column, col(column))
        })
        .collect::<crate::Result<Vec<_>>>()?;
    Ok(Chart::new(
        ChartKind::ChurnByServices,
        ChartBody::Panels {
            columns: SERVICE_PANEL_COLUMNS,
            panels,
        },
    ))
}

pub fn churn_by_payment_method(view: &FilteredView<'_>) -> crate::Result<Chart> {
    let title = ChartKind::ChurnByPaymentMethod.title();
    let mut panel = count_panel(view, title, "PaymentMethod", col("PaymentMethod"))?;
    panel.bar_labels = true;
    Ok(Chart::new(
        ChartKind::ChurnByPaymentMethod,
        ChartBody::Counts(panel),
    ))
}

pub fn churn_heatmap(grid: &BucketGrid) -> Chart {
    Chart::new(ChartKind::ChurnHeatmap, ChartBody::Heatmap(grid.clone()))
}

/// Build all seven charts in page order
pub fn build_chart_set(view: &FilteredView<'_>, grid: &BucketGrid) -> crate::Result<Vec<Chart>> {
    ChartKind::ORDER
        .iter()
        .map(|kind| match kind {
            ChartKind::ChurnByGender => churn_by_gender(view),
            ChartKind::ChurnBySeniorCitizen => churn_by_senior_citizen(view),
            ChartKind::TenureDistribution => Ok(tenure_distribution(view)),
            ChartKind::ChurnByContract => churn_by_contract(view),
            ChartKind::ChurnByServices => churn_by_services(view),
            ChartKind::ChurnByPaymentMethod => churn_by_payment_method(view),
            ChartKind::ChurnHeatmap => Ok(churn_heatmap(grid)),
        })
        .collect()
}
