//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use clap::Parser;
use tracing::warn;

use crate::data::{FieldDomains, SliderBounds};
use crate::filter::{CategoricalField, FilterSet, NumericRange};

/// Telecom customer churn dashboard: filter the customer table and export the charts
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file
    #[arg(short, long, default_value = "Customer Churn.csv")]
    pub input: PathBuf,

    /// Output path for the multi-page PDF of all charts
    #[arg(short, long, default_value = "telecom_churn_analysis.pdf")]
    pub output: PathBuf,

    /// Also save each chart as a PNG into this directory
    #[arg(long)]
    pub png_dir: Option<PathBuf>,

    /// Write the filtered dataset to this CSV file
    #[arg(long)]
    pub filtered_csv: Option<PathBuf>,

    /// Allowed gender values (default: all)
    #[arg(long, value_delimiter = ',')]
    pub gender: Vec<String>,

    /// Allowed churn statuses (default: all)
    #[arg(long, value_delimiter = ',')]
    pub churn: Vec<String>,

    /// Allowed contract types (default: all)
    #[arg(long, value_delimiter = ',')]
    pub contract: Vec<String>,

    /// Allowed internet service types (default: all)
    #[arg(long, value_delimiter = ',')]
    pub internet: Vec<String>,

    /// Allowed senior citizen labels, Yes and/or No (default: both)
    #[arg(long, value_delimiter = ',')]
    pub senior: Vec<String>,

    /// Allowed payment methods (default: all)
    #[arg(long, value_delimiter = ',')]
    pub payment: Vec<String>,

    /// Tenure range in months as "low,high" (default: observed range)
    /// Example: --tenure "0,12"
    #[arg(long)]
    pub tenure: Option<String>,

    /// Monthly charges range as "low,high" (default: observed range)
    #[arg(long)]
    pub charges: Option<String>,

    /// Print the first N rows of the filtered dataset
    #[arg(long, default_value = "0")]
    pub preview: usize,

    /// Print chart insights and the summary & recommendations
    #[arg(long)]
    pub summary: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parse an integer range from a "low,high" string
pub fn parse_range(value: &str) -> crate::Result<(i64, i64)> {
    let parts: Vec<&str> = value.split(',').collect();
    if parts.len() != 2 {
        anyhow::bail!("Range must be in format 'low,high', got '{}'", value);
    }

    let low: i64 = parts[0]
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid range low bound: {}", parts[0]))?;
    let high: i64 = parts[1]
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid range high bound: {}", parts[1]))?;

    if low > high {
        anyhow::bail!("Range low bound {} is greater than high bound {}", low, high);
    }

    Ok((low, high))
}

fn range_arg(value: Option<&str>, name: &str, bounds: SliderBounds) -> crate::Result<NumericRange> {
    let Some(value) = value else {
        return Ok(bounds.into());
    };
    let (low, high) = parse_range(value)?;
    if low < bounds.min || high > bounds.max {
        warn!(
            filter = name,
            low,
            high,
            min = bounds.min,
            max = bounds.max,
            "range extends beyond observed values"
        );
    }
    Ok(NumericRange::new(low as f64, high as f64))
}

impl Args {
    /// Translate the selected options into a filter set.
    ///
    /// Options that were not given select every observed value.
    pub fn filter_set(&self, domains: &FieldDomains) -> crate::Result<FilterSet> {
        let mut filters = FilterSet::all(domains);

        let selections = [
            (CategoricalField::Gender, &self.gender),
            (CategoricalField::Churn, &self.churn),
            (CategoricalField::Contract, &self.contract),
            (CategoricalField::InternetService, &self.internet),
            (CategoricalField::PaymentMethod, &self.payment),
        ];
        for (field, values) in selections {
            if values.is_empty() {
                continue;
            }
            for value in values {
                if !domains.values(field).contains(value) {
                    warn!(filter = field.column(), value = %value, "value not present in dataset");
                }
            }
            filters = filters.with_values(field, values.iter().cloned());
        }

        if !self.senior.is_empty() {
            if let Some(label) = self
                .senior
                .iter()
                .find(|label| !domains.senior_labels.contains(&label.as_str()))
            {
                anyhow::bail!(
                    "Invalid senior citizen label: {} (expected one of: {})",
                    label,
                    domains.senior_labels.join(", ")
                );
            }
            filters = filters.with_senior_labels(&self.senior)?;
        }

        filters = filters
            .with_tenure(range_arg(self.tenure.as_deref(), "tenure", domains.tenure)?)
            .with_monthly_charges(range_arg(
                self.charges.as_deref(),
                "charges",
                domains.monthly_charges,
            )?);

        Ok(filters)
    }
}
