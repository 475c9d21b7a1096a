//! Group counts, stacked percentages and histograms over the filtered view

use polars::prelude::*;

use crate::filter::FilteredView;

const CATEGORY: &str = "category";
const CHURN: &str = "Churn";
const COUNT: &str = "count";

/// Number of equal-width bins in the tenure histogram
pub const TENURE_HISTOGRAM_BINS: usize = 72;

/// Row counts per category, split by churn status
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupedCounts {
    /// Categories in first-appearance order
    pub categories: Vec<String>,
    /// Churn statuses in first-appearance order
    pub hues: Vec<String>,
    /// `counts[category][hue]`
    pub counts: Vec<Vec<usize>>,
}

impl GroupedCounts {
    pub fn max_count(&self) -> usize {
        self.counts.iter().flatten().copied().max().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn count(&self, category: &str, hue: &str) -> usize {
        let c = self.categories.iter().position(|v| v == category);
        let h = self.hues.iter().position(|v| v == hue);
        match (c, h) {
            (Some(c), Some(h)) => self.counts[c][h],
            _ => 0,
        }
    }
}

/// Per-category churn status shares, in percent
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StackedShares {
    /// Categories in sorted order
    pub categories: Vec<String>,
    /// Churn statuses in sorted order
    pub hues: Vec<String>,
    /// `percent[category][hue]`; each row sums to 100
    pub percent: Vec<Vec<f64>>,
}

impl StackedShares {
    pub fn share(&self, category: &str, hue: &str) -> Option<f64> {
        let c = self.categories.iter().position(|v| v == category)?;
        let h = self.hues.iter().position(|v| v == hue)?;
        Some(self.percent[c][h])
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Equal-width histogram with one count series per churn status
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Histogram {
    /// `bins + 1` ascending edges; empty when there is no data
    pub edges: Vec<f64>,
    pub hues: Vec<String>,
    /// `counts[hue][bin]`
    pub counts: Vec<Vec<usize>>,
}

impl Histogram {
    pub fn max_count(&self) -> usize {
        self.counts.iter().flatten().copied().max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

fn index_of(values: &mut Vec<String>, value: &str) -> usize {
    match values.iter().position(|v| v == value) {
        Some(i) => i,
        None => {
            values.push(value.to_string());
            values.len() - 1
        }
    }
}

/// Count rows per category, split by churn status.
///
/// `key` yields the category of each row, e.g. `col("gender")`. Groups keep
/// the order in which they first appear, so categories and statuses come out
/// in first-appearance order.
pub fn count_by(view: &FilteredView<'_>, key: Expr) -> crate::Result<GroupedCounts> {
    let mut grouped = GroupedCounts::default();
    if view.is_empty() {
        return Ok(grouped);
    }

    let counts = view
        .frame()
        .clone()
        .lazy()
        .group_by_stable([key.alias(CATEGORY), col(CHURN)])
        .agg([len().cast(DataType::Int64).alias(COUNT)])
        .collect()?;

    let categories = counts.column(CATEGORY)?.cast(&DataType::String)?;
    let hues = counts.column(CHURN)?;
    let totals = counts.column(COUNT)?;

    for ((category, hue), total) in categories
        .str()?
        .into_iter()
        .zip(hues.str()?)
        .zip(totals.i64()?)
    {
        let (Some(category), Some(hue), Some(total)) = (category, hue, total) else {
            continue;
        };
        let c = index_of(&mut grouped.categories, category);
        let h = index_of(&mut grouped.hues, hue);
        if grouped.counts.len() <= c {
            grouped.counts.push(Vec::new());
        }
        for row in grouped.counts.iter_mut() {
            row.resize(grouped.hues.len(), 0);
        }
        grouped.counts[c][h] = total as usize;
    }

    Ok(grouped)
}

/// Churn status percentages per category (each category sums to 100)
pub fn stacked_percentages(view: &FilteredView<'_>, key: Expr) -> crate::Result<StackedShares> {
    let grouped = count_by(view, key)?;

    let mut categories = grouped.categories.clone();
    categories.sort();
    let mut hues = grouped.hues.clone();
    hues.sort();

    let percent = categories
        .iter()
        .map(|category| {
            let row_total: usize = hues.iter().map(|hue| grouped.count(category, hue)).sum();
            hues.iter()
                .map(|hue| {
                    // Every listed category has at least one row
                    100.0 * grouped.count(category, hue) as f64 / row_total as f64
                })
                .collect()
        })
        .collect();

    Ok(StackedShares {
        categories,
        hues,
        percent,
    })
}

/// Histogram of tenure over the filtered range, overlaid by churn status
pub fn tenure_histogram(view: &FilteredView<'_>, bins: usize) -> Histogram {
    if view.is_empty() || bins == 0 {
        return Histogram::default();
    }

    let values: Vec<(f64, &str)> = view
        .iter()
        .map(|r| (r.tenure as f64, r.churn.as_str()))
        .collect();
    let mut min = values.iter().map(|v| v.0).fold(f64::INFINITY, f64::min);
    let mut max = values.iter().map(|v| v.0).fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        min -= 0.5;
        max += 0.5;
    }

    let width = (max - min) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| min + width * i as f64).collect();

    let mut hues: Vec<String> = Vec::new();
    let mut counts: Vec<Vec<usize>> = Vec::new();
    for (value, churn) in values {
        let h = index_of(&mut hues, churn);
        if counts.len() <= h {
            counts.push(vec![0; bins]);
        }
        // Last bin is closed on the right
        let bin = (((value - min) / width).floor() as usize).min(bins - 1);
        counts[h][bin] += 1;
    }

    Histogram {
        edges,
        hues,
        counts,
    }
}
