//! Tenure × monthly charge banding and per-cell churn rates

use std::fmt;

use polars::prelude::*;

use crate::data::CHURNED;
use crate::filter::FilteredView;

const TENURE_BAND: &str = "tenure_band";
const CHARGE_BAND: &str = "charge_band";
const CELL_ROWS: &str = "rows";
const CELL_CHURNED: &str = "churned";

/// Marker printed for cells without any rows
pub const NO_DATA: &str = "n/a";

/// An ordered partition of a numeric field into labelled bands.
///
/// Bands are left-closed and right-open, except the last, which also includes
/// its upper edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandAxis {
    pub name: &'static str,
    edges: &'static [f64],
    labels: &'static [&'static str],
}

/// Tenure bands in months: [0,6) [6,12) [12,24) [24,48) [48,72]
pub const TENURE_BANDS: BandAxis = BandAxis {
    name: "Tenure Group",
    edges: &[0.0, 6.0, 12.0, 24.0, 48.0, 72.0],
    labels: &["0-6", "6-12", "12-24", "24-48", "48-72"],
};

/// Monthly charge bands: [0,30) [30,60) [60,90) [90,120]
pub const CHARGE_BANDS: BandAxis = BandAxis {
    name: "Monthly Charges Group",
    edges: &[0.0, 30.0, 60.0, 90.0, 120.0],
    labels: &["0-30", "30-60", "60-90", "90-120"],
};

impl BandAxis {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &'static [&'static str] {
        self.labels
    }

    pub fn position(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| *l == label)
    }

    /// Band index of `column` as an Int64 expression, null when the value
    /// falls outside every band
    pub fn band_expr(&self, column: &str) -> Expr {
        let value = col(column).cast(DataType::Float64);
        let last = self.len().saturating_sub(1);

        (0..self.len())
            .rev()
            .fold(lit(NULL).cast(DataType::Int64), |outside, i| {
                let (low, high) = (self.edges[i], self.edges[i + 1]);
                let below_high = if i == last {
                    value.clone().lt_eq(lit(high))
                } else {
                    value.clone().lt(lit(high))
                };
                when(value.clone().gt_eq(lit(low)).and(below_high))
                    .then(lit(i as i64))
                    .otherwise(outside)
            })
    }
}

/// Row counts of one grid cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellTally {
    pub rows: usize,
    pub churned: usize,
}

impl CellTally {
    /// Churned fraction in [0,1]; `None` for an empty cell
    pub fn rate(&self) -> Option<f64> {
        if self.rows == 0 {
            None
        } else {
            Some(self.churned as f64 / self.rows as f64)
        }
    }
}

/// Churn rate per (tenure band, charge band) cell
#[derive(Debug, Clone, PartialEq)]
pub struct BucketGrid {
    /// Row-major: tenure band is the row, charge band the column
    cells: Vec<CellTally>,
    /// Rows that fell outside either axis
    pub unassigned: usize,
}

impl BucketGrid {
    pub fn rows(&self) -> &'static [&'static str] {
        TENURE_BANDS.labels()
    }

    pub fn columns(&self) -> &'static [&'static str] {
        CHARGE_BANDS.labels()
    }

    pub fn tally(&self, tenure_band: usize, charge_band: usize) -> CellTally {
        self.cells[tenure_band * CHARGE_BANDS.len() + charge_band]
    }

    pub fn rate(&self, tenure_band: usize, charge_band: usize) -> Option<f64> {
        self.tally(tenure_band, charge_band).rate()
    }

    /// Look up a cell by its band labels, e.g. `("0-6", "90-120")`
    pub fn rate_by_label(&self, tenure: &str, charge: &str) -> Option<f64> {
        let row = TENURE_BANDS.position(tenure)?;
        let column = CHARGE_BANDS.position(charge)?;
        self.rate(row, column)
    }

    /// Rates as a row-major matrix
    pub fn rates(&self) -> Vec<Vec<Option<f64>>> {
        (0..TENURE_BANDS.len())
            .map(|row| {
                (0..CHARGE_BANDS.len())
                    .map(|column| self.rate(row, column))
                    .collect()
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|c| c.rows == 0)
    }
}

/// Format a cell for annotation: two decimals, or the no-data marker
pub fn format_rate(rate: Option<f64>) -> String {
    match rate {
        Some(rate) => format!("{:.2}", rate),
        None => NO_DATA.to_string(),
    }
}

impl fmt::Display for BucketGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>8}", "")?;
        for column in self.columns() {
            write!(f, " {:>7}", column)?;
        }
        writeln!(f)?;
        for (row, label) in self.rows().iter().enumerate() {
            write!(f, "{:>8}", label)?;
            for column in 0..CHARGE_BANDS.len() {
                write!(f, " {:>7}", format_rate(self.rate(row, column)))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Group the filtered rows into the band grid and tally churn per cell
pub fn compute_bucket_grid(view: &FilteredView<'_>) -> crate::Result<BucketGrid> {
    let mut cells = vec![CellTally::default(); TENURE_BANDS.len() * CHARGE_BANDS.len()];
    let mut unassigned = 0;
    if view.is_empty() {
        return Ok(BucketGrid { cells, unassigned });
    }

    let tallies = view
        .frame()
        .clone()
        .lazy()
        .with_columns([
            TENURE_BANDS.band_expr("tenure").alias(TENURE_BAND),
            CHARGE_BANDS.band_expr("MonthlyCharges").alias(CHARGE_BAND),
        ])
        .group_by([col(TENURE_BAND), col(CHARGE_BAND)])
        .agg([
            len().cast(DataType::Int64).alias(CELL_ROWS),
            col("Churn")
                .eq(lit(CHURNED))
                .cast(DataType::Int64)
                .sum()
                .alias(CELL_CHURNED),
        ])
        .collect()?;

    let tenure_bands = tallies.column(TENURE_BAND)?.i64()?;
    let charge_bands = tallies.column(CHARGE_BAND)?.i64()?;
    let rows = tallies.column(CELL_ROWS)?.i64()?;
    let churned = tallies.column(CELL_CHURNED)?.i64()?;

    for (((tenure_band, charge_band), rows), churned) in tenure_bands
        .into_iter()
        .zip(charge_bands)
        .zip(rows)
        .zip(churned)
    {
        let tally = CellTally {
            rows: rows.unwrap_or(0) as usize,
            churned: churned.unwrap_or(0) as usize,
        };
        match (tenure_band, charge_band) {
            (Some(row), Some(column)) => {
                cells[row as usize * CHARGE_BANDS.len() + column as usize] = tally;
            }
            // Null band keys collect rows outside either axis
            _ => unassigned += tally.rows,
        }
    }

    Ok(BucketGrid { cells, unassigned })
}
