//! The interaction handler: one filter set in, one recomputed frame out

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::bucket::{compute_bucket_grid, BucketGrid};
use crate::charts::{build_chart_set, Chart};
use crate::data::{load_records, FieldDomains, RecordStore};
use crate::export::export_pdf;
use crate::filter::{FilterSet, FilteredView};
use crate::viz::{render_chart, save_chart_png, RenderedChart};

/// Loaded dataset plus the filter options it offers
#[derive(Debug, Clone)]
pub struct Dashboard {
    store: RecordStore,
    domains: FieldDomains,
}

impl Dashboard {
    /// Load the input file; any load error aborts dashboard construction
    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        Ok(Self::from_store(load_records(path)?))
    }

    pub fn from_store(store: RecordStore) -> Self {
        let domains = store.domains();
        Self { store, domains }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Options for every filter, taken from the full store
    pub fn domains(&self) -> &FieldDomains {
        &self.domains
    }

    /// Selection with every observed value and full ranges
    pub fn default_filters(&self) -> FilterSet {
        FilterSet::all(&self.domains)
    }

    /// Recompute everything for one interaction: filtered view, then bucket
    /// grid, then charts
    pub fn interact(&self, filters: &FilterSet) -> crate::Result<Frame<'_>> {
        let view = filters.apply(&self.store)?;
        let grid = compute_bucket_grid(&view)?;
        let charts = build_chart_set(&view, &grid)?;
        debug!(
            rows = view.len(),
            churned = view.churned_count(),
            unassigned = grid.unassigned,
            "frame computed"
        );

        Ok(Frame {
            filters: filters.clone(),
            view,
            grid,
            charts,
        })
    }
}

/// Everything derived from one filter set; discarded after use
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    pub filters: FilterSet,
    pub view: FilteredView<'a>,
    pub grid: BucketGrid,
    pub charts: Vec<Chart>,
}

impl<'a> Frame<'a> {
    /// Render every chart; fails if any chart fails
    pub fn render(&self) -> crate::Result<Vec<RenderedChart>> {
        self.charts.iter().map(render_chart).collect()
    }

    /// Render all charts and serialize them as one PDF
    pub fn export_pdf(&self) -> crate::Result<Vec<u8>> {
        let rendered = self.render()?;
        Ok(export_pdf(&rendered)?)
    }

    /// Write the PDF to `path`; nothing is written if rendering fails
    pub fn write_pdf(&self, path: &Path) -> crate::Result<()> {
        let bytes = self.export_pdf()?;
        fs::write(path, bytes)?;
        info!(path = %path.display(), "PDF written");
        Ok(())
    }

    /// Save one PNG per chart into `dir`, returning the written paths
    pub fn save_pngs(&self, dir: &Path) -> crate::Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        self.charts
            .iter()
            .enumerate()
            .map(|(i, chart)| {
                let path = dir.join(format!("{:02}_{}.png", i + 1, slug(&chart.title)));
                save_chart_png(chart, &path)?;
                Ok(path)
            })
            .collect()
    }

    /// Write the filtered rows as CSV
    pub fn write_filtered_csv(&self, path: &Path) -> crate::Result<()> {
        let file = BufWriter::new(File::create(path)?);
        self.view.write_csv(file)?;
        info!(path = %path.display(), rows = self.view.len(), "filtered dataset written");
        Ok(())
    }
}

fn slug(title: &str) -> String {
    title
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}
