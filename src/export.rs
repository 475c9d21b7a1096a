//! Multi-page PDF export of rendered charts

use std::io::Write;

use chrono::{Datelike, Local, Timelike};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use pdf_writer::{Content, Date, Filter, Finish, Name, Pdf, Rect, Ref, TextStr};
use tracing::info;

use crate::error::ExportError;
use crate::viz::RenderedChart;

/// Points per rendered pixel (charts are drawn at 100 pixels per inch)
const POINTS_PER_PIXEL: f32 = 0.72;

const IMAGE_NAME: Name<'static> = Name(b"Chart");

/// Sequential PDF object ids
struct RefAllocator(i32);

impl RefAllocator {
    fn next(&mut self) -> Ref {
        self.0 += 1;
        Ref::new(self.0)
    }
}

fn compress(pixels: &[u8]) -> Result<Vec<u8>, ExportError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(pixels)?;
    Ok(encoder.finish()?)
}

fn creation_date() -> Date {
    let now = Local::now();
    Date::new(now.year() as u16)
        .month(now.month() as u8)
        .day(now.day() as u8)
        .hour(now.hour() as u8)
        .minute(now.minute() as u8)
        .second(now.second() as u8)
}

/// Serialize rendered charts as consecutive pages of one PDF document
///
/// # Arguments
/// * `charts` - Rendered charts in page order
///
/// # Returns
/// * The complete document bytes; nothing is produced if any chart is invalid
pub fn export_pdf(charts: &[RenderedChart]) -> Result<Vec<u8>, ExportError> {
    if charts.is_empty() {
        return Err(ExportError::NoCharts);
    }
    if let Some((index, chart)) = charts.iter().enumerate().find(|(_, c)| !c.is_valid()) {
        return Err(ExportError::InvalidChart {
            index,
            title: chart.title.clone(),
        });
    }

    let mut alloc = RefAllocator(0);
    let catalog_id = alloc.next();
    let page_tree_id = alloc.next();
    let info_id = alloc.next();

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(page_tree_id);
    pdf.document_info(info_id)
        .title(TextStr("Telecom Customer Churn Analysis"))
        .creator(TextStr(env!("CARGO_PKG_NAME")))
        .creation_date(creation_date());

    let mut page_ids = Vec::with_capacity(charts.len());
    for chart in charts {
        let page_id = alloc.next();
        let image_id = alloc.next();
        let content_id = alloc.next();
        page_ids.push(page_id);

        let width = chart.width as f32 * POINTS_PER_PIXEL;
        let height = chart.height as f32 * POINTS_PER_PIXEL;

        let mut page = pdf.page(page_id);
        page.media_box(Rect::new(0.0, 0.0, width, height));
        page.parent(page_tree_id);
        page.contents(content_id);
        page.resources().x_objects().pair(IMAGE_NAME, image_id);
        page.finish();

        let data = compress(&chart.pixels)?;
        let mut image = pdf.image_xobject(image_id, &data);
        image.filter(Filter::FlateDecode);
        image.width(chart.width as i32);
        image.height(chart.height as i32);
        image.color_space().device_rgb();
        image.bits_per_component(8);
        image.finish();

        // The image occupies the whole page
        let mut content = Content::new();
        content.save_state();
        content.transform([width, 0.0, 0.0, height, 0.0, 0.0]);
        content.x_object(IMAGE_NAME);
        content.restore_state();
        pdf.stream(content_id, &content.finish());
    }

    let page_count = page_ids.len() as i32;
    pdf.pages(page_tree_id).kids(page_ids).count(page_count);

    let bytes = pdf.finish();
    info!(pages = charts.len(), bytes = bytes.len(), "document exported");
    Ok(bytes)
}
