//! ChurnBoard: telecom customer churn dashboard CLI
//!
//! This is the main entrypoint that loads the customer table, applies the
//! selected filters, and renders and exports the chart views.

use anyhow::Result;
use churnboard::{summary, Args, Dashboard, Frame};
use clap::Parser;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();
    init_logging(args.verbose);

    if args.verbose {
        println!("ChurnBoard - Telecom Customer Churn Analysis");
        println!("============================================\n");
    }

    let start_time = Instant::now();

    // Step 1: Load data
    if args.verbose {
        println!("Step 1: Loading customer records");
        println!("  Input file: {}", args.input.display());
    }
    let load_start = Instant::now();
    let dashboard = Dashboard::load(&args.input)?;
    println!("✓ Data loaded: {} customers", dashboard.store().len());
    if args.verbose {
        println!("  Loading time: {:.2}s", load_start.elapsed().as_secs_f64());
    }

    // Step 2: Apply filters and recompute every view
    let filters = args.filter_set(dashboard.domains())?;
    let frame = dashboard.interact(&filters)?;
    print_filter_summary(&frame, dashboard.store().len());

    if args.preview > 0 {
        print_preview(&frame, args.preview);
    }

    println!("\n=== Churn Rate by Tenure and Monthly Charges ===");
    print!("{}", frame.grid);

    if args.summary {
        print_insights(&frame);
        println!("\n{}", summary::narrative());
    }

    // Step 3: Optional outputs
    if let Some(path) = &args.filtered_csv {
        frame.write_filtered_csv(path)?;
        println!("\n✓ Filtered dataset saved to: {}", path.display());
    }

    if let Some(dir) = &args.png_dir {
        let paths = frame.save_pngs(dir)?;
        println!("✓ {} chart images saved to: {}", paths.len(), dir.display());
    }

    // Step 4: Export
    if args.verbose {
        println!("\nStep 4: Exporting charts");
        println!("  Output file: {}", args.output.display());
    }
    let export_start = Instant::now();
    frame.write_pdf(&args.output)?;
    println!("✓ Charts exported to: {}", args.output.display());
    if args.verbose {
        println!("  Export time: {:.2}s", export_start.elapsed().as_secs_f64());
    }

    println!("\n=== Done ===");
    println!("Total processing time: {:.2}s", start_time.elapsed().as_secs_f64());

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_filter_summary(frame: &Frame<'_>, total: usize) {
    let rows = frame.view.len();
    let churned = frame.view.churned_count();
    let percentage = if total == 0 {
        0.0
    } else {
        rows as f64 / total as f64 * 100.0
    };

    println!("\n=== Filtered Dataset ===");
    println!("Matching customers: {} of {} ({:.1}%)", rows, total, percentage);
    if rows > 0 {
        println!(
            "Churned: {} ({:.1}%)",
            churned,
            churned as f64 / rows as f64 * 100.0
        );
    } else {
        println!("No customers match the selected filters");
    }
}

fn print_preview(frame: &Frame<'_>, limit: usize) {
    println!("\n=== Dataset Preview ===");
    println!(
        "  {:<12} | {:<6} | {:>6} | {:>6} | {:>8} | {:<16} | {:<5}",
        "customerID", "gender", "senior", "tenure", "charges", "Contract", "Churn"
    );
    println!("  {}", "-".repeat(80));
    for record in frame.view.iter().take(limit) {
        println!(
            "  {:<12} | {:<6} | {:>6} | {:>6} | {:>8.2} | {:<16} | {:<5}",
            record.customer_id,
            record.gender,
            record.senior_label(),
            record.tenure,
            record.monthly_charges,
            record.contract,
            record.churn
        );
    }
}

fn print_insights(frame: &Frame<'_>) {
    println!("\n=== Insights ===");
    for chart in &frame.charts {
        let marker = if chart.is_empty() { " (no data)" } else { "" };
        println!("{}{}: {}", chart.title, marker, chart.kind.insight());
    }
}
