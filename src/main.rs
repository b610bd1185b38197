//! rfmforge: RFM customer segmentation CLI
//!
//! This is the main entrypoint that orchestrates data loading, scoring,
//! reporting and chart output.

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use rfmforge::{compute_rfm, load_transactions, viz, Args, RfmTable, Segment, Transaction};
use std::time::Instant;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let default_level = if args.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    if args.verbose {
        println!("rfmforge - Customer Segmentation using RFM scores");
        println!("=================================================\n");
    }

    // "now" is read exactly once for the whole run
    let reference = args.reference_instant()?;

    // Check if in single-customer mode
    if let Some(transactions) = args.manual_entry()? {
        run_manual_mode(&args, &transactions, reference)?;
    } else {
        run_full_pipeline(&args, reference)?;
    }

    Ok(())
}

/// Score a single manually entered customer
fn run_manual_mode(
    args: &Args,
    transactions: &[Transaction],
    reference: chrono::NaiveDateTime,
) -> Result<()> {
    println!("=== Single Customer Mode ===");
    println!("Transactions entered: {}", transactions.len());

    let table = compute_rfm(transactions, reference, args.bins)?;

    println!("\nSingle Customer RFM Metrics and Segmentation:");
    println!("{}", table.to_dataframe()?);

    Ok(())
}

/// Run full scoring pipeline on a CSV file
fn run_full_pipeline(args: &Args, reference: chrono::NaiveDateTime) -> Result<()> {
    println!("=== Full RFM Pipeline ===\n");

    let start_time = Instant::now();

    // Step 1: Load transactions
    let columns = args.column_mapping();
    if args.verbose {
        println!("Step 1: Loading transactions");
        println!("  Input file: {}", args.input);
        println!("  Customer ID column: {}", columns.customer_id);
        println!("  Transaction date column: {}", columns.transaction_date);
        println!("  Transaction value column: {}", columns.transaction_value);
    }

    let data_start = Instant::now();
    let transactions = load_transactions(&args.input, &columns)
        .with_context(|| format!("Failed to load transactions from {}", args.input))?;
    let data_time = data_start.elapsed();

    println!("✓ Data loaded: {} transactions", transactions.len());
    if args.verbose {
        println!("  Loading time: {:.2}s", data_time.as_secs_f64());
    }

    // Step 2: Score customers
    if args.verbose {
        println!("\nStep 2: Scoring customers");
        println!("  Reference instant: {}", reference);
        println!("  Bins per metric: {}", args.bins);
    }

    let score_start = Instant::now();
    let table = compute_rfm(&transactions, reference, args.bins)?;
    let score_time = score_start.elapsed();

    println!("✓ Scored {} customers", table.len());
    if args.verbose {
        println!("  Scoring time: {:.2}s", score_time.as_secs_f64());
    }

    // Step 3: Report
    print_tables(&table)?;
    viz::print_segment_statistics(&table);

    if let Some(ref output) = args.output {
        table
            .write_csv(output)
            .with_context(|| format!("Failed to write results to {}", output))?;
        println!("\nResults saved to: {}", output);
    }

    // Step 4: Charts
    if let Some(ref chart) = args.chart {
        if args.verbose {
            println!("\nStep 3: Generating charts");
            println!("  Output file: {}", chart);
        }
        viz::generate_visualization_report(&table, chart)?;
        println!("\n✓ Charts saved to: {} and {}", chart, viz::sizes_path(chart));
    }

    let total_time = start_time.elapsed();
    println!("\n=== Pipeline Complete ===");
    println!("Total processing time: {:.2}s", total_time.as_secs_f64());

    Ok(())
}

/// Print the full table, then one table per named segment
fn print_tables(table: &RfmTable) -> Result<()> {
    println!("\nRFM Metrics and Segmentation:");
    println!("{}", table.to_dataframe()?);

    println!("\nSegmented Customer Groups:");
    for segment in Segment::NAMED {
        println!("--- {} Customers ---", segment);
        println!("{}", table.segment_frame(segment)?);
    }

    Ok(())
}
