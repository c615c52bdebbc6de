use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use nesting_core::{LeftoverReason, Nester, NestingRequest, NestingResult};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nester")]
#[command(about = "Plate Nesting - Lay out flat-stock parts on the fewest stock sheets", long_about = None)]
struct Cli {
    /// Log search and allocation progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Nest parts onto stock sheets
    Nest {
        /// Input file (YAML or JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for result (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Clearance between parts in mm (overrides the input file)
        #[arg(long)]
        gap: Option<f64>,

        /// Disable 90° part rotation
        #[arg(long)]
        no_rotate: bool,

        /// Maximum number of sheets to commit (overrides the input file)
        #[arg(long)]
        max_sheets: Option<u32>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    match cli.command {
        Commands::Nest {
            input,
            output,
            gap,
            no_rotate,
            max_sheets,
        } => {
            let mut request = load_request(&input)?;
            if let Some(gap) = gap {
                request.gap = gap;
            }
            if no_rotate {
                request.allow_rotation = false;
            }
            if let Some(max_sheets) = max_sheets {
                request.max_sheets = max_sheets;
            }
            nest_command(request, output)?;
        }
    }

    Ok(())
}

fn load_request(input: &Path) -> Result<NestingRequest> {
    println!("{}", "🔍 Loading input...".bright_blue());

    let content = std::fs::read_to_string(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let extension = input.extension().and_then(|s| s.to_str());
    let request: NestingRequest = if extension == Some("yaml") || extension == Some("yml") {
        serde_yaml::from_str(&content)?
    } else {
        serde_json::from_str(&content)?
    };

    Ok(request)
}

fn nest_command(request: NestingRequest, output: Option<PathBuf>) -> Result<()> {
    println!(
        "  {} parts to cut",
        request.parts.len().to_string().bright_white().bold()
    );
    println!(
        "  {} stock sizes available",
        request.stock_sizes.len().to_string().bright_white().bold()
    );
    println!(
        "  gap {} mm, rotation {}",
        request.gap.to_string().bright_white(),
        if request.allow_rotation { "on" } else { "off" }
    );
    println!();

    println!("{}", "🚀 Running nesting...".bright_blue());

    let nester = Nester::new(request)?;
    let result = nester.nest()?;

    println!();
    if result.is_complete() {
        println!("{}", "✅ Nesting complete!".bright_green().bold());
    } else {
        println!(
            "{}",
            "⚠️  Nesting finished with unplaced parts".bright_yellow().bold()
        );
    }
    println!();

    print_result(&result);

    let json = serde_json::to_string_pretty(&result)?;
    if let Some(output_path) = output {
        std::fs::write(&output_path, json)?;
        println!(
            "💾 Saved result to {}",
            output_path.display().to_string().bright_white()
        );
    } else {
        println!("{}", json);
    }

    Ok(())
}

fn print_result(result: &NestingResult) {
    println!("{}", "📊 Results:".bright_yellow().bold());
    println!("  Stock to purchase:");
    for purchase in &result.stock_purchase_summary {
        println!(
            "    • {} ({} x {}): {} sheets",
            purchase.stock_name.bright_white(),
            purchase.width,
            purchase.length,
            purchase.count
        );
    }
    println!();

    for sheet in &result.sheets {
        println!(
            "  Sheet {} [{} {}]: {} parts, {:.1}% used",
            sheet.index,
            sheet.stock_name,
            sheet.thickness,
            sheet.placements.len(),
            sheet.utilization * 100.0
        );
    }
    println!();

    println!("  Bill of materials:");
    for entry in &result.bill_of_materials {
        println!(
            "    • {} [{}] {} x {}: {} pcs, {:.0} mm²",
            entry.base_identifier.bright_white(),
            entry.thickness,
            entry.width,
            entry.length,
            entry.quantity,
            entry.total_area
        );
    }
    println!();

    println!(
        "  Total sheets: {}",
        result
            .summary
            .sheets_used
            .to_string()
            .bright_white()
            .bold()
    );
    println!(
        "  Utilization: {}",
        format!("{:.1}%", result.overall_utilization * 100.0).bright_white()
    );
    println!(
        "  Total waste: {}",
        format!("{:.1}%", result.summary.waste_percentage).bright_white()
    );

    if !result.leftover.is_empty() {
        println!();
        println!("  Unplaced parts:");
        for left in &result.leftover {
            let reason = match left.reason {
                LeftoverReason::Unplaceable => "larger than every stock size",
                LeftoverReason::CeilingReached => "sheet limit reached",
                LeftoverReason::NoFit => "no stock size fits",
            };
            println!(
                "    • {} [{}] {} x {}: {} pcs ({})",
                left.base_identifier.bright_red(),
                left.thickness,
                left.width,
                left.length,
                left.quantity,
                reason
            );
        }
    }

    println!();
}
