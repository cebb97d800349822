//! Sheetmerge - append every data file of a directory to its workbook
//!
//! Configured through the environment (a `.env` file is read first):
//!
//! ```bash
//! SHEETMERGE_DIR=/data/exports sheetmerge
//! SHEETMERGE_CONFIG=sheetmerge.json sheetmerge
//! SHEETMERGE_REPORT=report.json SHEETMERGE_LOG=warning sheetmerge
//! ```

use sheetmerge::logs::CONSOLE;
use sheetmerge::{merge_directory, MergeConfig, MergeReport};
use std::fs;
use std::path::Path;

const ENV_REPORT: &str = "SHEETMERGE_REPORT";

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    if let Err(e) = run() {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = MergeConfig::from_env()?;
    let report = merge_directory(&config)?;

    print_summary(&report);

    if let Ok(path) = std::env::var(ENV_REPORT) {
        if !path.trim().is_empty() {
            write_report(&report, Path::new(path.trim()))?;
        }
    }

    Ok(())
}

fn print_summary(report: &MergeReport) {
    println!("\n📊 Appended {} sheet(s)", report.sheets.len());
    if let Some(ref output) = report.output {
        println!("   Workbook: {}", output.display());
    }

    let renamed = report.renamed_files();
    if renamed.is_empty() {
        println!("   No sheet needed a lower-case name");
    } else {
        println!("\nFiles copied under a lower-case sheet name:");
        for file in renamed {
            println!("   {} → {}", file, file.to_lowercase());
        }
    }

    let warnings = CONSOLE.warning_count();
    if warnings > 0 {
        println!("   ⚠️  {} warning(s)", warnings);
    }

    println!("\n✨ Done!");
}

fn write_report(report: &MergeReport, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)?;
    println!("💾 Report written to: {}", path.display());
    Ok(())
}
