use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use std::path::{Path, PathBuf};

use ipmd_check::check::{CheckOutput, Checker};
use ipmd_check::compare::{Comparator, Discrepancy, DiscrepancyKind};
use ipmd_check::config;
use ipmd_check::schema::SchemaModel;

#[derive(Parser, Debug)]
#[command(
    name = "ipmd-check",
    version,
    about = "IPTC photo metadata checker: validate XMP, IIM and Exif values and compare images"
)]
struct Cli {
    /// ExifTool JSON of the image to check (`exiftool -j -G1 -struct`)
    #[arg(value_name = "SOURCE")]
    source: Option<PathBuf>,

    /// IPTC reference schema (JSON with `ipmd_top` and `ipmd_struct`)
    #[arg(short, long, value_name = "FILE")]
    schema: Option<PathBuf>,

    /// Pre-built state template (default: built from the schema)
    #[arg(short, long, value_name = "FILE")]
    template: Option<PathBuf>,

    /// ExifTool JSON of a derivative image to compare SOURCE with
    #[arg(long = "compare-with", value_name = "FILE")]
    compare_with: Option<PathBuf>,

    /// Path to config file (default: ipmd-check.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default ipmd-check.json and exit
    #[arg(long)]
    init: bool,

    /// Compare XMP with IIM and Exif and set the sync flags
    #[arg(long)]
    sync: bool,

    /// Output discrepancies as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let save_path = config::Config::default().save(cli.config.as_deref())?;
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    let Some(schema_path) = cli.schema.as_deref() else {
        anyhow::bail!("No reference schema specified. Use --schema FILE or --help for usage.");
    };
    let Some(source_path) = cli.source.as_deref() else {
        anyhow::bail!("No source metadata file specified. Use --help for usage.");
    };

    // Load config, CLI flags win
    let mut config = config::Config::load(cli.config.as_deref())?;
    if cli.sync {
        config.check.compare_formats = true;
    }
    if cli.json {
        config.output.json = true;
    }

    let schema_text = std::fs::read_to_string(schema_path)
        .with_context(|| format!("Failed to read schema {}", schema_path.display()))?;
    let schema = SchemaModel::from_json_str(&schema_text)
        .with_context(|| format!("Failed to load schema {}", schema_path.display()))?;
    log::info!(
        "Schema: {} properties, {} structures",
        schema.top.len(),
        schema.structs.len()
    );

    let template = cli.template.as_deref().map(read_json).transpose()?;
    let checker = match &template {
        Some(template) => Checker::with_template(&schema, template),
        None => Checker::new(&schema),
    }
    .options(config.check.clone());

    let reference = check_file(&checker, source_path)?;

    // Handle --compare-with
    if let Some(test_path) = cli.compare_with.as_deref() {
        let test = check_file(&checker, test_path)?;
        let rows = Comparator::new(&schema)
            .options(config.compare.clone())
            .compare(&reference, &test);

        if config.output.json {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        } else {
            print_discrepancies(source_path, test_path, &rows);
        }
        log::info!("Done: {} discrepancies", rows.len());
        return Ok(());
    }

    if config.output.include_state {
        println!("{}", serde_json::to_string_pretty(&reference)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&reference.value)?);
    }
    Ok(())
}

/// Read a JSON file.
fn read_json(path: &Path) -> Result<Value> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Read ExifTool output. ExifTool wraps each image in an array; the first
/// image is used.
fn read_metadata(path: &Path) -> Result<Value> {
    match read_json(path)? {
        Value::Array(images) => {
            if images.len() > 1 {
                log::warn!(
                    "{} holds {} images, checking the first",
                    path.display(),
                    images.len()
                );
            }
            images
                .into_iter()
                .next()
                .with_context(|| format!("No image metadata in {}", path.display()))
        }
        other => Ok(other),
    }
}

fn check_file(checker: &Checker<'_>, path: &Path) -> Result<CheckOutput> {
    log::info!("Checking: {}", path.display());
    let output = checker.check(&read_metadata(path)?);
    if output.is_empty() {
        anyhow::bail!("Nothing to check in {}", path.display());
    }
    Ok(output)
}

// ANSI color codes
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Max width for the value column before wrapping.
const VAL_WIDTH: usize = 46;
/// Width of the label column.
const TAG_WIDTH: usize = 22;
/// Indent for continuation lines (label column + " : " + 2 leading spaces).
const INDENT: &str = "                           ";

/// Print the comparison report as a table.
fn print_discrepancies(reference: &Path, test: &Path, rows: &[Discrepancy]) {
    println!();
    println!("{BOLD}Reference:{RESET} {}", reference.display());
    println!("{BOLD}Test:{RESET}      {}", test.display());
    println!("{DIM}{}{RESET}", "═".repeat(72));

    if rows.is_empty() {
        println!("  {DIM}(no discrepancies){RESET}");
        println!();
        return;
    }

    for row in rows {
        let color = match row.kind {
            DiscrepancyKind::ValueChanged => YELLOW,
            _ => RED,
        };
        println!("  {BOLD}{}{RESET}", row.name_path);
        print_row(row.kind.as_str(), &row.message, color);
        if let Some(format) = row.format {
            print_row("format", format.as_str(), DIM);
        }
        if let Some(value) = &row.ref_value {
            print_row("reference", &display_value(value), "");
        }
        if let Some(value) = &row.test_value {
            print_row("test", &display_value(value), "");
        }
        println!("  {DIM}{}{RESET}", "─".repeat(70));
    }

    println!("  {} discrepancies", rows.len());
    println!();
}

/// Print a single row in the report table.
fn print_row(tag: &str, val: &str, color: &str) {
    let tag_col = format!("{tag:<TAG_WIDTH$}");
    let lines = wrap_text(val, VAL_WIDTH);
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            println!("  {color}{tag_col} : {line}{RESET}");
        } else {
            println!("  {color}{INDENT}{line}{RESET}");
        }
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(display_value).collect::<Vec<_>>().join("; "),
        other => other.to_string(),
    }
}

/// Wrap text at word boundaries to fit within max_width.
fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in s.split_whitespace() {
        if current_line.is_empty() {
            current_line = word.to_string();
        } else if current_line.len() + 1 + word.len() <= max_width {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current_line));
            current_line.push_str(word);
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(s.to_string());
    }

    lines
}
