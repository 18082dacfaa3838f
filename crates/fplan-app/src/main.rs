//! fplan 命令行工具
//!
//! 校验、规范化和检查磁盘上的布局文件。`.fplan` 为紧凑二进制格式，其他扩展名按 JSON 处理。

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use fplan_core::report::{Severity, ValidationResult};
use fplan_core::snapshot::LayoutSnapshot;
use fplan_core::validation::{ValidationConfig, Validator};
use fplan_file::codec;
use fplan_file::{BuiltinTemplates, TemplateCatalog};

#[derive(Parser)]
#[command(name = "fplan")]
#[command(about = "Facility layout validation and inspection")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a layout and print the report
    Validate {
        file: PathBuf,
        /// Validation config (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Only check required fields
        #[arg(long)]
        quick: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rewrite a layout in canonical form
    Normalize {
        input: PathBuf,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List equipment after array expansion
    Expand { file: PathBuf },

    /// List built-in templates
    Templates,
}

fn is_compact(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("fplan"))
}

fn read_snapshot(path: &Path) -> Result<LayoutSnapshot> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    if is_compact(path) {
        return codec::decode(&bytes).with_context(|| format!("failed to decode {}", path.display()));
    }
    let text = String::from_utf8(bytes).with_context(|| format!("{} is not UTF-8", path.display()))?;
    LayoutSnapshot::from_json_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn load_validator(config: Option<&Path>) -> Result<Validator> {
    let config = match config {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str::<ValidationConfig>(&text)
                .with_context(|| format!("invalid validation config {}", path.display()))?
        }
        None => ValidationConfig::default(),
    };
    debug!("Validation config: {:?}", config);
    Ok(Validator::new(config))
}

fn run_validation(validator: &Validator, path: &Path, quick: bool) -> Result<ValidationResult> {
    if is_compact(path) {
        let snapshot = read_snapshot(path)?;
        return Ok(if quick {
            validator.quick_validate(&snapshot)
        } else {
            validator.validate(&snapshot)
        });
    }

    let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let value: serde_json::Value = match serde_json::from_str(&text) {
        Ok(value) => value,
        // 不是合法 JSON 时交给校验器报告结构错误
        Err(_) => serde_json::Value::String(text),
    };
    if quick {
        match LayoutSnapshot::from_json_value(value.clone()) {
            Ok(snapshot) => return Ok(validator.quick_validate(&snapshot)),
            Err(e) => debug!("Quick check falls back to full JSON validation: {}", e),
        }
    }
    Ok(validator.validate_json(&value))
}

fn print_report(result: &ValidationResult) {
    for entry in &result.errors {
        let label = match entry.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN ",
        };
        println!("{} [{}] {}", label, entry.kind.code(), entry.message());
    }
    println!("{}", result.summary);
}

fn cmd_validate(file: &Path, config: Option<&Path>, quick: bool, json: bool) -> Result<ExitCode> {
    let validator = load_validator(config)?;
    let result = run_validation(&validator, file, quick)?;
    info!(
        "Validated {}: {} error(s), {} warning(s)",
        file.display(),
        result.stats.error_count,
        result.stats.warning_count
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_report(&result);
    }
    Ok(if result.valid { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn cmd_normalize(input: &Path, output: Option<&Path>) -> Result<()> {
    let snapshot = read_snapshot(input)?;
    match output {
        Some(path) if is_compact(path) => {
            let bytes = codec::encode(&snapshot)?;
            fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        Some(path) => {
            fs::write(path, snapshot.to_json_string_pretty()?)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => println!("{}", snapshot.to_json_string_pretty()?),
    }
    Ok(())
}

fn cmd_expand(file: &Path) -> Result<()> {
    let snapshot = read_snapshot(file)?;
    let instances = snapshot.equipment_instances();
    println!("{:<20} {:>8} {:>8} {:>7} {:>7} {:>6}  name", "id", "x", "y", "width", "depth", "rot");
    for e in &instances {
        println!(
            "{:<20} {:>8.3} {:>8.3} {:>7.3} {:>7.3} {:>6.1}  {}",
            e.id, e.x, e.y, e.width, e.depth, e.rotation, e.name
        );
    }
    println!("{} equipment", instances.len());
    Ok(())
}

fn cmd_templates() {
    let catalog = BuiltinTemplates::new();
    for template in catalog.list() {
        println!("{:<16} {}", template.name, template.description);
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // 初始化日志
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .finish(),
    )?;

    match cli.command {
        Command::Validate {
            file,
            config,
            quick,
            json,
        } => cmd_validate(&file, config.as_deref(), quick, json),
        Command::Normalize { input, output } => {
            cmd_normalize(&input, output.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Expand { file } => {
            cmd_expand(&file)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Templates => {
            cmd_templates();
            Ok(ExitCode::SUCCESS)
        }
    }
}
