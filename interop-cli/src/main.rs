use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use fs_err as fs;
use serde::Serialize;
use serde_json::json;

use interop_core::{
    init, Config, ConversionRegistry, DataFrame, Dates, Datetimes, DomainConverter, Factor,
    OnConflict, Origin, RegularSeries, SparseMatrix, TypedValue, XtsSeries, CONFIG_FILE_NAME,
};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Writes an `interop.toml` with default settings to the current directory
    Init {
        /// `reject` or `overwrite`
        #[clap(long, default_value = "reject")]
        on_conflict: String,
    },
    /// Lists the converters of the configured registry
    Converters,
    /// Describes a JSON-encoded value
    Inspect { file: PathBuf },
    /// Projects a JSON-encoded value into a domain type and lifts it back
    Convert {
        file: PathBuf,
        /// Converter name, e.g. `sparse-col` or `data-frame`
        #[clap(long = "as")]
        target: String,
    },
}

#[derive(Parser)]
#[clap(version, author, about, subcommand_negates_reqs = true)]
pub struct Cli {
    /// Output results as JSON
    #[clap(long, global = true)]
    pub json: bool,

    /// Read configuration from this file instead of searching for `interop.toml`
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Serialize)]
struct Inspection {
    kind: String,
    length: usize,
    class: Vec<String>,
    dim: Option<Vec<usize>>,
    attributes: Vec<String>,
}

impl Inspection {
    fn of(value: &TypedValue) -> Self {
        Inspection {
            kind: value.shape_name(),
            length: value.length(),
            class: value.class(),
            dim: value.dim(),
            attributes: value.attributes().keys(),
        }
    }
}

fn load_config(explicit: Option<&Path>, current_dir: &Path) -> Result<Config> {
    if let Some(path) = explicit {
        return Ok(Config::load(path)?);
    }
    match Config::find(current_dir) {
        Some(config) => Ok(config?),
        None => {
            log::debug!("Using default configuration");
            Ok(Config::default())
        }
    }
}

fn read_value(path: &Path) -> Result<TypedValue> {
    let content = fs::read_to_string(path)?;
    TypedValue::from_json(&content).map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))
}

/// Project into `T`, describe it, then lift it back.
fn round_trip<T: 'static>(
    registry: &ConversionRegistry,
    value: &TypedValue,
    describe: impl Fn(&T) -> String,
) -> Result<(String, TypedValue)> {
    let native: T = registry.project(value)?;
    let summary = describe(&native);
    Ok((summary, registry.lift(native)?))
}

fn convert(registry: &ConversionRegistry, value: &TypedValue, target: DomainConverter) -> Result<(String, TypedValue)> {
    match target {
        DomainConverter::SparseCol => round_trip(registry, value, |m: &SparseMatrix| {
            format!(
                "sparse-col {}x{} with {} non-zeros (sum {})",
                m.nrow(),
                m.ncol(),
                m.nnz(),
                m.sum()
            )
        }),
        DomainConverter::Date => round_trip(registry, value, |d: &NaiveDate| format!("date {}", d)),
        DomainConverter::Dates => round_trip(registry, value, |d: &Dates| {
            let missing = d.0.iter().filter(|d| d.is_none()).count();
            format!("{} dates ({} NA)", d.0.len(), missing)
        }),
        DomainConverter::Datetime => {
            round_trip(registry, value, |dt: &DateTime<Utc>| format!("datetime {}", dt.to_rfc3339()))
        }
        DomainConverter::Datetimes => round_trip(registry, value, |d: &Datetimes| {
            format!("{} datetimes in {}", d.len(), d.tzone.as_deref().unwrap_or("the default zone"))
        }),
        DomainConverter::Xts => round_trip(registry, value, |s: &XtsSeries| {
            format!(
                "xts {}x{} indexed by {}",
                s.data().nrow(),
                s.data().ncol(),
                s.index_class()
            )
        }),
        DomainConverter::Ts => round_trip(registry, value, |s: &RegularSeries| {
            format!(
                "ts of {} observations from {} at frequency {}",
                s.len(),
                s.start(),
                s.frequency()
            )
        }),
        DomainConverter::Factor => round_trip(registry, value, |f: &Factor| {
            format!("factor of {} values over {} levels", f.len(), f.levels().len())
        }),
        DomainConverter::DataFrame => round_trip(registry, value, |f: &DataFrame| {
            format!(
                "data frame {}x{} ({})",
                f.nrow(),
                f.ncol(),
                f.column_names().join(", ")
            )
        }),
    }
}

fn try_main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let current_dir = std::env::current_dir()?;

    match cli.command {
        Command::Init { on_conflict } => {
            let config_path = current_dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                bail!("Configuration already exists in {}", current_dir.display());
            }
            let config = Config {
                on_conflict: on_conflict.parse::<OnConflict>()?,
                ..Config::default()
            };
            config.save(&current_dir)?;
            if cli.json {
                println!("{}", json!({"status": "initialized", "path": config_path}));
            } else {
                println!("Wrote {}", config_path.display());
            }
        }
        Command::Converters => {
            let config = load_config(cli.config.as_deref(), &current_dir)?;
            let registry = init(&config)?;
            let converters = registry.registered();
            if cli.json {
                println!("{}", serde_json::to_string(&converters)?);
            } else {
                for info in converters {
                    let origin = match info.origin {
                        Origin::Builtin => "builtin",
                        Origin::Custom => "custom",
                    };
                    println!("{} ({})", info.type_name, origin);
                }
            }
        }
        Command::Inspect { file } => {
            let value = read_value(&file)?;
            let inspection = Inspection::of(&value);
            if cli.json {
                println!("{}", serde_json::to_string(&inspection)?);
            } else {
                println!("kind: {}", inspection.kind);
                println!("length: {}", inspection.length);
                if !inspection.class.is_empty() {
                    println!("class: {}", inspection.class.join(", "));
                }
                if let Some(dim) = &inspection.dim {
                    let dim: Vec<String> = dim.iter().map(ToString::to_string).collect();
                    println!("dim: {}", dim.join(" x "));
                }
                if !inspection.attributes.is_empty() {
                    println!("attributes: {}", inspection.attributes.join(", "));
                }
            }
        }
        Command::Convert { file, target } => {
            let target: DomainConverter = target.parse()?;
            let config = load_config(cli.config.as_deref(), &current_dir)?;
            let registry = init(&config)?;
            let value = read_value(&file)?;
            let (summary, lifted) = convert(&registry, &value, target)?;
            if cli.json {
                println!("{}", json!({"summary": summary, "value": lifted}));
            } else {
                println!("{}", summary);
                println!("{}", lifted.to_json_pretty()?);
            }
        }
    }
    Ok(())
}

fn main() {
    if let Err(e) = try_main() {
        eprintln!("{e:?}");
        ::std::process::exit(1)
    }
}
