//! Derivo CLI - Close a registry's derived fields and expand requests
//!
//! Usage:
//!   derivo check [--schema <schema.toml>]
//!   derivo show <entity> [--field <name>] [--schema <schema.toml>]
//!   derivo expand <entity> --request '<json>' [--schema <schema.toml>]
//!
//! Examples:
//!   derivo check --schema demos/tasks.toml
//!   derivo show Task --field Label --schema demos/tasks.toml
//!   derivo expand Task --request '{"attributes": ["Label"]}' --schema demos/tasks.toml

use clap::{Parser, Subcommand};
use derivo::config::Settings;
use derivo::model::loader::load_registry;
use derivo::model::QueryRequest;
use derivo::{initialize_schema_with, ClosedSchema};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "derivo")]
#[command(about = "Derivo - derived-field requirement resolution")]
#[command(version)]
struct Cli {
    /// Path to a derivo.toml config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Registry document (.toml or .json); defaults to schema.path from the config
    #[arg(short, long, global = true)]
    schema: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Close every derived field and report the result
    Check,

    /// Print closed requirement sets as JSON
    Show {
        /// Entity name
        entity: String,

        /// Only this derived field
        #[arg(short, long)]
        field: Option<String>,
    },

    /// Expand a request against an entity
    Expand {
        /// Entity name
        entity: String,

        /// Request as inline JSON
        #[arg(short, long, conflicts_with = "request_file")]
        request: Option<String>,

        /// Request read from a JSON file
        #[arg(long)]
        request_file: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let schema = match load_schema(cli.config.as_ref(), cli.schema.as_ref()) {
        Ok(schema) => schema,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Check => cmd_check(&schema),
        Commands::Show { entity, field } => cmd_show(&schema, &entity, field.as_deref()),
        Commands::Expand {
            entity,
            request,
            request_file,
        } => cmd_expand(&schema, &entity, request, request_file),
    }
}

fn load_schema(config: Option<&PathBuf>, schema: Option<&PathBuf>) -> Result<ClosedSchema, String> {
    let settings = match config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    }
    .map_err(|e| format!("Config error: {}", e))?;

    let path = match schema {
        Some(path) => path.clone(),
        None => settings
            .schema_path()
            .map_err(|e| format!("Config error: {}", e))?
            .ok_or_else(|| "No schema given: pass --schema or set schema.path".to_string())?,
    };

    let registry = load_registry(&path)
        .map_err(|e| format!("Error loading '{}': {}", path.display(), e))?;
    initialize_schema_with(&registry, settings.limits).map_err(|e| format!("Schema error: {}", e))
}

fn cmd_check(schema: &ClosedSchema) -> ExitCode {
    let derived = schema.all_derived();
    for (field, requirements) in derived {
        println!("{}: {}", field, requirements);
    }
    println!();
    println!(
        "OK: {} entities, {} derived fields",
        schema.registry().len(),
        derived.len()
    );
    ExitCode::SUCCESS
}

fn cmd_show(schema: &ClosedSchema, entity: &str, field: Option<&str>) -> ExitCode {
    let fields = match field {
        Some(name) => match schema.requirements(entity, name) {
            Some(requirements) => vec![(name, requirements)],
            None => {
                eprintln!("'{}.{}' is not a derived field", entity, name);
                return ExitCode::FAILURE;
            }
        },
        None => schema.derived_fields(entity),
    };

    let map: serde_json::Map<String, serde_json::Value> = fields
        .into_iter()
        .filter_map(|(name, requirements)| {
            serde_json::to_value(requirements)
                .ok()
                .map(|value| (name.to_string(), value))
        })
        .collect();
    print_json(&serde_json::Value::Object(map))
}

fn cmd_expand(
    schema: &ClosedSchema,
    entity: &str,
    request: Option<String>,
    request_file: Option<PathBuf>,
) -> ExitCode {
    let source = match (request, request_file) {
        (Some(inline), _) => inline,
        (None, Some(path)) => match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        (None, None) => "{}".to_string(),
    };

    let request: QueryRequest = match serde_json::from_str(&source) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("Invalid request JSON: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match schema.expand(entity, &request) {
        Ok(expansion) => print_json(&expansion),
        Err(e) => {
            eprintln!("Expansion error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            ExitCode::FAILURE
        }
    }
}
