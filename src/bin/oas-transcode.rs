//! OpenAPI Transcoder CLI
//!
//! Command-line interface for schema-driven encoding and decoding of JSON
//! payloads, and for matching and expanding URI templates.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use oas_transcode::{
    decode, encode, load_json, navigate_fragment, ParamDefinition, SchemaNode, SchemaRegistry,
    StructuredValue, TranscodeOptions, UriTemplate,
};
use serde::Serialize;
use tracing::debug;

#[derive(Parser)]
#[command(name = "oas-transcode")]
#[command(about = "Schema-driven JSON transcoding and URI template routing for OpenAPI documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a tagged structured value as a JSON payload
    Encode {
        /// OpenAPI document (JSON)
        document: PathBuf,

        /// Schema to apply: a components.schemas name or a #/json/pointer
        #[arg(long, short)]
        schema: String,

        /// Structured value file in tagged form (e.g. {"record": {...}})
        value: PathBuf,

        /// Strict mode: reject fields the schema does not declare (default: false)
        #[arg(long, default_value_t = false, action = clap::ArgAction::Set)]
        strict: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Decode a JSON payload into a tagged structured value
    Decode {
        /// OpenAPI document (JSON)
        document: PathBuf,

        /// Schema to apply: a components.schemas name or a #/json/pointer
        #[arg(long, short)]
        schema: String,

        /// JSON payload file
        payload: PathBuf,

        /// Strict mode: reject fields the schema does not declare (default: false)
        #[arg(long, default_value_t = false, action = clap::ArgAction::Set)]
        strict: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Check whether a URI matches a template (exit 0 on match, 1 otherwise)
    Match {
        /// URI template, e.g. /users/{id}?active={active}
        template: String,

        /// Candidate URI
        uri: String,
    },

    /// Expand a URI template with parameter values
    Expand {
        /// URI template, e.g. /users/{id}
        template: String,

        /// Parameter value as name=value (repeatable)
        #[arg(long = "param", short, value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Declare a required parameter (repeatable)
        #[arg(long = "required")]
        required: Vec<String>,

        /// Declare an optional parameter (repeatable)
        #[arg(long = "optional")]
        optional: Vec<String>,
    },
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Encode {
            document,
            schema,
            value,
            strict,
            pretty,
            output,
        } => run_encode(&document, &schema, &value, strict, pretty, output),

        Commands::Decode {
            document,
            schema,
            payload,
            strict,
            pretty,
            output,
        } => run_decode(&document, &schema, &payload, strict, pretty, output),

        Commands::Match { template, uri } => run_match(&template, &uri),

        Commands::Expand {
            template,
            params,
            required,
            optional,
        } => run_expand(&template, params, required, optional),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
}

fn run_encode(
    document_path: &Path,
    selector: &str,
    value_path: &Path,
    strict: bool,
    pretty: bool,
    output: Option<PathBuf>,
) -> Result<(), u8> {
    let (registry, schema) = load_schema(document_path, selector)?;

    let raw = load_json(value_path).map_err(|e| {
        eprintln!("Error loading value: {}", e);
        e.exit_code() as u8
    })?;
    let value: StructuredValue = serde_json::from_value(raw).map_err(|e| {
        eprintln!("Error: invalid structured value: {}", e);
        2u8
    })?;

    let options = TranscodeOptions::new().strict(strict);
    let encoded = encode(&registry, &schema, &value, &options).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    write_output(&encoded, pretty, output)
}

fn run_decode(
    document_path: &Path,
    selector: &str,
    payload_path: &Path,
    strict: bool,
    pretty: bool,
    output: Option<PathBuf>,
) -> Result<(), u8> {
    let (registry, schema) = load_schema(document_path, selector)?;

    let payload = load_json(payload_path).map_err(|e| {
        eprintln!("Error loading payload: {}", e);
        e.exit_code() as u8
    })?;

    let options = TranscodeOptions::new().strict(strict);
    let decoded = decode(&registry, &schema, &payload, &options).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    write_output(&decoded, pretty, output)
}

fn run_match(pattern: &str, uri: &str) -> Result<(), u8> {
    let template = UriTemplate::new(pattern).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    if template.matches(uri) {
        println!("match");
        Ok(())
    } else {
        println!("no match");
        Err(1)
    }
}

fn run_expand(
    pattern: &str,
    params: Vec<(String, String)>,
    required: Vec<String>,
    optional: Vec<String>,
) -> Result<(), u8> {
    let template = UriTemplate::new(pattern).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let mut definitions = HashMap::new();
    for name in optional {
        definitions.insert(name, ParamDefinition::optional());
    }
    // Required wins when a name is declared both ways
    for name in required {
        definitions.insert(name, ParamDefinition::required());
    }
    let values: HashMap<String, String> = params.into_iter().collect();

    let resolved = template.resolve(&definitions, &values).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    println!("{}", resolved);
    Ok(())
}

/// Load the document, build its registry and pick the schema named by
/// `selector`: a `#/...` pointer into the document, or a component name.
fn load_schema(document_path: &Path, selector: &str) -> Result<(SchemaRegistry, SchemaNode), u8> {
    let document = load_json(document_path).map_err(|e| {
        eprintln!("Error loading document: {}", e);
        e.exit_code() as u8
    })?;

    let registry = SchemaRegistry::from_document(&document).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let schema = if selector.starts_with('#') {
        let target = navigate_fragment(&document, selector).map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;
        SchemaNode::from_value(target).map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?
    } else {
        registry
            .lookup(selector)
            .map_err(|e| {
                eprintln!("Error: {}", e);
                2u8
            })?
            .clone()
    };

    debug!(
        schemas = registry.len(),
        selector,
        kind = schema.kind_name(),
        "schema selected"
    );
    Ok((registry, schema))
}

fn write_output<T: Serialize>(value: &T, pretty: bool, output: Option<PathBuf>) -> Result<(), u8> {
    let json_output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{}'", s))
}
