//! Command-line interface for validatelet

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand, ValueEnum};

#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
use validatelet::{DatatypeRegistry, EncodedSchema, Limits, Schema, TextSensitivity};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "validatelet")]
#[command(author, version, about = "Validate XML documents against precompiled RELAX NG grammars", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LimitsPreset {
    Default,
    Strict,
    Permissive,
}

#[cfg(feature = "cli")]
impl LimitsPreset {
    fn limits(self) -> Limits {
        match self {
            LimitsPreset::Default => Limits::default(),
            LimitsPreset::Strict => Limits::strict(),
            LimitsPreset::Permissive => Limits::permissive(),
        }
    }
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate XML documents against an encoded schema
    Validate {
        /// Path to the encoded schema (JSON)
        #[arg(short, long, value_name = "SCHEMA")]
        schema: PathBuf,

        /// XML files to validate
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Resource limits
        #[arg(short, long, value_enum, default_value = "default")]
        limits: LimitsPreset,
    },

    /// Decode an encoded schema and display its structure
    Inspect {
        /// Path to the encoded schema (JSON)
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,

        /// List the name literals
        #[arg(long)]
        names: bool,

        /// List every state with its transition counts
        #[arg(long)]
        states: bool,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Validate {
            schema,
            files,
            limits,
        } => cmd_validate(schema, files, limits.limits()),
        Commands::Inspect {
            schema,
            names,
            states,
            json,
        } => cmd_inspect(schema, names, states, json),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

#[cfg(feature = "cli")]
fn init_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "cli")]
fn load_schema(path: &PathBuf, limits: Limits) -> Result<Schema, Box<dyn std::error::Error>> {
    let encoded = EncodedSchema::load(path)?;
    Ok(Schema::with_limits(&encoded, &DatatypeRegistry::with_xsd(), limits)?)
}

/// Returns `Ok(false)` when at least one document is invalid
#[cfg(feature = "cli")]
fn cmd_validate(schema_path: PathBuf, files: Vec<PathBuf>, limits: Limits) -> Result<bool, Box<dyn std::error::Error>> {
    let schema = load_schema(&schema_path, limits)?;

    let mut all_valid = true;
    for file in &files {
        match validatelet::validate_file(&schema, file) {
            Ok(()) => println!("✓ {} is valid", file.display()),
            Err(e) if e.is_rejection() => {
                all_valid = false;
                println!("✗ {} is invalid", file.display());
                println!("  - {}", e);
            }
            Err(e) => return Err(format!("{}: {}", file.display(), e).into()),
        }
    }

    Ok(all_valid)
}

#[cfg(feature = "cli")]
fn cmd_inspect(schema_path: PathBuf, show_names: bool, show_states: bool, json_output: bool) -> Result<bool, Box<dyn std::error::Error>> {
    let encoded = EncodedSchema::load(&schema_path)?;
    let schema = Schema::new(&encoded, &DatatypeRegistry::with_xsd())?;

    if json_output {
        print_schema_json(&schema, &encoded, show_names, show_states)?;
    } else {
        print_schema_summary(&schema, &encoded);

        if show_names {
            println!("\n=== Name Literals ===");
            for (qname, code) in schema.names().iter() {
                println!("  {:>6}  {}", code, qname);
            }
        }

        if show_states {
            println!("\n=== States ===");
            for state in schema.states() {
                println!(
                    "  {:>6}  {}{} {:<15} att={} data={} element={} interleave={} list={} no_att={} value={}",
                    state.id(),
                    if state.is_final() { "F" } else { "-" },
                    if state.is_persistent() { "P" } else { "-" },
                    state.text_sensitivity(),
                    state.att().len(),
                    state.data().len(),
                    state.element().len(),
                    state.interleave().len(),
                    state.list().len(),
                    state.no_att().len(),
                    state.value().len(),
                );
            }
        }
    }

    Ok(true)
}

#[cfg(feature = "cli")]
fn print_schema_summary(schema: &Schema, encoded: &EncodedSchema) {
    println!("validatelet v{}", validatelet::VERSION);
    println!();
    println!("Schema Information:");
    println!("  Default Name Code: {}", schema.names().default_code());
    println!(
        "  Datatype Libraries: {}",
        library_namespaces(encoded).join(", ")
    );
    println!();
    println!("Statistics:");
    println!("  States: {}", schema.states().len());
    println!("  Final States: {}", schema.states().iter().filter(|s| s.is_final()).count());
    println!("  Name Literals: {}", schema.names().len());
    println!("  Interleaves: {}", schema.interleave_count());
    println!("  Datatypes: {}", encoded.datatypes.len());
    println!("  Value Literals: {}", encoded.value_literals.len());
    println!(
        "  Text-Sensitive States: {}",
        schema
            .states()
            .iter()
            .filter(|s| s.text_sensitivity() == TextSensitivity::Sensitive)
            .count()
    );
}

#[cfg(feature = "cli")]
fn library_namespaces(encoded: &EncodedSchema) -> Vec<String> {
    let mut namespaces: Vec<String> = encoded
        .datatypes
        .iter()
        .map(|d| {
            if d.namespace_uri.is_empty() {
                "(built-in)".to_string()
            } else {
                d.namespace_uri.clone()
            }
        })
        .collect();
    namespaces.sort();
    namespaces.dedup();
    if namespaces.is_empty() {
        namespaces.push("(none)".to_string());
    }
    namespaces
}

#[cfg(feature = "cli")]
fn print_schema_json(
    schema: &Schema,
    encoded: &EncodedSchema,
    include_names: bool,
    include_states: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    use serde_json::{json, Map, Value};

    let mut output = Map::new();
    output.insert("version".to_string(), json!(validatelet::VERSION));
    output.insert("defaultNameCode".to_string(), json!(schema.names().default_code()));

    let mut stats = Map::new();
    stats.insert("states".to_string(), json!(schema.states().len()));
    stats.insert(
        "finalStates".to_string(),
        json!(schema.states().iter().filter(|s| s.is_final()).count()),
    );
    stats.insert("nameLiterals".to_string(), json!(schema.names().len()));
    stats.insert("interleaves".to_string(), json!(schema.interleave_count()));
    stats.insert("datatypes".to_string(), json!(encoded.datatypes.len()));
    stats.insert("valueLiterals".to_string(), json!(encoded.value_literals.len()));
    output.insert("statistics".to_string(), Value::Object(stats));

    if include_names {
        let names: Vec<Value> = schema
            .names()
            .iter()
            .map(|(qname, code)| {
                json!({
                    "namespace": qname.namespace,
                    "localName": qname.local_name,
                    "code": code,
                })
            })
            .collect();
        output.insert("names".to_string(), Value::Array(names));
    }

    if include_states {
        let states: Vec<Value> = schema
            .states()
            .iter()
            .map(|state| {
                json!({
                    "id": state.id().0,
                    "final": state.is_final(),
                    "persistent": state.is_persistent(),
                    "text": state.text_sensitivity().to_string(),
                    "transitions": {
                        "att": state.att().len(),
                        "data": state.data().len(),
                        "element": state.element().len(),
                        "interleave": state.interleave().len(),
                        "list": state.list().len(),
                        "noAtt": state.no_att().len(),
                        "value": state.value().len(),
                    },
                })
            })
            .collect();
        output.insert("states".to_string(), Value::Array(states));
    }

    let json_str = serde_json::to_string_pretty(&Value::Object(output))?;
    println!("{}", json_str);

    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
