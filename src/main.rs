//! Command-line interface for relschema

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
use relschema::{Compiler, CompilerOptions, HashAlgorithm, HashWidth};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "relschema")]
#[command(author, version, about = "XML Schema to relational model compiler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile an XSD schema and display the relational model
    Compile {
        /// Path to the XSD schema file
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,

        /// Digest algorithm for content-addressable keys
        #[arg(long, default_value = "sha256")]
        hash: String,

        /// Stored key width (raw, binary, unsigned32, unsigned64)
        #[arg(long, default_value = "unsigned64")]
        width: String,

        /// Fold table and field names to lower case
        #[arg(long)]
        case_insensitive: bool,

        /// Skip xs:any / xs:anyAttribute wildcard fields
        #[arg(long)]
        no_wildcards: bool,

        /// Minimum content fields a nested table must keep
        #[arg(long, default_value_t = 1)]
        min_fields: usize,

        /// Output the full model as JSON
        #[arg(long)]
        json: bool,

        /// Output only the statistics summary
        #[arg(long)]
        stats: bool,
    },
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            schema,
            hash,
            width,
            case_insensitive,
            no_wildcards,
            min_fields,
            json,
            stats,
        } => {
            let Some(algorithm) = HashAlgorithm::from_str_value(&hash) else {
                eprintln!("unknown hash algorithm: {}", hash);
                std::process::exit(2);
            };
            let Some(width) = HashWidth::from_str_value(&width) else {
                eprintln!("unknown hash width");
                std::process::exit(2);
            };

            let options = CompilerOptions::new(algorithm, width)
                .with_case_sensitive(!case_insensitive)
                .with_wildcards(!no_wildcards)
                .with_minimum_fields(min_fields);

            let model = match Compiler::new(options).compile_file(&schema.to_string_lossy()) {
                Ok(model) => model,
                Err(e) => {
                    eprintln!("error: {}", e);
                    std::process::exit(1);
                }
            };

            if json {
                match serde_json::to_string_pretty(&model) {
                    Ok(out) => println!("{}", out),
                    Err(e) => {
                        eprintln!("error: {}", e);
                        std::process::exit(1);
                    }
                }
                return;
            }

            if stats {
                match serde_json::to_string_pretty(&model.stats()) {
                    Ok(out) => println!("{}", out),
                    Err(e) => {
                        eprintln!("error: {}", e);
                        std::process::exit(1);
                    }
                }
                return;
            }

            for table in model.tables_by_dependency() {
                println!(
                    "{} [{:?}] level={} fields={}{}{}",
                    table.storage_name,
                    table.kind,
                    table.level,
                    table.fields.len(),
                    if table.is_virtual { " virtual" } else { "" },
                    if table.list_holder { " list" } else { "" },
                );
                for field in &table.fields {
                    let ty = match field.scalar {
                        Some(scalar) => scalar.sql_type(),
                        None => model.hash.sql_type(),
                    };
                    println!(
                        "    {} {}{}",
                        field.storage_name,
                        ty,
                        if field.required { " not null" } else { "" },
                    );
                }
            }

            for diagnostic in &model.diagnostics {
                eprintln!("note: {}", diagnostic);
            }
        }
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("relschema was built without the 'cli' feature");
    std::process::exit(1);
}
