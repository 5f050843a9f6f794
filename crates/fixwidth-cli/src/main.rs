use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process;

use fixwidth_core::verifier::Severity;
use fixwidth_core::{description, Error, ParseOptions, Value};
use tracing_subscriber::EnvFilter;

/// fixwidth: fixed-width record definitions
///
/// Validate definitions, parse fixed-width files into JSON, and generate
/// fixed-width files from JSON.
#[derive(Parser)]
#[command(name = "fixwidth", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Only report errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a definition for unresolved references and structural problems
    Validate {
        /// Path to the JSON definition
        definition: PathBuf,
    },

    /// Print the line width of every schema
    Length {
        /// Path to the JSON definition
        definition: PathBuf,
        /// Only this schema
        schema: Option<String>,
    },

    /// Parse a fixed-width file and print the result as JSON
    Parse {
        /// Path to the JSON definition
        definition: PathBuf,
        /// Fixed-width input file
        input: PathBuf,
        /// Named top-level section to parse with
        #[arg(long)]
        section: Option<String>,
        /// Allow input left over after the last match
        #[arg(long)]
        no_verify: bool,
        /// Ignore blank lines
        #[arg(long)]
        skip_blank: bool,
    },

    /// Generate a fixed-width file from JSON data
    Generate {
        /// Path to the JSON definition
        definition: PathBuf,
        /// JSON data to format
        data: PathBuf,
        /// Named top-level section to generate with
        #[arg(long)]
        section: Option<String>,
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

/// Where and how results are reported
struct Report {
    json: bool,
    quiet: bool,
}

impl Report {
    fn success(&self, message: &str) {
        if !self.quiet && !self.json {
            println!("{} {}", "✓".green(), message);
        }
    }

    fn json(&self, value: &serde_json::Value) {
        println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
    }

    /// Report an error and pick the exit code: 2 for I/O, 1 for everything else
    fn failure(&self, error: &Error) -> i32 {
        if self.json {
            self.json(&serde_json::json!({ "success": false, "error": error.to_string() }));
        } else {
            eprintln!("{} {}", "error:".red().bold(), error);
        }
        match error {
            Error::Io(_) => 2,
            _ => 1,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let report = Report {
        json: cli.json,
        quiet: cli.quiet,
    };

    let exit_code = match cli.command {
        Commands::Validate { definition } => validate(&report, &definition),
        Commands::Length { definition, schema } => length(&report, &definition, schema.as_deref()),
        Commands::Parse {
            definition,
            input,
            section,
            no_verify,
            skip_blank,
        } => {
            let options = ParseOptions {
                verify_input: !no_verify,
                skip_blank,
                section,
            };
            parse(&report, &definition, &input, &options)
        }
        Commands::Generate {
            definition,
            data,
            section,
            output,
        } => generate(&report, &definition, &data, section.as_deref(), output.as_deref()),
        Commands::Version => {
            println!(
                "fixwidth {} (fixwidth-core {})",
                env!("CARGO_PKG_VERSION"),
                fixwidth_core::VERSION
            );
            0
        }
    };

    process::exit(exit_code);
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// ── Commands ──────────────────────────────────────────────

fn validate(report: &Report, path: &Path) -> i32 {
    let definition = match description::load_path(path) {
        Ok(definition) => definition,
        Err(e) => return report.failure(&e),
    };
    let result = definition.errors();
    let valid = result.is_valid();

    if report.json {
        report.json(&serde_json::json!({
            "valid": valid,
            "errors": result.errors().len(),
            "warnings": result.warnings().len(),
            "diagnostics": result.diagnostics.iter().map(|d| d.to_string()).collect::<Vec<_>>(),
        }));
    } else {
        for diagnostic in &result.diagnostics {
            let line = diagnostic.to_string();
            if diagnostic.severity == Severity::Error {
                eprintln!("{}", line.red());
            } else if !report.quiet {
                eprintln!("{}", line.yellow());
            }
        }
        if valid {
            report.success(&format!(
                "{} is valid ({} schemas, {} sections)",
                path.display(),
                definition.schemas().len(),
                definition.sections().len()
            ));
        }
    }
    if valid {
        0
    } else {
        1
    }
}

fn length(report: &Report, path: &Path, only: Option<&str>) -> i32 {
    let definition = match description::load_path(path) {
        Ok(definition) => definition,
        Err(e) => return report.failure(&e),
    };
    let names: Vec<&str> = match only {
        Some(name) => vec![name],
        None => definition.schemas().iter().map(|s| s.name()).collect(),
    };

    let mut lengths = serde_json::Map::new();
    for name in names {
        match definition.length(name) {
            Ok(length) => {
                lengths.insert(name.to_string(), length.into());
            }
            Err(e) => return report.failure(&e),
        }
    }
    if report.json {
        report.json(&serde_json::Value::Object(lengths));
    } else {
        for (name, length) in &lengths {
            println!("{:<24} {}", name, length);
        }
    }
    0
}

fn parse(report: &Report, definition: &Path, input: &Path, options: &ParseOptions) -> i32 {
    let result = description::load_path(definition).and_then(|definition| {
        let file = File::open(input)?;
        fixwidth_core::parse_reader(&definition, BufReader::new(file), options)
    });
    match result {
        Ok(value) => {
            report.json(&value.to_json());
            0
        }
        Err(e) => report.failure(&e),
    }
}

fn generate(
    report: &Report,
    definition: &Path,
    data: &Path,
    section: Option<&str>,
    output: Option<&Path>,
) -> i32 {
    let result = description::load_path(definition).and_then(|definition| {
        let data = read_data(data)?;
        match output {
            Some(path) => {
                let mut file = File::create(path)?;
                fixwidth_core::write(&mut file, &definition, &data, section)?;
                Ok(None)
            }
            None => fixwidth_core::generate(&definition, &data, section).map(Some),
        }
    });
    match result {
        Ok(Some(text)) => {
            println!("{}", text);
            0
        }
        Ok(None) => {
            if let Some(path) = output {
                report.success(&format!("wrote {}", path.display()));
            }
            0
        }
        Err(e) => report.failure(&e),
    }
}

fn read_data(path: &Path) -> Result<Value, Error> {
    let file = File::open(path)?;
    let json: serde_json::Value = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        Error::Format {
            target: path.display().to_string(),
            message: format!("invalid JSON data: {}", e),
        }
    })?;
    Ok(Value::from_json(&json))
}
