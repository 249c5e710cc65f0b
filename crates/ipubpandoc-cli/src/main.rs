//! ipubpandoc: CLI tool to filter markdown into LaTeX, RST or HTML

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use ipub_ast::{OutputFormat, render, to_json_string};
use ipub_batch::{BatchOptions, convert_directory};
use ipub_filters::{
    Bibliography, FilterSettings, InputFormat, OptionOverrides, Pipeline, Source, filter_document,
};

use config::{CONFIG_FILE_NAME, Config};

#[derive(Parser, Debug)]
#[command(name = "ipubpandoc")]
#[command(about = "Resolve citations, labels and raw markup in markdown for LaTeX, RST or HTML")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
#[command(after_help = "Examples:
  ipubpandoc doc.md                    # Convert to doc.tex
  ipubpandoc doc.md -t rst -o doc.rst  # Convert to RST
  ipubpandoc doc.md -t html --json     # Write the filtered pandoc JSON
  ipubpandoc notes/ -o build/ -j4      # Convert a directory with 4 jobs
  ipubpandoc init                      # Write a sample _ipubpandoc.toml")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input markdown (or JSON) file or directory
    input: Option<PathBuf>,

    /// Output file or directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Target format: latex, rst or html
    #[arg(short = 't', long = "to")]
    to: Option<OutputFormat>,

    /// Write the filtered document as pandoc JSON
    #[arg(long)]
    json: bool,

    /// Input format: markdown or json
    #[arg(long)]
    from: Option<InputFormat>,

    /// Number of parallel jobs (defaults to number of CPUs)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Process directories recursively
    #[arg(short, long)]
    recursive: bool,

    /// Use :numref: instead of :ref: for RST references
    #[arg(long)]
    use_numref: bool,

    /// Do not interpret @label prefixes and attribute blocks
    #[arg(long)]
    no_at_notation: bool,

    /// LaTeX command for internal links
    #[arg(long)]
    reftag: Option<String>,

    /// Drop raw content written for another format
    #[arg(long)]
    hide_raw: bool,

    /// Leave raw LaTeX/RST/HTML markup alone
    #[arg(long)]
    no_convert_raw: bool,

    /// Remove document metadata from the output
    #[arg(long)]
    strip_meta: bool,

    /// CSL-JSON or BibTeX (.bib) bibliography for HTML citations
    #[arg(long)]
    bibliography: Option<PathBuf>,

    /// Configuration file (defaults to _ipubpandoc.toml next to the input)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode - only show errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a sample _ipubpandoc.toml to the current directory
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the JSON schema of the configuration file
    Schema,
}

/// Settings resolved from the command line and the configuration file
struct Settings {
    format: OutputFormat,
    from: InputFormat,
    json: bool,
    filters: FilterSettings,
}

impl Cli {
    /// Options given as flags; only flags that were set override anything
    fn overrides(&self) -> OptionOverrides {
        OptionOverrides {
            use_numref: self.use_numref.then_some(true),
            at_notation: self.no_at_notation.then_some(false),
            reftag: self.reftag.clone(),
            hide_raw: self.hide_raw.then_some(true),
            convert_raw: self.no_convert_raw.then_some(false),
            strip_meta: self.strip_meta.then_some(true),
            ..Default::default()
        }
    }

    fn load_config(&self, input: &Path) -> Result<(Config, PathBuf)> {
        if let Some(path) = &self.config {
            let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
            return Ok((Config::load(path)?, base));
        }
        let dir = if input.is_dir() {
            input.to_path_buf()
        } else {
            input.parent().map(Path::to_path_buf).unwrap_or_default()
        };
        let config = Config::load_from_dir(&dir)?.unwrap_or_default();
        Ok((config, dir))
    }

    fn settings(&self, input: &Path) -> Result<Settings> {
        let (config, base) = self.load_config(input)?;

        let format = match (self.to, &config.output.format) {
            (Some(format), _) => format,
            (None, Some(name)) => name
                .parse::<OutputFormat>()
                .with_context(|| format!("Invalid output format in {CONFIG_FILE_NAME}"))?,
            (None, None) => OutputFormat::Latex,
        };
        let from = match (self.from, &config.output.from) {
            (Some(from), _) => from,
            (None, Some(name)) => name
                .parse::<InputFormat>()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("Invalid input format in {CONFIG_FILE_NAME}"))?,
            (None, None) => InputFormat::Markdown,
        };

        let mut filters = FilterSettings::new()
            .with_layer(self.overrides())
            .with_layer(config.pandoc.overrides());
        let bibliography = match (&self.bibliography, &config.pandoc.bibliography) {
            (Some(path), _) => Some(path.clone()),
            (None, Some(path)) => Some(base.join(path)),
            (None, None) => None,
        };
        if let Some(path) = bibliography {
            let bibliography = Bibliography::load(&path)
                .with_context(|| format!("Failed to load bibliography: {}", path.display()))?;
            tracing::debug!(entries = bibliography.len(), "Loaded bibliography");
            filters = filters.with_bibliography(Arc::new(bibliography));
        }

        Ok(Settings {
            format,
            from,
            json: self.json || config.output.json.unwrap_or(false),
            filters,
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match &cli.command {
        Some(Commands::Init { force }) => return init_config(*force),
        Some(Commands::Schema) => {
            println!("{}", Config::json_schema_string()?);
            return Ok(());
        }
        None => {}
    }

    let Some(input) = cli.input.as_deref() else {
        anyhow::bail!("No input given; see --help");
    };
    if !input.exists() {
        anyhow::bail!("Input path does not exist: {}", input.display());
    }
    let settings = cli.settings(input)?;

    if input.is_file() {
        convert_file(input, cli.output.as_deref(), &settings, cli.quiet)
    } else {
        convert_dir(input, &cli, settings)
    }
}

/// `-v` and `-q` win over `RUST_LOG`, which wins over the default level
fn init_logging(verbose: bool, quiet: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn init_config(force: bool) -> Result<()> {
    let path = PathBuf::from(CONFIG_FILE_NAME);
    if path.exists() && !force {
        anyhow::bail!("{CONFIG_FILE_NAME} already exists; use --force to overwrite");
    }
    let content = Config::sample().to_toml_with_schema()?;
    fs::write(&path, content).with_context(|| format!("Failed to write: {}", path.display()))?;
    println!("{}", path.display());
    Ok(())
}

/// Convert a single file
fn convert_file(input: &Path, output: Option<&Path>, settings: &Settings, quiet: bool) -> Result<()> {
    let extension = if settings.json {
        "json"
    } else {
        settings.format.extension()
    };
    let output_path = match output {
        Some(p) => p.to_path_buf(),
        None => input.with_extension(extension),
    };
    if output_path == input {
        anyhow::bail!("Refusing to overwrite the input file: {}", input.display());
    }

    tracing::debug!(input = %input.display(), output = %output_path.display(), "Converting");

    let content = fs::read_to_string(input)
        .with_context(|| format!("Failed to read: {}", input.display()))?;

    let doc = filter_document(
        Source::Text(&content),
        settings.from,
        &Pipeline::standard(),
        settings.format,
        &settings.filters,
    )
    .with_context(|| format!("Failed to convert: {}", input.display()))?;
    let out = if settings.json {
        to_json_string(&doc)?
    } else {
        render(&doc, settings.format)
    };

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(&output_path, &out)
        .with_context(|| format!("Failed to write: {}", output_path.display()))?;

    if !quiet {
        println!("{}", output_path.display());
    }

    Ok(())
}

/// Convert a directory of markdown files
fn convert_dir(input: &Path, cli: &Cli, settings: Settings) -> Result<()> {
    if settings.from == InputFormat::Json {
        anyhow::bail!("Directory input only supports markdown files");
    }
    let options = BatchOptions {
        output_dir: cli.output.clone().unwrap_or_else(|| input.to_path_buf()),
        format: settings.format,
        json: settings.json,
        recursive: cli.recursive,
        parallel_jobs: cli.jobs,
        settings: settings.filters,
        ..Default::default()
    };

    let result = convert_directory(input, &options)
        .with_context(|| format!("Failed to convert directory: {}", input.display()))?;

    if !cli.quiet {
        for path in &result.converted {
            println!("{}", path.display());
        }
    }
    for (file, e) in &result.failed {
        eprintln!("Error converting {}: {}", file.display(), e);
    }
    if !cli.quiet {
        eprintln!(
            "Converted {} files, {} failed",
            result.converted.len(),
            result.failed.len()
        );
    }

    if !result.failed.is_empty() {
        anyhow::bail!("{} files failed to convert", result.failed.len());
    }

    Ok(())
}
