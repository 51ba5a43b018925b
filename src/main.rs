// this_file: src/main.rs
//! Quotecard CLI - render quote cards to files, in batches, or over HTTP

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info};
use quotecard::batch::{self, BatchRunner};
use quotecard::config::Config;
use quotecard::server::{AppState, QuoteServer};
use quotecard::source::SourceMode;
use quotecard::{build_source, logging, Encoder, JpegEncoder, QuoteRenderer};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Quotecard - quote cards on photo backgrounds
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Set log level (error, warn, info, debug, trace)
    #[arg(short = 'l', long, global = true)]
    log_level: Option<String>,

    /// Enable quiet mode (only errors)
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// JSON configuration file
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one card to a JPEG file
    Render {
        /// Quote text (configured default when omitted)
        quote: Option<String>,

        /// Author name (configured default when omitted)
        author: Option<String>,

        /// Output path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Use the local fallback photo instead of Unsplash
        #[arg(long)]
        local: bool,
    },

    /// Serve GET /generate over HTTP
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,

        /// Use the local fallback photo instead of Unsplash
        #[arg(long)]
        local: bool,
    },

    /// Render every job of a JSON batch spec, printing JSONL results
    Batch {
        /// Input file (uses stdin if not specified)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output directory for rendered cards
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Use the local fallback photo instead of Unsplash
        #[arg(long)]
        local: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = cli.log_level.as_deref().unwrap_or(logging::default_level());
    logging::init_logging(log_level, cli.quiet, true);

    let load_config = || Config::load(cli.config.as_deref());

    match cli.command {
        Commands::Render {
            quote,
            author,
            output,
            local,
        } => {
            let mut config = load_config()?;
            if local {
                config.source.mode = SourceMode::Local;
            }
            let output = output.unwrap_or_else(|| config.output.clone().into_std_path_buf());
            config.validate()?;
            render_card(&config, quote, author, &output)?;
        }
        Commands::Serve { host, port, local } => {
            let mut config = load_config()?;
            if local {
                config.source.mode = SourceMode::Local;
            }
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;
            serve(config)?;
        }
        Commands::Batch {
            input,
            output,
            local,
        } => {
            let mut config = load_config()?;
            if local {
                config.source.mode = SourceMode::Local;
            }
            config.validate()?;
            run_batch(&config, input, &output)?;
        }
        Commands::Version => {
            println!("quotecard version {}", quotecard::VERSION);
            println!("Quote cards on photo backgrounds");
        }
    }

    Ok(())
}

fn render_card(
    config: &Config,
    quote: Option<String>,
    author: Option<String>,
    output: &Path,
) -> Result<()> {
    let renderer = QuoteRenderer::from_config(config)?;
    let source = build_source(&config.source)?;
    let encoder = JpegEncoder::new(config.jpeg_quality);

    let quote = config.defaults.quote(quote, author);
    let image = source.fetch().and_then(|src| renderer.compose_quote_image(&quote, &src));
    let surface = match image {
        Ok(surface) => surface,
        Err(e) => {
            error!("Failed to generate quote image: {}", e);
            return Err(e.into());
        }
    };
    let bytes = encoder.encode_to_vec(&surface)?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(output, bytes).with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Image saved to {}", output.display());
    Ok(())
}

fn serve(config: Config) -> Result<()> {
    let state = AppState {
        renderer: QuoteRenderer::from_config(&config)?,
        source: build_source(&config.source)?,
        encoder: Box::new(JpegEncoder::new(config.jpeg_quality)),
        defaults: config.defaults.clone(),
    };
    let addr = format!("{}:{}", config.server.host, config.server.port);
    QuoteServer::bind(&addr, state)?.run()?;
    Ok(())
}

fn run_batch(config: &Config, input: Option<PathBuf>, output_dir: &Path) -> Result<()> {
    let json = match input {
        Some(path) => fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let spec = match batch::parse_batch_spec(&json) {
        Ok(spec) => spec,
        Err(e) => {
            error!("Failed to parse batch specification: {}", e);
            return Err(e.into());
        }
    };
    info!("Processing {} jobs", spec.jobs.len());

    let renderer = QuoteRenderer::from_config(config)?;
    let source = build_source(&config.source)?;
    let encoder = JpegEncoder::new(config.jpeg_quality);
    let runner = BatchRunner::new(&renderer, source.as_ref(), &encoder, &config.defaults);

    let results = runner.run(&spec, output_dir)?;
    for result in &results {
        println!("{}", batch::serialize_job_result(result)?);
    }

    let failed = results.iter().filter(|r| !r.is_success()).count();
    if failed > 0 {
        bail!("{} of {} job(s) failed", failed, results.len());
    }
    Ok(())
}
