use crate::config::GuardConfig;
use crate::validator::OpenApiValidator;
use crate::ValidatingMiddleware;
use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use http::{Request, Response};
use std::cell::Cell;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "specguard")]
#[command(about = "Validate HTTP requests against an OpenAPI document", long_about = None)]
pub struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the servers and operations of a document
    Routes {
        #[arg(short, long)]
        spec: PathBuf,
    },
    /// Run one request through the middleware and report the outcome
    Check {
        #[arg(short, long)]
        spec: PathBuf,

        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Absolute URL or origin-form path, query included
        #[arg(short, long)]
        url: String,

        /// Request header as `Name: value`; repeatable
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Read the request body from a file
        #[arg(long, conflicts_with = "data")]
        body: Option<PathBuf>,

        /// Request body given inline
        #[arg(short, long)]
        data: Option<String>,
    },
}

/// Install a stderr `fmt` subscriber filtered by `RUST_LOG`.
pub fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let default_level = if verbose { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .context("Failed to initialize logging")?;
    Ok(())
}

fn build_request(
    method: &str,
    url: &str,
    headers: &[String],
    body: Vec<u8>,
) -> anyhow::Result<Request<Vec<u8>>> {
    let mut builder = Request::builder().method(method.to_ascii_uppercase().as_str()).uri(url);
    for header in headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| anyhow!("header `{header}` is not in `Name: value` form"))?;
        builder = builder.header(name.trim(), value.trim());
    }
    builder
        .body(body)
        .with_context(|| format!("invalid request {method} {url}"))
}

/// Run a parsed command, writing its report to `out`.
///
/// Returns whether the command succeeded; for `check` that means the request
/// would have been forwarded.
pub fn execute(cli: &Cli, out: &mut impl Write) -> anyhow::Result<bool> {
    match &cli.command {
        Commands::Routes { spec } => {
            let validator = OpenApiValidator::from_file(spec)?;
            let index = validator.index();
            writeln!(out, "{}", validator.spec().title())?;
            for server in index.server_urls() {
                writeln!(out, "server {server}")?;
            }
            for line in index.dump_routes() {
                writeln!(out, "{line}")?;
            }
            Ok(true)
        }
        Commands::Check {
            spec,
            method,
            url,
            headers,
            body,
            data,
        } => {
            let payload = match (body, data) {
                (Some(path), _) => std::fs::read(path)
                    .with_context(|| format!("failed to read body from {}", path.display()))?,
                (None, Some(data)) => data.clone().into_bytes(),
                (None, None) => Vec::new(),
            };
            let request = build_request(method, url, headers, payload)?;

            let validator = OpenApiValidator::from_file(spec)?;
            let guard = ValidatingMiddleware::with_config(validator, GuardConfig::from_env())?;

            let forwarded = Cell::new(false);
            let response = guard.handle(request, |_req| {
                forwarded.set(true);
                Response::new(Vec::new())
            });
            debug!(forwarded = forwarded.get(), status = response.status().as_u16(), "Check finished");

            if forwarded.get() {
                writeln!(out, "forwarded")?;
            } else {
                let message = String::from_utf8_lossy(response.body());
                writeln!(out, "{} {}", response.status().as_u16(), message)?;
            }
            Ok(forwarded.get())
        }
    }
}

/// Entry point of the `specguard` binary.
pub fn run_cli() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;
    let ok = execute(&cli, &mut std::io::stdout().lock())?;
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
