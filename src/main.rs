//! Main application entry point and runtime management.
//!
//! This module handles:
//! * Command line argument parsing
//! * Logging configuration
//! * Configuration loading and topology construction
//! * Application lifecycle and graceful shutdown
//!
//! # Runtime Behavior
//!
//! The application:
//! 1. Loads and validates the TOML configuration
//! 2. Builds every input, output and formatter chain and registers them
//!    with the router
//! 3. Starts the router tasks and the HTTP server
//! 4. Waits for Ctrl-C or SIGTERM and winds everything down through one
//!    cancellation token
//!
//! # Error Handling
//!
//! Configuration errors terminate immediately with a non-zero exit; a
//! router or server task ending early is treated the same way. Everything
//! else (poll failures, rejected pushes, failed deliveries) is logged
//! and the process keeps running.

use std::{collections::HashMap, net::SocketAddr, process, sync::Arc, time::Duration};

use clap::{command, Parser, ValueHint};
use log::{debug, error, info, LevelFilter};
use tokio_util::sync::CancellationToken;

use airtext::{
    config::{Config, InputType, OutputType},
    error::{Error, Result},
    format, http,
    input::{url::UrlInputConfig, DynamicInput, Input, TextInput, UrlInput},
    output::{FileOutput, HttpOutput, IcecastOutput, Output, PadOutput, WebhookOutput},
    router::Router,
    server::{self, AppState},
    signal,
};

/// Group name for mutually exclusive logging options.
///
/// Used by clap to ensure -q (quiet) and -v (verbose) flags
/// cannot be used together.
const ARGS_GROUP_LOGGING: &str = "logging";

/// Command line arguments as parsed by `clap`.
///
/// All options can be set via environment variables with
/// the `AIRTEXT_` prefix.
#[derive(Clone, Debug, Default, PartialEq, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath, default_value_t = String::from("airtext.toml"), env = "AIRTEXT_CONFIG")]
    config: String,

    /// Address to serve the push and polling endpoints on
    ///
    /// Overrides the [server] section of the configuration file.
    #[arg(short, long, env = "AIRTEXT_BIND")]
    bind: Option<String>,

    /// Suppress all output except warnings and errors
    #[arg(short, long, default_value_t = false, group = ARGS_GROUP_LOGGING, env = "AIRTEXT_QUIET")]
    quiet: bool,

    /// Enable verbose logging
    ///
    /// Use -v for debug logging
    /// Use -vv for trace logging
    #[arg(short, long, action = clap::ArgAction::Count, group = ARGS_GROUP_LOGGING, env = "AIRTEXT_VERBOSE")]
    verbose: u8,
}

/// Initialize logging system.
///
/// Configures logging based on command line arguments and environment:
/// * `-q` sets Warning level
/// * `-v` sets Debug level
/// * `-vv` sets Trace level
/// * `RUST_LOG` environment variable provides defaults
/// * External crates are limited to Error level unless tracing
///
/// # Panics
///
/// Panics if logger is already initialized.
fn init_logger(config: &Args) {
    let mut logger = env_logger::Builder::from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let mut external_level = LevelFilter::Error;
    if config.quiet || config.verbose > 0 {
        let level = match config.verbose {
            0 => {
                // Quiet and verbose are mutually exclusive, and `verbose` is 0
                // by default. So this arm means: quiet mode.
                LevelFilter::Warn
            }
            1 => LevelFilter::Debug,
            _ => LevelFilter::max(),
        };

        logger.filter_module(module_path!(), level);
        logger.filter_module("airtext", level);

        if level == LevelFilter::Trace {
            external_level = LevelFilter::max();
        }
    };

    // Filter log messages of external crates.
    for external_module in ["axum", "h2", "hyper", "reqwest", "rustls", "tower"] {
        logger.filter_module(external_module, external_level);
    }

    logger.init();
}

/// Builds the router and server state from the configuration.
///
/// # Errors
///
/// Returns error on any invalid entry: duplicate names, unknown formatter
/// or input references, missing per-type fields.
fn build(config: &Config) -> Result<(Router, AppState)> {
    let mut router = Router::new();
    let client = Arc::new(http::Client::new()?);

    let mut dynamic_inputs = HashMap::new();
    for input in &config.inputs {
        let handle: Arc<dyn Input> = match input.kind {
            InputType::Text => Arc::new(TextInput::new(
                &input.name,
                input.text.clone().unwrap_or_default(),
            )),
            InputType::Dynamic => {
                let dynamic = Arc::new(DynamicInput::new(
                    &input.name,
                    input.secret.clone(),
                    input.expiration_minutes,
                ));
                dynamic_inputs.insert(input.name.clone(), Arc::clone(&dynamic));
                dynamic
            }
            InputType::Url => {
                let url = input.url.clone().ok_or_else(|| {
                    Error::invalid_argument(format!("url entry {} requires url", input.name))
                })?;
                let title_path = input.title_path.clone().ok_or_else(|| {
                    Error::invalid_argument(format!("url entry {} requires title_path", input.name))
                })?;
                Arc::new(UrlInput::new(
                    &input.name,
                    UrlInputConfig {
                        url,
                        poll_interval: Duration::from_secs(input.poll_interval),
                        title_path,
                        artist_path: input.artist_path.clone(),
                        song_id_path: input.song_id_path.clone(),
                        duration_path: input.duration_path.clone(),
                        fallback_lifetime: input
                            .expiration_minutes
                            .map(|minutes| Duration::from_secs(minutes * 60)),
                    },
                    Arc::clone(&client),
                ))
            }
        };

        router.add_input(handle)?;
        router.set_input_affixes(&input.name, input.prefix.clone(), input.suffix.clone())?;
        router.set_input_formatters(&input.name, format::chain_from_names(&input.formatters)?)?;
    }

    let mut http_outputs = HashMap::new();
    for output in &config.outputs {
        let delay = Duration::from_secs(output.delay);
        let missing = |field: &str| {
            Error::invalid_argument(format!("output {} requires {field}", output.name))
        };

        let handle: Arc<dyn Output> = match output.kind {
            OutputType::File => Arc::new(FileOutput::new(
                &output.name,
                delay,
                output.path.clone().ok_or_else(|| missing("path"))?,
            )),
            OutputType::Pad => Arc::new(PadOutput::new(
                &output.name,
                delay,
                output.path.clone().ok_or_else(|| missing("path"))?,
            )),
            OutputType::Icecast => Arc::new(IcecastOutput::new(
                &output.name,
                delay,
                Arc::clone(&client),
                output.server.clone().ok_or_else(|| missing("server"))?,
                output.mount.clone().ok_or_else(|| missing("mount"))?,
                output.username.clone().ok_or_else(|| missing("username"))?,
                output.password.clone().ok_or_else(|| missing("password"))?,
            )),
            OutputType::Webhook => Arc::new(WebhookOutput::new(
                &output.name,
                delay,
                Arc::clone(&client),
                output.url.clone().ok_or_else(|| missing("url"))?,
            )),
            OutputType::Http => {
                let http_output = Arc::new(HttpOutput::new(&output.name, delay));
                http_outputs.insert(output.name.clone(), Arc::clone(&http_output));
                http_output
            }
        };

        router.add_output(handle)?;
        router.set_output_inputs(&output.name, &output.inputs)?;
        router.set_output_formatters(&output.name, format::chain_from_names(&output.formatters)?)?;
    }

    Ok((
        router,
        AppState {
            inputs: dynamic_inputs,
            outputs: http_outputs,
        },
    ))
}

/// Main application loop.
///
/// Loads the configuration, starts the router and the HTTP server, and
/// waits for a shutdown signal or for either task to end early.
///
/// # Errors
///
/// Returns error if the configuration is invalid, the listener cannot
/// bind, or a core task fails.
async fn run(args: Args) -> Result<()> {
    info!("loading configuration from {}", args.config);
    let config = Config::load(&args.config)?;
    let (router, state) = build(&config)?;

    let bind: SocketAddr = args
        .bind
        .as_deref()
        .unwrap_or(&config.server.bind)
        .parse()?;

    let shutdown = CancellationToken::new();
    let router = Arc::new(router);
    let mut router_task = tokio::spawn(Arc::clone(&router).run(shutdown.clone()));
    let mut server_task = tokio::spawn(server::serve(bind, Arc::new(state), shutdown.clone()));
    let mut signals = signal::Handler::new()?;

    let result = tokio::select! {
        biased;

        signal = signals.recv() => {
            info!("received {signal}, shutting down");
            Ok(())
        }

        result = &mut router_task => result.map_err(Error::internal)?,

        result = &mut server_task => result.map_err(Error::internal)?,
    };

    shutdown.cancel();
    if !router_task.is_finished() {
        let _ = router_task.await;
    }
    if !server_task.is_finished() {
        let _ = server_task.await;
    }
    result
}

/// Application entry point.
///
/// Sets up the environment and manages the application lifecycle:
/// 1. Parses command line arguments
/// 2. Initializes logging
/// 3. Runs the router until shutdown
///
/// Exits with status code:
/// - 0 for clean shutdown
/// - 1 if an error occurs
#[tokio::main]
async fn main() {
    // `clap` handles our command line arguments and help text.
    let args = Args::parse();
    init_logger(&args);

    // Dump command line arguments before we do anything more.
    // This aids in debugging of whatever comes next.
    debug!("Command {args:#?}");

    let cmd = command!();
    info!(
        "starting {}/{}",
        cmd.get_name(),
        cmd.get_version().unwrap_or("UNKNOWN")
    );

    match run(args).await {
        Ok(()) => {
            info!("shut down gracefully");
        }
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    }
}
