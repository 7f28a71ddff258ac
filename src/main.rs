//! AgriSmart command-line client.
//!
//! Sends one request to a configured remote service through the retry
//! executor and prints the JSON response on stdout. Logs go to stderr.
//!
//! ```text
//! agrismart call weather weather -q lat=-1.2921 -q lon=36.8219 -q units=metric --require main.temp
//! agrismart call inference crop_rec --post '{"n":90,"p":42,"k":43}' --non-empty predictions
//! agrismart call llm chat/completions --post @request.json --require choices.0.message
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::builder::PossibleValuesParser;
use clap::{Args, Parser, Subcommand};
use serde_json::Value;

use agrismart::config::loader::load_or_default;
use agrismart::config::validation::LOG_LEVELS;
use agrismart::config::{AppConfig, AuthConfig};
use agrismart::observability::{logging, metrics};
use agrismart::remote::validators::{require_fields, require_non_empty};
use agrismart::resilience::Validation;
use agrismart::{RemoteRequest, RetryExecutor, ServiceRegistry};

#[derive(Parser)]
#[command(name = "agrismart")]
#[command(about = "Resilient client for the AgriSmart weather, inference and LLM services", long_about = None)]
struct Cli {
    /// TOML configuration file (built-in defaults when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured log level
    #[arg(long, ignore_case = true, value_parser = PossibleValuesParser::new(LOG_LEVELS.iter().copied()))]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured services
    Services,
    /// Validate the configuration and exit
    CheckConfig,
    /// Call a service through the retry executor
    Call(CallArgs),
}

#[derive(Args)]
struct CallArgs {
    /// Configured service name
    service: String,

    /// Path relative to the service base URL
    path: String,

    /// Send a POST with this JSON body (`@file` reads it from a file)
    #[arg(long, value_name = "JSON")]
    post: Option<String>,

    /// Query parameter, repeatable
    #[arg(short, long = "query", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    query: Vec<(String, String)>,

    /// Field that must be present in the response, repeatable
    #[arg(short, long = "require", value_name = "FIELD")]
    require: Vec<String>,

    /// Field that must be a non-empty array, object or string
    #[arg(long, value_name = "FIELD")]
    non_empty: Option<String>,

    /// Make a single attempt (POSTs are otherwise retried)
    #[arg(long)]
    once: bool,

    /// Override the maximum number of attempts
    #[arg(long)]
    attempts: Option<u32>,

    /// Override the base backoff delay
    #[arg(long)]
    base_delay_ms: Option<u64>,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    Ok((key.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    if let Some(level) = cli.log_level {
        config.observability.log_level = level.to_ascii_lowercase();
    }

    logging::init(&config.observability);

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        services = config.services.len(),
        max_attempts = config.retries.max_attempts,
        base_delay_ms = config.retries.base_delay_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    match cli.command {
        Commands::Services => {
            for (name, service) in &config.services {
                println!(
                    "{:<12} {} (auth: {}, attempts: {})",
                    name,
                    service.base_url,
                    auth_scheme(&service.auth),
                    config.retries_for(name).max_attempts
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::CheckConfig => {
            println!("Configuration OK ({} services)", config.services.len());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Call(args) => run_call(&config, args).await,
    }
}

async fn run_call(config: &AppConfig, args: CallArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let registry = ServiceRegistry::from_config(config)?;
    let mut service = registry.get(&args.service)?.clone();

    if args.attempts.is_some() || args.base_delay_ms.is_some() {
        let mut options = service.executor().options().clone();
        if let Some(attempts) = args.attempts {
            options.max_attempts = attempts;
        }
        if let Some(delay) = args.base_delay_ms {
            options.base_delay_ms = delay;
        }
        service = service.with_executor(RetryExecutor::new(options));
    }

    let mut request = match &args.post {
        Some(body) => {
            let body = match body.strip_prefix('@') {
                Some(path) => std::fs::read_to_string(path)?,
                None => body.clone(),
            };
            let body: Value = serde_json::from_str(&body)?;
            RemoteRequest::post(&args.path, body).idempotent()
        }
        None => RemoteRequest::get(&args.path),
    };
    for (key, value) in args.query {
        request = request.query(key, value);
    }
    if args.once {
        request.idempotent = false;
    }

    let required = require_fields(&args.require);
    let non_empty = args.non_empty.as_deref().map(require_non_empty);
    let validate = move |value: &Value| -> Validation {
        required(value)?;
        if let Some(check) = &non_empty {
            check(value)?;
        }
        Ok(())
    };

    match service.call_validated(&request, validate).await {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn auth_scheme(auth: &AuthConfig) -> &'static str {
    match auth {
        AuthConfig::None => "none",
        AuthConfig::Bearer { .. } => "bearer",
        AuthConfig::Query { .. } => "query",
    }
}
