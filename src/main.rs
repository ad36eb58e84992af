use bytes::Bytes;
use clap::{Parser, Subcommand};
use lambda_warmer::config::{DEFAULT_CONCURRENCY_FIELD, DEFAULT_FLAG};
use lambda_warmer::{FileConfig, HttpInvoker, InvocationType, InvokeRequest, Invoker, WarmerError};
use tracing_subscriber::EnvFilter;

/// Lambda Warmer: send warming pings to serverless functions
#[derive(Parser)]
#[command(name = "lambda-warmer", version, about)]
struct Cli {
    /// Path to configuration file (.hcl)
    #[arg(short, long, default_value = "warmer.hcl", global = true)]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one warming ping to a function
    Ping {
        /// Target function name (overrides invoker.function_name)
        #[arg(short, long)]
        function: Option<String>,

        /// Number of concurrent environments to warm
        #[arg(short = 'n', long, default_value_t = 1)]
        concurrency: u32,

        /// Invoke API endpoint (overrides invoker.endpoint)
        #[arg(short, long)]
        endpoint: Option<String>,
    },
    /// Validate a configuration file
    Validate,
}

#[tokio::main]
async fn main() -> lambda_warmer::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    match cli.command {
        Commands::Validate => validate_config(&cli.config).await,
        Commands::Ping {
            function,
            concurrency,
            endpoint,
        } => {
            let config = load_config(&cli.config).await?;
            send_ping(config, function, concurrency, endpoint).await
        }
    }
}

/// Load the config file if it exists, otherwise defaults
async fn load_config(path: &str) -> lambda_warmer::Result<FileConfig> {
    let config = if std::path::Path::new(path).exists() {
        tracing::info!(config = path, "Loading configuration");
        FileConfig::from_file(path).await?
    } else {
        tracing::debug!(config = path, "Config file not found, using defaults");
        FileConfig::default()
    };
    config.validate()?;
    Ok(config)
}

/// Send a synchronous warming ping, the way a scheduled rule would
async fn send_ping(
    mut config: FileConfig,
    function: Option<String>,
    concurrency: u32,
    endpoint: Option<String>,
) -> lambda_warmer::Result<()> {
    if let Some(endpoint) = endpoint {
        config.invoker.endpoint = endpoint;
    }
    let function_name = function
        .or_else(|| config.invoker.function_name.clone())
        .ok_or_else(|| {
            WarmerError::Config(
                "no target function: pass --function or set invoker.function_name".to_string(),
            )
        })?;

    let flag = config.warmer.flag.as_deref().unwrap_or(DEFAULT_FLAG);
    let concurrency_field = config
        .warmer
        .concurrency
        .as_deref()
        .unwrap_or(DEFAULT_CONCURRENCY_FIELD);
    let mut event = serde_json::Map::new();
    event.insert(flag.to_string(), serde_json::Value::Bool(true));
    event.insert(concurrency_field.to_string(), serde_json::Value::from(concurrency));

    let invoker = HttpInvoker::from_config(&config.invoker)?;
    tracing::info!(
        function = %function_name,
        concurrency,
        url = %invoker.invoke_url(&function_name),
        "Sending warming ping"
    );

    let outcome = invoker
        .invoke(InvokeRequest {
            function_name: function_name.clone(),
            invocation_type: InvocationType::RequestResponse,
            index: 1,
            payload: Bytes::from(serde_json::to_vec(&serde_json::Value::Object(event))?),
        })
        .await?;

    println!(
        "✓ Warmed '{}' (concurrency {}, status {})",
        function_name, concurrency, outcome.status_code
    );
    if !outcome.payload.is_empty() {
        println!("  Response: {}", String::from_utf8_lossy(&outcome.payload));
    }
    Ok(())
}

/// Validate a configuration file and print diagnostics
async fn validate_config(path: &str) -> lambda_warmer::Result<()> {
    if !std::path::Path::new(path).exists() {
        eprintln!("✗ Config file not found: {}", path);
        std::process::exit(1);
    }

    let config = match FileConfig::from_file(path).await {
        Ok(c) => {
            println!("✓ Config parsed successfully ({})", path);
            c
        }
        Err(e) => {
            eprintln!("✗ Parse error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("✗ Validation error: {}", e);
        std::process::exit(1);
    }

    let resolved = config.warmer.resolve("<process identity>");
    println!("✓ Configuration is valid");
    println!();
    println!("  Ping field:        {}", resolved.flag);
    println!("  Concurrency field: {}", resolved.concurrency_field);
    println!("  Test field:        {}", resolved.test_field);
    println!("  Logging:           {}", resolved.log);
    println!("  Correlation id:    {}", resolved.correlation_id);
    println!("  Sibling delay:     {}ms", resolved.delay.as_millis());
    println!("  Invoke endpoint:   {}", config.invoker.endpoint);
    println!(
        "  Function:          {}",
        config.invoker.function_name.as_deref().unwrap_or("(from environment)")
    );

    Ok(())
}
