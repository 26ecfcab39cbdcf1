use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use shopmark::{
    AppState, Config, create_app,
    batch::{BatchRequest, BatchStatus},
    startup_checks,
    watermark::WatermarkStyle,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the web server (default if no command specified)
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long)]
        host: Option<String>,

        /// Automatically quit after specified number of seconds (useful for testing)
        #[arg(long)]
        quit_after: Option<u64>,
    },

    /// Watermark the whole catalog (or one collection) from the command line
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Restrict the run to a collection; repeatable, only the first is used
    #[arg(long = "collection")]
    collection_ids: Vec<String>,

    /// Resume from a cursor returned by an earlier run
    #[arg(long)]
    cursor: Option<String>,

    #[arg(long, default_value = "WATERMARK")]
    text: String,

    #[arg(long, default_value_t = -30.0, allow_hyphen_values = true)]
    angle: f32,

    #[arg(long, default_value = "#000000")]
    color: String,

    #[arg(long, default_value_t = 0.2)]
    opacity: f32,

    #[arg(long, default_value_t = 100)]
    cutoff: u32,

    #[arg(long, default_value_t = 12)]
    font_size: u32,

    /// Keep going past pages with failed products
    #[arg(long)]
    continue_on_error: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set up logging first
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&cli.config)?;

    match cli.command {
        Some(Commands::Run(args)) => run_batch(config, args).await,
        Some(Commands::Serve {
            port,
            host,
            quit_after,
        }) => run_server(config, port, host, quit_after).await,
        None => {
            // Default to serve command if no subcommand specified
            run_server(config, None, None, None).await
        }
    }
}

fn load_config(config_path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if config_path.exists() {
        let config = Config::from_file(config_path)?;
        info!("Configuration loaded from: {:?}", config_path);
        config
    } else {
        info!("Config file not found at {:?}, using defaults", config_path);
        Config::default()
    };

    if config.shop.access_token.is_empty()
        && let Ok(token) = std::env::var("SHOPIFY_ACCESS_TOKEN")
    {
        info!("Using access token from SHOPIFY_ACCESS_TOKEN");
        config.shop.access_token = token;
    }

    Ok(config)
}

async fn check_startup(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    match startup_checks::perform_startup_checks(config).await {
        Ok(()) => Ok(()),
        Err(errors) => {
            for error in &errors {
                tracing::error!("Startup check failed: {}", error);
            }

            if errors.iter().any(|e| e.is_critical()) {
                tracing::error!("Critical startup check failed, exiting");
                Err("Critical startup check failed".into())
            } else {
                tracing::warn!("Non-critical startup checks failed, continuing");
                Ok(())
            }
        }
    }
}

async fn run_batch(config: Config, args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    check_startup(&config).await?;

    let style = WatermarkStyle {
        text: args.text,
        angle_degrees: args.angle,
        color_hex: args.color,
        max_opacity: args.opacity,
        cutoff_radius_px: args.cutoff,
        base_font_size_px: args.font_size,
    };
    style.validate()?;

    let state = AppState::from_config(config)?;
    let mut request = BatchRequest {
        cursor: args.cursor,
        processed_count: 0,
        collection_ids: args.collection_ids,
        style,
    };
    let mut failed_products = 0;

    loop {
        let response = state.driver.step(&request).await;
        println!("{}", serde_json::to_string(&response)?);
        failed_products += response.failures.len();

        let next = match response.status {
            BatchStatus::Completed => break,
            BatchStatus::InProgress => response.next,
            BatchStatus::Error if args.continue_on_error => response.next,
            BatchStatus::Error => None,
        };

        let Some(next) = next else {
            return Err(response.message.into());
        };
        let (_, query) = next.split_once('?').unwrap_or_default();
        request = BatchRequest::from_query(query)?;
    }

    if failed_products > 0 {
        return Err(format!("{} product(s) failed to watermark", failed_products).into());
    }
    Ok(())
}

async fn run_server(
    config: Config,
    port: Option<u16>,
    host: Option<String>,
    quit_after: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let host = host.unwrap_or(config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    info!("Starting shopmark server");
    info!("Watermark font: {:?}", config.watermark.font_path);
    info!(
        "Processing {} product(s) per batch step",
        config.watermark.page_size
    );

    check_startup(&config).await?;

    let app = create_app(config)?;

    let addr = SocketAddr::from((host.parse::<std::net::IpAddr>()?, port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Set up graceful shutdown
    let server = axum::serve(listener, app);
    let graceful = server.with_graceful_shutdown(shutdown_signal(quit_after));

    if let Err(e) = graceful.await {
        tracing::error!("Server error: {}", e);
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(quit_after: Option<u64>) {
    use tokio::signal;
    use tokio::time::{Duration, sleep};

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let quit_timer = async {
        if let Some(seconds) = quit_after {
            info!(
                "Server will automatically shut down after {} seconds",
                seconds
            );
            sleep(Duration::from_secs(seconds)).await;
            info!("Quit timer expired, shutting down");
        } else {
            std::future::pending::<()>().await
        }
    };

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        },
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        },
        _ = quit_timer => {},
    }
}
