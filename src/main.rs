use anyhow::Result;
use catwatch::{CatwatchConfig, CatwatchOrchestrator};
use clap::Parser;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "catwatch")]
#[command(about = "Webcam client that asks a detection service where the cat is")]
#[command(version)]
#[command(long_about = "Shows a live webcam view and, while capturing, periodically uploads \
the current frame to an object detection service. Every returned detection is listed and an \
indicator shows where the cat is staying.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "catwatch.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    #[arg(long, help = "Validate configuration file and exit without starting the client")]
    validate_config: bool,

    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    #[arg(long, help = "Initialize components but don't start them")]
    dry_run: bool,

    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Terminal controls: s = start, x = stop, q = quit
    #[arg(long, help = "Enable keyboard controls in the terminal")]
    keyboard: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args);

    info!("Starting catwatch v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = CatwatchConfig::load_from_file(&args.config).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("✗ Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    if args.validate_config {
        info!("Configuration validation successful");
        println!("✓ Configuration is valid");
        return Ok(());
    }

    let mut orchestrator = CatwatchOrchestrator::new(config).await.map_err(|e| {
        error!("Failed to create orchestrator: {}", e);
        e
    })?;
    orchestrator.set_keyboard_enabled(args.keyboard);

    orchestrator.initialize().await.map_err(|e| {
        error!("Failed to initialize client: {}", e);
        e
    })?;

    if args.dry_run {
        info!("Dry run mode - components initialized but not started");
        println!("✓ Dry run completed successfully - all components initialized");
        return Ok(());
    }

    orchestrator.start().await.map_err(|e| {
        error!("Failed to start client: {}", e);
        e
    })?;

    let exit_code = orchestrator.run().await.map_err(|e| {
        error!("Client error during execution: {}", e);
        e
    })?;

    info!("Catwatch exited with code: {}", exit_code);
    std::process::exit(exit_code);
}

fn init_logging(args: &Args) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("catwatch={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer().with_target(true).boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();
}

/// Print the built-in defaults as TOML
fn print_default_config() -> Result<()> {
    println!("# Catwatch Configuration File");
    println!("# Every key can be overridden with CATWATCH_<SECTION>__<KEY>");
    println!();
    println!("{}", toml::to_string_pretty(&CatwatchConfig::default())?);
    Ok(())
}
