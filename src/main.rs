use anyhow::Result;
use clap::Parser;
use kiosk_capture::{
    CaptureSession, CaptureSessionBuilder, EventBus, EventBusError, EventFilter, EventReceiver,
    KioskConfig,
    NotificationBanner, NotificationKind, SimulatedCamera, SimulatedSurface,
    SurfaceBehavior, VisitorDetails, VisitorSubmission,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "kiosk")]
#[command(about = "Visitor check-in kiosk camera capture")]
#[command(version)]
#[command(long_about = "Runs one visitor photo capture session: opens the camera, waits for the \
preview to go live, takes a still photo and releases the camera. Uses the built-in simulated \
camera configured in the [simulation] section.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "kiosk.toml", help = "Path to TOML configuration file")]
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

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Where to write the captured JPEG
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Capture attempts before giving up while the preview warms up
    #[arg(long, default_value_t = 8)]
    attempts: u32,

    /// Delay between capture attempts in milliseconds
    #[arg(long, default_value_t = 250)]
    retry_ms: u64,

    /// Visitor name; with phone and flat, prints the check-in payload
    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    phone: Option<String>,

    #[arg(long)]
    flat: Option<String>,

    #[arg(long)]
    owner_email: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting kiosk capture v{}", env!("CARGO_PKG_VERSION"));

    let config = match KioskConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("✗ Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    if args.validate_config {
        println!("✓ Configuration is valid");
        return Ok(());
    }

    let session = build_session(&config, args.debug)?;
    spawn_notification_printer(&session, &config);

    let outcome = tokio::select! {
        result = run_capture(&session, &args) => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted; releasing camera");
            session.teardown();
            std::process::exit(130);
        }
    };

    let exit_code = match outcome {
        Ok(()) => 0,
        Err(e) => {
            error!("Capture failed: {}", e);
            eprintln!("✗ {}", e);
            1
        }
    };

    // idempotent; covers every exit path
    session.teardown();
    std::process::exit(exit_code);
}

fn build_session(config: &KioskConfig, debug_events: bool) -> Result<CaptureSession> {
    let sim = &config.simulation;

    let camera = SimulatedCamera::new(sim.supported_resolutions.clone())
        .with_acquire_delay(Duration::from_millis(sim.acquire_delay_ms));
    camera.set_deny_permission(sim.deny_permission);

    let surface = SimulatedSurface::new(SurfaceBehavior {
        ready_after: sim
            .ready_event
            .then(|| Duration::from_millis(sim.ready_delay_ms)),
        reject_play: sim.reject_playback,
    });

    let capacity = config.events.bus_capacity;
    let events = if debug_events {
        EventBus::with_debug_logging(capacity)
    } else {
        EventBus::new(capacity)
    };

    let session = CaptureSessionBuilder::new()
        .config(config.clone())
        .event_bus(events)
        .device_service(Arc::new(camera))
        .surface(Arc::new(surface))
        .build()?;

    Ok(session)
}

fn spawn_notification_printer(session: &CaptureSession, config: &KioskConfig) {
    let mut receiver = EventReceiver::new(
        session.events().subscribe(),
        EventFilter::EventTypes(vec!["notification"]),
        "console".to_string(),
    );
    let mut banner =
        NotificationBanner::new(Duration::from_secs(config.events.notification_seconds));

    tokio::spawn(async move {
        loop {
            let remaining = banner.remaining_at(SystemTime::now());
            tokio::select! {
                received = receiver.recv() => match received {
                    Ok(event) => {
                        if !banner.show(&event) {
                            continue;
                        }
                        if let Some((kind, message)) = banner.visible_at(SystemTime::now()) {
                            let marker = match kind {
                                NotificationKind::Info => "ℹ",
                                NotificationKind::Success => "✓",
                                NotificationKind::Error => "✗",
                            };
                            eprintln!("{} {}", marker, message);
                        }
                    }
                    Err(EventBusError::ChannelClosed) => break,
                    Err(e) => warn!("Notification printer: {}", e),
                },
                _ = tokio::time::sleep(remaining.unwrap_or_default()), if remaining.is_some() => {
                    if banner.dismiss() {
                        debug!("Notification dismissed");
                    }
                }
            }
        }
    });
}

async fn run_capture(session: &CaptureSession, args: &Args) -> Result<()> {
    session.start().await?;

    let mut attempt = 0;
    let frame = loop {
        attempt += 1;
        match session.capture_requested().await {
            Ok(frame) => break frame,
            Err(e) if e.is_retryable() && attempt < args.attempts => {
                info!("Capture attempt {} failed ({}); retrying", attempt, e);
                tokio::time::sleep(Duration::from_millis(args.retry_ms)).await;
            }
            Err(e) => return Err(e.into()),
        }
    };

    println!(
        "✓ Captured {}x{} photo ({} bytes)",
        frame.width(),
        frame.height(),
        frame.byte_len()
    );

    if let Some(path) = &args.output {
        tokio::fs::write(path, frame.data()).await?;
        println!("  written to {}", path.display());
    }

    if let (Some(name), Some(phone), Some(flat)) = (&args.name, &args.phone, &args.flat) {
        let details = VisitorDetails {
            name: name.clone(),
            phone: phone.clone(),
            flat_number: flat.clone(),
            flat_owner_email: args.owner_email.clone(),
        };
        let submission = VisitorSubmission::new(details, session.captured_frame().as_ref())?;
        println!("{}", submission.to_json()?);
    }

    Ok(())
}

fn init_logging(args: &Args) -> Result<()> {
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
        .unwrap_or_else(|_| EnvFilter::new(format!("kiosk={0},kiosk_capture={0}", log_level)));

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
            .with_file(false)
            .with_line_number(false)
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
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# Kiosk capture configuration");
    println!("# Environment overrides use KIOSK_<SECTION>__<KEY>, e.g. KIOSK_PLAYBACK__FALLBACK_MS");
    println!();
    println!("{}", toml::to_string_pretty(&KioskConfig::default())?);
    Ok(())
}
