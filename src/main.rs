//! Pi Birdhouse - Raspberry Pi birdhouse controller binary
//!
//! Each long-running duty is its own subcommand, meant to run as its own
//! process (for example one systemd unit per duty).

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use pi_birdhouse::{
    control::{illuminator::DEFAULT_AUTO_OFF, stream_process::DEFAULT_AUTO_STOP, PowerControl},
    hardware::{self, Pull},
    sensors::SerialConfig,
    status::collector::DEFAULT_THERMAL_ZONE,
    stream::SourceKind,
    watchdog, CounterConfig, CounterRunner, DashboardConfig, LocalClock, PassageLog,
    ResumePolicy, StatusReader, StreamConfig, WatchdogConfig, DEFAULT_LED_PIN, DEFAULT_LOG_PATH,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_SENSOR_PIN, DEFAULT_SETTLE_DELAY_MS, DEFAULT_SHUTDOWN_PIN,
    DEFAULT_STREAM_PORT, DEFAULT_WEB_PORT,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "pi_birdhouse")]
#[command(about = "Pi Birdhouse - passage counter, IR light and camera for a birdhouse")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Count bird passages through the IR beam
    Count(CountArgs),

    /// Start the dashboard web server (default)
    Serve(ServeArgs),

    /// Start the MJPEG stream service
    Stream(StreamArgs),

    /// Halt the host after a long press on the shutdown button
    Watchdog(WatchdogArgs),

    /// Print the passage log and exit
    Passages(PassagesArgs),

    /// Print CPU temperature and load, then exit
    Status(StatusArgs),
}

#[derive(Args, Debug)]
struct CountArgs {
    /// Passage log to append to
    #[arg(long, default_value = DEFAULT_LOG_PATH)]
    log_path: PathBuf,

    /// BCM pin of the beam-break sensor
    #[arg(long, default_value_t = DEFAULT_SENSOR_PIN)]
    pin: u8,

    /// Sensor polling interval in milliseconds
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    poll_interval_ms: u64,

    /// Delay before the first sample in milliseconds
    #[arg(long, default_value_t = DEFAULT_SETTLE_DELAY_MS)]
    settle_delay_ms: u64,

    /// How to recover counts when the last log line is unreadable
    #[arg(long, value_enum, default_value_t = ResumePolicy::LastLine)]
    resume_policy: ResumePolicy,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Web server bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Web server port
    #[arg(short, long, default_value_t = DEFAULT_WEB_PORT)]
    port: u16,

    /// Static files directory (page overrides, logo, passage log)
    #[arg(long, default_value = "static")]
    static_dir: String,

    /// Disable CORS headers
    #[arg(long)]
    no_cors: bool,

    /// Passage log written by the counter
    #[arg(long, default_value = DEFAULT_LOG_PATH)]
    log_path: PathBuf,

    /// BCM pin driving the IR illuminator
    #[arg(long, default_value_t = DEFAULT_LED_PIN)]
    led_pin: u8,

    /// Serial device of the voltage sensor
    #[arg(long, default_value = "/dev/serial0")]
    serial_device: String,

    /// Do not read the voltage sensor
    #[arg(long)]
    no_voltage: bool,

    /// Command started by the stream toggle (defaults to `pi_birdhouse stream`)
    #[arg(long, num_args = 1.., allow_hyphen_values = true)]
    stream_command: Option<Vec<String>>,

    /// Seconds before the IR illuminator switches itself off
    #[arg(long, default_value_t = DEFAULT_AUTO_OFF.as_secs())]
    ir_auto_off_secs: u64,

    /// Seconds before the stream service is stopped again
    #[arg(long, default_value_t = DEFAULT_AUTO_STOP.as_secs())]
    stream_auto_off_secs: u64,

    /// Command run by the shutdown button
    #[arg(
        long,
        num_args = 1..,
        allow_hyphen_values = true,
        default_values_t = PowerControl::default_command()
    )]
    halt_command: Vec<String>,
}

impl Default for ServeArgs {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_WEB_PORT,
            static_dir: "static".to_string(),
            no_cors: false,
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            led_pin: DEFAULT_LED_PIN,
            serial_device: "/dev/serial0".to_string(),
            no_voltage: false,
            stream_command: None,
            ir_auto_off_secs: DEFAULT_AUTO_OFF.as_secs(),
            stream_auto_off_secs: DEFAULT_AUTO_STOP.as_secs(),
            halt_command: PowerControl::default_command(),
        }
    }
}

#[derive(Args, Debug)]
struct StreamArgs {
    /// Stream server port
    #[arg(short, long, default_value_t = DEFAULT_STREAM_PORT)]
    port: u16,

    /// Directory captured images are written to
    #[arg(long, default_value = "Images")]
    images_dir: PathBuf,

    /// Directory holding logo.png
    #[arg(long, default_value = "static")]
    static_dir: PathBuf,

    /// Frame source
    #[arg(long, value_enum, default_value_t = SourceKind::Camera)]
    source: SourceKind,

    #[arg(long, default_value_t = 640)]
    width: u32,

    #[arg(long, default_value_t = 480)]
    height: u32,

    /// Frames per second
    #[arg(long, default_value_t = 10)]
    fps: u32,
}

#[derive(Args, Debug)]
struct WatchdogArgs {
    /// BCM pin of the shutdown button
    #[arg(long, default_value_t = DEFAULT_SHUTDOWN_PIN)]
    pin: u8,

    /// Seconds the button must be held
    #[arg(long, default_value_t = 10)]
    threshold_secs: u64,

    /// Command run on a long press
    #[arg(
        long,
        num_args = 1..,
        allow_hyphen_values = true,
        default_values_t = WatchdogConfig::default().halt_command
    )]
    halt_command: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Args, Debug)]
struct PassagesArgs {
    #[arg(long, default_value = DEFAULT_LOG_PATH)]
    log_path: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,
}

#[derive(Args, Debug)]
struct StatusArgs {
    /// Thermal zone file with the CPU temperature in millidegrees
    #[arg(long, default_value = DEFAULT_THERMAL_ZONE)]
    thermal_zone: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    match cli.command {
        Some(Commands::Count(args)) => count_command(args).await,
        Some(Commands::Serve(args)) => serve_command(args).await,
        Some(Commands::Stream(args)) => stream_command(args).await,
        Some(Commands::Watchdog(args)) => watchdog_command(args).await,
        Some(Commands::Passages(args)) => passages_command(args).await,
        Some(Commands::Status(args)) => status_command(args).await,
        // Default to serve command
        None => serve_command(ServeArgs::default()).await,
    }
}

fn init_logging(cli: &Cli) -> Result<()> {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    // RUST_LOG wins over the command-line level when it is set
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("Failed to install logger")?;

    Ok(())
}

fn print_banner() {
    println!("Pi Birdhouse");
    println!("   Version: {}", env!("CARGO_PKG_VERSION"));
    println!();
}

/// Raised on Ctrl-C or SIGTERM.
fn stop_on_signal() -> Arc<AtomicBool> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    tokio::spawn(async move {
        pi_birdhouse::web::shutdown_signal().await;
        info!("Stop requested");
        flag.store(true, Ordering::SeqCst);
    });
    stop
}

async fn count_command(args: CountArgs) -> Result<()> {
    let config = CounterConfig::default()
        .with_log_path(args.log_path)
        .with_sensor_pin(args.pin)
        .with_poll_interval_ms(args.poll_interval_ms)
        .with_settle_delay_ms(args.settle_delay_ms)
        .with_resume_policy(args.resume_policy);

    let sensor = hardware::open_input(config.sensor_pin, Pull::Up)
        .with_context(|| format!("Failed to open IR sensor on pin {}", config.sensor_pin))?;
    let log_path = config.log_path.clone();
    let mut runner = CounterRunner::new(config, sensor, LocalClock)
        .with_context(|| format!("Failed to resume from {}", log_path.display()))?;
    let tallies = runner.tallies();
    info!(
        "Resuming at daily={} total={}",
        tallies.daily_count, tallies.total_count
    );

    let stop = stop_on_signal();
    // The runner (and with it the sensor pin) is dropped when the task ends
    tokio::task::spawn_blocking(move || runner.run(&stop))
        .await
        .context("Counter task panicked")?
        .context("Passage counter failed")?;

    Ok(())
}

async fn serve_command(args: ServeArgs) -> Result<()> {
    print_banner();

    let serial = (!args.no_voltage).then(|| SerialConfig {
        device: args.serial_device.clone(),
        ..Default::default()
    });

    let config = DashboardConfig::new(&args.host, args.port)
        .with_static_path(Some(args.static_dir.clone()))
        .with_cors(!args.no_cors)
        .with_log_path(args.log_path)
        .with_led_pin(args.led_pin)
        .with_serial(serial)
        .with_stream_command(args.stream_command)
        .with_ir_auto_off_secs(args.ir_auto_off_secs)
        .with_stream_auto_off_secs(args.stream_auto_off_secs)
        .with_halt_command(args.halt_command);

    info!("Web server configuration:");
    info!("  - Bind address: {}", config.bind_address());
    info!("  - CORS enabled: {}", config.enable_cors);
    info!("  - Passage log: {}", config.log_path.display());
    #[cfg(not(feature = "gpio"))]
    info!("GPIO not available (feature not compiled), IR illuminator is simulated");

    pi_birdhouse::start_web_server(config)
        .await
        .context("Dashboard failed")?;
    Ok(())
}

async fn stream_command(args: StreamArgs) -> Result<()> {
    let config = StreamConfig::default()
        .with_port(args.port)
        .with_images_dir(args.images_dir)
        .with_static_path(args.static_dir)
        .with_source(args.source)
        .with_resolution(args.width, args.height)
        .with_fps(args.fps);

    pi_birdhouse::start_stream_server(config)
        .await
        .context("Stream service failed")?;
    Ok(())
}

async fn watchdog_command(args: WatchdogArgs) -> Result<()> {
    let config = WatchdogConfig::default()
        .with_pin(args.pin)
        .with_threshold_secs(args.threshold_secs)
        .with_halt_command(args.halt_command);

    watchdog::run_watchdog(config, stop_on_signal())
        .await
        .context("Shutdown watchdog failed")?;
    Ok(())
}

async fn passages_command(args: PassagesArgs) -> Result<()> {
    let log = PassageLog::new(&args.log_path);
    let entries = log
        .read_entries()
        .await
        .with_context(|| format!("Failed to read {}", args.log_path.display()))?;

    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Pretty => {
            println!("{:<20} {:>7} {:>7}", "Time", "Daily", "Total");
            for entry in &entries {
                println!("{:<20} {:>7} {:>7}", entry.datetime, entry.daily, entry.total);
            }
            println!();
            println!("{} passage(s)", entries.len());
        }
    }

    Ok(())
}

async fn status_command(args: StatusArgs) -> Result<()> {
    let status = StatusReader::new(&args.thermal_zone)
        .read()
        .await
        .context("Failed to read host status")?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
        OutputFormat::Pretty => {
            println!("CPU temperature: {:.1}°C", status.temperature);
            println!("Load (5 min):    {:.2}", status.load5);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_defaults_to_serve() {
        let cli = Cli::try_parse_from(["pi_birdhouse"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose && !cli.debug);
    }

    #[test]
    fn test_serve_auto_off_defaults_match_library() {
        let cli = Cli::try_parse_from(["pi_birdhouse", "serve"]).unwrap();
        let Some(Commands::Serve(args)) = cli.command else {
            panic!("expected serve");
        };
        let library = DashboardConfig::default();
        assert_eq!(args.stream_auto_off_secs, 60);
        assert_eq!(args.stream_auto_off_secs, library.stream_auto_off_secs);
        assert_eq!(args.ir_auto_off_secs, library.ir_auto_off_secs);
        assert_eq!(args.halt_command, library.halt_command);

        // Running without a subcommand uses the same settings
        let fallback = ServeArgs::default();
        assert_eq!(fallback.stream_auto_off_secs, 60);
        assert_eq!(fallback.ir_auto_off_secs, 30);
        assert_eq!(fallback.halt_command, library.halt_command);
    }

    #[test]
    fn test_serve_custom_halt_command() {
        let cli = Cli::try_parse_from(["pi_birdhouse", "serve", "--halt-command", "true"]).unwrap();
        let Some(Commands::Serve(args)) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.halt_command, vec!["true"]);
    }

    #[test]
    fn test_count_defaults() {
        let cli = Cli::try_parse_from(["pi_birdhouse", "count"]).unwrap();
        let Some(Commands::Count(args)) = cli.command else {
            panic!("expected count");
        };
        assert_eq!(args.pin, 18);
        assert_eq!(args.poll_interval_ms, 50);
        assert_eq!(args.settle_delay_ms, 1000);
        assert_eq!(args.log_path, PathBuf::from("static/passages.log"));
        assert_eq!(args.resume_policy, ResumePolicy::LastLine);
    }

    #[test]
    fn test_count_overrides_and_global_flags() {
        let cli = Cli::try_parse_from([
            "pi_birdhouse",
            "count",
            "--pin",
            "23",
            "--resume-policy",
            "scan-back",
            "--verbose",
        ])
        .unwrap();
        assert!(cli.verbose);
        let Some(Commands::Count(args)) = cli.command else {
            panic!("expected count");
        };
        assert_eq!(args.pin, 23);
        assert_eq!(args.resume_policy, ResumePolicy::ScanBack);
    }

    #[test]
    fn test_serve_stream_command() {
        let cli = Cli::try_parse_from([
            "pi_birdhouse",
            "serve",
            "--no-voltage",
            "--stream-command",
            "pi_birdhouse",
            "stream",
            "--source",
            "test-pattern",
        ])
        .unwrap();
        let Some(Commands::Serve(args)) = cli.command else {
            panic!("expected serve");
        };
        assert!(args.no_voltage);
        assert_eq!(
            args.stream_command.unwrap(),
            vec!["pi_birdhouse", "stream", "--source", "test-pattern"]
        );
    }

    #[test]
    fn test_stream_and_passages_args() {
        let cli =
            Cli::try_parse_from(["pi_birdhouse", "stream", "--source", "test-pattern"]).unwrap();
        let Some(Commands::Stream(args)) = cli.command else {
            panic!("expected stream");
        };
        assert_eq!(args.source, SourceKind::TestPattern);
        assert_eq!(args.port, 8080);

        let cli = Cli::try_parse_from(["pi_birdhouse", "passages", "--format", "json"]).unwrap();
        let Some(Commands::Passages(args)) = cli.command else {
            panic!("expected passages");
        };
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(Cli::try_parse_from(["pi_birdhouse", "status", "--format", "yaml"]).is_err());
    }

    #[test]
    fn test_watchdog_defaults() {
        let cli = Cli::try_parse_from(["pi_birdhouse", "watchdog"]).unwrap();
        let Some(Commands::Watchdog(args)) = cli.command else {
            panic!("expected watchdog");
        };
        assert_eq!(args.pin, 17);
        assert_eq!(args.threshold_secs, 10);
        assert_eq!(args.halt_command, vec!["sudo", "halt"]);
    }

    #[test]
    fn test_custom_halt_command() {
        let cli = Cli::try_parse_from([
            "pi_birdhouse",
            "watchdog",
            "--halt-command",
            "systemctl",
            "poweroff",
        ])
        .unwrap();
        let Some(Commands::Watchdog(args)) = cli.command else {
            panic!("expected watchdog");
        };
        assert_eq!(args.halt_command, vec!["systemctl", "poweroff"]);
    }
}
