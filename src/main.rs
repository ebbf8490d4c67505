use clap::Parser;
use color_eyre::eyre::{self, Result, WrapErr};
use std::sync::Mutex;
use tokio::io::AsyncBufReadExt;
use tracing as log;

use ptz_core::{Interpreter, LifecycleState, Outcome, SerialTransport, ViscaConfig};

mod selftest;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Option<Commands>,

    /// Path of the serial device of the camera, opened at start
    #[arg(long)]
    device: Option<String>,

    /// Filename of configuration in YAML format
    #[arg(long)]
    config: Option<String>,

    /// If set, logs are saved to this directory instead of the home directory.
    #[arg(long)]
    log_dir: Option<std::path::PathBuf>,
}

#[derive(Debug, clap::Subcommand, Default)]
enum Commands {
    /// Read commands from stdin, one per line (default command)
    #[default]
    Run,
    /// Show the configuration and then quit
    ShowConfig,
    /// List serial devices and then quit
    Devices,
    /// Run a fixed sequence of commands against a camera
    Test {
        /// Path of the serial device of the camera
        #[arg(long)]
        device: String,
    },
}

fn load_config(fname: Option<&str>) -> Result<ViscaConfig> {
    let Some(fname) = fname else {
        log::info!("Loading default config.");
        return Ok(ViscaConfig::default());
    };
    log::info!("Reading config from: {fname}");
    let cfg_buf =
        std::fs::read_to_string(fname).with_context(|| format!("opening file {fname}"))?;
    serde_yaml::from_str(&cfg_buf).with_context(|| format!("while parsing YAML in file {fname}"))
}

/// Log to the console and to a new file in `log_dir`.
fn init_logging(log_dir: &std::path::Path) -> Result<()> {
    use time::{format_description::well_known::Iso8601, UtcOffset};
    use tracing_subscriber::{
        fmt::{self, time::OffsetTime},
        layer::SubscriberExt,
    };

    let log_file_name = chrono::Local::now()
        .format(".ptz-visca-%Y%m%d_%H%M%S.%f.log")
        .to_string();
    let full_log_file_name = log_dir.join(&log_file_name);

    // Create a fixed offset time formatter based on the timezone at the
    // time this line of code runs.
    let timer = OffsetTime::new(
        UtcOffset::from_whole_seconds(chrono::Local::now().offset().local_minus_utc())?,
        Iso8601::DEFAULT,
    );

    let file = std::fs::File::create(&full_log_file_name)
        .with_context(|| format!("While creating file {}", full_log_file_name.display()))?;
    let file_layer = fmt::layer()
        .with_timer(timer.clone())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true);
    // stdout carries command outcomes
    let console_layer = fmt::layer()
        .with_timer(timer)
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true);
    let collector = tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .with(tracing_subscriber::filter::EnvFilter::from_default_env());
    tracing::subscriber::set_global_default(collector)?;
    std::panic::set_hook(Box::new(tracing_panic::panic_hook));
    Ok(())
}

/// Execute command lines from stdin until end of input.
async fn run_repl(interp: &mut Interpreter<SerialTransport>) -> Result<()> {
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let outcome = interp.execute(&line).await;
        println!("{outcome}");
    }
    if interp.state() != LifecycleState::Closed {
        log::info!("end of input, closing camera connection");
        println!("{}", interp.execute("close").await);
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if std::env::var_os("RUST_LOG").is_none() {
        let envstr = format!("{}=info,info", env!("CARGO_PKG_NAME")).replace('-', "_");
        std::env::set_var("RUST_LOG", envstr);
    }

    let cli = Cli::parse();
    let log_dir = match cli.log_dir.as_ref() {
        Some(dir) => dir.clone(),
        None => home::home_dir().ok_or_else(|| eyre::eyre!("no home directory"))?,
    };
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("While creating directory {}", log_dir.display()))?;
    init_logging(&log_dir)?;

    let config = load_config(cli.config.as_deref())?;
    let cfg_pretty = serde_yaml::to_string(&config)?;
    log::debug!("config:\n{cfg_pretty}");

    let transport = SerialTransport {
        baud_rate: config.baud_rate,
        reply_timeout: config.reply_timeout(),
    };
    let startup_wait = config.zoom_settle();
    let mut interp = Interpreter::new(transport, config);

    match cli.command.unwrap_or_default() {
        Commands::ShowConfig => {
            print!("{cfg_pretty}");
        }
        Commands::Devices => {
            println!("{}", interp.execute("devices").await);
        }
        Commands::Test { device } => {
            let failures = selftest::run(&mut interp, &device, startup_wait).await?;
            if failures > 0 {
                eyre::bail!("{failures} commands failed");
            }
        }
        Commands::Run => {
            if let Some(device) = cli.device.as_deref() {
                let outcome = interp.execute(&format!("open {device}")).await;
                println!("{outcome}");
                if let Outcome::Failed(e) = outcome {
                    return Err(e).with_context(|| format!("opening {device}"));
                }
            }
            run_repl(&mut interp).await?;
        }
    }
    Ok(())
}
