use anyhow::{bail, Result};
use clap::{CommandFactory, Parser, Subcommand};
use doi_finder::config::{default_config_path, find_config_file, get_config, load_config, Config};
use doi_finder::controller::{ControlAction, RunController, RunEvent};
use doi_finder::models::{LookupOutcome, Record};
use doi_finder::sources::{CrossRefSource, LookupSource};
use doi_finder::ui::{self, print_status, RunView, Spinner, Status, ViewMode};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit code for a run stopped by the user
const EXIT_CANCELLED: u8 = 130;

/// DOI Finder - Fill a DOI column in a spreadsheet of papers using CrossRef
#[derive(Parser, Debug)]
#[command(name = "doi-finder")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "hongkongkiwi")]
#[command(
    about = "Look up DOIs for a spreadsheet of papers (Title, Journal, Year) via CrossRef",
    long_about = None
)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Request timeout in seconds (overrides configuration)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Lookup endpoint URL (overrides configuration)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Contact e-mail sent to CrossRef (overrides configuration)
    #[arg(long, global = true)]
    mailto: Option<String>,

    /// Show all environment variables
    #[arg(long)]
    env: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Enrich a spreadsheet and write <name>_with_doi.<ext> next to it
    #[command(alias = "r")]
    Run {
        /// Input spreadsheet (.xlsx or .csv)
        file: PathBuf,
    },

    /// Look up a single record
    #[command(alias = "l")]
    Lookup {
        /// Paper title
        #[arg(long, short)]
        title: String,

        /// Journal or venue
        #[arg(long, short, default_value = "")]
        journal: String,

        /// Publication year
        #[arg(long, short, default_value = "")]
        year: String,
    },

    /// Write a default configuration file
    InitConfig {
        /// Target path (default: <config_dir>/doi-finder/config.toml)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },
}

/// Print all available environment variables
fn print_env_vars() {
    println!("DOI Finder - Environment Variables");
    println!();
    println!("Lookup Settings:");
    println!("  DOI_FINDER_LOOKUP__ENDPOINT      Works search endpoint");
    println!("                                   (default: https://api.crossref.org/works)");
    println!("  DOI_FINDER_LOOKUP__TIMEOUT_SECS  Per-request timeout in seconds (default: 30)");
    println!("  DOI_FINDER_LOOKUP__MAILTO        Contact e-mail for CrossRef's polite pool");
    println!("  DOI_FINDER_LOOKUP__USER_AGENT    Full User-Agent override");
    println!();
    println!("Logging:");
    println!("  DOI_FINDER_LOGGING__LEVEL        Default log level (default: info)");
    println!("  RUST_LOG                         Tracing filter, overrides everything else");
    println!();
    println!("Proxy Settings:");
    println!("  HTTP_PROXY                       HTTP proxy URL (e.g., http://proxy:8080)");
    println!("  HTTPS_PROXY                      HTTPS proxy URL (e.g., https://proxy:8080)");
    println!("  NO_PROXY                         Comma-separated list of hosts to bypass proxy");
    println!();
    println!("Example:");
    println!("  export DOI_FINDER_LOOKUP__MAILTO=\"me@example.org\"");
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.env {
        print_env_vars();
        return Ok(ExitCode::SUCCESS);
    }

    let (config, config_path) = load_settings(&cli)?;

    // Verbosity flags beat the configured level; RUST_LOG beats both
    let log_level = if cli.quiet {
        "error".to_string()
    } else {
        match cli.verbose {
            0 => config.logging.level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("doi_finder={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Some(path) = &config_path {
        tracing::info!("Using config file: {}", path.display());
    }

    match cli.command {
        Some(Commands::Run { file }) => {
            let source: Arc<dyn LookupSource> = Arc::new(CrossRefSource::new(&config.lookup)?);
            run_file(&file, source, ViewMode::detect(cli.quiet)).await
        }
        Some(Commands::Lookup {
            title,
            journal,
            year,
        }) => {
            let source = CrossRefSource::new(&config.lookup)?;
            let outcome = lookup_one(&source, Record::new(title, journal, year), cli.quiet).await;
            println!("{}", outcome);
            Ok(if outcome.is_error() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Some(Commands::InitConfig { path, force }) => {
            let path = match path.or_else(default_config_path) {
                Some(path) => path,
                None => bail!("No configuration directory found; pass a path explicitly"),
            };
            init_config(&path, force)?;
            if !cli.quiet {
                print_status(
                    Status::Success,
                    &format!("Wrote default configuration to {}", path.display()),
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        None => {
            Cli::command().print_help()?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Load configuration from `--config`, a discovered file or the environment,
/// then apply command-line overrides.
fn load_settings(cli: &Cli) -> Result<(Config, Option<PathBuf>)> {
    let config_path = cli.config.clone().or_else(find_config_file);
    let mut config = match &config_path {
        Some(path) => load_config(path)?,
        None => get_config()?,
    };

    if let Some(timeout) = cli.timeout {
        config.lookup.timeout_secs = timeout;
    }
    if let Some(endpoint) = &cli.endpoint {
        config.lookup.endpoint = endpoint.clone();
    }
    if let Some(mailto) = &cli.mailto {
        config.lookup.mailto = Some(mailto.clone());
    }
    config.validate()?;

    Ok((config, config_path))
}

/// Drive one run to completion, forwarding Ctrl-C to the controller.
async fn run_file(file: &Path, source: Arc<dyn LookupSource>, mode: ViewMode) -> Result<ExitCode> {
    drive_run(file, source, mode, forward_interrupts()).await
}

/// Relay Ctrl-C presses into a channel so none are dropped while an event is
/// being rendered.
fn forward_interrupts() -> mpsc::UnboundedReceiver<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut ctrl_c = Box::pin(tokio::signal::ctrl_c());
        while ctrl_c.as_mut().await.is_ok() {
            ctrl_c.set(tokio::signal::ctrl_c());
            if tx.send(()).is_err() {
                break;
            }
        }
    });
    rx
}

async fn drive_run(
    file: &Path,
    source: Arc<dyn LookupSource>,
    mode: ViewMode,
    mut interrupts: mpsc::UnboundedReceiver<()>,
) -> Result<ExitCode> {
    let (controller, mut events) = RunController::new(source);
    let mut view = RunView::new(mode);

    controller.start(file);

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    bail!("Run ended without a result");
                };
                view.handle(&event);
                match event {
                    RunEvent::Completed { .. } => return Ok(ExitCode::SUCCESS),
                    RunEvent::Cancelled { .. } => return Ok(ExitCode::from(EXIT_CANCELLED)),
                    RunEvent::Failed { .. } => return Ok(ExitCode::FAILURE),
                    _ => {}
                }
            }
            Some(()) = interrupts.recv() => {
                match controller.cancel() {
                    ControlAction::CancelRequested => {
                        if mode != ViewMode::Quiet {
                            print_status(
                                Status::Warning,
                                "Cancelling after the current record (Ctrl-C again to quit now)",
                            );
                        }
                    }
                    ControlAction::AlreadyCancelling => {
                        return Ok(ExitCode::from(EXIT_CANCELLED));
                    }
                    ControlAction::Started | ControlAction::NotRunning => {}
                }
            }
        }
    }
}

async fn lookup_one(source: &dyn LookupSource, record: Record, quiet: bool) -> LookupOutcome {
    let spinner = (!quiet && ui::is_terminal()).then(|| {
        Spinner::new(&format!(
            "{} Querying {} for \"{}\"",
            ui::status_icon(Status::Search),
            source.name(),
            record.display_title()
        ))
    });

    let outcome = source.lookup(&record).await;

    if let Some(spinner) = spinner {
        spinner.finish();
    }
    outcome
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    Config::default().save(path)?;
    Ok(())
}
