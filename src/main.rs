use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use konctl::adopt::Adopter;
use konctl::config::Config;
use konctl::graph::DependencyGraph;
use konctl::identity::{MatchPolicy, Resolver};
use konctl::konnect::auth::resolve_token;
use konctl::konnect::http::format_konnect_error;
use konctl::konnect::KonnectClient;
use konctl::namespace::NamespaceRequirement;
use konctl::pagination::{effective_page_size, CancelToken};
use konctl::resource::{ResourceKind, ResourceSet};
use konctl::{loader, Error, VERSION};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Declarative configuration for Kong Konnect
#[derive(Parser, Debug)]
#[command(name = "konctl", version = VERSION, about, long_about = None)]
struct Args {
    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load declarative files and check refs, dependencies, and namespaces
    Validate {
        #[command(flatten)]
        files: FileArgs,
    },
    /// Match declared resources to their remote counterparts
    Resolve {
        #[command(flatten)]
        files: FileArgs,
        #[command(flatten)]
        remote: RemoteArgs,
        /// Fail when more than one remote object matches a resource
        #[arg(long)]
        strict: bool,
    },
    /// Bring an unmanaged remote resource under a namespace
    Adopt {
        /// Resource kind (portal, api, control_plane, ...)
        kind: String,
        /// Remote ID or name
        identifier: String,
        /// Namespace to assign (defaults to the configured one)
        #[arg(long)]
        namespace: Option<String>,
        #[command(flatten)]
        remote: RemoteArgs,
    },
}

#[derive(ClapArgs, Debug)]
struct FileArgs {
    /// Declarative configuration files
    #[arg(short = 'f', long = "filename", required = true)]
    files: Vec<PathBuf>,

    /// Require explicit namespaces; optionally restrict to the given ones
    #[arg(long, num_args = 0..=1, default_missing_value = "")]
    require_namespace: Option<Vec<String>>,

    /// Require every resource to declare some namespace
    #[arg(long, conflicts_with = "require_namespace")]
    require_any_namespace: bool,
}

impl FileArgs {
    fn requirement(&self) -> konctl::Result<NamespaceRequirement> {
        if self.require_any_namespace {
            return Ok(NamespaceRequirement::Any);
        }
        match &self.require_namespace {
            Some(values) => NamespaceRequirement::parse_list(values),
            None => Ok(NamespaceRequirement::None),
        }
    }
}

#[derive(ClapArgs, Debug)]
struct RemoteArgs {
    /// Konnect token (defaults to KONNECT_TOKEN, then the config file)
    #[arg(long)]
    token: Option<String>,

    /// Konnect API base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Items per page for remote lookups
    #[arg(long)]
    page_size: Option<i64>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("konctl={}", tracing_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("konctl {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("konctl").join("konctl.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".konctl").join("konctl.log");
    }
    PathBuf::from("konctl.log")
}

/// Cancel in-flight lookups on Ctrl-C.
fn install_interrupt_handler() -> CancelToken {
    let cancel = CancelToken::new();
    let handle = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling remote lookups");
            handle.cancel();
        }
    });
    cancel
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_guard = setup_logging(args.log_level);
    let config = Config::load();
    let cancel = install_interrupt_handler();

    if let Err(err) = run(args.command, &config, cancel).await {
        eprintln!("Error: {:#}", err);
        if let Some(Error::Remote { source, .. }) = err.downcast_ref::<Error>() {
            eprintln!("Hint: {}", format_konnect_error(source));
        }
        tracing::error!("{:#}", err);
        drop(log_guard);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(command: Command, config: &Config, cancel: CancelToken) -> Result<()> {
    match command {
        Command::Validate { files } => {
            let set = load_and_check(&files)?;
            println!(
                "Configuration is valid: {} resources in {} file(s)",
                set.resource_count(),
                files.files.len()
            );
            Ok(())
        }
        Command::Resolve {
            files,
            remote,
            strict,
        } => {
            let mut set = load_and_check(&files)?;
            let order = DependencyGraph::build(&set).order()?;
            let client = connect(&remote, config)?;
            let policy = if strict {
                MatchPolicy::Strict
            } else {
                MatchPolicy::FirstMatch
            };
            let resolutions = Resolver::new(&client)
                .with_page_size(page_size(&remote, config))
                .with_policy(policy)
                .with_cancel(cancel)
                .resolve_set(&mut set, &order)
                .await?;

            match remote.output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&resolutions)?),
                OutputFormat::Text => {
                    for resolution in &resolutions {
                        println!(
                            "{}\t{}",
                            resolution.resource,
                            resolution.remote_id.as_deref().unwrap_or("-")
                        );
                    }
                }
            }
            Ok(())
        }
        Command::Adopt {
            kind,
            identifier,
            namespace,
            remote,
        } => {
            let kind: ResourceKind = kind.parse().map_err(anyhow::Error::msg)?;
            let namespace = namespace
                .or_else(|| config.namespace.clone())
                .context("No namespace given. Pass --namespace or set \"namespace\" in the config file")?;
            let client = connect(&remote, config)?;
            let result = Adopter::new(&client)
                .with_page_size(page_size(&remote, config))
                .with_cancel(cancel)
                .adopt(kind, &identifier, &namespace)
                .await?;

            match remote.output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
                OutputFormat::Text => println!("{}", result),
            }
            Ok(())
        }
    }
}

fn load_and_check(files: &FileArgs) -> Result<ResourceSet> {
    let requirement = files.requirement()?;
    let set = loader::load_files(&files.files)?;
    requirement.enforce(&set)?;
    DependencyGraph::build(&set).order()?;
    Ok(set)
}

fn connect(remote: &RemoteArgs, config: &Config) -> Result<KonnectClient> {
    let token = resolve_token(remote.token.as_deref(), config.token.as_deref())?;
    let base_url = remote
        .base_url
        .clone()
        .unwrap_or_else(|| config.effective_base_url());
    tracing::info!("Using Konnect at {}", base_url);
    KonnectClient::new(&base_url, &token)
}

fn page_size(remote: &RemoteArgs, config: &Config) -> usize {
    match remote.page_size {
        Some(size) => effective_page_size(size),
        None => config.effective_page_size(),
    }
}
