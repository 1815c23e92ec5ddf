use anyhow::Context;
use clap::{Parser, Subcommand};
use hodei_cli::commands::{BrokerCommand, CommandError, Dispatch};
use hodei_cli::config::{self, BrokerConfig, CONFIG_FILE_NAME};
use hodei_cli::logging::init_logging;
use hodei_cli::rabbitmq::{ChannelManager, Publisher, RabbitMQError, RpcClient};
use std::io::Write;
use std::path::PathBuf;
use std::process;
use tracing::info;

const EXIT_INVALID: i32 = 1;
const EXIT_TRANSPORT: i32 = 2;
const EXIT_TIMEOUT: i32 = 3;
const EXIT_CANCELLED: i32 = 130;

/// Operational commands for the CNP back office over RabbitMQ
#[derive(Parser)]
#[command(name = "hodei")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose logging (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Maximum time to wait for a reply, in milliseconds
    #[arg(long, value_name = "MS", global = true)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Broker(BrokerCommand),
    /// Print the version
    Version,
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a default configuration file
    Init {
        /// Where to write it
        #[arg(default_value = CONFIG_FILE_NAME)]
        path: PathBuf,
    },
    /// Print the effective configuration
    Show,
}

#[derive(Debug, thiserror::Error)]
enum Failure {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Broker(#[from] RabbitMQError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Failure {
    fn exit_code(&self) -> i32 {
        match self {
            Failure::Broker(RabbitMQError::Timeout(_)) => EXIT_TIMEOUT,
            Failure::Broker(RabbitMQError::Cancelled) => EXIT_CANCELLED,
            Failure::Broker(e) if e.is_transport() => EXIT_TRANSPORT,
            _ => EXIT_INVALID,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), Failure> {
    match cli.command {
        Commands::Version => {
            println!("Hodei cli {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Config { action } => handle_config(action, cli.config),
        Commands::Broker(command) => {
            let mut config = config::load_config(cli.config.as_deref())?;
            if let Some(timeout_ms) = cli.timeout_ms {
                config.reply_timeout_ms = timeout_ms;
            }
            execute(command, &config).await
        }
    }
}

fn handle_config(action: ConfigAction, explicit: Option<PathBuf>) -> Result<(), Failure> {
    match action {
        ConfigAction::Init { path } => {
            config::create_default_config_file(&path)?;
            println!("Configuration file created at: {}", path.display());
            Ok(())
        }
        ConfigAction::Show => {
            let config = config::load_config(explicit.as_deref())?;
            let json = serde_json::to_string_pretty(&config.redacted())
                .context("Failed to serialize configuration")?;
            println!("{}", json);
            Ok(())
        }
    }
}

async fn execute(command: BrokerCommand, config: &BrokerConfig) -> Result<(), Failure> {
    let request = command.request()?;
    let message = request
        .message
        .mandatory(config.mandatory)
        .persistent(config.persistent);

    info!(
        command = command.name(),
        exchange = message.exchange(),
        routing_key = message.routing_key(),
        "Executing command"
    );

    let channels = ChannelManager::connect(config)?;
    match request.dispatch {
        Dispatch::Publish => {
            Publisher::new(channels).publish(&message).await?;
        }
        Dispatch::Call => {
            let client = RpcClient::new(channels, config.reply_timeout());
            let reply = client.call_until(&message, interrupted()).await?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&reply).context("Failed to write reply")?;
            writeln!(stdout).context("Failed to write reply")?;
        }
    }
    Ok(())
}

/// Completes on Ctrl-C. Never completes if the handler cannot be installed.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
