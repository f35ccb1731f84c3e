mod config;
use anyhow::{Context, bail};
use casket_core::{CasketClient, DEFAULT_PORT};
use clap::{Args, Parser, Subcommand};
use config::Config;
use tokio::task::JoinSet;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod server;
use server::run_server;

#[derive(Parser)]
#[command(name = "casket")]
#[command(about = "Content-addressed blob storage over HTTP")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Server {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Store a value and print its key
    Put {
        /// Value to store
        #[arg(long, conflicts_with = "size")]
        data: Option<String>,

        /// Store a generated value of this many bytes
        #[arg(long)]
        size: Option<usize>,

        #[command(flatten)]
        target: Target,
    },
    /// Fetch a value by key
    Get {
        key: String,

        #[command(flatten)]
        target: Target,
    },
    /// Delete a value by key
    Del {
        key: String,

        #[command(flatten)]
        target: Target,
    },
    /// Print the object count and total size
    Info {
        #[command(flatten)]
        target: Target,
    },
}

#[derive(Args)]
struct Target {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Number of concurrent identical requests
    #[arg(long, default_value_t = 1)]
    count: usize,
}

#[derive(Clone)]
enum Request {
    Put(Vec<u8>),
    Get(String),
    Del(String),
    Info,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "casket=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let (request, target) = match cli.command {
        Commands::Server { config } => {
            tracing::info!(
                "Starting Casket server with config: {}",
                config.as_deref().unwrap_or("<defaults>")
            );

            let cfg = match Config::load(config.as_deref()) {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!("Failed to load config: {}", e);
                    std::process::exit(1);
                }
            };

            if let Err(e) = run_server(cfg).await {
                tracing::error!("Server error: {}", e);
                std::process::exit(1);
            }
            return;
        }
        Commands::Put { data, size, target } => match put_payload(data, size) {
            Ok(value) => (Request::Put(value), target),
            Err(e) => {
                tracing::error!("{:#}", e);
                std::process::exit(1);
            }
        },
        Commands::Get { key, target } => (Request::Get(key), target),
        Commands::Del { key, target } => (Request::Del(key), target),
        Commands::Info { target } => (Request::Info, target),
    };

    if let Err(e) = run_client(request, target).await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn put_payload(data: Option<String>, size: Option<usize>) -> anyhow::Result<Vec<u8>> {
    match (data, size) {
        (Some(data), _) => Ok(data.into_bytes()),
        (None, Some(size)) => Ok(b"0123456789abcdef"
            .iter()
            .copied()
            .cycle()
            .take(size)
            .collect()),
        (None, None) => bail!("put needs either --data or --size"),
    }
}

async fn run_client(request: Request, target: Target) -> anyhow::Result<()> {
    let client = CasketClient::new(&target.host, target.port)
        .with_context(|| format!("cannot reach {}:{}", target.host, target.port))?;
    tracing::debug!(
        "Sending {} request(s) to {}",
        target.count.max(1),
        client.base_url()
    );

    let mut tasks = JoinSet::new();
    for _ in 0..target.count.max(1) {
        let client = client.clone();
        let request = request.clone();
        tasks.spawn(async move {
            match request {
                Request::Put(value) => client.put(&value).await,
                Request::Get(key) => client.get(&key).await,
                Request::Del(key) => client.del(&key).await,
                Request::Info => client.info().await,
            }
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined.context("request task failed")? {
            Ok(body) => println!("[{}]", String::from_utf8_lossy(&body).trim()),
            Err(e) => println!("err - {} - []", e),
        }
    }
    Ok(())
}
