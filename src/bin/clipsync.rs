use clap::{Args, Parser, Subcommand};
use clipsync::{
    client::{ClipClient, ClipRemote},
    clip::Source,
    clipboard::ClipboardManager,
    server::ClipServer,
    store::ClipStore,
    sync::{
        manual::{pull_clipboard, push_clipboard, push_text},
        SyncAgent, SyncConfig,
    },
    ClipSyncError, Result, DEFAULT_HOST, DEFAULT_POLL_INTERVAL_MS, DEFAULT_PORT,
    DEFAULT_SERVER_URL, HTTP_TIMEOUT_SECS,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "clipsync",
    about = "Sync the clipboard between a desktop and a phone over the local network",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ServerArgs {
    /// Host to bind to
    #[arg(short = 'H', long, env = "CLIPBOARD_HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "CLIPBOARD_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Keep the latest clip in this JSON file across restarts
    #[arg(long, env = "CLIPBOARD_STORE")]
    store_file: Option<PathBuf>,
}

#[derive(Args)]
struct RemoteArgs {
    /// Clipboard server base URL
    #[arg(short, long, env = "CLIPBOARD_SERVER", default_value = DEFAULT_SERVER_URL)]
    server: String,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = HTTP_TIMEOUT_SECS)]
    timeout_secs: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the clipboard server
    Serve {
        #[command(flatten)]
        server: ServerArgs,
    },

    /// Keep the local clipboard in sync with the server
    Sync {
        #[command(flatten)]
        remote: RemoteArgs,

        /// Milliseconds between clipboard checks and server polls
        #[arg(long, env = "CLIPBOARD_POLL_MS", default_value_t = DEFAULT_POLL_INTERVAL_MS)]
        interval_ms: u64,

        /// Also run the server in this process
        #[arg(long)]
        serve: bool,

        #[command(flatten)]
        server: ServerArgs,
    },

    /// Send the current clipboard (or given text) to the server once
    Push {
        #[command(flatten)]
        remote: RemoteArgs,

        /// Send this text instead of the clipboard
        #[arg(short, long)]
        text: Option<String>,

        /// Origin tag (phone or pc)
        #[arg(long, default_value = "pc")]
        source: Source,
    },

    /// Copy the server's latest clip to the clipboard once
    Pull {
        #[command(flatten)]
        remote: RemoteArgs,

        /// Print the clip data instead of setting the clipboard
        #[arg(long)]
        stdout: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clipsync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { server } => {
            let store = build_store(server.store_file).await;
            ClipServer::new(store, server.host, server.port)
                .run(shutdown_signal())
                .await?;
        }

        Commands::Sync {
            remote,
            interval_ms,
            serve,
            server,
        } => {
            let (shutdown_tx, shutdown_rx) = watch::channel(false);

            let server_task = if serve {
                let store = build_store(server.store_file).await;
                let clip_server = ClipServer::new(store, server.host, server.port);
                // Bind before starting the agent so a taken port aborts startup.
                let listener = clip_server.bind().await?;
                let mut rx = shutdown_rx.clone();
                Some(tokio::spawn(clip_server.serve(listener, async move {
                    let _ = rx.wait_for(|stop| *stop).await;
                })))
            } else {
                None
            };

            let clipboard = Arc::new(ClipboardManager::new()?);
            let client = Arc::new(build_client(&remote)?);
            let interval = Duration::from_millis(interval_ms);
            let agent = SyncAgent::new(
                clipboard,
                client,
                SyncConfig {
                    watch_interval: interval,
                    poll_interval: interval,
                },
            );

            tokio::spawn(async move {
                shutdown_signal().await;
                let _ = shutdown_tx.send(true);
            });

            info!("Clipboard sync started - watching {}", remote.server);
            agent.run(shutdown_rx).await;

            if let Some(task) = server_task {
                task.await
                    .map_err(|e| ClipSyncError::Server(e.to_string()))??;
            }
        }

        Commands::Push {
            remote,
            text,
            source,
        } => {
            let client = build_client(&remote)?;

            match text {
                Some(text) => {
                    push_text(&client, &text, source).await?;
                    println!("Sent text to server at {}", client.base_url());
                }
                None => {
                    let clipboard = Arc::new(ClipboardManager::new()?);
                    let sent = push_clipboard(clipboard, &client, source).await?;
                    println!("Sent {} to server at {}", sent.clip_type, client.base_url());
                }
            }
        }

        Commands::Pull { remote, stdout } => {
            let client = build_client(&remote)?;

            let pulled = if stdout {
                let latest = client.latest().await?;
                if let Some(clip) = &latest {
                    print!("{}", clip.data);
                }
                latest
            } else {
                let clipboard = Arc::new(ClipboardManager::new()?);
                let latest = pull_clipboard(clipboard, &client).await?;
                if let Some(clip) = &latest {
                    println!("Copied latest {} from server to clipboard.", clip.clip_type);
                }
                latest
            };

            if pulled.is_none() {
                error!("Server has no clip yet");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

async fn build_store(store_file: Option<PathBuf>) -> Arc<ClipStore> {
    match store_file {
        Some(path) => Arc::new(ClipStore::with_persistence(path).await),
        None => Arc::new(ClipStore::new()),
    }
}

fn build_client(remote: &RemoteArgs) -> Result<ClipClient> {
    ClipClient::with_timeout(&remote.server, Duration::from_secs(remote.timeout_secs))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutting down...");
}
