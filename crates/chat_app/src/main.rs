use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use chat_app::platform::logging::{self, LogDestination};
use chat_app::platform::run_chat;
use chat_app::server::{run_server, ServerSettings};
use chat_engine::{
    ClientSettings, UpstreamSettings, DEFAULT_MODEL, DEFAULT_RELAY_URL, DEFAULT_UPSTREAM_URL,
};
use chat_logging::{chat_info, chat_warn, level_for_verbosity};
use clap::{ArgAction, Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(version, about = "Streaming chat relay for a local model server")]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP relay
    Serve(ServeArgs),
    /// Chat with a running relay from the terminal
    Chat(ChatArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Listen address
    #[arg(long, default_value = "127.0.0.1:3000", env = "RELAY_LISTEN")]
    listen: SocketAddr,

    /// Base URL of the model server
    #[arg(long, default_value = DEFAULT_UPSTREAM_URL, env = "OLLAMA_BASE_URL")]
    upstream_url: String,

    /// Model id sent with every request
    #[arg(long, default_value = DEFAULT_MODEL, env = "OLLAMA_MODEL")]
    model: String,

    /// Seconds to wait for the next upstream chunk
    #[arg(long, default_value_t = 120)]
    idle_timeout_secs: u64,
}

#[derive(Args)]
struct ChatArgs {
    /// Base URL of the relay
    #[arg(long, default_value = DEFAULT_RELAY_URL, env = "RELAY_URL")]
    relay_url: String,

    /// Seconds to wait for the next reply chunk
    #[arg(long, default_value_t = 120)]
    idle_timeout_secs: u64,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = level_for_verbosity(cli.verbose);

    match cli.command {
        Command::Serve(args) => {
            logging::initialize(LogDestination::Terminal, level);
            serve(args)
        }
        Command::Chat(args) => {
            logging::initialize(LogDestination::File, level);
            run_chat(ClientSettings {
                relay_url: args.relay_url,
                idle_timeout: Duration::from_secs(args.idle_timeout_secs),
                ..ClientSettings::default()
            })
        }
    }
}

fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let settings = ServerSettings {
        listen: args.listen,
        upstream: UpstreamSettings {
            base_url: args.upstream_url,
            model: args.model,
            idle_timeout: Duration::from_secs(args.idle_timeout_secs),
            ..UpstreamSettings::default()
        },
    };

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(async move {
        let shutdown = CancellationToken::new();
        let on_signal = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => chat_info!("shutdown requested"),
                Err(err) => {
                    chat_warn!("cannot listen for ctrl-c: {err}");
                    return;
                }
            }
            on_signal.cancel();
        });
        run_server(settings, shutdown).await
    })
}
