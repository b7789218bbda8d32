//! nickwatch-bot — entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Init logger at the configured level
//!   4. Build the registry in its lifecycle mode (open vs single-tenant)
//!   5. Wire sink → dispatcher → session
//!   6. Spawn Ctrl-C → shutdown signal watcher
//!   7. Run the IRC session until shutdown

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use nickwatch_bot::config;
use nickwatch_bot::dispatcher::Dispatcher;
use nickwatch_bot::error::AppError;
use nickwatch_bot::irc::Session;
use nickwatch_bot::logger;
use nickwatch_bot::registry::Registry;
use nickwatch_bot::sink::pushover::PushoverSink;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let config = config::load()?;

    logger::init(&config.log_level)?;

    info!(
        bot_nick = %config.bot_nick,
        server = %config.irc.server,
        channel = %config.irc.channel,
        work_dir = %config.work_dir.display(),
        registration_enabled = config.registration_enabled,
        "config loaded"
    );

    if config.irc.tls && !config.irc.verify_certificates {
        warn!("!!! certificate verification is DISABLED for the IRC connection !!!");
    }

    let registry = if config.registration_enabled {
        Registry::load(&config.users_file())
    } else {
        Registry::single_tenant(
            &config.bot_nick,
            config.pushover_user_key.as_deref(),
            &config.watch.personal_nick,
            config.watch.priority,
        )
    };

    let sink = PushoverSink::new(config.pushover_app_token.clone())
        .map_err(|e| AppError::Transport(e.to_string()))?;
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(sink)));

    // Shared shutdown token — Ctrl-C cancels it, all tasks watch it.
    let shutdown = CancellationToken::new();
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received — initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    Session::new(&config, registry, dispatcher).run(shutdown).await
}
