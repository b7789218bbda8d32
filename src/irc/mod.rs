//! IRC session coordinator — drives the chat transport and feeds the core.
//!
//! # Architecture
//!
//! The session owns the [`Registry`] outright: events are processed one at a
//! time to completion on this task, so no locking guards registry mutations.
//! The only blocking external I/O is notification delivery, and that is
//! spawned — a slow sink can never stall the message loop.
//!
//! # Lifecycle
//!
//! [`Session::run`] connects, performs the NICK/USER handshake, joins the
//! configured channel on the welcome numeric, answers PING, and routes each
//! PRIVMSG. On disconnect it waits a fixed delay and reconnects, until the
//! shutdown token is cancelled.

pub mod message;
pub mod transport;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::classifier::classify;
use crate::commands::{CommandHandler, Reply};
use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::AppError;
use crate::event::ChatEvent;
use crate::registry::{Registry, TenantRecord};
use message::ServerMessage;
use transport::Connection;

/// Wait between reconnect attempts after a dropped connection.
const RECONNECT_DELAY: Duration = Duration::from_secs(30);

/// What routing one chat event asks the run loop to do.
enum Routed {
    /// Send a command reply back over the chat connection.
    Reply(Reply),
    /// Spawn a notification dispatch for a detected mention.
    Dispatch {
        triggered: BTreeSet<String>,
        event: ChatEvent,
        snapshot: Vec<TenantRecord>,
    },
    Nothing,
}

pub struct Session {
    bot_nick: String,
    user_id: String,
    real_name: String,
    irc: crate::config::IrcConfig,
    registry: Registry,
    handler: CommandHandler,
    dispatcher: Arc<Dispatcher>,
}

impl Session {
    pub fn new(config: &Config, registry: Registry, dispatcher: Arc<Dispatcher>) -> Self {
        let handler = CommandHandler::new(&config.bot_nick, &config.watch.personal_nick);
        Self {
            bot_nick: config.bot_nick.clone(),
            user_id: config.user_id.clone(),
            real_name: config.real_name.clone(),
            irc: config.irc.clone(),
            registry,
            handler,
            dispatcher,
        }
    }

    /// Run until `shutdown` is cancelled, reconnecting after disconnects.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), AppError> {
        loop {
            if shutdown.is_cancelled() {
                return Ok(());
            }

            match Connection::connect(&self.irc).await {
                Err(e) => {
                    warn!(error = %e, "connect failed, retrying after delay");
                }
                Ok(mut conn) => {
                    match self.drive(&mut conn, &shutdown).await {
                        Ok(()) => {
                            info!("session shutting down");
                            return Ok(());
                        }
                        Err(e) => {
                            warn!(error = %e, "connection lost, reconnecting after delay");
                        }
                    }
                }
            }

            tokio::select! {
                biased;

                _ = shutdown.cancelled() => return Ok(()),
                _ = tokio::time::sleep(RECONNECT_DELAY) => {}
            }
        }
    }

    /// Drive one connection until shutdown (`Ok`) or disconnect (`Err`).
    async fn drive(
        &mut self,
        conn: &mut Connection,
        shutdown: &CancellationToken,
    ) -> Result<(), AppError> {
        conn.send_line(&format!("NICK {}", self.bot_nick)).await?;
        conn.send_line(&format!("USER {} 0 * :{}", self.user_id, self.real_name))
            .await?;

        // One fallback nick per connection attempt.
        let mut nick_retried = false;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    let _ = conn.send_line("QUIT :shutting down").await;
                    return Ok(());
                }

                line = conn.read_line() => {
                    let Some(line) = line? else {
                        return Err(AppError::Transport("server closed the connection".into()));
                    };

                    match message::parse(&line) {
                        ServerMessage::Ping { token } => {
                            conn.send_line(&format!("PONG :{token}")).await?;
                        }
                        ServerMessage::Welcome => {
                            info!(channel = %self.irc.channel, "registered, joining channel");
                            conn.send_line(&format!("JOIN {}", self.irc.channel)).await?;
                        }
                        ServerMessage::NickInUse => {
                            if nick_retried {
                                return Err(AppError::Transport(
                                    "nick and fallback both in use".into(),
                                ));
                            }
                            nick_retried = true;
                            self.bot_nick.push('_');
                            warn!(nick = %self.bot_nick, "nick in use, retrying with fallback");
                            conn.send_line(&format!("NICK {}", self.bot_nick)).await?;
                        }
                        ServerMessage::Privmsg { sender, target, text } => {
                            let event = ChatEvent::new(sender, target, text);
                            match self.route_event(event) {
                                Routed::Reply(reply) => {
                                    conn.send_privmsg(&reply.target, &reply.text).await?;
                                }
                                Routed::Dispatch { triggered, event, snapshot } => {
                                    let dispatcher = self.dispatcher.clone();
                                    tokio::spawn(async move {
                                        dispatcher.dispatch(triggered, event, snapshot).await;
                                    });
                                }
                                Routed::Nothing => {}
                            }
                        }
                        ServerMessage::Other => {
                            debug!(%line, "ignoring server line");
                        }
                    }
                }
            }
        }
    }

    /// Route one chat event through commands and classification.
    ///
    /// Direct messages are command surface only. On channel messages the
    /// literal status command short-circuits the mention scan; everything
    /// else is classified against the current registry snapshot.
    fn route_event(&mut self, event: ChatEvent) -> Routed {
        if event.is_direct(&self.bot_nick) {
            return match self.handler.handle_direct(&mut self.registry, &event) {
                Some(reply) => Routed::Reply(reply),
                None => Routed::Nothing,
            };
        }

        if let Some(reply) = self.handler.handle_public(&self.registry, &event) {
            return Routed::Reply(reply);
        }

        let snapshot = self.registry.snapshot();
        let triggered = classify(&event, &snapshot, &self.bot_nick);
        if triggered.is_empty() {
            return Routed::Nothing;
        }

        info!(
            triggers = %triggered.iter().cloned().collect::<Vec<_>>().join(", "),
            sender = %event.sender,
            channel = %event.target,
            "mention detected"
        );

        Routed::Dispatch { triggered, event, snapshot }
    }
}
