//! Command handling — the bot's private `register` command and the public
//! `!hello` status query.
//!
//! Handlers return [`Reply`] values instead of performing I/O; the session
//! coordinator owns the outbound send. Replies to the register command go to
//! the sender's nick, the status reply goes back to the channel.

use tracing::info;

use crate::event::ChatEvent;
use crate::registry::{RegisterError, Registry, RegistryMode};

/// An outbound chat message produced by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub target: String,
    pub text: String,
}

pub struct CommandHandler {
    bot_nick: String,
    /// The operator's watch nick, named in status and rejection replies.
    personal_nick: String,
}

impl CommandHandler {
    pub fn new(bot_nick: impl Into<String>, personal_nick: impl Into<String>) -> Self {
        Self { bot_nick: bot_nick.into(), personal_nick: personal_nick.into() }
    }

    /// Process a direct (private) message against the registry.
    ///
    /// Recognizes `register <notification_key> <watch_nick>`, case-insensitive
    /// on the verb and with an optional leading `!`. Anything else is
    /// silently ignored.
    pub fn handle_direct(&self, registry: &mut Registry, event: &ChatEvent) -> Option<Reply> {
        let mut parts = event.text.split_whitespace();
        let verb = parts.next()?;
        let verb = verb.strip_prefix('!').unwrap_or(verb);
        if !verb.eq_ignore_ascii_case("register") {
            return None;
        }

        let reply_to = event.sender.clone();

        if registry.mode() == RegistryMode::SingleTenant {
            return Some(Reply {
                target: reply_to,
                text: format!(
                    "The user registration system is disabled. \
                     Monitoring mentions for '{}' only.",
                    self.personal_nick
                ),
            });
        }

        let (Some(key), Some(watch_nick)) = (parts.next(), parts.next()) else {
            return Some(Reply {
                target: reply_to,
                text: "Usage: !register <YourPushoverUserKey> <NickToWatch>".to_string(),
            });
        };

        match registry.register(&event.sender, key, watch_nick) {
            Ok(()) => {
                info!(tenant = %event.sender, watch_nick, "tenant registered");
                Some(Reply {
                    target: reply_to,
                    text: format!(
                        "Registration successful! You will receive notifications \
                         for mentions of '{watch_nick}'."
                    ),
                })
            }
            Err(RegisterError::InvalidFormat) => Some(Reply {
                target: reply_to,
                text: "Error: Invalid Pushover Key or Nick To Watch format.".to_string(),
            }),
            Err(RegisterError::Closed) => Some(Reply {
                target: reply_to,
                text: format!(
                    "The user registration system is disabled. \
                     Monitoring mentions for '{}' only.",
                    self.personal_nick
                ),
            }),
        }
    }

    /// Answer the public `!hello` status query on channel messages.
    ///
    /// Matched on the full trimmed message, case-insensitive. Only the
    /// literal command gets a reply; a message merely containing "hello"
    /// flows through mention classification instead.
    pub fn handle_public(&self, registry: &Registry, event: &ChatEvent) -> Option<Reply> {
        if !event.text.trim().eq_ignore_ascii_case("!hello") {
            return None;
        }

        let text = match registry.mode() {
            RegistryMode::Open => format!(
                "Hello {}! I am {}, the notification monitor. \
                 The multi-user registration system is OPEN. \
                 PM me `!register <YourPushoverUserKey> <NickToWatch>` to get setup.",
                event.sender, self.bot_nick
            ),
            RegistryMode::SingleTenant => format!(
                "Hello {}! I am {}, the notification monitor. \
                 The system is running in Single-User Mode and is only \
                 watching for mentions of {}.",
                event.sender, self.bot_nick, self.personal_nick
            ),
        };

        Some(Reply { target: event.target.clone(), text })
    }
}
