//! Typed chat event — the one shape all inbound messages take.
//!
//! The IRC session adapter constructs a [`ChatEvent`] per `PRIVMSG` and the
//! core consumes it structurally; no module downstream of the transport ever
//! touches raw protocol lines.

/// One inbound chat message, consumed once and discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    /// Nick of the message author.
    pub sender: String,
    /// Who the message was addressed to — a channel or the bot itself.
    pub target: String,
    /// Raw message text, untrimmed.
    pub text: String,
}

impl ChatEvent {
    pub fn new(
        sender: impl Into<String>,
        target: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self { sender: sender.into(), target: target.into(), text: text.into() }
    }

    /// `true` when the message was addressed to the bot itself (a private
    /// message) rather than broadcast to a channel.
    pub fn is_direct(&self, bot_nick: &str) -> bool {
        self.target.eq_ignore_ascii_case(bot_nick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_is_case_insensitive() {
        let e = ChatEvent::new("carol", "NickWatchz0r", "hi");
        assert!(e.is_direct("nickwatchz0r"));
    }

    #[test]
    fn channel_target_is_not_direct() {
        let e = ChatEvent::new("carol", "#channel", "hi");
        assert!(!e.is_direct("nickwatchz0r"));
    }
}
