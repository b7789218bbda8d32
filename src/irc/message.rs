//! Minimal IRC server-message parser.
//!
//! Covers exactly the subset the session needs: PING, the welcome numeric,
//! nick-collision, and PRIVMSG. Everything else is `Other` and ignored by
//! the run loop.

/// One parsed server line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// `PING` — must be answered with `PONG <token>`.
    Ping { token: String },
    /// Numeric 001 — registration accepted, safe to JOIN.
    Welcome,
    /// Numeric 433 — requested nick is taken.
    NickInUse,
    /// `PRIVMSG` to a channel or to the bot.
    Privmsg { sender: String, target: String, text: String },
    /// Anything the session does not act on.
    Other,
}

/// Parse one raw line (without trailing CRLF).
pub fn parse(line: &str) -> ServerMessage {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() {
        return ServerMessage::Other;
    }

    // `:prefix COMMAND params` — the prefix is optional (PING has none).
    let (prefix, rest) = match line.strip_prefix(':') {
        Some(after) => match after.split_once(' ') {
            Some((p, r)) => (Some(p), r),
            None => return ServerMessage::Other,
        },
        None => (None, line),
    };

    let (command, params) = match rest.split_once(' ') {
        Some((c, p)) => (c, p),
        None => (rest, ""),
    };

    match command {
        "PING" => ServerMessage::Ping { token: trailing_or_first(params).to_string() },
        "001" => ServerMessage::Welcome,
        "433" => ServerMessage::NickInUse,
        "PRIVMSG" => {
            let Some(sender) = prefix.map(prefix_nick) else {
                return ServerMessage::Other;
            };
            let Some((target, text)) = params.split_once(' ') else {
                return ServerMessage::Other;
            };
            let text = text.strip_prefix(':').unwrap_or(text);
            ServerMessage::Privmsg {
                sender: sender.to_string(),
                target: target.to_string(),
                text: text.to_string(),
            }
        }
        _ => ServerMessage::Other,
    }
}

/// The nick portion of a `nick!user@host` prefix.
fn prefix_nick(prefix: &str) -> &str {
    prefix.split(['!', '@']).next().unwrap_or(prefix)
}

/// PING tokens arrive as `PING :token` or `PING token`.
fn trailing_or_first(params: &str) -> &str {
    params.strip_prefix(':').unwrap_or_else(|| {
        params.split_whitespace().next().unwrap_or(params)
    })
}
