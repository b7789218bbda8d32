//! Mention classification — decides which watch nicks an event triggers.
//!
//! Pure function over an event and a registry snapshot; no I/O, no state.
//!
//! Matching is substring-based, not word-boundary based: a watch nick that is
//! a substring of another word still matches. That false-positive tolerance
//! is part of the contract, not a bug to fix.

use std::collections::BTreeSet;

use crate::event::ChatEvent;
use crate::registry::TenantRecord;

/// Return the set of watch nicks (lowercased) mentioned in `event`.
///
/// Rules:
/// - Direct messages to the bot are command surface, never scanned — the
///   result is empty when `event.target` equals `bot_nick`.
/// - A nick triggers iff it is a non-empty substring of the lowercased text
///   and does not equal the sender's own nick (no self-triggering).
/// - Watch nicks shared by several tenants appear once; the dispatcher fans
///   out to all owners.
pub fn classify(
    event: &ChatEvent,
    snapshot: &[TenantRecord],
    bot_nick: &str,
) -> BTreeSet<String> {
    if event.is_direct(bot_nick) {
        return BTreeSet::new();
    }

    let text = event.text.trim().to_lowercase();
    let sender = event.sender.to_lowercase();

    let mut triggered = BTreeSet::new();
    for record in snapshot {
        let watch = record.watch_nick.to_lowercase();
        if !watch.is_empty() && text.contains(&watch) && watch != sender {
            triggered.insert(watch);
        }
    }
    triggered
}
