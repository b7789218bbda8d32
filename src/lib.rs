//! nickwatch-bot — IRC mention watcher with Pushover delivery.
//!
//! A standing IRC agent that watches one channel for mentions of registered
//! watch nicks and pushes a notification to each owning tenant. The core is
//! four pieces: [`registry`] (who watches what), [`classifier`] (which nicks
//! an event mentions), [`dispatcher`] (fan-out to the sink), and
//! [`commands`] (the private `register` command and the public `!hello`
//! status query). The [`irc`] session coordinator drives them from the live
//! connection.

pub mod classifier;
pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod irc;
pub mod logger;
pub mod registry;
pub mod sink;
