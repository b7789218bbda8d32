//! Tenant registry — durable mapping of tenant → watch configuration.
//!
//! # Lifecycle modes
//!
//! The mode is fixed at construction and immutable for the process lifetime:
//!
//! - [`Registry::load`] builds an **open** (multi-tenant) registry backed by
//!   `users.json`; new tenants arrive through [`Registry::register`] and are
//!   persisted immediately.
//! - [`Registry::single_tenant`] builds a registry holding at most one
//!   synthetic record from the operator's own credentials. It is never
//!   persisted and rejects registrations.
//!
//! # Availability over strictness
//!
//! `load` never fails: a missing file degrades to an empty registry with a
//! warning, a corrupt file degrades to an empty registry with an error.
//! `save` failures are logged, not propagated — the chat-command surface
//! stays available no matter what the disk does.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

/// Minimum accepted Pushover user key length. A format guard against
/// obviously malformed input, not cryptographic validation.
pub const MIN_KEY_LEN: usize = 30;
/// Minimum accepted watch-nick length.
pub const MIN_NICK_LEN: usize = 3;

// ── Records ──────────────────────────────────────────────────────────────────

/// One registered user's watch configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRecord {
    /// Pushover user key for this tenant.
    pub notification_key: String,
    /// The nick this tenant wants to be alerted about, case-insensitive.
    pub watch_nick: String,
    /// Delivery-priority hint passed through to the sink.
    #[serde(default)]
    pub priority: i32,
}

/// Why a registration was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegisterError {
    #[error("the registration system is disabled")]
    Closed,

    #[error("invalid notification key or watch nick format")]
    InvalidFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryMode {
    /// Multi-tenant: records persisted, registrations accepted.
    Open,
    /// One synthetic operator record, never persisted, registrations refused.
    SingleTenant,
}

// ── Registry ─────────────────────────────────────────────────────────────────

pub struct Registry {
    mode: RegistryMode,
    tenants: HashMap<String, TenantRecord>,
    /// Backing file — `None` in single-tenant mode.
    path: Option<PathBuf>,
}

impl Registry {
    /// Load the multi-tenant registry from `path`.
    ///
    /// Missing file: empty registry, warning. Unparseable file: empty
    /// registry, error — the process stays up rather than crashing on bad
    /// state. Entries violating the non-empty invariant are dropped
    /// individually so one bad record cannot evict valid tenants.
    pub fn load(path: &Path) -> Self {
        let tenants = match fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "user file not found, starting with empty registry");
                HashMap::new()
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "cannot read user file, starting empty");
                HashMap::new()
            }
            Ok(data) => match serde_json::from_str::<HashMap<String, TenantRecord>>(&data) {
                Err(e) => {
                    error!(path = %path.display(), error = %e, "user file is corrupt, starting empty");
                    HashMap::new()
                }
                Ok(parsed) => {
                    let mut tenants = HashMap::with_capacity(parsed.len());
                    for (tenant_id, record) in parsed {
                        if record.watch_nick.is_empty() || record.notification_key.is_empty() {
                            warn!(%tenant_id, "dropping record with empty watch nick or key");
                            continue;
                        }
                        tenants.insert(tenant_id, record);
                    }
                    info!(count = tenants.len(), path = %path.display(), "loaded user configurations");
                    tenants
                }
            },
        };

        Self { mode: RegistryMode::Open, tenants, path: Some(path.to_path_buf()) }
    }

    /// Build the single-tenant registry from the operator's own credentials,
    /// keyed by the bot's nick.
    ///
    /// A missing key or nick is a configuration error: logged, and the bot
    /// runs degraded with zero tenants rather than refusing to start.
    pub fn single_tenant(
        bot_nick: &str,
        notification_key: Option<&str>,
        watch_nick: &str,
        priority: i32,
    ) -> Self {
        let mut tenants = HashMap::new();
        match notification_key {
            Some(key) if !key.is_empty() && !watch_nick.is_empty() => {
                tenants.insert(
                    bot_nick.to_string(),
                    TenantRecord {
                        notification_key: key.to_string(),
                        watch_nick: watch_nick.to_string(),
                        priority,
                    },
                );
                warn!(watch_nick, "single-tenant mode: monitoring the operator's nick");
            }
            _ => {
                error!(
                    "single-tenant mode enabled but PUSHOVER_USER_KEY or personal nick is missing"
                );
            }
        }
        Self { mode: RegistryMode::SingleTenant, tenants, path: None }
    }

    pub fn mode(&self) -> RegistryMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }

    /// Register (or re-register) a tenant and persist immediately.
    ///
    /// Re-registration by the same tenant replaces the prior record.
    pub fn register(
        &mut self,
        tenant_id: &str,
        notification_key: &str,
        watch_nick: &str,
    ) -> Result<(), RegisterError> {
        if self.mode == RegistryMode::SingleTenant {
            return Err(RegisterError::Closed);
        }
        if notification_key.len() < MIN_KEY_LEN || watch_nick.len() < MIN_NICK_LEN {
            return Err(RegisterError::InvalidFormat);
        }

        self.tenants.insert(
            tenant_id.to_string(),
            TenantRecord {
                notification_key: notification_key.to_string(),
                watch_nick: watch_nick.to_string(),
                priority: 0,
            },
        );
        self.save();
        Ok(())
    }

    /// Persist the full registry. Failures are logged, never fatal.
    ///
    /// Writes to a sibling temp file and renames over the target so a
    /// concurrent reader never observes a partial document.
    pub fn save(&self) {
        let Some(path) = &self.path else {
            // Single-tenant registries are synthetic and never hit disk.
            return;
        };

        if let Err(e) = self.write_atomic(path) {
            error!(path = %path.display(), error = %e, "failed to save user data");
        } else {
            info!(count = self.tenants.len(), "saved user configurations");
        }
    }

    fn write_atomic(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let data = serde_json::to_string_pretty(&self.tenants)
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, data)?;
        fs::rename(&tmp, path)
    }

    /// Read-only snapshot for the classifier and dispatcher.
    ///
    /// Owned clone — dispatch tasks may outlive the borrow that produced it.
    pub fn snapshot(&self) -> Vec<TenantRecord> {
        self.tenants.values().cloned().collect()
    }
}
