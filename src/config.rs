//! Endpoint configuration for the companion-server link.
//!
//! The endpoint is resolved once at startup from three tiers, first
//! non-empty wins:
//!
//! 1. Environment overrides (`BUDDY_SOCKET_HOST` / `BUDDY_SOCKET_PORT`)
//! 2. The app-provided [`LinkConfig`] defaults (typically loaded from TOML)
//! 3. Hardcoded loopback for the host only
//!
//! There is no fallback port: an arbitrary guessed port is not safe, so a
//! missing port is a fatal [`LinkError::Config`]. An *invalid* environment
//! port (non-numeric, wrong length, out of range) is ignored rather than
//! fatal, falling through to the next tier.

use crate::error::{LinkError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable overriding the server host.
pub const HOST_ENV: &str = "BUDDY_SOCKET_HOST";

/// Environment variable overriding the server port.
///
/// The value must be a 2-to-5 digit decimal string naming a valid port.
pub const PORT_ENV: &str = "BUDDY_SOCKET_PORT";

/// Host used when neither the environment nor the config names one.
pub const FALLBACK_HOST: &str = "127.0.0.1";

/// App-provided endpoint defaults, the second resolution tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Default server host (empty/absent falls through to loopback).
    pub host: Option<String>,
    /// Default server port (required when the environment names none).
    pub port: Option<u16>,
}

impl LinkConfig {
    /// Load defaults from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Config`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            LinkError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&raw)
            .map_err(|e| LinkError::Config(format!("failed to parse {}: {e}", path.display())))
    }
}

/// A resolved connection endpoint. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Server hostname or IP address.
    pub host: String,
    /// Server TCP port.
    pub port: u16,
}

impl Endpoint {
    /// Resolve the endpoint from the environment and the given defaults.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Config`] when no tier yields a port.
    pub fn resolve(defaults: &LinkConfig) -> Result<Self> {
        let env_host = std::env::var(HOST_ENV).ok();
        let env_port = std::env::var(PORT_ENV).ok();
        Self::resolve_from(env_host.as_deref(), env_port.as_deref(), defaults)
    }

    /// Tier resolution with the environment values passed in explicitly.
    pub fn resolve_from(
        env_host: Option<&str>,
        env_port: Option<&str>,
        defaults: &LinkConfig,
    ) -> Result<Self> {
        let host = resolve_host(env_host, defaults);
        let port = resolve_port(env_port, defaults)?;
        Ok(Self { host, port })
    }

    /// `host:port` form used for connecting and logging.
    #[must_use]
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn resolve_host(env_host: Option<&str>, defaults: &LinkConfig) -> String {
    if let Some(raw) = env_host {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return trimmed.to_owned();
        }
    }
    if let Some(raw) = defaults.host.as_deref() {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return trimmed.to_owned();
        }
    }
    FALLBACK_HOST.to_owned()
}

fn resolve_port(env_port: Option<&str>, defaults: &LinkConfig) -> Result<u16> {
    if let Some(raw) = env_port {
        if let Some(port) = parse_env_port(raw) {
            return Ok(port);
        }
        tracing::warn!(raw, "ignoring invalid {PORT_ENV} value");
    }
    defaults.port.ok_or_else(|| {
        LinkError::Config(format!(
            "no server port configured: set {PORT_ENV} or provide a default port"
        ))
    })
}

/// Accept only a 2-to-5 digit decimal string naming a nonzero port.
fn parse_env_port(raw: &str) -> Option<u16> {
    if !(2..=5).contains(&raw.len()) || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<u16>().ok().filter(|port| *port != 0)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn defaults(host: Option<&str>, port: Option<u16>) -> LinkConfig {
        LinkConfig {
            host: host.map(str::to_owned),
            port,
        }
    }

    // ── Host tiers ──────────────────────────────────────────────────────

    #[test]
    fn env_host_beats_config_default() {
        let ep =
            Endpoint::resolve_from(Some("10.0.0.7"), None, &defaults(Some("192.168.1.2"), Some(5058)))
                .unwrap();
        assert_eq!(ep.host, "10.0.0.7");
    }

    #[test]
    fn blank_env_host_falls_through_to_config() {
        let ep = Endpoint::resolve_from(Some("   "), None, &defaults(Some("192.168.1.2"), Some(5058)))
            .unwrap();
        assert_eq!(ep.host, "192.168.1.2");
    }

    #[test]
    fn missing_host_everywhere_uses_loopback() {
        let ep = Endpoint::resolve_from(None, None, &defaults(None, Some(5058))).unwrap();
        assert_eq!(ep.host, FALLBACK_HOST);
    }

    #[test]
    fn env_host_is_trimmed() {
        let ep = Endpoint::resolve_from(Some(" buddy.local "), None, &defaults(None, Some(5058)))
            .unwrap();
        assert_eq!(ep.host, "buddy.local");
    }

    // ── Port tiers ──────────────────────────────────────────────────────

    #[test]
    fn env_port_beats_config_default() {
        let ep = Endpoint::resolve_from(None, Some("6001"), &defaults(None, Some(5058))).unwrap();
        assert_eq!(ep.port, 6001);
    }

    #[test]
    fn non_numeric_env_port_is_ignored_not_fatal() {
        let ep = Endpoint::resolve_from(None, Some("buddy"), &defaults(None, Some(5058))).unwrap();
        assert_eq!(ep.port, 5058);
    }

    #[test]
    fn single_digit_env_port_is_ignored() {
        let ep = Endpoint::resolve_from(None, Some("7"), &defaults(None, Some(5058))).unwrap();
        assert_eq!(ep.port, 5058);
    }

    #[test]
    fn six_digit_env_port_is_ignored() {
        let ep = Endpoint::resolve_from(None, Some("123456"), &defaults(None, Some(5058))).unwrap();
        assert_eq!(ep.port, 5058);
    }

    #[test]
    fn out_of_range_env_port_is_ignored() {
        // Five digits but larger than any valid port.
        let ep = Endpoint::resolve_from(None, Some("70000"), &defaults(None, Some(5058))).unwrap();
        assert_eq!(ep.port, 5058);
    }

    #[test]
    fn no_port_anywhere_is_a_config_error() {
        let err = Endpoint::resolve_from(None, None, &defaults(Some("10.0.0.7"), None)).unwrap_err();
        assert!(matches!(err, LinkError::Config(_)));
    }

    #[test]
    fn invalid_env_port_with_no_default_is_a_config_error() {
        let err = Endpoint::resolve_from(None, Some("abc"), &defaults(None, None)).unwrap_err();
        assert!(matches!(err, LinkError::Config(_)));
    }

    #[test]
    fn authority_formats_host_and_port() {
        let ep = Endpoint {
            host: "127.0.0.1".to_owned(),
            port: 5058,
        };
        assert_eq!(ep.authority(), "127.0.0.1:5058");
    }

    // ── TOML defaults ───────────────────────────────────────────────────

    #[test]
    fn link_config_loads_from_toml_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("link.toml");
        std::fs::write(&path, "host = \"192.168.1.20\"\nport = 5058\n").unwrap();

        let config = LinkConfig::load(&path).unwrap();
        assert_eq!(config.host.as_deref(), Some("192.168.1.20"));
        assert_eq!(config.port, Some(5058));
    }

    #[test]
    fn link_config_fields_default_to_none() {
        let config: LinkConfig = toml::from_str("").unwrap();
        assert_eq!(config, LinkConfig::default());
        assert!(config.host.is_none());
        assert!(config.port.is_none());
    }

    #[test]
    fn link_config_load_rejects_bad_toml() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("link.toml");
        std::fs::write(&path, "port = \"not a number\"").unwrap();

        assert!(matches!(LinkConfig::load(&path), Err(LinkError::Config(_))));
    }

    #[test]
    fn link_config_load_missing_file_is_config_error() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("absent.toml");
        assert!(matches!(LinkConfig::load(&path), Err(LinkError::Config(_))));
    }
}
