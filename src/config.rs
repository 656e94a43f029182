//! Gateway configuration from the environment

use crate::pairing::PairingSettings;
use crate::session::ReconnectPolicy;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BRIDGE_URL: &str = "http://127.0.0.1:3100";
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Keep-alive pinger settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeepAliveConfig {
    pub url: String,
    pub interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub port: u16,
    /// Base URL of the messaging bridge
    pub bridge_url: String,
    pub reconnect: ReconnectPolicy,
    pub pairing: PairingSettings,
    pub keepalive: Option<KeepAliveConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bridge_url: DEFAULT_BRIDGE_URL.to_string(),
            reconnect: ReconnectPolicy::default(),
            pairing: PairingSettings::default(),
            keepalive: None,
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source (tests pass a map)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let port = parse_or("PORT", get("PORT"), defaults.port)?;
        let bridge_url = get("BRIDGE_URL").unwrap_or(defaults.bridge_url);

        let reconnect = ReconnectPolicy {
            delay: secs_or(
                "RECONNECT_DELAY_SECS",
                get("RECONNECT_DELAY_SECS"),
                defaults.reconnect.delay,
            )?,
            max_attempts: parse_or(
                "RECONNECT_MAX_ATTEMPTS",
                get("RECONNECT_MAX_ATTEMPTS"),
                defaults.reconnect.max_attempts,
            )?,
            probe_interval: positive_secs_or(
                "HEALTH_CHECK_INTERVAL_SECS",
                get("HEALTH_CHECK_INTERVAL_SECS"),
                defaults.reconnect.probe_interval,
            )?,
        };

        let pairing = PairingSettings {
            poll_interval: positive_secs_or(
                "QR_POLL_SECS",
                get("QR_POLL_SECS"),
                defaults.pairing.poll_interval,
            )?,
            reload_interval: positive_secs_or(
                "QR_RELOAD_SECS",
                get("QR_RELOAD_SECS"),
                defaults.pairing.reload_interval,
            )?,
        };

        let keepalive = match get("KEEPALIVE_URL") {
            Some(url) => Some(KeepAliveConfig {
                url,
                interval: positive_secs_or(
                    "KEEPALIVE_INTERVAL_SECS",
                    get("KEEPALIVE_INTERVAL_SECS"),
                    DEFAULT_KEEPALIVE_INTERVAL,
                )?,
            }),
            None => None,
        };

        Ok(Self {
            port,
            bridge_url,
            reconnect,
            pairing,
            keepalive,
        })
    }
}

fn parse_or<T>(var: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn secs_or(
    var: &'static str,
    value: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    parse_or(var, value, default.as_secs()).map(Duration::from_secs)
}

/// Like `secs_or` but rejects zero (tokio intervals panic on a zero period)
fn positive_secs_or(
    var: &'static str,
    value: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let secs = secs_or(var, value, default)?;
    if secs.is_zero() {
        return Err(ConfigError::Invalid {
            var,
            value: "0".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(secs)
}
