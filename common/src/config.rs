//! Process-wide configuration.
//!
//! Credentials and defaults are loaded once at boot from the environment, following an
//! upward search for a `.env` file the way most daemons bootstrap their secrets outside of
//! version control. This is a configuration *loading* engine, not a file format: unlike the
//! HCL-file lookup used elsewhere in this family of tools, the surface here is entirely
//! environment variables, because that is what the broker credentials and listen address are
//! specified as.
//!

use std::env;
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::ConfigError;

/// Default STDDS/TAIS/TDES/SMES broker host.
const DEFAULT_SFDPS_HOST: &str = "tls://swim.faa.gov:55443";

/// Default listen address for the HTTP/WebSocket surface.
const DEFAULT_LISTEN: &str = "::1";

/// Default listen port for the HTTP/WebSocket surface.
const DEFAULT_PORT: u16 = 5001;

/// Default staleness eviction window, in seconds.
const DEFAULT_STALE_TIMEOUT_SECS: u64 = 600;

/// Credentials and connection parameters for one broker session (SFDPS or STDDS).
#[derive(Clone, Debug, Default)]
pub struct BrokerConfig {
    pub host: String,
    pub vpn: String,
    pub user: String,
    pub pass: String,
    pub queue: String,
}

impl BrokerConfig {
    /// SFDPS-style single-underscore suffixes: `{prefix}_HOST|VPN|USER|PASS|QUEUE`.
    fn from_env(prefix: &str, default_host: &str) -> Result<Self, ConfigError> {
        let host = env::var(format!("{prefix}_HOST")).unwrap_or_else(|_| default_host.to_owned());
        let vpn = require_var(&format!("{prefix}_VPN"))?;
        let user = require_var(&format!("{prefix}_USER"))?;
        let pass = require_var(&format!("{prefix}_PASS"))?;
        let queue = require_var(&format!("{prefix}_QUEUE"))?;
        Ok(Self {
            host,
            vpn,
            user,
            pass,
            queue,
        })
    }

    /// STDDS-style double-underscore suffixes:
    /// `{prefix}__HOST|MESSAGEVPN|USERNAME|PASSWORD|QUEUENAME`.
    fn from_env_stdds(prefix: &str, default_host: &str) -> Result<Self, ConfigError> {
        let host = env::var(format!("{prefix}__HOST")).unwrap_or_else(|_| default_host.to_owned());
        let vpn = require_var(&format!("{prefix}__MESSAGEVPN"))?;
        let user = require_var(&format!("{prefix}__USERNAME"))?;
        let pass = require_var(&format!("{prefix}__PASSWORD"))?;
        let queue = require_var(&format!("{prefix}__QUEUENAME"))?;
        Ok(Self {
            host,
            vpn,
            user,
            pass,
            queue,
        })
    }
}

fn require_var(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar(name.to_owned()))
}

/// Top-level process configuration, loaded once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub sfdps: BrokerConfig,
    pub stdds: BrokerConfig,
    pub listen: IpAddr,
    pub port: u16,
    pub stale_timeout_secs: u64,
}

impl Config {
    /// Loads configuration from the environment, having first injected the given `.env` file
    /// if one is named, or else the first one found by searching upward from the current
    /// working directory.
    #[tracing::instrument]
    pub fn load(env_file: Option<&Path>) -> Result<Self, ConfigError> {
        load_dotenv(env_file);

        let sfdps = BrokerConfig::from_env("SFDPS", DEFAULT_SFDPS_HOST)?;
        let stdds = BrokerConfig::from_env_stdds("SCDSCONNECTION", DEFAULT_SFDPS_HOST)?;

        let listen = env::var("SWIM_LISTEN")
            .ok()
            .map(|s| s.parse::<IpAddr>().map_err(|_| ConfigError::InvalidVar("SWIM_LISTEN".into())))
            .transpose()?
            .unwrap_or_else(|| DEFAULT_LISTEN.parse().expect("default listen address is valid"));

        let port = env::var("SWIM_PORT")
            .ok()
            .map(|s| s.parse::<u16>().map_err(|_| ConfigError::InvalidVar("SWIM_PORT".into())))
            .transpose()?
            .unwrap_or(DEFAULT_PORT);

        let stale_timeout_secs = env::var("SWIM_STALE_TIMEOUT_SECS")
            .ok()
            .map(|s| {
                s.parse::<u64>()
                    .map_err(|_| ConfigError::InvalidVar("SWIM_STALE_TIMEOUT_SECS".into()))
            })
            .transpose()?
            .unwrap_or(DEFAULT_STALE_TIMEOUT_SECS);

        Ok(Self {
            sfdps,
            stdds,
            listen,
            port,
            stale_timeout_secs,
        })
    }
}

/// Injects `explicit`, if given, or else searches upward from the current directory for a
/// `.env` file and injects the first one found. Each non-comment `KEY=VALUE` line is set into
/// the process environment, without overwriting variables already set.
#[tracing::instrument]
fn load_dotenv(explicit: Option<&Path>) {
    if let Some(path) = explicit {
        trace!("using explicit .env at {path:?}");
        inject_dotenv(&path.to_path_buf());
        return;
    }

    let Ok(start) = env::current_dir() else {
        return;
    };

    let mut dir: &Path = &start;
    loop {
        let candidate = dir.join(".env");
        if candidate.is_file() {
            trace!("found .env at {candidate:?}");
            inject_dotenv(&candidate);
            return;
        }
        match dir.parent() {
            Some(parent) => dir = parent,
            None => return,
        }
    }
}

fn inject_dotenv(path: &PathBuf) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim().trim_matches('"');
        if env::var(key).is_err() {
            debug!("setting {key} from .env");
            // SAFETY: single-threaded startup phase, before any other task reads the
            // environment concurrently.
            unsafe {
                env::set_var(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn require_var_reports_missing() {
        env::remove_var("SWIM_TEST_DOES_NOT_EXIST");
        let err = require_var("SWIM_TEST_DOES_NOT_EXIST").unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(_)));
    }

    #[test]
    fn from_env_stdds_reads_double_underscore_vars() {
        // SAFETY: test-local environment variables, no concurrent access.
        unsafe {
            env::set_var("SWIM_TEST_STDDS__MESSAGEVPN", "vpn1");
            env::set_var("SWIM_TEST_STDDS__USERNAME", "user1");
            env::set_var("SWIM_TEST_STDDS__PASSWORD", "pass1");
            env::set_var("SWIM_TEST_STDDS__QUEUENAME", "queue1");
        }
        let config = BrokerConfig::from_env_stdds("SWIM_TEST_STDDS", "tls://default").unwrap();
        assert_eq!(config.host, "tls://default");
        assert_eq!(config.vpn, "vpn1");
        assert_eq!(config.user, "user1");
        assert_eq!(config.pass, "pass1");
        assert_eq!(config.queue, "queue1");
    }

    #[test]
    fn inject_dotenv_does_not_override_existing() {
        // SAFETY: test-local environment variable, no concurrent access.
        unsafe {
            env::set_var("SWIM_ALREADY_SET", "original");
        }
        let dir = tempfile_dir();
        let path = dir.join(".env");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "SWIM_ALREADY_SET=overwritten").unwrap();
        writeln!(f, "SWIM_FROM_DOTENV=hello").unwrap();
        inject_dotenv(&path);
        assert_eq!(env::var("SWIM_ALREADY_SET").unwrap(), "original");
        assert_eq!(env::var("SWIM_FROM_DOTENV").unwrap(), "hello");
        fs::remove_dir_all(dir).ok();
    }

    fn tempfile_dir() -> PathBuf {
        let dir = env::temp_dir().join(format!("swim-common-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }
}
