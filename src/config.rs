// SPDX-License-Identifier: Apache-2.0

//! Daemon configuration (spec §6 "Configuration options"), loaded from
//! a TOML file with every field overridable by an environment
//! variable, following the same "declare once, bind CLI/env/file
//! together" shape the teacher's `clap` `env` feature gives each
//! option — here expressed as a plain `serde` struct loaded by the
//! binary rather than a bespoke macro layer.

use std::fs;
use std::path::Path;

use amplify::{Display, Error, From};
use serde::{Deserialize, Serialize};

fn default_sock_path() -> String { "/var/run/netconfd/netconfd.sock".to_string() }
fn default_sock_family() -> SockFamily { SockFamily::Unix }
fn default_transaction_mod() -> TransactionMode { TransactionMode::FullTree }
fn default_confirmed_commit_timeout() -> u64 { 600 }
fn default_failsafe_datastore_name() -> String { "failsafe".to_string() }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SockFamily {
    Unix,
    Inet,
    Inet6,
}

/// Whether a commit's diff is computed over the whole candidate tree
/// or only over the subtree an `edit-config` targeted (spec §6
/// "transaction-mod", an operator-tunable performance/strictness
/// trade-off clixon itself exposes as a build-time choice).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionMode {
    FullTree,
    ChangedSubtreeOnly,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    #[serde(default = "default_sock_path")]
    pub sock_path: String,
    #[serde(default = "default_sock_family")]
    pub sock_family: SockFamily,
    pub sock_port: Option<u16>,
    pub sock_group: Option<String>,

    /// Expose `ietf-yang-library:module-set-state` under
    /// `xmldb-module-state` in `get`/`get-config` replies (spec §6).
    pub xmldb_module_state: bool,
    /// Advertise the RFC 5277 `<streams/>` discovery container.
    pub stream_discovery_rfc5277: bool,
    /// Advertise the RFC 8040 `restconf-state/streams` discovery path.
    pub stream_discovery_rfc8040: bool,
    /// Advertise the RFC 7895 YANG module library.
    pub module_library_rfc7895: bool,

    #[serde(default = "default_transaction_mod")]
    pub transaction_mod: TransactionMode,
    #[serde(default = "default_confirmed_commit_timeout")]
    pub confirmed_commit_timeout_seconds: u64,
    #[serde(default = "default_failsafe_datastore_name")]
    pub failsafe_datastore_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sock_path: default_sock_path(),
            sock_family: default_sock_family(),
            sock_port: None,
            sock_group: None,
            xmldb_module_state: true,
            stream_discovery_rfc5277: true,
            stream_discovery_rfc8040: false,
            module_library_rfc7895: true,
            transaction_mod: default_transaction_mod(),
            confirmed_commit_timeout_seconds: default_confirmed_commit_timeout(),
            failsafe_datastore_name: default_failsafe_datastore_name(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path.as_ref()).map_err(|err| ConfigError::Read(path.as_ref().display().to_string(), err.to_string()))?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> { Ok(toml::from_str(text)?) }
}

#[derive(Clone, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum ConfigError {
    /// unable to read configuration file `{0}`: {1}
    Read(String, String),
    #[from]
    Parse(toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let conf = Config::parse("").unwrap();
        assert_eq!(conf.sock_path, default_sock_path());
        assert_eq!(conf.transaction_mod, TransactionMode::FullTree);
    }

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let conf = Config::parse("sock-path = \"/tmp/netconfd.sock\"\nconfirmed-commit-timeout-seconds = 30\n").unwrap();
        assert_eq!(conf.sock_path, "/tmp/netconfd.sock");
        assert_eq!(conf.confirmed_commit_timeout_seconds, 30);
        assert_eq!(conf.failsafe_datastore_name, "failsafe");
    }

    #[test]
    fn malformed_toml_is_rejected() {
        assert!(matches!(Config::parse("not valid [[["), Err(ConfigError::Parse(_))));
    }
}
