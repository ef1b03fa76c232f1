//! Host key acceptance policy.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

/// How the SSH transport decides whether to trust a server key
///
/// `AcceptAll` exists for lab setups only and must be chosen explicitly;
/// every connection made under it is logged at `warn` level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum HostKeyPolicy {
    /// Key must match an entry of an OpenSSH `known_hosts` file
    KnownHosts {
        /// File to check; `~/.ssh/known_hosts` when unset
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<PathBuf>,
    },
    /// Key must have this SHA-256 fingerprint
    Fingerprint {
        /// Fingerprint as printed by `ssh-keygen -lf` (`SHA256:...`)
        sha256: String,
    },
    /// Any key is accepted
    AcceptAll,
}

impl Default for HostKeyPolicy {
    fn default() -> Self {
        Self::KnownHosts { path: None }
    }
}

impl HostKeyPolicy {
    /// Resolves the known_hosts file for the `KnownHosts` policy
    ///
    /// `~` in a configured path is expanded. Returns `None` for other
    /// policies or when the home directory is unknown.
    #[must_use]
    pub fn known_hosts_path(&self) -> Option<PathBuf> {
        match self {
            Self::KnownHosts { path: Some(path) } => Some(PathBuf::from(
                shellexpand::tilde(&path.to_string_lossy()).into_owned(),
            )),
            Self::KnownHosts { path: None } => {
                dirs::home_dir().map(|home| home.join(".ssh").join("known_hosts"))
            }
            Self::Fingerprint { .. } | Self::AcceptAll => None,
        }
    }

    /// Returns true if the policy performs no verification
    #[must_use]
    pub const fn is_insecure(&self) -> bool {
        matches!(self, Self::AcceptAll)
    }
}

impl std::fmt::Display for HostKeyPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KnownHosts { path: None } => f.write_str("known-hosts"),
            Self::KnownHosts { path: Some(path) } => write!(f, "known-hosts:{}", path.display()),
            Self::Fingerprint { sha256 } => write!(f, "fingerprint:{sha256}"),
            Self::AcceptAll => f.write_str("accept-all"),
        }
    }
}

impl FromStr for HostKeyPolicy {
    type Err = ConfigError;

    /// Parses `known-hosts`, `known-hosts:<path>`, `fingerprint:<sha256>` or
    /// `accept-all`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (mode, arg) = s
            .split_once(':')
            .map_or((s, None), |(mode, arg)| (mode, Some(arg)));

        match (mode, arg) {
            ("known-hosts", None) => Ok(Self::KnownHosts { path: None }),
            ("known-hosts", Some(path)) if !path.is_empty() => Ok(Self::KnownHosts {
                path: Some(PathBuf::from(path)),
            }),
            ("fingerprint", Some(sha256)) if !normalize_fingerprint(sha256).is_empty() => {
                Ok(Self::Fingerprint {
                    sha256: sha256.to_string(),
                })
            }
            ("accept-all", None) => Ok(Self::AcceptAll),
            _ => Err(ConfigError::Validation {
                field: "host_key_policy".to_string(),
                reason: format!(
                    "Expected known-hosts[:PATH], fingerprint:SHA256:..., or accept-all, got '{s}'"
                ),
            }),
        }
    }
}

/// Strips the `SHA256:` prefix and base64 padding
fn normalize_fingerprint(fingerprint: &str) -> &str {
    let trimmed = fingerprint.trim();
    trimmed
        .strip_prefix("SHA256:")
        .unwrap_or(trimmed)
        .trim_end_matches('=')
}

/// Compares two SHA-256 fingerprints, ignoring prefix and padding
#[must_use]
pub fn fingerprints_match(expected: &str, actual: &str) -> bool {
    let expected = normalize_fingerprint(expected);
    !expected.is_empty() && expected == normalize_fingerprint(actual)
}
