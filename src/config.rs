// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the settings file that tells provision where the
//! sites directory, the Apache configuration, the hosts file, and the MySQL
//! option file live on the current machine. Every field has a default that
//! matches a Homebrew install on macOS, so the settings file is optional.
//!
//! # General Layout
//!
//! ```toml
//! tld = "test"
//! sites_dir = "~/Sites"
//! mysql_defaults = "~/.my.cnf"
//! hosts_file = "/etc/hosts"
//!
//! [remote]
//! host = "github.com"
//! owner = "someone"
//!
//! [apache]
//! vhosts_dir = "/opt/homebrew/etc/httpd/vhosts"
//! certs_dir = "/opt/homebrew/etc/httpd/certs"
//! restart = ["sudo", "apachectl", "-k", "restart"]
//!
//! [wordpress]
//! admin_user = "admin"
//! admin_password = "password"
//! admin_email = "admin@example.com"
//! ```
//!
//! All path fields go through shell expansion, so `~` and `$VAR` are allowed.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

/// Settings for every provisioning run.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Local top-level domain appended to every project's clean name.
    pub tld: String,

    /// Directory that holds one folder per project.
    pub sites_dir: PathBuf,

    /// MySQL option file holding the `[client]` credentials.
    pub mysql_defaults: PathBuf,

    /// System hosts file that maps project domains to loopback.
    pub hosts_file: PathBuf,

    /// Where upstream repositories are looked up and cloned from.
    pub remote: RemoteSettings,

    /// Apache site registration.
    pub apache: ApacheSettings,

    /// WordPress installation defaults.
    pub wordpress: WordPressSettings,
}

impl Settings {
    /// Load settings from target path.
    ///
    /// A missing file is not an error: the defaults are used instead.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if the file exists but cannot be read.
    /// - Return [`ConfigError::Deserialize`] if the file is malformed.
    /// - Return [`ConfigError::ShellExpansion`] if a path cannot be expanded.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("no settings at {}, using defaults", path.display());
            return Self::default().expanded();
        }

        debug!("load settings from {}", path.display());
        read_to_string(path)
            .map_err(|err| ConfigError::Read {
                source: err,
                path: path.to_path_buf(),
            })?
            .parse()
    }

    /// Perform shell expansion on every path field.
    pub fn expanded(mut self) -> Result<Self> {
        self.sites_dir = expand_path(&self.sites_dir)?;
        self.mysql_defaults = expand_path(&self.mysql_defaults)?;
        self.hosts_file = expand_path(&self.hosts_file)?;
        self.apache.vhosts_dir = expand_path(&self.apache.vhosts_dir)?;
        self.apache.certs_dir = expand_path(&self.apache.certs_dir)?;

        Ok(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tld: "test".into(),
            sites_dir: PathBuf::from("~/Sites"),
            mysql_defaults: PathBuf::from("~/.my.cnf"),
            hosts_file: PathBuf::from("/etc/hosts"),
            remote: RemoteSettings::default(),
            apache: ApacheSettings::default(),
            wordpress: WordPressSettings::default(),
        }
    }
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let settings: Settings = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Paths are always handed out expanded.
        settings.expanded()
    }
}

impl Display for Settings {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Upstream repository host.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteSettings {
    /// Host name reachable over SSH.
    pub host: String,

    /// Account that owns project repositories.
    ///
    /// Falls back to the `github.user` git configuration entry when unset.
    pub owner: Option<String>,
}

impl RemoteSettings {
    /// SSH URL of repository `name` owned by `owner`.
    pub fn url_for(&self, owner: &str, name: &str) -> String {
        format!("git@{}:{owner}/{name}.git", self.host)
    }
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            host: "github.com".into(),
            owner: None,
        }
    }
}

/// Apache site registration settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApacheSettings {
    /// Directory included by httpd.conf where per-domain files are written.
    pub vhosts_dir: PathBuf,

    /// Directory where mkcert drops per-domain certificate pairs.
    pub certs_dir: PathBuf,

    /// Command line that restarts Apache.
    pub restart: Vec<String>,
}

impl Default for ApacheSettings {
    fn default() -> Self {
        Self {
            vhosts_dir: PathBuf::from("/opt/homebrew/etc/httpd/vhosts"),
            certs_dir: PathBuf::from("/opt/homebrew/etc/httpd/certs"),
            restart: ["sudo", "apachectl", "-k", "restart"]
                .map(String::from)
                .to_vec(),
        }
    }
}

/// Defaults handed to `wp core install`.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct WordPressSettings {
    pub admin_user: String,
    pub admin_password: String,
    pub admin_email: String,
}

impl Default for WordPressSettings {
    fn default() -> Self {
        Self {
            admin_user: "admin".into(),
            admin_password: "password".into(),
            admin_email: "admin@example.com".into(),
        }
    }
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    Ok(shellexpand::full(path.to_string_lossy().as_ref())
        .map_err(ConfigError::ShellExpansion)?
        .into_owned()
        .into())
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read settings file.
    #[error("failed to read settings from {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
