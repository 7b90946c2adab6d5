// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! MySQL client credentials.
//!
//! Provision never asks for database credentials. It borrows them from the
//! `[client]` section of the user's MySQL option file, the same file the
//! `mysql` command line client reads:
//!
//! ```ini
//! [client]
//! user=alice
//! password=secret
//! ```
//!
//! Credentials live in memory for a single run, and the password is kept out
//! of debug output.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    fs::read_to_string,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

/// Database user and password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    user: String,
    password: String,
}

impl Credentials {
    /// Construct new credentials.
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// Read credentials from MySQL option file at target path.
    ///
    /// # Errors
    ///
    /// - Return [`CredentialsError::Read`] if the option file cannot be read.
    /// - Return [`CredentialsError::MissingKey`] if the `[client]` section
    ///   lacks a user or password.
    #[instrument(skip(path), level = "debug")]
    pub fn from_option_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("read mysql credentials from {}", path.display());
        let content = read_to_string(path).map_err(|err| CredentialsError::Read {
            source: err,
            path: path.to_path_buf(),
        })?;

        Self::parse(&content).map_err(|key| CredentialsError::MissingKey {
            key,
            path: path.to_path_buf(),
        })
    }

    /// Parse `[client]` section of option file content.
    ///
    /// Scanning stops as soon as both keys are found. Returns the name of the
    /// first missing key on failure.
    pub fn parse(content: &str) -> std::result::Result<Self, &'static str> {
        let mut in_client = false;
        let mut user = None;
        let mut password = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(section) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                in_client = section.trim() == "client";
                continue;
            }

            if !in_client {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };

            // INVARIANT: First occurrence of a key wins.
            match key.trim() {
                "user" if user.is_none() => user = Some(unquote(value.trim()).to_string()),
                "password" if password.is_none() => {
                    password = Some(unquote(value.trim()).to_string())
                }
                _ => continue,
            }

            if user.is_some() && password.is_some() {
                break;
            }
        }

        match (user, password) {
            (Some(user), Some(password)) => Ok(Self { user, password }),
            (None, _) => Err("user"),
            (_, None) => Err("password"),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl Debug for Credentials {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }

    value
}

/// Credential loading error types.
#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    /// Option file cannot be read.
    #[error("failed to read mysql option file at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Option file lacks a required key in its `[client]` section.
    #[error("no {key:?} entry in [client] section of {:?}", path.display())]
    MissingKey { key: &'static str, path: PathBuf },
}

/// Friendly result alias :3
type Result<T, E = CredentialsError> = std::result::Result<T, E>;
