// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Project naming.
//!
//! Every provisioning run starts from one domain-like name typed by the user,
//! e.g., "api.example.com". All other identifiers are derived from it:
//!
//! | Identifier | Example            | Used for                          |
//! |------------|--------------------|-----------------------------------|
//! | clean      | `api.example`      | upstream repository name          |
//! | domain     | `api.example.test` | virtual host, certificate, hosts  |
//! | folder     | `api-example-test` | project directory                 |
//! | database   | `api_example_test` | MySQL schema                      |

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Names derived from a single project name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    raw: String,
    clean: String,
    domain: String,
    folder: String,
    database: String,
}

impl Project {
    /// Derive project names from raw name under local top-level domain `tld`.
    ///
    /// # Errors
    ///
    /// - Return [`ProjectError::Empty`] if `name` is empty.
    /// - Return [`ProjectError::InvalidName`] if `name` is not a sequence of
    ///   dot-separated hostname labels.
    pub fn new(name: impl Into<String>, tld: impl AsRef<str>) -> Result<Self> {
        let raw = name.into();
        if raw.is_empty() {
            return Err(ProjectError::Empty);
        }

        if !raw.split('.').all(is_label) {
            return Err(ProjectError::InvalidName(raw));
        }

        let clean = match raw.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => raw.clone(),
        };
        let domain = format!("{clean}.{}", tld.as_ref());
        let folder = domain.replace('.', "-");
        let database = domain.replace('.', "_");

        Ok(Self {
            raw,
            clean,
            domain,
            folder,
            database,
        })
    }

    /// Name exactly as the user typed it.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Raw name without its last dot-segment.
    pub fn clean(&self) -> &str {
        &self.clean
    }

    /// Local domain the site is served under.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Directory name of the project.
    pub fn folder(&self) -> &str {
        &self.folder
    }

    /// MySQL schema name.
    pub fn database(&self) -> &str {
        &self.database
    }
}

// INVARIANT: Labels are non-empty ASCII alphanumerics and hyphens, never
//   starting with a hyphen, so every derived name is safe as a hostname,
//   a path component, and a quoted SQL identifier.
fn is_label(label: &str) -> bool {
    !label.is_empty()
        && !label.starts_with('-')
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

impl Display for Project {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{}", self.domain)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProjectError {
    #[error("project name cannot be empty")]
    Empty,

    #[error("project name {0:?} must be dot-separated labels of letters, digits, and hyphens")]
    InvalidName(String),
}

type Result<T, E = ProjectError> = std::result::Result<T, E>;
