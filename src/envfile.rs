// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Dotenv key rewriting.
//!
//! Laravel reads its database settings from the `.env` file at the project
//! root. Only target keys are touched. Every other line, comments and blank
//! lines included, is written back as-is.

use std::{
    fs::{read_to_string, write},
    path::{Path, PathBuf},
};

/// Set each `(key, value)` pair in dotenv content.
///
/// An existing `KEY=` line is replaced in place. A commented-out `# KEY=`
/// line is replaced in place when no live line exists. Keys found nowhere
/// are appended.
pub fn set_keys<'a>(
    content: &str,
    pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> String {
    let mut lines: Vec<String> = content.lines().map(str::to_owned).collect();

    for (key, value) in pairs {
        let entry = format!("{key}={}", quote(value));
        let live = lines.iter().position(|line| defines(line, key));
        let commented = || {
            lines.iter().position(|line| {
                line.trim_start()
                    .strip_prefix('#')
                    .is_some_and(|rest| defines(rest, key))
            })
        };

        match live.or_else(commented) {
            Some(index) => lines[index] = entry,
            None => lines.push(entry),
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Rewrite keys of dotenv file at target path.
///
/// # Errors
///
/// - Return [`EnvFileError::Read`] if the file cannot be read.
/// - Return [`EnvFileError::Write`] if the file cannot be written.
pub fn rewrite<'a>(
    path: impl AsRef<Path>,
    pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Result<()> {
    let path = path.as_ref();
    let content = read_to_string(path).map_err(|err| EnvFileError::Read {
        source: err,
        path: path.to_path_buf(),
    })?;

    write(path, set_keys(&content, pairs)).map_err(|err| EnvFileError::Write {
        source: err,
        path: path.to_path_buf(),
    })
}

fn defines(line: &str, key: &str) -> bool {
    line.trim_start()
        .strip_prefix(key)
        .is_some_and(|rest| rest.trim_start().starts_with('='))
}

// INVARIANT: Quoted values never expand `${...}` when Laravel reads them.
//   Single quotes are literal. Inside double quotes `$` is escaped.
fn quote(value: &str) -> String {
    let plain = !value.is_empty()
        && !value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '#' | '"' | '\'' | '$'));

    if plain {
        value.to_string()
    } else if value.contains('$') && !value.contains('\'') {
        format!("'{value}'")
    } else {
        let escaped = value
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('$', "\\$");
        format!("\"{escaped}\"")
    }
}

/// Dotenv file error types.
#[derive(Debug, thiserror::Error)]
pub enum EnvFileError {
    #[error("failed to read env file at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("failed to write env file at {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

type Result<T, E = EnvFileError> = std::result::Result<T, E>;
