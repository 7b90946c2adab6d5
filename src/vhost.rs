// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Apache virtual host rendering.
//!
//! Each project gets one configuration fragment named after its domain, e.g.,
//! `api.example.test.conf`, inside the directory Apache includes site
//! configuration from. The fragment serves the project over plain HTTP on
//! port 80 and over TLS on port 443 using a locally trusted certificate pair
//! generated by mkcert.

use crate::{credentials::Credentials, project::Project};

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
};

/// Locally trusted certificate pair for a domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificatePair {
    pub cert: PathBuf,
    pub key: PathBuf,
}

impl CertificatePair {
    /// Certificate pair for `domain` inside `certs_dir`.
    pub fn new(certs_dir: impl AsRef<Path>, domain: &str) -> Self {
        let certs_dir = certs_dir.as_ref();
        Self {
            cert: certs_dir.join(format!("{domain}.pem")),
            key: certs_dir.join(format!("{domain}-key.pem")),
        }
    }
}

/// Path of the virtual host fragment for `domain` inside `vhosts_dir`.
pub fn fragment_path(vhosts_dir: impl AsRef<Path>, domain: &str) -> PathBuf {
    vhosts_dir.as_ref().join(format!("{domain}.conf"))
}

/// HTTP and HTTPS virtual host pair for one project.
#[derive(Debug)]
pub struct VirtualHost<'a> {
    pub project: &'a Project,
    pub document_root: &'a Path,
    pub credentials: &'a Credentials,
    pub certificate: &'a CertificatePair,
}

impl VirtualHost<'_> {
    fn write_body(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let root = self.document_root.display();
        writeln!(fmt, "    ServerName {}", self.project.domain())?;
        writeln!(fmt, "    DocumentRoot \"{root}\"")?;
        writeln!(fmt, "    SetEnv DB_DATABASE {}", self.project.database())?;
        writeln!(fmt, "    SetEnv DB_USERNAME {}", quoted(self.credentials.user()))?;
        writeln!(fmt, "    SetEnv DB_PASSWORD {}", quoted(self.credentials.password()))?;
        writeln!(fmt, "    <Directory \"{root}\">")?;
        writeln!(fmt, "        Options Indexes FollowSymLinks")?;
        writeln!(fmt, "        AllowOverride All")?;
        writeln!(fmt, "        Require all granted")?;
        writeln!(fmt, "    </Directory>")
    }
}

// INVARIANT: Backslashes are escaped before quotes, so a trailing backslash
//   never swallows the closing quote.
fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

impl Display for VirtualHost<'_> {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        writeln!(fmt, "<VirtualHost *:80>")?;
        self.write_body(fmt)?;
        writeln!(fmt, "</VirtualHost>")?;
        writeln!(fmt)?;
        writeln!(fmt, "<VirtualHost *:443>")?;
        self.write_body(fmt)?;
        writeln!(fmt, "    SSLEngine on")?;
        writeln!(
            fmt,
            "    SSLCertificateFile \"{}\"",
            self.certificate.cert.display()
        )?;
        writeln!(
            fmt,
            "    SSLCertificateKeyFile \"{}\"",
            self.certificate.key.display()
        )?;
        writeln!(fmt, "</VirtualHost>")
    }
}
