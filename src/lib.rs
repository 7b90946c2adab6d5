// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Local site provisioning.
//!
//! Provision turns a domain-like project name such as "api.example.com" into
//! a working local site: a project directory under `~/Sites`, a MySQL
//! database, an Apache virtual host with a locally trusted certificate, and a
//! hosts file entry for `api.example.test`. Laravel and WordPress projects
//! are supported, either scaffolded fresh or cloned from their upstream
//! repository. The same tool tears a project down again.
//!
//! # See Also
//!
//! 1. [`provision::Provisioner`]
//! 2. [`framework::Framework`]
//! 3. [`config::Settings`]

pub mod config;
pub mod credentials;
pub mod envfile;
pub mod framework;
pub mod hosts;
pub mod path;
pub mod project;
pub mod prompt;
pub mod provision;
pub mod repo;
pub mod syscall;
pub mod vhost;

pub use config::Settings;
pub use framework::{Framework, Laravel, WordPress};
pub use project::Project;
pub use provision::{Mode, Outcome, Provisioner};
