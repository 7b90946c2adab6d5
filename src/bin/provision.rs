// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use provision::{
    path::default_settings_path, prompt::Terminal, repo::Git2Host, syscall::System, Framework,
    Laravel, Mode, Provisioner, Settings, WordPress,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{path::PathBuf, process::exit};
use tracing::{error, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Exit code of a run cut short by Ctrl-C.
const INTERRUPTED: i32 = 130;

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "provision [options] <command> <name> [--new | --delete | --update]",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Log every step in detail.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Path to settings file.
    #[arg(long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn into_parts(self) -> (Box<dyn Framework + Send>, ProjectOptions) {
        match self.command {
            Command::Laravel(opts) => (Box::new(Laravel), opts),
            Command::Wp(opts) => (Box::new(WordPress), opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Provision a Laravel application.
    #[command(override_usage = "provision laravel [options] <name>")]
    Laravel(ProjectOptions),

    /// Provision a WordPress site.
    #[command(override_usage = "provision wp [options] <name>")]
    Wp(ProjectOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ProjectOptions {
    /// Domain-like project name, e.g., api.example.com.
    #[arg(required = true, value_name = "name")]
    pub name: String,

    /// Scaffold a fresh project instead of cloning it.
    #[arg(short, long, group = "mode")]
    pub new: bool,

    /// Remove project directory, virtual host, and hosts entries.
    #[arg(short, long, group = "mode")]
    pub delete: bool,

    /// Refresh local database from remote (not implemented).
    #[arg(short, long, group = "mode")]
    pub update: bool,
}

impl ProjectOptions {
    fn mode(&self) -> Mode {
        if self.new {
            Mode::New
        } else if self.delete {
            Mode::Delete
        } else if self.update {
            Mode::Update
        } else {
            Mode::Clone
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    match run(cli).await {
        Ok(code) => exit(code),
        Err(error) => {
            error!("{error:?}");
            exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let settings_path = match &cli.config {
        Some(path) => path.clone(),
        None => default_settings_path()?,
    };
    let settings = Settings::load(&settings_path)
        .with_context(|| format!("cannot load settings from {}", settings_path.display()))?;

    let (framework, opts) = cli.into_parts();
    let mode = opts.mode();
    let provisioner = Provisioner::new(settings, System, Git2Host, Terminal);

    // INVARIANT: Every workflow step blocks, so keep them off the runtime.
    let task = tokio::task::spawn_blocking(move || {
        provisioner.provision(framework.as_ref(), &opts.name, mode)
    });

    tokio::select! {
        joined = task => {
            joined.context("provisioning task panicked")??;
            Ok(0)
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted, the project may be left partially provisioned");
            Ok(INTERRUPTED)
        }
    }
}
