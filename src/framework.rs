// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Framework adapters.
//!
//! Laravel and WordPress projects are provisioned by the same workflow. They
//! only differ in how a fresh project is scaffolded, how the project learns
//! its database settings, and which directory Apache serves. Those three
//! differences are captured by the [`Framework`] trait.

use crate::{
    config::Settings,
    credentials::Credentials,
    envfile,
    project::Project,
    repo::RepoHost,
    syscall::{Call, Syscall, SyscallError},
};

use std::{
    fs::{copy, write},
    path::{Path, PathBuf},
};
use tracing::{info, instrument, warn};

/// Everything a framework adapter may touch while provisioning one project.
pub struct Workspace<'a> {
    pub settings: &'a Settings,
    pub project: &'a Project,
    pub syscall: &'a dyn Syscall,
    pub repos: &'a dyn RepoHost,
}

impl Workspace<'_> {
    /// Absolute path to the project directory.
    pub fn dir(&self) -> PathBuf {
        self.settings.sites_dir.join(self.project.folder())
    }
}

/// Per-framework provisioning steps.
pub trait Framework {
    /// Human readable name.
    fn name(&self) -> &'static str;

    /// Create a fresh project in the workspace directory.
    fn scaffold(&self, workspace: &Workspace<'_>) -> Result<()>;

    /// Point the project at its database.
    fn configure_database(
        &self,
        workspace: &Workspace<'_>,
        credentials: &Credentials,
    ) -> Result<()>;

    /// Directory Apache serves for project at target path.
    fn document_root(&self, project_dir: &Path) -> PathBuf;
}

/// Laravel application.
#[derive(Debug, Default, Clone, Copy)]
pub struct Laravel;

impl Framework for Laravel {
    fn name(&self) -> &'static str {
        "laravel"
    }

    /// Create project through composer and commit it as a new history.
    #[instrument(skip(self, workspace), level = "debug")]
    fn scaffold(&self, workspace: &Workspace<'_>) -> Result<()> {
        info!("create laravel project {}", workspace.project.folder());
        workspace.syscall.interactive(
            &Call::new("composer")
                .args(["create-project", "laravel/laravel"])
                .arg(workspace.project.folder())
                .current_dir(&workspace.settings.sites_dir),
        )?;
        workspace
            .repos
            .init_with_commit(&workspace.dir(), "Initial commit")?;

        Ok(())
    }

    /// Rewrite database keys of the project's `.env` file.
    ///
    /// A project fresh out of a clone has no `.env` yet, so one is created
    /// from `.env.example` and given an application key first.
    #[instrument(skip(self, workspace, credentials), level = "debug")]
    fn configure_database(
        &self,
        workspace: &Workspace<'_>,
        credentials: &Credentials,
    ) -> Result<()> {
        let dir = workspace.dir();
        let env = dir.join(".env");
        if !env.exists() {
            let example = dir.join(".env.example");
            if example.exists() {
                info!("create .env from .env.example");
                copy(&example, &env).map_err(|err| FrameworkError::Io {
                    source: err,
                    path: env.clone(),
                })?;
                workspace.syscall.interactive(
                    &Call::new("php")
                        .args(["artisan", "key:generate"])
                        .current_dir(&dir),
                )?;
            } else {
                warn!("no .env.example in {}, starting from empty .env", dir.display());
                write(&env, "").map_err(|err| FrameworkError::Io {
                    source: err,
                    path: env.clone(),
                })?;
            }
        }

        info!("point .env at database {}", workspace.project.database());
        envfile::rewrite(
            &env,
            [
                ("DB_DATABASE", workspace.project.database()),
                ("DB_USERNAME", credentials.user()),
                ("DB_PASSWORD", credentials.password()),
            ],
        )?;

        Ok(())
    }

    fn document_root(&self, project_dir: &Path) -> PathBuf {
        project_dir.join("public")
    }
}

/// WordPress site driven through wp-cli.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordPress;

impl Framework for WordPress {
    fn name(&self) -> &'static str {
        "wordpress"
    }

    #[instrument(skip(self, workspace), level = "debug")]
    fn scaffold(&self, workspace: &Workspace<'_>) -> Result<()> {
        let dir = workspace.dir();
        info!("download wordpress core into {}", dir.display());
        mkdirp::mkdirp(&dir).map_err(|err| FrameworkError::Io {
            source: err,
            path: dir.clone(),
        })?;
        workspace
            .syscall
            .interactive(&Call::new("wp").args(["core", "download"]).current_dir(&dir))?;

        Ok(())
    }

    /// Create wp-config.php, the database, and run the installer.
    ///
    /// Secrets are handed to wp-cli through `--prompt` on standard input
    /// rather than on the command line.
    #[instrument(skip(self, workspace, credentials), level = "debug")]
    fn configure_database(
        &self,
        workspace: &Workspace<'_>,
        credentials: &Credentials,
    ) -> Result<()> {
        let dir = workspace.dir();
        let project = workspace.project;
        let admin = &workspace.settings.wordpress;

        if dir.join("wp-config.php").exists() {
            info!("keep existing wp-config.php");
        } else {
            info!("create wp-config.php for database {}", project.database());
            workspace.syscall.non_interactive(
                &Call::new("wp")
                    .args(["config", "create"])
                    .arg(format!("--dbname={}", project.database()))
                    .arg(format!("--dbuser={}", credentials.user()))
                    .arg("--prompt=dbpass")
                    .current_dir(&dir)
                    .stdin(format!("{}\n", credentials.password())),
            )?;
        }

        match workspace
            .syscall
            .non_interactive(&Call::new("wp").args(["db", "create"]).current_dir(&dir))
        {
            Ok(_) => info!("created database {}", project.database()),
            Err(err @ SyscallError::Failed { .. }) => {
                warn!("wp db create failed, assuming database exists: {err}")
            }
            Err(err) => return Err(err.into()),
        }

        info!("install wordpress at https://{}", project.domain());
        workspace.syscall.non_interactive(
            &Call::new("wp")
                .args(["core", "install"])
                .arg(format!("--url=https://{}", project.domain()))
                .arg(format!("--title={}", project.clean()))
                .arg(format!("--admin_user={}", admin.admin_user))
                .arg(format!("--admin_email={}", admin.admin_email))
                .args(["--prompt=admin_password", "--skip-email"])
                .current_dir(&dir)
                .stdin(format!("{}\n", admin.admin_password)),
        )?;

        Ok(())
    }

    fn document_root(&self, project_dir: &Path) -> PathBuf {
        project_dir.to_path_buf()
    }
}

/// Framework adapter error types.
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    /// External program failed.
    #[error(transparent)]
    Syscall(#[from] SyscallError),

    /// Repository could not be initialized.
    #[error(transparent)]
    Repo(#[from] crate::repo::RepoError),

    /// Dotenv file could not be rewritten.
    #[error(transparent)]
    EnvFile(#[from] crate::envfile::EnvFileError),

    /// Project file could not be created.
    #[error("failed to create {:?}", path.display())]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = FrameworkError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn document_roots() {
        let dir = Path::new("/Users/alice/Sites/blog-test");
        assert_eq!(Laravel.document_root(dir), dir.join("public"));
        assert_eq!(WordPress.document_root(dir), dir.to_path_buf());
    }
}
