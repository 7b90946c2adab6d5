// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Project provisioning workflow.
//!
//! One run of provision derives the project's names, then follows exactly one
//! of four branches selected by [`Mode`]:
//!
//! - __new__: scaffold a fresh project through the framework adapter.
//! - __clone__: clone the project's upstream repository, if it exists.
//! - __update__: not implemented, nothing happens.
//! - __delete__: after confirmation, remove the project directory, its
//!   virtual host, and its hosts entries. The database is kept.
//!
//! New and clone converge on the same finishing steps: install dependencies,
//! read MySQL credentials, create the database, let the framework adapter
//! configure the database, and register the site with Apache.
//!
//! Nothing is transactional. A failing step stops the run and leaves every
//! earlier step's effects in place.

use crate::{
    config::Settings,
    credentials::Credentials,
    framework::{Framework, Workspace},
    hosts,
    project::Project,
    prompt::Confirm,
    repo::RepoHost,
    syscall::{Call, Syscall, SyscallError},
    vhost::{fragment_path, CertificatePair, VirtualHost},
};

use std::{
    fs::{read_to_string, remove_dir_all, remove_file, write, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// Workflow branch selected for a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Scaffold a fresh project.
    New,

    /// Clone the project from its upstream repository.
    #[default]
    Clone,

    /// Refresh the local database from a remote source. Not implemented.
    Update,

    /// Tear the project down.
    Delete,
}

/// How a run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Project is scaffolded or cloned, and served by Apache.
    Provisioned,

    /// Upstream repository does not exist; nothing was done.
    RepositoryMissing,

    /// Update mode; nothing was done.
    Skipped,

    /// Project was torn down.
    Deleted,

    /// User declined deletion; nothing was done.
    Aborted,
}

/// Drive the provisioning workflow.
///
/// Every external effect goes through one of three seams: [`Syscall`] for
/// external programs, [`RepoHost`] for Git, and [`Confirm`] for questions to
/// the user. Files owned by provision itself, i.e., virtual host fragments
/// and the hosts file, are edited directly.
#[derive(Debug)]
pub struct Provisioner<S, R, C>
where
    S: Syscall,
    R: RepoHost,
    C: Confirm,
{
    settings: Settings,
    syscall: S,
    repos: R,
    prompt: C,
}

impl<S, R, C> Provisioner<S, R, C>
where
    S: Syscall,
    R: RepoHost,
    C: Confirm,
{
    /// Construct new provisioner.
    pub fn new(settings: Settings, syscall: S, repos: R, prompt: C) -> Self {
        Self {
            settings,
            syscall,
            repos,
            prompt,
        }
    }

    /// Provision project `name` with target framework in target mode.
    ///
    /// # Errors
    ///
    /// - Return [`ProvisionError::Project`] if `name` is not a valid project
    ///   name.
    /// - Return [`ProvisionError::ProjectExists`] if new or clone mode would
    ///   overwrite an existing project directory.
    /// - Return any error of the first workflow step that fails.
    #[instrument(skip(self, framework), fields(framework = framework.name()), level = "debug")]
    pub fn provision(&self, framework: &dyn Framework, name: &str, mode: Mode) -> Result<Outcome> {
        let project = Project::new(name, &self.settings.tld)?;
        debug!(
            "derived clean={} domain={} folder={} database={}",
            project.clean(),
            project.domain(),
            project.folder(),
            project.database()
        );

        let workspace = Workspace {
            settings: &self.settings,
            project: &project,
            syscall: &self.syscall,
            repos: &self.repos,
        };

        match mode {
            Mode::Update => {
                warn!(
                    "updating {} from a remote database is not implemented, nothing to do",
                    project
                );
                Ok(Outcome::Skipped)
            }
            Mode::Delete => self.delete(&workspace),
            Mode::New => {
                self.ensure_vacant(&workspace)?;
                self.ensure_sites_dir()?;
                framework.scaffold(&workspace)?;
                self.finish(framework, &workspace)
            }
            Mode::Clone => {
                self.ensure_vacant(&workspace)?;
                let url = self.remote_url(&project)?;
                if !self.repos.exists(&url)? {
                    warn!(
                        "repository {url} not found, run again with --new to create {}",
                        project.raw()
                    );
                    return Ok(Outcome::RepositoryMissing);
                }

                self.ensure_sites_dir()?;
                self.repos.clone_into(&url, &workspace.dir())?;
                self.finish(framework, &workspace)
            }
        }
    }

    fn remote_url(&self, project: &Project) -> Result<String> {
        let owner = match &self.settings.remote.owner {
            Some(owner) => owner.clone(),
            None => self.repos.default_owner().ok_or(ProvisionError::NoOwner)?,
        };

        Ok(self.settings.remote.url_for(&owner, project.clean()))
    }

    fn ensure_vacant(&self, workspace: &Workspace<'_>) -> Result<()> {
        let dir = workspace.dir();
        if dir.exists() {
            return Err(ProvisionError::ProjectExists(dir));
        }

        Ok(())
    }

    fn ensure_sites_dir(&self) -> Result<()> {
        create_dir(&self.settings.sites_dir)
    }

    fn finish(&self, framework: &dyn Framework, workspace: &Workspace<'_>) -> Result<Outcome> {
        self.install_dependencies(workspace)?;
        let credentials = Credentials::from_option_file(&self.settings.mysql_defaults)?;
        self.create_database(workspace.project, &credentials)?;
        framework.configure_database(workspace, &credentials)?;
        self.register_site(framework, workspace, &credentials)?;
        info!("https://{} is ready", workspace.project.domain());

        Ok(Outcome::Provisioned)
    }

    #[instrument(skip(self, workspace), level = "debug")]
    fn install_dependencies(&self, workspace: &Workspace<'_>) -> Result<()> {
        let dir = workspace.dir();
        if dir.join("composer.json").exists() {
            info!("install composer dependencies");
            self.syscall
                .interactive(&Call::new("composer").arg("install").current_dir(&dir))?;
        }

        if dir.join("package.json").exists() {
            info!("install npm dependencies");
            self.syscall
                .interactive(&Call::new("npm").arg("install").current_dir(&dir))?;
        }

        Ok(())
    }

    /// Create the project's database.
    ///
    /// A failing `CREATE DATABASE` is taken to mean the database already
    /// exists, and is only logged.
    #[instrument(skip(self, project, credentials), level = "debug")]
    fn create_database(&self, project: &Project, credentials: &Credentials) -> Result<()> {
        let call = Call::new("mysql")
            .arg(format!("--user={}", credentials.user()))
            .arg("--execute")
            .arg(format!("CREATE DATABASE `{}`", project.database()))
            .env("MYSQL_PWD", credentials.password());

        match self.syscall.non_interactive(&call) {
            Ok(_) => info!("created database {}", project.database()),
            Err(err @ SyscallError::Failed { .. }) => warn!(
                "database {} not created, assuming it already exists: {err}",
                project.database()
            ),
            Err(err) => return Err(err.into()),
        }

        Ok(())
    }

    #[instrument(skip(self, framework, workspace, credentials), level = "debug")]
    fn register_site(
        &self,
        framework: &dyn Framework,
        workspace: &Workspace<'_>,
        credentials: &Credentials,
    ) -> Result<()> {
        let project = workspace.project;
        let apache = &self.settings.apache;

        create_dir(&apache.certs_dir)?;
        let certificate = CertificatePair::new(&apache.certs_dir, project.domain());
        info!("generate certificate for {}", project.domain());
        self.syscall.non_interactive(
            &Call::new("mkcert")
                .arg("-cert-file")
                .arg(&certificate.cert)
                .arg("-key-file")
                .arg(&certificate.key)
                .arg(project.domain()),
        )?;

        create_dir(&apache.vhosts_dir)?;
        let fragment = fragment_path(&apache.vhosts_dir, project.domain());
        let document_root = framework.document_root(&workspace.dir());
        let vhost = VirtualHost {
            project,
            document_root: &document_root,
            credentials,
            certificate: &certificate,
        };
        info!("append virtual host to {}", fragment.display());
        append(&fragment, &vhost.to_string())?;

        let content = self.read_hosts()?;
        let updated = hosts::add_domain(&content, project.domain());
        if updated != content {
            info!("map {} to loopback in {}", project.domain(), self.settings.hosts_file.display());
            self.write_privileged(&self.settings.hosts_file, &updated)?;
        }

        self.restart_apache()
    }

    #[instrument(skip(self, workspace), level = "debug")]
    fn delete(&self, workspace: &Workspace<'_>) -> Result<Outcome> {
        let project = workspace.project;
        let dir = workspace.dir();
        let question = format!(
            "Delete {} and the web server configuration of {}?",
            dir.display(),
            project.domain()
        );
        if !self.prompt.confirm(&question)? {
            info!("deletion of {project} aborted");
            return Ok(Outcome::Aborted);
        }

        if dir.exists() {
            info!("remove {}", dir.display());
            remove_dir_all(&dir).map_err(|err| ProvisionError::Remove {
                source: err,
                path: dir.clone(),
            })?;
        } else {
            warn!("project directory {} does not exist", dir.display());
        }

        let fragment = fragment_path(&self.settings.apache.vhosts_dir, project.domain());
        if fragment.exists() {
            info!("remove {}", fragment.display());
            remove_file(&fragment).map_err(|err| ProvisionError::Remove {
                source: err,
                path: fragment.clone(),
            })?;
        } else {
            warn!("virtual host {} does not exist", fragment.display());
        }

        let content = self.read_hosts()?;
        if hosts::contains_domain(&content, project.domain()) {
            info!("unmap {} in {}", project.domain(), self.settings.hosts_file.display());
            let updated = hosts::remove_domain(&content, project.domain());
            self.write_privileged(&self.settings.hosts_file, &updated)?;
        } else {
            warn!("{} has no hosts entry", project.domain());
        }

        self.restart_apache()?;
        info!(
            "database {0} was kept, drop it with: mysql --execute 'DROP DATABASE `{0}`'",
            project.database()
        );

        Ok(Outcome::Deleted)
    }

    fn restart_apache(&self) -> Result<()> {
        let Some((program, args)) = self.settings.apache.restart.split_first() else {
            warn!("no apache restart command configured, restart it yourself");
            return Ok(());
        };

        info!("restart apache");
        self.syscall
            .interactive(&Call::new(program).args(args))?;

        Ok(())
    }

    fn read_hosts(&self) -> Result<String> {
        let path = &self.settings.hosts_file;
        match read_to_string(path) {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(err) => Err(ProvisionError::Read {
                source: err,
                path: path.clone(),
            }),
        }
    }

    /// Write `content` to target path, escalating through sudo when the
    /// current user lacks permission.
    fn write_privileged(&self, path: &Path, content: &str) -> Result<()> {
        match write(path, content) {
            Ok(()) => Ok(()),
            Err(err) => escalate_write(&self.syscall, path, content, err),
        }
    }
}

/// Retry a failed write through `sudo tee` if it failed for lack of
/// permission.
fn escalate_write(
    syscall: &dyn Syscall,
    path: &Path,
    content: &str,
    err: std::io::Error,
) -> Result<()> {
    if err.kind() != ErrorKind::PermissionDenied {
        return Err(ProvisionError::Write {
            source: err,
            path: path.to_path_buf(),
        });
    }

    info!("{} needs elevated privileges, writing through sudo", path.display());
    syscall.non_interactive(&Call::new("sudo").arg("tee").arg(path).stdin(content))?;

    Ok(())
}

fn create_dir(path: &Path) -> Result<()> {
    mkdirp::mkdirp(path).map_err(|err| ProvisionError::CreateDir {
        source: err,
        path: path.to_path_buf(),
    })?;

    Ok(())
}

fn append(path: &Path, content: &str) -> Result<()> {
    let write_error = |err| ProvisionError::Write {
        source: err,
        path: path.to_path_buf(),
    };

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(write_error)?;
    file.write_all(content.as_bytes()).map_err(write_error)
}

/// All possible error types for a provisioning run.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// Project name is unusable.
    #[error(transparent)]
    Project(#[from] crate::project::ProjectError),

    /// MySQL credentials cannot be obtained.
    #[error(transparent)]
    Credentials(#[from] crate::credentials::CredentialsError),

    /// External program failed.
    #[error(transparent)]
    Syscall(#[from] SyscallError),

    /// Git operation failed.
    #[error(transparent)]
    Repo(#[from] crate::repo::RepoError),

    /// Framework specific step failed.
    #[error(transparent)]
    Framework(#[from] crate::framework::FrameworkError),

    /// User could not be asked for confirmation.
    #[error(transparent)]
    Prompt(#[from] crate::prompt::PromptError),

    /// Project directory is already taken.
    #[error("project directory {:?} already exists", .0.display())]
    ProjectExists(PathBuf),

    /// Nobody to look the upstream repository up under.
    #[error("no repository owner configured, set remote.owner in settings or git config github.user")]
    NoOwner,

    #[error("failed to create directory {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("failed to read {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("failed to write {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("failed to remove {:?}", path.display())]
    Remove {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = ProvisionError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::{cell::RefCell, io::Error as IoError};

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<Call>>,
    }

    impl Syscall for Recorder {
        fn interactive(&self, call: &Call) -> crate::syscall::Result<()> {
            self.calls.borrow_mut().push(call.clone());
            Ok(())
        }

        fn non_interactive(&self, call: &Call) -> crate::syscall::Result<String> {
            self.calls.borrow_mut().push(call.clone());
            Ok(String::new())
        }
    }

    #[test]
    fn permission_denied_writes_through_sudo_tee() -> anyhow::Result<()> {
        let syscall = Recorder::default();
        let path = Path::new("/etc/hosts");
        let content = "127.0.0.1\tblog.test\n::1\tblog.test\n";

        escalate_write(&syscall, path, content, IoError::from(ErrorKind::PermissionDenied))?;

        let calls = syscall.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].to_string(), "sudo tee /etc/hosts");
        assert_eq!(calls[0].input(), Some(content));

        Ok(())
    }

    #[test]
    fn other_write_failures_are_reported() {
        let syscall = Recorder::default();
        let path = Path::new("/etc/hosts");

        let result = escalate_write(&syscall, path, "", IoError::from(ErrorKind::NotFound));
        match result {
            Err(ProvisionError::Write { source, path: failed }) => {
                assert_eq!(source.kind(), ErrorKind::NotFound);
                assert_eq!(failed, path.to_path_buf());
            }
            other => panic!("expected write error, got {other:?}"),
        }
        assert!(syscall.calls.borrow().is_empty());
    }
}
