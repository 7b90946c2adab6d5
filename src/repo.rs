// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Upstream repository access.
//!
//! Projects live in repositories named after their clean name on a remote
//! host. Provision needs three things from Git: ask whether such a repository
//! exists, clone it, and commit a freshly scaffolded project as the start of
//! a new history. All three go through libgit2.
//!
//! If any credentials are required while talking to a remote, then the user
//! will be prompted for that information accordingly.

use auth_git2::{GitAuthenticator, Prompter};
use git2::{
    build::RepoBuilder, Config, Direction, ErrorClass, ErrorCode, FetchOptions, IndexAddOption,
    Remote, RemoteCallbacks, Repository, RepositoryInitOptions,
};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{Password, Text};
use std::{path::Path, time};
use tracing::{debug, info, instrument};

/// Layer of indirection for repository access.
pub trait RepoHost {
    /// Check whether a repository is reachable at target URL.
    fn exists(&self, url: &str) -> Result<bool>;

    /// Clone repository at target URL into target path.
    fn clone_into(&self, url: &str, path: &Path) -> Result<()>;

    /// Initialize repository at target path and commit everything not ignored.
    fn init_with_commit(&self, path: &Path, message: &str) -> Result<()>;

    /// Account name to look repositories up under when none is configured.
    fn default_owner(&self) -> Option<String>;
}

/// Repository access through libgit2.
#[derive(Debug, Default)]
pub struct Git2Host;

impl Git2Host {
    fn authenticator(bar: ProgressBar) -> GitAuthenticator {
        GitAuthenticator::default().set_prompter(IndicatifPrompter::new(bar))
    }
}

impl RepoHost for Git2Host {
    /// Check whether a repository is reachable at target URL.
    ///
    /// Connects to the remote and lists its references without fetching any
    /// objects. A remote answering "not found" or "does not exist" after
    /// authentication reports the repository as absent.
    ///
    /// # Errors
    ///
    /// - Return [`RepoError::Git2`] if authentication fails, since the remote
    ///   has not said anything about the repository yet.
    /// - Return [`RepoError::Git2`] for any other libgit2 failure, e.g., the
    ///   network being down.
    #[instrument(skip(self), level = "debug")]
    fn exists(&self, url: &str) -> Result<bool> {
        let config = Config::open_default()?;
        let authenticator = Self::authenticator(ProgressBar::hidden());
        let mut rc = RemoteCallbacks::new();
        rc.credentials(authenticator.credentials(&config));

        let mut remote = Remote::create_detached(url)?;
        let result = remote.connect_auth(Direction::Fetch, Some(rc), None);
        match result {
            Ok(connection) => {
                let refs = connection.list()?.len();
                debug!("{url} advertises {refs} references");
                Ok(true)
            }
            Err(err) if is_missing_repository(&err) => {
                debug!("{url} is unavailable: {err}");
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Clone repository at target URL into target path.
    ///
    /// The progress of the clone is displayed through a progress bar. The
    /// progress bar will be blocked for user input when credentials are
    /// needed.
    ///
    /// # Errors
    ///
    /// - Return [`RepoError::Git2`] if libgit2 operations fail.
    /// - Return [`RepoError::IndicatifStyleTemplate`] if progress bar cannot
    ///   be styled.
    #[instrument(skip(self, path), level = "debug")]
    fn clone_into(&self, url: &str, path: &Path) -> Result<()> {
        info!("clone {url} into {}", path.display());
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{elapsed_precise:.green}  {msg:<50}  [{wide_bar:.yellow/blue}]",
        )?
        .progress_chars("-Cco.");
        bar.set_style(style);
        bar.set_message(url.to_string());
        bar.enable_steady_tick(time::Duration::from_millis(100));

        let authenticator = Self::authenticator(bar.clone());
        let config = Config::open_default()?;

        let mut throttle = time::Instant::now();
        let mut rc = RemoteCallbacks::new();
        rc.credentials(authenticator.credentials(&config));
        rc.transfer_progress(|progress| {
            if throttle.elapsed() > time::Duration::from_millis(10) {
                throttle = time::Instant::now();
                bar.set_length(progress.total_objects() as u64);
                bar.set_position(progress.received_objects() as u64);
            }
            true
        });

        let mut fo = FetchOptions::new();
        fo.remote_callbacks(rc);
        let result = RepoBuilder::new().fetch_options(fo).clone(url, path);
        bar.finish_and_clear();
        result?;

        Ok(())
    }

    /// Initialize repository at target path and commit everything not ignored.
    ///
    /// The initial branch is always "main". Files matched by the project's
    /// own gitignore rules, e.g., vendor and node_modules, stay out of the
    /// commit.
    ///
    /// # Errors
    ///
    /// - Return [`RepoError::Git2`] if libgit2 operations fail, including a
    ///   missing `user.name` or `user.email` configuration.
    #[instrument(skip(self, path), level = "debug")]
    fn init_with_commit(&self, path: &Path, message: &str) -> Result<()> {
        info!("initialize repository at {}", path.display());
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repository = Repository::init_opts(path, &opts)?;

        // INVARIANT: Always use new tree produced by index after staging.
        let mut index = repository.index()?;
        index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
        index.write()?;
        let tree_oid = index.write_tree()?;
        let tree = repository.find_tree(tree_oid)?;

        let signature = repository.signature()?;
        repository.commit(Some("HEAD"), &signature, &signature, message, &tree, &[])?;

        Ok(())
    }

    fn default_owner(&self) -> Option<String> {
        Config::open_default()
            .and_then(|config| config.get_string("github.user"))
            .ok()
    }
}

fn is_missing_repository(err: &git2::Error) -> bool {
    // INVARIANT: Failed authentication says nothing about existence.
    if err.code() == ErrorCode::Auth {
        return false;
    }

    let message = err.message().to_ascii_lowercase();
    err.code() == ErrorCode::NotFound
        || (matches!(err.class(), ErrorClass::Ssh | ErrorClass::Http)
            && (message.contains("not found") || message.contains("does not exist")))
}

/// Ask for remote credentials without tearing the progress bar.
///
/// Every question names the remote host it is for.
#[derive(Debug, Clone)]
pub struct IndicatifPrompter {
    bar: ProgressBar,
}

impl IndicatifPrompter {
    pub fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }

    fn secret(&self, label: &str) -> Option<String> {
        self.bar.suspend(|| {
            Password::new(label)
                .without_confirmation()
                .with_help_message("leave the prompt with Esc to give up")
                .prompt()
                .ok()
        })
    }
}

impl Prompter for IndicatifPrompter {
    #[instrument(skip(self, _config), level = "debug")]
    fn prompt_username_password(
        &mut self,
        url: &str,
        _config: &git2::Config,
    ) -> Option<(String, String)> {
        let host = remote_host(url);
        info!("{host} wants a username and password for {url}");
        let username = self
            .bar
            .suspend(|| Text::new(&format!("{host} username")).prompt().ok())?;
        let password = self.secret(&format!("{host} password for {username}"))?;
        Some((username, password))
    }

    #[instrument(skip(self, _config), level = "debug")]
    fn prompt_password(
        &mut self,
        username: &str,
        url: &str,
        _config: &git2::Config,
    ) -> Option<String> {
        let host = remote_host(url);
        info!("{host} wants a password for {username}");
        self.secret(&format!("{host} password for {username}"))
    }

    #[instrument(skip(self, _config), level = "debug")]
    fn prompt_ssh_key_passphrase(
        &mut self,
        ssh_key_path: &Path,
        _config: &git2::Config,
    ) -> Option<String> {
        info!("ssh key {} is locked", ssh_key_path.display());
        self.secret(&format!("passphrase for {}", ssh_key_path.display()))
    }
}

/// Host part of a remote URL, e.g., "github.com" for both
/// `git@github.com:alice/blog.git` and `https://github.com/alice/blog.git`.
fn remote_host(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let rest = rest.split_once('@').map_or(rest, |(_, rest)| rest);
    rest.split([':', '/']).next().unwrap_or(rest)
}

/// Repository access error types.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Style template cannot be set for progress bars.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),

    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),
}

/// Friendly result alias :3
pub type Result<T, E = RepoError> = std::result::Result<T, E>;
