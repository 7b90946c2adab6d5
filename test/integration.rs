// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{
    settings_fixture, write_tree, ConfirmFixture, RepoFixture, SyscallFixture, HOSTS,
};

use provision::{
    provision::ProvisionError,
    syscall::{Call, SyscallError},
    Laravel, Mode, Outcome, Provisioner, WordPress,
};

use indoc::indoc;
use pretty_assertions::assert_eq;
use sealed_test::prelude::*;
use std::{
    env::current_dir,
    ffi::OsStr,
    fs::{read_to_string, write},
    path::Path,
};

const ENV_EXAMPLE: &str = indoc! {r#"
    APP_NAME=Laravel
    APP_KEY=

    DB_CONNECTION=mysql
    DB_DATABASE=laravel
    DB_USERNAME=root
    DB_PASSWORD=
"#};

const MAPPED_HOSTS: &str = "127.0.0.1\tlocalhost\n::1\tlocalhost\n\
    127.0.0.1\tapi.example.test\n::1\tapi.example.test\n\
    127.0.0.1\tother.example.test\n";

fn provisioned_hosts(domain: &str) -> String {
    format!("{HOSTS}127.0.0.1\t{domain}\n::1\t{domain}\n")
}

#[sealed_test]
fn update_mode_has_no_side_effects() -> anyhow::Result<()> {
    let root = current_dir()?;
    let settings = settings_fixture(&root)?;
    let syscall = SyscallFixture::new();
    let repos = RepoFixture::with_files([("composer.json", "{}")]);
    let prompt = ConfirmFixture::answering(true);
    let provisioner = Provisioner::new(settings, syscall.clone(), repos.clone(), prompt.clone());

    let result = provisioner.provision(&Laravel, "api.example.com", Mode::Update)?;
    assert_eq!(result, Outcome::Skipped);
    let result = provisioner.provision(&WordPress, "api.example.com", Mode::Update)?;
    assert_eq!(result, Outcome::Skipped);

    assert!(syscall.calls().is_empty());
    assert!(repos.log().is_empty());
    assert!(prompt.questions().is_empty());
    assert!(!root.join("Sites").exists());
    assert_eq!(read_to_string(root.join("hosts"))?, HOSTS);

    Ok(())
}

#[sealed_test]
fn delete_declined_changes_nothing() -> anyhow::Result<()> {
    let root = current_dir()?;
    let settings = settings_fixture(&root)?;
    let project = write_tree(root.join("Sites/api-example-test"), &[("artisan", "")])?;
    let fragment = write_tree(root.join("vhosts"), &[("api.example.test.conf", "<VirtualHost>")])?
        .join("api.example.test.conf");
    write(root.join("hosts"), MAPPED_HOSTS)?;

    let syscall = SyscallFixture::new();
    let prompt = ConfirmFixture::answering(false);
    let provisioner = Provisioner::new(settings, syscall.clone(), RepoFixture::missing(), prompt.clone());

    let result = provisioner.provision(&Laravel, "api.example.com", Mode::Delete)?;
    assert_eq!(result, Outcome::Aborted);
    assert_eq!(prompt.questions().len(), 1);
    assert!(project.join("artisan").exists());
    assert!(fragment.exists());
    assert_eq!(read_to_string(root.join("hosts"))?, MAPPED_HOSTS);
    assert!(syscall.calls().is_empty());

    Ok(())
}

#[sealed_test]
fn delete_confirmed_tears_down_site_but_keeps_database() -> anyhow::Result<()> {
    let root = current_dir()?;
    let settings = settings_fixture(&root)?;
    let project = write_tree(root.join("Sites/api-example-test/public"), &[("index.php", "")])?;
    let fragment = write_tree(root.join("vhosts"), &[("api.example.test.conf", "<VirtualHost>")])?
        .join("api.example.test.conf");
    write(root.join("hosts"), MAPPED_HOSTS)?;

    let syscall = SyscallFixture::new();
    let prompt = ConfirmFixture::answering(true);
    let provisioner = Provisioner::new(settings, syscall.clone(), RepoFixture::missing(), prompt);

    let result = provisioner.provision(&WordPress, "api.example.com", Mode::Delete)?;
    assert_eq!(result, Outcome::Deleted);
    assert!(!project.exists());
    assert!(!root.join("Sites/api-example-test").exists());
    assert!(!fragment.exists());
    assert_eq!(
        read_to_string(root.join("hosts"))?,
        "127.0.0.1\tlocalhost\n::1\tlocalhost\n127.0.0.1\tother.example.test\n"
    );
    assert_eq!(syscall.command_lines(), vec!["apachectl -k restart"]);

    Ok(())
}

#[sealed_test]
fn delete_tolerates_missing_artifacts() -> anyhow::Result<()> {
    let root = current_dir()?;
    let settings = settings_fixture(&root)?;
    let syscall = SyscallFixture::new();
    let provisioner = Provisioner::new(
        settings,
        syscall.clone(),
        RepoFixture::missing(),
        ConfirmFixture::answering(true),
    );

    let result = provisioner.provision(&Laravel, "ghost.com", Mode::Delete)?;
    assert_eq!(result, Outcome::Deleted);
    assert_eq!(read_to_string(root.join("hosts"))?, HOSTS);
    assert_eq!(syscall.command_lines(), vec!["apachectl -k restart"]);

    Ok(())
}

#[sealed_test]
fn clone_missing_repository_does_not_clone() -> anyhow::Result<()> {
    let root = current_dir()?;
    let settings = settings_fixture(&root)?;
    let syscall = SyscallFixture::new();
    let repos = RepoFixture::missing();
    let provisioner = Provisioner::new(
        settings,
        syscall.clone(),
        repos.clone(),
        ConfirmFixture::answering(true),
    );

    let result = provisioner.provision(&Laravel, "api.example.com", Mode::Clone)?;
    assert_eq!(result, Outcome::RepositoryMissing);
    assert_eq!(repos.log(), vec!["exists git@github.com:alice/api.example.git"]);
    assert!(syscall.calls().is_empty());
    assert!(!root.join("Sites/api-example-test").exists());

    Ok(())
}

#[sealed_test]
fn clone_laravel_provisions_site() -> anyhow::Result<()> {
    let root = current_dir()?;
    let settings = settings_fixture(&root)?;
    let syscall = SyscallFixture::new();
    let repos = RepoFixture::with_files([
        ("composer.json", "{}"),
        ("package.json", "{}"),
        (".env.example", ENV_EXAMPLE),
    ]);
    let provisioner = Provisioner::new(
        settings,
        syscall.clone(),
        repos.clone(),
        ConfirmFixture::answering(false),
    );

    let result = provisioner.provision(&Laravel, "api.example.com", Mode::Clone)?;
    assert_eq!(result, Outcome::Provisioned);

    let dir = root.join("Sites/api-example-test");
    let certs = root.join("certs");
    assert_eq!(
        repos.log(),
        vec![
            "exists git@github.com:alice/api.example.git".to_string(),
            format!("clone git@github.com:alice/api.example.git {}", dir.display()),
        ]
    );
    assert_eq!(
        syscall.command_lines(),
        vec![
            "composer install".to_string(),
            "npm install".to_string(),
            "mysql --user=alice --execute CREATE DATABASE `api_example_test`".to_string(),
            "php artisan key:generate".to_string(),
            format!(
                "mkcert -cert-file {} -key-file {} api.example.test",
                certs.join("api.example.test.pem").display(),
                certs.join("api.example.test-key.pem").display()
            ),
            "apachectl -k restart".to_string(),
        ]
    );

    let mysql = syscall.find("mysql").unwrap();
    assert_eq!(mysql.env_value("MYSQL_PWD"), Some(OsStr::new("secret")));
    assert_eq!(syscall.find("composer").unwrap().cwd(), Some(dir.as_path()));

    let env = read_to_string(dir.join(".env"))?;
    let expect = indoc! {r#"
        APP_NAME=Laravel
        APP_KEY=

        DB_CONNECTION=mysql
        DB_DATABASE=api_example_test
        DB_USERNAME=alice
        DB_PASSWORD=secret
    "#};
    assert_eq!(env, expect);

    let vhost = read_to_string(root.join("vhosts/api.example.test.conf"))?;
    assert!(vhost.contains("ServerName api.example.test"));
    assert!(vhost.contains(&format!("DocumentRoot \"{}\"", dir.join("public").display())));
    assert!(vhost.contains("<VirtualHost *:443>"));
    assert_eq!(read_to_string(root.join("hosts"))?, provisioned_hosts("api.example.test"));

    Ok(())
}

#[sealed_test]
fn clone_laravel_without_env_example_starts_from_empty_env() -> anyhow::Result<()> {
    let root = current_dir()?;
    let settings = settings_fixture(&root)?;
    let syscall = SyscallFixture::new();
    let repos = RepoFixture::with_files([("composer.json", "{}")]);
    let provisioner = Provisioner::new(
        settings,
        syscall.clone(),
        repos,
        ConfirmFixture::answering(false),
    );

    let result = provisioner.provision(&Laravel, "api.example.com", Mode::Clone)?;
    assert_eq!(result, Outcome::Provisioned);
    assert!(syscall.find("php artisan").is_none());

    let env = read_to_string(root.join("Sites/api-example-test/.env"))?;
    let expect = indoc! {r#"
        DB_DATABASE=api_example_test
        DB_USERNAME=alice
        DB_PASSWORD=secret
    "#};
    assert_eq!(env, expect);

    Ok(())
}

#[sealed_test]
fn clone_wordpress_keeps_existing_config() -> anyhow::Result<()> {
    let root = current_dir()?;
    let settings = settings_fixture(&root)?;
    let syscall = SyscallFixture::new();
    let repos = RepoFixture::with_files([
        ("wp-config.php", "<?php define('DB_NAME', 'shop');\n"),
        ("index.php", "<?php\n"),
    ]);
    let provisioner = Provisioner::new(
        settings,
        syscall.clone(),
        repos.clone(),
        ConfirmFixture::answering(false),
    );

    let result = provisioner.provision(&WordPress, "shop.example.com", Mode::Clone)?;
    assert_eq!(result, Outcome::Provisioned);

    let dir = root.join("Sites/shop-example-test");
    assert_eq!(
        repos.log(),
        vec![
            "exists git@github.com:alice/shop.example.git".to_string(),
            format!("clone git@github.com:alice/shop.example.git {}", dir.display()),
        ]
    );
    assert!(syscall.find("wp config create").is_none());
    assert!(syscall.find("wp core download").is_none());
    assert!(syscall.find("wp db create").is_some());
    assert!(syscall.find("wp core install").is_some());
    assert_eq!(
        read_to_string(dir.join("wp-config.php"))?,
        "<?php define('DB_NAME', 'shop');\n"
    );
    assert_eq!(read_to_string(root.join("hosts"))?, provisioned_hosts("shop.example.test"));

    Ok(())
}

#[sealed_test]
fn new_laravel_scaffolds_and_commits() -> anyhow::Result<()> {
    let root = current_dir()?;
    let settings = settings_fixture(&root)?;
    let sites = root.join("Sites");
    let syscall = SyscallFixture::with_handler(move |call: &Call| {
        if call.to_string().starts_with("composer create-project") {
            write_tree(
                sites.join("blog-test"),
                &[("composer.json", "{}"), (".env", ENV_EXAMPLE)],
            )
            .map_err(|err| SyscallError::Spawn {
                source: err,
                call: call.to_string(),
            })?;
        }
        Ok(String::new())
    });
    let repos = RepoFixture::missing();
    let provisioner = Provisioner::new(
        settings,
        syscall.clone(),
        repos.clone(),
        ConfirmFixture::answering(false),
    );

    let result = provisioner.provision(&Laravel, "blog.com", Mode::New)?;
    assert_eq!(result, Outcome::Provisioned);

    let dir = root.join("Sites/blog-test");
    let scaffold = syscall.find("composer create-project").unwrap();
    assert_eq!(
        scaffold.to_string(),
        "composer create-project laravel/laravel blog-test"
    );
    assert_eq!(scaffold.cwd(), Some(root.join("Sites").as_path()));
    assert_eq!(repos.log(), vec![format!("init {} Initial commit", dir.display())]);
    assert!(syscall.find("php artisan").is_none());
    assert!(syscall.find("npm").is_none());

    let env = read_to_string(dir.join(".env"))?;
    assert!(env.contains("DB_DATABASE=blog_test\n"));
    assert_eq!(read_to_string(root.join("hosts"))?, provisioned_hosts("blog.test"));

    Ok(())
}

#[sealed_test]
fn new_wordpress_configures_through_wp_cli() -> anyhow::Result<()> {
    let root = current_dir()?;
    let settings = settings_fixture(&root)?;
    let syscall = SyscallFixture::new();
    let repos = RepoFixture::missing();
    let provisioner = Provisioner::new(
        settings,
        syscall.clone(),
        repos.clone(),
        ConfirmFixture::answering(false),
    );

    let result = provisioner.provision(&WordPress, "shop.example.com", Mode::New)?;
    assert_eq!(result, Outcome::Provisioned);

    let dir = root.join("Sites/shop-example-test");
    assert!(dir.is_dir());
    assert!(repos.log().is_empty());

    let lines = syscall.command_lines();
    assert_eq!(lines[0], "wp core download");
    assert_eq!(
        lines[1],
        "mysql --user=alice --execute CREATE DATABASE `shop_example_test`"
    );
    assert_eq!(
        lines[2],
        "wp config create --dbname=shop_example_test --dbuser=alice --prompt=dbpass"
    );
    assert_eq!(lines[3], "wp db create");
    assert_eq!(
        lines[4],
        "wp core install --url=https://shop.example.test --title=shop.example \
         --admin_user=admin --admin_email=admin@example.com \
         --prompt=admin_password --skip-email"
    );
    assert!(lines[5].starts_with("mkcert"));
    assert_eq!(lines[6], "apachectl -k restart");
    assert_eq!(lines.len(), 7);

    let config = syscall.find("wp config create").unwrap();
    assert_eq!(config.input(), Some("secret\n"));
    assert_eq!(config.cwd(), Some(dir.as_path()));
    let install = syscall.find("wp core install").unwrap();
    assert_eq!(install.input(), Some("password\n"));

    let vhost = read_to_string(root.join("vhosts/shop.example.test.conf"))?;
    assert!(vhost.contains(&format!("DocumentRoot \"{}\"", dir.display())));

    Ok(())
}

#[sealed_test]
fn database_creation_failure_is_ignored() -> anyhow::Result<()> {
    let root = current_dir()?;
    let settings = settings_fixture(&root)?;
    let syscall = SyscallFixture::with_handler(|call: &Call| {
        let line = call.to_string();
        if line.starts_with("mysql") || line.starts_with("wp db create") {
            return Err(SyscallError::Failed {
                call: line,
                code: Some(1),
                message: "database exists".into(),
            });
        }
        Ok(String::new())
    });
    let provisioner = Provisioner::new(
        settings,
        syscall.clone(),
        RepoFixture::missing(),
        ConfirmFixture::answering(false),
    );

    let result = provisioner.provision(&WordPress, "blog.com", Mode::New)?;
    assert_eq!(result, Outcome::Provisioned);
    assert!(syscall.find("wp core install").is_some());

    Ok(())
}

#[sealed_test]
fn failing_step_stops_workflow() -> anyhow::Result<()> {
    let root = current_dir()?;
    let settings = settings_fixture(&root)?;
    let syscall = SyscallFixture::with_handler(|call: &Call| {
        let line = call.to_string();
        if line.starts_with("mkcert") {
            return Err(SyscallError::Failed {
                call: line,
                code: Some(1),
                message: "mkcert -install first".into(),
            });
        }
        Ok(String::new())
    });
    let provisioner = Provisioner::new(
        settings,
        syscall.clone(),
        RepoFixture::missing(),
        ConfirmFixture::answering(false),
    );

    let result = provisioner.provision(&WordPress, "blog.com", Mode::New);
    assert!(matches!(result, Err(ProvisionError::Syscall(_))));
    assert!(syscall.find("apachectl").is_none());
    assert_eq!(read_to_string(root.join("hosts"))?, HOSTS);
    // Earlier steps are not rolled back.
    assert!(root.join("Sites/blog-test").is_dir());

    Ok(())
}

#[sealed_test]
fn existing_project_directory_is_refused() -> anyhow::Result<()> {
    let root = current_dir()?;
    let settings = settings_fixture(&root)?;
    write_tree(root.join("Sites/blog-test"), &[])?;
    let syscall = SyscallFixture::new();
    let repos = RepoFixture::with_files([("composer.json", "{}")]);
    let provisioner = Provisioner::new(
        settings,
        syscall.clone(),
        repos.clone(),
        ConfirmFixture::answering(false),
    );

    for mode in [Mode::New, Mode::Clone] {
        let result = provisioner.provision(&Laravel, "blog.com", mode);
        assert!(matches!(result, Err(ProvisionError::ProjectExists(_))));
    }
    assert!(syscall.calls().is_empty());
    assert!(repos.log().is_empty());

    Ok(())
}

#[sealed_test]
fn owner_falls_back_to_git_config() -> anyhow::Result<()> {
    let root = current_dir()?;
    let mut settings = settings_fixture(&root)?;
    settings.remote.owner = None;

    let repos = RepoFixture::missing().with_owner("carol");
    let provisioner = Provisioner::new(
        settings.clone(),
        SyscallFixture::new(),
        repos.clone(),
        ConfirmFixture::answering(false),
    );
    provisioner.provision(&Laravel, "api.example.com", Mode::Clone)?;
    assert_eq!(repos.log(), vec!["exists git@github.com:carol/api.example.git"]);

    let provisioner = Provisioner::new(
        settings,
        SyscallFixture::new(),
        RepoFixture::missing(),
        ConfirmFixture::answering(false),
    );
    let result = provisioner.provision(&Laravel, "api.example.com", Mode::Clone);
    assert!(matches!(result, Err(ProvisionError::NoOwner)));

    Ok(())
}

#[sealed_test]
fn invalid_name_is_rejected_before_any_effect() -> anyhow::Result<()> {
    let root = current_dir()?;
    let settings = settings_fixture(&root)?;
    let syscall = SyscallFixture::new();
    let provisioner = Provisioner::new(
        settings,
        syscall.clone(),
        RepoFixture::missing(),
        ConfirmFixture::answering(true),
    );

    for name in ["", "a#b.com", "x`y.com", "-rf.com"] {
        for mode in [Mode::New, Mode::Delete] {
            let result = provisioner.provision(&WordPress, name, mode);
            assert!(matches!(result, Err(ProvisionError::Project(_))));
        }
    }
    assert!(syscall.calls().is_empty());
    assert!(!root.join("Sites").exists());
    assert_eq!(read_to_string(Path::new("hosts"))?, HOSTS);

    Ok(())
}
