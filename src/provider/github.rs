//! GitHub client.
//!
//! Repositories are created under the authenticated user when the owner is
//! the configured account, and under the organization of that name otherwise.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::ClientConfig;
use crate::constants::{COMMIT_AUTHOR, COMMIT_MESSAGE};
use crate::error::{Error, Result};
use crate::provider::git::{self, Credentials};
use crate::provider::rest::RestClient;
use crate::provider::{Checkout, GitProvider};
use crate::repository::{ProviderKind, RepoDescriptor};

#[derive(Debug, Serialize)]
struct CreateRepoRequest<'a> {
    name: &'a str,
    auto_init: bool,
    private: bool,
}

#[derive(Debug, Serialize)]
struct HookConfig<'a> {
    url: &'a str,
    content_type: &'a str,
}

#[derive(Debug, Serialize)]
struct HookRequest<'a> {
    name: &'a str,
    active: bool,
    events: [&'a str; 1],
    config: HookConfig<'a>,
}

#[derive(Debug, Deserialize)]
struct RepoItem {
    name: String,
}

pub struct GitHubClient {
    config: ClientConfig,
    rest: RestClient,
}

impl GitHubClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let rest = RestClient::new(&config, ProviderKind::GitHub)?;
        Ok(Self { config, rest })
    }

    fn credentials(&self) -> Credentials {
        Credentials { username: self.config.username.clone(), secret: self.config.secret.clone() }
    }

    fn create_url(&self, owner: &str) -> String {
        if owner.eq_ignore_ascii_case(&self.config.username) {
            format!("{}/user/repos", self.config.api_url)
        } else {
            format!("{}/orgs/{}/repos", self.config.api_url, owner)
        }
    }
}

impl GitProvider for GitHubClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GitHub
    }

    fn repo_exists(&self, repo: &RepoDescriptor) -> Result<bool> {
        self.rest.exists(&repo.rest_api_url(&self.config.api_url))
    }

    fn clone_repo(&self, repo: &RepoDescriptor, checkout: &Checkout) -> Result<PathBuf> {
        if !self.repo_exists(repo)? {
            return Err(Error::RepositoryNotFoundError { name: repo.to_string() });
        }
        let dir = git::checkout_dir()?;
        git::clone(&self.scm_url(repo), &dir, checkout, &self.credentials())?;
        Ok(dir)
    }

    fn create_repo(&self, repo: &RepoDescriptor) -> Result<String> {
        let repo_url = self.repo_url(repo);
        if self.repo_exists(repo)? {
            return Err(Error::RepositoryExistsError { url: repo_url });
        }

        let api_url = self.create_url(repo.domain());
        let request = CreateRepoRequest { name: repo.name(), auto_init: false, private: true };
        let response = self.rest.post_json(&api_url, &request)?;
        self.rest.expect_success(response, &api_url)?;

        info!("Created {repo} at {repo_url}");
        Ok(repo_url)
    }

    fn initial_commit(&self, dir: &Path, repo: &RepoDescriptor) -> Result<()> {
        if !dir.is_dir() {
            return Err(Error::PathNotFoundError { path: dir.display().to_string() });
        }
        let repository = git::commit_all(dir, COMMIT_AUTHOR, &self.config.email, COMMIT_MESSAGE)?;
        git::push(&repository, "origin", &self.scm_url(repo), &self.credentials())
    }

    fn create_webhook(&self, callback_url: &str, repo: &RepoDescriptor) -> Result<()> {
        let url = format!("{}/hooks", repo.rest_api_url(&self.config.api_url));
        let request = HookRequest {
            name: "web",
            active: true,
            events: ["push"],
            config: HookConfig { url: callback_url, content_type: "json" },
        };
        let response = self.rest.post_json(&url, &request)?;
        self.rest.expect_success(response, &url)?;
        debug!("Registered webhook for {repo} calling {callback_url}");
        Ok(())
    }

    fn list_repositories(&self, domain: &str) -> Result<Vec<String>> {
        let url = format!("{}/users/{}/repos?per_page=100", self.config.api_url, domain);
        let response = self.rest.get(&url)?;
        let items: Vec<RepoItem> = self.rest.expect_success(response, &url)?.json()?;
        Ok(items.into_iter().map(|item| item.name).collect())
    }

    fn repo_url(&self, repo: &RepoDescriptor) -> String {
        repo.repo_url(&self.config.base_url)
    }

    fn scm_url(&self, repo: &RepoDescriptor) -> String {
        repo.scm_url(&self.config.base_url)
    }
}
