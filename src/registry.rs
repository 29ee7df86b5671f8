//! Template sources and the provider clients that service them.

use indexmap::IndexMap;
use log::debug;

use crate::config::{AppConfig, ClientConfig};
use crate::error::{Error, Result};
use crate::provider::{BitBucketClient, GitHubClient, GitProvider};
use crate::repository::{BitBucketRepo, GitHubRepo, RepoDescriptor};

/// Maps template-source keys to repositories, and repositories to the client
/// of their hosting technology. Built once, read-only afterwards.
pub struct ProviderRegistry {
    templates: IndexMap<String, RepoDescriptor>,
    bitbucket: Box<dyn GitProvider>,
    github: Box<dyn GitProvider>,
}

impl ProviderRegistry {
    pub fn new(
        templates: IndexMap<String, RepoDescriptor>,
        bitbucket: Box<dyn GitProvider>,
        github: Box<dyn GitProvider>,
    ) -> Self {
        Self { templates, bitbucket, github }
    }

    /// Builds both clients and registers every configured template source.
    ///
    /// # Errors
    /// * `Error::ConfigError` if a client's settings are incomplete, a source
    ///   is missing a field, or two sources share a name
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let bitbucket = BitBucketClient::new(ClientConfig::bitbucket(&config.bitbucket)?)?;
        let github = GitHubClient::new(ClientConfig::github(&config.github)?)?;

        let mut templates = IndexMap::new();
        let bitbucket_sources = config.bitbucket_template_repositories.iter().map(|source| {
            let repo = BitBucketRepo::new(
                source.project_key.as_str(),
                source.repository_slug.as_str(),
                source.functional_domain.as_str(),
                source.project_name.as_str(),
            );
            (source.name.as_str(), RepoDescriptor::BitBucket(repo))
        });
        let github_sources = config.github_template_repositories.iter().map(|source| {
            let repo = GitHubRepo::new(source.domain.as_str(), source.repo_name.as_str());
            (source.name.as_str(), RepoDescriptor::GitHub(repo))
        });

        for (name, descriptor) in bitbucket_sources.chain(github_sources) {
            if !descriptor.validate() {
                return Err(Error::ConfigError(format!(
                    "template source '{name}' is missing repository fields"
                )));
            }
            if templates.insert(name.to_string(), descriptor).is_some() {
                return Err(Error::ConfigError(format!("template source '{name}' is defined twice")));
            }
            debug!("Registered template source '{name}'");
        }

        Ok(Self::new(templates, Box::new(bitbucket), Box::new(github)))
    }

    /// Looks up a template source by key.
    pub fn source(&self, key: &str) -> Result<&RepoDescriptor> {
        self.templates
            .get(key)
            .ok_or_else(|| Error::SourceNotFoundError { key: key.to_string() })
    }

    /// All template sources in configuration order.
    pub fn sources(&self) -> impl Iterator<Item = (&str, &RepoDescriptor)> {
        self.templates.iter().map(|(key, repo)| (key.as_str(), repo))
    }

    /// The client serving the descriptor's hosting technology.
    pub fn client_for(&self, repo: &RepoDescriptor) -> &dyn GitProvider {
        match repo {
            RepoDescriptor::BitBucket(_) => self.bitbucket.as_ref(),
            RepoDescriptor::GitHub(_) => self.github.as_ref(),
        }
    }
}
