//! Hosting-provider clients.
//!
//! A [`GitProvider`] is the capability set for one hosting technology: the REST
//! calls that query and create repositories, and the git transport that clones
//! templates and pushes generated projects.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::repository::{ProviderKind, RepoDescriptor};

pub mod bitbucket;
pub mod git;
pub mod github;
pub mod rest;

pub use bitbucket::BitBucketClient;
pub use github::GitHubClient;

/// How a template source is checked out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Checkout {
    #[default]
    DefaultBranch,
    Branch(String),
    Tag(String),
}

impl fmt::Display for Checkout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Checkout::DefaultBranch => f.write_str("default branch"),
            Checkout::Branch(name) => write!(f, "branch '{name}'"),
            Checkout::Tag(name) => write!(f, "tag '{name}'"),
        }
    }
}

/// Operations a hosting technology must support.
pub trait GitProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Whether the repository exists. A missing repository is not an error.
    fn repo_exists(&self, repo: &RepoDescriptor) -> Result<bool>;

    /// Clones the repository into a new temporary directory and returns it.
    fn clone_repo(&self, repo: &RepoDescriptor, checkout: &Checkout) -> Result<PathBuf>;

    /// Creates an empty repository and returns its browsable URL.
    fn create_repo(&self, repo: &RepoDescriptor) -> Result<String>;

    /// Commits everything under `dir` and pushes it as the first commit.
    fn initial_commit(&self, dir: &Path, repo: &RepoDescriptor) -> Result<()>;

    /// Registers a build notification hook calling `callback_url`.
    fn create_webhook(&self, callback_url: &str, repo: &RepoDescriptor) -> Result<()>;

    /// Names of the repositories under a project key or owner.
    fn list_repositories(&self, domain: &str) -> Result<Vec<String>>;

    fn repo_url(&self, repo: &RepoDescriptor) -> String;

    fn scm_url(&self, repo: &RepoDescriptor) -> String;
}
