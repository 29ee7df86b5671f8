//! Repository descriptors.
//!
//! A descriptor names a repository on one hosting technology. The set of
//! technologies is closed: each [`RepoDescriptor`] variant is serviced by
//! exactly one provider client, see [`crate::registry::ProviderRegistry`].

use std::fmt;

fn trim_base(base: &str) -> &str {
    base.trim_end_matches('/')
}

/// The hosting technology a descriptor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    BitBucket,
    GitHub,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::BitBucket => f.write_str("bitbucket"),
            ProviderKind::GitHub => f.write_str("github"),
        }
    }
}

/// A repository on a BitBucket server, addressed by project key and slug.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitBucketRepo {
    pub project_key: String,
    pub repository_slug: String,
    pub functional_domain: String,
    pub project_name: String,
}

impl BitBucketRepo {
    pub fn new<S: Into<String>>(
        project_key: S,
        repository_slug: S,
        functional_domain: S,
        project_name: S,
    ) -> Self {
        Self {
            project_key: project_key.into(),
            repository_slug: repository_slug.into(),
            functional_domain: functional_domain.into(),
            project_name: project_name.into(),
        }
    }
}

/// A repository on GitHub, addressed by owner and name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitHubRepo {
    pub domain: String,
    pub repository_name: String,
}

impl GitHubRepo {
    pub fn new<S: Into<String>>(domain: S, repository_name: S) -> Self {
        Self { domain: domain.into(), repository_name: repository_name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoDescriptor {
    BitBucket(BitBucketRepo),
    GitHub(GitHubRepo),
}

impl RepoDescriptor {
    pub fn kind(&self) -> ProviderKind {
        match self {
            RepoDescriptor::BitBucket(_) => ProviderKind::BitBucket,
            RepoDescriptor::GitHub(_) => ProviderKind::GitHub,
        }
    }

    /// Every field the provider needs is present.
    pub fn validate(&self) -> bool {
        match self {
            RepoDescriptor::BitBucket(repo) => {
                !repo.project_key.is_empty()
                    && !repo.repository_slug.is_empty()
                    && !repo.functional_domain.is_empty()
                    && !repo.project_name.is_empty()
            }
            RepoDescriptor::GitHub(repo) => {
                !repo.domain.is_empty() && !repo.repository_name.is_empty()
            }
        }
    }

    /// The provider-specific namespace: the project key or the GitHub owner.
    pub fn domain(&self) -> &str {
        match self {
            RepoDescriptor::BitBucket(repo) => &repo.project_key,
            RepoDescriptor::GitHub(repo) => &repo.domain,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            RepoDescriptor::BitBucket(repo) => &repo.repository_slug,
            RepoDescriptor::GitHub(repo) => &repo.repository_name,
        }
    }

    /// Renames the repository. Only meaningful before it is created.
    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        match self {
            RepoDescriptor::BitBucket(repo) => repo.repository_slug = name.into(),
            RepoDescriptor::GitHub(repo) => repo.repository_name = name.into(),
        }
    }

    /// REST resource of the repository.
    ///
    /// BitBucket: `{base}/rest/api/1.0/projects/{KEY}/repos/{slug}`,
    /// GitHub: `{base}/repos/{owner}/{name}` where `base` is the API host.
    pub fn rest_api_url(&self, base: &str) -> String {
        match self {
            RepoDescriptor::BitBucket(_) => {
                format!("{}/{}", self.rest_collection_url(base), self.name())
            }
            RepoDescriptor::GitHub(_) => {
                format!("{}/repos/{}/{}", trim_base(base), self.domain(), self.name())
            }
        }
    }

    /// REST collection the repository is created in on BitBucket. GitHub
    /// repositories have no per-owner collection, so this is the owner's
    /// repository listing.
    pub fn rest_collection_url(&self, base: &str) -> String {
        match self {
            RepoDescriptor::BitBucket(_) => {
                format!("{}/rest/api/1.0/projects/{}/repos", trim_base(base), self.domain())
            }
            RepoDescriptor::GitHub(_) => format!("{}/users/{}/repos", trim_base(base), self.domain()),
        }
    }

    /// Address a browser can open.
    pub fn repo_url(&self, base: &str) -> String {
        match self {
            RepoDescriptor::BitBucket(_) => format!(
                "{}/projects/{}/repos/{}",
                trim_base(base),
                self.domain(),
                self.name()
            ),
            RepoDescriptor::GitHub(_) => {
                format!("{}/{}/{}", trim_base(base), self.domain(), self.name())
            }
        }
    }

    /// Address git clones from and pushes to.
    pub fn scm_url(&self, base: &str) -> String {
        match self {
            RepoDescriptor::BitBucket(_) => {
                format!("{}/scm/{}/{}.git", trim_base(base), self.domain(), self.name())
            }
            RepoDescriptor::GitHub(_) => format!("{}.git", self.repo_url(base)),
        }
    }
}

impl fmt::Display for RepoDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} repository '{}/{}'", self.kind(), self.domain(), self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitbucket() -> RepoDescriptor {
        RepoDescriptor::BitBucket(BitBucketRepo::new("PRJ", "my-service", "payments", "Payments"))
    }

    fn github() -> RepoDescriptor {
        RepoDescriptor::GitHub(GitHubRepo::new("octo", "hello"))
    }

    #[test]
    fn test_validate() {
        assert!(bitbucket().validate());
        assert!(github().validate());

        let mut incomplete = BitBucketRepo::new("PRJ", "slug", "", "Name");
        assert!(!RepoDescriptor::BitBucket(incomplete.clone()).validate());
        incomplete.functional_domain = "domain".to_string();
        assert!(RepoDescriptor::BitBucket(incomplete).validate());

        assert!(!RepoDescriptor::GitHub(GitHubRepo::new("", "hello")).validate());
    }

    #[test]
    fn test_bitbucket_urls() {
        let repo = bitbucket();
        let base = "https://bitbucket.example.com/";
        assert_eq!(
            repo.rest_api_url(base),
            "https://bitbucket.example.com/rest/api/1.0/projects/PRJ/repos/my-service"
        );
        assert_eq!(
            repo.rest_collection_url(base),
            "https://bitbucket.example.com/rest/api/1.0/projects/PRJ/repos"
        );
        assert_eq!(
            repo.repo_url(base),
            "https://bitbucket.example.com/projects/PRJ/repos/my-service"
        );
        assert_eq!(repo.scm_url(base), "https://bitbucket.example.com/scm/PRJ/my-service.git");
    }

    #[test]
    fn test_github_urls() {
        let repo = github();
        assert_eq!(
            repo.rest_api_url("https://api.github.com"),
            "https://api.github.com/repos/octo/hello"
        );
        assert_eq!(repo.repo_url("https://github.com"), "https://github.com/octo/hello");
        assert_eq!(repo.scm_url("https://github.com"), "https://github.com/octo/hello.git");
    }

    #[test]
    fn test_set_name() {
        let mut repo = bitbucket();
        repo.set_name("renamed");
        assert_eq!(repo.name(), "renamed");

        let mut repo = github();
        repo.set_name("renamed");
        assert_eq!(repo.name(), "renamed");
    }

    #[test]
    fn test_display() {
        assert_eq!(github().to_string(), "github repository 'octo/hello'");
        assert_eq!(bitbucket().kind(), ProviderKind::BitBucket);
    }
}
