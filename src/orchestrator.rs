//! Generation pipeline.
//!
//! A generation request moves through [`Stage`]s in order: the request is
//! validated, the template source is resolved to its client, cloned, rendered,
//! the destination repository is created, the rendered project is pushed as its
//! first commit and, when asked, a webhook is registered. The first failing
//! stage ends the request and its error carries that stage.

use indexmap::IndexMap;
use log::{debug, info, warn};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::manifest::{Manifest, Template};
use crate::materializer;
use crate::provider::Checkout;
use crate::registry::ProviderRegistry;
use crate::repository::RepoDescriptor;
use crate::variable::validate_options;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validated,
    SourceResolved,
    Cloned,
    Rendered,
    DestinationCreated,
    Committed,
    WebhookRegistered,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self {
            Stage::Validated => "Validating the request",
            Stage::SourceResolved => "Resolving the template source",
            Stage::Cloned => "Cloning the template source",
            Stage::Rendered => "Rendering the template",
            Stage::DestinationCreated => "Creating the destination repository",
            Stage::Committed => "Pushing the initial commit",
            Stage::WebhookRegistered => "Registering the webhook",
        };
        f.write_str(action)
    }
}

/// Everything needed to generate one project.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Key of the configured template source.
    pub template_source: String,
    /// Name of the template inside the source's manifest.
    pub template_name: String,
    pub options: IndexMap<String, String>,
    pub destination: RepoDescriptor,
    pub webhook_url: Option<String>,
    pub create_webhook: bool,
}

/// Outcome of a successful generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    /// Browsable address of the new repository.
    pub repository_url: String,
    /// Local checkout the project was rendered in. Remove it with
    /// [`Orchestrator::cleanup`] when done.
    pub checkout_dir: PathBuf,
}

/// Template names offered by one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateNames {
    pub name: String,
    pub project_names: Vec<String>,
}

pub struct Orchestrator {
    registry: ProviderRegistry,
}

impl Orchestrator {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Generates from the source's default branch.
    pub fn generate(&self, request: &GenerationRequest) -> Result<Generation> {
        self.run(request, &Checkout::DefaultBranch)
    }

    pub fn generate_from_branch(&self, request: &GenerationRequest, branch: &str) -> Result<Generation> {
        self.run(request, &Checkout::Branch(branch.to_string()))
    }

    pub fn generate_from_tag(&self, request: &GenerationRequest, tag: &str) -> Result<Generation> {
        self.run(request, &Checkout::Tag(tag.to_string()))
    }

    fn run(&self, request: &GenerationRequest, checkout: &Checkout) -> Result<Generation> {
        self.validate(request).map_err(|e| e.at(Stage::Validated))?;
        let source = self.resolve_source(request).map_err(|e| e.at(Stage::SourceResolved))?;

        let source_client = self.registry.client_for(source);
        let destination_client = self.registry.client_for(&request.destination);
        debug!(
            "Template source '{}' uses {}, destination uses {}",
            request.template_source,
            source_client.kind(),
            destination_client.kind()
        );

        let checkout_dir =
            source_client.clone_repo(source, checkout).map_err(|e| e.at(Stage::Cloned))?;

        let result = self.publish(request, &checkout_dir);
        if result.is_err() {
            warn!("Generation failed, checkout left at {}", checkout_dir.display());
        }
        let repository_url = result?;

        info!("Generated {} from template '{}'", request.destination, request.template_name);
        Ok(Generation { repository_url, checkout_dir })
    }

    fn validate(&self, request: &GenerationRequest) -> Result<()> {
        if !request.destination.validate() {
            return Err(Error::ConfigError(format!(
                "destination {} is missing repository fields",
                request.destination
            )));
        }
        if request.create_webhook && request.webhook_url.as_deref().unwrap_or_default().is_empty() {
            return Err(Error::ConfigError("a webhook was requested without a callback URL".to_string()));
        }
        Ok(())
    }

    fn resolve_source<'a>(&'a self, request: &GenerationRequest) -> Result<&'a RepoDescriptor> {
        let source = self.registry.source(&request.template_source)?;
        if !source.validate() {
            return Err(Error::ConfigError(format!(
                "template source '{}' is missing repository fields",
                request.template_source
            )));
        }
        Ok(source)
    }

    fn publish(&self, request: &GenerationRequest, checkout_dir: &Path) -> Result<String> {
        let root = render(checkout_dir, &request.template_name, &request.options)
            .map_err(|e| e.at(Stage::Rendered))?;

        let client = self.registry.client_for(&request.destination);
        let repository_url =
            client.create_repo(&request.destination).map_err(|e| e.at(Stage::DestinationCreated))?;

        client
            .initial_commit(&checkout_dir.join(root), &request.destination)
            .map_err(|e| e.at(Stage::Committed))?;

        if request.create_webhook {
            let callback_url = request.webhook_url.as_deref().unwrap_or_default();
            client
                .create_webhook(callback_url, &request.destination)
                .map_err(|e| e.at(Stage::WebhookRegistered))?;
        }
        Ok(repository_url)
    }

    /// Template names of every configured source. Sources are cloned
    /// concurrently; the first failure is returned.
    pub fn template_names(&self) -> Result<Vec<TemplateNames>> {
        let keys: Vec<&str> = self.registry.sources().map(|(key, _)| key).collect();

        let results: Vec<Result<TemplateNames>> = std::thread::scope(|scope| {
            let handles: Vec<_> = keys
                .iter()
                .map(|key| {
                    scope.spawn(move || {
                        let templates = self.templates(key)?;
                        Ok(TemplateNames {
                            name: key.to_string(),
                            project_names: templates.into_iter().map(|t| t.name).collect(),
                        })
                    })
                })
                .collect();

            handles
                .into_iter()
                .zip(&keys)
                .map(|(handle, key)| {
                    handle.join().unwrap_or_else(|_| {
                        Err(Error::ConfigError(format!("listing template source '{key}' panicked")))
                    })
                })
                .collect()
        });

        results.into_iter().collect()
    }

    /// Every template declared by a source.
    pub fn templates(&self, key: &str) -> Result<Vec<Template>> {
        self.with_checkout(key, |dir| Ok(Manifest::load(dir)?.projects))
    }

    /// One template of a source, with its form groups organized for display.
    pub fn template(&self, key: &str, name: &str) -> Result<Template> {
        self.with_checkout(key, |dir| {
            let mut template = Manifest::load(dir)?.template(name)?.clone();
            template.organize_groups();
            Ok(template)
        })
    }

    /// Checks that a source has a readable manifest.
    pub fn validate_source(&self, key: &str) -> Result<()> {
        self.with_checkout(key, |dir| {
            let manifest = dir.join(crate::constants::MANIFEST_FILE);
            if !manifest.is_file() {
                return Err(Error::PathNotFoundError { path: manifest.display().to_string() });
            }
            Manifest::load(dir).map(|_| ())
        })
    }

    /// Removes a checkout directory created by this orchestrator.
    pub fn cleanup(&self, checkout_dir: &Path) -> Result<()> {
        debug!("Removing checkout {}", checkout_dir.display());
        fs::remove_dir_all(checkout_dir).map_err(|e| Error::file("remove", checkout_dir, e))
    }

    fn with_checkout<T, F>(&self, key: &str, f: F) -> Result<T>
    where
        F: FnOnce(&Path) -> Result<T>,
    {
        let source = self.registry.source(key)?;
        let dir = self.registry.client_for(source).clone_repo(source, &Checkout::DefaultBranch)?;
        let result = f(&dir);
        if let Err(e) = self.cleanup(&dir) {
            warn!("{e}");
        }
        result
    }
}

/// Loads the manifest, validates the options against the named template and
/// renders it in place. Returns the template root relative to `checkout_dir`.
pub fn render(checkout_dir: &Path, template_name: &str, raw: &IndexMap<String, String>) -> Result<String> {
    let manifest = Manifest::load(checkout_dir)?;
    let template = manifest.template(template_name)?;
    let options = validate_options(&template.options, raw)?;
    materializer::render(checkout_dir, template, &options)?;
    Ok(template.root()?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::provider::GitProvider;
    use crate::repository::{BitBucketRepo, GitHubRepo, ProviderKind};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    const MANIFEST: &str = r#"
projects:
  - name: hello
    root: hello
    options:
      - name: name
        required: true
"#;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Clone(String),
        Create(String),
        Commit(String, String),
        Webhook(String, String),
    }

    struct FakeProvider {
        kind: ProviderKind,
        fixture: PathBuf,
        existing: Vec<String>,
        calls: Arc<Mutex<Vec<Call>>>,
    }

    impl FakeProvider {
        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl GitProvider for FakeProvider {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        fn repo_exists(&self, repo: &RepoDescriptor) -> Result<bool> {
            Ok(self.existing.iter().any(|name| name == repo.name()))
        }

        fn clone_repo(&self, repo: &RepoDescriptor, _checkout: &Checkout) -> Result<PathBuf> {
            self.record(Call::Clone(repo.name().to_string()));
            let dir = tempfile::Builder::new().prefix("genesis-test-").tempdir()?.keep();
            materializer::copy_dir_contents(&self.fixture, &dir)?;
            Ok(dir)
        }

        fn create_repo(&self, repo: &RepoDescriptor) -> Result<String> {
            if self.repo_exists(repo)? {
                return Err(Error::RepositoryExistsError { url: self.repo_url(repo) });
            }
            self.record(Call::Create(repo.name().to_string()));
            Ok(self.repo_url(repo))
        }

        fn initial_commit(&self, dir: &Path, repo: &RepoDescriptor) -> Result<()> {
            let readme = fs::read_to_string(dir.join("README.md"))?;
            self.record(Call::Commit(repo.name().to_string(), readme));
            Ok(())
        }

        fn create_webhook(&self, callback_url: &str, repo: &RepoDescriptor) -> Result<()> {
            self.record(Call::Webhook(repo.name().to_string(), callback_url.to_string()));
            Ok(())
        }

        fn list_repositories(&self, _domain: &str) -> Result<Vec<String>> {
            Ok(self.existing.clone())
        }

        fn repo_url(&self, repo: &RepoDescriptor) -> String {
            format!("https://{}.example.com/{}/{}", self.kind, repo.domain(), repo.name())
        }

        fn scm_url(&self, repo: &RepoDescriptor) -> String {
            format!("{}.git", self.repo_url(repo))
        }
    }

    struct Harness {
        _fixture: TempDir,
        orchestrator: Orchestrator,
        bitbucket_calls: Arc<Mutex<Vec<Call>>>,
        github_calls: Arc<Mutex<Vec<Call>>>,
    }

    fn harness(existing: &[&str]) -> Harness {
        let fixture = TempDir::new().unwrap();
        fs::write(fixture.path().join(crate::constants::MANIFEST_FILE), MANIFEST).unwrap();
        fs::create_dir_all(fixture.path().join("hello")).unwrap();
        fs::write(fixture.path().join("hello").join("README.md"), "Hello {{name}}").unwrap();

        let bitbucket_calls = Arc::new(Mutex::new(Vec::new()));
        let github_calls = Arc::new(Mutex::new(Vec::new()));
        let existing: Vec<String> = existing.iter().map(|name| name.to_string()).collect();

        let bitbucket = FakeProvider {
            kind: ProviderKind::BitBucket,
            fixture: fixture.path().to_path_buf(),
            existing: existing.clone(),
            calls: Arc::clone(&bitbucket_calls),
        };
        let github = FakeProvider {
            kind: ProviderKind::GitHub,
            fixture: fixture.path().to_path_buf(),
            existing,
            calls: Arc::clone(&github_calls),
        };

        let mut templates = IndexMap::new();
        templates.insert(
            "java".to_string(),
            RepoDescriptor::BitBucket(BitBucketRepo::new("TPL", "java-templates", "platform", "Templates")),
        );
        templates.insert(
            "go".to_string(),
            RepoDescriptor::GitHub(GitHubRepo::new("octo", "go-templates")),
        );

        let registry = ProviderRegistry::new(templates, Box::new(bitbucket), Box::new(github));
        Harness { _fixture: fixture, orchestrator: Orchestrator::new(registry), bitbucket_calls, github_calls }
    }

    fn request(source: &str, destination: RepoDescriptor) -> GenerationRequest {
        GenerationRequest {
            template_source: source.to_string(),
            template_name: "hello".to_string(),
            options: IndexMap::from([("name".to_string(), "Rex".to_string())]),
            destination,
            webhook_url: None,
            create_webhook: false,
        }
    }

    fn github_destination() -> RepoDescriptor {
        RepoDescriptor::GitHub(GitHubRepo::new("octo", "rex"))
    }

    #[test]
    fn test_generate_across_providers() {
        let harness = harness(&[]);
        let generation = harness.orchestrator.generate(&request("java", github_destination())).unwrap();

        assert_eq!(generation.repository_url, "https://github.example.com/octo/rex");
        assert_eq!(
            *harness.bitbucket_calls.lock().unwrap(),
            vec![Call::Clone("java-templates".to_string())]
        );
        assert_eq!(
            *harness.github_calls.lock().unwrap(),
            vec![
                Call::Create("rex".to_string()),
                Call::Commit("rex".to_string(), "Hello Rex".to_string()),
            ]
        );

        harness.orchestrator.cleanup(&generation.checkout_dir).unwrap();
        assert!(!generation.checkout_dir.exists());
    }

    #[test]
    fn test_generate_with_webhook() {
        let harness = harness(&[]);
        let destination =
            RepoDescriptor::BitBucket(BitBucketRepo::new("PRJ", "rex", "pets", "Pets"));
        let mut request = request("go", destination);
        request.create_webhook = true;
        request.webhook_url = Some("https://ci.example.com/hook".to_string());

        let generation = harness.orchestrator.generate_from_branch(&request, "main").unwrap();
        let calls = harness.bitbucket_calls.lock().unwrap();
        assert_eq!(
            calls.last(),
            Some(&Call::Webhook("rex".to_string(), "https://ci.example.com/hook".to_string()))
        );
        harness.orchestrator.cleanup(&generation.checkout_dir).unwrap();
    }

    #[test]
    fn test_webhook_requires_callback_url() {
        let harness = harness(&[]);
        let mut request = request("java", github_destination());
        request.create_webhook = true;

        let err = harness.orchestrator.generate(&request).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Validated));
        assert_eq!(err.kind(), ErrorKind::ConfigurationInvalid);
        assert!(harness.bitbucket_calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_destination_exists() {
        let harness = harness(&["rex"]);
        let err = harness.orchestrator.generate_from_tag(&request("java", github_destination()), "v1").unwrap_err();
        assert_eq!(err.stage(), Some(Stage::DestinationCreated));
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_missing_required_option() {
        let harness = harness(&[]);
        let mut request = request("java", github_destination());
        request.options.clear();

        let err = harness.orchestrator.generate(&request).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Rendered));
        assert_eq!(err.kind(), ErrorKind::ConfigurationInvalid);
        assert!(err.to_string().contains("name is a required parameter"));
    }

    #[test]
    fn test_unknown_source_and_template() {
        let harness = harness(&[]);
        let err = harness.orchestrator.generate(&request("cobol", github_destination())).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::SourceResolved));
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let mut request = request("java", github_destination());
        request.template_name = "nope".to_string();
        let err = harness.orchestrator.generate(&request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("Valid project names are: [hello]"));
    }

    #[test]
    fn test_invalid_destination() {
        let harness = harness(&[]);
        let destination = RepoDescriptor::GitHub(GitHubRepo::new("octo", ""));
        let err = harness.orchestrator.generate(&request("java", destination)).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Validated));
    }

    #[test]
    fn test_template_listing() {
        let harness = harness(&[]);
        let names = harness.orchestrator.template_names().unwrap();
        assert_eq!(
            names,
            vec![
                TemplateNames { name: "java".to_string(), project_names: vec!["hello".to_string()] },
                TemplateNames { name: "go".to_string(), project_names: vec!["hello".to_string()] },
            ]
        );

        let template = harness.orchestrator.template("go", "hello").unwrap();
        assert_eq!(template.root, "hello");
        assert_eq!(template.required_options().len(), 1);
        harness.orchestrator.validate_source("java").unwrap();
    }
}
