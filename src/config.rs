//! Application configuration.
//! Provider hosts, credentials, timeouts and the known template sources are
//! read once at startup from a YAML file, with environment variables taking
//! precedence for credentials and hosts.

use log::debug;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::constants::{CONFIG_DIRS, CONFIG_FILES};
use crate::error::{Error, Result};

const BITBUCKET_TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 1..=10;

fn default_bitbucket_timeout() -> u64 {
    3
}

fn default_github_timeout() -> u64 {
    10
}

fn default_github_url() -> String {
    "https://github.com".to_string()
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bitbucket: BitBucketSettings,
    pub github: GitHubSettings,
    pub bitbucket_template_repositories: Vec<BitBucketTemplateRepository>,
    pub github_template_repositories: Vec<GitHubTemplateRepository>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BitBucketSettings {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_bitbucket_timeout")]
    pub timeout: u64,
}

impl Default for BitBucketSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            user: String::new(),
            password: String::new(),
            token: String::new(),
            email: String::new(),
            timeout: default_bitbucket_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubSettings {
    #[serde(default = "default_github_url")]
    pub url: String,
    #[serde(default = "default_github_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_github_timeout")]
    pub timeout: u64,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            url: default_github_url(),
            api_url: default_github_api_url(),
            user: String::new(),
            password: String::new(),
            token: String::new(),
            email: String::new(),
            timeout: default_github_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BitBucketTemplateRepository {
    pub name: String,
    pub project_key: String,
    pub repository_slug: String,
    pub functional_domain: String,
    pub project_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubTemplateRepository {
    pub name: String,
    pub domain: String,
    pub repo_name: String,
}

/// Validated connection settings for one provider client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Web host, also used for clone URLs.
    pub base_url: String,
    /// REST host. Same as `base_url` for BitBucket.
    pub api_url: String,
    pub username: String,
    /// Password, or the access token when no password is configured.
    pub secret: String,
    pub email: String,
    pub timeout: Duration,
}

fn require(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::ConfigError(format!("{field} must not be empty")));
    }
    Ok(())
}

fn parse_base(value: &str, field: &str) -> Result<String> {
    require(value, field)?;
    let url = Url::parse(value)
        .map_err(|e| Error::ConfigError(format!("{field} '{value}' is not a valid URL: {e}")))?;
    Ok(url.as_str().trim_end_matches('/').to_string())
}

fn pick_secret(password: &str, token: &str) -> Result<String> {
    match (password.is_empty(), token.is_empty()) {
        (false, _) => Ok(password.to_string()),
        (true, false) => Ok(token.to_string()),
        (true, true) => Err(Error::ConfigError(
            "either an access token or a password must be set".to_string(),
        )),
    }
}

impl ClientConfig {
    /// # Errors
    /// * `Error::ConfigError` if the host, user or email is missing, neither a
    ///   password nor a token is set, or the timeout is outside 1..=10 seconds
    pub fn bitbucket(settings: &BitBucketSettings) -> Result<Self> {
        let base_url = parse_base(&settings.url, "bitbucket url")?;
        require(&settings.user, "bitbucket user")?;
        require(&settings.email, "bitbucket email")?;
        let secret = pick_secret(&settings.password, &settings.token)?;
        if !BITBUCKET_TIMEOUT_RANGE.contains(&settings.timeout) {
            return Err(Error::ConfigError(format!(
                "bitbucket timeout must be set between {} and {} seconds",
                BITBUCKET_TIMEOUT_RANGE.start(),
                BITBUCKET_TIMEOUT_RANGE.end()
            )));
        }

        Ok(Self {
            api_url: base_url.clone(),
            base_url,
            username: settings.user.clone(),
            secret,
            email: settings.email.clone(),
            timeout: Duration::from_secs(settings.timeout),
        })
    }

    /// # Errors
    /// * `Error::ConfigError` if a host or the user is missing, or neither a
    ///   password nor a token is set
    pub fn github(settings: &GitHubSettings) -> Result<Self> {
        let base_url = parse_base(&settings.url, "github url")?;
        let api_url = parse_base(&settings.api_url, "github api_url")?;
        require(&settings.user, "github user")?;
        let secret = pick_secret(&settings.password, &settings.token)?;
        if settings.timeout == 0 {
            return Err(Error::ConfigError("github timeout must be positive".to_string()));
        }
        let email = if settings.email.is_empty() {
            format!("{}@users.noreply.github.com", settings.user)
        } else {
            settings.email.clone()
        };

        Ok(Self {
            base_url,
            api_url,
            username: settings.user.clone(),
            secret,
            email,
            timeout: Duration::from_secs(settings.timeout),
        })
    }
}

impl AppConfig {
    /// Parses YAML configuration content.
    pub fn parse(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::ConfigError(format!("Invalid configuration format: {e}")))
    }

    /// Loads the configuration file, then applies environment overrides.
    ///
    /// With no explicit path, `config.yaml` and `config.yml` are looked up in
    /// the current directory, `./config` and `./genesis_config`.
    ///
    /// # Errors
    /// * `Error::ConfigError` if no file is found or the content is invalid
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => find_config_file(Path::new("."))?,
        };
        debug!("Loading configuration from {}", path.display());

        let content =
            fs::read_to_string(&path).map_err(|e| Error::file("read configuration", &path, e))?;
        let mut config = Self::parse(&content)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overrides hosts and credentials from environment-style variables.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let overrides: [(&str, &mut String); 9] = [
            ("BITBUCKET_URL", &mut self.bitbucket.url),
            ("BITBUCKET_USER", &mut self.bitbucket.user),
            ("BITBUCKET_PASSWORD", &mut self.bitbucket.password),
            ("BITBUCKET_TOKEN", &mut self.bitbucket.token),
            ("BITBUCKET_USER_EMAIL", &mut self.bitbucket.email),
            ("GITHUB_USER", &mut self.github.user),
            ("GITHUB_PASSWORD", &mut self.github.password),
            ("GITHUB_TOKEN", &mut self.github.token),
            ("GITHUB_USER_EMAIL", &mut self.github.email),
        ];
        for (key, field) in overrides {
            if let Some(value) = lookup(key) {
                debug!("Using {key} from the environment");
                *field = value;
            }
        }

        if let Some(timeout) = lookup("BITBUCKET_TIMEOUT") {
            self.bitbucket.timeout = timeout.trim().parse().map_err(|_| {
                Error::ConfigError(format!("BITBUCKET_TIMEOUT '{timeout}' is not a number"))
            })?;
        }
        Ok(())
    }
}

/// Returns the first configuration file found under `base`.
pub fn find_config_file(base: &Path) -> Result<PathBuf> {
    let mut tried = Vec::new();
    for dir in CONFIG_DIRS {
        for file in CONFIG_FILES {
            let candidate = base.join(dir).join(file);
            if candidate.is_file() {
                return Ok(candidate);
            }
            tried.push(candidate.display().to_string());
        }
    }

    Err(Error::ConfigError(format!("No configuration file found (tried: {})", tried.join(", "))))
}
