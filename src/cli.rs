//! Command-line interface implementation for Genesis.
//! Provides argument parsing and help text formatting using clap.

use clap::{error::ErrorKind, Args, CommandFactory, Parser, Subcommand, ValueEnum};
use indexmap::IndexMap;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::orchestrator::GenerationRequest;
use crate::repository::{BitBucketRepo, GitHubRepo, RepoDescriptor};

/// Command-line arguments structure for Genesis.
#[derive(Parser, Debug)]
#[command(name = "genesis")]
#[command(author, version, about = "Genesis: project generation from versioned templates", long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a project from a template and push it to a new repository
    Generate(GenerateArgs),

    /// List the templates offered by every configured source
    List,

    /// Render a template from a local working copy
    Local(LocalArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetProvider {
    Bitbucket,
    Github,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Key of the configured template source
    #[arg(value_name = "SOURCE")]
    pub source: String,

    /// Name of the template in the source's manifest
    #[arg(value_name = "TEMPLATE")]
    pub template: String,

    /// Template option as key=value, may be repeated
    #[arg(short, long = "option", value_name = "KEY=VALUE", value_parser = parse_option)]
    pub options: Vec<(String, String)>,

    /// Hosting provider of the new repository
    #[arg(long, value_enum)]
    pub target_provider: TargetProvider,

    /// BitBucket project key or GitHub owner of the new repository
    #[arg(long)]
    pub domain: String,

    /// Name (BitBucket slug) of the new repository
    #[arg(long)]
    pub name: String,

    /// BitBucket functional domain
    #[arg(long, default_value = "")]
    pub functional_domain: String,

    /// BitBucket project name
    #[arg(long, default_value = "")]
    pub project_name: String,

    /// Check the template out at this branch
    #[arg(long, conflicts_with = "tag")]
    pub branch: Option<String>,

    /// Check the template out at this tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Build server URL the webhook should call
    #[arg(long)]
    pub webhook_url: Option<String>,

    /// Register a webhook on the new repository
    #[arg(long)]
    pub create_webhook: bool,

    /// Keep the local checkout after generation
    #[arg(long)]
    pub keep_checkout: bool,
}

#[derive(Args, Debug)]
pub struct LocalArgs {
    /// Directory holding the template folders
    #[arg(long, default_value = ".")]
    pub wd: PathBuf,

    /// Target directory (a temporary directory when omitted)
    #[arg(long)]
    pub target: Option<PathBuf>,

    /// Settings file naming the source folder and its option values
    #[arg(long, default_value = "options.test.yaml")]
    pub options: PathBuf,
}

fn parse_option(raw: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("'{raw}' is not in KEY=VALUE form"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("'{raw}' has an empty key"));
    }
    Ok((key.to_string(), value.to_string()))
}

impl GenerateArgs {
    pub fn destination(&self) -> RepoDescriptor {
        match self.target_provider {
            TargetProvider::Bitbucket => RepoDescriptor::BitBucket(BitBucketRepo::new(
                self.domain.as_str(),
                self.name.as_str(),
                self.functional_domain.as_str(),
                self.project_name.as_str(),
            )),
            TargetProvider::Github => {
                RepoDescriptor::GitHub(GitHubRepo::new(self.domain.as_str(), self.name.as_str()))
            }
        }
    }

    /// # Errors
    /// * `Error::ConfigError` if the same option is given twice
    pub fn request(&self) -> Result<GenerationRequest> {
        let mut options = IndexMap::new();
        for (key, value) in &self.options {
            if options.insert(key.clone(), value.clone()).is_some() {
                return Err(Error::ConfigError(format!("option '{key}' is given more than once")));
            }
        }

        Ok(GenerationRequest {
            template_source: self.source.clone(),
            template_name: self.template.clone(),
            options,
            destination: self.destination(),
            webhook_url: self.webhook_url.clone(),
            create_webhook: self.create_webhook,
        })
    }
}

/// Parses command line arguments and returns the Cli structure.
///
/// # Exits
/// * With status code 1 if required arguments are missing
/// * With clap's default error handling for other argument errors
pub fn get_args() -> Cli {
    match Cli::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if e.kind() == ErrorKind::MissingRequiredArgument
                || e.kind() == ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            {
                let _ = Cli::command()
                    .help_template(
                        r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#,
                    )
                    .print_help();
                std::process::exit(1);
            } else {
                e.exit();
            }
        }
    }
}
