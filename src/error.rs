//! Error handling for Genesis.
//! Defines the error type, its classification into kinds, and the result alias
//! used throughout the crate.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::orchestrator::Stage;

/// Coarse classification of every [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing descriptor, option or configuration fields.
    ConfigurationInvalid,
    /// A template, template source or repository is absent.
    NotFound,
    /// The destination repository is already taken.
    AlreadyExists,
    /// The provider rejected the configured credentials.
    Unauthorized,
    /// Unterminated or unresolved placeholders, or I/O on template files.
    MalformedTemplate,
    /// Network or transport failure while talking to a provider.
    ProviderCommunication,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::ConfigurationInvalid => "configuration-invalid",
            ErrorKind::NotFound => "not-found",
            ErrorKind::AlreadyExists => "already-exists",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::MalformedTemplate => "malformed-template",
            ErrorKind::ProviderCommunication => "provider-communication",
        };
        f.write_str(name)
    }
}

/// Custom error types for Genesis operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}.")]
    ConfigError(String),

    #[error("Invalid request. {name} is a required parameter and was not provided.")]
    MissingOptionError { name: String },

    #[error("Project root is undefined for template '{template}'.")]
    RootUndefinedError { template: String },

    #[error("Unable to find project template with name '{name}'. Valid project names are: [{valid}].")]
    TemplateNotFoundError { name: String, valid: String },

    #[error("Duplicate project template name '{name}' in '{manifest}'.")]
    DuplicateTemplateError { name: String, manifest: String },

    #[error("Unknown template source '{key}'.")]
    SourceNotFoundError { key: String },

    #[error("The repository '{name}' does not exist.")]
    RepositoryNotFoundError { name: String },

    #[error("The path '{path}' does not exist.")]
    PathNotFoundError { path: String },

    #[error("The repository already exists at {url}.")]
    RepositoryExistsError { url: String },

    #[error("Configured {provider} account is not authorized to access {url}.")]
    UnauthorizedError { provider: String, url: String },

    #[error("Malformed template: unterminated placeholder at byte {position}.")]
    UnterminatedPlaceholderError { position: usize },

    #[error("Malformed template: unresolved placeholder for key '{key}'.")]
    UnresolvedPlaceholderError { key: String },

    #[error("Malformed template: '{token}' is not a placeholder, expected {{{{key}}}}.")]
    InvalidPlaceholderError { token: String },

    #[error("Malformed template: placeholder '{key}' expands to itself.")]
    DivergentPlaceholderError { key: String },

    #[error("Failed to render '{path}': {source}")]
    RenderError {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("Unable to {action} '{path}': {source}.")]
    FileError {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse '{path}': {source}.")]
    ManifestError {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Unexpected status {status} from {url}.")]
    UnexpectedStatusError { status: u16, url: String },

    #[error("HTTP error: {0}.")]
    HttpError(#[from] reqwest::Error),

    #[error("Git error: {0}.")]
    Git2Error(#[from] git2::Error),

    #[error("IO error: {0}.")]
    IoError(#[from] io::Error),

    #[error("{stage} failed: {source}")]
    StageError {
        stage: Stage,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wraps a file system failure with the action and path that caused it.
    pub fn file<P: Into<PathBuf>>(action: &'static str, path: P, source: io::Error) -> Self {
        Error::FileError { action, path: path.into(), source }
    }

    /// Attaches pipeline stage context to an error.
    pub fn at(self, stage: Stage) -> Self {
        Error::StageError { stage, source: Box::new(self) }
    }

    /// Classifies this error. Stage wrappers report the kind of their cause.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ConfigError(_)
            | Error::MissingOptionError { .. }
            | Error::RootUndefinedError { .. }
            | Error::DuplicateTemplateError { .. }
            | Error::ManifestError { .. } => ErrorKind::ConfigurationInvalid,
            Error::TemplateNotFoundError { .. }
            | Error::SourceNotFoundError { .. }
            | Error::RepositoryNotFoundError { .. }
            | Error::PathNotFoundError { .. } => ErrorKind::NotFound,
            Error::RepositoryExistsError { .. } => ErrorKind::AlreadyExists,
            Error::UnauthorizedError { .. } => ErrorKind::Unauthorized,
            Error::UnterminatedPlaceholderError { .. }
            | Error::UnresolvedPlaceholderError { .. }
            | Error::InvalidPlaceholderError { .. }
            | Error::DivergentPlaceholderError { .. }
            | Error::FileError { .. }
            | Error::IoError(_) => ErrorKind::MalformedTemplate,
            Error::UnexpectedStatusError { .. } | Error::HttpError(_) | Error::Git2Error(_) => {
                ErrorKind::ProviderCommunication
            }
            Error::StageError { source, .. } | Error::RenderError { source, .. } => source.kind(),
        }
    }

    /// The stage a pipeline error was raised in, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::StageError { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Convenience type alias for Results with Error as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Default error handler that prints the error and exits the program.
pub fn default_error_handler(err: Error) {
    eprintln!("{err}");
    std::process::exit(1);
}
