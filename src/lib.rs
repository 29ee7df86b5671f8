//! Genesis materializes new software projects from versioned template
//! repositories. It clones a template source, substitutes `{{key}}`
//! placeholders in file contents and names, and publishes the result as a new
//! repository on BitBucket or GitHub.

/// Command-line interface module for the Genesis application
pub mod cli;

/// Application configuration: provider hosts, credentials and template sources
pub mod config;

pub mod constants;

/// Error types and handling for the Genesis application
pub mod error;

/// Rendering a template from a local working copy
pub mod local;

pub mod logger;

/// `.genesis.yml` manifests and template records
pub mod manifest;

/// In-place rendering of a checked-out template tree
pub mod materializer;

/// The generation pipeline
pub mod orchestrator;

/// REST and git clients for each hosting provider
pub mod provider;

pub mod registry;

pub mod repository;

/// Placeholder substitution over byte buffers
pub mod substitution;

/// Option validation and placeholder tokens
pub mod variable;
