//! Common constants used throughout Genesis.

/// Manifest file at the root of every template repository
pub const MANIFEST_FILE: &str = ".genesis.yml";

/// Supported application configuration file names
pub const CONFIG_FILES: [&str; 2] = ["config.yaml", "config.yml"];

/// Directories searched for a configuration file, in order
pub const CONFIG_DIRS: [&str; 3] = [".", "config", "genesis_config"];

pub const OPEN_MARKER: &str = "{{";
pub const CLOSE_MARKER: &str = "}}";
pub const FILTER_SEPARATOR: char = '|';

/// Prefix of every temporary checkout directory
pub const CHECKOUT_PREFIX: &str = "genesis-";

pub const COMMIT_AUTHOR: &str = "Genesis API";
pub const COMMIT_MESSAGE: &str = "Initial Commit by Genesis API";
pub const WEBHOOK_TITLE: &str = "Jenkins Webhook";
pub const USER_AGENT: &str = "genesis";
