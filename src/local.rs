//! Local rendering for template authors.
//!
//! Renders a template straight from a working copy without any hosting
//! provider: the working directory is copied to a target directory and the
//! template folder inside the copy is rendered with every setting as an option.

use indexmap::IndexMap;
use log::info;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::CHECKOUT_PREFIX;
use crate::error::{Error, Result};
use crate::materializer;
use crate::variable::ValidatedOptions;

/// Settings file for a local render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LocalSettings {
    /// Template folder, relative to the working directory.
    pub source: String,
    #[serde(default)]
    pub template_name: String,
    #[serde(default)]
    pub settings: IndexMap<String, String>,
}

impl LocalSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|e| Error::file("read settings", path, e))?;
        serde_yaml::from_str(&content)
            .map_err(|source| Error::ManifestError { path: path.to_path_buf(), source })
    }
}

/// Copies `work_dir` into `target` (a new temporary directory when `None`)
/// and renders the copied `settings.source` folder. Returns the target.
///
/// # Errors
/// * `Error::ConfigError` if `source` is empty
/// * `Error::PathNotFoundError` if the source folder does not exist
/// * Substitution and I/O errors from rendering
pub fn render_local(work_dir: &Path, target: Option<&Path>, settings: &LocalSettings) -> Result<PathBuf> {
    if settings.source.trim().is_empty() {
        return Err(Error::ConfigError("settings must name a source folder".to_string()));
    }
    if !work_dir.join(&settings.source).is_dir() {
        return Err(Error::PathNotFoundError {
            path: work_dir.join(&settings.source).display().to_string(),
        });
    }

    let target = match target {
        Some(target) => {
            fs::create_dir_all(target).map_err(|e| Error::file("create directory", target, e))?;
            target.to_path_buf()
        }
        None => tempfile::Builder::new().prefix(CHECKOUT_PREFIX).tempdir()?.keep(),
    };
    info!("Creating project '{}' in {}", settings.template_name, target.display());

    materializer::copy_dir_contents(work_dir, &target)?;

    let options: ValidatedOptions =
        settings.settings.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    materializer::render_dir(&target.join(&settings.source), &options)?;
    Ok(target)
}
