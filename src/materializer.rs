//! Renders a checked-out template tree in place.
//!
//! Every file under the template root has its placeholders substituted, and
//! files and directories whose names embed `{{key}}` are moved to the resolved
//! name. Directory moves are collected while walking and only applied once the
//! walk is over, children before parents, so the walk never visits a path that
//! has already moved.

use log::{debug, info};
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::constants::{CLOSE_MARKER, OPEN_MARKER};
use crate::error::{Error, Result};
use crate::manifest::Template;
use crate::substitution::resolve;
use crate::variable::ValidatedOptions;

/// A directory move decided during the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryAction {
    /// Move the directory to a new name under the same parent.
    Rename { from: PathBuf, to: PathBuf },
    /// Copy the directory into a freshly created nested chain, then delete it.
    Expand { from: PathBuf, to: PathBuf },
}

impl DirectoryAction {
    fn apply(&self) -> Result<()> {
        match self {
            DirectoryAction::Rename { from, to } => {
                debug!("Renaming directory {} to {}", from.display(), to.display());
                fs::rename(from, to).map_err(|e| Error::file("rename directory", from, e))
            }
            DirectoryAction::Expand { from, to } => {
                debug!("Expanding directory {} into {}", from.display(), to.display());
                fs::create_dir_all(to).map_err(|e| Error::file("create directory", to, e))?;
                copy_dir_contents(from, to)?;
                fs::remove_dir_all(from).map_err(|e| Error::file("remove directory", from, e))
            }
        }
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::file("read file", path, e))
}

fn write_file(path: &Path, content: &[u8]) -> Result<()> {
    fs::write(path, content).map_err(|e| Error::file("write file", path, e))
}

fn placeholder(key: &str) -> String {
    format!("{OPEN_MARKER}{key}{CLOSE_MARKER}")
}

/// Replaces every literal `{{key}}` of a present option in a base name.
/// Returns `None` when the name has nothing to replace.
pub fn resolve_name(name: &str, options: &ValidatedOptions) -> Option<String> {
    if !name.contains(OPEN_MARKER) || !name.contains(CLOSE_MARKER) {
        return None;
    }

    let mut resolved = name.to_string();
    for (key, value) in options.iter() {
        resolved = resolved.replace(&placeholder(key), value);
    }
    (resolved != name).then_some(resolved)
}

/// Checks that a resolved name stays a single entry under its parent.
fn plain_name<'a>(name: &'a str, path: &Path) -> Result<&'a str> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(name),
        _ => Err(Error::ConfigError(format!(
            "'{}' resolves to '{}', which is not a plain name",
            path.display(),
            name
        ))),
    }
}

/// Decides what should happen to a directory whose name may embed a key.
///
/// # Errors
/// * `Error::ConfigError` if a value would move the directory out of its parent
pub fn plan_directory(path: &Path, options: &ValidatedOptions) -> Result<Option<DirectoryAction>> {
    let (Some(name), Some(parent)) = (path.file_name().and_then(|name| name.to_str()), path.parent())
    else {
        return Ok(None);
    };

    let exact_key = options.iter().map(|(key, _)| key).find(|key| placeholder(key) == name);
    if let Some(key) = exact_key.filter(|key| options.expands_to_path(key)) {
        let value = options.get(key).unwrap_or_default();
        let mut nested = PathBuf::new();
        for part in value.split('.').filter(|part| !part.is_empty()) {
            nested.push(plain_name(part, path)?);
        }
        if nested.as_os_str().is_empty() {
            return Err(Error::ConfigError(format!(
                "'{}' resolves to '{}', which names no directory",
                path.display(),
                value
            )));
        }
        return Ok(Some(DirectoryAction::Expand { from: path.to_path_buf(), to: parent.join(nested) }));
    }

    let Some(resolved) = resolve_name(name, options) else {
        return Ok(None);
    };
    let to = parent.join(plain_name(&resolved, path)?);
    Ok(Some(DirectoryAction::Rename { from: path.to_path_buf(), to }))
}

/// Substitutes one file's content, then moves it if its name embeds a key.
pub fn render_file(path: &Path, options: &ValidatedOptions) -> Result<()> {
    let content = read_file(path)?;
    let rendered = resolve(&content, options).map_err(|e| Error::RenderError {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;
    if rendered != content {
        write_file(path, &rendered)?;
    }

    let renamed = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| resolve_name(name, options));
    if let Some(new_name) = renamed {
        let target = path.with_file_name(plain_name(&new_name, path)?);
        debug!("Renaming file {} to {}", path.display(), target.display());
        fs::rename(path, &target).map_err(|e| Error::file("rename file", path, e))?;
    }
    Ok(())
}

/// Walks `root`, rendering every file, then applies the deferred directory moves.
pub fn render_dir(root: &Path, options: &ValidatedOptions) -> Result<()> {
    let mut actions = Vec::new();

    // Post-order: a directory is yielded after everything inside it.
    for entry in WalkDir::new(root).contents_first(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            Error::file("walk", path, e.into())
        })?;
        let path = entry.path();

        if entry.file_type().is_dir() {
            if path == root {
                continue;
            }
            if let Some(action) = plan_directory(path, options)? {
                actions.push(action);
            }
        } else if entry.file_type().is_file() {
            render_file(path, options)?;
        } else {
            debug!("Skipping link {}", path.display());
        }
    }

    for action in &actions {
        action.apply()?;
    }
    Ok(())
}

/// Renders `template` inside a checkout.
///
/// # Errors
/// * `Error::RootUndefinedError` if the template has no root
/// * `Error::ConfigError` if the root is not a single directory name
/// * `Error::PathNotFoundError` if the root is not a directory of the checkout
/// * Substitution and I/O errors from the files under the root
pub fn render(checkout_dir: &Path, template: &Template, options: &ValidatedOptions) -> Result<()> {
    let root = checkout_dir.join(template.root()?);
    // A symlinked root could point anywhere on the host.
    let is_dir = fs::symlink_metadata(&root).map(|meta| meta.is_dir()).unwrap_or(false);
    if !is_dir {
        return Err(Error::PathNotFoundError { path: root.display().to_string() });
    }

    info!("Rendering template '{}' in {}", template.name, root.display());
    render_dir(&root, options)
}

/// Recursively copies the contents of `from` into the existing directory `to`.
pub fn copy_dir_contents(from: &Path, to: &Path) -> Result<()> {
    for entry in WalkDir::new(from).min_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(from).to_path_buf();
            Error::file("walk", path, e.into())
        })?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| Error::ConfigError(e.to_string()))?;
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| Error::file("create directory", &target, e))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| Error::file("copy file", entry.path(), e))?;
        }
    }
    Ok(())
}
