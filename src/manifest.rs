//! Template manifest handling.
//! A template repository describes its templates in a `.genesis.yml` file at
//! its root. This module parses that file and exposes the template records.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path};

use crate::constants::MANIFEST_FILE;
use crate::error::{Error, Result};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub projects: Vec<Template>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub name: String,
    #[serde(default)]
    pub root: String,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub runtime: Runtime,
    #[serde(default, rename = "git", skip_serializing_if = "Option::is_none")]
    pub git_repository: Option<GitRepository>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<TemplateOption>,
    #[serde(default)]
    pub form_groups: Vec<FormGroup>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Language {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Runtime {
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub group_name: String,
    #[serde(default)]
    pub form_field: FormField,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitRepository {
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub name: String,
}

/// A variable declared by a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateOption {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default)]
    pub required: bool,
    /// When false, a dotted value never turns a `{{name}}` directory into a
    /// nested directory chain.
    #[serde(default = "default_true")]
    pub expand_dots: bool,
    #[serde(default)]
    pub group_name: String,
    #[serde(default)]
    pub form_field: FormField,
}

impl Default for TemplateOption {
    fn default() -> Self {
        Self {
            name: String::new(),
            default: None,
            required: false,
            expand_dots: true,
            group_name: String::new(),
            form_field: FormField::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormGroup {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub form_fields: Vec<FormField>,
    #[serde(default)]
    pub image_group: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormField {
    /// Widget name such as `TEXT` or `SELECT`, passed through for display.
    #[serde(rename = "type")]
    pub field_type: String,
    pub label: String,
    pub placeholder: String,
    pub form_control_name: String,
    pub hint: String,
    pub icon: String,
    pub is_checked_by_default: bool,
    pub options_url: String,
    pub select_options: Vec<SelectOption>,
    pub validation: String,
    pub validation_error_message: String,
    pub max_characters: String,
    pub image_buttons: Vec<ImageButton>,
}

impl FormField {
    /// A field with no label, type or hint carries nothing to display.
    pub fn is_empty(&self) -> bool {
        self.label.is_empty() && self.field_type.is_empty() && self.hint.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectOption {
    pub value: String,
    pub display_value: String,
    pub icon_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageButton {
    #[serde(rename = "type")]
    pub button_type: String,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub icon_url: String,
    pub image_url: String,
}

impl Template {
    /// The template's directory relative to the repository root.
    ///
    /// # Errors
    /// * `Error::RootUndefinedError` if the manifest left `root` empty
    /// * `Error::ConfigError` if `root` is anything but a single directory
    ///   name, such as an absolute path or one climbing out with `..`
    pub fn root(&self) -> Result<&str> {
        if self.root.trim().is_empty() {
            return Err(Error::RootUndefinedError { template: self.name.clone() });
        }

        let mut components = Path::new(&self.root).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(&self.root),
            _ => Err(Error::ConfigError(format!(
                "project root '{}' of template '{}' must name a directory at the top of the repository",
                self.root, self.name
            ))),
        }
    }

    pub fn required_options(&self) -> Vec<&TemplateOption> {
        self.options.iter().filter(|option| option.required).collect()
    }

    /// Attaches every option's and the runtime's form field to the group
    /// sharing its group name, then drops fields with nothing to display.
    pub fn organize_groups(&mut self) {
        for group in &mut self.form_groups {
            let display_name = group.display_name.to_lowercase();
            let fields = self
                .options
                .iter()
                .filter(|option| option.group_name.to_lowercase() == display_name)
                .map(|option| option.form_field.clone());
            group.form_fields.extend(fields);

            if self.runtime.group_name.to_lowercase() == display_name {
                group.form_fields.push(self.runtime.form_field.clone());
            }
            group.form_fields.retain(|field| !field.is_empty());
        }
    }
}

impl Manifest {
    /// Parses manifest text.
    ///
    /// # Errors
    /// * `Error::ManifestError` if the YAML is invalid
    /// * `Error::DuplicateTemplateError` if two templates share a name
    pub fn parse(content: &str, origin: &Path) -> Result<Self> {
        let manifest: Manifest = serde_yaml::from_str(content)
            .map_err(|source| Error::ManifestError { path: origin.to_path_buf(), source })?;

        let mut seen = HashSet::new();
        for template in &manifest.projects {
            if !seen.insert(template.name.as_str()) {
                return Err(Error::DuplicateTemplateError {
                    name: template.name.clone(),
                    manifest: origin.display().to_string(),
                });
            }
        }

        Ok(manifest)
    }

    /// Loads `.genesis.yml` from the root of a checkout.
    pub fn load<P: AsRef<Path>>(checkout_dir: P) -> Result<Self> {
        let path = checkout_dir.as_ref().join(MANIFEST_FILE);
        debug!("Loading manifest from {}", path.display());
        let content =
            fs::read_to_string(&path).map_err(|e| Error::file("read manifest", &path, e))?;
        Self::parse(&content, &path)
    }

    pub fn names(&self) -> Vec<&str> {
        self.projects.iter().map(|template| template.name.as_str()).collect()
    }

    /// Finds a template by name.
    ///
    /// # Errors
    /// * `Error::TemplateNotFoundError` listing the valid names
    pub fn template(&self, name: &str) -> Result<&Template> {
        self.projects.iter().find(|template| template.name == name).ok_or_else(|| {
            Error::TemplateNotFoundError { name: name.to_string(), valid: self.names().join(", ") }
        })
    }
}
