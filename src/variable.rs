//! Option validation and placeholder token parsing.
//!
//! A template declares its options in the manifest. Before rendering, the
//! caller's raw options are checked against those declarations to produce a
//! [`ValidatedOptions`] map, which is the only thing the substitution engine
//! ever reads values from.

use indexmap::IndexMap;
use log::debug;
use std::collections::HashSet;

use crate::constants::{CLOSE_MARKER, FILTER_SEPARATOR, OPEN_MARKER};
use crate::error::{Error, Result};
use crate::manifest::TemplateOption;

/// A named string transform applied to an option value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Upper,
    Lower,
    Identity,
}

impl Filter {
    /// Selects a filter by name, ignoring case. Unknown names are the identity.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "upper" => Filter::Upper,
            "lower" => Filter::Lower,
            _ => Filter::Identity,
        }
    }

    pub fn apply(&self, value: &str) -> String {
        match self {
            Filter::Upper => value.to_uppercase(),
            Filter::Lower => value.to_lowercase(),
            Filter::Identity => value.to_string(),
        }
    }
}

/// A parsed `{{key | filter ...}}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub key: String,
    pub filters: Vec<Filter>,
}

impl Token {
    /// Parses a complete placeholder, braces included.
    ///
    /// # Errors
    /// * `Error::InvalidPlaceholderError` if the text is not wrapped in `{{` and `}}`
    pub fn parse(raw: &str) -> Result<Self> {
        let inner = raw
            .strip_prefix(OPEN_MARKER)
            .and_then(|rest| rest.strip_suffix(CLOSE_MARKER))
            .ok_or_else(|| Error::InvalidPlaceholderError { token: raw.to_string() })?;

        let mut segments = inner.split(FILTER_SEPARATOR);
        let key = segments.next().unwrap_or_default().trim().to_string();
        let filters = segments.map(Filter::from_name).collect();

        Ok(Self { key, filters })
    }

    /// Runs the filter chain left to right over `value`.
    pub fn apply(&self, value: &str) -> String {
        self.filters
            .iter()
            .fold(value.to_string(), |current, filter| filter.apply(&current))
    }
}

/// Option values accepted for one generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedOptions {
    values: IndexMap<String, String>,
    literal: HashSet<String>,
}

impl ValidatedOptions {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether a directory named exactly `{{key}}` should become a nested
    /// directory chain, one level per dot in the value.
    pub fn expands_to_path(&self, key: &str) -> bool {
        !self.literal.contains(key) && self.get(key).is_some_and(|value| value.contains('.'))
    }
}

impl FromIterator<(String, String)> for ValidatedOptions {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self { values: iter.into_iter().collect(), literal: HashSet::new() }
    }
}

/// Checks raw options against the declared ones.
///
/// Supplied values win, then defaults. A required option with no supplied
/// value is an error even when it has a default. Keys that are not declared
/// are dropped.
///
/// # Errors
/// * `Error::MissingOptionError` naming the first missing required option
pub fn validate_options(
    declared: &[TemplateOption],
    raw: &IndexMap<String, String>,
) -> Result<ValidatedOptions> {
    let mut validated = ValidatedOptions::default();

    for option in declared {
        let value = match raw.get(&option.name) {
            Some(value) => value.clone(),
            None if option.required => {
                return Err(Error::MissingOptionError { name: option.name.clone() })
            }
            None => match option.default.as_deref() {
                Some(default) if !default.is_empty() => default.to_string(),
                _ => {
                    debug!("Option '{}' has no value and no default.", option.name);
                    continue;
                }
            },
        };

        if !option.expand_dots {
            validated.literal.insert(option.name.clone());
        }
        validated.values.insert(option.name.clone(), value);
    }

    for key in raw.keys().filter(|key| !validated.contains_key(key)) {
        debug!("Ignoring undeclared option '{key}'.");
    }

    Ok(validated)
}
