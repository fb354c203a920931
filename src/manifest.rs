//! Plugin manifest (plugin.yaml) loading and validation
//!
//! A manifest is decoded leniently (every field optional) so that validation
//! can report all missing required fields at once rather than failing on the
//! first one serde encounters.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, de};

use crate::error::{IndexError, Result};

/// Fixed name of the manifest file at the root of a plugin source tree
pub const MANIFEST_FILE: &str = "plugin.yaml";

/// Validated plugin manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub name: String,
    pub repository: String,
    pub maintainer: String,
    pub summary: String,
    pub output: bool,
    /// Plugin version, not exposed in the catalog
    pub version: Option<String>,
}

/// Manifest as decoded from YAML, before validation. Unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
struct RawManifest {
    name: Option<String>,
    repository: Option<String>,
    maintainer: Option<String>,
    summary: Option<String>,
    #[serde(default, deserialize_with = "yaml11_bool")]
    output: Option<bool>,
    version: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BoolOrWord {
    Bool(bool),
    Word(String),
}

/// Accept the YAML 1.1 boolean words (`yes`, `no`, `on`, `off`, `y`, `n`)
/// alongside YAML 1.2 `true`/`false`
fn yaml11_bool<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(value) = Option::<BoolOrWord>::deserialize(deserializer)? else {
        return Ok(None);
    };
    match value {
        BoolOrWord::Bool(flag) => Ok(Some(flag)),
        BoolOrWord::Word(word) => match word.to_ascii_lowercase().as_str() {
            "yes" | "y" | "on" | "true" => Ok(Some(true)),
            "no" | "n" | "off" | "false" => Ok(Some(false)),
            _ => Err(de::Error::custom(format!("invalid boolean '{word}'"))),
        },
    }
}

impl RawManifest {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn repository(&self) -> Option<&str> {
        self.repository.as_deref()
    }

    fn maintainer(&self) -> Option<&str> {
        self.maintainer.as_deref()
    }

    fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }
}

type FieldAccessor = fn(&RawManifest) -> Option<&str>;

/// Required-field rules applied to every decoded manifest.
///
/// Built once by the caller and passed to [`load_manifest`].
pub struct ManifestValidator {
    required: Vec<(&'static str, FieldAccessor)>,
}

impl Default for ManifestValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestValidator {
    pub fn new() -> Self {
        Self {
            required: vec![
                ("name", RawManifest::name as FieldAccessor),
                ("repository", RawManifest::repository as FieldAccessor),
                ("maintainer", RawManifest::maintainer as FieldAccessor),
                ("summary", RawManifest::summary as FieldAccessor),
            ],
        }
    }

    /// Names of required fields that are absent, null, or blank
    fn violations(&self, raw: &RawManifest) -> Vec<String> {
        self.required
            .iter()
            .filter(|(_, field)| field(raw).is_none_or(|v| v.trim().is_empty()))
            .map(|(name, _)| (*name).to_string())
            .collect()
    }

    fn validate(&self, raw: RawManifest, path: &Path) -> Result<Manifest> {
        let fields = self.violations(&raw);
        if !fields.is_empty() {
            return Err(IndexError::Validation {
                path: path.display().to_string(),
                fields,
            });
        }

        Ok(Manifest {
            name: raw.name.unwrap_or_default(),
            repository: raw.repository.unwrap_or_default(),
            maintainer: raw.maintainer.unwrap_or_default(),
            summary: raw.summary.unwrap_or_default(),
            output: raw.output.unwrap_or(false),
            version: raw.version,
        })
    }
}

/// Decode YAML content, treating an empty document as malformed
pub(crate) fn decode_yaml<T: serde::de::DeserializeOwned>(content: &str, path: &Path) -> Result<T> {
    if content.trim().is_empty() {
        return Err(IndexError::Decode {
            path: path.display().to_string(),
            reason: "file is empty".to_string(),
        });
    }
    serde_yaml::from_str(content).map_err(|e| IndexError::Decode {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Read, decode and validate the manifest inside `dir`
pub fn load_manifest(dir: &Path, validator: &ManifestValidator) -> Result<Manifest> {
    let path = dir.join(MANIFEST_FILE);
    let content = fs::read_to_string(&path).map_err(|e| IndexError::Decode {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let raw: RawManifest = decode_yaml(&content, &path)?;
    validator.validate(raw, &path)
}
