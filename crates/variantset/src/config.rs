//! The exported variant table: a label index plus a shader-grouped catalog,
//! joined only by flattened catalog position.
//!
//! Types:
//!
//! - `VariantConfig` is immutable once built. Construction always goes
//!   through `validate`, whether the table comes from an export or from disk.
//! - `LabelEntry` maps an application label to ascending catalog indices.
//! - `ShaderGroup` and `PassVariant` form the catalog; the flattened position
//!   of a variant is the sum of the preceding group sizes plus its offset.
//! - `ConfigFormat` picks JSON or TOML from a file extension.
//!
//! Functions:
//!
//! - `VariantConfig::load` / `save` move the table to and from disk. Saving
//!   stages the full payload in a temporary file next to the target and
//!   renames it into place, so a failed write never leaves a truncated file.
//! - `VariantConfig::variants_for` decodes a label without any engine
//!   involvement, mostly for tooling and tests.
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::variant::{PassKind, VariantKey};
use crate::ErrorKind;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse variant config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to parse variant config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("failed to encode variant config TOML: {0}")]
    TomlEncode(#[from] toml::ser::Error),
    #[error("invalid variant config: {0}")]
    Invalid(String),
    #[error("variant config I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } => ErrorKind::Environment,
            _ => ErrorKind::Integrity,
        }
    }

    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEntry {
    pub key: String,
    #[serde(default)]
    pub variants: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderGroup {
    pub shader: String,
    pub variants: Vec<PassVariant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassVariant {
    pub pass: PassKind,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl PassVariant {
    pub fn to_key(&self, shader: &str) -> VariantKey {
        VariantKey {
            shader: shader.to_string(),
            pass: self.pass,
            keywords: self.keywords.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantConfig {
    version: u32,
    #[serde(default)]
    items: Vec<LabelEntry>,
    #[serde(default)]
    catalog: Vec<ShaderGroup>,
}

impl VariantConfig {
    pub fn new(items: Vec<LabelEntry>, catalog: Vec<ShaderGroup>) -> Result<Self, ConfigError> {
        let config = Self {
            version: FORMAT_VERSION,
            items,
            catalog,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let raw: VariantConfig = serde_json::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: VariantConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn encode(&self, format: ConfigFormat) -> Result<String, ConfigError> {
        match format {
            ConfigFormat::Json => self.to_json_string(),
            ConfigFormat::Toml => self.to_toml_string(),
        }
    }

    pub fn decode(input: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        match format {
            ConfigFormat::Json => Self::from_json_str(input),
            ConfigFormat::Toml => Self::from_toml_str(input),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|err| ConfigError::io(path, err))?;
        Self::decode(&raw, ConfigFormat::from_path(path))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        self.validate()?;
        let payload = self.encode(ConfigFormat::from_path(path))?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|err| ConfigError::io(dir, err))?;

        let mut staged = NamedTempFile::new_in(dir).map_err(|err| ConfigError::io(dir, err))?;
        staged
            .write_all(payload.as_bytes())
            .map_err(|err| ConfigError::io(staged.path(), err))?;
        staged
            .persist(path)
            .map_err(|err| ConfigError::io(path, err.error))?;
        Ok(())
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn items(&self) -> &[LabelEntry] {
        &self.items
    }

    pub fn catalog(&self) -> &[ShaderGroup] {
        &self.catalog
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.key.as_str())
    }

    /// Items are sorted by key, so lookups binary search.
    pub fn item(&self, key: &str) -> Option<&LabelEntry> {
        self.items
            .binary_search_by(|item| item.key.as_str().cmp(key))
            .ok()
            .map(|idx| &self.items[idx])
    }

    pub fn total_variants(&self) -> usize {
        self.catalog.iter().map(|group| group.variants.len()).sum()
    }

    pub fn variant_at(&self, index: u32) -> Option<VariantKey> {
        let mut offset = index as usize;
        for group in &self.catalog {
            if offset < group.variants.len() {
                return Some(group.variants[offset].to_key(&group.shader));
            }
            offset -= group.variants.len();
        }
        None
    }

    /// Decodes every variant referenced by `label` in catalog order.
    pub fn variants_for(&self, label: &str) -> Option<Vec<VariantKey>> {
        let item = self.item(label)?;
        let mut out = Vec::with_capacity(item.variants.len());
        let mut groups = self.catalog.iter();
        let mut current = groups.next();
        let mut base = 0usize;
        for &index in &item.variants {
            let index = index as usize;
            while let Some(group) = current {
                if index < base + group.variants.len() {
                    break;
                }
                base += group.variants.len();
                current = groups.next();
            }
            let group = current?;
            out.push(group.variants[index - base].to_key(&group.shader));
        }
        Some(out)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != FORMAT_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported variant config version {}; expected {FORMAT_VERSION}",
                self.version
            )));
        }

        let mut seen = HashSet::new();
        for (position, group) in self.catalog.iter().enumerate() {
            if group.shader.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "catalog group {position} has an empty shader name"
                )));
            }
            if group.variants.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "catalog group '{}' declares no variants",
                    group.shader
                )));
            }
            for variant in &group.variants {
                let key = variant.to_key(&group.shader);
                if !seen.insert(key) {
                    return Err(ConfigError::Invalid(format!(
                        "catalog lists variant {} more than once",
                        variant.to_key(&group.shader)
                    )));
                }
            }
        }

        let total = self.total_variants();
        let mut previous_key: Option<&str> = None;
        for item in &self.items {
            if let Some(previous) = previous_key {
                if previous >= item.key.as_str() {
                    return Err(ConfigError::Invalid(format!(
                        "item keys must be unique and sorted; '{}' follows '{previous}'",
                        item.key
                    )));
                }
            }
            previous_key = Some(item.key.as_str());

            let mut previous_index: Option<u32> = None;
            for &index in &item.variants {
                if index as usize >= total {
                    return Err(ConfigError::Invalid(format!(
                        "item '{}' references variant {index} but the catalog holds {total}",
                        item.key
                    )));
                }
                if let Some(previous) = previous_index {
                    if previous >= index {
                        return Err(ConfigError::Invalid(format!(
                            "item '{}' variant indices must be strictly ascending",
                            item.key
                        )));
                    }
                }
                previous_index = Some(index);
            }
        }

        Ok(())
    }
}
