//! Capability boundary between the recorder and the engine's live variant
//! capture. The recorder only ever clears the buffer and reads it back; how a
//! particular engine exposes that is an adapter concern.
//!
//! Types:
//!
//! - `CaptureBuffer` is what `Recorder` consumes.
//! - `CaptureDump` is the narrower hook engines usually offer: clear, and
//!   write the current capture to a file.
//! - `ArtifactCapture` turns a `CaptureDump` into a `CaptureBuffer` by
//!   dumping to an intermediate artifact, parsing it, and deleting it again on
//!   every exit path.
//! - `CaptureArtifact` is the on-disk dump layout: shader groups whose
//!   variants carry an integer pass ordinal and one space-separated keyword
//!   string.
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use variantset::{ErrorKind, PassKind, VariantKey};

pub const DEFAULT_ARTIFACT: &str = "__capture.variants.json";

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to clear the capture buffer: {0}")]
    Clear(String),
    #[error("failed to dump the capture buffer to {path}: {reason}")]
    Dump { path: PathBuf, reason: String },
    #[error("failed to read capture artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed capture artifact {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("capture artifact {path} uses unknown pass ordinal {ordinal}")]
    UnknownPass { path: PathBuf, ordinal: u32 },
}

impl CaptureError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Environment
    }
}

pub trait CaptureBuffer {
    fn clear(&mut self) -> Result<(), CaptureError>;
    fn read(&mut self) -> Result<Vec<VariantKey>, CaptureError>;
}

pub trait CaptureDump {
    fn clear(&mut self) -> Result<(), CaptureError>;
    fn save(&mut self, path: &Path) -> Result<(), CaptureError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureArtifact {
    #[serde(default)]
    pub shaders: Vec<CapturedShader>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedShader {
    pub shader: String,
    #[serde(default)]
    pub variants: Vec<CapturedVariant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedVariant {
    pub pass: u32,
    #[serde(default)]
    pub keywords: String,
}

impl CaptureArtifact {
    /// Groups variants by shader in order of first appearance, the way
    /// engines lay out their dumps.
    pub fn from_variants<'a>(variants: impl IntoIterator<Item = &'a VariantKey>) -> Self {
        let mut groups: IndexMap<&str, Vec<CapturedVariant>> = IndexMap::new();
        for variant in variants {
            groups
                .entry(variant.shader.as_str())
                .or_default()
                .push(CapturedVariant {
                    pass: variant.pass.ordinal(),
                    keywords: variant.keyword_string(),
                });
        }
        Self {
            shaders: groups
                .into_iter()
                .map(|(shader, variants)| CapturedShader {
                    shader: shader.to_string(),
                    variants,
                })
                .collect(),
        }
    }

    pub fn into_variants(self, origin: &Path) -> Result<Vec<VariantKey>, CaptureError> {
        let mut out = Vec::new();
        for group in self.shaders {
            for variant in group.variants {
                let pass =
                    PassKind::from_ordinal(variant.pass).ok_or_else(|| CaptureError::UnknownPass {
                        path: origin.to_path_buf(),
                        ordinal: variant.pass,
                    })?;
                out.push(VariantKey {
                    shader: group.shader.clone(),
                    pass,
                    keywords: VariantKey::parse_keywords(&variant.keywords),
                });
            }
        }
        Ok(out)
    }
}

#[derive(Debug)]
pub struct ArtifactCapture<D> {
    dump: D,
    artifact: PathBuf,
}

impl<D: CaptureDump> ArtifactCapture<D> {
    pub fn new(dump: D, artifact: impl Into<PathBuf>) -> Self {
        Self {
            dump,
            artifact: artifact.into(),
        }
    }

    pub fn dump(&self) -> &D {
        &self.dump
    }

    pub fn dump_mut(&mut self) -> &mut D {
        &mut self.dump
    }
}

impl<D: CaptureDump> CaptureBuffer for ArtifactCapture<D> {
    fn clear(&mut self) -> Result<(), CaptureError> {
        self.dump.clear()
    }

    fn read(&mut self) -> Result<Vec<VariantKey>, CaptureError> {
        let _cleanup = ArtifactGuard(&self.artifact);

        self.dump.save(&self.artifact)?;
        let raw = fs::read_to_string(&self.artifact).map_err(|source| CaptureError::Io {
            path: self.artifact.clone(),
            source,
        })?;
        let artifact: CaptureArtifact =
            serde_json::from_str(&raw).map_err(|source| CaptureError::Parse {
                path: self.artifact.clone(),
                source,
            })?;
        let variants = artifact.into_variants(&self.artifact)?;
        debug!(
            artifact = %self.artifact.display(),
            variants = variants.len(),
            "read capture artifact"
        );
        Ok(variants)
    }
}

struct ArtifactGuard<'a>(&'a Path);

impl Drop for ArtifactGuard<'_> {
    fn drop(&mut self) {
        match fs::remove_file(self.0) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(
                    artifact = %self.0.display(),
                    error = %err,
                    "failed to delete capture artifact"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedDump {
        contents: String,
        saves: usize,
    }

    impl CaptureDump for FixedDump {
        fn clear(&mut self) -> Result<(), CaptureError> {
            Ok(())
        }

        fn save(&mut self, path: &Path) -> Result<(), CaptureError> {
            self.saves += 1;
            fs::write(path, &self.contents).map_err(|source| CaptureError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    #[test]
    fn reads_artifact_and_removes_it() {
        let temp = tempfile::tempdir().unwrap();
        let artifact = temp.path().join(DEFAULT_ARTIFACT);
        let dump = FixedDump {
            contents: r#"{
                "shaders": [
                    { "shader": "Lit", "variants": [
                        { "pass": 4, "keywords": "FOG _NORMALMAP" },
                        { "pass": 8, "keywords": "" }
                    ] }
                ]
            }"#
            .into(),
            saves: 0,
        };
        let mut capture = ArtifactCapture::new(dump, &artifact);

        let variants = capture.read().expect("read capture");
        assert_eq!(
            variants,
            vec![
                VariantKey::new("Lit", PassKind::Forward, ["FOG", "_NORMALMAP"]),
                VariantKey::new("Lit", PassKind::ShadowCaster, Vec::<String>::new()),
            ]
        );
        assert!(variants[1].keywords.is_empty());
        assert!(!artifact.exists());
        assert_eq!(capture.dump().saves, 1);
    }

    #[test]
    fn removes_artifact_when_parsing_fails() {
        let temp = tempfile::tempdir().unwrap();
        let artifact = temp.path().join(DEFAULT_ARTIFACT);
        let mut capture = ArtifactCapture::new(
            FixedDump {
                contents: "not json".into(),
                saves: 0,
            },
            &artifact,
        );

        let err = capture.read().unwrap_err();
        assert!(matches!(err, CaptureError::Parse { .. }));
        assert_eq!(err.kind(), ErrorKind::Environment);
        assert!(!artifact.exists());
    }

    #[test]
    fn rejects_unknown_pass_ordinal() {
        let temp = tempfile::tempdir().unwrap();
        let artifact = temp.path().join(DEFAULT_ARTIFACT);
        let mut capture = ArtifactCapture::new(
            FixedDump {
                contents: r#"{ "shaders": [ { "shader": "Lit", "variants": [ { "pass": 3 } ] } ] }"#
                    .into(),
                saves: 0,
            },
            &artifact,
        );

        let err = capture.read().unwrap_err();
        assert!(matches!(err, CaptureError::UnknownPass { ordinal: 3, .. }));
        assert!(!artifact.exists());
    }

    #[test]
    fn groups_variants_by_first_appearance() {
        let variants = [
            VariantKey::new("B", PassKind::Normal, ["X"]),
            VariantKey::new("A", PassKind::Meta, Vec::<String>::new()),
            VariantKey::new("B", PassKind::Forward, ["Y", "Z"]),
        ];
        let artifact = CaptureArtifact::from_variants(&variants);
        assert_eq!(artifact.shaders.len(), 2);
        assert_eq!(artifact.shaders[0].shader, "B");
        assert_eq!(artifact.shaders[0].variants[1].keywords, "Y Z");

        let decoded = artifact.into_variants(Path::new("memory")).unwrap();
        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded[1], variants[2]);
    }
}
