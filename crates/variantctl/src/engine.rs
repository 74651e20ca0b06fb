use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::Path;

use recorder::{CaptureArtifact, CaptureDump, CaptureError};
use variantset::VariantKey;
use warmup::{CompileError, VariantCollection, WarmUpTarget};

/// In-process stand-in for an engine's variant capture. Clearing leaves the
/// idle baseline touched, the same way a running engine immediately
/// re-touches its always-on shaders.
#[derive(Debug, Default)]
pub struct ScriptedDump {
    baseline: Vec<VariantKey>,
    touched: Vec<VariantKey>,
}

impl ScriptedDump {
    pub fn new(baseline: Vec<VariantKey>) -> Self {
        Self {
            touched: baseline.clone(),
            baseline,
        }
    }

    pub fn touch(&mut self, variants: impl IntoIterator<Item = VariantKey>) {
        for variant in variants {
            if !self.touched.iter().any(|known| known.canonical_cmp(&variant).is_eq()) {
                self.touched.push(variant);
            }
        }
    }
}

impl CaptureDump for ScriptedDump {
    fn clear(&mut self) -> Result<(), CaptureError> {
        self.touched = self.baseline.clone();
        Ok(())
    }

    fn save(&mut self, path: &Path) -> Result<(), CaptureError> {
        let artifact = CaptureArtifact::from_variants(&self.touched);
        let payload = serde_json::to_string_pretty(&artifact).map_err(|err| CaptureError::Dump {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        fs::write(path, payload).map_err(|source| CaptureError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Resolves shaders by name and prints collections instead of compiling.
pub struct DryRunEngine<W> {
    known: Option<HashSet<String>>,
    out: W,
}

impl<W: Write> DryRunEngine<W> {
    pub fn new(known: Option<HashSet<String>>, out: W) -> Self {
        Self { known, out }
    }
}

/// Reads a shader list: one name per line, `#` starts a comment line.
pub fn load_shader_list(path: &Path) -> std::io::Result<HashSet<String>> {
    let raw = fs::read_to_string(path)?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

impl<W: Write> WarmUpTarget for DryRunEngine<W> {
    type Shader = String;

    fn find_shader(&mut self, name: &str) -> Option<String> {
        match &self.known {
            Some(known) if !known.contains(name) => None,
            _ => Some(name.to_string()),
        }
    }

    fn compile(&mut self, collection: &VariantCollection<String>) -> Result<(), CompileError> {
        for variant in collection.iter() {
            writeln!(self.out, "{}", variant.key).map_err(|err| CompileError(err.to_string()))?;
        }
        self.out.flush().map_err(|err| CompileError(err.to_string()))
    }
}
