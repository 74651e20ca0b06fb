//! Capture scripts stand in for a live engine session: the baseline lists the
//! variants the engine touches while idle, and each step lists what one
//! representative action touches on top of that.
//!
//! ```toml
//! [baseline]
//! variants = [{ shader = "Hidden/Blit", pass = "normal" }]
//!
//! [[steps]]
//! label = "Cube"
//! mode = "merge"
//! variants = [{ shader = "Lit", pass = "forward", keywords = ["FOG"] }]
//!
//! [[extra]]
//! label = "Fallback"
//! variants = [{ shader = "Unlit", pass = "normal" }]
//! ```
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use recorder::RecordMode;
use serde::Deserialize;
use variantset::VariantKey;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CaptureScript {
    #[serde(default)]
    pub baseline: Baseline,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub extra: Vec<Extra>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Baseline {
    #[serde(default)]
    pub variants: Vec<VariantKey>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub label: String,
    #[serde(default)]
    pub mode: RecordMode,
    #[serde(default)]
    pub settle_ticks: Option<u32>,
    #[serde(default)]
    pub variants: Vec<VariantKey>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Extra {
    pub label: String,
    #[serde(default)]
    pub variants: Vec<VariantKey>,
}

impl CaptureScript {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let script: CaptureScript =
            toml::from_str(input).context("failed to parse capture script")?;
        script.validate()?;
        Ok(script)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read capture script at {}", path.display()))?;
        Self::from_toml_str(&raw)
            .with_context(|| format!("invalid capture script at {}", path.display()))
    }

    fn validate(&self) -> Result<()> {
        for step in &self.steps {
            if step.label.trim().is_empty() {
                bail!("capture steps must have a non-empty label");
            }
        }
        for extra in &self.extra {
            if extra.label.trim().is_empty() {
                bail!("extra entries must have a non-empty label");
            }
        }
        let variants = self
            .baseline
            .variants
            .iter()
            .chain(self.steps.iter().flat_map(|step| step.variants.iter()))
            .chain(self.extra.iter().flat_map(|extra| extra.variants.iter()));
        for variant in variants {
            if variant.shader.trim().is_empty() {
                bail!("variant with pass '{}' has an empty shader name", variant.pass);
            }
            // The capture artifact stores keywords space-separated.
            for keyword in &variant.keywords {
                if keyword.is_empty() || keyword.chars().any(char::is_whitespace) {
                    bail!("variant {variant} has an invalid keyword '{keyword}'");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use variantset::PassKind;

    use super::*;

    #[test]
    fn parses_full_script() {
        let script = CaptureScript::from_toml_str(
            r#"
[baseline]
variants = [{ shader = "Hidden/Blit", pass = "normal" }]

[[steps]]
label = "Cube"
mode = "merge"
settle_ticks = 3
variants = [{ shader = "Lit", pass = "forward", keywords = ["FOG", "SHADOWS"] }]

[[steps]]
label = "Sphere"

[[extra]]
label = "Fallback"
variants = [{ shader = "Unlit", pass = "shadow_caster" }]
"#,
        )
        .expect("parse script");

        assert_eq!(script.baseline.variants.len(), 1);
        assert_eq!(script.steps[0].mode, RecordMode::Merge);
        assert_eq!(script.steps[0].settle_ticks, Some(3));
        assert_eq!(
            script.steps[0].variants[0],
            VariantKey::new("Lit", PassKind::Forward, ["SHADOWS", "FOG"])
        );
        assert_eq!(script.steps[1].mode, RecordMode::Add);
        assert!(script.steps[1].variants.is_empty());
        assert_eq!(script.extra[0].variants[0].pass, PassKind::ShadowCaster);
    }

    #[test]
    fn rejects_blank_labels() {
        let err = CaptureScript::from_toml_str(
            r#"
[[steps]]
label = "  "
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("non-empty label"));
    }

    #[test]
    fn rejects_keywords_the_artifact_cannot_carry() {
        for keywords in [r#"[""]"#, r#"["FOG", "SOFT SHADOWS"]"#, "[\"TAB\\tKEY\"]"] {
            let input = format!(
                r#"
[[steps]]
label = "Cube"
variants = [{{ shader = "Lit", pass = "forward", keywords = {keywords} }}]
"#
            );
            let err = CaptureScript::from_toml_str(&input).unwrap_err();
            assert!(err.to_string().contains("invalid keyword"), "{keywords}: {err}");
        }
    }

    #[test]
    fn rejects_unknown_pass_names() {
        assert!(CaptureScript::from_toml_str(
            r#"
[[steps]]
label = "Cube"
variants = [{ shader = "Lit", pass = "sideways" }]
"#,
        )
        .is_err());
    }
}
