//! Identity of a single compiled program variant and the comparison
//! primitives every other crate leans on for dedup and canonical placement.
//!
//! Types:
//!
//! - `PassKind` enumerates the fixed-function pass classifications a variant
//!   is compiled for, each with a stable ordinal used for ordering and for the
//!   capture artifact encoding.
//! - `VariantKey` pairs a shader name with a pass and the keyword list that
//!   selected the variant.
//!
//! Equality and hashing ignore keyword order, while `VariantKey::canonical_cmp`
//! compares keywords in the order they were captured. The two relations are
//! deliberately not aligned, which is why `VariantKey` implements `Eq`/`Hash`
//! but not `Ord`.
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    Normal,
    Vertex,
    VertexLightmap,
    Forward,
    ForwardAdd,
    LightPrePassBase,
    LightPrePassFinal,
    ShadowCaster,
    Deferred,
    Meta,
    MotionVectors,
    ScriptableRenderPipeline,
    ScriptableRenderPipelineDefaultUnlit,
}

impl PassKind {
    pub const ALL: [PassKind; 13] = [
        PassKind::Normal,
        PassKind::Vertex,
        PassKind::VertexLightmap,
        PassKind::Forward,
        PassKind::ForwardAdd,
        PassKind::LightPrePassBase,
        PassKind::LightPrePassFinal,
        PassKind::ShadowCaster,
        PassKind::Deferred,
        PassKind::Meta,
        PassKind::MotionVectors,
        PassKind::ScriptableRenderPipeline,
        PassKind::ScriptableRenderPipelineDefaultUnlit,
    ];

    /// Engine ordinal of the pass. Gaps are intentional: ordinals 3 and 9 were
    /// retired by the engine and never appear in captures.
    pub fn ordinal(self) -> u32 {
        match self {
            Self::Normal => 0,
            Self::Vertex => 1,
            Self::VertexLightmap => 2,
            Self::Forward => 4,
            Self::ForwardAdd => 5,
            Self::LightPrePassBase => 6,
            Self::LightPrePassFinal => 7,
            Self::ShadowCaster => 8,
            Self::Deferred => 10,
            Self::Meta => 11,
            Self::MotionVectors => 12,
            Self::ScriptableRenderPipeline => 13,
            Self::ScriptableRenderPipelineDefaultUnlit => 14,
        }
    }

    pub fn from_ordinal(ordinal: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|pass| pass.ordinal() == ordinal)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Vertex => "vertex",
            Self::VertexLightmap => "vertex_lightmap",
            Self::Forward => "forward",
            Self::ForwardAdd => "forward_add",
            Self::LightPrePassBase => "light_pre_pass_base",
            Self::LightPrePassFinal => "light_pre_pass_final",
            Self::ShadowCaster => "shadow_caster",
            Self::Deferred => "deferred",
            Self::Meta => "meta",
            Self::MotionVectors => "motion_vectors",
            Self::ScriptableRenderPipeline => "scriptable_render_pipeline",
            Self::ScriptableRenderPipelineDefaultUnlit => {
                "scriptable_render_pipeline_default_unlit"
            }
        }
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantKey {
    pub shader: String,
    pub pass: PassKind,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl VariantKey {
    pub fn new<I, K>(shader: impl Into<String>, pass: PassKind, keywords: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            shader: shader.into(),
            pass,
            keywords: keywords.into_iter().map(Into::into).collect(),
        }
    }

    /// Splits the single space-separated keyword string engines store in
    /// their capture dumps. An empty string means no keywords.
    pub fn parse_keywords(raw: &str) -> Vec<String> {
        if raw.is_empty() {
            return Vec::new();
        }
        raw.split(' ').map(str::to_string).collect()
    }

    pub fn keyword_string(&self) -> String {
        self.keywords.join(" ")
    }

    /// Sorts the keyword list in place.
    pub fn normalize_keywords(&mut self) {
        self.keywords.sort();
    }

    fn sorted_keywords(&self) -> Vec<&str> {
        let mut keywords: Vec<&str> = self.keywords.iter().map(String::as_str).collect();
        keywords.sort_unstable();
        keywords
    }

    /// Canonical placement order: shader name, then pass ordinal, then the
    /// keyword lists element by element in captured order, with a strict
    /// prefix sorting first.
    ///
    /// Not consistent with `==`: two keys that differ only in keyword order
    /// are equal but may compare unequal here.
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.shader
            .cmp(&other.shader)
            .then_with(|| self.pass.ordinal().cmp(&other.pass.ordinal()))
            .then_with(|| self.keywords.cmp(&other.keywords))
    }
}

impl PartialEq for VariantKey {
    fn eq(&self, other: &Self) -> bool {
        self.shader == other.shader
            && self.pass == other.pass
            && self.keywords.len() == other.keywords.len()
            && self.sorted_keywords() == other.sorted_keywords()
    }
}

impl Eq for VariantKey {}

impl Hash for VariantKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.shader.hash(state);
        self.pass.ordinal().hash(state);
        self.sorted_keywords().hash(state);
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/[{}]", self.shader, self.pass, self.keyword_string())
    }
}
