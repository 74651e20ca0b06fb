//! Offline recording session: drives clear/settle/read capture cycles,
//! accumulates variants per label, and flattens the result into a
//! `VariantConfig`.
//!
//! A cycle is a small state machine advanced by the caller once per scheduler
//! step:
//!
//! ```text
//! Idle -> Capturing -> Settling { remaining } -> Read -> Idle
//! ```
//!
//! `begin_record` clears the capture buffer and enters `Capturing`; the caller
//! then performs its representative action and calls `schedule_end`, which
//! waits the requested number of `advance` calls before reading. The
//! baseline capture started by `initialize` skips `Capturing` and settles for
//! `SETTLE_TICKS` steps.
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use variantset::{
    ConfigError, ErrorKind, LabelEntry, PassVariant, ShaderGroup, VariantConfig, VariantKey,
};

use crate::capture::{CaptureBuffer, CaptureError};

/// Scheduler steps the baseline capture waits before reading.
pub const SETTLE_TICKS: u32 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordMode {
    #[default]
    Add,
    Override,
    Merge,
}

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("label '{0}' has already been recorded")]
    DuplicateLabel(String),
    #[error("a capture cycle is already in progress ({0})")]
    CycleInProgress(&'static str),
    #[error("no capture cycle has been started")]
    NotCapturing,
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RecorderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateLabel(_) | Self::CycleInProgress(_) | Self::NotCapturing => {
                ErrorKind::Usage
            }
            Self::Capture(err) => err.kind(),
            Self::Config(err) => err.kind(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureTarget {
    Baseline,
    Label { label: String, mode: RecordMode },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Capturing,
    Settling {
        target: CaptureTarget,
        remaining: u32,
    },
    Read(CaptureTarget),
}

impl CycleState {
    fn describe(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Capturing => "capturing",
            Self::Settling { .. } => "settling",
            Self::Read(_) => "reading",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    /// Nothing in flight.
    Idle,
    /// A cycle is waiting for more `advance` calls (or for `schedule_end`).
    Pending,
    /// The cycle finished during this call.
    Completed,
}

pub struct Recorder<C> {
    capture: C,
    recorded: IndexMap<String, Vec<VariantKey>>,
    baseline: Option<Vec<VariantKey>>,
    baseline_set: HashSet<VariantKey>,
    state: CycleState,
}

impl<C: CaptureBuffer> Recorder<C> {
    pub fn new(capture: C) -> Self {
        Self {
            capture,
            recorded: IndexMap::new(),
            baseline: None,
            baseline_set: HashSet::new(),
            state: CycleState::Idle,
        }
    }

    /// Resets the session. With `ignore_defaults` a baseline cycle starts
    /// immediately and completes after `SETTLE_TICKS` calls to `advance`;
    /// everything it captures is filtered out of later recordings.
    pub fn initialize(&mut self, ignore_defaults: bool) -> Result<CycleStatus, RecorderError> {
        self.ensure_idle()?;
        self.recorded.clear();
        self.baseline = None;
        self.baseline_set.clear();

        if !ignore_defaults {
            debug!("recorder initialised without a baseline capture");
            return Ok(CycleStatus::Idle);
        }

        self.capture.clear()?;
        self.state = CycleState::Settling {
            target: CaptureTarget::Baseline,
            remaining: SETTLE_TICKS,
        };
        debug!(ticks = SETTLE_TICKS, "baseline capture started");
        Ok(CycleStatus::Pending)
    }

    pub fn begin_record(&mut self) -> Result<(), RecorderError> {
        self.ensure_idle()?;
        self.capture.clear()?;
        self.state = CycleState::Capturing;
        Ok(())
    }

    /// Finishes the current capture after `settle_ticks` scheduler steps. Zero
    /// ticks reads right away.
    pub fn schedule_end(
        &mut self,
        label: impl Into<String>,
        mode: RecordMode,
        settle_ticks: u32,
    ) -> Result<CycleStatus, RecorderError> {
        match self.state {
            CycleState::Capturing => {}
            CycleState::Idle => return Err(RecorderError::NotCapturing),
            ref other => return Err(RecorderError::CycleInProgress(other.describe())),
        }

        let label = label.into();
        if settle_ticks == 0 {
            self.end_record(label, mode)?;
            return Ok(CycleStatus::Completed);
        }

        self.state = CycleState::Settling {
            target: CaptureTarget::Label { label, mode },
            remaining: settle_ticks,
        };
        Ok(CycleStatus::Pending)
    }

    /// One scheduler step.
    pub fn advance(&mut self) -> Result<CycleStatus, RecorderError> {
        let remaining = match &mut self.state {
            CycleState::Idle => return Ok(CycleStatus::Idle),
            CycleState::Capturing => return Ok(CycleStatus::Pending),
            CycleState::Settling { remaining, .. } => {
                *remaining = remaining.saturating_sub(1);
                *remaining
            }
            CycleState::Read(_) => return Err(RecorderError::CycleInProgress("reading")),
        };
        if remaining > 0 {
            return Ok(CycleStatus::Pending);
        }

        let target = match std::mem::replace(&mut self.state, CycleState::Idle) {
            CycleState::Settling { target, .. } => target,
            _ => return Ok(CycleStatus::Idle),
        };
        self.state = CycleState::Read(target.clone());
        let result = self.complete(target);
        self.state = CycleState::Idle;
        result.map(|()| CycleStatus::Completed)
    }

    /// Reads the capture buffer and files the result under `label`.
    pub fn end_record(
        &mut self,
        label: impl Into<String>,
        mode: RecordMode,
    ) -> Result<(), RecorderError> {
        match self.state {
            CycleState::Idle | CycleState::Capturing | CycleState::Read(_) => {}
            ref other => return Err(RecorderError::CycleInProgress(other.describe())),
        }
        let result = self.complete(CaptureTarget::Label {
            label: label.into(),
            mode,
        });
        self.state = CycleState::Idle;
        result
    }

    /// Injects variants that no capture produced. Keywords are sorted before
    /// storage and the label must be new; an empty list records nothing.
    pub fn add_extra(
        &mut self,
        label: impl Into<String>,
        variants: impl IntoIterator<Item = VariantKey>,
    ) -> Result<(), RecorderError> {
        let label = label.into();
        let mut variants: Vec<VariantKey> = variants.into_iter().collect();
        if variants.is_empty() {
            debug!(%label, "no extra variants supplied; nothing recorded");
            return Ok(());
        }
        for variant in &mut variants {
            variant.normalize_keywords();
        }
        self.store(label, variants, RecordMode::Add)
    }

    /// Builds the canonical table for everything recorded so far.
    pub fn export_config(&self) -> Result<VariantConfig, RecorderError> {
        let mut seen = HashSet::new();
        let mut distinct: Vec<&VariantKey> = Vec::new();
        for variants in self.recorded.values() {
            for variant in variants {
                if seen.insert(variant) {
                    distinct.push(variant);
                }
            }
        }
        distinct.sort_by(|a, b| a.canonical_cmp(b));

        let indices: HashMap<&VariantKey, u32> = distinct
            .iter()
            .enumerate()
            .map(|(index, variant)| (*variant, index as u32))
            .collect();

        let mut items: Vec<LabelEntry> = self
            .recorded
            .iter()
            .map(|(label, variants)| {
                let ids: BTreeSet<u32> = variants.iter().map(|variant| indices[variant]).collect();
                LabelEntry {
                    key: label.clone(),
                    variants: ids.into_iter().collect(),
                }
            })
            .collect();
        items.sort_by(|a, b| a.key.cmp(&b.key));

        let mut catalog: Vec<ShaderGroup> = Vec::new();
        for variant in distinct {
            let entry = PassVariant {
                pass: variant.pass,
                keywords: variant.keywords.clone(),
            };
            match catalog.last_mut() {
                Some(group) if group.shader == variant.shader => group.variants.push(entry),
                _ => catalog.push(ShaderGroup {
                    shader: variant.shader.clone(),
                    variants: vec![entry],
                }),
            }
        }

        Ok(VariantConfig::new(items, catalog)?)
    }

    /// Exports and atomically writes the table to `path`, replacing any
    /// previous file.
    pub fn export(&self, path: impl AsRef<Path>) -> Result<VariantConfig, RecorderError> {
        let path = path.as_ref();
        let config = self.export_config()?;
        config.save(path)?;
        info!(
            path = %path.display(),
            labels = config.items().len(),
            variants = config.total_variants(),
            shaders = config.catalog().len(),
            "exported variant config"
        );
        Ok(config)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.recorded.keys().map(String::as_str)
    }

    pub fn variants(&self, label: &str) -> Option<&[VariantKey]> {
        self.recorded.get(label).map(Vec::as_slice)
    }

    pub fn baseline(&self) -> Option<&[VariantKey]> {
        self.baseline.as_deref()
    }

    pub fn state(&self) -> &CycleState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == CycleState::Idle
    }

    pub fn capture_mut(&mut self) -> &mut C {
        &mut self.capture
    }

    fn ensure_idle(&self) -> Result<(), RecorderError> {
        match self.state {
            CycleState::Idle => Ok(()),
            ref other => Err(RecorderError::CycleInProgress(other.describe())),
        }
    }

    fn complete(&mut self, target: CaptureTarget) -> Result<(), RecorderError> {
        match target {
            CaptureTarget::Baseline => {
                let captured = self.capture.read()?;
                debug!(variants = captured.len(), "baseline capture complete");
                self.baseline_set = captured.iter().cloned().collect();
                self.baseline = Some(captured);
                Ok(())
            }
            CaptureTarget::Label { label, mode } => {
                let captured = self.capture.read()?;
                let total = captured.len();
                let filtered: Vec<VariantKey> = captured
                    .into_iter()
                    .filter(|variant| !self.baseline_set.contains(variant))
                    .collect();
                debug!(
                    %label,
                    ?mode,
                    captured = total,
                    kept = filtered.len(),
                    "capture cycle complete"
                );
                self.store(label, filtered, mode)
            }
        }
    }

    fn store(
        &mut self,
        label: String,
        variants: Vec<VariantKey>,
        mode: RecordMode,
    ) -> Result<(), RecorderError> {
        match mode {
            RecordMode::Add => {
                if self.recorded.contains_key(&label) {
                    return Err(RecorderError::DuplicateLabel(label));
                }
                self.recorded.insert(label, variants);
            }
            RecordMode::Override => {
                self.recorded.insert(label, variants);
            }
            RecordMode::Merge => match self.recorded.get_mut(&label) {
                Some(existing) => {
                    let mut known: HashSet<VariantKey> = existing.iter().cloned().collect();
                    for variant in variants {
                        if known.insert(variant.clone()) {
                            existing.push(variant);
                        }
                    }
                }
                None => {
                    self.recorded.insert(label, variants);
                }
            },
        }
        Ok(())
    }
}
