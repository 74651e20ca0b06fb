//! Runtime side: resolves queued labels against a loaded `VariantConfig`,
//! materializes the selected variants, and hands the collection to the engine
//! for precompilation.
//!
//! Types:
//!
//! - `WarmUpTarget` is the engine capability: look a shader up by name and
//!   compile a finished collection.
//! - `VariantCollection` is the materialized set submitted to the engine.
//! - `Manager` owns the loaded config, the label lookup, the pending label
//!   set, and an optional filter applied to every decoded variant.
//! - `WarmUpReport` summarises a finished warm-up for diagnostics.
//!
//! A warm-up either submits a complete collection or nothing at all: decode
//! and lookup failures abort before the engine is called, and the pending
//! labels are kept so the caller can retry.
use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};
use variantset::{ErrorKind, VariantConfig, VariantKey};

use crate::decode::{CatalogCursor, DecodeError};

#[derive(Debug, Error)]
#[error("engine failed to compile the variant collection: {0}")]
pub struct CompileError(pub String);

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("no variant config has been loaded")]
    NoConfig,
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("shader '{0}' could not be resolved by the engine")]
    ShaderNotFound(String),
    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl ManagerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoConfig => ErrorKind::Usage,
            Self::Decode(err) => err.kind(),
            Self::ShaderNotFound(_) | Self::Compile(_) => ErrorKind::Environment,
        }
    }
}

pub trait WarmUpTarget {
    type Shader: Clone;

    fn find_shader(&mut self, name: &str) -> Option<Self::Shader>;
    fn compile(&mut self, collection: &VariantCollection<Self::Shader>) -> Result<(), CompileError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct WarmVariant<S> {
    pub shader: S,
    pub key: VariantKey,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantCollection<S> {
    variants: Vec<WarmVariant<S>>,
}

impl<S> Default for VariantCollection<S> {
    fn default() -> Self {
        Self {
            variants: Vec::new(),
        }
    }
}

impl<S> VariantCollection<S> {
    pub fn add(&mut self, shader: S, key: VariantKey) {
        self.variants.push(WarmVariant { shader, key });
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WarmVariant<S>> {
        self.variants.iter()
    }
}

/// Returning `false` drops the variant from the collection.
pub type VariantFilter = Box<dyn FnMut(&VariantKey) -> bool>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarmUpReport {
    pub labels: usize,
    pub variants: usize,
    pub dropped: usize,
    pub shaders_resolved: usize,
    pub elapsed: Duration,
}

#[derive(Default)]
pub struct Manager {
    config: Option<VariantConfig>,
    lookup: HashMap<String, usize>,
    pending: HashSet<String>,
    filter: Option<VariantFilter>,
}

impl Manager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: impl FnMut(&VariantKey) -> bool + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Replaces the loaded config and rebuilds the label lookup.
    pub fn set_config(&mut self, config: VariantConfig) {
        self.lookup = config
            .items()
            .iter()
            .enumerate()
            .map(|(position, item)| (item.key.clone(), position))
            .collect();
        debug!(
            labels = self.lookup.len(),
            variants = config.total_variants(),
            "variant config loaded"
        );
        self.config = Some(config);
    }

    pub fn config(&self) -> Option<&VariantConfig> {
        self.config.as_ref()
    }

    /// Queues `label`; returns `false` when it was already pending. Labels
    /// are not checked against the config until `warm_up`.
    pub fn append_to_warm_up(&mut self, label: impl Into<String>) -> bool {
        self.pending.insert(label.into())
    }

    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    pub fn pending(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.pending.iter().map(String::as_str).collect();
        labels.sort_unstable();
        labels
    }

    /// Compiles the union of every pending label's variants and clears the
    /// pending set. Unknown labels contribute nothing.
    pub fn warm_up<T: WarmUpTarget>(
        &mut self,
        target: &mut T,
    ) -> Result<WarmUpReport, ManagerError> {
        let started = Instant::now();
        let config = self.config.as_ref().ok_or(ManagerError::NoConfig)?;

        let mut selected = BTreeSet::new();
        let mut labels = 0;
        for label in &self.pending {
            let Some(&position) = self.lookup.get(label) else {
                warn!(%label, "label not present in variant config; skipping");
                continue;
            };
            labels += 1;
            selected.extend(config.items()[position].variants.iter().copied());
        }
        let indices: Vec<u32> = selected.into_iter().collect();

        let mut report = materialize_and_compile(config, &indices, self.filter.as_mut(), target)?;
        report.labels = labels;
        report.elapsed = started.elapsed();
        self.pending.clear();

        info!(
            labels = report.labels,
            variants = report.variants,
            dropped = report.dropped,
            shaders = report.shaders_resolved,
            elapsed_ms = report.elapsed.as_secs_f64() * 1000.0,
            "variant warm-up finished"
        );
        Ok(report)
    }

    /// Compiles every variant in `config`, bypassing labels and the pending set.
    pub fn warm_up_all<T: WarmUpTarget>(
        &mut self,
        config: &VariantConfig,
        target: &mut T,
    ) -> Result<WarmUpReport, ManagerError> {
        let started = Instant::now();
        let indices: Vec<u32> = (0..config.total_variants() as u32).collect();

        let mut report = materialize_and_compile(config, &indices, self.filter.as_mut(), target)?;
        report.elapsed = started.elapsed();

        info!(
            variants = report.variants,
            dropped = report.dropped,
            shaders = report.shaders_resolved,
            elapsed_ms = report.elapsed.as_secs_f64() * 1000.0,
            "full variant warm-up finished"
        );
        Ok(report)
    }
}

/// Decodes sorted `indices` into a collection, resolving each shader once per
/// contiguous run of its variants.
pub fn build_collection<T: WarmUpTarget>(
    config: &VariantConfig,
    indices: &[u32],
    mut filter: Option<&mut VariantFilter>,
    target: &mut T,
) -> Result<(VariantCollection<T::Shader>, WarmUpReport), ManagerError> {
    let mut cursor = CatalogCursor::new(config.catalog());
    let mut collection = VariantCollection::default();
    let mut report = WarmUpReport::default();
    let mut current: Option<(usize, T::Shader)> = None;

    for &index in indices {
        let slot = cursor.seek(index)?;
        let shader = match &current {
            Some((group, shader)) if *group == slot.group => shader.clone(),
            _ => {
                let shader = target
                    .find_shader(slot.shader)
                    .ok_or_else(|| ManagerError::ShaderNotFound(slot.shader.to_string()))?;
                report.shaders_resolved += 1;
                current = Some((slot.group, shader.clone()));
                shader
            }
        };

        let key = slot.variant.to_key(slot.shader);
        if let Some(filter) = filter.as_deref_mut() {
            if !filter(&key) {
                report.dropped += 1;
                continue;
            }
        }
        collection.add(shader, key);
    }

    report.variants = collection.len();
    Ok((collection, report))
}

fn materialize_and_compile<T: WarmUpTarget>(
    config: &VariantConfig,
    indices: &[u32],
    filter: Option<&mut VariantFilter>,
    target: &mut T,
) -> Result<WarmUpReport, ManagerError> {
    let (collection, report) = build_collection(config, indices, filter, target)?;
    if collection.is_empty() {
        debug!("no variants selected; skipping engine compile");
        return Ok(report);
    }
    target.compile(&collection)?;
    Ok(report)
}
