mod config;
mod variant;

pub use config::{
    ConfigError, ConfigFormat, LabelEntry, PassVariant, ShaderGroup, VariantConfig, FORMAT_VERSION,
};
pub use variant::{PassKind, VariantKey};

/// Coarse classification shared by every error type in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller mistake the caller can fix, such as recording a label twice.
    Usage,
    /// Corrupted or incompatible variant data.
    Integrity,
    /// A collaborator outside this workspace failed: filesystem, capture, or engine.
    Environment,
}
