//! Label-driven variant warm-up: turn a set of usage labels into the exact
//! variant collection an engine should precompile.
mod decode;
mod manager;

pub use decode::{CatalogCursor, CatalogSlot, DecodeError};
pub use manager::{
    build_collection, CompileError, Manager, ManagerError, VariantCollection, VariantFilter,
    WarmUpReport, WarmUpTarget, WarmVariant,
};
