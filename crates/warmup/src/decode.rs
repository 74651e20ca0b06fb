use thiserror::Error;
use variantset::{ErrorKind, PassVariant, ShaderGroup};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("variant index {index} is outside the catalog ({total} variants)")]
    OutOfRange { index: u32, total: usize },
    #[error("variant indices must be strictly ascending ({previous} followed by {index})")]
    Unsorted { previous: u32, index: u32 },
}

impl DecodeError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Integrity
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CatalogSlot<'a> {
    /// Position of the owning group in the catalog.
    pub group: usize,
    pub shader: &'a str,
    pub variant: &'a PassVariant,
}

/// Forward-only walk over the flattened catalog using cumulative group sizes.
///
/// Indices must arrive strictly ascending; each `seek` skips whole groups
/// until the index falls inside one, so decoding a sorted selection costs
/// O(selected + groups spanned).
#[derive(Debug)]
pub struct CatalogCursor<'a> {
    groups: &'a [ShaderGroup],
    total: usize,
    group: usize,
    base: usize,
    previous: Option<u32>,
}

impl<'a> CatalogCursor<'a> {
    pub fn new(groups: &'a [ShaderGroup]) -> Self {
        Self {
            groups,
            total: groups.iter().map(|group| group.variants.len()).sum(),
            group: 0,
            base: 0,
            previous: None,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn seek(&mut self, index: u32) -> Result<CatalogSlot<'a>, DecodeError> {
        if let Some(previous) = self.previous {
            if index <= previous {
                return Err(DecodeError::Unsorted { previous, index });
            }
        }
        if index as usize >= self.total {
            return Err(DecodeError::OutOfRange {
                index,
                total: self.total,
            });
        }
        self.previous = Some(index);

        let mut offset = index as usize - self.base;
        while let Some(group) = self.groups.get(self.group) {
            if offset < group.variants.len() {
                return Ok(CatalogSlot {
                    group: self.group,
                    shader: &group.shader,
                    variant: &group.variants[offset],
                });
            }
            offset -= group.variants.len();
            self.base += group.variants.len();
            self.group += 1;
        }

        Err(DecodeError::OutOfRange {
            index,
            total: self.total,
        })
    }
}
