//! Page identifier type.

use std::fmt;

use super::config::PAGE_SIZE;

/// Identifies a fixed-size block in a paged file.
///
/// A `u32` addresses 2^32 pages of 4KB each. Row locators reuse this type for
/// their page component.
///
/// # Example
/// ```
/// use rowindexdb::PageId;
///
/// let page_id = PageId::new(2);
/// assert!(page_id.is_valid());
/// assert_eq!(page_id.byte_offset(), 8192);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    /// Sentinel meaning "no page".
    pub const INVALID: PageId = PageId(u32::MAX);

    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// File offset of the first byte of this page.
    #[inline]
    pub fn byte_offset(&self) -> u64 {
        (self.0 as u64) * (PAGE_SIZE as u64)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Page(INVALID)")
        } else {
            write!(f, "Page({})", self.0)
        }
    }
}
