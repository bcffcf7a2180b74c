//! Index metadata page.
//!
//! Page 0 of every index file:
//! ```text
//! Offset  Size  Field
//! 0       5     PageHeader (type = IndexMeta, CRC32)
//! 5       4     key type code  (i32 LE)
//! 9       4     max fanout     (i32 LE)
//! 13      4     key max length (i32 LE, 0 unless string keys)
//! 17      4     duplicate policy (i32 LE, 0 = allow, 1 = reject)
//! ```

use super::key::KeyType;
use crate::common::config::{validate_fanout, DuplicatePolicy};
use crate::common::{Error, PageId, Result};
use crate::storage::page::{Page, PageHeader, PageType};

/// The page holding [`IndexMeta`].
pub const META_PAGE_ID: PageId = PageId(0);

/// What an index file records about its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexMeta {
    pub key_type: KeyType,
    pub fanout: usize,
    pub duplicates: DuplicatePolicy,
}

impl IndexMeta {
    const OFFSET_KEY_TYPE: usize = PageHeader::SIZE;
    const OFFSET_FANOUT: usize = PageHeader::SIZE + 4;
    const OFFSET_KEY_LEN: usize = PageHeader::SIZE + 8;
    const OFFSET_DUPLICATES: usize = PageHeader::SIZE + 12;

    /// Metadata for an index that allows duplicate keys.
    pub fn new(key_type: KeyType, fanout: usize) -> Self {
        Self {
            key_type,
            fanout,
            duplicates: DuplicatePolicy::Allow,
        }
    }

    pub fn with_duplicates(mut self, duplicates: DuplicatePolicy) -> Self {
        self.duplicates = duplicates;
        self
    }

    /// Serialize into `page` and seal it with a fresh checksum.
    pub fn write_to(&self, page: &mut Page) -> Result<()> {
        let fanout = i32::try_from(self.fanout)
            .map_err(|_| Error::invalid(format!("fanout {} does not fit the header", self.fanout)))?;
        let key_len = i32::try_from(self.key_type.max_len()).map_err(|_| {
            Error::invalid(format!(
                "key length {} does not fit the header",
                self.key_type.max_len()
            ))
        })?;

        page.reset();
        page.set_header(&PageHeader::new(PageType::IndexMeta));
        page.write_i32(Self::OFFSET_KEY_TYPE, self.key_type.code());
        page.write_i32(Self::OFFSET_FANOUT, fanout);
        page.write_i32(Self::OFFSET_KEY_LEN, key_len);
        page.write_i32(Self::OFFSET_DUPLICATES, self.duplicates.code());
        page.update_checksum();
        Ok(())
    }

    /// Decode and validate a metadata page.
    ///
    /// # Errors
    /// `Error::CorruptedPage` for a wrong page type, checksum mismatch,
    /// unknown key type or duplicate policy, or a fanout outside the
    /// accepted range.
    pub fn read_from(page: &Page) -> Result<Self> {
        let corrupted = |reason: String| Error::CorruptedPage {
            page_id: META_PAGE_ID.0,
            reason,
        };

        let header = page.header();
        if header.page_type != PageType::IndexMeta {
            return Err(corrupted(format!(
                "expected an index header page, found {:?}",
                header.page_type
            )));
        }
        if !page.verify_checksum() {
            return Err(corrupted("checksum mismatch".into()));
        }

        let code = page.read_i32(Self::OFFSET_KEY_TYPE);
        let raw_fanout = page.read_i32(Self::OFFSET_FANOUT);
        let raw_len = page.read_i32(Self::OFFSET_KEY_LEN);

        let key_len = usize::try_from(raw_len)
            .map_err(|_| corrupted(format!("negative key length {}", raw_len)))?;
        let key_type = KeyType::from_code(code, key_len)
            .ok_or_else(|| corrupted(format!("unknown key type code {}", code)))?;
        if let KeyType::String { max_len: 0 } = key_type {
            return Err(corrupted("string keys with zero length".into()));
        }

        let fanout = usize::try_from(raw_fanout)
            .ok()
            .filter(|&f| validate_fanout(f).is_ok())
            .ok_or_else(|| corrupted(format!("fanout {} out of range", raw_fanout)))?;

        let raw_policy = page.read_i32(Self::OFFSET_DUPLICATES);
        let duplicates = DuplicatePolicy::from_code(raw_policy)
            .ok_or_else(|| corrupted(format!("unknown duplicate policy {}", raw_policy)))?;

        Ok(Self {
            key_type,
            fanout,
            duplicates,
        })
    }
}
