//! Disk Manager - the paged file layer.
//!
//! The [`DiskManager`] owns one file made of fixed-size blocks and offers:
//! - create / open / close / destroy of the named file
//! - block reads and writes by page number
//! - growth by appending zeroed pages, or up to a minimum page count

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::common::config::{MAX_PAGES, PAGE_SIZE};
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

/// Manages block I/O for a single paged file.
///
/// # File Layout
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │  ...    │ Page N  │
/// │ (4KB)   │ (4KB)   │         │ (4KB)   │
/// └─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096    ...    N×4096
/// ```
///
/// # Thread Safety
/// `DiskManager` is single-threaded. The `BufferPoolManager` serializes
/// access to it behind a mutex.
///
/// # Durability
/// Every write and every file extension is followed by `fsync()`.
pub struct DiskManager {
    file: File,
    path: PathBuf,
    page_count: u32,
}

impl DiskManager {
    /// Create a new, empty paged file.
    ///
    /// # Errors
    /// Returns an I/O error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        debug!(path = %path.display(), "created page file");
        Ok(Self {
            file,
            path: path.to_path_buf(),
            page_count: 0,
        })
    }

    /// Open an existing paged file.
    ///
    /// A trailing partial block is ignored.
    ///
    /// # Errors
    /// Returns an I/O error if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        let file_size = file.metadata()?.len();
        let page_count = (file_size / PAGE_SIZE as u64) as u32;

        debug!(path = %path.display(), page_count, "opened page file");
        Ok(Self {
            file,
            path: path.to_path_buf(),
            page_count,
        })
    }

    /// Open an existing paged file, or create it if missing.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Flush and close the file.
    pub fn close(self) -> Result<()> {
        self.file.sync_all()?;
        debug!(path = %self.path.display(), "closed page file");
        Ok(())
    }

    /// Remove a paged file from disk.
    ///
    /// # Errors
    /// Returns an I/O error (typically `NotFound`) if removal fails.
    pub fn destroy<P: AsRef<Path>>(path: P) -> Result<()> {
        fs::remove_file(path.as_ref())?;
        info!(path = %path.as_ref().display(), "destroyed page file");
        Ok(())
    }

    /// Read a block from disk.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page lies past the end of file.
    pub fn read_page(&mut self, page_id: PageId) -> Result<Page> {
        self.check_bounds(page_id)?;

        self.file.seek(SeekFrom::Start(page_id.byte_offset()))?;
        let mut page = Page::new();
        self.file.read_exact(page.as_mut_slice())?;

        Ok(page)
    }

    /// Write a block to disk.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page hasn't been allocated.
    pub fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        self.check_bounds(page_id)?;

        self.file.seek(SeekFrom::Start(page_id.byte_offset()))?;
        self.file.write_all(page.as_slice())?;
        self.file.sync_all()?;

        Ok(())
    }

    /// Append one zeroed page and return its id.
    pub fn allocate_page(&mut self) -> Result<PageId> {
        if self.page_count as u64 + 1 >= MAX_PAGES {
            return Err(Error::InvalidArgument(format!(
                "page file {} is full",
                self.path.display()
            )));
        }

        let page_id = PageId::new(self.page_count);
        self.file.seek(SeekFrom::Start(page_id.byte_offset()))?;
        self.file.write_all(&[0u8; PAGE_SIZE])?;
        self.file.sync_all()?;

        self.page_count += 1;
        Ok(page_id)
    }

    /// Grow the file with zeroed pages until it holds at least
    /// `min_pages` pages. Never shrinks.
    pub fn ensure_capacity(&mut self, min_pages: u32) -> Result<()> {
        if min_pages <= self.page_count {
            return Ok(());
        }

        let new_len = PageId::new(min_pages).byte_offset();
        self.file.set_len(new_len)?;
        self.file.sync_all()?;

        debug!(from = self.page_count, to = min_pages, "extended page file");
        self.page_count = min_pages;
        Ok(())
    }

    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Total size of the file in bytes.
    #[inline]
    pub fn file_size(&self) -> u64 {
        PageId::new(self.page_count).byte_offset()
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check_bounds(&self, page_id: PageId) -> Result<()> {
        if page_id.0 >= self.page_count {
            return Err(Error::PageNotFound(page_id.0));
        }
        Ok(())
    }
}
