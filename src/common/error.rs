//! Error types for rowindexdb.

use thiserror::Error;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in rowindexdb.
///
/// The first group belongs to the index itself. The second group comes from
/// the storage and buffer layers and is passed up unchanged to whichever
/// index operation triggered it.
#[derive(Debug, Error)]
pub enum Error {
    /// A caller-supplied value is unusable (bad fanout, wrong key type,
    /// oversized string key, rejected duplicate).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The tree has no root, so there is nothing to descend into.
    #[error("Tree is empty")]
    EmptyTree,

    /// No live entry carries the requested key.
    #[error("Key not found")]
    KeyNotFound,

    /// A scan has already produced every entry it was opened over.
    #[error("No more entries")]
    NoMoreEntries,

    /// A node could not be allocated.
    ///
    /// Raised before any visible structure is modified.
    #[error("Allocation failure: {0}")]
    AllocationFailure(String),

    /// A structural check failed.
    ///
    /// This indicates a bug and should never surface in correct operation.
    #[error("Capacity invariant violated: {0}")]
    CapacityInvariantViolation(String),

    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested page does not exist on disk.
    #[error("Page {0} not found")]
    PageNotFound(u32),

    /// Buffer pool has no free frames and every resident page is pinned.
    #[error("No free frames available in buffer pool")]
    NoFreeFrames,

    /// The page is pinned and cannot be dropped from the pool.
    #[error("Page {0} is still pinned")]
    PagePinned(u32),

    /// A page failed validation when it was read back.
    #[error("Page {page_id} corrupted: {reason}")]
    CorruptedPage { page_id: u32, reason: String },
}

impl Error {
    /// Shorthand for an [`Error::InvalidArgument`] with a formatted message.
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Shorthand for an [`Error::CapacityInvariantViolation`].
    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        Error::CapacityInvariantViolation(msg.into())
    }
}
