//! Typed keys, their total order, and row locators.

use std::cmp::Ordering;
use std::fmt;

use crate::common::{Error, PageId, Result};

/// Declared type of every key in one index.
///
/// The numeric codes are what the metadata page stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Int,
    /// UTF-8 string of at most `max_len` bytes.
    String { max_len: usize },
    Float,
    Bool,
}

impl KeyType {
    pub const CODE_INT: i32 = 0;
    pub const CODE_STRING: i32 = 1;
    pub const CODE_FLOAT: i32 = 2;
    pub const CODE_BOOL: i32 = 3;

    /// Numeric code persisted in the metadata page.
    pub fn code(&self) -> i32 {
        match self {
            KeyType::Int => Self::CODE_INT,
            KeyType::String { .. } => Self::CODE_STRING,
            KeyType::Float => Self::CODE_FLOAT,
            KeyType::Bool => Self::CODE_BOOL,
        }
    }

    /// Inverse of [`KeyType::code`]. `max_len` only matters for strings.
    pub fn from_code(code: i32, max_len: usize) -> Option<Self> {
        match code {
            Self::CODE_INT => Some(KeyType::Int),
            Self::CODE_STRING => Some(KeyType::String { max_len }),
            Self::CODE_FLOAT => Some(KeyType::Float),
            Self::CODE_BOOL => Some(KeyType::Bool),
            _ => None,
        }
    }

    /// Declared string length, 0 for non-string types.
    pub fn max_len(&self) -> usize {
        match self {
            KeyType::String { max_len } => *max_len,
            _ => 0,
        }
    }

    /// Reject keys of another type, or strings longer than declared.
    pub fn check(&self, key: &Key) -> Result<()> {
        match (self, key) {
            (KeyType::Int, Key::Int(_))
            | (KeyType::Float, Key::Float(_))
            | (KeyType::Bool, Key::Bool(_)) => Ok(()),
            (KeyType::String { max_len }, Key::Str(s)) => {
                if s.len() > *max_len {
                    Err(Error::invalid(format!(
                        "string key of {} bytes exceeds declared length {}",
                        s.len(),
                        max_len
                    )))
                } else {
                    Ok(())
                }
            }
            _ => Err(Error::invalid(format!(
                "expected {} key, got {}",
                self,
                key.type_name()
            ))),
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyType::Int => write!(f, "int"),
            KeyType::String { max_len } => write!(f, "string({})", max_len),
            KeyType::Float => write!(f, "float"),
            KeyType::Bool => write!(f, "bool"),
        }
    }
}

/// A key value.
///
/// Keys compare by their native value: integers numerically, floats by
/// IEEE 754 total order, `false < true`, strings bytewise. Keys of
/// different variants never meet inside one tree; if compared anyway they
/// order by variant so that `Ord` stays total.
#[derive(Debug, Clone)]
pub enum Key {
    Int(i32),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl Key {
    pub fn type_name(&self) -> &'static str {
        match self {
            Key::Int(_) => "int",
            Key::Float(_) => "float",
            Key::Bool(_) => "bool",
            Key::Str(_) => "string",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Key::Int(_) => 0,
            Key::Float(_) => 1,
            Key::Bool(_) => 2,
            Key::Str(_) => 3,
        }
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Key::Int(a), Key::Int(b)) => a.cmp(b),
            (Key::Float(a), Key::Float(b)) => a.total_cmp(b),
            (Key::Bool(a), Key::Bool(b)) => a.cmp(b),
            (Key::Str(a), Key::Str(b)) => a.as_bytes().cmp(b.as_bytes()),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(v) => write!(f, "{}", v),
            Key::Float(v) => write!(f, "{}", v),
            Key::Bool(v) => write!(f, "{}", v),
            Key::Str(v) => write!(f, "{}", v),
        }
    }
}

impl From<i32> for Key {
    fn from(v: i32) -> Self {
        Key::Int(v)
    }
}

impl From<f64> for Key {
    fn from(v: f64) -> Self {
        Key::Float(v)
    }
}

impl From<bool> for Key {
    fn from(v: bool) -> Self {
        Key::Bool(v)
    }
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Key::Str(v.to_string())
    }
}

impl From<String> for Key {
    fn from(v: String) -> Self {
        Key::Str(v)
    }
}

/// Where a row lives: page number plus slot within the page.
///
/// The tree stores and returns locators without interpreting them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowLocator {
    pub page: PageId,
    pub slot: u32,
}

impl RowLocator {
    pub fn new(page: u32, slot: u32) -> Self {
        Self {
            page: PageId::new(page),
            slot,
        }
    }
}

impl fmt::Display for RowLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.page.0, self.slot)
    }
}
