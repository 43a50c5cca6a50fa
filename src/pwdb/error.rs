use crate::uid::Uid;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The stage of a database load that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    Tags,
    Fields,
    Items,
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStage::Tags => write!(f, "tag table"),
            LoadStage::Fields => write!(f, "field table"),
            LoadStage::Items => write!(f, "item collection"),
        }
    }
}

#[derive(Error, Debug)]
pub enum PwdbError {
    #[error("Lex error: {0}")]
    Lex(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate name: {0}")]
    DuplicateName(String),

    #[error("Duplicate id: {0}")]
    DuplicateId(Uid),

    #[error("Duplicate identifier: {0} was already issued")]
    DuplicateIdentifier(Uid),

    #[error("Identifier out of range: no id can follow {0}")]
    UidOverflow(Uid),

    #[error("In use: {name} is referenced {count} time(s)")]
    InUse { name: String, count: u64 },

    #[error("Count underflow: {name} has count {count}, cannot subtract {by}")]
    CountUnderflow { name: String, count: u64, by: u64 },

    #[error("Already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("No database loaded")]
    NotLoaded,

    #[error("Invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Decryption failed (wrong password or corrupt data)")]
    Decryption,

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Corrupt database while loading the {stage}: {source}")]
    CorruptDatabase {
        stage: LoadStage,
        #[source]
        source: Box<PwdbError>,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PwdbError {
    pub(crate) fn corrupt(stage: LoadStage, source: PwdbError) -> Self {
        PwdbError::CorruptDatabase {
            stage,
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, PwdbError>;
