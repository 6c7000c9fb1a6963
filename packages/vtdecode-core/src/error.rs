use serde::Serialize;
use thiserror::Error;

/// Failures that abort a whole decode unit (a layer or a tile).
#[derive(Debug, Clone, Error, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DecodeError {
    #[error("layer '{layer}' is malformed: {reason}")]
    MalformedLayer { layer: String, reason: ValueError },

    #[error("layer '{layer}' has invalid extent {extent}")]
    InvalidExtent { layer: String, extent: u32 },

    #[error("tile coordinate {zoom}/{x}/{y} is out of range")]
    InvalidTileCoordinate { x: u32, y: u32, zoom: u8 },

    #[error("failed to decode tile payload: {0}")]
    Payload(String),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}

// Property value records are referenced by position, so a bad one poisons the layer.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueError {
    #[error("value {index} has {populated} populated fields, expected exactly one")]
    MalformedValue { index: usize, populated: usize },
}

/// Recoverable conditions hit while decoding one feature.
///
/// Each one is logged when it happens and kept on the decoded layer so
/// callers can inspect what was patched over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodeWarning {
    UnexpectedPointCommand { feature: usize, command: u32 },
    ClosePathInLineString { feature: usize },
    CommandBeforeMoveTo { feature: usize, command: u32 },
    RingMissingMoveTo { feature: usize, ring: usize },
    RingNotClosed { feature: usize, ring: usize },
    OrphanInteriorRing { feature: usize, ring: usize },
    UnknownCommand { feature: usize, command: u32, offset: usize },
    TruncatedCommand { feature: usize, offset: usize },
    OddTagCount { feature: usize, len: usize },
    TagOutOfRange { feature: usize, key: u32, value: u32 },
    UnknownGeometryType { feature: usize, geom_type: i32 },
}

impl DecodeWarning {
    pub fn feature(&self) -> usize {
        match *self {
            DecodeWarning::UnexpectedPointCommand { feature, .. }
            | DecodeWarning::ClosePathInLineString { feature }
            | DecodeWarning::CommandBeforeMoveTo { feature, .. }
            | DecodeWarning::RingMissingMoveTo { feature, .. }
            | DecodeWarning::RingNotClosed { feature, .. }
            | DecodeWarning::OrphanInteriorRing { feature, .. }
            | DecodeWarning::UnknownCommand { feature, .. }
            | DecodeWarning::TruncatedCommand { feature, .. }
            | DecodeWarning::OddTagCount { feature, .. }
            | DecodeWarning::TagOutOfRange { feature, .. }
            | DecodeWarning::UnknownGeometryType { feature, .. } => feature,
        }
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;
