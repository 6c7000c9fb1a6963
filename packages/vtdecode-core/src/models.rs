// Input-side data model: layers and features as handed over by a wire parser.
use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, Result};

// Highest zoom for which 2^zoom still fits a u32 tile index
pub const MAX_ZOOM: u8 = 31;

pub const DEFAULT_EXTENT: u32 = 4096;

/// Slippy-map address of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoordinate {
    pub x: u32,
    pub y: u32,
    pub zoom: u8,
}

impl TileCoordinate {
    pub fn new(x: u32, y: u32, zoom: u8) -> Result<Self> {
        let invalid = DecodeError::InvalidTileCoordinate { x, y, zoom };
        if zoom > MAX_ZOOM {
            return Err(invalid);
        }
        let n = 1u64 << zoom;
        if u64::from(x) >= n || u64::from(y) >= n {
            return Err(invalid);
        }
        Ok(TileCoordinate { x, y, zoom })
    }

    // "z/x/y", used to tag log lines
    pub fn key(&self) -> String {
        format!("{}/{}/{}", self.zoom, self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeomType {
    Point,
    LineString,
    Polygon,
    Unknown(i32),
}

impl GeomType {
    pub fn from_wire(value: i32) -> Self {
        match value {
            1 => GeomType::Point,
            2 => GeomType::LineString,
            3 => GeomType::Polygon,
            other => GeomType::Unknown(other),
        }
    }
}

/// A property value record with one optional slot per scalar type.
///
/// Exactly one slot is expected to be set; see `PropertyTable::build`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawValueRecord {
    pub string_value: Option<String>,
    pub float_value: Option<f32>,
    pub double_value: Option<f64>,
    pub int_value: Option<i64>,
    pub uint_value: Option<u64>,
    pub sint_value: Option<i64>,
    pub bool_value: Option<bool>,
}

impl RawValueRecord {
    pub fn string(value: impl Into<String>) -> Self {
        RawValueRecord {
            string_value: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn double(value: f64) -> Self {
        RawValueRecord {
            double_value: Some(value),
            ..Default::default()
        }
    }

    pub fn int(value: i64) -> Self {
        RawValueRecord {
            int_value: Some(value),
            ..Default::default()
        }
    }

    pub fn uint(value: u64) -> Self {
        RawValueRecord {
            uint_value: Some(value),
            ..Default::default()
        }
    }

    pub fn bool(value: bool) -> Self {
        RawValueRecord {
            bool_value: Some(value),
            ..Default::default()
        }
    }

    pub fn populated(&self) -> usize {
        [
            self.string_value.is_some(),
            self.float_value.is_some(),
            self.double_value.is_some(),
            self.int_value.is_some(),
            self.uint_value.is_some(),
            self.sint_value.is_some(),
            self.bool_value.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFeature {
    pub id: Option<u64>,
    pub geom_type: GeomType,
    // alternating key-id, value-id
    pub tags: Vec<u32>,
    pub geometry: Vec<u32>,
}

impl RawFeature {
    pub fn new(geom_type: GeomType, tags: Vec<u32>, geometry: Vec<u32>) -> Self {
        RawFeature {
            id: None,
            geom_type,
            tags,
            geometry,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLayer {
    pub name: String,
    pub extent: u32,
    pub keys: Vec<String>,
    pub values: Vec<RawValueRecord>,
    pub features: Vec<RawFeature>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTile {
    pub layers: Vec<RawLayer>,
}
