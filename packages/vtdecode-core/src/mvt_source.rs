// Adapter from a wire-decoded Mapbox Vector Tile onto the decoder input model.
use std::io::Read;

use flate2::read::GzDecoder;
use geozero::mvt::{tile, Message, Tile};
use tracing::debug;

use crate::error::{DecodeError, Result};
use crate::models::{GeomType, RawFeature, RawLayer, RawTile, RawValueRecord, DEFAULT_EXTENT};

// Function to detect if data is gzipped (checking for gzip magic number)
pub fn is_gzipped(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0x1F && data[1] == 0x8B
}

fn decompress_gzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| DecodeError::Payload(format!("error decompressing gzip data: {}", e)))?;
    Ok(decompressed)
}

/// Parse a raw tile payload, gunzipping it first when needed.
pub fn decode_payload(data: &[u8]) -> Result<RawTile> {
    let decompressed;
    let bytes = if is_gzipped(data) {
        debug!(bytes = data.len(), "Detected gzipped tile, decompressing");
        decompressed = decompress_gzip(data)?;
        decompressed.as_slice()
    } else {
        data
    };

    let tile = Tile::decode(bytes).map_err(|e| DecodeError::Payload(e.to_string()))?;

    Ok(RawTile::from(tile))
}

impl From<tile::Value> for RawValueRecord {
    fn from(value: tile::Value) -> Self {
        RawValueRecord {
            string_value: value.string_value,
            float_value: value.float_value,
            double_value: value.double_value,
            int_value: value.int_value,
            uint_value: value.uint_value,
            sint_value: value.sint_value,
            bool_value: value.bool_value,
        }
    }
}

impl From<tile::Feature> for RawFeature {
    fn from(feature: tile::Feature) -> Self {
        RawFeature {
            id: feature.id,
            geom_type: GeomType::from_wire(feature.r#type.unwrap_or(0)),
            tags: feature.tags,
            geometry: feature.geometry,
        }
    }
}

impl From<tile::Layer> for RawLayer {
    fn from(layer: tile::Layer) -> Self {
        RawLayer {
            name: layer.name,
            extent: layer.extent.unwrap_or(DEFAULT_EXTENT),
            keys: layer.keys,
            values: layer.values.into_iter().map(RawValueRecord::from).collect(),
            features: layer.features.into_iter().map(RawFeature::from).collect(),
        }
    }
}

impl From<Tile> for RawTile {
    fn from(tile: Tile) -> Self {
        RawTile {
            layers: tile.layers.into_iter().map(RawLayer::from).collect(),
        }
    }
}
