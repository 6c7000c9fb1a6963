//! Decoding of Mapbox Vector Tile layers into longitude/latitude features.
//!
//! A [`TileDecoder`] owns the layers of one tile addressed by a
//! [`TileCoordinate`]. Each layer's geometry command streams are interpreted
//! into geo-types geometries projected with the spherical Web Mercator
//! inverse, polygon rings are split into exteriors and holes by winding, and
//! feature tags are resolved against the layer's property table. Results are
//! computed once per decoder and shared afterwards.

// Error and warning types
pub mod error;
// Decoder configuration
pub mod config;
// Input data model handed over by a wire parser
pub mod models;
// Per-layer key/value table
pub mod properties;
// Geometry command stream decoding
pub mod commands;
// Tile-local to longitude/latitude projection
pub mod projection;
// Ring orientation and polygon grouping
pub mod rings;
// Per-type geometry assembly
pub mod geometry;
// Feature assembly
pub mod feature;
// Decode-once memo slot
mod decode_state;
// Layer and tile orchestration
pub mod layer;
pub mod tile;
// Protobuf/gzip payload adapter
pub mod mvt_source;

pub use config::DecoderConfig;
pub use error::{DecodeError, DecodeWarning, ValueError};
pub use feature::Feature;
pub use layer::{DecodedLayer, LayerDecoder};
pub use models::{GeomType, RawFeature, RawLayer, RawTile, RawValueRecord, TileCoordinate};
pub use projection::{tile_to_lng_lat, TileProjector};
pub use properties::{Properties, RawValue};
pub use tile::{DecodedTile, FailedLayer, TileDecoder};
