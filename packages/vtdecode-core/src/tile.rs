use std::sync::Arc;

use rayon::prelude::*;
use rayon::ThreadPool;
use serde::Serialize;
use tracing::{debug, error};

use crate::config::DecoderConfig;
use crate::decode_state::DecodeSlot;
use crate::error::{DecodeError, Result};
use crate::layer::{DecodedLayer, LayerDecoder};
use crate::models::{RawTile, TileCoordinate};
use crate::mvt_source::decode_payload;

/// A layer that failed to decode and was left out of the tile result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedLayer {
    pub index: usize,
    pub name: String,
    pub error: DecodeError,
}

// Represents a fully decoded tile with all its layers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedTile {
    pub tile: TileCoordinate,
    pub layers: Vec<Arc<DecodedLayer>>,
    pub failed_layers: Vec<FailedLayer>,
}

impl DecodedTile {
    // Layer names need not be unique; the last layer with the name wins.
    pub fn layer(&self, name: &str) -> Option<&DecodedLayer> {
        self.layers.iter().rev().find(|l| l.name == name).map(Arc::as_ref)
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|l| l.name.as_str())
    }
}

/// Decodes every layer of one tile, once.
///
/// Layers fan out on their own pool and features on a second one. A layer
/// job may wait on a layer pass that another caller started; that pass runs
/// on the feature pool, whose workers never wait on a slot.
pub struct TileDecoder {
    tile: TileCoordinate,
    layers: Vec<LayerDecoder>,
    config: DecoderConfig,
    layer_pool: Option<ThreadPool>,
    slot: DecodeSlot<DecodedTile>,
}

impl TileDecoder {
    pub fn new(tile: TileCoordinate, raw: RawTile, config: DecoderConfig) -> Result<Self> {
        let feature_pool = if config.parallel_features {
            Some(Arc::new(config.build_pool("feature")?))
        } else {
            None
        };
        let layer_pool = if config.parallel_layers {
            Some(config.build_pool("layer")?)
        } else {
            None
        };

        let layers = raw
            .layers
            .into_iter()
            .map(|layer| LayerDecoder::with_pool(tile, layer, config.parallel_features, feature_pool.clone()))
            .collect();

        Ok(TileDecoder {
            tile,
            layers,
            config,
            layer_pool,
            slot: DecodeSlot::new(),
        })
    }

    /// Build a decoder straight from a (possibly gzipped) tile payload.
    pub fn from_payload(tile: TileCoordinate, data: &[u8], config: DecoderConfig) -> Result<Self> {
        Self::new(tile, decode_payload(data)?, config)
    }

    pub fn tile(&self) -> TileCoordinate {
        self.tile
    }

    pub fn layers(&self) -> &[LayerDecoder] {
        &self.layers
    }

    pub fn decode_passes(&self) -> usize {
        self.slot.passes()
    }

    pub fn cached(&self) -> Option<Arc<DecodedTile>> {
        self.slot.get()
    }

    pub fn decode(&self) -> Result<Arc<DecodedTile>> {
        self.slot.get_or_try_init(|| self.decode_pass())
    }

    fn decode_pass(&self) -> Result<DecodedTile> {
        let results: Vec<Result<Arc<DecodedLayer>>> = if let Some(pool) = &self.layer_pool {
            pool.install(|| self.layers.par_iter().map(LayerDecoder::decode).collect())
        } else {
            self.layers.iter().map(LayerDecoder::decode).collect()
        };

        let mut layers = Vec::with_capacity(results.len());
        let mut failed_layers = Vec::new();
        for (index, (result, decoder)) in results.into_iter().zip(&self.layers).enumerate() {
            match result {
                Ok(layer) => layers.push(layer),
                Err(err) if self.config.skip_failed_layers => {
                    error!(tile = %self.tile.key(), layer = decoder.name(), error = %err, "Skipping layer that failed to decode");
                    failed_layers.push(FailedLayer {
                        index,
                        name: decoder.name().to_string(),
                        error: err,
                    });
                }
                Err(err) => return Err(err),
            }
        }

        debug!(
            tile = %self.tile.key(),
            layers = layers.len(),
            failed = failed_layers.len(),
            "Decoded tile"
        );

        Ok(DecodedTile {
            tile: self.tile,
            layers,
            failed_layers,
        })
    }
}
