use std::sync::Arc;

use geo_types::GeometryCollection;
use rayon::prelude::*;
use rayon::ThreadPool;
use serde::Serialize;
use tracing::debug;

use crate::config::DecoderConfig;
use crate::decode_state::DecodeSlot;
use crate::error::{DecodeError, DecodeWarning, Result};
use crate::feature::{Feature, FeatureDecoder, FeatureOutcome};
use crate::models::{RawLayer, TileCoordinate};
use crate::projection::TileProjector;
use crate::properties::PropertyTable;

// Represents a fully decoded layer with its name and features
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedLayer {
    pub name: String,
    pub extent: u32,
    pub features: Vec<Feature>,
    pub warnings: Vec<DecodeWarning>,
}

impl DecodedLayer {
    /// Geometries of all features, in feature order.
    pub fn to_feature_collection(&self) -> GeometryCollection<f64> {
        self.features.iter().map(|f| f.geometry.clone()).collect()
    }

    /// Warnings raised for the feature at input position `index`.
    ///
    /// Skipped features leave gaps, so look features up by `Feature::index`
    /// rather than by position in `features`.
    pub fn warnings_for(&self, index: usize) -> impl Iterator<Item = &DecodeWarning> {
        self.warnings.iter().filter(move |w| w.feature() == index)
    }

    pub fn feature_at(&self, index: usize) -> Option<&Feature> {
        self.features
            .binary_search_by_key(&index, |f| f.index)
            .ok()
            .map(|pos| &self.features[pos])
    }
}

/// Decodes one layer of a tile, once.
///
/// The first successful result is cached on the decoder and handed out to
/// every later caller.
pub struct LayerDecoder {
    tile: TileCoordinate,
    layer: RawLayer,
    parallel: bool,
    pool: Option<Arc<ThreadPool>>,
    slot: DecodeSlot<DecodedLayer>,
}

impl LayerDecoder {
    // Fans features out on the current rayon pool
    pub fn new(tile: TileCoordinate, layer: RawLayer) -> Self {
        LayerDecoder {
            tile,
            layer,
            parallel: true,
            pool: None,
            slot: DecodeSlot::new(),
        }
    }

    pub fn with_config(tile: TileCoordinate, layer: RawLayer, config: &DecoderConfig) -> Result<Self> {
        let pool = if config.parallel_features {
            Some(Arc::new(config.build_pool("feature")?))
        } else {
            None
        };
        Ok(Self::with_pool(tile, layer, config.parallel_features, pool))
    }

    pub(crate) fn with_pool(
        tile: TileCoordinate,
        layer: RawLayer,
        parallel: bool,
        pool: Option<Arc<ThreadPool>>,
    ) -> Self {
        LayerDecoder {
            tile,
            layer,
            parallel,
            pool,
            slot: DecodeSlot::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.layer.name
    }

    pub fn decode_passes(&self) -> usize {
        self.slot.passes()
    }

    // Result of an earlier successful decode, without triggering one
    pub fn cached(&self) -> Option<Arc<DecodedLayer>> {
        self.slot.get()
    }

    pub fn decode(&self) -> Result<Arc<DecodedLayer>> {
        self.slot.get_or_try_init(|| match (&self.pool, self.parallel) {
            (Some(pool), true) => pool.install(|| self.decode_pass()),
            _ => self.decode_pass(),
        })
    }

    fn decode_pass(&self) -> Result<DecodedLayer> {
        let layer = &self.layer;
        if layer.extent == 0 {
            return Err(DecodeError::InvalidExtent {
                layer: layer.name.clone(),
                extent: layer.extent,
            });
        }

        let table = PropertyTable::build(&layer.name, &layer.keys, &layer.values)?;
        let decoder = FeatureDecoder::new(&table, TileProjector::new(self.tile, layer.extent));

        // Collecting an indexed iterator keeps input order whatever the
        // completion order.
        let outcomes: Vec<FeatureOutcome> = if self.parallel {
            layer
                .features
                .par_iter()
                .enumerate()
                .map(|(index, raw)| decoder.decode(index, raw))
                .collect()
        } else {
            layer
                .features
                .iter()
                .enumerate()
                .map(|(index, raw)| decoder.decode(index, raw))
                .collect()
        };

        let mut features = Vec::with_capacity(outcomes.len());
        let mut warnings = Vec::new();
        for outcome in outcomes {
            warnings.extend(outcome.warnings);
            features.extend(outcome.feature);
        }

        debug!(
            tile = %self.tile.key(),
            layer = %layer.name,
            features = features.len(),
            warnings = warnings.len(),
            "Decoded layer"
        );

        Ok(DecodedLayer {
            name: layer.name.clone(),
            extent: layer.extent,
            features,
            warnings,
        })
    }
}
