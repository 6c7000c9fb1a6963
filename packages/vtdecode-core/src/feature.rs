use geo_types::Geometry;
use serde::Serialize;
use tracing::warn;

use crate::error::DecodeWarning;
use crate::geometry::decode_geometry;
use crate::models::{GeomType, RawFeature};
use crate::projection::TileProjector;
use crate::properties::{Properties, PropertyTable};

// A decoded feature: projected geometry plus resolved properties
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    // Position in the layer's input, which warnings refer to
    pub index: usize,
    pub id: Option<u64>,
    pub geometry: Geometry<f64>,
    pub properties: Properties,
}

/// Result of decoding one feature; `feature` is `None` when it was skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureOutcome {
    pub feature: Option<Feature>,
    pub warnings: Vec<DecodeWarning>,
}

/// Decodes the features of one layer. Holds only shared, read-only state so
/// it can be used from any number of workers at once.
#[derive(Debug, Clone, Copy)]
pub struct FeatureDecoder<'a> {
    table: &'a PropertyTable,
    projector: TileProjector,
}

impl<'a> FeatureDecoder<'a> {
    pub fn new(table: &'a PropertyTable, projector: TileProjector) -> Self {
        FeatureDecoder { table, projector }
    }

    pub fn decode(&self, index: usize, raw: &RawFeature) -> FeatureOutcome {
        let mut warnings = Vec::new();

        let geometry = match decode_geometry(raw.geom_type, &self.projector, index, &raw.geometry, &mut warnings) {
            Some(geometry) => geometry,
            None => {
                let geom_type = match raw.geom_type {
                    GeomType::Unknown(value) => value,
                    _ => -1,
                };
                warn!(feature = index, geom_type, "Skipping feature with unknown geometry type");
                warnings.push(DecodeWarning::UnknownGeometryType {
                    feature: index,
                    geom_type,
                });
                return FeatureOutcome {
                    feature: None,
                    warnings,
                };
            }
        };

        let properties = self.table.resolve(index, &raw.tags, &mut warnings);

        FeatureOutcome {
            feature: Some(Feature {
                index,
                id: raw.id,
                geometry,
                properties,
            }),
            warnings,
        }
    }
}
