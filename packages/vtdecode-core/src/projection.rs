use std::f64::consts::PI;

use geo_types::Coord;

use crate::models::TileCoordinate;

/// Convert a tile-local position to longitude/latitude.
///
/// Spherical Web Mercator unprojection: the tile's global pixel position is
/// scaled onto 360 degrees and the y axis runs north to south.
pub fn tile_to_lng_lat(tile: TileCoordinate, extent: u32, local_x: i64, local_y: i64) -> (f64, f64) {
    let extent_f = f64::from(extent);

    // Global pixel position at this zoom level
    let global_x = f64::from(tile.x) * extent_f + local_x as f64;
    let global_y = f64::from(tile.y) * extent_f + local_y as f64;
    let world_size = extent_f * 2.0_f64.powi(i32::from(tile.zoom));

    let lng = global_x * 360.0 / world_size - 180.0;

    let lat_mercator = 180.0 - global_y * 360.0 / world_size;
    let lat = 360.0 / PI * (lat_mercator * PI / 180.0).exp().atan() - 90.0;

    (lng, lat)
}

// Binds a tile and layer extent so per-point calls only pass the offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileProjector {
    tile: TileCoordinate,
    extent: u32,
}

impl TileProjector {
    pub fn new(tile: TileCoordinate, extent: u32) -> Self {
        TileProjector { tile, extent }
    }

    #[inline]
    pub fn project(&self, x: i64, y: i64) -> Coord<f64> {
        let (lng, lat) = tile_to_lng_lat(self.tile, self.extent, x, y);
        Coord { x: lng, y: lat }
    }
}
