//! Per-type interpretation of a feature's command stream.
//!
//! All three assemblers share one pen cursor per feature, project every
//! visited position and patch over malformed streams with a recorded
//! warning instead of failing.

use geo_types::{Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point};
use tracing::warn;

use crate::commands::{Command, CommandDecoder, CommandError, Cursor, CLOSE_PATH, LINE_TO};
use crate::error::DecodeWarning;
use crate::models::GeomType;
use crate::projection::TileProjector;
use crate::rings::{group_rings, Ring};

/// Decode a geometry of a known type. Unknown types yield `None`.
pub fn decode_geometry(
    geom_type: GeomType,
    projector: &TileProjector,
    feature: usize,
    stream: &[u32],
    warnings: &mut Vec<DecodeWarning>,
) -> Option<Geometry<f64>> {
    match geom_type {
        GeomType::Point => Some(decode_point(projector, feature, stream, warnings)),
        GeomType::LineString => Some(decode_linestring(projector, feature, stream, warnings)),
        GeomType::Polygon => Some(decode_polygon(projector, feature, stream, warnings)),
        GeomType::Unknown(_) => None,
    }
}

// The rest of the stream is dropped; whatever was assembled so far stands.
fn stream_error(feature: usize, err: CommandError, warnings: &mut Vec<DecodeWarning>) {
    warn!(feature, error = %err, "Abandoning remaining geometry of feature");
    warnings.push(match err {
        CommandError::Unknown { command, offset } => DecodeWarning::UnknownCommand {
            feature,
            command,
            offset,
        },
        CommandError::Truncated { offset } => DecodeWarning::TruncatedCommand { feature, offset },
    });
}

pub fn decode_point(
    projector: &TileProjector,
    feature: usize,
    stream: &[u32],
    warnings: &mut Vec<DecodeWarning>,
) -> Geometry<f64> {
    let mut cursor = Cursor::default();
    let mut points = Vec::new();

    for step in CommandDecoder::new(stream) {
        match step {
            Ok(Command::MoveTo { dx, dy }) => {
                let (x, y) = cursor.advance(dx, dy);
                points.push(Point::from(projector.project(x, y)));
            }
            Ok(other) => {
                warn!(feature, command = other.id(), "Unexpected command in Point feature, ignored");
                warnings.push(DecodeWarning::UnexpectedPointCommand {
                    feature,
                    command: other.id(),
                });
            }
            Err(err) => {
                stream_error(feature, err, warnings);
                break;
            }
        }
    }

    if points.len() == 1 {
        Geometry::Point(points[0])
    } else {
        Geometry::MultiPoint(MultiPoint::new(points))
    }
}

pub fn decode_linestring(
    projector: &TileProjector,
    feature: usize,
    stream: &[u32],
    warnings: &mut Vec<DecodeWarning>,
) -> Geometry<f64> {
    let mut cursor = Cursor::default();
    let mut parts: Vec<Vec<Coord<f64>>> = Vec::new();

    for step in CommandDecoder::new(stream) {
        match step {
            Ok(Command::MoveTo { dx, dy }) => {
                let (x, y) = cursor.advance(dx, dy);
                parts.push(vec![projector.project(x, y)]);
            }
            Ok(Command::LineTo { dx, dy }) => {
                let (x, y) = cursor.advance(dx, dy);
                let coord = projector.project(x, y);
                match parts.last_mut() {
                    Some(part) => part.push(coord),
                    None => {
                        warn!(feature, "LineTo before any MoveTo, starting a new line");
                        warnings.push(DecodeWarning::CommandBeforeMoveTo {
                            feature,
                            command: LINE_TO,
                        });
                        parts.push(vec![coord]);
                    }
                }
            }
            Ok(Command::ClosePath) => {
                warn!(feature, "ClosePath in LineString feature, closing the line as a best-effort guess");
                warnings.push(DecodeWarning::ClosePathInLineString { feature });
                if let Some(part) = parts.last_mut() {
                    if let Some(&first) = part.first() {
                        part.push(first);
                    }
                }
            }
            Err(err) => {
                stream_error(feature, err, warnings);
                break;
            }
        }
    }

    if parts.len() == 1 {
        Geometry::LineString(LineString::new(parts.remove(0)))
    } else {
        Geometry::MultiLineString(MultiLineString::new(
            parts.into_iter().map(LineString::new).collect(),
        ))
    }
}

struct RingBuilder {
    ring: Ring,
    opened_by_move: bool,
    closed: bool,
}

impl RingBuilder {
    fn new(opened_by_move: bool) -> Self {
        RingBuilder {
            ring: Ring::default(),
            opened_by_move,
            closed: false,
        }
    }
}

pub fn decode_polygon(
    projector: &TileProjector,
    feature: usize,
    stream: &[u32],
    warnings: &mut Vec<DecodeWarning>,
) -> Geometry<f64> {
    let mut cursor = Cursor::default();
    let mut rings: Vec<RingBuilder> = Vec::new();

    for step in CommandDecoder::new(stream) {
        match step {
            Ok(Command::MoveTo { dx, dy }) => {
                let (x, y) = cursor.advance(dx, dy);
                let mut builder = RingBuilder::new(true);
                builder.ring.push((x, y), projector.project(x, y));
                rings.push(builder);
            }
            Ok(Command::LineTo { dx, dy }) => {
                let (x, y) = cursor.advance(dx, dy);
                if rings.is_empty() {
                    warn!(feature, "LineTo before any MoveTo, starting a new ring");
                    warnings.push(DecodeWarning::CommandBeforeMoveTo {
                        feature,
                        command: LINE_TO,
                    });
                    rings.push(RingBuilder::new(false));
                }
                if let Some(builder) = rings.last_mut() {
                    builder.ring.push((x, y), projector.project(x, y));
                    builder.closed = false;
                }
            }
            Ok(Command::ClosePath) => match rings.last_mut() {
                Some(builder) => {
                    builder.ring.close();
                    builder.closed = true;
                }
                None => {
                    warn!(feature, "ClosePath before any MoveTo, ignored");
                    warnings.push(DecodeWarning::CommandBeforeMoveTo {
                        feature,
                        command: CLOSE_PATH,
                    });
                }
            },
            Err(err) => {
                stream_error(feature, err, warnings);
                break;
            }
        }
    }

    for (index, builder) in rings.iter().enumerate() {
        if !builder.opened_by_move {
            warn!(feature, ring = index, "Polygon ring does not start with MoveTo");
            warnings.push(DecodeWarning::RingMissingMoveTo { feature, ring: index });
        }
        if !builder.closed {
            warn!(feature, ring = index, "Polygon ring does not end with ClosePath");
            warnings.push(DecodeWarning::RingNotClosed { feature, ring: index });
        }
    }

    let rings = rings.into_iter().map(|builder| builder.ring).collect();
    let mut polygons = group_rings(feature, rings, warnings);

    if polygons.len() == 1 {
        Geometry::Polygon(polygons.remove(0))
    } else {
        Geometry::MultiPolygon(MultiPolygon::new(polygons))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{command_integer, zigzag_encode, StreamBuilder};
    use crate::models::TileCoordinate;

    fn projector() -> TileProjector {
        TileProjector::new(TileCoordinate::new(0, 0, 0).unwrap(), 4096)
    }

    fn square(builder: StreamBuilder, x: i64, y: i64, size: i64) -> StreamBuilder {
        builder
            .move_to(&[(x, y)])
            .line_to(&[(x + size, y), (x + size, y + size), (x, y + size)])
            .close()
    }

    fn square_reversed(builder: StreamBuilder, x: i64, y: i64, size: i64) -> StreamBuilder {
        builder
            .move_to(&[(x, y)])
            .line_to(&[(x, y + size), (x + size, y + size), (x + size, y)])
            .close()
    }

    #[test]
    fn test_two_points_make_multipoint() {
        let mut warnings = Vec::new();
        let stream = StreamBuilder::new().move_to(&[(1, 1), (2, 2)]).build();
        let geom = decode_point(&projector(), 0, &stream, &mut warnings);

        match geom {
            Geometry::MultiPoint(points) => {
                assert_eq!(points.0.len(), 2);
                assert_eq!(points.0[1], Point::from(projector().project(2, 2)));
            }
            other => panic!("expected MultiPoint, got {:?}", other),
        }
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_single_point() {
        let mut warnings = Vec::new();
        let stream = StreamBuilder::new().move_to(&[(25, 17)]).build();
        let geom = decode_point(&projector(), 0, &stream, &mut warnings);
        assert_eq!(geom, Geometry::Point(Point::from(projector().project(25, 17))));
    }

    #[test]
    fn test_point_ignores_line_to() {
        let mut warnings = Vec::new();
        let stream = StreamBuilder::new()
            .move_to(&[(1, 1)])
            .line_to(&[(5, 5)])
            .move_to(&[(6, 6)])
            .build();
        let geom = decode_point(&projector(), 2, &stream, &mut warnings);

        // The skipped LineTo leaves the cursor at (1, 1); the second MoveTo
        // delta was encoded relative to (5, 5) and so lands at (2, 2).
        let expected = MultiPoint::new(vec![
            Point::from(projector().project(1, 1)),
            Point::from(projector().project(2, 2)),
        ]);
        assert_eq!(geom, Geometry::MultiPoint(expected));
        assert_eq!(
            warnings,
            vec![DecodeWarning::UnexpectedPointCommand {
                feature: 2,
                command: LINE_TO
            }]
        );
    }

    #[test]
    fn test_linestring_single_part() {
        let mut warnings = Vec::new();
        let stream = StreamBuilder::new()
            .move_to(&[(0, 0)])
            .line_to(&[(10, 0), (10, 10)])
            .build();
        let geom = decode_linestring(&projector(), 0, &stream, &mut warnings);

        let p = projector();
        let expected = LineString::new(vec![p.project(0, 0), p.project(10, 0), p.project(10, 10)]);
        assert_eq!(geom, Geometry::LineString(expected));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_cursor_persists_across_parts() {
        let mut warnings = Vec::new();
        let stream = StreamBuilder::new()
            .move_to(&[(2, 2)])
            .line_to(&[(4, 2)])
            .move_to(&[(10, 10)])
            .line_to(&[(10, 12)])
            .build();
        let geom = decode_linestring(&projector(), 0, &stream, &mut warnings);

        let p = projector();
        let expected = MultiLineString::new(vec![
            LineString::new(vec![p.project(2, 2), p.project(4, 2)]),
            LineString::new(vec![p.project(10, 10), p.project(10, 12)]),
        ]);
        assert_eq!(geom, Geometry::MultiLineString(expected));
    }

    #[test]
    fn test_close_path_in_linestring_closes_part() {
        let mut warnings = Vec::new();
        let stream = StreamBuilder::new()
            .move_to(&[(0, 0)])
            .line_to(&[(8, 0), (8, 8)])
            .close()
            .build();
        let geom = decode_linestring(&projector(), 1, &stream, &mut warnings);

        match geom {
            Geometry::LineString(line) => {
                assert_eq!(line.0.len(), 4);
                assert_eq!(line.0[3], line.0[0]);
            }
            other => panic!("expected LineString, got {:?}", other),
        }
        assert_eq!(warnings, vec![DecodeWarning::ClosePathInLineString { feature: 1 }]);
    }

    #[test]
    fn test_unknown_command_keeps_partial_geometry() {
        let mut warnings = Vec::new();
        let head = StreamBuilder::new().move_to(&[(0, 0)]).line_to(&[(3, 0)]);
        let offset = head.build().len();
        let stream = StreamBuilder::new()
            .move_to(&[(0, 0)])
            .line_to(&[(3, 0)])
            .raw(command_integer(5, 1))
            .line_to(&[(9, 9)])
            .build();

        let geom = decode_linestring(&projector(), 7, &stream, &mut warnings);

        let p = projector();
        assert_eq!(
            geom,
            Geometry::LineString(LineString::new(vec![p.project(0, 0), p.project(3, 0)]))
        );
        assert_eq!(
            warnings,
            vec![DecodeWarning::UnknownCommand {
                feature: 7,
                command: 5,
                offset
            }]
        );
    }

    #[test]
    fn test_truncated_parameters_keep_partial_geometry() {
        let mut warnings = Vec::new();
        let stream = StreamBuilder::new()
            .move_to(&[(0, 0)])
            .line_to(&[(4, 0)])
            .raw(command_integer(LINE_TO, 2))
            .raw(zigzag_encode(1))
            .build();
        let geom = decode_linestring(&projector(), 3, &stream, &mut warnings);

        let p = projector();
        assert_eq!(
            geom,
            Geometry::LineString(LineString::new(vec![p.project(0, 0), p.project(4, 0)]))
        );
        assert_eq!(warnings, vec![DecodeWarning::TruncatedCommand { feature: 3, offset: 7 }]);
    }

    #[test]
    fn test_line_to_before_move_to_opens_part() {
        let mut warnings = Vec::new();
        let stream = StreamBuilder::new().line_to(&[(5, 0), (5, 5)]).build();
        let geom = decode_linestring(&projector(), 0, &stream, &mut warnings);

        let p = projector();
        assert_eq!(
            geom,
            Geometry::LineString(LineString::new(vec![p.project(5, 0), p.project(5, 5)]))
        );
        assert_eq!(
            warnings,
            vec![DecodeWarning::CommandBeforeMoveTo {
                feature: 0,
                command: LINE_TO
            }]
        );
    }

    #[test]
    fn test_close_path_closes_only_current_part() {
        let mut warnings = Vec::new();
        let stream = StreamBuilder::new()
            .move_to(&[(0, 0)])
            .line_to(&[(5, 0)])
            .move_to(&[(10, 10)])
            .line_to(&[(15, 10), (15, 15)])
            .close()
            .build();
        let geom = decode_linestring(&projector(), 4, &stream, &mut warnings);

        let p = projector();
        let expected = MultiLineString::new(vec![
            LineString::new(vec![p.project(0, 0), p.project(5, 0)]),
            LineString::new(vec![
                p.project(10, 10),
                p.project(15, 10),
                p.project(15, 15),
                p.project(10, 10),
            ]),
        ]);
        assert_eq!(geom, Geometry::MultiLineString(expected));
        assert_eq!(warnings, vec![DecodeWarning::ClosePathInLineString { feature: 4 }]);
    }

    #[test]
    fn test_point_ignores_close_path() {
        let mut warnings = Vec::new();
        let stream = StreamBuilder::new()
            .move_to(&[(1, 1)])
            .close()
            .move_to(&[(3, 3)])
            .build();
        let geom = decode_point(&projector(), 0, &stream, &mut warnings);

        let p = projector();
        let expected = MultiPoint::new(vec![Point::from(p.project(1, 1)), Point::from(p.project(3, 3))]);
        assert_eq!(geom, Geometry::MultiPoint(expected));
        assert_eq!(
            warnings,
            vec![DecodeWarning::UnexpectedPointCommand {
                feature: 0,
                command: CLOSE_PATH
            }]
        );
    }

    #[test]
    fn test_polygon_close_path_before_move_to_is_ignored() {
        let mut warnings = Vec::new();
        let stream = square(StreamBuilder::new().close(), 0, 0, 10).build();
        let geom = decode_polygon(&projector(), 2, &stream, &mut warnings);

        match geom {
            Geometry::Polygon(polygon) => {
                assert_eq!(polygon.exterior().0.len(), 5);
                assert_eq!(polygon.exterior().0[0], projector().project(0, 0));
            }
            other => panic!("expected Polygon, got {:?}", other),
        }
        assert_eq!(
            warnings,
            vec![DecodeWarning::CommandBeforeMoveTo {
                feature: 2,
                command: CLOSE_PATH
            }]
        );
    }

    #[test]
    fn test_polygon_with_hole() {
        let mut warnings = Vec::new();
        let stream = square_reversed(square(StreamBuilder::new(), 0, 0, 10), 2, 2, 2).build();
        let geom = decode_polygon(&projector(), 0, &stream, &mut warnings);

        let p = projector();
        match geom {
            Geometry::Polygon(polygon) => {
                assert_eq!(polygon.exterior().0.len(), 5);
                assert_eq!(polygon.exterior().0[0], p.project(0, 0));
                assert_eq!(polygon.exterior().0[4], p.project(0, 0));
                assert_eq!(polygon.interiors().len(), 1);
                assert_eq!(polygon.interiors()[0].0[1], p.project(2, 4));
            }
            other => panic!("expected Polygon, got {:?}", other),
        }
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_two_exteriors_make_multipolygon() {
        let mut warnings = Vec::new();
        let stream = square(square(StreamBuilder::new(), 0, 0, 10), 20, 0, 10).build();
        let geom = decode_polygon(&projector(), 0, &stream, &mut warnings);

        match geom {
            Geometry::MultiPolygon(polygons) => {
                assert_eq!(polygons.0.len(), 2);
                assert_eq!(polygons.0[1].exterior().0[0], projector().project(20, 0));
            }
            other => panic!("expected MultiPolygon, got {:?}", other),
        }
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_leading_interior_ring_is_dropped() {
        let mut warnings = Vec::new();
        let stream = square(square_reversed(StreamBuilder::new(), 0, 0, 10), 20, 0, 10).build();
        let geom = decode_polygon(&projector(), 5, &stream, &mut warnings);

        match geom {
            Geometry::Polygon(polygon) => {
                assert_eq!(polygon.exterior().0[0], projector().project(20, 0));
                assert!(polygon.interiors().is_empty());
            }
            other => panic!("expected Polygon, got {:?}", other),
        }
        assert_eq!(warnings, vec![DecodeWarning::OrphanInteriorRing { feature: 5, ring: 0 }]);
    }

    #[test]
    fn test_unclosed_ring_warns() {
        let mut warnings = Vec::new();
        let stream = StreamBuilder::new()
            .move_to(&[(0, 0)])
            .line_to(&[(10, 0), (10, 10)])
            .build();
        let geom = decode_polygon(&projector(), 0, &stream, &mut warnings);

        assert!(matches!(geom, Geometry::Polygon(_)));
        assert_eq!(warnings, vec![DecodeWarning::RingNotClosed { feature: 0, ring: 0 }]);
    }

    #[test]
    fn test_ring_without_move_to_warns() {
        let mut warnings = Vec::new();
        let stream = StreamBuilder::new()
            .line_to(&[(10, 0), (10, 10), (0, 10)])
            .close()
            .build();
        decode_polygon(&projector(), 0, &stream, &mut warnings);

        assert_eq!(
            warnings,
            vec![
                DecodeWarning::CommandBeforeMoveTo {
                    feature: 0,
                    command: LINE_TO
                },
                DecodeWarning::RingMissingMoveTo { feature: 0, ring: 0 },
            ]
        );
    }

    #[test]
    fn test_empty_streams() {
        let mut warnings = Vec::new();
        let p = projector();
        assert_eq!(
            decode_point(&p, 0, &[], &mut warnings),
            Geometry::MultiPoint(MultiPoint::new(vec![]))
        );
        assert_eq!(
            decode_linestring(&p, 0, &[], &mut warnings),
            Geometry::MultiLineString(MultiLineString::new(vec![]))
        );
        assert_eq!(
            decode_polygon(&p, 0, &[], &mut warnings),
            Geometry::MultiPolygon(MultiPolygon::new(vec![]))
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_unknown_geom_type() {
        let mut warnings = Vec::new();
        let stream = StreamBuilder::new().move_to(&[(1, 1)]).build();
        assert!(decode_geometry(GeomType::Unknown(0), &projector(), 0, &stream, &mut warnings).is_none());
    }
}
