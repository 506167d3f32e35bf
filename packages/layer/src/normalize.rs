//! Converts source geometries into renderer shapes.
//!
//! Every coordinate is flipped from the source `x`/`y` (longitude,
//! latitude) order into [`LatLng`]. By default multi-part geometries
//! collapse to their first part and polygon holes are dropped; the
//! collapsed part count is recorded in the shape's details.

use esg_map_layer_models::{LatLng, LayerData};
use geo::{Coord, Geometry, LineString, Polygon};
use serde_json::{Map, Value};

/// Details key recording how many points a `MultiPoint` had.
pub const MULTI_POINT_COUNT: &str = "multiPointCount";
/// Details key recording how many polygons a `MultiPolygon` had.
pub const MULTI_POLYGON_COUNT: &str = "multiPolygonCount";
/// Details key recording how many lines a `MultiLineString` had.
pub const MULTI_LINE_STRING_COUNT: &str = "multiLineStringCount";
/// Details key recording which part of a multi-geometry a shape came from.
pub const PART_INDEX: &str = "partIndex";

/// Normalization switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Emit every part of a multi-geometry instead of only the first.
    pub expand_multipart: bool,
}

/// One renderer shape plus the counters it contributes to the layer
/// details.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedShape {
    /// Geometry payload.
    pub data: LayerData,
    /// Pipeline-injected details.
    pub details: Map<String, Value>,
}

impl NormalizedShape {
    fn new(data: LayerData) -> Self {
        Self {
            data,
            details: Map::new(),
        }
    }
}

/// Converts a geometry into renderer shapes.
///
/// Returns `None` for kinds with no renderer shape (geometry collections,
/// rectangles, triangles, bare line segments). Returns an empty vector when
/// the kind is supported but carries no coordinates.
#[must_use]
pub fn convert_geometry(
    geometry: &Geometry<f64>,
    options: NormalizeOptions,
) -> Option<Vec<NormalizedShape>> {
    let shapes = match geometry {
        Geometry::Point(point) => vec![NormalizedShape::new(LayerData::Marker(to_lat_lng(
            point.0,
        )))],
        Geometry::MultiPoint(points) => collect_parts(
            points.0.iter().map(|point| Some(LayerData::Marker(to_lat_lng(point.0)))),
            MULTI_POINT_COUNT,
            options,
        ),
        Geometry::Polygon(polygon) => polygon_ring(polygon)
            .map(|ring| vec![NormalizedShape::new(ring)])
            .unwrap_or_default(),
        Geometry::MultiPolygon(polygons) => collect_parts(
            polygons.0.iter().map(polygon_ring),
            MULTI_POLYGON_COUNT,
            options,
        ),
        Geometry::LineString(line) => path(line)
            .map(|path| vec![NormalizedShape::new(path)])
            .unwrap_or_default(),
        Geometry::MultiLineString(lines) => {
            collect_parts(lines.0.iter().map(path), MULTI_LINE_STRING_COUNT, options)
        }
        _ => return None,
    };

    Some(shapes)
}

/// Short name of a geometry kind, for log messages.
#[must_use]
pub const fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// Turns the parts of a multi-geometry into shapes.
///
/// Collapsed mode keeps only the first part; expanded mode keeps every
/// non-empty part and tags it with its index. Either way the total part
/// count is recorded under `count_key`.
fn collect_parts(
    parts: impl ExactSizeIterator<Item = Option<LayerData>>,
    count_key: &str,
    options: NormalizeOptions,
) -> Vec<NormalizedShape> {
    let count = parts.len();

    let shapes: Vec<NormalizedShape> = if options.expand_multipart {
        parts
            .enumerate()
            .filter_map(|(index, data)| {
                let mut shape = NormalizedShape::new(data?);
                shape.details.insert(PART_INDEX.to_string(), Value::from(index));
                Some(shape)
            })
            .collect()
    } else {
        parts
            .take(1)
            .flatten()
            .map(NormalizedShape::new)
            .collect()
    };

    shapes
        .into_iter()
        .map(|mut shape| {
            shape.details.insert(count_key.to_string(), Value::from(count));
            shape
        })
        .collect()
}

/// Exterior ring of a polygon. Interior rings are dropped.
fn polygon_ring(polygon: &Polygon<f64>) -> Option<LayerData> {
    let ring = coords(polygon.exterior());
    (!ring.is_empty()).then_some(LayerData::Polygon(ring))
}

fn path(line: &LineString<f64>) -> Option<LayerData> {
    let points = coords(line);
    (!points.is_empty()).then_some(LayerData::Polyline(points))
}

fn coords(line: &LineString<f64>) -> Vec<LatLng> {
    line.0.iter().copied().map(to_lat_lng).collect()
}

/// Source coordinates are `x = longitude`, `y = latitude`.
const fn to_lat_lng(coord: Coord<f64>) -> LatLng {
    LatLng::new(coord.y, coord.x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use esg_map_layer_models::LayerType;
    use geo::{MultiLineString, MultiPoint, MultiPolygon, Point, line_string, polygon};

    fn square(offset: f64) -> Polygon<f64> {
        polygon![
            (x: -44.0 + offset, y: -2.0),
            (x: -43.0 + offset, y: -2.0),
            (x: -43.0 + offset, y: -3.0),
            (x: -44.0 + offset, y: -2.0),
        ]
    }

    fn convert(geometry: Geometry<f64>) -> Vec<NormalizedShape> {
        convert_geometry(&geometry, NormalizeOptions::default()).unwrap()
    }

    #[test]
    fn point_becomes_marker_with_flipped_order() {
        let shapes = convert(Geometry::Point(Point::new(-44.37, -2.58)));
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].data, LayerData::Marker(LatLng::new(-2.58, -44.37)));
    }

    #[test]
    fn polygon_keeps_exterior_ring_in_lat_lng_order() {
        let with_hole = Polygon::new(
            square(0.0).exterior().clone(),
            vec![line_string![(x: -43.5, y: -2.2), (x: -43.4, y: -2.2), (x: -43.5, y: -2.2)]],
        );
        let shapes = convert(Geometry::Polygon(with_hole));
        assert_eq!(shapes.len(), 1);
        let LayerData::Polygon(ring) = &shapes[0].data else {
            panic!("expected a polygon");
        };
        assert_eq!(ring.len(), 4);
        assert_eq!(ring[0], LatLng::new(-2.0, -44.0));
        assert_eq!(ring[2], LatLng::new(-3.0, -43.0));
    }

    #[test]
    fn line_string_keeps_full_path() {
        let line = line_string![(x: 10.0, y: 1.0), (x: 11.0, y: 2.0), (x: 12.0, y: 3.0)];
        let shapes = convert(Geometry::LineString(line));
        assert_eq!(
            shapes[0].data,
            LayerData::Polyline(vec![
                LatLng::new(1.0, 10.0),
                LatLng::new(2.0, 11.0),
                LatLng::new(3.0, 12.0),
            ])
        );
    }

    #[test]
    fn multi_polygon_collapses_to_first_ring_of_first_polygon() {
        let multi = MultiPolygon(vec![square(0.0), square(5.0), square(10.0)]);
        let shapes = convert(Geometry::MultiPolygon(multi));
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].data.layer_type(), LayerType::Polygon);
        assert_eq!(shapes[0].data.coordinates()[0], LatLng::new(-2.0, -44.0));
        assert_eq!(shapes[0].details[MULTI_POLYGON_COUNT], 3);
    }

    #[test]
    fn multi_point_keeps_first_point_and_count() {
        let multi = MultiPoint(vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)]);
        let shapes = convert(Geometry::MultiPoint(multi));
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].data, LayerData::Marker(LatLng::new(2.0, 1.0)));
        assert_eq!(shapes[0].details[MULTI_POINT_COUNT], 2);
    }

    #[test]
    fn multi_line_string_keeps_first_line_and_count() {
        let multi = MultiLineString(vec![
            line_string![(x: 0.0, y: 1.0), (x: 0.0, y: 2.0)],
            line_string![(x: 5.0, y: 1.0), (x: 5.0, y: 2.0)],
        ]);
        let shapes = convert(Geometry::MultiLineString(multi));
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].data.coordinates()[1], LatLng::new(2.0, 0.0));
        assert_eq!(shapes[0].details[MULTI_LINE_STRING_COUNT], 2);
    }

    #[test]
    fn expanded_multi_polygon_emits_every_part() {
        let multi = MultiPolygon(vec![square(0.0), square(5.0), square(10.0)]);
        let shapes = convert_geometry(
            &Geometry::MultiPolygon(multi),
            NormalizeOptions {
                expand_multipart: true,
            },
        )
        .unwrap();
        assert_eq!(shapes.len(), 3);
        for (index, shape) in shapes.iter().enumerate() {
            assert_eq!(shape.details[PART_INDEX], index);
            assert_eq!(shape.details[MULTI_POLYGON_COUNT], 3);
        }
        assert_eq!(shapes[2].data.coordinates()[0], LatLng::new(-2.0, -34.0));
    }

    #[test]
    fn empty_multi_geometry_yields_nothing() {
        let shapes = convert(Geometry::MultiPoint(MultiPoint(Vec::new())));
        assert!(shapes.is_empty());
    }

    #[test]
    fn geometry_collection_is_unsupported() {
        let collection = Geometry::GeometryCollection(geo::GeometryCollection(vec![
            Geometry::Point(Point::new(1.0, 2.0)),
        ]));
        assert!(convert_geometry(&collection, NormalizeOptions::default()).is_none());
        assert_eq!(geometry_kind(&collection), "GeometryCollection");
    }
}
