//! KML adapter.
//!
//! Parses the document with the `kml` crate and emits one feature per
//! `Placemark`, walking nested `Document` and `Folder` containers. The
//! placemark `name`, `description`, and `ExtendedData` entries become
//! feature properties.

use geo::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use kml::Kml;
use kml::types::{Element, Geometry as KmlGeometry, LinearRing, Placemark};
use serde_json::{Map, Value};

use super::{FeatureCollection, SourceFeature};
use crate::ImportError;

/// Parses a KML document into a feature collection.
///
/// # Errors
///
/// Returns [`ImportError::MalformedInput`] if the XML cannot be parsed.
pub fn read_kml(text: &str) -> Result<FeatureCollection, ImportError> {
    let document: Kml = text.parse().map_err(|e: kml::Error| ImportError::MalformedInput {
        format: "KML",
        message: e.to_string(),
    })?;

    let mut features = Vec::new();
    collect_placemarks(&document, None, &mut features);

    log::debug!("KML: found {} placemarks", features.len());

    Ok(FeatureCollection::new(features))
}

/// Walks containers depth-first. `folder` is the `/`-joined path of the
/// named folders enclosing `node`.
fn collect_placemarks(node: &Kml, folder: Option<&str>, features: &mut Vec<SourceFeature>) {
    match node {
        Kml::KmlDocument(document) => {
            for element in &document.elements {
                collect_placemarks(element, folder, features);
            }
        }
        Kml::Document { elements, .. } => {
            for element in elements {
                collect_placemarks(element, folder, features);
            }
        }
        Kml::Folder { attrs, elements } => {
            let path = match (folder, folder_name(attrs, elements)) {
                (Some(parent), Some(name)) if !name.is_empty() => Some(format!("{parent}/{name}")),
                (None, Some(name)) if !name.is_empty() => Some(name.to_string()),
                (parent, _) => parent.map(str::to_string),
            };
            for element in elements {
                collect_placemarks(element, path.as_deref(), features);
            }
        }
        Kml::Placemark(placemark) => features.push(placemark_feature(placemark, folder)),
        _ => {}
    }
}

/// A folder's name, read from its `<name>` child or a `name` attribute.
fn folder_name<'a>(
    attrs: &'a std::collections::HashMap<String, String>,
    elements: &'a [Kml],
) -> Option<&'a str> {
    elements
        .iter()
        .find_map(|element| match element {
            Kml::Element(e) if e.name == "name" => e.content.as_deref(),
            _ => None,
        })
        .or_else(|| attrs.get("name").map(String::as_str))
        .map(str::trim)
}

fn placemark_feature(placemark: &Placemark, folder: Option<&str>) -> SourceFeature {
    let mut properties = Map::new();

    if let Some(name) = &placemark.name {
        properties.insert("name".to_string(), Value::String(name.trim().to_string()));
    }
    if let Some(description) = &placemark.description {
        properties.insert(
            "description".to_string(),
            Value::String(description.trim().to_string()),
        );
    }
    if let Some(folder) = folder {
        properties.insert("folder".to_string(), Value::String(folder.to_string()));
    }
    collect_extended_data(&placemark.children, &mut properties);

    let geometry = placemark.geometry.as_ref().and_then(to_geometry);

    SourceFeature::new(geometry, properties)
}

/// Copies `<Data name="..."><value>...</value></Data>` and
/// `<SimpleData name="...">...</SimpleData>` entries into `properties`.
fn collect_extended_data(children: &[Element], properties: &mut Map<String, Value>) {
    for child in children {
        match child.name.as_str() {
            "ExtendedData" | "SchemaData" => collect_extended_data(&child.children, properties),
            "Data" => {
                if let Some(key) = child.attrs.get("name") {
                    let value = child
                        .children
                        .iter()
                        .find(|c| c.name == "value")
                        .and_then(|c| c.content.as_deref())
                        .unwrap_or_default();
                    properties.insert(key.clone(), Value::String(value.trim().to_string()));
                }
            }
            "SimpleData" => {
                if let Some(key) = child.attrs.get("name") {
                    let value = child.content.as_deref().unwrap_or_default();
                    properties.insert(key.clone(), Value::String(value.trim().to_string()));
                }
            }
            _ => {}
        }
    }
}

fn to_geometry(geometry: &KmlGeometry) -> Option<Geometry<f64>> {
    match geometry {
        KmlGeometry::Point(point) => Some(Geometry::Point(Point(Coord {
            x: point.coord.x,
            y: point.coord.y,
        }))),
        KmlGeometry::LineString(line) => Some(Geometry::LineString(to_line_string(&line.coords))),
        KmlGeometry::LinearRing(ring) => Some(Geometry::LineString(to_line_string(&ring.coords))),
        KmlGeometry::Polygon(polygon) => Some(Geometry::Polygon(Polygon::new(
            ring_line(&polygon.outer),
            polygon.inner.iter().map(ring_line).collect(),
        ))),
        KmlGeometry::MultiGeometry(multi) => merge_parts(
            multi.geometries.iter().filter_map(to_geometry).collect(),
        ),
        _ => None,
    }
}

fn ring_line(ring: &LinearRing) -> LineString<f64> {
    to_line_string(&ring.coords)
}

fn to_line_string(coords: &[kml::types::Coord]) -> LineString<f64> {
    LineString(coords.iter().map(|c| Coord { x: c.x, y: c.y }).collect())
}

/// Folds the children of a `MultiGeometry` into the matching multi-part
/// geometry when they all share one kind, or a collection otherwise.
fn merge_parts(parts: Vec<Geometry<f64>>) -> Option<Geometry<f64>> {
    if parts.is_empty() {
        return None;
    }

    if let Ok(points) = parts.iter().cloned().map(Point::try_from).collect::<Result<Vec<_>, _>>() {
        return Some(Geometry::MultiPoint(MultiPoint(points)));
    }
    if let Ok(lines) = parts
        .iter()
        .cloned()
        .map(LineString::try_from)
        .collect::<Result<Vec<_>, _>>()
    {
        return Some(Geometry::MultiLineString(MultiLineString(lines)));
    }
    if let Ok(polygons) = parts
        .iter()
        .cloned()
        .map(Polygon::try_from)
        .collect::<Result<Vec<_>, _>>()
    {
        return Some(Geometry::MultiPolygon(MultiPolygon(polygons)));
    }

    Some(Geometry::GeometryCollection(GeometryCollection(parts)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PORT_KML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <name>Porto</name>
    <Folder>
      <name>Zoneamento</name>
      <Placemark>
        <name>Setor Norte</name>
        <description>Area de expansao</description>
        <ExtendedData>
          <Data name="area_ha"><value>12.5</value></Data>
        </ExtendedData>
        <Polygon>
          <outerBoundaryIs>
            <LinearRing>
              <coordinates>-44.37,-2.58,0 -44.36,-2.58,0 -44.36,-2.57,0 -44.37,-2.58,0</coordinates>
            </LinearRing>
          </outerBoundaryIs>
        </Polygon>
      </Placemark>
    </Folder>
    <Placemark>
      <Point><coordinates>-44.35,-2.56,0</coordinates></Point>
    </Placemark>
    <Placemark>
      <name>Sem geometria</name>
    </Placemark>
  </Document>
</kml>"#;

    #[test]
    fn reads_placemarks_through_folders() {
        let collection = read_kml(PORT_KML).unwrap();
        assert_eq!(collection.len(), 3);
        assert_eq!(collection.features[0].properties["name"], "Setor Norte");
        assert!(matches!(
            collection.features[0].geometry,
            Some(Geometry::Polygon(_))
        ));
        assert!(collection.features[1].properties.get("name").is_none());
        assert!(collection.features[2].geometry.is_none());
    }

    #[test]
    fn keeps_source_axis_order() {
        let collection = read_kml(PORT_KML).unwrap();
        let Some(Geometry::Point(point)) = &collection.features[1].geometry else {
            panic!("expected a point");
        };
        assert!((point.x() - -44.35).abs() < 1e-9);
        assert!((point.y() - -2.56).abs() < 1e-9);
    }

    #[test]
    fn copies_description_and_extended_data() {
        let collection = read_kml(PORT_KML).unwrap();
        let properties = &collection.features[0].properties;
        assert_eq!(properties["description"], "Area de expansao");
        assert_eq!(properties["area_ha"], "12.5");
    }

    #[test]
    fn top_level_placemarks_have_no_folder() {
        let collection = read_kml(PORT_KML).unwrap();
        assert!(collection.features[1].properties.get("folder").is_none());
        assert!(collection.features[2].properties.get("folder").is_none());
    }

    #[test]
    fn nested_folders_build_a_path() {
        let collection = read_kml(
            r#"<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <Folder>
      <name>Zoneamento</name>
      <Folder>
        <name>Norte</name>
        <Placemark>
          <name>Boia 3</name>
          <Point><coordinates>-44.35,-2.56,0</coordinates></Point>
        </Placemark>
      </Folder>
      <Placemark>
        <name>Boia 1</name>
        <Point><coordinates>-44.36,-2.57,0</coordinates></Point>
      </Placemark>
    </Folder>
  </Document>
</kml>"#,
        )
        .unwrap();

        assert_eq!(collection.len(), 2);
        assert_eq!(collection.features[0].properties["folder"], "Zoneamento/Norte");
        assert_eq!(collection.features[1].properties["folder"], "Zoneamento");
    }

    #[test]
    fn homogeneous_multi_geometry_becomes_multi_polygon() {
        let parts = vec![
            Geometry::Polygon(Polygon::new(
                LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]),
                vec![],
            )),
            Geometry::Polygon(Polygon::new(
                LineString::from(vec![(5.0, 5.0), (6.0, 5.0), (5.0, 6.0)]),
                vec![],
            )),
        ];
        let merged = merge_parts(parts).unwrap();
        assert!(matches!(merged, Geometry::MultiPolygon(ref mp) if mp.0.len() == 2));
    }

    #[test]
    fn mixed_multi_geometry_becomes_collection() {
        let parts = vec![
            Geometry::Point(Point::new(0.0, 0.0)),
            Geometry::LineString(LineString::from(vec![(0.0, 0.0), (1.0, 1.0)])),
        ];
        let merged = merge_parts(parts).unwrap();
        assert!(matches!(merged, Geometry::GeometryCollection(_)));
    }

    #[test]
    fn rejects_mismatched_tags() {
        let err = read_kml("<kml><Document><Placemark></Document></kml>").unwrap_err();
        assert!(matches!(err, ImportError::MalformedInput { format: "KML", .. }));
    }
}
