use std::collections::HashSet;
use std::io::{Cursor, Write};

use esg_map_layer::{
    ImportConfig, ImportError, ImportMetadata, ImportSession, LayerData, LayerType, Pillar,
    SourceFile, process_file,
};
use esg_map_layer_models::LatLng;

const PORT_KML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <Placemark>
      <name>Setor Norte</name>
      <Polygon>
        <outerBoundaryIs>
          <LinearRing>
            <coordinates>-44.37,-2.58,0 -44.36,-2.58,0 -44.36,-2.57,0 -44.37,-2.58,0</coordinates>
          </LinearRing>
        </outerBoundaryIs>
      </Polygon>
    </Placemark>
    <Placemark>
      <Point><coordinates>-44.35,-2.56,0</coordinates></Point>
    </Placemark>
  </Document>
</kml>"#;

fn session() -> ImportSession {
    ImportSession::default().with_salt(1_700_000_000_000)
}

fn environmental() -> ImportMetadata {
    ImportMetadata::new(Pillar::Environmental)
}

fn point_shp(points: &[(f64, f64)]) -> Vec<u8> {
    let file_len_words = i32::try_from((100 + points.len() * 28) / 2).unwrap();
    let (xs, ys): (Vec<f64>, Vec<f64>) = points.iter().copied().unzip();
    let min = |v: &[f64]| v.iter().copied().fold(f64::INFINITY, f64::min);
    let max = |v: &[f64]| v.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut bytes = Vec::new();
    bytes.extend_from_slice(&9994_i32.to_be_bytes());
    bytes.extend_from_slice(&[0; 20]);
    bytes.extend_from_slice(&file_len_words.to_be_bytes());
    bytes.extend_from_slice(&1000_i32.to_le_bytes());
    bytes.extend_from_slice(&1_i32.to_le_bytes());
    for value in [min(&xs), min(&ys), max(&xs), max(&ys), 0.0, 0.0, 0.0, 0.0] {
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    for (number, (x, y)) in (1_i32..).zip(points) {
        bytes.extend_from_slice(&number.to_be_bytes());
        bytes.extend_from_slice(&10_i32.to_be_bytes());
        bytes.extend_from_slice(&1_i32.to_le_bytes());
        bytes.extend_from_slice(&x.to_le_bytes());
        bytes.extend_from_slice(&y.to_le_bytes());
    }

    bytes
}

/// A polygon `.shp` holding one single-ring polygon. `ring` must be closed
/// and clockwise, as the format requires for outer rings.
fn polygon_shp(ring: &[(f64, f64)]) -> Vec<u8> {
    let content_len = 44 + 4 + ring.len() * 16;
    let file_len_words = i32::try_from((100 + 8 + content_len) / 2).unwrap();
    let (xs, ys): (Vec<f64>, Vec<f64>) = ring.iter().copied().unzip();
    let min = |v: &[f64]| v.iter().copied().fold(f64::INFINITY, f64::min);
    let max = |v: &[f64]| v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let bbox = [min(&xs), min(&ys), max(&xs), max(&ys)];

    let mut bytes = Vec::new();
    bytes.extend_from_slice(&9994_i32.to_be_bytes());
    bytes.extend_from_slice(&[0; 20]);
    bytes.extend_from_slice(&file_len_words.to_be_bytes());
    bytes.extend_from_slice(&1000_i32.to_le_bytes());
    bytes.extend_from_slice(&5_i32.to_le_bytes());
    for value in bbox.into_iter().chain([0.0; 4]) {
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    bytes.extend_from_slice(&1_i32.to_be_bytes());
    bytes.extend_from_slice(&i32::try_from(content_len / 2).unwrap().to_be_bytes());
    bytes.extend_from_slice(&5_i32.to_le_bytes());
    for value in bbox {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes.extend_from_slice(&1_i32.to_le_bytes());
    bytes.extend_from_slice(&i32::try_from(ring.len()).unwrap().to_le_bytes());
    bytes.extend_from_slice(&0_i32.to_le_bytes());
    for (x, y) in ring {
        bytes.extend_from_slice(&x.to_le_bytes());
        bytes.extend_from_slice(&y.to_le_bytes());
    }

    bytes
}

/// A dBase III table with a single 20-character `NAME` column.
fn name_dbf(names: &[&str]) -> Vec<u8> {
    const WIDTH: u8 = 20;

    let mut bytes = vec![0x03, 124, 1, 1];
    bytes.extend_from_slice(&u32::try_from(names.len()).unwrap().to_le_bytes());
    bytes.extend_from_slice(&(32_u16 + 32 + 1).to_le_bytes());
    bytes.extend_from_slice(&(1_u16 + u16::from(WIDTH)).to_le_bytes());
    bytes.extend_from_slice(&[0; 20]);

    let mut field = [0_u8; 32];
    field[..4].copy_from_slice(b"NAME");
    field[11] = b'C';
    field[16] = WIDTH;
    bytes.extend_from_slice(&field);
    bytes.push(0x0D);

    for name in names {
        bytes.push(b' ');
        let mut cell = [b' '; WIDTH as usize];
        cell[..name.len()].copy_from_slice(name.as_bytes());
        bytes.extend_from_slice(&cell);
    }
    bytes.push(0x1A);

    bytes
}

fn zip_of(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    for (name, bytes) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[test]
fn kml_polygon_and_unnamed_point() {
    let file = SourceFile::new("Zoneamento.kml", PORT_KML);
    let metadata = environmental().with_group("Zoneamento");

    let layers = session().process_file(&file, &metadata).unwrap();

    assert_eq!(layers.len(), 2);

    assert_eq!(layers[0].name(), "Setor Norte");
    assert_eq!(layers[0].layer_type(), LayerType::Polygon);
    assert_eq!(layers[0].data().coordinates()[0], LatLng::new(-2.58, -44.37));

    assert_eq!(layers[1].name(), "Zoneamento - 2");
    assert_eq!(
        layers[1].data(),
        &LayerData::Marker(LatLng::new(-2.56, -44.35))
    );

    for layer in &layers {
        assert_eq!(layer.pillar(), Pillar::Environmental);
        assert_eq!(layer.group(), "Zoneamento");
        assert!(layer.is_visible());
    }
    assert_ne!(layers[0].color(), layers[1].color());
    assert_ne!(layers[0].id(), layers[1].id());
}

#[test]
fn geojson_coordinate_order_for_every_type() {
    let file = SourceFile::new(
        "terminal.geojson",
        r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"name": "Boia"},
             "geometry": {"type": "Point", "coordinates": [-44.3, -2.5]}},
            {"type": "Feature", "properties": {"name": "Pátio"},
             "geometry": {"type": "Polygon", "coordinates": [[[-44.3, -2.5], [-44.2, -2.5], [-44.2, -2.4], [-44.3, -2.5]]]}},
            {"type": "Feature", "properties": {"name": "Ferrovia"},
             "geometry": {"type": "LineString", "coordinates": [[-44.3, -2.5], [-44.1, -2.3]]}}
        ]}"#,
    );

    let layers = session().process_file(&file, &environmental()).unwrap();

    let types: Vec<LayerType> = layers.iter().map(|l| l.layer_type()).collect();
    assert_eq!(types, [LayerType::Marker, LayerType::Polygon, LayerType::Polyline]);
    for layer in &layers {
        assert_eq!(layer.data().coordinates()[0], LatLng::new(-2.5, -44.3));
    }
    assert_eq!(layers[2].data().coordinates()[1], LatLng::new(-2.3, -44.1));
}

#[test]
fn multi_polygon_collapses_and_reports_part_count() {
    let square = |dx: f64| {
        format!("[[[{0}, 0], [{1}, 0], [{1}, 1], [{0}, 0]]]", dx, dx + 1.0)
    };
    let text = format!(
        r#"{{"type": "FeatureCollection", "features": [
            {{"type": "Feature", "properties": {{}},
              "geometry": {{"type": "MultiPolygon", "coordinates": [{}, {}, {}]}}}}
        ]}}"#,
        square(0.0),
        square(5.0),
        square(10.0)
    );
    let file = SourceFile::new("areas.json", text);

    let layers = session().process_file(&file, &environmental()).unwrap();
    assert_eq!(layers.len(), 1);
    assert_eq!(layers[0].details()["multiPolygonCount"], 3);

    let mut config = ImportConfig::default();
    config.expand_multipart = true;
    let expanded = ImportSession::new(config)
        .process_file(&file, &environmental())
        .unwrap();
    assert_eq!(expanded.len(), 3);
    assert_eq!(expanded[2].details()["partIndex"], 2);
    let ids: HashSet<&str> = expanded.iter().map(|l| l.id()).collect();
    assert_eq!(ids.len(), 3);
}

#[test]
fn empty_feature_collection_is_empty_input() {
    let file = SourceFile::new("vazio.geojson", r#"{"type": "FeatureCollection", "features": []}"#);
    let err = process_file(&file, &environmental()).unwrap_err();
    assert!(matches!(err, ImportError::EmptyInput { .. }));
}

#[test]
fn all_null_geometries_is_no_valid_layers() {
    let file = SourceFile::new(
        "nulos.geojson",
        r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {}, "geometry": null},
            {"type": "Feature", "properties": {}, "geometry": null}
        ]}"#,
    );
    let err = process_file(&file, &environmental()).unwrap_err();
    assert!(matches!(err, ImportError::NoValidLayers { .. }));
}

#[test]
fn name_fallback_order() {
    let file = SourceFile::new(
        "bairros.geojson",
        r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"name": "Ignorado"},
             "geometry": {"type": "Point", "coordinates": [0, 0]}},
            {"type": "Feature", "properties": {"Name": "Vila Maranhão", "BAIRRO": "Anjo da Guarda"},
             "geometry": {"type": "Point", "coordinates": [0, 0]}},
            {"type": "Feature", "properties": {"TITLE": "Cais"},
             "geometry": {"type": "Point", "coordinates": [0, 0]}},
            {"type": "Feature", "properties": {"codigo": "X1"},
             "geometry": {"type": "Point", "coordinates": [0, 0]}}
        ]}"#,
    );
    let metadata = ImportMetadata::new(Pillar::Social).with_name("Comunidade Principal");

    let layers = session().process_file(&file, &metadata).unwrap();
    let names: Vec<&str> = layers.iter().map(|l| l.name()).collect();

    assert_eq!(
        names,
        ["Comunidade Principal", "Anjo da Guarda", "Cais", "bairros - 4"]
    );
    assert_eq!(layers[3].details()["codigo"], "X1");
}

#[test]
fn unsupported_extension_is_rejected() {
    for name in ["mapa.kmz", "planta.dxf", "dados.xlsx"] {
        let err = process_file(&SourceFile::new(name, "x"), &environmental()).unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedFormat { .. }), "{name}");
    }
}

#[test]
fn uppercase_extension_is_accepted() {
    let file = SourceFile::new("PORTO.KML", PORT_KML);
    let layers = process_file(&file, &environmental()).unwrap();
    assert_eq!(layers.len(), 2);
    assert_eq!(layers[1].name(), "PORTO - 2");
}

#[test]
fn csv_with_semicolons_and_comma_decimals() {
    let file = SourceFile::new(
        "monitoramento.csv",
        "\u{feff}Ponto;Latitude;Longitude;Turbidez\nP1;-2,58;-44,37;12\nP2;;;\n;-2,60;-44,40;8\n",
    );

    let layers = session().process_file(&file, &environmental()).unwrap();

    assert_eq!(layers.len(), 2);
    assert_eq!(layers[0].data(), &LayerData::Marker(LatLng::new(-2.58, -44.37)));
    assert_eq!(layers[0].name(), "monitoramento - Ponto 1");
    assert_eq!(layers[0].details()["Ponto"], "P1");
    assert_eq!(layers[0].details()["Turbidez"], "12");
    assert_eq!(layers[1].name(), "monitoramento - Ponto 3");
}

#[test]
fn csv_without_coordinates_names_its_headers() {
    let file = SourceFile::new("lista.csv", "nome,cidade\nA,B\n");
    let err = process_file(&file, &environmental()).unwrap_err();
    assert!(matches!(err, ImportError::MissingCoordinateColumns { .. }));
    assert!(err.to_string().contains("cidade"));
}

#[test]
fn zip_with_two_shapefiles_shares_the_session() {
    let archive = zip_of(&[
        ("berths.shp", point_shp(&[(-44.1, -2.1), (-44.2, -2.2), (-44.3, -2.3)])),
        ("berths.dbf", name_dbf(&["B1", "B2", "B3"])),
        ("buoys.shp", point_shp(&[(-44.4, -2.4), (-44.5, -2.5)])),
        ("buoys.dbf", name_dbf(&["", ""])),
    ]);
    let file = SourceFile::new("porto.zip", archive);

    let layers = session().process_file(&file, &environmental()).unwrap();

    assert_eq!(layers.len(), 5);
    let colors: HashSet<&str> = layers.iter().map(|l| l.color()).collect();
    assert_eq!(colors.len(), 5);
    let ids: HashSet<&str> = layers.iter().map(|l| l.id()).collect();
    assert_eq!(ids.len(), 5);

    assert_eq!(layers[0].name(), "B1");
    assert_eq!(layers[0].data(), &LayerData::Marker(LatLng::new(-2.1, -44.1)));
    assert_eq!(layers[3].name(), "buoys - 1");
    assert!(layers.iter().all(|l| l.layer_type() == LayerType::Marker));
}

#[test]
fn single_ring_shapefile_polygon_is_not_multipart() {
    let ring = [
        (-44.37, -2.58),
        (-44.37, -2.57),
        (-44.36, -2.57),
        (-44.36, -2.58),
        (-44.37, -2.58),
    ];
    let archive = zip_of(&[
        ("zonas.shp", polygon_shp(&ring)),
        ("zonas.dbf", name_dbf(&["Z1"])),
    ]);

    let layers = session()
        .process_file(&SourceFile::new("zonas.zip", archive), &environmental())
        .unwrap();

    assert_eq!(layers.len(), 1);
    assert_eq!(layers[0].layer_type(), LayerType::Polygon);
    assert_eq!(layers[0].name(), "Z1");
    assert!(layers[0].details().get("multiPolygonCount").is_none());
    assert!(layers[0].details().get("partIndex").is_none());
}

#[test]
fn zip_without_shapefile_fails_to_decode() {
    let archive = zip_of(&[("readme.txt", b"nada".to_vec())]);
    let err = process_file(&SourceFile::new("vazio.zip", archive), &environmental()).unwrap_err();
    assert!(matches!(err, ImportError::ShapefileDecode { .. }));
}

#[test]
fn colors_continue_across_files_in_one_session() {
    let mut session = session();
    let first = session
        .process_file(&SourceFile::new("a.kml", PORT_KML), &environmental())
        .unwrap();
    let second = session
        .process_file(&SourceFile::new("b.kml", PORT_KML), &environmental())
        .unwrap();

    let palette = ImportConfig::default().palette;
    assert_eq!(first[0].color(), palette[0]);
    assert_eq!(second[0].color(), palette[2]);
}

#[test]
fn layers_serialize_with_type_and_data() {
    let layers = session()
        .process_file(&SourceFile::new("z.kml", PORT_KML), &environmental())
        .unwrap();
    let json = serde_json::to_value(&layers[1]).unwrap();

    assert_eq!(json["type"], "MARKER");
    assert_eq!(json["data"]["lat"], -2.56);
    assert_eq!(json["pillar"], "Environmental");
    assert_eq!(json["visible"], true);
}
