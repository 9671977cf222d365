use indexmap::IndexMap;
use serde_json::Value;

use crate::{
    error::{Error, Result},
    geometry::{shape::is_supported_type, ConversionContext, Geometry},
    rows::{FeatureRow, PolygonVertexRow, Scalar},
};

/// Decode `raw` as JSON holding a feature collection.
pub fn parse_feature_collection(raw: &[u8]) -> Result<Value> {
    let document: Value = serde_json::from_slice(raw)
        .map_err(|err| Error::InvalidDocument(format!("Not valid JSON: {err}")))?;
    match document.get("features") {
        Some(Value::Array(_)) => Ok(document),
        Some(_) => Err(Error::InvalidDocument(
            "\"features\" is not an array".to_string(),
        )),
        None => Err(Error::InvalidDocument(
            "JSON document has no \"features\" array".to_string(),
        )),
    }
}

/// One feature row per entry of the `features` array, in input order.
pub fn walk_geojson(
    document: &Value,
    context: &mut ConversionContext,
) -> Result<(Vec<FeatureRow>, Vec<PolygonVertexRow>)> {
    let features = document
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::InvalidDocument("Expected a \"features\" array".to_string()))?;

    let mut rows = Vec::with_capacity(features.len());
    let mut vertices = Vec::new();
    for (index, feature) in features.iter().enumerate() {
        let feature_index = index + 1;
        if !feature.is_object() {
            return Err(Error::InvalidDocument(format!(
                "Feature {feature_index} is not an object"
            )));
        }
        let mut row = FeatureRow::new(properties_of(feature), feature_index);
        if let Some(id) = feature.get("id") {
            if !row.has_id_property() {
                row.id = Some(Scalar::from(id));
            }
        }

        match geometry_of(feature) {
            Ok(Some(geometry)) => {
                if let Err(err) = context.extract_geometry(&geometry, &mut row, &mut vertices) {
                    log::warn!(
                        "Skipping geometry of GeoJSON feature {}: {}",
                        feature_index,
                        err
                    );
                }
            }
            Ok(None) => {}
            Err(err) => {
                context.diagnostics.malformed_geometries += 1;
                log::warn!(
                    "Skipping geometry of GeoJSON feature {}: {}",
                    feature_index,
                    err
                );
            }
        }
        rows.push(row);
    }
    Ok((rows, vertices))
}

fn properties_of(feature: &Value) -> IndexMap<String, Scalar> {
    match feature.get("properties") {
        Some(Value::Object(properties)) => properties
            .iter()
            .map(|(key, value)| (key.clone(), Scalar::from(value)))
            .collect(),
        _ => IndexMap::new(),
    }
}

/// The classified geometry of a feature, `None` when it has none.
fn geometry_of(feature: &Value) -> Result<Option<Geometry>> {
    let geometry = match feature.get("geometry") {
        None | Some(Value::Null) => return Ok(None),
        Some(geometry) => geometry,
    };
    let type_tag = geometry
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if !is_supported_type(type_tag) {
        return Ok(Some(Geometry::Unsupported(type_tag.to_string())));
    }
    let parsed = ::geojson::Geometry::from_json_value(geometry.clone())
        .map_err(|err| Error::MalformedGeometry(err.to_string()))?;
    Geometry::try_from(&parsed.value).map(Some)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use serde_json::json;

    use super::{parse_feature_collection, walk_geojson};
    use crate::{
        error::Error,
        geometry::{ConversionContext, PolygonIndexing},
        rows::{FeatureRow, PolygonVertexRow, Scalar},
    };

    fn walk(document: serde_json::Value) -> (Vec<FeatureRow>, Vec<PolygonVertexRow>) {
        let mut context = ConversionContext::new(PolygonIndexing::PerFeature);
        walk_geojson(&document, &mut context).unwrap()
    }

    #[test]
    fn test_point_with_elevation() {
        let (rows, vertices) = walk(json!({"features": [
            {"properties": {"name": "peak"}, "geometry": {"type": "Point", "coordinates": [7.5, 46.1, 4478.0]}}
        ]}));
        assert_eq!(rows.len(), 1);
        assert_abs_diff_eq!(rows[0].longitude.unwrap(), 7.5);
        assert_abs_diff_eq!(rows[0].latitude.unwrap(), 46.1);
        assert_eq!(rows[0].elevation, Some(4478.0));
        assert!(vertices.is_empty());
    }

    #[test]
    fn test_properties_keep_document_order() {
        let document = parse_feature_collection(
            br#"{"features": [{"properties": {"zeta": 1, "alpha": 2, "mid": 3}, "geometry": null}]}"#,
        )
        .unwrap();
        let mut context = ConversionContext::new(PolygonIndexing::PerFeature);
        let (rows, _) = walk_geojson(&document, &mut context).unwrap();

        let keys: Vec<&str> = rows[0].properties.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        let record = rows[0].to_record();
        let columns: Vec<&str> = record.keys().map(String::as_str).collect();
        assert_eq!(columns, vec!["zeta", "alpha", "mid", "feature_index"]);
    }

    #[test]
    fn test_id_not_added_when_property_differs_in_case() {
        let (rows, _) = walk(json!({"features": [
            {"id": "y", "properties": {"ID": "x"}, "geometry": null}
        ]}));
        assert_eq!(rows[0].id, None);
        let record = rows[0].to_record();
        assert_eq!(record["ID"], Scalar::from("x"));
        assert!(!record.contains_key("id"));
    }

    #[test]
    fn test_id_added_without_colliding_property() {
        let (rows, _) = walk(json!({"features": [
            {"id": 17, "properties": {"name": "A"}}
        ]}));
        assert_eq!(rows[0].id, Some(Scalar::Integer(17)));
    }

    #[test]
    fn test_missing_geometry_keeps_row() {
        let (rows, vertices) = walk(json!({"features": [
            {"properties": {"name": "A"}},
            {"properties": {"name": "B"}, "geometry": null}
        ]}));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].feature_index, 2);
        assert_eq!(rows[1].to_record().len(), 2);
        assert!(vertices.is_empty());
    }

    #[test]
    fn test_missing_properties_is_empty_mapping() {
        let (rows, _) = walk(json!({"features": [
            {"geometry": {"type": "Point", "coordinates": [1.0, 2.0]}}
        ]}));
        assert!(rows[0].properties.is_empty());
        assert_eq!(rows[0].longitude, Some(1.0));
    }

    #[test]
    fn test_multi_polygon_emits_outer_rings_only() {
        let (rows, vertices) = walk(json!({"features": [
            {"properties": {}, "geometry": {"type": "MultiPolygon", "coordinates": [
                [[[0, 0], [4, 0], [4, 4], [0, 0]], [[1, 1], [2, 1], [1, 1]]],
                [[[10, 10], [11, 10], [11, 11], [10, 10]]]
            ]}}
        ]}));
        assert_eq!(rows.len(), 1);
        assert_eq!(vertices.len(), 8);
        assert_eq!(vertices[7].polygon_index, 2);
        assert_abs_diff_eq!(vertices[4].longitude, 10.0);
    }

    #[test]
    fn test_unsupported_and_malformed_geometries_keep_rows() {
        let mut context = ConversionContext::new(PolygonIndexing::PerFeature);
        let document = json!({"features": [
            {"properties": {"n": 1}, "geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]}},
            {"properties": {"n": 2}, "geometry": {"type": "Point", "coordinates": [1.0]}},
            {"properties": {"n": 3}, "geometry": {"type": "Polygon"}},
            {"properties": {"n": 4}, "geometry": {"type": "Point", "coordinates": [3.0, 4.0]}}
        ]});
        let (rows, vertices) = walk_geojson(&document, &mut context).unwrap();

        assert_eq!(rows.len(), 4);
        assert!(vertices.is_empty());
        assert_eq!(rows[1].longitude, None);
        assert_eq!(rows[3].longitude, Some(3.0));
        assert_eq!(context.diagnostics.unsupported_geometries, 1);
        assert_eq!(context.diagnostics.malformed_geometries, 2);
    }

    #[test]
    fn test_parse_rejects_documents_without_features() {
        assert!(matches!(
            parse_feature_collection(br#"{"type": "Feature"}"#),
            Err(Error::InvalidDocument(_))
        ));
        assert!(matches!(
            parse_feature_collection(br#"{"features": {}}"#),
            Err(Error::InvalidDocument(_))
        ));
        assert!(matches!(
            parse_feature_collection(b"<kml/>"),
            Err(Error::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_non_object_feature_is_invalid() {
        let mut context = ConversionContext::new(PolygonIndexing::PerFeature);
        let result = walk_geojson(&json!({"features": [42]}), &mut context);
        assert!(matches!(result, Err(Error::InvalidDocument(_))));
    }
}
