use indexmap::IndexMap;

use super::scalar::Scalar;

/// Ordered column name to value mapping, the unit handed to a sink.
pub type Record = IndexMap<String, Scalar>;

/// One input feature: its scalar attributes plus, for point geometries, its coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRow {
    pub properties: IndexMap<String, Scalar>,
    /// 1-based position within the enclosing collection or folder.
    pub feature_index: usize,
    pub id: Option<Scalar>,
    pub folder_name: Option<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub elevation: Option<f64>,
}

impl FeatureRow {
    pub fn new(properties: IndexMap<String, Scalar>, feature_index: usize) -> Self {
        Self {
            properties,
            feature_index,
            ..Default::default()
        }
    }

    /// Whether a property key equals "id" ignoring case.
    pub fn has_id_property(&self) -> bool {
        self.properties
            .keys()
            .any(|key| key.to_lowercase() == "id")
    }

    /// Flatten into columns. Fixed fields are written after the properties and
    /// replace a property of the same name.
    pub fn to_record(&self) -> Record {
        let mut record = self.properties.clone();
        record.insert("feature_index".to_string(), self.feature_index.into());
        if let Some(id) = &self.id {
            record.insert("id".to_string(), id.clone());
        }
        if let Some(folder_name) = &self.folder_name {
            record.insert("folder_name".to_string(), folder_name.as_str().into());
        }
        if let Some(elevation) = self.elevation {
            record.insert("elevation".to_string(), elevation.into());
        }
        if let Some(longitude) = self.longitude {
            record.insert("longitude".to_string(), longitude.into());
        }
        if let Some(latitude) = self.latitude {
            record.insert("latitude".to_string(), latitude.into());
        }
        record
    }
}

/// One vertex of one polygon ring.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonVertexRow {
    pub feature_index: usize,
    pub polygon_index: usize,
    /// 1-based position within the ring.
    pub point_index: usize,
    pub longitude: f64,
    pub latitude: f64,
    pub folder_name: Option<String>,
}

impl PolygonVertexRow {
    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert("feature_index".to_string(), self.feature_index.into());
        record.insert("polygon_index".to_string(), self.polygon_index.into());
        record.insert("point_index".to_string(), self.point_index.into());
        record.insert("longitude".to_string(), self.longitude.into());
        record.insert("latitude".to_string(), self.latitude.into());
        if let Some(folder_name) = &self.folder_name {
            record.insert("folder_name".to_string(), folder_name.as_str().into());
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::{FeatureRow, PolygonVertexRow};
    use crate::rows::Scalar;

    #[test]
    fn test_feature_record_column_order() {
        let mut row = FeatureRow::new(
            IndexMap::from([
                ("name".to_string(), Scalar::from("A")),
                ("population".to_string(), Scalar::Integer(12)),
            ]),
            3,
        );
        row.id = Some(Scalar::from("f-3"));
        row.longitude = Some(1.0);
        row.latitude = Some(2.0);
        row.elevation = Some(3.0);

        let record = row.to_record();
        let columns: Vec<&str> = record.keys().map(|key| key.as_str()).collect();
        assert_eq!(
            columns,
            vec![
                "name",
                "population",
                "feature_index",
                "id",
                "elevation",
                "longitude",
                "latitude"
            ]
        );
        assert_eq!(record["feature_index"], Scalar::Integer(3));
    }

    #[test]
    fn test_fixed_fields_replace_same_named_property() {
        let row = FeatureRow::new(
            IndexMap::from([("feature_index".to_string(), Scalar::from("stale"))]),
            1,
        );
        let record = row.to_record();
        assert_eq!(record.len(), 1);
        assert_eq!(record["feature_index"], Scalar::Integer(1));
    }

    #[test]
    fn test_has_id_property_ignores_case() {
        let row = FeatureRow::new(IndexMap::from([("ID".to_string(), Scalar::from("x"))]), 1);
        assert!(row.has_id_property());
        let row = FeatureRow::new(IndexMap::from([("ident".to_string(), Scalar::Null)]), 1);
        assert!(!row.has_id_property());
    }

    #[test]
    fn test_vertex_record_includes_folder_name() {
        let vertex = PolygonVertexRow {
            feature_index: 2,
            polygon_index: 1,
            point_index: 4,
            longitude: 10.5,
            latitude: -3.25,
            folder_name: Some("Document/Parks".to_string()),
        };
        let record = vertex.to_record();
        assert_eq!(record["point_index"], Scalar::Integer(4));
        assert_eq!(record["folder_name"], Scalar::from("Document/Parks"));
        assert_eq!(record.get_index(0).map(|(key, _)| key.as_str()), Some("feature_index"));
    }
}
