use crate::error::{Error, Result};

/// A coordinate tuple as given by the source: longitude, latitude and optionally elevation.
pub type Position = Vec<f64>;

/// A closed sequence of vertices bounding a polygon or one of its holes.
pub type Ring = geo::LineString<f64>;

/// The supported geometry classes of both input formats.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Position),
    /// Rings of one polygon, outer ring first.
    Polygon(Vec<Ring>),
    /// Member polygons, each a ring list with its outer ring first.
    MultiPolygon(Vec<Vec<Ring>>),
    GeometryCollection(Vec<Geometry>),
    /// A geometry type with no row representation, kept by its type tag.
    Unsupported(String),
}

impl Geometry {
    pub fn type_tag(&self) -> &str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
            Geometry::GeometryCollection(_) => "GeometryCollection",
            Geometry::Unsupported(type_tag) => type_tag,
        }
    }
}

/// Whether geometries tagged `type_tag` produce rows.
pub fn is_supported_type(type_tag: &str) -> bool {
    matches!(
        type_tag,
        "Point" | "Polygon" | "MultiPolygon" | "GeometryCollection"
    )
}

pub fn coord_from_position(position: &[f64]) -> Result<geo::Coord<f64>> {
    match position {
        [x, y, ..] => Ok(geo::Coord { x: *x, y: *y }),
        _ => Err(Error::MalformedGeometry(format!(
            "Position has {} values, at least two are required",
            position.len()
        ))),
    }
}

pub fn ring_from_positions(positions: &[Position]) -> Result<Ring> {
    positions
        .iter()
        .map(|position| coord_from_position(position))
        .collect::<Result<Vec<geo::Coord<f64>>>>()
        .map(geo::LineString::new)
}

fn rings_from_polygon(polygon: &geojson::PolygonType) -> Result<Vec<Ring>> {
    polygon
        .iter()
        .map(|ring| ring_from_positions(ring))
        .collect()
}

impl TryFrom<&geojson::Value> for Geometry {
    type Error = Error;

    fn try_from(value: &geojson::Value) -> Result<Self> {
        use geojson::Value;
        match value {
            Value::Point(position) => Ok(Geometry::Point(position.clone())),
            Value::Polygon(polygon) => Ok(Geometry::Polygon(rings_from_polygon(polygon)?)),
            Value::MultiPolygon(polygons) => Ok(Geometry::MultiPolygon(
                polygons
                    .iter()
                    .map(rings_from_polygon)
                    .collect::<Result<Vec<Vec<Ring>>>>()?,
            )),
            Value::GeometryCollection(members) => Ok(Geometry::GeometryCollection(
                members
                    .iter()
                    .map(|member| Geometry::try_from(&member.value))
                    .collect::<Result<Vec<Geometry>>>()?,
            )),
            Value::LineString(_) => Ok(Geometry::Unsupported("LineString".to_string())),
            Value::MultiPoint(_) => Ok(Geometry::Unsupported("MultiPoint".to_string())),
            Value::MultiLineString(_) => {
                Ok(Geometry::Unsupported("MultiLineString".to_string()))
            }
        }
    }
}
