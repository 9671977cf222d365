use serde::Deserialize;

use super::shape::{Geometry, Ring};
use crate::{
    error::{Error, Result},
    rows::{FeatureRow, PolygonVertexRow},
};

/// Scope of the polygon index counter.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PolygonIndexing {
    /// Restart at 1 for every feature.
    #[default]
    PerFeature,
    /// Count across the whole document.
    PerDocument,
}

/// Counts of geometries that were skipped instead of producing rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub unsupported_geometries: usize,
    pub malformed_geometries: usize,
}

/// Point fields of a feature row.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointFields {
    pub longitude: f64,
    pub latitude: f64,
    pub elevation: Option<f64>,
}

/// Owner of a feature's geometry: index and folder copied onto each vertex row.
pub struct FeatureRef<'a> {
    pub feature_index: usize,
    pub folder_name: Option<&'a str>,
}

/// State of one `convert` call. Holds the polygon index counter so that no
/// numbering leaks between documents.
#[derive(Debug)]
pub struct ConversionContext {
    indexing: PolygonIndexing,
    last_polygon_index: usize,
    pub diagnostics: Diagnostics,
}

/// Rows produced by one geometry before they are committed to the output.
struct Extraction {
    point: Option<PointFields>,
    vertices: Vec<PolygonVertexRow>,
    last_polygon_index: usize,
}

impl ConversionContext {
    pub fn new(indexing: PolygonIndexing) -> Self {
        Self {
            indexing,
            last_polygon_index: 0,
            diagnostics: Diagnostics::default(),
        }
    }

    /// Extract `geometry` into `row` and `vertices`.
    ///
    /// Extraction is all or nothing: on error the row and the vertex list are
    /// left untouched and no polygon index is consumed.
    pub fn extract_geometry(
        &mut self,
        geometry: &Geometry,
        row: &mut FeatureRow,
        vertices: &mut Vec<PolygonVertexRow>,
    ) -> Result<()> {
        let start = match self.indexing {
            PolygonIndexing::PerFeature => 0,
            PolygonIndexing::PerDocument => self.last_polygon_index,
        };
        let mut extraction = Extraction {
            point: None,
            vertices: Vec::new(),
            last_polygon_index: start,
        };
        let owner = FeatureRef {
            feature_index: row.feature_index,
            folder_name: row.folder_name.as_deref(),
        };
        let mut unsupported = 0;
        if let Err(err) = dispatch(geometry, &owner, &mut extraction, &mut unsupported) {
            self.diagnostics.malformed_geometries += 1;
            return Err(err);
        }

        self.diagnostics.unsupported_geometries += unsupported;
        if let PolygonIndexing::PerDocument = self.indexing {
            self.last_polygon_index = extraction.last_polygon_index;
        }
        if let Some(point) = extraction.point {
            row.longitude = Some(point.longitude);
            row.latitude = Some(point.latitude);
            // A later point in a collection replaces an earlier one completely.
            row.elevation = point.elevation;
        }
        vertices.append(&mut extraction.vertices);
        Ok(())
    }
}

fn dispatch(
    geometry: &Geometry,
    owner: &FeatureRef,
    extraction: &mut Extraction,
    unsupported: &mut usize,
) -> Result<()> {
    match geometry {
        Geometry::Point(coordinates) => {
            extraction.point = Some(extract_point(coordinates)?);
        }
        Geometry::Polygon(rings) => extract_polygon(
            rings,
            owner,
            &mut extraction.last_polygon_index,
            &mut extraction.vertices,
        ),
        Geometry::MultiPolygon(polygons) => extract_multi_polygon(
            polygons,
            owner,
            &mut extraction.last_polygon_index,
            &mut extraction.vertices,
        ),
        Geometry::GeometryCollection(members) => {
            extract_geometry_collection(members, owner, extraction, unsupported)?
        }
        Geometry::Unsupported(type_tag) => {
            log::debug!(
                "Skipping unsupported geometry type {} of feature {}",
                type_tag,
                owner.feature_index
            );
            *unsupported += 1;
        }
    }
    Ok(())
}

/// Longitude and latitude from the first two values, elevation from the third if present.
pub fn extract_point(coordinates: &[f64]) -> Result<PointFields> {
    match coordinates {
        [longitude, latitude, rest @ ..] => Ok(PointFields {
            longitude: *longitude,
            latitude: *latitude,
            elevation: rest.first().copied(),
        }),
        _ => Err(Error::MalformedGeometry(format!(
            "Point has {} coordinates, at least two are required",
            coordinates.len()
        ))),
    }
}

fn push_ring(
    ring: &Ring,
    polygon_index: usize,
    owner: &FeatureRef,
    vertices: &mut Vec<PolygonVertexRow>,
) {
    for (point_index, coord) in ring.coords().enumerate() {
        vertices.push(PolygonVertexRow {
            feature_index: owner.feature_index,
            polygon_index,
            point_index: point_index + 1,
            longitude: coord.x,
            latitude: coord.y,
            folder_name: owner.folder_name.map(str::to_string),
        });
    }
}

/// Every ring gets its own polygon index; vertices are emitted as given, closing vertex included.
pub fn extract_polygon(
    rings: &[Ring],
    owner: &FeatureRef,
    last_polygon_index: &mut usize,
    vertices: &mut Vec<PolygonVertexRow>,
) {
    for ring in rings {
        *last_polygon_index += 1;
        push_ring(ring, *last_polygon_index, owner, vertices);
    }
}

/// One polygon index per member polygon. Only the outer ring is emitted, holes are dropped.
pub fn extract_multi_polygon(
    polygons: &[Vec<Ring>],
    owner: &FeatureRef,
    last_polygon_index: &mut usize,
    vertices: &mut Vec<PolygonVertexRow>,
) {
    for rings in polygons {
        *last_polygon_index += 1;
        if let Some(outer) = rings.first() {
            push_ring(outer, *last_polygon_index, owner, vertices);
        }
    }
}

fn extract_geometry_collection(
    members: &[Geometry],
    owner: &FeatureRef,
    extraction: &mut Extraction,
    unsupported: &mut usize,
) -> Result<()> {
    for member in members {
        dispatch(member, owner, extraction, unsupported)?;
    }
    Ok(())
}
