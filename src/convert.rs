use std::fmt;

use crate::{
    error::{Error, Result},
    formats::{geojson, kml},
    geometry::{ConversionContext, Diagnostics, PolygonIndexing},
    rows::{FeatureRow, PolygonVertexRow},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    GeoJson,
    Kml,
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::GeoJson => write!(f, "GeoJSON"),
            SourceFormat::Kml => write!(f, "KML"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertOptions {
    pub polygon_indexing: PolygonIndexing,
}

/// The flattened rows of one document.
#[derive(Debug)]
pub struct Conversion {
    pub format: SourceFormat,
    pub features: Vec<FeatureRow>,
    pub polygons: Vec<PolygonVertexRow>,
    pub diagnostics: Diagnostics,
}

fn try_geojson(raw: &[u8], options: &ConvertOptions) -> Result<Conversion> {
    let document = geojson::parse_feature_collection(raw)?;
    let mut context = ConversionContext::new(options.polygon_indexing);
    let (features, polygons) = geojson::walk_geojson(&document, &mut context)?;
    Ok(Conversion {
        format: SourceFormat::GeoJson,
        features,
        polygons,
        diagnostics: context.diagnostics,
    })
}

fn try_kml(raw: &[u8], options: &ConvertOptions) -> Result<Conversion> {
    let root = kml::parse_kml(raw)?;
    let mut context = ConversionContext::new(options.polygon_indexing);
    let (features, polygons) = kml::walk_kml(&root, &mut context)?;
    Ok(Conversion {
        format: SourceFormat::Kml,
        features,
        polygons,
        diagnostics: context.diagnostics,
    })
}

/// Flatten `raw` with default options.
pub fn convert(raw: &[u8]) -> Result<Conversion> {
    convert_with(raw, &ConvertOptions::default())
}

/// Flatten `raw`, read as a GeoJSON feature collection or, failing that, as KML.
pub fn convert_with(raw: &[u8], options: &ConvertOptions) -> Result<Conversion> {
    let geojson_err = match try_geojson(raw, options) {
        Ok(conversion) => return Ok(conversion),
        Err(err) => err,
    };
    log::debug!("Not a GeoJSON feature collection ({}), trying KML", geojson_err);
    match try_kml(raw, options) {
        Ok(conversion) => Ok(conversion),
        Err(kml_err) => Err(Error::InvalidDocument(format!(
            "Neither a GeoJSON feature collection ({geojson_err}) nor a KML document ({kml_err})"
        ))),
    }
}
