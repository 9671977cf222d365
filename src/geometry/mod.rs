pub mod extract;
pub mod shape;

pub use extract::{ConversionContext, Diagnostics, PolygonIndexing};
pub use shape::Geometry;
