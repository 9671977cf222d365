//! Flattens GeoJSON feature collections and KML documents into feature rows
//! and polygon vertex rows.

pub mod convert;
pub mod error;
pub mod formats;
pub mod geometry;
pub mod rows;
pub mod settings;
pub mod sink;
pub mod source;

pub use convert::{convert, convert_with, Conversion, ConvertOptions, SourceFormat};
pub use error::{Error, FetchError, Result};
