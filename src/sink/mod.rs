use anyhow::Context;
use rayon::prelude::*;

use crate::{
    convert::Conversion,
    rows::{FeatureRow, PolygonVertexRow, Record},
};

pub mod memory_sink;
pub mod sqlite_sink;

pub use memory_sink::MemorySink;
pub use sqlite_sink::SqliteSink;

pub const FEATURE_TABLE: &str = "feature";
pub const POLYGON_TABLE: &str = "polygon";

/// Destination for flattened rows, organised in named tables.
pub trait RowSink {
    fn drop_table(&mut self, table_name: &str) -> anyhow::Result<()>;

    /// Append `records` to `table_name`, creating it and any missing columns.
    /// With `unique_keys`, a record replaces the stored row with equal key values.
    fn save(&mut self, unique_keys: &[&str], records: &[Record], table_name: &str) -> anyhow::Result<()>;
}

/// Replace the feature and polygon tables of `sink` with the rows of `conversion`.
pub fn persist(conversion: &Conversion, sink: &mut dyn RowSink) -> anyhow::Result<()> {
    sink.drop_table(FEATURE_TABLE)?;
    sink.drop_table(POLYGON_TABLE)?;

    let features: Vec<Record> = conversion
        .features
        .par_iter()
        .map(FeatureRow::to_record)
        .collect();
    let polygons: Vec<Record> = conversion
        .polygons
        .par_iter()
        .map(PolygonVertexRow::to_record)
        .collect();

    sink.save(&[], &features, FEATURE_TABLE)
        .context("Saving feature rows")?;
    sink.save(&[], &polygons, POLYGON_TABLE)
        .context("Saving polygon rows")?;
    Ok(())
}
