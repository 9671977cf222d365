pub mod feature_row;
pub mod scalar;

pub use feature_row::{FeatureRow, PolygonVertexRow, Record};
pub use scalar::Scalar;
