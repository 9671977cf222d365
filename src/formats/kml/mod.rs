pub mod tree;
pub mod walk;

pub use tree::{parse_kml, ContainerKind, KmlGeometry, KmlNode, Placemark};
pub use walk::{collect_folders, walk_kml, FolderEntry};
