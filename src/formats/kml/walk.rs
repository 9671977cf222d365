use super::tree::{ContainerKind, KmlNode, Placemark};
use crate::{
    error::{Error, Result},
    geometry::ConversionContext,
    rows::{FeatureRow, PolygonVertexRow},
};

/// Folder name of placemarks that sit outside every container.
pub const ROOT_FOLDER_NAME: &str = "Feature";
pub const DEFAULT_DOCUMENT_NAME: &str = "Document";

/// Placemarks that share one enclosing container.
#[derive(Debug)]
pub struct FolderEntry<'a> {
    pub name: String,
    pub placemarks: Vec<&'a Placemark>,
}

fn folder_name(path: &[String]) -> String {
    if path.is_empty() {
        ROOT_FOLDER_NAME.to_string()
    } else {
        path.join("/")
    }
}

/// Group the placemarks below `node` by enclosing container.
///
/// `path` holds the names of the containers above `node`. The direct placemarks
/// of a container form one entry, which precedes the entries of its nested
/// containers. Unnamed documents are called "Document", unnamed folders
/// "Folder {n}" after their position among sibling folders.
pub fn collect_folders<'a>(node: &'a KmlNode, path: Vec<String>) -> Result<Vec<FolderEntry<'a>>> {
    let children = match node {
        KmlNode::Placemark(placemark) => {
            return Ok(vec![FolderEntry {
                name: folder_name(&path),
                placemarks: vec![placemark],
            }])
        }
        KmlNode::Container { children, .. } => children,
    };

    let document_count = children
        .iter()
        .filter(|child| {
            matches!(
                child,
                KmlNode::Container {
                    kind: ContainerKind::Document,
                    ..
                }
            )
        })
        .count();
    if document_count > 1 {
        return Err(Error::InvalidDocument(format!(
            "Found {} Document elements in {}, at most one is supported",
            document_count,
            folder_name(&path)
        )));
    }

    let mut entries = Vec::new();
    let placemarks: Vec<&Placemark> = children
        .iter()
        .filter_map(|child| match child {
            KmlNode::Placemark(placemark) => Some(placemark),
            KmlNode::Container { .. } => None,
        })
        .collect();
    if !placemarks.is_empty() {
        entries.push(FolderEntry {
            name: folder_name(&path),
            placemarks,
        });
    }

    let mut folder_position = 0;
    for child in children {
        let KmlNode::Container { kind, name, .. } = child else {
            continue;
        };
        let segment = match kind {
            ContainerKind::Folder => {
                folder_position += 1;
                name.clone()
                    .unwrap_or_else(|| format!("Folder {folder_position}"))
            }
            ContainerKind::Document | ContainerKind::Root => name
                .clone()
                .unwrap_or_else(|| DEFAULT_DOCUMENT_NAME.to_string()),
        };
        let mut child_path = path.clone();
        child_path.push(segment);
        entries.extend(collect_folders(child, child_path)?);
    }
    Ok(entries)
}

/// One feature row per placemark, folder by folder. A placemark whose geometry
/// cannot be read keeps its row without point or polygon data.
pub fn walk_kml(
    root: &KmlNode,
    context: &mut ConversionContext,
) -> Result<(Vec<FeatureRow>, Vec<PolygonVertexRow>)> {
    let mut rows = Vec::new();
    let mut vertices = Vec::new();
    for folder in collect_folders(root, Vec::new())? {
        for (index, placemark) in folder.placemarks.iter().enumerate() {
            let mut row = FeatureRow::new(placemark.scalar_attributes(), index + 1);
            row.folder_name = Some(folder.name.clone());

            if let Some(kml_geometry) = &placemark.geometry {
                let extracted = match kml_geometry.to_geometry() {
                    Ok(geometry) => context.extract_geometry(&geometry, &mut row, &mut vertices),
                    Err(err) => {
                        context.diagnostics.malformed_geometries += 1;
                        Err(err)
                    }
                };
                if let Err(err) = extracted {
                    log::warn!(
                        "Skipping geometry of placemark {} in folder {}: {}",
                        row.feature_index,
                        folder.name,
                        err
                    );
                }
            }
            rows.push(row);
        }
    }
    Ok((rows, vertices))
}

#[cfg(test)]
mod tests {
    use super::{collect_folders, walk_kml};
    use crate::{
        error::Error,
        formats::kml::tree::parse_kml,
        geometry::{ConversionContext, PolygonIndexing},
        rows::Scalar,
    };

    const NESTED_KML: &str = r#"<kml xmlns="http://www.opengis.net/kml/2.2">
<Document>
  <name>Parks</name>
  <Placemark><name>Entrance</name><Point><coordinates>5,6</coordinates></Point></Placemark>
  <Folder>
    <name>North</name>
    <Placemark><name>Pond</name>
      <Polygon><outerBoundaryIs><LinearRing>
        <coordinates>0,0 2,0 2,2 0,0</coordinates>
      </LinearRing></outerBoundaryIs>
      <innerBoundaryIs><LinearRing><coordinates>1,1 1.5,1 1,1</coordinates></LinearRing></innerBoundaryIs>
      </Polygon>
    </Placemark>
    <Folder>
      <Placemark><name>Bench</name><Point><coordinates>1,1,3</coordinates></Point></Placemark>
      <Placemark><name>Trail</name><LineString><coordinates>0,0 1,1</coordinates></LineString></Placemark>
    </Folder>
  </Folder>
  <Folder>
    <Placemark><name>Broken</name><Point><coordinates>oops</coordinates></Point></Placemark>
  </Folder>
</Document>
</kml>"#;

    #[test]
    fn test_collect_folders_paths() {
        let root = parse_kml(NESTED_KML.as_bytes()).unwrap();
        let folders = collect_folders(&root, Vec::new()).unwrap();
        let summary: Vec<(&str, usize)> = folders
            .iter()
            .map(|folder| (folder.name.as_str(), folder.placemarks.len()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Parks", 1),
                ("Parks/North", 1),
                ("Parks/North/Folder 1", 2),
                ("Parks/Folder 2", 1),
            ]
        );
    }

    #[test]
    fn test_walk_kml_rows() {
        let root = parse_kml(NESTED_KML.as_bytes()).unwrap();
        let mut context = ConversionContext::new(PolygonIndexing::PerFeature);
        let (rows, vertices) = walk_kml(&root, &mut context).unwrap();

        assert_eq!(rows.len(), 5);
        let names: Vec<(Option<&str>, usize)> = rows
            .iter()
            .map(|row| (row.folder_name.as_deref(), row.feature_index))
            .collect();
        assert_eq!(
            names,
            vec![
                (Some("Parks"), 1),
                (Some("Parks/North"), 1),
                (Some("Parks/North/Folder 1"), 1),
                (Some("Parks/North/Folder 1"), 2),
                (Some("Parks/Folder 2"), 1),
            ]
        );
        assert_eq!(rows[0].longitude, Some(5.0));
        assert_eq!(rows[2].elevation, Some(3.0));
        assert_eq!(rows[2].properties["name"], Scalar::from("Bench"));

        // Only the outer boundary of the pond is emitted.
        assert_eq!(vertices.len(), 4);
        assert!(vertices.iter().all(|vertex| vertex.polygon_index == 1
            && vertex.feature_index == 1
            && vertex.folder_name.as_deref() == Some("Parks/North")));

        // The unreadable point keeps its row.
        assert_eq!(rows[4].longitude, None);
        assert_eq!(rows[4].properties["name"], Scalar::from("Broken"));
        assert_eq!(context.diagnostics.malformed_geometries, 1);
        assert_eq!(context.diagnostics.unsupported_geometries, 1);
    }

    #[test]
    fn test_placemark_at_root_uses_default_folder() {
        let root = parse_kml(
            br#"<kml><Placemark><name>Lone</name><Point><coordinates>1,2</coordinates></Point></Placemark></kml>"#,
        )
        .unwrap();
        let mut context = ConversionContext::new(PolygonIndexing::PerFeature);
        let (rows, _) = walk_kml(&root, &mut context).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].folder_name.as_deref(), Some("Feature"));
    }

    #[test]
    fn test_unnamed_document() {
        let root = parse_kml(br#"<kml><Document><Placemark/></Document></kml>"#).unwrap();
        let folders = collect_folders(&root, Vec::new()).unwrap();
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].name, "Document");
    }

    #[test]
    fn test_two_documents_rejected() {
        let root =
            parse_kml(br#"<kml><Document><name>a</name></Document><Document/></kml>"#).unwrap();
        assert!(matches!(
            collect_folders(&root, Vec::new()),
            Err(Error::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_empty_container_yields_nothing() {
        let root = parse_kml(br#"<kml><Document><Folder/></Document></kml>"#).unwrap();
        let mut context = ConversionContext::new(PolygonIndexing::PerFeature);
        let (rows, vertices) = walk_kml(&root, &mut context).unwrap();
        assert!(rows.is_empty());
        assert!(vertices.is_empty());
    }
}
