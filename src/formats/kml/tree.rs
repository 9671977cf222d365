use indexmap::IndexMap;
use xml::reader::{ParserConfig, XmlEvent};

use crate::{
    error::{Error, Result},
    geometry::{
        shape::{ring_from_positions, Position},
        Geometry,
    },
    rows::Scalar,
};

/// Generic XML element, tags matched by local name.
#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |child| child.name == name)
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Text of the named child, `None` when absent or empty.
    fn child_text(&self, name: &str) -> Option<String> {
        self.child(name)
            .map(|child| child.text.clone())
            .filter(|text| !text.is_empty())
    }
}

fn parse_elements(raw: &[u8]) -> Result<Element> {
    let reader = ParserConfig::new()
        .trim_whitespace(true)
        .cdata_to_characters(true)
        .ignore_comments(true)
        .create_reader(raw);

    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;
    for event in reader {
        let event = event.map_err(|err| Error::InvalidDocument(format!("Not valid XML: {err}")))?;
        match event {
            XmlEvent::StartElement {
                name, attributes, ..
            } => stack.push(Element {
                name: name.local_name,
                attributes: attributes
                    .into_iter()
                    .map(|attribute| (attribute.name.local_name, attribute.value))
                    .collect(),
                ..Default::default()
            }),
            XmlEvent::EndElement { .. } => {
                if let Some(element) = stack.pop() {
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => root = Some(element),
                    }
                }
            }
            XmlEvent::Characters(text) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            _ => {}
        }
    }
    root.ok_or_else(|| Error::InvalidDocument("XML document has no root element".to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// The `<kml>` element itself.
    Root,
    Document,
    Folder,
}

/// A node of the KML feature hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub enum KmlNode {
    Container {
        kind: ContainerKind,
        name: Option<String>,
        children: Vec<KmlNode>,
    },
    Placemark(Placemark),
}

impl KmlNode {
    /// Child features of a container, empty for a placemark.
    pub fn children(&self) -> &[KmlNode] {
        match self {
            KmlNode::Container { children, .. } => children,
            KmlNode::Placemark(_) => &[],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Placemark {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub snippet: Option<String>,
    pub style_url: Option<String>,
    pub visibility: Option<String>,
    pub open: Option<String>,
    /// `Data` and `SimpleData` name/value pairs in document order.
    pub extended_data: Vec<(String, String)>,
    pub geometry: Option<KmlGeometry>,
}

fn parse_flag(raw: &str) -> Option<i64> {
    match raw {
        "1" | "true" => Some(1),
        "0" | "false" => Some(0),
        _ => None,
    }
}

impl Placemark {
    /// The scalar fields of the placemark as columns. Fields whose value cannot
    /// be read as their type are left out.
    pub fn scalar_attributes(&self) -> IndexMap<String, Scalar> {
        let mut attributes = IndexMap::new();
        let text_fields = [
            ("id", &self.id),
            ("name", &self.name),
            ("description", &self.description),
            ("address", &self.address),
            ("phone_number", &self.phone_number),
            ("snippet", &self.snippet),
            ("style_url", &self.style_url),
        ];
        for (key, value) in text_fields {
            if let Some(value) = value {
                attributes.insert(key.to_string(), Scalar::Text(value.clone()));
            }
        }
        for (key, value) in [("visibility", &self.visibility), ("open", &self.open)] {
            let Some(raw) = value else { continue };
            match parse_flag(raw) {
                Some(flag) => {
                    attributes.insert(key.to_string(), Scalar::Integer(flag));
                }
                None => log::debug!("Omitting placemark attribute {}: {:?} is not a flag", key, raw),
            }
        }
        for (key, value) in &self.extended_data {
            attributes.insert(key.clone(), Scalar::Text(value.clone()));
        }
        attributes
    }
}

/// KML geometry with its coordinates still in text form.
#[derive(Debug, Clone, PartialEq)]
pub enum KmlGeometry {
    Point {
        coordinates: String,
    },
    /// Only the outer boundary; inner boundaries produce no rows.
    Polygon {
        outer: Option<String>,
    },
    MultiGeometry(Vec<KmlGeometry>),
    /// A geometry element without row representation, e.g. `LineString`.
    Other(String),
}

/// Parse whitespace separated `lon,lat[,alt]` tuples.
pub fn parse_coordinates(text: &str) -> Result<Vec<Position>> {
    text.split_whitespace()
        .map(|tuple| {
            tuple
                .split(',')
                .filter(|value| !value.is_empty())
                .map(|value| {
                    value.parse::<f64>().map_err(|_| {
                        Error::MalformedGeometry(format!("Invalid coordinate tuple {tuple:?}"))
                    })
                })
                .collect::<Result<Position>>()
        })
        .collect()
}

impl KmlGeometry {
    /// Classify into the shared geometry model. Only the outer boundary of a
    /// polygon is read.
    pub fn to_geometry(&self) -> Result<Geometry> {
        match self {
            KmlGeometry::Point { coordinates } => parse_coordinates(coordinates)?
                .into_iter()
                .next()
                .map(Geometry::Point)
                .ok_or_else(|| Error::MalformedGeometry("Point has no coordinates".to_string())),
            KmlGeometry::Polygon { outer } => {
                let outer = outer.as_deref().ok_or_else(|| {
                    Error::MalformedGeometry("Polygon has no outer boundary".to_string())
                })?;
                let ring = ring_from_positions(&parse_coordinates(outer)?)?;
                Ok(Geometry::Polygon(vec![ring]))
            }
            KmlGeometry::MultiGeometry(members) => {
                let geometries = members
                    .iter()
                    .map(KmlGeometry::to_geometry)
                    .collect::<Result<Vec<Geometry>>>()?;
                let all_polygons = !geometries.is_empty()
                    && geometries
                        .iter()
                        .all(|geometry| matches!(geometry, Geometry::Polygon(_)));
                if all_polygons {
                    Ok(Geometry::MultiPolygon(
                        geometries
                            .into_iter()
                            .filter_map(|geometry| match geometry {
                                Geometry::Polygon(rings) => Some(rings),
                                _ => None,
                            })
                            .collect(),
                    ))
                } else {
                    Ok(Geometry::GeometryCollection(geometries))
                }
            }
            KmlGeometry::Other(type_tag) => Ok(Geometry::Unsupported(type_tag.clone())),
        }
    }
}

fn geometry_from(element: &Element) -> Option<KmlGeometry> {
    match element.name.as_str() {
        "Point" => Some(KmlGeometry::Point {
            coordinates: element.child_text("coordinates").unwrap_or_default(),
        }),
        "Polygon" => Some(KmlGeometry::Polygon {
            outer: element
                .child("outerBoundaryIs")
                .and_then(|boundary| boundary.child("LinearRing"))
                .and_then(|ring| ring.child_text("coordinates")),
        }),
        "MultiGeometry" => Some(KmlGeometry::MultiGeometry(
            element.children.iter().filter_map(geometry_from).collect(),
        )),
        "LineString" | "LinearRing" | "Model" | "Track" | "MultiTrack" => {
            Some(KmlGeometry::Other(element.name.clone()))
        }
        _ => None,
    }
}

fn extended_data_from(element: &Element) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let Some(extended_data) = element.child("ExtendedData") else {
        return pairs;
    };
    for entry in &extended_data.children {
        match entry.name.as_str() {
            "Data" => {
                if let Some(key) = entry.attribute("name") {
                    pairs.push((key.to_string(), entry.child_text("value").unwrap_or_default()));
                }
            }
            "SchemaData" => {
                for simple_data in entry.children_named("SimpleData") {
                    if let Some(key) = simple_data.attribute("name") {
                        pairs.push((key.to_string(), simple_data.text.clone()));
                    }
                }
            }
            _ => {}
        }
    }
    pairs
}

fn placemark_from(element: &Element) -> Placemark {
    Placemark {
        id: element.attribute("id").map(str::to_string),
        name: element.child_text("name"),
        description: element.child_text("description"),
        address: element.child_text("address"),
        phone_number: element.child_text("phoneNumber"),
        snippet: element.child_text("Snippet"),
        style_url: element.child_text("styleUrl"),
        visibility: element.child_text("visibility"),
        open: element.child_text("open"),
        extended_data: extended_data_from(element),
        geometry: element.children.iter().find_map(geometry_from),
    }
}

fn container_from(kind: ContainerKind, element: &Element) -> KmlNode {
    KmlNode::Container {
        kind,
        name: element.child_text("name"),
        children: element.children.iter().filter_map(node_from).collect(),
    }
}

fn node_from(element: &Element) -> Option<KmlNode> {
    match element.name.as_str() {
        "Document" => Some(container_from(ContainerKind::Document, element)),
        "Folder" => Some(container_from(ContainerKind::Folder, element)),
        "Placemark" => Some(KmlNode::Placemark(placemark_from(element))),
        _ => None,
    }
}

/// Parse a KML document into its feature hierarchy, rooted at the `<kml>` element.
pub fn parse_kml(raw: &[u8]) -> Result<KmlNode> {
    let root = parse_elements(raw)?;
    if root.name != "kml" {
        return Err(Error::InvalidDocument(format!(
            "Root element is <{}>, expected <kml>",
            root.name
        )));
    }
    Ok(container_from(ContainerKind::Root, &root))
}
