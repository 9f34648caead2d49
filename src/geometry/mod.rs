pub mod extent;
pub mod metrics;

pub use self::extent::{extent_of, Extent};
pub use self::metrics::{metrics_of, summarize, Metrics, SelectionSummary};

use crate::projection::Crs;
use crate::{Error, Result};

use geo::{Coord, LineString, MapCoords, MultiPolygon, Point, Polygon};

use std::fmt;

/// Feature geometry, always in the display CRS once stored
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    Point(Point),
    LineString(LineString),
    Polygon(Polygon),
    MultiPolygon(MultiPolygon),
}

impl Geometry {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::LineString(_) => "Line",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Polygon from an outer ring, closing it if the input is open
    pub fn polygon(mut ring: Vec<Coord>) -> Result<Self> {
        if ring.len() >= 3 && ring.first() != ring.last() {
            ring.push(ring[0]);
        }
        let polygon = Geometry::Polygon(Polygon::new(LineString::new(ring), vec![]));
        polygon.validate()?;
        Ok(polygon)
    }

    pub fn line(coords: Vec<Coord>) -> Result<Self> {
        let line = Geometry::LineString(LineString::new(coords));
        line.validate()?;
        Ok(line)
    }

    pub fn validate(&self) -> Result<()> {
        fn check_ring(ring: &LineString) -> Result<()> {
            if ring.0.len() < 4 {
                return Err(Error::InvalidGeometry(format!(
                    "polygon ring needs at least 4 points, got {}",
                    ring.0.len()
                )));
            }
            if !ring.is_closed() {
                return Err(Error::InvalidGeometry("polygon ring is not closed".to_string()));
            }
            Ok(())
        }

        match self {
            Geometry::Point(_) => Ok(()),
            Geometry::LineString(line) if line.0.len() < 2 => Err(Error::InvalidGeometry(
                format!("line needs at least 2 points, got {}", line.0.len()),
            )),
            Geometry::LineString(_) => Ok(()),
            Geometry::Polygon(polygon) => check_ring(polygon.exterior()),
            Geometry::MultiPolygon(multi) => {
                if multi.0.is_empty() {
                    return Err(Error::InvalidGeometry("empty multipolygon".to_string()));
                }
                multi.0.iter().try_for_each(|p| check_ring(p.exterior()))
            }
        }
    }

    /// Outer rings that bound the geometry, empty for points and lines
    pub fn outer_rings(&self) -> Vec<&LineString> {
        match self {
            Geometry::Point(_) | Geometry::LineString(_) => vec![],
            Geometry::Polygon(polygon) => vec![polygon.exterior()],
            Geometry::MultiPolygon(multi) => multi.0.iter().map(|p| p.exterior()).collect(),
        }
    }

    /// Every coordinate that takes part in the extent of the geometry
    pub fn extent_coords(&self) -> Box<dyn Iterator<Item = Coord> + '_> {
        match self {
            Geometry::Point(p) => Box::new(std::iter::once(p.0)),
            Geometry::LineString(line) => Box::new(line.0.iter().copied()),
            Geometry::Polygon(polygon) => Box::new(polygon.exterior().0.iter().copied()),
            Geometry::MultiPolygon(multi) => Box::new(
                multi
                    .0
                    .iter()
                    .flat_map(|p| p.exterior().0.iter().copied()),
            ),
        }
    }

    pub fn try_map(&self, func: impl Fn(Coord) -> Result<Coord> + Copy) -> Result<Geometry> {
        Ok(match self {
            Geometry::Point(p) => Geometry::Point(p.try_map_coords(func)?),
            Geometry::LineString(l) => Geometry::LineString(l.try_map_coords(func)?),
            Geometry::Polygon(p) => Geometry::Polygon(p.try_map_coords(func)?),
            Geometry::MultiPolygon(m) => Geometry::MultiPolygon(m.try_map_coords(func)?),
        })
    }

    /// Geometry expressed in `crs` moved into the display CRS
    pub fn to_display(&self, crs: &Crs) -> Result<Geometry> {
        self.try_map(|c| crs.to_display(c))
    }
}

/// closed set of attribute value kinds
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Text(s) => write!(f, "{s}"),
            AttributeValue::Number(n) => write!(f, "{n}"),
            AttributeValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

/// Attribute names to values, kept in insertion order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attributes(Vec<(String, AttributeValue)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// replaces an existing value in place, appends otherwise
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_ignore_case(&self, key: &str) -> Option<&AttributeValue> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<AttributeValue> {
        let index = self.0.iter().position(|(k, _)| k == key)?;
        Some(self.0.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<AttributeValue>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Attributes::new();
        for (k, v) in iter {
            attributes.insert(k, v);
        }
        attributes
    }
}

/// Identifier of a feature, unique within a workspace
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureId(pub u64);

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    pub id: Option<FeatureId>,
    pub geometry: Geometry,
    pub attributes: Attributes,
    pub label: Option<String>,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Feature {
            id: None,
            geometry,
            attributes: Attributes::new(),
            label: None,
        }
    }

    pub fn with_attributes(geometry: Geometry, attributes: Attributes) -> Self {
        Feature {
            attributes,
            ..Feature::new(geometry)
        }
    }
}
