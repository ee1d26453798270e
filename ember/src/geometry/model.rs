//! Planar geometry model.
//!
//! The model covers the seven OGC simple-feature kinds: points, line strings,
//! polygons (with holes), their multi variants and heterogeneous collections.
//! Coordinates carry an optional Z ordinate; `NaN` marks a missing Z.

use std::fmt::{self, Display};

use crate::errors::{EmberError, EmberResult, ErrorKind};
use crate::geometry::Envelope;

/// A planar coordinate with an optional third ordinate.
#[derive(Debug, Clone, Copy)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
    /// `NaN` when the coordinate is two-dimensional.
    pub z: f64,
}

impl Coordinate {
    /// Creates a 2D coordinate.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: f64::NAN }
    }

    /// Creates a 3D coordinate.
    pub fn new_3d(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn has_z(&self) -> bool {
        !self.z.is_nan()
    }

    /// Compares only the planar ordinates.
    pub fn equals_2d(&self, other: &Coordinate) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        self.equals_2d(other) && (self.z == other.z || (self.z.is_nan() && other.z.is_nan()))
    }
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_z() {
            write!(f, "({}, {}, {})", self.x, self.y, self.z)
        } else {
            write!(f, "({}, {})", self.x, self.y)
        }
    }
}

/// The kind of a geometry together with its OGC type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
}

impl GeometryKind {
    /// The OGC well-known type code (1..=7).
    pub fn code(&self) -> u32 {
        match self {
            GeometryKind::Point => 1,
            GeometryKind::LineString => 2,
            GeometryKind::Polygon => 3,
            GeometryKind::MultiPoint => 4,
            GeometryKind::MultiLineString => 5,
            GeometryKind::MultiPolygon => 6,
            GeometryKind::GeometryCollection => 7,
        }
    }

    pub fn from_code(code: u32) -> Option<GeometryKind> {
        match code {
            1 => Some(GeometryKind::Point),
            2 => Some(GeometryKind::LineString),
            3 => Some(GeometryKind::Polygon),
            4 => Some(GeometryKind::MultiPoint),
            5 => Some(GeometryKind::MultiLineString),
            6 => Some(GeometryKind::MultiPolygon),
            7 => Some(GeometryKind::GeometryCollection),
            _ => None,
        }
    }

    /// The upper-case WKT tag.
    pub fn wkt_name(&self) -> &'static str {
        match self {
            GeometryKind::Point => "POINT",
            GeometryKind::LineString => "LINESTRING",
            GeometryKind::Polygon => "POLYGON",
            GeometryKind::MultiPoint => "MULTIPOINT",
            GeometryKind::MultiLineString => "MULTILINESTRING",
            GeometryKind::MultiPolygon => "MULTIPOLYGON",
            GeometryKind::GeometryCollection => "GEOMETRYCOLLECTION",
        }
    }

    pub fn from_wkt_name(name: &str) -> Option<GeometryKind> {
        match name.to_ascii_uppercase().as_str() {
            "POINT" => Some(GeometryKind::Point),
            "LINESTRING" => Some(GeometryKind::LineString),
            "POLYGON" => Some(GeometryKind::Polygon),
            "MULTIPOINT" => Some(GeometryKind::MultiPoint),
            "MULTILINESTRING" => Some(GeometryKind::MultiLineString),
            "MULTIPOLYGON" => Some(GeometryKind::MultiPolygon),
            "GEOMETRYCOLLECTION" => Some(GeometryKind::GeometryCollection),
            _ => None,
        }
    }
}

impl Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wkt_name())
    }
}

/// An ordered sequence of coordinates: either empty or at least two points.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineString {
    coordinates: Vec<Coordinate>,
}

impl LineString {
    /// Creates a line string.
    ///
    /// # Errors
    /// Returns `MalformedGeometry` for exactly one coordinate.
    pub fn new(coordinates: Vec<Coordinate>) -> EmberResult<Self> {
        if coordinates.len() == 1 {
            return Err(EmberError::new(
                "Invalid number of points in LineString (found 1 - must be 0 or >= 2)",
                ErrorKind::MalformedGeometry,
            ));
        }
        Ok(Self { coordinates })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn coordinates(&self) -> &[Coordinate] {
        &self.coordinates
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// First and last coordinates coincide in the plane.
    pub fn is_closed(&self) -> bool {
        match (self.coordinates.first(), self.coordinates.last()) {
            (Some(first), Some(last)) => first.equals_2d(last),
            _ => false,
        }
    }

    fn validate_ring(&self) -> EmberResult<()> {
        if self.is_empty() {
            return Ok(());
        }
        if !self.is_closed() {
            return Err(EmberError::new(
                "Points of LinearRing do not form a closed linestring",
                ErrorKind::MalformedGeometry,
            ));
        }
        if self.coordinates.len() < 4 {
            return Err(EmberError::new(
                &format!(
                    "Invalid number of points in LinearRing (found {} - must be 0 or >= 4)",
                    self.coordinates.len()
                ),
                ErrorKind::MalformedGeometry,
            ));
        }
        Ok(())
    }
}

/// A polygon: an exterior ring followed by zero or more holes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon {
    rings: Vec<LineString>,
}

impl Polygon {
    /// Creates a polygon from its rings, exterior first.
    ///
    /// # Errors
    /// Returns `MalformedGeometry` when a ring is not closed, has fewer than
    /// four points, or when holes are given for an empty exterior.
    pub fn new(rings: Vec<LineString>) -> EmberResult<Self> {
        for ring in &rings {
            ring.validate_ring()?;
        }
        if let Some(exterior) = rings.first() {
            if exterior.is_empty() && rings.iter().skip(1).any(|r| !r.is_empty()) {
                return Err(EmberError::new(
                    "Shell is empty but holes are not",
                    ErrorKind::MalformedGeometry,
                ));
            }
        }
        // an empty exterior means an empty polygon
        if rings.first().is_some_and(|r| r.is_empty()) {
            return Ok(Self::default());
        }
        Ok(Self { rings })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn exterior(&self) -> Option<&LineString> {
        self.rings.first()
    }

    pub fn holes(&self) -> &[LineString] {
        if self.rings.is_empty() {
            &[]
        } else {
            &self.rings[1..]
        }
    }

    pub fn rings(&self) -> &[LineString] {
        &self.rings
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }
}

/// A planar geometry.
///
/// ```rust
/// use ember::geometry::{Coordinate, Envelope, Geometry, LineString};
///
/// let line = LineString::new(vec![Coordinate::new(0.0, 0.0), Coordinate::new(2.0, 3.0)]).unwrap();
/// let geometry = Geometry::LineString(line);
/// assert_eq!(geometry.envelope(), Envelope::new(0.0, 2.0, 0.0, 3.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// `None` is the empty point.
    Point(Option<Coordinate>),
    LineString(LineString),
    Polygon(Polygon),
    MultiPoint(Vec<Coordinate>),
    MultiLineString(Vec<LineString>),
    MultiPolygon(Vec<Polygon>),
    GeometryCollection(Vec<Geometry>),
}

impl Geometry {
    pub fn point(x: f64, y: f64) -> Self {
        Geometry::Point(Some(Coordinate::new(x, y)))
    }

    /// A closed rectangular polygon covering the envelope. Degenerate
    /// envelopes give a point or a two-point line, the null envelope an
    /// empty collection.
    pub fn from_envelope(envelope: &Envelope) -> Self {
        if envelope.is_null() {
            return Geometry::GeometryCollection(Vec::new());
        }
        if envelope.is_point() {
            return Geometry::point(envelope.min_x, envelope.min_y);
        }
        if envelope.min_x == envelope.max_x || envelope.min_y == envelope.max_y {
            return Geometry::LineString(LineString {
                coordinates: vec![
                    Coordinate::new(envelope.min_x, envelope.min_y),
                    Coordinate::new(envelope.max_x, envelope.max_y),
                ],
            });
        }
        let ring = LineString {
            coordinates: vec![
                Coordinate::new(envelope.min_x, envelope.min_y),
                Coordinate::new(envelope.min_x, envelope.max_y),
                Coordinate::new(envelope.max_x, envelope.max_y),
                Coordinate::new(envelope.max_x, envelope.min_y),
                Coordinate::new(envelope.min_x, envelope.min_y),
            ],
        };
        Geometry::Polygon(Polygon { rings: vec![ring] })
    }

    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point(_) => GeometryKind::Point,
            Geometry::LineString(_) => GeometryKind::LineString,
            Geometry::Polygon(_) => GeometryKind::Polygon,
            Geometry::MultiPoint(_) => GeometryKind::MultiPoint,
            Geometry::MultiLineString(_) => GeometryKind::MultiLineString,
            Geometry::MultiPolygon(_) => GeometryKind::MultiPolygon,
            Geometry::GeometryCollection(_) => GeometryKind::GeometryCollection,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Geometry::Point(c) => c.is_none(),
            Geometry::LineString(l) => l.is_empty(),
            Geometry::Polygon(p) => p.is_empty(),
            Geometry::MultiPoint(points) => points.is_empty(),
            Geometry::MultiLineString(lines) => lines.iter().all(LineString::is_empty),
            Geometry::MultiPolygon(polygons) => polygons.iter().all(Polygon::is_empty),
            Geometry::GeometryCollection(items) => items.iter().all(Geometry::is_empty),
        }
    }

    /// Calls `visit` for every coordinate until it returns `true`.
    /// Returns whether any call returned `true`.
    pub fn any_coordinate<F>(&self, visit: &mut F) -> bool
    where
        F: FnMut(&Coordinate) -> bool,
    {
        match self {
            Geometry::Point(Some(c)) => visit(c),
            Geometry::Point(None) => false,
            Geometry::LineString(l) => l.coordinates.iter().any(|c| visit(c)),
            Geometry::Polygon(p) => p
                .rings
                .iter()
                .any(|r| r.coordinates.iter().any(|c| visit(c))),
            Geometry::MultiPoint(points) => points.iter().any(|c| visit(c)),
            Geometry::MultiLineString(lines) => lines
                .iter()
                .any(|l| l.coordinates.iter().any(|c| visit(c))),
            Geometry::MultiPolygon(polygons) => polygons.iter().any(|p| {
                p.rings
                    .iter()
                    .any(|r| r.coordinates.iter().any(|c| visit(c)))
            }),
            Geometry::GeometryCollection(items) => items.iter().any(|g| g.any_coordinate(visit)),
        }
    }

    /// Number of coordinates in the geometry.
    pub fn num_points(&self) -> usize {
        let mut count = 0;
        self.any_coordinate(&mut |_: &Coordinate| {
            count += 1;
            false
        });
        count
    }

    /// True when at least one coordinate carries a Z ordinate.
    pub fn has_z(&self) -> bool {
        self.any_coordinate(&mut |c: &Coordinate| c.has_z())
    }

    /// The planar bounding rectangle; null for empty geometries.
    pub fn envelope(&self) -> Envelope {
        let mut envelope = Envelope::null();
        self.any_coordinate(&mut |c: &Coordinate| {
            envelope.expand_to_include_point(c.x, c.y);
            false
        });
        envelope
    }
}
