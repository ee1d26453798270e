use std::fmt::{self, Debug, Display};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::common::ValueType;
use crate::errors::{EmberError, EmberResult, ErrorKind};
use crate::geometry::model::{Coordinate, Geometry, GeometryKind};
use crate::geometry::{wkb, wkt, Envelope};

/// An immutable geometry column value.
///
/// The canonical WKB encoding is produced once, when the value is built, so
/// a value that exists can always be stored. Two values are equal exactly
/// when their canonical encodings are byte-identical; this includes the SRID
/// and the Z ordinates.
///
/// Cloning is cheap: clones share the geometry, its encoding and its cached
/// envelope.
///
/// ```rust
/// use ember::geometry::{Envelope, GeometryValue};
///
/// let a = GeometryValue::from_wkt("POINT (1 2)").unwrap();
/// let b = GeometryValue::from_wkb(a.to_wkb()).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.envelope(), Envelope::of_point(1.0, 2.0));
/// ```
#[derive(Clone)]
pub struct GeometryValue {
    inner: Arc<GeometryValueInner>,
}

struct GeometryValueInner {
    geometry: Geometry,
    srid: i32,
    dimensions: u8,
    wkb: Vec<u8>,
    envelope: OnceCell<Envelope>,
}

impl GeometryValue {
    /// Parses WKT, with an optional `SRID=<n>;` prefix.
    ///
    /// # Errors
    /// Returns `MalformedGeometry` when the text cannot be parsed.
    pub fn from_wkt(text: &str) -> EmberResult<GeometryValue> {
        let (geometry, srid) = wkt::read_wkt(text)?;
        GeometryValue::from_geometry(geometry, srid)
    }

    /// Decodes WKB or EWKB in either byte order.
    ///
    /// # Errors
    /// Returns `MalformedGeometry` for corrupt input.
    pub fn from_wkb(bytes: &[u8]) -> EmberResult<GeometryValue> {
        let (geometry, srid) = wkb::read_wkb(bytes)?;
        GeometryValue::from_geometry(geometry, srid)
    }

    /// Wraps an in-memory geometry.
    ///
    /// # Errors
    /// Returns `MalformedGeometry` when an X or Y ordinate is NaN or the
    /// geometry cannot be encoded.
    pub fn from_geometry(geometry: Geometry, srid: i32) -> EmberResult<GeometryValue> {
        if geometry.any_coordinate(&mut |c: &Coordinate| c.x.is_nan() || c.y.is_nan()) {
            return Err(EmberError::new(
                "Geometry has a NaN X or Y ordinate",
                ErrorKind::MalformedGeometry,
            ));
        }
        let dimensions = if geometry.has_z() { 3 } else { 2 };
        let wkb = wkb::write_wkb(&geometry, srid, dimensions)?;
        Ok(GeometryValue {
            inner: Arc::new(GeometryValueInner {
                geometry,
                srid,
                dimensions,
                wkb,
                envelope: OnceCell::new(),
            }),
        })
    }

    /// The geometry covering `envelope`, see [`Geometry::from_envelope`].
    pub fn from_envelope(envelope: &Envelope, srid: i32) -> EmberResult<GeometryValue> {
        GeometryValue::from_geometry(Geometry::from_envelope(envelope), srid)
    }

    pub fn geometry(&self) -> &Geometry {
        &self.inner.geometry
    }

    pub fn kind(&self) -> GeometryKind {
        self.inner.geometry.kind()
    }

    pub fn srid(&self) -> i32 {
        self.inner.srid
    }

    /// 2, or 3 when any coordinate carries a Z ordinate.
    pub fn dimensions(&self) -> u8 {
        self.inner.dimensions
    }

    pub fn is_empty(&self) -> bool {
        self.inner.geometry.is_empty()
    }

    /// The canonical binary encoding.
    pub fn to_wkb(&self) -> &[u8] {
        &self.inner.wkb
    }

    /// The text form, with the SRID prefix when the SRID is non-zero.
    pub fn to_wkt(&self) -> String {
        wkt::write_wkt(&self.inner.geometry, self.inner.srid, self.inner.dimensions)
    }

    /// The planar bounding rectangle, computed on first use.
    pub fn envelope(&self) -> Envelope {
        *self
            .inner
            .envelope
            .get_or_init(|| self.inner.geometry.envelope())
    }

    /// True when the two bounding rectangles overlap, touching included.
    pub fn intersects_bounding_box(&self, other: &GeometryValue) -> bool {
        self.envelope().intersects(&other.envelope())
    }

    /// A geometry covering both bounding rectangles.
    pub fn envelope_union(&self, other: &GeometryValue) -> EmberResult<GeometryValue> {
        let merged = self.envelope().union(&other.envelope());
        GeometryValue::from_envelope(&merged, self.result_srid(other))
    }

    /// A geometry covering the overlap of the two bounding rectangles.
    ///
    /// When the overlap equals one of the inputs' rectangles that input is
    /// returned as is. Disjoint inputs give an empty collection.
    pub fn envelope_intersection(&self, other: &GeometryValue) -> EmberResult<GeometryValue> {
        let own = self.envelope();
        let theirs = other.envelope();
        let overlap = own.intersection(&theirs);
        if !overlap.is_null() {
            if overlap == own {
                return Ok(self.clone());
            }
            if overlap == theirs {
                return Ok(other.clone());
            }
        }
        GeometryValue::from_envelope(&overlap, self.result_srid(other))
    }

    fn result_srid(&self, other: &GeometryValue) -> i32 {
        if self.srid() == other.srid() {
            self.srid()
        } else {
            0
        }
    }

    pub fn value_type(&self) -> ValueType {
        ValueType::Geometry
    }

    /// Estimated heap footprint in bytes.
    pub fn memory(&self) -> usize {
        self.inner.wkb.len() * 20 + 24
    }

    /// Length of the text form.
    pub fn display_size(&self) -> usize {
        self.to_wkt().len()
    }

    /// True when both handles share the same allocation.
    pub fn ptr_eq(&self, other: &GeometryValue) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for GeometryValue {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.inner.wkb == other.inner.wkb
    }
}

impl Eq for GeometryValue {}

impl Hash for GeometryValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.wkb.hash(state);
    }
}

impl Display for GeometryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_wkt())
    }
}

impl Debug for GeometryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GeometryValue({})", self.to_wkt())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for GeometryValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_bytes(self.to_wkb())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for GeometryValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bytes = <Vec<u8>>::deserialize(deserializer)?;
        GeometryValue::from_wkb(&bytes).map_err(serde::de::Error::custom)
    }
}
