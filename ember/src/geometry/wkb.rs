//! Well-Known Binary reading and writing.
//!
//! The writer produces the canonical form: big-endian, EWKB type flags for Z
//! (`0x8000_0000`) and SRID (`0x2000_0000`), the SRID written only on the
//! outermost geometry. The reader accepts either byte order, EWKB flags
//! (including M, whose values are skipped) and ISO type codes (1000s for Z,
//! 2000s for M, 3000s for ZM).

use bytes::{Buf, BufMut, BytesMut};

use crate::errors::{EmberError, EmberResult, ErrorKind};
use crate::geometry::model::{Coordinate, Geometry, GeometryKind, LineString, Polygon};

const BIG_ENDIAN: u8 = 0;
const LITTLE_ENDIAN: u8 = 1;

const EWKB_Z: u32 = 0x8000_0000;
const EWKB_M: u32 = 0x4000_0000;
const EWKB_SRID: u32 = 0x2000_0000;
const EWKB_FLAGS: u32 = EWKB_Z | EWKB_M | EWKB_SRID;

const MAX_NESTING: usize = 64;

fn malformed(message: &str) -> EmberError {
    EmberError::new(message, ErrorKind::MalformedGeometry)
}

/// Encodes a geometry. `dimensions` is 2 or 3.
///
/// # Errors
/// Returns `MalformedGeometry` for an empty point, which has no binary form.
pub fn write_wkb(geometry: &Geometry, srid: i32, dimensions: u8) -> EmberResult<Vec<u8>> {
    let mut buf = BytesMut::with_capacity(estimate_size(geometry, dimensions));
    write_geometry(&mut buf, geometry, Some(srid).filter(|s| *s != 0), dimensions >= 3)?;
    Ok(buf.to_vec())
}

fn estimate_size(geometry: &Geometry, dimensions: u8) -> usize {
    let ordinate_bytes = if dimensions >= 3 { 24 } else { 16 };
    9 + geometry.num_points() * ordinate_bytes
}

fn write_header(buf: &mut BytesMut, kind: GeometryKind, srid: Option<i32>, three_d: bool) {
    buf.put_u8(BIG_ENDIAN);
    let mut type_code = kind.code();
    if three_d {
        type_code |= EWKB_Z;
    }
    if srid.is_some() {
        type_code |= EWKB_SRID;
    }
    buf.put_u32(type_code);
    if let Some(srid) = srid {
        buf.put_i32(srid);
    }
}

fn write_coordinate(buf: &mut BytesMut, c: &Coordinate, three_d: bool) {
    buf.put_f64(c.x);
    buf.put_f64(c.y);
    if three_d {
        buf.put_f64(c.z);
    }
}

fn write_count(buf: &mut BytesMut, count: usize) -> EmberResult<()> {
    let count = u32::try_from(count)
        .map_err(|_| malformed("Too many elements for a WKB geometry"))?;
    buf.put_u32(count);
    Ok(())
}

fn write_coordinates(buf: &mut BytesMut, line: &LineString, three_d: bool) -> EmberResult<()> {
    write_count(buf, line.coordinates().len())?;
    for c in line.coordinates() {
        write_coordinate(buf, c, three_d);
    }
    Ok(())
}

fn write_polygon_body(buf: &mut BytesMut, polygon: &Polygon, three_d: bool) -> EmberResult<()> {
    write_count(buf, polygon.rings().len())?;
    for ring in polygon.rings() {
        write_coordinates(buf, ring, three_d)?;
    }
    Ok(())
}

fn write_geometry(
    buf: &mut BytesMut,
    geometry: &Geometry,
    srid: Option<i32>,
    three_d: bool,
) -> EmberResult<()> {
    write_header(buf, geometry.kind(), srid, three_d);
    match geometry {
        Geometry::Point(Some(c)) => write_coordinate(buf, c, three_d),
        Geometry::Point(None) => {
            return Err(malformed("Empty Points cannot be represented in WKB"));
        }
        Geometry::LineString(line) => write_coordinates(buf, line, three_d)?,
        Geometry::Polygon(polygon) => write_polygon_body(buf, polygon, three_d)?,
        Geometry::MultiPoint(points) => {
            write_count(buf, points.len())?;
            for c in points {
                write_header(buf, GeometryKind::Point, None, three_d);
                write_coordinate(buf, c, three_d);
            }
        }
        Geometry::MultiLineString(lines) => {
            write_count(buf, lines.len())?;
            for line in lines {
                write_header(buf, GeometryKind::LineString, None, three_d);
                write_coordinates(buf, line, three_d)?;
            }
        }
        Geometry::MultiPolygon(polygons) => {
            write_count(buf, polygons.len())?;
            for polygon in polygons {
                write_header(buf, GeometryKind::Polygon, None, three_d);
                write_polygon_body(buf, polygon, three_d)?;
            }
        }
        Geometry::GeometryCollection(items) => {
            write_count(buf, items.len())?;
            for item in items {
                write_geometry(buf, item, None, three_d)?;
            }
        }
    }
    Ok(())
}

/// Decodes a geometry, returning it with its SRID (0 when absent).
///
/// # Errors
/// Returns `MalformedGeometry` for truncated input, unknown byte orders or
/// type codes, mismatched collection members and trailing bytes.
pub fn read_wkb(bytes: &[u8]) -> EmberResult<(Geometry, i32)> {
    let mut reader = WkbReader { buf: bytes };
    let (geometry, srid) = reader.read_geometry(0)?;
    if reader.buf.has_remaining() {
        return Err(malformed(&format!(
            "{} trailing bytes after WKB geometry",
            reader.buf.remaining()
        )));
    }
    Ok((geometry, srid.unwrap_or(0)))
}

struct Header {
    kind: GeometryKind,
    little_endian: bool,
    has_z: bool,
    has_m: bool,
    srid: Option<i32>,
}

impl Header {
    fn ordinate_count(&self) -> usize {
        2 + usize::from(self.has_z) + usize::from(self.has_m)
    }
}

struct WkbReader<'a> {
    buf: &'a [u8],
}

impl WkbReader<'_> {
    fn ensure(&self, needed: usize) -> EmberResult<()> {
        if self.buf.remaining() < needed {
            return Err(malformed(&format!(
                "Unexpected end of WKB: needed {} bytes, {} left",
                needed,
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    fn read_u32(&mut self, little_endian: bool) -> EmberResult<u32> {
        self.ensure(4)?;
        Ok(if little_endian {
            self.buf.get_u32_le()
        } else {
            self.buf.get_u32()
        })
    }

    fn read_f64(&mut self, little_endian: bool) -> EmberResult<f64> {
        self.ensure(8)?;
        Ok(if little_endian {
            self.buf.get_f64_le()
        } else {
            self.buf.get_f64()
        })
    }

    /// Reads an element count and checks it against the bytes left, each
    /// element taking at least `min_element_size` bytes.
    fn read_count(&mut self, little_endian: bool, min_element_size: usize) -> EmberResult<usize> {
        let count = self.read_u32(little_endian)? as usize;
        if count.saturating_mul(min_element_size) > self.buf.remaining() {
            return Err(malformed(&format!(
                "WKB element count {} exceeds the available data",
                count
            )));
        }
        Ok(count)
    }

    fn read_header(&mut self) -> EmberResult<Header> {
        self.ensure(1)?;
        let little_endian = match self.buf.get_u8() {
            BIG_ENDIAN => false,
            LITTLE_ENDIAN => true,
            other => return Err(malformed(&format!("Unknown WKB byte order {}", other))),
        };
        let raw = self.read_u32(little_endian)?;
        let mut has_z = raw & EWKB_Z != 0;
        let mut has_m = raw & EWKB_M != 0;
        let has_srid = raw & EWKB_SRID != 0;
        let mut code = raw & !EWKB_FLAGS;
        match code / 1000 {
            0 => {}
            1 => has_z = true,
            2 => has_m = true,
            3 => {
                has_z = true;
                has_m = true;
            }
            _ => return Err(malformed(&format!("Unknown WKB geometry type {}", raw))),
        }
        code %= 1000;
        let kind = GeometryKind::from_code(code)
            .ok_or_else(|| malformed(&format!("Unknown WKB geometry type {}", raw)))?;
        let srid = if has_srid {
            Some(self.read_u32(little_endian)? as i32)
        } else {
            None
        };
        Ok(Header {
            kind,
            little_endian,
            has_z,
            has_m,
            srid,
        })
    }

    fn read_coordinate(&mut self, header: &Header) -> EmberResult<Coordinate> {
        let x = self.read_f64(header.little_endian)?;
        let y = self.read_f64(header.little_endian)?;
        let z = if header.has_z {
            self.read_f64(header.little_endian)?
        } else {
            f64::NAN
        };
        if header.has_m {
            self.read_f64(header.little_endian)?;
        }
        Ok(Coordinate { x, y, z })
    }

    fn read_line(&mut self, header: &Header) -> EmberResult<LineString> {
        let count = self.read_count(header.little_endian, 8 * header.ordinate_count())?;
        let mut coordinates = Vec::with_capacity(count);
        for _ in 0..count {
            coordinates.push(self.read_coordinate(header)?);
        }
        LineString::new(coordinates)
    }

    fn read_polygon(&mut self, header: &Header) -> EmberResult<Polygon> {
        let count = self.read_count(header.little_endian, 4)?;
        let mut rings = Vec::with_capacity(count);
        for _ in 0..count {
            rings.push(self.read_line(header)?);
        }
        Polygon::new(rings)
    }

    fn read_member(&mut self, expected: GeometryKind, depth: usize) -> EmberResult<Geometry> {
        let (member, _) = self.read_geometry(depth + 1)?;
        if member.kind() != expected {
            return Err(malformed(&format!(
                "Expected {} inside multi geometry but found {}",
                expected,
                member.kind()
            )));
        }
        Ok(member)
    }

    fn read_geometry(&mut self, depth: usize) -> EmberResult<(Geometry, Option<i32>)> {
        if depth > MAX_NESTING {
            return Err(malformed("WKB geometry nesting too deep"));
        }
        let header = self.read_header()?;
        let geometry = match header.kind {
            GeometryKind::Point => {
                let c = self.read_coordinate(&header)?;
                // NaN x and y is the conventional empty point
                if c.x.is_nan() && c.y.is_nan() {
                    Geometry::Point(None)
                } else {
                    Geometry::Point(Some(c))
                }
            }
            GeometryKind::LineString => Geometry::LineString(self.read_line(&header)?),
            GeometryKind::Polygon => Geometry::Polygon(self.read_polygon(&header)?),
            GeometryKind::MultiPoint => {
                let count = self.read_count(header.little_endian, 5)?;
                let mut points = Vec::with_capacity(count);
                for _ in 0..count {
                    match self.read_member(GeometryKind::Point, depth)? {
                        Geometry::Point(Some(c)) => points.push(c),
                        _ => {
                            return Err(malformed(
                                "Empty points are not supported in MULTIPOINT",
                            ))
                        }
                    }
                }
                Geometry::MultiPoint(points)
            }
            GeometryKind::MultiLineString => {
                let count = self.read_count(header.little_endian, 5)?;
                let mut lines = Vec::with_capacity(count);
                for _ in 0..count {
                    if let Geometry::LineString(line) =
                        self.read_member(GeometryKind::LineString, depth)?
                    {
                        lines.push(line);
                    }
                }
                Geometry::MultiLineString(lines)
            }
            GeometryKind::MultiPolygon => {
                let count = self.read_count(header.little_endian, 5)?;
                let mut polygons = Vec::with_capacity(count);
                for _ in 0..count {
                    if let Geometry::Polygon(polygon) =
                        self.read_member(GeometryKind::Polygon, depth)?
                    {
                        polygons.push(polygon);
                    }
                }
                Geometry::MultiPolygon(polygons)
            }
            GeometryKind::GeometryCollection => {
                let count = self.read_count(header.little_endian, 5)?;
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(self.read_geometry(depth + 1)?.0);
                }
                Geometry::GeometryCollection(items)
            }
        };
        Ok((geometry, header.srid))
    }
}
