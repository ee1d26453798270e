//! Well-Known Text reading and writing.
//!
//! Accepts an optional `SRID=<n>;` prefix, case-insensitive tags, the `Z`,
//! `M` and `ZM` dimension qualifiers and `EMPTY` for every kind. M values are
//! dropped on read. The writer emits upper-case tags, a single space between
//! ordinates, `", "` between coordinates and the shortest decimal form that
//! round-trips each `f64`.

use std::fmt::Write as _;
use std::iter::Peekable;
use std::str::Chars;

use crate::errors::{EmberError, EmberResult, ErrorKind};
use crate::geometry::model::{Coordinate, Geometry, GeometryKind, LineString, Polygon};

const MAX_NESTING: usize = 64;

/// Parses WKT, returning the geometry and its SRID (0 when absent).
///
/// # Errors
/// Returns `MalformedGeometry` for any syntax or structural problem.
pub fn read_wkt(text: &str) -> EmberResult<(Geometry, i32)> {
    let (srid, body) = split_srid(text)?;
    let mut parser = WktParser::new(body)?;
    let geometry = parser.parse_tagged(0)?;
    if let Some(token) = parser.peek() {
        return Err(malformed(&format!(
            "Unexpected token {} after geometry in {}",
            token, text
        )));
    }
    Ok((geometry, srid))
}

/// Writes WKT. `dimensions` is 2 or 3; 3 writes a `Z` qualifier and a Z
/// ordinate for every coordinate (`NaN` where it is missing).
pub fn write_wkt(geometry: &Geometry, srid: i32, dimensions: u8) -> String {
    let mut out = String::new();
    if srid != 0 {
        let _ = write!(out, "SRID={};", srid);
    }
    write_tagged(&mut out, geometry, dimensions >= 3);
    out
}

fn malformed(message: &str) -> EmberError {
    EmberError::new(message, ErrorKind::MalformedGeometry)
}

fn split_srid(text: &str) -> EmberResult<(i32, &str)> {
    let trimmed = text.trim_start();
    if trimmed.len() >= 5 && trimmed[..5].eq_ignore_ascii_case("SRID=") {
        let rest = &trimmed[5..];
        let Some(split) = rest.find(';') else {
            return Err(malformed(&format!("Missing ';' after SRID in {}", text)));
        };
        let srid = rest[..split]
            .trim()
            .parse::<i32>()
            .map_err(|e| malformed(&format!("Invalid SRID in {}: {}", text, e)))?;
        return Ok((srid, &rest[split + 1..]));
    }
    Ok((0, text))
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Number(f64),
    LeftParen,
    RightParen,
    Comma,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Word(w) => write!(f, "'{}'", w),
            Token::Number(n) => write!(f, "'{}'", n),
            Token::LeftParen => write!(f, "'('"),
            Token::RightParen => write!(f, "')'"),
            Token::Comma => write!(f, "','"),
        }
    }
}

fn tokenize(text: &str) -> EmberResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars: Peekable<Chars> = text.chars().peekable();
    while let Some(&ch) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LeftParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RightParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                let mut literal = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '-' || c == '+' || c == '.' {
                        literal.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let number = literal
                    .parse::<f64>()
                    .map_err(|_| malformed(&format!("Invalid number '{}'", literal)))?;
                tokens.push(Token::Number(number));
            }
            c if c.is_ascii_alphabetic() => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() {
                        word.push(c.to_ascii_uppercase());
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Word(word));
            }
            other => {
                return Err(malformed(&format!("Unexpected character '{}'", other)));
            }
        }
    }
    Ok(tokens)
}

#[derive(Clone, Copy, PartialEq)]
enum Ordinates {
    /// No qualifier: two or three numbers per coordinate.
    Unqualified,
    Z,
    M,
    ZM,
}

struct WktParser {
    tokens: Vec<Token>,
    position: usize,
}

impl WktParser {
    fn new(text: &str) -> EmberResult<Self> {
        Ok(WktParser {
            tokens: tokenize(text)?,
            position: 0,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> EmberResult<Token> {
        let token = self
            .tokens
            .get(self.position)
            .cloned()
            .ok_or_else(|| malformed("Unexpected end of WKT"))?;
        self.position += 1;
        Ok(token)
    }

    fn expect(&mut self, expected: Token) -> EmberResult<()> {
        let token = self.next()?;
        if token != expected {
            return Err(malformed(&format!(
                "Expected {} but found {}",
                expected, token
            )));
        }
        Ok(())
    }

    fn peek_word(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w == word)
    }

    /// Consumes `EMPTY` or `(`; returns true for `EMPTY`.
    fn open_or_empty(&mut self) -> EmberResult<bool> {
        match self.next()? {
            Token::Word(w) if w == "EMPTY" => Ok(true),
            Token::LeftParen => Ok(false),
            other => Err(malformed(&format!("Expected 'EMPTY' or '(' but found {}", other))),
        }
    }

    /// Consumes `,` and returns true, or `)` and returns false.
    fn comma_or_close(&mut self) -> EmberResult<bool> {
        match self.next()? {
            Token::Comma => Ok(true),
            Token::RightParen => Ok(false),
            other => Err(malformed(&format!("Expected ',' or ')' but found {}", other))),
        }
    }

    fn parse_tagged(&mut self, depth: usize) -> EmberResult<Geometry> {
        if depth > MAX_NESTING {
            return Err(malformed("Geometry nesting too deep"));
        }
        let kind = match self.next()? {
            Token::Word(w) => GeometryKind::from_wkt_name(&w)
                .ok_or_else(|| malformed(&format!("Unknown geometry type '{}'", w)))?,
            other => return Err(malformed(&format!("Expected geometry type but found {}", other))),
        };
        let ordinates = self.parse_qualifier();

        match kind {
            GeometryKind::Point => {
                if self.open_or_empty()? {
                    return Ok(Geometry::Point(None));
                }
                let coordinate = self.parse_coordinate(ordinates)?;
                self.expect(Token::RightParen)?;
                Ok(Geometry::Point(Some(coordinate)))
            }
            GeometryKind::LineString => Ok(Geometry::LineString(self.parse_line(ordinates)?)),
            GeometryKind::Polygon => Ok(Geometry::Polygon(self.parse_polygon(ordinates)?)),
            GeometryKind::MultiPoint => {
                let mut points = Vec::new();
                if self.open_or_empty()? {
                    return Ok(Geometry::MultiPoint(points));
                }
                loop {
                    // both MULTIPOINT ((1 2), (3 4)) and MULTIPOINT (1 2, 3 4)
                    if matches!(self.peek(), Some(Token::LeftParen)) {
                        self.next()?;
                        points.push(self.parse_coordinate(ordinates)?);
                        self.expect(Token::RightParen)?;
                    } else if self.peek_word("EMPTY") {
                        return Err(malformed("Empty points are not supported in MULTIPOINT"));
                    } else {
                        points.push(self.parse_coordinate(ordinates)?);
                    }
                    if !self.comma_or_close()? {
                        break;
                    }
                }
                Ok(Geometry::MultiPoint(points))
            }
            GeometryKind::MultiLineString => {
                let mut lines = Vec::new();
                if self.open_or_empty()? {
                    return Ok(Geometry::MultiLineString(lines));
                }
                loop {
                    lines.push(self.parse_line(ordinates)?);
                    if !self.comma_or_close()? {
                        break;
                    }
                }
                Ok(Geometry::MultiLineString(lines))
            }
            GeometryKind::MultiPolygon => {
                let mut polygons = Vec::new();
                if self.open_or_empty()? {
                    return Ok(Geometry::MultiPolygon(polygons));
                }
                loop {
                    polygons.push(self.parse_polygon(ordinates)?);
                    if !self.comma_or_close()? {
                        break;
                    }
                }
                Ok(Geometry::MultiPolygon(polygons))
            }
            GeometryKind::GeometryCollection => {
                let mut items = Vec::new();
                if self.open_or_empty()? {
                    return Ok(Geometry::GeometryCollection(items));
                }
                loop {
                    items.push(self.parse_tagged(depth + 1)?);
                    if !self.comma_or_close()? {
                        break;
                    }
                }
                Ok(Geometry::GeometryCollection(items))
            }
        }
    }

    fn parse_qualifier(&mut self) -> Ordinates {
        let ordinates = match self.peek() {
            Some(Token::Word(w)) if w == "Z" => Ordinates::Z,
            Some(Token::Word(w)) if w == "M" => Ordinates::M,
            Some(Token::Word(w)) if w == "ZM" => Ordinates::ZM,
            _ => return Ordinates::Unqualified,
        };
        self.position += 1;
        ordinates
    }

    fn parse_number(&mut self) -> EmberResult<f64> {
        match self.next()? {
            Token::Number(n) => Ok(n),
            Token::Word(w) if w == "NAN" => Ok(f64::NAN),
            Token::Word(w) if w == "INF" || w == "INFINITY" => Ok(f64::INFINITY),
            other => Err(malformed(&format!("Expected number but found {}", other))),
        }
    }

    fn next_is_number(&self) -> bool {
        match self.peek() {
            Some(Token::Number(_)) => true,
            Some(Token::Word(w)) => w == "NAN" || w == "INF" || w == "INFINITY",
            _ => false,
        }
    }

    fn parse_coordinate(&mut self, ordinates: Ordinates) -> EmberResult<Coordinate> {
        let x = self.parse_number()?;
        let y = self.parse_number()?;
        match ordinates {
            Ordinates::Unqualified => {
                if self.next_is_number() {
                    let z = self.parse_number()?;
                    Ok(Coordinate::new_3d(x, y, z))
                } else {
                    Ok(Coordinate::new(x, y))
                }
            }
            Ordinates::Z => {
                let z = self.parse_number()?;
                Ok(Coordinate::new_3d(x, y, z))
            }
            Ordinates::M => {
                self.parse_number()?;
                Ok(Coordinate::new(x, y))
            }
            Ordinates::ZM => {
                let z = self.parse_number()?;
                self.parse_number()?;
                Ok(Coordinate::new_3d(x, y, z))
            }
        }
    }

    fn parse_coordinates(&mut self, ordinates: Ordinates) -> EmberResult<Vec<Coordinate>> {
        let mut coordinates = Vec::new();
        if self.open_or_empty()? {
            return Ok(coordinates);
        }
        loop {
            coordinates.push(self.parse_coordinate(ordinates)?);
            if !self.comma_or_close()? {
                break;
            }
        }
        Ok(coordinates)
    }

    fn parse_line(&mut self, ordinates: Ordinates) -> EmberResult<LineString> {
        LineString::new(self.parse_coordinates(ordinates)?)
    }

    fn parse_polygon(&mut self, ordinates: Ordinates) -> EmberResult<Polygon> {
        let mut rings = Vec::new();
        if self.open_or_empty()? {
            return Ok(Polygon::empty());
        }
        loop {
            rings.push(self.parse_line(ordinates)?);
            if !self.comma_or_close()? {
                break;
            }
        }
        Polygon::new(rings)
    }
}

fn write_tagged(out: &mut String, geometry: &Geometry, three_d: bool) {
    out.push_str(geometry.kind().wkt_name());
    if has_no_parts(geometry) {
        out.push_str(" EMPTY");
        return;
    }
    if three_d {
        out.push_str(" Z");
    }
    out.push(' ');
    match geometry {
        Geometry::Point(Some(c)) => {
            out.push('(');
            write_coordinate(out, c, three_d);
            out.push(')');
        }
        Geometry::Point(None) => {}
        Geometry::LineString(line) => write_line(out, line, three_d),
        Geometry::Polygon(polygon) => write_polygon(out, polygon, three_d),
        Geometry::MultiPoint(points) => {
            out.push('(');
            for (i, c) in points.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push('(');
                write_coordinate(out, c, three_d);
                out.push(')');
            }
            out.push(')');
        }
        Geometry::MultiLineString(lines) => {
            out.push('(');
            for (i, line) in lines.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_line(out, line, three_d);
            }
            out.push(')');
        }
        Geometry::MultiPolygon(polygons) => {
            out.push('(');
            for (i, polygon) in polygons.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_polygon(out, polygon, three_d);
            }
            out.push(')');
        }
        Geometry::GeometryCollection(items) => {
            out.push('(');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_tagged(out, item, three_d);
            }
            out.push(')');
        }
    }
}

fn has_no_parts(geometry: &Geometry) -> bool {
    match geometry {
        Geometry::Point(c) => c.is_none(),
        Geometry::LineString(line) => line.is_empty(),
        Geometry::Polygon(polygon) => polygon.is_empty(),
        Geometry::MultiPoint(points) => points.is_empty(),
        Geometry::MultiLineString(lines) => lines.is_empty(),
        Geometry::MultiPolygon(polygons) => polygons.is_empty(),
        Geometry::GeometryCollection(items) => items.is_empty(),
    }
}

fn write_line(out: &mut String, line: &LineString, three_d: bool) {
    if line.is_empty() {
        out.push_str("EMPTY");
        return;
    }
    out.push('(');
    for (i, c) in line.coordinates().iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_coordinate(out, c, three_d);
    }
    out.push(')');
}

fn write_polygon(out: &mut String, polygon: &Polygon, three_d: bool) {
    if polygon.is_empty() {
        out.push_str("EMPTY");
        return;
    }
    out.push('(');
    for (i, ring) in polygon.rings().iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_line(out, ring, three_d);
    }
    out.push(')');
}

fn write_coordinate(out: &mut String, c: &Coordinate, three_d: bool) {
    // f64 Display is the shortest representation that parses back exactly
    let _ = write!(out, "{} {}", c.x, c.y);
    if three_d {
        let _ = write!(out, " {}", c.z);
    }
}
