//! Reduced-precision index keys.
//!
//! Row envelopes are computed in `f64` but persisted as four `f32` bounds.
//! Every conversion rounds outward: lower bounds towards negative infinity
//! and upper bounds towards positive infinity, so a stored rectangle always
//! contains the exact envelope it was derived from. A query rectangle is
//! widened the same way. Together this rules out false negatives: if two
//! `f64` envelopes overlap, their widened keys overlap too.

use std::cmp::Ordering;
use std::fmt::{self, Display};

use ember::common::RowId;
use ember::geometry::Envelope;
use serde::{Deserialize, Serialize};

/// Largest `f32` not greater than `value`.
pub fn round_down(value: f64) -> f32 {
    let narrowed = value as f32;
    if f64::from(narrowed) > value {
        next_down(narrowed)
    } else {
        narrowed
    }
}

/// Smallest `f32` not less than `value`.
pub fn round_up(value: f64) -> f32 {
    let narrowed = value as f32;
    if f64::from(narrowed) < value {
        next_up(narrowed)
    } else {
        narrowed
    }
}

fn next_up(value: f32) -> f32 {
    if value.is_nan() || value == f32::INFINITY {
        return value;
    }
    if value == 0.0 {
        return f32::from_bits(1);
    }
    let bits = value.to_bits();
    if value > 0.0 {
        f32::from_bits(bits + 1)
    } else {
        f32::from_bits(bits - 1)
    }
}

fn next_down(value: f32) -> f32 {
    -next_up(-value)
}

/// An axis-aligned rectangle with single precision bounds.
///
/// A rectangle with `min > max` on an axis is empty and intersects nothing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KeyRect {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl KeyRect {
    pub fn new(min_x: f32, max_x: f32, min_y: f32, max_y: f32) -> Self {
        KeyRect {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    /// The smallest single precision rectangle containing `envelope`.
    ///
    /// A null envelope maps to the empty rectangle.
    pub fn widened(envelope: &Envelope) -> Self {
        if envelope.is_null() {
            return KeyRect::empty();
        }
        KeyRect {
            min_x: round_down(envelope.min_x),
            max_x: round_up(envelope.max_x),
            min_y: round_down(envelope.min_y),
            max_y: round_up(envelope.max_y),
        }
    }

    /// The identity element of [`KeyRect::expand`].
    pub fn empty() -> Self {
        KeyRect {
            min_x: f32::INFINITY,
            max_x: f32::NEG_INFINITY,
            min_y: f32::INFINITY,
            max_y: f32::NEG_INFINITY,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.min_x <= self.max_x && self.min_y <= self.max_y)
    }

    /// Overlap test; touching edges count as overlap.
    pub fn intersects(&self, other: &KeyRect) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    pub fn contains(&self, other: &KeyRect) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self.max_x >= other.max_x
            && self.max_y >= other.max_y
    }

    pub fn area(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        (f64::from(self.max_x) - f64::from(self.min_x))
            * (f64::from(self.max_y) - f64::from(self.min_y))
    }

    /// Area growth needed to also cover `other`.
    pub fn enlargement(&self, other: &KeyRect) -> f64 {
        self.merge(other).area() - self.area()
    }

    pub fn merge(&self, other: &KeyRect) -> KeyRect {
        let mut merged = *self;
        merged.expand(other);
        merged
    }

    pub fn expand(&mut self, other: &KeyRect) {
        if other.is_empty() {
            return;
        }
        self.min_x = self.min_x.min(other.min_x);
        self.max_x = self.max_x.max(other.max_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_y = self.max_y.max(other.max_y);
    }

    pub fn center_x(&self) -> f64 {
        (f64::from(self.min_x) + f64::from(self.max_x)) / 2.0
    }

    /// The rectangle as a double precision envelope; empty becomes null.
    pub fn to_envelope(&self) -> Envelope {
        if self.is_empty() {
            return Envelope::null();
        }
        Envelope::new(
            f64::from(self.min_x),
            f64::from(self.max_x),
            f64::from(self.min_y),
            f64::from(self.max_y),
        )
    }

    fn total_cmp(&self, other: &KeyRect) -> Ordering {
        self.min_x
            .total_cmp(&other.min_x)
            .then_with(|| self.max_x.total_cmp(&other.max_x))
            .then_with(|| self.min_y.total_cmp(&other.min_y))
            .then_with(|| self.max_y.total_cmp(&other.max_y))
    }
}

impl PartialEq for KeyRect {
    fn eq(&self, other: &Self) -> bool {
        self.total_cmp(other) == Ordering::Equal
    }
}

impl Eq for KeyRect {}

/// Key of the persistent spatial index: a widened rectangle tagged with the
/// row it belongs to.
///
/// Keys order by their bounds (`min_x`, `max_x`, `min_y`, `max_y`, using the
/// IEEE total order) and then by row id, so two rows sharing a rectangle
/// still have distinct keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialKey {
    rect: KeyRect,
    row_id: RowId,
}

impl SpatialKey {
    pub fn new(rect: KeyRect, row_id: RowId) -> Self {
        SpatialKey { rect, row_id }
    }

    /// The key for a row whose indexed geometry has `envelope`.
    pub fn for_envelope(envelope: &Envelope, row_id: RowId) -> Self {
        SpatialKey::new(KeyRect::widened(envelope), row_id)
    }

    pub fn rect(&self) -> &KeyRect {
        &self.rect
    }

    pub fn row_id(&self) -> RowId {
        self.row_id
    }
}

impl Ord for SpatialKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rect
            .total_cmp(&other.rect)
            .then_with(|| self.row_id.cmp(&other.row_id))
    }
}

impl PartialOrd for SpatialKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for SpatialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: ({}/{}, {}/{})",
            self.row_id, self.rect.min_x, self.rect.max_x, self.rect.min_y, self.rect.max_y
        )
    }
}
