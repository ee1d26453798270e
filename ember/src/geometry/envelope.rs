use std::hash::Hash;

/// An axis-aligned planar rectangle: the smallest box containing a geometry.
///
/// An envelope is either *null* (it contains nothing, e.g. the envelope of an
/// empty geometry or of two disjoint boxes' intersection) or satisfies
/// `min <= max` on both axes.
///
/// # Examples
///
/// ```rust
/// use ember::geometry::Envelope;
///
/// let a = Envelope::new(0.0, 10.0, 0.0, 10.0);
/// let b = Envelope::new(5.0, 15.0, 5.0, 15.0);
/// assert!(a.intersects(&b));
/// assert_eq!(a.intersection(&b), Envelope::new(5.0, 10.0, 5.0, 10.0));
/// ```
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Envelope {
    /// Minimum X coordinate
    pub min_x: f64,
    /// Maximum X coordinate
    pub max_x: f64,
    /// Minimum Y coordinate
    pub min_y: f64,
    /// Maximum Y coordinate
    pub max_y: f64,
}

impl Hash for Envelope {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.min_x.to_bits().hash(state);
        self.max_x.to_bits().hash(state);
        self.min_y.to_bits().hash(state);
        self.max_y.to_bits().hash(state);
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Envelope::null()
    }
}

impl std::fmt::Display for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            return write!(f, "Env[null]");
        }
        write!(
            f,
            "Env[{} : {}, {} : {}]",
            self.min_x, self.max_x, self.min_y, self.max_y
        )
    }
}

impl Envelope {
    /// Creates an envelope spanning the two x and the two y values, in any order.
    pub fn new(x1: f64, x2: f64, y1: f64, y2: f64) -> Envelope {
        Envelope {
            min_x: x1.min(x2),
            max_x: x1.max(x2),
            min_y: y1.min(y2),
            max_y: y1.max(y2),
        }
    }

    /// An envelope around a single point.
    pub fn of_point(x: f64, y: f64) -> Envelope {
        Envelope::new(x, x, y, y)
    }

    /// The null envelope, which contains and intersects nothing.
    pub fn null() -> Envelope {
        Envelope {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    /// True for the null envelope and for any envelope with a NaN bound.
    pub fn is_null(&self) -> bool {
        !(self.min_x <= self.max_x && self.min_y <= self.max_y)
    }

    pub fn width(&self) -> f64 {
        if self.is_null() {
            return 0.0;
        }
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        if self.is_null() {
            return 0.0;
        }
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Center of the envelope, `None` for the null envelope.
    pub fn center(&self) -> Option<(f64, f64)> {
        if self.is_null() {
            return None;
        }
        Some((
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        ))
    }

    /// Checks if this envelope is a single point (zero width and height).
    pub fn is_point(&self) -> bool {
        !self.is_null() && self.min_x == self.max_x && self.min_y == self.max_y
    }

    /// Grows the envelope so that it includes the point.
    pub fn expand_to_include_point(&mut self, x: f64, y: f64) {
        if self.is_null() {
            *self = Envelope::of_point(x, y);
            return;
        }
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
    }

    /// Grows the envelope so that it includes `other`.
    pub fn expand_to_include(&mut self, other: &Envelope) {
        if other.is_null() {
            return;
        }
        if self.is_null() {
            *self = *other;
            return;
        }
        self.min_x = self.min_x.min(other.min_x);
        self.max_x = self.max_x.max(other.max_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_y = self.max_y.max(other.max_y);
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        !self.is_null()
            && x >= self.min_x
            && x <= self.max_x
            && y >= self.min_y
            && y <= self.max_y
    }

    /// Checks if this envelope fully contains `other`.
    pub fn contains(&self, other: &Envelope) -> bool {
        if self.is_null() || other.is_null() {
            return false;
        }
        other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.max_y <= self.max_y
    }

    /// Checks if the two envelopes overlap. Touching edges count.
    pub fn intersects(&self, other: &Envelope) -> bool {
        if self.is_null() || other.is_null() {
            return false;
        }
        !(other.min_x > self.max_x
            || other.max_x < self.min_x
            || other.min_y > self.max_y
            || other.max_y < self.min_y)
    }

    /// The overlapping region, null when the envelopes are disjoint.
    pub fn intersection(&self, other: &Envelope) -> Envelope {
        if !self.intersects(other) {
            return Envelope::null();
        }
        Envelope {
            min_x: self.min_x.max(other.min_x),
            max_x: self.max_x.min(other.max_x),
            min_y: self.min_y.max(other.min_y),
            max_y: self.max_y.min(other.max_y),
        }
    }

    /// The smallest envelope containing both.
    pub fn union(&self, other: &Envelope) -> Envelope {
        let mut merged = *self;
        merged.expand_to_include(other);
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::Hasher;

    fn hash_of(envelope: &Envelope) -> u64 {
        let mut hasher = DefaultHasher::new();
        envelope.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_new_normalizes_order() {
        let env = Envelope::new(3.0, 1.0, 4.0, 2.0);
        assert_eq!(env.min_x, 1.0);
        assert_eq!(env.max_x, 3.0);
        assert_eq!(env.min_y, 2.0);
        assert_eq!(env.max_y, 4.0);
    }

    #[test]
    fn test_null_envelope() {
        let null = Envelope::null();
        assert!(null.is_null());
        assert_eq!(null.width(), 0.0);
        assert_eq!(null.area(), 0.0);
        assert!(null.center().is_none());
        assert!(!null.intersects(&Envelope::new(0.0, 1.0, 0.0, 1.0)));
        assert!(!null.contains(&null));
        assert_eq!(Envelope::default(), null);
    }

    #[test]
    fn test_hash() {
        let a = Envelope::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(hash_of(&a), hash_of(&Envelope::new(1.0, 2.0, 3.0, 4.0)));
        assert_ne!(hash_of(&a), hash_of(&Envelope::new(5.0, 6.0, 7.0, 8.0)));
    }

    #[test]
    fn test_nan_bounds_are_null() {
        let nan = Envelope::of_point(f64::NAN, f64::NAN);
        assert!(nan.is_null());
        assert!(!nan.intersects(&Envelope::new(0.0, 1.0, 0.0, 1.0)));
        let half = Envelope {
            min_x: 0.0,
            max_x: 1.0,
            min_y: f64::NAN,
            max_y: 1.0,
        };
        assert!(half.is_null());

        let mut grown = Envelope::new(0.0, 1.0, 0.0, 1.0);
        grown.expand_to_include(&nan);
        assert_eq!(grown, Envelope::new(0.0, 1.0, 0.0, 1.0));
    }

    #[test]
    fn test_width_height_area() {
        let env = Envelope::new(0.0, 10.0, 0.0, 5.0);
        assert_eq!(env.width(), 10.0);
        assert_eq!(env.height(), 5.0);
        assert_eq!(env.area(), 50.0);
        assert_eq!(env.center(), Some((5.0, 2.5)));
    }

    #[test]
    fn test_expand_to_include() {
        let mut env = Envelope::null();
        env.expand_to_include_point(1.0, 1.0);
        assert!(env.is_point());
        env.expand_to_include(&Envelope::new(-1.0, 0.0, 5.0, 6.0));
        assert_eq!(env, Envelope::new(-1.0, 1.0, 1.0, 6.0));
        env.expand_to_include(&Envelope::null());
        assert_eq!(env, Envelope::new(-1.0, 1.0, 1.0, 6.0));
    }

    #[test]
    fn test_intersects() {
        let a = Envelope::new(0.0, 10.0, 0.0, 10.0);
        let b = Envelope::new(5.0, 15.0, 5.0, 15.0);
        let c = Envelope::new(20.0, 30.0, 20.0, 30.0);
        let touching = Envelope::new(10.0, 20.0, 10.0, 20.0);

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
        assert!(a.intersects(&touching));
    }

    #[test]
    fn test_intersection() {
        let a = Envelope::new(0.0, 10.0, 0.0, 10.0);
        let b = Envelope::new(5.0, 15.0, 5.0, 15.0);
        let c = Envelope::new(20.0, 30.0, 20.0, 30.0);

        assert_eq!(a.intersection(&b), Envelope::new(5.0, 10.0, 5.0, 10.0));
        assert!(a.intersection(&c).is_null());
        assert_eq!(a.intersection(&a), a);
    }

    #[test]
    fn test_union() {
        let a = Envelope::new(0.0, 5.0, 0.0, 5.0);
        let b = Envelope::new(3.0, 10.0, 3.0, 10.0);
        assert_eq!(a.union(&b), Envelope::new(0.0, 10.0, 0.0, 10.0));
        assert_eq!(a.union(&Envelope::null()), a);
    }

    #[test]
    fn test_contains() {
        let outer = Envelope::new(0.0, 10.0, 0.0, 10.0);
        let inner = Envelope::new(2.0, 8.0, 2.0, 8.0);
        let partial = Envelope::new(5.0, 15.0, 5.0, 15.0);

        assert!(outer.contains(&inner));
        assert!(!outer.contains(&partial));
        assert!(!inner.contains(&outer));
        assert!(outer.contains_point(0.0, 10.0));
        assert!(!outer.contains_point(-0.1, 5.0));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Envelope::new(1.0, 2.0, 3.0, 4.0).to_string(),
            "Env[1 : 2, 3 : 4]"
        );
        assert_eq!(Envelope::null().to_string(), "Env[null]");
    }
}
