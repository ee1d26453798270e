use std::fmt::{self, Display};
use std::ops::{BitOr, BitOrAssign};

/// Bit mask of the conditions a query places on one column.
///
/// The planner hands an index one mask per table column (indexed by column
/// id) when asking for its cost. Bits combine with `|`.
///
/// ```rust
/// use ember::index::ConditionMask;
///
/// let mask = ConditionMask::START | ConditionMask::END;
/// assert_eq!(mask, ConditionMask::RANGE);
/// assert!(!mask.contains(ConditionMask::SPATIAL_INTERSECTS));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
pub struct ConditionMask(u32);

impl ConditionMask {
    /// No condition on the column.
    pub const NONE: ConditionMask = ConditionMask(0);
    /// `column = value`
    pub const EQUALITY: ConditionMask = ConditionMask(1);
    /// `column >= value`
    pub const START: ConditionMask = ConditionMask(2);
    /// `column <= value`
    pub const END: ConditionMask = ConditionMask(4);
    /// Both a start and an end bound.
    pub const RANGE: ConditionMask = ConditionMask(2 | 4);
    /// A condition that can never match.
    pub const ALWAYS_FALSE: ConditionMask = ConditionMask(8);
    /// `column && geometry`: the bounding boxes overlap.
    pub const SPATIAL_INTERSECTS: ConditionMask = ConditionMask(16);

    pub const fn from_bits(bits: u32) -> ConditionMask {
        ConditionMask(bits)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// True when every bit of `other` is set in `self`.
    pub const fn contains(&self, other: ConditionMask) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }
}

impl BitOr for ConditionMask {
    type Output = ConditionMask;

    fn bitor(self, rhs: ConditionMask) -> ConditionMask {
        ConditionMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for ConditionMask {
    fn bitor_assign(&mut self, rhs: ConditionMask) {
        self.0 |= rhs.0;
    }
}

impl Display for ConditionMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "NONE");
        }
        let names = [
            (ConditionMask::EQUALITY, "EQUALITY"),
            (ConditionMask::START, "START"),
            (ConditionMask::END, "END"),
            (ConditionMask::ALWAYS_FALSE, "ALWAYS_FALSE"),
            (ConditionMask::SPATIAL_INTERSECTS, "SPATIAL_INTERSECTS"),
        ];
        let mut first = true;
        for (flag, name) in names {
            if self.contains(flag) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains() {
        let mask = ConditionMask::EQUALITY | ConditionMask::SPATIAL_INTERSECTS;
        assert!(mask.contains(ConditionMask::SPATIAL_INTERSECTS));
        assert!(mask.contains(ConditionMask::EQUALITY));
        assert!(!mask.contains(ConditionMask::RANGE));
        assert!(!mask.contains(ConditionMask::NONE));
        assert!(ConditionMask::default().is_empty());
    }

    #[test]
    fn test_bit_or_assign() {
        let mut mask = ConditionMask::NONE;
        mask |= ConditionMask::START;
        mask |= ConditionMask::END;
        assert_eq!(mask, ConditionMask::RANGE);
        assert_eq!(mask.bits(), 6);
        assert_eq!(ConditionMask::from_bits(16), ConditionMask::SPATIAL_INTERSECTS);
    }

    #[test]
    fn test_display() {
        assert_eq!(ConditionMask::NONE.to_string(), "NONE");
        assert_eq!(ConditionMask::RANGE.to_string(), "START|END");
        assert_eq!(
            (ConditionMask::EQUALITY | ConditionMask::SPATIAL_INTERSECTS).to_string(),
            "EQUALITY|SPATIAL_INTERSECTS"
        );
    }
}
