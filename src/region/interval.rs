use std::cmp::{max, min};

/// Closed, 1-based genomic interval carrying a payload.
///
/// Insertions sit between two reference bases and are stored with
/// `start = end + 1`; every other interval satisfies `start <= end`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Interval<T> {
    /// First covered position (the marker position for insertions).
    pub start: i64,
    /// Last covered position (inclusive).
    pub end: i64,
    /// Attached data.
    pub payload: T,
}

impl<T> Interval<T> {
    /// Create an interval over `[start, end]`.
    pub fn new(start: i64, end: i64, payload: T) -> Self {
        Self {
            start,
            end,
            payload,
        }
    }

    /// Smaller of the two bounds.
    pub fn min_position(&self) -> i64 {
        min(self.start, self.end)
    }

    /// Larger of the two bounds.
    pub fn max_position(&self) -> i64 {
        max(self.start, self.end)
    }

    /// Whether this interval marks an insertion (`start > end`).
    pub fn is_insertion(&self) -> bool {
        self.start > self.end
    }

    /// Number of reference positions covered; zero for insertions.
    pub fn len(&self) -> i64 {
        (self.end - self.start + 1).max(0)
    }

    /// Whether the interval covers no reference position.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Same start and end as `other`.
    pub fn same_region<U>(&self, other: &Interval<U>) -> bool {
        self.start == other.start && self.end == other.end
    }

    /// Overlap test.
    ///
    /// With `insertion_aware` unset both intervals are compared by their
    /// min/max bounds. With it set, an insertion overlaps `other` only when
    /// its marker position (`start`) lies inside `other`.
    pub fn overlaps<U>(&self, other: &Interval<U>, insertion_aware: bool) -> bool {
        if self.same_region(other) {
            return true;
        }
        if insertion_aware {
            self.start <= other.max_position() && other.start <= self.max_position()
        } else {
            self.min_position() <= other.max_position()
                && other.min_position() <= self.max_position()
        }
    }

    /// Whether `position` lies within the min/max bounds.
    pub fn contains_position(&self, position: i64) -> bool {
        self.min_position() <= position && position <= self.max_position()
    }

    /// Whether this interval lies completely inside `other`.
    pub fn covered_by<U>(&self, other: &Interval<U>) -> bool {
        other.min_position() <= self.min_position() && self.max_position() <= other.max_position()
    }

    /// Replace the payload, keeping the bounds.
    pub fn with_payload<U>(&self, payload: U) -> Interval<U> {
        Interval::new(self.start, self.end, payload)
    }

    /// Borrow the bounds as a payload-free interval.
    pub fn bounds(&self) -> Interval<()> {
        Interval::new(self.start, self.end, ())
    }
}

impl Interval<()> {
    /// Window without payload.
    pub fn window(start: i64, end: i64) -> Self {
        Interval::new(start, end, ())
    }

    /// Single-position window.
    pub fn point(position: i64) -> Self {
        Interval::new(position, position, ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_uses_marker_position_when_aware() {
        let insertion = Interval::window(100, 99);
        assert!(insertion.is_insertion());
        assert!(insertion.overlaps(&Interval::window(100, 102), true));
        assert!(!insertion.overlaps(&Interval::window(98, 99), true));
        // min/max comparison still sees position 99
        assert!(insertion.overlaps(&Interval::window(98, 99), false));
    }

    #[test]
    fn point_overlap_matches_bounds() {
        let deletion = Interval::window(13, 15);
        assert!(deletion.overlaps(&Interval::point(13), false));
        assert!(deletion.overlaps(&Interval::point(15), true));
        assert!(!deletion.overlaps(&Interval::point(16), false));
        assert!(deletion.contains_position(14));
    }

    #[test]
    fn coverage_and_length() {
        let block = Interval::window(9, 21);
        assert_eq!(block.len(), 13);
        assert!(Interval::window(10, 20).covered_by(&block));
        assert!(!Interval::window(8, 20).covered_by(&block));
        assert_eq!(Interval::window(14, 13).len(), 0);
        assert!(Interval::window(14, 13).is_empty());
    }
}
