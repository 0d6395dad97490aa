use super::interval::Interval;
use super::observation::{AlleleIdentity, AlleleObservation, VariantKind};

/// Interval carrying an allele observation.
pub type ObservationInterval = Interval<AlleleObservation>;

/// Partition of a [`RegionStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Reference observations (including flanking fills).
    Reference,
    /// No-call observations.
    NoCall,
    /// Alternate allele observations.
    Variation,
}

impl Category {
    /// Category an identity is routed to.
    pub fn of(identity: &AlleleIdentity) -> Self {
        match identity {
            AlleleIdentity::Reference => Category::Reference,
            AlleleIdentity::NoCall => Category::NoCall,
            AlleleIdentity::Alt(_) => Category::Variation,
        }
    }

    /// First and last position at which a query of this category returns
    /// `interval`.
    pub fn visible_span(self, interval: &ObservationInterval) -> (i64, i64) {
        if self == Category::Variation && interval.payload.kind == VariantKind::Insertion {
            (interval.start, interval.start)
        } else {
            (interval.min_position(), interval.max_position())
        }
    }
}

/// Append-only interval store for one genomic window.
#[derive(Debug, Clone)]
pub struct RegionStore {
    target: Interval<()>,
    reference: Vec<ObservationInterval>,
    no_call: Vec<ObservationInterval>,
    variation: Vec<ObservationInterval>,
}

impl RegionStore {
    /// Empty store for the inclusive window `[start, end]`.
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            target: Interval::window(start, end),
            reference: Vec::new(),
            no_call: Vec::new(),
            variation: Vec::new(),
        }
    }

    /// Window this store was built for.
    pub fn target(&self) -> &Interval<()> {
        &self.target
    }

    /// Insert an interval; intervals outside the target window are dropped.
    ///
    /// Returns whether the interval was kept.
    pub fn add(&mut self, interval: ObservationInterval) -> bool {
        if !interval.overlaps(&self.target, false) {
            return false;
        }
        match Category::of(&interval.payload.identity) {
            Category::Reference => self.reference.push(interval),
            Category::NoCall => self.no_call.push(interval),
            Category::Variation => self.variation.push(interval),
        }
        true
    }

    /// Insert several intervals.
    pub fn add_all(&mut self, intervals: impl IntoIterator<Item = ObservationInterval>) {
        for interval in intervals {
            self.add(interval);
        }
    }

    /// Stream every interval of `category` overlapping `window` to `visitor`.
    pub fn query<U, F>(&self, category: Category, window: &Interval<U>, mut visitor: F)
    where
        F: FnMut(&ObservationInterval),
    {
        let (intervals, variation) = match category {
            Category::Reference => (&self.reference, false),
            Category::NoCall => (&self.no_call, false),
            Category::Variation => (&self.variation, true),
        };
        for interval in intervals {
            let insertion_aware = variation && interval.payload.kind == VariantKind::Insertion;
            if interval.overlaps(window, insertion_aware) {
                visitor(interval);
            }
        }
    }

    /// Reference intervals overlapping `window`.
    pub fn query_reference<U, F>(&self, window: &Interval<U>, visitor: F)
    where
        F: FnMut(&ObservationInterval),
    {
        self.query(Category::Reference, window, visitor)
    }

    /// No-call intervals overlapping `window`.
    pub fn query_no_call<U, F>(&self, window: &Interval<U>, visitor: F)
    where
        F: FnMut(&ObservationInterval),
    {
        self.query(Category::NoCall, window, visitor)
    }

    /// Variation intervals overlapping `window`.
    pub fn query_variation<U, F>(&self, window: &Interval<U>, visitor: F)
    where
        F: FnMut(&ObservationInterval),
    {
        self.query(Category::Variation, window, visitor)
    }

    /// Variation, no-call and reference intervals overlapping `window`, in that order.
    pub fn query_all<U, F>(&self, window: &Interval<U>, mut visitor: F)
    where
        F: FnMut(&ObservationInterval),
    {
        self.query(Category::Variation, window, &mut visitor);
        self.query(Category::NoCall, window, &mut visitor);
        self.query(Category::Reference, window, &mut visitor);
    }

    /// All intervals of one category in insertion order.
    pub fn intervals(&self, category: Category) -> &[ObservationInterval] {
        match category {
            Category::Reference => &self.reference,
            Category::NoCall => &self.no_call,
            Category::Variation => &self.variation,
        }
    }

    /// Total number of stored intervals.
    pub fn len(&self) -> usize {
        self.reference.len() + self.no_call.len() + self.variation.len()
    }

    /// Whether nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::RefAlt;

    fn observation(identity: AlleleIdentity, kind: VariantKind) -> AlleleObservation {
        AlleleObservation::new(1, 10, true, kind, identity).with_sample(1)
    }

    #[test]
    fn routes_by_identity_and_drops_outside_window() {
        let mut store = RegionStore::new(10, 20);
        let reference = observation(AlleleIdentity::Reference, VariantKind::Snv);
        assert!(store.add(Interval::new(13, 13, reference)));
        let no_call = observation(AlleleIdentity::NoCall, VariantKind::NoCall);
        assert!(store.add(Interval::new(5, 11, no_call)));
        assert!(store.add(Interval::new(
            13,
            13,
            observation(AlleleIdentity::Alt(RefAlt::new("A", "T")), VariantKind::Snv),
        )));
        let outside = observation(AlleleIdentity::Reference, VariantKind::Reference);
        assert!(!store.add(Interval::new(21, 30, outside)));

        assert_eq!(store.intervals(Category::Reference).len(), 1);
        assert_eq!(store.intervals(Category::NoCall).len(), 1);
        assert_eq!(store.intervals(Category::Variation).len(), 1);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn insertion_variation_matches_marker_only() {
        let mut store = RegionStore::new(10, 20);
        let insertion =
            observation(AlleleIdentity::Alt(RefAlt::new("", "AT")), VariantKind::Insertion);
        store.add(Interval::new(14, 13, insertion.clone()));
        let anchor = observation(AlleleIdentity::Reference, VariantKind::Insertion);
        store.add(Interval::new(14, 13, anchor));

        let mut variation_hits = 0;
        store.query_variation(&Interval::point(13), |_| variation_hits += 1);
        assert_eq!(variation_hits, 0);
        store.query_variation(&Interval::point(14), |_| variation_hits += 1);
        assert_eq!(variation_hits, 1);

        // Reference intervals keep the min/max rule.
        let mut reference_hits = 0;
        store.query_reference(&Interval::point(13), |_| reference_hits += 1);
        assert_eq!(reference_hits, 1);
    }

    #[test]
    fn query_all_visits_variation_first() {
        let mut store = RegionStore::new(1, 5);
        store.add(Interval::new(2, 2, observation(AlleleIdentity::Reference, VariantKind::Snv)));
        let snv = observation(AlleleIdentity::Alt(RefAlt::new("C", "G")), VariantKind::Snv);
        store.add(Interval::new(2, 2, snv));
        store.add(Interval::new(1, 3, observation(AlleleIdentity::NoCall, VariantKind::NoCall)));

        let mut order = Vec::new();
        store.query_all(&Interval::point(2), |interval| {
            order.push(Category::of(&interval.payload.identity))
        });
        assert_eq!(order, vec![Category::Variation, Category::NoCall, Category::Reference]);
    }
}
