/// Upper edge of a scoring band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    /// value == n
    Exactly(f64),
    /// value < n
    Below(f64),
    /// value <= n
    AtMost(f64),
}

impl Bound {
    pub fn matches(&self, value: f64) -> bool {
        match self {
            Bound::Exactly(n) => value == *n,
            Bound::Below(n) => value < *n,
            Bound::AtMost(n) => value <= *n,
        }
    }
}

/// Ordered (bound, score) lookup with a fallback for values past every band.
///
/// Bands are checked top to bottom and the first match wins, so they must be
/// listed in ascending order of their bounds.
#[derive(Debug, Clone, Copy)]
pub struct BandTable {
    pub bands: &'static [(Bound, f64)],
    pub otherwise: f64,
}

impl BandTable {
    pub const fn new(bands: &'static [(Bound, f64)], otherwise: f64) -> Self {
        Self { bands, otherwise }
    }

    pub fn lookup(&self, value: f64) -> f64 {
        self.bands
            .iter()
            .find(|(bound, _)| bound.matches(value))
            .map(|(_, score)| *score)
            .unwrap_or(self.otherwise)
    }
}

/// Wind in km/h: light to moderate wind is best.
pub const WIND: BandTable = BandTable::new(
    &[
        (Bound::AtMost(3.0), 0.5),
        (Bound::AtMost(18.0), 1.0),
        (Bound::AtMost(28.0), 0.6),
    ],
    0.3,
);

/// Cloud cover in percent: some cloud beats both clear sky and overcast.
pub const CLOUD: BandTable = BandTable::new(
    &[
        (Bound::AtMost(10.0), 0.6),
        (Bound::AtMost(40.0), 0.9),
        (Bound::AtMost(70.0), 0.8),
    ],
    0.5,
);

/// Precipitation in mm: drizzle is fine, heavy rain is not.
pub const PRECIP: BandTable = BandTable::new(
    &[
        (Bound::Exactly(0.0), 0.9),
        (Bound::Below(1.0), 0.8),
        (Bound::Below(5.0), 0.5),
    ],
    0.2,
);
