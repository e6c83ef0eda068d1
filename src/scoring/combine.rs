use crate::types::{clamp01, round_to, Components, Signal};

/// Signal weights. Each set sums to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub moon: f64,
    pub weather: f64,
    pub almanac: f64,
}

impl Weights {
    pub const WITH_ALMANAC: Weights = Weights {
        moon: 0.35,
        weather: 0.45,
        almanac: 0.20,
    };

    /// Moon and weather keep their 35:45 ratio when the almanac is missing.
    pub const WITHOUT_ALMANAC: Weights = Weights {
        moon: 0.44,
        weather: 0.56,
        almanac: 0.0,
    };
}

#[derive(Debug, Clone, PartialEq)]
pub struct Combined {
    /// Unrounded 0..100 score.
    pub total: f64,
    /// Point contributions, rounded to one decimal.
    pub components: Components,
}

/// Blend sub-scores into a 0..100 bite score.
///
/// With no almanac score the two-signal weight set is used and the
/// "almanac" component is left out entirely rather than reported as zero.
pub fn combine(moon: f64, weather: f64, almanac: Option<f64>) -> Combined {
    let mut components = Components::new();

    let raw = match almanac {
        Some(almanac) => {
            let w = Weights::WITH_ALMANAC;
            components.insert(Signal::Moon, points(w.moon, moon));
            components.insert(Signal::Weather, points(w.weather, weather));
            components.insert(Signal::Almanac, points(w.almanac, almanac));
            w.moon * moon + w.weather * weather + w.almanac * almanac
        }
        None => {
            let w = Weights::WITHOUT_ALMANAC;
            components.insert(Signal::Moon, points(w.moon, moon));
            components.insert(Signal::Weather, points(w.weather, weather));
            w.moon * moon + w.weather * weather
        }
    };

    Combined {
        total: 100.0 * clamp01(raw),
        components,
    }
}

fn points(weight: f64, score: f64) -> f64 {
    round_to(100.0 * weight * score, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_sets_sum_to_one() {
        let w = Weights::WITH_ALMANAC;
        assert!((w.moon + w.weather + w.almanac - 1.0).abs() < 1e-12);
        let w = Weights::WITHOUT_ALMANAC;
        assert!((w.moon + w.weather + w.almanac - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_all_perfect_with_almanac() {
        let result = combine(1.0, 1.0, Some(1.0));
        assert!((result.total - 100.0).abs() < 1e-9);
        assert_eq!(result.components.len(), 3);
        assert_eq!(result.components[&Signal::Moon], 35.0);
        assert_eq!(result.components[&Signal::Weather], 45.0);
        assert_eq!(result.components[&Signal::Almanac], 20.0);
        let sum: f64 = result.components.values().sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_perfect_without_almanac() {
        let result = combine(1.0, 1.0, None);
        assert!((result.total - 100.0).abs() < 1e-9);
        let keys: Vec<_> = result.components.keys().copied().collect();
        assert_eq!(keys, vec![Signal::Moon, Signal::Weather]);
        assert_eq!(result.components[&Signal::Moon], 44.0);
        assert_eq!(result.components[&Signal::Weather], 56.0);
    }

    #[test]
    fn test_absent_is_not_zero_almanac() {
        let absent = combine(0.5, 0.5, None);
        let zero = combine(0.5, 0.5, Some(0.0));
        assert!((absent.total - 50.0).abs() < 1e-9);
        assert!((zero.total - 40.0).abs() < 1e-9);
        assert!(!absent.components.contains_key(&Signal::Almanac));
        assert_eq!(zero.components[&Signal::Almanac], 0.0);
    }

    #[test]
    fn test_components_round_to_one_decimal() {
        let result = combine(0.3333, 0.7777, Some(0.1234));
        assert_eq!(result.components[&Signal::Moon], 11.7); // 11.6655
        assert_eq!(result.components[&Signal::Weather], 35.0); // 34.9965
        assert_eq!(result.components[&Signal::Almanac], 2.5); // 2.468
    }

    #[test]
    fn test_components_track_total() {
        let result = combine(0.62, 0.955, None);
        let sum: f64 = result.components.values().sum();
        assert!((sum - round_to(result.total, 1)).abs() <= 0.1 + 1e-9);
    }

    #[test]
    fn test_zero_scores() {
        let result = combine(0.0, 0.0, Some(0.0));
        assert_eq!(result.total, 0.0);
        assert!(result.components.values().all(|v| *v == 0.0));
    }
}
