//! Numeric helpers shared by the channel analyzers.
//!
//! Every function is total: empty and single-sample inputs return a neutral value
//! (100 for scores, 0 for counts and durations) instead of failing.

use itertools::Itertools;

/// Values closer to zero than this are treated as zero in ratios.
pub const EPSILON: f64 = 1e-9;

/// True when a channel carries no signal at all
pub fn is_absent(series: &[f64]) -> bool {
    series.iter().all(|value| value.abs() < EPSILON)
}

pub fn mean(series: &[f64]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    series.iter().sum::<f64>() / series.len() as f64
}

/// Population variance
pub fn variance(series: &[f64]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    let avg = mean(series);
    series.iter().map(|value| (value - avg).powi(2)).sum::<f64>() / series.len() as f64
}

/// Population standard deviation
pub fn std_dev(series: &[f64]) -> f64 {
    variance(series).sqrt()
}

pub fn max(series: &[f64]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    series.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

pub fn min(series: &[f64]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    series.iter().copied().fold(f64::INFINITY, f64::min)
}

/// First difference, one element shorter than the input
pub fn diff(series: &[f64]) -> Vec<f64> {
    series.iter().tuple_windows().map(|(a, b)| b - a).collect()
}

/// Only the strictly positive samples
pub fn positive(series: &[f64]) -> Vec<f64> {
    series.iter().copied().filter(|value| *value > 0.0).collect()
}

/// Share of samples matching `predicate`, as a percentage
pub fn percentage_where(series: &[f64], predicate: impl Fn(f64) -> bool) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    series.iter().filter(|value| predicate(**value)).count() as f64 / series.len() as f64 * 100.0
}

/// Percentile with linear interpolation between closest ranks, `q` in `[0, 100]`
pub fn percentile(series: &[f64], q: f64) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    let sorted: Vec<f64> = series.iter().copied().sorted_by(f64::total_cmp).collect();
    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

/// How calm a signal is: 100 minus its total variation relative to its own amplitude.
pub fn smoothness(series: &[f64]) -> f64 {
    if series.len() < 2 {
        return 100.0;
    }
    let amplitude = max(series) - min(series);
    if amplitude < EPSILON {
        return 100.0;
    }
    let total_variation: f64 = series
        .iter()
        .tuple_windows()
        .map(|(a, b)| (b - a).abs())
        .sum();
    (100.0 - total_variation / (series.len() as f64 * amplitude) * 100.0).clamp(0.0, 100.0)
}

/// Standard deviation over mean absolute value, 0 for a zero-mean series
pub fn coefficient_of_variation(series: &[f64]) -> f64 {
    let mean_abs = series.iter().map(|value| value.abs()).sum::<f64>() / series.len().max(1) as f64;
    if mean_abs < EPSILON {
        return 0.0;
    }
    std_dev(series) / mean_abs
}

/// `100 - CV * k`, floored at 0
pub fn consistency(series: &[f64], k: f64) -> f64 {
    if series.len() < 2 {
        return 100.0;
    }
    (100.0 - coefficient_of_variation(series) * k).clamp(0.0, 100.0)
}

/// Counts upward crossings of `threshold`. The signal is assumed to start below the
/// threshold and a crossing is only counted `min_distance` samples after the previous one.
pub fn count_events(series: &[f64], threshold: f64, min_distance: usize) -> usize {
    let mut count = 0;
    let mut above = false;
    let mut last_event: Option<usize> = None;

    for (i, value) in series.iter().enumerate() {
        let now_above = *value > threshold;
        if now_above && !above {
            let far_enough = last_event.is_none_or(|last| i - last >= min_distance);
            if far_enough {
                count += 1;
                last_event = Some(i);
            }
        }
        above = now_above;
    }
    count
}

/// Indices of local maxima at or above `height`, at least `distance` samples apart.
///
/// Flat tops count once at their middle sample and the first and last samples are never
/// peaks. When two peaks are too close the higher one is kept.
pub fn peaks(series: &[f64], height: f64, distance: usize) -> Vec<usize> {
    let n = series.len();
    let mut candidates = Vec::new();
    let mut i = 1;
    while i + 1 < n {
        if series[i] > series[i - 1] {
            let mut ahead = i + 1;
            while ahead + 1 < n && series[ahead] == series[i] {
                ahead += 1;
            }
            if series[ahead] < series[i] {
                candidates.push((i + ahead - 1) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }

    candidates.retain(|index| series[*index] >= height);
    if distance <= 1 || candidates.len() < 2 {
        return candidates;
    }

    let mut kept: Vec<usize> = Vec::with_capacity(candidates.len());
    for index in candidates
        .iter()
        .copied()
        .sorted_by(|a, b| series[*b].total_cmp(&series[*a]).then(a.cmp(b)))
    {
        if kept.iter().all(|other| other.abs_diff(index) >= distance) {
            kept.push(index);
        }
    }
    kept.sort_unstable();
    kept
}

/// Local minima whose negated value reaches `height`
pub fn valleys(series: &[f64], height: f64, distance: usize) -> Vec<usize> {
    let negated: Vec<f64> = series.iter().map(|value| -value).collect();
    peaks(&negated, height, distance)
}

/// Fraction of samples at or above `pct_of_max * max(series)`
pub fn top_duration(series: &[f64], pct_of_max: f64) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    let peak = max(series);
    if peak <= 0.0 {
        return 0.0;
    }
    let cutoff = pct_of_max * peak;
    series.iter().filter(|value| **value >= cutoff).count() as f64 / series.len() as f64
}

/// Ordinary least-squares fit of `y` against `x`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Pearson correlation coefficient, 0 when either variable is constant
    pub r: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

pub fn linear_regression(x: &[f64], y: &[f64]) -> Option<LinearFit> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let mean_x = mean(x);
    let mean_y = mean(y);

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        sxy += (xi - mean_x) * (yi - mean_y);
        sxx += (xi - mean_x).powi(2);
        syy += (yi - mean_y).powi(2);
    }
    if sxx < EPSILON {
        return None;
    }

    let slope = sxy / sxx;
    let r = if syy < EPSILON {
        0.0
    } else {
        sxy / (sxx * syy).sqrt()
    };
    Some(LinearFit {
        slope,
        intercept: mean_y - slope * mean_x,
        r,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_neutral_values_for_short_series() {
        assert_relative_eq!(smoothness(&[]), 100.0);
        assert_relative_eq!(smoothness(&[42.0]), 100.0);
        assert_relative_eq!(consistency(&[], 100.0), 100.0);
        assert_relative_eq!(consistency(&[42.0], 100.0), 100.0);
        assert_eq!(count_events(&[], 1.0, 1), 0);
        assert!(peaks(&[1.0], 0.0, 1).is_empty());
        assert_relative_eq!(top_duration(&[], 0.95), 0.0);
        assert_relative_eq!(max(&[]), 0.0);
        assert_relative_eq!(min(&[]), 0.0);
    }

    #[test]
    fn test_all_zero_series_is_smooth_and_consistent() {
        let zeros = vec![0.0; 20];
        assert_relative_eq!(smoothness(&zeros), 100.0);
        assert_relative_eq!(consistency(&zeros, 100.0), 100.0);
        assert!(is_absent(&zeros));
    }

    #[test]
    fn test_smoothness_of_ramp() {
        let ramp: Vec<f64> = (0..10).map(|i| i as f64).collect();
        // total variation equals the amplitude
        assert_relative_eq!(smoothness(&ramp), 90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_smoothness_of_square_wave_is_low() {
        let square: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 0.0 } else { 100.0 }).collect();
        assert!(smoothness(&square) < 10.0);
    }

    #[test]
    fn test_consistency_uses_coefficient_of_variation() {
        let series = [90.0, 110.0];
        // std 10, mean 100
        assert_relative_eq!(consistency(&series, 100.0), 90.0, epsilon = 1e-9);
        assert_relative_eq!(consistency(&series, 50.0), 95.0, epsilon = 1e-9);
    }

    #[test]
    fn test_count_events_debounces() {
        let series = [0.0, 20.0, 0.0, 20.0, 0.0, 0.0, 0.0, 20.0];
        assert_eq!(count_events(&series, 10.0, 1), 3);
        assert_eq!(count_events(&series, 10.0, 4), 2);
        assert_eq!(count_events(&[20.0, 20.0, 0.0], 10.0, 1), 1);
    }

    #[test]
    fn test_peaks_height_and_distance() {
        let series = [0.0, 5.0, 0.0, 3.0, 0.0, 0.0, 1.0, 0.0];
        assert_eq!(peaks(&series, 0.0, 1), vec![1, 3, 6]);
        assert_eq!(peaks(&series, 2.0, 1), vec![1, 3]);
        // 1 and 3 are too close, the higher one survives
        assert_eq!(peaks(&series, 2.0, 3), vec![1]);
    }

    #[test]
    fn test_peaks_plateau_reports_middle() {
        let series = [0.0, 4.0, 4.0, 4.0, 0.0];
        assert_eq!(peaks(&series, 0.0, 1), vec![2]);
        // a plateau running into the edge is not a peak
        assert!(peaks(&[0.0, 4.0, 4.0], 0.0, 1).is_empty());
    }

    #[test]
    fn test_valleys_are_negated_peaks() {
        let series = [0.0, -5.0, 0.0, -1.0, 0.0];
        assert_eq!(valleys(&series, 2.0, 1), vec![1]);
    }

    #[test]
    fn test_top_duration() {
        let series = [100.0, 96.0, 50.0, 0.0];
        assert_relative_eq!(top_duration(&series, 0.95), 0.5);
        assert_relative_eq!(top_duration(&[0.0, 0.0], 0.95), 0.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        let series = [4.0, 1.0, 3.0, 2.0];
        assert_relative_eq!(percentile(&series, 50.0), 2.5);
        assert_relative_eq!(percentile(&series, 0.0), 1.0);
        assert_relative_eq!(percentile(&series, 100.0), 4.0);
        assert_relative_eq!(percentile(&series, 75.0), 3.25);
    }

    #[test]
    fn test_linear_regression() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [10.0, 8.0, 6.0, 4.0];
        let fit = linear_regression(&x, &y).unwrap();
        assert_relative_eq!(fit.slope, -2.0, epsilon = 1e-9);
        assert_relative_eq!(fit.intercept, 10.0, epsilon = 1e-9);
        assert_relative_eq!(fit.r, -1.0, epsilon = 1e-9);
        assert_relative_eq!(fit.predict(4.0), 2.0, epsilon = 1e-9);

        assert!(linear_regression(&[1.0], &[1.0]).is_none());
        assert!(linear_regression(&[1.0, 1.0], &[1.0, 2.0]).is_none());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_scores_stay_in_range(series in prop::collection::vec(-1000.0f64..1000.0, 0..200)) {
            let s = smoothness(&series);
            let c = consistency(&series, 100.0);
            prop_assert!((0.0..=100.0).contains(&s));
            prop_assert!((0.0..=100.0).contains(&c));
        }

        #[test]
        fn prop_peaks_respect_distance(
            series in prop::collection::vec(0.0f64..100.0, 0..200),
            distance in 1usize..20,
        ) {
            let found = peaks(&series, 0.0, distance);
            for pair in found.windows(2) {
                prop_assert!(pair[1] - pair[0] >= distance);
            }
        }

        #[test]
        fn prop_top_duration_is_fraction(series in prop::collection::vec(-10.0f64..300.0, 0..200)) {
            let fraction = top_duration(&series, 0.95);
            prop_assert!((0.0..=1.0).contains(&fraction));
        }
    }
}
