// Denoising strategies for position traces

use log::{debug, warn};
use nalgebra::{DMatrix, DVector};

use super::types::{BoundingBox, Point2D};
use crate::config::TrackConfig;
use crate::telemetry::signal::EPSILON;

/// A trace smoothing strategy. Strategies are tried in order and the first one whose
/// guard accepts the trace is used.
pub trait Smoother {
    fn name(&self) -> &'static str;

    /// Whether this strategy can handle the trace
    fn can_apply(&self, points: &[Point2D]) -> bool;

    fn smooth(&self, points: &[Point2D]) -> Vec<Point2D>;
}

/// Clamped uniform cubic B-spline approximation, resampled at the input point count.
///
/// The end points are repeated so the curve starts and ends exactly on the first and last
/// samples; interior samples act as control points, which pulls noise out of the trace.
pub struct SplineSmoother;

/// Repeats of each end point in the control polygon
const CLAMP_REPEATS: usize = 3;

impl SplineSmoother {
    fn evaluate(control: &[Point2D], u: f64) -> Point2D {
        let segments = control.len() - 3;
        let segment = (u.floor() as usize).min(segments - 1);
        let t = u - segment as f64;
        let t2 = t * t;
        let t3 = t2 * t;

        let weights = [
            (1.0 - t).powi(3) / 6.0,
            (3.0 * t3 - 6.0 * t2 + 4.0) / 6.0,
            (-3.0 * t3 + 3.0 * t2 + 3.0 * t + 1.0) / 6.0,
            t3 / 6.0,
        ];
        let (x, y) = control[segment..segment + 4]
            .iter()
            .zip(weights)
            .fold((0.0, 0.0), |(x, y), (p, w)| (x + w * p.x, y + w * p.y));
        Point2D::new(x, y)
    }
}

impl Smoother for SplineSmoother {
    fn name(&self) -> &'static str {
        "cubic B-spline"
    }

    fn can_apply(&self, points: &[Point2D]) -> bool {
        if points.len() < 4 {
            return false;
        }
        let bbox = BoundingBox::from_points(points);
        bbox.width() > EPSILON || bbox.height() > EPSILON
    }

    fn smooth(&self, points: &[Point2D]) -> Vec<Point2D> {
        let (Some(first), Some(last)) = (points.first(), points.last()) else {
            return Vec::new();
        };
        if points.len() < 2 {
            return points.to_vec();
        }

        let mut control = Vec::with_capacity(points.len() + 2 * (CLAMP_REPEATS - 1));
        control.extend(std::iter::repeat_n(*first, CLAMP_REPEATS - 1));
        control.extend_from_slice(points);
        control.extend(std::iter::repeat_n(*last, CLAMP_REPEATS - 1));

        let n = points.len();
        let span = (control.len() - 3) as f64;
        (0..n)
            .map(|i| Self::evaluate(&control, span * i as f64 / (n - 1) as f64))
            .collect()
    }
}

/// Savitzky-Golay filter applied to each axis.
///
/// The window is a quarter of the trace (capped and forced odd), the polynomial order is
/// capped below the window. Samples within half a window of either end are evaluated on the
/// polynomial fitted to the first or last full window.
pub struct SavgolSmoother {
    max_window: usize,
    poly_order: usize,
}

impl SavgolSmoother {
    pub fn new(max_window: usize, poly_order: usize) -> Self {
        Self {
            max_window,
            poly_order,
        }
    }

    pub fn window_for(&self, len: usize) -> usize {
        let mut window = (len / 4).min(self.max_window).max(3);
        if window % 2 == 0 {
            window += 1;
        }
        window
    }

    pub fn order_for(&self, window: usize) -> usize {
        self.poly_order.min(window - 1)
    }

    /// Least-squares projection from a window of samples to polynomial coefficients
    fn fit_matrix(window: usize, order: usize) -> Option<DMatrix<f64>> {
        let half = (window / 2) as f64;
        let vandermonde =
            DMatrix::from_fn(window, order + 1, |row, col| (row as f64 - half).powi(col as i32));
        let normal = vandermonde.transpose() * &vandermonde;
        normal
            .try_inverse()
            .map(|inverse| inverse * vandermonde.transpose())
    }

    fn polynomial_at(coefficients: &DVector<f64>, x: f64) -> f64 {
        coefficients
            .iter()
            .enumerate()
            .map(|(power, c)| c * x.powi(power as i32))
            .sum()
    }

    fn filter(values: &[f64], window: usize, fit: &DMatrix<f64>) -> Vec<f64> {
        let n = values.len();
        let half = window / 2;
        let coefficients =
            |start: usize| fit * DVector::from_column_slice(&values[start..start + window]);

        let mut filtered = Vec::with_capacity(n);
        let head = coefficients(0);
        for i in 0..half {
            filtered.push(Self::polynomial_at(&head, i as f64 - half as f64));
        }
        for center in half..n - half {
            // the constant term is the fitted value at the window centre
            filtered.push(coefficients(center - half)[0]);
        }
        let tail = coefficients(n - window);
        for i in n - half..n {
            filtered.push(Self::polynomial_at(
                &tail,
                (i - (n - window)) as f64 - half as f64,
            ));
        }
        filtered
    }
}

impl Smoother for SavgolSmoother {
    fn name(&self) -> &'static str {
        "Savitzky-Golay"
    }

    fn can_apply(&self, points: &[Point2D]) -> bool {
        points.len() >= self.window_for(points.len())
    }

    fn smooth(&self, points: &[Point2D]) -> Vec<Point2D> {
        let window = self.window_for(points.len());
        let order = self.order_for(window);
        let Some(fit) = Self::fit_matrix(window, order) else {
            warn!("Savitzky-Golay fit is singular for window {window}, order {order}");
            return points.to_vec();
        };

        let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
        let ys: Vec<f64> = points.iter().map(|p| p.y).collect();
        Self::filter(&xs, window, &fit)
            .into_iter()
            .zip(Self::filter(&ys, window, &fit))
            .map(|(x, y)| Point2D::new(x, y))
            .collect()
    }
}

/// Leaves the trace untouched; always applicable
pub struct IdentitySmoother;

impl Smoother for IdentitySmoother {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn can_apply(&self, _points: &[Point2D]) -> bool {
        true
    }

    fn smooth(&self, points: &[Point2D]) -> Vec<Point2D> {
        points.to_vec()
    }
}

pub fn default_smoothers(config: &TrackConfig) -> Vec<Box<dyn Smoother>> {
    vec![
        Box::new(SplineSmoother),
        Box::new(SavgolSmoother::new(
            config.savgol_max_window,
            config.savgol_poly_order,
        )),
        Box::new(IdentitySmoother),
    ]
}

/// Runs the first applicable strategy
pub fn smooth_trace(points: &[Point2D], smoothers: &[Box<dyn Smoother>]) -> Vec<Point2D> {
    match smoothers.iter().find(|smoother| smoother.can_apply(points)) {
        Some(smoother) => {
            debug!("Smoothing {} points with {}", points.len(), smoother.name());
            smoother.smooth(points)
        }
        None => points.to_vec(),
    }
}
