//! Angle utilities used across the recognition pipeline.
//!
//! All angles are elevations in degrees over (0, 180], measured in the
//! raster frame (y grows downward): a horizontal segment has elevation 180
//! (0 once folded), a vertical one 90.

use nalgebra::Point2;

/// Elevation angle (degrees, (0, 180]) of the line joining two points.
///
/// Coincident points yield 0; a vertical segment yields 90.
#[inline]
pub fn elevation(a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    if a.x == b.x {
        if a.y == b.y {
            return 0.0;
        }
        return 90.0;
    }
    let slope = (a.y - b.y) / (a.x - b.x);
    let mut theta = slope.atan().to_degrees();
    if theta < 0.0 {
        theta += 180.0;
    }
    180.0 - theta
}

/// Elevation folded into [0, 90]: bars read the same left-to-right as
/// right-to-left.
#[inline]
pub fn folded_elevation(a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    let e = elevation(a, b);
    if e > 90.0 {
        180.0 - e
    } else {
        e
    }
}

/// True when two elevations are within `tol_deg` of collinear, checking the
/// direct difference and the 180°-complement case.
#[inline]
pub fn collinear_within(e1: f64, e2: f64, tol_deg: f64) -> bool {
    let direct = (e1 - e2).abs();
    let wrapped = 180.0 - e1.max(e2) + e1.min(e2);
    direct <= tol_deg || wrapped <= tol_deg
}

/// Euclidean distance rounded to the nearest integral pixel count.
///
/// The recognition heuristics were tuned against integral distances; the
/// rounding is part of the contract (notably the mean-shift freeze test).
#[inline]
pub fn pixel_distance(a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    (dx * dx + dy * dy).sqrt().round()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point2<f64> {
        Point2::new(x, y)
    }

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn elevation_basic_directions() {
        assert!(approx_eq(elevation(&p(0.0, 0.0), &p(10.0, 0.0)), 180.0));
        assert!(approx_eq(elevation(&p(10.0, 0.0), &p(0.0, 0.0)), 180.0));
        assert!(approx_eq(elevation(&p(0.0, 0.0), &p(0.0, 5.0)), 90.0));
        assert!(approx_eq(elevation(&p(3.0, 3.0), &p(3.0, 3.0)), 0.0));
    }

    #[test]
    fn elevation_rises_in_raster_frame() {
        // Down-left to up-right at 45° in screen coordinates.
        let e = elevation(&p(0.0, 10.0), &p(10.0, 0.0));
        assert!(approx_eq(e, 135.0), "got {e}");
        let f = folded_elevation(&p(0.0, 10.0), &p(10.0, 0.0));
        assert!(approx_eq(f, 45.0), "got {f}");
    }

    #[test]
    fn collinearity_handles_wraparound() {
        assert!(collinear_within(5.0, 175.0, 20.0));
        assert!(collinear_within(88.0, 95.0, 20.0));
        assert!(!collinear_within(10.0, 80.0, 20.0));
    }

    #[test]
    fn pixel_distance_rounds() {
        assert!(approx_eq(pixel_distance(&p(0.0, 0.0), &p(3.0, 4.0)), 5.0));
        assert!(approx_eq(pixel_distance(&p(0.0, 0.0), &p(1.0, 1.0)), 1.0));
        assert!(approx_eq(pixel_distance(&p(0.0, 0.0), &p(0.3, 0.0)), 0.0));
    }
}
