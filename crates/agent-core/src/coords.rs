//! Mapping between the model's normalized action space and device pixels.

use webpilot_core_types::{Point, Viewport};

/// The model expresses coordinates on this fixed grid regardless of the
/// actual device resolution.
pub const MODEL_SPACE: Viewport = Viewport::new(1000, 1000);

/// Scale a point from one coordinate space into another.
///
/// The target space is expected to be the live viewport, queried fresh
/// before every use since it may change between turns. Out-of-range inputs
/// are the caller's problem; this function only scales and rounds.
pub fn map_point(point: Point, from: Viewport, to: Viewport) -> Point {
    Point::new(
        ((point.x as f64 / from.width as f64) * to.width as f64).round() as i32,
        ((point.y as f64 / from.height as f64) * to.height as f64).round() as i32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_model_space_to_viewport() {
        let mapped = map_point(
            Point::new(500, 500),
            MODEL_SPACE,
            Viewport::new(1600, 800),
        );
        assert_eq!(mapped, Point::new(800, 400));
    }

    #[test]
    fn round_trip_stays_within_one_unit() {
        let viewports = [
            Viewport::new(1600, 800),
            Viewport::new(1366, 768),
            Viewport::new(799, 601),
        ];
        for viewport in viewports {
            for (x, y) in [(0, 0), (1, 999), (333, 667), (1000, 1000), (997, 3)] {
                let original = Point::new(x, y);
                let there = map_point(original, MODEL_SPACE, viewport);
                let back = map_point(there, viewport, MODEL_SPACE);
                assert!(
                    (back.x - original.x).abs() <= 1 && (back.y - original.y).abs() <= 1,
                    "{original} -> {there} -> {back} via {viewport}"
                );
            }
        }
    }

    #[test]
    fn identity_mapping_is_exact() {
        let p = Point::new(123, 456);
        assert_eq!(map_point(p, MODEL_SPACE, MODEL_SPACE), p);
    }
}
