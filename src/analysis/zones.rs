use crate::models::SwingPoint;

/// Reduces same-kind swing points to a well-separated ladder.
///
/// The first point is always kept. A later point is accepted only when it is
/// at least `min_distance` bars after the last accepted one and its price
/// differs from it by more than `min_price_delta` (a fraction of the accepted
/// price).
pub fn filter_zones(points: &[SwingPoint], min_distance: usize, min_price_delta: f64) -> Vec<SwingPoint> {
    let mut zones: Vec<SwingPoint> = Vec::with_capacity(points.len());

    for point in points {
        let accept = match zones.last() {
            None => true,
            Some(last) => {
                let far_enough = point.index >= last.index + min_distance;
                let distinct = (point.price - last.price).abs() > min_price_delta * last.price.abs();
                far_enough && distinct
            }
        };

        if accept {
            zones.push(*point);
        }
    }

    zones
}
