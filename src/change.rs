//! Percentage change over a series

/// Percentage change from `first_price` to `last_price`.
///
/// Returns 0 when `first_price` is zero or negative.
pub fn change_percentage(first_price: f64, last_price: f64) -> f64 {
    if first_price > 0.0 {
        (last_price - first_price) / first_price * 100.0
    } else {
        0.0
    }
}
