//! Metrics behind each dashboard view

pub mod customers;
pub mod inventory;
pub mod marketing;
pub mod products;
pub mod sales;

/// Arithmetic mean of the present values; 0 when there are none
pub(crate) fn mean(values: impl IntoIterator<Item = Option<f64>>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_skips_missing_values() {
        assert_eq!(mean([Some(1.0), None, Some(3.0)]), 2.0);
        assert_eq!(mean(Vec::new()), 0.0);
        assert_eq!(mean([None, None]), 0.0);
    }
}
