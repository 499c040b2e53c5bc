//! Closed-form decay and nitrogen allocation shared by the lumped treatment units.

/// Loss after first-order decay over `t`, averaged over the residence time.
///
/// `tot` decays towards `tot * (1 - max_decay)` with rate constant `k`; the returned
/// value is the mean amount lost, `tot*max_decay*(1 - (1 - e^(-k t))/(k t))`.
/// Zero when `k*t` is zero.
pub fn first_order_decay(k: f64, t: f64, max_decay: f64, tot: f64) -> f64 {
    let kt = k * t;
    if kt == 0.0 {
        return 0.0;
    }
    let potential = tot * max_decay;
    potential - potential / kt * (1.0 - (-kt).exp())
}

/// Splits a nitrogen removal between ammonia and the remaining nitrogen species.
/// Ammonia is drawn first; returns `(from_ammonia, from_others)`.
pub fn allocate_N_removal(total_removed: f64, ammonia: f64) -> (f64, f64) {
    let from_ammonia = total_removed.min(ammonia.max(0.0));
    (from_ammonia, total_removed - from_ammonia)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_first_order_decay() {
        assert_eq!(first_order_decay(0.0, 10.0, 0.8, 100.0), 0.0);
        assert_eq!(first_order_decay(3.0, 0.0, 0.8, 100.0), 0.0);
        // k t = 1
        let expected = 80.0 - 80.0 * (1.0 - (-1.0f64).exp());
        assert_relative_eq!(first_order_decay(0.5, 2.0, 0.8, 100.0), expected, epsilon = 1e-12);
        // very long residence approaches the maximum
        assert_relative_eq!(first_order_decay(1.0, 1e6, 0.8, 100.0), 80.0, epsilon = 1e-3);
        assert!(first_order_decay(1.0, 1.0, 0.8, 100.0) < 80.0);
    }

    #[test]
    fn test_allocate_N_removal() {
        assert_eq!(allocate_N_removal(5.0, 8.0), (5.0, 0.0));
        assert_eq!(allocate_N_removal(10.0, 8.0), (8.0, 2.0));
        assert_eq!(allocate_N_removal(3.0, 0.0), (0.0, 3.0));
    }
}
