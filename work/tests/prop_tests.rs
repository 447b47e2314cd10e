use proptest::prelude::*;

use lattice_work::{from_multiplier, to_multiplier, WorkThresholds};

fn thresholds_under_test() -> Vec<WorkThresholds> {
    vec![
        WorkThresholds::publish_full(),
        WorkThresholds::publish_beta(),
        WorkThresholds::publish_dev(),
    ]
}

proptest! {
    /// normalize then denormalize returns the original for every base threshold.
    #[test]
    fn normalization_round_trips(multiplier in 1.0f64..1024.0) {
        for t in thresholds_under_test() {
            for threshold in [t.epoch_1, t.epoch_2, t.epoch_2_receive] {
                let normalized = t.normalized_multiplier(multiplier, threshold);
                let back = t.denormalized_multiplier(normalized, threshold);
                prop_assert!((back - multiplier).abs() < 1e-10 * multiplier.max(1.0));
            }
        }
    }

    /// Normalization keeps the order of multipliers measured against one threshold.
    #[test]
    fn normalization_is_monotonic(a in 1.0f64..512.0, b in 1.0f64..512.0) {
        let t = WorkThresholds::publish_full();
        for threshold in [t.epoch_1, t.epoch_2, t.epoch_2_receive] {
            let na = t.normalized_multiplier(a, threshold);
            let nb = t.normalized_multiplier(b, threshold);
            if b - a > 1e-6 {
                prop_assert!(na < nb);
            }
        }
    }

    /// A higher difficulty never yields a lower multiplier.
    #[test]
    fn multiplier_orders_difficulty(a in 0xf000000000000000u64.., b in 0xf000000000000000u64..) {
        let base = 0xf000000000000000;
        if a < b {
            prop_assert!(to_multiplier(a, base) <= to_multiplier(b, base));
        }
    }

    /// from_multiplier(to_multiplier(d)) stays close to d.
    #[test]
    fn from_multiplier_inverts(difficulty in 0xfe00000000000000u64..0xffffff0000000000) {
        let base = 0xfe00000000000000;
        let back = from_multiplier(to_multiplier(difficulty, base), base);
        let error = back.abs_diff(difficulty);
        prop_assert!(error <= (difficulty.wrapping_neg() >> 40).max(1));
    }
}
