use cadence_core::calibration::{
    CalibrationPoint, MAX_MULTIPLIER, MIN_MULTIPLIER, fit_coefficients,
};
use cadence_core::fusion::CadenceSmoother;
use proptest::prelude::*;

prop_compose! {
    // Points lying exactly on target = m * measured + b, at distinct measured tempos.
    fn points_on_a_line()(
        m in 0.55f64..1.95,
        b in -40.0f64..40.0,
        xs in prop::collection::btree_set(40u32..160, 2..8),
    ) -> (f64, f64, Vec<CalibrationPoint>) {
        let pts = xs
            .iter()
            .map(|&x| {
                let x = f64::from(x);
                CalibrationPoint::new(m * x + b, x)
            })
            .collect();
        (m, b, pts)
    }
}

prop_compose! {
    // Cadence values that never leave a 2 BPM band.
    fn values_within_hysteresis()(
        base in 40u32..160,
        offsets in prop::collection::vec(0.0f64..=2.0, 1..60),
    ) -> Vec<f64> {
        offsets.into_iter().map(|o| f64::from(base) + o).collect()
    }
}

proptest! {
    #[test]
    fn regression_recovers_the_line((m, b, pts) in points_on_a_line()) {
        let c = fit_coefficients(&pts);
        prop_assert!((c.multiplier - m).abs() < 1e-6, "multiplier {} vs {}", c.multiplier, m);
        prop_assert!((c.offset - b).abs() < 1e-4, "offset {} vs {}", c.offset, b);
    }

    #[test]
    fn fitted_multiplier_is_always_in_range(
        raw in prop::collection::vec((10.0f64..300.0, 10.0f64..300.0), 0..10)
    ) {
        let pts: Vec<_> = raw.iter().map(|&(t, m)| CalibrationPoint::new(t, m)).collect();
        let c = fit_coefficients(&pts);
        prop_assert!((MIN_MULTIPLIER..=MAX_MULTIPLIER).contains(&c.multiplier));
        prop_assert!(c.offset.is_finite());
    }

    #[test]
    fn hysteresis_publishes_once_inside_the_band(values in values_within_hysteresis()) {
        let mut s = CadenceSmoother::new(5, 2.0);
        let publishes = values.iter().filter(|&&v| s.push(v).publish.is_some()).count();
        prop_assert_eq!(publishes, 1);
    }

    #[test]
    fn median_output_stays_within_the_input_range(
        values in prop::collection::vec(40.0f64..160.0, 1..40)
    ) {
        let mut s = CadenceSmoother::new(5, 2.0);
        for (i, v) in values.iter().enumerate() {
            let out = s.push(*v);
            let recent = &values[i.saturating_sub(4)..=i];
            let lo = recent.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = recent.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(out.median >= lo && out.median <= hi);
        }
    }
}
