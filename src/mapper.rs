//! Slider position ↔ physical value conversion.
//!
//! Positions live on `[0, 100]`. Logarithmic specs interpolate in log space
//! so every octave of a frequency range gets the same slider travel.

use crate::effect::{EffectSpec, Unit};

/// Full slider travel.
pub const POSITION_MAX: f64 = 100.0;

/// Map a slider position to a physical value.
///
/// Positions outside `[0, 100]` extrapolate; callers clamp.
pub fn to_physical(spec: &EffectSpec, position: f64) -> f64 {
    let t = position / POSITION_MAX;
    if spec.logarithmic {
        let log_min = spec.min_value.ln();
        let log_max = spec.max_value.ln();
        (log_min + t * (log_max - log_min)).exp()
    } else {
        spec.min_value + t * (spec.max_value - spec.min_value)
    }
}

/// Inverse of [`to_physical`].
pub fn to_position(spec: &EffectSpec, value: f64) -> f64 {
    let t = if spec.logarithmic {
        let log_min = spec.min_value.ln();
        let log_max = spec.max_value.ln();
        (value.ln() - log_min) / (log_max - log_min)
    } else {
        (value - spec.min_value) / (spec.max_value - spec.min_value)
    };
    t * POSITION_MAX
}

/// Physical value at the slider midpoint, where every session starts.
pub fn midpoint(spec: &EffectSpec) -> f64 {
    to_physical(spec, POSITION_MAX / 2.0)
}

/// Render a value for display next to its slider.
pub fn format_value(value: f64, unit: Unit) -> String {
    match unit {
        // 632 Hz renders as "0.6k".
        Unit::Hz if value.abs() >= 100.0 => format!("{:.1}k", value / 1000.0),
        Unit::Hz => format!("{value:.2} Hz"),
        Unit::Decibels => format!("{value:.1} dB"),
        Unit::Percent => format!("{value:.0}%"),
        Unit::Milliseconds => format!("{value:.0} ms"),
        Unit::Ratio => format!("{value:.1}:1"),
        Unit::None => format!("{value:.2}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{EffectParam, EffectType};
    use approx::assert_relative_eq;

    fn eq_spec() -> EffectSpec {
        EffectSpec::new(EffectParam::Frequency, Unit::Hz, 20.0, 20_000.0, true)
    }

    #[test]
    fn log_midpoint_is_geometric_mean() {
        let v = to_physical(&eq_spec(), 50.0);
        assert_relative_eq!(v, (20.0_f64 * 20_000.0).sqrt(), max_relative = 1e-9);
        assert_eq!(format_value(v, Unit::Hz), "0.6k");
    }

    #[test]
    fn endpoints_hit_range_limits() {
        for effect in EffectType::ALL {
            let spec = effect.spec();
            assert_relative_eq!(to_physical(&spec, 0.0), spec.min_value, max_relative = 1e-9);
            assert_relative_eq!(to_physical(&spec, 100.0), spec.max_value, max_relative = 1e-9);
        }
    }

    #[test]
    fn round_trip_all_specs() {
        for effect in EffectType::ALL {
            let spec = effect.spec();
            for step in 0..=200 {
                let p = step as f64 * 0.5;
                let back = to_position(&spec, to_physical(&spec, p));
                assert!(
                    (back - p).abs() <= 1e-6 * p.abs().max(1.0),
                    "{effect}: position {p} came back as {back}"
                );
            }
        }
    }

    #[test]
    fn linear_midpoint() {
        let spec = EffectType::Reverb.spec();
        assert_relative_eq!(to_physical(&spec, 50.0), 50.0);
        assert_relative_eq!(to_position(&spec, 25.0), 25.0);
        assert_relative_eq!(midpoint(&EffectType::Compression.spec()), -30.0);
    }

    #[test]
    fn out_of_range_values_are_not_rejected() {
        let spec = EffectType::Reverb.spec();
        assert_relative_eq!(to_position(&spec, 150.0), 150.0);
        assert_relative_eq!(to_physical(&spec, -10.0), -10.0);
    }

    #[test]
    fn formatting_per_unit() {
        assert_eq!(format_value(1200.0, Unit::Hz), "1.2k");
        assert_eq!(format_value(15_000.0, Unit::Hz), "15.0k");
        assert_eq!(format_value(0.8, Unit::Hz), "0.80 Hz");
        assert_eq!(format_value(42.4, Unit::Percent), "42%");
        assert_eq!(format_value(249.6, Unit::Milliseconds), "250 ms");
        assert_eq!(format_value(-24.04, Unit::Decibels), "-24.0 dB");
        assert_eq!(format_value(4.0, Unit::Ratio), "4.0:1");
        assert_eq!(format_value(0.7071, Unit::None), "0.71");
    }
}
