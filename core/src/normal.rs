//! Standard normal and chi-squared(1) helpers.
//!
//! Closed-form approximations only; accuracy is well past the four
//! decimals results are reported with.

use std::f64::consts::SQRT_2;

/// Complementary error function. Chebyshev fit, fractional error < 1.2e-7.
pub fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87
                                    + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let ans = t * poly.exp();
    if x >= 0.0 {
        ans
    } else {
        2.0 - ans
    }
}

/// Survival function `P(Z > x)` of the standard normal.
pub fn normal_sf(x: f64) -> f64 {
    0.5 * erfc(x / SQRT_2)
}

/// Inverse CDF of the standard normal (Acklam's rational approximation,
/// relative error < 1.2e-9). Returns NaN outside `(0, 1)`.
pub fn normal_ppf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_690e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: f64 = 0.024_25;

    if !(p > 0.0 && p < 1.0) {
        return f64::NAN;
    }

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}

/// Inverse survival function: the `z` with `P(Z > z) = q`.
pub fn normal_isf(q: f64) -> f64 {
    -normal_ppf(q)
}

/// Survival function of the chi-squared distribution with one degree of freedom.
pub fn chi2_sf_1dof(stat: f64) -> f64 {
    if stat <= 0.0 {
        return 1.0;
    }
    erfc((stat / 2.0).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_sided_95_critical_value() {
        let z = normal_isf(0.025);
        assert!((z - 1.959_963_984_540_054).abs() < 1e-6, "z = {z}");
    }

    #[test]
    fn ppf_is_symmetric_and_monotonic() {
        assert!(normal_ppf(0.5).abs() < 1e-12);
        for p in [0.001, 0.01, 0.2, 0.4] {
            assert!((normal_ppf(p) + normal_ppf(1.0 - p)).abs() < 1e-8);
            assert!(normal_ppf(p) < normal_ppf(p + 0.05));
        }
        assert!(normal_ppf(0.0).is_nan());
        assert!(normal_ppf(1.0).is_nan());
    }

    #[test]
    fn erfc_matches_reference_values() {
        assert!((erfc(0.0) - 1.0).abs() < 1e-7);
        assert!((erfc(1.0) - 0.157_299_207_050_285).abs() < 1e-7);
        assert!((erfc(-0.5) - 1.520_499_877_813_047).abs() < 1e-7);
        assert!((normal_sf(1.959_964) - 0.025).abs() < 1e-7);
    }

    #[test]
    fn chi2_survival_at_known_points() {
        // 3.841 is the 95th percentile of chi2(1)
        assert!((chi2_sf_1dof(3.841_458_820_694_124) - 0.05).abs() < 1e-6);
        assert_eq!(chi2_sf_1dof(0.0), 1.0);
    }
}
