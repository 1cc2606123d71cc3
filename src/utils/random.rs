//! Random sampling helpers shared by the environment and the policy
//!
//! Both the initial cart-pole state and the network weight initialization
//! draw from a standard normal produced with the Box–Muller transform.

use rand::Rng;

/// Draw a uniform sample on the open interval (0, 1)
///
/// `Rng::gen::<f64>()` yields values in [0, 1); zero draws are resampled so
/// the result is always safe to pass to `ln`.
pub fn sample_unit_open<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    loop {
        let u: f64 = rng.gen();
        if u != 0.0 {
            return u;
        }
    }
}

/// Draw a standard normal sample with the Box–Muller transform
///
/// ```text
/// z = sqrt(-2 ln u) * cos(2π v),   u, v ~ U(0, 1)
/// ```
pub fn sample_standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u = sample_unit_open(rng);
    let v = sample_unit_open(rng);
    (-2.0 * u.ln()).sqrt() * (2.0 * std::f64::consts::PI * v).cos()
}

/// Draw a normal sample with the given standard deviation and zero mean
pub fn sample_normal<R: Rng + ?Sized>(rng: &mut R, std_dev: f64) -> f64 {
    sample_standard_normal(rng) * std_dev
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn test_unit_open_never_zero() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let u = sample_unit_open(&mut rng);
            assert!(u > 0.0 && u < 1.0, "sample {} outside (0, 1)", u);
        }
    }

    #[test]
    fn test_standard_normal_moments() {
        let mut rng = StdRng::seed_from_u64(42);
        let n = 50_000;
        let samples: Vec<f64> = (0..n).map(|_| sample_standard_normal(&mut rng)).collect();

        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;

        assert!(mean.abs() < 0.02, "mean {} should be near 0", mean);
        assert!((var - 1.0).abs() < 0.03, "variance {} should be near 1", var);
    }

    #[test]
    fn test_seeded_sampler_is_reproducible() {
        let mut a = StdRng::seed_from_u64(3);
        let mut b = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            assert_eq!(sample_normal(&mut a, 0.05), sample_normal(&mut b, 0.05));
        }
    }
}
