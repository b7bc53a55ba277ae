//! 1-D Gaussian smoothing.
//!
//! Kernel radius is `floor(truncate * sigma + 0.5)` and weights are normalised
//! to sum to one. Samples beyond either end are mirrored about the edge
//! (`d c b a | a b c d | d c b a`). Mirroring is done by folding indices, so a
//! radius larger than the input is well defined: a single sample is returned
//! unchanged, and interior mass is preserved.

/// Kernels longer than this many reflection periods are truncated when
/// folded. The weights left out are negligible against the folded mass.
const MAX_FOLDED_PERIODS: i64 = 64;

/// Smooth `values` with a Gaussian of standard deviation `sigma` (in samples).
///
/// Non-positive or non-finite `sigma` returns the input unchanged. A kernel
/// wider than the input is folded onto one reflection period, so memory and
/// time stay bounded by the input length whatever `sigma` is.
pub fn gaussian_smooth(values: &[f64], sigma: f64, truncate: f64) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    if values.len() == 1 || !(sigma.is_finite() && sigma > 0.0) {
        return values.to_vec();
    }

    let len = values.len() as i64;
    let radius = kernel_radius(sigma, truncate);
    if radius < len {
        let kernel = gaussian_kernel(sigma, radius);
        (0..len)
            .map(|i| {
                kernel
                    .iter()
                    .enumerate()
                    .map(|(k, weight)| weight * values[reflect_index(i + k as i64 - radius, len)])
                    .sum()
            })
            .collect()
    } else {
        let weights = folded_kernel(sigma, radius, len);
        (0..len)
            .map(|i| {
                weights
                    .iter()
                    .enumerate()
                    .map(|(m, weight)| weight * values[reflect_index(i + m as i64, len)])
                    .sum()
            })
            .collect()
    }
}

/// `floor(truncate * sigma + 0.5)`, saturating for huge products.
fn kernel_radius(sigma: f64, truncate: f64) -> i64 {
    (truncate.max(0.0) * sigma + 0.5).floor() as i64
}

fn gaussian_weight(offset: i64, sigma: f64) -> f64 {
    let x = offset as f64;
    (-(x * x) / (2.0 * sigma * sigma)).exp()
}

/// Normalised weights for offsets `-radius..=radius`.
fn gaussian_kernel(sigma: f64, radius: i64) -> Vec<f64> {
    let raw: Vec<f64> = (-radius..=radius)
        .map(|x| gaussian_weight(x, sigma))
        .collect();
    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|w| w / total).collect()
}

/// Kernel weights summed by offset modulo the reflection period `2 * len`.
/// Reflection repeats with that period, so entry `m` weighs the sample at
/// `reflect_index(i + m)` exactly as the full kernel would.
fn folded_kernel(sigma: f64, radius: i64, len: i64) -> Vec<f64> {
    let period = 2 * len;
    let radius = radius.min(MAX_FOLDED_PERIODS * period);
    let mut bins = vec![0.0; period as usize];
    for offset in -radius..=radius {
        bins[offset.rem_euclid(period) as usize] += gaussian_weight(offset, sigma);
    }
    let total: f64 = bins.iter().sum();
    bins.into_iter().map(|w| w / total).collect()
}

/// Fold an out-of-range index back into `0..len` by half-sample symmetric
/// reflection, repeating as often as needed.
fn reflect_index(index: i64, len: i64) -> usize {
    let period = 2 * len;
    let folded = index.rem_euclid(period);
    if folded < len {
        folded as usize
    } else {
        (period - 1 - folded) as usize
    }
}
