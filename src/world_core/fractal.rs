use crate::world_core::config::NoiseConfig;
use crate::world_core::noise::NoiseSource;

/// Offset applied to the second warp sample so it decorrelates from the first.
const WARP_DECORRELATION: f64 = 5.0;

/// Fractal Brownian motion, normalized by the total amplitude so the result
/// stays within the range of a single octave.
pub fn fbm<N: NoiseSource + ?Sized>(
    noise: &N,
    x: f64,
    y: f64,
    octaves: u32,
    persistence: f64,
    lacunarity: f64,
) -> f64 {
    accumulate(octaves, persistence, lacunarity, |frequency| {
        noise.sample(x * frequency, y * frequency)
    })
}

/// Like [`fbm`] but each octave is folded into `(1 - |n|)^2`, which turns
/// zero crossings into sharp crests.
pub fn ridged<N: NoiseSource + ?Sized>(
    noise: &N,
    x: f64,
    y: f64,
    octaves: u32,
    persistence: f64,
    lacunarity: f64,
) -> f64 {
    accumulate(octaves, persistence, lacunarity, |frequency| {
        let ridge = 1.0 - noise.sample(x * frequency, y * frequency).abs();
        ridge * ridge
    })
}

pub fn domain_warp<N: NoiseSource + ?Sized>(noise: &N, x: f64, y: f64, warp_factor: f64) -> f64 {
    let warp_x = noise.sample(x * warp_factor, y * warp_factor);
    let warp_y = noise.sample(
        (x + WARP_DECORRELATION) * warp_factor,
        (y + WARP_DECORRELATION) * warp_factor,
    );
    noise.sample(x + warp_x, y + warp_y)
}

/// Snaps `value` down to the nearest multiple of `1 / steps`. Zero steps
/// disables terracing.
pub fn terrace(value: f64, steps: u32) -> f64 {
    if steps == 0 {
        return value;
    }
    let step = 1.0 / steps as f64;
    (value / step).floor() * step
}

fn accumulate(
    octaves: u32,
    persistence: f64,
    lacunarity: f64,
    mut octave: impl FnMut(f64) -> f64,
) -> f64 {
    let mut total = 0.0;
    let mut frequency = 1.0;
    let mut amplitude = 1.0;
    let mut max_value = 0.0;

    for _ in 0..octaves {
        total += octave(frequency) * amplitude;
        max_value += amplitude;
        amplitude *= persistence;
        frequency *= lacunarity;
    }

    if max_value > 0.0 {
        total / max_value
    } else {
        0.0
    }
}

/// Blends warped and ridged noise, then terraces the result.
pub struct FractalComposer<'a, N: NoiseSource + ?Sized> {
    noise: &'a N,
    config: &'a NoiseConfig,
}

impl<'a, N: NoiseSource + ?Sized> FractalComposer<'a, N> {
    pub fn new(noise: &'a N, config: &'a NoiseConfig) -> Self {
        Self { noise, config }
    }

    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let c = self.config;
        let crest = ridged(self.noise, x, y, c.octaves, c.persistence, c.lacunarity);
        let warped = domain_warp(self.noise, x, y, c.warp_factor);
        terrace(
            warped * c.warp_weight + crest * c.ridged_weight,
            c.terrace_steps,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world_core::noise::GradientNoise;
    use crate::world_core::permutation::PermutationTable;

    fn sample_points() -> impl Iterator<Item = (f64, f64)> {
        (0..60).flat_map(|i| (0..60).map(move |j| (i as f64 * 0.37 - 11.0, j as f64 * 0.53 - 7.0)))
    }

    #[test]
    fn fbm_is_bounded_for_any_octave_count() {
        let noise = GradientNoise::new(PermutationTable::from_seed(42));
        for octaves in [1, 2, 5, 9] {
            for persistence in [0.3, 0.5, 1.0] {
                for (x, y) in sample_points() {
                    let v = fbm(&noise, x, y, octaves, persistence, 2.2);
                    assert!(v.abs() <= 1.0 + 1e-9, "fbm = {v} at {octaves} octaves");
                }
            }
        }
    }

    #[test]
    fn single_octave_fbm_is_plain_noise() {
        let noise = GradientNoise::new(PermutationTable::from_seed(8));
        for (x, y) in sample_points().take(50) {
            assert_eq!(fbm(&noise, x, y, 1, 0.5, 2.0), noise.sample(x, y));
        }
    }

    #[test]
    fn ridged_is_between_zero_and_one() {
        let noise = GradientNoise::new(PermutationTable::from_seed(42));
        for (x, y) in sample_points() {
            let v = ridged(&noise, x, y, 5, 1.0, 2.2);
            assert!((0.0..=1.0 + 1e-9).contains(&v), "ridged = {v}");
        }
    }

    #[test]
    fn zero_octaves_is_flat() {
        let noise = GradientNoise::new(PermutationTable::from_seed(1));
        assert_eq!(fbm(&noise, 0.3, 0.7, 0, 0.5, 2.0), 0.0);
        assert_eq!(ridged(&noise, 0.3, 0.7, 0, 0.5, 2.0), 0.0);
    }

    #[test]
    fn terrace_quantizes_to_steps() {
        assert!((terrace(0.37, 10) - 0.3).abs() < 1e-12);
        assert!((terrace(0.99, 4) - 0.75).abs() < 1e-12);
        assert!((terrace(-0.05, 10) + 0.1).abs() < 1e-12);
        assert_eq!(terrace(0.37, 0), 0.37);
    }

    #[test]
    fn composed_values_land_on_terrace_steps() {
        let noise = GradientNoise::new(PermutationTable::from_seed(42));
        let config = NoiseConfig::default();
        let composer = FractalComposer::new(&noise, &config);
        for (x, y) in sample_points().take(200) {
            let v = composer.sample(x * 0.1, y * 0.1);
            let scaled = v * config.terrace_steps as f64;
            assert!((scaled - scaled.round()).abs() < 1e-9, "{v} is not on a step");
        }
    }

    #[test]
    fn domain_warp_is_deterministic() {
        let noise = GradientNoise::new(PermutationTable::from_seed(42));
        let a = domain_warp(&noise, 12.5, 3.25, 0.05);
        let b = domain_warp(&noise, 12.5, 3.25, 0.05);
        assert_eq!(a, b);
        assert!(a.abs() <= 1.0 + 1e-9);
    }
}
