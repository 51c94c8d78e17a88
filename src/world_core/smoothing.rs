#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::world_core::heightmap::HeightField;

/// Normalized 1D Gaussian weights covering `-radius..=radius`, with
/// `radius = ceil(2 * sigma)`. Weights are built in f64 so tiny sigmas still
/// give a finite kernel.
pub fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let sigma = sigma as f64;
    let two_sigma_sq = 2.0 * sigma * sigma;
    if !two_sigma_sq.is_normal() {
        return vec![1.0];
    }
    let radius = (2.0 * sigma).ceil().max(0.0) as i32;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|i| (-((i * i) as f64) / two_sigma_sq).exp())
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.into_iter().map(|w| (w / sum) as f32).collect()
}

/// Separable Gaussian blur with clamp-to-edge sampling: one pass along rows
/// into a scratch buffer, then one pass along columns back into the field.
/// Non-positive `sigma` leaves the field unchanged.
pub fn gaussian_blur(field: &mut HeightField, sigma: f32) {
    if sigma <= 0.0 || !sigma.is_finite() {
        return;
    }
    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as isize;
    let width = field.width();
    let depth = field.depth();
    let total = width * depth;

    let source = field.values();
    let rows: Vec<f32> = maybe_par_iter!(0..total)
        .map(|idx| {
            let x = (idx % width) as isize;
            let row = idx - idx % width;
            kernel
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    let nx = (x + k as isize - radius).clamp(0, width as isize - 1) as usize;
                    source[row + nx] * w
                })
                .sum::<f32>()
        })
        .collect();

    let columns: Vec<f32> = maybe_par_iter!(0..total)
        .map(|idx| {
            let x = idx % width;
            let z = (idx / width) as isize;
            kernel
                .iter()
                .enumerate()
                .map(|(k, w)| {
                    let nz = (z + k as isize - radius).clamp(0, depth as isize - 1) as usize;
                    rows[nz * width + x] * w
                })
                .sum::<f32>()
        })
        .collect();

    field.values_mut().copy_from_slice(&columns);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let kernel = gaussian_kernel(2.0);
        assert_eq!(kernel.len(), 9);
        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        for i in 0..kernel.len() / 2 {
            assert!((kernel[i] - kernel[kernel.len() - 1 - i]).abs() < 1e-7);
        }
        assert!(kernel[4] > kernel[3]);
    }

    #[test]
    fn constant_field_is_a_fixed_point() {
        let mut field = HeightField::flat(13, 7, 0.42).unwrap();
        gaussian_blur(&mut field, 2.0);
        for &h in field.values() {
            assert!((h - 0.42).abs() < 1e-5, "{h}");
        }
    }

    #[test]
    fn blur_spreads_a_spike_and_keeps_its_mass() {
        let mut values = vec![0.0; 21 * 21];
        values[10 * 21 + 10] = 1.0;
        let mut field = HeightField::from_values(21, 21, values).unwrap();
        gaussian_blur(&mut field, 1.5);

        let centre = field.get(10, 10);
        assert!(centre < 1.0 && centre > 0.0);
        assert!(field.get(11, 10) > 0.0);
        assert!((field.get(9, 10) - field.get(11, 10)).abs() < 1e-6);
        assert!((field.get(10, 9) - field.get(10, 11)).abs() < 1e-6);
        assert!((field.total() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn zero_sigma_is_a_no_op() {
        let mut field = HeightField::from_values(2, 2, vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        let original = field.clone();
        gaussian_blur(&mut field, 0.0);
        assert_eq!(field, original);
    }

    #[test]
    fn vanishing_sigma_keeps_the_field_finite() {
        assert_eq!(gaussian_kernel(1e-23), vec![0.0, 1.0, 0.0]);
        let smallest = gaussian_kernel(f32::from_bits(1));
        assert!(smallest.iter().all(|w| w.is_finite()));

        let mut field =
            HeightField::from_values(4, 4, (0..16).map(|i| i as f32 * 0.1).collect()).unwrap();
        let original = field.clone();
        gaussian_blur(&mut field, 1e-23);
        assert!(field.values().iter().all(|h| h.is_finite()));
        assert_eq!(field, original);
    }

    #[test]
    fn edges_clamp_instead_of_fading() {
        let mut field = HeightField::from_values(4, 1, vec![1.0, 1.0, 0.0, 0.0]).unwrap();
        gaussian_blur(&mut field, 1.0);
        assert!(field.get(0, 0) > 0.5);
        assert!(field.get(3, 0) < 0.5);
        let sum: f32 = field.values().iter().sum();
        assert!((sum - 2.0).abs() < 1e-5);
    }
}
