use std::path::Path;

use image::GrayImage;

use crate::world_core::error::{Result, TerrainError};

/// Dense row-major grid of elevations, `index = z * width + x`.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    width: usize,
    depth: usize,
    values: Vec<f32>,
}

impl HeightField {
    pub fn flat(width: usize, depth: usize, height: f32) -> Result<Self> {
        let cells = check_dimensions(width, depth)?;
        Ok(Self {
            width,
            depth,
            values: vec![height; cells],
        })
    }

    pub fn from_values(width: usize, depth: usize, values: Vec<f32>) -> Result<Self> {
        let cells = check_dimensions(width, depth)?;
        if values.len() != cells {
            return Err(TerrainError::DimensionMismatch {
                expected: cells,
                actual: values.len(),
            });
        }
        Ok(Self {
            width,
            depth,
            values,
        })
    }

    /// Wraps values produced by the crate's own samplers, which always size the
    /// grid from already-validated dimensions.
    pub(crate) fn from_grid(width: usize, depth: usize, values: Vec<f32>) -> Self {
        debug_assert!(width > 0 && depth > 0);
        debug_assert_eq!(values.len(), width * depth);
        Self {
            width,
            depth,
            values,
        }
    }

    /// Converts an 8-bit grayscale image into heights in `[0, 1]`.
    pub fn from_luma(image: &GrayImage) -> Result<Self> {
        let (width, depth) = image.dimensions();
        let values = image
            .as_raw()
            .iter()
            .map(|&p| p as f32 / 255.0)
            .collect();
        Self::from_values(width as usize, depth as usize, values)
    }

    pub fn load_image(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let image = image::open(path).map_err(|source| TerrainError::ImageLoad {
            path: path.to_path_buf(),
            source,
        })?;
        let field = Self::from_luma(&image.to_luma8())?;
        log::info!(
            "loaded heightmap {} ({}x{})",
            path.display(),
            field.width,
            field.depth
        );
        Ok(field)
    }

    /// Maps the field's own min..max range onto 0..255.
    pub fn to_luma(&self) -> GrayImage {
        let (min, max) = self.range();
        let span = max - min;
        let pixels = self
            .values
            .iter()
            .map(|&h| {
                if span > f32::EPSILON {
                    (((h - min) / span) * 255.0).round() as u8
                } else {
                    0
                }
            })
            .collect();
        // Length always matches width * depth.
        GrayImage::from_raw(self.width as u32, self.depth as u32, pixels)
            .unwrap_or_else(|| GrayImage::new(self.width as u32, self.depth as u32))
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.to_luma()
            .save(path)
            .map_err(|source| TerrainError::ImageSave {
                path: path.to_path_buf(),
                source,
            })?;
        log::info!("wrote heightmap {}", path.display());
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn index(&self, x: usize, z: usize) -> usize {
        debug_assert!(x < self.width && z < self.depth, "({x}, {z}) out of range");
        z * self.width + x
    }

    #[inline]
    pub fn get(&self, x: usize, z: usize) -> f32 {
        self.values[self.index(x, z)]
    }

    /// Height at a signed coordinate, clamped to the nearest edge cell.
    #[inline]
    pub fn get_clamped(&self, x: isize, z: isize) -> f32 {
        let x = x.clamp(0, self.width as isize - 1) as usize;
        let z = z.clamp(0, self.depth as isize - 1) as usize;
        self.get(x, z)
    }

    pub fn set(&mut self, x: usize, z: usize, height: f32) {
        let idx = self.index(x, z);
        self.values[idx] = height;
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    pub fn into_values(self) -> Vec<f32> {
        self.values
    }

    pub fn range(&self) -> (f32, f32) {
        self.values
            .iter()
            .fold((f32::MAX, f32::MIN), |(min_h, max_h), h| {
                (min_h.min(*h), max_h.max(*h))
            })
    }

    pub fn total(&self) -> f64 {
        self.values.iter().map(|&h| h as f64).sum()
    }
}

/// Number of cells in a `width` x `depth` grid, or `InvalidDimensions` when
/// either side is zero or the count does not fit in `usize`.
pub(crate) fn check_dimensions(width: usize, depth: usize) -> Result<usize> {
    match width.checked_mul(depth) {
        Some(cells) if cells > 0 => Ok(cells),
        _ => Err(TerrainError::InvalidDimensions { width, depth }),
    }
}
