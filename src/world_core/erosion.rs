//! Grid-based erosion.
//!
//! Every model works in two phases per iteration: all transfers are computed
//! from the heights as they stood at the start of the sweep, then applied in
//! bulk. Results therefore do not depend on traversal order. Border cells
//! never emit material, so the outermost ring is only ever a destination.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::world_core::config::{ErosionConfig, ErosionStrategy};
use crate::world_core::heightmap::HeightField;

/// Transient per-cell quantities, alive only while a simulation runs.
pub struct ErosionState {
    water: Vec<f32>,
    sediment: Vec<f32>,
    water_delta: Vec<f32>,
}

impl ErosionState {
    pub fn new(cells: usize) -> Self {
        Self {
            water: vec![0.0; cells],
            sediment: vec![0.0; cells],
            water_delta: vec![0.0; cells],
        }
    }

    pub fn water(&self) -> &[f32] {
        &self.water
    }

    /// Height change produced by the most recent iteration.
    pub fn sediment(&self) -> &[f32] {
        &self.sediment
    }

    fn begin_iteration(&mut self) {
        self.sediment.fill(0.0);
        self.water_delta.fill(0.0);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ErosionStats {
    pub iterations: u32,
    pub cancelled: bool,
    pub material_moved: f64,
}

pub trait ErosionModel {
    /// Runs one full sweep and returns the amount of material moved.
    fn iterate(&self, field: &mut HeightField, state: &mut ErosionState) -> f64;
}

/// Water-driven transport: each interior cell sends a share of its water,
/// and the sediment it carries, to every lower 4-neighbour in proportion to
/// the drop towards it.
pub struct FlowErosion {
    flow_fraction: f32,
    sediment_capacity: f32,
    rain: f32,
    evaporation: f32,
}

impl FlowErosion {
    pub fn new(config: &ErosionConfig) -> Self {
        Self {
            flow_fraction: config.flow_fraction,
            sediment_capacity: config.sediment_capacity,
            rain: config.rain,
            evaporation: config.evaporation.clamp(0.0, 1.0),
        }
    }
}

impl ErosionModel for FlowErosion {
    fn iterate(&self, field: &mut HeightField, state: &mut ErosionState) -> f64 {
        let width = field.width();
        let depth = field.depth();
        let mut moved = 0.0f64;

        state.begin_iteration();
        for w in &mut state.water {
            *w += self.rain;
        }

        let heights = field.values();
        for z in 1..depth.saturating_sub(1) {
            for x in 1..width - 1 {
                let i = z * width + x;
                let h = heights[i];
                let neighbours = [i - 1, i + 1, i - width, i + width];

                let mut drops = [0.0f32; 4];
                let mut total_drop = 0.0f32;
                for (k, &n) in neighbours.iter().enumerate() {
                    let delta = h - heights[n];
                    if delta > 0.0 {
                        drops[k] = delta;
                        total_drop += delta;
                    }
                }
                if total_drop <= 0.0 {
                    continue;
                }

                let outflow = state.water[i] * self.flow_fraction;
                let carried = outflow * self.sediment_capacity;
                for (k, &n) in neighbours.iter().enumerate() {
                    let drop = drops[k];
                    if drop <= 0.0 {
                        continue;
                    }
                    let share = drop / total_drop;
                    // Never move more than half the drop, or the pair would swap order.
                    let amount = (carried * share).min(drop * 0.5);
                    state.sediment[i] -= amount;
                    state.sediment[n] += amount;
                    state.water_delta[i] -= outflow * share;
                    state.water_delta[n] += outflow * share;
                    moved += amount as f64;
                }
            }
        }

        for (h, s) in field.values_mut().iter_mut().zip(&state.sediment) {
            *h += s;
        }
        let keep = 1.0 - self.evaporation;
        for (w, dw) in state.water.iter_mut().zip(&state.water_delta) {
            *w = (*w + dw).max(0.0) * keep;
        }

        moved
    }
}

/// Slope-limited slumping: whenever a cell stands more than `talus` above a
/// 4-neighbour, `rate` of the difference slides down to it.
pub struct ThresholdErosion {
    talus: f32,
    rate: f32,
}

impl ThresholdErosion {
    pub fn new(config: &ErosionConfig) -> Self {
        Self {
            talus: config.talus,
            rate: config.threshold_rate,
        }
    }
}

impl ErosionModel for ThresholdErosion {
    fn iterate(&self, field: &mut HeightField, state: &mut ErosionState) -> f64 {
        let width = field.width();
        let depth = field.depth();
        let mut moved = 0.0f64;

        state.begin_iteration();
        let heights = field.values();
        for z in 1..depth.saturating_sub(1) {
            for x in 1..width - 1 {
                let i = z * width + x;
                for n in [i - 1, i + 1, i - width, i + width] {
                    let delta = heights[i] - heights[n];
                    if delta > self.talus {
                        let amount = delta * self.rate;
                        state.sediment[i] -= amount;
                        state.sediment[n] += amount;
                        moved += amount as f64;
                    }
                }
            }
        }

        for (h, s) in field.values_mut().iter_mut().zip(&state.sediment) {
            *h += s;
        }
        moved
    }
}

pub fn build_model(config: &ErosionConfig) -> Option<Box<dyn ErosionModel>> {
    match config.strategy {
        ErosionStrategy::Flow => Some(Box::new(FlowErosion::new(config))),
        ErosionStrategy::Threshold => Some(Box::new(ThresholdErosion::new(config))),
        ErosionStrategy::None => None,
    }
}

pub fn erode(field: &mut HeightField, config: &ErosionConfig) -> ErosionStats {
    erode_with_cancel(field, config, &AtomicBool::new(false))
}

/// Runs the configured model for `config.iterations` sweeps. `cancel` is
/// polled between sweeps; a sweep in progress always completes.
pub fn erode_with_cancel(
    field: &mut HeightField,
    config: &ErosionConfig,
    cancel: &AtomicBool,
) -> ErosionStats {
    let mut stats = ErosionStats::default();
    let Some(model) = build_model(config) else {
        return stats;
    };
    if field.width() < 3 || field.depth() < 3 {
        log::debug!(
            "{}x{} field has no interior, skipping erosion",
            field.width(),
            field.depth()
        );
        return stats;
    }

    let started = Instant::now();
    let mut state = ErosionState::new(field.len());
    for _ in 0..config.iterations {
        if cancel.load(Ordering::Relaxed) {
            stats.cancelled = true;
            break;
        }
        stats.material_moved += model.iterate(field, &mut state);
        stats.iterations += 1;
    }

    log::debug!(
        "{:?} erosion: {} iterations, {:.4} moved, {:.1} ms{}",
        config.strategy,
        stats.iterations,
        stats.material_moved,
        started.elapsed().as_secs_f64() * 1000.0,
        if stats.cancelled { " (cancelled)" } else { "" }
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slope(width: usize, depth: usize) -> HeightField {
        let values = (0..width * depth)
            .map(|i| {
                let x = (i % width) as f32;
                let z = (i / width) as f32;
                1.0 - 0.03 * x - 0.02 * z + 0.05 * ((x * 1.7).sin() * (z * 0.9).cos())
            })
            .collect();
        HeightField::from_values(width, depth, values).unwrap()
    }

    fn wet_config() -> ErosionConfig {
        ErosionConfig {
            iterations: 50,
            sediment_capacity: 0.05,
            rain: 0.2,
            ..ErosionConfig::default()
        }
    }

    #[test]
    fn flow_sweep_conserves_material() {
        let mut field = slope(16, 12);
        let before = field.total();
        let model = FlowErosion::new(&wet_config());
        let mut state = ErosionState::new(field.len());

        for _ in 0..5 {
            let moved = model.iterate(&mut field, &mut state);
            let net: f64 = state.sediment().iter().map(|&s| s as f64).sum();
            assert!(net.abs() < 1e-5, "net sediment {net}");
            assert!(moved > 0.0);
        }
        assert!((field.total() - before).abs() < 1e-3);
    }

    #[test]
    fn border_cells_never_lose_material() {
        let mut field = slope(10, 10);
        let original = field.clone();
        erode(&mut field, &wet_config());
        for z in 0..10 {
            for x in 0..10 {
                if x == 0 || z == 0 || x == 9 || z == 9 {
                    assert!(field.get(x, z) >= original.get(x, z) - 1e-6);
                }
            }
        }
        assert_ne!(field, original);
    }

    #[test]
    fn flat_field_is_left_alone() {
        let mut field = HeightField::flat(8, 8, 0.5).unwrap();
        let stats = erode(&mut field, &wet_config());
        assert_eq!(stats.iterations, 50);
        assert_eq!(stats.material_moved, 0.0);
        assert!(field.values().iter().all(|&h| h == 0.5));
    }

    #[test]
    fn erosion_is_reproducible() {
        let mut a = slope(20, 20);
        let mut b = slope(20, 20);
        erode(&mut a, &wet_config());
        erode(&mut b, &wet_config());
        assert_eq!(a, b);
    }

    #[test]
    fn threshold_moves_only_steep_drops() {
        let mut values = vec![0.0; 25];
        values[12] = 1.0;
        let mut field = HeightField::from_values(5, 5, values).unwrap();
        let config = ErosionConfig {
            strategy: ErosionStrategy::Threshold,
            iterations: 1,
            ..ErosionConfig::default()
        };
        let stats = erode(&mut field, &config);
        assert!((field.get(2, 2) - 0.6).abs() < 1e-6);
        for (x, z) in [(1, 2), (3, 2), (2, 1), (2, 3)] {
            assert!((field.get(x, z) - 0.1).abs() < 1e-6);
        }
        assert!((stats.material_moved - 0.4).abs() < 1e-6);
        assert!((field.total() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn none_strategy_does_nothing() {
        let mut field = slope(8, 8);
        let original = field.clone();
        let config = ErosionConfig {
            strategy: ErosionStrategy::None,
            ..ErosionConfig::default()
        };
        assert_eq!(erode(&mut field, &config), ErosionStats::default());
        assert_eq!(field, original);
    }

    #[test]
    fn cancellation_stops_between_iterations() {
        let mut field = slope(8, 8);
        let original = field.clone();
        let cancel = AtomicBool::new(true);
        let stats = erode_with_cancel(&mut field, &wet_config(), &cancel);
        assert!(stats.cancelled);
        assert_eq!(stats.iterations, 0);
        assert_eq!(field, original);
    }

    #[test]
    fn thin_fields_have_no_interior() {
        let values = vec![1.0, 0.0, 0.5, 0.2, 0.9, 0.1, 0.3, 0.0, 0.7, 0.4];
        let mut field = HeightField::from_values(2, 5, values).unwrap();
        let original = field.clone();
        let stats = erode(&mut field, &wet_config());
        assert_eq!(stats.iterations, 0);
        assert_eq!(field, original);
    }
}
