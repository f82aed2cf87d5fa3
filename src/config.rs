//! Explicit, immutable nesting configuration.
//!
//! Replaces the reference implementation's process-global `settings`
//! module: every tunable is a field here, constructed once and passed by
//! value into [`crate::orchestrator::Orchestrator::new`].

/// Maximum deviation allowed when approximating curves during clean/offset.
pub const DEFAULT_CURVE_TOLERANCE: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NestConfig {
    pub curve_tolerance: f64,
    pub spacing: f64,
    pub rotations: u32,
    pub population_size: usize,
    pub mutation_rate: u8,
    pub use_holes: bool,
    pub explore_concave: bool,
    pub bin_height: f64,
    pub random_seed: Option<u64>,
}

impl Default for NestConfig {
    fn default() -> Self {
        Self {
            curve_tolerance: DEFAULT_CURVE_TOLERANCE,
            spacing: 0.0,
            rotations: 4,
            population_size: 10,
            mutation_rate: 10,
            use_holes: false,
            explore_concave: false,
            bin_height: 0.0,
            random_seed: None,
        }
    }
}

impl NestConfig {
    /// Set of admissible rotation angles in degrees, `{i * 360/rotations}`.
    pub fn rotation_set(&self) -> Vec<f64> {
        let r = self.rotations.max(1);
        (0..r).map(|i| i as f64 * 360.0 / r as f64).collect()
    }

    pub fn mutation_probability(&self) -> f64 {
        0.01 * self.mutation_rate as f64
    }
}
