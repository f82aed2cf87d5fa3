//! Orchestrator: ingestion, the per-generation NFP batch / GA / placement
//! loop, and the two high-level drivers exposed to callers (`run_fixed`,
//! `run_until_fit`).

use crate::cache::NfpCache;
use crate::clipper;
use crate::config::NestConfig;
use crate::error::{NestError, Result};
use crate::ga::{GeneticAlgorithm, Individual};
use crate::geometry::{ensure_clockwise, polygon_bounds, polygon_signed_area, rotate_polygon};
use crate::nfp::{self, NfpKey, NfpMode};
use crate::placement::{PlacementWorker, Solution};
use crate::shape::{Bounds, Point, Polygon, Shape, CONTAINER_ID};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag, checked between generations.
pub type CancellationToken = Arc<AtomicBool>;

pub fn new_cancellation_token() -> CancellationToken {
    Arc::new(AtomicBool::new(false))
}

pub struct Orchestrator {
    config: NestConfig,
    shapes: Vec<Shape>,
    container: Option<Polygon>,
    cache: NfpCache,
    population: Vec<Individual>,
    rng: Option<StdRng>,
    best: Option<(Individual, Solution, f64)>,
}

impl Orchestrator {
    pub fn new(config: NestConfig) -> Self {
        Self {
            config,
            shapes: Vec::new(),
            container: None,
            cache: NfpCache::new(),
            population: Vec::new(),
            rng: None,
            best: None,
        }
    }

    /// Cleans, winds clockwise and deflates the container by `spacing`,
    /// then stores it.
    pub fn add_container(&mut self, polygon: Polygon) -> Result<()> {
        let mut pts = clipper::clean(&polygon.points, self.config.curve_tolerance).unwrap_or(polygon.points);
        ensure_clockwise(&mut pts);
        if self.config.spacing > 0.0 {
            let deflated = clipper::offset(&pts, -self.config.spacing, self.config.curve_tolerance);
            if let Some(largest) = largest_ring(deflated) {
                pts = largest;
            }
        }
        self.container = Some(Polygon::new(CONTAINER_ID, pts));
        self.clear_population();
        Ok(())
    }

    /// Cleans and inflates each part by `spacing`, drops degenerate
    /// results (logging a warning) and appends the survivors to the
    /// shape table. Dropping a degenerate shape is a recoverable warning,
    /// not a fatal error, so this always returns `Ok(())`; the `Result`
    /// return type exists to match the documented driver contract and to
    /// leave room for a future fatal ingestion failure.
    pub fn add_objects(&mut self, polygons: Vec<Polygon>) -> Result<()> {
        for polygon in polygons {
            let id = polygon.id;
            let mut pts = clipper::clean(&polygon.points, self.config.curve_tolerance).unwrap_or(polygon.points);
            if self.config.spacing > 0.0 {
                let inflated = clipper::offset(&pts, self.config.spacing, self.config.curve_tolerance);
                if let Some(largest) = largest_ring(inflated) {
                    pts = largest;
                }
            }
            ensure_clockwise(&mut pts);
            let candidate = Polygon::new(id, pts);
            if candidate.is_degenerate() {
                log::warn!(target: "nestkit::orchestrator", "shape {id} dropped: {}", NestError::DegeneratePolygon { id });
                continue;
            }
            let area = polygon_signed_area(&candidate.points).abs();
            self.shapes.push(Shape { polygon: candidate, area });
        }
        self.clear_population();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
        self.container = None;
        self.clear_population();
    }

    fn clear_population(&mut self) {
        self.population.clear();
        self.cache = NfpCache::new();
        self.rng = None;
        self.best = None;
    }

    pub fn best(&self) -> Option<&Solution> {
        self.best.as_ref().map(|(_, solution, _)| solution)
    }

    pub fn best_fitness(&self) -> Option<f64> {
        self.best.as_ref().map(|(_, _, fitness)| *fitness)
    }

    /// The shape table, for callers (e.g. the CLI's SVG writer) that need
    /// to re-render a solution's placements against the canonical parts.
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Bounds of the ingested container, if one has been added.
    pub fn container_bounds(&self) -> Option<Bounds> {
        self.container.as_ref().and_then(|c| polygon_bounds(&c.points))
    }

    /// Runs exactly `generations` generations (or fewer if cancelled).
    pub fn run_fixed(&mut self, generations: u32, cancel: &CancellationToken) -> Result<()> {
        self.run(generations, cancel, false)
    }

    /// Runs until every part fits in a single bin or `max_generations` is
    /// reached, whichever comes first.
    pub fn run_until_fit(&mut self, max_generations: u32, cancel: &CancellationToken) -> Result<()> {
        self.run(max_generations, cancel, true)
    }

    fn run(&mut self, generations: u32, cancel: &CancellationToken, stop_on_fit: bool) -> Result<()> {
        let container = self.container.clone().ok_or(NestError::EmptyInput)?;
        if self.shapes.is_empty() {
            return Err(NestError::EmptyInput);
        }
        let container_bounds = polygon_bounds(&container.points).ok_or(NestError::EmptyInput)?;

        if self.population.is_empty() {
            let mut ga = GeneticAlgorithm::new(
                &self.shapes,
                container_bounds,
                self.config.rotation_set(),
                self.config.mutation_probability(),
                self.config.population_size,
                self.config.random_seed,
            );
            self.population = std::mem::take(&mut ga.population);
            self.rng = Some(ga.into_rng());
        }

        for gen in 0..generations.max(1) {
            if cancel.load(Ordering::SeqCst) {
                return Err(NestError::Cancelled);
            }

            self.fill_cache_for_batch(&container);

            {
                let rng = self.rng.take().unwrap_or_else(|| match self.config.random_seed {
                    Some(s) => StdRng::seed_from_u64(s),
                    None => StdRng::from_entropy(),
                });
                let mut ga = GeneticAlgorithm::from_population(
                    &self.shapes,
                    container_bounds,
                    self.config.rotation_set(),
                    self.config.mutation_probability(),
                    std::mem::take(&mut self.population),
                    rng,
                );
                let cache = &self.cache;
                let shapes = &self.shapes;
                ga.evaluate_population(|ind| {
                    let worker = PlacementWorker::new(&container, shapes, cache);
                    let rotations: HashMap<i64, f64> = ind.order.iter().cloned().zip(ind.rotations.iter().cloned()).collect();
                    let (_, fitness) = worker.place(&ind.order, &rotations);
                    fitness
                });

                if let Some(best_ind) = ga.best().cloned() {
                    let better = self.best.as_ref().map(|(_, _, f)| best_ind.fitness < *f).unwrap_or(true);
                    if better {
                        let worker = PlacementWorker::new(&container, &self.shapes, &self.cache);
                        let rotations: HashMap<i64, f64> =
                            best_ind.order.iter().cloned().zip(best_ind.rotations.iter().cloned()).collect();
                        let (solution, fitness) = worker.place(&best_ind.order, &rotations);
                        log::info!(
                            target: "nestkit::orchestrator",
                            "generation {gen}: best fitness {fitness:.4}, {} bins, {} unplaced",
                            solution.bins.len(),
                            solution.unplaced.len()
                        );
                        let all_placed = solution.unplaced.is_empty() && solution.bins.len() <= 1;
                        self.best = Some((best_ind, solution, fitness));
                        if stop_on_fit && all_placed {
                            ga.generation();
                            self.population = std::mem::take(&mut ga.population);
                            self.rng = Some(ga.into_rng());
                            return Ok(());
                        }
                    }
                }

                ga.generation();
                self.population = std::mem::take(&mut ga.population);
                self.rng = Some(ga.into_rng());
            }
        }
        Ok(())
    }

    /// Builds the set of NFP keys every genome in the current population
    /// needs, prunes/refills the cache for exactly that set, computing
    /// misses via `rayon::par_iter`.
    fn fill_cache_for_batch(&mut self, container: &Polygon) {
        let mut keys: HashSet<NfpKey> = HashSet::new();
        for ind in &self.population {
            let rot = |id: i64| ind.rotations[ind.order.iter().position(|&x| x == id).unwrap()];
            for &id in &ind.order {
                keys.insert(NfpKey::new(CONTAINER_ID, id, NfpMode::Inner, 0.0, rot(id)));
            }
            for i in 0..ind.order.len() {
                for j in (i + 1)..ind.order.len() {
                    let (a, b) = (ind.order[i], ind.order[j]);
                    keys.insert(NfpKey::new(a, b, NfpMode::Outer, rot(a), rot(b)));
                }
            }
        }
        let keys: Vec<NfpKey> = keys.into_iter().collect();

        let (carried, missing) = self.cache.partition_batch(&keys);
        let computed: Vec<(NfpKey, crate::nfp::NfpValue)> = missing
            .par_iter()
            .filter_map(|key| self.compute_key(container, key).ok().map(|v| (*key, v)))
            .collect();
        self.cache.replace_batch(carried, computed);
    }

    fn compute_key(&self, container: &Polygon, key: &NfpKey) -> Result<crate::nfp::NfpValue> {
        match key.mode {
            NfpMode::Inner => {
                let shape = self.shapes.iter().find(|s| s.id() == key.b_id).ok_or(NestError::NoFeasiblePosition { part_id: key.b_id })?;
                let b_points = rotate_polygon(&shape.polygon.points, key.b_rotation_deg());
                nfp::inner_fit_polygon(&container.points, &b_points, self.config.explore_concave)
            }
            NfpMode::Outer => {
                let a_shape = self.shapes.iter().find(|s| s.id() == key.a_id).ok_or(NestError::NoFeasiblePosition { part_id: key.a_id })?;
                let b_shape = self.shapes.iter().find(|s| s.id() == key.b_id).ok_or(NestError::NoFeasiblePosition { part_id: key.b_id })?;
                let a_points = rotate_polygon(&a_shape.polygon.points, key.a_rotation_deg());
                let b_points = rotate_polygon(&b_shape.polygon.points, key.b_rotation_deg());
                let result = nfp::outer_nfp(&a_points, &b_points, self.config.explore_concave);
                if result.is_err() {
                    log::debug!(target: "nestkit::nfp", "no outer NFP for {key:?}");
                }
                result
            }
        }
    }
}

fn largest_ring(rings: Vec<Vec<Point>>) -> Option<Vec<Point>> {
    rings.into_iter().max_by(|a, b| polygon_signed_area(a).abs().partial_cmp(&polygon_signed_area(b).abs()).unwrap())
}
