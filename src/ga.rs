//! Genetic search driver.
//!
//! Fixes two bugs the reference implementation carried: selection used an
//! unbounded, super-linear weighting that could walk past the population
//! and silently fall back to rank 0 (here: a truncated geometric
//! distribution over rank, always well-defined); and rotation mutation
//! only ever touched the last loop index rather than a random gene (here:
//! one uniformly random index per mutated genome).
//!
//! All randomness is drawn from a single seeded [`StdRng`] owned by the
//! `GeneticAlgorithm`, not `rand::thread_rng()`, so the genome sequence
//! is reproducible for a fixed seed and inputs.

use crate::geometry::rotated_bounds;
use crate::shape::{Bounds, Shape};
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;

/// Selection pressure for the truncated geometric distribution over
/// rank: rank `r`'s raw weight is `(1 - GEOMETRIC_P) ^ r`.
const GEOMETRIC_P: f64 = 0.3;

#[derive(Debug, Clone)]
pub struct Individual {
    pub order: Vec<i64>,
    pub rotations: Vec<f64>,
    pub fitness: f64,
}

impl Individual {
    fn rotation_of(&self, id: i64) -> f64 {
        self.order
            .iter()
            .position(|&x| x == id)
            .map(|i| self.rotations[i])
            .unwrap_or(0.0)
    }
}

pub struct GeneticAlgorithm<'a> {
    shapes: &'a [Shape],
    container_bounds: Bounds,
    rotation_set: Vec<f64>,
    mutation_probability: f64,
    rng: StdRng,
    pub population: Vec<Individual>,
}

impl<'a> GeneticAlgorithm<'a> {
    pub fn new(
        shapes: &'a [Shape],
        container_bounds: Bounds,
        rotation_set: Vec<f64>,
        mutation_probability: f64,
        population_size: usize,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let mut ga = GeneticAlgorithm {
            shapes,
            container_bounds,
            rotation_set,
            mutation_probability,
            rng,
            population: Vec::new(),
        };

        let mut order: Vec<i64> = shapes.iter().map(Shape::id).collect();
        order.sort_by(|&a, &b| {
            let area = |id: i64| shapes.iter().find(|s| s.id() == id).map(|s| s.area).unwrap_or(0.0);
            area(b).partial_cmp(&area(a)).unwrap_or(std::cmp::Ordering::Equal)
        });
        let rotations: Vec<f64> = order.iter().map(|&id| ga.random_angle(id)).collect();
        let seed_ind = Individual { order, rotations, fitness: f64::MAX };

        ga.population.push(seed_ind.clone());
        while ga.population.len() < population_size.max(1) {
            let mutated = ga.mutate(&seed_ind);
            ga.population.push(mutated);
        }
        ga
    }

    /// Rehydrates a GA around an existing population — used by the
    /// orchestrator to resume evolving across generations without
    /// re-seeding, since `GeneticAlgorithm` cannot itself be stored
    /// across calls alongside the shape table it borrows. `rng` is the
    /// prior call's RNG, carried forward so the stream stays unbroken
    /// across generations.
    pub fn from_population(
        shapes: &'a [Shape],
        container_bounds: Bounds,
        rotation_set: Vec<f64>,
        mutation_probability: f64,
        population: Vec<Individual>,
        rng: StdRng,
    ) -> Self {
        GeneticAlgorithm { shapes, container_bounds, rotation_set, mutation_probability, rng, population }
    }

    /// Hands the RNG back to the caller so it can be threaded into the
    /// next `from_population` call.
    pub fn into_rng(self) -> StdRng {
        self.rng
    }

    fn random_angle(&mut self, id: i64) -> f64 {
        let shape = match self.shapes.iter().find(|s| s.id() == id) {
            Some(s) => s,
            None => return 0.0,
        };
        let mut angles = self.rotation_set.clone();
        angles.shuffle(&mut self.rng);
        for angle in angles {
            if let Some(b) = rotated_bounds(&shape.polygon.points, angle) {
                if b.fits_within(&self.container_bounds) {
                    return angle;
                }
            }
        }
        0.0
    }

    fn mutate(&mut self, ind: &Individual) -> Individual {
        let mut order = ind.order.clone();
        let mut rotations = ind.rotations.clone();

        for i in 0..order.len().saturating_sub(1) {
            if self.rng.r#gen::<f64>() < self.mutation_probability {
                order.swap(i, i + 1);
                rotations.swap(i, i + 1);
            }
        }

        if !order.is_empty() && self.rng.r#gen::<f64>() < self.mutation_probability {
            let idx = self.rng.gen_range(0..order.len());
            let id = order[idx];
            rotations[idx] = self.random_angle(id);
        }

        Individual { order, rotations, fitness: f64::MAX }
    }

    fn crossover(&mut self, mother: &Individual, father: &Individual) -> (Individual, Individual) {
        let len = mother.order.len();
        let cut = if len <= 1 { 0 } else { self.rng.gen_range(0..len) };

        let child1 = splice(mother, father, cut);
        let child2 = splice(father, mother, cut);
        (child1, child2)
    }

    /// Rank-biased weighted selection over the (already fitness-sorted)
    /// population: rank `r`'s weight is `(1 - GEOMETRIC_P) ^ r`, truncated
    /// to the population and renormalised, so every rank — including the
    /// last — has well-defined, strictly positive probability mass.
    fn weighted_rank_index(&mut self, exclude: Option<usize>) -> usize {
        let n = self.population.len();
        let mut weights: Vec<f64> = (0..n).map(|r| (1.0 - GEOMETRIC_P).powi(r as i32)).collect();
        if let Some(e) = exclude {
            weights[e] = 0.0;
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return 0;
        }
        let mut target = self.rng.r#gen::<f64>() * total;
        for (i, w) in weights.iter().enumerate() {
            if target < *w {
                return i;
            }
            target -= *w;
        }
        n - 1
    }

    /// Runs one generation: sort by fitness, keep the elite, fill the
    /// rest via rank-biased selection, crossover and mutation.
    pub fn generation(&mut self) {
        self.population.sort_by(|a, b| a.fitness.partial_cmp(&b.fitness).unwrap_or(std::cmp::Ordering::Equal));

        let mut next = vec![self.population[0].clone()];
        while next.len() < self.population.len() {
            let m = self.weighted_rank_index(None);
            let f = self.weighted_rank_index(Some(m));
            let (c1, c2) = self.crossover(&self.population[m].clone(), &self.population[f].clone());
            next.push(self.mutate(&c1));
            if next.len() < self.population.len() {
                next.push(self.mutate(&c2));
            }
        }
        self.population = next;
    }

    /// Scores every genome in parallel via `score_fn`, e.g. a closure
    /// running the placement worker against the generation's filled NFP
    /// cache.
    pub fn evaluate_population<F>(&mut self, score_fn: F)
    where
        F: Fn(&Individual) -> f64 + Sync,
    {
        self.population.par_iter_mut().for_each(|ind| {
            ind.fitness = score_fn(ind);
        });
    }

    pub fn best(&self) -> Option<&Individual> {
        self.population.iter().min_by(|a, b| a.fitness.partial_cmp(&b.fitness).unwrap_or(std::cmp::Ordering::Equal))
    }
}

/// Builds one crossover child: the first `cut` (order, rotation) pairs
/// from `first`, then `second`'s ids scanned from the tail, appending any
/// id not yet present with `second`'s rotation for it. Always yields a
/// full permutation of the shared id set.
fn splice(first: &Individual, second: &Individual, cut: usize) -> Individual {
    let mut order: Vec<i64> = first.order[..cut.min(first.order.len())].to_vec();
    let mut rotations: Vec<f64> = first.rotations[..cut.min(first.rotations.len())].to_vec();

    for &id in second.order.iter().rev() {
        if !order.contains(&id) {
            order.push(id);
            rotations.push(second.rotation_of(id));
        }
    }

    Individual { order, rotations, fitness: f64::MAX }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Polygon;

    fn square_shape(id: i64, size: f64) -> Shape {
        Shape {
            polygon: Polygon::new(
                id,
                vec![
                    crate::shape::Point::new(0.0, 0.0),
                    crate::shape::Point::new(size, 0.0),
                    crate::shape::Point::new(size, size),
                    crate::shape::Point::new(0.0, size),
                ],
            ),
            area: size * size,
        }
    }

    fn container_bounds() -> Bounds {
        Bounds { x: 0.0, y: 0.0, width: 20.0, height: 20.0 }
    }

    #[test]
    fn seed_genome_is_a_full_permutation() {
        let shapes = vec![square_shape(1, 4.0), square_shape(2, 2.0), square_shape(3, 3.0)];
        let ga = GeneticAlgorithm::new(&shapes, container_bounds(), vec![0.0, 90.0, 180.0, 270.0], 0.1, 6, Some(1));
        let seed = &ga.population[0];
        let mut ids: Vec<i64> = seed.order.clone();
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(seed.order.len(), seed.rotations.len());
    }

    #[test]
    fn crossover_children_are_full_permutations() {
        let shapes = vec![square_shape(1, 4.0), square_shape(2, 2.0), square_shape(3, 3.0), square_shape(4, 1.0)];
        let mut ga = GeneticAlgorithm::new(&shapes, container_bounds(), vec![0.0, 90.0], 0.1, 4, Some(2));
        let mother = ga.population[0].clone();
        let father = ga.population[1].clone();
        let (c1, c2) = ga.crossover(&mother, &father);
        for child in [&c1, &c2] {
            let mut ids = child.order.clone();
            ids.sort();
            assert_eq!(ids, vec![1, 2, 3, 4]);
            assert_eq!(child.order.len(), child.rotations.len());
        }
    }

    #[test]
    fn weighted_rank_index_never_panics_and_stays_in_bounds() {
        let shapes = vec![square_shape(1, 4.0)];
        let mut ga = GeneticAlgorithm::new(&shapes, container_bounds(), vec![0.0], 0.1, 5, Some(3));
        for ind in ga.population.iter_mut() {
            ind.fitness = 1.0;
        }
        ga.population.sort_by(|a, b| a.fitness.partial_cmp(&b.fitness).unwrap());
        for _ in 0..200 {
            let idx = ga.weighted_rank_index(None);
            assert!(idx < ga.population.len());
        }
    }

    #[test]
    fn generation_keeps_population_size_constant() {
        let shapes = vec![square_shape(1, 4.0), square_shape(2, 2.0), square_shape(3, 3.0)];
        let mut ga = GeneticAlgorithm::new(&shapes, container_bounds(), vec![0.0, 180.0], 0.2, 8, Some(4));
        for (i, ind) in ga.population.iter_mut().enumerate() {
            ind.fitness = i as f64;
        }
        let before = ga.population.len();
        ga.generation();
        assert_eq!(ga.population.len(), before);
    }

    #[test]
    fn same_seed_reproduces_the_same_genome_sequence() {
        let shapes = vec![square_shape(1, 4.0), square_shape(2, 2.0), square_shape(3, 3.0)];
        let ga_a = GeneticAlgorithm::new(&shapes, container_bounds(), vec![0.0, 90.0, 180.0, 270.0], 0.3, 6, Some(42));
        let ga_b = GeneticAlgorithm::new(&shapes, container_bounds(), vec![0.0, 90.0, 180.0, 270.0], 0.3, 6, Some(42));
        for (a, b) in ga_a.population.iter().zip(ga_b.population.iter()) {
            assert_eq!(a.order, b.order);
            assert_eq!(a.rotations, b.rotations);
        }
    }
}
