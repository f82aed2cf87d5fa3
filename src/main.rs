//! `nestkit` CLI: reads a container and a list of parts from SVG/DXF
//! files, runs the nesting engine and writes the result as SVG.
//!
//! Input convention: the first `--inputs` file supplies the container
//! (its first ring only — any further rings in that file are ignored);
//! every subsequent file contributes all of its rings as parts.

use clap::Parser;
use nestkit::config::NestConfig;
use nestkit::orchestrator::{new_cancellation_token, Orchestrator};
use nestkit::shape::Polygon as ShapePolygon;
use nestkit::svg_writer::solution_to_svg;
use nestkit::{dxf_parser, line_merge, svg_parser};
use std::path::{Path, PathBuf};

/// Command line arguments for nestkit.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CliArgs {
    /// Input files to be nested: the first is the container, the rest are parts.
    #[arg(long, value_name = "FILES", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Maximum error allowed when approximating curves during clean/offset.
    #[arg(long = "curve-tolerance", default_value_t = 0.3)]
    pub curve_tolerance: f64,

    /// Minimum space between parts and between parts and the container wall.
    #[arg(long, default_value_t = 0.0)]
    pub spacing: f64,

    /// Number of equally spaced rotations admissible per part.
    #[arg(long, default_value_t = 4)]
    pub rotations: u32,

    /// Population size for the genetic algorithm.
    #[arg(long, default_value_t = 10, value_name = "SIZE")]
    pub population_size: usize,

    /// Mutation rate of the genetic algorithm, 0-100 (percent).
    #[arg(long, default_value_t = 10, value_name = "RATE")]
    pub mutation_rate: u8,

    /// Place parts inside the holes of other parts (reserved; no effect yet).
    #[arg(long, default_value_t = false)]
    pub use_holes: bool,

    /// Explore concave areas via edge-sliding NFPs instead of the Minkowski fast path.
    #[arg(long, default_value_t = false)]
    pub explore_concave: bool,

    /// Merge duplicate/overlapping line segments before assembling parts.
    #[arg(long, default_value_t = false)]
    pub merge_lines: bool,

    /// Number of generations to run.
    #[arg(long, default_value_t = 10)]
    pub generations: u32,

    /// Stop as soon as a generation places every part in a single bin.
    #[arg(long, default_value_t = false)]
    pub until_fit: bool,

    /// Seed the genetic algorithm's RNG for a reproducible run.
    #[arg(long)]
    pub seed: Option<u64>,
}

fn parse_input(path: &Path, merge_lines: bool) -> anyhow::Result<Vec<svg_parser::Polygon>> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let mut polys = if ext.eq_ignore_ascii_case("dxf") {
        dxf_parser::polygons_from_dxf(path)?
    } else {
        svg_parser::polygons_from_file(path)?
    };
    if merge_lines {
        polys = line_merge::merge_lines(&polys);
    }
    Ok(polys)
}

fn main() {
    env_logger::init();
    let args = CliArgs::parse();

    let mut container: Option<ShapePolygon> = None;
    let mut parts: Vec<ShapePolygon> = Vec::new();
    let mut next_id: i64 = 1;

    for (file_idx, path) in args.inputs.iter().enumerate() {
        let polys = match parse_input(path, args.merge_lines) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("failed to parse {}: {e}", path.display());
                std::process::exit(1);
            }
        };
        if file_idx == 0 {
            container = polys.into_iter().next().map(|p| p.into_shape_polygon(nestkit::shape::CONTAINER_ID));
            continue;
        }
        for p in polys {
            parts.push(p.into_shape_polygon(next_id));
            next_id += 1;
        }
    }

    let container = match container {
        Some(c) => c,
        None => {
            eprintln!("no polygons found in input");
            std::process::exit(1);
        }
    };
    if parts.is_empty() {
        eprintln!("no polygons found in input");
        std::process::exit(1);
    }

    let config = NestConfig {
        curve_tolerance: args.curve_tolerance,
        spacing: args.spacing,
        rotations: args.rotations.max(1),
        population_size: args.population_size.max(2),
        mutation_rate: args.mutation_rate,
        use_holes: args.use_holes,
        explore_concave: args.explore_concave,
        bin_height: 0.0,
        random_seed: args.seed,
    };

    let mut orchestrator = Orchestrator::new(config);
    if let Err(e) = orchestrator.add_container(container) {
        eprintln!("failed to initialize algorithm: {e}");
        std::process::exit(1);
    }
    if let Err(e) = orchestrator.add_objects(parts) {
        eprintln!("failed to initialize algorithm: {e}");
        std::process::exit(1);
    }

    let cancel = new_cancellation_token();
    let run_result = if args.until_fit {
        orchestrator.run_until_fit(args.generations, &cancel)
    } else {
        orchestrator.run_fixed(args.generations, &cancel)
    };
    if let Err(e) = run_result {
        eprintln!("failed to initialize algorithm: {e}");
        std::process::exit(1);
    }

    let solution = match orchestrator.best() {
        Some(s) => s,
        None => {
            eprintln!("no population available to evaluate");
            std::process::exit(1);
        }
    };

    let container_height = orchestrator
        .container_bounds()
        .map(|b| b.height)
        .unwrap_or(0.0);
    let svg = solution_to_svg(solution, orchestrator.shapes(), container_height);
    if let Err(e) = std::fs::write("nested.svg", svg) {
        eprintln!("failed to write SVG: {e}");
        std::process::exit(1);
    }
    println!("Nested result written to nested.svg");
}
