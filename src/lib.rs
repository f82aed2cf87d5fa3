//! `nestkit` — irregular 2D bin-packing via no-fit-polygon search and a
//! genetic driver.
//!
//! The core engine is [`orchestrator::Orchestrator`], built from the
//! geometry primitives ([`geometry`]), the Clipper-backed boolean adapter
//! ([`clipper`]), the no-fit-polygon engine ([`nfp`], [`orbital`]), its
//! per-batch memoisation cache ([`cache`]), the placement worker
//! ([`placement`]) and the genetic search driver ([`ga`]). [`config`] and
//! [`error`] carry the ambient configuration and error-handling surface;
//! `svg_parser`, `dxf_parser` and `line_merge` are the file-ingestion
//! front end consumed by `src/main.rs`.

pub mod cache;
pub mod clipper;
pub mod config;
pub mod dxf_parser;
pub mod error;
pub mod ga;
pub mod geometry;
pub mod line_merge;
pub mod nfp;
pub mod orbital;
pub mod orchestrator;
pub mod placement;
pub mod shape;
pub mod svg_parser;
pub mod svg_writer;
