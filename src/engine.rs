// src/engine.rs
//
// Resize engine. Three parts:
// 1. backend: opaque resampling boundary (buffers + shape + use_alpha)
// 2. normalizer: color mode decisions and alpha passes around the backend
// 3. resizer: the orchestrator sequencing both
//
// This file is a facade over the modules in engine/

pub mod backend;
pub mod normalizer;
pub mod resizer;

pub use backend::{BackendRequest, DestinationBuffer, FirBackend, ResizeBackend, SourceView};
pub use normalizer::{
    needs_generic_conversion, needs_premultiply, plan_restoration, ModeNormalizer,
    NormalizeSteps, NormalizedSource, Restoration,
};
pub use resizer::{ResizeReport, Resizer};
