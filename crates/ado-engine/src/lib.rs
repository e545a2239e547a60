//! # ado-engine
//!
//! Bayesian adaptive design optimization over discretized parameter grids.
//!
//! Provides the likelihood tensor, log-space posterior, mutual-information
//! design scoring, Bayesian updating and dynamic regridding, tied together by
//! [`Engine`]. [`SharedEngine`] wraps an engine for use across threads.

mod config;
mod engine;
mod likelihood;
pub mod numerics;
mod posterior;
mod regrid;
mod scoring;
mod selection;
mod shared;

pub use config::{EngineConfig, GridType, PriorStrategy, RegridConfig, Rotation};
pub use engine::{Engine, EngineId, Observation};
pub use likelihood::LikelihoodTensor;
pub use posterior::{Marginal, PosteriorStore};
pub use regrid::{rotation_matrix, GridSnapshot, RegridOutcome};
pub use scoring::Scores;
pub use selection::DesignKind;
pub use shared::SharedEngine;
