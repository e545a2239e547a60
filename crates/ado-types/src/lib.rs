//! Core types for adaptive design optimization: tasks, models, labeled grids
//! and the shared error type.

pub mod errors;
pub mod grid;
pub mod model;
pub mod task;

pub use errors::*;
pub use grid::*;
pub use model::*;
pub use task::*;
