//! Thread-safe handle around an [`Engine`].
//!
//! Scoring caches live inside the engine, so anything that may recompute them
//! (optimal design selection) takes the write lock along with `update` and
//! `update_grid`. Pure reads share the read lock.

use std::sync::Arc;

use ado_types::{AdoResult, Assignment};
use nalgebra::{DMatrix, DVector};
use parking_lot::RwLock;

use crate::config::RegridConfig;
use crate::engine::Engine;
use crate::regrid::RegridOutcome;
use crate::selection::DesignKind;

#[derive(Debug, Clone)]
pub struct SharedEngine {
    inner: Arc<RwLock<Engine>>,
}

impl SharedEngine {
    pub fn new(engine: Engine) -> Self {
        Self {
            inner: Arc::new(RwLock::new(engine)),
        }
    }

    pub fn get_design(&self, kind: DesignKind) -> Assignment {
        self.inner.write().get_design(kind)
    }

    pub fn update(&self, design: &Assignment, response: f64, store: bool) -> AdoResult<()> {
        self.inner.write().update(design, response, store)
    }

    pub fn update_grid(&self, config: &RegridConfig) -> AdoResult<RegridOutcome> {
        self.inner.write().update_grid(config)
    }

    pub fn posterior(&self) -> DVector<f64> {
        self.inner.read().posterior()
    }

    pub fn post_mean(&self) -> DVector<f64> {
        self.inner.read().post_mean()
    }

    pub fn post_cov(&self) -> DMatrix<f64> {
        self.inner.read().post_cov()
    }

    /// Run `f` with shared access to the engine.
    pub fn read<R>(&self, f: impl FnOnce(&Engine) -> R) -> R {
        f(&self.inner.read())
    }

    /// Run `f` with exclusive access to the engine.
    pub fn write<R>(&self, f: impl FnOnce(&mut Engine) -> R) -> R {
        f(&mut self.inner.write())
    }
}
