//! Engine and regrid configuration.

use std::str::FromStr;

use ado_types::{internal_error, invalid_argument, AdoError, AdoResult};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seed for random design selection. `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// How the standardized grid is rotated into parameter space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    /// `sqrt(diag(eigenvalues)) · eigenvectors⁻¹` of the posterior covariance.
    #[default]
    Eig,
    /// `sqrt(diag(singular values)) · Vᵀ` of the posterior covariance.
    Svd,
    /// Axis-aligned scaling by posterior standard deviations.
    #[serde(alias = "null")]
    None,
}

impl FromStr for Rotation {
    type Err = AdoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eig" => Ok(Self::Eig),
            "svd" => Ok(Self::Svd),
            "none" | "null" => Ok(Self::None),
            other => Err(invalid_argument!(
                "rotation should be \"eig\", \"svd\", \"none\" or \"null\", got \"{other}\""
            )),
        }
    }
}

/// How grid axis values are interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridType {
    /// Quantiles in [0, 1] of the standard normal.
    #[default]
    #[serde(rename = "quantile", alias = "q")]
    Quantile,
    /// Standard-normal z-scores.
    #[serde(rename = "z-score", alias = "z")]
    ZScore,
}

impl FromStr for GridType {
    type Err = AdoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "q" | "quantile" => Ok(Self::Quantile),
            "z" | "z-score" => Ok(Self::ZScore),
            other => Err(invalid_argument!(
                "grid type should be \"q\" (quantiles) or \"z\" (z-scores), got \"{other}\""
            )),
        }
    }
}

/// How the prior is assigned on a new parameter grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorStrategy {
    /// Replay every stored observation against the new grid.
    Recalc,
    /// Multivariate normal at the pre-regrid posterior mean and covariance.
    ///
    /// With [`RegridConfig::append`], kept points take their old normalized
    /// log-prior while new points take the raw log density, and the result is
    /// normalized as a whole. The two are on different scales: a concentrated
    /// posterior gives the new points a large density, so kept points end up
    /// with almost no prior mass.
    #[default]
    Normal,
    /// Keep the uniform prior.
    #[serde(alias = "null")]
    None,
}

impl FromStr for PriorStrategy {
    type Err = AdoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recalc" => Ok(Self::Recalc),
            "normal" => Ok(Self::Normal),
            "none" | "null" => Ok(Self::None),
            other => Err(invalid_argument!(
                "prior should be \"recalc\", \"normal\" or \"null\", got \"{other}\""
            )),
        }
    }
}

/// Parameters of one dynamic-gridding step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegridConfig {
    /// Axis values, replicated across every parameter dimension.
    pub grid: Vec<f64>,
    #[serde(default)]
    pub rotation: Rotation,
    #[serde(default)]
    pub grid_type: GridType,
    #[serde(default)]
    pub prior: PriorStrategy,
    /// Keep the existing grid points and add the new ones after them.
    #[serde(default)]
    pub append: bool,
}

impl RegridConfig {
    pub fn new(grid: impl IntoIterator<Item = f64>) -> Self {
        Self {
            grid: grid.into_iter().collect(),
            rotation: Rotation::default(),
            grid_type: GridType::default(),
            prior: PriorStrategy::default(),
            append: false,
        }
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_grid_type(mut self, grid_type: GridType) -> Self {
        self.grid_type = grid_type;
        self
    }

    pub fn with_prior(mut self, prior: PriorStrategy) -> Self {
        self.prior = prior;
        self
    }

    pub fn with_append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    pub fn validate(&self) -> AdoResult<()> {
        if self.grid.is_empty() {
            return Err(invalid_argument!("regrid axis has no values"));
        }
        if self.grid.iter().any(|v| v.is_nan()) {
            return Err(invalid_argument!("regrid axis contains NaN"));
        }
        if self.grid_type == GridType::Quantile && !self.grid.iter().all(|v| (0.0..=1.0).contains(v)) {
            return Err(invalid_argument!(
                "all quantile values should be between 0 and 1, got {:?}",
                self.grid
            ));
        }
        Ok(())
    }

    /// Standard-normal coordinates of the axis values.
    pub fn axis_coordinates(&self) -> AdoResult<Vec<f64>> {
        self.validate()?;
        match self.grid_type {
            GridType::Quantile => {
                let standard = Normal::new(0.0, 1.0)
                    .map_err(|e| internal_error!("standard normal: {e}"))?;
                // 0 and 1 map to -inf and +inf.
                Ok(self.grid.iter().map(|&q| standard.inverse_cdf(q)).collect())
            }
            GridType::ZScore => Ok(self.grid.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_option_strings() {
        assert_eq!("eig".parse::<Rotation>().unwrap(), Rotation::Eig);
        assert_eq!("svd".parse::<Rotation>().unwrap(), Rotation::Svd);
        assert_eq!("null".parse::<Rotation>().unwrap(), Rotation::None);
        assert_eq!("q".parse::<GridType>().unwrap(), GridType::Quantile);
        assert_eq!("z-score".parse::<GridType>().unwrap(), GridType::ZScore);
        assert_eq!("recalc".parse::<PriorStrategy>().unwrap(), PriorStrategy::Recalc);
        assert_eq!("null".parse::<PriorStrategy>().unwrap(), PriorStrategy::None);
    }

    #[test]
    fn rejects_unknown_option_strings() {
        assert!(matches!("cholesky".parse::<Rotation>(), Err(AdoError::InvalidArgument(_))));
        assert!(matches!("t".parse::<GridType>(), Err(AdoError::InvalidArgument(_))));
        assert!(matches!("flat".parse::<PriorStrategy>(), Err(AdoError::InvalidArgument(_))));
    }

    #[test]
    fn defaults_follow_dynamic_gridding_convention() {
        let config = RegridConfig::new([0.25, 0.5, 0.75]);
        assert_eq!(config.rotation, Rotation::Eig);
        assert_eq!(config.grid_type, GridType::Quantile);
        assert_eq!(config.prior, PriorStrategy::Normal);
        assert!(!config.append);
    }

    #[test]
    fn quantiles_must_lie_in_unit_interval() {
        let config = RegridConfig::new([0.1, 1.2]);
        assert!(matches!(config.validate(), Err(AdoError::InvalidArgument(_))));
        let config = config.with_grid_type(GridType::ZScore);
        assert!(config.validate().is_ok());
        assert!(RegridConfig::new(Vec::new()).validate().is_err());
    }

    #[test]
    fn axis_coordinates_by_type() {
        let q = RegridConfig::new([0.0, 0.01, 0.5, 0.975, 1.0])
            .axis_coordinates()
            .unwrap();
        assert_eq!(q[0], f64::NEG_INFINITY);
        assert!((q[1] + 2.326_348).abs() < 1e-6);
        assert!(q[2].abs() < 1e-10);
        assert!((q[3] - 1.959_964).abs() < 1e-6);
        assert_eq!(q[4], f64::INFINITY);
        let z = RegridConfig::new([-1.0, 2.0])
            .with_grid_type(GridType::ZScore)
            .axis_coordinates()
            .unwrap();
        assert_eq!(z, vec![-1.0, 2.0]);
    }

    #[test]
    fn regrid_config_from_json() {
        let config: RegridConfig = serde_json::from_str(
            r#"{"grid": [-1.0, 0.0, 1.0], "rotation": "svd", "grid_type": "z", "prior": "null"}"#,
        )
        .unwrap();
        assert_eq!(config.rotation, Rotation::Svd);
        assert_eq!(config.grid_type, GridType::ZScore);
        assert_eq!(config.prior, PriorStrategy::None);
        assert!(!config.append);

        let json = serde_json::to_string(&EngineConfig::new().with_seed(7)).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.seed, Some(7));
    }
}
