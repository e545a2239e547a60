//! Labeled grids: named axes, their Cartesian product and nearest-row lookup.
//!
//! A [`Grid`] is a table of points (one per row) whose columns carry labels.
//! Design grids and parameter grids are both built from a [`GridAxes`]
//! description; the parameter grid is later rebuilt from rotated coordinates
//! during regridding.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::errors::AdoResult;
use crate::{config_error, invalid_argument};

// ---------------------------------------------------------------------------
// Assignments
// ---------------------------------------------------------------------------

/// Borrowed view of one labeled point, handed to model probability functions.
#[derive(Debug, Clone, Copy)]
pub struct Point<'a> {
    labels: &'a [String],
    values: &'a [f64],
}

impl<'a> Point<'a> {
    pub fn new(labels: &'a [String], values: &'a [f64]) -> Self {
        debug_assert_eq!(labels.len(), values.len());
        Self { labels, values }
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| self.values[i])
    }

    /// Value for `label`, or NaN when the label is absent.
    pub fn value(&self, label: &str) -> f64 {
        self.get(label).unwrap_or(f64::NAN)
    }

    pub fn labels(&self) -> &'a [String] {
        self.labels
    }

    pub fn values(&self) -> &'a [f64] {
        self.values
    }

    pub fn to_assignment(&self) -> Assignment {
        Assignment {
            labels: self.labels.to_vec(),
            values: self.values.to_vec(),
        }
    }
}

/// An owned set of (label, value) pairs: one grid row, or a design supplied by
/// a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    labels: Vec<String>,
    values: Vec<f64>,
}

impl Assignment {
    pub fn new(labels: Vec<String>, values: Vec<f64>) -> AdoResult<Self> {
        if labels.len() != values.len() {
            return Err(invalid_argument!(
                "{} labels given for {} values",
                labels.len(),
                values.len()
            ));
        }
        Ok(Self { labels, values })
    }

    pub fn from_pairs<S, I>(pairs: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, f64)>,
    {
        let (labels, values) = pairs.into_iter().map(|(l, v)| (l.into(), v)).unzip();
        Self { labels, values }
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.as_point().get(label)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    pub fn as_point(&self) -> Point<'_> {
        Point::new(&self.labels, &self.values)
    }

    /// Values ordered as `labels`. The label sets must match exactly.
    pub fn values_in_order(&self, labels: &[String]) -> AdoResult<Vec<f64>> {
        if let Some(extra) = self.labels.iter().find(|l| !labels.contains(l)) {
            return Err(invalid_argument!("unknown label '{extra}'"));
        }
        if self.labels.len() != labels.len() {
            return Err(invalid_argument!(
                "expected values for {:?}, got {:?}",
                labels,
                self.labels
            ));
        }
        labels
            .iter()
            .map(|l| {
                self.get(l)
                    .ok_or_else(|| invalid_argument!("missing value for '{l}'"))
            })
            .collect()
    }
}

impl std::fmt::Display for Assignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (label, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{label}: {value}")?;
        }
        write!(f, "}}")
    }
}

// ---------------------------------------------------------------------------
// Axes
// ---------------------------------------------------------------------------

/// One named axis of candidate values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisDef {
    pub name: String,
    pub values: Vec<f64>,
}

/// An ordered list of named axes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridAxes {
    pub axes: Vec<AxisDef>,
}

impl GridAxes {
    pub fn new() -> Self {
        Self { axes: Vec::new() }
    }

    pub fn add(mut self, name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        self.axes.push(AxisDef {
            name: name.into(),
            values: values.into_iter().collect(),
        });
        self
    }

    /// `steps` evenly spaced values from `low` to `high` inclusive.
    pub fn add_linspace(self, name: impl Into<String>, low: f64, high: f64, steps: usize) -> Self {
        let values = linspace(low, high, steps);
        self.add(name, values)
    }

    /// `steps` values evenly spaced in log-space from `low` to `high` inclusive.
    pub fn add_logspace(self, name: impl Into<String>, low: f64, high: f64, steps: usize) -> Self {
        let values: Vec<f64> = linspace(low.ln(), high.ln(), steps)
            .into_iter()
            .map(f64::exp)
            .collect();
        self.add(name, values)
    }

    pub fn get(&self, name: &str) -> Option<&AxisDef> {
        self.axes.iter().find(|a| a.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.axes.iter().map(|a| a.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    /// Number of points in the full product, `None` on overflow.
    pub fn grid_size(&self) -> Option<usize> {
        self.axes
            .iter()
            .try_fold(1usize, |acc, a| acc.checked_mul(a.values.len()))
    }
}

fn cell_count(nrows: usize, ncols: usize) -> AdoResult<usize> {
    nrows
        .checked_mul(ncols)
        .ok_or_else(|| config_error!("grid of {nrows} rows by {ncols} columns overflows usize"))
}

fn linspace(low: f64, high: f64, steps: usize) -> Vec<f64> {
    match steps {
        0 => Vec::new(),
        1 => vec![low],
        _ => (0..steps)
            .map(|i| low + (high - low) * i as f64 / (steps - 1) as f64)
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

/// A labeled table of points, one point per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    labels: Vec<String>,
    points: DMatrix<f64>,
}

impl Grid {
    pub fn new(labels: Vec<String>, points: DMatrix<f64>) -> AdoResult<Self> {
        if labels.len() != points.ncols() {
            return Err(config_error!(
                "{} labels given for a grid with {} columns",
                labels.len(),
                points.ncols()
            ));
        }
        check_unique(&labels)?;
        Ok(Self { labels, points })
    }

    /// Every combination of one value per axis, last axis varying fastest.
    pub fn from_axes(axes: &GridAxes) -> AdoResult<Self> {
        if axes.is_empty() {
            return Err(config_error!("cannot build a grid without axes"));
        }
        if let Some(empty) = axes.axes.iter().find(|a| a.values.is_empty()) {
            return Err(config_error!("axis '{}' has no values", empty.name));
        }
        let labels = axes.names();
        check_unique(&labels)?;

        let columns: Vec<&[f64]> = axes.axes.iter().map(|a| a.values.as_slice()).collect();
        let nrows = axes
            .grid_size()
            .ok_or_else(|| config_error!("grid size overflows usize"))?;
        let ncols = columns.len();

        let mut data = Vec::with_capacity(cell_count(nrows, ncols)?);
        let mut index = vec![0usize; ncols];
        for _ in 0..nrows {
            data.extend(index.iter().zip(&columns).map(|(&i, col)| col[i]));
            // Odometer increment, last axis fastest
            for axis in (0..ncols).rev() {
                index[axis] += 1;
                if index[axis] < columns[axis].len() {
                    break;
                }
                index[axis] = 0;
            }
        }

        Ok(Self {
            labels,
            points: DMatrix::from_row_slice(nrows, ncols, &data),
        })
    }

    /// Product of pre-built grids treated as axis groups: every combination of
    /// one row from each group, last group varying fastest.
    pub fn product(groups: &[Grid]) -> AdoResult<Self> {
        if groups.is_empty() {
            return Err(config_error!("cannot build a grid without axes"));
        }
        if let Some(empty) = groups.iter().find(|g| g.is_empty()) {
            return Err(config_error!("axis group {:?} has no rows", empty.labels));
        }
        let labels: Vec<String> = groups.iter().flat_map(|g| g.labels.clone()).collect();
        check_unique(&labels)?;

        let nrows = groups
            .iter()
            .try_fold(1usize, |acc, g| acc.checked_mul(g.nrows()))
            .ok_or_else(|| config_error!("grid size overflows usize"))?;
        let ncols = labels.len();

        let mut data = Vec::with_capacity(cell_count(nrows, ncols)?);
        let mut index = vec![0usize; groups.len()];
        for _ in 0..nrows {
            for (group, &row) in groups.iter().zip(&index) {
                data.extend(group.points.row(row).iter().copied());
            }
            for g in (0..groups.len()).rev() {
                index[g] += 1;
                if index[g] < groups[g].nrows() {
                    break;
                }
                index[g] = 0;
            }
        }

        Ok(Self {
            labels,
            points: DMatrix::from_row_slice(nrows, ncols, &data),
        })
    }

    /// A copy with columns reordered to `labels`; every label must exist.
    pub fn select(&self, labels: &[String]) -> AdoResult<Self> {
        let indices = labels
            .iter()
            .map(|l| {
                self.column_index(l)
                    .ok_or_else(|| config_error!("grid has no column '{l}'"))
            })
            .collect::<AdoResult<Vec<_>>>()?;
        Grid::new(labels.to_vec(), self.points.select_columns(indices.iter()))
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn points(&self) -> &DMatrix<f64> {
        &self.points
    }

    pub fn nrows(&self) -> usize {
        self.points.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.points.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.points.nrows() == 0
    }

    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    pub fn column(&self, label: &str) -> Option<Vec<f64>> {
        self.column_index(label)
            .map(|j| self.points.column(j).iter().copied().collect())
    }

    pub fn row_values(&self, i: usize) -> Vec<f64> {
        self.points.row(i).iter().copied().collect()
    }

    pub fn row(&self, i: usize) -> Assignment {
        Assignment {
            labels: self.labels.clone(),
            values: self.row_values(i),
        }
    }

    /// Index of the row closest to `query` in Euclidean distance. Ties resolve
    /// to the first such row.
    pub fn nearest_index(&self, query: &[f64]) -> AdoResult<usize> {
        if query.len() != self.ncols() {
            return Err(invalid_argument!(
                "query has {} values, grid has {} columns",
                query.len(),
                self.ncols()
            ));
        }
        if query.iter().any(|v| !v.is_finite()) {
            return Err(invalid_argument!("query {query:?} is not finite"));
        }

        let mut best: Option<(usize, f64)> = None;
        for (i, row) in self.points.row_iter().enumerate() {
            let dist: f64 = row
                .iter()
                .zip(query)
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            if best.map_or(true, |(_, d)| dist < d) {
                best = Some((i, dist));
            }
        }
        best.map(|(i, _)| i)
            .ok_or_else(|| invalid_argument!("cannot look up a point in an empty grid"))
    }

    /// Rows for which `keep` returns true, in their original order.
    pub fn filter_rows(&self, keep: impl Fn(&[f64]) -> bool) -> Self {
        let kept: Vec<usize> = (0..self.nrows())
            .filter(|&i| keep(&self.row_values(i)))
            .collect();
        Self {
            labels: self.labels.clone(),
            points: self.points.select_rows(kept.iter()),
        }
    }

    /// Rows of `self` followed by rows of `other`; labels must agree.
    pub fn vstack(&self, other: &Grid) -> AdoResult<Self> {
        if self.labels != other.labels {
            return Err(config_error!(
                "cannot stack grid {:?} onto grid {:?}",
                other.labels,
                self.labels
            ));
        }
        let top = self.nrows();
        let points = DMatrix::from_fn(top + other.nrows(), self.ncols(), |i, j| {
            if i < top {
                self.points[(i, j)]
            } else {
                other.points[(i - top, j)]
            }
        });
        Ok(Self {
            labels: self.labels.clone(),
            points,
        })
    }
}

fn check_unique(labels: &[String]) -> AdoResult<()> {
    for (i, l) in labels.iter().enumerate() {
        if labels[..i].contains(l) {
            return Err(config_error!("duplicate axis label '{l}'"));
        }
    }
    Ok(())
}
