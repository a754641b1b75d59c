//! Tabular observations with a designated target column.

use ndarray::{Array1, Array2, Axis};

use crate::errors::RwResult;
use crate::validation_error;

/// Features plus target over a set of observations. Rows are observations.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    feature_names: Vec<String>,
    target_name: String,
    features: Array2<f64>,
    target: Array1<f64>,
}

impl Sample {
    /// Build a sample from a feature matrix and a separate target column.
    pub fn new(
        feature_names: Vec<String>,
        features: Array2<f64>,
        target_name: impl Into<String>,
        target: Array1<f64>,
    ) -> RwResult<Self> {
        if features.nrows() != target.len() {
            return Err(validation_error!(
                "sample has {} feature rows but {} target values",
                features.nrows(),
                target.len()
            ));
        }
        if features.ncols() != feature_names.len() {
            return Err(validation_error!(
                "sample has {} feature columns but {} feature names",
                features.ncols(),
                feature_names.len()
            ));
        }
        Ok(Self {
            feature_names,
            target_name: target_name.into(),
            features,
            target,
        })
    }

    /// Build a sample from feature rows, rejecting ragged rows.
    pub fn from_rows(
        feature_names: Vec<String>,
        rows: Vec<Vec<f64>>,
        target_name: impl Into<String>,
        target: Vec<f64>,
    ) -> RwResult<Self> {
        let n_cols = feature_names.len();
        if let Some((row, values)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_cols) {
            return Err(validation_error!(
                "row {} has {} values, expected {}",
                row,
                values.len(),
                n_cols
            ));
        }
        let n_rows = rows.len();
        let features = Array2::from_shape_vec((n_rows, n_cols), rows.concat())
            .map_err(|e| validation_error!("invalid feature matrix: {}", e))?;
        Self::new(feature_names, features, target_name, Array1::from(target))
    }

    /// Build a sample from whole observation rows, splitting off the column
    /// named `target_name` as the target.
    pub fn from_observations(
        columns: Vec<String>,
        rows: Vec<Vec<f64>>,
        target_name: &str,
    ) -> RwResult<Self> {
        let target_idx = columns
            .iter()
            .position(|c| c == target_name)
            .ok_or_else(|| validation_error!("target column not found: {}", target_name))?;

        let mut features = Vec::with_capacity(rows.len());
        let mut target = Vec::with_capacity(rows.len());
        for (i, mut row) in rows.into_iter().enumerate() {
            if row.len() != columns.len() {
                return Err(validation_error!(
                    "row {} has {} values, expected {}",
                    i,
                    row.len(),
                    columns.len()
                ));
            }
            target.push(row.remove(target_idx));
            features.push(row);
        }

        let feature_names = columns
            .into_iter()
            .enumerate()
            .filter(|(i, _)| *i != target_idx)
            .map(|(_, c)| c)
            .collect();

        Self::from_rows(feature_names, features, target_name, target)
    }

    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn target(&self) -> &Array1<f64> {
        &self.target
    }

    /// Select observations by index. Indices may repeat.
    pub fn subset(&self, indices: &[usize]) -> RwResult<Sample> {
        if let Some(&i) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(validation_error!(
                "observation index {} out of range for sample of {}",
                i,
                self.len()
            ));
        }
        Ok(Sample {
            feature_names: self.feature_names.clone(),
            target_name: self.target_name.clone(),
            features: self.features.select(Axis(0), indices),
            target: self.target.select(Axis(0), indices),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array};

    fn observations() -> Sample {
        Sample::from_observations(
            vec!["x1".into(), "y".into(), "x2".into()],
            vec![vec![1.0, 10.0, 2.0], vec![3.0, 20.0, 4.0], vec![5.0, 30.0, 6.0]],
            "y",
        )
        .unwrap()
    }

    #[test]
    fn target_column_is_split_off() {
        let sample = observations();
        assert_eq!(sample.len(), 3);
        assert_eq!(sample.feature_names(), &["x1".to_string(), "x2".to_string()]);
        assert_eq!(sample.target(), &array![10.0, 20.0, 30.0]);
        assert_eq!(sample.features().row(1), array![3.0, 4.0]);
    }

    #[test]
    fn subset_allows_repeats() {
        let sample = observations();
        let sub = sample.subset(&[2, 2, 0]).unwrap();
        assert_eq!(sub.target(), &array![30.0, 30.0, 10.0]);
        assert_eq!(sub.features().row(1), array![5.0, 6.0]);
        assert!(sample.subset(&[3]).is_err());
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = Sample::from_rows(
            vec!["a".into(), "b".into()],
            vec![vec![1.0, 2.0], vec![1.0]],
            "y",
            vec![0.0, 1.0],
        )
        .unwrap_err();
        assert!(err.to_string().contains("row 1 has 1 values"));

        assert!(Sample::from_observations(vec!["a".into()], vec![vec![1.0]], "y").is_err());
    }

    #[test]
    fn rejects_mismatched_shapes() {
        let features = Array::zeros((3, 2));
        assert!(Sample::new(vec!["a".into(), "b".into()], features.clone(), "y", array![1.0]).is_err());
        assert!(Sample::new(vec!["a".into()], features, "y", array![1.0, 2.0, 3.0]).is_err());
    }
}
