//! Preprocessing transformers.

use ndarray::{Array1, Array2, Axis};
use rw_types::{
    unknown_parameter, validation_error, ParamMap, ParameterSchema, ParameterValue, RwError,
    RwResult, Transformer, ValueKind,
};

/// Removes the column mean and scales to unit variance.
///
/// Constant columns keep a scale of 1 so they map to zero instead of NaN.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    with_mean: bool,
    with_std: bool,
    fitted: Option<(Array1<f64>, Array1<f64>)>,
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self {
            with_mean: true,
            with_std: true,
            fitted: None,
        }
    }
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transformer for StandardScaler {
    fn name(&self) -> &str {
        "StandardScaler"
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new(self.name())
            .param("with_mean", ValueKind::Bool)
            .param("with_std", ValueKind::Bool)
    }

    fn get_params(&self) -> ParamMap {
        ParamMap::from([
            ("with_mean".to_string(), ParameterValue::Bool(self.with_mean)),
            ("with_std".to_string(), ParameterValue::Bool(self.with_std)),
        ])
    }

    fn set_param(&mut self, name: &str, value: &ParameterValue) -> RwResult<()> {
        match name {
            "with_mean" => self.with_mean = value.expect_bool(name)?,
            "with_std" => self.with_std = value.expect_bool(name)?,
            _ => return Err(unknown_parameter(self.name(), name)),
        }
        self.fitted = None;
        Ok(())
    }

    fn fit(&mut self, features: &Array2<f64>) -> RwResult<()> {
        let means = features
            .mean_axis(Axis(0))
            .ok_or_else(|| validation_error!("cannot fit {} on an empty sample", self.name()))?;
        let scales = features
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 0.0 { s } else { 1.0 });
        self.fitted = Some((means, scales));
        Ok(())
    }

    fn transform(&self, features: &Array2<f64>) -> RwResult<Array2<f64>> {
        let (means, scales) = self
            .fitted
            .as_ref()
            .ok_or_else(|| RwError::NotFitted(format!("{} is not fitted", self.name())))?;
        if features.ncols() != means.len() {
            return Err(validation_error!(
                "{} was fitted on {} features but got {}",
                self.name(),
                means.len(),
                features.ncols()
            ));
        }
        let mut out = features.clone();
        if self.with_mean {
            out -= &means.view().insert_axis(Axis(0));
        }
        if self.with_std {
            out /= &scales.view().insert_axis(Axis(0));
        }
        Ok(out)
    }

    fn clone_transformer(&self) -> Box<dyn Transformer> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn standardizes_columns() {
        let rows = array![[1.0, 5.0], [3.0, 5.0]];
        let mut scaler = StandardScaler::new();
        scaler.fit(&rows).unwrap();
        let out = scaler.transform(&rows).unwrap();
        assert_eq!(out, array![[-1.0, 0.0], [1.0, 0.0]]);
    }

    #[test]
    fn mean_only() {
        let rows = array![[1.0], [3.0]];
        let mut scaler = StandardScaler::new();
        scaler.set_param("with_std", &ParameterValue::Bool(false)).unwrap();
        scaler.fit(&rows).unwrap();
        assert_eq!(scaler.transform(&rows).unwrap(), array![[-1.0], [1.0]]);
    }

    #[test]
    fn transform_requires_fit() {
        assert!(StandardScaler::new().transform(&array![[1.0]]).is_err());
        assert!(StandardScaler::new().fit(&Array2::zeros((0, 2))).is_err());
    }

    #[test]
    fn transform_checks_width() {
        let mut scaler = StandardScaler::new();
        scaler.fit(&array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
        assert!(scaler.transform(&array![[1.0]]).is_err());
    }
}
