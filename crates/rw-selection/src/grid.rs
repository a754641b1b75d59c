//! Lazy cartesian-product grids over discrete parameter values.
//!
//! Combinations are never materialized up front. Index `i` is decoded with
//! mixed-radix arithmetic where the first declared parameter is the
//! fastest-varying digit, so `{a: [1, 2, 3], b: [11, 12]}` enumerates
//! `(1, 11), (2, 11), (3, 11), (1, 12), ...`.

use rw_types::{
    config_error, join_param_path, ParamMap, ParameterValue, Pipeline, PipelineRef, RangeError,
    RwResult,
};
use std::collections::HashSet;
use std::iter::FusedIterator;
use std::sync::Arc;

/// Resolve a possibly negative index against `len`.
///
/// Accepts `-len..len`; negative values count from the end.
pub fn wrap_index(index: isize, len: usize) -> Result<usize, RangeError> {
    let out_of_range = RangeError::IndexOutOfRange { index, len };
    let len_signed = isize::try_from(len).map_err(|_| out_of_range.clone())?;
    let resolved = if index < 0 {
        index + len_signed
    } else {
        index
    };
    if (0..len_signed).contains(&resolved) {
        Ok(resolved as usize)
    } else {
        Err(out_of_range)
    }
}

/// The indices selected by `[start:stop:step]` on a sequence of `len` items.
///
/// Negative bounds count from the end, out-of-range bounds are clamped, and
/// omitted bounds default according to the sign of `step` (which defaults to
/// 1 and must not be 0).
pub fn slice_indices(
    start: Option<isize>,
    stop: Option<isize>,
    step: Option<isize>,
    len: usize,
) -> Result<Vec<usize>, RangeError> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(RangeError::ZeroStep);
    }
    let len = isize::try_from(len).unwrap_or(isize::MAX);
    let (lower, upper) = if step > 0 { (0, len) } else { (-1, len - 1) };

    let clamp = |bound: isize| {
        if bound < 0 {
            (bound + len).max(lower)
        } else {
            bound.min(upper)
        }
    };
    let start = start.map_or(if step > 0 { lower } else { upper }, clamp);
    let stop = stop.map_or(if step > 0 { upper } else { lower }, clamp);

    let mut indices = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        // every visited index lies in 0..len
        indices.push(i as usize);
        match i.checked_add(step) {
            Some(next) => i = next,
            None => break,
        }
    }
    Ok(indices)
}

/// Decompose `index` into one digit per radix, least significant first.
pub fn mixed_radix_decode(mut index: usize, radices: &[usize]) -> Vec<usize> {
    radices
        .iter()
        .map(|&radix| {
            if radix == 0 {
                return 0;
            }
            let digit = index % radix;
            index /= radix;
            digit
        })
        .collect()
}

/// A cartesian product of parameter values for one pipeline template.
///
/// Parameter names are prefixed with the pipeline's final estimator step, so
/// `learner_parameters` `{C: [1, 10]}` on a classifier pipeline yields
/// combinations keyed `classifier__C`.
#[derive(Debug, Clone)]
pub struct LearnerGrid {
    pipeline: PipelineRef,
    names: Vec<String>,
    values: Vec<Vec<ParameterValue>>,
    len: usize,
}

impl LearnerGrid {
    /// Grid over learner parameters, prefixed with the final estimator step.
    pub fn new(
        pipeline: PipelineRef,
        learner_parameters: Vec<(String, Vec<ParameterValue>)>,
    ) -> RwResult<Self> {
        let prefix = pipeline.final_estimator_param().map(str::to_string);
        let axes = learner_parameters
            .into_iter()
            .map(|(name, values)| {
                let name = match &prefix {
                    Some(prefix) => join_param_path(&[prefix.as_str(), name.as_str()]),
                    None => name,
                };
                (name, values)
            })
            .collect();
        Self::from_prefixed(pipeline, axes)
    }

    /// Grid over fully qualified pipeline parameter names.
    pub fn from_prefixed(
        pipeline: PipelineRef,
        parameters: Vec<(String, Vec<ParameterValue>)>,
    ) -> RwResult<Self> {
        let mut seen = HashSet::new();
        for (name, _) in &parameters {
            if !seen.insert(name.as_str()) {
                return Err(config_error!("duplicate parameter name in grid: {}", name));
            }
        }

        let len = parameters
            .iter()
            .try_fold(1usize, |acc, (_, values)| acc.checked_mul(values.len()))
            .ok_or_else(|| config_error!("grid size overflows"))?;

        let (names, values) = parameters.into_iter().unzip();
        Ok(Self {
            pipeline,
            names,
            values,
            len,
        })
    }

    /// Start building a grid for `pipeline`.
    pub fn builder(pipeline: impl Pipeline + 'static) -> GridBuilder {
        GridBuilder {
            pipeline: Arc::new(pipeline),
            parameters: Vec::new(),
        }
    }

    pub fn pipeline(&self) -> &PipelineRef {
        &self.pipeline
    }

    /// Prefixed parameter names in declaration order.
    pub fn parameter_names(&self) -> &[String] {
        &self.names
    }

    /// Values of each parameter, in declaration order.
    pub fn parameter_values(&self) -> &[Vec<ParameterValue>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Combination at `index`; negative indices count from the end.
    pub fn get(&self, index: isize) -> RwResult<ParamMap> {
        let index = wrap_index(index, self.len)?;
        Ok(self.decode(index))
    }

    /// Combinations selected by `[start:stop:step]`.
    pub fn slice(
        &self,
        start: Option<isize>,
        stop: Option<isize>,
        step: Option<isize>,
    ) -> RwResult<Vec<ParamMap>> {
        Ok(slice_indices(start, stop, step, self.len)?
            .into_iter()
            .map(|i| self.decode(i))
            .collect())
    }

    pub fn iter(&self) -> GridIter<'_> {
        GridIter {
            grid: self,
            front: 0,
            back: self.len,
        }
    }

    /// `index` must be below `len`.
    fn decode(&self, index: usize) -> ParamMap {
        let radices: Vec<usize> = self.values.iter().map(Vec::len).collect();
        mixed_radix_decode(index, &radices)
            .into_iter()
            .zip(self.names.iter().zip(&self.values))
            .map(|(digit, (name, values))| (name.clone(), values[digit].clone()))
            .collect()
    }
}

impl<'a> IntoIterator for &'a LearnerGrid {
    type Item = ParamMap;
    type IntoIter = GridIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterates a [`LearnerGrid`] in index order.
#[derive(Debug, Clone)]
pub struct GridIter<'a> {
    grid: &'a LearnerGrid,
    front: usize,
    back: usize,
}

impl Iterator for GridIter<'_> {
    type Item = ParamMap;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let item = self.grid.decode(self.front);
        self.front += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl DoubleEndedIterator for GridIter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        Some(self.grid.decode(self.back))
    }
}

impl ExactSizeIterator for GridIter<'_> {}

impl FusedIterator for GridIter<'_> {}

/// Collects learner parameters for a [`LearnerGrid`].
#[derive(Debug, Clone)]
pub struct GridBuilder {
    pipeline: PipelineRef,
    parameters: Vec<(String, Vec<ParameterValue>)>,
}

impl GridBuilder {
    pub fn param<T: Into<ParameterValue>>(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        self.parameters
            .push((name.into(), values.into_iter().map(Into::into).collect()));
        self
    }

    pub fn build(self) -> RwResult<LearnerGrid> {
        LearnerGrid::new(self.pipeline, self.parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rw_learners::KernelRidgeClassifier;
    use rw_types::{LearnerPipeline, RwError};

    fn abc_grid() -> LearnerGrid {
        LearnerGrid::builder(LearnerPipeline::new(KernelRidgeClassifier::new()))
            .param("a", [1, 2, 3])
            .param("b", [11, 12])
            .param("c", [21, 22])
            .build()
            .unwrap()
    }

    fn combo(a: i64, b: i64, c: i64) -> ParamMap {
        ParamMap::from([
            ("classifier__a".to_string(), ParameterValue::Int(a)),
            ("classifier__b".to_string(), ParameterValue::Int(b)),
            ("classifier__c".to_string(), ParameterValue::Int(c)),
        ])
    }

    fn expected() -> Vec<ParamMap> {
        let mut out = Vec::new();
        for c in [21, 22] {
            for b in [11, 12] {
                for a in [1, 2, 3] {
                    out.push(combo(a, b, c));
                }
            }
        }
        out
    }

    #[test]
    fn first_parameter_varies_fastest() {
        let grid = abc_grid();
        assert_eq!(grid.len(), 12);
        assert_eq!(grid.get(0).unwrap(), combo(1, 11, 21));
        assert_eq!(grid.get(1).unwrap(), combo(2, 11, 21));
        assert_eq!(grid.get(3).unwrap(), combo(1, 12, 21));
        assert_eq!(grid.get(6).unwrap(), combo(1, 11, 22));
        assert_eq!(grid.iter().collect::<Vec<_>>(), expected());
    }

    #[test]
    fn negative_indices_wrap() {
        let grid = abc_grid();
        let expected = expected();
        for i in -12..0isize {
            assert_eq!(grid.get(i).unwrap(), expected[(12 + i) as usize]);
        }
        assert_eq!(grid.get(-1).unwrap(), grid.get(11).unwrap());
    }

    #[test]
    fn out_of_range_indices_fail() {
        let grid = abc_grid();
        for index in [12, -13] {
            match grid.get(index) {
                Err(RwError::Range(RangeError::IndexOutOfRange { index: i, len })) => {
                    assert_eq!((i, len), (index, 12));
                }
                other => panic!("expected a range error, got {other:?}"),
            }
        }
    }

    #[test]
    fn slices_follow_sequence_semantics() {
        let grid = abc_grid();
        let expected = expected();
        let pick = |indices: &[usize]| indices.iter().map(|i| expected[*i].clone()).collect::<Vec<_>>();

        assert_eq!(grid.slice(Some(-10), Some(10), Some(2)).unwrap(), pick(&[2, 4, 6, 8]));
        assert_eq!(grid.slice(None, None, None).unwrap(), expected);
        assert_eq!(grid.slice(Some(10), None, None).unwrap(), pick(&[10, 11]));
        assert_eq!(grid.slice(None, Some(-10), None).unwrap(), pick(&[0, 1]));
        assert_eq!(grid.slice(None, None, Some(-5)).unwrap(), pick(&[11, 6, 1]));
        assert_eq!(grid.slice(Some(100), Some(-100), Some(-4)).unwrap(), pick(&[11, 7, 3]));
        assert!(grid.slice(Some(5), Some(2), None).unwrap().is_empty());
        assert!(matches!(
            grid.slice(None, None, Some(0)),
            Err(RwError::Range(RangeError::ZeroStep))
        ));
    }

    #[test]
    fn slice_index_helper() {
        assert_eq!(slice_indices(Some(-10), Some(10), Some(2), 12).unwrap(), vec![2, 4, 6, 8]);
        assert_eq!(slice_indices(None, None, Some(-1), 3).unwrap(), vec![2, 1, 0]);
        assert_eq!(slice_indices(Some(-1), Some(-4), Some(-1), 3).unwrap(), vec![2, 1, 0]);
        assert_eq!(slice_indices(Some(0), None, Some(isize::MAX), 3).unwrap(), vec![0]);
        assert!(slice_indices(None, None, None, 0).unwrap().is_empty());
    }

    #[test]
    fn iteration_is_repeatable_and_reversible() {
        let grid = abc_grid();
        let first: Vec<_> = grid.iter().collect();
        let second: Vec<_> = (&grid).into_iter().collect();
        assert_eq!(first, second);
        assert_eq!(grid.iter().len(), 12);

        let mut reversed: Vec<_> = grid.iter().rev().collect();
        reversed.reverse();
        assert_eq!(reversed, first);
    }

    #[test]
    fn empty_axes_and_no_axes() {
        let pipeline: PipelineRef = Arc::new(LearnerPipeline::new(KernelRidgeClassifier::new()));
        let empty = LearnerGrid::new(
            pipeline.clone(),
            vec![
                ("C".to_string(), vec![ParameterValue::Float(1.0)]),
                ("kernel".to_string(), Vec::new()),
            ],
        )
        .unwrap();
        assert_eq!(empty.len(), 0);
        assert_eq!(empty.iter().count(), 0);
        assert!(empty.get(0).is_err());

        let single = LearnerGrid::new(pipeline, Vec::new()).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single.get(0).unwrap(), ParamMap::new());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = LearnerGrid::builder(LearnerPipeline::new(KernelRidgeClassifier::new()))
            .param("C", [1.0])
            .param("C", [10.0])
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "duplicate parameter name in grid: classifier__C");
    }

    #[test]
    fn mixed_radix_digits() {
        assert_eq!(mixed_radix_decode(7, &[3, 2, 2]), vec![1, 0, 1]);
        assert_eq!(mixed_radix_decode(11, &[3, 2, 2]), vec![2, 1, 1]);
    }
}
