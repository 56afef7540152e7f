use nalgebra::{Matrix3x6, Vector3};

use crate::model::{label_index, ModelSet, Point3i};

/// Projection of one labeled point onto its model.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectionEntry {
    /// Index of the model the point belongs to.
    pub label: usize,
    /// Point projected onto the model.
    pub point: Vector3<f64>,
    /// Derivative of `point` w.r.t. the six parameters of `label`.
    pub jacobian: Matrix3x6<f64>,
}

/// Per-point projections for one set of model parameters. Unlabeled points
/// have no entry.
#[derive(Clone, Debug, Default)]
pub struct ProjectionCache {
    entries: Vec<Option<ProjectionEntry>>,
}

impl ProjectionCache {
    pub fn compute(points: &[Point3i], labels: &[i32], models: &ModelSet) -> Self {
        assert_eq!(points.len(), labels.len(), "one label per point");
        let entries = points
            .iter()
            .zip(labels)
            .map(|(p, &l)| {
                label_index(l, models.len()).map(|label| {
                    let x = to_f64(p);
                    let model = &models[label];
                    ProjectionEntry {
                        label,
                        point: model.projection(&x),
                        jacobian: model.projection_jacobian(&x),
                    }
                })
            })
            .collect();
        Self { entries }
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<&ProjectionEntry> {
        self.entries[i].as_ref()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[inline]
pub(crate) fn to_f64(p: &Point3i) -> Vector3<f64> {
    p.map(f64::from)
}
