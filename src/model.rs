//! Numeric interface of the vessel line models.
//!
//! A [`Line3D`] is parameterised by its two end points, giving six free
//! parameters `[p1.x, p1.y, p1.z, p2.x, p2.y, p2.z]`. Model `m` of a
//! [`ModelSet`] owns the parameter columns `6m..6m + 6`.

use nalgebra::{Matrix3, Matrix3x6, Vector3};
use serde::{Deserialize, Serialize};

/// Integer voxel coordinate of a data point.
pub type Point3i = Vector3<i32>;

/// Label of a data point or voxel not assigned to any model.
pub const UNLABELED: i32 = -1;

/// Free parameters per line model.
pub const LINE_PARAMS: usize = 6;

const EPS: f64 = 1e-12;

/// Resolve a label to a model index.
///
/// Panics when `label` is neither [`UNLABELED`] nor a valid index: the
/// labeling must only ever reference existing models.
#[inline]
pub fn label_index(label: i32, num_models: usize) -> Option<usize> {
    if label == UNLABELED {
        return None;
    }
    assert!(
        label >= 0 && (label as usize) < num_models,
        "label {label} does not refer to one of the {num_models} models"
    );
    Some(label as usize)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Line3D {
    pub p1: Vector3<f64>,
    pub p2: Vector3<f64>,
    /// Vessel radius; carried along, not optimised.
    pub radius: f64,
}

impl Line3D {
    pub fn new(p1: Vector3<f64>, p2: Vector3<f64>, radius: f64) -> Self {
        Self { p1, p2, radius }
    }

    #[inline]
    pub fn direction(&self) -> Vector3<f64> {
        self.p2 - self.p1
    }

    /// Unit direction, `None` for a collapsed line.
    pub fn tangent(&self) -> Option<Vector3<f64>> {
        let d = self.direction();
        let norm = d.norm();
        (norm > EPS).then(|| d / norm)
    }

    pub fn params(&self) -> [f64; LINE_PARAMS] {
        [
            self.p1.x, self.p1.y, self.p1.z, self.p2.x, self.p2.y, self.p2.z,
        ]
    }

    /// Add `delta` (length 6) to the parameters.
    pub fn update(&mut self, delta: &[f64]) {
        assert_eq!(delta.len(), LINE_PARAMS, "line update needs {LINE_PARAMS} values");
        self.p1 += Vector3::new(delta[0], delta[1], delta[2]);
        self.p2 += Vector3::new(delta[3], delta[4], delta[5]);
    }

    /// Closest point to `x` on the (infinite) line through `p1` and `p2`.
    pub fn projection(&self, x: &Vector3<f64>) -> Vector3<f64> {
        let d = self.direction();
        let s = d.norm_squared();
        if s <= EPS {
            return self.p1;
        }
        let t = (x - self.p1).dot(&d) / s;
        self.p1 + d * t
    }

    pub fn distance(&self, x: &Vector3<f64>) -> f64 {
        (self.projection(x) - x).norm()
    }

    /// Derivative of [`Line3D::projection`] at `x` with respect to the six
    /// parameters (columns: `p1` then `p2`).
    pub fn projection_jacobian(&self, x: &Vector3<f64>) -> Matrix3x6<f64> {
        let mut jac = Matrix3x6::zeros();
        let d = self.direction();
        let s = d.norm_squared();
        if s <= EPS {
            jac.fixed_view_mut::<3, 3>(0, 0).copy_from(&Matrix3::identity());
            return jac;
        }
        let u = x - self.p1;
        let t = u.dot(&d) / s;
        let dt_dp1 = (d * (2.0 * t) - d - u) / s;
        let dt_dp2 = (u - d * (2.0 * t)) / s;
        let d_p1 = Matrix3::identity() * (1.0 - t) + d * dt_dp1.transpose();
        let d_p2 = Matrix3::identity() * t + d * dt_dp2.transpose();
        jac.fixed_view_mut::<3, 3>(0, 0).copy_from(&d_p1);
        jac.fixed_view_mut::<3, 3>(0, 3).copy_from(&d_p2);
        jac
    }

    /// Derivative of [`Line3D::projection`] with respect to the projected
    /// point (`d dᵀ / |d|²`).
    pub fn point_jacobian(&self) -> Matrix3<f64> {
        let d = self.direction();
        let s = d.norm_squared();
        if s <= EPS {
            return Matrix3::zeros();
        }
        d * d.transpose() / s
    }
}

/// Ordered collection of the current line models.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSet {
    pub models: Vec<Line3D>,
}

impl ModelSet {
    pub fn new(models: Vec<Line3D>) -> Self {
        Self { models }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Total number of free parameters.
    #[inline]
    pub fn num_params(&self) -> usize {
        self.models.len() * LINE_PARAMS
    }

    /// Apply a stacked parameter update of length [`ModelSet::num_params`].
    pub fn apply_update(&mut self, delta: &[f64]) {
        assert_eq!(delta.len(), self.num_params(), "update length mismatch");
        for (model, chunk) in self.models.iter_mut().zip(delta.chunks_exact(LINE_PARAMS)) {
            model.update(chunk);
        }
    }
}

impl std::ops::Index<usize> for ModelSet {
    type Output = Line3D;

    fn index(&self, i: usize) -> &Line3D {
        &self.models[i]
    }
}
