//! Assembly of the sparse least-squares system for the line models.
//!
//! Rows come in blocks of three (x, y, z). Every labeled point contributes
//! one data block; a point whose model continues into a different model
//! along its tangent contributes one smoothness block as well. Data blocks
//! precede smoothness blocks, each group ordered by point index.

use nalgebra::{Matrix3, Matrix3x6, Vector3};
use parking_lot::Mutex;
use rayon::prelude::*;

use super::options::{EnergyWeights, SmoothVariant};
use super::projection::{to_f64, ProjectionCache, ProjectionEntry};
use crate::model::{label_index, ModelSet, Point3i, LINE_PARAMS, UNLABELED};
use crate::sparse::SparseJacobian;
use crate::volume::Volume;

/// Three residual rows with their dense parameter blocks.
#[derive(Clone, Debug)]
struct RowBlock {
    residual: Vector3<f64>,
    /// `(first column, 3x6 block)` in ascending column order.
    blocks: Vec<(usize, Matrix3x6<f64>)>,
}

impl RowBlock {
    fn append_to(&self, out: &mut SparseJacobian) {
        for r in 0..3 {
            let entries = self
                .blocks
                .iter()
                .flat_map(|(c0, m)| (0..LINE_PARAMS).map(move |k| (c0 + k, m[(r, k)])));
            out.push_row(entries, self.residual[r]);
        }
    }
}

pub struct JacobianBuilder<'a> {
    points: &'a [Point3i],
    labels: &'a [i32],
    label_volume: &'a Volume<i32>,
    weights: EnergyWeights,
}

impl<'a> JacobianBuilder<'a> {
    pub fn new(
        points: &'a [Point3i],
        labels: &'a [i32],
        label_volume: &'a Volume<i32>,
        weights: EnergyWeights,
    ) -> Self {
        assert_eq!(points.len(), labels.len(), "one label per point");
        Self {
            points,
            labels,
            label_volume,
            weights,
        }
    }

    pub fn weights(&self) -> &EnergyWeights {
        &self.weights
    }

    /// Full system: data rows, then smoothness rows.
    pub fn build(
        &self,
        cache: &ProjectionCache,
        models: &ModelSet,
        variant: SmoothVariant,
    ) -> SparseJacobian {
        let mut out = SparseJacobian::new(models.num_params());
        self.datacost_jacobian(cache, &mut out);
        match variant {
            SmoothVariant::Sequential => self.smoothcost_jacobian(cache, models, &mut out),
            SmoothVariant::Parallel => self.smoothcost_jacobian_par(cache, models, &mut out),
            SmoothVariant::ParallelLocked => {
                self.smoothcost_jacobian_par_locked(cache, models, &mut out)
            }
        }
        out
    }

    /// Total energy for the projections in `cache`, without forming `J`.
    pub fn energy(&self, cache: &ProjectionCache, models: &ModelSet) -> f64 {
        let w_ll = self.weights.loglikelihood;
        let w_s = self.weights.pairwise_smooth;
        (0..self.points.len())
            .filter_map(|i| cache.get(i).map(|e| (i, e)))
            .map(|(i, e)| {
                let data = w_ll * (e.point - to_f64(&self.points[i])).norm_squared();
                let smooth = self
                    .find_neighbor(i, e.label, models)
                    .map(|b| w_s * (e.point - models[b].projection(&e.point)).norm_squared())
                    .unwrap_or(0.0);
                data + smooth
            })
            .sum()
    }

    pub fn datacost_jacobian(&self, cache: &ProjectionCache, out: &mut SparseJacobian) {
        for i in 0..self.points.len() {
            if let Some(block) = self.data_block(i, cache) {
                block.append_to(out);
            }
        }
    }

    pub fn smoothcost_jacobian(
        &self,
        cache: &ProjectionCache,
        models: &ModelSet,
        out: &mut SparseJacobian,
    ) {
        for i in 0..self.points.len() {
            if let Some(block) = self.smooth_block(i, cache, models) {
                block.append_to(out);
            }
        }
    }

    /// Blocks computed per point on the pool, appended in point order.
    pub fn smoothcost_jacobian_par(
        &self,
        cache: &ProjectionCache,
        models: &ModelSet,
        out: &mut SparseJacobian,
    ) {
        let blocks: Vec<Option<RowBlock>> = (0..self.points.len())
            .into_par_iter()
            .map(|i| self.smooth_block(i, cache, models))
            .collect();
        for block in blocks.iter().flatten() {
            block.append_to(out);
        }
    }

    /// Contiguous chunks assembled into private fragments. Each fragment is
    /// pushed under the lock; fragments are merged in chunk order afterwards.
    pub fn smoothcost_jacobian_par_locked(
        &self,
        cache: &ProjectionCache,
        models: &ModelSet,
        out: &mut SparseJacobian,
    ) {
        let n = self.points.len();
        if n == 0 {
            return;
        }
        let chunk = n.div_ceil(rayon::current_num_threads() * 4).max(1);
        let ncols = models.num_params();
        let fragments: Mutex<Vec<(usize, SparseJacobian)>> = Mutex::new(Vec::new());

        (0..n.div_ceil(chunk)).into_par_iter().for_each(|ci| {
            let mut fragment = SparseJacobian::new(ncols);
            for i in ci * chunk..((ci + 1) * chunk).min(n) {
                if let Some(block) = self.smooth_block(i, cache, models) {
                    block.append_to(&mut fragment);
                }
            }
            fragments.lock().push((ci, fragment));
        });

        let mut fragments = fragments.into_inner();
        fragments.sort_unstable_by_key(|(ci, _)| *ci);
        for (_, fragment) in &fragments {
            out.append(fragment);
        }
    }

    fn data_block(&self, i: usize, cache: &ProjectionCache) -> Option<RowBlock> {
        let e = cache.get(i)?;
        let sw = self.weights.loglikelihood.sqrt();
        Some(RowBlock {
            residual: (e.point - to_f64(&self.points[i])) * sw,
            blocks: vec![(e.label * LINE_PARAMS, e.jacobian * sw)],
        })
    }

    fn smooth_block(
        &self,
        i: usize,
        cache: &ProjectionCache,
        models: &ModelSet,
    ) -> Option<RowBlock> {
        let e: &ProjectionEntry = cache.get(i)?;
        let a = e.label;
        let b = self.find_neighbor(i, a, models)?;
        let sw = self.weights.pairwise_smooth.sqrt();
        let neighbor = &models[b];

        let residual = (e.point - neighbor.projection(&e.point)) * sw;
        let block_a = (Matrix3::identity() - neighbor.point_jacobian()) * e.jacobian * sw;
        let block_b = neighbor.projection_jacobian(&e.point) * -sw;

        let (ca, cb) = (a * LINE_PARAMS, b * LINE_PARAMS);
        let blocks = if a < b {
            vec![(ca, block_a), (cb, block_b)]
        } else {
            vec![(cb, block_b), (ca, block_a)]
        };
        Some(RowBlock { residual, blocks })
    }

    /// Model met first when walking from point `i` along the tangent of its
    /// model `a`, skipping voxels that still belong to `a`.
    pub fn find_neighbor(&self, i: usize, a: usize, models: &ModelSet) -> Option<usize> {
        let tangent = models[a].tangent()?;
        let origin = to_f64(&self.points[i]);
        for k in 1..=self.weights.neighbor_steps {
            let pos = origin + tangent * k as f64;
            let v = pos.map(f64::round);
            let label = self
                .label_volume
                .get_signed(v.x as i64, v.y as i64, v.z as i64)?;
            if label == UNLABELED {
                return None;
            }
            match label_index(label, models.len()) {
                Some(b) if b == a => continue,
                other => return other,
            }
        }
        None
    }
}
