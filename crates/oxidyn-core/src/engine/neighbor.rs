use crate::core::utils::geometry::minimum_image;
use nalgebra::{Point3, Vector3};
use std::collections::HashSet;

/// A Verlet pair list with a skin buffer.
///
/// The list holds every non-excluded pair within `cutoff + skin` and is
/// rebuilt only once some atom has drifted further than half the skin from
/// the positions of the last build, which amortizes the quadratic
/// construction over many steps.
#[derive(Debug, Clone)]
pub struct NeighborList {
    cutoff: f64,
    skin: f64,
    pairs: Vec<(usize, usize)>,
    reference_positions: Vec<Point3<f64>>,
}

impl NeighborList {
    /// Creates an empty list. An infinite cutoff yields an all-pairs list.
    pub fn new(cutoff: f64, skin: f64) -> Self {
        Self {
            cutoff,
            skin,
            pairs: Vec::new(),
            reference_positions: Vec::new(),
        }
    }

    /// The pairs from the last `update`, each with `i < j`.
    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    /// Rebuilds the list if any atom moved more than half the skin since the
    /// last build (or if the list was never built). Returns whether a
    /// rebuild happened.
    pub fn update(
        &mut self,
        positions: &[Point3<f64>],
        box_lengths: Option<&Vector3<f64>>,
        excluded: &[HashSet<usize>],
    ) -> bool {
        if !self.needs_rebuild(positions, box_lengths) {
            return false;
        }
        self.rebuild(positions, box_lengths, excluded);
        true
    }

    fn needs_rebuild(&self, positions: &[Point3<f64>], box_lengths: Option<&Vector3<f64>>) -> bool {
        if self.reference_positions.len() != positions.len() {
            return true;
        }
        if !self.cutoff.is_finite() {
            // All-pairs list never goes stale.
            return false;
        }
        let threshold_sq = (self.skin / 2.0) * (self.skin / 2.0);
        positions
            .iter()
            .zip(&self.reference_positions)
            .any(|(current, reference)| {
                let mut delta = current - reference;
                if let Some(lengths) = box_lengths {
                    delta = minimum_image(delta, lengths);
                }
                delta.norm_squared() > threshold_sq
            })
    }

    fn rebuild(
        &mut self,
        positions: &[Point3<f64>],
        box_lengths: Option<&Vector3<f64>>,
        excluded: &[HashSet<usize>],
    ) {
        self.pairs.clear();
        let range_sq = if self.cutoff.is_finite() {
            let range = self.cutoff + self.skin;
            range * range
        } else {
            f64::INFINITY
        };

        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                if excluded[i].contains(&j) {
                    continue;
                }
                let mut delta = positions[j] - positions[i];
                if let Some(lengths) = box_lengths {
                    delta = minimum_image(delta, lengths);
                }
                if delta.norm_squared() <= range_sq {
                    self.pairs.push((i, j));
                }
            }
        }
        self.reference_positions = positions.to_vec();
    }
}
