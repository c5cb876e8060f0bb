use nalgebra::{Point3, Vector3};

/// Applies the minimum-image convention to a displacement vector for an
/// orthorhombic periodic box.
#[inline]
pub fn minimum_image(mut delta: Vector3<f64>, box_lengths: &Vector3<f64>) -> Vector3<f64> {
    for k in 0..3 {
        let l = box_lengths[k];
        if l > 0.0 {
            delta[k] -= l * (delta[k] / l).round();
        }
    }
    delta
}

/// Returns the angle in radians formed at `p2` by the points `p1-p2-p3`.
#[inline]
pub fn angle(p1: &Point3<f64>, p2: &Point3<f64>, p3: &Point3<f64>) -> f64 {
    let v1 = p1 - p2;
    let v2 = p3 - p2;
    let denom = v1.norm() * v2.norm();
    if denom < 1e-12 {
        return 0.0;
    }
    (v1.dot(&v2) / denom).clamp(-1.0, 1.0).acos()
}

/// Returns the signed dihedral angle in radians defined by `p1-p2-p3-p4`.
///
/// Uses the atan2 formulation, which is numerically stable near 0 and pi.
#[inline]
pub fn dihedral(p1: &Point3<f64>, p2: &Point3<f64>, p3: &Point3<f64>, p4: &Point3<f64>) -> f64 {
    let b1 = p2 - p1;
    let b2 = p3 - p2;
    let b3 = p4 - p3;

    let n1 = b1.cross(&b2);
    let n2 = b2.cross(&b3);
    let m1 = n1.cross(&b2.normalize());

    let x = n1.dot(&n2);
    let y = m1.dot(&n2);
    y.atan2(x)
}
