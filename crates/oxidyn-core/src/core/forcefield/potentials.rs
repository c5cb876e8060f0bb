pub const COULOMB_CONSTANT: f64 = 332.0637; // In kcal·Å/(mol·e²)

const TWO_OVER_SQRT_PI: f64 = 1.128_379_167_095_512_6;

/// Harmonic bond energy, Amber convention: `E = k (r - r0)^2`.
#[inline]
pub fn harmonic_bond(dist: f64, k: f64, r0: f64) -> f64 {
    let dr = dist - r0;
    k * dr * dr
}

/// Radial derivative of [`harmonic_bond`].
#[inline]
pub fn harmonic_bond_deriv(dist: f64, k: f64, r0: f64) -> f64 {
    2.0 * k * (dist - r0)
}

/// Harmonic angle energy, `E = k (theta - theta0)^2` with angles in radians.
#[inline]
pub fn harmonic_angle(theta: f64, k: f64, theta0: f64) -> f64 {
    let dt = theta - theta0;
    k * dt * dt
}

/// Angular derivative of [`harmonic_angle`].
#[inline]
pub fn harmonic_angle_deriv(theta: f64, k: f64, theta0: f64) -> f64 {
    2.0 * k * (theta - theta0)
}

/// Periodic torsion energy, `E = k (1 + cos(n*phi - phase))`.
#[inline]
pub fn periodic_torsion(phi: f64, k: f64, periodicity: u8, phase: f64) -> f64 {
    k * (1.0 + (periodicity as f64 * phi - phase).cos())
}

/// Angular derivative of [`periodic_torsion`].
#[inline]
pub fn periodic_torsion_deriv(phi: f64, k: f64, periodicity: u8, phase: f64) -> f64 {
    let n = periodicity as f64;
    -k * n * (n * phi - phase).sin()
}

/// Lennard-Jones 12-6 energy in the sigma/epsilon form.
#[inline]
pub fn lennard_jones_12_6(dist: f64, sigma: f64, epsilon: f64) -> f64 {
    if dist < 1e-6 {
        return 1e10;
    }
    let sr = sigma / dist;
    let sr6 = sr.powi(6);
    let sr12 = sr6 * sr6;
    4.0 * epsilon * (sr12 - sr6)
}

/// Radial derivative of [`lennard_jones_12_6`].
#[inline]
pub fn lennard_jones_12_6_deriv(dist: f64, sigma: f64, epsilon: f64) -> f64 {
    if dist < 1e-6 {
        return -1e10;
    }
    let sr = sigma / dist;
    let sr6 = sr.powi(6);
    let sr12 = sr6 * sr6;
    -24.0 * epsilon * (2.0 * sr12 - sr6) / dist
}

/// Point-charge Coulomb energy in vacuum.
#[inline]
pub fn coulomb(dist: f64, q1: f64, q2: f64) -> f64 {
    if dist < 1e-6 {
        return q1.signum() * q2.signum() * 1e10;
    }
    COULOMB_CONSTANT * q1 * q2 / dist
}

/// Radial derivative of [`coulomb`].
#[inline]
pub fn coulomb_deriv(dist: f64, q1: f64, q2: f64) -> f64 {
    if dist < 1e-6 {
        return 0.0;
    }
    -COULOMB_CONSTANT * q1 * q2 / (dist * dist)
}

/// Complementary error function.
///
/// Abramowitz & Stegun 7.1.26 rational approximation; maximum absolute
/// error 1.5e-7, which is well below the accuracy of the Ewald splitting
/// it supports.
#[inline]
pub fn erfc(x: f64) -> f64 {
    let sign_negative = x < 0.0;
    let x_abs = x.abs();
    let t = 1.0 / (1.0 + 0.3275911 * x_abs);
    let poly = t
        * (0.254829592 + t * (-0.284496736 + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));
    let result = poly * (-x_abs * x_abs).exp();
    if sign_negative { 2.0 - result } else { result }
}

/// Error function, `erf(x) = 1 - erfc(x)`.
#[inline]
pub fn erf(x: f64) -> f64 {
    1.0 - erfc(x)
}

/// Real-space term of the Ewald-split Coulomb interaction,
/// `E = C q1 q2 erfc(alpha r) / r`.
#[inline]
pub fn ewald_real(dist: f64, q1: f64, q2: f64, alpha: f64) -> f64 {
    if dist < 1e-6 {
        return q1.signum() * q2.signum() * 1e10;
    }
    COULOMB_CONSTANT * q1 * q2 * erfc(alpha * dist) / dist
}

/// Radial derivative of [`ewald_real`].
#[inline]
pub fn ewald_real_deriv(dist: f64, q1: f64, q2: f64, alpha: f64) -> f64 {
    if dist < 1e-6 {
        return 0.0;
    }
    let ar = alpha * dist;
    COULOMB_CONSTANT
        * q1
        * q2
        * (-erfc(ar) / (dist * dist) - alpha * TWO_OVER_SQRT_PI * (-ar * ar).exp() / dist)
}

/// Correction removing the reciprocal-space contribution of an excluded
/// pair, `E = -C q1 q2 erf(alpha r) / r`.
#[inline]
pub fn ewald_excluded(dist: f64, q1: f64, q2: f64, alpha: f64) -> f64 {
    if dist < 1e-6 {
        // erf(alpha r)/r -> 2 alpha / sqrt(pi) as r -> 0
        return -COULOMB_CONSTANT * q1 * q2 * alpha * TWO_OVER_SQRT_PI;
    }
    -COULOMB_CONSTANT * q1 * q2 * erf(alpha * dist) / dist
}

/// Radial derivative of [`ewald_excluded`].
#[inline]
pub fn ewald_excluded_deriv(dist: f64, q1: f64, q2: f64, alpha: f64) -> f64 {
    if dist < 1e-6 {
        return 0.0;
    }
    let ar = alpha * dist;
    COULOMB_CONSTANT
        * q1
        * q2
        * (erf(ar) / (dist * dist) - alpha * TWO_OVER_SQRT_PI * (-ar * ar).exp() / dist)
}

/// Per-charge Ewald self-interaction correction,
/// `E = -C alpha q^2 / sqrt(pi)`.
#[inline]
pub fn ewald_self(charge: f64, alpha: f64) -> f64 {
    -COULOMB_CONSTANT * alpha * charge * charge * TWO_OVER_SQRT_PI / 2.0
}
