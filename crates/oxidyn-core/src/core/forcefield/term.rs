use std::ops::{Add, AddAssign};

/// Potential energy decomposed into force-field terms, in kcal/mol.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnergyTerm {
    pub bond: f64,
    pub angle: f64,
    pub torsion: f64,
    pub vdw: f64,
    pub coulomb: f64,
}

impl EnergyTerm {
    pub fn new(bond: f64, angle: f64, torsion: f64, vdw: f64, coulomb: f64) -> Self {
        Self {
            bond,
            angle,
            torsion,
            vdw,
            coulomb,
        }
    }

    #[inline]
    pub fn total(&self) -> f64 {
        self.bond + self.angle + self.torsion + self.vdw + self.coulomb
    }

    /// Returns true when every component is a finite number.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.bond.is_finite()
            && self.angle.is_finite()
            && self.torsion.is_finite()
            && self.vdw.is_finite()
            && self.coulomb.is_finite()
    }
}

impl Add for EnergyTerm {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            bond: self.bond + rhs.bond,
            angle: self.angle + rhs.angle,
            torsion: self.torsion + rhs.torsion,
            vdw: self.vdw + rhs.vdw,
            coulomb: self.coulomb + rhs.coulomb,
        }
    }
}

impl AddAssign for EnergyTerm {
    fn add_assign(&mut self, rhs: Self) {
        self.bond += rhs.bond;
        self.angle += rhs.angle;
        self.torsion += rhs.torsion;
        self.vdw += rhs.vdw;
        self.coulomb += rhs.coulomb;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_creates_energy_term_with_specified_values() {
        let term = EnergyTerm::new(1.0, 2.0, 3.0, 4.0, 5.0);
        assert_eq!(term.bond, 1.0);
        assert_eq!(term.angle, 2.0);
        assert_eq!(term.torsion, 3.0);
        assert_eq!(term.vdw, 4.0);
        assert_eq!(term.coulomb, 5.0);
    }

    #[test]
    fn total_returns_sum_of_all_terms() {
        let term = EnergyTerm::new(1.5, -2.0, 0.5, 1.0, -1.0);
        assert_eq!(term.total(), 0.0);
    }

    #[test]
    fn add_sums_each_field_correctly() {
        let a = EnergyTerm::new(1.0, 2.0, 3.0, 4.0, 5.0);
        let b = EnergyTerm::new(5.0, 4.0, 3.0, 2.0, 1.0);
        let result = a + b;
        assert_eq!(result, EnergyTerm::new(6.0, 6.0, 6.0, 6.0, 6.0));
    }

    #[test]
    fn add_assign_accumulates_each_field_correctly() {
        let mut a = EnergyTerm::new(1.0, 2.0, 3.0, 4.0, 5.0);
        a += EnergyTerm::new(1.0, 1.0, 1.0, 1.0, 1.0);
        assert_eq!(a, EnergyTerm::new(2.0, 3.0, 4.0, 5.0, 6.0));
    }

    #[test]
    fn default_initializes_all_fields_to_zero() {
        let term = EnergyTerm::default();
        assert_eq!(term.total(), 0.0);
    }

    #[test]
    fn is_finite_detects_nan_components() {
        let mut term = EnergyTerm::default();
        assert!(term.is_finite());
        term.vdw = f64::NAN;
        assert!(!term.is_finite());
        term.vdw = f64::INFINITY;
        assert!(!term.is_finite());
    }
}
