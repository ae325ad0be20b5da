use nalgebra::Vector3;
use thiserror::Error;

const RIGHT_ANGLE_DEGREES: f64 = 90.0;
const ANGLE_TOLERANCE_DEGREES: f64 = 1e-4;

/// Unit cell parameters as reported by a trajectory source for one frame.
///
/// Lengths are in Angstroms and angles in degrees, following the
/// `(a, b, c, alpha, beta, gamma)` convention of PDB `CRYST1` records.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UnitCell {
    pub lengths: [f64; 3],
    pub angles: [f64; 3],
}

impl UnitCell {
    pub fn new(lengths: [f64; 3], angles: [f64; 3]) -> Self {
        Self { lengths, angles }
    }

    /// Builds a rectangular cell with all angles at 90 degrees.
    pub fn orthorhombic(a: f64, b: f64, c: f64) -> Self {
        Self {
            lengths: [a, b, c],
            angles: [RIGHT_ANGLE_DEGREES; 3],
        }
    }

    pub fn is_orthorhombic(&self) -> bool {
        self.angles
            .iter()
            .all(|angle| (angle - RIGHT_ANGLE_DEGREES).abs() <= ANGLE_TOLERANCE_DEGREES)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BoxError {
    #[error("at least one PBC box length is zero or invalid (a={a}, b={b}, c={c})")]
    InvalidLength { a: f64, b: f64, c: f64 },

    #[error(
        "non-orthorhombic cell detected (alpha={alpha}, beta={beta}, gamma={gamma}); only orthorhombic boxes are supported"
    )]
    NonOrthorhombic { alpha: f64, beta: f64, gamma: f64 },
}

/// A validated orthorhombic periodic box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodicBox {
    lengths: Vector3<f64>,
}

impl PeriodicBox {
    pub fn new(lengths: [f64; 3]) -> Result<Self, BoxError> {
        if lengths.iter().any(|&l| !l.is_finite() || l <= 0.0) {
            return Err(BoxError::InvalidLength {
                a: lengths[0],
                b: lengths[1],
                c: lengths[2],
            });
        }
        Ok(Self {
            lengths: Vector3::from(lengths),
        })
    }

    /// Validates a unit cell and converts it into a periodic box.
    ///
    /// Edge lengths are checked before angles, so a cell that is both empty and
    /// skewed reports the length problem.
    pub fn from_cell(cell: &UnitCell) -> Result<Self, BoxError> {
        let pbc = Self::new(cell.lengths)?;
        if !cell.is_orthorhombic() {
            return Err(BoxError::NonOrthorhombic {
                alpha: cell.angles[0],
                beta: cell.angles[1],
                gamma: cell.angles[2],
            });
        }
        Ok(pbc)
    }

    pub fn lengths(&self) -> &Vector3<f64> {
        &self.lengths
    }
}

/// Returns the integer multiple of the box edge nearest to `reference`, per axis.
///
/// Subtracting the result from `reference` brings it into `[-L/2, L/2)` on every axis
/// (the minimum-image convention specialised to orthorhombic boxes).
pub fn wrap_shift(reference: &Vector3<f64>, pbc: &PeriodicBox) -> Vector3<f64> {
    reference.zip_map(&pbc.lengths, |r, l| (r / l + 0.5).floor() * l)
}

/// Adds the image shift of an inter-frame displacement to a running accumulator.
///
/// The true displacement between two consecutive frames must stay below half a box
/// length on every axis. Faster motion is indistinguishable from an image crossing
/// and produces a wrong unwrapped trajectory; this is not detected.
pub fn accumulate_unwrap_shift(
    displacement: &Vector3<f64>,
    pbc: &PeriodicBox,
    accumulator: &mut Vector3<f64>,
) {
    *accumulator += wrap_shift(displacement, pbc);
}
