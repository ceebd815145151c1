//! Scalar, vector and tensor aliases shared by every module.
//!
//! Everything is stored as 3D double precision. 1D and 2D bodies leave the
//! unused components at zero (vectors) or identity (tensors), which keeps
//! plane-strain solids and 3D solids on the same code path.

use glam::{DMat3, DVec3};

pub type Real = f64;
pub type Vecd = DVec3;
pub type Matd = DMat3;

/// sqrt(2/3), the J2 yield-surface radius factor.
pub const SQRT_2_OVER_3: Real = 0.816_496_580_927_726;

/// Smallest determinant treated as a regular deformation state.
pub const TINY_REAL: Real = 1.0e-15;

#[inline]
pub fn trace(m: &Matd) -> Real {
    m.x_axis.x + m.y_axis.y + m.z_axis.z
}

/// Frobenius inner product `A : B`.
#[inline]
pub fn double_dot(a: &Matd, b: &Matd) -> Real {
    a.x_axis.dot(b.x_axis) + a.y_axis.dot(b.y_axis) + a.z_axis.dot(b.z_axis)
}

#[inline]
pub fn frobenius_norm(m: &Matd) -> Real {
    double_dot(m, m).sqrt()
}

/// Outer product `a ⊗ b`, element (row i, col j) = a_i * b_j.
#[inline]
pub fn outer(a: Vecd, b: Vecd) -> Matd {
    Matd::from_cols(a * b.x, a * b.y, a * b.z)
}

/// Deviatoric part `m - tr(m)/3 I`.
#[inline]
pub fn deviatoric(m: &Matd) -> Matd {
    *m - Matd::IDENTITY * (trace(m) / 3.0)
}
