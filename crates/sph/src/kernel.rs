//! Wendland C2 smoothing kernel with compact support 2h.
//!
//! Shape functions of the normalized distance `q = r / h`:
//!
//! ```text
//! 1D:     W = (1 - q/2)^3 (1 + 3q/2)   dW = -3q (1 - q/2)^2   d2W = 3 (1 - q/2)(3q/2 - 1)
//! 2D, 3D: W = (1 - q/2)^4 (1 + 2q)     dW = -5q (1 - q/2)^3   d2W = 5 (1 - q/2)^2 (2q - 1)
//! ```
//!
//! Normalization (Dehnen & Aly 2012, support radius 2h):
//! `5 / (8h)` in 1D, `7 / (4 pi h^2)` in 2D, `21 / (16 pi h^3)` in 3D.
//!
//! The `*_1d/2d/3d(q)` functions return the normalized value and the
//! normalized q-derivatives. A derivative with respect to distance needs one
//! extra `1/h` per order, which [`Kernel::dw`] and [`Kernel::d2w`] apply.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::{SphError, SphResult};
use crate::math::Real;

/// Compact support in units of h.
pub const KERNEL_SIZE: Real = 2.0;

/// Spatial dimension of a body; selects the kernel normalization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum Dimension {
    One,
    Two,
    Three,
}

impl Dimension {
    #[inline]
    pub fn value(self) -> usize {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
        }
    }

    #[inline]
    pub fn as_real(self) -> Real {
        self.value() as Real
    }
}

impl TryFrom<usize> for Dimension {
    type Error = SphError;

    fn try_from(value: usize) -> SphResult<Self> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            3 => Ok(Self::Three),
            other => Err(SphError::Configuration(format!(
                "dimension must be 1, 2 or 3, got {other}"
            ))),
        }
    }
}

impl From<Dimension> for usize {
    fn from(dimension: Dimension) -> Self {
        dimension.value()
    }
}

/// Wendland C2 kernel for a fixed reference smoothing length.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Kernel {
    h: Real,
    inv_h: Real,
    factor_w_1d: Real,
    factor_w_2d: Real,
    factor_w_3d: Real,
}

impl Kernel {
    /// Rejects non-positive or non-finite smoothing lengths.
    pub fn new(h: Real) -> SphResult<Self> {
        if !(h.is_finite() && h > 0.0) {
            return Err(SphError::Configuration(format!(
                "smoothing length must be positive and finite, got {h}"
            )));
        }
        let inv_h = 1.0 / h;
        Ok(Self {
            h,
            inv_h,
            factor_w_1d: inv_h * 5.0 / 8.0,
            factor_w_2d: inv_h * inv_h * 7.0 / (4.0 * PI),
            factor_w_3d: inv_h * inv_h * inv_h * 21.0 / (16.0 * PI),
        })
    }

    #[inline]
    pub fn smoothing_length(&self) -> Real {
        self.h
    }

    /// Radius beyond which every kernel quantity vanishes (2h).
    #[inline]
    pub fn cutoff_radius(&self) -> Real {
        KERNEL_SIZE * self.h
    }

    #[inline]
    pub fn factor_w(&self, dimension: Dimension) -> Real {
        match dimension {
            Dimension::One => self.factor_w_1d,
            Dimension::Two => self.factor_w_2d,
            Dimension::Three => self.factor_w_3d,
        }
    }

    pub fn w_1d(&self, q: Real) -> Real {
        if q >= KERNEL_SIZE {
            return 0.0;
        }
        let t = 1.0 - 0.5 * q;
        self.factor_w_1d * t * t * t * (1.0 + 1.5 * q)
    }

    pub fn w_2d(&self, q: Real) -> Real {
        self.factor_w_2d * shape_w(q)
    }

    pub fn w_3d(&self, q: Real) -> Real {
        self.factor_w_3d * shape_w(q)
    }

    pub fn dw_1d(&self, q: Real) -> Real {
        if q >= KERNEL_SIZE {
            return 0.0;
        }
        let t = 1.0 - 0.5 * q;
        self.factor_w_1d * (-3.0 * q) * t * t
    }

    pub fn dw_2d(&self, q: Real) -> Real {
        self.factor_w_2d * shape_dw(q)
    }

    pub fn dw_3d(&self, q: Real) -> Real {
        self.factor_w_3d * shape_dw(q)
    }

    pub fn d2w_1d(&self, q: Real) -> Real {
        if q >= KERNEL_SIZE {
            return 0.0;
        }
        let t = 1.0 - 0.5 * q;
        self.factor_w_1d * 3.0 * t * (1.5 * q - 1.0)
    }

    pub fn d2w_2d(&self, q: Real) -> Real {
        self.factor_w_2d * shape_d2w(q)
    }

    pub fn d2w_3d(&self, q: Real) -> Real {
        self.factor_w_3d * shape_d2w(q)
    }

    /// Normalized value at normalized distance `q`.
    #[inline]
    pub fn w_q(&self, dimension: Dimension, q: Real) -> Real {
        match dimension {
            Dimension::One => self.w_1d(q),
            Dimension::Two => self.w_2d(q),
            Dimension::Three => self.w_3d(q),
        }
    }

    /// Normalized first q-derivative at normalized distance `q`.
    #[inline]
    pub fn dw_q(&self, dimension: Dimension, q: Real) -> Real {
        match dimension {
            Dimension::One => self.dw_1d(q),
            Dimension::Two => self.dw_2d(q),
            Dimension::Three => self.dw_3d(q),
        }
    }

    /// Normalized second q-derivative at normalized distance `q`.
    #[inline]
    pub fn d2w_q(&self, dimension: Dimension, q: Real) -> Real {
        match dimension {
            Dimension::One => self.d2w_1d(q),
            Dimension::Two => self.d2w_2d(q),
            Dimension::Three => self.d2w_3d(q),
        }
    }

    /// Kernel value at distance `r`.
    #[inline]
    pub fn w(&self, dimension: Dimension, r: Real) -> Real {
        self.w_q(dimension, r * self.inv_h)
    }

    /// dW/dr at distance `r`. Non-positive inside the support.
    #[inline]
    pub fn dw(&self, dimension: Dimension, r: Real) -> Real {
        self.dw_q(dimension, r * self.inv_h) * self.inv_h
    }

    /// d2W/dr2 at distance `r`.
    #[inline]
    pub fn d2w(&self, dimension: Dimension, r: Real) -> Real {
        self.d2w_q(dimension, r * self.inv_h) * self.inv_h * self.inv_h
    }
}

#[inline]
fn shape_w(q: Real) -> Real {
    if q >= KERNEL_SIZE {
        return 0.0;
    }
    let t = 1.0 - 0.5 * q;
    let t2 = t * t;
    t2 * t2 * (1.0 + 2.0 * q)
}

#[inline]
fn shape_dw(q: Real) -> Real {
    if q >= KERNEL_SIZE {
        return 0.0;
    }
    let t = 1.0 - 0.5 * q;
    -5.0 * q * t * t * t
}

#[inline]
fn shape_d2w(q: Real) -> Real {
    if q >= KERNEL_SIZE {
        return 0.0;
    }
    let t = 1.0 - 0.5 * q;
    5.0 * t * t * (2.0 * q - 1.0)
}
