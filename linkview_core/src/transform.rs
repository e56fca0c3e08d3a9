// Copyright 2026 the Linkview Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Column-major 4×4 transforms and their decomposition.
//!
//! [`Transform3d`] covers the subset of affine operations the link engine
//! needs (identity, multiply, column access, point mapping). Transform nodes
//! in the scene graph do not store matrices; they store [`TransformParts`]
//! (translation, rotation, scale), and [`TransformParts::decompose`] turns an
//! arbitrary affine matrix into that form.

use core::ops::Mul;
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

/// Squared column norms closer than this to one are treated as unit scale.
pub const UNIT_SCALE_EPSILON: f64 = 1e-10;

/// A column-major 4×4 affine transform stored as `[[f64; 4]; 4]`.
///
/// Each inner array is one *column* of the matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform3d {
    /// Four columns, each a 4-element array `[x, y, z, w]`.
    pub cols: [[f64; 4]; 4],
}

impl Transform3d {
    /// The 4×4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Creates a transform from four column arrays.
    #[inline]
    #[must_use]
    pub const fn from_cols(col0: [f64; 4], col1: [f64; 4], col2: [f64; 4], col3: [f64; 4]) -> Self {
        Self {
            cols: [col0, col1, col2, col3],
        }
    }

    /// Returns column `i` (0-based).
    ///
    /// # Panics
    ///
    /// Panics if `i >= 4`.
    #[inline]
    #[must_use]
    pub const fn col(self, i: usize) -> [f64; 4] {
        self.cols[i]
    }

    /// Creates a pure translation transform.
    #[inline]
    #[must_use]
    pub const fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [x, y, z, 1.0],
            ],
        }
    }

    /// Creates a non-uniform scale transform.
    #[inline]
    #[must_use]
    pub const fn from_scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self {
            cols: [
                [sx, 0.0, 0.0, 0.0],
                [0.0, sy, 0.0, 0.0],
                [0.0, 0.0, sz, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation-only transform.
    #[must_use]
    pub fn from_rotation(rotation: Rotation) -> Self {
        let [x, y, z, w] = rotation.quat;
        let (xx, yy, zz) = (x * x, y * y, z * z);
        let (xy, xz, yz) = (x * y, x * z, y * z);
        let (wx, wy, wz) = (w * x, w * y, w * z);
        Self {
            cols: [
                [1.0 - 2.0 * (yy + zz), 2.0 * (xy + wz), 2.0 * (xz - wy), 0.0],
                [2.0 * (xy - wz), 1.0 - 2.0 * (xx + zz), 2.0 * (yz + wx), 0.0],
                [2.0 * (xz + wy), 2.0 * (yz - wx), 1.0 - 2.0 * (xx + yy), 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Returns the translation part (column 3).
    #[inline]
    #[must_use]
    pub const fn translation(self) -> [f64; 3] {
        [self.cols[3][0], self.cols[3][1], self.cols[3][2]]
    }

    /// Maps a point through this transform (w = 1).
    #[must_use]
    pub fn transform_point(self, p: [f64; 3]) -> [f64; 3] {
        let c = &self.cols;
        let mut out = [0.0_f64; 3];
        for (i, o) in out.iter_mut().enumerate() {
            *o = c[0][i] * p[0] + c[1][i] * p[1] + c[2][i] * p[2] + c[3][i];
        }
        out
    }

    /// Returns whether every entry is within `eps` of the other transform.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, eps: f64) -> bool {
        self.cols
            .iter()
            .flatten()
            .zip(other.cols.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= eps)
    }

    /// Is this transform [finite]?
    ///
    /// [finite]: f64::is_finite
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.cols.iter().flatten().all(|v| v.is_finite())
    }
}

impl Default for Transform3d {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Transform3d {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let a = &self.cols;
        let b = &rhs.cols;
        let mut out = [[0.0_f64; 4]; 4];
        let mut j = 0;
        while j < 4 {
            let mut i = 0;
            while i < 4 {
                out[j][i] =
                    a[0][i] * b[j][0] + a[1][i] * b[j][1] + a[2][i] * b[j][2] + a[3][i] * b[j][3];
                i += 1;
            }
            j += 1;
        }
        Self { cols: out }
    }
}

/// A unit quaternion `[x, y, z, w]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rotation {
    /// Quaternion components, vector part first.
    pub quat: [f64; 4],
}

impl Rotation {
    /// The identity rotation.
    pub const IDENTITY: Self = Self {
        quat: [0.0, 0.0, 0.0, 1.0],
    };

    /// Creates a rotation of `radians` around `axis` (need not be normalized).
    #[must_use]
    pub fn from_axis_angle(axis: [f64; 3], radians: f64) -> Self {
        let len = (axis[0] * axis[0] + axis[1] * axis[1] + axis[2] * axis[2]).sqrt();
        if len == 0.0 {
            return Self::IDENTITY;
        }
        let half = radians * 0.5;
        #[cfg(feature = "std")]
        let (s, c) = half.sin_cos();
        #[cfg(not(feature = "std"))]
        let (s, c) = (half.sin(), half.cos());
        let k = s / len;
        Self {
            quat: [axis[0] * k, axis[1] * k, axis[2] * k, c],
        }
    }

    /// Fits a rotation to the upper 3×3 block of `m`, which must already be
    /// orthonormal up to floating noise.
    ///
    /// Uses Shepperd's method, choosing the numerically largest component
    /// first.
    #[must_use]
    pub fn from_matrix(m: &Transform3d) -> Self {
        let c = &m.cols;
        let (m00, m11, m22) = (c[0][0], c[1][1], c[2][2]);
        let (m01, m02) = (c[1][0], c[2][0]);
        let (m10, m12) = (c[0][1], c[2][1]);
        let (m20, m21) = (c[0][2], c[1][2]);
        let trace = m00 + m11 + m22;
        let quat = if trace > 0.0 {
            let s = (trace + 1.0).sqrt() * 2.0;
            [(m21 - m12) / s, (m02 - m20) / s, (m10 - m01) / s, 0.25 * s]
        } else if m00 > m11 && m00 > m22 {
            let s = (1.0 + m00 - m11 - m22).sqrt() * 2.0;
            [0.25 * s, (m01 + m10) / s, (m02 + m20) / s, (m21 - m12) / s]
        } else if m11 > m22 {
            let s = (1.0 + m11 - m00 - m22).sqrt() * 2.0;
            [(m01 + m10) / s, 0.25 * s, (m12 + m21) / s, (m02 - m20) / s]
        } else {
            let s = (1.0 + m22 - m00 - m11).sqrt() * 2.0;
            [(m02 + m20) / s, (m12 + m21) / s, 0.25 * s, (m10 - m01) / s]
        };
        Self { quat }.normalized()
    }

    /// Returns this quaternion scaled to unit length.
    #[must_use]
    pub fn normalized(self) -> Self {
        let [x, y, z, w] = self.quat;
        let len = (x * x + y * y + z * z + w * w).sqrt();
        if len == 0.0 {
            return Self::IDENTITY;
        }
        Self {
            quat: [x / len, y / len, z / len, w / len],
        }
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// The translation/rotation/scale triple held by a transform node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformParts {
    /// Translation applied last.
    pub translation: [f64; 3],
    /// Rotation applied after scaling.
    pub rotation: Rotation,
    /// Per-axis scale factors, never negative.
    pub scale: [f64; 3],
}

impl Default for TransformParts {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl TransformParts {
    /// No translation, no rotation, unit scale.
    pub const IDENTITY: Self = Self {
        translation: [0.0; 3],
        rotation: Rotation::IDENTITY,
        scale: [1.0; 3],
    };

    /// Splits an affine matrix into translation, rotation and scale.
    ///
    /// Scale factors are the norms of the first three columns. Columns whose
    /// squared norm is within [`UNIT_SCALE_EPSILON`] of one keep a scale of
    /// exactly `1.0` and are not renormalized. Negative scale (mirroring) is
    /// not recovered; the fitted rotation is then only approximate.
    #[must_use]
    pub fn decompose(mat: &Transform3d) -> Self {
        let mut rot = Transform3d::IDENTITY;
        let mut scale = [1.0; 3];
        for (axis, factor) in scale.iter_mut().enumerate() {
            let col = mat.cols[axis];
            let sqr = col[0] * col[0] + col[1] * col[1] + col[2] * col[2];
            if (sqr - 1.0).abs() >= UNIT_SCALE_EPSILON && sqr > 0.0 {
                *factor = sqr.sqrt();
                for row in 0..3 {
                    rot.cols[axis][row] = col[row] / *factor;
                }
            } else {
                if sqr == 0.0 {
                    *factor = 0.0;
                }
                rot.cols[axis][..3].copy_from_slice(&col[..3]);
            }
        }
        Self {
            translation: mat.translation(),
            rotation: Rotation::from_matrix(&rot),
            scale,
        }
    }

    /// Recomposes `T * R * S`.
    #[must_use]
    pub fn to_matrix(&self) -> Transform3d {
        let [tx, ty, tz] = self.translation;
        let [sx, sy, sz] = self.scale;
        Transform3d::from_translation(tx, ty, tz)
            * Transform3d::from_rotation(self.rotation)
            * Transform3d::from_scale(sx, sy, sz)
    }
}
