use egui::{Pos2, Vec2};
use serde::{Deserialize, Serialize};

/// Scale magnitudes are never allowed to collapse below this.
pub const MIN_SCALE: f32 = 0.01;

pub type Matrix = [[f32; 3]; 3];

/// Placement of a scene object on the canvas.
///
/// Objects are center-anchored: `position` is where the center of the
/// object's local bounds lands in viewport coordinates, and scale and
/// rotation pivot around that center.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Transform {
    /// Center of the object in logical viewport units
    pub position: Vec2,
    /// Scale factor per axis (1.0 = intrinsic size)
    pub scale: Vec2,
    /// Rotation in radians. Positive values turn clockwise since y points down.
    pub rotation: f32,
}

impl Default for Transform {
    fn default() -> Self {
        const DEFAULT_TRANSFORM: Transform = Transform {
            position: Vec2::ZERO,
            scale: Vec2::new(1.0, 1.0),
            rotation: 0.0,
        };
        DEFAULT_TRANSFORM
    }
}

impl Transform {
    /// Creates a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec2::splat(scale);
        self
    }

    /// Maps object-local coordinates (origin at the object center) to viewport coordinates.
    pub fn to_matrix(&self) -> Matrix {
        let cos = self.rotation.cos();
        let sin = self.rotation.sin();

        let scale = [
            [self.scale.x, 0.0, 0.0],
            [0.0, self.scale.y, 0.0],
            [0.0, 0.0, 1.0],
        ];
        let rotate = [[cos, -sin, 0.0], [sin, cos, 0.0], [0.0, 0.0, 1.0]];
        let translate = [
            [1.0, 0.0, self.position.x],
            [0.0, 1.0, self.position.y],
            [0.0, 0.0, 1.0],
        ];

        multiply_matrices(&translate, &multiply_matrices(&rotate, &scale))
    }

    /// Maps viewport coordinates back into object-local coordinates.
    ///
    /// Returns `None` when the scale is degenerate.
    pub fn inverse_matrix(&self) -> Option<Matrix> {
        if self.scale.x.abs() < f32::EPSILON || self.scale.y.abs() < f32::EPSILON {
            return None;
        }
        let cos = self.rotation.cos();
        let sin = self.rotation.sin();

        let translate = [
            [1.0, 0.0, -self.position.x],
            [0.0, 1.0, -self.position.y],
            [0.0, 0.0, 1.0],
        ];
        // Transpose of the rotation
        let rotate = [[cos, sin, 0.0], [-sin, cos, 0.0], [0.0, 0.0, 1.0]];
        let scale = [
            [1.0 / self.scale.x, 0.0, 0.0],
            [0.0, 1.0 / self.scale.y, 0.0],
            [0.0, 0.0, 1.0],
        ];

        Some(multiply_matrices(&scale, &multiply_matrices(&rotate, &translate)))
    }

    /// Applies a relative change: translation adds, scale multiplies, rotation adds.
    pub fn apply(&mut self, delta: &TransformDelta) {
        self.position += delta.translation;
        self.scale = Vec2::new(
            clamp_scale(self.scale.x * delta.scale.x),
            clamp_scale(self.scale.y * delta.scale.y),
        );
        self.rotation = (self.rotation + delta.rotation) % std::f32::consts::TAU;
    }
}

fn clamp_scale(value: f32) -> f32 {
    if value.abs() < MIN_SCALE {
        MIN_SCALE.copysign(value)
    } else {
        value
    }
}

/// A relative change to an object's [`Transform`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformDelta {
    pub translation: Vec2,
    pub scale: Vec2,
    pub rotation: f32,
}

impl Default for TransformDelta {
    fn default() -> Self {
        Self {
            translation: Vec2::ZERO,
            scale: Vec2::new(1.0, 1.0),
            rotation: 0.0,
        }
    }
}

impl TransformDelta {
    pub fn translate(translation: Vec2) -> Self {
        Self {
            translation,
            ..Self::default()
        }
    }

    pub fn scale_by(factor: f32) -> Self {
        Self {
            scale: Vec2::splat(factor),
            ..Self::default()
        }
    }

    pub fn rotate_by(radians: f32) -> Self {
        Self {
            rotation: radians,
            ..Self::default()
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

const fn const_multiply_matrices(a: &Matrix, b: &Matrix) -> Matrix {
    let mut result = [[0.0; 3]; 3];
    let mut i = 0;
    while i < 3 {
        let mut j = 0;
        while j < 3 {
            let mut k = 0;
            while k < 3 {
                result[i][j] += a[i][k] * b[k][j];
                k += 1;
            }
            j += 1;
        }
        i += 1;
    }
    result
}

pub fn multiply_matrices(a: &Matrix, b: &Matrix) -> Matrix {
    const_multiply_matrices(a, b)
}

pub fn transform_point(m: &Matrix, point: Pos2) -> Pos2 {
    Pos2::new(
        m[0][0] * point.x + m[0][1] * point.y + m[0][2],
        m[1][0] * point.x + m[1][1] * point.y + m[1][2],
    )
}
