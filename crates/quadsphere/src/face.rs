//! The six cube faces that root each terrain quadtree.

use glam::{Vec2, Vec3};

use crate::patch::Quad;

/// One face of the unit cube, named by its outward axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    NegativeX,
    NegativeY,
    NegativeZ,
    PositiveX,
    PositiveY,
    PositiveZ,
}

impl CubeFace {
    /// All faces in root order.
    pub const ALL: [CubeFace; 6] = [
        CubeFace::NegativeX,
        CubeFace::NegativeY,
        CubeFace::NegativeZ,
        CubeFace::PositiveX,
        CubeFace::PositiveY,
        CubeFace::PositiveZ,
    ];

    pub fn index(self) -> usize {
        match self {
            CubeFace::NegativeX => 0,
            CubeFace::NegativeY => 1,
            CubeFace::NegativeZ => 2,
            CubeFace::PositiveX => 3,
            CubeFace::PositiveY => 4,
            CubeFace::PositiveZ => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CubeFace::NegativeX => "Negative X",
            CubeFace::NegativeY => "Negative Y",
            CubeFace::NegativeZ => "Negative Z",
            CubeFace::PositiveX => "Positive X",
            CubeFace::PositiveY => "Positive Y",
            CubeFace::PositiveZ => "Positive Z",
        }
    }

    /// Outward normal, right and up axes. `right.cross(up) == normal` on every
    /// face so all patches share the same winding.
    pub fn axes(self) -> (Vec3, Vec3, Vec3) {
        match self {
            CubeFace::NegativeX => (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            CubeFace::NegativeY => (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            CubeFace::NegativeZ => (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
            CubeFace::PositiveX => (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            CubeFace::PositiveY => (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            CubeFace::PositiveZ => (Vec3::Z, Vec3::X, Vec3::Y),
        }
    }

    /// Undeformed corner points of the whole face on the unit cube.
    pub fn points(self) -> Quad<Vec3> {
        let (normal, right, up) = self.axes();
        Quad {
            bl: normal - right - up,
            br: normal + right - up,
            tl: normal - right + up,
            tr: normal + right + up,
        }
    }

    /// Texture coordinates of the whole face. U runs right to left so the
    /// texture reads correctly from outside the sphere.
    pub fn coords(self) -> Quad<Vec2> {
        Quad {
            bl: Vec2::new(1.0, 0.0),
            br: Vec2::new(0.0, 0.0),
            tl: Vec2::new(1.0, 1.0),
            tr: Vec2::new(0.0, 1.0),
        }
    }
}
