use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

pub type Result<T> = std::result::Result<T, crate::error::SchemError>;

/// Integer block coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const ORIGIN: BlockPos = BlockPos { x: 0, y: 0, z: 0 };

    pub fn new(x: i32, y: i32, z: i32) -> Self {
        BlockPos { x, y, z }
    }

    /// Builds a position from a three element slice, as stored in `Pos`/`Offset` int arrays
    pub fn from_slice(values: &[i32]) -> Option<Self> {
        match values {
            [x, y, z] => Some(BlockPos::new(*x, *y, *z)),
            _ => None,
        }
    }

    pub fn to_array(self) -> [i32; 3] {
        [self.x, self.y, self.z]
    }

    pub fn min(self, other: BlockPos) -> BlockPos {
        BlockPos::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    pub fn max(self, other: BlockPos) -> BlockPos {
        BlockPos::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }
}

impl Add for BlockPos {
    type Output = BlockPos;

    fn add(self, rhs: BlockPos) -> BlockPos {
        BlockPos::new(
            self.x.wrapping_add(rhs.x),
            self.y.wrapping_add(rhs.y),
            self.z.wrapping_add(rhs.z),
        )
    }
}

impl Sub for BlockPos {
    type Output = BlockPos;

    fn sub(self, rhs: BlockPos) -> BlockPos {
        BlockPos::new(
            self.x.wrapping_sub(rhs.x),
            self.y.wrapping_sub(rhs.y),
            self.z.wrapping_sub(rhs.z),
        )
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Fractional position, used for entities
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Vec3 { x, y, z }
    }

    pub fn offset(self, by: BlockPos) -> Vec3 {
        Vec3::new(
            self.x + by.x as f64,
            self.y + by.y as f64,
            self.z + by.z as f64,
        )
    }
}

/// Extent of a box of blocks along x (width), y (height) and z (length)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
    pub length: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32, length: u32) -> Self {
        Dimensions {
            width,
            height,
            length,
        }
    }

    pub fn volume(&self) -> usize {
        self.width as usize * self.height as usize * self.length as usize
    }

    /// Volume for sizes read from untrusted input; `None` when it does not fit a usize
    pub fn checked_volume(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(self.length as usize)
    }

    /// Number of cells in one horizontal layer
    pub fn area(&self) -> usize {
        self.width as usize * self.length as usize
    }

    pub fn contains(&self, x: i32, y: i32, z: i32) -> bool {
        x >= 0
            && y >= 0
            && z >= 0
            && (x as u32) < self.width
            && (y as u32) < self.height
            && (z as u32) < self.length
    }

    /// Linear index of a local coordinate, `x + z*width + y*width*length`
    pub fn index(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        if !self.contains(x, y, z) {
            return None;
        }
        Some(x as usize + z as usize * self.width as usize + y as usize * self.area())
    }

    pub fn coords(&self, index: usize) -> (i32, i32, i32) {
        let area = self.area().max(1);
        let width = (self.width as usize).max(1);
        let y = index / area;
        let rest = index % area;
        ((rest % width) as i32, y as i32, (rest / width) as i32)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_layout_is_x_then_z_then_y() {
        let dims = Dimensions::new(3, 2, 4);
        assert_eq!(dims.index(0, 0, 0), Some(0));
        assert_eq!(dims.index(1, 0, 0), Some(1));
        assert_eq!(dims.index(0, 0, 1), Some(3));
        assert_eq!(dims.index(0, 1, 0), Some(12));
        assert_eq!(dims.index(2, 1, 3), Some(2 + 3 * 3 + 12));
        assert_eq!(dims.index(3, 0, 0), None);
        assert_eq!(dims.index(-1, 0, 0), None);
    }

    #[test]
    fn test_coords_inverts_index() {
        let dims = Dimensions::new(5, 3, 7);
        for i in 0..dims.volume() {
            let (x, y, z) = dims.coords(i);
            assert_eq!(dims.index(x, y, z), Some(i));
        }
    }

    #[test]
    fn test_checked_volume_overflow() {
        assert_eq!(Dimensions::new(2, 3, 4).checked_volume(), Some(24));
        assert_eq!(Dimensions::new(u32::MAX, u32::MAX, u32::MAX).checked_volume(), None);
    }

    #[test]
    fn test_block_pos_helpers() {
        assert_eq!(BlockPos::from_slice(&[1, 2, 3]), Some(BlockPos::new(1, 2, 3)));
        assert_eq!(BlockPos::from_slice(&[1, 2]), None);
        let a = BlockPos::new(1, -5, 3);
        let b = BlockPos::new(-2, 4, 3);
        assert_eq!(a.min(b), BlockPos::new(-2, -5, 3));
        assert_eq!(a.max(b), BlockPos::new(1, 4, 3));
        assert_eq!(a - b, BlockPos::new(3, -9, 0));
    }
}
