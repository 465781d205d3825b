use std::fmt;

use crate::BLOCK_TEXELS;

/// Painting dimensions in world blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PaintingSize {
    pub width: u32,
    pub height: u32,
}

impl PaintingSize {
    /// Returns `None` unless both sides are at least one block and fit in `u32` texels.
    pub const fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        if width.checked_mul(BLOCK_TEXELS).is_none() || height.checked_mul(BLOCK_TEXELS).is_none() {
            return None;
        }
        Some(Self { width, height })
    }

    pub const fn pixels_x(self) -> u32 {
        self.width * BLOCK_TEXELS
    }

    pub const fn pixels_y(self) -> u32 {
        self.height * BLOCK_TEXELS
    }
}

impl fmt::Display for PaintingSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
