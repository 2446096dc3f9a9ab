//! Shelf layout for sprite sheets.
//!
//! Images are stacked along one axis in input order. The sheet is as long as
//! the sum of the images along that axis and as wide as the widest image
//! across it. Every image sits at cross-axis offset 0.

use std::fmt;

/// Stacking axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    #[default]
    Vertical,
    Horizontal,
}

impl Layout {
    /// Parse a `$layout` argument value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "vertical" => Some(Layout::Vertical),
            "horizontal" => Some(Layout::Horizontal),
            _ => None,
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::Vertical => f.write_str("vertical"),
            Layout::Horizontal => f.write_str("horizontal"),
        }
    }
}

/// Where one image lands on the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Result of laying out a list of images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packed {
    pub placements: Vec<Placement>,
    pub width: u32,
    pub height: u32,
    pub layout: Layout,
}

impl Packed {
    /// Offset just past the last image on the stacking axis.
    pub fn end(&self) -> (u32, u32) {
        match self.layout {
            Layout::Vertical => (0, self.height),
            Layout::Horizontal => (self.width, 0),
        }
    }
}

/// Lay out images of the given `(width, height)` sizes.
pub fn pack(sizes: &[(u32, u32)], layout: Layout) -> Packed {
    let mut placements = Vec::with_capacity(sizes.len());
    let mut offset: u32 = 0;
    let mut cross: u32 = 0;

    for &(width, height) in sizes {
        let (x, y, along, across) = match layout {
            Layout::Vertical => (0, offset, height, width),
            Layout::Horizontal => (offset, 0, width, height),
        };
        placements.push(Placement { x, y, width, height });
        offset += along;
        cross = cross.max(across);
    }

    let (width, height) = match layout {
        Layout::Vertical => (cross, offset),
        Layout::Horizontal => (offset, cross),
    };

    Packed {
        placements,
        width,
        height,
        layout,
    }
}
