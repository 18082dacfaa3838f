//! 实体外观
//!
//! 外观只是交给渲染方的纯数据，编辑器在选中时替换、取消选中时恢复。

use serde::{Deserialize, Serialize};

/// RGB 颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const GRAY: Color = Color::new(128, 128, 128);
    pub const STEEL: Color = Color::new(70, 110, 160);
    pub const WOOD: Color = Color::new(176, 132, 84);
    pub const HIGHLIGHT: Color = Color::new(255, 170, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn from_hex(hex: u32) -> Self {
        Self::new(((hex >> 16) & 0xFF) as u8, ((hex >> 8) & 0xFF) as u8, (hex & 0xFF) as u8)
    }

    pub fn to_hex(self) -> u32 {
        (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }
}

/// 实体外观
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Appearance {
    pub fill: Color,
    pub stroke: Color,
    pub stroke_width: f64,
    pub opacity: f64,
}

impl Appearance {
    /// 选中高亮（固定样式）
    pub const fn highlight() -> Self {
        Self {
            fill: Color::HIGHLIGHT,
            stroke: Color::HIGHLIGHT,
            stroke_width: 3.0,
            opacity: 0.9,
        }
    }

    pub const fn equipment() -> Self {
        Self {
            fill: Color::STEEL,
            stroke: Color::BLACK,
            stroke_width: 1.0,
            opacity: 1.0,
        }
    }

    pub const fn wall() -> Self {
        Self {
            fill: Color::GRAY,
            stroke: Color::BLACK,
            stroke_width: 1.0,
            opacity: 1.0,
        }
    }

    pub const fn component() -> Self {
        Self {
            fill: Color::WOOD,
            stroke: Color::BLACK,
            stroke_width: 1.0,
            opacity: 0.85,
        }
    }

    pub fn with_fill(mut self, fill: Color) -> Self {
        self.fill = fill;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        let c = Color::from_hex(0xFFAA00);
        assert_eq!(c, Color::HIGHLIGHT);
        assert_eq!(c.to_hex(), 0xFFAA00);
    }

    #[test]
    fn test_highlight_differs_from_defaults() {
        assert_ne!(Appearance::highlight(), Appearance::equipment());
        assert_ne!(Appearance::highlight(), Appearance::wall());
        assert_ne!(Appearance::highlight(), Appearance::component());
    }
}
