//! 数学基础类型
//!
//! 平面图使用俯视坐标：x 沿房间宽度方向，y（持久化格式中为 z）沿房间进深方向，
//! 原点位于房间左上角，单位为米。

use serde::{Deserialize, Serialize};

/// 二维点（计算用）
pub type Point2 = nalgebra::Point2<f64>;

/// 二维向量（计算用）
pub type Vector2 = nalgebra::Vector2<f64>;

/// 浮点比较容差
pub const EPSILON: f64 = 1e-6;

/// 可序列化的平面位置 `{x, y}`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn to_point2(self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

impl From<Point2> for Position {
    fn from(p: Point2) -> Self {
        Self::new(p.x, p.y)
    }
}

/// 轴对齐包围盒（AABB）
///
/// `top` 为较小的 y 值，`bottom = top + depth`。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    /// 由左上角和宽/深创建
    pub fn new(x: f64, y: f64, width: f64, depth: f64) -> Self {
        Self {
            left: x,
            top: y,
            right: x + width,
            bottom: y + depth,
        }
    }

    /// 由两个角点创建（自动规整方向）
    pub fn from_corners(a: Point2, b: Point2) -> Self {
        Self {
            left: a.x.min(b.x),
            top: a.y.min(b.y),
            right: a.x.max(b.x),
            bottom: a.y.max(b.y),
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn depth(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn center(&self) -> Point2 {
        Point2::new(
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }

    /// 向四周各扩张 `amount`
    pub fn inflate(&self, amount: f64) -> Self {
        Self {
            left: self.left - amount,
            top: self.top - amount,
            right: self.right + amount,
            bottom: self.bottom + amount,
        }
    }

    /// 带间隙的重叠判定
    ///
    /// 两个矩形之间的净距小于 `gap` 即视为重叠。仅当距离恰好等于 `gap`
    /// 时不算重叠，判定对 `self`/`other` 对称。
    pub fn overlaps_with_gap(&self, other: &Rect, gap: f64) -> bool {
        !(self.right + gap <= other.left
            || other.right + gap <= self.left
            || self.bottom + gap <= other.top
            || other.bottom + gap <= self.top)
    }

    /// 无间隙重叠（贴边不算重叠）
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.overlaps_with_gap(other, 0.0)
    }

    pub fn contains(&self, point: &Point2) -> bool {
        point.x >= self.left && point.x <= self.right && point.y >= self.top && point.y <= self.bottom
    }

    /// `other` 是否完全位于本矩形内
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.left >= self.left
            && other.right <= self.right
            && other.top >= self.top
            && other.bottom <= self.bottom
    }
}

/// 将角度（度）规整到 [0, 360)
pub fn normalize_degrees(angle: f64) -> f64 {
    let a = angle % 360.0;
    if a < 0.0 { a + 360.0 } else { a }
}

/// 角度是否为 90° 或 270°（在容差内）
pub fn is_quarter_turn(angle: f64) -> bool {
    let a = normalize_degrees(angle);
    (a - 90.0).abs() < EPSILON || (a - 270.0).abs() < EPSILON
}
