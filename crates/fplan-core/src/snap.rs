//! 网格捕捉
//!
//! 交互放置时把位置舍入到最近的网格点。网格尺寸可以是固定值，
//! 也可以由随缩放变化的提供者动态给出。

use crate::math::Point2;
use serde::{Deserialize, Serialize};

/// 网格尺寸提供者
pub trait GridSizeProvider {
    /// 当前网格尺寸（与被捕捉坐标同一单位）
    fn grid_size(&self) -> f64;
}

impl GridSizeProvider for f64 {
    fn grid_size(&self) -> f64 {
        *self
    }
}

/// 四舍五入到 `grid` 的整数倍（.5 向上取整）
///
/// 网格尺寸非正或非有限时原样返回。
pub fn snap_value(value: f64, grid: f64) -> f64 {
    if !(grid > 0.0) || !grid.is_finite() {
        return value;
    }
    (value / grid + 0.5).floor() * grid
}

/// 固定网格捕捉配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSnap {
    pub enabled: bool,
    pub grid_size: f64,
}

impl Default for GridSnap {
    fn default() -> Self {
        Self {
            enabled: true,
            grid_size: 25.0,
        }
    }
}

impl GridSnap {
    pub fn new(grid_size: f64) -> Self {
        Self {
            enabled: true,
            grid_size,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// 使用给定的网格尺寸捕捉（未启用时原样返回）
    pub fn snap_with(&self, point: Point2, grid: f64) -> Point2 {
        if !self.enabled {
            return point;
        }
        Point2::new(snap_value(point.x, grid), snap_value(point.y, grid))
    }

    pub fn snap(&self, point: Point2) -> Point2 {
        self.snap_with(point, self.grid_size)
    }
}

impl GridSizeProvider for GridSnap {
    fn grid_size(&self) -> f64 {
        self.grid_size
    }
}

/// 随缩放自适应的网格
///
/// 缩放每翻一倍网格减半，每缩小一半网格加倍，限制在 `[base/8, base*8]`。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomAwareGrid {
    pub base_size: f64,
    pub zoom: f64,
}

impl ZoomAwareGrid {
    const MAX_STEPS: i32 = 3;

    pub fn new(base_size: f64) -> Self {
        Self {
            base_size,
            zoom: 1.0,
        }
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom > 0.0 && zoom.is_finite() {
            self.zoom = zoom;
        }
    }
}

impl GridSizeProvider for ZoomAwareGrid {
    fn grid_size(&self) -> f64 {
        let steps = (self.zoom.log2().round() as i32).clamp(-Self::MAX_STEPS, Self::MAX_STEPS);
        self.base_size / 2f64.powi(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_value_round_half_up() {
        assert_eq!(snap_value(12.0, 25.0), 0.0);
        assert_eq!(snap_value(12.5, 25.0), 25.0);
        assert_eq!(snap_value(37.4, 25.0), 25.0);
        assert_eq!(snap_value(-12.5, 25.0), 0.0);
        assert_eq!(snap_value(-12.6, 25.0), -25.0);
    }

    #[test]
    fn test_snap_value_invalid_grid() {
        assert_eq!(snap_value(13.3, 0.0), 13.3);
        assert_eq!(snap_value(13.3, -5.0), 13.3);
        assert_eq!(snap_value(13.3, f64::NAN), 13.3);
    }

    #[test]
    fn test_grid_snap_disabled() {
        let snap = GridSnap::disabled();
        let p = Point2::new(13.0, 41.0);
        assert_eq!(snap.snap(p), p);
    }

    #[test]
    fn test_grid_snap_point() {
        let snap = GridSnap::new(10.0);
        assert_eq!(snap.snap(Point2::new(14.9, 15.0)), Point2::new(10.0, 20.0));
    }

    #[test]
    fn test_zoom_aware_grid() {
        let mut grid = ZoomAwareGrid::new(40.0);
        assert_eq!(grid.grid_size(), 40.0);
        grid.set_zoom(2.0);
        assert_eq!(grid.grid_size(), 20.0);
        grid.set_zoom(0.5);
        assert_eq!(grid.grid_size(), 80.0);
        grid.set_zoom(1000.0);
        assert_eq!(grid.grid_size(), 5.0);
        grid.set_zoom(-1.0);
        assert_eq!(grid.zoom, 1000.0);
    }
}
