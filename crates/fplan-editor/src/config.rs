//! 编辑器配置

use serde::{Deserialize, Serialize};

/// 编辑器配置
///
/// 屏幕坐标（像素）只用于交互放置，持久化数据一律是米。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// 每米对应的像素数
    pub pixels_per_meter: f64,
    /// 网格尺寸（像素）
    pub grid_size_px: f64,
    /// 是否启用网格捕捉
    pub grid_snap: bool,
    /// 撤销历史上限
    pub history_limit: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            pixels_per_meter: 50.0,
            grid_size_px: 25.0,
            grid_snap: true,
            history_limit: 100,
        }
    }
}

impl EditorConfig {
    pub fn to_pixels(&self, meters: f64) -> f64 {
        meters * self.pixels_per_meter
    }

    pub fn to_meters(&self, pixels: f64) -> f64 {
        pixels / self.pixels_per_meter
    }
}
