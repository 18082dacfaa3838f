//! 布局快照（持久化边界上的规范格式）
//!
//! 读取时兼容旧数据的两种墙体坐标写法：
//! - `{"start": {"x": 0, "z": 0}, "end": {"x": 5, "z": 0}}`
//! - `{"startX": 0, "startZ": 0, "endX": 5, "endZ": 0}`
//!
//! 以及房间的 `height`（等同于 `depth`）。写出时只使用规范格式。

use crate::array::expand_all;
use crate::model::{
    Component, Corridor, Equipment, EquipmentArray, FloorPoint, Office, Partition, Room, Wall,
    DEFAULT_WALL_HEIGHT, DEFAULT_WALL_THICKNESS,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 当前布局格式版本
pub const LAYOUT_VERSION: &str = "2.0";

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Wall '{0}' has neither start/end points nor startX/startZ/endX/endZ")]
    WallCoordinates(String),
}

/// 完整布局快照（米制）
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSnapshot {
    #[serde(rename = "site_id", default, skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<Room>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub walls: Option<Vec<Wall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_arrays: Option<Vec<EquipmentArray>>,
    /// 阵列已展开为 `equipment`；此时阵列只保留通道和排除位置信息
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub arrays_materialized: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub equipment: Vec<Equipment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corridors: Option<Vec<Corridor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub office: Option<Office>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partitions: Vec<Partition>,
    #[serde(rename = "layout_version", default, skip_serializing_if = "Option::is_none")]
    pub layout_version: Option<String>,
    #[serde(rename = "created_at", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updated_at", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl LayoutSnapshot {
    /// 创建只有房间的空布局
    pub fn new(site_id: impl Into<String>, room: Room) -> Self {
        Self {
            site_id: Some(site_id.into()),
            room: Some(room),
            walls: Some(Vec::new()),
            equipment_arrays: Some(Vec::new()),
            layout_version: Some(LAYOUT_VERSION.to_string()),
            ..Default::default()
        }
    }

    /// 从 JSON 文本读取并规范化
    pub fn from_json_str(json: &str) -> Result<Self, SnapshotError> {
        let mut snapshot: Self = serde_json::from_str(json)?;
        snapshot.normalize();
        Ok(snapshot)
    }

    /// 从 JSON 值读取并规范化
    pub fn from_json_value(value: serde_json::Value) -> Result<Self, SnapshotError> {
        let mut snapshot: Self = serde_json::from_value(value)?;
        snapshot.normalize();
        Ok(snapshot)
    }

    pub fn to_json_value(&self) -> Result<serde_json::Value, SnapshotError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_json_string_pretty(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 读取后的一次性规范化：补齐缺失的墙体 ID
    pub fn normalize(&mut self) {
        if let Some(walls) = &mut self.walls {
            for (i, wall) in walls.iter_mut().enumerate() {
                if wall.id.is_empty() {
                    wall.id = format!("wall-{}", i);
                }
            }
        }
    }

    pub fn walls(&self) -> &[Wall] {
        self.walls.as_deref().unwrap_or_default()
    }

    pub fn equipment_arrays(&self) -> &[EquipmentArray] {
        self.equipment_arrays.as_deref().unwrap_or_default()
    }

    /// 参与几何校验的设备实例
    ///
    /// 阵列已展开或有逐台设备时以 `equipment` 为准（反映了交互编辑后的结果），
    /// 否则展开全部阵列。
    pub fn equipment_instances(&self) -> Vec<Equipment> {
        if self.arrays_materialized || !self.equipment.is_empty() {
            self.equipment.clone()
        } else {
            expand_all(self.equipment_arrays())
        }
    }

    /// 设备来源数：阵列数与逐台设备数之和；阵列已展开时只计逐台设备
    pub fn equipment_source_count(&self) -> usize {
        if self.arrays_materialized {
            self.equipment.len()
        } else {
            self.equipment_arrays().len() + self.equipment.len()
        }
    }
}

/// 墙体的宽松读取形式
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawWall {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    start: Option<FloorPoint>,
    #[serde(default)]
    end: Option<FloorPoint>,
    #[serde(default)]
    start_x: Option<f64>,
    #[serde(default, alias = "startY")]
    start_z: Option<f64>,
    #[serde(default)]
    end_x: Option<f64>,
    #[serde(default, alias = "endY")]
    end_z: Option<f64>,
    #[serde(default)]
    thickness: Option<f64>,
    #[serde(default)]
    height: Option<f64>,
}

impl TryFrom<RawWall> for Wall {
    type Error = SnapshotError;

    fn try_from(raw: RawWall) -> Result<Self, Self::Error> {
        let id = raw.id.unwrap_or_default();
        let (start, end) = match (raw.start, raw.end) {
            (Some(start), Some(end)) => (start, end),
            _ => match (raw.start_x, raw.start_z, raw.end_x, raw.end_z) {
                (Some(sx), Some(sz), Some(ex), Some(ez)) => {
                    (FloorPoint::new(sx, sz), FloorPoint::new(ex, ez))
                }
                _ => return Err(SnapshotError::WallCoordinates(id)),
            },
        };

        Ok(Wall {
            id,
            start,
            end,
            thickness: raw.thickness.unwrap_or(DEFAULT_WALL_THICKNESS),
            height: raw.height.unwrap_or(DEFAULT_WALL_HEIGHT),
        })
    }
}
