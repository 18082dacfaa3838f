//! 平面布局实体
//!
//! 所有实体都是与渲染后端无关的纯数据，单位为米。
//! 墙体与阵列起点使用 `{x, z}` 约定，单台设备与自由组件使用 `{x, y}` 约定，
//! 两者的第二分量含义相同（沿房间进深方向）。

use crate::math::{is_quarter_turn, Point2, Rect};
use serde::{Deserialize, Deserializer, Serialize};

/// 房间最小边长（米）
pub const MIN_ROOM_DIMENSION: f64 = 1.0;
/// 房间最大边长（米）
pub const MAX_ROOM_DIMENSION: f64 = 500.0;
/// 最低墙高（米）
pub const MIN_WALL_HEIGHT: f64 = 2.0;
/// 最高墙高（米）
pub const MAX_WALL_HEIGHT: f64 = 20.0;
/// 默认墙高（米）
pub const DEFAULT_WALL_HEIGHT: f64 = 3.0;
/// 默认墙厚（米）
pub const DEFAULT_WALL_THICKNESS: f64 = 0.2;

/// 地面坐标 `{x, z}`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FloorPoint {
    pub x: f64,
    #[serde(alias = "y")]
    pub z: f64,
}

impl FloorPoint {
    pub fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }

    pub fn to_point2(self) -> Point2 {
        Point2::new(self.x, self.z)
    }
}

/// 房间
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub width: f64,
    /// 旧数据中叫 `height`（俯视图中的“高”）
    #[serde(alias = "height")]
    pub depth: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wall_height: Option<f64>,
}

impl Room {
    pub fn new(width: f64, depth: f64) -> Self {
        Self {
            width,
            depth,
            wall_height: None,
        }
    }

    /// 创建并把尺寸钳制到允许范围
    pub fn clamped(width: f64, depth: f64, wall_height: Option<f64>) -> Self {
        Self {
            width: width.clamp(MIN_ROOM_DIMENSION, MAX_ROOM_DIMENSION),
            depth: depth.clamp(MIN_ROOM_DIMENSION, MAX_ROOM_DIMENSION),
            wall_height: wall_height.map(|h| h.clamp(MIN_WALL_HEIGHT, MAX_WALL_HEIGHT)),
        }
    }

    pub fn with_wall_height(mut self, wall_height: f64) -> Self {
        self.wall_height = Some(wall_height);
        self
    }

    pub fn wall_height_or_default(&self) -> f64 {
        self.wall_height.unwrap_or(DEFAULT_WALL_HEIGHT)
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.depth)
    }

    /// 沿房间边界的四面墙（顺时针，ID 为 `wall-north/east/south/west`）
    pub fn perimeter_walls(&self) -> Vec<Wall> {
        let (w, d) = (self.width, self.depth);
        let height = self.wall_height_or_default();
        [
            ("wall-north", (0.0, 0.0), (w, 0.0)),
            ("wall-east", (w, 0.0), (w, d)),
            ("wall-south", (w, d), (0.0, d)),
            ("wall-west", (0.0, d), (0.0, 0.0)),
        ]
        .into_iter()
        .map(|(id, (sx, sz), (ex, ez))| {
            Wall::new(id, FloorPoint::new(sx, sz), FloorPoint::new(ex, ez)).with_height(height)
        })
        .collect()
    }
}

/// 墙体（中心线 + 厚度）
///
/// 反序列化时接受两种旧格式，见 [`crate::snapshot`]；序列化只输出 `start/end`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "crate::snapshot::RawWall")]
pub struct Wall {
    pub id: String,
    pub start: FloorPoint,
    pub end: FloorPoint,
    pub thickness: f64,
    pub height: f64,
}

impl Wall {
    pub fn new(id: impl Into<String>, start: FloorPoint, end: FloorPoint) -> Self {
        Self {
            id: id.into(),
            start,
            end,
            thickness: DEFAULT_WALL_THICKNESS,
            height: DEFAULT_WALL_HEIGHT,
        }
    }

    pub fn with_thickness(mut self, thickness: f64) -> Self {
        self.thickness = thickness;
        self
    }

    pub fn with_height(mut self, height: f64) -> Self {
        self.height = height;
        self
    }

    pub fn length(&self) -> f64 {
        (self.end.to_point2() - self.start.to_point2()).norm()
    }

    /// 中心线包围盒按半墙厚加 `margin` 扩张后的矩形
    pub fn bounding_rect(&self, margin: f64) -> Rect {
        Rect::from_corners(self.start.to_point2(), self.end.to_point2())
            .inflate(self.thickness / 2.0 + margin)
    }
}

/// 隔断
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub position: FloorPoint,
    pub width: f64,
    pub depth: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// 办公区
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Office {
    #[serde(default)]
    pub enabled: bool,
    pub position: FloorPoint,
    pub width: f64,
    pub depth: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// 阵列中的行列坐标
///
/// 使用有符号整数，以便越界的旧数据（如 -1）能被读入并由校验报告。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    pub row: i64,
    pub col: i64,
}

impl GridPosition {
    pub fn new(row: i64, col: i64) -> Self {
        Self { row, col }
    }
}

/// 设备阵列（生成式描述）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentArray {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub start_position: FloorPoint,
    pub rows: u32,
    pub cols: u32,
    pub equipment_width: f64,
    pub equipment_depth: f64,
    #[serde(default)]
    pub spacing_x: f64,
    #[serde(default)]
    pub spacing_z: f64,
    #[serde(default)]
    pub excluded_positions: Vec<GridPosition>,
    #[serde(default, deserialize_with = "deserialize_index_list")]
    pub corridor_after_row: Vec<u32>,
    #[serde(default, deserialize_with = "deserialize_index_list")]
    pub corridor_after_col: Vec<u32>,
    #[serde(default)]
    pub corridor_width_x: f64,
    #[serde(default)]
    pub corridor_width_z: f64,
}

impl EquipmentArray {
    pub fn new(start_position: FloorPoint, rows: u32, cols: u32, width: f64, depth: f64) -> Self {
        Self {
            name: None,
            start_position,
            rows,
            cols,
            equipment_width: width,
            equipment_depth: depth,
            spacing_x: 0.0,
            spacing_z: 0.0,
            excluded_positions: Vec::new(),
            corridor_after_row: Vec::new(),
            corridor_after_col: Vec::new(),
            corridor_width_x: 0.0,
            corridor_width_z: 0.0,
        }
    }

    pub fn with_spacing(mut self, spacing_x: f64, spacing_z: f64) -> Self {
        self.spacing_x = spacing_x;
        self.spacing_z = spacing_z;
        self
    }

    pub fn with_excluded(mut self, positions: impl IntoIterator<Item = GridPosition>) -> Self {
        self.excluded_positions.extend(positions);
        self
    }

    /// 在第 `row` 行之后插入宽度为 `width` 的通道
    pub fn with_row_corridor(mut self, row: u32, width: f64) -> Self {
        self.corridor_after_row.push(row);
        self.corridor_width_z = width;
        self
    }

    /// 在第 `col` 列之后插入宽度为 `width` 的通道
    pub fn with_col_corridor(mut self, col: u32, width: f64) -> Self {
        self.corridor_after_col.push(col);
        self.corridor_width_x = width;
        self
    }

    pub fn is_excluded(&self, row: u32, col: u32) -> bool {
        self.excluded_positions
            .iter()
            .any(|p| p.row == i64::from(row) && p.col == i64::from(col))
    }

    /// 行列坐标是否落在 `[0,rows)×[0,cols)` 内
    pub fn in_range(&self, position: &GridPosition) -> bool {
        position.row >= 0
            && position.col >= 0
            && position.row < i64::from(self.rows)
            && position.col < i64::from(self.cols)
    }
}

/// 单台设备
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub depth: f64,
    /// 旋转角（度）
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub name: String,
}

impl Equipment {
    pub fn new(id: impl Into<String>, x: f64, y: f64, width: f64, depth: f64) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            width,
            depth,
            rotation: 0.0,
            name: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    /// 占地矩形；旋转 90°/270° 时宽深互换，其他角度按未旋转处理
    pub fn footprint(&self) -> Rect {
        if is_quarter_turn(self.rotation) {
            Rect::new(self.x, self.y, self.depth, self.width)
        } else {
            Rect::new(self.x, self.y, self.width, self.depth)
        }
    }
}

/// 自由放置的组件（桌子、柱子等）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub depth: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Component {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.depth)
    }
}

/// 显式声明的通道
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Corridor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub width: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Corridor {
    pub fn new(width: f64) -> Self {
        Self {
            id: None,
            width,
            label: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// 通道索引既可以是单个数字也可以是数组
#[derive(Deserialize)]
#[serde(untagged)]
enum IndexList {
    One(u32),
    Many(Vec<u32>),
}

fn deserialize_index_list<'de, D>(deserializer: D) -> Result<Vec<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<IndexList>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(IndexList::One(i)) => vec![i],
        Some(IndexList::Many(v)) => v,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::EPSILON;

    #[test]
    fn test_room_depth_alias() {
        let room: Room = serde_json::from_str(r#"{"width": 10, "height": 8}"#).unwrap();
        assert_eq!(room.depth, 8.0);
        let json = serde_json::to_value(&room).unwrap();
        assert!(json.get("depth").is_some());
        assert!(json.get("height").is_none());
    }

    #[test]
    fn test_room_clamped() {
        let room = Room::clamped(0.2, 900.0, Some(50.0));
        assert_eq!(room.width, MIN_ROOM_DIMENSION);
        assert_eq!(room.depth, MAX_ROOM_DIMENSION);
        assert_eq!(room.wall_height, Some(MAX_WALL_HEIGHT));
    }

    #[test]
    fn test_perimeter_walls() {
        let walls = Room::new(10.0, 6.0).with_wall_height(4.0).perimeter_walls();
        assert_eq!(walls.len(), 4);
        let total: f64 = walls.iter().map(Wall::length).sum();
        assert!((total - 32.0).abs() < EPSILON);
        assert!(walls.iter().all(|w| w.height == 4.0));
    }

    #[test]
    fn test_wall_bounding_rect() {
        let wall = Wall::new("w1", FloorPoint::new(0.0, 0.0), FloorPoint::new(10.0, 0.0))
            .with_thickness(0.2);
        let r = wall.bounding_rect(0.05);
        assert!((r.top + 0.15).abs() < EPSILON);
        assert!((r.bottom - 0.15).abs() < EPSILON);
        assert!((r.left + 0.15).abs() < EPSILON);
        assert!((wall.length() - 10.0).abs() < EPSILON);
    }

    #[test]
    fn test_equipment_footprint_rotation() {
        let eq = Equipment::new("e", 1.0, 1.0, 2.0, 0.5).with_rotation(90.0);
        let r = eq.footprint();
        assert!((r.width() - 0.5).abs() < EPSILON);
        assert!((r.depth() - 2.0).abs() < EPSILON);

        let eq = eq.with_rotation(180.0);
        assert!((eq.footprint().width() - 2.0).abs() < EPSILON);
    }

    #[test]
    fn test_corridor_index_one_or_many() {
        let json = r#"{
            "startPosition": {"x": 1, "z": 1},
            "rows": 4, "cols": 4,
            "equipmentWidth": 0.6, "equipmentDepth": 1.2,
            "corridorAfterRow": 1,
            "corridorAfterCol": [0, 2]
        }"#;
        let array: EquipmentArray = serde_json::from_str(json).unwrap();
        assert_eq!(array.corridor_after_row, vec![1]);
        assert_eq!(array.corridor_after_col, vec![0, 2]);

        let json = r#"{
            "startPosition": {"x": 1, "z": 1},
            "rows": 1, "cols": 1,
            "equipmentWidth": 0.6, "equipmentDepth": 1.2,
            "corridorAfterRow": null
        }"#;
        let array: EquipmentArray = serde_json::from_str(json).unwrap();
        assert!(array.corridor_after_row.is_empty());
    }

    #[test]
    fn test_grid_position_range() {
        let array = EquipmentArray::new(FloorPoint::default(), 2, 3, 1.0, 1.0);
        assert!(array.in_range(&GridPosition::new(1, 2)));
        assert!(!array.in_range(&GridPosition::new(2, 0)));
        assert!(!array.in_range(&GridPosition::new(0, -1)));
    }
}
