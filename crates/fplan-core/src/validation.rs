//! 布局校验引擎
//!
//! 按固定顺序执行六组规则：
//! 1. 必填字段（失败则终止后续规则组）
//! 2. 字段类型
//! 3. 房间边界
//! 4. 碰撞（设备之间、设备与墙体）
//! 5. 通道宽度
//! 6. 3D 转换前提（设备尺寸、阵列排除位置）
//!
//! 校验本身从不返回错误，所有问题都体现在 [`ValidationResult`] 中。

use crate::array::MAX_ARRAY_CELLS;
use crate::math::Position;
use crate::model::{Equipment, Room};
use crate::report::{ErrorKind, ErrorReporter, ValidationError, ValidationResult};
use crate::snapshot::LayoutSnapshot;
use serde::{Deserialize, Serialize};

/// 校验参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// 房间最小边长（米）
    pub room_min_size: f64,
    /// 房间最大边长（米）
    pub room_max_size: f64,
    /// 最少墙体数
    pub min_wall_count: usize,
    /// 最少设备来源数（阵列 + 单台设备）
    pub min_equipment_source_count: usize,
    /// 设备与房间边界的最小距离（米）
    pub boundary_margin: f64,
    /// 设备之间的最小间隙（米）
    pub min_equipment_spacing: f64,
    /// 墙体包围盒额外外扩（米）
    pub wall_margin: f64,
    /// 通道最小宽度（米）
    pub corridor_min_width: f64,
    /// 通道推荐宽度（米）
    pub corridor_recommended_width: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            room_min_size: 6.0,
            room_max_size: 200.0,
            min_wall_count: 0,
            min_equipment_source_count: 1,
            boundary_margin: 0.5,
            min_equipment_spacing: 0.0,
            wall_margin: 0.05,
            corridor_min_width: 0.9,
            corridor_recommended_width: 1.2,
        }
    }
}

/// 校验引擎
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// 完整校验
    pub fn validate(&self, snapshot: &LayoutSnapshot) -> ValidationResult {
        let mut reporter = ErrorReporter::new();

        if !self.check_required(snapshot, &mut reporter) {
            tracing::debug!("Structural validation failed, skipping geometry rules");
            return reporter.finish();
        }

        self.check_types(snapshot, &mut reporter);

        let equipment = snapshot.equipment_instances();
        if let Some(room) = &snapshot.room {
            self.check_bounds(room, &equipment, &mut reporter);
        }
        self.check_collisions(snapshot, &equipment, &mut reporter);
        self.check_corridors(snapshot, &mut reporter);
        self.check_convertibility(snapshot, &equipment, &mut reporter);

        let result = reporter.finish();
        tracing::debug!(
            site = snapshot.site_id.as_deref().unwrap_or(""),
            equipment = equipment.len(),
            "{}",
            result.summary
        );
        result
    }

    /// 只执行必填字段检查，用于交互中的快速判断
    pub fn quick_validate(&self, snapshot: &LayoutSnapshot) -> ValidationResult {
        let mut reporter = ErrorReporter::new();
        self.check_required(snapshot, &mut reporter);
        reporter.finish()
    }

    /// 校验未经类型化的 JSON
    ///
    /// 集合字段不是数组、房间尺寸不是数字时先报告类型错误；
    /// 其余无法读取的情况报告为一条 `MALFORMED_LAYOUT`。
    pub fn validate_json(&self, value: &serde_json::Value) -> ValidationResult {
        let mut reporter = ErrorReporter::new();

        let Some(object) = value.as_object() else {
            reporter.add(
                ValidationError::new(ErrorKind::MalformedLayout).param("reason", "layout must be a JSON object"),
            );
            return reporter.finish();
        };

        for field in ["walls", "equipmentArrays", "equipment", "components", "corridors", "partitions"] {
            if let Some(v) = object.get(field) {
                if !v.is_null() && !v.is_array() {
                    reporter.add(type_error(field, "an array"));
                }
            }
        }
        if let Some(room) = object.get("room").and_then(|r| r.as_object()) {
            for (field, key) in [("room.width", "width"), ("room.depth", "depth"), ("room.depth", "height")] {
                if let Some(v) = room.get(key) {
                    if !v.is_number() {
                        reporter.add(type_error(field, "a number"));
                    }
                }
            }
        }
        if !reporter.is_empty() {
            return reporter.finish();
        }

        match LayoutSnapshot::from_json_value(value.clone()) {
            Ok(snapshot) => self.validate(&snapshot),
            Err(e) => {
                reporter.add(ValidationError::new(ErrorKind::MalformedLayout).param("reason", e.to_string()));
                reporter.finish()
            }
        }
    }

    /// 规则组 1：必填字段。返回是否全部通过。
    fn check_required(&self, snapshot: &LayoutSnapshot, reporter: &mut ErrorReporter) -> bool {
        let before = reporter.error_count();
        let cfg = &self.config;

        if snapshot.site_id.as_deref().map_or(true, |s| s.trim().is_empty()) {
            reporter.add(ValidationError::new(ErrorKind::MissingSiteId));
        }

        match &snapshot.room {
            None => reporter.add(ValidationError::new(ErrorKind::MissingRoom)),
            Some(room) => {
                let (w, d) = (room.width, room.depth);
                if w <= 0.0 || d <= 0.0 {
                    reporter.add(room_error(ErrorKind::RoomInvalidDimensions, room));
                } else if w < cfg.room_min_size || d < cfg.room_min_size {
                    reporter.add(room_error(ErrorKind::RoomSizeTooSmall, room).param("min", cfg.room_min_size));
                } else if w > cfg.room_max_size || d > cfg.room_max_size {
                    reporter.add(room_error(ErrorKind::RoomSizeTooLarge, room).param("max", cfg.room_max_size));
                }
            }
        }

        match &snapshot.walls {
            None => reporter.add(ValidationError::new(ErrorKind::MissingWalls)),
            Some(walls) if walls.len() < cfg.min_wall_count => reporter.add(
                ValidationError::new(ErrorKind::InsufficientWalls)
                    .param("count", walls.len())
                    .param("min", cfg.min_wall_count),
            ),
            Some(_) => {}
        }

        if snapshot.equipment_arrays.is_none() && snapshot.equipment.is_empty() {
            reporter.add(ValidationError::new(ErrorKind::MissingEquipment));
        } else {
            let count = snapshot.equipment_source_count();
            if count < cfg.min_equipment_source_count {
                reporter.add(
                    ValidationError::new(ErrorKind::InsufficientEquipment)
                        .param("count", count)
                        .param("min", cfg.min_equipment_source_count),
                );
            }
        }

        // 超大阵列在展开前拦截
        for (i, array) in snapshot.equipment_arrays().iter().enumerate() {
            if array.is_oversized() {
                reporter.add(
                    ValidationError::new(ErrorKind::ArrayTooLarge)
                        .param("array", i)
                        .param("cells", array.cell_count())
                        .param("max", MAX_ARRAY_CELLS),
                );
            }
        }

        reporter.error_count() == before
    }

    /// 规则组 2：数值字段必须是有限数
    fn check_types(&self, snapshot: &LayoutSnapshot, reporter: &mut ErrorReporter) {
        if let Some(room) = &snapshot.room {
            if !room.width.is_finite() {
                reporter.add(type_error("room.width", "a number"));
            }
            if !room.depth.is_finite() {
                reporter.add(type_error("room.depth", "a number"));
            }
        }

        for wall in snapshot.walls() {
            let coords = [wall.start.x, wall.start.z, wall.end.x, wall.end.z, wall.thickness];
            if coords.iter().any(|v| !v.is_finite()) {
                reporter.add(type_error("walls[].coordinates", "a number").wall(&wall.id));
            }
        }

        for eq in &snapshot.equipment {
            if !eq.x.is_finite() || !eq.y.is_finite() {
                reporter.add(type_error("equipment[].position", "a number").equipment(&eq.id));
            }
        }
    }

    /// 规则组 3：房间边界
    ///
    /// 任一边严格进入边距带内为错误；未越界但进入两倍边距带内为警告。
    /// 已经有错误记录的设备不再给出警告。
    fn check_bounds(&self, room: &Room, equipment: &[Equipment], reporter: &mut ErrorReporter) {
        let margin = self.config.boundary_margin;
        let intrudes = |r: &crate::math::Rect, m: f64| {
            r.left < m || r.top < m || r.right > room.width - m || r.bottom > room.depth - m
        };

        for eq in equipment {
            let rect = eq.footprint();
            if intrudes(&rect, margin) {
                reporter.add(
                    ValidationError::new(ErrorKind::EquipmentOutOfBounds)
                        .equipment(&eq.id)
                        .position(Position::new(eq.x, eq.y))
                        .param("right", rect.right)
                        .param("bottom", rect.bottom)
                        .param("margin", margin),
                );
            } else if intrudes(&rect, margin * 2.0) && !reporter.has_error_for_equipment(&eq.id) {
                reporter.add(
                    ValidationError::new(ErrorKind::EquipmentNearBoundary)
                        .equipment(&eq.id)
                        .position(Position::new(eq.x, eq.y))
                        .param("margin", margin * 2.0),
                );
            }
        }
    }

    /// 规则组 4：碰撞
    fn check_collisions(&self, snapshot: &LayoutSnapshot, equipment: &[Equipment], reporter: &mut ErrorReporter) {
        let gap = self.config.min_equipment_spacing;
        let rects: Vec<_> = equipment.iter().map(Equipment::footprint).collect();

        for i in 0..equipment.len() {
            for j in (i + 1)..equipment.len() {
                if rects[i].overlaps_with_gap(&rects[j], gap) {
                    reporter.add(
                        ValidationError::new(ErrorKind::EquipmentCollision)
                            .equipment_pair(&equipment[i].id, &equipment[j].id)
                            .position(Position::from(rects[i].center()))
                            .param("gap", gap),
                    );
                }
            }
        }

        let wall_rects: Vec<_> = snapshot
            .walls()
            .iter()
            .map(|w| (w, w.bounding_rect(self.config.wall_margin)))
            .collect();
        for (eq, rect) in equipment.iter().zip(&rects) {
            for (wall, wall_rect) in &wall_rects {
                if rect.overlaps(wall_rect) {
                    reporter.add(
                        ValidationError::new(ErrorKind::EquipmentWallCollision)
                            .equipment(&eq.id)
                            .wall(&wall.id)
                            .position(Position::new(eq.x, eq.y)),
                    );
                }
            }
        }
    }

    /// 规则组 5：通道宽度
    ///
    /// 显式通道列表与阵列内插入的通道分别检查，不做去重。
    fn check_corridors(&self, snapshot: &LayoutSnapshot, reporter: &mut ErrorReporter) {
        if let Some(corridors) = &snapshot.corridors {
            for (i, corridor) in corridors.iter().enumerate() {
                let label = corridor.id.clone().unwrap_or_else(|| format!("#{}", i + 1));
                self.check_corridor_width(&label, corridor.width, reporter);
            }
        }

        for (i, array) in snapshot.equipment_arrays().iter().enumerate() {
            if !array.corridor_after_col.is_empty() {
                self.check_corridor_width(&format!("array{}.x", i), array.corridor_width_x, reporter);
            }
            if !array.corridor_after_row.is_empty() {
                self.check_corridor_width(&format!("array{}.z", i), array.corridor_width_z, reporter);
            }
        }
    }

    fn check_corridor_width(&self, label: &str, width: f64, reporter: &mut ErrorReporter) {
        let cfg = &self.config;
        if width < cfg.corridor_min_width {
            reporter.add(
                ValidationError::new(ErrorKind::CorridorTooNarrow)
                    .param("corridor", label)
                    .param("width", width)
                    .param("min", cfg.corridor_min_width),
            );
        } else if width < cfg.corridor_recommended_width {
            reporter.add(
                ValidationError::new(ErrorKind::CorridorBelowRecommended)
                    .param("corridor", label)
                    .param("width", width)
                    .param("recommended", cfg.corridor_recommended_width),
            );
        }
    }

    /// 规则组 6：3D 模型生成前提
    fn check_convertibility(&self, snapshot: &LayoutSnapshot, equipment: &[Equipment], reporter: &mut ErrorReporter) {
        for eq in equipment {
            for (dimension, value) in [("width", eq.width), ("depth", eq.depth)] {
                if !(value > 0.0 && value.is_finite()) {
                    reporter.add(
                        ValidationError::new(ErrorKind::InvalidEquipmentDimension)
                            .equipment(&eq.id)
                            .param("dimension", dimension),
                    );
                }
            }
        }

        for (i, array) in snapshot.equipment_arrays().iter().enumerate() {
            for position in array.excluded_positions.iter().filter(|p| !array.in_range(p)) {
                reporter.add(
                    ValidationError::new(ErrorKind::ExcludedPositionOutOfRange)
                        .param("array", i)
                        .param("row", position.row)
                        .param("col", position.col)
                        .param("rows", array.rows)
                        .param("cols", array.cols),
                );
            }
        }
    }
}

fn type_error(field: &str, expected: &str) -> ValidationError {
    ValidationError::new(ErrorKind::InvalidType)
        .param("field", field)
        .param("expected", expected)
}

fn room_error(kind: ErrorKind, room: &Room) -> ValidationError {
    ValidationError::new(kind)
        .param("width", room.width)
        .param("depth", room.depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Corridor, EquipmentArray, FloorPoint, GridPosition, Wall};
    use crate::report::Severity;
    use serde_json::json;

    fn layout(room: Room, equipment: Vec<Equipment>) -> LayoutSnapshot {
        let mut snapshot = LayoutSnapshot::new("site-1", room);
        snapshot.equipment = equipment;
        snapshot
    }

    fn permissive() -> Validator {
        Validator::new(ValidationConfig {
            min_equipment_spacing: 0.0,
            ..Default::default()
        })
    }

    #[test]
    fn test_room_too_small() {
        let snapshot = layout(Room::new(5.0, 5.0), vec![Equipment::new("a", 1.0, 1.0, 1.0, 1.0)]);
        let result = permissive().validate(&snapshot);

        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::RoomSizeTooSmall);
    }

    #[test]
    fn test_structural_failure_short_circuits() {
        // 设备已越界，但必填字段缺失时不应继续检查
        let mut snapshot = layout(Room::new(10.0, 10.0), vec![Equipment::new("a", -5.0, 0.0, 1.0, 1.0)]);
        snapshot.site_id = None;
        let result = permissive().validate(&snapshot);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::MissingSiteId);
    }

    #[test]
    fn test_missing_sections() {
        let snapshot = LayoutSnapshot::default();
        let result = permissive().validate(&snapshot);
        assert!(result.has_kind(ErrorKind::MissingSiteId));
        assert!(result.has_kind(ErrorKind::MissingRoom));
        assert!(result.has_kind(ErrorKind::MissingWalls));
        assert!(result.has_kind(ErrorKind::MissingEquipment));
        assert_eq!(result.stats.error_count, 4);
    }

    #[test]
    fn test_insufficient_counts() {
        let validator = Validator::new(ValidationConfig {
            min_wall_count: 4,
            ..Default::default()
        });
        let snapshot = LayoutSnapshot::new("s", Room::new(10.0, 10.0));
        let result = validator.validate(&snapshot);
        assert!(result.has_kind(ErrorKind::InsufficientWalls));
        assert!(result.has_kind(ErrorKind::InsufficientEquipment));
    }

    #[test]
    fn test_room_invalid_and_too_large() {
        let result = permissive().validate(&layout(Room::new(-1.0, 10.0), vec![]));
        assert!(result.has_kind(ErrorKind::RoomInvalidDimensions));

        let result = permissive().validate(&layout(
            Room::new(250.0, 10.0),
            vec![Equipment::new("a", 1.0, 1.0, 1.0, 1.0)],
        ));
        assert_eq!(result.errors.len(), 1);
        assert!(result.has_kind(ErrorKind::RoomSizeTooLarge));
    }

    #[test]
    fn test_non_finite_room_is_type_error() {
        let snapshot = layout(Room::new(f64::NAN, 10.0), vec![Equipment::new("a", 2.0, 2.0, 1.0, 1.0)]);
        let result = permissive().validate(&snapshot);
        assert!(result.has_kind(ErrorKind::InvalidType));
        assert!(!result.has_kind(ErrorKind::RoomSizeTooSmall));
    }

    #[test]
    fn test_equipment_collision() {
        let snapshot = layout(
            Room::new(10.0, 10.0),
            vec![
                Equipment::new("A", 1.0, 1.0, 2.0, 2.0),
                Equipment::new("B", 2.0, 2.0, 2.0, 2.0),
            ],
        );
        let result = permissive().validate(&snapshot);
        assert_eq!(result.count_kind(ErrorKind::EquipmentCollision), 1);

        let collision = result
            .errors
            .iter()
            .find(|e| e.kind == ErrorKind::EquipmentCollision)
            .unwrap();
        assert_eq!(collision.equipment_id1.as_deref(), Some("A"));
        assert_eq!(collision.equipment_id2.as_deref(), Some("B"));
    }

    #[test]
    fn test_collision_respects_min_spacing() {
        let equipment = vec![
            Equipment::new("A", 1.0, 1.0, 1.0, 1.0),
            Equipment::new("B", 2.5, 1.0, 1.0, 1.0),
        ];
        let snapshot = layout(Room::new(10.0, 10.0), equipment);

        assert!(!permissive().validate(&snapshot).has_kind(ErrorKind::EquipmentCollision));

        let strict = Validator::new(ValidationConfig {
            min_equipment_spacing: 0.6,
            ..Default::default()
        });
        assert!(strict.validate(&snapshot).has_kind(ErrorKind::EquipmentCollision));
    }

    #[test]
    fn test_out_of_bounds() {
        let snapshot = layout(Room::new(10.0, 10.0), vec![Equipment::new("a", -0.1, 3.0, 1.0, 1.0)]);
        let result = permissive().validate(&snapshot);
        assert!(result.has_kind(ErrorKind::EquipmentOutOfBounds));
        // 已有越界错误时不再重复给出靠近边界的警告
        assert!(!result.has_kind(ErrorKind::EquipmentNearBoundary));
        assert!(!result.valid);
    }

    #[test]
    fn test_boundary_strictness() {
        // 左边缘恰好等于边距：不算越界，但在两倍边距内
        let snapshot = layout(Room::new(10.0, 10.0), vec![Equipment::new("a", 0.5, 3.0, 1.0, 1.0)]);
        let result = permissive().validate(&snapshot);
        assert!(!result.has_kind(ErrorKind::EquipmentOutOfBounds));
        assert!(result.has_kind(ErrorKind::EquipmentNearBoundary));
        assert!(result.valid);

        // 右边缘恰好等于两倍边距：什么都不报
        let snapshot = layout(Room::new(10.0, 10.0), vec![Equipment::new("a", 8.0, 3.0, 1.0, 1.0)]);
        let result = permissive().validate(&snapshot);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_wall_collision() {
        let mut snapshot = layout(Room::new(10.0, 10.0), vec![Equipment::new("a", 4.5, 4.5, 1.0, 1.0)]);
        snapshot.walls = Some(vec![
            Wall::new("inner", FloorPoint::new(5.0, 2.0), FloorPoint::new(5.0, 8.0)),
            Wall::new("outer", FloorPoint::new(0.0, 0.0), FloorPoint::new(10.0, 0.0)),
        ]);
        let result = permissive().validate(&snapshot);
        assert_eq!(result.count_kind(ErrorKind::EquipmentWallCollision), 1);
        assert_eq!(result.entries_for("inner").count(), 1);
    }

    #[test]
    fn test_corridor_widths() {
        let mut snapshot = layout(Room::new(10.0, 10.0), vec![Equipment::new("a", 2.0, 2.0, 1.0, 1.0)]);
        snapshot.corridors = Some(vec![
            Corridor::new(0.8).with_id("narrow"),
            Corridor::new(1.0).with_id("tight"),
            Corridor::new(1.5),
        ]);
        let result = permissive().validate(&snapshot);

        let narrow = result.errors.iter().find(|e| e.kind == ErrorKind::CorridorTooNarrow).unwrap();
        assert_eq!(narrow.severity, Severity::Error);
        assert_eq!(narrow.params["corridor"], json!("narrow"));

        let tight = result
            .errors
            .iter()
            .find(|e| e.kind == ErrorKind::CorridorBelowRecommended)
            .unwrap();
        assert_eq!(tight.severity, Severity::Warning);
        assert_eq!(result.stats.error_count, 1);
        assert_eq!(result.stats.warning_count, 1);
    }

    #[test]
    fn test_array_corridor_checked() {
        let mut snapshot = LayoutSnapshot::new("s", Room::new(20.0, 20.0));
        snapshot.equipment_arrays = Some(vec![EquipmentArray::new(FloorPoint::new(2.0, 2.0), 2, 4, 0.6, 1.0)
            .with_spacing(0.0, 1.5)
            .with_col_corridor(1, 0.5)]);
        let result = permissive().validate(&snapshot);
        assert!(result.has_kind(ErrorKind::CorridorTooNarrow));
        assert!(!result.has_kind(ErrorKind::EquipmentCollision));
    }

    #[test]
    fn test_convertibility() {
        let mut snapshot = layout(Room::new(10.0, 10.0), vec![Equipment::new("flat", 2.0, 2.0, 0.0, -1.0)]);
        snapshot.equipment_arrays = Some(vec![EquipmentArray::new(FloorPoint::new(5.0, 5.0), 2, 2, 1.0, 1.0)
            .with_excluded([GridPosition::new(2, 0), GridPosition::new(1, 1)])]);
        let result = permissive().validate(&snapshot);

        assert_eq!(result.count_kind(ErrorKind::InvalidEquipmentDimension), 2);
        assert_eq!(result.count_kind(ErrorKind::ExcludedPositionOutOfRange), 1);
        let warning = result
            .errors
            .iter()
            .find(|e| e.kind == ErrorKind::ExcludedPositionOutOfRange)
            .unwrap();
        assert_eq!(warning.severity, Severity::Warning);
    }

    #[test]
    fn test_validate_is_deterministic() {
        let snapshot = layout(
            Room::new(10.0, 10.0),
            vec![
                Equipment::new("A", 0.2, 1.0, 2.0, 2.0),
                Equipment::new("B", 1.0, 1.5, 2.0, 2.0),
                Equipment::new("C", 8.7, 8.0, 1.0, 1.0),
            ],
        );
        let validator = permissive();
        let first = validator.validate(&snapshot);
        let second = validator.validate(&snapshot);
        assert_eq!(first, second);
        assert_eq!(first.valid, first.errors_only().next().is_none());
    }

    #[test]
    fn test_quick_validate_only_structure() {
        let snapshot = layout(Room::new(10.0, 10.0), vec![Equipment::new("a", -3.0, 0.0, 1.0, 1.0)]);
        let result = permissive().quick_validate(&snapshot);
        assert!(result.valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_validate_json_type_errors() {
        let value = json!({
            "site_id": "s",
            "room": {"width": "ten", "depth": 10},
            "walls": {"not": "an array"},
            "equipmentArrays": []
        });
        let result = permissive().validate_json(&value);
        assert!(!result.valid);
        assert_eq!(result.count_kind(ErrorKind::InvalidType), 2);
    }

    #[test]
    fn test_validate_json_malformed() {
        let result = permissive().validate_json(&json!([1, 2, 3]));
        assert!(result.has_kind(ErrorKind::MalformedLayout));

        let result = permissive().validate_json(&json!({"walls": [{"id": "x"}]}));
        assert!(result.has_kind(ErrorKind::MalformedLayout));
    }

    #[test]
    fn test_oversized_array_is_structural_error() {
        let value = json!({
            "site_id": "huge",
            "room": {"width": 20, "depth": 20},
            "walls": [],
            "equipmentArrays": [{
                "startPosition": {"x": 1, "z": 1},
                "rows": 4000000000u32, "cols": 4000000000u32,
                "equipmentWidth": 0.6, "equipmentDepth": 1.0
            }]
        });
        let result = Validator::default().validate_json(&value);
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::ArrayTooLarge);
        assert_eq!(result.errors[0].params["max"], json!(MAX_ARRAY_CELLS));
    }

    #[test]
    fn test_materialized_layout_uses_remaining_equipment() {
        let mut snapshot = LayoutSnapshot::new("s", Room::new(10.0, 10.0));
        snapshot.equipment_arrays = Some(vec![EquipmentArray::new(FloorPoint::new(-3.0, 2.0), 1, 2, 1.0, 1.0)]);
        assert_eq!(permissive().validate(&snapshot).count_kind(ErrorKind::EquipmentOutOfBounds), 2);

        // 阵列生成的设备已全部删除
        snapshot.arrays_materialized = true;
        let result = permissive().validate(&snapshot);
        assert!(!result.has_kind(ErrorKind::EquipmentOutOfBounds));
        assert!(result.has_kind(ErrorKind::InsufficientEquipment));
    }

    #[test]
    fn test_validate_json_legacy_layout() {
        let value = json!({
            "site_id": "legacy",
            "room": {"width": 12, "height": 8},
            "walls": [{"id": "w", "startX": 0, "startZ": 0, "endX": 12, "endZ": 0}],
            "equipmentArrays": [{
                "startPosition": {"x": 2, "z": 2},
                "rows": 2, "cols": 3,
                "equipmentWidth": 0.6, "equipmentDepth": 1.0,
                "spacingX": 0.1, "spacingZ": 1.5
            }]
        });
        let result = permissive().validate_json(&value);
        assert!(result.valid, "{:?}", result.errors);
        assert_eq!(result.summary, "Layout is valid");
    }
}
