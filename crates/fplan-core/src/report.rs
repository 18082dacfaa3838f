//! 校验结果收集与汇总

use crate::math::Position;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// 阻止保存
    Error,
    /// 仅提示
    Warning,
}

/// 错误所属类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 缺少或非法的必填字段，终止后续规则组
    Structural,
    /// 字段类型错误
    Type,
    /// 越界、碰撞、通道过窄等几何问题
    Geometry,
}

/// 错误类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    MalformedLayout,
    MissingSiteId,
    MissingRoom,
    RoomInvalidDimensions,
    RoomSizeTooSmall,
    RoomSizeTooLarge,
    MissingWalls,
    InsufficientWalls,
    MissingEquipment,
    InsufficientEquipment,
    ArrayTooLarge,
    InvalidType,
    EquipmentOutOfBounds,
    EquipmentNearBoundary,
    EquipmentCollision,
    EquipmentWallCollision,
    CorridorTooNarrow,
    CorridorBelowRecommended,
    InvalidEquipmentDimension,
    ExcludedPositionOutOfRange,
}

impl ErrorKind {
    /// 与序列化一致的代码字符串
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::MalformedLayout => "MALFORMED_LAYOUT",
            ErrorKind::MissingSiteId => "MISSING_SITE_ID",
            ErrorKind::MissingRoom => "MISSING_ROOM",
            ErrorKind::RoomInvalidDimensions => "ROOM_INVALID_DIMENSIONS",
            ErrorKind::RoomSizeTooSmall => "ROOM_SIZE_TOO_SMALL",
            ErrorKind::RoomSizeTooLarge => "ROOM_SIZE_TOO_LARGE",
            ErrorKind::MissingWalls => "MISSING_WALLS",
            ErrorKind::InsufficientWalls => "INSUFFICIENT_WALLS",
            ErrorKind::MissingEquipment => "MISSING_EQUIPMENT",
            ErrorKind::InsufficientEquipment => "INSUFFICIENT_EQUIPMENT",
            ErrorKind::ArrayTooLarge => "ARRAY_TOO_LARGE",
            ErrorKind::InvalidType => "INVALID_TYPE",
            ErrorKind::EquipmentOutOfBounds => "EQUIPMENT_OUT_OF_BOUNDS",
            ErrorKind::EquipmentNearBoundary => "EQUIPMENT_NEAR_BOUNDARY",
            ErrorKind::EquipmentCollision => "EQUIPMENT_COLLISION",
            ErrorKind::EquipmentWallCollision => "EQUIPMENT_WALL_COLLISION",
            ErrorKind::CorridorTooNarrow => "CORRIDOR_TOO_NARROW",
            ErrorKind::CorridorBelowRecommended => "CORRIDOR_BELOW_RECOMMENDED",
            ErrorKind::InvalidEquipmentDimension => "INVALID_EQUIPMENT_DIMENSION",
            ErrorKind::ExcludedPositionOutOfRange => "EXCLUDED_POSITION_OUT_OF_RANGE",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ErrorKind::MalformedLayout
            | ErrorKind::MissingSiteId
            | ErrorKind::MissingRoom
            | ErrorKind::RoomInvalidDimensions
            | ErrorKind::RoomSizeTooSmall
            | ErrorKind::RoomSizeTooLarge
            | ErrorKind::MissingWalls
            | ErrorKind::InsufficientWalls
            | ErrorKind::MissingEquipment
            | ErrorKind::InsufficientEquipment
            | ErrorKind::ArrayTooLarge => ErrorCategory::Structural,
            ErrorKind::InvalidType => ErrorCategory::Type,
            _ => ErrorCategory::Geometry,
        }
    }

    /// 默认严重程度
    pub fn default_severity(&self) -> Severity {
        match self {
            ErrorKind::EquipmentNearBoundary
            | ErrorKind::CorridorBelowRecommended
            | ErrorKind::ExcludedPositionOutOfRange => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// 单条校验结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_id1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_id2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wall_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, serde_json::Value>,
}

impl ValidationError {
    /// 使用该类型的默认严重程度创建
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            equipment_id: None,
            equipment_id1: None,
            equipment_id2: None,
            wall_id: None,
            position: None,
            params: BTreeMap::new(),
        }
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn equipment(mut self, id: impl Into<String>) -> Self {
        self.equipment_id = Some(id.into());
        self
    }

    /// 涉及两台设备（碰撞）
    pub fn equipment_pair(mut self, first: impl Into<String>, second: impl Into<String>) -> Self {
        self.equipment_id1 = Some(first.into());
        self.equipment_id2 = Some(second.into());
        self
    }

    pub fn wall(mut self, id: impl Into<String>) -> Self {
        self.wall_id = Some(id.into());
        self
    }

    pub fn position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn param(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// 是否涉及某个实体（设备或墙体）
    pub fn references(&self, id: &str) -> bool {
        [
            &self.equipment_id,
            &self.equipment_id1,
            &self.equipment_id2,
            &self.wall_id,
        ]
        .into_iter()
        .any(|field| field.as_deref() == Some(id))
    }

    fn param_str(&self, key: &str) -> String {
        match self.params.get(key) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(v) => v.to_string(),
            None => "?".to_string(),
        }
    }

    /// 面向用户的描述
    pub fn message(&self) -> String {
        let eq = self.equipment_id.as_deref().unwrap_or("?");
        match self.kind {
            ErrorKind::MalformedLayout => format!("Layout could not be read: {}", self.param_str("reason")),
            ErrorKind::MissingSiteId => "Site id is missing".to_string(),
            ErrorKind::MissingRoom => "Room definition is missing".to_string(),
            ErrorKind::RoomInvalidDimensions => format!(
                "Room dimensions must be positive (width {}, depth {})",
                self.param_str("width"),
                self.param_str("depth")
            ),
            ErrorKind::RoomSizeTooSmall => format!(
                "Room {} x {} is smaller than the minimum {}",
                self.param_str("width"),
                self.param_str("depth"),
                self.param_str("min")
            ),
            ErrorKind::RoomSizeTooLarge => format!(
                "Room {} x {} exceeds the maximum {}",
                self.param_str("width"),
                self.param_str("depth"),
                self.param_str("max")
            ),
            ErrorKind::MissingWalls => "Walls are missing".to_string(),
            ErrorKind::InsufficientWalls => format!(
                "Layout has {} wall(s), at least {} required",
                self.param_str("count"),
                self.param_str("min")
            ),
            ErrorKind::MissingEquipment => "Equipment arrays are missing".to_string(),
            ErrorKind::InsufficientEquipment => format!(
                "Layout has {} equipment source(s), at least {} required",
                self.param_str("count"),
                self.param_str("min")
            ),
            ErrorKind::ArrayTooLarge => format!(
                "Array {} has {} cells, at most {} allowed",
                self.param_str("array"),
                self.param_str("cells"),
                self.param_str("max")
            ),
            ErrorKind::InvalidType => format!(
                "Field '{}' must be {}",
                self.param_str("field"),
                self.param_str("expected")
            ),
            ErrorKind::EquipmentOutOfBounds => format!("Equipment {} is outside the room boundary", eq),
            ErrorKind::EquipmentNearBoundary => format!("Equipment {} is close to the room boundary", eq),
            ErrorKind::EquipmentCollision => format!(
                "Equipment {} collides with {}",
                self.equipment_id1.as_deref().unwrap_or("?"),
                self.equipment_id2.as_deref().unwrap_or("?")
            ),
            ErrorKind::EquipmentWallCollision => format!(
                "Equipment {} collides with wall {}",
                eq,
                self.wall_id.as_deref().unwrap_or("?")
            ),
            ErrorKind::CorridorTooNarrow => format!(
                "Corridor {} is {} m wide, minimum is {} m",
                self.param_str("corridor"),
                self.param_str("width"),
                self.param_str("min")
            ),
            ErrorKind::CorridorBelowRecommended => format!(
                "Corridor {} is {} m wide, {} m recommended",
                self.param_str("corridor"),
                self.param_str("width"),
                self.param_str("recommended")
            ),
            ErrorKind::InvalidEquipmentDimension => format!(
                "Equipment {} has no valid {}",
                eq,
                self.param_str("dimension")
            ),
            ErrorKind::ExcludedPositionOutOfRange => format!(
                "Excluded position ({}, {}) is outside array {}",
                self.param_str("row"),
                self.param_str("col"),
                self.param_str("array")
            ),
        }
    }
}

/// 统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationStats {
    pub error_count: usize,
    pub warning_count: usize,
}

/// 一次校验的最终结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub stats: ValidationStats,
    pub summary: String,
}

impl ValidationResult {
    pub fn errors_only(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(|e| e.is_error())
    }

    pub fn warnings_only(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(|e| !e.is_error())
    }

    /// 与某个实体相关的条目（用于在编辑器中定位）
    pub fn entries_for<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a ValidationError> + 'a {
        self.errors.iter().filter(move |e| e.references(id))
    }

    pub fn has_kind(&self, kind: ErrorKind) -> bool {
        self.errors.iter().any(|e| e.kind == kind)
    }

    pub fn count_kind(&self, kind: ErrorKind) -> usize {
        self.errors.iter().filter(|e| e.kind == kind).count()
    }
}

/// 校验条目收集器
#[derive(Debug, Default)]
pub struct ErrorReporter {
    entries: Vec<ValidationError>,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: ValidationError) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ValidationError] {
        &self.entries
    }

    /// 按 `equipment_id` 查找
    pub fn entries_for_equipment<'a>(
        &'a self,
        equipment_id: &'a str,
    ) -> impl Iterator<Item = &'a ValidationError> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.equipment_id.as_deref() == Some(equipment_id))
    }

    pub fn has_error_for_equipment(&self, equipment_id: &str) -> bool {
        self.entries_for_equipment(equipment_id).any(ValidationError::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.entries.len() - self.error_count()
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(ValidationError::is_error)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 生成最终结果
    pub fn finish(self) -> ValidationResult {
        let stats = ValidationStats {
            error_count: self.error_count(),
            warning_count: self.warning_count(),
        };
        let valid = stats.error_count == 0;
        let summary = match (stats.error_count, stats.warning_count) {
            (0, 0) => "Layout is valid".to_string(),
            (0, w) => format!("Layout is valid with {} warning(s)", w),
            (e, w) => format!("Validation failed: {} error(s), {} warning(s)", e, w),
        };
        ValidationResult {
            valid,
            errors: self.entries,
            stats,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_iff_no_errors() {
        let mut reporter = ErrorReporter::new();
        reporter.add(ValidationError::new(ErrorKind::EquipmentNearBoundary).equipment("a"));
        let result = reporter.finish();
        assert!(result.valid);
        assert_eq!(result.stats.warning_count, 1);
        assert_eq!(result.summary, "Layout is valid with 1 warning(s)");

        let mut reporter = ErrorReporter::new();
        reporter.add(ValidationError::new(ErrorKind::EquipmentOutOfBounds).equipment("a"));
        reporter.add(ValidationError::new(ErrorKind::CorridorBelowRecommended));
        let result = reporter.finish();
        assert!(!result.valid);
        assert_eq!(result.stats.error_count, 1);
        assert_eq!(result.stats.warning_count, 1);
        assert_eq!(result.summary, "Validation failed: 1 error(s), 1 warning(s)");
    }

    #[test]
    fn test_severity_override() {
        let entry = ValidationError::new(ErrorKind::EquipmentOutOfBounds).severity(Severity::Warning);
        assert!(!entry.is_error());
    }

    #[test]
    fn test_lookup_by_equipment() {
        let mut reporter = ErrorReporter::new();
        reporter.add(ValidationError::new(ErrorKind::EquipmentOutOfBounds).equipment("a"));
        reporter.add(ValidationError::new(ErrorKind::EquipmentNearBoundary).equipment("b"));
        assert!(reporter.has_error_for_equipment("a"));
        assert!(!reporter.has_error_for_equipment("b"));
        assert_eq!(reporter.entries_for_equipment("b").count(), 1);
    }

    #[test]
    fn test_serialized_contract() {
        let entry = ValidationError::new(ErrorKind::EquipmentCollision)
            .equipment_pair("a", "b")
            .param("gap", 0.0);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "EQUIPMENT_COLLISION");
        assert_eq!(json["severity"], "ERROR");
        assert_eq!(json["equipmentId1"], "a");
        assert_eq!(json["equipmentId2"], "b");
        assert!(json.get("wallId").is_none());
        assert_eq!(entry.kind.code(), "EQUIPMENT_COLLISION");
    }

    #[test]
    fn test_message_and_references() {
        let entry = ValidationError::new(ErrorKind::EquipmentWallCollision)
            .equipment("rack-1")
            .wall("w2");
        assert_eq!(entry.message(), "Equipment rack-1 collides with wall w2");
        assert!(entry.references("w2"));
        assert!(!entry.references("w3"));
        assert_eq!(ErrorKind::InvalidType.category(), ErrorCategory::Type);
    }
}
