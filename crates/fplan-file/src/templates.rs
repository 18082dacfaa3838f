//! 布局模板目录
//!
//! 内置模板在代码中生成；用户模板在注册前检查名称：
//! - 长度 3..=40
//! - 只允许 ASCII 字母、数字、空格、`-`、`_`
//! - 首尾不能是空格
//! - 不能是保留字，不能覆盖内置模板

use crate::error::{StoreError, TemplateNameError};
use fplan_core::model::{Corridor, Equipment, EquipmentArray, FloorPoint, Room};
use fplan_core::snapshot::LayoutSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const NAME_MIN_LEN: usize = 3;
const NAME_MAX_LEN: usize = 40;
const RESERVED_NAMES: &[&str] = &["default", "new", "none", "template", "con", "nul", "prn", "aux"];

/// 模板目录条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateInfo {
    pub name: String,
    pub description: String,
    pub builtin: bool,
}

/// 模板目录
pub trait TemplateCatalog {
    /// 全部模板（内置在前）
    fn list(&self) -> Vec<TemplateInfo>;

    /// 按名称取模板快照
    fn get(&self, name: &str) -> Option<LayoutSnapshot>;

    /// 检查用户模板名称是否可用
    fn validate_name(&self, name: &str) -> Result<(), TemplateNameError>;

    /// 注册用户模板（同名覆盖）
    fn register(&mut self, name: &str, description: &str, snapshot: LayoutSnapshot) -> Result<(), StoreError>;
}

/// 与目录无关的名称规则检查
pub fn check_template_name(name: &str) -> Result<(), TemplateNameError> {
    let len = name.chars().count();
    if len < NAME_MIN_LEN {
        return Err(TemplateNameError::TooShort { min: NAME_MIN_LEN });
    }
    if len > NAME_MAX_LEN {
        return Err(TemplateNameError::TooLong { max: NAME_MAX_LEN });
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_')))
    {
        return Err(TemplateNameError::InvalidCharacter(c));
    }
    if name.starts_with(' ') || name.ends_with(' ') {
        return Err(TemplateNameError::SurroundingWhitespace);
    }
    let lower = name.to_ascii_lowercase();
    if RESERVED_NAMES.contains(&lower.as_str()) {
        return Err(TemplateNameError::Reserved(name.to_string()));
    }
    Ok(())
}

struct TemplateEntry {
    description: String,
    snapshot: LayoutSnapshot,
}

/// 内置模板 + 用户模板
pub struct BuiltinTemplates {
    builtin: BTreeMap<String, TemplateEntry>,
    user: BTreeMap<String, TemplateEntry>,
}

impl BuiltinTemplates {
    pub fn new() -> Self {
        let mut builtin = BTreeMap::new();
        for (name, description, snapshot) in [
            ("blank-room", "Empty 12 x 8 m room with perimeter walls", blank_room()),
            ("server-hall", "20 x 14 m hall with a 3 x 8 rack array", server_hall()),
            ("lab-bench", "10 x 8 m lab with three benches", lab_bench()),
        ] {
            builtin.insert(
                name.to_string(),
                TemplateEntry {
                    description: description.to_string(),
                    snapshot,
                },
            );
        }
        Self {
            builtin,
            user: BTreeMap::new(),
        }
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.builtin.contains_key(name)
    }
}

impl Default for BuiltinTemplates {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateCatalog for BuiltinTemplates {
    fn list(&self) -> Vec<TemplateInfo> {
        let builtin = self.builtin.iter().map(|(name, e)| (name, e, true));
        let user = self.user.iter().map(|(name, e)| (name, e, false));
        builtin
            .chain(user)
            .map(|(name, entry, builtin)| TemplateInfo {
                name: name.clone(),
                description: entry.description.clone(),
                builtin,
            })
            .collect()
    }

    fn get(&self, name: &str) -> Option<LayoutSnapshot> {
        self.builtin
            .get(name)
            .or_else(|| self.user.get(name))
            .map(|e| e.snapshot.clone())
    }

    fn validate_name(&self, name: &str) -> Result<(), TemplateNameError> {
        check_template_name(name)?;
        if self.builtin.keys().any(|b| b.eq_ignore_ascii_case(name)) {
            return Err(TemplateNameError::BuiltinConflict(name.to_string()));
        }
        Ok(())
    }

    fn register(&mut self, name: &str, description: &str, mut snapshot: LayoutSnapshot) -> Result<(), StoreError> {
        self.validate_name(name)?;
        // 模板不绑定站点
        snapshot.site_id = None;
        snapshot.created_at = None;
        snapshot.updated_at = None;
        self.user.insert(
            name.to_string(),
            TemplateEntry {
                description: description.to_string(),
                snapshot,
            },
        );
        tracing::info!("Registered user template '{}'", name);
        Ok(())
    }
}

fn template_base(room: Room) -> LayoutSnapshot {
    let mut snapshot = LayoutSnapshot::new("", room.clone());
    snapshot.site_id = None;
    snapshot.walls = Some(room.perimeter_walls());
    snapshot
}

fn blank_room() -> LayoutSnapshot {
    template_base(Room::new(12.0, 8.0).with_wall_height(3.0))
}

fn server_hall() -> LayoutSnapshot {
    let mut snapshot = template_base(Room::new(20.0, 14.0).with_wall_height(3.5));
    snapshot.equipment_arrays = Some(vec![EquipmentArray {
        name: Some("Rack row".to_string()),
        ..EquipmentArray::new(FloorPoint::new(2.0, 2.0), 3, 8, 0.6, 1.2)
            .with_spacing(0.0, 1.2)
            .with_col_corridor(3, 1.2)
    }]);
    snapshot
}

fn lab_bench() -> LayoutSnapshot {
    let mut snapshot = template_base(Room::new(10.0, 8.0));
    snapshot.equipment = vec![
        Equipment::new("bench-1", 1.5, 1.5, 2.0, 0.8).with_name("Bench 1"),
        Equipment::new("bench-2", 1.5, 4.0, 2.0, 0.8).with_name("Bench 2"),
        Equipment::new("bench-3", 6.0, 1.5, 2.0, 0.8).with_name("Bench 3"),
    ];
    snapshot.corridors = Some(vec![Corridor::new(1.7).with_id("center-aisle")]);
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use fplan_core::validation::Validator;

    #[test]
    fn test_name_rules() {
        assert!(check_template_name("My Layout_2").is_ok());
        assert_eq!(check_template_name("ab"), Err(TemplateNameError::TooShort { min: 3 }));
        assert_eq!(
            check_template_name(&"x".repeat(41)),
            Err(TemplateNameError::TooLong { max: 40 })
        );
        assert_eq!(check_template_name("a/b/c"), Err(TemplateNameError::InvalidCharacter('/')));
        assert_eq!(check_template_name(" abc"), Err(TemplateNameError::SurroundingWhitespace));
        assert_eq!(
            check_template_name("Default"),
            Err(TemplateNameError::Reserved("Default".to_string()))
        );
    }

    #[test]
    fn test_builtin_conflict() {
        let catalog = BuiltinTemplates::new();
        assert_eq!(
            catalog.validate_name("Server-Hall"),
            Err(TemplateNameError::BuiltinConflict("Server-Hall".to_string()))
        );
    }

    #[test]
    fn test_register_and_list() {
        let mut catalog = BuiltinTemplates::new();
        let mut snapshot = LayoutSnapshot::new("site-9", Room::new(9.0, 9.0));
        snapshot.equipment.push(Equipment::new("e", 2.0, 2.0, 1.0, 1.0));

        catalog.register("corner office", "A small office", snapshot).unwrap();
        let list = catalog.list();
        assert_eq!(list.len(), 4);
        assert!(list.iter().any(|t| t.name == "corner office" && !t.builtin));

        let stored = catalog.get("corner office").unwrap();
        assert!(stored.site_id.is_none());

        let err = catalog.register("nul", "", LayoutSnapshot::default()).unwrap_err();
        assert!(matches!(err, StoreError::InvalidTemplateName(TemplateNameError::Reserved(_))));
    }

    #[test]
    fn test_builtin_templates_validate_once_site_assigned() {
        let catalog = BuiltinTemplates::new();
        let validator = Validator::default();
        for name in ["server-hall", "lab-bench"] {
            let mut snapshot = catalog.get(name).unwrap();
            snapshot.site_id = Some("site".to_string());
            let result = validator.validate(&snapshot);
            assert!(result.valid, "{}: {:?}", name, result.errors);
            assert_eq!(result.stats.warning_count, 0, "{}: {:?}", name, result.errors);
        }
    }
}
