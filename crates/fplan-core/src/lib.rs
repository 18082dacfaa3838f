//! 设施平面布局核心
//!
//! 提供与渲染无关的布局数据模型、规范快照格式、网格捕捉以及保存前的规则校验。
//!
//! # 架构设计
//!
//! - `model`: 房间、墙体、设备、阵列等纯数据实体（米制）
//! - `snapshot`: 持久化边界上的规范快照，读取时兼容旧坐标写法
//! - `validation` / `report`: 按顺序执行的规则组与结果汇总
//!
//! # 示例
//!
//! ```rust
//! use fplan_core::prelude::*;
//!
//! let mut layout = LayoutSnapshot::new("site-1", Room::new(12.0, 8.0));
//! layout.equipment.push(Equipment::new("rack-1", 2.0, 2.0, 0.6, 1.2));
//!
//! let result = Validator::default().validate(&layout);
//! assert!(result.valid);
//! ```

pub mod array;
pub mod math;
pub mod model;
pub mod report;
pub mod snap;
pub mod snapshot;
pub mod validation;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::math::{Point2, Position, Rect, Vector2, EPSILON};
    pub use crate::model::{
        Component, Corridor, Equipment, EquipmentArray, FloorPoint, GridPosition, Office, Partition, Room, Wall,
    };
    pub use crate::report::{ErrorKind, ErrorReporter, Severity, ValidationError, ValidationResult};
    pub use crate::snap::{GridSizeProvider, GridSnap, ZoomAwareGrid};
    pub use crate::snapshot::{LayoutSnapshot, SnapshotError};
    pub use crate::validation::{ValidationConfig, Validator};
}
