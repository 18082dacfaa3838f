//! 设施平面布局持久化
//!
//! 支持：
//! - `.fplan` 紧凑快照编码（MessagePack + zstd）
//! - 布局存储与版本号
//! - 保存前备份
//! - 内置与用户模板目录

pub mod backup;
pub mod codec;
pub mod error;
pub mod store;
pub mod templates;

pub use backup::{BackupInfo, BackupRef, BackupService, MemoryBackupStore};
pub use error::{StoreError, TemplateNameError};
pub use store::{LayoutStore, MemoryLayoutStore, SaveOptions, SaveReceipt};
pub use templates::{check_template_name, BuiltinTemplates, TemplateCatalog, TemplateInfo};
