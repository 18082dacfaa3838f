//! 设施平面布局编辑
//!
//! - [`SceneGraphEditor`]: 实体注册表、选择、拖拽/捕捉、组件面板放置
//! - [`EditorStateStore`]: 查看/编辑模式、未保存标记、变更通知、撤销历史
//! - [`LayoutSession`]: 交互修改与保存前校验的衔接

pub mod config;
pub mod editor;
pub mod session;
pub mod state;
pub mod visual;

pub use config::EditorConfig;
pub use editor::{EntityKind, PaletteKind, PaletteSpec, SceneGraphEditor, Transform};
pub use session::{LayoutSession, SessionBuilder, SessionError};
pub use state::{shared_default, EditorStateStore, History, HistorySnapshot, Mode, StateChange, StateKey};
pub use visual::{Appearance, Color};
