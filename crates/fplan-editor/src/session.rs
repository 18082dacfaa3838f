//! 编辑会话
//!
//! 把场景编辑器、状态存储、校验引擎和持久化协作方串起来：
//! 交互修改写入历史，保存前必须通过完整校验。

use crate::config::EditorConfig;
use crate::editor::{PaletteSpec, SceneGraphEditor, Transform};
use crate::state::{EditorStateStore, HistorySnapshot, Mode};
use fplan_core::math::Point2;
use fplan_core::report::ValidationResult;
use fplan_core::snapshot::LayoutSnapshot;
use fplan_core::validation::{ValidationConfig, Validator};
use fplan_file::{LayoutStore, SaveOptions, SaveReceipt, StoreError};
use thiserror::Error;
use tracing::{info, warn};

/// 新站点默认使用的模板
pub const DEFAULT_FALLBACK_TEMPLATE: &str = "blank-room";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Missing required collaborator: {0}")]
    MissingCollaborator(&'static str),

    #[error("Validation failed: {}", .0.summary)]
    ValidationFailed(ValidationResult),

    #[error("No active site")]
    NoActiveSite,

    #[error("Session is in viewer mode")]
    ReadOnly,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// 会话构建器
pub struct SessionBuilder<S> {
    store: Option<S>,
    validation: ValidationConfig,
    editor: EditorConfig,
    fallback_template: String,
}

impl<S> Default for SessionBuilder<S> {
    fn default() -> Self {
        Self {
            store: None,
            validation: ValidationConfig::default(),
            editor: EditorConfig::default(),
            fallback_template: DEFAULT_FALLBACK_TEMPLATE.to_string(),
        }
    }
}

impl<S: LayoutStore> SessionBuilder<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(mut self, store: S) -> Self {
        self.store = Some(store);
        self
    }

    pub fn validation_config(mut self, config: ValidationConfig) -> Self {
        self.validation = config;
        self
    }

    pub fn editor_config(mut self, config: EditorConfig) -> Self {
        self.editor = config;
        self
    }

    pub fn fallback_template(mut self, name: impl Into<String>) -> Self {
        self.fallback_template = name.into();
        self
    }

    /// 构建会话；缺少持久化协作方时立即失败
    pub fn build(self) -> Result<LayoutSession<S>, SessionError> {
        let store = self.store.ok_or(SessionError::MissingCollaborator("layout store"))?;
        Ok(LayoutSession {
            store,
            validator: Validator::new(self.validation),
            state: EditorStateStore::with_history_limit(self.editor.history_limit),
            editor: SceneGraphEditor::new(self.editor),
            fallback_template: self.fallback_template,
            saved_snapshot: None,
        })
    }
}

/// 编辑会话
pub struct LayoutSession<S> {
    store: S,
    validator: Validator,
    state: EditorStateStore,
    editor: SceneGraphEditor,
    fallback_template: String,
    /// 最近一次从存储读取或成功保存的快照，用作备份来源
    saved_snapshot: Option<LayoutSnapshot>,
}

impl<S: LayoutStore> LayoutSession<S> {
    pub fn builder() -> SessionBuilder<S> {
        SessionBuilder::new()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn state(&self) -> &EditorStateStore {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut EditorStateStore {
        &mut self.state
    }

    pub fn editor(&self) -> &SceneGraphEditor {
        &self.editor
    }

    /// 打开站点；存储中没有时从默认模板开始
    pub async fn open(&mut self, site_id: &str, mode: Mode) -> Result<(), SessionError> {
        let (snapshot, stored) = if self.store.exists(site_id).await? {
            (self.store.load(site_id).await?, true)
        } else {
            info!(
                "No layout stored for site {}, starting from template '{}'",
                site_id, self.fallback_template
            );
            let mut template = self.store.load_template(&self.fallback_template).await?;
            template.site_id = Some(site_id.to_string());
            (template, false)
        };

        self.editor.load(&snapshot);
        let loaded = self.editor.get_snapshot();
        match mode {
            Mode::Editor => {
                self.state.enter_editor_mode(site_id, Some(loaded.clone()));
                self.state.add_to_history(&HistorySnapshot::new(loaded, Vec::new()));
            }
            Mode::Viewer => {
                self.state.enter_viewer_mode(site_id, Some(loaded));
                // 上一个站点的历史不能带入
                self.state.clear_history();
            }
        }
        self.saved_snapshot = stored.then_some(snapshot);
        Ok(())
    }

    fn ensure_editable(&self, operation: &str) -> bool {
        if self.state.mode() == Mode::Editor {
            true
        } else {
            warn!("{}: session is in viewer mode", operation);
            false
        }
    }

    /// 把编辑器当前内容写回状态并记入历史
    fn commit(&mut self) {
        let snapshot = self.editor.get_snapshot();
        let selection = self.editor.selection().to_vec();
        self.state.set_current_layout(Some(snapshot.clone()));
        self.state.set_selected_objects(selection.clone());
        self.state.add_to_history(&HistorySnapshot::new(snapshot, selection));
    }

    fn sync_selection(&mut self) {
        let selection = self.editor.selection().to_vec();
        self.state.set_selected_objects(selection);
    }

    // ========== 交互 ==========

    /// 同时切换编辑器和状态中的网格捕捉
    pub fn set_grid_snap(&mut self, enabled: bool) {
        self.editor.set_grid_snap(enabled);
        self.state.set_grid_snap(enabled);
    }

    pub fn select(&mut self, id: &str, multi: bool) -> bool {
        let selected = self.editor.select(id, multi);
        self.sync_selection();
        selected
    }

    pub fn deselect_all(&mut self) {
        self.editor.deselect_all();
        self.sync_selection();
    }

    pub fn drag(&mut self, id: &str, position: Point2) -> Option<Point2> {
        if !self.ensure_editable("drag") {
            return None;
        }
        let moved = self.editor.drag_transform(id, position)?;
        self.commit();
        Some(moved)
    }

    pub fn move_selected(&mut self, dx: f64, dy: f64) -> usize {
        if !self.ensure_editable("move_selected") {
            return 0;
        }
        let moved = self.editor.move_selected(dx, dy);
        if moved > 0 {
            self.commit();
        }
        moved
    }

    pub fn transform(&mut self, id: &str, transform: Transform) -> bool {
        if !self.ensure_editable("transform") {
            return false;
        }
        let applied = self.editor.transform(id, transform);
        if applied {
            self.commit();
        }
        applied
    }

    pub fn drop_from_palette(&mut self, token: &str, x: f64, y: f64, spec: &PaletteSpec) -> Option<String> {
        if !self.ensure_editable("drop_from_palette") {
            return None;
        }
        let id = self.editor.create_from_palette_drop(token, x, y, spec)?;
        self.commit();
        Some(id)
    }

    pub fn delete_selected(&mut self) -> Vec<String> {
        if !self.ensure_editable("delete_selected") {
            return Vec::new();
        }
        let removed = self.editor.delete_selected();
        if !removed.is_empty() {
            self.commit();
        }
        removed
    }

    // ========== 历史 ==========

    pub fn undo(&mut self) -> bool {
        if !self.ensure_editable("undo") {
            return false;
        }
        match self.state.undo() {
            Some(entry) => {
                self.apply_history(entry);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        if !self.ensure_editable("redo") {
            return false;
        }
        match self.state.redo() {
            Some(entry) => {
                self.apply_history(entry);
                true
            }
            None => false,
        }
    }

    fn apply_history(&mut self, entry: HistorySnapshot) {
        self.editor.restore(&entry.layout);
        for id in &entry.selected_objects {
            self.editor.select(id, true);
        }
        self.state.set_current_layout(Some(entry.layout));
        self.sync_selection();
    }

    // ========== 校验与保存 ==========

    fn current_snapshot(&self) -> Result<(String, LayoutSnapshot), SessionError> {
        let site_id = self
            .state
            .current_site_id()
            .map(str::to_string)
            .ok_or(SessionError::NoActiveSite)?;
        let mut snapshot = self.editor.get_snapshot();
        snapshot.site_id = Some(site_id.clone());
        Ok((site_id, snapshot))
    }

    /// 完整校验当前内容
    pub fn validate(&self) -> Result<ValidationResult, SessionError> {
        let (_, snapshot) = self.current_snapshot()?;
        Ok(self.validator.validate(&snapshot))
    }

    /// 只检查必填字段，用于实时预览
    pub fn preview_check(&self) -> Result<ValidationResult, SessionError> {
        let (_, snapshot) = self.current_snapshot()?;
        Ok(self.validator.quick_validate(&snapshot))
    }

    /// 校验通过后保存；存在错误级条目时不会调用存储
    pub async fn save(&mut self) -> Result<SaveReceipt, SessionError> {
        let (site_id, snapshot) = self.current_snapshot()?;
        if !self.ensure_editable("save") {
            return Err(SessionError::ReadOnly);
        }

        let result = self.validator.validate(&snapshot);
        if !result.valid {
            warn!("Save blocked for site {}: {}", site_id, result.summary);
            return Err(SessionError::ValidationFailed(result));
        }

        let options = SaveOptions {
            create_backup: true,
            previous_snapshot: self.saved_snapshot.clone(),
        };
        let receipt = self.store.save(&site_id, &snapshot, options).await?;

        self.state.mark_as_saved();
        self.saved_snapshot = Some(snapshot);
        info!("Site {} saved (version {})", site_id, receipt.version);
        Ok(receipt)
    }
}
