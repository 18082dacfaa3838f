//! 编辑器状态管理
//!
//! - 查看/编辑模式切换
//! - 未保存标记（写入受跟踪属性时自动置位）
//! - 按属性键或全局订阅的变更通知
//! - 线性撤销/重做历史

use chrono::{DateTime, Utc};
use fplan_core::snapshot::LayoutSnapshot;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, info, warn};

/// 默认历史上限
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// 编辑器模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Viewer,
    Editor,
}

/// 受跟踪的状态属性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKey {
    Mode,
    CurrentSiteId,
    CurrentLayout,
    SelectedObjects,
    IsDirty,
    LastSaved,
    ActiveTool,
    Zoom,
    GridSnap,
}

impl StateKey {
    pub const ALL: [StateKey; 9] = [
        StateKey::Mode,
        StateKey::CurrentSiteId,
        StateKey::CurrentLayout,
        StateKey::SelectedObjects,
        StateKey::IsDirty,
        StateKey::LastSaved,
        StateKey::ActiveTool,
        StateKey::Zoom,
        StateKey::GridSnap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StateKey::Mode => "mode",
            StateKey::CurrentSiteId => "currentSiteId",
            StateKey::CurrentLayout => "currentLayout",
            StateKey::SelectedObjects => "selectedObjects",
            StateKey::IsDirty => "isDirty",
            StateKey::LastSaved => "lastSaved",
            StateKey::ActiveTool => "activeTool",
            StateKey::Zoom => "zoom",
            StateKey::GridSnap => "gridSnap",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }

    /// 写入该属性是否会把状态标记为未保存
    pub fn marks_dirty(&self) -> bool {
        !matches!(
            self,
            StateKey::IsDirty | StateKey::LastSaved | StateKey::Mode | StateKey::SelectedObjects
        )
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一次属性写入
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    pub key: StateKey,
    pub old_value: Value,
    pub new_value: Value,
}

/// 订阅句柄
pub type ListenerId = u64;

type Listener = Box<dyn FnMut(&StateChange)>;

/// 历史快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySnapshot {
    pub timestamp: DateTime<Utc>,
    pub layout: LayoutSnapshot,
    pub selected_objects: Vec<String>,
}

impl HistorySnapshot {
    pub fn new(layout: LayoutSnapshot, selected_objects: Vec<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            layout,
            selected_objects,
        }
    }
}

/// 线性历史
///
/// 游标取值 `[-1, len-1]`；在游标之后追加会丢弃重做分支，超出上限时淘汰最旧的条目。
#[derive(Debug, Clone)]
pub struct History<T> {
    entries: VecDeque<T>,
    cursor: Option<usize>,
    limit: usize,
}

impl<T: Clone> History<T> {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: None,
            limit: limit.max(1),
        }
    }

    pub fn push(&mut self, entry: T) {
        let keep = self.cursor.map_or(0, |i| i + 1);
        self.entries.truncate(keep);
        self.entries.push_back(entry);
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
        self.cursor = Some(self.entries.len() - 1);
    }

    pub fn undo(&mut self) -> Option<T> {
        match self.cursor {
            Some(i) if i > 0 => {
                self.cursor = Some(i - 1);
                self.entries.get(i - 1).cloned()
            }
            _ => None,
        }
    }

    pub fn redo(&mut self) -> Option<T> {
        let next = self.cursor.map_or(0, |i| i + 1);
        if next < self.entries.len() {
            self.cursor = Some(next);
            self.entries.get(next).cloned()
        } else {
            None
        }
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.cursor, Some(i) if i > 0)
    }

    pub fn can_redo(&self) -> bool {
        self.cursor.map_or(0, |i| i + 1) < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 当前位置，空历史为 -1
    pub fn index(&self) -> isize {
        self.cursor.map_or(-1, |i| i as isize)
    }

    pub fn current(&self) -> Option<&T> {
        self.cursor.and_then(|i| self.entries.get(i))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }
}

/// 编辑器状态存储
///
/// 所有写入都经过显式的 setter，setter 按顺序通知键订阅者、全局订阅者，
/// 最后重新计算未保存标记。回调内不能再修改本存储。
pub struct EditorStateStore {
    mode: Mode,
    current_site_id: Option<String>,
    current_layout: Option<LayoutSnapshot>,
    selected_objects: Vec<String>,
    is_dirty: bool,
    last_saved: Option<DateTime<Utc>>,
    active_tool: String,
    zoom: f64,
    grid_snap: bool,

    key_listeners: Vec<(ListenerId, StateKey, Listener)>,
    global_listeners: Vec<(ListenerId, Listener)>,
    next_listener_id: ListenerId,

    history: History<HistorySnapshot>,
}

impl EditorStateStore {
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_history_limit(limit: usize) -> Self {
        Self {
            mode: Mode::Viewer,
            current_site_id: None,
            current_layout: None,
            selected_objects: Vec::new(),
            is_dirty: false,
            last_saved: None,
            active_tool: "select".to_string(),
            zoom: 1.0,
            grid_snap: true,
            key_listeners: Vec::new(),
            global_listeners: Vec::new(),
            next_listener_id: 1,
            history: History::new(limit),
        }
    }

    // ========== 读取 ==========

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn current_site_id(&self) -> Option<&str> {
        self.current_site_id.as_deref()
    }

    pub fn current_layout(&self) -> Option<&LayoutSnapshot> {
        self.current_layout.as_ref()
    }

    pub fn selected_objects(&self) -> &[String] {
        &self.selected_objects
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.last_saved
    }

    pub fn active_tool(&self) -> &str {
        &self.active_tool
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn grid_snap(&self) -> bool {
        self.grid_snap
    }

    // ========== 写入 ==========

    pub fn set_mode(&mut self, mode: Mode) {
        let old = std::mem::replace(&mut self.mode, mode);
        self.notify(StateKey::Mode, &old, &mode);
    }

    pub fn set_current_site_id(&mut self, site_id: Option<String>) {
        let old = std::mem::replace(&mut self.current_site_id, site_id.clone());
        self.notify(StateKey::CurrentSiteId, &old, &site_id);
    }

    pub fn set_current_layout(&mut self, layout: Option<LayoutSnapshot>) {
        let old = std::mem::replace(&mut self.current_layout, layout);
        if self.has_listeners(StateKey::CurrentLayout) {
            let new = self.current_layout.clone();
            self.notify(StateKey::CurrentLayout, &old, &new);
        } else {
            self.after_write(StateKey::CurrentLayout);
        }
    }

    /// 同步选择缓存（不会自动从场景编辑器派生）
    pub fn set_selected_objects(&mut self, ids: Vec<String>) {
        let old = std::mem::replace(&mut self.selected_objects, ids.clone());
        self.notify(StateKey::SelectedObjects, &old, &ids);
    }

    pub fn set_active_tool(&mut self, tool: impl Into<String>) {
        let tool = tool.into();
        let old = std::mem::replace(&mut self.active_tool, tool.clone());
        self.notify(StateKey::ActiveTool, &old, &tool);
    }

    /// 设置缩放；非正或非有限值被忽略
    pub fn set_zoom(&mut self, zoom: f64) {
        if !(zoom > 0.0 && zoom.is_finite()) {
            warn!("Ignoring invalid zoom {}", zoom);
            return;
        }
        let old = std::mem::replace(&mut self.zoom, zoom);
        self.notify(StateKey::Zoom, &old, &zoom);
    }

    pub fn set_grid_snap(&mut self, enabled: bool) {
        let old = std::mem::replace(&mut self.grid_snap, enabled);
        self.notify(StateKey::GridSnap, &old, &enabled);
    }

    fn set_dirty(&mut self, dirty: bool) {
        if self.is_dirty == dirty {
            return;
        }
        self.is_dirty = dirty;
        self.notify(StateKey::IsDirty, &!dirty, &dirty);
    }

    fn set_last_saved(&mut self, at: DateTime<Utc>) {
        let old = self.last_saved.replace(at);
        self.notify(StateKey::LastSaved, &old, &Some(at));
    }

    // ========== 模式切换 ==========

    /// 进入编辑模式：清空选择和历史，重置未保存标记
    pub fn enter_editor_mode(&mut self, site_id: impl Into<String>, layout: Option<LayoutSnapshot>) {
        let site_id = site_id.into();
        self.set_mode(Mode::Editor);
        self.set_current_site_id(Some(site_id.clone()));
        self.set_current_layout(layout);
        self.set_selected_objects(Vec::new());
        self.history.clear();
        self.set_dirty(false);
        info!("Entered editor mode for site {}", site_id);
    }

    /// 进入查看模式
    pub fn enter_viewer_mode(&mut self, site_id: impl Into<String>, layout: Option<LayoutSnapshot>) {
        let site_id = site_id.into();
        self.set_mode(Mode::Viewer);
        self.set_current_site_id(Some(site_id.clone()));
        self.set_current_layout(layout);
        self.set_selected_objects(Vec::new());
        self.set_dirty(false);
        info!("Entered viewer mode for site {}", site_id);
    }

    /// 标记为已保存；模式切换以外唯一清除未保存标记的途径
    pub fn mark_as_saved(&mut self) {
        self.set_dirty(false);
        self.set_last_saved(Utc::now());
    }

    // ========== 订阅 ==========

    /// 订阅单个属性
    pub fn subscribe<F>(&mut self, key: StateKey, listener: F) -> ListenerId
    where
        F: FnMut(&StateChange) + 'static,
    {
        let id = self.next_id();
        self.key_listeners.push((id, key, Box::new(listener)));
        id
    }

    /// 订阅全部属性
    pub fn subscribe_all<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&StateChange) + 'static,
    {
        let id = self.next_id();
        self.global_listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.key_listeners.len() + self.global_listeners.len();
        self.key_listeners.retain(|(lid, _, _)| *lid != id);
        self.global_listeners.retain(|(lid, _)| *lid != id);
        before != self.key_listeners.len() + self.global_listeners.len()
    }

    fn next_id(&mut self) -> ListenerId {
        let id = self.next_listener_id;
        self.next_listener_id += 1;
        id
    }

    fn has_listeners(&self, key: StateKey) -> bool {
        !self.global_listeners.is_empty() || self.key_listeners.iter().any(|(_, k, _)| *k == key)
    }

    fn notify<T: Serialize + ?Sized>(&mut self, key: StateKey, old: &T, new: &T) {
        if self.has_listeners(key) {
            let change = StateChange {
                key,
                old_value: serde_json::to_value(old).unwrap_or(Value::Null),
                new_value: serde_json::to_value(new).unwrap_or(Value::Null),
            };
            for (_, k, listener) in self.key_listeners.iter_mut() {
                if *k == key {
                    listener(&change);
                }
            }
            for (_, listener) in self.global_listeners.iter_mut() {
                listener(&change);
            }
        }
        self.after_write(key);
    }

    fn after_write(&mut self, key: StateKey) {
        if key.marks_dirty() {
            self.set_dirty(true);
        }
    }

    // ========== 历史 ==========

    pub fn add_to_history(&mut self, snapshot: &HistorySnapshot) {
        self.history.push(snapshot.clone());
        debug!(
            "History: {} entries, index {}",
            self.history.len(),
            self.history.index()
        );
    }

    pub fn undo(&mut self) -> Option<HistorySnapshot> {
        let entry = self.history.undo();
        if entry.is_none() {
            warn!("Nothing to undo");
        }
        entry
    }

    pub fn redo(&mut self) -> Option<HistorySnapshot> {
        let entry = self.history.redo();
        if entry.is_none() {
            warn!("Nothing to redo");
        }
        entry
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn history_index(&self) -> isize {
        self.history.index()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

impl Default for EditorStateStore {
    fn default() -> Self {
        Self::new()
    }
}

thread_local! {
    static SHARED_DEFAULT: Rc<RefCell<EditorStateStore>> = Rc::new(RefCell::new(EditorStateStore::new()));
}

/// 当前线程共享的默认状态存储
pub fn shared_default() -> Rc<RefCell<EditorStateStore>> {
    SHARED_DEFAULT.with(Rc::clone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fplan_core::model::Room;

    fn layout() -> LayoutSnapshot {
        LayoutSnapshot::new("site-1", Room::new(10.0, 8.0))
    }

    fn entry(n: usize) -> HistorySnapshot {
        let mut layout = layout();
        layout.site_id = Some(format!("step-{}", n));
        HistorySnapshot::new(layout, Vec::new())
    }

    #[test]
    fn test_enter_editor_mode_resets() {
        let mut store = EditorStateStore::new();
        store.set_zoom(2.0);
        store.add_to_history(&entry(0));
        assert!(store.is_dirty());

        store.enter_editor_mode("site-1", Some(layout()));
        assert_eq!(store.mode(), Mode::Editor);
        assert_eq!(store.current_site_id(), Some("site-1"));
        assert!(store.current_layout().is_some());
        assert!(store.selected_objects().is_empty());
        assert!(!store.is_dirty());
        assert_eq!(store.history_index(), -1);
        assert_eq!(store.history_len(), 0);
    }

    #[test]
    fn test_dirty_tracking() {
        let mut store = EditorStateStore::new();
        store.enter_editor_mode("s", None);

        store.set_selected_objects(vec!["a".to_string()]);
        store.set_mode(Mode::Editor);
        assert!(!store.is_dirty());

        store.set_grid_snap(false);
        assert!(store.is_dirty());

        store.mark_as_saved();
        assert!(!store.is_dirty());
        assert!(store.last_saved().is_some());

        store.set_current_layout(Some(layout()));
        assert!(store.is_dirty());

        store.enter_viewer_mode("s", None);
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_notification_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut store = EditorStateStore::new();

        let l = Rc::clone(&log);
        store.subscribe(StateKey::Zoom, move |c| l.borrow_mut().push(format!("key:{}", c.key)));
        let l = Rc::clone(&log);
        store.subscribe_all(move |c| l.borrow_mut().push(format!("all:{}", c.key)));

        store.set_zoom(1.5);
        assert_eq!(
            *log.borrow(),
            vec!["key:zoom", "all:zoom", "all:isDirty"]
        );
    }

    #[test]
    fn test_change_values() {
        let seen = Rc::new(RefCell::new(None));
        let mut store = EditorStateStore::new();
        let s = Rc::clone(&seen);
        store.subscribe(StateKey::ActiveTool, move |c| *s.borrow_mut() = Some(c.clone()));

        store.set_active_tool("wall");
        let change = seen.borrow().clone().unwrap();
        assert_eq!(change.old_value, Value::from("select"));
        assert_eq!(change.new_value, Value::from("wall"));
    }

    #[test]
    fn test_unsubscribe() {
        let count = Rc::new(RefCell::new(0));
        let mut store = EditorStateStore::new();
        let c = Rc::clone(&count);
        let id = store.subscribe_all(move |_| *c.borrow_mut() += 1);

        store.set_grid_snap(false);
        let after_first = *count.borrow();
        assert!(after_first > 0);

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.set_grid_snap(true);
        assert_eq!(*count.borrow(), after_first);
    }

    #[test]
    fn test_invalid_zoom_ignored() {
        let mut store = EditorStateStore::new();
        store.set_zoom(0.0);
        store.set_zoom(f64::NAN);
        assert_eq!(store.zoom(), 1.0);
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_history_cap() {
        let mut store = EditorStateStore::new();
        for i in 0..150 {
            store.add_to_history(&entry(i));
        }
        assert_eq!(store.history_len(), 100);
        assert_eq!(store.history_index(), 99);

        let mut undos = 0;
        while store.undo().is_some() {
            undos += 1;
        }
        assert_eq!(undos, 99);
        assert_eq!(store.history_index(), 0);
    }

    #[test]
    fn test_undo_redo_and_branch_truncation() {
        let mut store = EditorStateStore::new();
        for i in 0..3 {
            store.add_to_history(&entry(i));
        }
        let back = store.undo().unwrap();
        assert_eq!(back.layout.site_id.as_deref(), Some("step-1"));
        assert!(store.can_redo());

        let forward = store.redo().unwrap();
        assert_eq!(forward.layout.site_id.as_deref(), Some("step-2"));
        assert!(store.redo().is_none());
        assert_eq!(store.history_index(), 2);

        store.undo();
        store.undo();
        store.add_to_history(&entry(9));
        assert_eq!(store.history_len(), 2);
        assert_eq!(store.history_index(), 1);
        assert!(!store.can_redo());
    }

    #[test]
    fn test_history_returns_copies() {
        let mut store = EditorStateStore::new();
        let mut snapshot = entry(0);
        store.add_to_history(&snapshot);
        store.add_to_history(&entry(1));
        snapshot.selected_objects.push("mutated".to_string());

        let back = store.undo().unwrap();
        assert!(back.selected_objects.is_empty());
    }

    #[test]
    fn test_empty_history_bounds() {
        let mut store = EditorStateStore::new();
        assert!(store.undo().is_none());
        assert!(store.redo().is_none());
        assert_eq!(store.history_index(), -1);
    }

    #[test]
    fn test_state_key_names() {
        for key in StateKey::ALL {
            assert_eq!(StateKey::from_name(key.as_str()), Some(key));
        }
        assert!(!StateKey::Mode.marks_dirty());
        assert!(StateKey::CurrentLayout.marks_dirty());
    }

    #[test]
    fn test_shared_default_is_shared() {
        let a = shared_default();
        let b = shared_default();
        a.borrow_mut().set_active_tool("desk");
        assert_eq!(b.borrow().active_tool(), "desk");
    }
}
