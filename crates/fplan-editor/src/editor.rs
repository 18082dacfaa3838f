//! 场景编辑器
//!
//! 持有设备、墙体、自由组件三个注册表和有序选择集，
//! 负责选择、拖拽、捕捉、删除和从组件面板放置实体。
//!
//! 注册表中的几何数据使用屏幕像素；[`SceneGraphEditor::get_snapshot`]
//! 按 [`EditorConfig::pixels_per_meter`] 换算回米。

use crate::config::EditorConfig;
use crate::visual::Appearance;
use chrono::Utc;
use fplan_core::math::{normalize_degrees, Point2, Rect, Vector2};
use fplan_core::model::{Component, Equipment, FloorPoint, Wall, DEFAULT_WALL_THICKNESS};
use fplan_core::snap::{GridSizeProvider, GridSnap};
use fplan_core::snapshot::LayoutSnapshot;
use nalgebra::Rotation2;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 缩放后的最小边长（像素）
const MIN_SIZE_PX: f64 = 1.0;

/// 实体所属的注册表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Equipment,
    Wall,
    Component,
}

/// 组件面板中的实体类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaletteKind {
    Equipment,
    Desk,
    Pillar,
    Cabinet,
    Door,
    Wall,
}

impl PaletteKind {
    /// 解析面板拖放携带的类型标记（不区分大小写）
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "equipment" | "rack" => Some(Self::Equipment),
            "desk" => Some(Self::Desk),
            "pillar" | "column" => Some(Self::Pillar),
            "cabinet" => Some(Self::Cabinet),
            "door" => Some(Self::Door),
            "wall" => Some(Self::Wall),
            _ => None,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            Self::Equipment => "equipment",
            Self::Desk => "desk",
            Self::Pillar => "pillar",
            Self::Cabinet => "cabinet",
            Self::Door => "door",
            Self::Wall => "wall",
        }
    }

    fn id_prefix(&self) -> &'static str {
        match self {
            Self::Equipment => "eq",
            Self::Wall => "wall",
            other => other.token(),
        }
    }

    /// 默认尺寸（米）；墙体为长度和厚度
    fn default_size(&self) -> (f64, f64) {
        match self {
            Self::Equipment => (0.6, 1.2),
            Self::Desk => (1.4, 0.7),
            Self::Pillar => (0.4, 0.4),
            Self::Cabinet => (0.6, 0.45),
            Self::Door => (0.9, 0.1),
            Self::Wall => (3.0, DEFAULT_WALL_THICKNESS),
        }
    }
}

/// 面板拖放参数（米）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaletteSpec {
    pub width: Option<f64>,
    pub depth: Option<f64>,
    pub rotation: f64,
    pub name: Option<String>,
}

impl PaletteSpec {
    pub fn sized(width: f64, depth: f64) -> Self {
        Self {
            width: Some(width),
            depth: Some(depth),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// 尺寸/角度变换
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    /// 按比例缩放宽/深（墙体为长度/厚度）
    Scale { sx: f64, sy: f64 },
    /// 相对旋转（度）
    Rotate(f64),
}

#[derive(Debug, Clone)]
struct Node<T> {
    data: T,
    appearance: Appearance,
}

impl<T> Node<T> {
    fn new(data: T, appearance: Appearance) -> Self {
        Self { data, appearance }
    }
}

/// 场景编辑器
pub struct SceneGraphEditor {
    config: EditorConfig,
    snap: GridSnap,
    grid_provider: Option<Box<dyn GridSizeProvider>>,
    /// 注册表以外的快照内容（房间、阵列、通道、办公区等）
    base: LayoutSnapshot,
    equipment: BTreeMap<String, Node<Equipment>>,
    walls: BTreeMap<String, Node<Wall>>,
    components: BTreeMap<String, Node<Component>>,
    selection: Vec<String>,
    /// 选中时记录的外观，取消选中时恢复
    baselines: HashMap<String, Appearance>,
}

impl SceneGraphEditor {
    pub fn new(config: EditorConfig) -> Self {
        let snap = GridSnap {
            enabled: config.grid_snap,
            grid_size: config.grid_size_px,
        };
        Self {
            config,
            snap,
            grid_provider: None,
            base: LayoutSnapshot::default(),
            equipment: BTreeMap::new(),
            walls: BTreeMap::new(),
            components: BTreeMap::new(),
            selection: Vec::new(),
            baselines: HashMap::new(),
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    // ========== 网格捕捉 ==========

    pub fn set_grid_snap(&mut self, enabled: bool) {
        self.snap.enabled = enabled;
    }

    pub fn grid_snap_enabled(&self) -> bool {
        self.snap.enabled
    }

    /// 挂接动态网格尺寸（例如随缩放变化）
    pub fn set_grid_provider(&mut self, provider: Box<dyn GridSizeProvider>) {
        self.grid_provider = Some(provider);
    }

    pub fn clear_grid_provider(&mut self) {
        self.grid_provider = None;
    }

    /// 当前生效的网格尺寸（像素）
    pub fn grid_size(&self) -> f64 {
        self.grid_provider
            .as_ref()
            .map_or(self.snap.grid_size, |p| p.grid_size())
    }

    fn snap_point(&self, point: Point2) -> Point2 {
        self.snap.snap_with(point, self.grid_size())
    }

    // ========== 加载与快照 ==========

    /// 加载布局；没有单独放置的设备时展开设备阵列
    pub fn load(&mut self, snapshot: &LayoutSnapshot) {
        self.load_inner(snapshot, true);
    }

    /// 按原样恢复布局（不展开阵列），用于撤销/重做
    pub fn restore(&mut self, snapshot: &LayoutSnapshot) {
        self.load_inner(snapshot, false);
    }

    fn load_inner(&mut self, snapshot: &LayoutSnapshot, materialize: bool) {
        self.clear();

        let equipment = if materialize {
            snapshot.equipment_instances()
        } else {
            snapshot.equipment.clone()
        };
        for e in equipment {
            let e = self.equipment_to_pixels(e);
            if let Some(old) = self.equipment.insert(e.id.clone(), Node::new(e, Appearance::equipment())) {
                warn!("Duplicate equipment id {} in layout, keeping the last one", old.data.id);
            }
        }
        for wall in snapshot.walls() {
            let wall = self.wall_to_pixels(wall.clone());
            if let Some(old) = self.walls.insert(wall.id.clone(), Node::new(wall, Appearance::wall())) {
                warn!("Duplicate wall id {} in layout, keeping the last one", old.data.id);
            }
        }
        for c in &snapshot.components {
            let c = self.component_to_pixels(c.clone());
            if let Some(old) = self.components.insert(c.id.clone(), Node::new(c, Appearance::component())) {
                warn!("Duplicate component id {} in layout, keeping the last one", old.data.id);
            }
        }

        let mut base = snapshot.clone();
        base.equipment.clear();
        base.components.clear();
        self.base = base;

        info!(
            "Loaded layout: {} equipment, {} walls, {} components",
            self.equipment.len(),
            self.walls.len(),
            self.components.len()
        );
    }

    /// 清空注册表和选择集
    pub fn clear(&mut self) {
        self.equipment.clear();
        self.walls.clear();
        self.components.clear();
        self.selection.clear();
        self.baselines.clear();
        self.base = LayoutSnapshot::default();
    }

    /// 导出规范快照（米）
    pub fn get_snapshot(&self) -> LayoutSnapshot {
        let mut snapshot = self.base.clone();
        snapshot.equipment = self
            .equipment
            .values()
            .map(|n| self.equipment_to_meters(n.data.clone()))
            .collect();
        snapshot.components = self
            .components
            .values()
            .map(|n| self.component_to_meters(n.data.clone()))
            .collect();
        if !self.walls.is_empty() || self.base.walls.is_some() {
            snapshot.walls = Some(
                self.walls
                    .values()
                    .map(|n| self.wall_to_meters(n.data.clone()))
                    .collect(),
            );
        }
        // 阵列已经展开到设备注册表中
        snapshot.arrays_materialized = !snapshot.equipment_arrays().is_empty();
        snapshot
    }

    // ========== 查询 ==========

    pub fn contains(&self, id: &str) -> bool {
        self.kind_of(id).is_some()
    }

    pub fn kind_of(&self, id: &str) -> Option<EntityKind> {
        if self.equipment.contains_key(id) {
            Some(EntityKind::Equipment)
        } else if self.walls.contains_key(id) {
            Some(EntityKind::Wall)
        } else if self.components.contains_key(id) {
            Some(EntityKind::Component)
        } else {
            None
        }
    }

    pub fn equipment_count(&self) -> usize {
        self.equipment.len()
    }

    pub fn wall_count(&self) -> usize {
        self.walls.len()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// 设备（像素坐标）
    pub fn equipment(&self, id: &str) -> Option<&Equipment> {
        self.equipment.get(id).map(|n| &n.data)
    }

    pub fn wall(&self, id: &str) -> Option<&Wall> {
        self.walls.get(id).map(|n| &n.data)
    }

    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.get(id).map(|n| &n.data)
    }

    /// 当前选择（按选中顺序）
    pub fn selection(&self) -> &[String] {
        &self.selection
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.iter().any(|s| s == id)
    }

    /// 实体当前外观
    pub fn visual(&self, id: &str) -> Option<Appearance> {
        self.equipment
            .get(id)
            .map(|n| n.appearance)
            .or_else(|| self.walls.get(id).map(|n| n.appearance))
            .or_else(|| self.components.get(id).map(|n| n.appearance))
    }

    /// 设置实体外观；选中状态下只更新取消选中后恢复的外观
    pub fn set_visual(&mut self, id: &str, appearance: Appearance) -> bool {
        if let Some(baseline) = self.baselines.get_mut(id) {
            *baseline = appearance;
            return true;
        }
        match self.appearance_mut(id) {
            Some(current) => {
                *current = appearance;
                true
            }
            None => {
                warn!("set_visual: unknown entity {}", id);
                false
            }
        }
    }

    fn appearance_mut(&mut self, id: &str) -> Option<&mut Appearance> {
        if let Some(n) = self.equipment.get_mut(id) {
            return Some(&mut n.appearance);
        }
        if let Some(n) = self.walls.get_mut(id) {
            return Some(&mut n.appearance);
        }
        self.components.get_mut(id).map(|n| &mut n.appearance)
    }

    /// 实体包围盒（像素）
    pub fn bounds_of(&self, id: &str) -> Option<Rect> {
        self.equipment
            .get(id)
            .map(|n| n.data.footprint())
            .or_else(|| self.walls.get(id).map(|n| n.data.bounding_rect(0.0)))
            .or_else(|| self.components.get(id).map(|n| n.data.rect()))
    }

    fn all_ids(&self) -> Vec<String> {
        self.equipment
            .keys()
            .chain(self.walls.keys())
            .chain(self.components.keys())
            .cloned()
            .collect()
    }

    // ========== 选择 ==========

    /// 选中实体
    ///
    /// `multi` 为 false 时先取消其他选择并恢复它们的外观。未知 ID 只记录警告。
    pub fn select(&mut self, id: &str, multi: bool) -> bool {
        if !self.contains(id) {
            warn!("select: unknown entity {}", id);
            return false;
        }
        if !multi {
            let others: Vec<String> = self.selection.iter().filter(|s| *s != id).cloned().collect();
            for other in others {
                self.deselect(&other);
            }
        }
        if self.is_selected(id) {
            return true;
        }

        if let Some(appearance) = self.appearance_mut(id) {
            let baseline = std::mem::replace(appearance, Appearance::highlight());
            self.baselines.insert(id.to_string(), baseline);
        }
        self.selection.push(id.to_string());
        debug!("Selected {} ({} selected)", id, self.selection.len());
        true
    }

    /// 取消选中并恢复外观（幂等）
    pub fn deselect(&mut self, id: &str) {
        let before = self.selection.len();
        self.selection.retain(|s| s != id);
        if self.selection.len() == before {
            return;
        }
        if let Some(baseline) = self.baselines.remove(id) {
            if let Some(appearance) = self.appearance_mut(id) {
                *appearance = baseline;
            }
        }
    }

    pub fn deselect_all(&mut self) {
        for id in std::mem::take(&mut self.selection) {
            if let Some(baseline) = self.baselines.remove(&id) {
                if let Some(appearance) = self.appearance_mut(&id) {
                    *appearance = baseline;
                }
            }
        }
        self.baselines.clear();
    }

    /// 框选：选中完全落在 `rect`（像素）内的实体，返回新增的数量
    pub fn select_in_rect(&mut self, rect: Rect, multi: bool) -> usize {
        if !multi {
            self.deselect_all();
        }
        let hits: Vec<String> = self
            .all_ids()
            .into_iter()
            .filter(|id| !self.is_selected(id))
            .filter(|id| self.bounds_of(id).is_some_and(|b| rect.contains_rect(&b)))
            .collect();
        for id in &hits {
            self.select(id, true);
        }
        hits.len()
    }

    // ========== 变换 ==========

    fn anchor(&self, id: &str) -> Option<Point2> {
        self.equipment
            .get(id)
            .map(|n| Point2::new(n.data.x, n.data.y))
            .or_else(|| self.walls.get(id).map(|n| n.data.start.to_point2()))
            .or_else(|| self.components.get(id).map(|n| Point2::new(n.data.x, n.data.y)))
    }

    fn set_anchor(&mut self, id: &str, p: Point2) {
        if let Some(n) = self.equipment.get_mut(id) {
            n.data.x = p.x;
            n.data.y = p.y;
        } else if let Some(n) = self.walls.get_mut(id) {
            let dx = p.x - n.data.start.x;
            let dz = p.y - n.data.start.z;
            n.data.start = FloorPoint::new(p.x, p.y);
            n.data.end = FloorPoint::new(n.data.end.x + dx, n.data.end.z + dz);
        } else if let Some(n) = self.components.get_mut(id) {
            n.data.x = p.x;
            n.data.y = p.y;
        }
    }

    /// 拖拽到新位置（像素）；启用捕捉时按当前网格取整。返回最终位置
    pub fn drag_transform(&mut self, id: &str, new_position: Point2) -> Option<Point2> {
        if !self.contains(id) {
            warn!("drag_transform: unknown entity {}", id);
            return None;
        }
        let p = self.snap_point(new_position);
        self.set_anchor(id, p);
        Some(p)
    }

    /// 平移所有选中实体，返回移动的数量
    pub fn move_selected(&mut self, dx: f64, dy: f64) -> usize {
        let ids = self.selection.clone();
        let mut moved = 0;
        for id in ids {
            if let Some(anchor) = self.anchor(&id) {
                let p = self.snap_point(Point2::new(anchor.x + dx, anchor.y + dy));
                self.set_anchor(&id, p);
                moved += 1;
            }
        }
        moved
    }

    /// 缩放或旋转单个实体
    pub fn transform(&mut self, id: &str, transform: Transform) -> bool {
        match transform {
            Transform::Scale { sx, sy } if !(sx > 0.0 && sy > 0.0 && sx.is_finite() && sy.is_finite()) => {
                warn!("transform: invalid scale factors ({}, {}) for {}", sx, sy, id);
                return false;
            }
            Transform::Rotate(deg) if !deg.is_finite() => {
                warn!("transform: invalid rotation {} for {}", deg, id);
                return false;
            }
            _ => {}
        }

        if let Some(n) = self.equipment.get_mut(id) {
            match transform {
                Transform::Scale { sx, sy } => {
                    n.data.width = (n.data.width * sx).max(MIN_SIZE_PX);
                    n.data.depth = (n.data.depth * sy).max(MIN_SIZE_PX);
                }
                Transform::Rotate(deg) => n.data.rotation = normalize_degrees(n.data.rotation + deg),
            }
        } else if let Some(n) = self.components.get_mut(id) {
            match transform {
                Transform::Scale { sx, sy } => {
                    n.data.width = (n.data.width * sx).max(MIN_SIZE_PX);
                    n.data.depth = (n.data.depth * sy).max(MIN_SIZE_PX);
                }
                Transform::Rotate(deg) => n.data.rotation = normalize_degrees(n.data.rotation + deg),
            }
        } else if let Some(n) = self.walls.get_mut(id) {
            let start = n.data.start.to_point2();
            let direction = n.data.end.to_point2() - start;
            let end = match transform {
                Transform::Scale { sx, sy } => {
                    n.data.thickness = (n.data.thickness * sy).max(MIN_SIZE_PX);
                    let length = direction.norm();
                    if length > 0.0 {
                        start + direction * ((length * sx).max(MIN_SIZE_PX) / length)
                    } else {
                        start
                    }
                }
                Transform::Rotate(deg) => start + Rotation2::new(deg.to_radians()) * direction,
            };
            n.data.end = FloorPoint::new(end.x, end.y);
        } else {
            warn!("transform: unknown entity {}", id);
            return false;
        }
        true
    }

    // ========== 删除与创建 ==========

    /// 删除所有选中实体，返回被删除的 ID
    pub fn delete_selected(&mut self) -> Vec<String> {
        let ids = std::mem::take(&mut self.selection);
        let mut removed = Vec::with_capacity(ids.len());
        for id in ids {
            self.baselines.remove(&id);
            // 同一 ID 可能出现在多个注册表中，全部移除
            let existed = [
                self.equipment.remove(&id).is_some(),
                self.walls.remove(&id).is_some(),
                self.components.remove(&id).is_some(),
            ]
            .contains(&true);
            if existed {
                removed.push(id);
            } else {
                warn!("delete_selected: {} was selected but not registered", id);
            }
        }
        self.deselect_all();
        if !removed.is_empty() {
            info!("Deleted {} entities", removed.len());
        }
        removed
    }

    /// 生成唯一 ID：时间戳 + 随机后缀
    fn generate_id(&self, prefix: &str) -> String {
        loop {
            let suffix = Uuid::new_v4().simple().to_string();
            let id = format!("{}-{}-{}", prefix, Utc::now().timestamp_millis(), &suffix[..8]);
            if !self.contains(&id) {
                return id;
            }
        }
    }

    /// 从组件面板放置实体，返回新实体 ID；未知类型只记录警告
    pub fn create_from_palette_drop(
        &mut self,
        token: &str,
        world_x: f64,
        world_y: f64,
        spec: &PaletteSpec,
    ) -> Option<String> {
        let Some(kind) = PaletteKind::from_token(token) else {
            warn!("create_from_palette_drop: unknown palette type '{}'", token);
            return None;
        };

        let (default_w, default_d) = kind.default_size();
        let width = self.config.to_pixels(spec.width.filter(|w| *w > 0.0).unwrap_or(default_w));
        let depth = self.config.to_pixels(spec.depth.filter(|d| *d > 0.0).unwrap_or(default_d));
        let p = self.snap_point(Point2::new(world_x, world_y));
        let id = self.generate_id(kind.id_prefix());

        match kind {
            PaletteKind::Equipment => {
                let mut e = Equipment::new(id.clone(), p.x, p.y, width, depth)
                    .with_rotation(normalize_degrees(spec.rotation));
                e.name = spec.name.clone().unwrap_or_default();
                self.equipment.insert(id.clone(), Node::new(e, Appearance::equipment()));
            }
            PaletteKind::Wall => {
                let end = p + Rotation2::new(spec.rotation.to_radians()) * Vector2::new(width, 0.0);
                let wall = Wall::new(id.clone(), FloorPoint::new(p.x, p.y), FloorPoint::new(end.x, end.y))
                    .with_thickness(depth);
                self.walls.insert(id.clone(), Node::new(wall, Appearance::wall()));
            }
            _ => {
                let c = Component {
                    id: id.clone(),
                    kind: kind.token().to_string(),
                    x: p.x,
                    y: p.y,
                    width,
                    depth,
                    rotation: normalize_degrees(spec.rotation),
                    label: spec.name.clone(),
                };
                self.components.insert(id.clone(), Node::new(c, Appearance::component()));
            }
        }

        info!("Created {} {} at ({:.1}, {:.1})", kind.token(), id, p.x, p.y);
        Some(id)
    }

    // ========== 单位换算 ==========

    fn equipment_to_pixels(&self, mut e: Equipment) -> Equipment {
        let s = self.config.pixels_per_meter;
        e.x *= s;
        e.y *= s;
        e.width *= s;
        e.depth *= s;
        e
    }

    fn equipment_to_meters(&self, mut e: Equipment) -> Equipment {
        e.x = self.config.to_meters(e.x);
        e.y = self.config.to_meters(e.y);
        e.width = self.config.to_meters(e.width);
        e.depth = self.config.to_meters(e.depth);
        e
    }

    fn component_to_pixels(&self, mut c: Component) -> Component {
        let s = self.config.pixels_per_meter;
        c.x *= s;
        c.y *= s;
        c.width *= s;
        c.depth *= s;
        c
    }

    fn component_to_meters(&self, mut c: Component) -> Component {
        c.x = self.config.to_meters(c.x);
        c.y = self.config.to_meters(c.y);
        c.width = self.config.to_meters(c.width);
        c.depth = self.config.to_meters(c.depth);
        c
    }

    fn wall_to_pixels(&self, mut w: Wall) -> Wall {
        let s = self.config.pixels_per_meter;
        w.start = FloorPoint::new(w.start.x * s, w.start.z * s);
        w.end = FloorPoint::new(w.end.x * s, w.end.z * s);
        w.thickness *= s;
        w
    }

    fn wall_to_meters(&self, mut w: Wall) -> Wall {
        let c = &self.config;
        w.start = FloorPoint::new(c.to_meters(w.start.x), c.to_meters(w.start.z));
        w.end = FloorPoint::new(c.to_meters(w.end.x), c.to_meters(w.end.z));
        w.thickness = c.to_meters(w.thickness);
        w
    }
}

impl Default for SceneGraphEditor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}
