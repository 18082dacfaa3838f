//! 布局持久化协作接口
//!
//! 编辑核心只通过 [`LayoutStore`] 读写布局，不关心存储介质。
//! 重试与退避策略属于具体实现。

use crate::backup::{BackupRef, BackupService};
use crate::error::StoreError;
use crate::templates::{BuiltinTemplates, TemplateCatalog};
use chrono::Utc;
use fplan_core::snapshot::{LayoutSnapshot, LAYOUT_VERSION};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// 保存选项
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// 保存前为旧版本创建备份
    pub create_backup: bool,
    /// 调用方持有的上一版本；为空时使用存储中的当前版本
    pub previous_snapshot: Option<LayoutSnapshot>,
}

/// 保存回执
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReceipt {
    pub success: bool,
    pub backup_ref: Option<BackupRef>,
    pub version: u64,
}

/// 布局存储
#[allow(async_fn_in_trait)]
pub trait LayoutStore {
    async fn exists(&self, site_id: &str) -> Result<bool, StoreError>;

    /// 读取站点布局，不存在时返回 [`StoreError::NotFound`]
    async fn load(&self, site_id: &str) -> Result<LayoutSnapshot, StoreError>;

    async fn save(
        &self,
        site_id: &str,
        snapshot: &LayoutSnapshot,
        options: SaveOptions,
    ) -> Result<SaveReceipt, StoreError>;

    async fn load_template(&self, name: &str) -> Result<LayoutSnapshot, StoreError>;
}

struct StoredLayout {
    snapshot: LayoutSnapshot,
    version: u64,
}

/// 内存布局存储
pub struct MemoryLayoutStore<B> {
    layouts: RwLock<HashMap<String, StoredLayout>>,
    backups: B,
    templates: BuiltinTemplates,
}

impl<B: BackupService> MemoryLayoutStore<B> {
    pub fn new(backups: B) -> Self {
        Self::with_templates(backups, BuiltinTemplates::new())
    }

    pub fn with_templates(backups: B, templates: BuiltinTemplates) -> Self {
        Self {
            layouts: RwLock::new(HashMap::new()),
            backups,
            templates,
        }
    }

    pub fn backups(&self) -> &B {
        &self.backups
    }

    pub fn templates(&self) -> &BuiltinTemplates {
        &self.templates
    }

    /// 当前存储的版本号（不存在时为 0）
    pub async fn version(&self, site_id: &str) -> u64 {
        self.layouts
            .read()
            .await
            .get(site_id)
            .map_or(0, |stored| stored.version)
    }
}

impl<B: BackupService> LayoutStore for MemoryLayoutStore<B> {
    async fn exists(&self, site_id: &str) -> Result<bool, StoreError> {
        Ok(self.layouts.read().await.contains_key(site_id))
    }

    async fn load(&self, site_id: &str) -> Result<LayoutSnapshot, StoreError> {
        self.layouts
            .read()
            .await
            .get(site_id)
            .map(|stored| stored.snapshot.clone())
            .ok_or_else(|| StoreError::NotFound(site_id.to_string()))
    }

    async fn save(
        &self,
        site_id: &str,
        snapshot: &LayoutSnapshot,
        options: SaveOptions,
    ) -> Result<SaveReceipt, StoreError> {
        let (previous, version) = {
            let layouts = self.layouts.read().await;
            let stored = layouts.get(site_id);
            (
                options
                    .previous_snapshot
                    .or_else(|| stored.map(|s| s.snapshot.clone())),
                stored.map_or(0, |s| s.version),
            )
        };

        let backup_ref = match (&previous, options.create_backup) {
            (Some(previous), true) => Some(self.backups.create_backup(site_id, previous).await?),
            _ => None,
        };

        let now = Utc::now();
        let mut stamped = snapshot.clone();
        stamped.site_id = Some(site_id.to_string());
        stamped.created_at = previous
            .as_ref()
            .and_then(|p| p.created_at)
            .or(snapshot.created_at)
            .or(Some(now));
        stamped.updated_at = Some(now);
        if stamped.layout_version.is_none() {
            stamped.layout_version = Some(LAYOUT_VERSION.to_string());
        }

        let version = version + 1;
        self.layouts.write().await.insert(
            site_id.to_string(),
            StoredLayout {
                snapshot: stamped,
                version,
            },
        );

        tracing::info!("Saved layout for site {} (version {})", site_id, version);
        Ok(SaveReceipt {
            success: true,
            backup_ref,
            version,
        })
    }

    async fn load_template(&self, name: &str) -> Result<LayoutSnapshot, StoreError> {
        self.templates
            .get(name)
            .ok_or_else(|| StoreError::TemplateNotFound(name.to_string()))
    }
}
