//! 备份协作接口
//!
//! 保留数量与轮换策略由具体实现决定，编辑核心只关心返回的备份引用。

use crate::codec;
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use fplan_core::snapshot::LayoutSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// 备份引用
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackupRef(String);

impl BackupRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 备份服务
#[allow(async_fn_in_trait)]
pub trait BackupService {
    /// 为站点创建一份快照备份
    async fn create_backup(&self, site_id: &str, snapshot: &LayoutSnapshot) -> Result<BackupRef, StoreError>;
}

/// 备份条目元数据
#[derive(Debug, Clone)]
pub struct BackupInfo {
    pub reference: BackupRef,
    pub created_at: DateTime<Utc>,
    pub size: usize,
}

struct BackupEntry {
    info: BackupInfo,
    payload: Vec<u8>,
}

/// 内存备份存储
///
/// 备份以紧凑编码保存，每个站点最多保留 `max_per_site` 份，超出时丢弃最旧的。
pub struct MemoryBackupStore {
    max_per_site: usize,
    sequence: AtomicU64,
    backups: RwLock<HashMap<String, VecDeque<BackupEntry>>>,
}

impl MemoryBackupStore {
    pub const DEFAULT_MAX_PER_SITE: usize = 10;

    pub fn new() -> Self {
        Self::with_retention(Self::DEFAULT_MAX_PER_SITE)
    }

    pub fn with_retention(max_per_site: usize) -> Self {
        Self {
            max_per_site: max_per_site.max(1),
            sequence: AtomicU64::new(0),
            backups: RwLock::new(HashMap::new()),
        }
    }

    /// 站点的备份列表（由旧到新）
    pub async fn list(&self, site_id: &str) -> Vec<BackupInfo> {
        self.backups
            .read()
            .await
            .get(site_id)
            .map(|entries| entries.iter().map(|e| e.info.clone()).collect())
            .unwrap_or_default()
    }

    /// 取回备份内容
    pub async fn restore(&self, reference: &BackupRef) -> Result<LayoutSnapshot, StoreError> {
        let backups = self.backups.read().await;
        let entry = backups
            .values()
            .flat_map(|entries| entries.iter())
            .find(|e| &e.info.reference == reference)
            .ok_or_else(|| StoreError::BackupNotFound(reference.to_string()))?;
        codec::decode(&entry.payload)
    }
}

impl Default for MemoryBackupStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BackupService for MemoryBackupStore {
    async fn create_backup(&self, site_id: &str, snapshot: &LayoutSnapshot) -> Result<BackupRef, StoreError> {
        let payload = codec::encode(snapshot)?;
        let created_at = Utc::now();
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let reference = BackupRef::new(format!(
            "{}@{}#{}",
            site_id,
            created_at.format("%Y%m%dT%H%M%S"),
            seq
        ));

        let mut backups = self.backups.write().await;
        let entries = backups.entry(site_id.to_string()).or_default();
        entries.push_back(BackupEntry {
            info: BackupInfo {
                reference: reference.clone(),
                created_at,
                size: payload.len(),
            },
            payload,
        });
        while entries.len() > self.max_per_site {
            if let Some(dropped) = entries.pop_front() {
                tracing::debug!("Dropped backup {}", dropped.info.reference);
            }
        }

        tracing::info!("Created backup {} for site {}", reference, site_id);
        Ok(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fplan_core::model::Room;

    #[tokio::test]
    async fn test_create_and_restore() {
        let store = MemoryBackupStore::new();
        let snapshot = LayoutSnapshot::new("site-1", Room::new(10.0, 8.0));

        let reference = store.create_backup("site-1", &snapshot).await.unwrap();
        assert!(reference.as_str().starts_with("site-1@"));

        let restored = store.restore(&reference).await.unwrap();
        assert_eq!(restored, snapshot);
        assert_eq!(store.list("site-1").await.len(), 1);
    }

    #[tokio::test]
    async fn test_retention() {
        let store = MemoryBackupStore::with_retention(2);
        let snapshot = LayoutSnapshot::new("s", Room::new(10.0, 8.0));

        let first = store.create_backup("s", &snapshot).await.unwrap();
        store.create_backup("s", &snapshot).await.unwrap();
        let third = store.create_backup("s", &snapshot).await.unwrap();

        let list = store.list("s").await;
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].reference, third);
        assert!(matches!(store.restore(&first).await, Err(StoreError::BackupNotFound(_))));
    }

    #[tokio::test]
    async fn test_references_are_unique() {
        let store = MemoryBackupStore::new();
        let snapshot = LayoutSnapshot::new("s", Room::new(10.0, 8.0));
        let a = store.create_backup("s", &snapshot).await.unwrap();
        let b = store.create_backup("s", &snapshot).await.unwrap();
        assert_ne!(a, b);
    }
}
