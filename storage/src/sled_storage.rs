// storage/src/sled_storage.rs

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sled::Tree;
use tokio::time::timeout;
use tracing::{debug, info};

use models::{
    EmergencyProfile, NewProfile, ProfileError, ProfileId, ProfileResult, ProfileUpdate,
};

use crate::ProfileStorageEngine;
use crate::storage_utils::{deserialize_profile, serialize_profile};

const PROFILES_TREE: &str = "profiles";

/// Deadline for a single tree call. A wedged store fails fast with
/// `ProfileError::Timeout` instead of hanging the caller.
const OP_TIMEOUT: Duration = Duration::from_secs(5);

/// Sled-backed implementation of the `ProfileStorageEngine` trait. Keys are
/// the raw 16-byte id, values are bincode-encoded records.
pub struct SledProfileStorage {
    tree: Tree,
}

impl SledProfileStorage {
    /// Opens (or creates) the database at `path` and the "profiles" tree
    /// inside it.
    pub fn open(path: &Path) -> ProfileResult<Self> {
        info!("Opening sled database at {:?}", path);
        let db = sled::open(path).map_err(|e| {
            ProfileError::StorageError(format!(
                "Failed to open sled database at {:?}: {}. Ensure the directory is accessible.",
                path, e
            ))
        })?;
        let tree = db
            .open_tree(PROFILES_TREE)
            .map_err(|e| ProfileError::StorageError(e.to_string()))?;
        Ok(Self { tree })
    }

    /// Runs a blocking sled operation off the async runtime, bounded by
    /// `OP_TIMEOUT`.
    async fn run_blocking<T, F>(&self, op: &'static str, f: F) -> ProfileResult<T>
    where
        F: FnOnce(Tree) -> ProfileResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let tree = self.tree.clone();
        let task = tokio::task::spawn_blocking(move || f(tree));
        match timeout(OP_TIMEOUT, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(ProfileError::InternalError(format!(
                "storage task failed to join: {}",
                join_err
            ))),
            Err(_) => Err(ProfileError::Timeout(op)),
        }
    }
}

#[async_trait]
impl ProfileStorageEngine for SledProfileStorage {
    async fn create(&self, payload: NewProfile) -> ProfileResult<EmergencyProfile> {
        // Validation happens before the store is touched; a rejected payload
        // leaves nothing behind.
        let profile = payload.into_profile(ProfileId::generate(), Utc::now())?;
        let key = *profile.id.as_bytes();
        let bytes = serialize_profile(&profile)?;
        self.run_blocking("create", move |tree| {
            tree.insert(key, bytes)
                .map_err(|e| ProfileError::StorageError(e.to_string()))?;
            tree.flush()
                .map_err(|e| ProfileError::StorageError(e.to_string()))?;
            Ok(())
        })
        .await?;
        debug!("Created profile {}", profile.id);
        Ok(profile)
    }

    async fn get(&self, id: &ProfileId) -> ProfileResult<Option<EmergencyProfile>> {
        let key = *id.as_bytes();
        self.run_blocking("get", move |tree| {
            match tree
                .get(key)
                .map_err(|e| ProfileError::StorageError(e.to_string()))?
            {
                Some(value) => Ok(Some(deserialize_profile(&value)?)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn list_all(&self) -> ProfileResult<Vec<EmergencyProfile>> {
        let mut profiles = self
            .run_blocking("list_all", move |tree| {
                let mut out = Vec::with_capacity(tree.len());
                for entry in tree.iter() {
                    let (_, value) =
                        entry.map_err(|e| ProfileError::StorageError(e.to_string()))?;
                    out.push(deserialize_profile(&value)?);
                }
                Ok(out)
            })
            .await?;
        profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(profiles)
    }

    async fn update(
        &self,
        id: &ProfileId,
        update: ProfileUpdate,
    ) -> ProfileResult<EmergencyProfile> {
        // Read-merge-write without locking: two racing updates to the same id
        // resolve last-write-wins, which is the accepted contract.
        let mut profile = self.get(id).await?.ok_or(ProfileError::NotFound(*id))?;
        profile.apply_update(update, Utc::now())?;
        let key = *id.as_bytes();
        let bytes = serialize_profile(&profile)?;
        self.run_blocking("update", move |tree| {
            tree.insert(key, bytes)
                .map_err(|e| ProfileError::StorageError(e.to_string()))?;
            tree.flush()
                .map_err(|e| ProfileError::StorageError(e.to_string()))?;
            Ok(())
        })
        .await?;
        debug!("Updated profile {}", profile.id);
        Ok(profile)
    }

    async fn delete(&self, id: &ProfileId) -> ProfileResult<()> {
        let key = *id.as_bytes();
        let removed = self
            .run_blocking("delete", move |tree| {
                let previous = tree
                    .remove(key)
                    .map_err(|e| ProfileError::StorageError(e.to_string()))?;
                tree.flush()
                    .map_err(|e| ProfileError::StorageError(e.to_string()))?;
                Ok(previous.is_some())
            })
            .await?;
        if removed {
            debug!("Deleted profile {}", id);
            Ok(())
        } else {
            Err(ProfileError::NotFound(*id))
        }
    }

    async fn count(&self) -> ProfileResult<usize> {
        self.run_blocking("count", move |tree| Ok(tree.len())).await
    }

    fn engine_kind(&self) -> &'static str {
        "sled"
    }
}
