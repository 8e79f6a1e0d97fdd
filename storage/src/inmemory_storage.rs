// storage/src/inmemory_storage.rs

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use models::{
    EmergencyProfile, NewProfile, ProfileError, ProfileId, ProfileResult, ProfileUpdate,
};

use crate::ProfileStorageEngine;

/// Map-backed implementation of the `ProfileStorageEngine` trait. No
/// durability; used by tests and as a drop-in engine where persistence is not
/// wanted.
#[derive(Debug, Default)]
pub struct InMemoryProfileStorage {
    profiles: Arc<RwLock<HashMap<ProfileId, EmergencyProfile>>>,
}

impl InMemoryProfileStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStorageEngine for InMemoryProfileStorage {
    async fn create(&self, payload: NewProfile) -> ProfileResult<EmergencyProfile> {
        let profile = payload.into_profile(ProfileId::generate(), Utc::now())?;
        let mut profiles = self.profiles.write().await;
        profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }

    async fn get(&self, id: &ProfileId) -> ProfileResult<Option<EmergencyProfile>> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(id).cloned())
    }

    async fn list_all(&self) -> ProfileResult<Vec<EmergencyProfile>> {
        let profiles = self.profiles.read().await;
        let mut all: Vec<EmergencyProfile> = profiles.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn update(
        &self,
        id: &ProfileId,
        update: ProfileUpdate,
    ) -> ProfileResult<EmergencyProfile> {
        let mut profiles = self.profiles.write().await;
        let current = profiles.get(id).ok_or(ProfileError::NotFound(*id))?;
        let mut merged = current.clone();
        merged.apply_update(update, Utc::now())?;
        profiles.insert(*id, merged.clone());
        Ok(merged)
    }

    async fn delete(&self, id: &ProfileId) -> ProfileResult<()> {
        let mut profiles = self.profiles.write().await;
        profiles.remove(id).map(|_| ()).ok_or(ProfileError::NotFound(*id))
    }

    async fn count(&self) -> ProfileResult<usize> {
        let profiles = self.profiles.read().await;
        Ok(profiles.len())
    }

    fn engine_kind(&self) -> &'static str {
        "in-memory"
    }
}
