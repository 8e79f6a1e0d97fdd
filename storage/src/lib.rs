// storage/src/lib.rs

pub mod inmemory_storage;
pub mod sled_storage;
mod storage_utils;

use async_trait::async_trait;
use models::{EmergencyProfile, NewProfile, ProfileId, ProfileResult, ProfileUpdate};

pub use inmemory_storage::InMemoryProfileStorage;
pub use sled_storage::SledProfileStorage;

/// The record store contract. Each call is a single atomic write or read
/// against one record; concurrent updates to the same id resolve
/// last-write-wins.
#[async_trait]
pub trait ProfileStorageEngine: Send + Sync + 'static {
    /// Validates the payload, assigns a fresh id and timestamps, persists,
    /// and returns the stored record. Nothing is persisted on a validation
    /// failure.
    async fn create(&self, payload: NewProfile) -> ProfileResult<EmergencyProfile>;
    /// Retrieves a profile by id. Id syntax is checked by the caller
    /// (`ProfileId::parse`), so a malformed id never reaches the engine.
    async fn get(&self, id: &ProfileId) -> ProfileResult<Option<EmergencyProfile>>;
    /// Returns all profiles, newest-created-first.
    async fn list_all(&self) -> ProfileResult<Vec<EmergencyProfile>>;
    /// Merges the allow-listed fields into the existing record, re-validates
    /// the merged result, refreshes `updated_at`, and persists it.
    async fn update(&self, id: &ProfileId, update: ProfileUpdate) -> ProfileResult<EmergencyProfile>;
    /// Deletes a profile. `NotFound` if no record has that id.
    async fn delete(&self, id: &ProfileId) -> ProfileResult<()>;
    /// Number of stored profiles, for health reporting.
    async fn count(&self) -> ProfileResult<usize>;
    /// Short name of the backing engine, e.g. "sled".
    fn engine_kind(&self) -> &'static str;
}
