// storage/src/storage_utils.rs

use models::{EmergencyProfile, ProfileError, ProfileResult};

/// Helper to serialize a profile to bytes for storage.
pub(crate) fn serialize_profile(profile: &EmergencyProfile) -> ProfileResult<Vec<u8>> {
    serde_json::to_vec(profile).map_err(|e| ProfileError::SerializationError(e.to_string()))
}

/// Helper to deserialize stored bytes back into a profile.
pub(crate) fn deserialize_profile(bytes: &[u8]) -> ProfileResult<EmergencyProfile> {
    serde_json::from_slice(bytes).map_err(|e| ProfileError::DeserializationError(e.to_string()))
}
