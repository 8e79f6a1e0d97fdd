// models/src/profile.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ValidationError, ValidationResult};
use crate::identifiers::ProfileId;

/// The blood groups accepted at registration. Any other wire value is
/// rejected, both by serde and by `FromStr`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum BloodGroup {
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    AbNegative,
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    ONegative,
    Unknown,
}

impl BloodGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            BloodGroup::APositive => "A+",
            BloodGroup::ANegative => "A-",
            BloodGroup::BPositive => "B+",
            BloodGroup::BNegative => "B-",
            BloodGroup::AbPositive => "AB+",
            BloodGroup::AbNegative => "AB-",
            BloodGroup::OPositive => "O+",
            BloodGroup::ONegative => "O-",
            BloodGroup::Unknown => "Unknown",
        }
    }
}

impl FromStr for BloodGroup {
    type Err = ValidationError;

    fn from_str(s: &str) -> ValidationResult<Self> {
        match s {
            "A+" => Ok(BloodGroup::APositive),
            "A-" => Ok(BloodGroup::ANegative),
            "B+" => Ok(BloodGroup::BPositive),
            "B-" => Ok(BloodGroup::BNegative),
            "AB+" => Ok(BloodGroup::AbPositive),
            "AB-" => Ok(BloodGroup::AbNegative),
            "O+" => Ok(BloodGroup::OPositive),
            "O-" => Ok(BloodGroup::ONegative),
            "Unknown" => Ok(BloodGroup::Unknown),
            other => Err(ValidationError::InvalidBloodGroup(other.to_string())),
        }
    }
}

impl fmt::Display for BloodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Gender as reported by the registrant. Optional; the empty wire value maps
/// to `Unspecified`.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Gender {
    Male,
    Female,
    Other,
    #[serde(rename = "Prefer not to say")]
    PreferNotToSay,
    #[default]
    #[serde(rename = "")]
    Unspecified,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
            Gender::PreferNotToSay => "Prefer not to say",
            Gender::Unspecified => "",
        }
    }
}

impl FromStr for Gender {
    type Err = ValidationError;

    fn from_str(s: &str) -> ValidationResult<Self> {
        match s {
            "Male" => Ok(Gender::Male),
            "Female" => Ok(Gender::Female),
            "Other" => Ok(Gender::Other),
            "Prefer not to say" => Ok(Gender::PreferNotToSay),
            "" => Ok(Gender::Unspecified),
            other => Err(ValidationError::InvalidGender(other.to_string())),
        }
    }
}

/// Who to call. Name and phone are required for a persisted record.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct EmergencyContact {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub relationship: String,
}

/// Treating physician, all fields optional.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct PrimaryPhysician {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub hospital: String,
}

/// A stored emergency profile. This is the only entity the service manages;
/// the wire format is the camelCase JSON the original clients expect.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyProfile {
    pub id: ProfileId,
    pub name: String,
    #[serde(default)]
    pub gender: Gender,
    pub age: u32,
    /// Height in centimeters; absent (not zero) when unreported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,
    /// Weight in kilograms; absent (not zero) when unreported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    pub blood_group: BloodGroup,
    #[serde(default)]
    pub medical_history: String,
    #[serde(default)]
    pub current_medications: String,
    #[serde(default)]
    pub chronic_conditions: String,
    #[serde(default)]
    pub allergies: String,
    pub emergency_contact: EmergencyContact,
    #[serde(default)]
    pub primary_physician: PrimaryPhysician,
    #[serde(default)]
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The registration payload: everything a profile carries except the
/// system-assigned id and timestamps. Required fields are checked by
/// `validate`, not by serde, so a missing field reports its name instead of
/// failing the whole parse.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub blood_group: Option<BloodGroup>,
    #[serde(default)]
    pub medical_history: String,
    #[serde(default)]
    pub current_medications: String,
    #[serde(default)]
    pub chronic_conditions: String,
    #[serde(default)]
    pub allergies: String,
    #[serde(default)]
    pub emergency_contact: EmergencyContact,
    #[serde(default)]
    pub primary_physician: PrimaryPhysician,
    #[serde(default)]
    pub address: String,
}

/// A partial update. Only the fields listed here can be changed; the id and
/// timestamps are structurally absent, so they cannot be overwritten by a
/// caller-supplied body. Unknown fields in the payload are ignored.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub age: Option<u32>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub blood_group: Option<BloodGroup>,
    pub medical_history: Option<String>,
    pub current_medications: Option<String>,
    pub chronic_conditions: Option<String>,
    pub allergies: Option<String>,
    pub emergency_contact: Option<EmergencyContact>,
    pub primary_physician: Option<PrimaryPhysician>,
    pub address: Option<String>,
}

fn check_non_negative(field: &'static str, value: Option<f64>) -> ValidationResult<()> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(ValidationError::NegativeValue(field)),
        _ => Ok(()),
    }
}

impl NewProfile {
    /// Pure check of the registration payload: required fields present and
    /// non-empty, numeric fields non-negative. Enum membership is already
    /// guaranteed by the typed `blood_group`/`gender` fields.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if self.age.is_none() {
            return Err(ValidationError::MissingField("age"));
        }
        if self.blood_group.is_none() {
            return Err(ValidationError::MissingField("bloodGroup"));
        }
        if self.emergency_contact.name.trim().is_empty() {
            return Err(ValidationError::MissingField("emergencyContact.name"));
        }
        if self.emergency_contact.phone.trim().is_empty() {
            return Err(ValidationError::MissingField("emergencyContact.phone"));
        }
        check_non_negative("heightCm", self.height_cm)?;
        check_non_negative("weightKg", self.weight_kg)?;
        Ok(())
    }

    /// Validates and turns the payload into a stored profile with the given
    /// id and creation instant.
    pub fn into_profile(self, id: ProfileId, now: DateTime<Utc>) -> ValidationResult<EmergencyProfile> {
        self.validate()?;
        let age = self.age.ok_or(ValidationError::MissingField("age"))?;
        let blood_group = self
            .blood_group
            .ok_or(ValidationError::MissingField("bloodGroup"))?;
        Ok(EmergencyProfile {
            id,
            name: self.name.trim().to_string(),
            gender: self.gender,
            age,
            height_cm: self.height_cm,
            weight_kg: self.weight_kg,
            blood_group,
            medical_history: self.medical_history,
            current_medications: self.current_medications,
            chronic_conditions: self.chronic_conditions,
            allergies: self.allergies,
            emergency_contact: self.emergency_contact,
            primary_physician: self.primary_physician,
            address: self.address,
            created_at: now,
            updated_at: now,
        })
    }
}

impl EmergencyProfile {
    /// Re-checks the invariants on an already-assembled record. Used after a
    /// merge so constraint enforcement also happens at persistence time.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if self.emergency_contact.name.trim().is_empty() {
            return Err(ValidationError::MissingField("emergencyContact.name"));
        }
        if self.emergency_contact.phone.trim().is_empty() {
            return Err(ValidationError::MissingField("emergencyContact.phone"));
        }
        check_non_negative("heightCm", self.height_cm)?;
        check_non_negative("weightKg", self.weight_kg)?;
        Ok(())
    }

    /// Merges the allow-listed fields of `update` into this record,
    /// re-validates the merged result, and refreshes `updated_at`.
    pub fn apply_update(&mut self, update: ProfileUpdate, now: DateTime<Utc>) -> ValidationResult<()> {
        if let Some(name) = update.name {
            self.name = name.trim().to_string();
        }
        if let Some(gender) = update.gender {
            self.gender = gender;
        }
        if let Some(age) = update.age {
            self.age = age;
        }
        if let Some(height_cm) = update.height_cm {
            self.height_cm = Some(height_cm);
        }
        if let Some(weight_kg) = update.weight_kg {
            self.weight_kg = Some(weight_kg);
        }
        if let Some(blood_group) = update.blood_group {
            self.blood_group = blood_group;
        }
        if let Some(medical_history) = update.medical_history {
            self.medical_history = medical_history;
        }
        if let Some(current_medications) = update.current_medications {
            self.current_medications = current_medications;
        }
        if let Some(chronic_conditions) = update.chronic_conditions {
            self.chronic_conditions = chronic_conditions;
        }
        if let Some(allergies) = update.allergies {
            self.allergies = allergies;
        }
        if let Some(emergency_contact) = update.emergency_contact {
            self.emergency_contact = emergency_contact;
        }
        if let Some(primary_physician) = update.primary_physician {
            self.primary_physician = primary_physician;
        }
        if let Some(address) = update.address {
            self.address = address;
        }
        self.validate()?;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample_new_profile() -> NewProfile {
        NewProfile {
            name: "Jo Doe".to_string(),
            age: Some(34),
            blood_group: Some(BloodGroup::OPositive),
            emergency_contact: EmergencyContact {
                name: "Sam Doe".to_string(),
                phone: "555-0101".to_string(),
                relationship: "spouse".to_string(),
            },
            ..NewProfile::default()
        }
    }

    #[test]
    fn should_validate_complete_registration() {
        assert!(sample_new_profile().validate().is_ok());
    }

    #[test]
    fn should_reject_missing_emergency_contact_phone() {
        let mut payload = sample_new_profile();
        payload.emergency_contact.phone = String::new();
        assert_eq!(
            payload.validate().unwrap_err(),
            ValidationError::MissingField("emergencyContact.phone")
        );
    }

    #[test]
    fn should_reject_blank_name() {
        let mut payload = sample_new_profile();
        payload.name = "   ".to_string();
        assert_eq!(
            payload.validate().unwrap_err(),
            ValidationError::MissingField("name")
        );
    }

    #[test]
    fn should_reject_missing_blood_group() {
        let mut payload = sample_new_profile();
        payload.blood_group = None;
        assert_eq!(
            payload.validate().unwrap_err(),
            ValidationError::MissingField("bloodGroup")
        );
    }

    #[test]
    fn should_reject_out_of_set_blood_group() {
        assert_eq!(
            BloodGroup::from_str("Z+").unwrap_err(),
            ValidationError::InvalidBloodGroup("Z+".to_string())
        );
        assert!(serde_json::from_str::<BloodGroup>("\"Z+\"").is_err());
    }

    #[test]
    fn should_reject_negative_height() {
        let mut payload = sample_new_profile();
        payload.height_cm = Some(-3.0);
        assert_eq!(
            payload.validate().unwrap_err(),
            ValidationError::NegativeValue("heightCm")
        );
    }

    #[test]
    fn should_default_gender_to_unspecified() {
        let payload: NewProfile =
            serde_json::from_str(r#"{"name":"A","age":1,"bloodGroup":"A+","emergencyContact":{"name":"B","phone":"1"}}"#)
                .unwrap();
        assert_eq!(payload.gender, Gender::Unspecified);
        assert_eq!(payload.gender.as_str(), "");
    }

    #[test]
    fn should_accept_prefer_not_to_say_wire_value() {
        let gender: Gender = serde_json::from_str("\"Prefer not to say\"").unwrap();
        assert_eq!(gender, Gender::PreferNotToSay);
    }

    #[test]
    fn should_serialize_camel_case_wire_format() {
        let profile = sample_new_profile()
            .into_profile(ProfileId::generate(), Utc::now())
            .unwrap();
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["bloodGroup"], "O+");
        assert_eq!(value["emergencyContact"]["phone"], "555-0101");
        assert!(value.get("createdAt").is_some());
        // Unreported height/weight stay absent rather than turning into zero.
        assert!(value.get("heightCm").is_none());
    }

    #[test]
    fn should_merge_partial_update_and_refresh_timestamp() {
        let mut profile = sample_new_profile()
            .into_profile(ProfileId::generate(), Utc::now())
            .unwrap();
        let before = profile.updated_at;
        let allergies_update = ProfileUpdate {
            allergies: Some("penicillin".to_string()),
            ..ProfileUpdate::default()
        };
        profile
            .apply_update(allergies_update, before + chrono::Duration::seconds(1))
            .unwrap();
        assert_eq!(profile.allergies, "penicillin");
        assert_eq!(profile.name, "Jo Doe");
        assert_eq!(profile.blood_group, BloodGroup::OPositive);
        assert!(profile.updated_at > before);
    }

    #[test]
    fn should_reject_update_that_blanks_contact_phone() {
        let mut profile = sample_new_profile()
            .into_profile(ProfileId::generate(), Utc::now())
            .unwrap();
        let before = profile.updated_at;
        let update = ProfileUpdate {
            emergency_contact: Some(EmergencyContact::default()),
            ..ProfileUpdate::default()
        };
        assert!(profile.apply_update(update, Utc::now()).is_err());
        // The timestamp only moves on a successful mutation.
        assert_eq!(profile.updated_at, before);
    }

    #[test]
    fn should_ignore_unknown_fields_in_update_payload() {
        let update: ProfileUpdate =
            serde_json::from_str(r#"{"id":"overwrite-attempt","createdAt":"2020-01-01T00:00:00Z","age":40}"#)
                .unwrap();
        assert_eq!(update.age, Some(40));
        assert!(update.name.is_none());
    }
}
