// models/src/lib.rs

pub mod errors;
pub mod identifiers;
pub mod profile;

pub use errors::{ProfileError, ProfileResult, ValidationError, ValidationResult};
pub use identifiers::ProfileId;
pub use profile::{
    BloodGroup, EmergencyContact, EmergencyProfile, Gender, NewProfile, PrimaryPhysician,
    ProfileUpdate,
};
