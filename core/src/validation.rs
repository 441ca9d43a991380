//! Pre-flight checks on request payloads.
//!
//! Validation is pure and runs before a payload is serialized. A non-empty
//! result aborts the call with `Error::Validation`; nothing is sent.

pub use crate::error::{FieldError, ValidationError};

/// Zone codes accepted by the remote API.
pub const ZONES: &[&str] = &[
    "de-fra1", "fi-hel1", "fi-hel2", "nl-ams1", "sg-sin1", "uk-lon1", "us-chi1", "us-sjo1",
];

/// Maximum length of titles on servers and storages.
pub const MAX_TITLE_LEN: usize = 64;

/// Maximum length of a server hostname.
pub const MAX_HOSTNAME_LEN: usize = 128;

/// A payload that can check its own fields.
pub trait Validate {
    /// Every problem found, empty when the payload is valid.
    fn validate(&self) -> Vec<FieldError>;
}

pub fn is_supported_zone(zone: &str) -> bool {
    ZONES.contains(&zone)
}

/// Record a `FieldError` on `field` unless `zone` is in `ZONES`.
pub fn validate_zone(field: &str, zone: &str, errors: &mut Vec<FieldError>) {
    if !is_supported_zone(zone) {
        errors.push(FieldError::new(field, format!("'{zone}' not supported")));
    }
}

pub(crate) fn validate_max_len(field: &str, value: &str, max: usize, errors: &mut Vec<FieldError>) {
    if value.chars().count() > max {
        errors.push(FieldError::new(
            field,
            format!("longer than {max} characters"),
        ));
    }
}

pub(crate) fn validate_not_empty(field: &str, value: &str, errors: &mut Vec<FieldError>) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, "must not be empty"));
    }
}

pub(crate) fn validate_count(
    field: &str,
    count: usize,
    min: usize,
    max: usize,
    errors: &mut Vec<FieldError>,
) {
    if count < min || count > max {
        errors.push(FieldError::new(
            field,
            format!("{count} given, expected {min}-{max}"),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_zone_is_accepted() {
        for zone in ZONES {
            let mut errors = Vec::new();
            validate_zone("zone", zone, &mut errors);
            assert!(errors.is_empty(), "{zone} should be accepted");
        }
    }

    #[test]
    fn unknown_zones_produce_one_error() {
        for zone in ["mars1", "", "DE-FRA1", "de-fra2", " de-fra1"] {
            let mut errors = Vec::new();
            validate_zone("zone", zone, &mut errors);
            assert_eq!(errors.len(), 1, "{zone:?}");
            assert_eq!(errors[0].name, "zone");
            assert!(errors[0].description.contains(&format!("'{zone}'")));
        }
    }

    #[test]
    fn count_bounds_are_inclusive() {
        let mut errors = Vec::new();
        validate_count("devices", 1, 1, 8, &mut errors);
        validate_count("devices", 8, 1, 8, &mut errors);
        assert!(errors.is_empty());
        validate_count("devices", 0, 1, 8, &mut errors);
        validate_count("devices", 9, 1, 8, &mut errors);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn max_len_counts_characters() {
        let mut errors = Vec::new();
        validate_max_len("title", &"ä".repeat(64), 64, &mut errors);
        assert!(errors.is_empty());
        validate_max_len("title", &"a".repeat(65), 64, &mut errors);
        assert_eq!(errors[0].description, "longer than 64 characters");
    }
}
