//! Add-chant form input and validation

use chant_common::api::ChantEntry;
use chant_common::identifier::{self, IdentifierKind};
use chant_common::time::{is_future, parse_date};
use chant_common::ValidationError;
use chrono::NaiveDate;

/// Raw form fields as typed by the user
///
/// `count` and `date` are text; an empty `date` means "today".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChantForm {
    pub identifier: String,
    pub count: String,
    pub date: String,
}

impl ChantForm {
    pub fn new(identifier: impl Into<String>, count: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            count: count.into(),
            date: String::new(),
        }
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    /// Reset after a successful submission; the identifier is kept
    pub fn clear_entry(&mut self) {
        self.count.clear();
        self.date.clear();
    }

    /// Validate every field and build the entry to submit
    ///
    /// The identifier is normalized here, once.
    pub fn validate(
        &self,
        kind: IdentifierKind,
        today: NaiveDate,
    ) -> Result<ChantEntry, ValidationError> {
        let raw_id = identifier::validate(&self.identifier, kind)?;
        let count = parse_count(&self.count)?;
        let date = if self.date.trim().is_empty() {
            today
        } else {
            let date = parse_date(&self.date)?;
            if is_future(date, today) {
                return Err(ValidationError::FutureDate);
            }
            date
        };

        Ok(ChantEntry {
            userid: identifier::normalize(raw_id),
            date,
            count,
        })
    }
}

fn parse_count(raw: &str) -> Result<u32, ValidationError> {
    match raw.trim().parse::<u32>() {
        Ok(count) if count >= 1 => Ok(count),
        _ => Err(ValidationError::InvalidCount),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn test_phone_entry_defaults_to_today() {
        let entry = ChantForm::new("5551234567", "3")
            .validate(IdentifierKind::Phone, today())
            .unwrap();
        assert_eq!(entry.userid.as_str(), "5551234567");
        assert_eq!(entry.date, today());
        assert_eq!(entry.count, 3);
    }

    #[test]
    fn test_username_entry_is_normalized() {
        let entry = ChantForm::new("olduser12", "108")
            .with_date("2024-06-01")
            .validate(IdentifierKind::Username, today())
            .unwrap();
        assert_eq!(entry.userid.as_str(), "OLDUSER12");
        assert_eq!(entry.date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
    }

    #[test]
    fn test_short_username_rejected() {
        assert_eq!(
            ChantForm::new("abc", "1").validate(IdentifierKind::Username, today()),
            Err(ValidationError::UsernameTooShort { min: 8 })
        );
    }

    #[test]
    fn test_phone_rule_applies_in_phone_mode() {
        assert_eq!(
            ChantForm::new("olduser12", "1").validate(IdentifierKind::Phone, today()),
            Err(ValidationError::InvalidPhone)
        );
    }

    #[test]
    fn test_count_must_be_positive_integer() {
        for bad in ["", "0", "-2", "1.5", "many"] {
            assert_eq!(
                ChantForm::new("5551234567", bad).validate(IdentifierKind::Phone, today()),
                Err(ValidationError::InvalidCount),
                "count {bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_future_date_rejected() {
        assert_eq!(
            ChantForm::new("5551234567", "1")
                .with_date("2024-06-16")
                .validate(IdentifierKind::Phone, today()),
            Err(ValidationError::FutureDate)
        );
        assert!(ChantForm::new("5551234567", "1")
            .with_date("2024-06-15")
            .validate(IdentifierKind::Phone, today())
            .is_ok());
    }

    #[test]
    fn test_malformed_date_rejected() {
        assert_eq!(
            ChantForm::new("5551234567", "1")
                .with_date("15/06/2024")
                .validate(IdentifierKind::Phone, today()),
            Err(ValidationError::InvalidDate)
        );
    }

    #[test]
    fn test_clear_entry_keeps_identifier() {
        let mut form = ChantForm::new("5551234567", "3").with_date("2024-06-01");
        form.clear_entry();
        assert_eq!(form.identifier, "5551234567");
        assert!(form.count.is_empty());
        assert!(form.date.is_empty());
    }
}
