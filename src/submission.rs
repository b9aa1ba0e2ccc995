//! Packages the captured photo with the visitor's identity fields for the
//! visitor service. Field validation and the upload itself live elsewhere.

use crate::capture::CapturedFrame;
use crate::error::{KioskError, Result};
use serde::{Deserialize, Serialize};

/// Identity fields typed in by the visitor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitorDetails {
    pub name: String,
    pub phone: String,
    pub flat_number: String,
    pub flat_owner_email: Option<String>,
}

/// Check-in payload in the field layout the visitor service expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitorSubmission {
    pub name: String,
    pub phone: String,
    pub flat_number: String,
    /// Photo as a `data:image/jpeg;base64,...` URL
    pub photo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flat_owner_email: Option<String>,
}

impl VisitorSubmission {
    pub fn new(details: VisitorDetails, photo: Option<&CapturedFrame>) -> Result<Self> {
        let photo = photo.ok_or(KioskError::PhotoMissing)?;

        Ok(Self {
            name: details.name,
            phone: details.phone,
            flat_number: details.flat_number,
            photo: photo.to_data_url(),
            flat_owner_email: details.flat_owner_email.filter(|email| !email.is_empty()),
        })
    }

    /// Form fields in submission order; the email is sent only when present
    pub fn form_fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = vec![
            ("name", self.name.as_str()),
            ("phone", self.phone.as_str()),
            ("flat_number", self.flat_number.as_str()),
            ("photo", self.photo.as_str()),
        ];
        if let Some(email) = &self.flat_owner_email {
            fields.push(("flat_owner_email", email.as_str()));
        }
        fields
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details() -> VisitorDetails {
        VisitorDetails {
            name: "Asha Rao".to_string(),
            phone: "555-0100".to_string(),
            flat_number: "B-204".to_string(),
            flat_owner_email: None,
        }
    }

    #[test]
    fn test_submission_requires_photo() {
        let result = VisitorSubmission::new(details(), None);
        match result {
            Err(KioskError::PhotoMissing) => {}
            other => panic!("Expected missing photo error, got {:?}", other),
        }
    }

    #[test]
    fn test_submission_carries_photo_as_data_url() {
        let frame = CapturedFrame::new(vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3], 640, 480, 85);
        let submission = VisitorSubmission::new(details(), Some(&frame)).unwrap();

        assert!(submission.photo.starts_with("data:image/jpeg;base64,"));
        assert_eq!(submission.photo, "data:image/jpeg;base64,/9j/4AECAw==");

        let names: Vec<_> = submission.form_fields().iter().map(|(k, _)| *k).collect();
        assert_eq!(names, vec!["name", "phone", "flat_number", "photo"]);
    }

    #[test]
    fn test_optional_email_is_omitted_when_blank() {
        let frame = CapturedFrame::new(vec![1; 32], 640, 480, 85);

        let mut with_blank = details();
        with_blank.flat_owner_email = Some(String::new());
        let submission = VisitorSubmission::new(with_blank, Some(&frame)).unwrap();
        let json = submission.to_json().unwrap();
        assert!(!json.contains("flat_owner_email"));

        let mut with_email = details();
        with_email.flat_owner_email = Some("owner@example.com".to_string());
        let submission = VisitorSubmission::new(with_email, Some(&frame)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&submission.to_json().unwrap()).unwrap();
        assert_eq!(json["flat_owner_email"], "owner@example.com");
        assert_eq!(json["flat_number"], "B-204");
        assert_eq!(submission.form_fields().len(), 5);
    }
}
