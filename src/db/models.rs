use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::StudentsError;

/// A persisted `students` row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub courses: Option<String>,
    pub id_number: String,
    pub emergency_contact_email: Option<String>,
    pub emergency_contact_phone: Option<String>,
}

/// Registration payload. Every field is optional on the wire so that a
/// missing required field surfaces as a validation error, not a decode error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewStudent {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub courses: Option<String>,
    #[serde(default)]
    pub id_number: Option<String>,
    #[serde(default)]
    pub emergency_contact_email: Option<String>,
    #[serde(default)]
    pub emergency_contact_phone: Option<String>,
}

/// Required fields of a [`NewStudent`] after the presence check.
#[derive(Debug, Clone, Copy)]
pub struct RequiredFields<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub id_number: &'a str,
}

impl NewStudent {
    /// Presence check for `name`, `email` and `idNumber`; empty counts as absent.
    pub fn required(&self) -> Result<RequiredFields<'_>, StudentsError> {
        fn present(v: &Option<String>) -> Option<&str> {
            v.as_deref().filter(|s| !s.is_empty())
        }

        match (
            present(&self.name),
            present(&self.email),
            present(&self.id_number),
        ) {
            (Some(name), Some(email), Some(id_number)) => Ok(RequiredFields {
                name,
                email,
                id_number,
            }),
            _ => Err(StudentsError::Validation(
                "Name, email, and ID number are required".to_string(),
            )),
        }
    }
}
