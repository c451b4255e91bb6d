//! RSVP data model and validation.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// RSVP form payload as posted by the invitation page.
///
/// Values of the wrong JSON type read as absent, so only `name` and
/// `attendance` can make a submission invalid.
#[derive(Debug, Default, Deserialize)]
pub struct RsvpRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub attendance: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub companion: Option<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub drinks: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub wishes: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
}

/// Whether the guest will attend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Attendance {
    Yes,
    No,
}

impl Attendance {
    /// Parse the exact form values `yes` / `no`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "yes" => Some(Attendance::Yes),
            "no" => Some(Attendance::No),
            _ => None,
        }
    }
}

/// A validated RSVP submission. Lives for the duration of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsvpSubmission {
    pub name: String,
    pub attendance: Attendance,
    pub companion: Option<String>,
    pub drinks: Vec<String>,
    pub wishes: Option<String>,
    pub email: Option<String>,
}

impl TryFrom<RsvpRequest> for RsvpSubmission {
    type Error = Error;

    fn try_from(request: RsvpRequest) -> Result<Self> {
        let name = request
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::InvalidInput("name is missing or empty".to_string()))?
            .to_string();

        let attendance = request
            .attendance
            .as_deref()
            .and_then(Attendance::parse)
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "attendance must be 'yes' or 'no', got {:?}",
                    request.attendance
                ))
            })?;

        Ok(Self {
            name,
            attendance,
            companion: non_blank(request.companion),
            drinks: request.drinks,
            wishes: non_blank(request.wishes),
            email: non_blank(request.email),
        })
    }
}

impl RsvpSubmission {
    /// Parse and validate a raw JSON request body.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| Error::InvalidInput(format!("request body is not JSON: {}", e)))?;

        // Derived struct deserialization would also read a JSON array positionally.
        if !value.is_object() {
            return Err(Error::InvalidInput(
                "request body is not a JSON object".to_string(),
            ));
        }

        let request: RsvpRequest = serde_json::from_value(value)
            .map_err(|e| Error::InvalidInput(format!("request body is not an RSVP object: {}", e)))?;
        Self::try_from(request)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_strings<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        Value::String(s) => vec![s],
        _ => Vec::new(),
    })
}
