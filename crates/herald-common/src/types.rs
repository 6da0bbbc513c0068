//! Core types shared across Herald components.

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::OtpError;

/// Channel a code is delivered over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
    Sms,
    Email,
}

impl DeliveryMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Email => "email",
        }
    }
}

impl fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryMethod {
    type Err = OtpError;

    /// Exact, case-sensitive match on "sms" or "email"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sms" => Ok(Self::Sms),
            "email" => Ok(Self::Email),
            other => Err(OtpError::UnsupportedMethod(other.to_string())),
        }
    }
}

/// A pending verification for one contact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    /// Phone number or email address; the store key
    pub contact: String,

    /// Six-digit numeric secret
    pub code: String,

    /// Channel the code went out on
    pub method: DeliveryMethod,

    /// Instant after which the challenge is invalid
    pub expires_at: DateTime<Utc>,
}

impl Challenge {
    /// Expired strictly after `expires_at`; the boundary instant is still valid
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Returned by the issuer once a code has been stored and dispatched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueReceipt {
    pub contact: String,
    pub expires_at: DateTime<Utc>,
}

/// Body of `POST /api/request-otp`
///
/// Fields are optional so that missing values surface as a 400 with a
/// readable message rather than a deserialization rejection. Numbers and
/// booleans are read as their text, so `"otp": 123456` is checked like
/// `"otp": "123456"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueRequest {
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub contact: Option<String>,
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub method: Option<String>,
}

/// Body of `POST /api/verify-otp`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyRequest {
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub contact: Option<String>,
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub otp: Option<String>,
}

/// Accept a string, number or boolean as text; `null` reads as absent
fn scalar_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ScalarVisitor;

    impl<'de> Visitor<'de> for ScalarVisitor {
        type Value = Option<String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string, number or boolean")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
            d.deserialize_any(self)
        }
    }

    deserializer.deserialize_any(ScalarVisitor)
}

/// Successful response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

impl SuccessResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Error response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Mask a contact for log output, keeping just enough to correlate
///
/// Emails keep the first character of the local part and the domain;
/// anything else keeps its last four characters.
pub fn mask_contact(contact: &str) -> String {
    if let Some((local, domain)) = contact.split_once('@') {
        let first = local.chars().next().map(String::from).unwrap_or_default();
        return format!("{first}***@{domain}");
    }

    let count = contact.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = contact.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(count - 4), tail)
}
