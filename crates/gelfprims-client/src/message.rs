use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::error::{ClientError, Result};

/// GELF payload version emitted in every message.
pub const GELF_VERSION: &str = "1.1";

/// Syslog severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Level {
    Emergency = 0,
    Alert = 1,
    Critical = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    Informational = 6,
    Debug = 7,
}

impl Level {
    /// Map a numeric syslog severity to a level.
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Level::Emergency,
            1 => Level::Alert,
            2 => Level::Critical,
            3 => Level::Error,
            4 => Level::Warning,
            5 => Level::Notice,
            6 => Level::Informational,
            7 => Level::Debug,
            _ => return None,
        })
    }
}

/// A structured log record.
///
/// `timestamp` and `host` may be left empty; the client fills them in when
/// the message is queued. Additional fields are sent with a leading
/// underscore, so `with_field("user_id", 42)` becomes `"_user_id": 42`.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub host: String,
    pub short_message: String,
    pub full_message: Option<String>,
    pub timestamp: Option<SystemTime>,
    pub level: Option<Level>,
    /// Legacy GELF 1.0 fields, still accepted by most servers.
    pub facility: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub fields: BTreeMap<String, serde_json::Value>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    version: &'static str,
    host: &'a str,
    short_message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    full_message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    facility: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
    #[serde(flatten)]
    fields: BTreeMap<String, &'a serde_json::Value>,
}

impl Message {
    pub fn new(short_message: impl Into<String>) -> Self {
        Self {
            host: String::new(),
            short_message: short_message.into(),
            full_message: None,
            timestamp: None,
            level: None,
            facility: None,
            file: None,
            line: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_full_message(mut self, full_message: impl Into<String>) -> Self {
        self.full_message = Some(full_message.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: SystemTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_facility(mut self, facility: impl Into<String>) -> Self {
        self.facility = Some(facility.into());
        self
    }

    /// Record the source location that produced the message.
    pub fn with_location(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    /// Attach an additional field. The name is given without the underscore
    /// prefix and is validated at serialization time.
    pub fn with_field(
        mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Check GELF field rules without serializing.
    pub fn validate(&self) -> Result<()> {
        if self.short_message.is_empty() {
            return Err(ClientError::InvalidMessage(
                "short_message must not be empty".to_string(),
            ));
        }
        for name in self.fields.keys() {
            validate_field_name(name)?;
        }
        Ok(())
    }

    /// Serialize to the GELF JSON wire form.
    pub fn to_json(&self) -> Result<String> {
        self.validate()?;

        let wire = WireMessage {
            version: GELF_VERSION,
            host: &self.host,
            short_message: &self.short_message,
            full_message: self.full_message.as_deref(),
            timestamp: self.timestamp.map(unix_seconds),
            level: self.level.map(|level| level as u8),
            facility: self.facility.as_deref(),
            file: self.file.as_deref(),
            line: self.line,
            fields: self
                .fields
                .iter()
                .map(|(name, value)| (format!("_{name}"), value))
                .collect(),
        };

        Ok(serde_json::to_string(&wire)?)
    }
}

fn validate_field_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ClientError::InvalidMessage(
            "additional field name must not be empty".to_string(),
        ));
    }
    // GELF servers treat `_id` as their own record id.
    if name == "id" {
        return Err(ClientError::InvalidMessage(
            "additional field name \"id\" is reserved".to_string(),
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(ClientError::InvalidMessage(format!(
            "additional field name {name:?} may only contain letters, digits, '_', '.' and '-'"
        )));
    }
    Ok(())
}

/// Seconds since the epoch with millisecond precision.
fn unix_seconds(time: SystemTime) -> f64 {
    let since_epoch = time.duration_since(UNIX_EPOCH).unwrap_or_default();
    since_epoch.as_secs() as f64 + f64::from(since_epoch.subsec_millis()) / 1000.0
}
