//! Log events and their byte encodings.
//!
//! An [`Event`] only exists for calls that passed the level filter. It
//! borrows the logger's scope chain, is encoded once, and is then dropped.

use std::borrow::Cow;
use std::fmt::Write as _;
use std::io;
use std::panic::Location;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::config::Mode;
use crate::level::Level;
use crate::normalize::Value;

/// Keys the encoder writes itself. Chain fields with these names are
/// written under `fields.<key>` instead.
pub const RESERVED_KEYS: [&str; 5] = ["level", "time", "error", "caller", "message"];

/// How events are turned into bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding
{
    /// One JSON object per line (production)
    #[default]
    Json,
    /// Human-readable single line (development)
    Console,
}

impl From<Mode> for Encoding
{
    fn from(mode: Mode) -> Self
    {
        match mode {
            Mode::Dev => Encoding::Console,
            Mode::Prod => Encoding::Json,
        }
    }
}

/// A single rendered log record.
#[derive(Debug, Clone)]
pub struct Event<'a>
{
    /// Severity
    pub level: Level,
    /// Creation time
    pub time: DateTime<Utc>,
    /// Scope chain, oldest attachment first
    pub fields: Vec<(&'a str, &'a Value)>,
    /// Rendered error, if the call carried one
    pub error: Option<String>,
    /// Call site of the logging operation
    pub caller: &'static Location<'static>,
    /// Message with placeholders substituted
    pub message: String,
}

impl Event<'_>
{
    fn timestamp(&self) -> String
    {
        self.time.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    fn caller_text(&self) -> String
    {
        format!("{}:{}", self.caller.file(), self.caller.line())
    }

    /// Encode as one newline-terminated line.
    ///
    /// ## Errors
    ///
    /// Propagates JSON serialization errors (none are expected for
    /// normalized values).
    pub fn encode(&self, encoding: Encoding) -> io::Result<Vec<u8>>
    {
        match encoding {
            Encoding::Json => {
                let mut buf = serde_json::to_vec(self)?;
                buf.push(b'\n');
                Ok(buf)
            }
            Encoding::Console => Ok(self.console_line().into_bytes()),
        }
    }

    fn console_line(&self) -> String
    {
        let mut line = format!(
            "{} {} {} > {}",
            self.timestamp(),
            self.level.abbreviation(),
            self.caller_text(),
            escape_control(&self.message)
        );
        for (key, value) in &self.fields {
            let _ = write!(line, " {key}={}", console_value(&value.to_string()));
        }
        if let Some(error) = &self.error {
            let _ = write!(line, " error={}", console_value(error));
        }
        line.push('\n');
        line
    }
}

fn console_value(text: &str) -> String
{
    if text.is_empty() || text.contains(char::is_whitespace) || text.contains(char::is_control) {
        format!("{text:?}")
    } else {
        text.to_string()
    }
}

/// Escape control characters so one event always stays on one line.
fn escape_control(text: &str) -> Cow<'_, str>
{
    if !text.contains(char::is_control) {
        return Cow::Borrowed(text);
    }
    let mut escaped = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        if c.is_control() {
            escaped.extend(c.escape_default());
        } else {
            escaped.push(c);
        }
    }
    Cow::Owned(escaped)
}

fn json_key(key: &str) -> Cow<'_, str>
{
    if RESERVED_KEYS.contains(&key) {
        Cow::Owned(format!("fields.{key}"))
    } else {
        Cow::Borrowed(key)
    }
}

impl Serialize for Event<'_>
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error>
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("level", self.level.as_str())?;
        map.serialize_entry("time", &self.timestamp())?;
        for (key, value) in &self.fields {
            map.serialize_entry(&json_key(key), value)?;
        }
        if let Some(error) = &self.error {
            map.serialize_entry("error", error)?;
        }
        map.serialize_entry("caller", &self.caller_text())?;
        map.serialize_entry("message", &self.message)?;
        map.end()
    }
}

#[cfg(test)]
mod tests
{
    use chrono::TimeZone;

    use super::*;

    fn sample<'a>(fields: Vec<(&'a str, &'a Value)>) -> Event<'a>
    {
        Event {
            level: Level::Warn,
            time: Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap(),
            fields,
            error: Some("disk full".to_string()),
            caller: Location::caller(),
            message: "low space".to_string(),
        }
    }

    #[test]
    fn test_json_encoding_key_order()
    {
        let module = Value::Str("store".to_string());
        let event = sample(vec![("module", &module)]);
        let line = String::from_utf8(event.encode(Encoding::Json).unwrap()).unwrap();

        assert!(line.ends_with('\n'));
        let level = line.find("\"level\"").unwrap();
        let module = line.find("\"module\":\"store\"").unwrap();
        let error = line.find("\"error\":\"disk full\"").unwrap();
        let message = line.find("\"message\":\"low space\"").unwrap();
        assert!(level < module && module < error && error < message);
        assert!(line.contains("\"time\":\"2026-10-17T12:00:00Z\""));
    }

    #[test]
    fn test_console_encoding()
    {
        let attempt = Value::UInt(3);
        let event = sample(vec![("attempt", &attempt)]);
        let line = String::from_utf8(event.encode(Encoding::Console).unwrap()).unwrap();

        assert!(line.starts_with("2026-10-17T12:00:00Z WRN "));
        assert!(line.contains("> low space attempt=3 error=\"disk full\""));
    }

    #[test]
    fn test_reserved_chain_keys_are_renamed()
    {
        let level = Value::Str("debug".to_string());
        let message = Value::Str("forged".to_string());
        let event = sample(vec![("level", &level), ("message", &message)]);
        let line = String::from_utf8(event.encode(Encoding::Json).unwrap()).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["level"], "warn");
        assert_eq!(parsed["message"], "low space");
        assert_eq!(parsed["fields.level"], "debug");
        assert_eq!(parsed["fields.message"], "forged");
        assert_eq!(line.matches("\"level\"").count(), 1);
    }

    #[test]
    fn test_console_message_stays_on_one_line()
    {
        let mut event = sample(Vec::new());
        event.message = "ok\n2026-10-17T12:00:00Z ERR forged".to_string();
        let line = String::from_utf8(event.encode(Encoding::Console).unwrap()).unwrap();

        assert_eq!(line.matches('\n').count(), 1);
        assert!(line.contains("> ok\\n2026-10-17T12:00:00Z ERR forged"));
    }

    #[test]
    fn test_console_field_with_control_characters_is_quoted()
    {
        let value = Value::Str("a\rb".to_string());
        let event = sample(vec![("k", &value)]);
        let line = String::from_utf8(event.encode(Encoding::Console).unwrap()).unwrap();
        assert!(line.contains(" k=\"a\\rb\""));
    }

    #[test]
    fn test_encoding_from_mode()
    {
        assert_eq!(Encoding::from(Mode::Dev), Encoding::Console);
        assert_eq!(Encoding::from(Mode::Prod), Encoding::Json);
    }
}
