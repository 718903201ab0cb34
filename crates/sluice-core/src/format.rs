//! # Placeholder Templates
//!
//! Message templates use `{}` as a positional substitution site and `\{}`
//! for a literal pair of braces. A template is scanned once, left to right,
//! into literal runs and slots:
//!
//! | Input | Consumes | Produces |
//! |-------|----------|----------|
//! | `\{}` | 3 chars  | literal `{}` |
//! | `{}`  | 2 chars  | a slot |
//! | anything else | 1 char | itself |
//!
//! The printf form of a template (its `Display`) writes each slot as `%+v`:
//!
//! ```rust
//! use sluice_core::format::rewrite;
//!
//! assert_eq!(rewrite("a {} b"), "a %+v b");
//! assert_eq!(rewrite("esc \\{} here"), "esc {} here");
//! ```

use std::fmt::{self, Write as _};

use crate::normalize::Value;

/// Marker written for a substitution slot in the printf form.
pub const MARKER: &str = "%+v";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment
{
    Literal(String),
    Slot,
}

/// A parsed message template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template
{
    segments: Vec<Segment>,
}

impl Template
{
    /// Scan `source` into literal runs and slots.
    #[must_use]
    pub fn parse(source: &str) -> Self
    {
        let bytes = source.as_bytes();
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut run_start = 0;
        let mut i = 0;

        // Only ASCII bytes are inspected, so every slice boundary below falls
        // on a char boundary.
        while i < bytes.len() {
            if bytes[i] == b'\\' && i + 2 < bytes.len() && bytes[i + 1] == b'{' && bytes[i + 2] == b'}' {
                literal.push_str(&source[run_start..i]);
                literal.push_str("{}");
                i += 3;
                run_start = i;
            } else if bytes[i] == b'{' && i + 1 < bytes.len() && bytes[i + 1] == b'}' {
                literal.push_str(&source[run_start..i]);
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Slot);
                i += 2;
                run_start = i;
            } else {
                i += 1;
            }
        }

        literal.push_str(&source[run_start..]);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self { segments }
    }

    /// Number of substitution slots.
    #[must_use]
    pub fn placeholders(&self) -> usize
    {
        self.segments.iter().filter(|s| matches!(s, Segment::Slot)).count()
    }

    /// Substitute `values` into the slots in order.
    ///
    /// Extra values are ignored. Slots without a value keep the `%+v` marker.
    #[must_use]
    pub fn render(&self, values: &[Value]) -> String
    {
        let mut out = String::new();
        let mut values = values.iter();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot => match values.next() {
                    // Writing into a String cannot fail.
                    Some(value) => {
                        let _ = write!(out, "{value}");
                    }
                    None => out.push_str(MARKER),
                },
            }
        }
        out
    }
}

impl fmt::Display for Template
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => f.write_str(text)?,
                Segment::Slot => f.write_str(MARKER)?,
            }
        }
        Ok(())
    }
}

/// Rewrite a template into its printf form.
#[must_use]
pub fn rewrite(source: &str) -> String
{
    Template::parse(source).to_string()
}
