//! Field-name translation between wire names and model field names.
//!
//! SIRI documents name every element and property in PascalCase
//! (`ResponseTimestamp`), while the model fields are lowerCamelCase
//! (`responseTimestamp`). Names in the reserved XML namespace, such as the
//! `lang` of `xml:lang`, are lowercase on the wire and pass through untouched.

use std::borrow::Cow;
use std::fmt;

/// Local name of the `xml:lang` attribute.
pub const XML_LANG: &str = "lang";

/// Maps model field names to wire names and back.
pub trait NamingStrategy: fmt::Debug + Send + Sync {
    /// Field name → wire name.
    fn translate<'a>(&self, field: &'a str) -> Cow<'a, str>;

    /// Wire name → field name. The inverse of [`translate`](Self::translate).
    fn field_name<'a>(&self, wire: &'a str) -> Cow<'a, str>;
}

/// Capitalizes the first character, except for reserved names.
#[derive(Debug, Clone)]
pub struct PascalCaseStrategy {
    reserved: Vec<&'static str>,
}

impl PascalCaseStrategy {
    /// A strategy with no reserved names.
    pub fn plain() -> Self {
        Self {
            reserved: Vec::new(),
        }
    }

    /// Adds a name that is never translated.
    pub fn reserve(mut self, name: &'static str) -> Self {
        self.reserved.push(name);
        self
    }

    fn is_reserved(&self, name: &str) -> bool {
        self.reserved.iter().any(|r| *r == name)
    }
}

impl Default for PascalCaseStrategy {
    /// Reserves [`XML_LANG`].
    fn default() -> Self {
        Self::plain().reserve(XML_LANG)
    }
}

impl NamingStrategy for PascalCaseStrategy {
    fn translate<'a>(&self, field: &'a str) -> Cow<'a, str> {
        if self.is_reserved(field) {
            return Cow::Borrowed(field);
        }
        map_first_char(field, char::is_uppercase, char::to_uppercase)
    }

    fn field_name<'a>(&self, wire: &'a str) -> Cow<'a, str> {
        if self.is_reserved(wire) {
            return Cow::Borrowed(wire);
        }
        map_first_char(wire, char::is_lowercase, char::to_lowercase)
    }
}

fn map_first_char<'a, I>(
    s: &'a str,
    already: fn(char) -> bool,
    convert: fn(char) -> I,
) -> Cow<'a, str>
where
    I: Iterator<Item = char>,
{
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if !already(first) && first.is_alphabetic() => {
            let mut out = String::with_capacity(s.len());
            out.extend(convert(first));
            out.push_str(chars.as_str());
            Cow::Owned(out)
        }
        _ => Cow::Borrowed(s),
    }
}
