//! Case-insensitive, multi-valued header table.
//!
//! Names are folded to lower case for lookup and storage. The display form
//! written on the wire is derived from the folded name (`content-type` →
//! `Content-Type`) and never used as a key.
//!
//! Entries live in an [`IndexMap`], so iteration and [`Headers::format`]
//! follow the order in which each name was first inserted.

use std::fmt;

use indexmap::IndexMap;

use crate::http::parser::ParseError;

const CRLF: &[u8] = b"\r\n";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: IndexMap<String, Vec<String>>,
}

impl Headers {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Parses a raw header block terminated by an empty line.
    ///
    /// Returns `Ok(None)` when the terminating blank line is not in `buf`
    /// yet, so the caller can wait for more bytes. On success the second
    /// element is the number of bytes consumed, blank line included.
    ///
    /// # Example
    ///
    /// ```
    /// # use tidewire::http::headers::Headers;
    /// let (headers, consumed) = Headers::parse(b"Host: example.com\r\n\r\nbody")
    ///     .unwrap()
    ///     .unwrap();
    /// assert_eq!(headers.get("host"), Some("example.com"));
    /// assert_eq!(consumed, 21);
    /// ```
    pub fn parse(buf: &[u8]) -> Result<Option<(Self, usize)>, ParseError> {
        let mut headers = Self::new();
        let mut read = 0;

        loop {
            let Some(idx) = find_crlf(&buf[read..]) else {
                return Ok(None);
            };

            if idx == 0 {
                read += CRLF.len();
                break;
            }

            let line = &buf[read..read + idx];
            read += idx + CRLF.len();

            let (name, value) = parse_line(line)?;
            headers.add(name, value);
        }

        Ok(Some((headers, read)))
    }

    /// First value stored for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&fold(name))
            .and_then(|values| values.first())
            .map(|v| v.as_str())
    }

    /// All values stored for `name`, in insertion order.
    pub fn values(&self, name: &str) -> &[String] {
        self.entries
            .get(&fold(name))
            .map(|values| values.as_slice())
            .unwrap_or(&[])
    }

    /// Replaces every value of `name` with `value`.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.entries.insert(fold(name), vec![value.into()]);
    }

    pub fn add(&mut self, name: &str, value: impl Into<String>) {
        self.entries.entry(fold(name)).or_default().push(value.into());
    }

    pub fn delete(&mut self, name: &str) {
        // shift_remove keeps the relative order of the remaining names
        self.entries.shift_remove(&fold(name));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&fold(name))
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(canonical name, values)` in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (String, &[String])> + '_ {
        self.entries
            .iter()
            .map(|(name, values)| (canonical_name(name), values.as_slice()))
    }

    /// Serializes every value as `Canonical-Name: value\r\n`, followed by the
    /// blank line that ends a header block.
    pub fn format(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, values) in self.iter() {
            for value in values {
                write!(f, "{}: {}\r\n", name, value)?;
            }
        }
        f.write_str("\r\n")
    }
}

/// Display form of a header name: every hyphen-separated segment gets an
/// upper-case first letter and lower-case rest.
pub fn canonical_name(name: &str) -> String {
    name.split('-')
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

fn fold(name: &str) -> String {
    name.to_ascii_lowercase()
}

pub(crate) fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

fn parse_line(line: &[u8]) -> Result<(&str, &str), ParseError> {
    let line = std::str::from_utf8(line).map_err(|_| ParseError::MalformedHeaders)?;
    let (name, value) = line.split_once(':').ok_or(ParseError::MalformedHeaders)?;

    let name = name.trim();
    if name.is_empty() {
        return Err(ParseError::MalformedHeaders);
    }

    Ok((name, value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_each_segment() {
        assert_eq!(canonical_name("content-type"), "Content-Type");
        assert_eq!(canonical_name("X-FORWARDED-FOR"), "X-Forwarded-For");
        assert_eq!(canonical_name("host"), "Host");
        assert_eq!(canonical_name("a--b"), "A--B");
    }

    #[test]
    fn incomplete_block_is_not_an_error() {
        assert_eq!(Headers::parse(b"Host: x\r\nAccept: */*"), Ok(None));
        assert_eq!(Headers::parse(b""), Ok(None));
    }

    #[test]
    fn empty_name_is_malformed() {
        assert_eq!(
            Headers::parse(b"   : value\r\n\r\n"),
            Err(ParseError::MalformedHeaders)
        );
    }

    #[test]
    fn value_may_contain_colons() {
        let (headers, _) = Headers::parse(b"Host: localhost:8080\r\n\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(headers.get("Host"), Some("localhost:8080"));
    }
}
