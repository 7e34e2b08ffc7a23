//! Case-insensitive header collection and the incremental header parser.

use crate::http::parser::ParseError;

const SEPARATOR: &[u8] = b"\r\n";

/// Ordered collection of header fields keyed by lower-cased name.
///
/// Entries keep their insertion order, which is also the order
/// [`ResponseWriter::write_headers`](crate::http::writer::ResponseWriter::write_headers)
/// serializes them in. Replacing an existing field keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// Adds a field. A second value for the same name is appended to the
    /// existing one, separated by a bare comma.
    pub fn set(&mut self, name: &str, value: &str) {
        match self.position(name) {
            Some(idx) => {
                let existing = &mut self.entries[idx].1;
                existing.push(',');
                existing.push_str(value);
            }
            None => self
                .entries
                .push((name.to_ascii_lowercase(), value.to_string())),
        }
    }

    /// Overwrites a field unconditionally.
    pub fn replace(&mut self, name: &str, value: &str) {
        match self.position(name) {
            Some(idx) => self.entries[idx].1 = value.to_string(),
            None => self
                .entries
                .push((name.to_ascii_lowercase(), value.to_string())),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|idx| self.entries[idx].1.as_str())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|idx| self.entries.remove(idx).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Parses as many complete field lines from `buf` as are available.
    ///
    /// Returns the number of bytes consumed and whether the blank line
    /// ending the header section was reached. A trailing partial line is
    /// left unconsumed; the caller passes it again once more bytes arrive.
    pub fn parse(&mut self, buf: &[u8]) -> Result<(usize, bool), ParseError> {
        let mut read = 0;

        while let Some(idx) = find_separator(&buf[read..]) {
            if idx == 0 {
                return Ok((read + SEPARATOR.len(), true));
            }

            let (name, value) = parse_field_line(&buf[read..read + idx])?;
            self.set(name, value);
            read += idx + SEPARATOR.len();
        }

        Ok((read, false))
    }
}

pub(crate) fn find_separator(buf: &[u8]) -> Option<usize> {
    buf.windows(SEPARATOR.len()).position(|w| w == SEPARATOR)
}

fn parse_field_line(line: &[u8]) -> Result<(&str, &str), ParseError> {
    let colon = line
        .iter()
        .position(|&b| b == b':')
        .ok_or(ParseError::MalformedFieldLine)?;

    let name = &line[..colon];
    if name.ends_with(b" ") || !is_token(name) {
        return Err(ParseError::MalformedFieldName);
    }

    // token bytes are ASCII
    let name = std::str::from_utf8(name).map_err(|_| ParseError::MalformedFieldName)?;
    // Values are stored as text; obs-text bytes are refused rather than rewritten
    let value = std::str::from_utf8(line[colon + 1..].trim_ascii())
        .map_err(|_| ParseError::MalformedFieldLine)?;

    Ok((name, value))
}

/// Reports whether `bytes` is a non-empty RFC 9110 token.
pub fn is_token(bytes: &[u8]) -> bool {
    !bytes.is_empty() && bytes.iter().all(|&b| is_token_char(b))
}

fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#'
                | b'$'
                | b'%'
                | b'&'
                | b'\''
                | b'*'
                | b'+'
                | b'-'
                | b'.'
                | b'^'
                | b'_'
                | b'`'
                | b'|'
                | b'~'
        )
}
