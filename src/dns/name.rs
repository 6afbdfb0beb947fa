//! Domain names and their label-sequence wire form.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Longest label a length octet can describe.
pub const MAX_LABEL_LEN: usize = 63;

/// Longest name on the wire, counting length octets and the terminator.
pub const MAX_NAME_LEN: usize = 255;

/// A fully expanded domain name.
///
/// Compression pointers only exist on the wire: [`Name::decode`] resolves
/// them and [`Name::encode`] never emits them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Name {
    labels: Vec<Vec<u8>>,
}

impl Name {
    /// The root name (no labels).
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a name from raw labels, checking label and total lengths.
    pub fn from_labels<I, L>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = L>,
        L: Into<Vec<u8>>,
    {
        let labels: Vec<Vec<u8>> = labels.into_iter().map(Into::into).collect();

        let mut wire_len = 1;
        for label in &labels {
            if label.is_empty() {
                return Err(Error::InvalidName("empty label".to_string()));
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(Error::InvalidName(format!(
                    "label of {} bytes exceeds {}",
                    label.len(),
                    MAX_LABEL_LEN
                )));
            }
            wire_len += 1 + label.len();
        }
        if wire_len > MAX_NAME_LEN {
            return Err(Error::InvalidName(format!(
                "name of {} bytes exceeds {}",
                wire_len, MAX_NAME_LEN
            )));
        }

        Ok(Self { labels })
    }

    pub fn labels(&self) -> impl Iterator<Item = &[u8]> {
        self.labels.iter().map(Vec::as_slice)
    }

    pub fn is_root(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of bytes [`Name::encode`] writes.
    pub fn wire_len(&self) -> usize {
        1 + self.labels.iter().map(|l| 1 + l.len()).sum::<usize>()
    }

    /// Decode a name starting at `start`, following compression pointers.
    ///
    /// Returns the name and the number of bytes it occupies at `start`: up to
    /// and including the terminating zero octet, or the first pointer.
    ///
    /// A pointer must target an offset strictly below the start of the label
    /// run it was found in. Every jump therefore moves backwards through the
    /// buffer and decoding always terminates.
    pub fn decode(buf: &[u8], start: usize) -> Result<(Self, usize)> {
        let mut labels = Vec::new();
        let mut wire_len = 1;
        let mut pos = start;
        let mut run_start = start;
        let mut consumed = None;

        loop {
            let len = *buf
                .get(pos)
                .ok_or_else(|| out_of_bounds(consumed.is_some(), pos))?;

            match len {
                0 => {
                    // after a jump `pos` may sit below `start`
                    let consumed = consumed.unwrap_or_else(|| pos + 1 - start);
                    return Ok((Self { labels }, consumed));
                }
                1..=0x3F => {
                    let len = usize::from(len);
                    let label = buf
                        .get(pos + 1..pos + 1 + len)
                        .ok_or_else(|| out_of_bounds(consumed.is_some(), pos))?;
                    wire_len += 1 + len;
                    if wire_len > MAX_NAME_LEN {
                        return Err(Error::MalformedName { offset: pos });
                    }
                    labels.push(label.to_vec());
                    pos += 1 + len;
                }
                0xC0..=0xFF => {
                    let low = *buf
                        .get(pos + 1)
                        .ok_or_else(|| out_of_bounds(consumed.is_some(), pos))?;
                    let target = usize::from(u16::from_be_bytes([len & 0x3F, low]));
                    if target >= run_start {
                        return Err(Error::MalformedName { offset: pos });
                    }
                    if consumed.is_none() {
                        consumed = Some(pos + 2 - start);
                    }
                    run_start = target;
                    pos = target;
                }
                // 0b01 and 0b10 label types are reserved
                _ => return Err(Error::MalformedName { offset: pos }),
            }
        }
    }

    /// Append the uncompressed wire form to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        for label in &self.labels {
            buf.push(label.len() as u8);
            buf.extend_from_slice(label);
        }
        buf.push(0);
    }

    pub fn to_wire(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.wire_len());
        self.encode(&mut buf);
        buf
    }
}

/// Running off the end before any jump is truncation; running off the
/// end after a jump means the pointer led somewhere bogus.
fn out_of_bounds(jumped: bool, offset: usize) -> Error {
    if jumped {
        Error::MalformedName { offset }
    } else {
        Error::TruncatedMessage { offset }
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.strip_suffix('.').unwrap_or(s);
        if s.is_empty() {
            return Ok(Self::root());
        }
        Self::from_labels(s.split('.').map(str::as_bytes))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str(".");
        }
        for (i, label) in self.labels.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(&String::from_utf8_lossy(label))?;
        }
        Ok(())
    }
}
