//! DNS message parsing and construction.
//!
//! Names are decoded into their fully expanded label form and always
//! encoded without compression. Every read from a wire buffer is bounds
//! checked, so untrusted datagrams surface as [`Error`]s instead of panics.

mod message;
mod name;

pub use message::{
    Flags, Header, Message, Question, ResourceRecord, decode_answers, decode_questions,
};
pub use name::Name;

use crate::error::{Error, Result};

/// Length of the fixed message header.
pub const HEADER_LEN: usize = 12;

pub const TYPE_A: u16 = 1;
pub const TYPE_NS: u16 = 2;
pub const TYPE_CNAME: u16 = 5;
pub const TYPE_SOA: u16 = 6;
pub const TYPE_PTR: u16 = 12;
pub const TYPE_MX: u16 = 15;

pub const CLASS_IN: u16 = 1;

pub const OPCODE_QUERY: u8 = 0;

pub const RCODE_NO_ERROR: u8 = 0;
pub const RCODE_NOT_IMPLEMENTED: u8 = 4;

fn slice(buf: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    offset
        .checked_add(len)
        .and_then(|end| buf.get(offset..end))
        .ok_or(Error::TruncatedMessage { offset })
}

fn read_u16(buf: &[u8], offset: usize) -> Result<u16> {
    let b = slice(buf, offset, 2)?;
    Ok(u16::from_be_bytes([b[0], b[1]]))
}

fn read_u32(buf: &[u8], offset: usize) -> Result<u32> {
    let b = slice(buf, offset, 4)?;
    Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}
