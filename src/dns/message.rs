//! Header, question and resource record codecs.

use std::net::Ipv4Addr;

use super::{
    CLASS_IN, HEADER_LEN, Name, TYPE_A, TYPE_CNAME, TYPE_MX, TYPE_NS, TYPE_PTR, TYPE_SOA, read_u16,
    read_u32, slice,
};
use crate::error::{Error, Result};

/// The header flags word.
///
/// Bit layout, most significant first: QR(1) Opcode(4) AA(1) TC(1) RD(1)
/// RA(1) Z(3) RCODE(4).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags(u16);

impl Flags {
    const QR: u16 = 1 << 15;
    const AA: u16 = 1 << 10;
    const TC: u16 = 1 << 9;
    const RD: u16 = 1 << 8;
    const RA: u16 = 1 << 7;

    pub fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    /// Flags for an outbound standard query with recursion desired.
    pub fn query() -> Self {
        Self(Self::RD)
    }

    /// Flags for a response. AA, TC, RA and Z are always clear.
    pub fn response(opcode: u8, rd: bool, rcode: u8) -> Self {
        let mut bits = Self::QR | (u16::from(opcode & 0x0F) << 11) | u16::from(rcode & 0x0F);
        if rd {
            bits |= Self::RD;
        }
        Self(bits)
    }

    pub fn qr(self) -> bool {
        self.0 & Self::QR != 0
    }

    pub fn opcode(self) -> u8 {
        ((self.0 >> 11) & 0x0F) as u8
    }

    pub fn aa(self) -> bool {
        self.0 & Self::AA != 0
    }

    pub fn tc(self) -> bool {
        self.0 & Self::TC != 0
    }

    pub fn rd(self) -> bool {
        self.0 & Self::RD != 0
    }

    pub fn ra(self) -> bool {
        self.0 & Self::RA != 0
    }

    pub fn z(self) -> u8 {
        ((self.0 >> 4) & 0x07) as u8
    }

    pub fn rcode(self) -> u8 {
        (self.0 & 0x0F) as u8
    }
}

/// The fixed 12-byte message header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Header {
    pub id: u16,
    pub flags: Flags,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

impl Header {
    /// A header with all section counts zero.
    pub fn new(id: u16, flags: Flags) -> Self {
        Self {
            id,
            flags,
            ..Self::default()
        }
    }

    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_LEN {
            return Err(Error::TruncatedMessage { offset: buf.len() });
        }

        Ok(Self {
            id: read_u16(buf, 0)?,
            flags: Flags(read_u16(buf, 2)?),
            qdcount: read_u16(buf, 4)?,
            ancount: read_u16(buf, 6)?,
            nscount: read_u16(buf, 8)?,
            arcount: read_u16(buf, 10)?,
        })
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..2].copy_from_slice(&self.id.to_be_bytes());
        out[2..4].copy_from_slice(&self.flags.0.to_be_bytes());
        out[4..6].copy_from_slice(&self.qdcount.to_be_bytes());
        out[6..8].copy_from_slice(&self.ancount.to_be_bytes());
        out[8..10].copy_from_slice(&self.nscount.to_be_bytes());
        out[10..12].copy_from_slice(&self.arcount.to_be_bytes());
        out
    }
}

/// A question section entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub name: Name,
    pub qtype: u16,
    pub qclass: u16,
}

impl Question {
    pub fn new(name: Name, qtype: u16, qclass: u16) -> Self {
        Self {
            name,
            qtype,
            qclass,
        }
    }

    /// Decode a question at `offset`, returning it and the offset just past it.
    pub fn decode(buf: &[u8], offset: usize) -> Result<(Self, usize)> {
        let (name, used) = Name::decode(buf, offset)?;
        let pos = offset + used;
        let qtype = read_u16(buf, pos)?;
        let qclass = read_u16(buf, pos + 2)?;

        Ok((Self::new(name, qtype, qclass), pos + 4))
    }

    pub fn encode(&self, buf: &mut Vec<u8>) {
        self.name.encode(buf);
        buf.extend_from_slice(&self.qtype.to_be_bytes());
        buf.extend_from_slice(&self.qclass.to_be_bytes());
    }
}

/// A resource record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub name: Name,
    pub rtype: u16,
    pub class: u16,
    pub ttl: u32,
    pub rdata: Vec<u8>,
}

impl ResourceRecord {
    /// An `IN A` record mapping `name` to `ip`.
    pub fn a(name: Name, ip: Ipv4Addr, ttl: u32) -> Self {
        Self {
            name,
            rtype: TYPE_A,
            class: CLASS_IN,
            ttl,
            rdata: ip.octets().to_vec(),
        }
    }

    /// The address carried by an A record.
    pub fn ipv4(&self) -> Option<Ipv4Addr> {
        if self.rtype != TYPE_A {
            return None;
        }
        let octets: [u8; 4] = self.rdata.as_slice().try_into().ok()?;
        Some(Ipv4Addr::from(octets))
    }

    /// Decode a record at `offset`, returning it and the offset just past it.
    ///
    /// Names inside NS, CNAME, PTR, MX and SOA rdata may be compressed
    /// against `buf`; they are stored expanded so the record stays valid once
    /// copied into another message. Other rdata is kept as is.
    pub fn decode(buf: &[u8], offset: usize) -> Result<(Self, usize)> {
        let (name, used) = Name::decode(buf, offset)?;
        let pos = offset + used;
        let rtype = read_u16(buf, pos)?;
        let class = read_u16(buf, pos + 2)?;
        let ttl = read_u32(buf, pos + 4)?;
        let rdlength = usize::from(read_u16(buf, pos + 8)?);
        let rdata_start = pos + 10;
        let rdata = expand_rdata(buf, rtype, rdata_start, rdlength)?;

        let record = Self {
            name,
            rtype,
            class,
            ttl,
            rdata,
        };
        Ok((record, rdata_start + rdlength))
    }

    pub fn encode(&self, buf: &mut Vec<u8>) {
        self.name.encode(buf);
        buf.extend_from_slice(&self.rtype.to_be_bytes());
        buf.extend_from_slice(&self.class.to_be_bytes());
        buf.extend_from_slice(&self.ttl.to_be_bytes());
        buf.extend_from_slice(&(self.rdata.len() as u16).to_be_bytes());
        buf.extend_from_slice(&self.rdata);
    }
}

/// Copy the rdata at `start`, expanding any compressed names it carries.
///
/// Layouts: NS/CNAME/PTR = name, MX = preference(2) name, SOA = mname rname
/// and five 32-bit fields. The expanded fields must cover exactly `len` bytes.
fn expand_rdata(buf: &[u8], rtype: u16, start: usize, len: usize) -> Result<Vec<u8>> {
    let raw = slice(buf, start, len)?;
    let (prefix, names, suffix) = match rtype {
        TYPE_NS | TYPE_CNAME | TYPE_PTR => (0, 1, 0),
        TYPE_MX => (2, 1, 0),
        TYPE_SOA => (0, 2, 20),
        _ => return Ok(raw.to_vec()),
    };

    let mut rdata = Vec::with_capacity(len);
    let mut pos = start;

    rdata.extend_from_slice(slice(buf, pos, prefix)?);
    pos += prefix;
    for _ in 0..names {
        let (name, used) = Name::decode(buf, pos)?;
        name.encode(&mut rdata);
        pos += used;
    }
    rdata.extend_from_slice(slice(buf, pos, suffix)?);
    pos += suffix;

    if pos != start + len {
        return Err(Error::MalformedName { offset: start });
    }
    Ok(rdata)
}

/// Decode `count` questions starting right after the header.
///
/// Returns the questions and the offset just past the last one.
pub fn decode_questions(buf: &[u8], count: u16) -> Result<(Vec<Question>, usize)> {
    let mut questions = Vec::new();
    let mut pos = HEADER_LEN;

    for _ in 0..count {
        let (question, next) = Question::decode(buf, pos)?;
        questions.push(question);
        pos = next;
    }

    Ok((questions, pos))
}

/// Decode `count` resource records starting at `start`.
pub fn decode_answers(buf: &[u8], start: usize, count: u16) -> Result<Vec<ResourceRecord>> {
    let mut answers = Vec::new();
    let mut pos = start;

    for _ in 0..count {
        let (record, next) = ResourceRecord::decode(buf, pos)?;
        answers.push(record);
        pos = next;
    }

    Ok(answers)
}

/// A decoded message. Authority and additional sections are not carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: Header,
    pub questions: Vec<Question>,
    pub answers: Vec<ResourceRecord>,
}

impl Message {
    /// Decode the header and question section, ignoring anything after it.
    pub fn parse_query(buf: &[u8]) -> Result<Self> {
        let header = Header::parse(buf)?;
        let (questions, _) = decode_questions(buf, header.qdcount)?;

        Ok(Self {
            header,
            questions,
            answers: Vec::new(),
        })
    }

    /// Decode the header, question section and answer section.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        let header = Header::parse(buf)?;
        let (questions, answers_start) = decode_questions(buf, header.qdcount)?;
        let answers = decode_answers(buf, answers_start, header.ancount)?;

        Ok(Self {
            header,
            questions,
            answers,
        })
    }

    /// Encode the message. Section counts are taken from the carried
    /// sections; NSCOUNT and ARCOUNT are always zero.
    pub fn to_bytes(&self) -> Vec<u8> {
        let header = Header {
            qdcount: self.questions.len() as u16,
            ancount: self.answers.len() as u16,
            nscount: 0,
            arcount: 0,
            ..self.header
        };

        let mut data = Vec::with_capacity(512);
        data.extend_from_slice(&header.to_bytes());
        for q in &self.questions {
            q.encode(&mut data);
        }
        for a in &self.answers {
            a.encode(&mut data);
        }
        data
    }
}
