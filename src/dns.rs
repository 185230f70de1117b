//! DNS message parsing and error-response construction.
//!
//! Only the 12-byte header and the first question are ever decoded. Names
//! using compression pointers are rejected rather than followed.

use crate::error::{Error, Result};

pub const HEADER_LEN: usize = 12;

/// Record type for IPv4 address records.
pub const TYPE_A: u16 = 1;
/// The Internet class.
pub const CLASS_IN: u16 = 1;

/// RFC 1035 section 2.3.4: names are at most 255 octets on the wire.
const MAX_NAME_LEN: usize = 255;
const LABEL_TYPE_MASK: u8 = 0xC0;

/// Response codes this proxy synthesizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    NoError,
    FormErr,
    NotImp,
    Refused,
}

impl From<ResponseCode> for u8 {
    fn from(rc: ResponseCode) -> Self {
        match rc {
            ResponseCode::NoError => 0,
            ResponseCode::FormErr => 1,
            ResponseCode::NotImp => 4,
            ResponseCode::Refused => 5,
        }
    }
}

/// The flags word of a DNS header, one field per bit group.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Flags {
    pub response: bool,
    pub opcode: u8,
    pub authoritative: bool,
    pub truncated: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
    /// The Z bit; must be zero.
    pub reserved: bool,
    pub authentic_data: bool,
    pub checking_disabled: bool,
    pub response_code: u8,
}

impl From<u16> for Flags {
    fn from(raw: u16) -> Self {
        let bit = |n: u16| (raw >> n) & 1 == 1;
        Self {
            response: bit(15),
            opcode: ((raw >> 11) & 0xF) as u8,
            authoritative: bit(10),
            truncated: bit(9),
            recursion_desired: bit(8),
            recursion_available: bit(7),
            reserved: bit(6),
            authentic_data: bit(5),
            checking_disabled: bit(4),
            response_code: (raw & 0xF) as u8,
        }
    }
}

impl From<Flags> for u16 {
    fn from(flags: Flags) -> Self {
        let mut raw = 0u16;
        raw |= u16::from(flags.response) << 15;
        raw |= u16::from(flags.opcode & 0xF) << 11;
        raw |= u16::from(flags.authoritative) << 10;
        raw |= u16::from(flags.truncated) << 9;
        raw |= u16::from(flags.recursion_desired) << 8;
        raw |= u16::from(flags.recursion_available) << 7;
        raw |= u16::from(flags.reserved) << 6;
        raw |= u16::from(flags.authentic_data) << 5;
        raw |= u16::from(flags.checking_disabled) << 4;
        raw |= u16::from(flags.response_code & 0xF);
        raw
    }
}

/// A decoded DNS message header.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub id: u16,
    pub flags: Flags,
    pub question_count: u16,
    pub answer_count: u16,
    pub authority_count: u16,
    pub additional_count: u16,
}

impl Header {
    /// Encode the header to its 12-byte wire form.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..2].copy_from_slice(&self.id.to_be_bytes());
        out[2..4].copy_from_slice(&u16::from(self.flags).to_be_bytes());
        out[4..6].copy_from_slice(&self.question_count.to_be_bytes());
        out[6..8].copy_from_slice(&self.answer_count.to_be_bytes());
        out[8..10].copy_from_slice(&self.authority_count.to_be_bytes());
        out[10..12].copy_from_slice(&self.additional_count.to_be_bytes());
        out
    }

    /// Check the shape every inbound query must have.
    pub fn validate_query(&self) -> Result<()> {
        let reason = if self.flags.response {
            "response bit set"
        } else if self.flags.reserved {
            "reserved bit set"
        } else if self.flags.checking_disabled {
            "checking-disabled bit set"
        } else if self.question_count == 0 {
            "no question"
        } else if self.answer_count != 0 {
            "answer records in query"
        } else {
            return Ok(());
        };
        Err(Error::QueryShapeInvalid(reason))
    }
}

/// The first question of a DNS message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub name: String,
    pub qtype: u16,
    pub qclass: u16,
}

/// Decode the fixed header at the start of `bytes`.
pub fn decode_header(bytes: &[u8]) -> Result<Header> {
    let raw: &[u8; HEADER_LEN] = bytes
        .get(..HEADER_LEN)
        .and_then(|b| b.try_into().ok())
        .ok_or(Error::TruncatedMessage { len: bytes.len() })?;
    let field = |at: usize| u16::from_be_bytes([raw[at], raw[at + 1]]);

    Ok(Header {
        id: field(0),
        flags: Flags::from(field(2)),
        question_count: field(4),
        answer_count: field(6),
        authority_count: field(8),
        additional_count: field(10),
    })
}

/// Decode the question that immediately follows the header.
///
/// Every read is bounded by `bytes`. Label length bytes with either of the
/// top two bits set (compression pointers, extended label types) are rejected.
pub fn decode_question(bytes: &[u8]) -> Result<Question> {
    let mut pos = HEADER_LEN;
    let mut name = String::new();

    loop {
        let len = *bytes.get(pos).ok_or(Error::MalformedName { offset: pos })?;
        if len == 0 {
            pos += 1;
            break;
        }
        if len & LABEL_TYPE_MASK != 0 {
            return Err(Error::MalformedName { offset: pos });
        }

        let start = pos + 1;
        let end = start + len as usize;
        if end - HEADER_LEN + 1 > MAX_NAME_LEN {
            return Err(Error::MalformedName { offset: pos });
        }
        let label = bytes
            .get(start..end)
            .and_then(|label| std::str::from_utf8(label).ok())
            .ok_or(Error::MalformedName { offset: pos })?;

        if !name.is_empty() {
            name.push('.');
        }
        name.push_str(label);
        pos = end;
    }

    let tail = bytes
        .get(pos..pos + 4)
        .ok_or(Error::TruncatedMessage { len: bytes.len() })?;

    Ok(Question {
        name,
        qtype: u16::from_be_bytes([tail[0], tail[1]]),
        qclass: u16::from_be_bytes([tail[2], tail[3]]),
    })
}

/// Turn a query header into an error response header with the given code.
///
/// The id and question count are kept so the client can match the reply.
pub fn build_error_response(header: &Header, rcode: ResponseCode) -> Header {
    let mut response = *header;
    response.flags.response = true;
    response.flags.authoritative = true;
    response.flags.recursion_available = true;
    response.flags.response_code = rcode.into();
    response.answer_count = 0;
    response.authority_count = 0;
    response
}

/// Build the full error datagram for `datagram`.
///
/// The synthesized header replaces the first 12 bytes; everything after it is
/// sent back verbatim. Datagrams too short to hold a header are answered with
/// a header alone, missing bytes read as zero.
pub fn error_response(datagram: &[u8], rcode: ResponseCode) -> Vec<u8> {
    let header = match decode_header(datagram) {
        Ok(header) => header,
        Err(_) => {
            let mut raw = [0u8; HEADER_LEN];
            raw[..datagram.len()].copy_from_slice(datagram);
            Header {
                id: u16::from_be_bytes([raw[0], raw[1]]),
                flags: Flags::from(u16::from_be_bytes([raw[2], raw[3]])),
                question_count: u16::from_be_bytes([raw[4], raw[5]]),
                ..Header::default()
            }
        }
    };

    let mut response = build_error_response(&header, rcode).encode().to_vec();
    if let Some(rest) = datagram.get(HEADER_LEN..) {
        response.extend_from_slice(rest);
    }
    response
}
