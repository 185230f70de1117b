//! Transport layer for the DNS proxy.
//!
//! Provides the UDP dispatcher that receives queries from clients, forwards
//! them to the upstream resolver, and routes answers back. Every processed
//! datagram is reported to an [`EventSink`].

pub mod udp;

use std::fmt;
use std::net::SocketAddr;

use tracing::info;

use crate::dns::ResponseCode;

/// Largest datagram handled; longer ones are refused or dropped.
pub const MAX_DNS_PACKET_SIZE: usize = 1000;

/// Which way a datagram travelled through the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Query,
    Answer,
}

/// What the proxy did with a datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Forwarded,
    FormatError,
    NotImplemented,
    Blacklisted,
    Answer,
}

impl Classification {
    fn as_str(self) -> &'static str {
        match self {
            Classification::Forwarded => "query",
            Classification::FormatError => "format error",
            Classification::NotImplemented => "not implemented",
            Classification::Blacklisted => "blacklisted",
            Classification::Answer => "answer",
        }
    }
}

impl From<ResponseCode> for Classification {
    fn from(rcode: ResponseCode) -> Self {
        match rcode {
            ResponseCode::NotImp => Classification::NotImplemented,
            ResponseCode::Refused => Classification::Blacklisted,
            ResponseCode::FormErr | ResponseCode::NoError => Classification::FormatError,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One processed query or answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryEvent {
    pub direction: Direction,
    pub classification: Classification,
    pub source: SocketAddr,
    pub destination: SocketAddr,
    /// Decoded query name, when the question could be decoded.
    pub name: Option<String>,
}

/// Receives an event for every datagram the dispatcher processes.
pub trait EventSink {
    fn record(&self, event: QueryEvent);
}

/// Event sink that writes each event as a structured log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryLogger;

impl EventSink for QueryLogger {
    fn record(&self, event: QueryEvent) {
        let name = event.name.as_deref().unwrap_or("unknown name");
        let arrow = match event.direction {
            Direction::Query => "-->",
            Direction::Answer => "<--",
        };
        info!(
            direction = ?event.direction,
            classification = %event.classification,
            source = %event.source,
            destination = %event.destination,
            name,
            "{arrow}"
        );
    }
}
