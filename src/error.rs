//! Error taxonomy for the proxy.
//!
//! Codec and policy failures are recoverable: each one maps onto a DNS
//! response code that is sent back to the client. Transport failures abandon
//! the current datagram. Only bind and blocklist failures at startup are fatal.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::dns::ResponseCode;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("message truncated: got {len} bytes")]
    TruncatedMessage { len: usize },

    #[error("malformed name at offset {offset}")]
    MalformedName { offset: usize },

    #[error("invalid query shape: {0}")]
    QueryShapeInvalid(&'static str),

    #[error("unsupported query type={qtype} class={qclass}")]
    UnsupportedQueryType { qtype: u16, qclass: u16 },

    #[error("name is blacklisted")]
    Blocked,

    #[error("no pending query with id {id:#06x}")]
    LookupMiss { id: u16 },

    #[error("failed to {action} datagram: {source}")]
    Transport {
        action: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to read blacklist {}: {source}", path.display())]
    Blocklist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// The response code a client receives when its query fails this way,
    /// or `None` when the failure is not answered at all.
    pub fn response_code(&self) -> Option<ResponseCode> {
        match self {
            Error::TruncatedMessage { .. }
            | Error::MalformedName { .. }
            | Error::QueryShapeInvalid(_) => Some(ResponseCode::FormErr),
            Error::UnsupportedQueryType { .. } => Some(ResponseCode::NotImp),
            Error::Blocked => Some(ResponseCode::Refused),
            Error::LookupMiss { .. }
            | Error::Transport { .. }
            | Error::Bind { .. }
            | Error::Blocklist { .. } => None,
        }
    }

    pub(crate) fn transport(action: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| Error::Transport { action, source }
    }
}
