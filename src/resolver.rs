//! DNS query resolution logic.
//!
//! Handles the query processing pipeline:
//! 1. Validate header shape and decode the question
//! 2. Refuse unsupported types/classes
//! 3. Filter against the blacklist
//! 4. Decide whether to refuse or forward
//!
//! Transports handle the actual I/O, resolver handles decisions.

use crate::dns::{self, CLASS_IN, ResponseCode, TYPE_A};
use crate::error::{Error, Result};
use crate::filter::Blocklist;

/// Action to take for a DNS query.
#[derive(Debug)]
pub enum QueryAction {
    /// Query is refused; send `response` straight back to the client.
    Refuse {
        response: Vec<u8>,
        rcode: ResponseCode,
        name: Option<String>,
        reason: Error,
    },
    /// Query should be forwarded to upstream verbatim.
    Forward { id: u16, name: String },
}

/// Resolver handles DNS query processing decisions.
pub struct Resolver {
    blocklist: Blocklist,
}

impl Resolver {
    pub fn new(blocklist: Blocklist) -> Self {
        Self { blocklist }
    }

    /// Process a raw client datagram and decide what action to take.
    pub fn process_query(&self, query: &[u8]) -> QueryAction {
        match self.check(query) {
            Ok((id, name)) => QueryAction::Forward { id, name },
            Err((name, reason)) => Self::refuse(query, name, reason),
        }
    }

    /// Build the refusal for `query`, answering with the code `reason` maps to.
    pub fn refuse(query: &[u8], name: Option<String>, reason: Error) -> QueryAction {
        let rcode = reason.response_code().unwrap_or(ResponseCode::FormErr);
        QueryAction::Refuse {
            response: dns::error_response(query, rcode),
            rcode,
            name,
            reason,
        }
    }

    fn check(&self, query: &[u8]) -> Result<(u16, String), (Option<String>, Error)> {
        let header = dns::decode_header(query).map_err(|e| (None, e))?;
        header.validate_query().map_err(|e| (None, e))?;
        let question = dns::decode_question(query).map_err(|e| (None, e))?;

        let name = question.name;
        if question.qtype == 0 || question.qclass == 0 {
            return Err((Some(name), Error::QueryShapeInvalid("reserved type or class")));
        }
        if question.qtype != TYPE_A || question.qclass != CLASS_IN {
            let err = Error::UnsupportedQueryType {
                qtype: question.qtype,
                qclass: question.qclass,
            };
            return Err((Some(name), err));
        }
        if self.blocklist.is_blocked(&name) {
            return Err((Some(name), Error::Blocked));
        }

        Ok((header.id, name))
    }

    /// Returns the number of fragments in the blocklist.
    pub fn blocked_count(&self) -> usize {
        self.blocklist.len()
    }
}
