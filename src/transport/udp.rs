//! UDP transport for DNS queries.
//!
//! A single task multiplexes the client-facing listener and the upstream
//! socket with `select!`. Each datagram is processed to completion before the
//! next wait, so the pending table is owned by the loop and needs no locking.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::dns::{self, ResponseCode};
use crate::error::{Error, Result};
use crate::pending::PendingTable;
use crate::resolver::{QueryAction, Resolver};
use crate::stats::Stats;

use super::{Classification, Direction, EventSink, MAX_DNS_PACKET_SIZE, QueryEvent};

/// UDP transport for DNS proxy.
///
/// Owns both endpoints; dropping it releases them.
pub struct UdpTransport {
    socket: UdpSocket,
    upstream_socket: UdpSocket,
    upstream_addr: SocketAddr,
}

impl UdpTransport {
    /// Bind UDP sockets for the transport.
    ///
    /// Creates a listening socket on `addr` and an ephemeral socket, of the
    /// upstream's address family, for talking to `upstream_addr`.
    pub async fn bind(addr: SocketAddr, upstream_addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;

        let upstream_bind = if upstream_addr.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        let upstream_socket = UdpSocket::bind(upstream_bind)
            .await
            .map_err(|source| Error::Bind {
                addr: upstream_bind,
                source,
            })?;

        Ok(Self {
            socket,
            upstream_socket,
            upstream_addr,
        })
    }

    /// Address of the client-facing listener.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Local address of the socket used to reach the upstream.
    pub fn upstream_local_addr(&self) -> io::Result<SocketAddr> {
        self.upstream_socket.local_addr()
    }

    /// Run the dispatch loop until `shutdown` is cancelled.
    ///
    /// Per-datagram failures are logged and never end the loop.
    pub async fn run<S: EventSink>(
        self,
        resolver: Resolver,
        pending: PendingTable,
        sink: S,
        stats: Arc<Stats>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        let mut dispatcher = Dispatcher {
            transport: self,
            resolver,
            pending,
            sink,
            stats,
        };
        // One spare byte so a datagram longer than the limit shows up as
        // `len > MAX_DNS_PACKET_SIZE` instead of being cut silently.
        let mut client_buf = [0u8; MAX_DNS_PACKET_SIZE + 1];
        let mut upstream_buf = [0u8; MAX_DNS_PACKET_SIZE + 1];

        while !shutdown.is_cancelled() {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                result = dispatcher.transport.socket.recv_from(&mut client_buf) => {
                    match result {
                        Ok((len, src)) => dispatcher.on_query(&client_buf[..len], src).await,
                        Err(e) => warn!("{}", Error::transport("receive")(e)),
                    }
                }
                result = dispatcher.transport.upstream_socket.recv_from(&mut upstream_buf) => {
                    match result {
                        Ok((len, src)) => dispatcher.on_answer(&upstream_buf[..len], src).await,
                        Err(e) => warn!("{}", Error::transport("receive upstream")(e)),
                    }
                }
            }
        }

        debug!("UDP transport shutting down");
        Ok(())
    }
}

struct Dispatcher<S> {
    transport: UdpTransport,
    resolver: Resolver,
    pending: PendingTable,
    sink: S,
    stats: Arc<Stats>,
}

impl<S: EventSink> Dispatcher<S> {
    async fn on_query(&mut self, query: &[u8], src: SocketAddr) {
        let action = if query.len() > MAX_DNS_PACKET_SIZE {
            let reason = Error::TruncatedMessage { len: query.len() };
            Resolver::refuse(&query[..MAX_DNS_PACKET_SIZE], None, reason)
        } else {
            self.resolver.process_query(query)
        };

        match action {
            QueryAction::Refuse {
                response,
                rcode,
                name,
                reason,
            } => {
                if rcode != ResponseCode::Refused {
                    warn!(client = %src, "{reason}, sending rcode {}", u8::from(rcode));
                }
                self.report(Direction::Query, rcode.into(), src, src, name);

                if let Err(e) = self.transport.socket.send_to(&response, src).await {
                    warn!(client = %src, "{}", Error::transport("send")(e));
                }
            }
            QueryAction::Forward { id, name } => {
                let upstream_addr = self.transport.upstream_addr;
                self.pending.record(id, src);
                self.report(
                    Direction::Query,
                    Classification::Forwarded,
                    src,
                    upstream_addr,
                    Some(name),
                );

                if let Err(e) = self
                    .transport
                    .upstream_socket
                    .send_to(query, upstream_addr)
                    .await
                {
                    warn!(upstream = %upstream_addr, "{}", Error::transport("forward")(e));
                }
            }
        }
    }

    async fn on_answer(&mut self, answer: &[u8], src: SocketAddr) {
        if src != self.transport.upstream_addr {
            warn!(
                expected = %self.transport.upstream_addr,
                actual = %src,
                "answer from unexpected source"
            );
        }
        if answer.len() > MAX_DNS_PACKET_SIZE {
            let err = Error::TruncatedMessage { len: answer.len() };
            debug!(upstream = %src, "dropping answer: {err}");
            self.stats.record_dropped();
            return;
        }

        let header = match dns::decode_header(answer) {
            Ok(header) => header,
            Err(e) => {
                debug!(upstream = %src, "dropping answer: {e}");
                self.stats.record_dropped();
                return;
            }
        };
        let name = dns::decode_question(answer).ok().map(|q| q.name);

        let Some(entry) = self.pending.lookup(header.id) else {
            debug!(upstream = %src, "dropping answer: {}", Error::LookupMiss { id: header.id });
            self.stats.record_dropped();
            return;
        };

        self.report(
            Direction::Answer,
            Classification::Answer,
            src,
            entry.client,
            name,
        );

        if let Err(e) = self.transport.socket.send_to(answer, entry.client).await {
            warn!(client = %entry.client, "{}", Error::transport("send")(e));
        }
    }

    fn report(
        &self,
        direction: Direction,
        classification: Classification,
        source: SocketAddr,
        destination: SocketAddr,
        name: Option<String>,
    ) {
        self.stats.record(classification);
        self.sink.record(QueryEvent {
            direction,
            classification,
            source,
            destination,
            name,
        });
    }
}
