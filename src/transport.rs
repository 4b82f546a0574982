//! The transport boundary (SPEC_FULL.md §4.10): the wire codec and network stack are external
//! collaborators out of scope for this crate (§1); this module is the seam their replacement
//! plugs into.

pub mod local;

use crate::{error::Result, service::ServiceRequest, service::ServiceResponse};

/// An open channel to one remote endpoint, as seen by a client session (§4.7).
///
/// Implementations own whatever the real wire codec needs (a TCP socket, a secure channel);
/// this crate only ever calls `send` and never inspects the encoded bytes.
pub trait Transport: Send + Sync {
    /// Sends one service request and blocks for its response. Mirrors "a worker performs one
    /// blocking service call at a time on its chosen session's transport handle" (§5).
    fn send(&self, request: ServiceRequest) -> Result<ServiceResponse>;

    /// Endpoint URI this transport is connected to, for diagnostics and `Faulted` reporting.
    fn endpoint_uri(&self) -> &str;
}

/// Connects to an endpoint URI, producing a ready-to-use [`Transport`].
///
/// The one reference implementation ([`local::LocalTransport`]) connects in-process to a
/// [`crate::server::Server`]; a real deployment substitutes a TCP-backed implementation without
/// this crate changing.
pub trait Connector: Send + Sync {
    fn connect(&self, endpoint_uri: &str) -> Result<Box<dyn Transport>>;
}
