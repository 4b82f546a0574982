//! The one reference [`Transport`] implementation: an in-process call directly into a
//! [`crate::server::Server`]'s dispatcher, skipping wire encoding entirely. Exists so the rest of
//! the crate (and its tests) can exercise the full client/server path without a real network
//! stack or wire codec, both of which are out of scope (§1).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    error::{Error, Result},
    server::Server,
    service::{ServiceRequest, ServiceResponse},
};

use super::{Connector, Transport};

/// Connects [`LocalTransport`]s to a fixed set of in-process servers, keyed by endpoint URI.
#[derive(Default)]
pub struct LocalConnector {
    servers: Mutex<HashMap<String, Arc<Server>>>,
}

impl LocalConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, endpoint_uri: impl Into<String>, server: Arc<Server>) {
        self.servers.lock().insert(endpoint_uri.into(), server);
    }
}

impl Connector for LocalConnector {
    fn connect(&self, endpoint_uri: &str) -> Result<Box<dyn Transport>> {
        let server = self
            .servers
            .lock()
            .get(endpoint_uri)
            .cloned()
            .ok_or_else(|| Error::transport(format!("no local server registered at {endpoint_uri}")))?;
        Ok(Box::new(LocalTransport {
            endpoint_uri: endpoint_uri.to_owned(),
            server,
        }))
    }
}

pub struct LocalTransport {
    endpoint_uri: String,
    server: Arc<Server>,
}

impl Transport for LocalTransport {
    fn send(&self, request: ServiceRequest) -> Result<ServiceResponse> {
        Ok(self.server.dispatch(request))
    }

    fn endpoint_uri(&self) -> &str {
        &self.endpoint_uri
    }
}
