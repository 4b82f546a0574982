//! Indexed set of client sessions (§4.9): endpoint discovery and connect/disconnect lifecycle.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::{
    config::{ApplicationConfig, Endpoint, SecurityMode},
    error::{Error, Result},
    service::{ServiceRequest, ServiceResponse},
    session::Session,
    transport::Connector,
};

/// Maintains `endpointUri → session` (§4.9).
pub struct SessionManager {
    connector: Arc<dyn Connector>,
    request_timeout: Duration,
    max_continuation_points: usize,
    auto_connect_after_discovery: bool,
    sessions: Mutex<HashMap<String, Arc<Session>>>,
}

impl SessionManager {
    #[must_use]
    pub fn new(
        connector: Arc<dyn Connector>,
        request_timeout: Duration,
        max_continuation_points: usize,
        auto_connect_after_discovery: bool,
    ) -> Self {
        Self {
            connector,
            request_timeout,
            max_continuation_points,
            auto_connect_after_discovery,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn session(&self, endpoint_uri: &str) -> Option<Arc<Session>> {
        self.sessions.lock().get(endpoint_uri).cloned()
    }

    /// Connects to `endpoint_uri` if not already connected, driving the session through
    /// `Idle → Discovering → Connecting → Active` (§4.7).
    pub fn connect(&self, endpoint_uri: &str) -> Result<Arc<Session>> {
        if let Some(session) = self.session(endpoint_uri) {
            return Ok(session);
        }
        let session = Arc::new(Session::new(endpoint_uri, self.request_timeout, self.max_continuation_points));
        session.start_discovery();
        session.start_connecting();
        let transport = self.connector.connect(endpoint_uri)?;
        session.activate(transport);
        self.sessions.lock().insert(endpoint_uri.to_owned(), Arc::clone(&session));
        Ok(session)
    }

    pub fn disconnect(&self, endpoint_uri: &str) -> Result<()> {
        let session = self
            .sessions
            .lock()
            .remove(endpoint_uri)
            .ok_or_else(|| Error::NoSuchSession(endpoint_uri.to_owned()))?;
        session.disconnect();
        Ok(())
    }

    /// `getEndpointInfo` (§4.9): connects to `endpoint_uri` and issues `GetEndpoints`. When the
    /// "auto-connect after discovery" flag is set, a session is started for every endpoint found.
    pub fn get_endpoint_info(&self, endpoint_uri: &str) -> Result<Vec<Endpoint>> {
        let transport = self.connector.connect(endpoint_uri)?;
        let ServiceResponse::GetEndpoints(endpoints) = transport.send(ServiceRequest::GetEndpoints)? else {
            return Err(Error::transport("GetEndpoints service returned an unexpected response shape"));
        };
        if self.auto_connect_after_discovery {
            for endpoint in &endpoints {
                let _ = self.connect(&endpoint.endpoint_uri);
            }
        }
        Ok(endpoints)
    }

    /// `findServers` (§4.9): connects to `discovery_uri` and issues `FindServers`.
    pub fn find_servers(&self, discovery_uri: &str) -> Result<Vec<ApplicationConfig>> {
        let transport = self.connector.connect(discovery_uri)?;
        let ServiceResponse::FindServers(applications) = transport.send(ServiceRequest::FindServers)? else {
            return Err(Error::transport("FindServers service returned an unexpected response shape"));
        };
        if applications.is_empty() {
            return Err(Error::transport(format!("no servers found at {discovery_uri}")));
        }
        Ok(applications)
    }
}

/// Convenience constructor for the seed scenario's single `None`-security endpoint.
#[must_use]
pub fn endpoint(endpoint_uri: impl Into<String>) -> Endpoint {
    Endpoint {
        endpoint_uri: endpoint_uri.into(),
        security_mode: SecurityMode::None,
        security_policy_uri: "http://opcfoundation.org/UA/SecurityPolicy#None".to_owned(),
    }
}
