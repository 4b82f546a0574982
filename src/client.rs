//! The client façade: combines the session manager, messaging fabric, and browse engine behind
//! one asynchronous request/response surface for the host application (§1).

use std::sync::Arc;
use std::time::Duration;

use crate::{
    browse::{browse, BrowseEvent, BrowseRoot},
    config::{ApplicationConfig, Config, Endpoint},
    error::{Error, Result},
    service::{ServiceRequest, ServiceResponse},
    session::Session,
    session_manager::SessionManager,
    transport::Connector,
};

/// Default cap on the client-side continuation-point cache (§4.7); real deployments size this
/// from the server-advertised `MaxBrowseContinuationPoints`.
pub const DEFAULT_MAX_CONTINUATION_POINTS: usize = 64;

/// One logical application driving zero or more sessions (§1, §4.9).
pub struct Client {
    config: Config,
    manager: SessionManager,
}

impl Client {
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    #[must_use]
    pub fn connect(&self, endpoint_uri: &str) -> Result<Arc<Session>> {
        self.manager.connect(endpoint_uri)
    }

    pub fn disconnect(&self, endpoint_uri: &str) -> Result<()> {
        self.manager.disconnect(endpoint_uri)
    }

    #[must_use]
    pub fn session(&self, endpoint_uri: &str) -> Option<Arc<Session>> {
        self.manager.session(endpoint_uri)
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    pub fn get_endpoint_info(&self, endpoint_uri: &str) -> Result<Vec<Endpoint>> {
        self.manager.get_endpoint_info(endpoint_uri)
    }

    pub fn find_servers(&self, discovery_uri: &str) -> Result<Vec<ApplicationConfig>> {
        self.manager.find_servers(discovery_uri)
    }

    /// Issues one service request against `endpoint_uri`'s session. A real deployment would route
    /// this through the messaging fabric's send/receive queues (§4.6); exposed directly here so
    /// callers that do not need queued back-pressure can call through synchronously.
    pub fn call_service(&self, endpoint_uri: &str, request: ServiceRequest) -> Result<ServiceResponse> {
        let session = self
            .manager
            .session(endpoint_uri)
            .ok_or_else(|| Error::NoSuchSession(endpoint_uri.to_owned()))?;
        session
            .with_transport(|transport| transport.send(request))
            .ok_or(Error::SessionClosed)?
    }

    /// Runs the browse engine (§4.8) against `endpoint_uri`'s session.
    pub fn browse(
        &self,
        endpoint_uri: &str,
        roots: Vec<BrowseRoot>,
        batch_size: usize,
        on_reference: impl FnMut(BrowseEvent),
        on_error: impl FnMut(Error),
    ) -> Result<()> {
        let session = self
            .manager
            .session(endpoint_uri)
            .ok_or_else(|| Error::NoSuchSession(endpoint_uri.to_owned()))?;
        session
            .with_transport(|transport| browse(transport, roots, batch_size, on_reference, on_error))
            .ok_or(Error::SessionClosed)?
    }
}

/// Builder for [`Client`] (consuming-builder style, as used throughout this crate).
pub struct ClientBuilder {
    config: Config,
    connector: Option<Arc<dyn Connector>>,
    max_continuation_points: usize,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            config: Config::default(),
            connector: None,
            max_continuation_points: DEFAULT_MAX_CONTINUATION_POINTS,
        }
    }
}

impl ClientBuilder {
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    #[must_use]
    pub const fn max_continuation_points(mut self, max_continuation_points: usize) -> Self {
        self.max_continuation_points = max_continuation_points;
        self
    }

    pub fn build(self) -> Result<Client> {
        let connector = self
            .connector
            .ok_or_else(|| Error::invalid_argument("client requires a connector"))?;
        let manager = SessionManager::new(
            connector,
            Duration::from_millis(self.config.request_timeout_ms),
            self.max_continuation_points,
            self.config.auto_connect_after_discovery,
        );
        Ok(Client {
            config: self.config,
            manager,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Client;
    use crate::node_store::{variable_data, NodeItem, NodeKind, OBJECTS_FOLDER};
    use crate::server::Server;
    use crate::service::{ReadItem, ServiceRequest, ServiceResponse};
    use crate::transport::local::LocalConnector;
    use crate::ua::{AttributeId, LocalizedText, NodeId, QualifiedName, Scalar, Variant};
    use std::sync::Arc;

    #[test]
    fn read_scalar_double_round_trip() {
        let server = Arc::new(Server::new(Default::default()));
        let node_id = NodeId::numeric(1, 1);
        server
            .node_store()
            .create_node(
                NodeItem::new(
                    node_id.clone(),
                    QualifiedName::new(1, "Double"),
                    LocalizedText::plain("Double"),
                    NodeKind::Variable(variable_data(
                        NodeId::numeric(0, 11),
                        -1,
                        Vec::new(),
                        Variant::Scalar(Scalar::Double(50.4)),
                    )),
                )
                .with_source(NodeId::numeric(0, OBJECTS_FOLDER)),
            )
            .unwrap();

        let connector = Arc::new(LocalConnector::new());
        connector.register("opc.tcp://localhost:12686/edge-opc-server", server);
        let client = Client::builder().connector(connector).build().unwrap();
        client.connect("opc.tcp://localhost:12686/edge-opc-server").unwrap();

        let ServiceResponse::Read(results) = client
            .call_service(
                "opc.tcp://localhost:12686/edge-opc-server",
                ServiceRequest::Read(vec![ReadItem {
                    node_id,
                    attribute_id: AttributeId::VALUE,
                    index_range: None,
                    diagnostic_info: None,
                }]),
            )
            .unwrap()
        else {
            panic!("expected a Read response");
        };
        assert_eq!(results[0].value, Variant::Scalar(Scalar::Double(50.4)));
    }
}
