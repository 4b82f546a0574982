//! The server façade: combines the node store, method registry, and service dispatcher behind
//! the builder idiom used throughout this crate's public API.

use std::sync::Arc;

use crate::{
    config::{ApplicationConfig, ApplicationType, Config, Endpoint, SecurityMode},
    error::Result,
    method_registry::{Method, MethodRegistry},
    node_store::{NodeItem, NodeStore},
    service::{ServiceDispatcher, ServiceRequest, ServiceResponse},
    ua::NodeId,
};

/// A running OPC UA server: one address space, one method registry, one dispatcher (§2).
pub struct Server {
    config: Config,
    dispatcher: ServiceDispatcher,
}

impl Server {
    #[must_use]
    pub fn new(config: Config) -> Self {
        let nodes = Arc::new(NodeStore::new());
        let methods = Arc::new(MethodRegistry::new());
        Self {
            config,
            dispatcher: ServiceDispatcher::new(nodes, methods),
        }
    }

    #[must_use]
    pub fn node_store(&self) -> &NodeStore {
        self.dispatcher.node_store()
    }

    /// Exposed for callers that need to unregister or query a callable independently of node
    /// lifecycle; node-and-callable creation itself goes through [`Server::create_method_node`].
    #[must_use]
    pub fn method_registry(&self) -> &MethodRegistry {
        self.dispatcher.method_registry()
    }

    /// `createMethodNode` (§4.2): creates the Method node and registers its callable atomically.
    pub fn create_method_node(&self, item: NodeItem, method: Box<dyn Method>) -> Result<NodeId> {
        self.dispatcher.create_method_node(item, method)
    }

    #[must_use]
    pub fn dispatch(&self, request: ServiceRequest) -> ServiceResponse {
        match request {
            ServiceRequest::GetEndpoints => ServiceResponse::GetEndpoints(self.endpoints()),
            ServiceRequest::FindServers => ServiceResponse::FindServers(vec![self.application_config()]),
            other => self.dispatcher.dispatch(other),
        }
    }

    /// Drives one subscription sampling tick (§4.4); call periodically from the server's event
    /// loop (§5 "the transport stack owns the event loop").
    pub fn tick(&self) {
        self.dispatcher.sample_subscriptions();
    }

    /// `GetEndpoints` (§6, seed scenario 1): the server's own advertised endpoint list.
    #[must_use]
    pub fn endpoints(&self) -> Vec<Endpoint> {
        vec![Endpoint {
            endpoint_uri: format!(
                "opc.tcp://{}:{}/{}",
                self.config.bind_address, self.config.bind_port, self.config.server_name
            ),
            security_mode: SecurityMode::None,
            security_policy_uri: "http://opcfoundation.org/UA/SecurityPolicy#None".to_owned(),
        }]
    }

    /// `FindServers` (§4.9): this application's own advertised identity.
    #[must_use]
    pub fn application_config(&self) -> ApplicationConfig {
        ApplicationConfig {
            application_uri: self.config.application_uri.clone(),
            product_uri: self.config.product_uri.clone(),
            application_name: self.config.application_name.clone(),
            application_type: ApplicationType::Server,
            gateway_uri: String::new(),
            discovery_profile_uri: String::new(),
            discovery_urls: self.endpoints().into_iter().map(|e| e.endpoint_uri).collect(),
        }
    }
}
