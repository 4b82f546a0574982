//! An embeddable OPC UA client/server runtime.
//!
//! This crate implements the address space, service dispatcher, subscription engine, browse
//! engine, and client/server session machinery of an OPC UA stack, with the wire codec and
//! network transport factored out behind the [`transport`] boundary. Bring your own transport, or
//! use [`transport::local`] for in-process testing.

mod browse;
mod client;
mod config;
mod error;
mod fabric;
mod method_registry;
mod node_store;
mod server;
mod service;
mod session;
mod session_manager;
mod subscription;
pub mod transport;
pub mod ua;

pub use self::{
    browse::{browse, browse_view, BrowseEvent, BrowseRoot},
    client::{Client, ClientBuilder, DEFAULT_MAX_CONTINUATION_POINTS},
    config::{ApplicationConfig, ApplicationType, ApplicationTypeMask, Callbacks, Config, ConfigBuilder, Endpoint, SecurityMode},
    error::{Error, Result},
    fabric::{spawn_workers, InboundMessage, MessagingFabric, OutboundMessage, DEFAULT_WORKER_COUNT},
    method_registry::{FnMethod, Method, MethodRegistry},
    node_store::{
        variable_data, DataValue, MethodData, Namespace, Node, NodeItem, NodeKind, NodeStore, Reference, VariableData,
        ACCESS_LEVEL_READ, ACCESS_LEVEL_WRITE, OBJECTS_FOLDER, ORGANIZES_REFERENCE_TYPE, VIEWS_FOLDER,
    },
    server::Server,
    service::{
        BrowseDescriptor, CallRequest, CallResult, CreateMonitoredItemParams, CreateMonitoredItemResult, CreateSubscriptionParams,
        ModifyMonitoredItemParams, ModifyMonitoredItemResult, ReadItem, ReadResult, ReferenceDescription, ResultMask,
        ServiceDispatcher, ServiceRequest, ServiceResponse, WriteItem,
    },
    session::{ContinuationCacheEntry, Session, SessionState},
    session_manager::{endpoint, SessionManager},
    subscription::{
        ClientHandle, Deadband, MonitoredItem, MonitoredItemId, MonitoredItemRequest, Notification, Subscription, SubscriptionId,
        SubscriptionStore,
    },
    transport::{Connector, Transport},
};
