//! Service dispatcher (§4.5): the only component allowed to mutate the node store during a
//! request. Every service takes a batch of per-item requests and returns a batch of per-item
//! results of identical length; per-item errors never short-circuit the batch.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    config::{ApplicationConfig, Endpoint},
    error::{Error, Result},
    method_registry::{Method, MethodRegistry},
    node_store::{DataValue, NodeItem, NodeKind, NodeStore, Reference},
    subscription::{ClientHandle, Deadband, MonitoredItemId, MonitoredItemRequest, Notification, SubscriptionId, SubscriptionStore},
    ua::{AttributeId, BrowseDirection, DateTime, DiagnosticInfo, LocalizedText, NodeClassMask, NodeId, NumericRange, QualifiedName, StatusCode, Variant},
};

const MAX_CONTINUATION_POINT_LEN: usize = 1000;
const DEFAULT_MAX_REFERENCES_PER_NODE: usize = 1000;
const DEFAULT_MINIMUM_SAMPLING_INTERVAL: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct ReadItem {
    pub node_id: NodeId,
    pub attribute_id: AttributeId,
    pub index_range: Option<NumericRange>,
    pub diagnostic_info: Option<DiagnosticInfo>,
}

#[derive(Debug, Clone)]
pub struct ReadResult {
    pub value: Variant,
    pub source_timestamp: DateTime,
    pub server_timestamp: DateTime,
    pub status: StatusCode,
    pub diagnostic_info: Option<DiagnosticInfo>,
}

#[derive(Debug, Clone)]
pub struct WriteItem {
    pub node_id: NodeId,
    pub attribute_id: AttributeId,
    pub value: Variant,
    pub index_range: Option<NumericRange>,
}

/// Bit mask selecting which [`ReferenceDescription`] fields a browse response populates (§4.8
/// `resultMask`); mirrors the [`NodeClassMask`](crate::ua::NodeClassMask) idiom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultMask(u32);

impl ResultMask {
    pub const REFERENCE_TYPE: Self = Self(1 << 0);
    pub const IS_FORWARD: Self = Self(1 << 1);
    pub const NODE_CLASS: Self = Self(1 << 2);
    pub const BROWSE_NAME: Self = Self(1 << 3);
    pub const DISPLAY_NAME: Self = Self(1 << 4);

    pub const ALL: Self = Self(
        Self::REFERENCE_TYPE.0 | Self::IS_FORWARD.0 | Self::NODE_CLASS.0 | Self::BROWSE_NAME.0 | Self::DISPLAY_NAME.0,
    );

    pub const NONE: Self = Self(0);

    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl Default for ResultMask {
    fn default() -> Self {
        Self::ALL
    }
}

#[derive(Debug, Clone)]
pub struct BrowseDescriptor {
    pub node_id: NodeId,
    pub direction: BrowseDirection,
    pub reference_type_filter: Option<NodeId>,
    /// Whether references of subtypes of `reference_type_filter` also match. This crate does not
    /// model a reference-type subtype hierarchy, so this flag is accepted but has no effect:
    /// filtering is always by exact reference-type id.
    pub include_subtypes: bool,
    pub node_class_mask: NodeClassMask,
    pub result_mask: ResultMask,
    pub max_references_per_node: usize,
}

#[derive(Debug, Clone)]
pub struct ReferenceDescription {
    pub reference_type_id: NodeId,
    pub is_forward: bool,
    pub target_node_id: NodeId,
    pub browse_name: QualifiedName,
    pub display_name: LocalizedText,
    pub node_class: crate::ua::NodeClass,
}

#[derive(Debug, Clone)]
pub struct BrowseResult {
    pub references: Vec<ReferenceDescription>,
    pub continuation_point: Option<Vec<u8>>,
    pub status: StatusCode,
}

#[derive(Debug, Clone)]
pub struct CallRequest {
    pub object_id: NodeId,
    pub method_id: NodeId,
    pub inputs: Vec<Variant>,
}

#[derive(Debug, Clone)]
pub struct CallResult {
    pub outputs: Vec<Variant>,
    pub status: StatusCode,
}

pub struct CreateSubscriptionParams {
    pub publishing_interval: f64,
    pub lifetime_count: u32,
    pub max_keep_alive_count: u32,
    pub max_notifications_per_publish: u32,
    pub priority: u8,
}

pub struct CreateMonitoredItemParams {
    pub subscription_id: SubscriptionId,
    pub client_handle: ClientHandle,
    pub node_id: NodeId,
    pub attribute_id: AttributeId,
    pub sampling_interval: f64,
    pub queue_size: usize,
    pub deadband: Deadband,
}

#[derive(Debug, Clone)]
pub struct CreateMonitoredItemResult {
    pub monitored_item_id: MonitoredItemId,
    pub revised_sampling_interval: f64,
    pub status: StatusCode,
}

pub struct ModifyMonitoredItemParams {
    pub subscription_id: SubscriptionId,
    pub monitored_item_id: MonitoredItemId,
    pub sampling_interval: f64,
    pub queue_size: usize,
    pub deadband: Deadband,
}

#[derive(Debug, Clone)]
pub struct ModifyMonitoredItemResult {
    pub revised_sampling_interval: f64,
    pub status: StatusCode,
}

/// A request batch, one variant per OPC UA service this crate implements (§6).
pub enum ServiceRequest {
    Read(Vec<ReadItem>),
    Write(Vec<WriteItem>),
    Browse(Vec<BrowseDescriptor>),
    BrowseNext { continuation_points: Vec<Vec<u8>>, release: bool },
    Call(Vec<CallRequest>),
    CreateSubscription(CreateSubscriptionParams),
    ModifySubscription { subscription_id: SubscriptionId, params: CreateSubscriptionParams },
    DeleteSubscription(SubscriptionId),
    CreateMonitoredItems(Vec<CreateMonitoredItemParams>),
    ModifyMonitoredItems(Vec<ModifyMonitoredItemParams>),
    DeleteMonitoredItems { subscription_id: SubscriptionId, items: Vec<MonitoredItemId> },
    Publish,
    Republish { subscription_id: SubscriptionId, sequence_number: u64 },
    /// Intercepted by [`crate::server::Server::dispatch`] before it reaches a
    /// [`ServiceDispatcher`], since endpoint/application identity lives on `Server`, not here.
    GetEndpoints,
    FindServers,
}

/// A response batch matching the shape of the [`ServiceRequest`] it answers.
pub enum ServiceResponse {
    Read(Vec<ReadResult>),
    Write(Vec<StatusCode>),
    Browse(Vec<BrowseResult>),
    Call(Vec<CallResult>),
    CreateSubscription(SubscriptionId),
    ModifySubscription(StatusCode),
    DeleteSubscription(StatusCode),
    CreateMonitoredItems(Vec<CreateMonitoredItemResult>),
    ModifyMonitoredItems(Vec<ModifyMonitoredItemResult>),
    DeleteMonitoredItems(Vec<StatusCode>),
    Publish(Vec<(SubscriptionId, u64, Vec<Notification>)>),
    Republish { status: StatusCode, notifications: Vec<Notification> },
    GetEndpoints(Vec<Endpoint>),
    FindServers(Vec<ApplicationConfig>),
}

struct ContinuationEntry {
    remaining: Vec<ReferenceDescription>,
}

/// Executes read/write/browse/call/subscribe services against one node store, method registry,
/// and per-session subscription store (§4.5). Constructed once per active session on the server
/// side, since subscriptions and continuation points are session-scoped (§3 Ownership, §5).
pub struct ServiceDispatcher {
    nodes: Arc<NodeStore>,
    methods: Arc<MethodRegistry>,
    subscriptions: SubscriptionStore,
    continuation_points: Mutex<HashMap<Vec<u8>, ContinuationEntry>>,
    next_continuation_id: Mutex<u64>,
}

impl ServiceDispatcher {
    #[must_use]
    pub fn new(nodes: Arc<NodeStore>, methods: Arc<MethodRegistry>) -> Self {
        Self {
            nodes,
            methods,
            subscriptions: SubscriptionStore::new(),
            continuation_points: Mutex::new(HashMap::new()),
            next_continuation_id: Mutex::new(0),
        }
    }

    #[must_use]
    pub fn subscriptions(&self) -> &SubscriptionStore {
        &self.subscriptions
    }

    #[must_use]
    pub fn node_store(&self) -> &NodeStore {
        &self.nodes
    }

    #[must_use]
    pub fn method_registry(&self) -> &MethodRegistry {
        &self.methods
    }

    /// Atomic `createMethodNode` (§4.2): creates the Method node and registers its callable in one
    /// call, rejecting the pair outright if the node's declared argument counts do not match the
    /// callable's, instead of leaving a Method node registered with no callable or vice versa.
    pub fn create_method_node(&self, item: NodeItem, method: Box<dyn Method>) -> Result<NodeId> {
        let (input_len, output_len) = match &item.kind {
            NodeKind::Method(data) => (data.input_arguments.len(), data.output_arguments.len()),
            _ => return Err(Error::invalid_argument("createMethodNode requires a Method node item")),
        };
        if input_len != method.input_types().len() || output_len != method.output_types().len() {
            return Err(Error::StatusCode(StatusCode::BAD_ARGUMENTS_MISSING));
        }
        let node_id = self.nodes.create_node(item)?;
        self.methods.register(node_id.clone(), method);
        Ok(node_id)
    }

    /// Single entry point (§4.5): dispatches one request batch, producing a response batch of
    /// identical shape.
    pub fn dispatch(&self, request: ServiceRequest) -> ServiceResponse {
        match request {
            ServiceRequest::Read(items) => ServiceResponse::Read(self.read(&items)),
            ServiceRequest::Write(items) => ServiceResponse::Write(self.write(&items)),
            ServiceRequest::Browse(descriptors) => ServiceResponse::Browse(self.browse(&descriptors)),
            ServiceRequest::BrowseNext { continuation_points, release } => {
                ServiceResponse::Browse(self.browse_next(&continuation_points, release))
            }
            ServiceRequest::Call(calls) => ServiceResponse::Call(self.call(&calls)),
            ServiceRequest::CreateSubscription(params) => {
                let id = self.subscriptions.create_subscription(
                    params.publishing_interval,
                    params.lifetime_count,
                    params.max_keep_alive_count,
                    params.max_notifications_per_publish,
                    params.priority,
                );
                ServiceResponse::CreateSubscription(id)
            }
            ServiceRequest::ModifySubscription { subscription_id, params } => {
                let status = match self.subscriptions.modify_subscription(
                    subscription_id,
                    params.publishing_interval,
                    params.lifetime_count,
                    params.max_keep_alive_count,
                    params.max_notifications_per_publish,
                    params.priority,
                ) {
                    Ok(()) => StatusCode::GOOD,
                    Err(error) => error.status_code(),
                };
                ServiceResponse::ModifySubscription(status)
            }
            ServiceRequest::DeleteSubscription(id) => {
                let status = match self.subscriptions.delete_subscription(id) {
                    Ok(()) => StatusCode::GOOD,
                    Err(error) => error.status_code(),
                };
                ServiceResponse::DeleteSubscription(status)
            }
            ServiceRequest::CreateMonitoredItems(items) => {
                let results = items
                    .into_iter()
                    .map(|item| {
                        match self.subscriptions.create_monitored_item(
                            item.subscription_id,
                            MonitoredItemRequest {
                                client_handle: item.client_handle,
                                node_id: item.node_id,
                                attribute_id: item.attribute_id,
                                sampling_interval: item.sampling_interval,
                                queue_size: item.queue_size,
                                deadband: item.deadband,
                            },
                            DEFAULT_MINIMUM_SAMPLING_INTERVAL,
                        ) {
                            Ok((monitored_item_id, revised_sampling_interval)) => CreateMonitoredItemResult {
                                monitored_item_id,
                                revised_sampling_interval,
                                status: StatusCode::GOOD,
                            },
                            Err(error) => CreateMonitoredItemResult {
                                monitored_item_id: 0,
                                revised_sampling_interval: 0.0,
                                status: error.status_code(),
                            },
                        }
                    })
                    .collect();
                ServiceResponse::CreateMonitoredItems(results)
            }
            ServiceRequest::ModifyMonitoredItems(items) => {
                let results = items
                    .into_iter()
                    .map(|item| {
                        match self.subscriptions.modify_monitored_item(
                            item.subscription_id,
                            item.monitored_item_id,
                            item.sampling_interval,
                            item.queue_size,
                            item.deadband,
                            DEFAULT_MINIMUM_SAMPLING_INTERVAL,
                        ) {
                            Ok(revised_sampling_interval) => ModifyMonitoredItemResult {
                                revised_sampling_interval,
                                status: StatusCode::GOOD,
                            },
                            Err(error) => ModifyMonitoredItemResult {
                                revised_sampling_interval: 0.0,
                                status: error.status_code(),
                            },
                        }
                    })
                    .collect();
                ServiceResponse::ModifyMonitoredItems(results)
            }
            ServiceRequest::DeleteMonitoredItems { subscription_id, items } => {
                let results = items
                    .into_iter()
                    .map(|item_id| {
                        self.subscriptions
                            .delete_monitored_item(subscription_id, item_id)
                            .map_or_else(|error| error.status_code(), |()| StatusCode::GOOD)
                    })
                    .collect();
                ServiceResponse::DeleteMonitoredItems(results)
            }
            ServiceRequest::Publish => ServiceResponse::Publish(self.subscriptions.publish()),
            ServiceRequest::Republish { subscription_id, sequence_number } => {
                match self.subscriptions.republish(subscription_id, sequence_number) {
                    Ok(notifications) => ServiceResponse::Republish { status: StatusCode::GOOD, notifications },
                    Err(error) => ServiceResponse::Republish { status: error.status_code(), notifications: Vec::new() },
                }
            }
            ServiceRequest::GetEndpoints | ServiceRequest::FindServers => {
                unreachable!("GetEndpoints/FindServers are intercepted by Server::dispatch before reaching the service dispatcher")
            }
        }
    }

    /// One sampling tick (§4.4): called by the messaging fabric's periodic driver.
    pub fn sample_subscriptions(&self) {
        let nodes = Arc::clone(&self.nodes);
        self.subscriptions
            .sample_all(|node_id, attribute_id| nodes.read_attribute(node_id, attribute_id));
    }

    fn read(&self, items: &[ReadItem]) -> Vec<ReadResult> {
        items
            .iter()
            .map(|item| {
                let diagnostic_info = item.diagnostic_info.clone();
                match self.nodes.read_attribute(&item.node_id, item.attribute_id) {
                    Ok(DataValue { value, source_timestamp, server_timestamp, status }) => {
                        match apply_index_range(value, item.index_range) {
                            Ok(value) => ReadResult {
                                value,
                                source_timestamp,
                                server_timestamp,
                                status,
                                diagnostic_info,
                            },
                            Err(error) => ReadResult {
                                value: Variant::Empty,
                                source_timestamp: DateTime::EPOCH,
                                server_timestamp: DateTime::EPOCH,
                                status: error.status_code(),
                                diagnostic_info,
                            },
                        }
                    }
                    Err(error) => ReadResult {
                        value: Variant::Empty,
                        source_timestamp: DateTime::EPOCH,
                        server_timestamp: DateTime::EPOCH,
                        status: error.status_code(),
                        diagnostic_info,
                    },
                }
            })
            .collect()
    }

    /// Writes are applied in request order (§4.5 tie-break), atomically per node.
    fn write(&self, items: &[WriteItem]) -> Vec<StatusCode> {
        items
            .iter()
            .map(|item| {
                if item.attribute_id != AttributeId::VALUE {
                    return StatusCode::BAD_NOT_WRITABLE;
                }
                if let Err(error) = item.value.check_encoding_limit(crate::ua::DEFAULT_ENCODING_LIMIT) {
                    return error.status_code();
                }
                let new_value = match item.index_range {
                    Some(range) => match self.splice_index_range(&item.node_id, range, item.value.clone()) {
                        Ok(value) => value,
                        Err(error) => return error.status_code(),
                    },
                    None => item.value.clone(),
                };
                match self.nodes.modify_variable_node(&item.node_id, new_value) {
                    Ok(()) => StatusCode::GOOD,
                    Err(error) => error.status_code(),
                }
            })
            .collect()
    }

    fn splice_index_range(&self, node_id: &NodeId, range: NumericRange, new_segment: Variant) -> Result<Variant> {
        let current = self.nodes.read_attribute(node_id, AttributeId::VALUE)?.value;
        range.splice(&current, &new_segment)
    }

    fn matching_references(&self, descriptor: &BrowseDescriptor) -> Result<Vec<ReferenceDescription>> {
        let all: Vec<Reference> = self.nodes.references(&descriptor.node_id)?;
        let mut out = Vec::new();
        for reference in all {
            if !descriptor.direction.matches(reference.is_forward) {
                continue;
            }
            if let Some(filter) = &descriptor.reference_type_filter {
                if &reference.reference_type != filter {
                    continue;
                }
            }
            let Ok(node_class) = self.nodes.node_class(&reference.target) else {
                continue;
            };
            if !descriptor.node_class_mask.contains(node_class) {
                continue;
            }
            let browse_name = if descriptor.result_mask.contains(ResultMask::BROWSE_NAME) {
                let Ok(browse_name) = self.nodes.browse_name(&reference.target) else {
                    continue;
                };
                browse_name
            } else {
                QualifiedName::new(0, "")
            };
            let display_name = if descriptor.result_mask.contains(ResultMask::DISPLAY_NAME) {
                self.nodes.display_name(&reference.target).unwrap_or_else(|_| LocalizedText::plain(""))
            } else {
                LocalizedText::plain("")
            };
            let reference_type_id = if descriptor.result_mask.contains(ResultMask::REFERENCE_TYPE) {
                reference.reference_type
            } else {
                NodeId::NULL
            };
            let is_forward = descriptor.result_mask.contains(ResultMask::IS_FORWARD) && reference.is_forward;
            out.push(ReferenceDescription {
                reference_type_id,
                is_forward,
                target_node_id: reference.target,
                browse_name,
                display_name,
                node_class,
            });
        }
        Ok(out)
    }

    fn browse(&self, descriptors: &[BrowseDescriptor]) -> Vec<BrowseResult> {
        descriptors
            .iter()
            .map(|descriptor| match self.matching_references(descriptor) {
                Ok(mut references) => {
                    let batch_size = if descriptor.max_references_per_node == 0 {
                        DEFAULT_MAX_REFERENCES_PER_NODE
                    } else {
                        descriptor.max_references_per_node
                    };
                    let continuation_point = if references.len() > batch_size {
                        let remaining = references.split_off(batch_size);
                        Some(self.stash_continuation(remaining))
                    } else {
                        None
                    };
                    BrowseResult {
                        references,
                        continuation_point,
                        status: StatusCode::GOOD,
                    }
                }
                Err(error) => BrowseResult {
                    references: Vec::new(),
                    continuation_point: None,
                    status: error.status_code(),
                },
            })
            .collect()
    }

    fn stash_continuation(&self, remaining: Vec<ReferenceDescription>) -> Vec<u8> {
        let mut next_id = self.next_continuation_id.lock();
        *next_id += 1;
        let token = next_id.to_le_bytes().to_vec();
        self.continuation_points.lock().insert(token.clone(), ContinuationEntry { remaining });
        token
    }

    /// Per item: continuation longer than 1 KiB is implausible and rejected outright (§4.8).
    fn browse_next(&self, continuation_points: &[Vec<u8>], release: bool) -> Vec<BrowseResult> {
        continuation_points
            .iter()
            .map(|token| {
                if token.len() > MAX_CONTINUATION_POINT_LEN {
                    return BrowseResult {
                        references: Vec::new(),
                        continuation_point: None,
                        status: StatusCode::BAD_INTERNAL_ERROR,
                    };
                }
                if release {
                    self.continuation_points.lock().remove(token);
                    return BrowseResult {
                        references: Vec::new(),
                        continuation_point: None,
                        status: StatusCode::GOOD,
                    };
                }
                match self.continuation_points.lock().remove(token) {
                    Some(entry) => BrowseResult {
                        references: entry.remaining,
                        continuation_point: None,
                        status: StatusCode::GOOD,
                    },
                    None => BrowseResult {
                        references: Vec::new(),
                        continuation_point: None,
                        status: StatusCode::BAD_CONTINUATION_POINT_INVALID,
                    },
                }
            })
            .collect()
    }

    fn call(&self, calls: &[CallRequest]) -> Vec<CallResult> {
        calls
            .iter()
            .map(|request| {
                if !self.object_has_method(&request.object_id, &request.method_id) {
                    return CallResult {
                        outputs: Vec::new(),
                        status: StatusCode::BAD_METHOD_INVALID,
                    };
                }
                match self.methods.call(&request.method_id, request.inputs.clone()) {
                    Ok(outputs) => CallResult {
                        outputs,
                        status: StatusCode::GOOD,
                    },
                    Err(error) => CallResult {
                        outputs: Vec::new(),
                        status: error.status_code(),
                    },
                }
            })
            .collect()
    }

    /// Confirms the method is a component of the object, i.e. reachable from it via any forward
    /// reference (§4.5 "confirm the method is a component of the object").
    fn object_has_method(&self, object_id: &NodeId, method_id: &NodeId) -> bool {
        self.nodes
            .references(object_id)
            .map(|references| references.iter().any(|reference| reference.is_forward && reference.target == *method_id))
            .unwrap_or(false)
    }
}

/// Projects the addressed slice out of `value` for Read, when `index_range` is present.
fn apply_index_range(value: Variant, index_range: Option<NumericRange>) -> Result<Variant> {
    match index_range {
        Some(range) => range.apply(&value),
        None => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method_registry::{FnMethod, MethodRegistry};
    use crate::node_store::{variable_data, MethodData, NodeItem, NodeKind, NodeStore, OBJECTS_FOLDER};
    use crate::ua::{Array, LocalizedText, Scalar, ScalarType};

    fn dispatcher_with_double(node_id: NodeId) -> ServiceDispatcher {
        let nodes = Arc::new(NodeStore::new());
        nodes
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
        ServiceDispatcher::new(nodes, Arc::new(MethodRegistry::new()))
    }

    fn read_item(node_id: NodeId) -> ReadItem {
        ReadItem {
            node_id,
            attribute_id: AttributeId::VALUE,
            index_range: None,
            diagnostic_info: None,
        }
    }

    #[test]
    fn read_scalar_double() {
        let node_id = NodeId::numeric(1, 1);
        let dispatcher = dispatcher_with_double(node_id.clone());
        let results = dispatcher.read(&[read_item(node_id)]);
        assert_eq!(results[0].status, StatusCode::GOOD);
        assert_eq!(results[0].value, Variant::Scalar(Scalar::Double(50.4)));
    }

    #[test]
    fn read_threads_diagnostic_info_through() {
        let node_id = NodeId::numeric(1, 1);
        let dispatcher = dispatcher_with_double(node_id.clone());
        let diagnostic_info = Some(DiagnosticInfo { additional_info: Some("trace".to_owned()), ..Default::default() });
        let results = dispatcher.read(&[ReadItem {
            node_id,
            attribute_id: AttributeId::VALUE,
            index_range: None,
            diagnostic_info: diagnostic_info.clone(),
        }]);
        assert_eq!(results[0].diagnostic_info, diagnostic_info);
    }

    #[test]
    fn read_applies_index_range_to_an_array_value() {
        let nodes = Arc::new(NodeStore::new());
        let node_id = NodeId::numeric(1, 2);
        nodes
            .create_node(
                NodeItem::new(
                    node_id.clone(),
                    QualifiedName::new(1, "Array"),
                    LocalizedText::plain("Array"),
                    NodeKind::Variable(variable_data(
                        NodeId::numeric(0, 6),
                        1,
                        Vec::new(),
                        Variant::Array(Array::new(ScalarType::Int32, vec![Scalar::Int32(1), Scalar::Int32(2), Scalar::Int32(3)]).unwrap()),
                    )),
                )
                .with_source(NodeId::numeric(0, OBJECTS_FOLDER)),
            )
            .unwrap();
        let dispatcher = ServiceDispatcher::new(nodes, Arc::new(MethodRegistry::new()));
        let results = dispatcher.read(&[ReadItem {
            node_id,
            attribute_id: AttributeId::VALUE,
            index_range: Some(NumericRange::span(1, 2)),
            diagnostic_info: None,
        }]);
        assert_eq!(
            results[0].value,
            Variant::Array(Array::new(ScalarType::Int32, vec![Scalar::Int32(2), Scalar::Int32(3)]).unwrap())
        );
    }

    #[test]
    fn write_rejects_value_exceeding_encoding_limit() {
        let nodes = Arc::new(NodeStore::new());
        let node_id = NodeId::numeric(1, 3);
        nodes
            .create_node(
                NodeItem::new(
                    node_id.clone(),
                    QualifiedName::new(1, "Bytes"),
                    LocalizedText::plain("Bytes"),
                    NodeKind::Variable(variable_data(
                        NodeId::numeric(0, 15),
                        -1,
                        Vec::new(),
                        Variant::Scalar(Scalar::ByteString(Vec::new())),
                    )),
                )
                .with_source(NodeId::numeric(0, OBJECTS_FOLDER)),
            )
            .unwrap();
        let dispatcher = ServiceDispatcher::new(nodes, Arc::new(MethodRegistry::new()));
        let huge = vec![0u8; crate::ua::DEFAULT_ENCODING_LIMIT + 1];
        let statuses = dispatcher.write(&[WriteItem {
            node_id,
            attribute_id: AttributeId::VALUE,
            value: Variant::Scalar(Scalar::ByteString(huge)),
            index_range: None,
        }]);
        assert_eq!(statuses[0], StatusCode::BAD_ENCODING_LIMITS_EXCEEDED);
    }

    #[test]
    fn write_splices_an_index_range_into_an_existing_array() {
        let nodes = Arc::new(NodeStore::new());
        let node_id = NodeId::numeric(1, 4);
        nodes
            .create_node(
                NodeItem::new(
                    node_id.clone(),
                    QualifiedName::new(1, "Array"),
                    LocalizedText::plain("Array"),
                    NodeKind::Variable(variable_data(
                        NodeId::numeric(0, 6),
                        1,
                        Vec::new(),
                        Variant::Array(Array::new(ScalarType::Int32, vec![Scalar::Int32(1), Scalar::Int32(2), Scalar::Int32(3)]).unwrap()),
                    )),
                )
                .with_source(NodeId::numeric(0, OBJECTS_FOLDER)),
            )
            .unwrap();
        let dispatcher = ServiceDispatcher::new(nodes, Arc::new(MethodRegistry::new()));
        let statuses = dispatcher.write(&[WriteItem {
            node_id: node_id.clone(),
            attribute_id: AttributeId::VALUE,
            value: Variant::Array(Array::new(ScalarType::Int32, vec![Scalar::Int32(99)]).unwrap()),
            index_range: Some(NumericRange::single(1)),
        }]);
        assert_eq!(statuses[0], StatusCode::GOOD);
        let results = dispatcher.read(&[read_item(node_id)]);
        assert_eq!(
            results[0].value,
            Variant::Array(Array::new(ScalarType::Int32, vec![Scalar::Int32(1), Scalar::Int32(99), Scalar::Int32(3)]).unwrap())
        );
    }

    #[test]
    fn create_method_node_rejects_argument_count_mismatch() {
        let nodes = Arc::new(NodeStore::new());
        let methods = Arc::new(MethodRegistry::new());
        let dispatcher = ServiceDispatcher::new(nodes, methods);
        let method_id = NodeId::numeric(2, 5);
        let item = NodeItem::new(
            method_id,
            QualifiedName::new(2, "sqrt"),
            LocalizedText::plain("sqrt"),
            NodeKind::Method(MethodData {
                input_arguments: vec![QualifiedName::new(2, "x"), QualifiedName::new(2, "y")],
                output_arguments: vec![QualifiedName::new(2, "result")],
            }),
        )
        .with_source(NodeId::numeric(0, OBJECTS_FOLDER));
        let method = Box::new(FnMethod::new(vec![ScalarType::Double], vec![ScalarType::Double], |_| Ok(vec![])));
        let error = dispatcher.create_method_node(item, method).unwrap_err();
        assert_eq!(error.status_code(), StatusCode::BAD_ARGUMENTS_MISSING);
    }

    #[test]
    fn create_method_node_registers_node_and_callable_together() {
        let nodes = Arc::new(NodeStore::new());
        let methods = Arc::new(MethodRegistry::new());
        let dispatcher = ServiceDispatcher::new(nodes, methods);
        let method_id = NodeId::numeric(2, 6);
        let item = NodeItem::new(
            method_id.clone(),
            QualifiedName::new(2, "sqrt"),
            LocalizedText::plain("sqrt"),
            NodeKind::Method(MethodData {
                input_arguments: vec![QualifiedName::new(2, "x")],
                output_arguments: vec![QualifiedName::new(2, "result")],
            }),
        )
        .with_source(NodeId::numeric(0, OBJECTS_FOLDER));
        let method = Box::new(FnMethod::new(
            vec![ScalarType::Double],
            vec![ScalarType::Double],
            |inputs| match &inputs[0] {
                Variant::Scalar(Scalar::Double(value)) => Ok(vec![Variant::Scalar(Scalar::Double(value.sqrt()))]),
                _ => unreachable!(),
            },
        ));
        dispatcher.create_method_node(item, method).unwrap();
        assert!(dispatcher.node_store().exists(&method_id));
        assert!(dispatcher.method_registry().is_registered(&method_id));
    }

    #[test]
    fn call_sqrt_method() {
        let nodes = Arc::new(NodeStore::new());
        let methods = Arc::new(MethodRegistry::new());
        let object_id = NodeId::numeric(2, 1);
        let method_id = NodeId::numeric(2, 2);
        nodes
            .create_node(
                NodeItem::new(
                    object_id.clone(),
                    QualifiedName::new(2, "Calculator"),
                    LocalizedText::plain("Calculator"),
                    NodeKind::Object,
                )
                .with_source(NodeId::numeric(0, OBJECTS_FOLDER)),
            )
            .unwrap();
        nodes
            .create_node(
                NodeItem::new(
                    method_id.clone(),
                    QualifiedName::new(2, "sqrt"),
                    LocalizedText::plain("sqrt"),
                    NodeKind::Method(Default::default()),
                )
                .with_source(object_id.clone()),
            )
            .unwrap();
        methods.register(
            method_id.clone(),
            Box::new(FnMethod::new(
                vec![crate::ua::ScalarType::Double],
                vec![crate::ua::ScalarType::Double],
                |inputs| match &inputs[0] {
                    Variant::Scalar(Scalar::Double(value)) => Ok(vec![Variant::Scalar(Scalar::Double(value.sqrt()))]),
                    _ => unreachable!(),
                },
            )),
        );

        let dispatcher = ServiceDispatcher::new(nodes, methods);
        let results = dispatcher.call(&[CallRequest {
            object_id,
            method_id,
            inputs: vec![Variant::Scalar(Scalar::Double(16.0))],
        }]);
        assert_eq!(results[0].status, StatusCode::GOOD);
        assert_eq!(results[0].outputs, vec![Variant::Scalar(Scalar::Double(4.0))]);
    }
}
