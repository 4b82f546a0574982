//! The browse engine (§4.8): cycle-safe iterative multi-root traversal on top of the raw
//! Browse/BrowseNext services, run client-side against a [`Transport`].

use std::collections::VecDeque;

use crate::{
    error::{Error, Result},
    node_store::VIEWS_FOLDER,
    service::{BrowseDescriptor, ReadItem, ReferenceDescription, ResultMask, ServiceRequest, ServiceResponse},
    transport::Transport,
    ua::{AttributeId, BrowseDirection, NodeClass, NodeClassMask, NodeId, Scalar, Variant},
};

/// One root the browse starts from (§4.8 Inputs).
#[derive(Debug, Clone)]
pub struct BrowseRoot {
    pub node_id: NodeId,
    pub direction: BrowseDirection,
    pub reference_type_filter: Option<NodeId>,
    pub include_subtypes: bool,
    pub node_class_mask: NodeClassMask,
    pub result_mask: ResultMask,
}

impl BrowseRoot {
    #[must_use]
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            direction: BrowseDirection::Forward,
            reference_type_filter: None,
            include_subtypes: false,
            node_class_mask: NodeClassMask::ALL,
            result_mask: ResultMask::ALL,
        }
    }
}

/// A single surviving reference handed to the application (§4.8 step f).
#[derive(Debug, Clone)]
pub struct BrowseEvent {
    pub source_node_id: NodeId,
    /// `/`-separated browse names from the root to `source_node_id`.
    pub browse_path: String,
    /// `{ns;typeChar[;v=typeId]}browseName`.
    pub value_alias: String,
    pub reference: ReferenceDescription,
}

struct WorkItem {
    node_id: NodeId,
    path: String,
    direction: BrowseDirection,
    reference_type_filter: Option<NodeId>,
    include_subtypes: bool,
    node_class_mask: NodeClassMask,
    result_mask: ResultMask,
}

/// Runs the full browse algorithm of §4.8 against `transport`, invoking `on_reference` for each
/// surviving reference and `on_error` for validation/service failures that do not abort the
/// batch. `batch_size` is the caller-supplied minimum of the server's advertised
/// `MaxBrowseContinuationPoints` and `MaxNodesPerBrowse`.
pub fn browse(
    transport: &dyn Transport,
    roots: Vec<BrowseRoot>,
    batch_size: usize,
    mut on_reference: impl FnMut(BrowseEvent),
    mut on_error: impl FnMut(Error),
) -> Result<()> {
    let batch_size = batch_size.max(1);
    let mut queue: VecDeque<WorkItem> = roots
        .into_iter()
        .map(|root| WorkItem {
            node_id: root.node_id,
            path: String::new(),
            direction: root.direction,
            reference_type_filter: root.reference_type_filter,
            include_subtypes: root.include_subtypes,
            node_class_mask: root.node_class_mask,
            result_mask: root.result_mask,
        })
        .collect();

    while !queue.is_empty() {
        let batch: Vec<WorkItem> = queue.drain(..queue.len().min(batch_size)).collect();
        let descriptors: Vec<BrowseDescriptor> = batch
            .iter()
            .map(|item| BrowseDescriptor {
                node_id: item.node_id.clone(),
                direction: item.direction,
                reference_type_filter: item.reference_type_filter.clone(),
                include_subtypes: item.include_subtypes,
                node_class_mask: item.node_class_mask,
                result_mask: item.result_mask,
                max_references_per_node: batch_size,
            })
            .collect();

        let ServiceResponse::Browse(results) = transport.send(ServiceRequest::Browse(descriptors))? else {
            return Err(Error::transport("browse service returned an unexpected response shape"));
        };

        if batch.len() > 1 && results.iter().all(|result| result.status == crate::ua::StatusCode::BAD_NODE_ID_UNKNOWN) {
            on_error(Error::StatusCode(crate::ua::StatusCode::BAD_NODE_ID_UNKNOWN));
            continue;
        }

        for (item, mut result) in batch.into_iter().zip(results) {
            if result.status.is_bad() {
                on_error(Error::StatusCode(result.status));
                continue;
            }

            let mut all_references = std::mem::take(&mut result.references);
            let mut continuation_point = result.continuation_point.take();
            while let Some(token) = continuation_point.take() {
                let ServiceResponse::Browse(mut next_results) =
                    transport.send(ServiceRequest::BrowseNext { continuation_points: vec![token], release: false })?
                else {
                    return Err(Error::transport("browse_next service returned an unexpected response shape"));
                };
                let Some(next) = next_results.pop() else { break };
                if next.status.is_bad() {
                    on_error(Error::StatusCode(next.status));
                    break;
                }
                all_references.extend(next.references);
                continuation_point = next.continuation_point;
            }

            for reference in all_references {
                if !is_valid_reference(&reference) {
                    on_error(Error::invalid_argument("browse returned a malformed reference"));
                    continue;
                }
                // Cycle check (§4.8 step e): drop if the browse name already appears on the path.
                let name = reference.browse_name.name();
                if item.path.split('/').any(|token| token == name) {
                    continue;
                }

                let path = if item.path.is_empty() {
                    name.to_owned()
                } else {
                    format!("{}/{name}", item.path)
                };
                let value_alias = value_alias(transport, &reference);
                on_reference(BrowseEvent {
                    source_node_id: item.node_id.clone(),
                    browse_path: path.clone(),
                    value_alias,
                    reference: reference.clone(),
                });

                if reference.node_class != NodeClass::Variable {
                    queue.push_back(WorkItem {
                        node_id: reference.target_node_id,
                        path,
                        direction: item.direction,
                        reference_type_filter: item.reference_type_filter.clone(),
                        include_subtypes: item.include_subtypes,
                        node_class_mask: item.node_class_mask,
                        result_mask: item.result_mask,
                    });
                }
            }
        }
    }
    Ok(())
}

/// `BrowseView` (§4.8 step 4): seeds the work queue with the `ViewsFolder`'s children, restricted
/// to Object/View node classes.
pub fn browse_view(
    transport: &dyn Transport,
    batch_size: usize,
    on_reference: impl FnMut(BrowseEvent),
    on_error: impl FnMut(Error),
) -> Result<()> {
    let root = BrowseRoot {
        node_id: NodeId::numeric(0, VIEWS_FOLDER),
        direction: BrowseDirection::Forward,
        reference_type_filter: None,
        include_subtypes: false,
        node_class_mask: NodeClassMask::of(NodeClass::Object).with(NodeClass::View),
        result_mask: ResultMask::ALL,
    };
    browse(transport, vec![root], batch_size, on_reference, on_error)
}

/// A reference is malformed if it lacks the target identity or type information needed to
/// address it. Server index is not modeled (every `NodeId` is implicitly local), so there is
/// nothing to validate there; an absent `display_name`/`reference_type_id` is tolerated since
/// `result_mask` can legitimately omit them.
fn is_valid_reference(reference: &ReferenceDescription) -> bool {
    !reference.target_node_id.is_null() && !reference.browse_name.name().is_empty()
}

fn value_alias(transport: &dyn Transport, reference: &ReferenceDescription) -> String {
    let target = &reference.target_node_id;
    let type_char = target.identifier().path_char();
    let name = reference.browse_name.name();

    if reference.node_class != NodeClass::Variable {
        return format!("{{{};{type_char}}}{name}", target.namespace_index());
    }

    let data_type_alias = read_data_type_alias(transport, target);
    match data_type_alias {
        Some(type_id) => format!("{{{};{type_char};v={type_id}}}{name}", target.namespace_index()),
        None => format!("{{{};{type_char}}}{name}", target.namespace_index()),
    }
}

fn read_data_type_alias(transport: &dyn Transport, target: &NodeId) -> Option<u32> {
    let ServiceResponse::Read(mut results) = transport
        .send(ServiceRequest::Read(vec![ReadItem {
            node_id: target.clone(),
            attribute_id: AttributeId::DATA_TYPE,
            index_range: None,
            diagnostic_info: None,
        }]))
        .ok()?
    else {
        return None;
    };
    let result = results.pop()?;
    match result.value {
        Variant::Scalar(Scalar::NodeId(data_type)) => match data_type.identifier() {
            crate::ua::Identifier::Numeric(value) => Some(*value),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{browse, BrowseRoot};
    use crate::node_store::{NodeItem, NodeKind, OBJECTS_FOLDER};
    use crate::server::Server;
    use crate::transport::local::LocalConnector;
    use crate::transport::{Connector, Transport};
    use crate::ua::{LocalizedText, NodeId, QualifiedName};
    use std::sync::Arc;

    #[test]
    fn browse_visits_mutual_references_exactly_once() {
        let server = Arc::new(Server::new(Default::default()));
        let a = NodeId::numeric(1, 1);
        let b = NodeId::numeric(1, 2);
        server
            .node_store()
            .create_node(
                NodeItem::new(a.clone(), QualifiedName::new(1, "A"), LocalizedText::plain("A"), NodeKind::Object)
                    .with_source(NodeId::numeric(0, OBJECTS_FOLDER)),
            )
            .unwrap();
        server
            .node_store()
            .create_node(
                NodeItem::new(b.clone(), QualifiedName::new(1, "B"), LocalizedText::plain("B"), NodeKind::Object)
                    .with_source(a.clone()),
            )
            .unwrap();
        server
            .node_store()
            .add_reference(&b, NodeId::numeric(0, crate::node_store::ORGANIZES_REFERENCE_TYPE), &a, true)
            .unwrap();

        let connector = LocalConnector::new();
        connector.register("opc.tcp://localhost/test", Arc::clone(&server));
        let transport: Box<dyn Transport> = connector.connect("opc.tcp://localhost/test").unwrap();

        let mut visited = Vec::new();
        browse(
            transport.as_ref(),
            vec![BrowseRoot::new(NodeId::numeric(0, OBJECTS_FOLDER))],
            10,
            |event| visited.push(event.source_node_id.clone()),
            |_| {},
        )
        .unwrap();

        let a_count = visited.iter().filter(|id| **id == a).count();
        assert!(a_count <= 1, "A's outgoing edges should be browsed at most once");
    }
}
