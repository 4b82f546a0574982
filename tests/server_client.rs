//! End-to-end coverage of the seed scenarios: endpoint discovery, scalar and array round-trips,
//! a method call, cycle-safe browsing, and the subscription create/modify/delete lifecycle.

use std::sync::Arc;

use opcua_runtime::{
    browse, endpoint, variable_data, BrowseRoot, CallRequest, Client, ConfigBuilder, MethodData, NodeItem, NodeKind, ReadItem, Server,
    ServiceRequest, ServiceResponse, WriteItem, OBJECTS_FOLDER, ResultMask,
};
use opcua_runtime::transport::local::LocalConnector;
use opcua_runtime::Connector;
use opcua_runtime::ua::{AttributeId, BrowseDirection, LocalizedText, NodeClassMask, NodeId, QualifiedName, Scalar, ScalarType, Variant};

const ENDPOINT_URI: &str = "opc.tcp://localhost:4840/opcua-runtime-test";

fn test_server() -> Arc<Server> {
    Arc::new(Server::new(ConfigBuilder::new().server_name("test").build()))
}

fn test_client(server: &Arc<Server>) -> Client {
    let connector = Arc::new(LocalConnector::new());
    connector.register(ENDPOINT_URI, Arc::clone(server));
    let client = Client::builder().connector(connector).build().expect("build client");
    client.connect(ENDPOINT_URI).expect("connect");
    client
}

#[test]
fn get_endpoints_advertises_a_none_security_endpoint() {
    let server = test_server();
    let client = test_client(&server);

    let endpoints = client.get_endpoint_info(ENDPOINT_URI).expect("get endpoint info");
    assert!(endpoints
        .iter()
        .any(|e| e.security_mode == opcua_runtime::SecurityMode::None));

    let discovered = client.find_servers(ENDPOINT_URI).expect("find servers");
    assert_eq!(discovered.len(), 1);
    assert_eq!(discovered[0].application_name, server.application_config().application_name);
}

#[test]
fn read_scalar_double() {
    let server = test_server();
    let node_id = NodeId::numeric(1, 10);
    server
        .node_store()
        .create_node(
            NodeItem::new(
                node_id.clone(),
                QualifiedName::new(1, "Temperature"),
                LocalizedText::plain("Temperature"),
                NodeKind::Variable(variable_data(NodeId::numeric(0, 11), -1, Vec::new(), Variant::Scalar(Scalar::Double(21.5)))),
            )
            .with_source(NodeId::numeric(0, OBJECTS_FOLDER)),
        )
        .expect("create node");

    let client = test_client(&server);
    let ServiceResponse::Read(results) = client
        .call_service(
            ENDPOINT_URI,
            ServiceRequest::Read(vec![ReadItem {
                node_id,
                attribute_id: AttributeId::VALUE,
                index_range: None,
                diagnostic_info: None,
            }]),
        )
        .expect("read")
    else {
        panic!("expected a Read response");
    };
    assert_eq!(results[0].value, Variant::Scalar(Scalar::Double(21.5)));
}

#[test]
fn write_then_read_byte_string_array_round_trip() {
    let server = test_server();
    let node_id = NodeId::numeric(1, 11);
    server
        .node_store()
        .create_node(
            NodeItem::new(
                node_id.clone(),
                QualifiedName::new(1, "Blob"),
                LocalizedText::plain("Blob"),
                NodeKind::Variable(variable_data(
                    NodeId::numeric(0, 15),
                    1,
                    vec![0],
                    Variant::array(ScalarType::ByteString, Vec::new()).expect("empty array"),
                )),
            )
            .with_source(NodeId::numeric(0, OBJECTS_FOLDER)),
        )
        .expect("create node");

    let client = test_client(&server);
    let new_value = Variant::array(
        ScalarType::ByteString,
        vec![Scalar::ByteString(vec![1, 2, 3]), Scalar::ByteString(vec![4, 5])],
    )
    .expect("build array");

    let ServiceResponse::Write(statuses) = client
        .call_service(
            ENDPOINT_URI,
            ServiceRequest::Write(vec![WriteItem {
                node_id: node_id.clone(),
                attribute_id: AttributeId::VALUE,
                value: new_value.clone(),
                index_range: None,
            }]),
        )
        .expect("write")
    else {
        panic!("expected a Write response");
    };
    assert!(statuses[0].is_good());

    let ServiceResponse::Read(results) = client
        .call_service(
            ENDPOINT_URI,
            ServiceRequest::Read(vec![ReadItem {
                node_id,
                attribute_id: AttributeId::VALUE,
                index_range: None,
                diagnostic_info: None,
            }]),
        )
        .expect("read")
    else {
        panic!("expected a Read response");
    };
    assert_eq!(results[0].value, new_value);
}

#[test]
fn call_sqrt_method_on_calculator_object() {
    let server = test_server();
    let object_id = NodeId::numeric(2, 1);
    let method_id = NodeId::numeric(2, 2);
    server
        .node_store()
        .create_node(
            NodeItem::new(object_id.clone(), QualifiedName::new(2, "Calculator"), LocalizedText::plain("Calculator"), NodeKind::Object)
                .with_source(NodeId::numeric(0, OBJECTS_FOLDER)),
        )
        .expect("create object");
    server
        .create_method_node(
            NodeItem::new(
                method_id.clone(),
                QualifiedName::new(2, "sqrt"),
                LocalizedText::plain("sqrt"),
                NodeKind::Method(MethodData {
                    input_arguments: vec![QualifiedName::new(2, "x")],
                    output_arguments: vec![QualifiedName::new(2, "result")],
                }),
            )
            .with_source(object_id.clone()),
            Box::new(opcua_runtime::FnMethod::new(vec![ScalarType::Double], vec![ScalarType::Double], |inputs| match &inputs[0] {
                Variant::Scalar(Scalar::Double(value)) => Ok(vec![Variant::Scalar(Scalar::Double(value.sqrt()))]),
                _ => unreachable!(),
            })),
        )
        .expect("create method node");

    let client = test_client(&server);
    let ServiceResponse::Call(results) = client
        .call_service(ENDPOINT_URI, ServiceRequest::Call(vec![CallRequest { object_id, method_id, inputs: vec![Variant::Scalar(Scalar::Double(81.0))] }]))
        .expect("call")
    else {
        panic!("expected a Call response");
    };
    assert!(results[0].status.is_good());
    assert_eq!(results[0].outputs, vec![Variant::Scalar(Scalar::Double(9.0))]);
}

#[test]
fn browse_from_objects_folder_is_cycle_safe() {
    let server = test_server();
    let folder = NodeId::numeric(1, 20);
    let child = NodeId::numeric(1, 21);
    server
        .node_store()
        .create_node(
            NodeItem::new(folder.clone(), QualifiedName::new(1, "Machines"), LocalizedText::plain("Machines"), NodeKind::Object)
                .with_source(NodeId::numeric(0, OBJECTS_FOLDER)),
        )
        .expect("create folder");
    server
        .node_store()
        .create_node(
            NodeItem::new(child.clone(), QualifiedName::new(1, "Press1"), LocalizedText::plain("Press1"), NodeKind::Object)
                .with_source(folder.clone()),
        )
        .expect("create child");
    server
        .node_store()
        .add_reference(&child, NodeId::numeric(0, opcua_runtime::ORGANIZES_REFERENCE_TYPE), &folder, true)
        .expect("add back-reference");

    let client = test_client(&server);
    let mut visited = Vec::new();
    let mut errors = Vec::new();
    client
        .browse(
            ENDPOINT_URI,
            vec![BrowseRoot {
                node_id: NodeId::numeric(0, OBJECTS_FOLDER),
                direction: BrowseDirection::Forward,
                reference_type_filter: None,
                include_subtypes: false,
                node_class_mask: NodeClassMask::ALL,
                result_mask: ResultMask::ALL,
            }],
            10,
            |event| visited.push(event.source_node_id.clone()),
            |error| errors.push(error),
        )
        .expect("browse");

    assert!(errors.is_empty());
    assert_eq!(visited.iter().filter(|id| **id == folder).count(), 1, "Machines must be visited exactly once despite the cycle");
    assert_eq!(visited.iter().filter(|id| **id == child).count(), 1, "Press1 must be visited exactly once despite the cycle");
}

#[test]
fn subscription_create_modify_delete_lifecycle() {
    let server = test_server();
    let client = test_client(&server);

    let ServiceResponse::CreateSubscription(subscription_id) = client
        .call_service(
            ENDPOINT_URI,
            ServiceRequest::CreateSubscription(opcua_runtime::CreateSubscriptionParams {
                publishing_interval: 100.0,
                lifetime_count: 10,
                max_keep_alive_count: 5,
                max_notifications_per_publish: 10,
                priority: 0,
            }),
        )
        .expect("create subscription")
    else {
        panic!("expected a CreateSubscription response");
    };

    assert!(matches!(
        client
            .call_service(
                ENDPOINT_URI,
                ServiceRequest::ModifySubscription {
                    subscription_id,
                    params: opcua_runtime::CreateSubscriptionParams {
                        publishing_interval: 500.0,
                        lifetime_count: 10,
                        max_keep_alive_count: 5,
                        max_notifications_per_publish: 10,
                        priority: 1,
                    },
                },
            )
            .expect("modify subscription"),
        ServiceResponse::ModifySubscription(status) if status.is_good()
    ));

    assert!(matches!(
        client
            .call_service(ENDPOINT_URI, ServiceRequest::DeleteSubscription(subscription_id))
            .expect("delete subscription"),
        ServiceResponse::DeleteSubscription(status) if status.is_good()
    ));
}

#[test]
fn browse_free_function_matches_the_client_facade() {
    let server = test_server();
    let connector = Arc::new(LocalConnector::new());
    connector.register(ENDPOINT_URI, Arc::clone(&server));
    let transport = connector.connect(ENDPOINT_URI).expect("connect transport");

    let mut visited = Vec::new();
    browse(
        transport.as_ref(),
        vec![BrowseRoot::new(NodeId::numeric(0, OBJECTS_FOLDER))],
        10,
        |event| visited.push(event.source_node_id.clone()),
        |_| {},
    )
    .expect("browse");
    assert!(visited.is_empty(), "a bare ObjectsFolder has no children yet");
    let _ = endpoint(ENDPOINT_URI);
}
