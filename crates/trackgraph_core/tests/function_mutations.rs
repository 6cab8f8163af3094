use std::collections::BTreeSet;
use trackgraph_core::model::function_graph::{
    FunctionGraphNode, NodeDependency, OutputNode,
};
use trackgraph_core::{
    ChangeEvent, CoreError, DataService, DataType, EntityRef, FeatureId, FunctionCreateRequest,
    FunctionGraph, FunctionUpdateRequest, Tracker, TrackerCreateRequest, Validity, ROOT_GROUP_ID,
};

fn setup() -> DataService {
    DataService::open_in_memory().unwrap()
}

fn tracker(service: &DataService, name: &str) -> Tracker {
    service
        .create_tracker(&TrackerCreateRequest::new(
            name,
            ROOT_GROUP_ID,
            DataType::Continuous,
        ))
        .unwrap()
}

fn input_set(ids: &[FeatureId]) -> BTreeSet<FeatureId> {
    ids.iter().copied().collect()
}

#[test]
fn create_round_trips_inputs_and_graph() {
    let service = setup();
    let a = tracker(&service, "a");
    let b = tracker(&service, "b");
    let request =
        FunctionCreateRequest::passthrough("ab", ROOT_GROUP_ID, vec![a.feature_id, b.feature_id]);

    let created = service.create_function(&request).unwrap();
    let loaded = service.get_function(created.id).unwrap();

    assert_eq!(
        input_set(&loaded.input_feature_ids),
        input_set(&[b.feature_id, a.feature_id])
    );
    assert_eq!(loaded.function_graph, request.function_graph);
    assert_eq!(loaded.name, "ab");
    assert_eq!(
        service.get_function_by_feature_id(created.feature_id).unwrap(),
        loaded
    );
}

#[test]
fn duplicate_inputs_are_collapsed() {
    let service = setup();
    let a = tracker(&service, "a");
    let mut request = FunctionCreateRequest::passthrough("twice", ROOT_GROUP_ID, vec![a.feature_id]);
    request.input_feature_ids = vec![a.feature_id, a.feature_id];

    let created = service.create_function(&request).unwrap();
    assert_eq!(created.input_feature_ids, vec![a.feature_id]);
}

#[test]
fn graph_nodes_must_match_declared_inputs() {
    let service = setup();
    let a = tracker(&service, "a");
    let b = tracker(&service, "b");
    let mut request = FunctionCreateRequest::passthrough("bad", ROOT_GROUP_ID, vec![a.feature_id]);
    request.input_feature_ids = vec![a.feature_id, b.feature_id];

    let err = service.create_function(&request).unwrap_err();
    assert!(matches!(err, CoreError::InvalidArgument(_)));
    assert!(service.list_all_functions().unwrap().is_empty());
}

#[test]
fn missing_input_is_not_found() {
    let service = setup();
    let err = service
        .create_function(&FunctionCreateRequest::passthrough("ghost", ROOT_GROUP_ID, vec![77]))
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(EntityRef::Feature(77))));
}

#[test]
fn cyclic_node_graph_is_rejected() {
    let service = setup();
    let a = tracker(&service, "a");
    let script = |id, depends_on| FunctionGraphNode::LuaScriptNode {
        id,
        x: 0.0,
        y: 0.0,
        script: String::new(),
        input_connector_count: 1,
        configuration: Vec::new(),
        dependencies: vec![NodeDependency {
            connector_index: 0,
            node_id: depends_on,
        }],
    };
    let graph = FunctionGraph {
        nodes: vec![
            FunctionGraphNode::FeatureNode {
                id: 1,
                x: 0.0,
                y: 0.0,
                feature_id: a.feature_id,
            },
            script(2, 3),
            script(3, 2),
        ],
        output_node: OutputNode {
            id: 0,
            x: 0.0,
            y: 0.0,
            dependencies: vec![NodeDependency {
                connector_index: 0,
                node_id: 2,
            }],
        },
        is_duration: false,
    };
    let request = FunctionCreateRequest {
        name: "loop".to_string(),
        group_id: ROOT_GROUP_ID,
        description: String::new(),
        function_graph: graph,
        input_feature_ids: vec![a.feature_id],
    };

    let err = service.create_function(&request).unwrap_err();
    assert!(matches!(err, CoreError::CyclicFunctionGraph { .. }));
}

#[test]
fn update_that_closes_a_cycle_is_rejected_without_effects() {
    let service = setup();
    let a = tracker(&service, "a");
    let first = service
        .create_function(&FunctionCreateRequest::passthrough(
            "first",
            ROOT_GROUP_ID,
            vec![a.feature_id],
        ))
        .unwrap();
    let second = service
        .create_function(&FunctionCreateRequest::passthrough(
            "second",
            ROOT_GROUP_ID,
            vec![first.feature_id],
        ))
        .unwrap();
    let mut events = service.subscribe();

    let err = service
        .update_function(
            &FunctionUpdateRequest::new(first.id)
                .with_passthrough_inputs(vec![a.feature_id, second.feature_id]),
        )
        .unwrap_err();

    match err {
        CoreError::CyclicDependency {
            function_feature_id,
            offending_input_ids,
        } => {
            assert_eq!(function_feature_id, first.feature_id);
            assert_eq!(offending_input_ids, vec![second.feature_id]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        service.get_function(first.id).unwrap().input_feature_ids,
        vec![a.feature_id]
    );
    assert!(events.drain().is_empty());
}

#[test]
fn self_input_is_a_cycle() {
    let service = setup();
    let a = tracker(&service, "a");
    let function = service
        .create_function(&FunctionCreateRequest::passthrough(
            "f",
            ROOT_GROUP_ID,
            vec![a.feature_id],
        ))
        .unwrap();

    let err = service
        .update_function(
            &FunctionUpdateRequest::new(function.id)
                .with_passthrough_inputs(vec![function.feature_id]),
        )
        .unwrap_err();
    assert!(matches!(err, CoreError::CyclicDependency { .. }));
}

#[test]
fn graph_and_inputs_update_together() {
    let service = setup();
    let a = tracker(&service, "a");
    let function = service
        .create_function(&FunctionCreateRequest::passthrough(
            "f",
            ROOT_GROUP_ID,
            vec![a.feature_id],
        ))
        .unwrap();

    let mut request = FunctionUpdateRequest::new(function.id);
    request.input_feature_ids = Some(vec![a.feature_id]);
    assert!(matches!(
        service.update_function(&request),
        Err(CoreError::InvalidArgument(_))
    ));
}

#[test]
fn partial_update_keeps_unset_fields() {
    let service = setup();
    let a = tracker(&service, "a");
    let b = tracker(&service, "b");
    let function = service
        .create_function(&FunctionCreateRequest::passthrough(
            "before",
            ROOT_GROUP_ID,
            vec![a.feature_id],
        ))
        .unwrap();
    let mut events = service.subscribe();

    let mut rename = FunctionUpdateRequest::new(function.id);
    rename.name = Some("  after ".to_string());
    let renamed = service.update_function(&rename).unwrap();
    assert_eq!(renamed.name, "after");
    assert_eq!(renamed.input_feature_ids, vec![a.feature_id]);

    let rewired = service
        .update_function(
            &FunctionUpdateRequest::new(function.id).with_passthrough_inputs(vec![b.feature_id]),
        )
        .unwrap();
    assert_eq!(rewired.name, "after");
    assert_eq!(rewired.input_feature_ids, vec![b.feature_id]);
    assert_eq!(
        events.drain(),
        vec![
            ChangeEvent::FunctionUpdated(function.feature_id),
            ChangeEvent::FunctionUpdated(function.feature_id),
        ]
    );
}

#[test]
fn duplicate_copies_graph_into_target_group() {
    let service = setup();
    let a = tracker(&service, "a");
    let group = service
        .create_group(&trackgraph_core::GroupCreateRequest::new("elsewhere", None))
        .unwrap();
    let original = service
        .create_function(&FunctionCreateRequest::passthrough(
            "orig",
            ROOT_GROUP_ID,
            vec![a.feature_id],
        ))
        .unwrap();

    let copy = service.duplicate_function(original.id, Some(group.id)).unwrap();

    assert_ne!(copy.feature_id, original.feature_id);
    assert_eq!(copy.group_id, group.id);
    assert_eq!(copy.display_index, 0);
    assert_eq!(copy.function_graph, original.function_graph);
    assert_eq!(copy.input_feature_ids, original.input_feature_ids);
    assert_eq!(service.list_functions_for_group(group.id).unwrap().len(), 1);
}

#[test]
fn validity_follows_inputs() {
    let service = setup();
    let a = tracker(&service, "a");
    let b = tracker(&service, "b");
    let both = service
        .create_function(&FunctionCreateRequest::passthrough(
            "both",
            ROOT_GROUP_ID,
            vec![a.feature_id, b.feature_id],
        ))
        .unwrap();
    let only_a = service
        .create_function(&FunctionCreateRequest::passthrough(
            "only a",
            ROOT_GROUP_ID,
            vec![a.feature_id],
        ))
        .unwrap();

    service.delete_tracker(a.id).unwrap();

    assert_eq!(service.function_validity(both.id).unwrap(), Validity::Valid);
    match service.function_validity(only_a.id).unwrap() {
        Validity::Invalid(config) => {
            assert_eq!(config.missing_feature_ids, BTreeSet::from([a.feature_id]));
        }
        Validity::Valid => panic!("function without any resolvable input must be invalid"),
    }
}
