use trackgraph_core::display::GroupChildKind;
use trackgraph_core::{
    CoreError, DataService, DataType, EngineConfig, FunctionCreateRequest, GraphConfig,
    GraphCreateRequest, GroupChild, GroupCreateRequest, GroupView, TrackerCreateRequest, Validity,
    ROOT_GROUP_ID,
};

fn setup() -> DataService {
    DataService::open_in_memory().unwrap()
}

fn kinds(children: &[GroupChild]) -> Vec<GroupChildKind> {
    children.iter().map(GroupChild::kind).collect()
}

#[test]
fn full_load_orders_mixed_children_by_display_index() {
    let service = setup();
    service
        .create_group(&GroupCreateRequest::new("sub", None))
        .unwrap();
    let tracker = service
        .create_tracker(&TrackerCreateRequest::new(
            "t",
            ROOT_GROUP_ID,
            DataType::Continuous,
        ))
        .unwrap();
    service
        .create_function(&FunctionCreateRequest::passthrough(
            "f",
            ROOT_GROUP_ID,
            vec![tracker.feature_id],
        ))
        .unwrap();
    service
        .create_graph(&GraphCreateRequest::new(
            ROOT_GROUP_ID,
            "g",
            GraphConfig::last_value(tracker.feature_id),
        ))
        .unwrap();

    let mut view = GroupView::new(&service);
    assert!(view.children().is_none());
    let children = view.set_group(ROOT_GROUP_ID).unwrap().unwrap();

    assert_eq!(
        kinds(children),
        vec![
            GroupChildKind::Graph,
            GroupChildKind::Function,
            GroupChildKind::Tracker,
            GroupChildKind::Group,
        ]
    );
    let indexes: Vec<i32> = children.iter().map(GroupChild::display_index).collect();
    assert_eq!(indexes, vec![0, 1, 2, 3]);
    assert_eq!(view.group_id(), Some(ROOT_GROUP_ID));
}

#[test]
fn poll_without_events_returns_nothing() {
    let service = setup();
    let mut view = GroupView::new(&service);
    assert!(view.poll().unwrap().is_none());

    view.set_group(ROOT_GROUP_ID).unwrap();
    assert!(view.poll().unwrap().is_none());
}

#[test]
fn poll_picks_up_new_tracker() {
    let service = setup();
    let mut view = GroupView::new(&service);
    let initial = view.set_group(ROOT_GROUP_ID).unwrap().unwrap();
    assert!(initial.is_empty());

    let tracker = service
        .create_tracker(&TrackerCreateRequest::new(
            "fresh",
            ROOT_GROUP_ID,
            DataType::Discrete,
        ))
        .unwrap();

    let children = view.poll().unwrap().unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].kind(), GroupChildKind::Tracker);
    assert_eq!(children[0].id(), tracker.feature_id);
}

#[test]
fn deleted_graph_leaves_the_list() {
    let service = setup();
    let tracker = service
        .create_tracker(&TrackerCreateRequest::new(
            "t",
            ROOT_GROUP_ID,
            DataType::Continuous,
        ))
        .unwrap();
    let graph = service
        .create_graph(&GraphCreateRequest::new(
            ROOT_GROUP_ID,
            "g",
            GraphConfig::last_value(tracker.feature_id),
        ))
        .unwrap();
    let mut view = GroupView::new(&service);
    assert_eq!(view.set_group(ROOT_GROUP_ID).unwrap().unwrap().len(), 2);

    service.delete_graph(graph.id).unwrap();

    let children = view.poll().unwrap().unwrap();
    assert_eq!(kinds(children), vec![GroupChildKind::Tracker]);
}

#[test]
fn graph_moved_away_is_removed() {
    let service = setup();
    let other = service
        .create_group(&GroupCreateRequest::new("other", None))
        .unwrap();
    let tracker = service
        .create_tracker(&TrackerCreateRequest::new(
            "t",
            other.id,
            DataType::Continuous,
        ))
        .unwrap();
    let graph = service
        .create_graph(&GraphCreateRequest::new(
            other.id,
            "g",
            GraphConfig::last_value(tracker.feature_id),
        ))
        .unwrap();
    let mut view = GroupView::new(&service);
    view.set_group(other.id).unwrap();

    service
        .move_component(trackgraph_core::ComponentRef::Graph(graph.id), ROOT_GROUP_ID)
        .unwrap();

    let children = view.poll().unwrap().unwrap();
    assert_eq!(kinds(children), vec![GroupChildKind::Tracker]);
}

#[test]
fn cascade_refreshes_function_validity() {
    let service = setup();
    let tracker = service
        .create_tracker(&TrackerCreateRequest::new(
            "t",
            ROOT_GROUP_ID,
            DataType::Continuous,
        ))
        .unwrap();
    let function = service
        .create_function(&FunctionCreateRequest::passthrough(
            "f",
            ROOT_GROUP_ID,
            vec![tracker.feature_id],
        ))
        .unwrap();
    let mut view = GroupView::new(&service);
    view.set_group(ROOT_GROUP_ID).unwrap();

    service.delete_tracker(tracker.id).unwrap();

    let children = view.poll().unwrap().unwrap();
    assert_eq!(children.len(), 1);
    match &children[0] {
        GroupChild::Function(display) => {
            assert_eq!(display.function.id, function.id);
            assert!(matches!(display.validity, Validity::Invalid(_)));
        }
        other => panic!("unexpected child: {other:?}"),
    }
}

#[test]
fn unknown_group_is_rejected() {
    let service = setup();
    let mut view = GroupView::new(&service);
    assert!(matches!(
        view.set_group(404),
        Err(CoreError::NotFound(_))
    ));
    assert_eq!(view.group_id(), None);
}

#[test]
fn lagged_view_reloads_everything() {
    let config = EngineConfig {
        event_buffer_capacity: 1,
        ..EngineConfig::in_memory()
    };
    let service = DataService::open(&config).unwrap();
    let tracker = service
        .create_tracker(&TrackerCreateRequest::new(
            "t",
            ROOT_GROUP_ID,
            DataType::Continuous,
        ))
        .unwrap();
    let graph = service
        .create_graph(&GraphCreateRequest::new(
            ROOT_GROUP_ID,
            "g",
            GraphConfig::last_value(tracker.feature_id),
        ))
        .unwrap();
    let mut view = GroupView::new(&service);
    view.set_group(ROOT_GROUP_ID).unwrap();

    // GraphDeleted is pushed out of the one-slot buffer by TrackerCreated.
    service.delete_graph(graph.id).unwrap();
    service
        .create_tracker(&TrackerCreateRequest::new(
            "second",
            ROOT_GROUP_ID,
            DataType::Discrete,
        ))
        .unwrap();

    let children = view.poll().unwrap().unwrap();
    assert_eq!(
        kinds(children),
        vec![GroupChildKind::Tracker, GroupChildKind::Tracker]
    );
    assert!(view.poll().unwrap().is_none());
}

#[test]
fn tracker_and_function_ties_favour_newer_feature() {
    let service = setup();
    let older = service
        .create_tracker(&TrackerCreateRequest::new(
            "older",
            ROOT_GROUP_ID,
            DataType::Continuous,
        ))
        .unwrap();
    let tracker = service
        .create_tracker(&TrackerCreateRequest::new(
            "t",
            ROOT_GROUP_ID,
            DataType::Continuous,
        ))
        .unwrap();
    let function = service
        .create_function(&FunctionCreateRequest::passthrough(
            "f",
            ROOT_GROUP_ID,
            vec![older.feature_id],
        ))
        .unwrap();
    assert!(function.id < tracker.id);
    assert!(function.feature_id > tracker.feature_id);

    service
        .update_group_child_order(
            ROOT_GROUP_ID,
            &[
                trackgraph_core::ComponentRef::Tracker(tracker.id),
                trackgraph_core::ComponentRef::Function(function.id),
            ],
        )
        .unwrap();
    service
        .update_group_child_order(
            ROOT_GROUP_ID,
            &[trackgraph_core::ComponentRef::Function(function.id)],
        )
        .unwrap();

    let mut view = GroupView::new(&service);
    let children = view.set_group(ROOT_GROUP_ID).unwrap().unwrap();
    assert_eq!(
        children.iter().map(GroupChild::display_index).collect::<Vec<_>>(),
        vec![0, 0, 2]
    );
    assert_eq!(
        children.iter().map(GroupChild::id).collect::<Vec<_>>(),
        vec![function.feature_id, tracker.feature_id, older.feature_id]
    );
}
