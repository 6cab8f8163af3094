use trackgraph_core::{
    ChangeBus, ChangeEvent, DataService, DataType, EngineConfig, GraphConfig, GraphCreateRequest,
    TrackerCreateRequest, ROOT_GROUP_ID,
};

#[test]
fn publishing_without_subscribers_is_harmless() {
    let bus = ChangeBus::new(4);
    assert_eq!(bus.subscriber_count(), 0);
    bus.publish(ChangeEvent::GlobalNote);

    let mut late = bus.subscribe();
    assert_eq!(late.try_next(), None);
}

#[test]
fn subscribers_receive_independently_and_without_replay() {
    let bus = ChangeBus::new(8);
    let mut first = bus.subscribe();
    bus.publish(ChangeEvent::GroupCreated(1));
    let mut second = bus.subscribe();
    bus.publish(ChangeEvent::GroupUpdated(1));

    assert_eq!(
        first.drain(),
        vec![ChangeEvent::GroupCreated(1), ChangeEvent::GroupUpdated(1)]
    );
    assert_eq!(second.drain(), vec![ChangeEvent::GroupUpdated(1)]);
    assert!(first.drain().is_empty());
}

#[test]
fn slow_subscriber_loses_oldest_events() {
    let bus = ChangeBus::new(4);
    let mut slow = bus.subscribe();
    bus.publish_all((1..=6).map(ChangeEvent::DataPoint));

    let mut expected = vec![ChangeEvent::Unknown];
    expected.extend((3..=6).map(ChangeEvent::DataPoint));
    assert_eq!(slow.drain(), expected);

    bus.publish(ChangeEvent::Unknown);
    assert_eq!(slow.try_next(), Some(ChangeEvent::Unknown));
}

#[test]
fn service_uses_configured_buffer_capacity() {
    let config = EngineConfig {
        event_buffer_capacity: 1,
        ..EngineConfig::in_memory()
    };
    let service = DataService::open(&config).unwrap();
    let mut events = service.subscribe();

    service.notify_global_notes_changed();
    service.notify_reminders_changed();
    service.notify_external_import();

    // Two dropped notifications surface as one Unknown, then the survivor.
    assert_eq!(
        events.drain(),
        vec![ChangeEvent::Unknown, ChangeEvent::Unknown]
    );
}

#[test]
fn zero_capacity_config_is_rejected() {
    let config = EngineConfig {
        event_buffer_capacity: 0,
        ..EngineConfig::in_memory()
    };
    assert!(DataService::open(&config).is_err());
}

#[test]
fn failed_mutation_publishes_nothing() {
    let service = DataService::open_in_memory().unwrap();
    let mut events = service.subscribe();

    assert!(service
        .create_tracker(&TrackerCreateRequest::new("orphan", 9_999, DataType::Discrete))
        .is_err());
    assert!(service.delete_group(ROOT_GROUP_ID).is_err());

    assert!(events.drain().is_empty());
}

#[test]
fn notifications_arrive_in_publish_order() {
    let service = DataService::open_in_memory().unwrap();
    let mut events = service.subscribe();

    service.notify_reminders_changed();
    service.notify_global_notes_changed();

    assert_eq!(
        events.drain(),
        vec![ChangeEvent::ReminderChanged, ChangeEvent::GlobalNote]
    );
}

#[tokio::test(flavor = "current_thread")]
async fn async_receiver_waits_for_next_event() {
    let bus = ChangeBus::new(4);
    let mut subscription = bus.subscribe();
    let publisher = bus.clone();

    let sent = tokio::spawn(async move {
        publisher.publish(ChangeEvent::GraphUpdated(7));
    });

    assert_eq!(subscription.recv().await, Some(ChangeEvent::GraphUpdated(7)));
    sent.await.unwrap();

    drop(bus);
    assert_eq!(subscription.recv().await, None);
}

#[test]
fn concurrent_writers_announce_in_commit_order() {
    const WRITERS: usize = 4;
    const GRAPHS_PER_WRITER: usize = 150;

    let config = EngineConfig {
        event_buffer_capacity: 1024,
        ..EngineConfig::in_memory()
    };
    let service = DataService::open(&config).unwrap();
    let tracker = service
        .create_tracker(&TrackerCreateRequest::new(
            "shared",
            ROOT_GROUP_ID,
            DataType::Continuous,
        ))
        .unwrap();
    let feature_id = tracker.feature_id;
    let mut events = service.subscribe();

    std::thread::scope(|threads| {
        for writer in 0..WRITERS {
            let service = &service;
            threads.spawn(move || {
                for n in 0..GRAPHS_PER_WRITER {
                    service
                        .create_graph(&GraphCreateRequest::new(
                            ROOT_GROUP_ID,
                            format!("w{writer} g{n}"),
                            GraphConfig::last_value(feature_id),
                        ))
                        .unwrap();
                }
            });
        }
    });

    let created: Vec<i64> = events
        .drain()
        .into_iter()
        .map(|event| match event {
            ChangeEvent::GraphCreated(id) => id,
            other => panic!("unexpected event: {other:?}"),
        })
        .collect();
    assert_eq!(created.len(), WRITERS * GRAPHS_PER_WRITER);
    // Graph ids grow with commit order.
    assert!(created.windows(2).all(|pair| pair[0] < pair[1]));
}
