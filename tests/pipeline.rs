//! Pipeline behaviour against in-process stores.

mod common;

use serde_json::json;

use common::*;
use powerplay_extract::error::{CursorError, DecodeErrorKind, QueryBuildError, RunError, StoreError};
use powerplay_extract::filter::QueryFilter;
use powerplay_extract::pipeline::{CancelToken, Pipeline, RunOptions, RunState};
use powerplay_extract::schema::{BodyKind, PadSize, PowerState, ReserveLevel, StationCategory};
use powerplay_extract::store::MemoryStore;

fn memory_source(docs: Vec<serde_json::Value>) -> MemoryStore {
    MemoryStore::new(DATABASE).with_collection(COLLECTION, docs)
}

fn best_effort() -> RunOptions {
    RunOptions {
        best_effort: true,
        ..RunOptions::default()
    }
}

#[test]
fn test_end_to_end_power_query() {
    let mut pipeline = Pipeline::new(memory_source(fixture_documents()), DATABASE, COLLECTION);
    let results = pipeline.run(&power_filter(), &CancelToken::new()).unwrap();

    let names: Vec<_> = results.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, MATCHING_NAMES);
    assert!(results.diagnostics().is_empty());
    assert!(!results.is_truncated());
    assert_eq!(pipeline.state(), RunState::Closed);

    for system in &results {
        let power_play = system.power_play.as_ref().unwrap();
        assert_eq!(power_play.controlling_power.as_deref(), Some(POWER));
        assert!(power_play.state.as_ref().is_some_and(|s| s.is_controlled()));
    }
}

#[test]
fn test_detailed_document_decodes() {
    let results = Pipeline::new(memory_source(fixture_documents()), DATABASE, COLLECTION)
        .run(&power_filter(), &CancelToken::new())
        .unwrap();
    let system = &results.systems()[1];

    assert_eq!(system.id64, 3107509212);
    assert_eq!(system.population, 22780919);
    assert_eq!(system.object_id.as_str(), "65a1f0c2e4b00000b938d3dc");
    assert_eq!(system.power_state(), Some(&PowerState::Stronghold));

    let power_play = system.power_play.as_ref().unwrap();
    assert_eq!(power_play.reinforcement, Some(1200));
    assert_eq!(power_play.undermining, Some(80));
    assert!(power_play.updated.power_state.is_some());

    let factions: Vec<_> = system.factions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(factions, ["Reach Union", "Reach Pirates"]);

    let star = system.bodies[0].star().unwrap();
    assert_eq!(star.main_star, Some(true));

    let planet_body = &system.bodies[1];
    assert!(matches!(planet_body.kind, BodyKind::Planet(_)));
    let planet = planet_body.planet().unwrap();
    assert_eq!(planet.reserve_level, Some(ReserveLevel::Pristine));
    assert_eq!(planet.materials.names().collect::<Vec<_>>(), ["Iron", "Nickel"]);
    assert_eq!(planet.rings[0].mass, 4_200_000_000);
    assert!(planet.signals.as_ref().unwrap().genuses.is_some());

    let hub = system.station("Reach Hub").unwrap();
    assert_eq!(hub.category(), StationCategory::Orbital);
    assert!(hub.has_service("Shipyard"));
    assert!(hub.shipyard().is_none());
    assert!(hub.market().unwrap().commodity("Gold").is_some());
    assert_eq!(hub.largest_pad(), Some(PadSize::Large));

    let outpost = system.station("Reach Outpost").unwrap();
    let pads = outpost.landing_pads().unwrap();
    assert_eq!(pads.large, None);
    assert_eq!(pads.accommodates(PadSize::Medium), Some(true));
    assert_eq!(pads.accommodates(PadSize::Large), None);
}

#[test]
fn test_zero_matches() {
    let filter = QueryFilter::power_control("Nobody", &STATES).unwrap();
    let results = Pipeline::new(memory_source(fixture_documents()), DATABASE, COLLECTION)
        .run(&filter, &CancelToken::new())
        .unwrap();
    assert!(results.is_empty());
    assert!(results.diagnostics().is_empty());
}

#[test]
fn test_malformed_document_is_skipped() {
    let mut bad = system_doc(2001, "Broken", POWER, "Exploited");
    bad["population"] = json!("lots");

    let docs = vec![
        system_doc(2000, "Before", POWER, "Exploited"),
        bad,
        system_doc(2002, "After", POWER, "Fortified"),
    ];
    let results = Pipeline::new(memory_source(docs), DATABASE, COLLECTION)
        .run(&power_filter(), &CancelToken::new())
        .unwrap();

    let names: Vec<_> = results.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["Before", "After"]);

    let diagnostics = results.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].position, 1);
    assert_eq!(diagnostics[0].error.document_id.as_deref(), Some("2001"));
    assert_eq!(diagnostics[0].error.field, "population");
    assert!(matches!(diagnostics[0].error.kind, DecodeErrorKind::WrongType { .. }));
}

#[test]
fn test_parallel_decode_matches_serial() {
    let mut docs: Vec<_> = (0..40)
        .map(|i| system_doc(5000 + i, &format!("S{}", i), POWER, STATES[i as usize % 3]))
        .collect();
    docs[17]["coords"] = json!(null);

    let serial = Pipeline::new(memory_source(docs.clone()), DATABASE, COLLECTION)
        .run(&power_filter(), &CancelToken::new())
        .unwrap();
    let parallel = Pipeline::new(memory_source(docs), DATABASE, COLLECTION)
        .with_options(RunOptions {
            decode_workers: 4,
            batch_size: 6,
            best_effort: false,
        })
        .run(&power_filter(), &CancelToken::new())
        .unwrap();

    assert_eq!(serial, parallel);
    assert_eq!(parallel.len(), 39);
    assert_eq!(parallel.diagnostics()[0].position, 17);
}

#[test]
fn test_resources_released_on_success() {
    let connector = TrackingConnector::new(fixture_documents());
    let tracker = connector.tracker.clone();

    let results = Pipeline::new(connector, DATABASE, COLLECTION)
        .run(&power_filter(), &CancelToken::new())
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(tracker.connects(), 1);
    assert_eq!(tracker.cursors_opened(), 1);
    assert!(tracker.all_released());
}

#[test]
fn test_cancel_mid_iteration_releases_resources() {
    let cancel = CancelToken::new();
    let connector = TrackingConnector {
        cancel_after: Some((1, cancel.clone())),
        ..TrackingConnector::new(fixture_documents())
    };
    let tracker = connector.tracker.clone();

    let mut pipeline = Pipeline::new(connector, DATABASE, COLLECTION);
    let err = pipeline.run(&power_filter(), &cancel).unwrap_err();

    assert!(matches!(
        err,
        RunError::Cancelled {
            stage: RunState::Iterating,
            partial: None
        }
    ));
    assert!(tracker.all_released());
    assert_eq!(tracker.cursors_closed(), 1);
    assert!(!tracker.used_after_close.load(std::sync::atomic::Ordering::SeqCst));
    assert_eq!(pipeline.state(), RunState::ClosedOnError);
}

#[test]
fn test_cancel_best_effort_returns_truncated_partial() {
    let cancel = CancelToken::new();
    let connector = TrackingConnector {
        cancel_after: Some((2, cancel.clone())),
        ..TrackingConnector::new(fixture_documents())
    };
    let tracker = connector.tracker.clone();

    let err = Pipeline::new(connector, DATABASE, COLLECTION)
        .with_options(best_effort())
        .run(&power_filter(), &cancel)
        .unwrap_err();

    let partial = err.partial().unwrap();
    assert!(partial.is_truncated());
    let names: Vec<_> = partial.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, MATCHING_NAMES[..2]);
    assert!(tracker.all_released());
}

#[test]
fn test_interrupted_cursor() {
    let connector = TrackingConnector {
        interrupt_after: Some(1),
        ..TrackingConnector::new(fixture_documents())
    };
    let tracker = connector.tracker.clone();

    let err = Pipeline::new(connector.clone(), DATABASE, COLLECTION)
        .run(&power_filter(), &CancelToken::new())
        .unwrap_err();
    match &err {
        RunError::Cursor {
            received,
            partial,
            source,
            ..
        } => {
            assert_eq!(*received, 1);
            assert!(partial.is_none());
            assert!(matches!(source, CursorError::Interrupted { position: 1, .. }));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(tracker.all_released());

    let err = Pipeline::new(connector, DATABASE, COLLECTION)
        .with_options(best_effort())
        .run(&power_filter(), &CancelToken::new())
        .unwrap_err();
    let partial = err.into_partial().unwrap();
    assert!(partial.is_truncated());
    assert_eq!(partial.len(), 1);
    assert_eq!(partial.systems()[0].name, "Alpha");
}

#[test]
fn test_failed_ping_is_connection_error() {
    let connector = TrackingConnector {
        refuse_ping: true,
        ..TrackingConnector::new(fixture_documents())
    };
    let tracker = connector.tracker.clone();

    let err = Pipeline::new(connector, DATABASE, COLLECTION)
        .run(&power_filter(), &CancelToken::new())
        .unwrap_err();
    match err {
        RunError::Connection { endpoint, source } => {
            assert_eq!(endpoint, "tracking://test");
            assert!(matches!(source, StoreError::Ping(_)));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(tracker.cursors_opened(), 0);
    assert!(tracker.all_released());
}

#[test]
fn test_missing_collection_is_query_execution_error() {
    let connector = TrackingConnector::new(fixture_documents());
    let tracker = connector.tracker.clone();

    let err = Pipeline::new(connector, DATABASE, "systems")
        .run(&power_filter(), &CancelToken::new())
        .unwrap_err();
    match err {
        RunError::QueryExecution {
            collection, query, ..
        } => {
            assert_eq!(collection, "systems");
            assert!(query.contains("Pranav Antal"));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(tracker.all_released());
}

#[test]
fn test_unknown_filter_field() {
    let err = QueryFilter::builder()
        .eq("controllingPower", POWER)
        .eq("favouriteColour", "blue")
        .build()
        .unwrap_err();
    assert_eq!(err, QueryBuildError::UnknownField("favouriteColour".to_string()));

    let run_err: RunError = err.into();
    assert!(matches!(run_err, RunError::QueryBuild(_)));
}

#[test]
fn test_pipeline_is_single_use() {
    let mut pipeline = Pipeline::new(memory_source(fixture_documents()), DATABASE, COLLECTION);
    pipeline.run(&power_filter(), &CancelToken::new()).unwrap();
    assert!(matches!(
        pipeline.run(&power_filter(), &CancelToken::new()),
        Err(RunError::Finished(RunState::Closed))
    ));
}
