#![allow(clippy::panic)]

// BDD-style tests for the event log: cursor reads, point queries and
// pipeline state.

use super::test_support::test_db;
use crate::types::{kind, EventFilter, PIPELINE_STATE_TAG};

mod event_log {

    mod when_tailing {
        use super::super::*;

        #[tokio::test]
        async fn then_events_after_cursor_come_back_oldest_first() {
            // Given
            let store = test_db().await;
            let first = store
                .db
                .log(kind::SUMMARY, "build", "one", "w1")
                .await
                .unwrap_or_else(|e| panic!("{e}"));
            store.db.log(kind::SUMMARY, "build", "two", "w1").await.unwrap_or_else(|e| panic!("{e}"));
            store.db.log(kind::SUMMARY, "build", "three", "w2").await.unwrap_or_else(|e| panic!("{e}"));

            // When
            let events = store
                .db
                .tail(&EventFilter::kind(kind::SUMMARY).since(first))
                .await
                .unwrap_or_else(|e| panic!("{e}"));

            // Then
            let bodies: Vec<_> = events.iter().map(|e| e.body.as_str()).collect();
            assert_eq!(bodies, vec!["two", "three"]);
        }

        #[tokio::test]
        async fn then_repeated_cursor_reads_see_every_event_once() {
            let store = test_db().await;
            let mut cursor = 0;
            let mut seen = Vec::new();

            for round in 0..3 {
                for i in 0..2 {
                    store
                        .db
                        .log(kind::SIGNAL, "tick", &format!("{round}-{i}"), "")
                        .await
                        .unwrap_or_else(|e| panic!("{e}"));
                }
                let batch = store
                    .db
                    .tail(&EventFilter::kind(kind::SIGNAL).since(cursor))
                    .await
                    .unwrap_or_else(|e| panic!("{e}"));
                if let Some(last) = batch.last() {
                    cursor = last.id;
                }
                seen.extend(batch.into_iter().map(|e| e.body));
            }

            assert_eq!(seen, vec!["0-0", "0-1", "1-0", "1-1", "2-0", "2-1"]);
        }

        #[tokio::test]
        async fn then_agent_filter_narrows_results() {
            let store = test_db().await;
            store.db.log(kind::SUMMARY, "t", "a", "w1").await.unwrap_or_else(|e| panic!("{e}"));
            store.db.log(kind::SUMMARY, "t", "b", "w2").await.unwrap_or_else(|e| panic!("{e}"));

            let events = store
                .db
                .tail(&EventFilter::kind(kind::SUMMARY).with_agent("w2"))
                .await
                .unwrap_or_else(|e| panic!("{e}"));

            assert_eq!(events.len(), 1);
            assert_eq!(events[0].agent, "w2");
        }
    }

    mod when_querying {
        use super::super::*;

        #[tokio::test]
        async fn then_newest_matching_event_comes_first() {
            let store = test_db().await;
            store.db.log(kind::LIFECYCLE, "phase", "old", "").await.unwrap_or_else(|e| panic!("{e}"));
            store.db.log(kind::LIFECYCLE, "other", "skip", "").await.unwrap_or_else(|e| panic!("{e}"));
            store.db.log(kind::LIFECYCLE, "phase", "new", "").await.unwrap_or_else(|e| panic!("{e}"));

            let events = store
                .db
                .query(&EventFilter::kind(kind::LIFECYCLE).with_tag("phase").limit(1))
                .await
                .unwrap_or_else(|e| panic!("{e}"));

            assert_eq!(events.len(), 1);
            assert_eq!(events[0].body, "new");
        }

        #[tokio::test]
        async fn then_empty_kind_is_still_appended() {
            let store = test_db().await;

            let id = store.db.log("", "t", "b", "").await.unwrap_or_else(|e| panic!("{e}"));

            let events = store
                .db
                .tail(&EventFilter::default())
                .await
                .unwrap_or_else(|e| panic!("{e}"));
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].id, id);
            assert_eq!(events[0].kind, "");
        }
    }

    mod when_tracking_pipeline_state {
        use super::super::*;

        #[tokio::test]
        async fn then_state_defaults_to_running() {
            let store = test_db().await;

            let state = store.db.pipeline_state().await.unwrap_or_else(|e| panic!("{e}"));

            assert_eq!(state, "running");
        }

        #[tokio::test]
        async fn then_latest_state_event_wins() {
            let store = test_db().await;
            store.db.set_pipeline_state("paused", "ops").await.unwrap_or_else(|e| panic!("{e}"));
            store.db.set_pipeline_state("stopping", "ops").await.unwrap_or_else(|e| panic!("{e}"));

            let state = store.db.pipeline_state().await.unwrap_or_else(|e| panic!("{e}"));
            let latest = store
                .db
                .latest(&EventFilter::kind(kind::LIFECYCLE).with_tag(PIPELINE_STATE_TAG))
                .await
                .unwrap_or_else(|e| panic!("{e}"));

            assert_eq!(state, "stopping");
            assert_eq!(latest.map(|e| e.agent).as_deref(), Some("ops"));
        }
    }
}
