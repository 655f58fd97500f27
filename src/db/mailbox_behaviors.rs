#![allow(clippy::panic)]

// BDD-style tests for mailbox behaviors.
// Focus on exactly-once delivery, per-target ordering and drain snapshots.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;

use super::test_support::test_db;
use crate::error::CoordError;
use crate::types::{AgentStatus, RecvOutcome};

mod mailbox {

    mod when_sending_messages {
        use super::super::*;

        #[tokio::test]
        async fn then_message_is_pending_for_target_only() {
            // Given
            let store = test_db().await;

            // When
            let id = store
                .db
                .send("worker-1", "hello", Some("dispatcher"))
                .await
                .unwrap_or_else(|e| panic!("send failed: {e}"));

            // Then
            assert!(id > 0);
            let pending = store.db.check("worker-1").await.unwrap_or_else(|e| panic!("{e}"));
            let other = store.db.check("worker-2").await.unwrap_or_else(|e| panic!("{e}"));
            assert_eq!(pending, 1);
            assert_eq!(other, 0);
        }

        #[tokio::test]
        async fn then_check_never_claims() {
            let store = test_db().await;
            store.db.send("w", "x", None).await.unwrap_or_else(|e| panic!("{e}"));

            for _ in 0..3 {
                let pending = store.db.check("w").await.unwrap_or_else(|e| panic!("{e}"));
                assert_eq!(pending, 1);
            }
        }

        #[tokio::test]
        async fn then_history_keeps_claimed_rows() {
            let store = test_db().await;
            store.db.send("w", "a", Some("s")).await.unwrap_or_else(|e| panic!("{e}"));
            store.db.try_recv("w").await.unwrap_or_else(|e| panic!("{e}"));

            let history = store.db.mailbox_history("w").await.unwrap_or_else(|e| panic!("{e}"));

            assert_eq!(history.len(), 1);
            assert!(history[0].claimed);
            assert_eq!(history[0].claimed_by.as_deref(), Some("w"));
            assert_eq!(history[0].sender.as_deref(), Some("s"));
        }
    }

    mod when_receiving_messages {
        use super::super::*;

        #[tokio::test]
        async fn then_messages_arrive_in_send_order() {
            // Given
            let store = test_db().await;
            for body in ["first", "second", "third"] {
                store.db.send("w", body, None).await.unwrap_or_else(|e| panic!("{e}"));
            }

            // When
            let mut bodies = Vec::new();
            for _ in 0..3 {
                let outcome = store
                    .db
                    .recv("w", Some(Duration::from_secs(1)))
                    .await
                    .unwrap_or_else(|e| panic!("recv failed: {e}"));
                bodies.extend(outcome.into_body());
            }

            // Then
            assert_eq!(bodies, vec!["first", "second", "third"]);
            assert_eq!(store.db.check("w").await.unwrap_or_else(|e| panic!("{e}")), 0);
        }

        #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
        async fn then_order_holds_while_other_targets_are_busy() {
            // Given: a second target receiving sends in parallel
            let store = test_db().await;
            let noise = {
                let db = store.db.clone();
                tokio::spawn(async move {
                    for i in 0..30 {
                        db.send("other", &format!("n{i}"), None).await?;
                    }
                    Ok::<_, CoordError>(())
                })
            };

            // When: sends to "w" interleave with sends to "other"
            let expected: Vec<String> = (0..10).map(|i| format!("w{i}")).collect();
            for body in &expected {
                store.db.send("w", body, None).await.unwrap_or_else(|e| panic!("{e}"));
                store
                    .db
                    .send("other", "between", None)
                    .await
                    .unwrap_or_else(|e| panic!("{e}"));
            }
            noise
                .await
                .unwrap_or_else(|e| panic!("join failed: {e}"))
                .unwrap_or_else(|e| panic!("send failed: {e}"));

            // Then
            let mut received = Vec::new();
            while let Some(message) = store.db.try_recv("w").await.unwrap_or_else(|e| panic!("{e}")) {
                received.push(message.body);
            }
            assert_eq!(received, expected);
            assert_eq!(store.db.check("other").await.unwrap_or_else(|e| panic!("{e}")), 40);
        }

        #[tokio::test]
        async fn then_empty_mailbox_times_out() {
            let store = test_db().await;

            let outcome = store
                .db
                .recv("w", Some(Duration::from_millis(100)))
                .await
                .unwrap_or_else(|e| panic!("recv failed: {e}"));

            assert_eq!(outcome, RecvOutcome::TimedOut);
        }

        #[tokio::test]
        async fn then_body_reading_timeout_is_still_a_delivery() {
            let store = test_db().await;
            store.db.send("w", "TIMEOUT", None).await.unwrap_or_else(|e| panic!("{e}"));

            let outcome = store
                .db
                .recv("w", Some(Duration::from_millis(200)))
                .await
                .unwrap_or_else(|e| panic!("recv failed: {e}"));

            assert!(matches!(outcome, RecvOutcome::Delivered(ref m) if m.body == "TIMEOUT"));
        }

        #[tokio::test]
        async fn then_registry_status_returns_to_running_after_timeout() {
            let store = test_db().await;
            store.db.register("w", Some(42)).await.unwrap_or_else(|e| panic!("{e}"));

            store
                .db
                .recv("w", Some(Duration::from_millis(50)))
                .await
                .unwrap_or_else(|e| panic!("recv failed: {e}"));

            let status = store.db.agent_status("w").await.unwrap_or_else(|e| panic!("{e}"));
            assert_eq!(status, Some(AgentStatus::Running));
        }

        #[tokio::test]
        async fn then_a_late_send_wakes_a_waiting_receiver() {
            let store = test_db().await;
            let sender = store.db.clone();

            let waiter = tokio::spawn({
                let db = store.db.clone();
                async move { db.recv("w", Some(Duration::from_secs(5))).await }
            });
            tokio::time::sleep(Duration::from_millis(100)).await;
            sender.send("w", "late", None).await.unwrap_or_else(|e| panic!("{e}"));

            let outcome = waiter
                .await
                .unwrap_or_else(|e| panic!("join failed: {e}"))
                .unwrap_or_else(|e| panic!("recv failed: {e}"));
            assert_eq!(outcome.into_body().as_deref(), Some("late"));
        }

        #[tokio::test]
        async fn then_an_unrepresentable_timeout_still_delivers() {
            let store = test_db().await;
            store.db.register("w", Some(7)).await.unwrap_or_else(|e| panic!("{e}"));
            store.db.send("w", "hi", None).await.unwrap_or_else(|e| panic!("{e}"));

            let outcome = store
                .db
                .recv("w", Some(Duration::from_secs(u64::MAX)))
                .await
                .unwrap_or_else(|e| panic!("recv failed: {e}"));

            assert_eq!(outcome.into_body().as_deref(), Some("hi"));
            let status = store.db.agent_status("w").await.unwrap_or_else(|e| panic!("{e}"));
            assert_eq!(status, Some(AgentStatus::Running));
        }

        #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
        async fn then_concurrent_receivers_never_share_a_message() {
            // Given
            let store = test_db().await;
            for i in 0..40 {
                store
                    .db
                    .send("shared", &format!("m{i}"), None)
                    .await
                    .unwrap_or_else(|e| panic!("{e}"));
            }

            // When
            let consumers = (0..4).map(|_| {
                let db = store.db.clone();
                tokio::spawn(async move {
                    let mut got = Vec::new();
                    while let Some(message) = db.try_recv("shared").await? {
                        got.push(message.id);
                    }
                    Ok::<_, crate::error::CoordError>(got)
                })
            });
            let results = join_all(consumers).await;

            // Then
            let mut seen = HashSet::new();
            let mut total = 0;
            for result in results {
                let ids = result
                    .unwrap_or_else(|e| panic!("join failed: {e}"))
                    .unwrap_or_else(|e| panic!("recv failed: {e}"));
                total += ids.len();
                seen.extend(ids);
            }
            assert_eq!(total, 40, "every message delivered exactly once");
            assert_eq!(seen.len(), 40, "no message delivered twice");
        }
    }

    mod when_draining {
        use super::super::*;

        #[tokio::test]
        async fn then_all_pending_messages_are_claimed_oldest_first() {
            let store = test_db().await;
            for body in ["a", "b", "c"] {
                store.db.send("w", body, None).await.unwrap_or_else(|e| panic!("{e}"));
            }

            let drained = store.db.drain("w").await.unwrap_or_else(|e| panic!("{e}"));

            let bodies: Vec<_> = drained.iter().map(|m| m.body.as_str()).collect();
            assert_eq!(bodies, vec!["a", "b", "c"]);
            assert!(drained.iter().all(|m| m.claimed));
            assert_eq!(store.db.check("w").await.unwrap_or_else(|e| panic!("{e}")), 0);
        }

        #[tokio::test]
        async fn then_empty_mailbox_drains_to_nothing() {
            let store = test_db().await;

            let drained = store.db.drain("w").await.unwrap_or_else(|e| panic!("{e}"));

            assert!(drained.is_empty());
        }

        #[tokio::test]
        async fn then_messages_sent_after_drain_stay_pending() {
            let store = test_db().await;
            store.db.send("w", "before", None).await.unwrap_or_else(|e| panic!("{e}"));

            let drained = store.db.drain("w").await.unwrap_or_else(|e| panic!("{e}"));
            store.db.send("w", "after", None).await.unwrap_or_else(|e| panic!("{e}"));

            assert_eq!(drained.len(), 1);
            assert_eq!(store.db.check("w").await.unwrap_or_else(|e| panic!("{e}")), 1);
        }

        #[tokio::test]
        async fn then_a_backlog_larger_than_the_bind_limit_drains_in_one_call() {
            // Given: more unclaimed rows than SQLite allows bound variables
            const BACKLOG: i64 = 40_000;
            let store = test_db().await;
            let mut conn = store.db.connect().await.unwrap_or_else(|e| panic!("{e}"));
            sqlx::query(
                "WITH RECURSIVE seq(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM seq WHERE n < ?)
                 INSERT INTO messages (id, created_at, sender, target, body, claimed)
                 SELECT 1000000 + n, ?, NULL, 'w', 'm' || n, 0 FROM seq",
            )
            .bind(BACKLOG)
            .bind(chrono::Utc::now())
            .execute(&mut conn)
            .await
            .unwrap_or_else(|e| panic!("seeding failed: {e}"));
            drop(conn);

            // When
            let drained = store.db.drain("w").await.unwrap_or_else(|e| panic!("drain failed: {e}"));

            // Then
            assert_eq!(i64::try_from(drained.len()).ok(), Some(BACKLOG));
            assert!(drained.windows(2).all(|pair| pair[0].id < pair[1].id));
            assert_eq!(store.db.check("w").await.unwrap_or_else(|e| panic!("{e}")), 0);
        }

        #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
        async fn then_concurrent_producers_and_drainers_claim_each_message_once() {
            // Given
            const PRODUCERS: usize = 4;
            const PER_PRODUCER: usize = 25;
            let store = test_db().await;
            let finished = Arc::new(AtomicUsize::new(0));

            // When: drainers race each other and the producers
            let drainers: Vec<_> = (0..3)
                .map(|_| {
                    let db = store.db.clone();
                    let finished = Arc::clone(&finished);
                    tokio::spawn(async move {
                        let mut got = Vec::new();
                        loop {
                            let producers_done = finished.load(Ordering::SeqCst) == PRODUCERS;
                            let batch = db.drain("shared").await?;
                            assert!(batch.windows(2).all(|pair| pair[0].id < pair[1].id));
                            let empty = batch.is_empty();
                            got.extend(batch.into_iter().map(|message| message.body));
                            if producers_done && empty {
                                return Ok::<_, CoordError>(got);
                            }
                            tokio::time::sleep(Duration::from_millis(5)).await;
                        }
                    })
                })
                .collect();
            let producers: Vec<_> = (0..PRODUCERS)
                .map(|p| {
                    let db = store.db.clone();
                    let finished = Arc::clone(&finished);
                    tokio::spawn(async move {
                        let mut outcome = Ok(());
                        for i in 0..PER_PRODUCER {
                            if let Err(e) = db.send("shared", &format!("p{p}-m{i}"), None).await {
                                outcome = Err(e);
                                break;
                            }
                        }
                        finished.fetch_add(1, Ordering::SeqCst);
                        outcome
                    })
                })
                .collect();

            for produced in join_all(producers).await {
                produced
                    .unwrap_or_else(|e| panic!("join failed: {e}"))
                    .unwrap_or_else(|e| panic!("send failed: {e}"));
            }
            let drained = join_all(drainers).await;

            // Then
            let mut seen = HashSet::new();
            let mut total = 0;
            for result in drained {
                let bodies = result
                    .unwrap_or_else(|e| panic!("join failed: {e}"))
                    .unwrap_or_else(|e| panic!("drain failed: {e}"));
                total += bodies.len();
                seen.extend(bodies);
            }
            assert_eq!(total, PRODUCERS * PER_PRODUCER, "every message claimed");
            assert_eq!(seen.len(), PRODUCERS * PER_PRODUCER, "no message claimed twice");
            assert_eq!(store.db.check("shared").await.unwrap_or_else(|e| panic!("{e}")), 0);
        }
    }
}
