#![allow(clippy::panic)]

// BDD-style tests for the agent registry.

use super::test_support::test_db;
use crate::types::AgentStatus;

mod registry {

    mod when_registering {
        use super::super::*;

        #[tokio::test]
        async fn then_agent_is_listed_as_running() {
            let store = test_db().await;

            store.db.register("w1", Some(1234)).await.unwrap_or_else(|e| panic!("{e}"));

            let agents = store.db.list_agents().await.unwrap_or_else(|e| panic!("{e}"));
            assert_eq!(agents.len(), 1);
            assert_eq!(agents[0].name, "w1");
            assert_eq!(agents[0].pid, Some(1234));
            assert_eq!(agents[0].status, AgentStatus::Running);
            assert_eq!(agents[0].pending, 0);
        }

        #[tokio::test]
        async fn then_latest_registration_wins() {
            let store = test_db().await;

            store.db.register("w1", Some(1)).await.unwrap_or_else(|e| panic!("{e}"));
            store.db.register("w1", Some(2)).await.unwrap_or_else(|e| panic!("{e}"));

            let agents = store.db.list_agents().await.unwrap_or_else(|e| panic!("{e}"));
            assert_eq!(agents.len(), 1, "one row per name");
            assert_eq!(agents[0].pid, Some(2));
        }

        #[tokio::test]
        async fn then_pending_count_tracks_mailbox() {
            let store = test_db().await;
            store.db.register("w1", None).await.unwrap_or_else(|e| panic!("{e}"));
            store.db.send("w1", "a", None).await.unwrap_or_else(|e| panic!("{e}"));
            store.db.send("w1", "b", None).await.unwrap_or_else(|e| panic!("{e}"));

            let agents = store.db.list_agents().await.unwrap_or_else(|e| panic!("{e}"));

            assert_eq!(agents[0].pending, 2);
            assert_eq!(agents[0].pid, None);
        }
    }

    mod when_unregistering {
        use super::super::*;

        #[tokio::test]
        async fn then_agent_stays_listed_as_exited_with_its_pid() {
            let store = test_db().await;
            store.db.register("w1", Some(77)).await.unwrap_or_else(|e| panic!("{e}"));

            store.db.unregister("w1").await.unwrap_or_else(|e| panic!("{e}"));

            let agents = store.db.list_agents().await.unwrap_or_else(|e| panic!("{e}"));
            assert_eq!(agents.len(), 1);
            assert_eq!(agents[0].status, AgentStatus::Exited);
            assert_eq!(agents[0].pid, Some(77));
        }
    }

    mod when_cleaning_up {
        use super::super::*;

        #[tokio::test]
        async fn then_named_agent_disappears_from_listing() {
            let store = test_db().await;
            store.db.register("w1", Some(1)).await.unwrap_or_else(|e| panic!("{e}"));
            store.db.register("w2", Some(2)).await.unwrap_or_else(|e| panic!("{e}"));

            let cleaned = store.db.cleanup(Some("w1")).await.unwrap_or_else(|e| panic!("{e}"));

            assert_eq!(cleaned, vec!["w1".to_string()]);
            let names: Vec<_> = store
                .db
                .list_agents()
                .await
                .unwrap_or_else(|e| panic!("{e}"))
                .into_iter()
                .map(|a| a.name)
                .collect();
            assert_eq!(names, vec!["w2".to_string()]);
            assert_eq!(
                store.db.agent_status("w1").await.unwrap_or_else(|e| panic!("{e}")),
                Some(AgentStatus::Cleaned)
            );
        }

        #[tokio::test]
        async fn then_cleanup_all_marks_every_listed_agent() {
            let store = test_db().await;
            store.db.register("w1", Some(1)).await.unwrap_or_else(|e| panic!("{e}"));
            store.db.register("w2", Some(2)).await.unwrap_or_else(|e| panic!("{e}"));
            store.db.cleanup(Some("w1")).await.unwrap_or_else(|e| panic!("{e}"));

            let cleaned = store.db.cleanup(None).await.unwrap_or_else(|e| panic!("{e}"));

            assert_eq!(cleaned, vec!["w2".to_string()]);
            assert!(store
                .db
                .list_agents()
                .await
                .unwrap_or_else(|e| panic!("{e}"))
                .is_empty());
        }

        #[tokio::test]
        async fn then_reregistering_brings_agent_back() {
            let store = test_db().await;
            store.db.register("w1", Some(1)).await.unwrap_or_else(|e| panic!("{e}"));
            store.db.cleanup(Some("w1")).await.unwrap_or_else(|e| panic!("{e}"));

            store.db.register("w1", Some(9)).await.unwrap_or_else(|e| panic!("{e}"));

            let agents = store.db.list_agents().await.unwrap_or_else(|e| panic!("{e}"));
            assert_eq!(agents.len(), 1);
            assert_eq!(agents[0].pid, Some(9));
        }
    }
}
