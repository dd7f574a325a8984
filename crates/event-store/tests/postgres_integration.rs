//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container and need a running Docker
//! daemon, so they are ignored by default. Run with:
//!
//! ```bash
//! cargo test -p event-store --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use event_store::{
    AggregateId, AggregateType, EventEnvelope, EventQuery, EventStore, EventStoreError,
    EventStoreExt, GameId, PostgresEventStore, PostgresSnapshotStore, Snapshot, SnapshotStore,
    Version,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresEventStore::new(temp_pool.clone())
                .run_migrations()
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh pool with cleared tables
async fn get_test_pool() -> PgPool {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE events, snapshots RESTART IDENTITY")
        .execute(&pool)
        .await
        .unwrap();

    pool
}

async fn get_test_store() -> PostgresEventStore {
    PostgresEventStore::new(get_test_pool().await)
}

fn game() -> GameId {
    GameId::new("game-1").unwrap()
}

fn id(value: &str) -> AggregateId {
    AggregateId::new(value).unwrap()
}

fn create_test_event(event_type: &str) -> EventEnvelope {
    EventEnvelope::new(event_type, game(), serde_json::json!({"test": true}))
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn append_and_retrieve_events() {
    let store = get_test_store().await;
    let aggregate_id = id("game-1");

    let result = store
        .append(
            &aggregate_id,
            AggregateType::Game,
            vec![create_test_event("GameCreated")],
            Some(Version::initial()),
        )
        .await;
    assert_eq!(result.unwrap(), Version::first());

    let events = store.get_events(&aggregate_id, None).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "GameCreated");
    assert_eq!(events[0].version, Version::first());
    assert_eq!(events[0].aggregate_type, AggregateType::Game);
    assert_eq!(events[0].game_id, game());
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn append_multiple_events_atomically() {
    let store = get_test_store().await;
    let aggregate_id = id("game-1");

    let events = vec![
        create_test_event("Event1"),
        create_test_event("Event2"),
        create_test_event("Event3"),
    ];

    let result = store
        .append(&aggregate_id, AggregateType::Game, events, None)
        .await;
    assert_eq!(result.unwrap(), Version::new(3));

    let stored = store.get_events(&aggregate_id, None).await.unwrap();
    let versions: Vec<i64> = stored.iter().map(|e| e.version.as_i64()).collect();
    assert_eq!(versions, vec![1, 2, 3]);
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn optimistic_concurrency_conflict() {
    let store = get_test_store().await;
    let aggregate_id = id("game-1");

    store
        .append(
            &aggregate_id,
            AggregateType::Game,
            vec![create_test_event("Event1")],
            Some(Version::initial()),
        )
        .await
        .unwrap();

    let result = store
        .append(
            &aggregate_id,
            AggregateType::Game,
            vec![create_test_event("Event2")],
            Some(Version::initial()),
        )
        .await;

    assert!(matches!(
        result,
        Err(EventStoreError::ConcurrencyConflict { .. })
    ));
    assert_eq!(
        store.get_aggregate_version(&aggregate_id).await.unwrap(),
        Some(Version::first())
    );
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn racing_appends_store_exactly_one() {
    let store = get_test_store().await;
    let aggregate_id = id("game-1");
    let seed = (0..5).map(|_| create_test_event("Seed")).collect();
    store
        .append(&aggregate_id, AggregateType::Game, seed, None)
        .await
        .unwrap();

    let a = store.clone();
    let b = store.clone();
    let (first, second) = tokio::join!(
        a.append(
            &aggregate_id,
            AggregateType::Game,
            vec![create_test_event("ScoreUpdated")],
            Some(Version::new(5)),
        ),
        b.append(
            &aggregate_id,
            AggregateType::Game,
            vec![create_test_event("ScoreUpdated")],
            Some(Version::new(5)),
        ),
    );

    assert_eq!(
        [first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(),
        1
    );
    assert_eq!(
        store.get_aggregate_version(&aggregate_id).await.unwrap(),
        Some(Version::new(6))
    );
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn get_events_after_version() {
    let store = get_test_store().await;
    let aggregate_id = id("game-1");

    let events = vec![
        create_test_event("Event1"),
        create_test_event("Event2"),
        create_test_event("Event3"),
    ];
    store
        .append(&aggregate_id, AggregateType::Game, events, None)
        .await
        .unwrap();

    let tail = store
        .get_events(&aggregate_id, Some(Version::new(1)))
        .await
        .unwrap();

    assert_eq!(tail.len(), 2);
    assert_eq!(tail[0].version, Version::new(2));
    assert_eq!(tail[1].version, Version::new(3));
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn events_by_type_and_game() {
    let store = get_test_store().await;

    store
        .append(
            &id("game-1"),
            AggregateType::Game,
            vec![create_test_event("GameCreated")],
            None,
        )
        .await
        .unwrap();
    store
        .append(
            &id("lineup-1"),
            AggregateType::TeamLineup,
            vec![create_test_event("TeamLineupCreated")],
            None,
        )
        .await
        .unwrap();

    let created = store.get_events_by_type("GameCreated").await.unwrap();
    assert_eq!(created.len(), 1);

    let by_game = store.get_events_by_game_id(&game()).await.unwrap();
    assert_eq!(by_game.len(), 2);
    assert!(by_game[0].global_position < by_game[1].global_position);

    let all = store.get_all_events().await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn query_events_with_limit_and_offset() {
    let store = get_test_store().await;
    let aggregate_id = id("game-1");

    let events = (1..=5)
        .map(|n| create_test_event(&format!("Event{n}")))
        .collect();
    store
        .append(&aggregate_id, AggregateType::Game, events, None)
        .await
        .unwrap();

    let query = EventQuery::for_aggregate(aggregate_id)
        .aggregate_type(AggregateType::Game)
        .page(1, 2);

    let results = store.query_events(query).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].version, Version::new(2));
    assert_eq!(results[1].version, Version::new(3));
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn stream_all_events() {
    use futures_util::StreamExt;

    let store = get_test_store().await;

    store
        .append(
            &id("game-1"),
            AggregateType::Game,
            vec![create_test_event("Event1")],
            None,
        )
        .await
        .unwrap();
    store
        .append(
            &id("inning-1"),
            AggregateType::InningState,
            vec![create_test_event("Event2")],
            None,
        )
        .await
        .unwrap();

    let stream = store.stream_all_events().await.unwrap();
    let events: Vec<_> = stream.collect().await;
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.is_ok()));
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn exists_extension() {
    let store = get_test_store().await;
    let aggregate_id = id("game-1");

    assert!(!store.exists(&aggregate_id).await.unwrap());

    store
        .append_event(
            &aggregate_id,
            AggregateType::Game,
            create_test_event("Event1"),
            None,
        )
        .await
        .unwrap();

    assert!(store.exists(&aggregate_id).await.unwrap());
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn event_metadata_preserved() {
    let store = get_test_store().await;
    let aggregate_id = id("game-1");

    let event = EventEnvelope::new("TestEvent", game(), serde_json::json!({"data": "test"}))
        .with_metadata("correlation_id", serde_json::json!("corr-123"));

    store
        .append(&aggregate_id, AggregateType::Game, vec![event], None)
        .await
        .unwrap();

    let events = store.get_events(&aggregate_id, None).await.unwrap();
    assert_eq!(
        events[0].metadata.get("correlation_id"),
        Some(&serde_json::json!("corr-123"))
    );
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn snapshot_update_replaces_existing() {
    let snapshots = PostgresSnapshotStore::new(get_test_pool().await);
    let aggregate_id = id("game-1");

    assert!(snapshots.load(&aggregate_id).await.unwrap().is_none());

    snapshots
        .save(Snapshot::new(
            aggregate_id.clone(),
            AggregateType::Game,
            Version::new(5),
            serde_json::json!({"state": "first"}),
        ))
        .await
        .unwrap();
    snapshots
        .save(Snapshot::new(
            aggregate_id.clone(),
            AggregateType::Game,
            Version::new(10),
            serde_json::json!({"state": "second"}),
        ))
        .await
        .unwrap();

    let retrieved = snapshots.load(&aggregate_id).await.unwrap().unwrap();
    assert_eq!(retrieved.version, Version::new(10));
    assert_eq!(retrieved.state, serde_json::json!({"state": "second"}));

    snapshots.delete(&aggregate_id).await.unwrap();
    assert!(snapshots.load(&aggregate_id).await.unwrap().is_none());
}
