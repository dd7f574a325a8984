use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    AggregateId, AggregateType, EventEnvelope, EventId, EventQuery, EventStoreError, GameId,
    Result, Snapshot, SnapshotStore, StoredEvent, Version,
    store::{EventStore, EventStream, check_expected_version, validate_events_for_append},
};

const EVENT_COLUMNS: &str = "global_position, event_id, event_type, schema_version, aggregate_id, \
     aggregate_type, version, game_id, occurred_at, stored_at, payload, metadata";

const STREAM_ALL_SQL: &str = "SELECT global_position, event_id, event_type, schema_version, \
     aggregate_id, aggregate_type, version, game_id, occurred_at, stored_at, payload, metadata \
     FROM events ORDER BY global_position ASC";

fn invalid_row(err: impl std::fmt::Display) -> EventStoreError {
    EventStoreError::InvalidRow(err.to_string())
}

/// PostgreSQL-backed event store implementation.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Creates a new PostgreSQL event store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_event(row: PgRow) -> Result<StoredEvent> {
        let metadata_json: serde_json::Value = row.try_get("metadata")?;
        let metadata: HashMap<String, serde_json::Value> = serde_json::from_value(metadata_json)?;
        let aggregate_type: String = row.try_get("aggregate_type")?;
        let schema_version: i32 = row.try_get("schema_version")?;

        Ok(StoredEvent {
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("event_id")?),
            event_type: row.try_get("event_type")?,
            schema_version: u32::try_from(schema_version).map_err(invalid_row)?,
            aggregate_id: AggregateId::new(row.try_get::<String, _>("aggregate_id")?)
                .map_err(invalid_row)?,
            aggregate_type: aggregate_type.parse().map_err(invalid_row)?,
            version: Version::new(row.try_get("version")?),
            game_id: GameId::new(row.try_get::<String, _>("game_id")?).map_err(invalid_row)?,
            occurred_at: row.try_get("occurred_at")?,
            payload: row.try_get("payload")?,
            metadata,
            global_position: row.try_get("global_position")?,
            stored_at: row.try_get("stored_at")?,
        })
    }

    async fn fetch_where(
        &self,
        clause: &str,
        bind: impl FnOnce(&mut QueryBuilder<'_, Postgres>) + Send,
    ) -> Result<Vec<StoredEvent>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {EVENT_COLUMNS} FROM events "));
        builder.push(clause);
        bind(&mut builder);
        builder.push(" ORDER BY global_position ASC");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_event).collect()
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn append(
        &self,
        aggregate_id: &AggregateId,
        aggregate_type: AggregateType,
        events: Vec<EventEnvelope>,
        expected_version: Option<Version>,
    ) -> Result<Version> {
        validate_events_for_append(&events)?;

        let mut tx = self.pool.begin().await?;

        // Serializes appends to one stream for the rest of the transaction.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(aggregate_id.as_str())
            .execute(&mut *tx)
            .await?;

        let head: Option<(i64, String)> = sqlx::query_as(
            "SELECT version, aggregate_type FROM events WHERE aggregate_id = $1 \
             ORDER BY version DESC LIMIT 1",
        )
        .bind(aggregate_id.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let current_version = match head {
            Some((_, ref stored_type)) if stored_type != aggregate_type.as_str() => {
                return Err(EventStoreError::InvalidAppend(format!(
                    "Aggregate {aggregate_id} is a {stored_type} stream, not {aggregate_type}"
                )));
            }
            Some((version, _)) => Version::new(version),
            None => Version::initial(),
        };

        check_expected_version(aggregate_id, expected_version, current_version)?;

        let count = events.len();
        let mut version = current_version;
        for event in events {
            version = version.next();
            let metadata_json = serde_json::to_value(&event.metadata)?;
            let schema_version = i32::try_from(event.schema_version).map_err(|_| {
                EventStoreError::InvalidAppend(format!(
                    "Schema version {} out of range",
                    event.schema_version
                ))
            })?;

            sqlx::query(
                r#"
                INSERT INTO events (event_id, event_type, schema_version, aggregate_id, aggregate_type,
                                    version, game_id, occurred_at, payload, metadata)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(event.event_id.as_uuid())
            .bind(&event.event_type)
            .bind(schema_version)
            .bind(aggregate_id.as_str())
            .bind(aggregate_type.as_str())
            .bind(version.as_i64())
            .bind(event.game_id.as_str())
            .bind(event.occurred_at)
            .bind(&event.payload)
            .bind(metadata_json)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                // Writers that skipped the guard still collide on the unique key.
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("unique_aggregate_version")
                {
                    metrics::counter!("concurrency_conflicts_total").increment(1);
                    return EventStoreError::ConcurrencyConflict {
                        aggregate_id: aggregate_id.clone(),
                        expected: expected_version.unwrap_or(current_version),
                        actual: version,
                    };
                }
                EventStoreError::Database(e)
            })?;
        }

        tx.commit().await?;

        metrics::counter!("events_appended_total", "aggregate_type" => aggregate_type.as_str())
            .increment(count as u64);

        Ok(version)
    }

    async fn get_events(
        &self,
        aggregate_id: &AggregateId,
        from_version: Option<Version>,
    ) -> Result<Vec<StoredEvent>> {
        let after = from_version.unwrap_or_default().as_i64();
        self.fetch_where("WHERE aggregate_id = ", |b| {
            b.push_bind(aggregate_id.as_str().to_string());
            b.push(" AND version > ");
            b.push_bind(after);
        })
        .await
    }

    async fn query_events(&self, query: EventQuery) -> Result<Vec<StoredEvent>> {
        let mut builder =
            QueryBuilder::<Postgres>::new(format!("SELECT {EVENT_COLUMNS} FROM events WHERE TRUE"));

        if let Some(id) = query.aggregate_id {
            builder.push(" AND aggregate_id = ").push_bind(id.as_str().to_string());
        }
        if let Some(agg_type) = query.aggregate_type {
            builder.push(" AND aggregate_type = ").push_bind(agg_type.as_str());
        }
        if let Some(game_id) = query.game_id {
            builder.push(" AND game_id = ").push_bind(game_id.as_str().to_string());
        }
        if let Some(event_types) = query.event_types {
            builder.push(" AND event_type = ANY(").push_bind(event_types).push(")");
        }
        if let Some(from_version) = query.from_version {
            builder.push(" AND version >= ").push_bind(from_version.as_i64());
        }
        if let Some(to_version) = query.to_version {
            builder.push(" AND version <= ").push_bind(to_version.as_i64());
        }
        if let Some(from_ts) = query.from_timestamp {
            builder.push(" AND occurred_at >= ").push_bind(from_ts);
        }
        if let Some(to_ts) = query.to_timestamp {
            builder.push(" AND occurred_at <= ").push_bind(to_ts);
        }

        builder.push(" ORDER BY global_position ASC");

        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            builder.push(" OFFSET ").push_bind(offset as i64);
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn get_all_events(&self) -> Result<Vec<StoredEvent>> {
        self.fetch_where("", |_| {}).await
    }

    async fn get_events_by_type(&self, event_type: &str) -> Result<Vec<StoredEvent>> {
        self.fetch_where("WHERE event_type = ", |b| {
            b.push_bind(event_type.to_string());
        })
        .await
    }

    async fn get_events_by_time_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StoredEvent>> {
        self.fetch_where("WHERE occurred_at >= ", |b| {
            b.push_bind(from);
            b.push(" AND occurred_at <= ");
            b.push_bind(to);
        })
        .await
    }

    async fn get_events_by_game_id(&self, game_id: &GameId) -> Result<Vec<StoredEvent>> {
        self.fetch_where("WHERE game_id = ", |b| {
            b.push_bind(game_id.as_str().to_string());
        })
        .await
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        use futures_util::StreamExt;

        let stream = sqlx::query(STREAM_ALL_SQL)
            .fetch(&self.pool)
            .map(|result| match result {
                Ok(row) => Self::row_to_event(row),
                Err(e) => Err(EventStoreError::Database(e)),
            });

        Ok(Box::pin(stream))
    }

    async fn get_aggregate_version(&self, aggregate_id: &AggregateId) -> Result<Option<Version>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM events WHERE aggregate_id = $1")
                .bind(aggregate_id.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(version.map(Version::new))
    }
}

/// PostgreSQL-backed snapshot store.
#[derive(Clone)]
pub struct PostgresSnapshotStore {
    pool: PgPool,
}

impl PostgresSnapshotStore {
    /// Creates a new PostgreSQL snapshot store. The schema comes from
    /// [`PostgresEventStore::run_migrations`].
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotStore for PostgresSnapshotStore {
    async fn save(&self, snapshot: Snapshot) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO snapshots (aggregate_id, aggregate_type, version, taken_at, state)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (aggregate_id) DO UPDATE SET
                aggregate_type = EXCLUDED.aggregate_type,
                version = EXCLUDED.version,
                taken_at = EXCLUDED.taken_at,
                state = EXCLUDED.state
            "#,
        )
        .bind(snapshot.aggregate_id.as_str())
        .bind(snapshot.aggregate_type.as_str())
        .bind(snapshot.version.as_i64())
        .bind(snapshot.taken_at)
        .bind(&snapshot.state)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load(&self, aggregate_id: &AggregateId) -> Result<Option<Snapshot>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT aggregate_id, aggregate_type, version, taken_at, state
            FROM snapshots
            WHERE aggregate_id = $1
            "#,
        )
        .bind(aggregate_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let aggregate_type: String = row.try_get("aggregate_type")?;
        Ok(Some(Snapshot {
            aggregate_id: AggregateId::new(row.try_get::<String, _>("aggregate_id")?)
                .map_err(invalid_row)?,
            aggregate_type: aggregate_type.parse().map_err(invalid_row)?,
            version: Version::new(row.try_get("version")?),
            taken_at: row.try_get::<DateTime<Utc>, _>("taken_at")?,
            state: row.try_get("state")?,
        }))
    }

    async fn delete(&self, aggregate_id: &AggregateId) -> Result<()> {
        sqlx::query("DELETE FROM snapshots WHERE aggregate_id = $1")
            .bind(aggregate_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM snapshots")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
