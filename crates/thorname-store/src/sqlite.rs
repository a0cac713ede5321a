//! SQLite implementation of the EventLog trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking. Queries are pushed
//! down to SQL; distinct-by-key projections use a `ROW_NUMBER()` window
//! partitioned on the key.
//!
//! Rows may be written by an external ingestion pipeline, so the `chain`
//! column is compared, partitioned and ordered as `UPPER(chain)`, the same
//! normalization [`ChainId`] applies on decode.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection};

use thorname_core::{
    ChainId, ChangeEvent, DistinctOn, EventFilter, EventQuery, NewChangeEvent, OrderBy,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::EventLog;

const COLUMNS: &str = "seq, name, chain, address, owner, expire_height, block_timestamp";

/// SQLite-based event log.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteEventLog {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEventLog {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Append one event, returning its assigned sequence number.
    pub async fn append(&self, event: NewChangeEvent) -> Result<u64> {
        let mut seqs = self.append_batch(vec![event]).await?;
        seqs.pop()
            .ok_or_else(|| StoreError::InvalidData("append produced no sequence number".into()))
    }

    /// Append events in a single transaction, in order.
    pub async fn append_batch(&self, events: Vec<NewChangeEvent>) -> Result<Vec<u64>> {
        for event in &events {
            event.validate()?;
        }

        self.run(move |conn| {
            let tx = conn.transaction()?;
            let mut seqs = Vec::with_capacity(events.len());
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO thorname_change_events
                        (name, chain, address, owner, expire_height, block_timestamp)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;
                for event in &events {
                    stmt.execute(params![
                        event.name,
                        event.chain.as_str(),
                        event.address,
                        event.owner,
                        event.expire_height,
                        event.block_timestamp,
                    ])?;
                    seqs.push(to_seq(tx.last_insert_rowid())?);
                }
            }
            tx.commit()?;
            Ok(seqs)
        })
        .await
    }

    /// Move the current height forward.
    pub async fn set_current_height(&self, height: i64) -> Result<()> {
        self.run(move |conn| {
            let tx = conn.transaction()?;
            let current: i64 =
                tx.query_row("SELECT height FROM chain_height WHERE id = 1", [], |row| {
                    row.get(0)
                })?;
            if height < current {
                return Err(StoreError::HeightRegression {
                    current,
                    attempted: height,
                });
            }
            tx.execute("UPDATE chain_height SET height = ?1 WHERE id = 1", [height])?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Execute a blocking operation on the connection.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = lock(&conn)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::TaskJoin(e.to_string()))?
    }
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock().map_err(|e| StoreError::Poisoned(e.to_string()))
}

fn to_seq(rowid: i64) -> Result<u64> {
    u64::try_from(rowid).map_err(|_| StoreError::InvalidData(format!("negative seq {}", rowid)))
}

/// SQL expression a distinct projection partitions and sorts on.
fn partition_key(on: DistinctOn) -> &'static str {
    match on {
        DistinctOn::Chain => "UPPER(chain)",
        DistinctOn::Name => "name",
    }
}

/// Translate an [`EventFilter`] into a `WHERE` clause and its parameters.
fn build_where(filter: &EventFilter) -> (String, Vec<Value>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    let mut bind = |column: &str, op: &str, value: Value| {
        values.push(value);
        clauses.push(format!("{} {} ?{}", column, op, values.len()));
    };

    if let Some(name) = &filter.name {
        bind("name", "=", Value::Text(name.clone()));
    }
    if let Some(chain) = &filter.chain {
        bind("UPPER(chain)", "=", Value::Text(chain.as_str().to_string()));
    }
    if let Some(address) = &filter.address {
        bind("address", "=", Value::Text(address.clone()));
    }
    if let Some(owner) = &filter.owner {
        bind("owner", "=", Value::Text(owner.clone()));
    }
    if let Some(height) = filter.expire_after {
        bind("expire_height", ">", Value::Integer(height));
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    (where_sql, values)
}

/// Translate an [`EventQuery`] into SQL and its bound parameters.
fn build_select(query: &EventQuery) -> (String, Vec<Value>) {
    let (where_sql, mut values) = build_where(&query.filter);

    let mut sql = match query.distinct {
        Some(on) => format!(
            "SELECT {cols} FROM (
                SELECT {cols}, ROW_NUMBER() OVER (
                    PARTITION BY {key} ORDER BY block_timestamp DESC, seq DESC
                ) AS rn
                FROM thorname_change_events{filter}
             ) WHERE rn = 1 ORDER BY {key}",
            cols = COLUMNS,
            key = partition_key(on),
            filter = where_sql,
        ),
        None => {
            let order = match query.order_by {
                Some(OrderBy::NewestFirst) => "block_timestamp DESC, seq DESC",
                None => "seq ASC",
            };
            format!(
                "SELECT {} FROM thorname_change_events{} ORDER BY {}",
                COLUMNS, where_sql, order
            )
        }
    };

    if let Some(limit) = query.limit {
        values.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        sql.push_str(&format!(" LIMIT ?{}", values.len()));
    }

    (sql, values)
}

// Helper to convert a row to ChangeEvent
fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChangeEvent> {
    let seq: i64 = row.get("seq")?;
    let chain: String = row.get("chain")?;

    Ok(ChangeEvent {
        seq: u64::try_from(seq).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(0, seq))?,
        name: row.get("name")?,
        chain: ChainId::new(&chain)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?,
        address: row.get("address")?,
        owner: row.get("owner")?,
        expire_height: row.get("expire_height")?,
        block_timestamp: row.get("block_timestamp")?,
    })
}

#[async_trait]
impl EventLog for SqliteEventLog {
    async fn query_events(&self, query: &EventQuery) -> Result<Vec<ChangeEvent>> {
        let (sql, values) = build_select(query);
        tracing::trace!(%sql, params = values.len(), "querying change events");

        self.run(move |conn| {
            let mut stmt = conn.prepare_cached(&sql)?;
            let events = stmt
                .query_map(params_from_iter(values.iter()), row_to_event)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(events)
        })
        .await
    }

    async fn candidate_names(&self, filter: &EventFilter) -> Result<Vec<String>> {
        let (where_sql, values) = build_where(filter);
        let sql = format!(
            "SELECT DISTINCT name FROM thorname_change_events{} ORDER BY name",
            where_sql
        );

        self.run(move |conn| {
            let mut stmt = conn.prepare_cached(&sql)?;
            let names = stmt
                .query_map(params_from_iter(values.iter()), |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(names)
        })
        .await
    }

    async fn current_height(&self) -> Result<i64> {
        self.run(|conn| {
            let height: i64 =
                conn.query_row("SELECT height FROM chain_height WHERE id = 1", [], |row| {
                    row.get(0)
                })?;
            Ok(height)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use thorname_core::apply_query;

    fn new_event(name: &str, chain: &str, address: &str, expire: i64, ts: i64) -> NewChangeEvent {
        NewChangeEvent {
            name: name.into(),
            chain: ChainId::new(chain).unwrap(),
            address: address.into(),
            owner: format!("{}-owner", name),
            expire_height: expire,
            block_timestamp: ts,
        }
    }

    #[tokio::test]
    async fn test_append_and_query() {
        let log = SqliteEventLog::open_memory().unwrap();
        let seq = log
            .append(new_event("alice", "THOR", "thor1x", 1000, 1))
            .await
            .unwrap();

        let rows = log
            .query_events(&EventQuery::new(EventFilter::new().name("alice")))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].seq, seq);
        assert_eq!(rows[0].chain, ChainId::thor());
        assert_eq!(rows[0].owner, "alice-owner");
    }

    #[tokio::test]
    async fn test_tie_break_prefers_later_append() {
        let log = SqliteEventLog::open_memory().unwrap();
        log.append_batch(vec![
            new_event("carol", "THOR", "thor1first", 1000, 10),
            new_event("carol", "THOR", "thor1second", 1000, 10),
        ])
        .await
        .unwrap();

        let query = EventQuery::new(EventFilter::new().name("carol"))
            .order_by(OrderBy::NewestFirst)
            .limit(1);
        let rows = log.query_events(&query).await.unwrap();
        assert_eq!(rows[0].address, "thor1second");

        let distinct =
            EventQuery::new(EventFilter::new().name("carol")).distinct(DistinctOn::Chain);
        let rows = log.query_events(&distinct).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].address, "thor1second");
    }

    #[tokio::test]
    async fn test_expire_filter() {
        let log = SqliteEventLog::open_memory().unwrap();
        log.append(new_event("dave", "THOR", "thor1d", 500, 1))
            .await
            .unwrap();

        let live = EventQuery::new(EventFilter::new().name("dave").expire_after(499));
        assert_eq!(log.query_events(&live).await.unwrap().len(), 1);

        let expired = EventQuery::new(EventFilter::new().name("dave").expire_after(500));
        assert!(log.query_events(&expired).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_height_monotonic() {
        let log = SqliteEventLog::open_memory().unwrap();
        assert_eq!(log.current_height().await.unwrap(), 0);

        log.set_current_height(42).await.unwrap();
        assert_eq!(log.current_height().await.unwrap(), 42);

        let err = log.set_current_height(41).await.unwrap_err();
        assert!(matches!(err, StoreError::HeightRegression { current: 42, attempted: 41 }));
    }

    #[tokio::test]
    async fn test_reopen_preserves_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thornames.db");

        {
            let log = SqliteEventLog::open(&path).unwrap();
            log.append(new_event("erin", "BTC", "bc1e", 900, 3))
                .await
                .unwrap();
            log.set_current_height(77).await.unwrap();
        }

        let log = SqliteEventLog::open(&path).unwrap();
        assert_eq!(log.current_height().await.unwrap(), 77);
        let rows = log
            .query_events(&EventQuery::new(EventFilter::new().address("bc1e")))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "erin");
    }

    #[tokio::test]
    async fn test_invalid_event_not_written() {
        let log = SqliteEventLog::open_memory().unwrap();
        let err = log
            .append(new_event("", "THOR", "thor1x", 1000, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidEvent(_)));
        assert!(log
            .query_events(&EventQuery::default())
            .await
            .unwrap()
            .is_empty());
    }

    /// Insert a row the way an external writer would, bypassing validation.
    fn insert_raw(log: &SqliteEventLog, name: &str, chain: &str, address: &str, ts: i64) {
        let conn = lock(&log.conn).unwrap();
        conn.execute(
            "INSERT INTO thorname_change_events
                (name, chain, address, owner, expire_height, block_timestamp)
             VALUES (?1, ?2, ?3, 'thor1x', 1000, ?4)",
            params![name, chain, address, ts],
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_chain_case_is_normalized() {
        let log = SqliteEventLog::open_memory().unwrap();
        insert_raw(&log, "alice", "thor", "thor1x", 1);
        insert_raw(&log, "alice", "ETH", "0xAB", 2);
        insert_raw(&log, "alice", "eth", "0xCD", 3);
        insert_raw(&log, "alice", "BTC", "bc1a", 4);

        let distinct =
            EventQuery::new(EventFilter::new().name("alice")).distinct(DistinctOn::Chain);
        let rows = log.query_events(&distinct).await.unwrap();
        let pairs: Vec<(&str, &str)> = rows
            .iter()
            .map(|e| (e.chain.as_str(), e.address.as_str()))
            .collect();
        assert_eq!(pairs, vec![("BTC", "bc1a"), ("ETH", "0xCD"), ("THOR", "thor1x")]);

        let root = EventQuery::new(EventFilter::new().name("alice").chain(ChainId::thor()));
        let rows = log.query_events(&root).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].address, "thor1x");
    }

    #[tokio::test]
    async fn test_candidate_names_ignore_malformed_chain() {
        let log = SqliteEventLog::open_memory().unwrap();
        insert_raw(&log, "alice", "BTC", "bnb1", 1);
        insert_raw(&log, "bob", "BNB.BNB", "bnb1", 2);
        insert_raw(&log, "carol", "BTC", "bc1c", 3);

        let names = log
            .candidate_names(&EventFilter::new().address("bnb1"))
            .await
            .unwrap();
        assert_eq!(names, vec!["alice".to_string(), "bob".to_string()]);

        let bob = EventQuery::new(EventFilter::new().name("bob"));
        assert!(matches!(
            log.query_events(&bob).await,
            Err(StoreError::Database(_))
        ));

        let alice = EventQuery::new(EventFilter::new().name("alice"));
        assert_eq!(log.query_events(&alice).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_poisoned_connection_is_reported() {
        let log = SqliteEventLog::open_memory().unwrap();
        let conn = Arc::clone(&log.conn);
        let _ = std::thread::spawn(move || {
            let _guard = conn.lock().unwrap();
            panic!("writer panicked while holding the connection");
        })
        .join();

        assert!(matches!(
            log.current_height().await,
            Err(StoreError::Poisoned(_))
        ));
    }

    fn arb_query() -> impl Strategy<Value = EventQuery> {
        (
            prop::option::of(prop::sample::select(vec!["alice", "bob", "carol"])),
            prop::option::of(prop::sample::select(vec!["THOR", "ETH", "BTC"])),
            prop::option::of(prop::sample::select(vec!["a1", "a2", "a3"])),
            prop::option::of(0i64..6),
            prop::option::of(prop_oneof![Just(DistinctOn::Chain), Just(DistinctOn::Name)]),
            any::<bool>(),
            prop::option::of(0usize..5),
        )
            .prop_map(|(name, chain, address, expire, distinct, newest, limit)| {
                let mut filter = EventFilter::new();
                filter.name = name.map(String::from);
                filter.chain = chain.map(|c| ChainId::new(c).unwrap());
                filter.address = address.map(String::from);
                filter.expire_after = expire;
                EventQuery {
                    filter,
                    order_by: newest.then_some(OrderBy::NewestFirst),
                    distinct,
                    limit,
                }
            })
    }

    fn arb_events() -> impl Strategy<Value = Vec<NewChangeEvent>> {
        prop::collection::vec(
            (
                prop::sample::select(vec!["alice", "bob", "carol"]),
                prop::sample::select(vec!["THOR", "ETH", "BTC"]),
                prop::sample::select(vec!["a1", "a2", "a3"]),
                0i64..6,
                0i64..4,
            ),
            0..30,
        )
        .prop_map(|specs| {
            specs
                .into_iter()
                .map(|(n, c, a, expire, ts)| new_event(n, c, a, expire, ts))
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn test_sql_matches_reference_evaluator(events in arb_events(), query in arb_query()) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (from_sql, expected) = rt.block_on(async {
                let log = SqliteEventLog::open_memory().unwrap();
                log.append_batch(events.clone()).await.unwrap();
                let all = log.query_events(&EventQuery::default()).await.unwrap();
                let from_sql = log.query_events(&query).await.unwrap();
                (from_sql, apply_query(&all, &query))
            });
            prop_assert_eq!(from_sql, expected);
        }
    }
}
