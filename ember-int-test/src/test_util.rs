use std::backtrace::Backtrace;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use std::{env, fs, thread};

use ember::common::{DatabaseState, Row, RowId, Value, ValueType};
use ember::errors::{EmberError, EmberResult, ErrorKind};
use ember::geometry::GeometryValue;
use ember::index::{IndexColumn, IndexDefinition, IndexType};
use ember::table::{Column, RowStore};
use ember_spatial::{SpatialConfig, SpatialCursor, SpatialIndex, SpatialIndexer};
use parking_lot::RwLock;

/// Runs a test with retry logic and error handling.
/// Tests run on the current thread to avoid thread exhaustion when running many tests in parallel.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> EmberResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> EmberResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> EmberResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    const MAX_RETRIES: u32 = 3;
    let mut last_error: Option<String> = None;
    let mut last_backtrace: Option<String> = None;

    for attempt in 1..=MAX_RETRIES {
        let start_time = Instant::now();

        let result = std::panic::catch_unwind(|| {
            let backtrace = Backtrace::capture();
            match before() {
                Ok(ctx) => match test(ctx.clone()) {
                    Ok(_) => after(ctx)
                        .map_err(|e| (format!("After run failed: {:?}", e), backtrace.to_string())),
                    Err(e) => {
                        let _ = after(ctx);
                        Err((format!("Test failed: {:?}", e), backtrace.to_string()))
                    }
                },
                Err(e) => Err((format!("Before run failed: {:?}", e), backtrace.to_string())),
            }
        });

        let elapsed = start_time.elapsed();

        let failure = match result {
            Ok(Ok(_)) => return,
            Ok(Err((e, bt))) => {
                last_backtrace = Some(bt);
                e
            }
            Err(panic_err) => {
                let err_msg = if let Some(s) = panic_err.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_err.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                last_backtrace = Some(Backtrace::capture().to_string());
                format!("Panic: {}", err_msg)
            }
        };

        if attempt < MAX_RETRIES {
            eprintln!(
                "\n========== Test Attempt {}/{} Failed (took {:?}) ==========",
                attempt, MAX_RETRIES, elapsed
            );
            eprintln!("Error: {}", failure);
            eprintln!("Retrying in {}ms...\n", 100 * attempt);
            thread::sleep(Duration::from_millis(100 * attempt as u64));
        }
        last_error = Some(failure);
    }

    eprintln!("\n==================== TEST FAILED ====================");
    eprintln!("Failed after {} attempts", MAX_RETRIES);
    eprintln!("Last error: {}", last_error.as_deref().unwrap_or("Unknown"));
    if let Some(bt) = &last_backtrace {
        if !bt.is_empty() && !bt.contains("disabled") {
            eprintln!("\nBacktrace:\n{}", bt);
        }
    }
    eprintln!("=====================================================\n");

    panic!(
        "Test failed after {} attempts. Last error: {}",
        MAX_RETRIES,
        last_error.unwrap_or_default()
    );
}

/// Runs `test` once against each index engine.
pub fn run_on_each_engine(test: fn(TestContext) -> EmberResult<()>) {
    for engine in [Engine::Memory, Engine::Persistent] {
        run_test(move || create_test_context(engine), test, cleanup);
    }
}

/// Which spatial index engine a test context creates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Engine {
    Memory,
    Persistent,
}

#[derive(Clone)]
pub struct TestContext {
    path: PathBuf,
    engine: Engine,
    table: Arc<MemoryTable>,
    indexer: SpatialIndexer,
}

impl TestContext {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    pub fn table(&self) -> Arc<MemoryTable> {
        self.table.clone()
    }

    pub fn indexer(&self) -> &SpatialIndexer {
        &self.indexer
    }

    /// Creates a spatial index on the `shape` column of the test table.
    pub fn create_index(&self, name: &str) -> EmberResult<Arc<dyn SpatialIndex>> {
        self.indexer
            .create_index(spatial_definition(name), self.table.clone(), DatabaseState::Open)
    }

    /// Inserts a row into the table and adds it to `index`.
    pub fn insert(&self, index: &dyn SpatialIndex, key: RowId, wkt: &str) -> EmberResult<Row> {
        let row = self.table.insert(key, wkt)?;
        index.add(&row)?;
        Ok(row)
    }

    /// Removes a row from `index` and deletes it from the table.
    pub fn delete(&self, index: &dyn SpatialIndex, key: RowId) -> EmberResult<()> {
        let row = self.table.get_row(key)?;
        index.remove(&row)?;
        self.table.delete(key);
        Ok(())
    }
}

pub fn random_path() -> PathBuf {
    let id = uuid::Uuid::new_v4();
    env::temp_dir().join(format!("ember-{}", id))
}

pub fn create_test_context(engine: Engine) -> EmberResult<TestContext> {
    let path = random_path();
    fs::create_dir_all(&path)?;

    let config = SpatialConfig::builder()
        .base_path(&path)
        .cache_pages(64)
        .persistent(engine == Engine::Persistent)
        .build();

    Ok(TestContext {
        path,
        engine,
        table: Arc::new(MemoryTable::new("places")),
        indexer: SpatialIndexer::new(config),
    })
}

pub fn cleanup(ctx: TestContext) -> EmberResult<()> {
    if let Err(e) = ctx.indexer().close() {
        eprintln!("Warning: Failed to close spatial indexes: {:?}", e);
    }

    let max_retries = 5;
    for retry in 0..max_retries {
        if !ctx.path().exists() {
            return Ok(());
        }
        match fs::remove_dir_all(ctx.path()) {
            Ok(_) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) if retry == max_retries - 1 => {
                eprintln!(
                    "Warning: Failed to remove test directory {:?} after {} attempts: {:?}",
                    ctx.path(),
                    max_retries,
                    e
                );
            }
            Err(_) => thread::sleep(Duration::from_millis(50 * (retry as u64 + 1))),
        }
    }
    Ok(())
}

/// A table `(id BIGINT, shape GEOMETRY)` kept in memory.
pub struct MemoryTable {
    name: String,
    rows: RwLock<BTreeMap<RowId, Row>>,
}

impl MemoryTable {
    pub fn new(name: &str) -> Self {
        MemoryTable {
            name: name.to_string(),
            rows: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn insert(&self, key: RowId, wkt: &str) -> EmberResult<Row> {
        Ok(self.insert_geometry(key, GeometryValue::from_wkt(wkt)?))
    }

    pub fn insert_geometry(&self, key: RowId, shape: GeometryValue) -> Row {
        let row = geometry_row(key, shape);
        self.rows.write().insert(key, row.clone());
        row
    }

    pub fn insert_row(&self, row: Row) {
        self.rows.write().insert(row.key(), row);
    }

    pub fn delete(&self, key: RowId) -> Option<Row> {
        self.rows.write().remove(&key)
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

impl RowStore for MemoryTable {
    fn table_name(&self) -> &str {
        &self.name
    }

    fn get_row(&self, key: RowId) -> EmberResult<Row> {
        self.rows.read().get(&key).cloned().ok_or_else(|| {
            EmberError::new(
                &format!("row {} not found in {}", key, self.name),
                ErrorKind::RowNotFound,
            )
        })
    }

    fn approximate_row_count(&self) -> u64 {
        self.rows.read().len() as u64
    }
}

pub fn geometry_row(key: RowId, shape: GeometryValue) -> Row {
    Row::new(key, vec![Value::Long(key), Value::Geometry(shape)])
}

pub fn shape_column() -> Column {
    Column::new("shape", 1, ValueType::Geometry)
}

pub fn spatial_definition(name: &str) -> IndexDefinition {
    IndexDefinition::new(
        name,
        "places",
        vec![IndexColumn::new(shape_column())],
        IndexType::spatial(),
    )
}

/// Drains a cursor forward and returns the row keys in visit order.
pub fn collect_keys(cursor: &mut SpatialCursor) -> EmberResult<Vec<RowId>> {
    let mut keys = Vec::new();
    while cursor.next()? {
        if let Some(key) = cursor.current_key() {
            keys.push(key);
        }
    }
    Ok(keys)
}

/// Like [`collect_keys`], sorted.
pub fn sorted_keys(mut cursor: SpatialCursor) -> EmberResult<Vec<RowId>> {
    let mut keys = collect_keys(&mut cursor)?;
    keys.sort();
    Ok(keys)
}
