use rand::RngCore;
use rusqlite::{params, Connection, OpenFlags, Row};

use crate::detect::BoundingBox;
use crate::error::{Result, TimelineError};
use crate::record::DetectionRecord;

/// Append-only detection log.
///
/// The store owns record identity: ids are assigned on append and are
/// monotonic. Duplicate content is valid. Reads return insertion order.
pub trait DetectionStore {
    fn append(&mut self, record: &DetectionRecord) -> Result<i64>;

    /// Append all records atomically: either every record is committed or none.
    fn append_batch(&mut self, records: &[DetectionRecord]) -> Result<Vec<i64>>;

    fn read_all(&self) -> Result<Vec<DetectionRecord>>;

    /// Records whose class matches `class_name` case-insensitively.
    fn read_by_class(&self, class_name: &str) -> Result<Vec<DetectionRecord>>;

    fn count(&self) -> Result<usize>;
}

/// A fresh shared-cache in-memory SQLite URI, for tests and dry runs.
pub fn shared_memory_uri() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!(
        "file:detection_timeline_{:x}?mode=memory&cache=shared",
        u64::from_le_bytes(bytes)
    )
}

fn open_db_connection(db_path: &str) -> Result<Connection> {
    if db_path.starts_with("file:") {
        return Ok(Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI,
        )?);
    }
    Ok(Connection::open(db_path)?)
}

const INSERT_SQL: &str = r#"
    INSERT INTO detections (class, timestamp, frame, bounding_box_coord0, bounding_box_coord1,
                            bounding_box_coord2, bounding_box_coord3, confidence)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
"#;

const SELECT_COLUMNS: &str = "SELECT id, class, timestamp, frame, bounding_box_coord0, \
     bounding_box_coord1, bounding_box_coord2, bounding_box_coord3, confidence FROM detections";

#[derive(Debug)]
pub struct SqliteDetectionStore {
    conn: Connection,
}

impl SqliteDetectionStore {
    /// Open (or create) the store. Schema creation is idempotent.
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = open_db_connection(db_path)?;
        let mut store = Self { conn };
        store.ensure_schema()?;
        log::debug!("detection store opened at {}", db_path);
        Ok(store)
    }

    fn ensure_schema(&mut self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            BEGIN;

            CREATE TABLE IF NOT EXISTS detections (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              class TEXT,
              timestamp TEXT,
              frame INTEGER,
              bounding_box_coord0 REAL,
              bounding_box_coord1 REAL,
              bounding_box_coord2 REAL,
              bounding_box_coord3 REAL,
              confidence REAL
            );

            CREATE INDEX IF NOT EXISTS idx_detections_class ON detections(class);

            COMMIT;
            "#,
        )?;
        Ok(())
    }

    /// Close the connection, reporting any error the engine raises on close.
    /// Dropping the store also releases the handle; every write has already
    /// been committed by then.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| TimelineError::Storage(e))
    }

    fn query_records(&self, sql: &str, class_name: Option<&str>) -> Result<Vec<DetectionRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = match class_name {
            Some(class_name) => stmt
                .query_map(params![class_name], read_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
            None => stmt
                .query_map([], read_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
        };
        rows.into_iter().map(StoredRow::into_record).collect()
    }
}

fn insert(conn: &Connection, record: &DetectionRecord) -> Result<i64> {
    let frame = i64::try_from(record.frame_index()).map_err(|_| TimelineError::MalformedRecord {
        line: 0,
        reason: format!("frame index {} exceeds storage range", record.frame_index()),
    })?;
    let [x0, y0, x1, y1] = record.bbox().coords();
    conn.execute(
        INSERT_SQL,
        params![
            record.class_name(),
            record.timestamp(),
            frame,
            x0,
            y0,
            x1,
            y1,
            record.confidence()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

struct StoredRow {
    id: i64,
    class_name: String,
    timestamp: String,
    frame: i64,
    coords: [f64; 4],
    confidence: f64,
}

impl StoredRow {
    fn into_record(self) -> Result<DetectionRecord> {
        let frame_index = u64::try_from(self.frame).map_err(|_| TimelineError::MalformedRecord {
            line: 0,
            reason: format!("row {} has negative frame {}", self.id, self.frame),
        })?;
        let [x0, y0, x1, y1] = self.coords;
        Ok(DetectionRecord::from_parts(
            Some(self.id),
            self.class_name,
            self.timestamp,
            frame_index,
            BoundingBox::new(x0, y0, x1, y1),
            self.confidence,
        ))
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<StoredRow> {
    Ok(StoredRow {
        id: row.get(0)?,
        class_name: row.get(1)?,
        timestamp: row.get(2)?,
        frame: row.get(3)?,
        coords: [row.get(4)?, row.get(5)?, row.get(6)?, row.get(7)?],
        confidence: row.get(8)?,
    })
}

impl DetectionStore for SqliteDetectionStore {
    fn append(&mut self, record: &DetectionRecord) -> Result<i64> {
        insert(&self.conn, record)
    }

    fn append_batch(&mut self, records: &[DetectionRecord]) -> Result<Vec<i64>> {
        let tx = self.conn.transaction()?;
        let ids = records
            .iter()
            .map(|record| insert(&tx, record))
            .collect::<Result<Vec<_>>>()?;
        tx.commit()?;
        Ok(ids)
    }

    fn read_all(&self) -> Result<Vec<DetectionRecord>> {
        self.query_records(&format!("{} ORDER BY id ASC", SELECT_COLUMNS), None)
    }

    fn read_by_class(&self, class_name: &str) -> Result<Vec<DetectionRecord>> {
        self.query_records(
            &format!(
                "{} WHERE lower(class) = lower(?1) ORDER BY id ASC",
                SELECT_COLUMNS
            ),
            Some(class_name),
        )
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM detections", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryDetectionStore {
    records: Vec<DetectionRecord>,
    next_id: i64,
}

impl InMemoryDetectionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DetectionStore for InMemoryDetectionStore {
    fn append(&mut self, record: &DetectionRecord) -> Result<i64> {
        self.next_id += 1;
        self.records.push(record.clone().with_id(self.next_id));
        Ok(self.next_id)
    }

    fn append_batch(&mut self, records: &[DetectionRecord]) -> Result<Vec<i64>> {
        records.iter().map(|record| self.append(record)).collect()
    }

    fn read_all(&self) -> Result<Vec<DetectionRecord>> {
        Ok(self.records.clone())
    }

    fn read_by_class(&self, class_name: &str) -> Result<Vec<DetectionRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|record| record.is_class(class_name))
            .cloned()
            .collect())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordBuilder;

    fn sample() -> Vec<DetectionRecord> {
        let builder = RecordBuilder::new(30.0).unwrap();
        vec![
            builder.build(0, "bird", BoundingBox::new(1.0, 2.0, 3.0, 4.0), 0.9),
            builder.build(0, "bird", BoundingBox::new(1.0, 2.0, 3.0, 4.0), 0.9),
            builder.build(45, "Bird", BoundingBox::new(5.5, 6.5, 7.5, 8.5), 0.51),
            builder.build(90, "cat", BoundingBox::new(0.0, 0.0, 10.0, 10.0), 0.3),
        ]
    }

    fn exercise_store(store: &mut dyn DetectionStore) {
        let records = sample();
        let first = store.append(&records[0]).unwrap();
        let rest = store.append_batch(&records[1..]).unwrap();
        assert_eq!(rest.len(), 3);
        assert!(rest.iter().all(|id| *id > first));

        let all = store.read_all().unwrap();
        assert_eq!(all.len(), 4);
        for (read, original) in all.iter().zip(&records) {
            assert!(read.id().is_some());
            assert_eq!(read.class_name(), original.class_name());
            assert_eq!(read.timestamp(), original.timestamp());
            assert_eq!(read.frame_index(), original.frame_index());
            assert_eq!(read.bbox(), original.bbox());
            assert_eq!(read.confidence(), original.confidence());
        }

        assert_eq!(store.read_by_class("BIRD").unwrap().len(), 3);
        assert_eq!(store.read_by_class("dog").unwrap().len(), 0);
        assert_eq!(store.count().unwrap(), 4);
    }

    #[test]
    fn sqlite_store_round_trips_records() {
        let mut store = SqliteDetectionStore::open(&shared_memory_uri()).unwrap();
        exercise_store(&mut store);
        store.close().unwrap();
    }

    #[test]
    fn in_memory_store_round_trips_records() {
        let mut store = InMemoryDetectionStore::new();
        exercise_store(&mut store);
    }

    #[test]
    fn reopening_keeps_committed_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detections.db");
        let path = path.to_str().unwrap();

        let mut store = SqliteDetectionStore::open(path).unwrap();
        store.append_batch(&sample()).unwrap();
        drop(store);

        let store = SqliteDetectionStore::open(path).unwrap();
        assert_eq!(store.count().unwrap(), 4);
        assert_eq!(store.read_all().unwrap()[3].class_name(), "cat");
    }

    #[test]
    fn unwritable_location_is_an_error() {
        let err = SqliteDetectionStore::open("/nonexistent-dir/sub/detections.db");
        assert!(matches!(err, Err(TimelineError::Storage(_))));
    }
}
