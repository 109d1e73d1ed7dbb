use async_trait::async_trait;
use engine_core::{
    connectors::source::{
        BulkReadClient, ChangeLogClient, ChangeStream, CollectionStatistics, DocumentScan,
    },
    error::SourceError,
};
use model::{
    catalog::stream::ID_FIELD,
    core::{
        identifiers::StreamIdentifier,
        value::{Document, Value, ValueKind},
    },
    pagination::{
        cursor::PrimaryKey,
        position::{GlobalCheckpoint, SourceTimestamp},
    },
    records::change::ChangeRecord,
};
use std::{
    cmp::Ordering as CmpOrdering,
    collections::{BTreeMap, VecDeque},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

/// Position token the fake change log hands out for `ts`.
pub fn position_at(ts: SourceTimestamp) -> GlobalCheckpoint {
    GlobalCheckpoint::new(format!("resume-{}-{}", ts.seconds, ts.sequence), ts)
}

#[derive(Default)]
struct FakeState {
    collections: BTreeMap<StreamIdentifier, Vec<Document>>,
    events: Vec<ChangeRecord>,
    retained_from: Option<SourceTimestamp>,
    heads: BTreeMap<StreamIdentifier, GlobalCheckpoint>,
    statistics: BTreeMap<StreamIdentifier, CollectionStatistics>,
    id_type_overrides: BTreeMap<StreamIdentifier, Vec<ValueKind>>,
    fail_statistics: bool,
    open_cursor_error: Option<String>,
    scan_failures: BTreeMap<StreamIdentifier, usize>,
    scan_batch_sizes: BTreeMap<StreamIdentifier, u64>,
    stream_error_at: Option<usize>,
}

impl FakeState {
    fn last_position(&self) -> Option<GlobalCheckpoint> {
        self.events.iter().rev().find_map(|e| e.resume_position.clone())
    }
}

/// In-memory replica set: ordered collections plus one shared change log.
///
/// Every cursor and scan it opens is counted until closed or dropped.
#[derive(Clone, Default)]
pub struct FakeSource {
    state: Arc<Mutex<FakeState>>,
    open_cursors: Arc<AtomicUsize>,
    cursors_opened: Arc<AtomicUsize>,
    open_scans: Arc<AtomicUsize>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_documents(&self, stream: &StreamIdentifier, docs: Vec<Document>) {
        self.state
            .lock()
            .unwrap()
            .collections
            .entry(stream.clone())
            .or_default()
            .extend(docs);
    }

    /// Appends an event to the change log, assigning its resume position.
    pub fn push_event(&self, mut event: ChangeRecord) -> GlobalCheckpoint {
        let mut state = self.state.lock().unwrap();
        let ts = event.source_timestamp.unwrap_or_else(|| {
            let last = state
                .last_position()
                .map(|p| p.timestamp)
                .unwrap_or(SourceTimestamp::new(1, 0));
            SourceTimestamp::new(last.seconds, last.sequence + 1)
        });
        let position = event
            .resume_position
            .clone()
            .unwrap_or_else(|| position_at(ts));
        event.resume_position = Some(position.clone());
        state.events.push(event);
        position
    }

    /// Positions older than `ts` are reported as no longer retained.
    pub fn set_retained_from(&self, ts: SourceTimestamp) {
        self.state.lock().unwrap().retained_from = Some(ts);
    }

    pub fn set_head(&self, stream: &StreamIdentifier, position: GlobalCheckpoint) {
        self.state
            .lock()
            .unwrap()
            .heads
            .insert(stream.clone(), position);
    }

    pub fn set_statistics(&self, stream: &StreamIdentifier, stats: CollectionStatistics) {
        self.state
            .lock()
            .unwrap()
            .statistics
            .insert(stream.clone(), stats);
    }

    pub fn fail_statistics(&self) {
        self.state.lock().unwrap().fail_statistics = true;
    }

    pub fn fail_open_cursor(&self, message: &str) {
        self.state.lock().unwrap().open_cursor_error = Some(message.to_string());
    }

    /// The scan of `stream` fails after serving `served` documents.
    pub fn fail_scan_after(&self, stream: &StreamIdentifier, served: usize) {
        self.state
            .lock()
            .unwrap()
            .scan_failures
            .insert(stream.clone(), served);
    }

    /// Change cursors fail when reaching the event at `index` of the log.
    pub fn fail_stream_at(&self, index: usize) {
        self.state.lock().unwrap().stream_error_at = Some(index);
    }

    pub fn override_id_types(&self, stream: &StreamIdentifier, kinds: Vec<ValueKind>) {
        self.state
            .lock()
            .unwrap()
            .id_type_overrides
            .insert(stream.clone(), kinds);
    }

    /// Batch size requested by the last scan opened on `stream`.
    pub fn scan_batch_size(&self, stream: &StreamIdentifier) -> Option<u64> {
        self.state
            .lock()
            .unwrap()
            .scan_batch_sizes
            .get(stream)
            .copied()
    }

    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }

    pub fn cursors_opened(&self) -> usize {
        self.cursors_opened.load(Ordering::SeqCst)
    }

    pub fn open_scans(&self) -> usize {
        self.open_scans.load(Ordering::SeqCst)
    }
}

static MISSING_ID: Value = Value::Null;

fn compare_ids(a: &Document, b: &Document) -> CmpOrdering {
    let a = a.get(ID_FIELD).unwrap_or(&MISSING_ID);
    let b = b.get(ID_FIELD).unwrap_or(&MISSING_ID);
    a.compare(b).unwrap_or_else(|| a.kind().cmp(&b.kind()))
}

fn is_after(doc: &Document, after: &PrimaryKey) -> bool {
    let after = after.to_value();
    doc.get(ID_FIELD)
        .filter(|id| id.kind() == after.kind())
        .and_then(|id| id.compare(&after))
        == Some(CmpOrdering::Greater)
}

#[async_trait]
impl ChangeLogClient for FakeSource {
    async fn open_cursor(
        &self,
        position: Option<&GlobalCheckpoint>,
        _namespaces: &[StreamIdentifier],
    ) -> Result<Box<dyn ChangeStream>, SourceError> {
        let state = self.state.lock().unwrap();
        if let Some(message) = &state.open_cursor_error {
            return Err(SourceError::Connection(message.clone()));
        }

        let next_index = match position {
            Some(position) => {
                if let Some(retained) = state.retained_from
                    && position.timestamp < retained
                {
                    return Err(SourceError::PositionNotFound(position.to_string()));
                }
                state
                    .events
                    .iter()
                    .position(|e| {
                        e.resume_position
                            .as_ref()
                            .is_some_and(|p| p.timestamp > position.timestamp)
                    })
                    .unwrap_or(state.events.len())
            }
            None => state.events.len(),
        };

        self.open_cursors.fetch_add(1, Ordering::SeqCst);
        self.cursors_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeChangeStream {
            state: self.state.clone(),
            next_index,
            last: position.cloned(),
            open: self.open_cursors.clone(),
            closed: false,
        }))
    }

    async fn current_position(
        &self,
        namespace: &StreamIdentifier,
    ) -> Result<GlobalCheckpoint, SourceError> {
        let state = self.state.lock().unwrap();
        if let Some(message) = &state.open_cursor_error {
            return Err(SourceError::Connection(message.clone()));
        }
        Ok(state
            .heads
            .get(namespace)
            .cloned()
            .or_else(|| state.last_position())
            .unwrap_or_else(|| position_at(SourceTimestamp::new(1, 0))))
    }
}

#[async_trait]
impl BulkReadClient for FakeSource {
    async fn open_ordered_scan(
        &self,
        stream: &StreamIdentifier,
        after: Option<&PrimaryKey>,
        batch_size: u64,
    ) -> Result<Box<dyn DocumentScan>, SourceError> {
        let mut state = self.state.lock().unwrap();
        state.scan_batch_sizes.insert(stream.clone(), batch_size);
        let mut docs = state.collections.get(stream).cloned().unwrap_or_default();
        docs.sort_by(compare_ids);
        if let Some(after) = after {
            docs.retain(|doc| is_after(doc, after));
        }

        self.open_scans.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeScan {
            docs: docs.into(),
            fail_after: state.scan_failures.get(stream).copied(),
            served: 0,
            open: self.open_scans.clone(),
            closed: false,
        }))
    }

    async fn id_types(&self, stream: &StreamIdentifier) -> Result<Vec<ValueKind>, SourceError> {
        let state = self.state.lock().unwrap();
        if let Some(kinds) = state.id_type_overrides.get(stream) {
            return Ok(kinds.clone());
        }
        let mut kinds: Vec<ValueKind> = state
            .collections
            .get(stream)
            .map(|docs| {
                docs.iter()
                    .map(|d| d.get(ID_FIELD).map(Value::kind).unwrap_or(ValueKind::Null))
                    .collect()
            })
            .unwrap_or_default();
        kinds.sort();
        kinds.dedup();
        Ok(kinds)
    }

    async fn collection_statistics(
        &self,
        stream: &StreamIdentifier,
    ) -> Result<Option<CollectionStatistics>, SourceError> {
        let state = self.state.lock().unwrap();
        if state.fail_statistics {
            return Err(SourceError::Connection("statistics unavailable".into()));
        }
        Ok(state.statistics.get(stream).copied())
    }
}

struct FakeChangeStream {
    state: Arc<Mutex<FakeState>>,
    next_index: usize,
    last: Option<GlobalCheckpoint>,
    open: Arc<AtomicUsize>,
    closed: bool,
}

impl FakeChangeStream {
    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            self.open.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl ChangeStream for FakeChangeStream {
    async fn next(&mut self) -> Result<Option<ChangeRecord>, SourceError> {
        let state = self.state.lock().unwrap();
        if state.stream_error_at == Some(self.next_index) {
            return Err(SourceError::Cursor("change stream interrupted".into()));
        }
        let Some(event) = state.events.get(self.next_index).cloned() else {
            return Ok(None);
        };
        self.next_index += 1;
        self.last = event.resume_position.clone();
        Ok(Some(event))
    }

    fn resume_position(&self) -> Option<GlobalCheckpoint> {
        self.last.clone()
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        self.release();
        Ok(())
    }
}

impl Drop for FakeChangeStream {
    fn drop(&mut self) {
        self.release();
    }
}

struct FakeScan {
    docs: VecDeque<Document>,
    fail_after: Option<usize>,
    served: usize,
    open: Arc<AtomicUsize>,
    closed: bool,
}

impl FakeScan {
    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            self.open.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl DocumentScan for FakeScan {
    async fn next(&mut self) -> Result<Option<Document>, SourceError> {
        if self.fail_after == Some(self.served) {
            return Err(SourceError::Cursor("scan interrupted".into()));
        }
        let doc = self.docs.pop_front();
        if doc.is_some() {
            self.served += 1;
        }
        Ok(doc)
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        self.release();
        Ok(())
    }
}

impl Drop for FakeScan {
    fn drop(&mut self) {
        self.release();
    }
}
