use crate::diary_entry::DiaryEntry;
use crate::error::{DiaryError, Result};
use crate::remote_store::RemoteStore;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

const LOCATION_BASE: &str = "https://store.test";

/// In-memory remote store for tests, with switchable failures.
pub struct MemoryStore {
    documents: Mutex<HashMap<String, Value>>,
    failing_reads: Mutex<HashSet<String>>,
    next_id: AtomicUsize,
    fetch_count: AtomicUsize,
    fail_writes: AtomicBool,
    overwrite: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore {
            documents: Mutex::new(HashMap::new()),
            failing_reads: Mutex::new(HashSet::new()),
            next_id: AtomicUsize::new(1),
            fetch_count: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
            overwrite: true,
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that cannot rewrite a location, so edits mint new ones.
    pub fn without_overwrite() -> Self {
        MemoryStore {
            overwrite: false,
            ..Self::default()
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads_for(&self, location: &str) {
        self.failing_reads
            .lock()
            .unwrap()
            .insert(location.to_string());
    }

    pub fn insert(&self, location: &str, payload: Value) {
        self.documents
            .lock()
            .unwrap()
            .insert(location.to_string(), payload);
    }

    pub fn document(&self, location: &str) -> Option<Value> {
        self.documents.lock().unwrap().get(location).cloned()
    }

    pub fn document_count(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DiaryError::RemoteWrite("Simulated write error".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn create_document(&self, payload: &Value) -> Result<String> {
        self.check_writable()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let location = format!("{LOCATION_BASE}/{id}");
        self.insert(&location, payload.clone());
        Ok(location)
    }

    async fn fetch_document(&self, location: &str) -> Result<DiaryEntry> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        if self.failing_reads.lock().unwrap().contains(location) {
            return Err(DiaryError::RemoteRead("Simulated read error".to_string()));
        }
        let payload = self
            .document(location)
            .ok_or_else(|| DiaryError::RemoteRead(format!("404 for {location}")))?;
        DiaryEntry::from_json(payload)
    }

    async fn overwrite_document(&self, location: &str, payload: &Value) -> Result<()> {
        self.check_writable()?;
        let mut documents = self.documents.lock().unwrap();
        match documents.get_mut(location) {
            Some(existing) => {
                *existing = payload.clone();
                Ok(())
            }
            None => Err(DiaryError::RemoteWrite(format!("404 for {location}"))),
        }
    }

    fn supports_overwrite(&self) -> bool {
        self.overwrite
    }
}
