//! Persistent dial parameter records, keyed by `(server IP, network ID)`.
//!
//! The engine treats the store as a blob service and all of its failures as
//! warnings: a broken datastore degrades replay, it never blocks a dial.

use std::collections::HashMap;

use parking_lot::Mutex;
use thiserror::Error;

use crate::dial_parameters::DialParameters;
use crate::notice::notice_warning;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage: {0}")]
    Storage(String),

    #[error("record encoding: {0}")]
    Encoding(String),
}

/// Blob store for serialized [`DialParameters`] records.
///
/// Implementations must serialize concurrent operations on identical keys;
/// no broader transactional guarantees are assumed.
pub trait DialParametersStore: Send + Sync {
    fn get(&self, server_ip: &str, network_id: &str) -> Result<Option<Vec<u8>>, StoreError>;
    fn set(&self, server_ip: &str, network_id: &str, record: &[u8]) -> Result<(), StoreError>;
    fn delete(&self, server_ip: &str, network_id: &str) -> Result<(), StoreError>;
}

/// Fetch and decode a stored record. Failures are logged and reported as
/// "no record", never as errors.
pub fn get_dial_parameters(
    store: &dyn DialParametersStore,
    server_ip: &str,
    network_id: &str,
) -> Option<DialParameters> {
    let blob = match store.get(server_ip, network_id) {
        Ok(blob) => blob?,
        Err(e) => {
            notice_warning(format!("get dial parameters failed: {}", e));
            return None;
        }
    };
    match serde_json::from_slice(&blob) {
        Ok(record) => Some(record),
        Err(e) => {
            notice_warning(format!("decode dial parameters failed: {}", e));
            None
        }
    }
}

pub fn set_dial_parameters(
    store: &dyn DialParametersStore,
    server_ip: &str,
    network_id: &str,
    dial_params: &DialParameters,
) -> Result<(), StoreError> {
    let blob =
        serde_json::to_vec(dial_params).map_err(|e| StoreError::Encoding(e.to_string()))?;
    store.set(server_ip, network_id, &blob)
}

pub fn delete_dial_parameters(
    store: &dyn DialParametersStore,
    server_ip: &str,
    network_id: &str,
) -> Result<(), StoreError> {
    store.delete(server_ip, network_id)
}

/// In-memory store used by tests and embedded deployments without a
/// persistent datastore. Tracks operation counts for test assertions.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<(String, String), Vec<u8>>>,
    counts: Mutex<OperationCounts>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationCounts {
    pub gets: usize,
    pub sets: usize,
    pub deletes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operation_counts(&self) -> OperationCounts {
        *self.counts.lock()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl DialParametersStore for MemoryStore {
    fn get(&self, server_ip: &str, network_id: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.counts.lock().gets += 1;
        Ok(self
            .records
            .lock()
            .get(&(server_ip.to_string(), network_id.to_string()))
            .cloned())
    }

    fn set(&self, server_ip: &str, network_id: &str, record: &[u8]) -> Result<(), StoreError> {
        self.counts.lock().sets += 1;
        self.records.lock().insert(
            (server_ip.to_string(), network_id.to_string()),
            record.to_vec(),
        );
        Ok(())
    }

    fn delete(&self, server_ip: &str, network_id: &str) -> Result<(), StoreError> {
        self.counts.lock().deletes += 1;
        self.records
            .lock()
            .remove(&(server_ip.to_string(), network_id.to_string()));
        Ok(())
    }
}
