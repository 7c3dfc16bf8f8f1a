//! Update service abstraction.
//!
//! The update call is fire-and-forget from the core's perspective: its
//! success shows up later as a record snapshot from the store, not as a
//! value the core waits on.

use crate::error::EditorResult;
use async_trait::async_trait;
use recon_types::{FieldMap, RecordId};

/// Sends field changes for a record to the server.
#[async_trait]
pub trait UpdateService: Send + Sync {
    /// Requests that the server apply `payload` to the record `id`.
    async fn update_record(&self, id: &RecordId, payload: FieldMap) -> EditorResult<()>;
}

/// A recording update service for testing.
pub mod mock {
    use super::*;
    use crate::error::EditorError;
    use crate::store::memory::MemoryRecordStore;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tokio::sync::Notify;

    /// One call received by [`RecordingUpdateService`].
    #[derive(Debug, Clone, PartialEq)]
    pub struct UpdateCall {
        pub id: RecordId,
        pub payload: FieldMap,
    }

    /// Records every update call; optionally plays the server by writing
    /// accepted payloads into a [`MemoryRecordStore`].
    #[derive(Default)]
    pub struct RecordingUpdateService {
        calls: Mutex<Vec<UpdateCall>>,
        failure: Mutex<Option<String>>,
        server: Option<Arc<MemoryRecordStore>>,
        called: Notify,
    }

    impl RecordingUpdateService {
        /// Creates a service that only records calls.
        pub fn new() -> Self {
            Self::default()
        }

        /// Creates a service that applies each payload to `store`, producing
        /// the echo snapshot a real server would.
        pub fn applying_to(store: Arc<MemoryRecordStore>) -> Self {
            Self {
                server: Some(store),
                ..Self::default()
            }
        }

        /// Makes subsequent calls fail with `reason`; `None` restores success.
        pub fn fail_with(&self, reason: Option<&str>) {
            *self.failure.lock() = reason.map(str::to_string);
        }

        /// Calls received so far, oldest first.
        pub fn calls(&self) -> Vec<UpdateCall> {
            self.calls.lock().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().len()
        }

        /// Waits until at least `count` calls have been received.
        pub async fn wait_for_calls(&self, count: usize) {
            loop {
                if self.call_count() >= count {
                    return;
                }
                self.called.notified().await;
            }
        }
    }

    #[async_trait]
    impl UpdateService for RecordingUpdateService {
        async fn update_record(&self, id: &RecordId, payload: FieldMap) -> EditorResult<()> {
            self.calls.lock().push(UpdateCall {
                id: id.clone(),
                payload: payload.clone(),
            });
            self.called.notify_one();

            if let Some(reason) = self.failure.lock().clone() {
                return Err(EditorError::UpdateFailed(reason));
            }
            if let Some(store) = &self.server {
                if !store.apply_update(id, &payload) {
                    return Err(EditorError::UpdateFailed(format!("no record {id}")));
                }
            }
            Ok(())
        }
    }
}
