//! Synchronization driver surface.
//!
//! [`SyncDriver`] owns one replica's live document and its
//! [`ConflictArbiter`]. Local edits are applied immediately and queued;
//! remote batches are applied optimistically, prune the queue, and the
//! surviving local patches come back for transmission. External transport
//! and serialization of concurrent writers are the caller's job.

use serde_json::Value;

use crate::arbiter::ConflictArbiter;
use crate::patch::{apply, apply_all, ApplyError, Origin, Patch};

/// A batch from a remote actor: the patches it applied plus the resulting
/// document as an authoritative cross-check.
#[derive(Debug, Clone)]
pub struct RemoteUpdate {
    pub patches: Vec<Patch>,
    pub snapshot: Option<Value>,
}

#[derive(Debug, Default)]
pub struct SyncDriver {
    document: Option<Value>,
    arbiter: ConflictArbiter,
}

impl SyncDriver {
    pub fn new(document: Option<Value>) -> Self {
        Self {
            document,
            arbiter: ConflictArbiter::new(),
        }
    }

    /// The current document, `None` while absent.
    pub fn document(&self) -> Option<&Value> {
        self.document.as_ref()
    }

    /// Pending local patches not yet flushed.
    pub fn pending(&self) -> impl Iterator<Item = &Patch> {
        self.arbiter.pending()
    }

    /// Apply a local edit and queue it for the next flush. A failed apply
    /// leaves both the document and the queue untouched.
    pub fn edit(&mut self, patch: Patch) -> Result<(), ApplyError> {
        self.document = apply(self.document.as_ref(), &patch)?;
        self.arbiter.queue(patch);
        Ok(())
    }

    /// Ingest a remote batch: apply its patches, reconcile against the
    /// snapshot, prune stale pending patches, and return the survivors
    /// tagged `origin: "local"` for transmission.
    ///
    /// The snapshot is authoritative: if replaying the patches lands
    /// elsewhere (a batch raced with edits we never saw), the snapshot wins.
    pub fn receive(&mut self, update: RemoteUpdate) -> Result<Vec<Patch>, ApplyError> {
        let remote: Vec<Patch> = update
            .patches
            .into_iter()
            .map(|p| p.with_origin(Origin::Remote))
            .collect();
        let mut next = apply_all(self.document.as_ref(), &remote)?;
        if let Some(snapshot) = update.snapshot {
            if next.as_ref() != Some(&snapshot) {
                next = Some(snapshot);
            }
        }
        self.document = next;
        self.arbiter.on_remote_patches(&remote);
        Ok(self.arbiter.flush())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tree_patch_path::parse_path;

    fn set(path: &str, value: Value) -> Patch {
        Patch::set(parse_path(path).unwrap(), value)
    }

    #[test]
    fn local_edit_applies_and_queues() {
        let mut driver = SyncDriver::new(Some(json!({"title": "old"})));
        driver.edit(set("title", json!("new"))).unwrap();
        assert_eq!(driver.document(), Some(&json!({"title": "new"})));
        assert_eq!(driver.pending().count(), 1);
    }

    #[test]
    fn failed_edit_changes_nothing() {
        let mut driver = SyncDriver::new(Some(json!("leaf")));
        let err = driver.edit(set("deep.path", json!(1))).unwrap_err();
        assert_eq!(err, ApplyError::DeepOnLeaf { kind: "string" });
        assert_eq!(driver.document(), Some(&json!("leaf")));
        assert_eq!(driver.pending().count(), 0);
    }

    #[test]
    fn receive_applies_prunes_and_flushes_survivors() {
        let mut driver = SyncDriver::new(Some(json!({"a": 1, "b": 1})));
        driver.edit(set("a", json!(2))).unwrap();
        driver.edit(set("b", json!(2))).unwrap();

        let survivors = driver
            .receive(RemoteUpdate {
                patches: vec![set("a", json!(9))],
                snapshot: None,
            })
            .unwrap();

        // The remote edit on "a" supersedes the pending local one; "b"
        // survives and goes out tagged local.
        assert_eq!(driver.document(), Some(&json!({"a": 9, "b": 2})));
        assert_eq!(survivors.len(), 1);
        assert_eq!(
            survivors[0],
            set("b", json!(2)).with_origin(Origin::Local)
        );
        assert_eq!(driver.pending().count(), 0);
    }

    #[test]
    fn snapshot_wins_over_replay() {
        let mut driver = SyncDriver::new(Some(json!({"a": 1})));
        let survivors = driver
            .receive(RemoteUpdate {
                patches: vec![set("a", json!(2))],
                // The batch raced with edits this replica never saw.
                snapshot: Some(json!({"a": 2, "b": 3})),
            })
            .unwrap();
        assert!(survivors.is_empty());
        assert_eq!(driver.document(), Some(&json!({"a": 2, "b": 3})));
    }

    #[test]
    fn remote_batch_against_absent_document() {
        let mut driver = SyncDriver::new(None);
        driver
            .receive(RemoteUpdate {
                patches: vec![Patch::set(vec![], json!({"fresh": true}))],
                snapshot: None,
            })
            .unwrap();
        assert_eq!(driver.document(), Some(&json!({"fresh": true})));
    }
}
