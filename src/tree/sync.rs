//! Bulk upsert of a client-submitted node list.

use super::TaskTreeService;
use crate::codec::{self, TaskNodeDto};
use crate::error::TreeResult;
use crate::store::TaskStore;
use crate::types::TaskNode;
use tracing::info;

impl<S: TaskStore> TaskTreeService<S> {
    /// Insert or replace exactly the submitted nodes.
    ///
    /// Every element is decoded before anything is written, so one malformed
    /// element rejects the whole batch. Stored nodes missing from the payload
    /// are left alone and no cascade runs: callers wanting cascaded state must
    /// submit it.
    pub fn sync_tree(&self, dtos: Vec<TaskNodeDto>) -> TreeResult<()> {
        let nodes = dtos
            .into_iter()
            .enumerate()
            .map(|(i, dto)| {
                codec::to_entity(dto).map_err(|e| {
                    let details = format!("element {}", i);
                    e.with_details(details)
                })
            })
            .collect::<TreeResult<Vec<TaskNode>>>()?;

        let _guard = self.lock();
        self.store.save_all(&nodes)?;
        info!(count = nodes.len(), "Synced task tree");
        Ok(())
    }
}
