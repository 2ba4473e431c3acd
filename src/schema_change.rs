//! Post-commit signal to the asynchronous schema-change coordinator.

use crate::catalog::types::{DescriptorId, MutationId};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;

/// A table has new state for the coordinator to look at. `mutation_id` is
/// `None` when the table was rewritten without queuing a mutation (for
/// example a back-reference was added), which only requires lease refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaChangeNotice {
    pub table_id: DescriptorId,
    pub mutation_id: Option<MutationId>,
}

/// Fire-and-forget sink for [`SchemaChangeNotice`]s. Called only after the
/// issuing transaction has committed.
pub trait SchemaChangeNotifier: Send + Sync {
    fn notify(&self, notice: SchemaChangeNotice);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl SchemaChangeNotifier for NoopNotifier {
    fn notify(&self, _notice: SchemaChangeNotice) {}
}

#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<SchemaChangeNotice>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SchemaChangeNotice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SchemaChangeNotifier for ChannelNotifier {
    fn notify(&self, notice: SchemaChangeNotice) {
        if self.tx.send(notice).is_err() {
            warn!(
                table_id = %notice.table_id,
                mutation_id = ?notice.mutation_id,
                "schema change coordinator is gone; dropping notice"
            );
        }
    }
}
