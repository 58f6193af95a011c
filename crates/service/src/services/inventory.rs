//! Inventory management: release paths.
//!
//! Release keeps the DID record stable and clears ownership, reservation,
//! and cursor fields; invoices keep their own denormalized copy of the
//! number, so history survives the release.

use std::sync::Arc;

use tracing::info;

use numera_core::inventory::{Did, DidStatus, InventoryError, InventoryService, ReleaseKind};
use numera_shared::types::DidId;
use numera_shared::Clock;

use crate::repositories::{DidRepository, StoreError};

/// Release orchestration over the DID repository.
pub struct InventoryManager {
    dids: Arc<dyn DidRepository>,
    clock: Arc<dyn Clock>,
}

impl InventoryManager {
    /// Creates the manager.
    #[must_use]
    pub fn new(dids: Arc<dyn DidRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { dids, clock }
    }

    /// Releases an assigned DID back to stock.
    ///
    /// Re-reads the record, validates the transition (BYON numbers only
    /// release administratively), and commits with a status-conditional
    /// update.
    ///
    /// # Errors
    ///
    /// - `DidNotFound` when the record does not exist
    /// - `InvalidStateTransition` / `ByonNotReleasable` from validation
    /// - `StateConflict` when the record changed between read and commit
    pub async fn release(&self, did_id: DidId, kind: ReleaseKind) -> Result<Did, InventoryError> {
        let now = self.clock.now();

        let did = self
            .dids
            .find_by_id(did_id)
            .await
            .map_err(|e| InventoryError::Storage(e.to_string()))?
            .ok_or(InventoryError::DidNotFound(did_id))?;

        let action = InventoryService::release(&did, kind)?;
        let mut released = did.clone();
        action.apply_to(&mut released, now);

        match self
            .dids
            .update_if_status(released, DidStatus::Assigned)
            .await
        {
            Ok(did) => {
                info!(did = %did_id, kind = ?kind, "DID released to stock");
                Ok(did)
            }
            Err(StoreError::StatusConflict) => Err(InventoryError::StateConflict(did_id)),
            Err(StoreError::NotFound) => Err(InventoryError::DidNotFound(did_id)),
            Err(StoreError::Backend(e)) => Err(InventoryError::Storage(e)),
        }
    }
}
