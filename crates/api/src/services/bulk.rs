//! Bulk conversation operations with an audit record

use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

use trichat_shared::{
    BulkAction, BulkOperation, BulkOperationStatus, ConversationId, ShopId, TrichatError,
    TrichatResult,
};

use crate::store::{BulkOperationStore, ConversationStore};

/// Most conversation ids accepted in one request
pub const MAX_BULK_IDS: usize = 500;

/// Progress is written back every this many ids
const PROGRESS_INTERVAL: usize = 25;

#[derive(Clone)]
pub struct BulkService {
    conversations: Arc<dyn ConversationStore>,
    operations: Arc<dyn BulkOperationStore>,
}

impl BulkService {
    pub fn new(
        conversations: Arc<dyn ConversationStore>,
        operations: Arc<dyn BulkOperationStore>,
    ) -> Self {
        Self {
            conversations,
            operations,
        }
    }

    /// Apply `action` to every id in order and return the final record.
    ///
    /// Per-id failures are counted on the record rather than aborting the
    /// run. The record ends `completed` when anything succeeded (or there was
    /// nothing to do) and `failed` otherwise.
    pub async fn execute(
        &self,
        shop_id: &ShopId,
        action: BulkAction,
        conversation_ids: Vec<ConversationId>,
        created_by: impl Into<String>,
    ) -> TrichatResult<BulkOperation> {
        action.validate()?;
        if conversation_ids.len() > MAX_BULK_IDS {
            return Err(TrichatError::validation(format!(
                "At most {} conversations per bulk operation",
                MAX_BULK_IDS
            )));
        }

        let mut op = BulkOperation::start(shop_id.clone(), action, conversation_ids, created_by);
        self.operations.insert_operation(&op).await?;

        tracing::info!(
            operation_id = %op.id,
            shop_id = %shop_id,
            operation_type = %op.operation_type,
            conversation_count = op.conversation_ids.len(),
            "Bulk operation started"
        );

        let ids = op.conversation_ids.clone();
        let total = ids.len();
        for (index, id) in ids.iter().enumerate() {
            match self.conversations.apply_bulk_action(shop_id, id, &op.action).await {
                Ok(true) => op.success_count += 1,
                Ok(false) => {
                    op.error_count += 1;
                    op.errors.push(format!("{}: conversation not found", id));
                }
                Err(e) => {
                    op.error_count += 1;
                    op.errors.push(format!("{}: {}", id, e));
                }
            }

            let processed = index + 1;
            op.progress_percentage = ((processed * 100) / total) as i32;

            if processed % PROGRESS_INTERVAL == 0 && processed < total {
                op.updated_at = OffsetDateTime::now_utc();
                if let Err(e) = self.operations.update_operation(&op).await {
                    return self.abort(op, format!("Failed to record progress: {}", e)).await;
                }
            }
        }

        let now = OffsetDateTime::now_utc();
        op.progress_percentage = 100;
        op.updated_at = now;
        op.completed_at = Some(now);
        if op.success_count > 0 || total == 0 {
            op.status = BulkOperationStatus::Completed;
        } else {
            op.status = BulkOperationStatus::Failed;
            op.error_message = Some(format!("All {} conversations failed", total));
        }

        if let Err(e) = self.operations.update_operation(&op).await {
            return self
                .abort(op, format!("Failed to record completion: {}", e))
                .await;
        }

        tracing::info!(
            operation_id = %op.id,
            status = %op.status,
            success_count = op.success_count,
            error_count = op.error_count,
            "Bulk operation finished"
        );
        Ok(op)
    }

    /// Mark the record failed after a write error; best-effort since the
    /// store just failed once already.
    async fn abort(&self, mut op: BulkOperation, message: String) -> TrichatResult<BulkOperation> {
        tracing::error!(operation_id = %op.id, error = %message, "Bulk operation aborted");

        let now = OffsetDateTime::now_utc();
        op.status = BulkOperationStatus::Failed;
        op.error_message = Some(message);
        op.updated_at = now;
        op.completed_at = Some(now);

        if let Err(e) = self.operations.update_operation(&op).await {
            tracing::error!(
                operation_id = %op.id,
                error = %e,
                "Failed to mark bulk operation as failed"
            );
        }
        Ok(op)
    }

    pub async fn get(&self, shop_id: &ShopId, id: Uuid) -> TrichatResult<BulkOperation> {
        self.operations
            .get_operation(shop_id, id)
            .await?
            .ok_or_else(|| TrichatError::not_found(format!("bulk operation {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use trichat_shared::{Conversation, ConversationStatus, Priority};

    async fn setup(ids: &[&str]) -> (Arc<MemoryStore>, BulkService, ShopId) {
        let store = Arc::new(MemoryStore::new());
        let shop: ShopId = "shop1".into();
        for id in ids {
            let conv = Conversation::new((*id).into(), shop.clone(), "cust".into());
            store.create_conversation(&conv).await.unwrap();
        }
        let service = BulkService::new(store.clone(), store.clone());
        (store, service, shop)
    }

    fn ids(raw: &[&str]) -> Vec<ConversationId> {
        raw.iter().map(|s| (*s).into()).collect()
    }

    async fn snapshot(store: &MemoryStore, shop: &ShopId, raw: &[&str]) -> Vec<Conversation> {
        let mut out = Vec::new();
        for id in raw {
            out.push(
                store
                    .get_conversation(shop, &(*id).into())
                    .await
                    .unwrap()
                    .unwrap(),
            );
        }
        out
    }

    #[tokio::test]
    async fn test_noop_bulk_leaves_state_unchanged() {
        let (store, service, shop) = setup(&["A", "B", "C"]).await;
        let before = snapshot(&store, &shop, &["A", "B", "C"]).await;

        // Conversations are already open; setting open again changes nothing
        let op = service
            .execute(
                &shop,
                BulkAction::SetStatus {
                    status: ConversationStatus::Open,
                },
                ids(&["A", "B", "C"]),
                "agent:a1",
            )
            .await
            .unwrap();

        assert_eq!(op.status, BulkOperationStatus::Completed);
        assert_eq!(op.success_count, 3);
        assert_eq!(op.error_count, 0);

        let after = snapshot(&store, &shop, &["A", "B", "C"]).await;
        for (b, a) in before.iter().zip(after.iter()) {
            assert_eq!(b.status, a.status);
            assert_eq!(b.priority, a.priority);
            assert_eq!(b.tags, a.tags);
            assert_eq!(b.assigned_agent_id, a.assigned_agent_id);
        }
    }

    #[tokio::test]
    async fn test_add_then_remove_tag_with_interleaved_priority() {
        let (store, service, shop) = setup(&["A"]).await;
        let target = ids(&["A"]);

        for action in [
            BulkAction::AddTags {
                tags: vec!["vip".to_string()],
            },
            BulkAction::SetPriority {
                priority: Priority::High,
            },
            BulkAction::RemoveTags {
                tags: vec!["vip".to_string()],
            },
        ] {
            service
                .execute(&shop, action, target.clone(), "agent:a1")
                .await
                .unwrap();
        }

        let conv = &snapshot(&store, &shop, &["A"]).await[0];
        assert!(!conv.tags.iter().any(|t| t == "vip"));
        assert_eq!(conv.priority, Priority::High);
    }

    #[tokio::test]
    async fn test_partial_success_accounting() {
        let (_store, service, shop) = setup(&["A", "B"]).await;
        let op = service
            .execute(&shop, BulkAction::close(), ids(&["A", "missing", "B"]), "agent:a1")
            .await
            .unwrap();

        assert_eq!(op.status, BulkOperationStatus::Completed);
        assert_eq!(op.success_count, 2);
        assert_eq!(op.error_count, 1);
        assert_eq!(op.errors, vec!["missing: conversation not found".to_string()]);
        assert_eq!(op.progress_percentage, 100);

        let stored = service.get(&shop, op.id).await.unwrap();
        assert_eq!(stored, op);
    }

    #[tokio::test]
    async fn test_all_failed_marks_failed() {
        let (_store, service, shop) = setup(&[]).await;
        let op = service
            .execute(&shop, BulkAction::close(), ids(&["x", "y"]), "agent:a1")
            .await
            .unwrap();

        assert_eq!(op.status, BulkOperationStatus::Failed);
        assert_eq!(op.error_count, 2);
        assert!(op.error_message.is_some());
    }

    #[tokio::test]
    async fn test_empty_id_list_completes() {
        let (_store, service, shop) = setup(&[]).await;
        let op = service
            .execute(&shop, BulkAction::close(), Vec::new(), "agent:a1")
            .await
            .unwrap();
        assert_eq!(op.status, BulkOperationStatus::Completed);
        assert_eq!(op.progress_percentage, 100);
    }

    #[tokio::test]
    async fn test_other_shop_ids_are_not_touched() {
        let (store, service, _shop) = setup(&["A"]).await;
        let op = service
            .execute(&"shop2".into(), BulkAction::close(), ids(&["A"]), "agent:a1")
            .await
            .unwrap();
        assert_eq!(op.status, BulkOperationStatus::Failed);

        let conv = &snapshot(&store, &"shop1".into(), &["A"]).await[0];
        assert_eq!(conv.status, ConversationStatus::Open);
    }

    #[tokio::test]
    async fn test_invalid_action_writes_no_record() {
        let (_store, service, shop) = setup(&["A"]).await;
        let result = service
            .execute(&shop, BulkAction::AddTags { tags: vec![] }, ids(&["A"]), "agent:a1")
            .await;
        assert!(matches!(result, Err(TrichatError::Validation(_))));
    }

    #[tokio::test]
    async fn test_store_outage_fails_record_creation() {
        let (store, service, shop) = setup(&["A"]).await;
        store.set_unavailable(true);
        let result = service
            .execute(&shop, BulkAction::close(), ids(&["A"]), "agent:a1")
            .await;
        assert!(matches!(result, Err(TrichatError::Database(_))));
    }
}
