//! Order workflow for deferred-billing state transitions.

use chrono::{DateTime, Utc};

use crate::orders::error::OrderError;
use crate::orders::types::{OrderAction, OrderStatus};

/// Stateless service validating order transitions.
///
/// All three transitions are guarded by "the order must currently be
/// `PendingApproval`"; violating the guard fails with `OrderNotPending` and
/// performs no side effect.
pub struct OrderWorkflow;

impl OrderWorkflow {
    /// Approve a pending order.
    ///
    /// # Errors
    ///
    /// Returns `OrderNotPending` if the order left `PendingApproval`.
    pub fn approve(
        current_status: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<OrderAction, OrderError> {
        match current_status {
            OrderStatus::PendingApproval => Ok(OrderAction::Approve {
                new_status: OrderStatus::Approved,
                approved_at: now,
            }),
            current => Err(OrderError::OrderNotPending { current }),
        }
    }

    /// Reject a pending order.
    ///
    /// # Errors
    ///
    /// - `OrderNotPending` if the order left `PendingApproval`
    /// - `RejectionReasonRequired` if the reason is empty
    pub fn reject(
        current_status: OrderStatus,
        rejection_reason: String,
        now: DateTime<Utc>,
    ) -> Result<OrderAction, OrderError> {
        if rejection_reason.trim().is_empty() {
            return Err(OrderError::RejectionReasonRequired);
        }

        match current_status {
            OrderStatus::PendingApproval => Ok(OrderAction::Reject {
                new_status: OrderStatus::Rejected,
                rejected_at: now,
                rejection_reason,
            }),
            current => Err(OrderError::OrderNotPending { current }),
        }
    }

    /// Expire a pending order whose reservation lapsed.
    ///
    /// # Errors
    ///
    /// Returns `OrderNotPending` if the order left `PendingApproval`.
    pub fn expire(
        current_status: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<OrderAction, OrderError> {
        match current_status {
            OrderStatus::PendingApproval => Ok(OrderAction::Expire {
                new_status: OrderStatus::Expired,
                expired_at: now,
            }),
            current => Err(OrderError::OrderNotPending { current }),
        }
    }

    /// Check if a status transition is valid.
    #[must_use]
    pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
        matches!(
            (from, to),
            (
                OrderStatus::PendingApproval,
                OrderStatus::Approved | OrderStatus::Rejected | OrderStatus::Expired
            )
        )
    }
}
