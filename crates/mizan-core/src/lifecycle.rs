//! # Invoice Lifecycle Rules
//!
//! The status graph and who may walk it.
//!
//! ```text
//! ┌──────────┐  complete   ┌───────────┐  refund   ┌──────────┐
//! │ pending  │────────────►│ completed │──────────►│ refunded │ (terminal)
//! └────┬─┬───┘             └───────────┘           └──────────┘
//!      │ │          refund (unpaid tab)                 ▲
//!      │ └──────────────────────────────────────────────┘
//!      │ cancel    ┌───────────┐
//!      └──────────►│ cancelled │ (terminal)
//!                  └───────────┘
//! ```
//!
//! | Transition            | Minimum role |
//! |-----------------------|--------------|
//! | pending → completed   | Cashier      |
//! | pending → cancelled   | Manager      |
//! | * → refunded          | Manager      |
//!
//! Side effects (inventory, kitchen tickets, VAT invalidation) are executed
//! by `mizan-engine`; [`SideEffects`] describes which ones a transition
//! implies so the engine and its tests agree.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::InvoiceStatus;

// =============================================================================
// Roles
// =============================================================================

/// Staff role, ordered by privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Cashier,
    Manager,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Cashier => "cashier",
            Role::Manager => "manager",
            Role::Admin => "admin",
        })
    }
}

/// The already-authenticated actor requesting a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ActorPermissions {
    pub actor_id: String,
    pub role: Role,
}

impl ActorPermissions {
    pub fn new(actor_id: impl Into<String>, role: Role) -> Self {
        Self {
            actor_id: actor_id.into(),
            role,
        }
    }

    pub fn has_role(&self, required: Role) -> bool {
        self.role >= required
    }
}

// =============================================================================
// Graph
// =============================================================================

impl InvoiceStatus {
    /// Targets reachable from this status.
    pub const fn allowed_transitions(&self) -> &'static [InvoiceStatus] {
        match self {
            InvoiceStatus::Pending => &[
                InvoiceStatus::Completed,
                InvoiceStatus::Cancelled,
                InvoiceStatus::Refunded,
            ],
            InvoiceStatus::Completed => &[InvoiceStatus::Refunded],
            InvoiceStatus::Cancelled | InvoiceStatus::Refunded => &[],
        }
    }

    pub fn can_transition_to(&self, target: InvoiceStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }
}

/// Role needed to move an invoice into `target`.
pub const fn required_role(target: InvoiceStatus) -> Role {
    match target {
        InvoiceStatus::Refunded | InvoiceStatus::Cancelled => Role::Manager,
        InvoiceStatus::Pending | InvoiceStatus::Completed => Role::Cashier,
    }
}

fn action_name(target: InvoiceStatus) -> &'static str {
    match target {
        InvoiceStatus::Refunded => "refund invoice",
        InvoiceStatus::Cancelled => "cancel invoice",
        InvoiceStatus::Completed => "complete invoice",
        InvoiceStatus::Pending => "reopen invoice",
    }
}

/// Checks permission first, then the graph.
///
/// ## Errors
/// - `PermissionDenied` when the actor's role is below [`required_role`]
/// - `InvalidTransition` when `from → to` is not an edge (including `from == to`)
pub fn authorize_transition(
    from: InvoiceStatus,
    to: InvoiceStatus,
    actor: &ActorPermissions,
) -> CoreResult<()> {
    if !actor.has_role(required_role(to)) {
        return Err(CoreError::PermissionDenied {
            role: actor.role.to_string(),
            action: action_name(to).to_string(),
        });
    }

    if !from.can_transition_to(to) {
        return Err(CoreError::InvalidTransition { from, to });
    }

    Ok(())
}

// =============================================================================
// Side Effects
// =============================================================================

/// Inventory direction of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryEffect {
    None,
    /// Consume ingredients (sale completed).
    Consume,
    /// Return consumed ingredients (completed sale refunded).
    Restock,
}

/// What must happen atomically with a status write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SideEffects {
    pub inventory: InventoryEffect,
    pub create_kitchen_order: bool,
    pub cancel_kitchen_items: bool,
    /// Every status change alters some VAT period's sales.
    pub invalidate_vat: bool,
}

impl SideEffects {
    /// Effects of an authorized `from → to` transition.
    ///
    /// Only a completed invoice has consumed inventory, so only
    /// `completed → refunded` restocks.
    pub const fn for_transition(from: InvoiceStatus, to: InvoiceStatus) -> Self {
        let (inventory, create_kitchen_order, cancel_kitchen_items) = match (from, to) {
            (InvoiceStatus::Pending, InvoiceStatus::Completed) => (InventoryEffect::Consume, true, false),
            (InvoiceStatus::Completed, InvoiceStatus::Refunded) => (InventoryEffect::Restock, false, true),
            _ => (InventoryEffect::None, false, false),
        };

        SideEffects {
            inventory,
            create_kitchen_order,
            cancel_kitchen_items,
            invalidate_vat: true,
        }
    }

    /// Effects of creating an invoice directly in `status` at checkout.
    pub const fn for_creation(status: InvoiceStatus) -> Self {
        match status {
            InvoiceStatus::Completed => SideEffects::for_transition(InvoiceStatus::Pending, InvoiceStatus::Completed),
            _ => SideEffects {
                inventory: InventoryEffect::None,
                create_kitchen_order: false,
                cancel_kitchen_items: false,
                invalidate_vat: true,
            },
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use InvoiceStatus::*;

    fn manager() -> ActorPermissions {
        ActorPermissions::new("m-1", Role::Manager)
    }

    #[test]
    fn test_allowed_edges() {
        assert!(Pending.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Pending.can_transition_to(Refunded));
        assert!(Completed.can_transition_to(Refunded));
    }

    #[test]
    fn test_forbidden_edges_are_invalid_transition() {
        let admin = ActorPermissions::new("a-1", Role::Admin);
        for (from, to) in [
            (Completed, Pending),
            (Completed, Cancelled),
            (Refunded, Completed),
            (Refunded, Pending),
            (Cancelled, Pending),
            (Cancelled, Completed),
            (Cancelled, Refunded),
            (Completed, Completed),
        ] {
            assert!(
                matches!(
                    authorize_transition(from, to, &admin),
                    Err(CoreError::InvalidTransition { .. })
                ),
                "{from} -> {to} should be rejected"
            );
        }
    }

    #[test]
    fn test_terminal_states_have_no_edges() {
        assert!(Refunded.allowed_transitions().is_empty());
        assert!(Cancelled.allowed_transitions().is_empty());
    }

    #[test]
    fn test_cashier_cannot_refund_or_cancel() {
        let cashier = ActorPermissions::new("c-1", Role::Cashier);
        let err = authorize_transition(Completed, Refunded, &cashier).unwrap_err();
        assert_eq!(err.to_string(), "Permission denied: cashier cannot refund invoice");
        assert!(matches!(
            authorize_transition(Pending, Cancelled, &cashier),
            Err(CoreError::PermissionDenied { .. })
        ));
        assert!(authorize_transition(Pending, Completed, &cashier).is_ok());
    }

    #[test]
    fn test_permission_checked_before_graph() {
        let cashier = ActorPermissions::new("c-1", Role::Cashier);
        assert!(matches!(
            authorize_transition(Refunded, Refunded, &cashier),
            Err(CoreError::PermissionDenied { .. })
        ));
    }

    #[test]
    fn test_manager_and_admin_can_refund() {
        assert!(authorize_transition(Completed, Refunded, &manager()).is_ok());
        assert!(authorize_transition(Completed, Refunded, &ActorPermissions::new("a", Role::Admin)).is_ok());
    }

    #[test]
    fn test_side_effects() {
        let refund = SideEffects::for_transition(Completed, Refunded);
        assert_eq!(refund.inventory, InventoryEffect::Restock);
        assert!(refund.cancel_kitchen_items);

        let complete = SideEffects::for_transition(Pending, Completed);
        assert_eq!(complete.inventory, InventoryEffect::Consume);
        assert!(complete.create_kitchen_order);

        // Pending invoices never consumed stock.
        assert_eq!(SideEffects::for_transition(Pending, Refunded).inventory, InventoryEffect::None);
        assert_eq!(SideEffects::for_transition(Pending, Cancelled).inventory, InventoryEffect::None);

        assert_eq!(SideEffects::for_creation(Completed), complete);
        assert_eq!(SideEffects::for_creation(Pending).inventory, InventoryEffect::None);
    }
}
