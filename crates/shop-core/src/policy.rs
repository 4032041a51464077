//! # Access Policy
//!
//! Every public operation is named by an [`Operation`] tag. The
//! [`AccessPolicy`] table maps each tag to the roles allowed to invoke it,
//! and is checked before any handler logic runs.
//!
//! Ownership rules (a customer may only touch their own cart) are enforced
//! by the cart and order services, not here.

use crate::error::{CommerceError, CommerceResult};
use crate::user::Role;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Closed set of operations exposed by the shop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    CartCreate,
    CartMine,
    CartRetrieve,
    CartDestroy,
    CartItemList,
    CartItemRetrieve,
    CartItemAdd,
    CartItemUpdate,
    CartItemRemove,
    OrderList,
    OrderRetrieve,
    OrderCreate,
    OrderDestroy,
    OrderCancel,
    OrderUpdateStatus,
    PaymentInitiate,
    PaymentSuccess,
    PaymentFail,
    PaymentCancel,
    ProductList,
    ProductRetrieve,
    ProductHasOrdered,
}

impl Operation {
    pub const ALL: [Operation; 22] = [
        Operation::CartCreate,
        Operation::CartMine,
        Operation::CartRetrieve,
        Operation::CartDestroy,
        Operation::CartItemList,
        Operation::CartItemRetrieve,
        Operation::CartItemAdd,
        Operation::CartItemUpdate,
        Operation::CartItemRemove,
        Operation::OrderList,
        Operation::OrderRetrieve,
        Operation::OrderCreate,
        Operation::OrderDestroy,
        Operation::OrderCancel,
        Operation::OrderUpdateStatus,
        Operation::PaymentInitiate,
        Operation::PaymentSuccess,
        Operation::PaymentFail,
        Operation::PaymentCancel,
        Operation::ProductList,
        Operation::ProductRetrieve,
        Operation::ProductHasOrdered,
    ];

    /// Dotted name used in logs (e.g. `order.update_status`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CartCreate => "cart.create",
            Operation::CartMine => "cart.mine",
            Operation::CartRetrieve => "cart.retrieve",
            Operation::CartDestroy => "cart.destroy",
            Operation::CartItemList => "cart_item.list",
            Operation::CartItemRetrieve => "cart_item.retrieve",
            Operation::CartItemAdd => "cart_item.add",
            Operation::CartItemUpdate => "cart_item.update",
            Operation::CartItemRemove => "cart_item.remove",
            Operation::OrderList => "order.list",
            Operation::OrderRetrieve => "order.retrieve",
            Operation::OrderCreate => "order.create",
            Operation::OrderDestroy => "order.destroy",
            Operation::OrderCancel => "order.cancel",
            Operation::OrderUpdateStatus => "order.update_status",
            Operation::PaymentInitiate => "payment.initiate",
            Operation::PaymentSuccess => "payment.success",
            Operation::PaymentFail => "payment.fail",
            Operation::PaymentCancel => "payment.cancel",
            Operation::ProductList => "product.list",
            Operation::ProductRetrieve => "product.retrieve",
            Operation::ProductHasOrdered => "product.has_ordered",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const EVERYONE: &[Role] = &[Role::Anonymous, Role::Customer, Role::Staff];
const SIGNED_IN: &[Role] = &[Role::Customer, Role::Staff];
const STAFF_ONLY: &[Role] = &[Role::Staff];

/// Operation -> allowed roles
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    rules: HashMap<Operation, &'static [Role]>,
}

impl AccessPolicy {
    /// An empty policy denies everything
    pub fn deny_all() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// The shop's standard rules
    pub fn standard() -> Self {
        let mut policy = Self::deny_all();
        for op in Operation::ALL {
            let roles = match op {
                Operation::OrderDestroy | Operation::OrderUpdateStatus => STAFF_ONLY,
                // Gateway callbacks carry no user session; they are signed instead.
                Operation::PaymentSuccess
                | Operation::PaymentFail
                | Operation::PaymentCancel
                | Operation::ProductList
                | Operation::ProductRetrieve => EVERYONE,
                _ => SIGNED_IN,
            };
            policy.allow(op, roles);
        }
        policy
    }

    pub fn allow(&mut self, op: Operation, roles: &'static [Role]) {
        self.rules.insert(op, roles);
    }

    pub fn is_allowed(&self, op: Operation, role: Role) -> bool {
        self.rules
            .get(&op)
            .map(|roles| roles.contains(&role))
            .unwrap_or(false)
    }

    /// Anonymous callers get `Unauthenticated`, everyone else `PermissionDenied`.
    pub fn check(&self, op: Operation, role: Role) -> CommerceResult<()> {
        if self.is_allowed(op, role) {
            return Ok(());
        }
        tracing::debug!(operation = %op, ?role, "access denied");
        match role {
            Role::Anonymous => Err(CommerceError::Unauthenticated),
            _ => Err(CommerceError::PermissionDenied(
                "You do not have permission to perform this action.".to_string(),
            )),
        }
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::standard()
    }
}
