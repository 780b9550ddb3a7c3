//! Ownership checks
//!
//! Run before a transaction opens. A resource the user does not own is
//! reported exactly like one that does not exist.

use std::collections::HashSet;

use crate::db::{ChildKind, OrderedStore, OwnershipChain, SiblingRow};

use super::OrderingError;

fn chain_parent_id(chain: &OwnershipChain) -> Option<i64> {
    match *chain {
        OwnershipChain::User { .. } | OwnershipChain::Board { .. } => None,
        OwnershipChain::Status { board_id, .. } => Some(board_id),
        OwnershipChain::Ticket { status_id, .. } => Some(status_id),
    }
}

/// Fail unless every link of `chain` exists and belongs to its user.
pub async fn ensure_chain<S: OrderedStore>(
    store: &S,
    chain: &OwnershipChain,
) -> Result<(), OrderingError> {
    if store.verify_chain(chain).await? {
        return Ok(());
    }
    tracing::debug!(?chain, "ownership chain rejected");
    Err(match chain.leaf_kind() {
        None => OrderingError::UnknownOwner {
            user_id: chain.user_id(),
        },
        Some(kind) => OrderingError::not_found(kind, chain.leaf_id(), chain_parent_id(chain)),
    })
}

/// Load `ids` of `kind` under `scope`; any id that is missing or foreign
/// fails the whole call, listing every such id.
pub async fn ensure_owned_ids<S: OrderedStore>(
    store: &S,
    kind: ChildKind,
    ids: &[i64],
    scope: &OwnershipChain,
) -> Result<Vec<SiblingRow>, OrderingError> {
    let rows = store.get_by_ids_with_ownership(kind, ids, scope).await?;
    let found: HashSet<i64> = rows.iter().map(|r| r.id).collect();
    let missing: Vec<i64> = ids.iter().filter(|id| !found.contains(id)).copied().collect();
    if !missing.is_empty() {
        return Err(OrderingError::NotFound {
            kind,
            ids: missing,
            parent_id: scope.leaf_kind().map(|_| scope.leaf_id()),
        });
    }
    Ok(rows)
}
