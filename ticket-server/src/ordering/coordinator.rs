//! Transactional reorder coordinator
//!
//! Each public operation runs as one store transaction under a deadline:
//!
//! 1. validate the request shape (no store access)
//! 2. check ownership against the authenticated user
//! 3. open the transaction and lock every affected parent in ascending id
//!    order
//! 4. re-read the siblings and plan the writes
//! 5. lock the written rows, apply the plan batch by batch through a
//!    [`FanOut`], commit
//!
//! Any failure drops the transaction, which rolls it back.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::future::Future;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::db::{ChildKind, ChildPatch, NewChild, OrderedStore, OwnershipChain, StoreTx};

use super::engine::{self, ParentGroup, SortWrite, WritePlan};
use super::fanout::FanOut;
use super::{OrderingError, guard, invariant};

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Max writes in flight within one batch
    pub fanout_limit: usize,
    /// Deadline for one whole operation, ownership checks included
    pub timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            fanout_limit: 8,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Requested position change for [`ReorderCoordinator::update_child`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Within { target: i32 },
    Across { new_parent_id: i64, target: Option<i32> },
}

/// Row writes an operation committed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReorderOutcome {
    pub writes: Vec<SortWrite>,
}

impl From<WritePlan> for ReorderOutcome {
    fn from(plan: WritePlan) -> Self {
        Self {
            writes: plan.into_writes(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Appended {
    pub id: i64,
    pub sort_order: i32,
}

fn parent_missing(kind: ChildKind, parent_id: i64) -> OrderingError {
    match kind.parent_kind() {
        Some(parent_kind) => OrderingError::not_found(parent_kind, parent_id, None),
        None => OrderingError::UnknownOwner { user_id: parent_id },
    }
}

fn collection_of(chain: &OwnershipChain) -> Result<ChildKind, OrderingError> {
    chain
        .child_kind()
        .ok_or_else(|| OrderingError::Invalid("tickets have no ordered children".into()))
}

pub struct ReorderCoordinator<S> {
    store: S,
    config: CoordinatorConfig,
}

impl<S: OrderedStore> ReorderCoordinator<S> {
    pub fn new(store: S, config: CoordinatorConfig) -> Self {
        Self { store, config }
    }

    /// Run `body` under the configured deadline, racing `cancel`.
    async fn run<T, F>(
        &self,
        op: &'static str,
        cancel: &CancellationToken,
        body: F,
    ) -> Result<T, OrderingError>
    where
        F: Future<Output = Result<T, OrderingError>>,
    {
        let started = Instant::now();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(OrderingError::Cancelled),
            res = tokio::time::timeout(self.config.timeout, body) => match res {
                Ok(res) => res,
                Err(_) => {
                    tracing::warn!(
                        op,
                        timeout_ms = self.config.timeout.as_millis() as u64,
                        "reorder deadline exceeded"
                    );
                    Err(OrderingError::Cancelled)
                }
            },
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => tracing::debug!(op, elapsed_ms, "reorder committed"),
            Err(OrderingError::Store(e)) => {
                tracing::error!(op, elapsed_ms, error = %e, "reorder rolled back")
            }
            Err(e) => tracing::debug!(op, elapsed_ms, error = %e, "reorder rejected"),
        }
        result
    }

    async fn lock_parents(
        &self,
        tx: &S::Tx,
        kind: ChildKind,
        parent_ids: &BTreeSet<i64>,
    ) -> Result<(), OrderingError> {
        for parent_id in parent_ids {
            if !tx.lock_parent(kind, *parent_id).await? {
                return Err(parent_missing(kind, *parent_id));
            }
        }
        Ok(())
    }

    /// Check, lock and apply `plan`. `extra_locks` are rows written outside
    /// the plan in the same transaction.
    async fn apply(
        &self,
        tx: &S::Tx,
        kind: ChildKind,
        snapshots: &BTreeMap<i64, Vec<crate::db::SiblingRow>>,
        plan: &WritePlan,
        extra_locks: &[i64],
        cancel: &CancellationToken,
    ) -> Result<(), OrderingError> {
        invariant::verify_plan(kind, snapshots, plan)?;

        let locks: BTreeSet<i64> = plan
            .writes()
            .map(|w| w.id)
            .chain(extra_locks.iter().copied())
            .collect();
        let locks: Vec<i64> = locks.into_iter().collect();
        tx.lock_rows(kind, &locks).await?;

        let fanout = FanOut::new(self.config.fanout_limit, cancel);
        for batch in &plan.batches {
            fanout
                .run(batch.writes.iter().copied(), move |write| async move {
                    match write.parent_id {
                        Some(parent_id) => {
                            tx.update_sort_order_and_parent(
                                kind,
                                write.id,
                                write.sort_order,
                                parent_id,
                            )
                            .await
                        }
                        None => tx.update_sort_order(kind, write.id, write.sort_order).await,
                    }
                    .map_err(OrderingError::Store)
                })
                .await?;
            tracing::debug!(
                kind = kind.name(),
                batch = batch.label,
                writes = batch.writes.len(),
                "write batch applied"
            );
        }
        Ok(())
    }

    /// Create a child at the end of `parent`'s children.
    pub async fn append_child(
        &self,
        parent: &OwnershipChain,
        child: NewChild,
        cancel: &CancellationToken,
    ) -> Result<Appended, OrderingError> {
        let kind = collection_of(parent)?;
        if child.kind() != kind {
            return Err(OrderingError::Invalid(format!(
                "a {} cannot be created here",
                child.kind().name()
            )));
        }
        let parent_id = parent.leaf_id();

        self.run("append_child", cancel, async {
            guard::ensure_chain(&self.store, parent).await?;

            let tx = self.store.begin().await?;
            self.lock_parents(&tx, kind, &BTreeSet::from([parent_id]))
                .await?;
            let count = tx.count_siblings(kind, parent_id).await?;
            let sort_order = engine::append_position(count);
            let id = tx.insert_child(parent_id, sort_order, &child).await?;
            tx.commit().await?;

            tracing::info!(kind = kind.name(), id, parent_id, sort_order, "child appended");
            Ok(Appended { id, sort_order })
        })
        .await
    }

    /// Apply field changes and an optional position change to one child,
    /// all in one transaction.
    ///
    /// A move across to the current parent is treated as a move within it.
    pub async fn update_child(
        &self,
        parent: &OwnershipChain,
        child_id: i64,
        patch: ChildPatch,
        movement: Option<Movement>,
        cancel: &CancellationToken,
    ) -> Result<ReorderOutcome, OrderingError> {
        let kind = collection_of(parent)?;
        let parent_id = parent.leaf_id();
        let child_chain = parent
            .child(child_id)
            .ok_or_else(|| OrderingError::Invalid("tickets have no ordered children".into()))?;

        if kind != ChildKind::Ticket && (patch.description.is_some() || patch.contact.is_some()) {
            return Err(OrderingError::Invalid(format!(
                "a {} has no description or contact",
                kind.name()
            )));
        }

        let movement = match movement {
            Some(Movement::Across {
                new_parent_id,
                target,
            }) if new_parent_id == parent_id => target.map(|target| Movement::Within { target }),
            Some(Movement::Across { target: None, .. }) => {
                return Err(OrderingError::MissingTarget { kind });
            }
            Some(Movement::Across { .. }) if kind == ChildKind::Board => {
                return Err(OrderingError::Invalid(
                    "a board cannot move to another user".into(),
                ));
            }
            other => other,
        };

        self.run("update_child", cancel, async {
            guard::ensure_chain(&self.store, &child_chain).await?;
            let mut parent_ids = BTreeSet::from([parent_id]);
            if let Some(Movement::Across { new_parent_id, .. }) = movement {
                guard::ensure_chain(&self.store, &parent.with_leaf(new_parent_id)).await?;
                parent_ids.insert(new_parent_id);
            }
            if patch.is_empty() && movement.is_none() {
                return Ok(ReorderOutcome::default());
            }

            let tx = self.store.begin().await?;
            self.lock_parents(&tx, kind, &parent_ids).await?;

            let Some(row) = tx.find_child(kind, child_id).await? else {
                return Err(OrderingError::not_found(kind, child_id, Some(parent_id)));
            };
            if row.parent_id != parent_id {
                return Err(OrderingError::Conflict(format!(
                    "{} {child_id} moved to {} {} concurrently",
                    kind.name(),
                    kind.parent_name(),
                    row.parent_id
                )));
            }

            let mut snapshots = BTreeMap::new();
            let plan = match movement {
                None => WritePlan::default(),
                Some(Movement::Within { target }) => {
                    let siblings = tx.list_siblings(kind, parent_id).await?;
                    let plan =
                        engine::plan_move_within(kind, parent_id, &siblings, child_id, target)?;
                    snapshots.insert(parent_id, siblings);
                    plan
                }
                Some(Movement::Across {
                    new_parent_id,
                    target: Some(target),
                }) => {
                    let old = tx.list_siblings(kind, parent_id).await?;
                    let new = tx.list_siblings(kind, new_parent_id).await?;
                    let plan = engine::plan_move_across(
                        kind,
                        child_id,
                        parent_id,
                        &old,
                        new_parent_id,
                        &new,
                        target,
                    )?;
                    snapshots.insert(parent_id, old);
                    snapshots.insert(new_parent_id, new);
                    plan
                }
                Some(Movement::Across { target: None, .. }) => {
                    return Err(OrderingError::MissingTarget { kind });
                }
            };

            if patch.is_empty() {
                self.apply(&tx, kind, &snapshots, &plan, &[], cancel).await?;
            } else {
                self.apply(&tx, kind, &snapshots, &plan, &[child_id], cancel)
                    .await?;
                tx.update_fields(kind, child_id, &patch).await?;
            }
            tx.commit().await?;

            tracing::info!(
                kind = kind.name(),
                id = child_id,
                writes = plan.len(),
                "child updated"
            );
            Ok(ReorderOutcome::from(plan))
        })
        .await
    }

    /// Move `child_id` to position `target` (1-based) among its siblings.
    pub async fn move_within_parent(
        &self,
        parent: &OwnershipChain,
        child_id: i64,
        target: i32,
        cancel: &CancellationToken,
    ) -> Result<ReorderOutcome, OrderingError> {
        self.update_child(
            parent,
            child_id,
            ChildPatch::default(),
            Some(Movement::Within { target }),
            cancel,
        )
        .await
    }

    /// Move `child_id` from `parent` to the sibling parent `new_parent_id`,
    /// landing at `target` (1-based, up to one past the last child).
    pub async fn move_across_parents(
        &self,
        parent: &OwnershipChain,
        new_parent_id: i64,
        child_id: i64,
        target: i32,
        cancel: &CancellationToken,
    ) -> Result<ReorderOutcome, OrderingError> {
        self.update_child(
            parent,
            child_id,
            ChildPatch::default(),
            Some(Movement::Across {
                new_parent_id,
                target: Some(target),
            }),
            cancel,
        )
        .await
    }

    /// Replace the order of all of `parent`'s children.
    pub async fn bulk_reorder(
        &self,
        parent: &OwnershipChain,
        ordered_ids: &[i64],
        cancel: &CancellationToken,
    ) -> Result<ReorderOutcome, OrderingError> {
        let kind = collection_of(parent)?;
        invariant::ensure_unique_ids(kind, ordered_ids)?;
        let parent_id = parent.leaf_id();

        self.run("bulk_reorder", cancel, async {
            guard::ensure_chain(&self.store, parent).await?;

            let tx = self.store.begin().await?;
            self.lock_parents(&tx, kind, &BTreeSet::from([parent_id]))
                .await?;
            let siblings = tx.list_siblings(kind, parent_id).await?;
            let plan = engine::plan_bulk_reorder(kind, parent_id, &siblings, ordered_ids)?;

            let snapshots = BTreeMap::from([(parent_id, siblings)]);
            self.apply(&tx, kind, &snapshots, &plan, &[], cancel).await?;
            tx.commit().await?;

            tracing::info!(
                kind = kind.name(),
                parent_id,
                writes = plan.len(),
                "children reordered"
            );
            Ok(ReorderOutcome::from(plan))
        })
        .await
    }

    /// Reassign grandchildren of `scope` across its children in one
    /// transaction. Each group names one parent's complete final child list.
    pub async fn bulk_cross_parent_reorder(
        &self,
        scope: &OwnershipChain,
        groups: &[ParentGroup],
        cancel: &CancellationToken,
    ) -> Result<ReorderOutcome, OrderingError> {
        let parent_kind = collection_of(scope)?;
        let kind = parent_kind
            .child()
            .ok_or_else(|| OrderingError::Invalid("tickets have no ordered children".into()))?;
        invariant::validate_groups(kind, groups)?;

        self.run("bulk_cross_parent_reorder", cancel, async {
            guard::ensure_chain(&self.store, scope).await?;
            let parent_ids: Vec<i64> = groups.iter().map(|g| g.parent_id).collect();
            guard::ensure_owned_ids(&self.store, parent_kind, &parent_ids, scope).await?;
            let child_ids: Vec<i64> = groups
                .iter()
                .flat_map(|g| g.child_ids.iter().copied())
                .collect();
            let owned = guard::ensure_owned_ids(&self.store, kind, &child_ids, scope).await?;
            let seen_under: HashMap<i64, i64> =
                owned.iter().map(|r| (r.id, r.parent_id)).collect();

            let lock_ids: BTreeSet<i64> = parent_ids
                .iter()
                .copied()
                .chain(owned.iter().map(|r| r.parent_id))
                .collect();

            let tx = self.store.begin().await?;
            self.lock_parents(&tx, kind, &lock_ids).await?;
            let mut snapshots = BTreeMap::new();
            for parent_id in &lock_ids {
                snapshots.insert(*parent_id, tx.list_siblings(kind, *parent_id).await?);
            }

            for (child_id, parent_id) in &seen_under {
                let still_there = snapshots
                    .get(parent_id)
                    .is_some_and(|rows| rows.iter().any(|r| r.id == *child_id));
                if !still_there {
                    return Err(OrderingError::Conflict(format!(
                        "{} {child_id} left {} {parent_id} before the reorder locked it",
                        kind.name(),
                        kind.parent_name()
                    )));
                }
            }

            let plan = engine::plan_bulk_cross_parent(kind, groups, &snapshots)?;
            self.apply(&tx, kind, &snapshots, &plan, &[], cancel).await?;
            tx.commit().await?;

            tracing::info!(
                kind = kind.name(),
                groups = groups.len(),
                writes = plan.len(),
                "children reassigned across parents"
            );
            Ok(ReorderOutcome::from(plan))
        })
        .await
    }
}
