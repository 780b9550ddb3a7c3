//! Request validation and the sibling-order invariant

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::db::{ChildKind, SiblingRow};

use super::OrderingError;
use super::engine::{ParentGroup, WritePlan};

/// Reject the first repeated id.
pub fn ensure_unique_ids(kind: ChildKind, ids: &[i64]) -> Result<(), OrderingError> {
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(*id) {
            return Err(OrderingError::DuplicateId { kind, id: *id });
        }
    }
    Ok(())
}

/// Child ids must be unique across all groups, and so must parent ids.
pub fn validate_groups(kind: ChildKind, groups: &[ParentGroup]) -> Result<(), OrderingError> {
    if groups.is_empty() {
        return Err(OrderingError::Invalid(format!(
            "at least one {} group is required",
            kind.parent_name()
        )));
    }
    let parent_ids: Vec<i64> = groups.iter().map(|g| g.parent_id).collect();
    if let Some(parent_kind) = kind.parent_kind() {
        ensure_unique_ids(parent_kind, &parent_ids)?;
    }
    let child_ids: Vec<i64> = groups.iter().flat_map(|g| g.child_ids.iter().copied()).collect();
    ensure_unique_ids(kind, &child_ids)
}

/// `target` must lie in `[1, max]`.
pub fn validate_target(kind: ChildKind, target: i32, max: usize) -> Result<(), OrderingError> {
    let max = i32::try_from(max).unwrap_or(i32::MAX);
    if target < 1 || target > max {
        return Err(OrderingError::OutOfRange {
            kind,
            value: target,
            min: 1,
            max,
        });
    }
    Ok(())
}

/// Whether `orders` is a permutation of `1..=orders.len()`.
pub fn is_contiguous(orders: &[i32]) -> bool {
    let mut sorted = orders.to_vec();
    sorted.sort_unstable();
    sorted.iter().enumerate().all(|(idx, o)| *o as i64 == idx as i64 + 1)
}

/// Apply `plan` to the snapshot in memory and check every snapshot parent
/// ends up contiguous.
pub fn verify_plan(
    kind: ChildKind,
    snapshots: &BTreeMap<i64, Vec<SiblingRow>>,
    plan: &WritePlan,
) -> Result<(), OrderingError> {
    let mut rows: HashMap<i64, SiblingRow> = snapshots
        .values()
        .flatten()
        .map(|r| (r.id, *r))
        .collect();

    for write in plan.writes() {
        let entry = rows.entry(write.id).or_insert(SiblingRow {
            id: write.id,
            parent_id: write.parent_id.unwrap_or_default(),
            sort_order: write.sort_order,
        });
        entry.sort_order = write.sort_order;
        if let Some(parent_id) = write.parent_id {
            entry.parent_id = parent_id;
        }
    }

    for parent_id in snapshots.keys() {
        let mut orders: Vec<i32> = rows
            .values()
            .filter(|r| r.parent_id == *parent_id)
            .map(|r| r.sort_order)
            .collect();
        if !is_contiguous(&orders) {
            orders.sort_unstable();
            return Err(OrderingError::Invariant {
                kind,
                parent_id: *parent_id,
                orders,
            });
        }
    }
    Ok(())
}
