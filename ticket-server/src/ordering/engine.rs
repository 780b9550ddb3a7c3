//! Reorder planning
//!
//! Every planner works the same way: build the desired id order for each
//! affected parent, then diff it against the locked snapshot. Only rows
//! whose position or parent differs produce a [`SortWrite`], except for the
//! bulk planners, which overwrite every listed row.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::db::{ChildKind, SiblingRow};

use super::OrderingError;
use super::invariant::validate_target;

/// One row update. `parent_id` is set only when the row changes parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortWrite {
    pub id: i64,
    pub sort_order: i32,
    pub parent_id: Option<i64>,
}

/// Writes that touch pairwise distinct rows and may be applied in any order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteBatch {
    pub label: &'static str,
    pub writes: Vec<SortWrite>,
}

/// Batches applied one after another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WritePlan {
    pub batches: Vec<WriteBatch>,
}

impl WritePlan {
    fn push(&mut self, label: &'static str, writes: Vec<SortWrite>) {
        if !writes.is_empty() {
            self.batches.push(WriteBatch { label, writes });
        }
    }

    pub fn writes(&self) -> impl Iterator<Item = &SortWrite> {
        self.batches.iter().flat_map(|b| b.writes.iter())
    }

    pub fn len(&self) -> usize {
        self.batches.iter().map(|b| b.writes.len()).sum()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn into_writes(self) -> Vec<SortWrite> {
        self.batches.into_iter().flat_map(|b| b.writes).collect()
    }
}

/// Children of one parent in their requested final order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentGroup {
    pub parent_id: i64,
    pub child_ids: Vec<i64>,
}

/// Position for a child appended after `count` existing siblings.
pub fn append_position(count: i64) -> i32 {
    i32::try_from(count.saturating_add(1)).unwrap_or(i32::MAX)
}

fn position(index: usize) -> i32 {
    i32::try_from(index + 1).unwrap_or(i32::MAX)
}

/// Ids in `(sort_order, id)` order.
fn ordered_ids(rows: &[SiblingRow]) -> Vec<i64> {
    let mut rows = rows.to_vec();
    rows.sort_by_key(|r| (r.sort_order, r.id));
    rows.into_iter().map(|r| r.id).collect()
}

fn index_rows<'a>(rows: impl IntoIterator<Item = &'a SiblingRow>) -> HashMap<i64, SiblingRow> {
    rows.into_iter().map(|r| (r.id, *r)).collect()
}

/// Writes that bring `known` rows to the `desired` order under `parent_id`.
fn diff(desired: &[i64], parent_id: i64, known: &HashMap<i64, SiblingRow>) -> Vec<SortWrite> {
    desired
        .iter()
        .enumerate()
        .filter_map(|(idx, id)| {
            let row = known.get(id)?;
            let sort_order = position(idx);
            if row.parent_id != parent_id {
                Some(SortWrite {
                    id: *id,
                    sort_order,
                    parent_id: Some(parent_id),
                })
            } else if row.sort_order != sort_order {
                Some(SortWrite {
                    id: *id,
                    sort_order,
                    parent_id: None,
                })
            } else {
                None
            }
        })
        .collect()
}

/// Move `child_id` to position `target` among its current siblings.
pub fn plan_move_within(
    kind: ChildKind,
    parent_id: i64,
    siblings: &[SiblingRow],
    child_id: i64,
    target: i32,
) -> Result<WritePlan, OrderingError> {
    let mut order = ordered_ids(siblings);
    let Some(current) = order.iter().position(|id| *id == child_id) else {
        return Err(OrderingError::not_found(kind, child_id, Some(parent_id)));
    };
    validate_target(kind, target, order.len())?;

    order.remove(current);
    order.insert((target - 1) as usize, child_id);

    let mut plan = WritePlan::default();
    plan.push("shift siblings", diff(&order, parent_id, &index_rows(siblings)));
    Ok(plan)
}

/// Move `child_id` out of `old_parent_id` into `new_parent_id` at `target`.
///
/// Three batches: close the gap in the old parent, open the slot in the new
/// parent, place the moved child.
pub fn plan_move_across(
    kind: ChildKind,
    child_id: i64,
    old_parent_id: i64,
    old_siblings: &[SiblingRow],
    new_parent_id: i64,
    new_siblings: &[SiblingRow],
    target: i32,
) -> Result<WritePlan, OrderingError> {
    let mut old_order = ordered_ids(old_siblings);
    let Some(current) = old_order.iter().position(|id| *id == child_id) else {
        return Err(OrderingError::not_found(kind, child_id, Some(old_parent_id)));
    };
    let mut new_order = ordered_ids(new_siblings);
    if new_order.contains(&child_id) {
        return Err(OrderingError::Conflict(format!(
            "{} {child_id} is already under {} {new_parent_id}",
            kind.name(),
            kind.parent_name()
        )));
    }
    validate_target(kind, target, new_order.len() + 1)?;

    old_order.remove(current);
    new_order.insert((target - 1) as usize, child_id);

    let known = index_rows(old_siblings.iter().chain(new_siblings));
    let mut opening = diff(&new_order, new_parent_id, &known);
    let placed: Vec<SortWrite> = opening.iter().filter(|w| w.id == child_id).copied().collect();
    opening.retain(|w| w.id != child_id);

    let mut plan = WritePlan::default();
    plan.push("close old gap", diff(&old_order, old_parent_id, &known));
    plan.push("open new slot", opening);
    plan.push("place moved child", placed);
    Ok(plan)
}

/// Full reorder of one parent. `ordered_ids` must name exactly the current
/// children; every row is rewritten.
pub fn plan_bulk_reorder(
    kind: ChildKind,
    parent_id: i64,
    siblings: &[SiblingRow],
    ordered_ids: &[i64],
) -> Result<WritePlan, OrderingError> {
    let current: HashSet<i64> = siblings.iter().map(|r| r.id).collect();

    let foreign: Vec<i64> = ordered_ids
        .iter()
        .filter(|id| !current.contains(id))
        .copied()
        .collect();
    if !foreign.is_empty() {
        return Err(OrderingError::NotFound {
            kind,
            ids: foreign,
            parent_id: Some(parent_id),
        });
    }

    let listed: HashSet<i64> = ordered_ids.iter().copied().collect();
    let mut omitted: Vec<i64> = current.difference(&listed).copied().collect();
    if !omitted.is_empty() {
        omitted.sort_unstable();
        return Err(OrderingError::NotFound {
            kind,
            ids: omitted,
            parent_id: Some(parent_id),
        });
    }

    let writes = ordered_ids
        .iter()
        .enumerate()
        .map(|(idx, id)| SortWrite {
            id: *id,
            sort_order: position(idx),
            parent_id: None,
        })
        .collect();

    let mut plan = WritePlan::default();
    plan.push("rewrite order", writes);
    Ok(plan)
}

/// Reassign children across several parents at once.
///
/// `snapshots` holds the locked children of every group parent and of every
/// parent a listed child currently sits under. Each group becomes exactly
/// its parent's final child list; parents outside the groups that lose
/// children are renumbered.
pub fn plan_bulk_cross_parent(
    kind: ChildKind,
    groups: &[ParentGroup],
    snapshots: &BTreeMap<i64, Vec<SiblingRow>>,
) -> Result<WritePlan, OrderingError> {
    let known = index_rows(snapshots.values().flatten());
    let listed: HashSet<i64> = groups.iter().flat_map(|g| g.child_ids.iter().copied()).collect();
    let group_parents: HashSet<i64> = groups.iter().map(|g| g.parent_id).collect();

    let mut unknown: Vec<i64> = listed
        .iter()
        .filter(|id| !known.contains_key(id))
        .copied()
        .collect();
    if !unknown.is_empty() {
        unknown.sort_unstable();
        return Err(OrderingError::NotFound {
            kind,
            ids: unknown,
            parent_id: None,
        });
    }

    let mut assigned = Vec::with_capacity(listed.len());
    for group in groups {
        let Some(current) = snapshots.get(&group.parent_id) else {
            return Err(OrderingError::Conflict(format!(
                "{} {} was not locked for reorder",
                kind.parent_name(),
                group.parent_id
            )));
        };
        let mut left_out: Vec<i64> = current
            .iter()
            .map(|r| r.id)
            .filter(|id| !listed.contains(id))
            .collect();
        if !left_out.is_empty() {
            left_out.sort_unstable();
            return Err(OrderingError::NotFound {
                kind,
                ids: left_out,
                parent_id: Some(group.parent_id),
            });
        }

        for (idx, id) in group.child_ids.iter().enumerate() {
            let moved = known
                .get(id)
                .is_some_and(|row| row.parent_id != group.parent_id);
            assigned.push(SortWrite {
                id: *id,
                sort_order: position(idx),
                parent_id: moved.then_some(group.parent_id),
            });
        }
    }

    let mut closing = Vec::new();
    for (parent_id, rows) in snapshots {
        if group_parents.contains(parent_id) {
            continue;
        }
        let remaining: Vec<i64> = ordered_ids(rows)
            .into_iter()
            .filter(|id| !listed.contains(id))
            .collect();
        closing.extend(diff(&remaining, *parent_id, &known));
    }

    let mut plan = WritePlan::default();
    plan.push("close source gaps", closing);
    plan.push("assign groups", assigned);
    Ok(plan)
}
