//! In-process store for coordinator tests
//!
//! Transactions stage a private copy of the tables and swap it in on commit.
//! One transaction runs at a time; the gate stands in for row locks.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::OwnedMutexGuard;

use super::{
    BoxError, ChildKind, ChildPatch, NewChild, OrderedStore, OwnershipChain, SiblingRow, StoreTx,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub parent_id: i64,
    pub sort_order: i32,
    pub title: String,
    pub description: Option<String>,
    pub contact: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Tables {
    users: BTreeSet<i64>,
    rows: HashMap<ChildKind, BTreeMap<i64, Row>>,
    next_id: i64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Lineage {
    user_id: i64,
    board_id: i64,
    status_id: Option<i64>,
    ticket_id: Option<i64>,
}

impl Tables {
    fn table(&self, kind: ChildKind) -> Option<&BTreeMap<i64, Row>> {
        self.rows.get(&kind)
    }

    fn table_mut(&mut self, kind: ChildKind) -> &mut BTreeMap<i64, Row> {
        self.rows.entry(kind).or_default()
    }

    fn row(&self, kind: ChildKind, id: i64) -> Option<&Row> {
        self.table(kind)?.get(&id)
    }

    pub fn row_mut(&mut self, kind: ChildKind, id: i64) -> Option<&mut Row> {
        self.rows.get_mut(&kind)?.get_mut(&id)
    }

    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn parent_exists(&self, kind: ChildKind, parent_id: i64) -> bool {
        match kind.parent_kind() {
            None => self.users.contains(&parent_id),
            Some(parent_kind) => self.row(parent_kind, parent_id).is_some(),
        }
    }

    fn siblings(&self, kind: ChildKind, parent_id: i64) -> Vec<SiblingRow> {
        let mut rows: Vec<SiblingRow> = self
            .table(kind)
            .into_iter()
            .flatten()
            .filter(|(_, row)| row.parent_id == parent_id)
            .map(|(id, row)| SiblingRow {
                id: *id,
                parent_id: row.parent_id,
                sort_order: row.sort_order,
            })
            .collect();
        rows.sort_by_key(|r| (r.sort_order, r.id));
        rows
    }

    fn lineage(&self, kind: ChildKind, id: i64) -> Option<Lineage> {
        let row = self.row(kind, id)?;
        match kind {
            ChildKind::Board => Some(Lineage {
                user_id: row.parent_id,
                board_id: id,
                ..Default::default()
            }),
            ChildKind::Status => Some(Lineage {
                status_id: Some(id),
                ..self.lineage(ChildKind::Board, row.parent_id)?
            }),
            ChildKind::Ticket => Some(Lineage {
                ticket_id: Some(id),
                ..self.lineage(ChildKind::Status, row.parent_id)?
            }),
        }
    }

    fn on_chain(&self, kind: ChildKind, id: i64, chain: &OwnershipChain) -> bool {
        let Some(l) = self.lineage(kind, id) else {
            return false;
        };
        match *chain {
            OwnershipChain::User { user_id } => l.user_id == user_id,
            OwnershipChain::Board { user_id, board_id } => {
                l.user_id == user_id && l.board_id == board_id
            }
            OwnershipChain::Status {
                user_id,
                board_id,
                status_id,
            } => l.user_id == user_id && l.board_id == board_id && l.status_id == Some(status_id),
            OwnershipChain::Ticket {
                user_id,
                board_id,
                status_id,
                ticket_id,
            } => {
                l.user_id == user_id
                    && l.board_id == board_id
                    && l.status_id == Some(status_id)
                    && l.ticket_id == Some(ticket_id)
            }
        }
    }
}

type BeginHook = Box<dyn Fn(&mut Tables) + Send + Sync>;

#[derive(Default)]
struct Faults {
    fail_on: HashSet<i64>,
    write_delay: Option<Duration>,
    write_attempts: usize,
    on_begin: Option<BeginHook>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    gate: Arc<tokio::sync::Mutex<()>>,
    faults: Arc<Mutex<Faults>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self) -> i64 {
        let mut tables = self.tables.lock();
        let id = tables.next_id();
        tables.users.insert(id);
        id
    }

    /// Insert a row at an explicit position, bypassing the coordinator.
    pub fn seed_at(&self, kind: ChildKind, parent_id: i64, sort_order: i32) -> i64 {
        let mut tables = self.tables.lock();
        let id = tables.next_id();
        tables.table_mut(kind).insert(
            id,
            Row {
                parent_id,
                sort_order,
                title: format!("{} {id}", kind.name()),
                ..Default::default()
            },
        );
        id
    }

    /// Append a row after the parent's current children.
    pub fn seed(&self, kind: ChildKind, parent_id: i64) -> i64 {
        let next = self.children(kind, parent_id).len() as i32 + 1;
        self.seed_at(kind, parent_id, next)
    }

    pub fn children(&self, kind: ChildKind, parent_id: i64) -> Vec<i64> {
        self.tables
            .lock()
            .siblings(kind, parent_id)
            .into_iter()
            .map(|r| r.id)
            .collect()
    }

    pub fn sort_orders(&self, kind: ChildKind, parent_id: i64) -> Vec<i32> {
        self.tables
            .lock()
            .siblings(kind, parent_id)
            .into_iter()
            .map(|r| r.sort_order)
            .collect()
    }

    pub fn row(&self, kind: ChildKind, id: i64) -> Option<Row> {
        self.tables.lock().row(kind, id).cloned()
    }

    /// Every write to `id` fails from now on.
    pub fn fail_writes_on(&self, id: i64) {
        self.faults.lock().fail_on.insert(id);
    }

    pub fn set_write_delay(&self, delay: Duration) {
        self.faults.lock().write_delay = Some(delay);
    }

    pub fn write_attempts(&self) -> usize {
        self.faults.lock().write_attempts
    }

    /// Mutate the committed tables right before the next transaction opens,
    /// as a concurrent writer would between ownership check and lock.
    pub fn before_next_begin(&self, hook: impl Fn(&mut Tables) + Send + Sync + 'static) {
        self.faults.lock().on_begin = Some(Box::new(hook));
    }
}

pub struct MemoryTx {
    base: Arc<Mutex<Tables>>,
    staged: Mutex<Tables>,
    faults: Arc<Mutex<Faults>>,
    _gate: OwnedMutexGuard<()>,
}

impl MemoryTx {
    async fn before_write(&self, id: i64) -> Result<(), BoxError> {
        let delay = {
            let mut faults = self.faults.lock();
            faults.write_attempts += 1;
            if faults.fail_on.contains(&id) {
                return Err(format!("injected write failure on row {id}").into());
            }
            faults.write_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    fn write_row(
        &self,
        kind: ChildKind,
        id: i64,
        apply: impl FnOnce(&mut Row),
    ) -> Result<(), BoxError> {
        let mut staged = self.staged.lock();
        let row = staged
            .row_mut(kind, id)
            .ok_or_else(|| format!("{} {id} vanished", kind.name()))?;
        apply(row);
        Ok(())
    }
}

#[async_trait]
impl OrderedStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, BoxError> {
        let gate = self.gate.clone().lock_owned().await;
        if let Some(hook) = self.faults.lock().on_begin.take() {
            hook(&mut *self.tables.lock());
        }
        let staged = self.tables.lock().clone();
        Ok(MemoryTx {
            base: self.tables.clone(),
            staged: Mutex::new(staged),
            faults: self.faults.clone(),
            _gate: gate,
        })
    }

    async fn verify_chain(&self, chain: &OwnershipChain) -> Result<bool, BoxError> {
        let tables = self.tables.lock();
        Ok(match chain.leaf_kind() {
            None => tables.users.contains(&chain.user_id()),
            Some(kind) => tables.on_chain(kind, chain.leaf_id(), chain),
        })
    }

    async fn get_by_ids_with_ownership(
        &self,
        kind: ChildKind,
        ids: &[i64],
        scope: &OwnershipChain,
    ) -> Result<Vec<SiblingRow>, BoxError> {
        let tables = self.tables.lock();
        let mut rows: Vec<SiblingRow> = ids
            .iter()
            .filter(|id| tables.on_chain(kind, **id, scope))
            .filter_map(|id| {
                let row = tables.row(kind, *id)?;
                Some(SiblingRow {
                    id: *id,
                    parent_id: row.parent_id,
                    sort_order: row.sort_order,
                })
            })
            .collect();
        rows.sort_by_key(|r| r.id);
        Ok(rows)
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn lock_parent(&self, kind: ChildKind, parent_id: i64) -> Result<bool, BoxError> {
        Ok(self.staged.lock().parent_exists(kind, parent_id))
    }

    async fn list_siblings(
        &self,
        kind: ChildKind,
        parent_id: i64,
    ) -> Result<Vec<SiblingRow>, BoxError> {
        Ok(self.staged.lock().siblings(kind, parent_id))
    }

    async fn count_siblings(&self, kind: ChildKind, parent_id: i64) -> Result<i64, BoxError> {
        Ok(self.staged.lock().siblings(kind, parent_id).len() as i64)
    }

    async fn lock_rows(&self, _kind: ChildKind, _ids: &[i64]) -> Result<(), BoxError> {
        Ok(())
    }

    async fn find_child(&self, kind: ChildKind, id: i64) -> Result<Option<SiblingRow>, BoxError> {
        Ok(self.staged.lock().row(kind, id).map(|row| SiblingRow {
            id,
            parent_id: row.parent_id,
            sort_order: row.sort_order,
        }))
    }

    async fn insert_child(
        &self,
        parent_id: i64,
        sort_order: i32,
        child: &NewChild,
    ) -> Result<i64, BoxError> {
        let mut staged = self.staged.lock();
        let id = staged.next_id();
        let (description, contact) = match child {
            NewChild::Ticket {
                description,
                contact,
                ..
            } => (description.clone(), contact.clone()),
            _ => (None, None),
        };
        staged.table_mut(child.kind()).insert(
            id,
            Row {
                parent_id,
                sort_order,
                title: child.title().to_string(),
                description,
                contact,
            },
        );
        Ok(id)
    }

    async fn update_fields(
        &self,
        kind: ChildKind,
        id: i64,
        patch: &ChildPatch,
    ) -> Result<(), BoxError> {
        self.before_write(id).await?;
        self.write_row(kind, id, |row| {
            if let Some(title) = &patch.title {
                row.title = title.clone();
            }
            if let Some(description) = &patch.description {
                row.description = description.clone();
            }
            if let Some(contact) = &patch.contact {
                row.contact = contact.clone();
            }
        })
    }

    async fn update_sort_order(
        &self,
        kind: ChildKind,
        id: i64,
        sort_order: i32,
    ) -> Result<(), BoxError> {
        self.before_write(id).await?;
        self.write_row(kind, id, |row| row.sort_order = sort_order)
    }

    async fn update_sort_order_and_parent(
        &self,
        kind: ChildKind,
        id: i64,
        sort_order: i32,
        parent_id: i64,
    ) -> Result<(), BoxError> {
        self.before_write(id).await?;
        self.write_row(kind, id, |row| {
            row.sort_order = sort_order;
            row.parent_id = parent_id;
        })
    }

    async fn commit(self) -> Result<(), BoxError> {
        let staged = self.staged.into_inner();
        *self.base.lock() = staged;
        Ok(())
    }
}
