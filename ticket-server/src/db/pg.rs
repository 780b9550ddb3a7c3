//! PostgreSQL implementation of the ordering store

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tokio::sync::Mutex;

use super::{
    BoxError, ChildKind, ChildPatch, NewChild, OrderedStore, OwnershipChain, SiblingRow, StoreTx,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// One open transaction. The connection is serialized behind a mutex so the
/// write fan-out can share it; statements interleave but never overlap.
pub struct PgStoreTx {
    tx: Mutex<Transaction<'static, Postgres>>,
}

// ── Ownership SQL ──

/// FROM clause joining down to `depth` (1 = boards, 2 = statuses, 3 = tickets).
fn ancestry_from(depth: u8) -> &'static str {
    match depth {
        0 | 1 => "boards b",
        2 => "statuses s JOIN boards b ON b.id = s.board_id",
        _ => {
            "tickets t JOIN statuses s ON s.id = t.status_id JOIN boards b ON b.id = s.board_id"
        }
    }
}

fn alias(kind: ChildKind) -> &'static str {
    match kind {
        ChildKind::Board => "b",
        ChildKind::Status => "s",
        ChildKind::Ticket => "t",
    }
}

/// `(column, value)` pairs a row must match to lie on `chain`.
fn chain_conditions(chain: &OwnershipChain) -> Vec<(&'static str, i64)> {
    let mut conds = vec![("b.user_id", chain.user_id())];
    match *chain {
        OwnershipChain::User { .. } => {}
        OwnershipChain::Board { board_id, .. } => conds.push(("b.id", board_id)),
        OwnershipChain::Status {
            board_id,
            status_id,
            ..
        } => {
            conds.push(("b.id", board_id));
            conds.push(("s.id", status_id));
        }
        OwnershipChain::Ticket {
            board_id,
            status_id,
            ticket_id,
            ..
        } => {
            conds.push(("b.id", board_id));
            conds.push(("s.id", status_id));
            conds.push(("t.id", ticket_id));
        }
    }
    conds
}

fn where_clause(conds: &[(&'static str, i64)], first_param: usize) -> String {
    conds
        .iter()
        .enumerate()
        .map(|(i, (col, _))| format!("{col} = ${}", first_param + i))
        .collect::<Vec<_>>()
        .join(" AND ")
}

#[async_trait]
impl OrderedStore for PgStore {
    type Tx = PgStoreTx;

    async fn begin(&self) -> Result<PgStoreTx, BoxError> {
        let tx = self.pool.begin().await?;
        Ok(PgStoreTx { tx: Mutex::new(tx) })
    }

    async fn verify_chain(&self, chain: &OwnershipChain) -> Result<bool, BoxError> {
        if let OwnershipChain::User { user_id } = *chain {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
                    .bind(user_id)
                    .fetch_one(&self.pool)
                    .await?;
            return Ok(exists);
        }

        let conds = chain_conditions(chain);
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE {})",
            ancestry_from(chain.depth()),
            where_clause(&conds, 1)
        );
        let mut query = sqlx::query_scalar::<_, bool>(&sql);
        for (_, value) in &conds {
            query = query.bind(*value);
        }
        Ok(query.fetch_one(&self.pool).await?)
    }

    async fn get_by_ids_with_ownership(
        &self,
        kind: ChildKind,
        ids: &[i64],
        scope: &OwnershipChain,
    ) -> Result<Vec<SiblingRow>, BoxError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let a = alias(kind);
        let conds = chain_conditions(scope);
        let sql = format!(
            "SELECT {a}.id, {a}.{parent} AS parent_id, {a}.sort_order FROM {from} \
             WHERE {a}.id = ANY($1) AND {filter} ORDER BY {a}.id",
            parent = kind.parent_column(),
            from = ancestry_from(kind.depth().max(scope.depth())),
            filter = where_clause(&conds, 2),
        );
        let mut query = sqlx::query_as::<_, SiblingRow>(&sql).bind(ids);
        for (_, value) in &conds {
            query = query.bind(*value);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }
}

#[async_trait]
impl StoreTx for PgStoreTx {
    async fn lock_parent(&self, kind: ChildKind, parent_id: i64) -> Result<bool, BoxError> {
        let sql = format!(
            "SELECT id FROM {} WHERE id = $1 FOR UPDATE",
            kind.parent_table()
        );
        let mut tx = self.tx.lock().await;
        let row: Option<(i64,)> = sqlx::query_as(&sql)
            .bind(parent_id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(row.is_some())
    }

    async fn list_siblings(
        &self,
        kind: ChildKind,
        parent_id: i64,
    ) -> Result<Vec<SiblingRow>, BoxError> {
        let sql = format!(
            "SELECT id, {parent} AS parent_id, sort_order FROM {table} \
             WHERE {parent} = $1 ORDER BY sort_order, id",
            parent = kind.parent_column(),
            table = kind.table(),
        );
        let mut tx = self.tx.lock().await;
        let rows = sqlx::query_as::<_, SiblingRow>(&sql)
            .bind(parent_id)
            .fetch_all(&mut **tx)
            .await?;
        Ok(rows)
    }

    async fn count_siblings(&self, kind: ChildKind, parent_id: i64) -> Result<i64, BoxError> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {} = $1",
            kind.table(),
            kind.parent_column()
        );
        let mut tx = self.tx.lock().await;
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(parent_id)
            .fetch_one(&mut **tx)
            .await?;
        Ok(count)
    }

    async fn lock_rows(&self, kind: ChildKind, ids: &[i64]) -> Result<(), BoxError> {
        if ids.is_empty() {
            return Ok(());
        }
        let sql = format!(
            "SELECT id FROM {} WHERE id = ANY($1) ORDER BY id FOR UPDATE",
            kind.table()
        );
        let mut tx = self.tx.lock().await;
        sqlx::query(&sql).bind(ids).execute(&mut **tx).await?;
        Ok(())
    }

    async fn find_child(&self, kind: ChildKind, id: i64) -> Result<Option<SiblingRow>, BoxError> {
        let sql = format!(
            "SELECT id, {} AS parent_id, sort_order FROM {} WHERE id = $1",
            kind.parent_column(),
            kind.table()
        );
        let mut tx = self.tx.lock().await;
        let row = sqlx::query_as::<_, SiblingRow>(&sql)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(row)
    }

    async fn insert_child(
        &self,
        parent_id: i64,
        sort_order: i32,
        child: &NewChild,
    ) -> Result<i64, BoxError> {
        let mut tx = self.tx.lock().await;
        let id: i64 = match child {
            NewChild::Board { title } => {
                sqlx::query_scalar(
                    "INSERT INTO boards (user_id, title, sort_order) VALUES ($1, $2, $3) RETURNING id",
                )
                .bind(parent_id)
                .bind(title)
                .bind(sort_order)
                .fetch_one(&mut **tx)
                .await?
            }
            NewChild::Status { title } => {
                sqlx::query_scalar(
                    "INSERT INTO statuses (board_id, title, sort_order) VALUES ($1, $2, $3) RETURNING id",
                )
                .bind(parent_id)
                .bind(title)
                .bind(sort_order)
                .fetch_one(&mut **tx)
                .await?
            }
            NewChild::Ticket {
                title,
                description,
                contact,
            } => {
                sqlx::query_scalar(
                    r#"
                    INSERT INTO tickets (status_id, title, description, contact, sort_order)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING id
                    "#,
                )
                .bind(parent_id)
                .bind(title)
                .bind(description)
                .bind(contact)
                .bind(sort_order)
                .fetch_one(&mut **tx)
                .await?
            }
        };
        Ok(id)
    }

    async fn update_fields(
        &self,
        kind: ChildKind,
        id: i64,
        patch: &ChildPatch,
    ) -> Result<(), BoxError> {
        let mut tx = self.tx.lock().await;
        let result = match kind {
            ChildKind::Ticket => {
                sqlx::query(
                    r#"
                    UPDATE tickets SET
                        title = COALESCE($1, title),
                        description = CASE WHEN $2 THEN $3 ELSE description END,
                        contact = CASE WHEN $4 THEN $5 ELSE contact END,
                        updated_at = now()
                    WHERE id = $6
                    "#,
                )
                .bind(&patch.title)
                .bind(patch.description.is_some())
                .bind(patch.description.clone().flatten())
                .bind(patch.contact.is_some())
                .bind(patch.contact.clone().flatten())
                .bind(id)
                .execute(&mut **tx)
                .await?
            }
            ChildKind::Board | ChildKind::Status => {
                let sql = format!(
                    "UPDATE {} SET title = COALESCE($1, title), updated_at = now() WHERE id = $2",
                    kind.table()
                );
                sqlx::query(&sql)
                    .bind(&patch.title)
                    .bind(id)
                    .execute(&mut **tx)
                    .await?
            }
        };
        if result.rows_affected() == 0 {
            return Err(format!("{} {id} vanished during update", kind.name()).into());
        }
        Ok(())
    }

    async fn update_sort_order(
        &self,
        kind: ChildKind,
        id: i64,
        sort_order: i32,
    ) -> Result<(), BoxError> {
        let sql = format!(
            "UPDATE {} SET sort_order = $1, updated_at = now() WHERE id = $2",
            kind.table()
        );
        let mut tx = self.tx.lock().await;
        let result = sqlx::query(&sql)
            .bind(sort_order)
            .bind(id)
            .execute(&mut **tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(format!("{} {id} vanished during reorder", kind.name()).into());
        }
        Ok(())
    }

    async fn update_sort_order_and_parent(
        &self,
        kind: ChildKind,
        id: i64,
        sort_order: i32,
        parent_id: i64,
    ) -> Result<(), BoxError> {
        let sql = format!(
            "UPDATE {} SET sort_order = $1, {} = $2, updated_at = now() WHERE id = $3",
            kind.table(),
            kind.parent_column()
        );
        let mut tx = self.tx.lock().await;
        let result = sqlx::query(&sql)
            .bind(sort_order)
            .bind(parent_id)
            .bind(id)
            .execute(&mut **tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(format!("{} {id} vanished during move", kind.name()).into());
        }
        Ok(())
    }

    async fn commit(self) -> Result<(), BoxError> {
        self.tx.into_inner().commit().await?;
        Ok(())
    }
}
