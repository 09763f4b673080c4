//! Sibling ordering for modules, chapters and content items.
//!
//! Siblings under one parent always carry `order_index` values `0..n-1`.
//! Every mutation (create, delete, move, reorder) rewrites the whole sibling
//! list inside the caller's transaction, so there are never gaps or duplicates.
//! The parent row is locked first, which serializes concurrent inserts under
//! the same parent.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::model::{DatabaseError, DatabaseResult, ModelManager};

/// Tables whose rows are ordered under a parent row.
pub trait Ordered {
    const TABLE: &'static str;
    /// Foreign key column pointing at the parent.
    const PARENT: &'static str;
    const PARENT_TABLE: &'static str;
}

/// Moves `id` to `position`, shifting the others. Positions past the end
/// append.
pub fn move_item(ids: &[Uuid], id: Uuid, position: usize) -> Option<Vec<Uuid>> {
    let from = ids.iter().position(|x| *x == id)?;
    let mut out = ids.to_vec();
    let item = out.remove(from);
    let to = position.min(out.len());
    out.insert(to, item);
    Some(out)
}

/// `requested` must name every current sibling exactly once.
pub fn is_permutation(current: &[Uuid], requested: &[Uuid]) -> bool {
    if current.len() != requested.len() {
        return false;
    }
    let mut a = current.to_vec();
    let mut b = requested.to_vec();
    a.sort_unstable();
    b.sort_unstable();
    a == b
}

pub fn sequence(ids: &[Uuid]) -> Vec<(Uuid, i32)> {
    ids.iter()
        .enumerate()
        .map(|(idx, id)| (*id, idx as i32))
        .collect()
}

pub fn clamp_position(position: i32, len: usize) -> usize {
    (position.max(0) as usize).min(len)
}

/// Row lock on the parent, held until the transaction ends.
pub async fn lock_parent<T: Ordered>(conn: &mut PgConnection, parent_id: Uuid) -> DatabaseResult<()> {
    let sql = format!("SELECT id FROM {} WHERE id = $1 FOR NO KEY UPDATE", T::PARENT_TABLE);
    sqlx::query(&sql)
        .bind(parent_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;
    Ok(())
}

pub async fn sibling_ids<T: Ordered>(
    conn: &mut PgConnection,
    parent_id: Uuid,
) -> DatabaseResult<Vec<Uuid>> {
    lock_parent::<T>(conn, parent_id).await?;
    let sql = format!(
        "SELECT id FROM {} WHERE {} = $1 ORDER BY order_index, id FOR UPDATE",
        T::TABLE,
        T::PARENT
    );
    let ids: Vec<Uuid> = sqlx::query_scalar(&sql)
        .bind(parent_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(ids)
}

pub async fn write_sequence<T: Ordered>(
    conn: &mut PgConnection,
    ids: &[Uuid],
) -> DatabaseResult<()> {
    let (ids, indexes): (Vec<Uuid>, Vec<i32>) = sequence(ids).into_iter().unzip();
    let sql = format!(
        r#"
        UPDATE {} AS t SET order_index = x.idx
        FROM UNNEST($1::uuid[], $2::int4[]) AS x(id, idx)
        WHERE t.id = x.id
        "#,
        T::TABLE
    );
    sqlx::query(&sql)
        .bind(ids)
        .bind(indexes)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Closes gaps left by a delete or by moving a row to another parent.
pub async fn resequence<T: Ordered>(conn: &mut PgConnection, parent_id: Uuid) -> DatabaseResult<()> {
    let ids = sibling_ids::<T>(conn, parent_id).await?;
    write_sequence::<T>(conn, &ids).await
}

/// Puts `id` (already stored under `parent_id`) at `position`, or keeps its
/// relative place when `position` is `None`, then renumbers all siblings.
pub async fn place<T: Ordered>(
    conn: &mut PgConnection,
    parent_id: Uuid,
    id: Uuid,
    position: Option<i32>,
) -> DatabaseResult<i32> {
    let ids = sibling_ids::<T>(conn, parent_id).await?;
    let ids = match position {
        Some(p) => {
            let to = clamp_position(p, ids.len());
            move_item(&ids, id, to)
                .ok_or_else(|| DatabaseError::Invalid(format!("{id} is not under {parent_id}")))?
        }
        None => ids,
    };
    write_sequence::<T>(conn, &ids).await?;

    let idx = ids.iter().position(|x| *x == id).unwrap_or_default();
    Ok(idx as i32)
}

/// Next free index under `parent_id`, for appending.
pub async fn next_index<T: Ordered>(conn: &mut PgConnection, parent_id: Uuid) -> DatabaseResult<i32> {
    lock_parent::<T>(conn, parent_id).await?;
    let sql = format!("SELECT COUNT(*) FROM {} WHERE {} = $1", T::TABLE, T::PARENT);
    let count: i64 = sqlx::query_scalar(&sql)
        .bind(parent_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count as i32)
}

/// Replaces the order of all children of `parent_id` with `requested`.
#[tracing::instrument(skip(mm, requested))]
pub async fn apply_order<T: Ordered>(
    mm: &ModelManager,
    parent_id: Uuid,
    requested: &[Uuid],
) -> DatabaseResult<()> {
    let mut tx = mm.executor().begin().await?;

    let current = sibling_ids::<T>(&mut *tx, parent_id).await?;
    if !is_permutation(&current, requested) {
        return Err(DatabaseError::Invalid(format!(
            "reorder of {} must list each of the {} items exactly once",
            T::TABLE,
            current.len()
        )));
    }

    write_sequence::<T>(&mut *tx, requested).await?;
    tx.commit().await?;

    tracing::debug!("reordered {} {} under {}", requested.len(), T::TABLE, parent_id);
    Ok(())
}
