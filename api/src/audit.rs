use chrono::Utc;
use entity::audit_trail::{self, Action};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiResult;

/// Writes a before/after snapshot row. Callers pass their open transaction so
/// the audit row commits (or rolls back) together with the mutation it
/// records; a serialization failure aborts the whole call.
pub async fn log_activity<C, O, N>(
    conn: &C,
    table_name: &str,
    record_id: Uuid,
    action: Action,
    old_value: Option<&O>,
    new_value: Option<&N>,
    changed_by: Option<Uuid>,
) -> ApiResult<audit_trail::Model>
where
    C: ConnectionTrait,
    O: Serialize,
    N: Serialize,
{
    let old_values = old_value.map(serde_json::to_value).transpose()?;
    let new_values = new_value.map(serde_json::to_value).transpose()?;

    let row = audit_trail::ActiveModel {
        id: Set(Uuid::new_v4()),
        table_name: Set(table_name.to_string()),
        record_id: Set(record_id),
        action: Set(action),
        old_values: Set(old_values),
        new_values: Set(new_values),
        changed_by: Set(changed_by),
        changed_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await?;

    tracing::debug!(
        table = table_name,
        record = %record_id,
        action = action.as_str(),
        "audit entry recorded"
    );
    Ok(row)
}

/// All entries for one record, oldest first.
pub async fn trail_for_record<C: ConnectionTrait>(
    conn: &C,
    table_name: &str,
    record_id: Uuid,
) -> ApiResult<Vec<audit_trail::Model>> {
    let rows = audit_trail::Entity::find()
        .filter(audit_trail::Column::TableName.eq(table_name))
        .filter(audit_trail::Column::RecordId.eq(record_id))
        .order_by_asc(audit_trail::Column::ChangedAt)
        .all(conn)
        .await?;
    Ok(rows)
}

/// All entries attributed to one actor, oldest first.
pub async fn actions_by_user<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> ApiResult<Vec<audit_trail::Model>> {
    let rows = audit_trail::Entity::find()
        .filter(audit_trail::Column::ChangedBy.eq(user_id))
        .order_by_asc(audit_trail::Column::ChangedAt)
        .all(conn)
        .await?;
    Ok(rows)
}

/// Full log, newest first (admin audit screen).
pub async fn list_all<C: ConnectionTrait>(conn: &C) -> ApiResult<Vec<audit_trail::Model>> {
    let rows = audit_trail::Entity::find()
        .order_by_desc(audit_trail::Column::ChangedAt)
        .all(conn)
        .await?;
    Ok(rows)
}
