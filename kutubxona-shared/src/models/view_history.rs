/// View history
///
/// One row per detail-page view, written by `Material::record_view`. Rows are
/// never updated and are only removed together with their material.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// A view row joined with the viewer's name for the statistics page
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ViewRecord {
    pub id: i64,

    /// Viewer, None for anonymous views
    pub user_id: Option<i64>,

    /// Viewer name, None for anonymous views
    pub user_name: Option<String>,

    pub viewed_at: DateTime<Utc>,
}

impl ViewRecord {
    /// Lists all views of a material, newest first
    pub async fn list_for_material(
        pool: &SqlitePool,
        material_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let records = sqlx::query_as::<_, ViewRecord>(
            r#"
            SELECT vh.id, vh.user_id, u.name AS user_name, vh.viewed_at
            FROM view_history vh
            LEFT JOIN users u ON u.id = vh.user_id
            WHERE vh.material_id = ?
            ORDER BY vh.id DESC
            "#,
        )
        .bind(material_id)
        .fetch_all(pool)
        .await?;

        Ok(records)
    }

    /// Number of history rows for a material
    pub async fn count_for_material(pool: &SqlitePool, material_id: i64) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM view_history WHERE material_id = ?")
                .bind(material_id)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }
}
