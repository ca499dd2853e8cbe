/// Material model and database operations
///
/// A material is a typed content record (book, app, image, or video) with an
/// optional file in the upload directory.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE materials (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     title TEXT NOT NULL,
///     author TEXT NOT NULL DEFAULT '',
///     description TEXT NOT NULL DEFAULT '',
///     filename TEXT UNIQUE,
///     material_type TEXT NOT NULL,
///     created_at TEXT NOT NULL,
///     uploaded_by INTEGER NOT NULL REFERENCES users(id),
///     view_count INTEGER NOT NULL DEFAULT 0
/// );
/// ```
///
/// # Lifecycle
///
/// - Created by an admin upload
/// - Mutated by edit (metadata and/or file replacement) and by every detail view
/// - Deleted together with its view-history rows

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::fmt;
use std::str::FromStr;

/// Kind of material, which decides the accepted file extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MaterialType {
    Book,
    App,
    Image,
    Video,
}

impl MaterialType {
    /// All material types in display order
    pub const ALL: [MaterialType; 4] = [
        MaterialType::Book,
        MaterialType::App,
        MaterialType::Image,
        MaterialType::Video,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialType::Book => "book",
            MaterialType::App => "app",
            MaterialType::Image => "image",
            MaterialType::Video => "video",
        }
    }

    /// Lowercase file extensions accepted for this type
    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            MaterialType::Book => &["pdf", "epub", "mobi", "djvu", "fb2", "doc", "docx", "txt"],
            MaterialType::App => &["apk", "exe", "msi", "dmg", "deb", "rpm", "zip"],
            MaterialType::Image => &["jpg", "jpeg", "png", "gif", "webp", "svg", "bmp", "ico"],
            MaterialType::Video => &["mp4", "avi", "mkv", "mov", "wmv", "flv", "webm", "mpeg"],
        }
    }

    /// Checks a client-supplied filename against the allow-list
    ///
    /// The extension is whatever follows the last dot, compared
    /// case-insensitively. A name without a dot is never accepted.
    pub fn accepts_file(&self, filename: &str) -> bool {
        match filename.rsplit_once('.') {
            Some((_, ext)) => {
                let ext = ext.to_ascii_lowercase();
                self.allowed_extensions().contains(&ext.as_str())
            }
            None => false,
        }
    }
}

impl fmt::Display for MaterialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaterialType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "book" => Ok(MaterialType::Book),
            "app" => Ok(MaterialType::App),
            "image" => Ok(MaterialType::Image),
            "video" => Ok(MaterialType::Video),
            other => Err(format!("Unknown material type: {}", other)),
        }
    }
}

/// Material model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Material {
    pub id: i64,

    /// Mandatory, non-empty title
    pub title: String,

    pub author: String,

    pub description: String,

    /// Stored (sanitized, collision-free) filename in the upload directory
    pub filename: Option<String>,

    pub material_type: MaterialType,

    pub created_at: DateTime<Utc>,

    /// User who uploaded the material; material admins only see their own
    pub uploaded_by: i64,

    /// Incremented on every detail view, no de-duplication
    pub view_count: i64,
}

/// Input for creating a material
#[derive(Debug, Clone)]
pub struct CreateMaterial {
    pub title: String,
    pub author: String,
    pub description: String,
    pub filename: Option<String>,
    pub material_type: MaterialType,
    pub uploaded_by: i64,
}

/// Input for editing a material
///
/// `filename` is only touched when `Some`; metadata-only edits leave it alone.
#[derive(Debug, Clone, Default)]
pub struct UpdateMaterial {
    pub title: String,
    pub author: String,
    pub description: String,
    pub filename: Option<String>,
}

/// Listing filter; both criteria are optional and combine with AND
#[derive(Debug, Clone, Copy, Default)]
pub struct MaterialFilter {
    pub material_type: Option<MaterialType>,
    pub uploaded_by: Option<i64>,
}

/// Number of materials per type, for the home page
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MaterialCounts {
    pub books: i64,
    pub apps: i64,
    pub images: i64,
    pub videos: i64,
}

const MATERIAL_COLUMNS: &str = "id, title, author, description, filename, material_type, \
                                created_at, uploaded_by, view_count";

impl Material {
    /// Whether `user_id` uploaded this material
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.uploaded_by == user_id
    }

    /// Inserts a new material
    pub async fn create(pool: &SqlitePool, data: CreateMaterial) -> Result<Self, sqlx::Error> {
        let material = sqlx::query_as::<_, Material>(&format!(
            r#"
            INSERT INTO materials
                (title, author, description, filename, material_type, created_at, uploaded_by)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING {}
            "#,
            MATERIAL_COLUMNS
        ))
        .bind(data.title)
        .bind(data.author)
        .bind(data.description)
        .bind(data.filename)
        .bind(data.material_type)
        .bind(Utc::now())
        .bind(data.uploaded_by)
        .fetch_all(pool)
        .await?
        .pop()
        .ok_or(sqlx::Error::RowNotFound)?;

        Ok(material)
    }

    /// Finds a material by ID
    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let material = sqlx::query_as::<_, Material>(&format!(
            "SELECT {} FROM materials WHERE id = ?",
            MATERIAL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(material)
    }

    /// Lists materials matching `filter`, newest first
    pub async fn list(pool: &SqlitePool, filter: MaterialFilter) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = format!("SELECT {} FROM materials WHERE 1 = 1", MATERIAL_COLUMNS);

        if filter.material_type.is_some() {
            query.push_str(" AND material_type = ?");
        }
        if filter.uploaded_by.is_some() {
            query.push_str(" AND uploaded_by = ?");
        }
        query.push_str(" ORDER BY id DESC");

        let mut q = sqlx::query_as::<_, Material>(&query);
        if let Some(material_type) = filter.material_type {
            q = q.bind(material_type);
        }
        if let Some(uploaded_by) = filter.uploaded_by {
            q = q.bind(uploaded_by);
        }

        q.fetch_all(pool).await
    }

    /// Counts materials of each type
    pub async fn counts(pool: &SqlitePool) -> Result<MaterialCounts, sqlx::Error> {
        let rows: Vec<(MaterialType, i64)> = sqlx::query_as(
            "SELECT material_type, COUNT(*) FROM materials GROUP BY material_type",
        )
        .fetch_all(pool)
        .await?;

        let mut counts = MaterialCounts::default();
        for (material_type, count) in rows {
            match material_type {
                MaterialType::Book => counts.books = count,
                MaterialType::App => counts.apps = count,
                MaterialType::Image => counts.images = count,
                MaterialType::Video => counts.videos = count,
            }
        }

        Ok(counts)
    }

    /// Updates title, author, description and, when given, the stored filename
    ///
    /// # Returns
    ///
    /// The updated material, None if it doesn't exist
    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        data: UpdateMaterial,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE materials SET title = ?, author = ?, description = ?");
        if data.filename.is_some() {
            query.push_str(", filename = ?");
        }
        query.push_str(&format!(" WHERE id = ? RETURNING {}", MATERIAL_COLUMNS));

        let mut q = sqlx::query_as::<_, Material>(&query)
            .bind(data.title)
            .bind(data.author)
            .bind(data.description);
        if let Some(filename) = data.filename {
            q = q.bind(filename);
        }

        Ok(q.bind(id).fetch_all(pool).await?.pop())
    }

    /// Records one detail-page view
    ///
    /// Increments the counter and appends a view-history row (anonymous when
    /// `viewer` is None) in a single transaction.
    ///
    /// # Returns
    ///
    /// The material as it is after the increment, None if it doesn't exist
    pub async fn record_view(
        pool: &SqlitePool,
        id: i64,
        viewer: Option<i64>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let material = sqlx::query_as::<_, Material>(&format!(
            "UPDATE materials SET view_count = view_count + 1 WHERE id = ? RETURNING {}",
            MATERIAL_COLUMNS
        ))
        .bind(id)
        .fetch_all(&mut *tx)
        .await?
        .pop();

        let Some(material) = material else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query("INSERT INTO view_history (material_id, user_id, viewed_at) VALUES (?, ?, ?)")
            .bind(id)
            .bind(viewer)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(material))
    }

    /// Deletes a material and all of its view-history rows in one transaction
    ///
    /// The stored file is not touched here; callers remove it through the
    /// upload store.
    ///
    /// # Returns
    ///
    /// True if the material existed
    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM view_history WHERE material_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM materials WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    /// All stored filenames currently referenced by a material
    pub async fn referenced_filenames(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT filename FROM materials WHERE filename IS NOT NULL")
            .fetch_all(pool)
            .await
    }
}
