/// Public material endpoints
///
/// # Endpoints
///
/// - `GET /` - Per-type counts (and the unread mailbox count when logged in)
/// - `GET /materials` - All materials, newest first
/// - `GET /materials/:type` - Materials of one type; an unknown type lists all
/// - `GET /material/:id` - Detail page; every visit is recorded
/// - `GET /download/:filename` - Stored file as an attachment
/// - `GET /books`, `GET /book/:id` - Old links, redirected

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    flash::{redirect_with_flash, Flash, FlashLevel, Page},
    routes::IdPath,
};
use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use bytes::Bytes;
use kutubxona_shared::{
    auth::middleware::AuthContext,
    models::{
        material::{Material, MaterialCounts, MaterialFilter, MaterialType},
        notification::Notification,
        user::User,
    },
    storage::StorageError,
};
use serde::Serialize;

/// Home page body
#[derive(Debug, Serialize)]
pub struct IndexPage {
    pub counts: MaterialCounts,

    /// Only present for logged-in users
    pub unread_notifications: Option<i64>,
}

/// Material list body
#[derive(Debug, Serialize)]
pub struct ListPage {
    /// The type filter that was applied, None when listing everything
    pub material_type: Option<MaterialType>,
    pub materials: Vec<Material>,
}

/// Material detail body
#[derive(Debug, Serialize)]
pub struct DetailPage {
    pub material: Material,
    pub uploader_name: Option<String>,
}

fn identity(auth: Option<Extension<AuthContext>>) -> Option<AuthContext> {
    auth.map(|Extension(auth)| auth)
}

/// Home page
pub async fn index(
    State(state): State<AppState>,
    flash: Flash,
    auth: Option<Extension<AuthContext>>,
) -> ApiResult<Page<IndexPage>> {
    let auth = identity(auth);
    let counts = Material::counts(&state.db).await?;

    let unread_notifications = match &auth {
        Some(auth) => Some(Notification::count_unread(&state.db, auth.user_id).await?),
        None => None,
    };

    Ok(Page::new(
        flash,
        auth,
        IndexPage {
            counts,
            unread_notifications,
        },
    ))
}

/// All materials
pub async fn list_all(
    State(state): State<AppState>,
    flash: Flash,
    auth: Option<Extension<AuthContext>>,
) -> ApiResult<Page<ListPage>> {
    list(&state, flash, identity(auth), None).await
}

/// Materials of one type
pub async fn list_by_type(
    State(state): State<AppState>,
    Path(material_type): Path<String>,
    flash: Flash,
    auth: Option<Extension<AuthContext>>,
) -> ApiResult<Page<ListPage>> {
    let material_type = material_type.parse::<MaterialType>().ok();
    list(&state, flash, identity(auth), material_type).await
}

async fn list(
    state: &AppState,
    flash: Flash,
    auth: Option<AuthContext>,
    material_type: Option<MaterialType>,
) -> ApiResult<Page<ListPage>> {
    let materials = Material::list(
        &state.db,
        MaterialFilter {
            material_type,
            ..Default::default()
        },
    )
    .await?;

    Ok(Page::new(
        flash,
        auth,
        ListPage {
            material_type,
            materials,
        },
    ))
}

/// Material detail
///
/// Increments the view counter and appends a view-history row (anonymous
/// visitors are recorded with no user).
pub async fn detail(
    State(state): State<AppState>,
    IdPath(id): IdPath,
    flash: Flash,
    auth: Option<Extension<AuthContext>>,
) -> ApiResult<Page<DetailPage>> {
    let auth = identity(auth);
    let viewer = auth.as_ref().map(|a| a.user_id);

    let material = Material::record_view(&state.db, id, viewer)
        .await?
        .ok_or(ApiError::NotFound)?;

    let uploader_name = User::find_by_id(&state.db, material.uploaded_by)
        .await?
        .map(|user| user.name);

    Ok(Page::new(
        flash,
        auth,
        DetailPage {
            material,
            uploader_name,
        },
    ))
}

/// File download
///
/// Names that could escape the upload directory are refused the same way
/// as missing files.
pub async fn download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Response> {
    let data = match state.uploads.read(&filename).await {
        Ok(data) => data,
        Err(StorageError::NotFound(_)) | Err(StorageError::InvalidFilename(_)) => {
            tracing::debug!(filename = %filename, "Download of unknown file");
            return Ok(redirect_with_flash(
                "/materials",
                FlashLevel::Error,
                "File not found",
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .map_err(|e| ApiError::InternalError(format!("Bad download filename: {}", e)))?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Bytes::from(data),
    )
        .into_response())
}

/// `/books` from before materials had types
pub async fn legacy_books() -> Redirect {
    Redirect::permanent("/materials/book")
}

/// `/book/:id` from before materials had types
pub async fn legacy_book(IdPath(id): IdPath) -> Redirect {
    Redirect::permanent(&format!("/material/{}", id))
}
