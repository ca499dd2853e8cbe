/// Admin panel endpoints
///
/// Material management is open to material admins and super admins;
/// material admins only ever see and touch materials they uploaded, and may
/// only upload books and apps. Role toggles and direct notifications are
/// super admin only (enforced by the route group guard, and again by the
/// authorization helpers where a target is involved).
///
/// # Endpoints
///
/// - `GET  /admin` - Panel: scoped materials, users for super admins
/// - `POST /admin/add` - Upload a material (multipart)
/// - `GET  /admin/material/:id/edit` - Edit form
/// - `POST /admin/material/:id/edit` - Save edits, optionally replacing the file (multipart)
/// - `GET  /admin/material/:id/delete` - Delete material, file and history
/// - `GET  /admin/material/:id/stats` - View history
/// - `GET  /admin/user/:id/toggle` - Toggle user / material admin
/// - `GET  /admin/notify/:id` - Notification form
/// - `POST /admin/notify/:id` - Send a notification (form)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    flash::{redirect_with_flash, Flash, FlashLevel, Page},
    routes::IdPath,
};
use axum::{
    extract::{Multipart, State},
    response::Response,
    Extension, Form,
};
use bytes::Bytes;
use kutubxona_shared::{
    auth::{
        authorization::{
            material_scope, require_material_access, require_upload_type, toggle_target_role,
        },
        middleware::AuthContext,
    },
    models::{
        material::{CreateMaterial, Material, MaterialType, UpdateMaterial},
        notification::{CreateNotification, Notification},
        user::{Role, User},
        view_history::ViewRecord,
    },
};
use serde::{Deserialize, Serialize};

/// Admin panel body
#[derive(Debug, Serialize)]
pub struct PanelPage {
    pub materials: Vec<Material>,

    /// Every account, for super admins only
    pub users: Option<Vec<User>>,

    /// Types the caller may upload
    pub upload_types: Vec<MaterialType>,
}

/// Edit form body
#[derive(Debug, Serialize)]
pub struct EditPage {
    pub material: Material,
}

/// Statistics body
#[derive(Debug, Serialize)]
pub struct StatsPage {
    pub material: Material,
    pub views: Vec<ViewRecord>,
}

/// Notification form body
#[derive(Debug, Serialize)]
pub struct NotifyPage {
    pub recipient: User,
}

/// Notification form
#[derive(Debug, Deserialize)]
pub struct NotifyForm {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub message: String,
}

/// A file part of a multipart form
#[derive(Debug)]
struct UploadedFile {
    name: String,
    data: Bytes,
}

/// Fields of the upload and edit forms
#[derive(Debug, Default)]
struct MaterialForm {
    material_type: Option<String>,
    title: String,
    author: String,
    description: String,
    file: Option<UploadedFile>,
}

impl MaterialForm {
    /// Reads every part of the form; unknown parts are skipped
    ///
    /// A file part with an empty filename is a form submitted without a file.
    async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = MaterialForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            match name.as_str() {
                "material_type" => form.material_type = Some(field.text().await?.trim().to_string()),
                "title" => form.title = field.text().await?.trim().to_string(),
                "author" => form.author = field.text().await?.trim().to_string(),
                "description" => form.description = field.text().await?.trim().to_string(),
                "file" => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let data = field.bytes().await?;
                    if !file_name.is_empty() {
                        form.file = Some(UploadedFile {
                            name: file_name,
                            data,
                        });
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }
}

fn file_type_error(material_type: MaterialType, redirect: String) -> ApiError {
    ApiError::validation(
        format!(
            "File type not allowed for {}; allowed: {}",
            material_type,
            material_type.allowed_extensions().join(", ")
        ),
        redirect,
    )
}

/// Loads a material the caller is allowed to manage
async fn managed_material(state: &AppState, auth: &AuthContext, id: i64) -> ApiResult<Material> {
    let material = Material::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound)?;

    if let Err(e) = require_material_access(auth, &material) {
        tracing::warn!(
            material_id = id,
            user_id = auth.user_id,
            "Material admin tried to manage another admin's material"
        );
        return Err(e.into());
    }

    Ok(material)
}

/// Admin panel
pub async fn panel(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    flash: Flash,
) -> ApiResult<Page<PanelPage>> {
    let materials = Material::list(&state.db, material_scope(&auth).filter()).await?;

    let users = if auth.role.is_super_admin() {
        Some(User::list_all(&state.db).await?)
    } else {
        None
    };

    let upload_types = MaterialType::ALL
        .into_iter()
        .filter(|t| require_upload_type(&auth, *t).is_ok())
        .collect();

    Ok(Page::new(
        flash,
        Some(auth),
        PanelPage {
            materials,
            users,
            upload_types,
        },
    ))
}

/// Upload a material
///
/// Checks run in this order, and nothing is written until all pass:
/// 1. the declared type (`material_type`, default `book`) must be known
/// 2. material admins may only upload books and apps
/// 3. the title is mandatory
/// 4. an attached file must carry an extension allowed for the type
///
/// If the database insert fails the stored file is removed again.
pub async fn add_material(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    multipart: Multipart,
) -> ApiResult<Response> {
    let form = MaterialForm::read(multipart).await?;

    let material_type = form
        .material_type
        .as_deref()
        .unwrap_or("book")
        .parse::<MaterialType>()
        .map_err(|e| ApiError::validation(e, "/admin"))?;

    require_upload_type(&auth, material_type)?;

    if form.title.is_empty() {
        return Err(ApiError::validation("Title is required", "/admin"));
    }

    if let Some(file) = &form.file {
        if !material_type.accepts_file(&file.name) {
            return Err(file_type_error(material_type, "/admin".to_string()));
        }
    }

    let filename = match &form.file {
        Some(file) => Some(state.uploads.store(&file.name, &file.data).await?),
        None => None,
    };

    let created = Material::create(
        &state.db,
        CreateMaterial {
            title: form.title,
            author: form.author,
            description: form.description,
            filename: filename.clone(),
            material_type,
            uploaded_by: auth.user_id,
        },
    )
    .await;

    let material = match created {
        Ok(material) => material,
        Err(e) => {
            if let Some(filename) = &filename {
                state.uploads.remove_best_effort(filename).await;
            }
            return Err(e.into());
        }
    };

    tracing::info!(
        material_id = material.id,
        user_id = auth.user_id,
        material_type = %material_type,
        "Material uploaded"
    );

    Ok(redirect_with_flash("/admin", FlashLevel::Success, "Material added"))
}

/// Edit form
pub async fn edit_page(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    IdPath(id): IdPath,
    flash: Flash,
) -> ApiResult<Page<EditPage>> {
    let material = managed_material(&state, &auth, id).await?;

    Ok(Page::new(flash, Some(auth), EditPage { material }))
}

/// Save edits
///
/// The material keeps its type; a replacement file must fit that type. The
/// previous file is removed best-effort before the new one is stored under
/// a fresh name. Metadata-only edits leave files alone.
pub async fn edit_material(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    IdPath(id): IdPath,
    multipart: Multipart,
) -> ApiResult<Response> {
    let material = managed_material(&state, &auth, id).await?;
    let edit_url = format!("/admin/material/{}/edit", id);

    let form = MaterialForm::read(multipart).await?;

    if form.title.is_empty() {
        return Err(ApiError::validation("Title is required", edit_url));
    }

    let filename = match &form.file {
        Some(file) => {
            if !material.material_type.accepts_file(&file.name) {
                return Err(file_type_error(material.material_type, edit_url));
            }

            if let Some(previous) = &material.filename {
                state.uploads.remove_best_effort(previous).await;
            }

            Some(state.uploads.store(&file.name, &file.data).await?)
        }
        None => None,
    };

    let updated = Material::update(
        &state.db,
        id,
        UpdateMaterial {
            title: form.title,
            author: form.author,
            description: form.description,
            filename: filename.clone(),
        },
    )
    .await;

    let saved = match updated {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(ApiError::NotFound),
        Err(e) => Err(ApiError::from(e)),
    };

    if let Err(e) = saved {
        if let Some(filename) = &filename {
            state.uploads.remove_best_effort(filename).await;
        }
        return Err(e);
    }

    tracing::info!(
        material_id = id,
        user_id = auth.user_id,
        file_replaced = filename.is_some(),
        "Material edited"
    );

    Ok(redirect_with_flash("/admin", FlashLevel::Success, "Material updated"))
}

/// Delete a material with its file and view history
pub async fn delete_material(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    IdPath(id): IdPath,
) -> ApiResult<Response> {
    let material = managed_material(&state, &auth, id).await?;

    if let Some(filename) = &material.filename {
        state.uploads.remove_best_effort(filename).await;
    }

    if !Material::delete(&state.db, id).await? {
        return Err(ApiError::NotFound);
    }

    tracing::info!(material_id = id, user_id = auth.user_id, "Material deleted");

    Ok(redirect_with_flash("/admin", FlashLevel::Success, "Material deleted"))
}

/// View history of a material, newest first
pub async fn material_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    IdPath(id): IdPath,
    flash: Flash,
) -> ApiResult<Page<StatsPage>> {
    let material = managed_material(&state, &auth, id).await?;
    let views = ViewRecord::list_for_material(&state.db, id).await?;

    Ok(Page::new(flash, Some(auth), StatsPage { material, views }))
}

/// Toggle a user between plain user and material admin
pub async fn toggle_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    IdPath(id): IdPath,
) -> ApiResult<Response> {
    let Some(target) = User::find_by_id(&state.db, id).await? else {
        return Ok(redirect_with_flash("/admin", FlashLevel::Error, "User not found"));
    };

    let new_role = toggle_target_role(&auth, &target)?;

    if !User::set_role(&state.db, target.id, new_role).await? {
        return Ok(redirect_with_flash("/admin", FlashLevel::Error, "User not found"));
    }

    tracing::info!(
        target_user_id = target.id,
        user_id = auth.user_id,
        role = ?new_role,
        "User role changed"
    );

    let message = match new_role {
        Role::MaterialAdmin => format!("{} is now a material admin", target.name),
        _ => format!("{} is now a regular user", target.name),
    };

    Ok(redirect_with_flash("/admin", FlashLevel::Success, message))
}

/// Notification form
pub async fn notify_page(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    IdPath(id): IdPath,
    flash: Flash,
) -> ApiResult<Page<NotifyPage>> {
    let recipient = User::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Page::new(flash, Some(auth), NotifyPage { recipient }))
}

/// Send a notification to one user
pub async fn notify_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    IdPath(id): IdPath,
    Form(form): Form<NotifyForm>,
) -> ApiResult<Response> {
    let recipient = User::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let title = form.title.trim();
    let message = form.message.trim();
    if title.is_empty() || message.is_empty() {
        return Err(ApiError::validation(
            "Title and message are required",
            format!("/admin/notify/{}", id),
        ));
    }

    let notification = Notification::create(
        &state.db,
        CreateNotification {
            user_id: recipient.id,
            title: title.to_string(),
            message: message.to_string(),
        },
    )
    .await?;

    tracing::info!(
        notification_id = notification.id,
        recipient_id = recipient.id,
        user_id = auth.user_id,
        "Notification sent"
    );

    Ok(redirect_with_flash(
        "/admin",
        FlashLevel::Success,
        format!("Notification sent to {}", recipient.name),
    ))
}
