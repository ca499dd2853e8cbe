/// Notification mailbox
///
/// # Endpoints
///
/// - `GET  /notifications` - The caller's notifications, newest first
/// - `POST /notify/reply` - Reply to the main administrator (form: `text`)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    flash::{redirect_with_flash, Flash, FlashLevel, Page},
};
use axum::{extract::State, response::Response, Extension, Form};
use kutubxona_shared::{
    auth::middleware::AuthContext,
    models::{
        notification::{CreateNotification, Notification},
        user::User,
    },
};
use serde::{Deserialize, Serialize};

/// Mailbox body
#[derive(Debug, Serialize)]
pub struct MailboxPage {
    pub notifications: Vec<Notification>,
}

/// Reply form
#[derive(Debug, Deserialize)]
pub struct ReplyForm {
    #[serde(default)]
    pub text: String,
}

/// Mailbox
pub async fn mailbox(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    flash: Flash,
) -> ApiResult<Page<MailboxPage>> {
    let notifications = Notification::list_for_user(&state.db, auth.user_id).await?;

    Ok(Page::new(flash, Some(auth), MailboxPage { notifications }))
}

/// Reply to the main administrator
///
/// The recipient is the first account ever created, which is the seeded
/// super admin on a fresh install.
pub async fn reply(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Form(form): Form<ReplyForm>,
) -> ApiResult<Response> {
    let text = form.text.trim();
    if text.is_empty() {
        return Err(ApiError::validation("Message text is required", "/notifications"));
    }

    let recipient = User::first_created(&state.db)
        .await?
        .ok_or(ApiError::NotFound)?;

    Notification::create(
        &state.db,
        CreateNotification {
            user_id: recipient.id,
            title: format!("Reply from {}", auth.name),
            message: text.to_string(),
        },
    )
    .await?;

    tracing::info!(
        user_id = auth.user_id,
        recipient_id = recipient.id,
        "Reply sent"
    );

    Ok(redirect_with_flash("/notifications", FlashLevel::Success, "Reply sent"))
}
