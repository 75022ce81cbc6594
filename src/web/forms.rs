//! Form submissions: contact, comments and newsletter signup

use axum::{
    extract::{OriginalUri, State},
    http::StatusCode,
    response::{Html, Redirect},
    Form,
};
use serde::{Deserialize, Serialize};
use tera::Context as TeraContext;

use super::{render_page, WebError};
use crate::api::middleware::{AppState, Viewer};
use crate::models::CreateContactInput;
use crate::services::ContactServiceError;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    pub post_id: i64,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct NewsletterForm {
    #[serde(default)]
    pub email: String,
}

fn contact_context(form: &ContactForm, success: bool, error_message: &str) -> TeraContext {
    let mut context = TeraContext::new();
    context.insert("form", form);
    context.insert("success", &success);
    context.insert("error_message", error_message);
    context
}

/// GET /contact
pub async fn contact_form(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
) -> Result<Html<String>, WebError> {
    let context = contact_context(&ContactForm::default(), false, "");
    render_page(&state, &viewer, uri.path(), "contact.html", context).await
}

/// POST /contact
///
/// Invalid input re-renders the form with the submitted values.
pub async fn submit_contact(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    Form(form): Form<ContactForm>,
) -> Result<(StatusCode, Html<String>), WebError> {
    let input = CreateContactInput {
        name: form.name.clone(),
        email: form.email.clone(),
        subject: form.subject.clone(),
        message: form.message.clone(),
    };

    let (status, context) = match state.contact_service.submit(input).await {
        Ok(_) => (StatusCode::OK, contact_context(&ContactForm::default(), true, "")),
        Err(ContactServiceError::ValidationError(_, msg)) => {
            (StatusCode::BAD_REQUEST, contact_context(&form, false, &msg))
        }
        Err(e) => return Err(e.into()),
    };

    let html = render_page(&state, &viewer, uri.path(), "contact.html", context).await?;
    Ok((status, html))
}

/// POST /comments
///
/// Signed-in readers only; redirects back to the comment list.
pub async fn submit_comment(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(form): Form<CommentForm>,
) -> Result<Redirect, WebError> {
    let user = viewer
        .user()
        .ok_or_else(|| WebError::unauthorized("Please sign in to comment."))?;

    state
        .comment_service
        .create(user.id, form.post_id, &form.content)
        .await?;

    Ok(Redirect::to(&format!("/posts/{}#comments", form.post_id)))
}

/// POST /newsletter
pub async fn subscribe(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    Form(form): Form<NewsletterForm>,
) -> Result<Html<String>, WebError> {
    let subscription = state.newsletter_service.subscribe(&form.email).await?;

    let mut context = TeraContext::new();
    context.insert("heading", "Thanks for subscribing");
    context.insert(
        "message",
        &format!("We will send the latest news to {}.", subscription.email),
    );
    render_page(&state, &viewer, uri.path(), "message.html", context).await
}
