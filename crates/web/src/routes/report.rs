//! Issue report form: title, description, optional photo and the
//! browser-detected location.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use civic_pulse_core::{DraftError, ImageUpload, IssueDraft, Location};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::Flash;
use crate::routes::Layout;
use crate::services::IssueError;
use crate::state::AppState;

/// Report form template.
#[derive(Template, WebTemplate)]
#[template(path = "report.html")]
pub struct ReportTemplate {
    pub layout: Layout,
    pub form: ReportForm,
    pub errors: Vec<FieldError>,
    pub error: Option<String>,
}

/// Form values echoed back after a rejected submission.
#[derive(Debug, Default, Clone)]
pub struct ReportForm {
    pub title: String,
    pub description: String,
    pub latitude: String,
    pub longitude: String,
    pub address: String,
}

/// A validation message attached to one form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl From<&DraftError> for FieldError {
    fn from(e: &DraftError) -> Self {
        Self {
            field: e.field(),
            message: e.to_string(),
        }
    }
}

impl ReportTemplate {
    /// Message for `field`, if validation flagged it.
    #[must_use]
    pub fn error_for(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }
}

impl ReportForm {
    /// The location, if both coordinates are present and in range.
    fn location(&self) -> Option<Location> {
        let latitude = self.latitude.trim().parse::<f64>().ok()?;
        let longitude = self.longitude.trim().parse::<f64>().ok()?;
        match Location::new(latitude, longitude, &self.address) {
            Ok(location) => Some(location),
            Err(e) => {
                tracing::debug!(error = %e, "Discarding submitted location");
                None
            }
        }
    }
}

/// Display the report form.
pub async fn form(session: Session, RequireAuth(user): RequireAuth) -> impl IntoResponse {
    ReportTemplate {
        layout: Layout::load(&session, Some(user)).await,
        form: ReportForm::default(),
        errors: Vec::new(),
        error: None,
    }
}

/// Read the multipart body into form values plus the optional photo.
///
/// A file input left empty arrives as a part with no bytes and is ignored.
async fn read_form(mut multipart: Multipart) -> Result<(ReportForm, Option<ImageUpload>)> {
    let mut form = ReportForm::default();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        if name == "image" {
            let file_name = field.file_name().unwrap_or_default().to_owned();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_owned();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            if !data.is_empty() {
                image = Some(ImageUpload {
                    file_name,
                    content_type,
                    data: data.to_vec(),
                });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        match name.as_str() {
            "title" => form.title = value,
            "description" => form.description = value,
            "latitude" => form.latitude = value,
            "longitude" => form.longitude = value,
            "address" => form.address = value,
            _ => {}
        }
    }

    Ok((form, image))
}

/// Handle a report submission.
///
/// Validation failures re-render the form with every message; upload or
/// store failures re-render it with a general error. On success the new
/// issue's page is shown.
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    multipart: Multipart,
) -> Result<Response> {
    let (form, image) = read_form(multipart).await?;
    let draft = IssueDraft {
        title: form.title.clone(),
        description: form.description.clone(),
        image,
        location: form.location(),
    };

    match state.issue_service().submit(&user, draft).await {
        Ok(issue) => {
            let issue_id = issue.id.to_string();
            add_breadcrumb("issue", "Reported issue", Some(&[("issue_id", issue_id.as_str())]));
            Flash::success("Issue reported successfully").push(&session).await;
            Ok(Redirect::to(&format!("/issues/{}", issue.id)).into_response())
        }
        Err(IssueError::Invalid(errors)) => {
            let page = ReportTemplate {
                layout: Layout::without_flash(Some(user)),
                form,
                errors: errors.iter().map(FieldError::from).collect(),
                error: None,
            };
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
        Err(e) => {
            let status = AppError::from(e).into_response().status();
            let page = ReportTemplate {
                layout: Layout::without_flash(Some(user)),
                form,
                errors: Vec::new(),
                error: Some("Failed to submit the issue, please try again".to_owned()),
            };
            Ok((status, page).into_response())
        }
    }
}
