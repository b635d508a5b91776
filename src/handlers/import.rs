use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use tower_cookies::Cookies;
use tracing::{debug, info, warn};

use crate::auth::Caller;
use crate::db::queries::expenses;
use crate::error::{AppError, AppResult};
use crate::flash;
use crate::services::csv_parser::parse_expense_csv;
use crate::state::AppState;

/// Multipart field carrying the uploaded file.
const FILE_FIELD: &str = "csv_file";

struct UploadedFile {
    file_name: String,
    content: Vec<u8>,
}

async fn read_upload(multipart: &mut Multipart) -> Result<Option<UploadedFile>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("").trim().to_string();
        let content = field.bytes().await?.to_vec();

        return Ok(Some(UploadedFile { file_name, content }));
    }
    Ok(None)
}

fn is_csv_file_name(name: &str) -> bool {
    name.rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && ext.eq_ignore_ascii_case("csv"))
}

/// Imports every row of an uploaded CSV for the caller, or none of them.
pub async fn upload(
    State(state): State<AppState>,
    caller: Caller,
    cookies: Cookies,
    mut multipart: Multipart,
) -> AppResult<Redirect> {
    let user_id = caller.require()?;

    let file = match read_upload(&mut multipart).await {
        Ok(Some(file)) if !file.file_name.is_empty() => file,
        Err(e) => {
            warn!(user_id, status = %e.status(), "Unreadable upload: {}", e.body_text());
            let reason = if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                "file is too large".to_string()
            } else {
                e.body_text()
            };
            flash::error(&cookies, format!("Error importing CSV: {}", reason));
            return Ok(Redirect::to("/"));
        }
        Ok(_) => {
            warn!(user_id, "Upload without a file");
            flash::error(&cookies, "No file selected");
            return Ok(Redirect::to("/"));
        }
    };

    if !is_csv_file_name(&file.file_name) {
        warn!(user_id, file_name = %file.file_name, "Rejected non-CSV upload");
        flash::error(&cookies, "Invalid file type. Please upload a CSV file.");
        return Ok(Redirect::to("/"));
    }

    debug!(user_id, file_name = %file.file_name, size_bytes = file.content.len(), "Received CSV file");

    let rows = match parse_expense_csv(&file.content) {
        Ok(rows) => rows,
        Err(e) => {
            flash::error(&cookies, AppError::from(e).to_string());
            return Ok(Redirect::to("/"));
        }
    };

    let mut conn = state.db.get()?;
    let count = expenses::insert_expenses(&mut conn, user_id, &rows)?;
    info!(user_id, count, file_name = %file.file_name, "Imported expenses from CSV");

    flash::success(&cookies, "CSV imported successfully!");
    Ok(Redirect::to("/"))
}
