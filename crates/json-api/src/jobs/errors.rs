//! Errors

use salvo::http::StatusError;

use atelier_app::scheduler::JobError;

pub(crate) fn into_status_error(error: JobError) -> StatusError {
    match error {
        JobError::NotFound(_) => StatusError::not_found().brief(error.to_string()),
        JobError::AlreadyRunning(_) => StatusError::conflict().brief(error.to_string()),
        JobError::Failed(_) => StatusError::internal_server_error().brief(error.to_string()),
    }
}
