//! Job Index Handler

use std::string::ToString;

use salvo::{oapi::ToSchema, prelude::*};
use serde::{Deserialize, Serialize};

use atelier_app::scheduler::{JobOutcome, JobStatus};

use crate::extensions::*;

/// Job Status Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct JobStatusResponse {
    pub name: String,

    pub interval_seconds: u64,

    /// Whether a run is in progress right now
    pub running: bool,

    pub last_started_at: Option<String>,

    pub last_finished_at: Option<String>,

    /// `succeeded` or `failed`
    pub last_result: Option<String>,

    /// Run summary or error message
    pub last_message: Option<String>,
}

impl From<JobStatus> for JobStatusResponse {
    fn from(status: JobStatus) -> Self {
        let (last_result, last_message) = match status.last_outcome {
            Some(JobOutcome::Succeeded { summary }) => (Some("succeeded"), Some(summary)),
            Some(JobOutcome::Failed { error }) => (Some("failed"), Some(error)),
            None => (None, None),
        };

        Self {
            name: status.name,
            interval_seconds: status.interval_seconds,
            running: status.running,
            last_started_at: status.last_started_at.as_ref().map(ToString::to_string),
            last_finished_at: status.last_finished_at.as_ref().map(ToString::to_string),
            last_result: last_result.map(ToString::to_string),
            last_message,
        }
    }
}

/// Jobs Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct JobsResponse {
    pub jobs: Vec<JobStatusResponse>,
}

/// Job Index Handler
#[endpoint(
    tags("admin"),
    summary = "List Scheduled Jobs",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::OK, description = "Job status"),
        (status_code = StatusCode::UNAUTHORIZED, description = "Unauthorized"),
    ),
)]
pub(crate) async fn handler(depot: &mut Depot) -> Result<Json<JobsResponse>, StatusError> {
    let state = depot.state()?;

    Ok(Json(JobsResponse {
        jobs: state.app.jobs.status().into_iter().map(Into::into).collect(),
    }))
}
