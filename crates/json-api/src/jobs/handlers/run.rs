//! Run Job Handler

use salvo::{oapi::extract::PathParam, prelude::*};

use crate::{extensions::*, jobs::errors::into_status_error};

/// Run Job Handler
///
/// Starts a run in the background; poll the job index for its outcome.
#[endpoint(
    tags("admin"),
    summary = "Run Job Now",
    security(("bearer_auth" = [])),
    responses(
        (status_code = StatusCode::ACCEPTED, description = "Run started"),
        (status_code = StatusCode::NOT_FOUND, description = "Job not found"),
        (status_code = StatusCode::CONFLICT, description = "Job is already running"),
        (status_code = StatusCode::UNAUTHORIZED, description = "Unauthorized"),
    ),
)]
pub(crate) async fn handler(
    job: PathParam<String>,
    depot: &mut Depot,
) -> Result<StatusCode, StatusError> {
    let state = depot.state()?;

    state
        .app
        .jobs
        .trigger(&job.into_inner())
        .map_err(into_status_error)?;

    Ok(StatusCode::ACCEPTED)
}

#[cfg(test)]
mod tests {
    use salvo::test::TestClient;
    use testresult::TestResult;

    use atelier_app::scheduler::{JobError, MockJobsService};

    use crate::jobs::handlers::tests::jobs_service;

    use super::*;

    fn make_service(jobs: MockJobsService) -> Service {
        jobs_service(jobs, Router::with_path("admin/jobs/{job}/run").post(handler))
    }

    #[tokio::test]
    async fn test_run_job_is_accepted() -> TestResult {
        let mut jobs = MockJobsService::new();

        jobs.expect_trigger()
            .once()
            .withf(|name| name == "cart-expiry-sweep")
            .returning(|_| Ok(()));

        let res = TestClient::post("http://example.com/admin/jobs/cart-expiry-sweep/run")
            .send(&make_service(jobs))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::ACCEPTED));

        Ok(())
    }

    #[tokio::test]
    async fn test_run_unknown_job_is_404() -> TestResult {
        let mut jobs = MockJobsService::new();

        jobs.expect_trigger()
            .once()
            .returning(|name| Err(JobError::NotFound(name.to_string())));

        let res = TestClient::post("http://example.com/admin/jobs/reindex/run")
            .send(&make_service(jobs))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));

        Ok(())
    }

    #[tokio::test]
    async fn test_run_busy_job_is_409() -> TestResult {
        let mut jobs = MockJobsService::new();

        jobs.expect_trigger()
            .once()
            .returning(|name| Err(JobError::AlreadyRunning(name.to_string())));

        let res = TestClient::post("http://example.com/admin/jobs/cart-expiry-sweep/run")
            .send(&make_service(jobs))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::CONFLICT));

        Ok(())
    }
}
