use std::{future::Future, pin::Pin};

use axum::http::StatusCode;
use bayreuth_meal_api::{MensaType, UnknownMensa};
use tokio_cron_scheduler::{JobScheduler, JobSchedulerError};

pub trait Pinable: Sized {
    fn pin(self) -> Pin<Box<Self>> { Box::pin(self) }
}

impl<F: Future> Pinable for F {}

pub async fn register_jobs<'a, F>(
    reg: impl FnOnce(JobScheduler) -> F + 'a,
) -> Result<JobScheduler, JobSchedulerError>
where F: Future<Output = Result<JobScheduler, JobSchedulerError>>
{
    tracing::info!("starting cron job");
    let shed = JobScheduler::new().await?;
    let shed = reg(shed).await?;
    shed.start().await?;

    tracing::info!("started cron job");
    Ok(shed)
}

pub type ApiError = (StatusCode, String);

pub fn parse_mensa(mensa: &str) -> Result<MensaType, ApiError> {
    mensa.parse().map_err(|err: UnknownMensa| {
        (StatusCode::BAD_REQUEST, format!("ERROR: {err}"))
    })
}

pub fn server_error(err: impl std::fmt::Display) -> ApiError {
    tracing::error!("could not build feed: {err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("ERROR: failed to build the mensa feed"),
    )
}
