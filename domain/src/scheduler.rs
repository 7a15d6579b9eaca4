//! Cron-style scheduling of training export jobs.
//!
//! Jobs live in the `cron_jobs` table. A background dispatcher ticks on an
//! interval, finds enabled jobs whose `next_run` has passed, and runs them.
//! The `running` column doubles as a cross-process guard so two instances
//! never run the same job concurrently.

use crate::error::Error;
use crate::gateway::trainer::TrainerClient;
use crate::training::{self, ExportReport};
use chrono::{DateTime, FixedOffset, Utc};
use cron::Schedule;
use entity::annotation::AnnotationKind;
use entity::cron_jobs::Model;
use entity_api::cron_job;
use log::*;
use sea_orm::DatabaseConnection;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub const SPEAKER_FINETUNING: &str = "speaker_finetuning";
pub const ASR_JARGON_EXTRACTION: &str = "asr_jargon_extraction";

/// The annotation kind a job exports, or None for an unknown job id.
pub fn export_kind(job_id: &str) -> Option<AnnotationKind> {
    match job_id {
        SPEAKER_FINETUNING => Some(AnnotationKind::Diarization),
        ASR_JARGON_EXTRACTION => Some(AnnotationKind::TranscriptEdit),
        _ => None,
    }
}

/// The next fire time of a schedule expression after the given instant.
/// Expressions use the seconds-field cron syntax, e.g. `0 0 3 * * *` for
/// daily at 03:00.
pub fn next_run_after(
    schedule: &str,
    after: DateTime<Utc>,
) -> Result<Option<DateTime<FixedOffset>>, Error> {
    let schedule = Schedule::from_str(schedule)
        .map_err(|e| Error::validation(format!("invalid cron expression: {}", e)))?;
    Ok(schedule.after(&after).next().map(|next| next.into()))
}

pub async fn list(db: &DatabaseConnection) -> Result<Vec<Model>, Error> {
    Ok(cron_job::find_all(db).await?)
}

pub async fn get(db: &DatabaseConnection, job_id: &str) -> Result<Model, Error> {
    Ok(cron_job::find_by_id(db, job_id).await?)
}

/// Enables or disables a job. Enabling computes a fresh `next_run`;
/// disabling clears it.
pub async fn toggle(db: &DatabaseConnection, job_id: &str, enabled: bool) -> Result<Model, Error> {
    let job = cron_job::find_by_id(db, job_id).await?;
    let next_run = if enabled {
        next_run_after(&job.schedule, Utc::now())?
    } else {
        None
    };
    Ok(cron_job::set_enabled(db, job_id, enabled, next_run).await?)
}

/// Replaces a job's schedule. The expression is validated before it is
/// stored, and `next_run` is recomputed when the job is enabled.
pub async fn set_schedule(
    db: &DatabaseConnection,
    job_id: &str,
    schedule: String,
) -> Result<Model, Error> {
    let job = cron_job::find_by_id(db, job_id).await?;
    let next_run = next_run_after(&schedule, Utc::now())?;
    let next_run = if job.enabled { next_run } else { None };
    Ok(cron_job::set_schedule(db, job_id, schedule, next_run).await?)
}

/// Runs a job immediately, regardless of its schedule or enabled flag.
/// Fails with a conflict when the job is already mid-run.
pub async fn run_now(
    db: &DatabaseConnection,
    trainer: &TrainerClient,
    job_id: &str,
) -> Result<ExportReport, Error> {
    let job = cron_job::find_by_id(db, job_id).await?;

    if !cron_job::try_begin_run(db, job_id).await? {
        info!("Cron job {:?} is already running", job_id);
        return Err(Error::conflict());
    }

    let outcome = execute(db, trainer, &job).await;

    let finished_at = Utc::now();
    let next_run = if job.enabled {
        next_run_after(&job.schedule, finished_at).ok().flatten()
    } else {
        None
    };
    let last_error = match &outcome {
        Err(e) => Some(e.to_string()),
        Ok(report) if report.failed > 0 => Some(report.errors.join("; ")),
        Ok(_) => None,
    };
    cron_job::finish_run(db, job_id, finished_at.into(), next_run, last_error).await?;

    outcome
}

async fn execute(
    db: &DatabaseConnection,
    trainer: &TrainerClient,
    job: &Model,
) -> Result<ExportReport, Error> {
    match export_kind(&job.id) {
        Some(kind) => training::process_annotations(db, trainer, kind).await,
        None => Err(Error::validation(format!(
            "no export kind registered for job {:?}",
            job.id
        ))),
    }
}

/// Background loop that fires due jobs. Runs until the process exits.
pub async fn run_dispatcher(
    db: Arc<DatabaseConnection>,
    trainer: Arc<TrainerClient>,
    tick: Duration,
) {
    info!("Starting cron dispatcher ticking every {:?}", tick);
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        if let Err(e) = dispatch_due(&db, &trainer).await {
            error!("Cron dispatch pass failed: {}", e);
        }
    }
}

async fn dispatch_due(db: &DatabaseConnection, trainer: &TrainerClient) -> Result<(), Error> {
    let now = Utc::now();
    for job in cron_job::find_all(db).await? {
        if !job.enabled {
            continue;
        }
        let due = job
            .next_run
            .map(|next| next.with_timezone(&Utc) <= now)
            .unwrap_or(false);
        if !due {
            continue;
        }

        match run_now(db, trainer, &job.id).await {
            Ok(report) => info!(
                "Cron job {:?} exported {} annotations ({} failed)",
                job.id, report.succeeded, report.failed
            ),
            Err(e) if e.error_kind == crate::error::DomainErrorKind::Conflict => {
                debug!("Cron job {:?} skipped, already running", job.id);
            }
            Err(e) => error!("Cron job {:?} failed: {}", job.id, e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn export_kind_maps_known_jobs() {
        assert_eq!(
            export_kind(SPEAKER_FINETUNING),
            Some(AnnotationKind::Diarization)
        );
        assert_eq!(
            export_kind(ASR_JARGON_EXTRACTION),
            Some(AnnotationKind::TranscriptEdit)
        );
        assert_eq!(export_kind("mystery_job"), None);
    }

    #[test]
    fn next_run_after_advances_to_the_next_firing() {
        let after = Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 0).unwrap();

        let next = next_run_after("0 0 3 * * *", after)
            .expect("valid expression")
            .expect("schedule never ends");

        let expected = Utc.with_ymd_and_hms(2025, 6, 2, 3, 0, 0).unwrap();
        assert_eq!(next.with_timezone(&Utc), expected);
    }

    #[test]
    fn next_run_after_rejects_garbage() {
        assert!(next_run_after("every day at 3", Utc::now()).is_err());
    }
}
