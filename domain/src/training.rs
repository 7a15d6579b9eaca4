//! Exports applied corrections to the trainer service.

use crate::error::Error;
use crate::gateway::trainer::{TrainerClient, TrainingSample};
use entity::annotation::AnnotationKind;
use entity_api::annotation;
use log::*;
use sea_orm::DatabaseConnection;
use serde::Serialize;

/// Outcome of one export run. Individual submission failures are collected
/// here rather than aborting the run; the failed annotations stay applied
/// and are retried next time.
#[derive(Debug, Default, Serialize)]
pub struct ExportReport {
    pub total_processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

/// Submits every applied annotation of the given kind to the trainer.
/// Successful submissions transition to trained; failures record the error
/// on the annotation and leave it applied.
pub async fn process_annotations(
    db: &DatabaseConnection,
    trainer: &TrainerClient,
    kind: AnnotationKind,
) -> Result<ExportReport, Error> {
    let exportable = annotation::find_exportable(db, kind.clone()).await?;
    info!(
        "Exporting {} applied {} annotations",
        exportable.len(),
        kind
    );

    let mut report = ExportReport {
        total_processed: exportable.len(),
        ..Default::default()
    };

    for item in &exportable {
        let payload = serde_json::to_value(&item.payload).unwrap_or_default();
        let sample = TrainingSample {
            annotation_id: item.id,
            conversation_id: item.conversation_id,
            kind: item.kind.to_string(),
            payload,
            applied_at: item.applied_at,
        };

        match trainer.submit_sample(&sample).await {
            Ok(()) => {
                annotation::mark_trained(db, item.id).await?;
                report.succeeded += 1;
            }
            Err(e) => {
                let message = e.to_string();
                warn!("Export of annotation {} failed: {}", item.id, message);
                annotation::set_export_error(db, item.id, message.clone()).await?;
                report.failed += 1;
                report.errors.push(format!("{}: {}", item.id, message));
            }
        }
    }

    info!(
        "Export finished: {} succeeded, {} failed",
        report.succeeded, report.failed
    );
    Ok(report)
}
