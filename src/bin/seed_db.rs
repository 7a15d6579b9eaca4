use domain::{AnnotationPayload, MemoryItem, Segment, SegmentType};
use log::{error, info};
use service::{config::Config, logging::Logger};
use std::sync::Arc;
use uuid::Uuid;

/// Seeds a demo conversation with a short transcript, a memory item, and a
/// few pending corrections to exercise the preview and apply paths.
#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config as &Config);

    info!("Seeding database [{}]...", config.database_url());

    let db = match service::init_database(&config).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to establish database connection: {e}");
            std::process::exit(1);
        }
    };

    let segments = vec![
        Segment {
            index: 0,
            speaker: "Speaker 1".to_string(),
            text: "Morning everyone, lets get started.".to_string(),
            segment_type: SegmentType::Speech,
            start: 0.0,
            end: 4.2,
        },
        Segment {
            index: 1,
            speaker: "Speaker 2".to_string(),
            text: "I pushed the new kubernetes manifests yesterday.".to_string(),
            segment_type: SegmentType::Speech,
            start: 4.2,
            end: 9.8,
        },
        Segment {
            index: 2,
            speaker: "Speaker 1".to_string(),
            text: "Great, we can role them out after the demo.".to_string(),
            segment_type: SegmentType::Speech,
            start: 9.8,
            end: 14.1,
        },
    ];
    let memory = vec![MemoryItem {
        id: Uuid::new_v4(),
        text: "The team deploys with Kubernetes.".to_string(),
    }];

    let conversation = match domain::conversation::create(
        db.as_ref(),
        "Untitled meeting".to_string(),
        segments,
        Some(memory),
    )
    .await
    {
        Ok(conversation) => conversation,
        Err(e) => {
            error!("Failed to seed conversation: {e}");
            std::process::exit(1);
        }
    };
    info!("Seeded conversation {}", conversation.id);

    let corrections = vec![
        AnnotationPayload::Diarization {
            segment_index: 0,
            original_speaker: "Speaker 1".to_string(),
            corrected_speaker: "Dana".to_string(),
            segment_start_time: 0.0,
        },
        AnnotationPayload::TranscriptEdit {
            segment_index: 2,
            original_text: "Great, we can role them out after the demo.".to_string(),
            corrected_text: "Great, we can roll them out after the demo.".to_string(),
        },
        AnnotationPayload::TitleEdit {
            original_text: "Untitled meeting".to_string(),
            corrected_text: "Deploy planning standup".to_string(),
        },
    ];
    for payload in corrections {
        if let Err(e) = domain::annotation::upsert(db.as_ref(), conversation.id, payload).await {
            error!("Failed to seed annotation: {e}");
            std::process::exit(1);
        }
    }

    info!(
        "Seeded demo annotations for conversation {}",
        conversation.id
    );
}
