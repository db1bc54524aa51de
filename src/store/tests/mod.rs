//! Unit tests for the persistent store.

mod atomic_tests;

use crate::OrchestrationId;
use crate::store::{Record, RecordKind, Salvage, StoreConfig};
use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

/// Minimal record used to exercise the store independently of the domain
/// record kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Note {
    pub(super) id: String,
    pub(super) orchestration_id: OrchestrationId,
    pub(super) body: String,
    pub(super) updated_at: DateTime<Utc>,
}

impl Note {
    pub(super) fn new(id: &str, orchestration: &str, body: &str) -> Self {
        Self {
            id: id.to_owned(),
            orchestration_id: OrchestrationId::new(orchestration).expect("valid orchestration"),
            body: body.to_owned(),
            updated_at: Utc::now(),
        }
    }
}

impl Record for Note {
    const KIND: RecordKind = RecordKind::Plan;

    fn record_id(&self) -> String {
        self.id.clone()
    }

    fn orchestration_id(&self) -> &OrchestrationId {
        &self.orchestration_id
    }

    fn sort_timestamp(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn validate(&self) -> Vec<String> {
        if self.body.trim().is_empty() {
            vec!["body must not be empty".to_owned()]
        } else {
            Vec::new()
        }
    }

    fn reconstruct(id_hint: &str, salvage: &Salvage, now: DateTime<Utc>) -> Self {
        Self {
            id: id_hint.to_owned(),
            orchestration_id: salvage
                .string("orchestrationId")
                .and_then(|raw| OrchestrationId::new(raw).ok())
                .unwrap_or_else(|| OrchestrationId::new("recovered").expect("valid orchestration")),
            body: salvage.string("body").unwrap_or("(recovered)").to_owned(),
            updated_at: salvage.timestamp("updatedAt").unwrap_or(now),
        }
    }
}

/// Creates a temporary data directory and a configuration rooted in it.
pub(super) fn temp_config() -> (TempDir, StoreConfig) {
    let dir = tempfile::tempdir().expect("temporary directory should be created");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
        .expect("temporary directory path should be UTF-8");
    (dir, StoreConfig::new(root))
}
