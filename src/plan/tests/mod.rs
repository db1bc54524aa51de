//! Unit tests for plan records.

mod file_adapter_tests;

use crate::OrchestrationId;

pub(super) fn orchestration(raw: &str) -> OrchestrationId {
    OrchestrationId::new(raw).expect("orchestration identifier should be valid")
}
