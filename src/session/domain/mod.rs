//! Session domain model: lifecycle, context, reasoning traces and the
//! hierarchy index.

mod context;
mod error;
mod ids;
mod navigation;
mod session;
mod state;
mod summary;
mod thinking;

pub use context::{
    Artifact, ArtifactKind, ContextMessage, Decision, MessageRole, SessionContext,
    SessionMetadata,
};
pub use error::{ParseSessionStateError, ParseSessionTypeError, SessionDomainError};
pub use ids::{SessionId, ThinkingId};
pub use navigation::{
    Breadcrumb, HierarchyIssue, HierarchyNode, HierarchyRepair, ListingFix, NavigationHistory,
    RelatedSessions, SessionIndex, TimelineEntry,
};
pub use session::{NewSession, PersistedSessionData, Session};
pub use state::{SessionState, SessionType};
pub use summary::{RECENT_DECISIONS, SessionSummary, recent_decisions};
pub use thinking::{
    ThinkingMetadata, ThinkingSession, ThinkingState, ThinkingStep, ThinkingStepInput,
};
