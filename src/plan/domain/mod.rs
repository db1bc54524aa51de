//! Domain model for plan records.
//!
//! A plan is the output of the planning phase: a title, a summary, the
//! requirements it was derived from and the ordered tasks it produced.

mod error;
mod ids;
mod plan;

pub use error::PlanDomainError;
pub use ids::PlanId;
pub use plan::{NewPlan, PersistedPlanData, Plan};
