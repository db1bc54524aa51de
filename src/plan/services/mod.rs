//! Application service for plan records.

mod planning;

pub use planning::{CreatePlanRequest, PlanService, PlanServiceError, PlanServiceResult};
