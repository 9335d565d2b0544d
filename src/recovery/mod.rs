pub mod planner;
pub mod predicates;
pub mod types;

pub use planner::RecoveryPlanner;
pub use predicates::CompletionPredicate;
pub use types::RecoveryPlan;
