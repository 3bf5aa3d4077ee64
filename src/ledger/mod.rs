pub mod reconcile;
pub mod transition;

pub use reconcile::{reconcile_group, ReconcileError, ReconcileOutcome};
pub use transition::{transition_effect, TransitionEffect};
