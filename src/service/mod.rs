//! Session service layer.
//!
//! Ties the solvers to a long-lived session: a current-solution slot that is
//! replaced atomically, a best-effort subscriber registry for push events,
//! the end-to-end [`FleetOptimizer`] and the periodic
//! [`ReOptimizationScheduler`].

mod events;
mod optimizer;
mod scheduler;
mod state;

pub use events::FleetEvent;
pub use optimizer::FleetOptimizer;
pub use scheduler::ReOptimizationScheduler;
pub use state::{SessionState, Status, SubscriberId, SubscriberRegistry};
