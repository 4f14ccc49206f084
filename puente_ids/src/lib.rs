pub mod ids;
pub use ids::*;

pub mod prelude {
    pub use crate::ids::{BehaviorID, NodeID, SubscriptionID};
}
