pub mod affect;
pub mod config;
pub mod error;
pub mod event_bus;
pub mod events;
pub mod message;
pub mod need;
pub mod persist;
pub mod traits;

pub mod prelude {
    pub use crate::affect::{GrudgeState, Pad, PadDelta};
    pub use crate::config::Config;
    pub use crate::error::CoreError;
    pub use crate::event_bus::{EventBus, EventHandler};
    pub use crate::events::{Event, EventKind, EventPayload};
    pub use crate::message::{Message, Role};
    pub use crate::need::Need;
    pub use crate::traits::{
        ActivitySensor, HibernationGate, LlmClient, LlmMessage, ResourceProbe, ResourceSample,
        Transport,
    };
}
