pub mod events;
pub mod transport;

pub use events::EventScheduler;
pub use transport::{TickContext, Transport};
