pub mod errors;
pub mod events;
pub mod ids;
pub mod messages;
pub mod state;

pub use errors::ErrorCategory;
pub use events::TaskEvent;
pub use ids::{LoginToken, SessionToken, TaskId};
pub use state::TaskState;
