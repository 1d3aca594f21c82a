pub mod clock;
pub mod conversations;
pub mod error;
pub mod logins;
pub mod sessions;

pub use clock::{Clock, ManualClock, SystemClock};
pub use conversations::{ConversationContext, ConversationStore};
pub use error::{LoginError, SessionError};
pub use logins::{LoginRecord, LoginRegistry};
pub use sessions::{Session, SessionRegistry, SESSION_TTL};
