pub mod card;
pub mod error;
pub mod lookup;

pub use card::AgentCard;
pub use error::EngineError;
pub use lookup::{LookupAgent, WeatherLookup};
