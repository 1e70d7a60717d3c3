mod clock;
mod error;
pub mod greedy;
mod params;
mod partition;
mod resolver;
pub mod rollout;
mod search;
mod session;

pub use clock::{Clock, SystemClock, TickClock};
pub use error::SearchError;
pub use params::{DEFAULT_DEPTH_LIMIT, SearchParams, TimePolicy};
pub use partition::PartitionedArray;
pub use resolver::PlacementResolver;
pub use search::{CandidateStats, DecisionStats, SearchController};
pub use session::{CellList, SearchSession, SessionError};
