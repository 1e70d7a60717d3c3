pub mod bot;
pub mod policy;

pub use bot::{
    CandidateStats, CellList, Clock, DecisionStats, PartitionedArray, PlacementResolver,
    SearchController, SearchError, SearchParams, SearchSession, SessionError, SystemClock,
    TickClock, TimePolicy,
};
pub use policy::{MonteCarloPlayer, Player};
