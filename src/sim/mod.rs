//! Turn simulation: country economies, the relations graph, diplomacy and
//! the relation-effects ledger

pub mod audit;
pub mod diplomacy;
pub mod economy;
pub mod effects;
pub mod events;
pub mod influence;
pub mod policy;
pub mod relations;
pub mod snapshot;
pub mod state;
pub mod turn;

pub use audit::{check_invariants, Checksum, InvariantViolation};
pub use diplomacy::{ActionKind, ActionRejected, ActionRequest, ActionSource, PlannedAction};
pub use effects::RelationEffects;
pub use events::{Event, EventKind, EventLog};
pub use influence::InfluenceHint;
pub use policy::{Policy, PolicyRejected, PolicyUpdate, Stance};
pub use relations::{Posture, RelationEdge, RelationGraph};
pub use snapshot::{rehydrate, rehydrate_str, Snapshot};
pub use state::{CountryState, SimState};
pub use turn::{simulate_turn, simulate_turns};
