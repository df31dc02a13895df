pub mod direction;
pub mod dot;
pub mod phase;
pub mod trial;

pub use direction::{Direction, InvalidDirection};
pub use dot::{Dot, DotRole};
pub use phase::{Phase, StandardPhase};
pub use trial::{TrialDef, TrialRecord, TrialResult, TrialState};
