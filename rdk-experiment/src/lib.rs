pub mod block;
pub mod config;
pub mod dots;
pub mod errors;
pub mod partition;
pub mod results;
pub mod state;
pub mod summary;
pub mod trial;

pub use block::generate_block;
pub use config::ExperimentConfig;
pub use dots::DotField;
pub use errors::ExperimentError;
pub use partition::{Partition, signal_count};
pub use results::{read_results_csv, write_results, write_results_csv};
pub use state::{ExperimentEvent, ExperimentStateMachine};
pub use summary::{ConditionSummary, SessionSummary};
pub use trial::{TrialContext, TrialDurations};
