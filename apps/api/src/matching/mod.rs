// Resume-to-job matching pipeline: prompts → parser → matcher → batch.
// quick.rs serves one-off analyses that are never stored.
// The matcher reaches the outside world only through CompletionClient (the model)
// and AnalysisStore (persistence).

pub mod batch;
pub mod handlers;
pub mod matcher;
pub mod parser;
pub mod prompts;
pub mod quick;

pub use batch::{analyze_batch, BatchItem, BatchRegistry};
pub use matcher::{Matcher, MatcherSettings, Upload};
