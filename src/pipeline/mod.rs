//! Request pipelines behind the two endpoints. Each one owns its cache and
//! rate limiter and talks to the outside world only through injected
//! capabilities, so tests can swap in fakes.

pub mod extract;
pub mod summarize;

pub use extract::ExtractionPipeline;
pub use summarize::{SummarizationPipeline, SummaryInput, SummaryResult};
