mod queries;
mod types;
mod workflow;

pub use queries::*;
pub use types::*;
pub use workflow::*;
