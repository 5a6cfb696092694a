mod rules;
mod types;

pub use rules::*;
pub use types::*;
