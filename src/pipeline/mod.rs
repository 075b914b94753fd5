mod qa;
mod state;

pub use qa::{QaPipeline, SharedServices};
pub use state::{RequestState, Stage};
