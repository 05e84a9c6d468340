mod artifacts;
mod model_id;
mod task;
mod trained_model;

pub use artifacts::*;
pub use model_id::*;
pub use task::*;
pub use trained_model::*;
