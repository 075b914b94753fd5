mod ask;
mod eval;
mod serve;

pub use ask::AskArgs;
pub use eval::EvalArgs;
pub use serve::ServeArgs;

pub use ask::handle_ask;
pub use eval::handle_eval;
pub use serve::handle_serve;
