mod api_error;
mod event;
mod progress;
mod retry;
mod session;
mod solution;
mod storage;
mod submission;
pub mod wire;

pub use api_error::*;
pub use event::*;
pub use progress::*;
pub use retry::*;
pub use session::*;
pub use solution::*;
pub use storage::*;
pub use submission::*;
