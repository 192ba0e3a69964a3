mod api_client;
mod auth_services;
mod identity;
pub mod platforms;
mod poller;
mod session_store;
mod submissions;

pub use api_client::*;
pub use auth_services::*;
pub use identity::*;
pub use poller::*;
pub use session_store::*;
pub use submissions::*;
