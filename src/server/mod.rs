//! HTTP trigger for curation runs.

mod requests_logging;
mod server;
mod state;

pub use server::{is_valid_phone, make_app, run_server};
pub use state::{ServerState, ServiceFactory};
