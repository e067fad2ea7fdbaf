pub mod access;
pub mod dto;
mod logs;
mod members;
mod notes;
pub mod response;
mod router;
mod spaces;
mod tags;
mod users;
pub mod validation;

pub use router::{AppState, create_router};
