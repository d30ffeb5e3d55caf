mod admin;
pub(crate) mod auth;
mod public;

pub use admin::{AdminState, build_admin_router};
pub use public::{PublicState, build_public_router};
