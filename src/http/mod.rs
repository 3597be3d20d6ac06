pub mod dto;
pub mod handlers;
pub mod routes;
pub mod signature;
pub mod state;

pub use routes::configure_routes;
pub use state::AppState;
