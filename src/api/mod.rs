pub mod dto;
pub mod route;
pub mod routes;

pub use route::create_router;
pub use routes::AppState;
