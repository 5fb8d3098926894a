pub mod ask;
pub mod credential;
pub mod health_route;
pub mod sessions;
