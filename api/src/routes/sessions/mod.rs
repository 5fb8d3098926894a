pub mod session_dto;
pub mod session_route;
