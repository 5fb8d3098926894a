pub mod credential_request;
pub mod credential_route;
