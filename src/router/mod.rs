//! Request router: wire DTOs and action dispatch (§4.8).

pub mod dto;
pub mod service;

pub use service::Router;
