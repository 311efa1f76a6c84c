//! Data Transfer Objects for REST request/response serialization.

pub mod award_dto;
pub mod draw_dto;

pub use award_dto::*;
pub use draw_dto::*;
