//! # Client
//!
//! Request stack, bottom to top:
//!
//! - [`transport`]: one HTTP exchange, no interpretation
//! - [`authenticated`]: credential attachment and single-retry renewal
//! - [`api`]: typed endpoint wrappers

pub mod api;
pub mod authenticated;
pub mod transport;

pub use api::ImageryApi;
pub use authenticated::AuthenticatedClient;
pub use transport::{
    ApiRequest, ApiResponse, HttpMethod, HttpTransport, RequestBody, ReqwestTransport,
};
