pub mod admission;
pub mod auth;
pub mod response;

pub use admission::admission_middleware;
pub use auth::auth_middleware;
pub use response::{ApiResponse, ApiResult};
