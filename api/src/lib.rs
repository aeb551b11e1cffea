//! Core services for the employee records backend: access policy, audit
//! logging and the user/department/employee domain services. Everything here
//! takes the acting user explicitly; there is no ambient principal.

pub mod access;
pub mod audit;
pub mod departments;
pub mod employees;
pub mod error;
pub mod seed;
pub mod users;

pub use error::{ApiError, ApiResult};
