pub mod app_user;
pub mod audit_trail;
pub mod department;
pub mod employee;
