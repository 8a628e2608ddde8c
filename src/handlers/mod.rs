pub mod appointment;
pub mod auth;
pub mod chat;
pub mod dashboard;
pub mod employee;
pub mod file;
pub mod payroll;
pub mod post;
pub mod report;
pub mod user;
