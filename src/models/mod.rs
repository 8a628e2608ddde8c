pub mod appointment;
pub mod chat;
pub mod employee;
pub mod password_reset;
pub mod payroll;
pub mod post;
pub mod report;
pub mod user;
