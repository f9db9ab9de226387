//! API route handlers

pub mod maintenance;
pub mod review;
