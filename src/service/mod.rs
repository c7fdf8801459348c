//! Business logic layer

pub mod profile;
