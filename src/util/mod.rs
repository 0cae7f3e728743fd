pub mod persistence;
pub mod roman;
