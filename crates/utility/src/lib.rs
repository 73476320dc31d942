pub mod gcj02;
pub mod geo;
pub mod id;
