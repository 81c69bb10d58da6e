pub mod ai;
pub mod health;
pub mod sessions;

pub use health::health_check;
