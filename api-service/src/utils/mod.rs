pub mod validation;

pub use validation::{ApiQuery, ValidatedJson};
