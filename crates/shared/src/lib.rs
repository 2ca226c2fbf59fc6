mod error;
pub mod mealplan;

pub use error::*;
