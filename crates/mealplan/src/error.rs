use thiserror::Error;

use crate::RemoteError;

#[derive(Error, Debug)]
pub enum MealPlanError {
    #[error("{0}")]
    Invalid(#[from] imkitchen_shared::Error),

    #[error("Remote call failed: {0}")]
    Remote(#[from] RemoteError),
}

impl MealPlanError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Invalid(err) if err.is_validation())
    }
}

impl From<validator::ValidationErrors> for MealPlanError {
    fn from(value: validator::ValidationErrors) -> Self {
        Self::Invalid(value.into())
    }
}

pub type Result<T> = std::result::Result<T, MealPlanError>;
