use thiserror::Error;

use crate::models::{Comment, NewComment, NewPost, Post, Profile};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: i64 },
}

/// Checks applied to every record as it crosses into the client
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

fn non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Empty { field })
    } else {
        Ok(())
    }
}

impl Validate for Profile {
    fn validate(&self) -> Result<(), ValidationError> {
        non_empty("full_name", &self.full_name)
    }
}

impl Validate for Post {
    fn validate(&self) -> Result<(), ValidationError> {
        non_empty("author_name", &self.author_name)?;
        non_empty("image_url", &self.image_url)?;
        if self.likes_count < 0 {
            return Err(ValidationError::Negative {
                field: "likes_count",
                value: self.likes_count,
            });
        }
        Ok(())
    }
}

impl Validate for Comment {
    fn validate(&self) -> Result<(), ValidationError> {
        non_empty("author_name", &self.author_name)?;
        non_empty("content", &self.content)
    }
}

impl Validate for NewPost {
    fn validate(&self) -> Result<(), ValidationError> {
        non_empty("author_name", &self.author_name)?;
        non_empty("image_url", &self.image_url)
    }
}

impl Validate for NewComment {
    fn validate(&self) -> Result<(), ValidationError> {
        non_empty("author_name", &self.author_name)?;
        non_empty("content", &self.content)
    }
}
