use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Unknown easing curve: {0}")]
    UnknownEasing(String),

    #[error("Cannot animate attribute '{attr}': unsupported value {value:?}")]
    InvalidAnimationValue { attr: String, value: String },

    #[error("Cannot animate attribute '{attr}': 'from' and 'to' are different kinds of value")]
    MismatchedAnimationValues { attr: String },

    #[error("Invalid renderer config: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RenderError>;
