/// Alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while parsing or validating core data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// A key or mouse mode string was not `pressed`, `held`, or `released`.
    #[error("unknown input mode \"{0}\" (expected pressed, held, or released)")]
    UnknownInputMode(String),

    /// A stage edge string was not one of the known edges.
    #[error("unknown edge \"{0}\" (expected any, left, right, top, or bottom)")]
    UnknownEdge(String),

    /// An easing curve name was not recognized.
    #[error("unknown easing \"{0}\"")]
    UnknownEasing(String),

    /// A mouse button name was not recognized.
    #[error("unknown mouse button \"{0}\"")]
    UnknownMouseButton(String),

    /// A costume name does not exist on the entity.
    #[error("no costume named \"{0}\"")]
    UnknownCostume(String),
}
