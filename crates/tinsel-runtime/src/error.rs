use std::any::Any;

use tinsel_core::{CoreError, EntityId};

/// Alias for `Result<T, RuntimeError>`.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Alias for the result type returned by behavior bodies.
pub type BehaviorResult<T> = Result<T, BehaviorError>;

/// Problems detected while declaring types, scenes, or suspensions.
///
/// These fail fast, before the scheduler admits the offending entity.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistrationError {
    /// A behavior table declares two MAIN behaviors.
    #[error("entity type \"{0}\" declares more than one main behavior")]
    DuplicateMain(String),

    /// A behavior table was registered twice under the same type name.
    #[error("entity type \"{0}\" is already registered")]
    DuplicateType(String),

    /// An entity or scene refers to a type that was never registered.
    #[error("unknown entity type \"{0}\"")]
    UnknownType(String),

    /// A scene was registered twice under the same name.
    #[error("scene \"{0}\" is already registered")]
    DuplicateScene(String),

    /// A trigger string could not be parsed.
    #[error("invalid trigger on \"{type_name}\": {source}")]
    InvalidTrigger {
        /// The type being declared.
        type_name: String,
        /// The parse failure.
        #[source]
        source: CoreError,
    },

    /// A persistent entry point was declared for a one-shot trigger, or the
    /// other way round.
    #[error("trigger {trigger} on \"{type_name}\" needs a {expected} entry point")]
    EntryMismatch {
        /// The type being declared.
        type_name: String,
        /// The trigger, rendered for display.
        trigger: String,
        /// `routine` or `handler`.
        expected: &'static str,
    },

    /// A broadcast or collision name was empty.
    #[error("empty target name in {trigger} on \"{type_name}\"")]
    EmptyName {
        /// The type being declared.
        type_name: String,
        /// The trigger kind.
        trigger: &'static str,
    },

    /// A suspension with a negative duration was requested.
    #[error("negative wait of {0} ms requested")]
    NegativeWait(i64),
}

/// Errors returned by runtime operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    /// A registration or first-use check failed.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// The entity id is not live.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// Spawning would exceed the configured entity limit.
    #[error("entity limit of {0} reached")]
    EntityLimit(usize),

    /// The scene name was never registered.
    #[error("unknown scene \"{0}\"")]
    UnknownScene(String),

    /// A core data operation failed.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// An error raised inside a behavior body.
///
/// Returning one cancels only the task that raised it; the tick continues.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BehaviorError {
    /// A free-form failure reported by the behavior itself.
    #[error("{0}")]
    Message(String),

    /// A runtime operation called from the behavior failed.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// A core data operation called from the behavior failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The behavior body panicked. The runtime caught it and cancelled the task.
    #[error("behavior panicked: {0}")]
    Panicked(String),
}

impl BehaviorError {
    /// A free-form failure.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Turn a caught panic payload into an error, keeping its message when
    /// it carries one.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(message) => *message,
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(message) => (*message).to_string(),
                Err(_) => "non-string payload".to_string(),
            },
        };
        Self::Panicked(message)
    }
}

impl From<RegistrationError> for BehaviorError {
    fn from(err: RegistrationError) -> Self {
        Self::Runtime(RuntimeError::Registration(err))
    }
}
