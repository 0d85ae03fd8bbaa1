use std::any::Any;

/// Failure delivered through a task's result channel.
#[derive(thiserror::Error, Debug, Clone)]
pub enum TaskError {
    /// The callable panicked while running. Carries the panic message when
    /// the payload was a string.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The task was dropped before it could run, e.g. because the pool was
    /// destroyed while the task was still queued.
    #[error("task was discarded before running")]
    Discarded,

    /// A pending input resolved to an error; the callable was never run.
    #[error("task input failed")]
    Dependency(#[source] Box<TaskError>),
}

// Panic payloads are not comparable, so equality is per-variant only.
impl PartialEq for TaskError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Panicked(_), Self::Panicked(_)) => true,
            (Self::Discarded, Self::Discarded) => true,
            (Self::Dependency(a), Self::Dependency(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for TaskError {}

/// Best-effort extraction of a panic message out of a `catch_unwind` payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "<opaque panic payload>".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_panic_payload() {
        assert_eq!(
            TaskError::Panicked("a".into()),
            TaskError::Panicked("b".into())
        );
        assert_ne!(TaskError::Panicked("a".into()), TaskError::Discarded);
        assert_eq!(
            TaskError::Dependency(Box::new(TaskError::Discarded)),
            TaskError::Dependency(Box::new(TaskError::Discarded)),
        );
    }

    #[test]
    fn test_panic_message_extraction() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&String::from("boom")), "boom");
        assert_eq!(panic_message(&17_u32), "<opaque panic payload>");
    }
}
