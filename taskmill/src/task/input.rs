use crate::task::error::TaskError;
use crate::task::handle::ResultHandle;

/// One argument slot of an awaitable task: a value that is already available,
/// or the pending result of another task.
///
/// Plain values convert with `From`, as do result handles, so slots are
/// usually written `v.into()` / `handle.into()` or with the named
/// constructors.
#[derive(Debug)]
pub enum Input<T> {
    Value(T),
    Pending(ResultHandle<T>),
}

impl<T> Input<T> {
    pub fn value(v: T) -> Self {
        Self::Value(v)
    }

    pub fn pending(handle: ResultHandle<T>) -> Self {
        Self::Pending(handle)
    }

    /// Non-blocking: would [`materialize`](Input::materialize) return without
    /// waiting?
    pub(crate) fn is_ready(&self) -> bool {
        match self {
            Self::Value(_) => true,
            Self::Pending(handle) => handle.is_ready(),
        }
    }
}

impl<T: Clone> Input<T> {
    /// Forward the value, blocking on a pending handle first.
    pub(crate) fn materialize(self) -> Result<T, TaskError> {
        match self {
            Self::Value(v) => Ok(v),
            Self::Pending(handle) => handle.get(),
        }
    }
}

impl<T> From<T> for Input<T> {
    fn from(v: T) -> Self {
        Self::Value(v)
    }
}

impl<T> From<ResultHandle<T>> for Input<T> {
    fn from(handle: ResultHandle<T>) -> Self {
        Self::Pending(handle)
    }
}

/// Argument list of an awaitable task: a tuple of [`Input`] slots.
///
/// Readiness reduces by logical AND over the slots; materialization resolves
/// the slots in positional order, blocking on pending ones.
pub trait InputList: Send {
    type Values;

    fn is_ready(&self) -> bool;

    fn materialize(self) -> Result<Self::Values, TaskError>;
}

impl InputList for () {
    type Values = ();

    fn is_ready(&self) -> bool {
        true
    }

    fn materialize(self) -> Result<Self::Values, TaskError> {
        Ok(())
    }
}

macro_rules! impl_input_list {
    ($($name:ident),+) => {
        impl<$($name: Clone + Send + 'static),+> InputList for ($(Input<$name>,)+) {
            type Values = ($($name,)+);

            #[allow(non_snake_case)]
            fn is_ready(&self) -> bool {
                let ($($name,)+) = self;
                true $(&& $name.is_ready())+
            }

            #[allow(non_snake_case)]
            fn materialize(self) -> Result<Self::Values, TaskError> {
                let ($($name,)+) = self;
                Ok(($($name.materialize()?,)+))
            }
        }
    };
}

impl_input_list!(A);
impl_input_list!(A, B);
impl_input_list!(A, B, C);
impl_input_list!(A, B, C, D);
impl_input_list!(A, B, C, D, E);
impl_input_list!(A, B, C, D, E, F);
impl_input_list!(A, B, C, D, E, F, G);
impl_input_list!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::handle::channel;

    #[test]
    fn test_value_slot_is_always_ready() {
        let slot: Input<u32> = 5.into();
        assert!(slot.is_ready());
        assert_eq!(slot.materialize(), Ok(5));
    }

    #[test]
    fn test_handle_converts_to_pending_slot() {
        let (_promise, handle) = channel::<u32>();
        let slot: Input<u32> = handle.into();
        assert!(matches!(slot, Input::Pending(_)));
    }

    #[test]
    fn test_pending_slot_tracks_its_handle() {
        let (promise, handle) = channel::<u32>();
        let slot = Input::pending(handle);
        assert!(!slot.is_ready());

        promise.deliver(Ok(9));
        assert!(slot.is_ready());
        assert_eq!(slot.materialize(), Ok(9));
    }

    #[test]
    fn test_list_readiness_is_an_and_reduction() {
        let (promise, handle) = channel::<u32>();
        let list = (Input::value(1_u32), Input::pending(handle));
        assert!(!list.is_ready());

        promise.deliver(Ok(2));
        assert!(list.is_ready());
        assert_eq!(list.materialize(), Ok((1, 2)));
    }

    #[test]
    fn test_materialize_propagates_slot_failure() {
        let (promise, handle) = channel::<u32>();
        drop(promise);

        let list = (Input::pending(handle),);
        assert_eq!(list.materialize(), Err(TaskError::Discarded));
    }
}
