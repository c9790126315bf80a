use thiserror::Error;

/// Errors produced when binding call arguments to a [`Signature`](crate::Signature).
///
/// The caching layer never raises these itself: cache keys are derived without
/// arity validation. Target functions call [`Signature::bind`](crate::Signature::bind)
/// to resolve their arguments and report a `BindError` through their own error type,
/// which the wrapper then propagates unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("takes {expected} positional argument(s) but {given} were given")]
    TooManyPositional { expected: usize, given: usize },

    #[error("got an unexpected keyword argument `{name}`")]
    UnexpectedKeyword { name: String },

    #[error("got multiple values for argument `{name}`")]
    DuplicateArgument { name: String },

    #[error("missing required argument `{name}`")]
    MissingArgument { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = BindError::MissingArgument {
            name: "x".to_string(),
        };
        assert_eq!(err.to_string(), "missing required argument `x`");

        let err = BindError::TooManyPositional {
            expected: 1,
            given: 3,
        };
        assert_eq!(
            err.to_string(),
            "takes 1 positional argument(s) but 3 were given"
        );
    }
}
