//! Result type aliases for foo.

use crate::FooError;

/// A specialized `Result` type for foo operations.
pub type FooResult<T> = Result<T, FooError>;
