use thiserror::Error;

use crate::source::SourceError;
use crate::CompileError;

/// Unified error type covering loading and compilation.
///
/// Returned by [`Tree::compile()`](crate::Tree::compile) and recorded by
/// [`Tree::create()`](crate::Tree::create).
#[derive(Debug, Error)]
pub enum BoughError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Compile(#[from] CompileError),
}
