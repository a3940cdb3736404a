use limare_stream::StreamError;
use thiserror::Error;

use crate::compiler::{CompileError, ShaderStage};

/// Errors that abort linking a shader stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// The compiler rejected the source or ran out of memory.
    #[error("{stage} shader compilation failed: {source}")]
    CompilerFailure {
        /// Stage that was being compiled.
        stage: ShaderStage,
        /// The compiler's error.
        #[source]
        source: CompileError,
    },
    /// A metadata stream failed to parse.
    #[error("{stream} stream: {source}")]
    Stream {
        /// Which stream: `"uniform"` or `"attribute"`.
        stream: &'static str,
        /// The parser's error.
        #[source]
        source: StreamError,
    },
    /// The compiler output is inconsistent or exceeds a [`LinkLimits`](crate::LinkLimits) cap.
    #[error("corrupt stream: {context}")]
    CorruptStream {
        /// What was wrong with the output.
        context: String,
    },
    /// Copying compiler output into owned storage failed.
    #[error("allocation failure: {context}")]
    AllocationFailure {
        /// What was being allocated.
        context: String,
    },
}

/// The three failure classes a stage link can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkErrorKind {
    /// Out of memory while building the stage.
    AllocationFailure,
    /// Malformed or oversized compiler output.
    CorruptStream,
    /// The compiler itself failed.
    CompilerFailure,
}

impl LinkError {
    pub(crate) fn corrupt(context: impl Into<String>) -> Self {
        Self::CorruptStream {
            context: context.into(),
        }
    }

    pub(crate) fn allocation(context: impl Into<String>) -> Self {
        Self::AllocationFailure {
            context: context.into(),
        }
    }

    pub(crate) fn stream(stream: &'static str) -> impl FnOnce(StreamError) -> Self {
        move |source| Self::Stream { stream, source }
    }

    /// Classifies the error. Stream errors are split by their own kind.
    pub fn kind(&self) -> LinkErrorKind {
        match self {
            Self::CompilerFailure { .. } => LinkErrorKind::CompilerFailure,
            Self::Stream { source, .. } if source.is_corrupt() => LinkErrorKind::CorruptStream,
            Self::Stream { .. } | Self::AllocationFailure { .. } => {
                LinkErrorKind::AllocationFailure
            }
            Self::CorruptStream { .. } => LinkErrorKind::CorruptStream,
        }
    }
}
