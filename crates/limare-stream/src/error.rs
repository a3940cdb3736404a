use thiserror::Error;

/// Errors produced while parsing a compiler metadata stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// A required chunk is missing, a record is truncated, or a declared size/count does not
    /// fit in the bytes that are actually present.
    #[error("corrupt stream at offset {offset:#x}: {context}")]
    CorruptStream {
        /// Byte offset within the stream at which parsing stopped.
        offset: usize,
        /// Human readable description of what was expected.
        context: String,
    },
    /// Allocating storage for the parsed table failed.
    #[error("allocation failure: {context}")]
    AllocationFailure {
        /// Human readable description of the failed allocation.
        context: String,
    },
}

impl StreamError {
    pub(crate) fn corrupt(offset: usize, context: impl Into<String>) -> Self {
        Self::CorruptStream {
            offset,
            context: context.into(),
        }
    }

    pub(crate) fn allocation(context: impl Into<String>) -> Self {
        Self::AllocationFailure {
            context: context.into(),
        }
    }

    /// Returns the human readable context of this error, without the variant prefix.
    pub fn context(&self) -> &str {
        match self {
            Self::CorruptStream { context, .. } | Self::AllocationFailure { context } => context,
        }
    }

    /// Returns `true` for [`StreamError::CorruptStream`].
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::CorruptStream { .. })
    }
}
