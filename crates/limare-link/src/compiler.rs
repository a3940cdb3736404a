//! The shader compiler collaborator and the binary it produces.

use core::fmt;

use thiserror::Error;

/// The programmable stage a shader is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex processor.
    Vertex,
    /// Fragment processor.
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        })
    }
}

/// Output of one successful compilation.
///
/// Each stream is sized independently; an empty stream means the program declares nothing of
/// that kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderBinary {
    /// Machine code: 128-bit instructions for vertex shaders, a word stream for fragment shaders.
    pub code: Vec<u8>,
    /// Uniform table (`SUNI`).
    pub uniform_stream: Vec<u8>,
    /// Attribute table (`SATT`). Always empty for fragment shaders.
    pub attribute_stream: Vec<u8>,
    /// Varying metadata. Linking only records its presence.
    pub varying_stream: Vec<u8>,
}

/// Failure reported by the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The compiler rejected the source; `log` is its diagnostic output.
    #[error("{log}")]
    Diagnostic {
        /// Compiler diagnostics.
        log: String,
    },
    /// The compiler ran out of memory.
    #[error("out of memory: {log}")]
    OutOfMemory {
        /// Compiler diagnostics.
        log: String,
    },
}

impl CompileError {
    /// The compiler's log output.
    pub fn log(&self) -> &str {
        match self {
            CompileError::Diagnostic { log } | CompileError::OutOfMemory { log } => log,
        }
    }
}

/// Turns shader source into a [`ShaderBinary`].
///
/// The link stage never looks at the source text; it only consumes the compiler's output.
pub trait ShaderCompiler {
    /// Compiles `source` for `stage`.
    fn compile(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderBinary, CompileError>;
}

impl<F> ShaderCompiler for F
where
    F: FnMut(ShaderStage, &str) -> Result<ShaderBinary, CompileError>,
{
    fn compile(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderBinary, CompileError> {
        self(stage, source)
    }
}
