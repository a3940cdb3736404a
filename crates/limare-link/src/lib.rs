//! Link stage for programs built by the Mali shader compiler.
//!
//! The compiler hands back a machine-code segment plus metadata streams describing the
//! program's uniforms and attributes. Linking a stage means:
//!
//! 1. parsing those streams ([`limare_stream`]) into [`SymbolTable`]s,
//! 2. rewriting the attribute and varying slot fields of vertex machine code so they follow the
//!    driver's binding order ([`patch`]),
//! 3. storing the result in the caller's [`Program`].
//!
//! The compiler itself is an external collaborator, reached through [`ShaderCompiler`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod compiler;
mod error;
pub mod limits;
pub mod patch;
pub mod program;
pub mod symbol;

pub use crate::compiler::{CompileError, ShaderBinary, ShaderCompiler, ShaderStage};
pub use crate::error::{LinkError, LinkErrorKind};
pub use crate::limits::{LinkLimits, LinkOptions};
pub use crate::patch::{MachineCode, PatchReport};
pub use crate::program::{link_fragment, link_vertex, FragmentStage, Program, VertexStage};
pub use crate::symbol::{Symbol, SymbolKind, SymbolTable};
