//! Per-program link state and the vertex/fragment link pipelines.

use limare_stream::{AttributeTable, StreamError, UniformTable};

use crate::compiler::{ShaderBinary, ShaderCompiler, ShaderStage};
use crate::error::LinkError;
use crate::limits::{LinkLimits, LinkOptions};
use crate::patch::{MachineCode, PatchReport};
use crate::symbol::{Symbol, SymbolTable};

/// A linked vertex shader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexStage {
    /// Uniform symbols in stream order, with the uniform memory the stage needs.
    pub uniforms: SymbolTable,
    /// Attribute symbols in stream order.
    pub attributes: SymbolTable,
    /// Machine code with attribute and varying slots remapped.
    pub code: MachineCode,
    /// What the slot passes rewrote.
    pub patch_report: PatchReport,
    /// The compiler emitted a varying stream.
    pub has_varyings: bool,
}

/// A linked fragment shader. Its machine code is passed through unmodified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentStage {
    /// Uniform symbols in stream order.
    pub uniforms: SymbolTable,
    /// Machine code as emitted by the compiler.
    pub code: MachineCode,
    /// The compiler emitted a varying stream.
    pub has_varyings: bool,
}

/// The caller-owned state of one shader program.
///
/// Each stage is written only once its whole link pipeline has succeeded. A failed attach
/// leaves both stages exactly as they were.
#[derive(Debug, Clone, Default)]
pub struct Program {
    limits: LinkLimits,
    options: LinkOptions,
    vertex: Option<VertexStage>,
    fragment: Option<FragmentStage>,
}

impl Program {
    /// An empty program with default limits and both slot passes enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the limits applied to compiler output.
    pub fn with_limits(mut self, limits: LinkLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Replaces the link options.
    pub fn with_options(mut self, options: LinkOptions) -> Self {
        self.options = options;
        self
    }

    /// Compiles `source` as a vertex shader and links it into this program.
    pub fn attach_vertex_shader<C>(
        &mut self,
        compiler: &mut C,
        source: &str,
    ) -> Result<&VertexStage, LinkError>
    where
        C: ShaderCompiler + ?Sized,
    {
        let binary = compile(compiler, ShaderStage::Vertex, source)?;
        let stage = link_vertex(&binary, &self.limits, &self.options)
            .inspect_err(|err| tracing::error!("vertex shader link failed: {err}"))?;
        Ok(&*self.vertex.insert(stage))
    }

    /// Compiles `source` as a fragment shader and links it into this program.
    pub fn attach_fragment_shader<C>(
        &mut self,
        compiler: &mut C,
        source: &str,
    ) -> Result<&FragmentStage, LinkError>
    where
        C: ShaderCompiler + ?Sized,
    {
        let binary = compile(compiler, ShaderStage::Fragment, source)?;
        let stage = link_fragment(&binary, &self.limits)
            .inspect_err(|err| tracing::error!("fragment shader link failed: {err}"))?;
        Ok(&*self.fragment.insert(stage))
    }

    /// The attached vertex stage, if any.
    pub fn vertex(&self) -> Option<&VertexStage> {
        self.vertex.as_ref()
    }

    /// The attached fragment stage, if any.
    pub fn fragment(&self) -> Option<&FragmentStage> {
        self.fragment.as_ref()
    }

    /// Both stages are attached; the program can be handed to the command-stream builder.
    pub fn is_linkable(&self) -> bool {
        self.vertex.is_some() && self.fragment.is_some()
    }

    /// Looks up a vertex uniform by name.
    pub fn vertex_uniform(&self, name: &str) -> Option<&Symbol> {
        self.vertex.as_ref()?.uniforms.get(name)
    }

    /// Looks up a vertex attribute by name.
    pub fn vertex_attribute(&self, name: &str) -> Option<&Symbol> {
        self.vertex.as_ref()?.attributes.get(name)
    }

    /// Looks up a fragment uniform by name.
    pub fn fragment_uniform(&self, name: &str) -> Option<&Symbol> {
        self.fragment.as_ref()?.uniforms.get(name)
    }

    /// Limits applied to every attach.
    pub fn limits(&self) -> &LinkLimits {
        &self.limits
    }

    /// Options applied to every attach.
    pub fn options(&self) -> &LinkOptions {
        &self.options
    }
}

fn compile<C>(
    compiler: &mut C,
    stage: ShaderStage,
    source: &str,
) -> Result<ShaderBinary, LinkError>
where
    C: ShaderCompiler + ?Sized,
{
    compiler.compile(stage, source).map_err(|err| {
        tracing::error!(%stage, "compilation failed: {}", err.log());
        LinkError::CompilerFailure { stage, source: err }
    })
}

/// Links the output of a vertex shader compilation.
pub fn link_vertex(
    binary: &ShaderBinary,
    limits: &LinkLimits,
    options: &LinkOptions,
) -> Result<VertexStage, LinkError> {
    check_binary(binary, limits)?;

    let max_symbols = limits.max_symbols as usize;
    let uniforms = link_uniforms(binary, max_symbols)?;

    let attributes = match AttributeTable::parse_bounded(&binary.attribute_stream, max_symbols)
        .map_err(rejected("attribute"))?
    {
        Some(table) => SymbolTable::from_attribute_table(&table)?,
        None => SymbolTable::new(),
    };

    let mut code = MachineCode::from_bytes(&binary.code)?;
    let patch_report = code.patch_slots(options.patch_attributes, options.patch_varyings);

    tracing::debug!(
        uniforms = uniforms.len(),
        uniform_space = uniforms.space_needed(),
        attributes = attributes.len(),
        instructions = patch_report.instructions,
        attribute_fields = patch_report.attribute_fields,
        varying_fields = patch_report.varying_fields,
        "linked vertex shader"
    );

    Ok(VertexStage {
        uniforms,
        attributes,
        code,
        patch_report,
        has_varyings: !binary.varying_stream.is_empty(),
    })
}

/// Links the output of a fragment shader compilation. Fragment shaders carry no attributes and
/// their code needs no slot remapping.
pub fn link_fragment(
    binary: &ShaderBinary,
    limits: &LinkLimits,
) -> Result<FragmentStage, LinkError> {
    check_binary(binary, limits)?;

    let uniforms = link_uniforms(binary, limits.max_symbols as usize)?;
    let code = MachineCode::from_bytes(&binary.code)?;

    tracing::debug!(
        uniforms = uniforms.len(),
        uniform_space = uniforms.space_needed(),
        words = code.words().len(),
        "linked fragment shader"
    );

    Ok(FragmentStage {
        uniforms,
        code,
        has_varyings: !binary.varying_stream.is_empty(),
    })
}

fn link_uniforms(binary: &ShaderBinary, max_symbols: usize) -> Result<SymbolTable, LinkError> {
    match UniformTable::parse_bounded(&binary.uniform_stream, max_symbols)
        .map_err(rejected("uniform"))?
    {
        Some(table) => SymbolTable::from_uniform_table(&table),
        None => Ok(SymbolTable::new()),
    }
}

fn rejected(stream: &'static str) -> impl FnOnce(StreamError) -> LinkError {
    move |err| {
        tracing::warn!("rejecting {stream} stream: {err}");
        LinkError::stream(stream)(err)
    }
}

fn check_binary(binary: &ShaderBinary, limits: &LinkLimits) -> Result<(), LinkError> {
    for (what, len) in [
        ("uniform", binary.uniform_stream.len()),
        ("attribute", binary.attribute_stream.len()),
        ("varying", binary.varying_stream.len()),
    ] {
        if len > limits.max_stream_bytes {
            tracing::warn!(
                len,
                max = limits.max_stream_bytes,
                "rejecting oversized {what} stream"
            );
            return Err(LinkError::corrupt(format!(
                "{what} stream is {len} bytes, exceeding the maximum {}",
                limits.max_stream_bytes
            )));
        }
    }

    if binary.code.len() > limits.max_code_bytes {
        return Err(LinkError::corrupt(format!(
            "machine code is {} bytes, exceeding the maximum {}",
            binary.code.len(),
            limits.max_code_bytes
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CompileError;
    use crate::LinkErrorKind;
    use limare_stream::test_utils::{
        build_attribute_stream, build_uniform_stream, float_attribute, float_uniform,
        push_chunk_header, AttributeDesc, UniformDesc,
    };
    use limare_stream::Tag;
    use pretty_assertions::assert_eq;

    fn words_to_bytes(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    fn vertex_binary() -> ShaderBinary {
        // One instruction reading attribute slot 0 (presence bit set).
        let code = words_to_bytes(&[0, 0x10 << 26, 0, 0]);
        ShaderBinary {
            code,
            uniform_stream: build_uniform_stream(
                0x40,
                &[UniformDesc {
                    name: "mvp",
                    data: float_uniform(16, 0),
                    initializer: None,
                }],
            ),
            attribute_stream: build_attribute_stream(&[AttributeDesc {
                name: "in_vertex",
                data: float_attribute(4, 0),
                initializer: None,
            }]),
            varying_stream: Vec::new(),
        }
    }

    fn fragment_binary() -> ShaderBinary {
        ShaderBinary {
            code: words_to_bytes(&[0x1234_5678, 0x10 << 26, 7]),
            uniform_stream: build_uniform_stream(
                0x10,
                &[UniformDesc {
                    name: "tint",
                    data: float_uniform(4, 0),
                    initializer: None,
                }],
            ),
            ..ShaderBinary::default()
        }
    }

    fn fixed(
        binary: ShaderBinary,
    ) -> impl FnMut(ShaderStage, &str) -> Result<ShaderBinary, CompileError> {
        move |_, _| Ok(binary.clone())
    }

    #[test]
    fn links_both_stages() {
        let mut program = Program::new();
        assert!(!program.is_linkable());

        let vertex = program
            .attach_vertex_shader(&mut fixed(vertex_binary()), "void main() {}")
            .unwrap();
        assert_eq!(vertex.uniforms.len(), 1);
        assert_eq!(vertex.attributes.len(), 1);
        assert_eq!(vertex.code.words(), &[0, 0x11 << 26, 0, 0]);
        assert_eq!(vertex.patch_report.attribute_fields, 1);
        assert!(!program.is_linkable());

        let fragment = program
            .attach_fragment_shader(&mut fixed(fragment_binary()), "void main() {}")
            .unwrap();
        // Fragment code is never patched and need not be whole instructions.
        assert_eq!(fragment.code.words(), &[0x1234_5678, 0x10 << 26, 7]);
        assert!(program.is_linkable());

        assert_eq!(program.vertex_uniform("mvp").unwrap().size, 64);
        assert_eq!(program.vertex_attribute("in_vertex").unwrap().size, 16);
        assert_eq!(program.fragment_uniform("tint").unwrap().size, 16);
        assert!(program.fragment_uniform("mvp").is_none());
    }

    #[test]
    fn compiler_failure_leaves_program_untouched() {
        let mut program = Program::new();
        program
            .attach_fragment_shader(&mut fixed(fragment_binary()), "")
            .unwrap();

        let mut failing = |_: ShaderStage, _: &str| -> Result<ShaderBinary, CompileError> {
            Err(CompileError::Diagnostic {
                log: "0:1: syntax error".to_owned(),
            })
        };
        let err = program
            .attach_vertex_shader(&mut failing, "void main(")
            .unwrap_err();
        assert_eq!(err.kind(), LinkErrorKind::CompilerFailure);
        assert_eq!(
            err.to_string(),
            "vertex shader compilation failed: 0:1: syntax error"
        );

        assert!(program.vertex().is_none());
        assert_eq!(program.fragment_uniform("tint").unwrap().name, "tint");
    }

    #[test]
    fn corrupt_stream_keeps_previous_stage() {
        let mut program = Program::new();
        program
            .attach_vertex_shader(&mut fixed(vertex_binary()), "")
            .unwrap();
        let before = program.vertex().cloned();

        // SUNI header followed by a VUNI whose name string is missing.
        let mut broken = vertex_binary();
        let mut stream = Vec::new();
        push_chunk_header(&mut stream, Tag::SUNI, 8);
        stream.extend_from_slice(&1i32.to_le_bytes());
        stream.extend_from_slice(&4i32.to_le_bytes());
        push_chunk_header(&mut stream, Tag::VUNI, 0);
        stream.extend_from_slice(&[0; 28]);
        broken.uniform_stream = stream;

        let err = program
            .attach_vertex_shader(&mut fixed(broken), "")
            .unwrap_err();
        assert_eq!(err.kind(), LinkErrorKind::CorruptStream);
        assert_eq!(program.vertex().cloned(), before);
    }

    #[test]
    fn empty_streams_link_to_empty_tables() {
        let binary = ShaderBinary {
            code: words_to_bytes(&[0; 4]),
            ..ShaderBinary::default()
        };
        let stage = link_vertex(&binary, &LinkLimits::default(), &LinkOptions::default())
            .unwrap();
        assert!(stage.uniforms.is_empty());
        assert!(stage.attributes.is_empty());
        assert_eq!(stage.uniforms.space_needed(), 0);
        assert!(!stage.has_varyings);
    }

    #[test]
    fn options_disable_patching() {
        let options = LinkOptions {
            patch_attributes: false,
            patch_varyings: false,
        };
        let stage = link_vertex(&vertex_binary(), &LinkLimits::default(), &options)
            .unwrap();
        assert_eq!(stage.code.words(), &[0, 0x10 << 26, 0, 0]);
        assert_eq!(stage.patch_report.attribute_fields, 0);
    }

    #[test]
    fn limits_reject_oversized_input() {
        let limits = LinkLimits {
            max_code_bytes: 8,
            ..LinkLimits::default()
        };
        let err = link_vertex(&vertex_binary(), &limits, &LinkOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), LinkErrorKind::CorruptStream);

        let limits = LinkLimits {
            max_stream_bytes: 16,
            ..LinkLimits::default()
        };
        let err = link_fragment(&fragment_binary(), &limits).unwrap_err();
        assert_eq!(err.kind(), LinkErrorKind::CorruptStream);

        let limits = LinkLimits {
            max_symbols: 0,
            ..LinkLimits::default()
        };
        let err = link_fragment(&fragment_binary(), &limits).unwrap_err();
        assert_eq!(err.kind(), LinkErrorKind::CorruptStream);
        assert_eq!(
            err.to_string(),
            "uniform stream: corrupt stream at offset 0x10: \
             SUNI table declares 1 entries, exceeding the maximum 0"
        );

        let limits = LinkLimits {
            max_symbols: 1,
            ..LinkLimits::default()
        };
        let mut binary = vertex_binary();
        binary.attribute_stream = build_attribute_stream(&[
            AttributeDesc {
                name: "in_vertex",
                data: float_attribute(4, 0),
                initializer: None,
            },
            AttributeDesc {
                name: "in_color",
                data: float_attribute(4, 1),
                initializer: None,
            },
        ]);
        let err = link_vertex(&binary, &limits, &LinkOptions::default())
            .unwrap_err();
        assert!(err.to_string().starts_with("attribute stream: "), "{err}");
    }

    #[test]
    fn vertex_code_must_be_whole_words() {
        let mut binary = vertex_binary();
        binary.code.push(0);
        let err = link_vertex(&binary, &LinkLimits::default(), &LinkOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), LinkErrorKind::CorruptStream);
    }
}
