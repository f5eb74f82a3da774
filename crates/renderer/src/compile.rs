use wgpu::naga::front::glsl;
use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};
use wgpu::naga::Module;

use crate::error::ShaderBuildError;
use crate::interface::{
    parse_declaration, segments, strip_comments, DeclaredInterface, Storage, BLOCK_UNIFORMS,
};
use crate::types::ShaderStage;

/// Built-in fragment shader; the fallback of last resort.
pub const DEFAULT_FRAGMENT_SHADER: &str = r"precision mediump float;
uniform vec2 u_resolution;
uniform float u_time;

void main() {
    vec2 uv = gl_FragCoord.xy / u_resolution.xy;

    // Animated sine bands per channel.
    vec3 color = vec3(0.0);
    color.r = sin(uv.x * 10.0 + u_time) * 0.5 + 0.5;
    color.g = sin(uv.y * 10.0 + u_time * 1.5) * 0.5 + 0.5;
    color.b = sin((uv.x + uv.y) * 5.0 + u_time * 2.0) * 0.5 + 0.5;

    gl_FragColor = vec4(color, 1.0);
}
";

/// Pass-through vertex shader for the full-screen triangle-strip quad.
pub const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec2 a_position;

void main() {
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

/// Shader text ready for the GLSL front-end, plus what it declares.
#[derive(Debug, Clone)]
pub(crate) struct PreparedShader {
    pub stage: ShaderStage,
    pub text: String,
    /// Lines injected ahead of the user's first line.
    pub prelude_lines: usize,
    pub interface: DeclaredInterface,
}

/// Turns raw stage source into GLSL 450 the naga front-end accepts.
pub(crate) fn prepare(stage: ShaderStage, source: &str) -> PreparedShader {
    match stage {
        ShaderStage::Vertex => PreparedShader {
            stage,
            text: source.to_string(),
            prelude_lines: 0,
            interface: DeclaredInterface::scan(source),
        },
        ShaderStage::Fragment => wrap_fragment(source),
    }
}

/// Produces a self-contained GLSL 450 fragment shader from WebGL-style code.
///
/// Steps performed:
///
/// 1. Blank out comments, `#version` and `precision` statements, working per
///    statement so declarations sharing a line or spanning lines are seen.
///    Newlines are always kept so diagnostics keep the user's line numbers.
/// 2. Drop the declarations of the block-backed uniforms, recording which of
///    those the source declared. A declaration with the wrong type becomes a
///    plain global so the linker reports it.
/// 3. Turn every other non-opaque loose uniform into a private global. GLSL
///    450 has no default uniform block, and an unset WebGL uniform reads as
///    zero just like the global does.
/// 4. Prepend [`HEADER`] with the std140 block, then one alias macro per
///    correctly typed uniform. Undeclared uniforms get no alias, so using one
///    is a compile error just as it is in WebGL.
/// 5. Append [`FOOTER`] which flips `gl_FragCoord` to a bottom-left origin and
///    calls the user's `main`.
fn wrap_fragment(source: &str) -> PreparedShader {
    let mut interface = DeclaredInterface::default();
    let cleaned = strip_comments(source);
    let mut body = String::with_capacity(cleaned.len());

    for segment in segments(&cleaned) {
        let statement = segment.trim_start();
        let Some(replacement) = rewrite_statement(statement, &mut interface) else {
            body.push_str(segment);
            continue;
        };
        body.push_str(&segment[..segment.len() - statement.len()]);
        body.push_str(&replacement);
        for _ in statement.matches('\n') {
            body.push('\n');
        }
    }

    let mut prelude = String::from(HEADER);
    for (name, ty) in BLOCK_UNIFORMS {
        if interface
            .uniforms
            .iter()
            .any(|decl| decl.name == name && decl.ty == ty)
        {
            prelude.push_str(&format!("#define {name} promptshade_params._{name}\n"));
        }
    }
    prelude.push_str("#define main promptshade_main\n");
    let prelude_lines = prelude.matches('\n').count();

    PreparedShader {
        stage: ShaderStage::Fragment,
        text: format!("{prelude}{body}{FOOTER}"),
        prelude_lines,
        interface,
    }
}

/// Replacement text for one top-level statement, or `None` to keep it.
fn rewrite_statement(statement: &str, interface: &mut DeclaredInterface) -> Option<String> {
    let trimmed = statement.trim_end();
    if trimmed.starts_with("#version")
        || (trimmed.starts_with("precision ") && trimmed.ends_with(';'))
    {
        return Some(String::new());
    }

    let mut parsed = parse_declaration(trimmed).filter(|p| p.storage == Storage::Uniform)?;
    let mut block = Vec::new();
    let mut globals = Vec::new();
    let mut opaque = Vec::new();
    for name in parsed.names.drain(..) {
        match block_type(&name) {
            Some(expected) => {
                if expected != parsed.ty {
                    globals.push(name.clone());
                }
                block.push(name);
            }
            None if is_opaque(&parsed.ty) => opaque.push(name),
            None => globals.push(name),
        }
    }

    let mut replacement = Vec::new();
    if !opaque.is_empty() {
        replacement.push(format!("uniform {} {};", parsed.ty, opaque.join(", ")));
    }
    if !globals.is_empty() {
        replacement.push(format!("{} {};", parsed.ty, globals.join(", ")));
    }
    if !block.is_empty() {
        parsed.names = block;
        interface.record(parsed);
    }
    Some(replacement.join(" "))
}

fn block_type(name: &str) -> Option<&'static str> {
    BLOCK_UNIFORMS
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, ty)| *ty)
}

/// Samplers and images need real bindings; they are left for naga to report.
fn is_opaque(ty: &str) -> bool {
    ty.contains("sampler") || ty.contains("image") || ty.starts_with("texture")
}

/// Runs the naga GLSL front-end and validator over prepared text.
///
/// This is the part of compilation that does not need a device, so the same
/// diagnostics are produced by the offline checker and the GPU path.
pub(crate) fn validate(prepared: &PreparedShader) -> Result<Module, ShaderBuildError> {
    let stage = prepared.stage;
    let mut frontend = glsl::Frontend::default();
    let module = frontend
        .parse(&glsl::Options::from(stage.naga()), &prepared.text)
        .map_err(|errors| {
            let log = errors
                .errors
                .iter()
                .map(|error| {
                    let location = error.meta.location(&prepared.text);
                    format!(
                        "{}: {}",
                        source_position(prepared, location.line_number, location.line_position),
                        error.kind
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            ShaderBuildError::Compile { stage, log }
        })?;

    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|error| ShaderBuildError::Compile {
            stage,
            log: format!("{stage}: {}", describe_error(error.as_inner())),
        })?;

    Ok(module)
}

fn source_position(prepared: &PreparedShader, line: u32, column: u32) -> String {
    let line = line as usize;
    if line > prepared.prelude_lines {
        format!("{}:{}:{}", prepared.stage, line - prepared.prelude_lines, column)
    } else {
        format!("{}:prelude:{}:{}", prepared.stage, line, column)
    }
}

/// Flattens an error and its `source()` chain into one line.
pub(crate) fn describe_error(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

/// GLSL prologue injected ahead of every fragment shader.
///
/// The block layout must match [`QuadUniforms`](crate::gpu::QuadUniforms).
const HEADER: &str = r"#version 450
layout(location = 0) out vec4 promptshade_frag_color;

layout(std140, set = 0, binding = 0) uniform QuadParams {
    vec2 _u_resolution;
    float _u_time;
    float _padding0;
} promptshade_params;

vec4 promptshade_frag_coord;
#define gl_FragCoord promptshade_frag_coord
#define gl_FragColor promptshade_frag_color
";

/// GLSL epilogue that remaps the fragment coordinate and runs the user's `main`.
const FOOTER: &str = r"
#undef main
#undef gl_FragCoord
void main() {
    promptshade_frag_coord = vec4(
        gl_FragCoord.x,
        promptshade_params._u_resolution.y - gl_FragCoord.y,
        gl_FragCoord.z,
        gl_FragCoord.w
    );
    promptshade_main();
}
";
