//! Shader interface scanning and binding resolution.
//!
//! The full-screen quad contract depends on exactly three bindings:
//! `a_position` (vertex input), `u_resolution` and `u_time` (uniforms). The
//! compiler records what each stage declares; the linker resolves those
//! declarations into [`ProgramBindings`] or rejects the program.

use std::mem::offset_of;

use crate::error::ShaderBuildError;
use crate::gpu::QuadUniforms;

pub const POSITION_ATTRIBUTE: &str = "a_position";
pub const RESOLUTION_UNIFORM: &str = "u_resolution";
pub const TIME_UNIFORM: &str = "u_time";

/// Uniforms backed by the injected std140 block, with their expected GLSL types.
pub(crate) const BLOCK_UNIFORMS: [(&str, &str); 2] =
    [(RESOLUTION_UNIFORM, "vec2"), (TIME_UNIFORM, "float")];

const PRECISION_QUALIFIERS: [&str; 3] = ["lowp", "mediump", "highp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Storage {
    Uniform,
    Input,
}

/// A single `uniform`/`in` declaration found in shader source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Declaration {
    pub name: String,
    pub ty: String,
    pub location: Option<u32>,
}

/// Parsed form of one declaration statement, which may name several variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DeclarationLine {
    pub storage: Storage,
    pub ty: String,
    pub names: Vec<String>,
    pub location: Option<u32>,
}

/// Declarations a compiled stage exposes to the linker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct DeclaredInterface {
    pub inputs: Vec<Declaration>,
    pub uniforms: Vec<Declaration>,
}

impl DeclaredInterface {
    /// Collects every `in`/`attribute` and `uniform` declaration in `source`.
    pub fn scan(source: &str) -> Self {
        let mut interface = Self::default();
        let cleaned = strip_comments(source);
        for segment in segments(&cleaned) {
            if let Some(parsed) = parse_declaration(segment) {
                interface.record(parsed);
            }
        }
        interface
    }

    pub fn record(&mut self, line: DeclarationLine) {
        let target = match line.storage {
            Storage::Uniform => &mut self.uniforms,
            Storage::Input => &mut self.inputs,
        };
        for name in line.names {
            target.push(Declaration {
                name,
                ty: line.ty.clone(),
                location: line.location,
            });
        }
    }

    fn input(&self, name: &str) -> Option<&Declaration> {
        self.inputs.iter().find(|decl| decl.name == name)
    }

    fn uniform(&self, name: &str) -> Option<&Declaration> {
        self.uniforms.iter().find(|decl| decl.name == name)
    }
}

/// Parses one GLSL `uniform`, `in` or `attribute` declaration statement.
///
/// Handles an optional `layout(location = N)` prefix, precision qualifiers and
/// comma separated names. Anything else (functions, block declarations,
/// initialisers) yields `None`.
pub(crate) fn parse_declaration(statement: &str) -> Option<DeclarationLine> {
    let code = statement.split("//").next().unwrap_or_default().trim();
    let body = code.strip_suffix(';')?.trim();
    let (location, body) = split_layout(body)?;

    let mut tokens = body.split_whitespace();
    let storage = match tokens.next()? {
        "uniform" => Storage::Uniform,
        "in" | "attribute" => Storage::Input,
        _ => return None,
    };
    let mut ty = tokens.next()?;
    if PRECISION_QUALIFIERS.contains(&ty) {
        ty = tokens.next()?;
    }
    let rest = tokens.collect::<Vec<_>>().join(" ");
    if rest.contains(['{', '(', '=']) {
        return None;
    }
    let names: Vec<String> = rest
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect();
    if names.is_empty() {
        return None;
    }

    Some(DeclarationLine {
        storage,
        ty: ty.to_string(),
        names,
        location,
    })
}

/// Blanks `//` and `/* */` comments with spaces.
///
/// Newlines are kept, so line numbers in the result match `source`.
pub(crate) fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek().copied()) {
            ('/', Some('/')) => {
                out.push(' ');
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    out.push(' ');
                    chars.next();
                }
            }
            ('/', Some('*')) => {
                chars.next();
                out.push_str("  ");
                let mut prev = '\0';
                for next in chars.by_ref() {
                    out.push(if next == '\n' { '\n' } else { ' ' });
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Splits comment-free shader text into pieces that concatenate back to it.
///
/// Each preprocessor directive is its own piece. Everything else is cut after
/// every `;`, `{` and `}`, so a declaration statement is always one piece
/// however it is spread over lines.
pub(crate) fn segments(source: &str) -> Vec<&str> {
    let bytes = source.as_bytes();
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut at_line_start = true;
    let mut index = 0;
    while index < bytes.len() {
        let byte = bytes[index];
        if at_line_start && byte == b'#' {
            if start < index {
                pieces.push(&source[start..index]);
            }
            let end = directive_end(source, index);
            pieces.push(&source[index..end]);
            start = end;
            index = end;
            at_line_start = false;
            continue;
        }
        match byte {
            b'\n' => at_line_start = true,
            b' ' | b'\t' | b'\r' => {}
            _ => at_line_start = false,
        }
        if matches!(byte, b';' | b'{' | b'}') {
            pieces.push(&source[start..=index]);
            start = index + 1;
        }
        index += 1;
    }
    if start < bytes.len() {
        pieces.push(&source[start..]);
    }
    pieces
}

/// End of the directive starting at `start`, following `\` continuations.
/// The terminating newline is not included.
fn directive_end(source: &str, start: usize) -> usize {
    let mut from = start;
    loop {
        let Some(offset) = source[from..].find('\n') else {
            return source.len();
        };
        let newline = from + offset;
        if !source[from..newline].trim_end().ends_with('\\') {
            return newline;
        }
        from = newline + 1;
    }
}

fn split_layout(body: &str) -> Option<(Option<u32>, &str)> {
    let Some(after) = body.strip_prefix("layout") else {
        return Some((None, body));
    };
    let after = after.trim_start().strip_prefix('(')?;
    let (qualifiers, rest) = after.split_once(')')?;
    let location = qualifiers.split(',').find_map(|qualifier| {
        let (key, value) = qualifier.split_once('=')?;
        if key.trim() == "location" {
            value.trim().parse().ok()
        } else {
            None
        }
    });
    Some((location, rest.trim_start()))
}

/// Vertex input location of a resolved attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeLocation(pub u32);

/// Byte offset of a resolved uniform inside the std140 uniform block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformLocation(pub u64);

/// Fully resolved program interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramBindings {
    pub position: AttributeLocation,
    pub resolution: UniformLocation,
    pub time: UniformLocation,
}

/// Resolves the three required bindings or fails with a link error listing
/// every missing or mistyped one.
pub(crate) fn resolve_bindings(
    vertex: &DeclaredInterface,
    fragment: &DeclaredInterface,
) -> Result<ProgramBindings, ShaderBuildError> {
    let mut problems = Vec::new();

    let position = match vertex.input(POSITION_ATTRIBUTE) {
        Some(decl) if decl.ty == "vec2" => Some(AttributeLocation(decl.location.unwrap_or(0))),
        Some(decl) => {
            problems.push(format!(
                "attribute `{POSITION_ATTRIBUTE}` is declared as `{}`, expected `vec2`",
                decl.ty
            ));
            None
        }
        None => {
            problems.push(format!(
                "attribute `{POSITION_ATTRIBUTE}` is not declared by the vertex shader"
            ));
            None
        }
    };

    let mut resolve_uniform = |name: &str, expected: &str, offset: usize| -> Option<UniformLocation> {
        match fragment.uniform(name) {
            Some(decl) if decl.ty == expected => Some(UniformLocation(offset as u64)),
            Some(decl) => {
                problems.push(format!(
                    "uniform `{name}` is declared as `{}`, expected `{expected}`",
                    decl.ty
                ));
                None
            }
            None => {
                problems.push(format!(
                    "uniform `{name}` is not declared by the fragment shader"
                ));
                None
            }
        }
    };
    let resolution = resolve_uniform(
        RESOLUTION_UNIFORM,
        "vec2",
        offset_of!(QuadUniforms, resolution),
    );
    let time = resolve_uniform(TIME_UNIFORM, "float", offset_of!(QuadUniforms, time));

    match (position, resolution, time) {
        (Some(position), Some(resolution), Some(time)) => Ok(ProgramBindings {
            position,
            resolution,
            time,
        }),
        _ => Err(ShaderBuildError::Link {
            log: problems.join("\n"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_layout_inputs() {
        let parsed = parse_declaration("layout(location = 3) in vec2 a_position;").unwrap();
        assert_eq!(parsed.storage, Storage::Input);
        assert_eq!(parsed.ty, "vec2");
        assert_eq!(parsed.names, vec!["a_position".to_string()]);
        assert_eq!(parsed.location, Some(3));
    }

    #[test]
    fn parses_precision_qualified_uniform_lists() {
        let parsed =
            parse_declaration("  uniform highp float u_time, u_speed; // animation").unwrap();
        assert_eq!(parsed.storage, Storage::Uniform);
        assert_eq!(parsed.ty, "float");
        assert_eq!(parsed.names, vec!["u_time".to_string(), "u_speed".to_string()]);
        assert_eq!(parsed.location, None);
    }

    #[test]
    fn ignores_non_declarations() {
        assert!(parse_declaration("void main() {").is_none());
        assert!(parse_declaration("float x = 1.0;").is_none());
        assert!(parse_declaration("uniform Params {").is_none());
        assert!(parse_declaration("in vec2 v = vec2(0.0);").is_none());
    }

    #[test]
    fn comments_are_blanked_without_moving_lines() {
        let source = "uniform float u_time; // seconds\n/* two\nlines */ uniform vec2 u_resolution;";
        let cleaned = strip_comments(source);
        assert_eq!(cleaned.len(), source.len());
        assert_eq!(cleaned.lines().count(), source.lines().count());
        assert!(!cleaned.contains("seconds"));
        assert!(!cleaned.contains("lines"));
        assert!(cleaned.contains("uniform vec2 u_resolution;"));
    }

    #[test]
    fn segments_split_statements_and_directives() {
        let source = "#define SPEED 2.0\nuniform float a; uniform float b;\nvoid main() {\n}\n";
        let pieces = segments(source);
        assert_eq!(pieces.concat(), source);
        assert_eq!(pieces[0], "#define SPEED 2.0");
        assert_eq!(pieces[1].trim(), "uniform float a;");
        assert_eq!(pieces[2].trim(), "uniform float b;");
        assert_eq!(pieces[3].trim(), "void main() {");
    }

    #[test]
    fn directive_continuations_stay_in_one_segment() {
        let source = "#define MIX(a, b) \\\n    mix(a, b, 0.5)\nuniform float a;";
        let pieces = segments(source);
        assert_eq!(pieces[0], "#define MIX(a, b) \\\n    mix(a, b, 0.5)");
        assert_eq!(pieces[1].trim(), "uniform float a;");
    }

    #[test]
    fn scan_finds_declarations_sharing_a_line_or_followed_by_comments() {
        let interface =
            DeclaredInterface::scan("uniform vec2 u_resolution; /* px */ uniform float u_time;");
        let names: Vec<&str> = interface
            .uniforms
            .iter()
            .map(|decl| decl.name.as_str())
            .collect();
        assert_eq!(names, ["u_resolution", "u_time"]);
    }

    #[test]
    fn resolves_all_bindings() {
        let vertex = DeclaredInterface::scan("layout(location = 0) in vec2 a_position;");
        let fragment =
            DeclaredInterface::scan("uniform vec2 u_resolution;\nuniform float u_time;");
        let bindings = resolve_bindings(&vertex, &fragment).unwrap();
        assert_eq!(bindings.position, AttributeLocation(0));
        assert_eq!(bindings.resolution, UniformLocation(0));
        assert_eq!(bindings.time, UniformLocation(8));
    }

    #[test]
    fn reports_every_unresolved_binding() {
        let vertex = DeclaredInterface::scan("layout(location = 0) in vec2 a_position;");
        let fragment = DeclaredInterface::scan("uniform vec3 u_resolution;");
        let err = resolve_bindings(&vertex, &fragment).unwrap_err();
        let ShaderBuildError::Link { log } = err else {
            panic!("expected link error");
        };
        assert!(log.contains("`u_resolution` is declared as `vec3`"));
        assert!(log.contains("`u_time` is not declared"));
    }

    #[test]
    fn missing_position_attribute_is_rejected() {
        let vertex = DeclaredInterface::scan("layout(location = 0) in vec3 a_position;");
        let fragment =
            DeclaredInterface::scan("uniform vec2 u_resolution;\nuniform float u_time;");
        let err = resolve_bindings(&vertex, &fragment).unwrap_err();
        assert!(err.log().contains("a_position"));
    }
}
