use std::time::{Duration, Instant};

use renderer::{
    check_fragment, FailedStage, OfflineProgramBuilder, SessionError, ShaderSessionManager,
    SubmitOutcome, UniformLocation, DEFAULT_FRAGMENT_SHADER,
};

const PLASMA: &str = r"precision highp float;
uniform vec2 u_resolution;
uniform float u_time;

float wave(vec2 p, float speed) {
    return sin(p.x * 8.0 + u_time * speed) + cos(p.y * 6.0 - u_time);
}

void main() {
    vec2 uv = gl_FragCoord.xy / u_resolution.xy;
    float v = wave(uv, 1.3) * 0.25 + 0.5;
    gl_FragColor = vec4(v, uv.x, 1.0 - v, 1.0);
}
";

#[test]
fn default_shader_passes_the_offline_check() {
    let bindings = check_fragment(DEFAULT_FRAGMENT_SHADER).expect("default shader builds");
    assert_eq!(bindings.time, UniformLocation(8));
}

#[test]
fn helper_functions_and_uniform_aliases_compile() {
    check_fragment(PLASMA).expect("plasma shader builds");
}

#[test]
fn extra_uniforms_read_as_zero_and_still_build() {
    let source = r"precision mediump float;
uniform vec2 u_resolution;
uniform float u_time;
uniform vec2 u_mouse;

void main() {
    vec2 uv = gl_FragCoord.xy / u_resolution;
    float glow = length(uv - u_mouse / u_resolution);
    gl_FragColor = vec4(vec3(glow * abs(sin(u_time))), 1.0);
}
";
    check_fragment(source).expect("shader with an unset uniform builds");
}

#[test]
fn declarations_followed_by_block_comments_build() {
    let source = r"uniform vec2 u_resolution; /* px */
uniform float u_time; /* seconds */
void main() {
    gl_FragColor = vec4(gl_FragCoord.xy / u_resolution, fract(u_time), 1.0);
}
";
    check_fragment(source).expect("commented declarations build");
}

#[test]
fn declarations_sharing_one_line_build() {
    let source = r"uniform vec2 u_resolution; uniform float u_time;
void main() {
    gl_FragColor = vec4(gl_FragCoord.xy / u_resolution, fract(u_time), 1.0);
}
";
    check_fragment(source).expect("single-line declarations build");
}

#[test]
fn undeclared_uniform_use_is_a_fragment_error() {
    let source = "void main() {\n    gl_FragColor = vec4(u_time);\n}\n";
    let err = check_fragment(source).unwrap_err();
    assert_eq!(err.stage, FailedStage::Fragment);
}

#[test]
fn mistyped_uniform_is_a_link_error() {
    let source = r"uniform vec3 u_resolution;
uniform float u_time;
void main() {
    gl_FragColor = vec4(u_resolution, u_time);
}
";
    let err = check_fragment(source).unwrap_err();
    assert_eq!(err.stage, FailedStage::Link);
    assert!(err.log.contains("u_resolution"));
}

#[test]
fn hot_swap_sequence_keeps_last_good_session() {
    let start = Instant::now();
    let mut manager =
        ShaderSessionManager::start(OfflineProgramBuilder, DEFAULT_FRAGMENT_SHADER, || start)
            .expect("default session");

    let outcome = manager.submit(PLASMA, || start + Duration::from_secs(5));
    assert_eq!(outcome, SubmitOutcome::Activated { generation: 1 });

    let outcome = manager.submit("void main() {", || start + Duration::from_secs(6));
    assert!(matches!(outcome, SubmitOutcome::Rejected { fallback_generation: 1, .. }));
    assert_eq!(manager.active().fragment(), PLASMA);
    assert_eq!(
        manager.active().elapsed(start + Duration::from_secs(6)),
        Duration::from_secs(1)
    );
}

#[test]
fn broken_startup_shader_is_fatal() {
    let result = ShaderSessionManager::start(OfflineProgramBuilder, "not glsl", Instant::now);
    assert!(matches!(result, Err(SessionError::StartupRejected(_))));
}
