//! Uniform preamble and entry-point wrapper for translated passes.
//!
//! The preamble and the output wrapper are a hard compatibility contract with
//! the target environment's binding names; they are identical for every pass.

/// Environment-provided uniforms, declared with the source platform's names
/// so the pass body compiles unchanged.
const UNIFORM_PREAMBLE: &str = "\
uniform vec3      iResolution;           // viewport resolution (in pixels)
uniform float     iTime;                 // shader playback time (in seconds)
uniform float     iTimeDelta;            // render time (in seconds)
uniform int       iFrame;                // shader playback frame
uniform float     iChannelTime[4];       // channel playback time (in seconds)
uniform vec4      iMouse;                // mouse pixel coords. xy: current (if MLB down), zw: click
uniform vec4      iDate;                 // (year, month, day, time in seconds)
uniform float     iSampleRate;           // sound sample rate (i.e., 44100)
";

const COMMON_INCLUDE: &str = "#include <../common>\n";

/// Declares the fragment output and calls the pass's `mainImage` with the
/// environment's normalized-UV-to-pixel conversion.
const OUTPUT_WRAPPER: &str = "\
layout (location = 0) out vec4 TDColor;
void main()
{
    mainImage(TDColor, vUV.st*iResolution.xy);
}
";

/// Wraps an already channel-rewritten pass body into a compilable fragment
/// shader. The body is assumed to define `mainImage(out vec4, in vec2)`; a
/// malformed signature surfaces later as an external compile error.
pub fn wrap(rewritten: &str, has_common_include: bool) -> String {
    let mut out = String::with_capacity(
        UNIFORM_PREAMBLE.len() + COMMON_INCLUDE.len() + rewritten.len() + OUTPUT_WRAPPER.len() + 4,
    );
    out.push_str(UNIFORM_PREAMBLE);
    out.push('\n');
    if has_common_include {
        out.push_str(COMMON_INCLUDE);
        out.push('\n');
    }
    out.push_str(rewritten);
    out.push('\n');
    out.push_str(OUTPUT_WRAPPER);
    out
}
