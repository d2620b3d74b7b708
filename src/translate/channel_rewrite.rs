//! Lexical rewriting of platform channel tokens to the target binding syntax.
//!
//! `iChannelN` and `iChannelResolution[N]` are fixed lexical patterns; this is
//! pure string substitution, not GLSL parsing. A token inside a comment or
//! string literal is rewritten like any other occurrence, a known limitation
//! inherited from the source format (authors do not emit such shapes in
//! practice).

use crate::descriptor::{CHANNEL_COUNT, InputChannel};

fn sampler_2d(index: usize) -> String {
    format!("sTD2DInputs[{index}]")
}

fn info_2d(index: usize) -> String {
    format!("vec2(uTD2DInfos[{index}].res.zw)")
}

fn sampler_cube(index: usize) -> String {
    format!("sTDCubeInputs[{index}]")
}

fn info_cube(index: usize) -> String {
    format!("vec2(uTDCubeInfos[{index}].res.zw)")
}

/// Rewrites every channel-reference token in `source` to the target form
/// appropriate to the declared content type. Channels referenced in source
/// but absent from `inputs` fall back to the 2D form in a catch-all sweep;
/// that is deliberate, not an error.
pub fn rewrite(source: &str, inputs: &[InputChannel]) -> String {
    let mut code = source.to_string();

    for input in inputs {
        let index = input.index as usize;
        let (sampler, info) = if input.content_type().uses_cubemap_binding() {
            (sampler_cube(index), info_cube(index))
        } else {
            (sampler_2d(index), info_2d(index))
        };
        code = code.replace(&format!("iChannel{index}"), &sampler);
        code = code.replace(&format!("iChannelResolution[{index}]"), &info);
    }

    // Catch-all: undeclared channels default to the 2D form.
    for index in 0..CHANNEL_COUNT {
        code = code.replace(&format!("iChannelResolution[{index}]"), &info_2d(index));
        code = code.replace(&format!("iChannel{index}"), &sampler_2d(index));
    }

    code
}
