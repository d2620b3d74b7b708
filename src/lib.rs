//! Import Shadertoy-style shader descriptors and rewrite them for a
//! TouchDesigner-flavored GLSL environment.
//!
//! The pipeline is synchronous and pure: a fetched [`ShaderDescriptor`] goes
//! in, per-pass rewritten source plus four resolved [`BindingSlot`]s per pass
//! come out. Applying those artifacts to live rendering objects (textures,
//! compiled shaders, frame scheduling) is the caller's job.

pub mod descriptor;
pub mod error;
pub mod graph;
pub mod translate;

pub use descriptor::{
    CHANNEL_COUNT, ContentType, InputChannel, PassRole, RenderPass, SamplerConfig,
    ShaderDescriptor, ShaderInfo,
};
pub use error::{Diagnostic, LoadError};
pub use graph::{
    FetchShader, GraphState, LoadSummary, PassArtifacts, ShaderGraph, TimeResetRequest,
};
pub use translate::bindings::{
    BindingSlot, BufferAliases, BufferSlot, ChannelBinding, CubemapTarget, ResolvedSource,
};
