//! Multi-pass assembly.
//!
//! Orchestrates rewrite, wrapping and binding resolution across the common
//! include, buffer passes A–D and the final image pass. A load stages every
//! artifact first and commits only once the whole descriptor has translated,
//! so a failure never leaves the graph half-updated: buffer cooking stays
//! disabled and the last successfully installed artifacts remain.

use crate::descriptor::{
    CHANNEL_COUNT, InputChannel, PassRole, RenderPass, ShaderDescriptor, ShaderInfo,
};
use crate::error::{Diagnostic, LoadError};
use crate::translate::bindings::{self, BindingSlot, BufferAliases, BufferSlot};
use crate::translate::{channel_rewrite, wrapper};

/// External fetch collaborator. Implementations own networking, caching and
/// JSON handling; failures surface as [`LoadError::Fetch`] with the graph's
/// prior state retained.
pub trait FetchShader {
    fn fetch(&mut self) -> anyhow::Result<ShaderDescriptor>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphState {
    /// No load attempted yet.
    Idle,
    /// Last load committed; installed artifacts are current.
    Ready,
    /// Last load failed; installed artifacts are from the previous Ready
    /// state and all buffer cooking is disabled.
    Failed,
}

/// Finalized source and resolved bindings for one pass, ready for external
/// compilation and binding.
#[derive(Debug, Clone, PartialEq)]
pub struct PassArtifacts {
    pub source: String,
    pub bindings: [BindingSlot; CHANNEL_COUNT],
}

/// Caller-visible request to reset the engine's time-accumulating state.
/// The deferred reset runs after the engine's own settling delay; this core
/// only issues the request, it never awaits the effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeResetRequest {
    pub reset_now: bool,
    pub deferred_steps: u32,
}

#[derive(Debug)]
pub struct LoadSummary {
    pub diagnostics: Vec<Diagnostic>,
    pub time_reset: TimeResetRequest,
}

#[derive(Debug, Default)]
struct BufferTarget {
    cook_enabled: bool,
    pass: Option<PassArtifacts>,
}

/// Artifacts staged during a load, applied atomically on success.
struct StagedLoad {
    info: ShaderInfo,
    version: String,
    common: Option<String>,
    buffers: [Option<PassArtifacts>; CHANNEL_COUNT],
    image: PassArtifacts,
}

/// The assembled render graph: shared include text, up to four buffer
/// targets and the image pass.
#[derive(Debug)]
pub struct ShaderGraph {
    aliases: BufferAliases,
    state: GraphState,
    info: Option<ShaderInfo>,
    version: Option<String>,
    common: Option<String>,
    buffers: [BufferTarget; CHANNEL_COUNT],
    image: Option<PassArtifacts>,
}

impl Default for ShaderGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ShaderGraph {
    pub fn new() -> Self {
        Self::with_aliases(BufferAliases::default())
    }

    /// Injectable alias table, mainly for tests.
    pub fn with_aliases(aliases: BufferAliases) -> Self {
        Self {
            aliases,
            state: GraphState::Idle,
            info: None,
            version: None,
            common: None,
            buffers: Default::default(),
            image: None,
        }
    }

    pub fn state(&self) -> GraphState {
        self.state
    }

    pub fn info(&self) -> Option<&ShaderInfo> {
        self.info.as_ref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Shared include text from the common pass, if any.
    pub fn common_include(&self) -> Option<&str> {
        self.common.as_deref()
    }

    pub fn image_pass(&self) -> Option<&PassArtifacts> {
        self.image.as_ref()
    }

    pub fn buffer_pass(&self, slot: BufferSlot) -> Option<&PassArtifacts> {
        self.buffers[slot.index()].pass.as_ref()
    }

    /// Whether the engine should evaluate this buffer target each frame.
    pub fn cook_enabled(&self, slot: BufferSlot) -> bool {
        self.buffers[slot.index()].cook_enabled
    }

    /// Fetches a descriptor from the collaborator and loads it. A fetch
    /// failure mutates nothing.
    pub fn load_from(&mut self, source: &mut dyn FetchShader) -> Result<LoadSummary, LoadError> {
        let descriptor = source.fetch().map_err(LoadError::Fetch)?;
        self.load(&descriptor)
    }

    /// Translates and installs a descriptor.
    ///
    /// Buffer cooking is disabled up front and re-enabled only for buffer
    /// passes present in the new descriptor. Not re-entrant: callers must
    /// serialize loads.
    pub fn load(&mut self, descriptor: &ShaderDescriptor) -> Result<LoadSummary, LoadError> {
        // Step 1: stop all buffer cooking before touching any binding, so
        // nothing evaluates against half-updated state mid-reload.
        for target in &mut self.buffers {
            target.cook_enabled = false;
        }

        let mut diagnostics = Vec::new();
        match self.stage(descriptor, &mut diagnostics) {
            Ok(staged) => {
                self.commit(staged);
                self.state = GraphState::Ready;
                Ok(LoadSummary {
                    diagnostics,
                    time_reset: TimeResetRequest {
                        reset_now: true,
                        deferred_steps: 1,
                    },
                })
            }
            Err(err) => {
                // Cooking stays disabled: re-enabling without valid bindings
                // is unsafe. Installed artifacts are from the last Ready load.
                self.state = GraphState::Failed;
                Err(err)
            }
        }
    }

    fn stage(
        &self,
        descriptor: &ShaderDescriptor,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<StagedLoad, LoadError> {
        // Step 2: partition passes by role.
        let mut image: Option<&RenderPass> = None;
        let mut buffer_passes: Vec<&RenderPass> = Vec::new();
        let mut common: Option<&RenderPass> = None;

        for pass in &descriptor.passes {
            match pass.role {
                PassRole::Image => {
                    if image.is_some() {
                        return Err(LoadError::Shape(
                            "descriptor has more than one image pass".to_string(),
                        ));
                    }
                    image = Some(pass);
                }
                PassRole::Buffer => buffer_passes.push(pass),
                PassRole::Common => {
                    if common.is_some() {
                        Diagnostic::DuplicateCommonPass {
                            name: pass.name.clone(),
                        }
                        .record(diagnostics);
                    } else {
                        common = Some(pass);
                    }
                }
                PassRole::Other => {
                    Diagnostic::UnsupportedPassRole {
                        name: pass.name.clone(),
                    }
                    .record(diagnostics);
                }
            }
        }

        let image =
            image.ok_or_else(|| LoadError::Shape("descriptor has no image pass".to_string()))?;

        // Step 3: the shared include's channel substitutions are associated
        // with the image pass's declared inputs.
        let staged_common = common.map(|pass| channel_rewrite::rewrite(&pass.source, &image.inputs));
        let has_common = staged_common.is_some();

        // Step 4: buffer passes matching a canonical identifier.
        let mut staged_buffers: [Option<PassArtifacts>; CHANNEL_COUNT] = Default::default();
        for pass in buffer_passes {
            let Some(slot) = self.aliases.slot_for_pass_name(&pass.name) else {
                Diagnostic::UnresolvedBufferName {
                    name: pass.name.clone(),
                }
                .record(diagnostics);
                continue;
            };
            if staged_buffers[slot.index()].is_some() {
                return Err(LoadError::Shape(format!(
                    "buffer slot {slot} declared by more than one pass"
                )));
            }
            log::debug!("staging buffer pass '{}' into {slot}", pass.name);
            staged_buffers[slot.index()] =
                Some(self.stage_pass(&pass.source, &pass.inputs, has_common, diagnostics)?);
        }

        // Step 5: the image pass.
        log::debug!("staging image pass '{}'", image.name);
        let staged_image = self.stage_pass(&image.source, &image.inputs, has_common, diagnostics)?;

        Ok(StagedLoad {
            info: descriptor.info.clone(),
            version: descriptor.version.clone(),
            common: staged_common,
            buffers: staged_buffers,
            image: staged_image,
        })
    }

    fn stage_pass(
        &self,
        source: &str,
        inputs: &[InputChannel],
        has_common: bool,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<PassArtifacts, LoadError> {
        let rewritten = channel_rewrite::rewrite(source, inputs);
        let wrapped = wrapper::wrap(&rewritten, has_common);
        let slots = bindings::resolve(inputs, &self.aliases, diagnostics)?;
        Ok(PassArtifacts {
            source: wrapped,
            bindings: slots,
        })
    }

    fn commit(&mut self, staged: StagedLoad) {
        self.info = Some(staged.info);
        self.version = Some(staged.version);
        self.common = staged.common;
        for (target, pass) in self.buffers.iter_mut().zip(staged.buffers) {
            target.cook_enabled = pass.is_some();
            target.pass = pass;
        }
        self.image = Some(staged.image);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::SamplerConfig;

    fn pass(role: PassRole, name: &str, source: &str, inputs: Vec<InputChannel>) -> RenderPass {
        RenderPass {
            role,
            name: name.to_string(),
            source: source.to_string(),
            inputs,
        }
    }

    fn descriptor(passes: Vec<RenderPass>) -> ShaderDescriptor {
        ShaderDescriptor {
            info: ShaderInfo::default(),
            version: "0.1".to_string(),
            passes,
        }
    }

    fn channel(index: u32, ctype: &str, source: &str) -> InputChannel {
        InputChannel {
            index,
            ctype: ctype.to_string(),
            source: source.to_string(),
            sampler: SamplerConfig::default(),
        }
    }

    const IMAGE_SRC: &str = "void mainImage(out vec4 c, in vec2 p) { c = vec4(p, 0.0, 1.0); }";

    #[test]
    fn common_include_is_rewritten_against_image_inputs() {
        let mut graph = ShaderGraph::new();
        graph
            .load(&descriptor(vec![
                pass(
                    PassRole::Common,
                    "Common",
                    "vec4 shared_tap(vec2 p) { return texture(iChannel0, p); }",
                    Vec::new(),
                ),
                pass(
                    PassRole::Image,
                    "Image",
                    IMAGE_SRC,
                    vec![channel(0, "cubemap", "/media/a/forest.png")],
                ),
            ]))
            .unwrap();

        let common = graph.common_include().unwrap();
        assert!(common.contains("sTDCubeInputs[0]"));
        // Include text is raw: no preamble, no entry point.
        assert!(!common.contains("uniform vec3"));
        assert!(!common.contains("void main()"));
        assert!(graph.image_pass().unwrap().source.contains("#include <../common>"));
    }

    #[test]
    fn buffer_cross_reference_and_cooking() {
        let mut graph = ShaderGraph::new();
        graph
            .load(&descriptor(vec![
                pass(
                    PassRole::Buffer,
                    "Buf A",
                    "void mainImage(out vec4 c, in vec2 p) { c = texture(iChannel0, p); }",
                    vec![channel(0, "buffer", "/media/previz/buffer00.png")],
                ),
                pass(
                    PassRole::Image,
                    "Image",
                    IMAGE_SRC,
                    vec![channel(0, "buffer", "/media/previz/buffer00.png")],
                ),
            ]))
            .unwrap();

        assert!(graph.cook_enabled(BufferSlot::A));
        for slot in [BufferSlot::B, BufferSlot::C, BufferSlot::D] {
            assert!(!graph.cook_enabled(slot));
            assert!(graph.buffer_pass(slot).is_none());
        }
        let image = graph.image_pass().unwrap();
        let binding = image.bindings[0].channel.as_ref().unwrap();
        assert_eq!(
            binding.source,
            crate::translate::bindings::ResolvedSource::BufferOutput(BufferSlot::A)
        );
    }

    #[test]
    fn duplicate_image_pass_is_a_shape_error() {
        let mut graph = ShaderGraph::new();
        let err = graph
            .load(&descriptor(vec![
                pass(PassRole::Image, "Image", IMAGE_SRC, Vec::new()),
                pass(PassRole::Image, "Image 2", IMAGE_SRC, Vec::new()),
            ]))
            .unwrap_err();
        assert!(matches!(err, LoadError::Shape(_)));
        assert_eq!(graph.state(), GraphState::Failed);
    }

    #[test]
    fn duplicate_buffer_slot_is_a_shape_error() {
        let mut graph = ShaderGraph::new();
        let err = graph
            .load(&descriptor(vec![
                pass(PassRole::Buffer, "Buf A", IMAGE_SRC, Vec::new()),
                pass(PassRole::Buffer, "Buffer A", IMAGE_SRC, Vec::new()),
                pass(PassRole::Image, "Image", IMAGE_SRC, Vec::new()),
            ]))
            .unwrap_err();
        assert!(matches!(err, LoadError::Shape(_)));
    }

    #[test]
    fn unsupported_pass_role_is_skipped_with_diagnostic() {
        let mut graph = ShaderGraph::new();
        let summary = graph
            .load(&descriptor(vec![
                pass(PassRole::Other, "Sound", "vec2 mainSound(float t) {}", Vec::new()),
                pass(PassRole::Image, "Image", IMAGE_SRC, Vec::new()),
            ]))
            .unwrap();
        assert_eq!(
            summary.diagnostics,
            vec![Diagnostic::UnsupportedPassRole {
                name: "Sound".to_string()
            }]
        );
    }

    #[test]
    fn fetch_failure_leaves_state_untouched() {
        struct FailingFetch;
        impl FetchShader for FailingFetch {
            fn fetch(&mut self) -> anyhow::Result<ShaderDescriptor> {
                anyhow::bail!("503 from upstream")
            }
        }

        let mut graph = ShaderGraph::new();
        graph
            .load(&descriptor(vec![pass(
                PassRole::Image,
                "Image",
                IMAGE_SRC,
                Vec::new(),
            )]))
            .unwrap();
        assert_eq!(graph.state(), GraphState::Ready);

        let err = graph.load_from(&mut FailingFetch).unwrap_err();
        assert!(matches!(err, LoadError::Fetch(_)));
        // No mutation happened: still Ready, image still installed.
        assert_eq!(graph.state(), GraphState::Ready);
        assert!(graph.image_pass().is_some());
    }

    #[test]
    fn custom_alias_table_is_honored() {
        use std::collections::HashMap;

        let mut names = HashMap::new();
        names.insert("Glow".to_string(), BufferSlot::D);
        let mut graph =
            ShaderGraph::with_aliases(crate::translate::bindings::BufferAliases::new(
                names,
                HashMap::new(),
            ));
        graph
            .load(&descriptor(vec![
                pass(PassRole::Buffer, "glow", IMAGE_SRC, Vec::new()),
                pass(PassRole::Image, "Image", IMAGE_SRC, Vec::new()),
            ]))
            .unwrap();
        assert!(graph.cook_enabled(BufferSlot::D));
        assert!(graph.buffer_pass(BufferSlot::D).is_some());
    }

    #[test]
    fn load_summary_requests_deferred_time_reset() {
        let mut graph = ShaderGraph::new();
        let summary = graph
            .load(&descriptor(vec![pass(
                PassRole::Image,
                "Image",
                IMAGE_SRC,
                Vec::new(),
            )]))
            .unwrap();
        assert!(summary.time_reset.reset_now);
        assert_eq!(summary.time_reset.deferred_steps, 1);
    }
}
