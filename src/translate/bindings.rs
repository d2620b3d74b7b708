//! Resolution of declared input channels to concrete sampler bindings.
//!
//! Every pass gets exactly [`CHANNEL_COUNT`] binding slots. Slots without a
//! declared channel are explicitly cleared (empty 2D selector, procedural
//! default cubemap) so nothing leaks from a previously loaded shader.

use std::collections::HashMap;
use std::fmt;

use crate::descriptor::{CHANNEL_COUNT, ContentType, InputChannel, SamplerConfig};
use crate::error::{Diagnostic, LoadError};

/// The four canonical buffer targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferSlot {
    A,
    B,
    C,
    D,
}

impl BufferSlot {
    pub const ALL: [BufferSlot; CHANNEL_COUNT] =
        [BufferSlot::A, BufferSlot::B, BufferSlot::C, BufferSlot::D];

    pub fn index(self) -> usize {
        match self {
            BufferSlot::A => 0,
            BufferSlot::B => 1,
            BufferSlot::C => 2,
            BufferSlot::D => 3,
        }
    }

    pub fn letter(self) -> char {
        match self {
            BufferSlot::A => 'A',
            BufferSlot::B => 'B',
            BufferSlot::C => 'C',
            BufferSlot::D => 'D',
        }
    }
}

impl fmt::Display for BufferSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Buf {}", self.letter())
    }
}

/// Prefix of the platform's internal buffer-output source paths.
const BUFFER_PATH_PREFIX: &str = "/media/previz/buffer";

/// Canonical buffer name and source-path tables.
///
/// Owned by the graph and passed into resolution, so tests can inject a
/// custom table instead of relying on process-wide constants.
#[derive(Debug, Clone)]
pub struct BufferAliases {
    /// Lowercased pass-name aliases ("buf a", "buffer a", ...).
    names: HashMap<String, BufferSlot>,
    /// Trailing path stems of buffer-output sources ("buffer00", ...).
    path_stems: HashMap<String, BufferSlot>,
}

impl Default for BufferAliases {
    fn default() -> Self {
        let mut names = HashMap::new();
        let mut path_stems = HashMap::new();
        for slot in BufferSlot::ALL {
            let letter = slot.letter().to_ascii_lowercase();
            names.insert(format!("buf {letter}"), slot);
            names.insert(format!("buffer {letter}"), slot);
            path_stems.insert(format!("buffer{:02}", slot.index()), slot);
        }
        Self { names, path_stems }
    }
}

impl BufferAliases {
    pub fn new(
        names: HashMap<String, BufferSlot>,
        path_stems: HashMap<String, BufferSlot>,
    ) -> Self {
        let names = names
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();
        Self { names, path_stems }
    }

    /// Case-insensitive lookup of a buffer pass name.
    pub fn slot_for_pass_name(&self, name: &str) -> Option<BufferSlot> {
        self.names.get(&name.trim().to_ascii_lowercase()).copied()
    }

    /// Matches the platform's internal buffer-output path convention
    /// (`/media/previz/bufferNN.<ext>`). Any other path is an external
    /// resource and passes through unchanged.
    pub fn slot_for_source_path(&self, source: &str) -> Option<BufferSlot> {
        if !source.starts_with(BUFFER_PATH_PREFIX) {
            return None;
        }
        let stem = source.rsplit('/').next().unwrap_or(source);
        let stem = stem.split('.').next().unwrap_or(stem);
        self.path_stems.get(stem).copied()
    }
}

/// Concrete target of a resolved channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedSource {
    /// Output of a local buffer pass (cross-reference between passes).
    BufferOutput(BufferSlot),
    /// Opaque external resource identifier, passed through unchanged.
    External(String),
}

/// Cubemap selector for one channel index.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CubemapTarget {
    /// Built-in procedural default cubemap.
    #[default]
    Default,
    Source(ResolvedSource),
}

/// Declared-channel configuration carried alongside the selectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelBinding {
    pub content_type: ContentType,
    pub source: ResolvedSource,
    pub sampler: SamplerConfig,
    /// Gates the consumer's audio-decoding stage.
    pub audio_reactive: bool,
}

/// One of the four structural binding slots of a pass. `Default` is the
/// cleared state: no channel, empty 2D selector, procedural cubemap.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BindingSlot {
    pub channel: Option<ChannelBinding>,
    /// 2D texture selector; `None` when the slot is cleared or cube-bound.
    pub texture_2d: Option<ResolvedSource>,
    pub cubemap: CubemapTarget,
}

impl BindingSlot {
    pub fn is_cleared(&self) -> bool {
        self.channel.is_none()
    }
}

/// Resolves the declared channels of one pass into four binding slots.
///
/// Shape violations (index out of range, duplicate index) are fatal; an
/// unknown content type is a recorded diagnostic and binds as a 2D texture.
pub(crate) fn resolve(
    inputs: &[InputChannel],
    aliases: &BufferAliases,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<[BindingSlot; CHANNEL_COUNT], LoadError> {
    let mut slots: [BindingSlot; CHANNEL_COUNT] = Default::default();
    let mut declared = [false; CHANNEL_COUNT];

    for input in inputs {
        let index = input.index as usize;
        if index >= CHANNEL_COUNT {
            return Err(LoadError::Shape(format!(
                "input channel index {} out of range 0-{}",
                input.index,
                CHANNEL_COUNT - 1
            )));
        }
        if declared[index] {
            return Err(LoadError::Shape(format!(
                "duplicate input channel index {index}"
            )));
        }
        declared[index] = true;

        let content_type = match ContentType::from_ctype(&input.ctype) {
            Some(t) => t,
            None => {
                Diagnostic::UnknownContentType {
                    channel: input.index,
                    ctype: input.ctype.clone(),
                }
                .record(diagnostics);
                ContentType::Texture2D
            }
        };

        let source = match aliases.slot_for_source_path(&input.source) {
            Some(slot) => ResolvedSource::BufferOutput(slot),
            None => ResolvedSource::External(input.source.clone()),
        };

        let slot = &mut slots[index];
        if content_type.uses_cubemap_binding() {
            slot.cubemap = CubemapTarget::Source(source.clone());
        } else {
            slot.texture_2d = Some(source.clone());
        }
        slot.channel = Some(ChannelBinding {
            content_type,
            source,
            sampler: input.sampler.clone(),
            audio_reactive: content_type.is_audio_reactive(),
        });
    }

    Ok(slots)
}
