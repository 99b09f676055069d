// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Descriptor identity: IDs, content hashes, category tags, and the
//! backend-opaque compiled state payload.

use crate::sable_bitflags;
use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Maximum number of simultaneously bound color attachments.
pub const MAX_COLOR_ATTACHMENTS: usize = 8;

/// Maximum number of vertex input attributes.
pub const MAX_VERTEX_ATTRIBUTES: usize = 16;

/// Maximum number of bound vertex buffer slots.
pub const MAX_VERTEX_BUFFER_BINDINGS: usize = 16;

/// The identity of one pipeline state descriptor, unique within its category.
///
/// Client code may choose small explicit IDs; cache-assigned IDs live in the
/// [`Self::AUTO_BASE`] range and dynamic (uncached) descriptors in the
/// [`Self::DYNAMIC_BASE`] range, so the three spaces never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateDescriptorId(pub u64);

impl StateDescriptorId {
    /// First ID of the cache-assigned (auto) range.
    pub const AUTO_BASE: StateDescriptorId = StateDescriptorId(1 << 63);
    /// First ID of the dynamic-descriptor range.
    pub const DYNAMIC_BASE: StateDescriptorId = StateDescriptorId(1 << 62);
}

/// How a caller wants the descriptor ID chosen at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateDescriptorIdRequest {
    /// Let the cache assign an unused ID from the auto range.
    Auto,
    /// Register the descriptor under this exact ID.
    Explicit(StateDescriptorId),
}

/// The content hash of a configuration value, used for dedup lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateConfigHash(pub u64);

/// Computes the content hash of a configuration value.
pub fn config_hash<C: Hash + ?Sized>(config: &C) -> StateConfigHash {
    let mut hasher = rustc_hash::FxHasher::default();
    config.hash(&mut hasher);
    StateConfigHash(hasher.finish())
}

/// The closed set of pipeline state descriptor categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStateDescriptorType {
    /// Color blending state.
    Blend,
    /// Depth and stencil test state.
    DepthStencil,
    /// Rasterizer state.
    Rasterizer,
    /// Linked graphics shader stages.
    GraphicsShaderLinkage,
    /// Input-assembler vertex attribute layout.
    IaInputLayout,
    /// Input-assembler vertex/index buffer bindings.
    IaVertexStream,
    /// Render target attachment binding.
    RenderTargetBinding,
    /// Render pass load/store configuration.
    RenderPassConfiguration,
    /// Root signature (resource binding layout).
    RootSignature,
}

impl PipelineStateDescriptorType {
    /// Returns the bitmask flag for this category.
    pub const fn flag(&self) -> PipelineStateDescriptorTypeFlags {
        match self {
            Self::Blend => PipelineStateDescriptorTypeFlags::BLEND,
            Self::DepthStencil => PipelineStateDescriptorTypeFlags::DEPTH_STENCIL,
            Self::Rasterizer => PipelineStateDescriptorTypeFlags::RASTERIZER,
            Self::GraphicsShaderLinkage => {
                PipelineStateDescriptorTypeFlags::GRAPHICS_SHADER_LINKAGE
            }
            Self::IaInputLayout => PipelineStateDescriptorTypeFlags::IA_INPUT_LAYOUT,
            Self::IaVertexStream => PipelineStateDescriptorTypeFlags::IA_VERTEX_STREAM,
            Self::RenderTargetBinding => PipelineStateDescriptorTypeFlags::RENDER_TARGET_BINDING,
            Self::RenderPassConfiguration => {
                PipelineStateDescriptorTypeFlags::RENDER_PASS_CONFIGURATION
            }
            Self::RootSignature => PipelineStateDescriptorTypeFlags::ROOT_SIGNATURE,
        }
    }
}

sable_bitflags! {
    /// A set of descriptor categories, used for selective cache resets.
    pub struct PipelineStateDescriptorTypeFlags: u16 {
        /// Color blending state.
        const BLEND = 1 << 0;
        /// Depth and stencil test state.
        const DEPTH_STENCIL = 1 << 1;
        /// Rasterizer state.
        const RASTERIZER = 1 << 2;
        /// Linked graphics shader stages.
        const GRAPHICS_SHADER_LINKAGE = 1 << 3;
        /// Input-assembler vertex attribute layout.
        const IA_INPUT_LAYOUT = 1 << 4;
        /// Input-assembler vertex/index buffer bindings.
        const IA_VERTEX_STREAM = 1 << 5;
        /// Render target attachment binding.
        const RENDER_TARGET_BINDING = 1 << 6;
        /// Render pass load/store configuration.
        const RENDER_PASS_CONFIGURATION = 1 << 7;
        /// Root signature.
        const ROOT_SIGNATURE = 1 << 8;
        /// The categories invalidated when render target topology changes.
        const RENDER_TARGET_DEPENDENT = Self::RENDER_TARGET_BINDING.bits()
            | Self::RENDER_PASS_CONFIGURATION.bits();
        /// Every category.
        const ALL = 0x1FF;
    }
}

sable_bitflags! {
    /// A set of render target attachment slots.
    pub struct RenderTargetAttachmentFlags: u16 {
        /// Color attachment 0.
        const COLOR_0 = 1 << 0;
        /// Color attachment 1.
        const COLOR_1 = 1 << 1;
        /// Color attachment 2.
        const COLOR_2 = 1 << 2;
        /// Color attachment 3.
        const COLOR_3 = 1 << 3;
        /// Color attachment 4.
        const COLOR_4 = 1 << 4;
        /// Color attachment 5.
        const COLOR_5 = 1 << 5;
        /// Color attachment 6.
        const COLOR_6 = 1 << 6;
        /// Color attachment 7.
        const COLOR_7 = 1 << 7;
        /// The depth/stencil attachment.
        const DEPTH_STENCIL = 1 << 8;
        /// Every color attachment.
        const ALL_COLOR = 0xFF;
    }
}

impl RenderTargetAttachmentFlags {
    /// Returns the flag for color attachment `index`.
    ///
    /// Panics if `index >= MAX_COLOR_ATTACHMENTS`.
    pub fn color(index: usize) -> Self {
        assert!(index < MAX_COLOR_ATTACHMENTS, "color attachment index out of range");
        Self::from_bits(1 << index)
    }
}

/// Backend-opaque compiled pipeline state produced by a
/// [`PipelineStateDescriptorFactory`](crate::gci::traits::PipelineStateDescriptorFactory).
///
/// The GCI never inspects the payload; backends downcast it back to their
/// native representation inside `apply_state_changes`.
pub struct CompiledPipelineState {
    inner: Box<dyn Any + Send + Sync>,
}

impl CompiledPipelineState {
    /// Wraps a backend-native compiled state object.
    pub fn new<S: Send + Sync + 'static>(state: S) -> Self {
        Self {
            inner: Box::new(state),
        }
    }

    /// Downcasts the payload back to the backend-native type.
    pub fn downcast_ref<S: 'static>(&self) -> Option<&S> {
        self.inner.downcast_ref::<S>()
    }
}

impl fmt::Debug for CompiledPipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CompiledPipelineState(..)")
    }
}

/// Shared surface of every pipeline state descriptor.
pub trait PipelineStateDescriptor {
    /// The descriptor's immutable identity within its category.
    fn descriptor_id(&self) -> StateDescriptorId;

    /// The descriptor's category tag.
    fn descriptor_type(&self) -> PipelineStateDescriptorType;

    /// `true` for client-mutable runtime overrides that bypass the cache and
    /// carry no compiled state.
    fn is_dynamic(&self) -> bool {
        false
    }
}
