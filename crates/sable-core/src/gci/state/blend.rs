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

//! Color blending configuration and descriptor.

use crate::gci::cache::{CachedPipelineState, PipelineStateCacheUnit, PipelineStateDescriptorCache};
use crate::gci::state::common::{
    CompiledPipelineState, PipelineStateDescriptor, PipelineStateDescriptorType,
    RenderTargetAttachmentFlags, StateDescriptorId, MAX_COLOR_ATTACHMENTS,
};
use crate::gci::state::enums::{BlendFactor, BlendOperation};
use crate::gci::traits::PipelineStateDescriptorFactory;
use crate::sable_bitflags;

sable_bitflags! {
    /// Which color channels a blend attachment writes.
    pub struct BlendWriteMask: u8 {
        /// Red channel.
        const R = 1 << 0;
        /// Green channel.
        const G = 1 << 1;
        /// Blue channel.
        const B = 1 << 2;
        /// Alpha channel.
        const A = 1 << 3;
        /// Every channel.
        const ALL = 0x0F;
    }
}

sable_bitflags! {
    /// Global blend behavior switches.
    pub struct BlendFlags: u8 {
        /// Use the fragment alpha to derive MSAA coverage.
        const ALPHA_TO_COVERAGE = 1 << 0;
        /// Attachments use their own settings instead of attachment 0's.
        const INDEPENDENT_ATTACHMENT_BLEND = 1 << 1;
    }
}

/// The blend equation and write mask for one color attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentBlendSettings {
    /// Factor applied to the source color.
    pub src_color_factor: BlendFactor,
    /// Factor applied to the destination color.
    pub dst_color_factor: BlendFactor,
    /// Operation combining the color terms.
    pub color_op: BlendOperation,
    /// Factor applied to the source alpha.
    pub src_alpha_factor: BlendFactor,
    /// Factor applied to the destination alpha.
    pub dst_alpha_factor: BlendFactor,
    /// Operation combining the alpha terms.
    pub alpha_op: BlendOperation,
    /// Channels written to the attachment.
    pub write_mask: BlendWriteMask,
}

impl AttachmentBlendSettings {
    /// Pass-through replace blending (`src * 1 + dst * 0`).
    pub const REPLACE: Self = Self {
        src_color_factor: BlendFactor::One,
        dst_color_factor: BlendFactor::Zero,
        color_op: BlendOperation::Add,
        src_alpha_factor: BlendFactor::One,
        dst_alpha_factor: BlendFactor::Zero,
        alpha_op: BlendOperation::Add,
        write_mask: BlendWriteMask::ALL,
    };

    /// Standard premultiplied-style alpha blending.
    pub const ALPHA: Self = Self {
        src_color_factor: BlendFactor::SrcAlpha,
        dst_color_factor: BlendFactor::OneMinusSrcAlpha,
        color_op: BlendOperation::Add,
        src_alpha_factor: BlendFactor::One,
        dst_alpha_factor: BlendFactor::OneMinusSrcAlpha,
        alpha_op: BlendOperation::Add,
        write_mask: BlendWriteMask::ALL,
    };
}

impl Default for AttachmentBlendSettings {
    fn default() -> Self {
        Self::REPLACE
    }
}

/// Complete blend configuration for a pipeline.
///
/// `attachments[i] == None` means blending is disabled for color attachment
/// `i` (the attachment is written unblended).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BlendConfig {
    /// Global blend switches.
    pub flags: BlendFlags,
    /// Per-attachment blend equations; `None` disables blending for a slot.
    pub attachments: [Option<AttachmentBlendSettings>; MAX_COLOR_ATTACHMENTS],
}

impl BlendConfig {
    /// A configuration with blending disabled on every attachment (opaque
    /// rendering).
    pub const fn disabled() -> Self {
        Self {
            flags: BlendFlags::EMPTY,
            attachments: [None; MAX_COLOR_ATTACHMENTS],
        }
    }

    /// A configuration applying `settings` to attachment 0 only.
    pub fn single(settings: AttachmentBlendSettings) -> Self {
        let mut config = Self::disabled();
        config.attachments[0] = Some(settings);
        config
    }

    /// The set of attachments with blending enabled, computed from the
    /// configuration content.
    pub fn active_attachments_mask(&self) -> RenderTargetAttachmentFlags {
        let mut mask = RenderTargetAttachmentFlags::EMPTY;
        for (index, attachment) in self.attachments.iter().enumerate() {
            if attachment.is_some() {
                mask.insert(RenderTargetAttachmentFlags::color(index));
            }
        }
        mask
    }
}

/// A compiled, cache-owned blend state.
#[derive(Debug)]
pub struct BlendStateDescriptor {
    id: StateDescriptorId,
    flags: BlendFlags,
    active_attachments: RenderTargetAttachmentFlags,
    compiled: CompiledPipelineState,
}

impl BlendStateDescriptor {
    /// Global blend switches captured at creation.
    pub fn flags(&self) -> BlendFlags {
        self.flags
    }

    /// The attachments with blending enabled, precomputed at creation.
    pub fn active_attachments(&self) -> RenderTargetAttachmentFlags {
        self.active_attachments
    }

    /// The backend-opaque compiled state.
    pub fn compiled(&self) -> &CompiledPipelineState {
        &self.compiled
    }
}

impl PipelineStateDescriptor for BlendStateDescriptor {
    fn descriptor_id(&self) -> StateDescriptorId {
        self.id
    }

    fn descriptor_type(&self) -> PipelineStateDescriptorType {
        PipelineStateDescriptorType::Blend
    }
}

impl CachedPipelineState for BlendStateDescriptor {
    type Config = BlendConfig;

    const DESCRIPTOR_TYPE: PipelineStateDescriptorType = PipelineStateDescriptorType::Blend;

    fn compile(
        factory: &dyn PipelineStateDescriptorFactory,
        config: &Self::Config,
    ) -> Option<CompiledPipelineState> {
        factory.create_blend_state(config)
    }

    fn from_compiled(
        id: StateDescriptorId,
        config: &Self::Config,
        compiled: CompiledPipelineState,
    ) -> Self {
        Self {
            id,
            flags: config.flags,
            active_attachments: config.active_attachments_mask(),
            compiled,
        }
    }

    fn unit_of(cache: &PipelineStateDescriptorCache) -> &PipelineStateCacheUnit<Self> {
        cache.blend_unit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_config_has_no_active_attachments() {
        assert_eq!(
            BlendConfig::disabled().active_attachments_mask(),
            RenderTargetAttachmentFlags::EMPTY
        );
    }

    #[test]
    fn single_config_activates_slot_zero() {
        let config = BlendConfig::single(AttachmentBlendSettings::ALPHA);
        assert_eq!(
            config.active_attachments_mask(),
            RenderTargetAttachmentFlags::COLOR_0
        );
    }

    #[test]
    fn identical_configs_hash_identically() {
        use crate::gci::state::common::config_hash;
        let a = BlendConfig::single(AttachmentBlendSettings::ALPHA);
        let b = BlendConfig::single(AttachmentBlendSettings::ALPHA);
        assert_eq!(a, b);
        assert_eq!(config_hash(&a), config_hash(&b));
        assert_ne!(config_hash(&a), config_hash(&BlendConfig::disabled()));
    }
}
