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

//! Render target binding configuration and descriptor.

use crate::gci::cache::{CachedPipelineState, PipelineStateCacheUnit, PipelineStateDescriptorCache};
use crate::gci::resources::TextureId;
use crate::gci::state::common::{
    CompiledPipelineState, PipelineStateDescriptor, PipelineStateDescriptorType,
    RenderTargetAttachmentFlags, StateDescriptorId, MAX_COLOR_ATTACHMENTS,
};
use crate::gci::state::enums::TextureFormat;
use crate::gci::traits::PipelineStateDescriptorFactory;

/// One texture attached as a render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetAttachmentBinding {
    /// Target texture.
    pub texture: TextureId,
    /// Format the attachment is written as.
    pub format: TextureFormat,
    /// Mip level rendered into.
    pub mip_level: u32,
    /// Array layer rendered into.
    pub array_layer: u32,
}

impl RenderTargetAttachmentBinding {
    /// Binds mip 0, layer 0 of `texture`.
    pub fn base(texture: TextureId, format: TextureFormat) -> Self {
        Self {
            texture,
            format,
            mip_level: 0,
            array_layer: 0,
        }
    }
}

/// The full set of attachments a pipeline renders into.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderTargetBindingDefinition {
    /// Color attachments; `None` leaves a slot unbound.
    pub colors: [Option<RenderTargetAttachmentBinding>; MAX_COLOR_ATTACHMENTS],
    /// Depth/stencil attachment, if any.
    pub depth_stencil: Option<RenderTargetAttachmentBinding>,
    /// Samples per pixel, 1 for non-multisampled rendering.
    pub sample_count: u32,
}

impl Default for RenderTargetBindingDefinition {
    fn default() -> Self {
        Self {
            colors: [None; MAX_COLOR_ATTACHMENTS],
            depth_stencil: None,
            sample_count: 1,
        }
    }
}

impl RenderTargetBindingDefinition {
    /// A single color attachment in slot 0.
    pub fn single_color(binding: RenderTargetAttachmentBinding) -> Self {
        let mut definition = Self::default();
        definition.colors[0] = Some(binding);
        definition
    }

    /// The set of bound attachments, computed from the content.
    pub fn bound_attachments(&self) -> RenderTargetAttachmentFlags {
        let mut flags = RenderTargetAttachmentFlags::EMPTY;
        for (index, color) in self.colors.iter().enumerate() {
            if color.is_some() {
                flags.insert(RenderTargetAttachmentFlags::color(index));
            }
        }
        if self.depth_stencil.is_some() {
            flags.insert(RenderTargetAttachmentFlags::DEPTH_STENCIL);
        }
        flags
    }

    /// Checks that the depth/stencil slot, when bound, actually carries a
    /// depth format, and that at least one attachment is present.
    pub fn validate(&self) -> Result<(), String> {
        if self.bound_attachments().is_empty() {
            return Err("render target binding has no attachments".to_owned());
        }
        if self.sample_count == 0 || !self.sample_count.is_power_of_two() {
            return Err(format!(
                "sample count {} is not a power of two",
                self.sample_count
            ));
        }
        if let Some(ds) = &self.depth_stencil {
            if !ds.format.is_depth_format() {
                return Err(format!(
                    "depth/stencil slot bound with non-depth format {:?}",
                    ds.format
                ));
            }
        }
        for color in self.colors.iter().flatten() {
            if color.format.is_depth_format() {
                return Err(format!(
                    "color slot bound with depth format {:?}",
                    color.format
                ));
            }
        }
        Ok(())
    }
}

/// A compiled, cache-owned render target binding.
#[derive(Debug)]
pub struct RenderTargetBindingDescriptor {
    id: StateDescriptorId,
    bound_attachments: RenderTargetAttachmentFlags,
    sample_count: u32,
    compiled: CompiledPipelineState,
}

impl RenderTargetBindingDescriptor {
    /// The bound attachments, precomputed at creation.
    pub fn bound_attachments(&self) -> RenderTargetAttachmentFlags {
        self.bound_attachments
    }

    /// Samples per pixel captured at creation.
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// The backend-opaque compiled state.
    pub fn compiled(&self) -> &CompiledPipelineState {
        &self.compiled
    }
}

impl PipelineStateDescriptor for RenderTargetBindingDescriptor {
    fn descriptor_id(&self) -> StateDescriptorId {
        self.id
    }

    fn descriptor_type(&self) -> PipelineStateDescriptorType {
        PipelineStateDescriptorType::RenderTargetBinding
    }
}

impl CachedPipelineState for RenderTargetBindingDescriptor {
    type Config = RenderTargetBindingDefinition;

    const DESCRIPTOR_TYPE: PipelineStateDescriptorType = PipelineStateDescriptorType::RenderTargetBinding;

    fn compile(
        factory: &dyn PipelineStateDescriptorFactory,
        config: &Self::Config,
    ) -> Option<CompiledPipelineState> {
        factory.create_render_target_binding(config)
    }

    fn from_compiled(
        id: StateDescriptorId,
        config: &Self::Config,
        compiled: CompiledPipelineState,
    ) -> Self {
        Self {
            id,
            bound_attachments: config.bound_attachments(),
            sample_count: config.sample_count,
            compiled,
        }
    }

    fn unit_of(cache: &PipelineStateDescriptorCache) -> &PipelineStateCacheUnit<Self> {
        cache.render_target_unit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_color_reports_slot_zero() {
        let definition = RenderTargetBindingDefinition::single_color(
            RenderTargetAttachmentBinding::base(TextureId(1), TextureFormat::Bgra8UnormSrgb),
        );
        assert_eq!(
            definition.bound_attachments(),
            RenderTargetAttachmentFlags::COLOR_0
        );
        assert!(definition.validate().is_ok());
    }

    #[test]
    fn empty_binding_fails_validation() {
        assert!(RenderTargetBindingDefinition::default().validate().is_err());
    }

    #[test]
    fn color_slot_rejects_depth_format() {
        let definition = RenderTargetBindingDefinition::single_color(
            RenderTargetAttachmentBinding::base(TextureId(1), TextureFormat::Depth32Float),
        );
        assert!(definition.validate().is_err());
    }

    #[test]
    fn depth_slot_requires_depth_format() {
        let mut definition = RenderTargetBindingDefinition::single_color(
            RenderTargetAttachmentBinding::base(TextureId(1), TextureFormat::Rgba8Unorm),
        );
        definition.depth_stencil = Some(RenderTargetAttachmentBinding::base(
            TextureId(2),
            TextureFormat::Rgba8Unorm,
        ));
        assert!(definition.validate().is_err());
        definition.depth_stencil = Some(RenderTargetAttachmentBinding::base(
            TextureId(2),
            TextureFormat::Depth24PlusStencil8,
        ));
        assert!(definition.validate().is_ok());
    }
}
