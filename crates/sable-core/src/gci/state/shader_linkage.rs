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

//! Shader stage linkage configuration and descriptor.

use crate::gci::cache::{CachedPipelineState, PipelineStateCacheUnit, PipelineStateDescriptorCache};
use crate::gci::resources::{ShaderId, ShaderStage, ShaderStageFlags};
use crate::gci::state::common::{
    CompiledPipelineState, PipelineStateDescriptor, PipelineStateDescriptorType, StateDescriptorId,
};
use crate::gci::traits::PipelineStateDescriptorFactory;

/// Which compiled shader, if any, occupies each programmable graphics stage.
///
/// A valid graphics binding always has a vertex shader; the other stages are
/// optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GraphicsShaderBinding {
    /// Vertex stage, required for a usable pipeline.
    pub vertex: Option<ShaderId>,
    /// Hull (tessellation control) stage.
    pub hull: Option<ShaderId>,
    /// Domain (tessellation evaluation) stage.
    pub domain: Option<ShaderId>,
    /// Geometry stage.
    pub geometry: Option<ShaderId>,
    /// Pixel stage.
    pub pixel: Option<ShaderId>,
}

impl GraphicsShaderBinding {
    /// The usual vertex + pixel pair.
    pub fn vertex_pixel(vertex: ShaderId, pixel: ShaderId) -> Self {
        Self {
            vertex: Some(vertex),
            pixel: Some(pixel),
            ..Self::default()
        }
    }

    /// The shader bound to `stage`, if any.
    pub fn stage(&self, stage: ShaderStage) -> Option<ShaderId> {
        match stage {
            ShaderStage::Vertex => self.vertex,
            ShaderStage::Hull => self.hull,
            ShaderStage::Domain => self.domain,
            ShaderStage::Geometry => self.geometry,
            ShaderStage::Pixel => self.pixel,
        }
    }

    /// The set of stages with a shader bound.
    pub fn active_stages(&self) -> ShaderStageFlags {
        let mut flags = ShaderStageFlags::EMPTY;
        for stage in ShaderStage::ALL {
            if self.stage(stage).is_some() {
                flags.insert(ShaderStageFlags::from_stage(stage));
            }
        }
        flags
    }

    /// True when the binding can drive a graphics pipeline (the vertex stage
    /// is populated).
    pub fn is_complete(&self) -> bool {
        self.vertex.is_some()
    }
}

/// A compiled, cache-owned shader linkage.
///
/// The original binding is retained as a common property so controllers can
/// diff individual stages when two linkages are swapped.
#[derive(Debug)]
pub struct GraphicsShaderLinkageDescriptor {
    id: StateDescriptorId,
    binding: GraphicsShaderBinding,
    active_stages: ShaderStageFlags,
    compiled: CompiledPipelineState,
}

impl GraphicsShaderLinkageDescriptor {
    /// The per-stage shader assignment captured at creation.
    pub fn binding(&self) -> &GraphicsShaderBinding {
        &self.binding
    }

    /// The stages with a shader bound, precomputed at creation.
    pub fn active_stages(&self) -> ShaderStageFlags {
        self.active_stages
    }

    /// The backend-opaque compiled state.
    pub fn compiled(&self) -> &CompiledPipelineState {
        &self.compiled
    }
}

impl PipelineStateDescriptor for GraphicsShaderLinkageDescriptor {
    fn descriptor_id(&self) -> StateDescriptorId {
        self.id
    }

    fn descriptor_type(&self) -> PipelineStateDescriptorType {
        PipelineStateDescriptorType::GraphicsShaderLinkage
    }
}

impl CachedPipelineState for GraphicsShaderLinkageDescriptor {
    type Config = GraphicsShaderBinding;

    const DESCRIPTOR_TYPE: PipelineStateDescriptorType = PipelineStateDescriptorType::GraphicsShaderLinkage;

    fn compile(
        factory: &dyn PipelineStateDescriptorFactory,
        config: &Self::Config,
    ) -> Option<CompiledPipelineState> {
        factory.create_shader_linkage(config)
    }

    fn from_compiled(
        id: StateDescriptorId,
        config: &Self::Config,
        compiled: CompiledPipelineState,
    ) -> Self {
        Self {
            id,
            binding: *config,
            active_stages: config.active_stages(),
            compiled,
        }
    }

    fn unit_of(cache: &PipelineStateDescriptorCache) -> &PipelineStateCacheUnit<Self> {
        cache.shader_linkage_unit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_pixel_binding_is_complete() {
        let binding = GraphicsShaderBinding::vertex_pixel(ShaderId(1), ShaderId(2));
        assert!(binding.is_complete());
        assert_eq!(
            binding.active_stages(),
            ShaderStageFlags::VERTEX | ShaderStageFlags::PIXEL
        );
        assert_eq!(binding.stage(ShaderStage::Pixel), Some(ShaderId(2)));
        assert_eq!(binding.stage(ShaderStage::Geometry), None);
    }

    #[test]
    fn empty_binding_is_incomplete() {
        assert!(!GraphicsShaderBinding::default().is_complete());
    }
}
