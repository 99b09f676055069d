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

//! Rasterizer configuration and descriptor.

use crate::gci::cache::{CachedPipelineState, PipelineStateCacheUnit, PipelineStateDescriptorCache};
use crate::gci::state::common::{
    CompiledPipelineState, PipelineStateDescriptor, PipelineStateDescriptorType, StateDescriptorId,
};
use crate::gci::state::enums::{CullMode, FrontFace, PolygonMode};
use crate::gci::traits::PipelineStateDescriptorFactory;

/// Depth bias applied during rasterization.
///
/// The floating-point terms are stored as raw bit patterns so the whole
/// configuration stays `Eq + Hash` for content addressing; use the
/// constructor and accessors to work in `f32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DepthBiasSettings {
    /// Constant bias in implementation units.
    pub constant: i32,
    slope_scale_bits: u32,
    clamp_bits: u32,
}

impl DepthBiasSettings {
    /// Builds bias settings from floating-point slope scale and clamp terms.
    pub fn new(constant: i32, slope_scale: f32, clamp: f32) -> Self {
        Self {
            constant,
            slope_scale_bits: slope_scale.to_bits(),
            clamp_bits: clamp.to_bits(),
        }
    }

    /// Bias factor applied per unit of primitive slope.
    pub fn slope_scale(&self) -> f32 {
        f32::from_bits(self.slope_scale_bits)
    }

    /// Maximum total bias, 0.0 meaning unclamped.
    pub fn clamp(&self) -> f32 {
        f32::from_bits(self.clamp_bits)
    }

    /// True when no bias is applied at all.
    pub fn is_zero(&self) -> bool {
        self.constant == 0 && self.slope_scale() == 0.0
    }
}

/// Complete rasterizer configuration for a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RasterizerConfig {
    /// Triangle fill mode.
    pub polygon_mode: PolygonMode,
    /// Face culling.
    pub cull_mode: CullMode,
    /// Winding order considered front-facing.
    pub front_face: FrontFace,
    /// Depth bias applied to rasterized fragments.
    pub depth_bias: DepthBiasSettings,
    /// Clamp fragment depth instead of clipping against the near/far planes.
    pub depth_clamp: bool,
    /// Enable conservative rasterization.
    pub conservative: bool,
}

impl RasterizerConfig {
    /// Standard solid rendering with back-face culling.
    pub fn solid_cull_back() -> Self {
        Self {
            cull_mode: CullMode::Back,
            ..Self::default()
        }
    }
}

/// A compiled, cache-owned rasterizer state.
#[derive(Debug)]
pub struct RasterizerStateDescriptor {
    id: StateDescriptorId,
    cull_mode: CullMode,
    has_depth_bias: bool,
    compiled: CompiledPipelineState,
}

impl RasterizerStateDescriptor {
    /// Face culling captured at creation.
    pub fn cull_mode(&self) -> CullMode {
        self.cull_mode
    }

    /// True when the configuration applies a nonzero depth bias.
    pub fn has_depth_bias(&self) -> bool {
        self.has_depth_bias
    }

    /// The backend-opaque compiled state.
    pub fn compiled(&self) -> &CompiledPipelineState {
        &self.compiled
    }
}

impl PipelineStateDescriptor for RasterizerStateDescriptor {
    fn descriptor_id(&self) -> StateDescriptorId {
        self.id
    }

    fn descriptor_type(&self) -> PipelineStateDescriptorType {
        PipelineStateDescriptorType::Rasterizer
    }
}

impl CachedPipelineState for RasterizerStateDescriptor {
    type Config = RasterizerConfig;

    const DESCRIPTOR_TYPE: PipelineStateDescriptorType = PipelineStateDescriptorType::Rasterizer;

    fn compile(
        factory: &dyn PipelineStateDescriptorFactory,
        config: &Self::Config,
    ) -> Option<CompiledPipelineState> {
        factory.create_rasterizer_state(config)
    }

    fn from_compiled(
        id: StateDescriptorId,
        config: &Self::Config,
        compiled: CompiledPipelineState,
    ) -> Self {
        Self {
            id,
            cull_mode: config.cull_mode,
            has_depth_bias: !config.depth_bias.is_zero(),
            compiled,
        }
    }

    fn unit_of(cache: &PipelineStateDescriptorCache) -> &PipelineStateCacheUnit<Self> {
        cache.rasterizer_unit()
    }
}
