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

//! The factory seam backends implement to compile pipeline state.

use crate::gci::state::blend::BlendConfig;
use crate::gci::state::common::CompiledPipelineState;
use crate::gci::state::depth_stencil::DepthStencilConfig;
use crate::gci::state::input_layout::IaInputLayoutDefinition;
use crate::gci::state::pso::GraphicsPipelineStateObjectCreateInfo;
use crate::gci::state::rasterizer::RasterizerConfig;
use crate::gci::state::render_pass::RenderPassConfiguration;
use crate::gci::state::render_target::RenderTargetBindingDefinition;
use crate::gci::state::root_signature::RootSignatureDesc;
use crate::gci::state::shader_linkage::GraphicsShaderBinding;
use crate::gci::state::vertex_stream::IaVertexStreamDefinition;

/// Compiles plain configuration values into backend-native pipeline state.
///
/// Every method returns `None` when the backend cannot realize the
/// configuration. That is an expected outcome, not a bug; the cache lifts it
/// into a [`PipelineStateError`](crate::gci::error::PipelineStateError) for
/// the caller. Factories must be callable from any thread because cache
/// misses compile under the cache's own locks.
pub trait PipelineStateDescriptorFactory: Send + Sync {
    /// Compiles a color blending configuration.
    fn create_blend_state(&self, config: &BlendConfig) -> Option<CompiledPipelineState>;

    /// Compiles a depth/stencil test configuration.
    fn create_depth_stencil_state(
        &self,
        config: &DepthStencilConfig,
    ) -> Option<CompiledPipelineState>;

    /// Compiles a rasterizer configuration.
    fn create_rasterizer_state(&self, config: &RasterizerConfig)
        -> Option<CompiledPipelineState>;

    /// Links a set of shader stages.
    fn create_shader_linkage(
        &self,
        binding: &GraphicsShaderBinding,
    ) -> Option<CompiledPipelineState>;

    /// Compiles a vertex attribute layout.
    fn create_input_layout(
        &self,
        definition: &IaInputLayoutDefinition,
    ) -> Option<CompiledPipelineState>;

    /// Compiles a vertex/index buffer binding set.
    fn create_vertex_stream(
        &self,
        definition: &IaVertexStreamDefinition,
    ) -> Option<CompiledPipelineState>;

    /// Compiles a render target attachment binding.
    fn create_render_target_binding(
        &self,
        definition: &RenderTargetBindingDefinition,
    ) -> Option<CompiledPipelineState>;

    /// Compiles a render pass load/store configuration.
    fn create_render_pass(
        &self,
        configuration: &RenderPassConfiguration,
    ) -> Option<CompiledPipelineState>;

    /// Compiles a root signature.
    fn create_root_signature(&self, desc: &RootSignatureDesc) -> Option<CompiledPipelineState>;

    /// Assembles a full graphics pipeline from already-compiled sub-states.
    fn create_graphics_pipeline_state(
        &self,
        info: &GraphicsPipelineStateObjectCreateInfo,
    ) -> Option<CompiledPipelineState>;

    /// Re-validates the current configuration of a dynamic render pass just
    /// before it is applied. The default accepts everything; backends with
    /// stricter pass rules override this.
    fn validate_dynamic_render_pass(
        &self,
        _configuration: &RenderPassConfiguration,
    ) -> Result<(), crate::gci::error::PipelineStateError> {
        Ok(())
    }
}
