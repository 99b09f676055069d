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

//! The null backend: a factory for an uninitialized or absent device that
//! refuses every configuration.

use sable_core::gci::state::blend::BlendConfig;
use sable_core::gci::state::common::{CompiledPipelineState, PipelineStateDescriptorType};
use sable_core::gci::state::depth_stencil::DepthStencilConfig;
use sable_core::gci::state::input_layout::IaInputLayoutDefinition;
use sable_core::gci::state::pso::GraphicsPipelineStateObjectCreateInfo;
use sable_core::gci::state::rasterizer::RasterizerConfig;
use sable_core::gci::state::render_pass::RenderPassConfiguration;
use sable_core::gci::state::render_target::RenderTargetBindingDefinition;
use sable_core::gci::state::root_signature::RootSignatureDesc;
use sable_core::gci::state::shader_linkage::GraphicsShaderBinding;
use sable_core::gci::state::vertex_stream::IaVertexStreamDefinition;
use sable_core::gci::traits::PipelineStateDescriptorFactory;

/// A factory that refuses every configuration.
///
/// Stands in where no real device exists yet. Refusal is the factory seam's
/// expected outcome, so callers get a clean
/// [`PipelineStateError`](sable_core::gci::error::PipelineStateError) from
/// the cache instead of a crash on a device that was never brought up.
#[derive(Debug, Default)]
pub struct NullPipelineStateFactory;

impl NullPipelineStateFactory {
    /// Creates the factory.
    pub fn new() -> Self {
        Self
    }

    fn refuse(&self, descriptor_type: PipelineStateDescriptorType) -> Option<CompiledPipelineState> {
        log::warn!(
            "null factory refused a {:?} state; no device is available",
            descriptor_type
        );
        None
    }
}

impl PipelineStateDescriptorFactory for NullPipelineStateFactory {
    fn create_blend_state(&self, _config: &BlendConfig) -> Option<CompiledPipelineState> {
        self.refuse(PipelineStateDescriptorType::Blend)
    }

    fn create_depth_stencil_state(
        &self,
        _config: &DepthStencilConfig,
    ) -> Option<CompiledPipelineState> {
        self.refuse(PipelineStateDescriptorType::DepthStencil)
    }

    fn create_rasterizer_state(
        &self,
        _config: &RasterizerConfig,
    ) -> Option<CompiledPipelineState> {
        self.refuse(PipelineStateDescriptorType::Rasterizer)
    }

    fn create_shader_linkage(
        &self,
        _binding: &GraphicsShaderBinding,
    ) -> Option<CompiledPipelineState> {
        self.refuse(PipelineStateDescriptorType::GraphicsShaderLinkage)
    }

    fn create_input_layout(
        &self,
        _definition: &IaInputLayoutDefinition,
    ) -> Option<CompiledPipelineState> {
        self.refuse(PipelineStateDescriptorType::IaInputLayout)
    }

    fn create_vertex_stream(
        &self,
        _definition: &IaVertexStreamDefinition,
    ) -> Option<CompiledPipelineState> {
        self.refuse(PipelineStateDescriptorType::IaVertexStream)
    }

    fn create_render_target_binding(
        &self,
        _definition: &RenderTargetBindingDefinition,
    ) -> Option<CompiledPipelineState> {
        self.refuse(PipelineStateDescriptorType::RenderTargetBinding)
    }

    fn create_render_pass(
        &self,
        _configuration: &RenderPassConfiguration,
    ) -> Option<CompiledPipelineState> {
        self.refuse(PipelineStateDescriptorType::RenderPassConfiguration)
    }

    fn create_root_signature(&self, _desc: &RootSignatureDesc) -> Option<CompiledPipelineState> {
        self.refuse(PipelineStateDescriptorType::RootSignature)
    }

    fn create_graphics_pipeline_state(
        &self,
        _info: &GraphicsPipelineStateObjectCreateInfo,
    ) -> Option<CompiledPipelineState> {
        log::warn!("null factory refused a graphics pipeline; no device is available");
        None
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sable_core::gci::cache::PipelineStateDescriptorCache;
    use sable_core::gci::error::PipelineStateError;
    use sable_core::gci::state::blend::{BlendConfig, BlendStateDescriptor};
    use sable_core::gci::state::common::StateDescriptorIdRequest;

    use super::*;

    #[test]
    fn every_request_is_refused_cleanly() {
        let cache = PipelineStateDescriptorCache::new(Arc::new(NullPipelineStateFactory::new()));
        let err = cache
            .get_or_create::<BlendStateDescriptor>(
                &BlendConfig::disabled(),
                StateDescriptorIdRequest::Auto,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineStateError::UnsupportedConfiguration { .. }
        ));
        assert!(cache.blend_unit().is_empty());
    }
}
