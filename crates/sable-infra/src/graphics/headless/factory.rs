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

//! The headless state factory.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use sable_core::gci::error::PipelineStateError;
use sable_core::gci::state::blend::BlendConfig;
use sable_core::gci::state::common::{
    CompiledPipelineState, PipelineStateDescriptorType, PipelineStateDescriptorTypeFlags,
};
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

/// The payload the headless factory puts inside every compiled state.
#[derive(Debug)]
pub struct HeadlessCompiledState {
    /// Category of the configuration this state was compiled from.
    pub descriptor_type: PipelineStateDescriptorType,
    /// Debug rendering of the source configuration.
    pub config_repr: String,
}

/// A factory without a device behind it.
///
/// Every compilation succeeds unless the category was put on the refuse
/// list, and the factory counts how often each category was compiled. Tests
/// use the counters to prove that the cache deduplicates.
#[derive(Debug, Default)]
pub struct HeadlessStateFactory {
    compile_counts: Mutex<HashMap<PipelineStateDescriptorType, usize>>,
    pipeline_compiles: AtomicUsize,
    refused: Mutex<PipelineStateDescriptorTypeFlags>,
    refuse_pipelines: AtomicBool,
    refuse_dynamic_passes: AtomicBool,
}

impl HeadlessStateFactory {
    /// Creates a factory that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts the given categories on the refuse list; their configurations
    /// are rejected from now on.
    pub fn refuse(&self, categories: PipelineStateDescriptorTypeFlags) {
        let mut refused = self.lock_refused();
        refused.insert(categories);
    }

    /// Makes full pipeline assembly fail from now on.
    pub fn refuse_pipelines(&self) {
        self.refuse_pipelines.store(true, Ordering::SeqCst);
    }

    /// Makes dynamic render pass re-validation fail from now on.
    pub fn refuse_dynamic_passes(&self) {
        self.refuse_dynamic_passes.store(true, Ordering::SeqCst);
    }

    /// How often a configuration of `descriptor_type` was compiled.
    pub fn compile_count(&self, descriptor_type: PipelineStateDescriptorType) -> usize {
        let counts = match self.compile_counts.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        counts.get(&descriptor_type).copied().unwrap_or(0)
    }

    /// How often a full pipeline was assembled.
    pub fn pipeline_compile_count(&self) -> usize {
        self.pipeline_compiles.load(Ordering::SeqCst)
    }

    fn lock_refused(&self) -> std::sync::MutexGuard<'_, PipelineStateDescriptorTypeFlags> {
        match self.refused.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn compile<C: Debug>(
        &self,
        descriptor_type: PipelineStateDescriptorType,
        config: &C,
    ) -> Option<CompiledPipelineState> {
        {
            let mut counts = match self.compile_counts.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *counts.entry(descriptor_type).or_insert(0) += 1;
        }
        if self.lock_refused().contains(descriptor_type.flag()) {
            log::debug!("headless factory refusing {descriptor_type:?} configuration");
            return None;
        }
        Some(CompiledPipelineState::new(HeadlessCompiledState {
            descriptor_type,
            config_repr: format!("{config:?}"),
        }))
    }
}

impl PipelineStateDescriptorFactory for HeadlessStateFactory {
    fn create_blend_state(&self, config: &BlendConfig) -> Option<CompiledPipelineState> {
        self.compile(PipelineStateDescriptorType::Blend, config)
    }

    fn create_depth_stencil_state(
        &self,
        config: &DepthStencilConfig,
    ) -> Option<CompiledPipelineState> {
        self.compile(PipelineStateDescriptorType::DepthStencil, config)
    }

    fn create_rasterizer_state(&self, config: &RasterizerConfig) -> Option<CompiledPipelineState> {
        self.compile(PipelineStateDescriptorType::Rasterizer, config)
    }

    fn create_shader_linkage(
        &self,
        binding: &GraphicsShaderBinding,
    ) -> Option<CompiledPipelineState> {
        self.compile(PipelineStateDescriptorType::GraphicsShaderLinkage, binding)
    }

    fn create_input_layout(
        &self,
        definition: &IaInputLayoutDefinition,
    ) -> Option<CompiledPipelineState> {
        if definition.validate().is_err() {
            return None;
        }
        self.compile(PipelineStateDescriptorType::IaInputLayout, definition)
    }

    fn create_vertex_stream(
        &self,
        definition: &IaVertexStreamDefinition,
    ) -> Option<CompiledPipelineState> {
        self.compile(PipelineStateDescriptorType::IaVertexStream, definition)
    }

    fn create_render_target_binding(
        &self,
        definition: &RenderTargetBindingDefinition,
    ) -> Option<CompiledPipelineState> {
        if definition.validate().is_err() {
            return None;
        }
        self.compile(PipelineStateDescriptorType::RenderTargetBinding, definition)
    }

    fn create_render_pass(
        &self,
        configuration: &RenderPassConfiguration,
    ) -> Option<CompiledPipelineState> {
        self.compile(
            PipelineStateDescriptorType::RenderPassConfiguration,
            configuration,
        )
    }

    fn create_root_signature(&self, desc: &RootSignatureDesc) -> Option<CompiledPipelineState> {
        if desc.validate().is_err() {
            return None;
        }
        self.compile(PipelineStateDescriptorType::RootSignature, desc)
    }

    fn create_graphics_pipeline_state(
        &self,
        info: &GraphicsPipelineStateObjectCreateInfo,
    ) -> Option<CompiledPipelineState> {
        self.pipeline_compiles.fetch_add(1, Ordering::SeqCst);
        if self.refuse_pipelines.load(Ordering::SeqCst) {
            return None;
        }
        Some(CompiledPipelineState::new(format!(
            "pipeline {:?}",
            info.identity_key()
        )))
    }

    fn validate_dynamic_render_pass(
        &self,
        configuration: &RenderPassConfiguration,
    ) -> Result<(), PipelineStateError> {
        if self.refuse_dynamic_passes.load(Ordering::SeqCst) {
            return Err(PipelineStateError::DynamicStateRejected {
                details: format!("headless backend refused dynamic pass {configuration:?}"),
            });
        }
        Ok(())
    }
}
