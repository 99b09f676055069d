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

//! The aggregate descriptor cache: one unit per category plus the pipeline
//! state object storage, all behind one factory.

use std::fmt;
use std::sync::Arc;

use crate::gci::cache::unit::{CachedPipelineState, PipelineStateCacheUnit};
use crate::gci::error::PipelineStateError;
use crate::gci::state::blend::BlendStateDescriptor;
use crate::gci::state::common::{
    PipelineStateDescriptorTypeFlags, StateDescriptorId, StateDescriptorIdRequest,
};
use crate::gci::state::depth_stencil::DepthStencilStateDescriptor;
use crate::gci::state::input_layout::IaInputLayoutDescriptor;
use crate::gci::state::pso::{
    GraphicsPipelineStateObjectCreateInfo, GraphicsPipelineStateObjectHandle,
    GraphicsPipelineStateObjectStorage, PipelineStateObjectId,
};
use crate::gci::state::rasterizer::RasterizerStateDescriptor;
use crate::gci::state::render_pass::RenderPassDescriptor;
use crate::gci::state::render_target::RenderTargetBindingDescriptor;
use crate::gci::state::root_signature::RootSignatureDescriptor;
use crate::gci::state::shader_linkage::GraphicsShaderLinkageDescriptor;
use crate::gci::state::vertex_stream::IaVertexStreamDescriptor;
use crate::gci::traits::PipelineStateDescriptorFactory;

/// The device-level pipeline state cache.
///
/// Each descriptor category gets its own independently locked
/// [`PipelineStateCacheUnit`]; assembled pipelines live in their own
/// storage. The cache is meant to sit behind an `Arc` and be shared by every
/// thread that records commands.
pub struct PipelineStateDescriptorCache {
    factory: Arc<dyn PipelineStateDescriptorFactory>,
    blend: PipelineStateCacheUnit<BlendStateDescriptor>,
    depth_stencil: PipelineStateCacheUnit<DepthStencilStateDescriptor>,
    rasterizer: PipelineStateCacheUnit<RasterizerStateDescriptor>,
    shader_linkage: PipelineStateCacheUnit<GraphicsShaderLinkageDescriptor>,
    input_layout: PipelineStateCacheUnit<IaInputLayoutDescriptor>,
    vertex_stream: PipelineStateCacheUnit<IaVertexStreamDescriptor>,
    render_target: PipelineStateCacheUnit<RenderTargetBindingDescriptor>,
    render_pass: PipelineStateCacheUnit<RenderPassDescriptor>,
    root_signature: PipelineStateCacheUnit<RootSignatureDescriptor>,
    pipelines: GraphicsPipelineStateObjectStorage,
}

impl PipelineStateDescriptorCache {
    /// Creates an empty cache compiling through `factory`.
    pub fn new(factory: Arc<dyn PipelineStateDescriptorFactory>) -> Self {
        Self {
            factory,
            blend: PipelineStateCacheUnit::new(),
            depth_stencil: PipelineStateCacheUnit::new(),
            rasterizer: PipelineStateCacheUnit::new(),
            shader_linkage: PipelineStateCacheUnit::new(),
            input_layout: PipelineStateCacheUnit::new(),
            vertex_stream: PipelineStateCacheUnit::new(),
            render_target: PipelineStateCacheUnit::new(),
            render_pass: PipelineStateCacheUnit::new(),
            root_signature: PipelineStateCacheUnit::new(),
            pipelines: GraphicsPipelineStateObjectStorage::new(),
        }
    }

    /// The factory this cache compiles through.
    pub fn factory(&self) -> &dyn PipelineStateDescriptorFactory {
        self.factory.as_ref()
    }

    /// Returns the descriptor for `config` in the category of `S`, compiling
    /// it on first sight.
    pub fn get_or_create<S: CachedPipelineState>(
        &self,
        config: &S::Config,
        id_request: StateDescriptorIdRequest,
    ) -> Result<Arc<S>, PipelineStateError> {
        S::unit_of(self).get_or_create(self.factory.as_ref(), config, id_request)
    }

    /// Like [`get_or_create`](Self::get_or_create), additionally registering
    /// the descriptor under `name`.
    pub fn get_or_create_named<S: CachedPipelineState>(
        &self,
        name: &str,
        config: &S::Config,
        id_request: StateDescriptorIdRequest,
    ) -> Result<Arc<S>, PipelineStateError> {
        S::unit_of(self).get_or_create_named(self.factory.as_ref(), name, config, id_request)
    }

    /// Looks up a descriptor of category `S` by its identity.
    pub fn get_state_by_id<S: CachedPipelineState>(&self, id: StateDescriptorId) -> Option<Arc<S>> {
        S::unit_of(self).get_by_id(id)
    }

    /// Looks up a descriptor of category `S` by its registered name.
    pub fn get_state_by_name<S: CachedPipelineState>(&self, name: &str) -> Option<Arc<S>> {
        S::unit_of(self).get_by_name(name)
    }

    /// Looks up the descriptor of category `S` already compiled for
    /// `config`, without creating one.
    pub fn get_state_for_config<S: CachedPipelineState>(
        &self,
        config: &S::Config,
    ) -> Option<Arc<S>> {
        S::unit_of(self).get_for_config(config)
    }

    /// True when category `S` has a descriptor registered under `name`.
    pub fn has_state_with_name<S: CachedPipelineState>(&self, name: &str) -> bool {
        S::unit_of(self).contains_name(name)
    }

    /// Drops the cached descriptors of category `S` only.
    ///
    /// Like [`reset`](Self::reset), this also drops the pipeline storage,
    /// since assembled pipelines may reference descriptors of the cleared
    /// category.
    pub fn reset_sub_cache<S: CachedPipelineState>(&self) {
        S::unit_of(self).reset();
        self.pipelines.clear();
    }

    /// Returns the assembled pipeline for `info`, compiling it on first
    /// sight. Two create infos referencing the same sub-descriptors resolve
    /// to the same pipeline object.
    pub fn create_graphics_pipeline_state_object(
        &self,
        info: &GraphicsPipelineStateObjectCreateInfo,
    ) -> Result<GraphicsPipelineStateObjectHandle, PipelineStateError> {
        self.pipelines
            .get_or_create(info, || self.factory.create_graphics_pipeline_state(info))
    }

    /// Looks up an assembled pipeline by its identity.
    pub fn get_pipeline_state_object(
        &self,
        id: PipelineStateObjectId,
    ) -> Option<GraphicsPipelineStateObjectHandle> {
        self.pipelines.get(id)
    }

    /// Drops the cached descriptors of every category named in `mask`.
    ///
    /// Assembled pipelines reference descriptors from all categories, so any
    /// non-empty reset also drops the pipeline storage. Everything handed
    /// out before the reset stays alive through its `Arc`s; only the cache's
    /// references are released.
    pub fn reset(&self, mask: PipelineStateDescriptorTypeFlags) {
        if mask.is_empty() {
            return;
        }
        log::debug!("pipeline state cache reset, mask {mask:?}");
        if mask.contains(PipelineStateDescriptorTypeFlags::BLEND) {
            self.blend.reset();
        }
        if mask.contains(PipelineStateDescriptorTypeFlags::DEPTH_STENCIL) {
            self.depth_stencil.reset();
        }
        if mask.contains(PipelineStateDescriptorTypeFlags::RASTERIZER) {
            self.rasterizer.reset();
        }
        if mask.contains(PipelineStateDescriptorTypeFlags::GRAPHICS_SHADER_LINKAGE) {
            self.shader_linkage.reset();
        }
        if mask.contains(PipelineStateDescriptorTypeFlags::IA_INPUT_LAYOUT) {
            self.input_layout.reset();
        }
        if mask.contains(PipelineStateDescriptorTypeFlags::IA_VERTEX_STREAM) {
            self.vertex_stream.reset();
        }
        if mask.contains(PipelineStateDescriptorTypeFlags::RENDER_TARGET_BINDING) {
            self.render_target.reset();
        }
        if mask.contains(PipelineStateDescriptorTypeFlags::RENDER_PASS_CONFIGURATION) {
            self.render_pass.reset();
        }
        if mask.contains(PipelineStateDescriptorTypeFlags::ROOT_SIGNATURE) {
            self.root_signature.reset();
        }
        self.pipelines.clear();
    }

    /// Total cached descriptors across every category, pipelines excluded.
    pub fn descriptor_count(&self) -> usize {
        self.blend.len()
            + self.depth_stencil.len()
            + self.rasterizer.len()
            + self.shader_linkage.len()
            + self.input_layout.len()
            + self.vertex_stream.len()
            + self.render_target.len()
            + self.render_pass.len()
            + self.root_signature.len()
    }

    /// Number of assembled pipelines.
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    /// The blend unit.
    pub fn blend_unit(&self) -> &PipelineStateCacheUnit<BlendStateDescriptor> {
        &self.blend
    }

    /// The depth/stencil unit.
    pub fn depth_stencil_unit(&self) -> &PipelineStateCacheUnit<DepthStencilStateDescriptor> {
        &self.depth_stencil
    }

    /// The rasterizer unit.
    pub fn rasterizer_unit(&self) -> &PipelineStateCacheUnit<RasterizerStateDescriptor> {
        &self.rasterizer
    }

    /// The shader linkage unit.
    pub fn shader_linkage_unit(
        &self,
    ) -> &PipelineStateCacheUnit<GraphicsShaderLinkageDescriptor> {
        &self.shader_linkage
    }

    /// The input layout unit.
    pub fn input_layout_unit(&self) -> &PipelineStateCacheUnit<IaInputLayoutDescriptor> {
        &self.input_layout
    }

    /// The vertex stream unit.
    pub fn vertex_stream_unit(&self) -> &PipelineStateCacheUnit<IaVertexStreamDescriptor> {
        &self.vertex_stream
    }

    /// The render target binding unit.
    pub fn render_target_unit(&self) -> &PipelineStateCacheUnit<RenderTargetBindingDescriptor> {
        &self.render_target
    }

    /// The render pass unit, holding cached (non-dynamic) passes.
    pub fn render_pass_unit(&self) -> &PipelineStateCacheUnit<RenderPassDescriptor> {
        &self.render_pass
    }

    /// The root signature unit.
    pub fn root_signature_unit(&self) -> &PipelineStateCacheUnit<RootSignatureDescriptor> {
        &self.root_signature
    }

    /// The assembled pipeline storage.
    pub fn pipeline_storage(&self) -> &GraphicsPipelineStateObjectStorage {
        &self.pipelines
    }
}

impl fmt::Debug for PipelineStateDescriptorCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineStateDescriptorCache")
            .field("descriptors", &self.descriptor_count())
            .field("pipelines", &self.pipeline_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gci::state::blend::{AttachmentBlendSettings, BlendConfig};
    use crate::gci::state::common::{CompiledPipelineState, PipelineStateDescriptor};
    use crate::gci::state::depth_stencil::DepthStencilConfig;

    struct AcceptAllFactory;

    impl PipelineStateDescriptorFactory for AcceptAllFactory {
        fn create_blend_state(&self, _config: &BlendConfig) -> Option<CompiledPipelineState> {
            Some(CompiledPipelineState::new(()))
        }

        fn create_depth_stencil_state(
            &self,
            _config: &DepthStencilConfig,
        ) -> Option<CompiledPipelineState> {
            Some(CompiledPipelineState::new(()))
        }

        fn create_rasterizer_state(
            &self,
            _config: &crate::gci::state::rasterizer::RasterizerConfig,
        ) -> Option<CompiledPipelineState> {
            Some(CompiledPipelineState::new(()))
        }

        fn create_shader_linkage(
            &self,
            _binding: &crate::gci::state::shader_linkage::GraphicsShaderBinding,
        ) -> Option<CompiledPipelineState> {
            Some(CompiledPipelineState::new(()))
        }

        fn create_input_layout(
            &self,
            _definition: &crate::gci::state::input_layout::IaInputLayoutDefinition,
        ) -> Option<CompiledPipelineState> {
            Some(CompiledPipelineState::new(()))
        }

        fn create_vertex_stream(
            &self,
            _definition: &crate::gci::state::vertex_stream::IaVertexStreamDefinition,
        ) -> Option<CompiledPipelineState> {
            Some(CompiledPipelineState::new(()))
        }

        fn create_render_target_binding(
            &self,
            _definition: &crate::gci::state::render_target::RenderTargetBindingDefinition,
        ) -> Option<CompiledPipelineState> {
            Some(CompiledPipelineState::new(()))
        }

        fn create_render_pass(
            &self,
            _configuration: &crate::gci::state::render_pass::RenderPassConfiguration,
        ) -> Option<CompiledPipelineState> {
            Some(CompiledPipelineState::new(()))
        }

        fn create_root_signature(
            &self,
            _desc: &crate::gci::state::root_signature::RootSignatureDesc,
        ) -> Option<CompiledPipelineState> {
            Some(CompiledPipelineState::new(()))
        }

        fn create_graphics_pipeline_state(
            &self,
            _info: &GraphicsPipelineStateObjectCreateInfo,
        ) -> Option<CompiledPipelineState> {
            Some(CompiledPipelineState::new(()))
        }
    }

    fn cache() -> PipelineStateDescriptorCache {
        PipelineStateDescriptorCache::new(Arc::new(AcceptAllFactory))
    }

    #[test]
    fn units_are_independent() {
        let cache = cache();
        cache
            .get_or_create::<BlendStateDescriptor>(
                &BlendConfig::single(AttachmentBlendSettings::ALPHA),
                StateDescriptorIdRequest::Auto,
            )
            .unwrap();
        cache
            .get_or_create::<DepthStencilStateDescriptor>(
                &DepthStencilConfig::depth_read_write(),
                StateDescriptorIdRequest::Auto,
            )
            .unwrap();
        assert_eq!(cache.blend_unit().len(), 1);
        assert_eq!(cache.depth_stencil_unit().len(), 1);
        assert_eq!(cache.descriptor_count(), 2);
    }

    #[test]
    fn selective_reset_spares_other_units() {
        let cache = cache();
        cache
            .get_or_create::<BlendStateDescriptor>(
                &BlendConfig::disabled(),
                StateDescriptorIdRequest::Auto,
            )
            .unwrap();
        cache
            .get_or_create::<DepthStencilStateDescriptor>(
                &DepthStencilConfig::disabled(),
                StateDescriptorIdRequest::Auto,
            )
            .unwrap();

        cache.reset(PipelineStateDescriptorTypeFlags::BLEND);
        assert!(cache.blend_unit().is_empty());
        assert_eq!(cache.depth_stencil_unit().len(), 1);
    }

    #[test]
    fn typed_lookups_dispatch_to_the_right_unit() {
        let cache = cache();
        let config = BlendConfig::single(AttachmentBlendSettings::ALPHA);
        let created = cache
            .get_or_create_named::<BlendStateDescriptor>(
                "alpha",
                &config,
                StateDescriptorIdRequest::Auto,
            )
            .unwrap();

        let by_id = cache
            .get_state_by_id::<BlendStateDescriptor>(created.descriptor_id())
            .unwrap();
        assert!(Arc::ptr_eq(&created, &by_id));
        let by_name = cache.get_state_by_name::<BlendStateDescriptor>("alpha").unwrap();
        assert!(Arc::ptr_eq(&created, &by_name));
        let by_config = cache.get_state_for_config::<BlendStateDescriptor>(&config).unwrap();
        assert!(Arc::ptr_eq(&created, &by_config));
        assert!(cache.has_state_with_name::<BlendStateDescriptor>("alpha"));
        assert!(!cache.has_state_with_name::<DepthStencilStateDescriptor>("alpha"));
    }

    #[test]
    fn single_category_reset_spares_the_rest() {
        let cache = cache();
        cache
            .get_or_create::<BlendStateDescriptor>(
                &BlendConfig::disabled(),
                StateDescriptorIdRequest::Auto,
            )
            .unwrap();
        cache
            .get_or_create::<DepthStencilStateDescriptor>(
                &DepthStencilConfig::disabled(),
                StateDescriptorIdRequest::Auto,
            )
            .unwrap();

        cache.reset_sub_cache::<BlendStateDescriptor>();
        assert!(cache.blend_unit().is_empty());
        assert_eq!(cache.depth_stencil_unit().len(), 1);
        assert_eq!(cache.pipeline_count(), 0);
    }

    #[test]
    fn empty_reset_mask_is_a_no_op() {
        let cache = cache();
        cache
            .get_or_create::<BlendStateDescriptor>(
                &BlendConfig::disabled(),
                StateDescriptorIdRequest::Auto,
            )
            .unwrap();
        cache.reset(PipelineStateDescriptorTypeFlags::EMPTY);
        assert_eq!(cache.blend_unit().len(), 1);
    }
}
