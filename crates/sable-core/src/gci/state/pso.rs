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

//! Graphics pipeline state objects: the aggregate of all sub-state
//! descriptors a draw needs, plus their dedicated content-addressed storage.

use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;

use crate::gci::error::PipelineStateError;
use crate::gci::resources::ShaderStageFlags;
use crate::gci::state::blend::BlendStateDescriptor;
use crate::gci::state::common::{
    CompiledPipelineState, PipelineStateDescriptor, RenderTargetAttachmentFlags, StateDescriptorId,
};
use crate::gci::state::depth_stencil::DepthStencilStateDescriptor;
use crate::gci::state::enums::PrimitiveTopology;
use crate::gci::state::input_layout::IaInputLayoutDescriptor;
use crate::gci::state::rasterizer::RasterizerStateDescriptor;
use crate::gci::state::render_pass::RenderPassDescriptor;
use crate::gci::state::render_target::RenderTargetBindingDescriptor;
use crate::gci::state::root_signature::RootSignatureDescriptor;
use crate::gci::state::shader_linkage::GraphicsShaderLinkageDescriptor;
use crate::gci::state::vertex_stream::IaVertexStreamDescriptor;

/// Monotonic identity of a pipeline state object within one storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PipelineStateObjectId(pub u64);

/// Shared handle to an immutable pipeline state object.
pub type GraphicsPipelineStateObjectHandle = Arc<GraphicsPipelineStateObject>;

/// The sub-states a separable controller can rebind independently of the
/// render target topology.
#[derive(Debug, Clone)]
pub struct SeparableGraphicsStateSet {
    /// Linked shader stages.
    pub shader_linkage: Arc<GraphicsShaderLinkageDescriptor>,
    /// Color blending.
    pub blend: Arc<BlendStateDescriptor>,
    /// Rasterizer.
    pub rasterizer: Arc<RasterizerStateDescriptor>,
    /// Depth and stencil tests.
    pub depth_stencil: Arc<DepthStencilStateDescriptor>,
    /// Vertex attribute layout.
    pub input_layout: Arc<IaInputLayoutDescriptor>,
}

/// Everything needed to assemble a full graphics pipeline state object.
///
/// Equality and hashing go through the sub-descriptor identities, so two
/// create infos referencing the same descriptors are the same pipeline.
#[derive(Debug, Clone)]
pub struct GraphicsPipelineStateObjectCreateInfo {
    /// The sub-states a separable controller diffs individually.
    pub separable: SeparableGraphicsStateSet,
    /// Vertex and index buffer bindings.
    pub vertex_stream: Arc<IaVertexStreamDescriptor>,
    /// Render target attachments.
    pub render_target: Arc<RenderTargetBindingDescriptor>,
    /// Render pass load/store behavior.
    pub render_pass: Arc<RenderPassDescriptor>,
    /// Resource binding interface.
    pub root_signature: Arc<RootSignatureDescriptor>,
}

impl GraphicsPipelineStateObjectCreateInfo {
    /// The nine sub-descriptor identities that define this pipeline.
    pub fn identity_key(&self) -> [StateDescriptorId; 9] {
        [
            self.separable.shader_linkage.descriptor_id(),
            self.separable.blend.descriptor_id(),
            self.separable.rasterizer.descriptor_id(),
            self.separable.depth_stencil.descriptor_id(),
            self.separable.input_layout.descriptor_id(),
            self.vertex_stream.descriptor_id(),
            self.render_target.descriptor_id(),
            self.render_pass.descriptor_id(),
            self.root_signature.descriptor_id(),
        ]
    }

    /// Rejects create infos that can never produce a working pipeline.
    pub fn validate(&self) -> Result<(), PipelineStateError> {
        if !self.separable.shader_linkage.binding().is_complete() {
            return Err(PipelineStateError::InvalidCreateInfo {
                details: "shader linkage has no vertex stage".to_owned(),
            });
        }
        let unbound = self.separable.input_layout.used_buffer_slots()
            & !self.vertex_stream.bound_slots();
        if unbound != 0 {
            return Err(PipelineStateError::InvalidCreateInfo {
                details: "input layout reads vertex buffer slots the stream leaves unbound"
                    .to_owned(),
            });
        }
        Ok(())
    }
}

impl PartialEq for GraphicsPipelineStateObjectCreateInfo {
    fn eq(&self, other: &Self) -> bool {
        self.identity_key() == other.identity_key()
    }
}

impl Eq for GraphicsPipelineStateObjectCreateInfo {}

impl Hash for GraphicsPipelineStateObjectCreateInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity_key().hash(state);
    }
}

/// Common properties of a pipeline state object, precomputed at creation
/// from its sub-descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphicsPipelineStateObjectProperties {
    /// Shader stages with a program bound.
    pub active_stages: ShaderStageFlags,
    /// Render target attachments the pipeline writes.
    pub bound_attachments: RenderTargetAttachmentFlags,
    /// Samples per pixel.
    pub sample_count: u32,
    /// Primitive assembly mode.
    pub topology: PrimitiveTopology,
    /// True when draws are indexed.
    pub indexed: bool,
    /// True when a dynamic stencil reference override is meaningful.
    pub uses_stencil: bool,
    /// True when the render pass is a dynamic, uncached descriptor.
    pub dynamic_render_pass: bool,
}

impl GraphicsPipelineStateObjectProperties {
    fn derive(info: &GraphicsPipelineStateObjectCreateInfo) -> Self {
        Self {
            active_stages: info.separable.shader_linkage.active_stages(),
            bound_attachments: info.render_target.bound_attachments(),
            sample_count: info.render_target.sample_count(),
            topology: info.vertex_stream.topology(),
            indexed: info.vertex_stream.is_indexed(),
            uses_stencil: info.separable.depth_stencil.uses_stencil(),
            dynamic_render_pass: info.render_pass.is_dynamic(),
        }
    }
}

/// An immutable, fully assembled graphics pipeline.
///
/// Holds strong references to every sub-descriptor it was built from, so a
/// cache reset can never leave a live pipeline pointing at freed state.
#[derive(Debug)]
pub struct GraphicsPipelineStateObject {
    id: PipelineStateObjectId,
    states: GraphicsPipelineStateObjectCreateInfo,
    properties: GraphicsPipelineStateObjectProperties,
    compiled: CompiledPipelineState,
}

impl GraphicsPipelineStateObject {
    /// Identity within the storage that created this object.
    pub fn id(&self) -> PipelineStateObjectId {
        self.id
    }

    /// Precomputed aggregate properties.
    pub fn properties(&self) -> &GraphicsPipelineStateObjectProperties {
        &self.properties
    }

    /// The sub-states a separable controller diffs individually.
    pub fn separable_states(&self) -> &SeparableGraphicsStateSet {
        &self.states.separable
    }

    /// Every sub-descriptor the pipeline was assembled from.
    pub fn states(&self) -> &GraphicsPipelineStateObjectCreateInfo {
        &self.states
    }

    /// The backend-opaque compiled pipeline.
    pub fn compiled(&self) -> &CompiledPipelineState {
        &self.compiled
    }
}

#[derive(Default)]
struct PsoIndex {
    by_id: FxHashMap<PipelineStateObjectId, GraphicsPipelineStateObjectHandle>,
    by_key: FxHashMap<[StateDescriptorId; 9], GraphicsPipelineStateObjectHandle>,
    next_id: u64,
}

/// Content-addressed storage for assembled pipeline state objects.
///
/// A single lock covers lookup, compilation and insertion, so two threads
/// racing to create the same pipeline coalesce on one compiled object.
#[derive(Default)]
pub struct GraphicsPipelineStateObjectStorage {
    index: Mutex<PsoIndex>,
}

impl GraphicsPipelineStateObjectStorage {
    /// Creates an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the pipeline for `info`, compiling it through `compile` on
    /// first sight. `compile` returning `None` means the backend rejected
    /// the combination.
    pub fn get_or_create<F>(
        &self,
        info: &GraphicsPipelineStateObjectCreateInfo,
        compile: F,
    ) -> Result<GraphicsPipelineStateObjectHandle, PipelineStateError>
    where
        F: FnOnce() -> Option<CompiledPipelineState>,
    {
        info.validate()?;

        let mut index = match self.index.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let key = info.identity_key();
        if let Some(existing) = index.by_key.get(&key) {
            return Ok(Arc::clone(existing));
        }

        let compiled = compile().ok_or_else(|| PipelineStateError::UnsupportedPipelineState {
            details: "backend rejected the pipeline state combination".to_owned(),
        })?;

        let id = PipelineStateObjectId(index.next_id);
        index.next_id += 1;
        let handle = Arc::new(GraphicsPipelineStateObject {
            id,
            states: info.clone(),
            properties: GraphicsPipelineStateObjectProperties::derive(info),
            compiled,
        });
        index.by_id.insert(id, Arc::clone(&handle));
        index.by_key.insert(key, Arc::clone(&handle));
        Ok(handle)
    }

    /// Looks up a pipeline by its storage identity.
    pub fn get(&self, id: PipelineStateObjectId) -> Option<GraphicsPipelineStateObjectHandle> {
        let index = match self.index.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        index.by_id.get(&id).cloned()
    }

    /// Number of stored pipelines.
    pub fn len(&self) -> usize {
        let index = match self.index.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        index.by_id.len()
    }

    /// True when no pipeline is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every stored pipeline. Handles already given out stay valid;
    /// only the storage's own references are released, and the ID counter
    /// keeps running so old IDs are never reissued.
    pub fn clear(&self) {
        let mut index = match self.index.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        index.by_id.clear();
        index.by_key.clear();
    }
}

impl std::fmt::Debug for GraphicsPipelineStateObjectStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsPipelineStateObjectStorage")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gci::cache::CachedPipelineState;
    use crate::gci::resources::ShaderId;
    use crate::gci::state::blend::BlendConfig;
    use crate::gci::state::depth_stencil::DepthStencilConfig;
    use crate::gci::state::input_layout::IaInputLayoutDefinition;
    use crate::gci::state::rasterizer::RasterizerConfig;
    use crate::gci::state::render_pass::RenderPassConfiguration;
    use crate::gci::state::render_target::{
        RenderTargetAttachmentBinding, RenderTargetBindingDefinition,
    };
    use crate::gci::state::root_signature::RootSignatureDesc;
    use crate::gci::state::shader_linkage::GraphicsShaderBinding;
    use crate::gci::state::vertex_stream::IaVertexStreamDefinition;
    use crate::gci::resources::TextureId;
    use crate::gci::state::enums::TextureFormat;

    fn descriptor<S: CachedPipelineState>(id: u64, config: &S::Config) -> Arc<S> {
        Arc::new(S::from_compiled(
            StateDescriptorId(id),
            config,
            CompiledPipelineState::new(()),
        ))
    }

    fn sample_create_info() -> GraphicsPipelineStateObjectCreateInfo {
        GraphicsPipelineStateObjectCreateInfo {
            separable: SeparableGraphicsStateSet {
                shader_linkage: descriptor(
                    1,
                    &GraphicsShaderBinding::vertex_pixel(ShaderId(1), ShaderId(2)),
                ),
                blend: descriptor(2, &BlendConfig::disabled()),
                rasterizer: descriptor(3, &RasterizerConfig::solid_cull_back()),
                depth_stencil: descriptor(4, &DepthStencilConfig::depth_read_write()),
                input_layout: descriptor(5, &IaInputLayoutDefinition::default()),
            },
            vertex_stream: descriptor(6, &IaVertexStreamDefinition::default()),
            render_target: descriptor(
                7,
                &RenderTargetBindingDefinition::single_color(
                    RenderTargetAttachmentBinding::base(
                        TextureId(1),
                        TextureFormat::Bgra8UnormSrgb,
                    ),
                ),
            ),
            render_pass: descriptor(8, &RenderPassConfiguration::clear_color_depth()),
            root_signature: descriptor(9, &RootSignatureDesc::default()),
        }
    }

    #[test]
    fn identical_create_infos_share_one_pipeline() {
        let storage = GraphicsPipelineStateObjectStorage::new();
        let info = sample_create_info();
        let first = storage
            .get_or_create(&info, || Some(CompiledPipelineState::new(1u32)))
            .unwrap();
        let second = storage
            .get_or_create(&info.clone(), || {
                panic!("cached pipeline must not be recompiled")
            })
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn rejected_compile_surfaces_as_error() {
        let storage = GraphicsPipelineStateObjectStorage::new();
        let err = storage
            .get_or_create(&sample_create_info(), || None)
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineStateError::UnsupportedPipelineState { .. }
        ));
        assert!(storage.is_empty());
    }

    #[test]
    fn clear_keeps_outstanding_handles_alive() {
        let storage = GraphicsPipelineStateObjectStorage::new();
        let info = sample_create_info();
        let handle = storage
            .get_or_create(&info, || Some(CompiledPipelineState::new(())))
            .unwrap();
        let id = handle.id();
        storage.clear();
        assert!(storage.get(id).is_none());
        // The handle itself is still usable after the storage let go.
        assert!(!handle.properties().indexed);
    }

    #[test]
    fn missing_vertex_stage_is_invalid() {
        let mut info = sample_create_info();
        info.separable.shader_linkage = descriptor(10, &GraphicsShaderBinding::default());
        let storage = GraphicsPipelineStateObjectStorage::new();
        let err = storage
            .get_or_create(&info, || Some(CompiledPipelineState::new(())))
            .unwrap_err();
        assert!(matches!(err, PipelineStateError::InvalidCreateInfo { .. }));
    }
}
