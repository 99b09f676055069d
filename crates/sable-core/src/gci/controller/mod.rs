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

//! Controller state machines tracking what is bound on a command stream and
//! what still has to be flushed.
//!
//! [`GraphicsPipelineStateControllerBase`] diffs at whole-pipeline
//! granularity; the specializations in [`separable`] refine the diff down to
//! individual sub-states and shader stages. Backends wrap one of these and
//! add the actual hardware flush.

pub mod separable;

pub use separable::{
    GraphicsPipelineStateControllerSeparable, GraphicsPipelineStateControllerSeparableShader,
};

use std::sync::Arc;

use crate::gci::resources::ShaderStage;
use crate::gci::state::blend::BlendStateDescriptor;
use crate::gci::state::common::MAX_COLOR_ATTACHMENTS;
use crate::gci::state::depth_stencil::DepthStencilStateDescriptor;
use crate::gci::state::input_layout::IaInputLayoutDescriptor;
use crate::gci::state::pso::GraphicsPipelineStateObjectHandle;
use crate::gci::state::rasterizer::RasterizerStateDescriptor;
use crate::gci::state::render_pass::RenderPassDescriptor;
use crate::gci::state::render_target::RenderTargetBindingDescriptor;
use crate::gci::state::root_signature::RootSignatureDescriptor;
use crate::gci::state::shader_linkage::GraphicsShaderLinkageDescriptor;
use crate::gci::state::vertex_stream::IaVertexStreamDescriptor;
use crate::math::LinearRgba;
use crate::sable_bitflags;

sable_bitflags! {
    /// The not-yet-applied state changes accumulated on a controller.
    pub struct StateUpdateMask: u32 {
        /// The whole pipeline object must be rebound.
        const PIPELINE = 1 << 0;
        /// Shader linkage changed.
        const SHADER_LINKAGE = 1 << 1;
        /// Blend state changed.
        const BLEND = 1 << 2;
        /// Rasterizer state changed.
        const RASTERIZER = 1 << 3;
        /// Depth/stencil state changed.
        const DEPTH_STENCIL = 1 << 4;
        /// Input layout changed.
        const INPUT_LAYOUT = 1 << 5;
        /// Vertex/index buffer bindings changed.
        const VERTEX_STREAM = 1 << 6;
        /// Render target attachments changed.
        const RENDER_TARGET = 1 << 7;
        /// Render pass configuration changed.
        const RENDER_PASS = 1 << 8;
        /// Root signature changed.
        const ROOT_SIGNATURE = 1 << 9;
        /// The vertex stage program changed.
        const STAGE_VERTEX = 1 << 10;
        /// The hull stage program changed.
        const STAGE_HULL = 1 << 11;
        /// The domain stage program changed.
        const STAGE_DOMAIN = 1 << 12;
        /// The geometry stage program changed.
        const STAGE_GEOMETRY = 1 << 13;
        /// The pixel stage program changed.
        const STAGE_PIXEL = 1 << 14;
        /// The sub-states a separable controller rebinds independently.
        const SEPARABLE = Self::SHADER_LINKAGE.bits()
            | Self::BLEND.bits()
            | Self::RASTERIZER.bits()
            | Self::DEPTH_STENCIL.bits()
            | Self::INPUT_LAYOUT.bits();
        /// Every sub-state bit.
        const SUB_STATE = Self::SEPARABLE.bits()
            | Self::VERTEX_STREAM.bits()
            | Self::RENDER_TARGET.bits()
            | Self::RENDER_PASS.bits()
            | Self::ROOT_SIGNATURE.bits();
        /// Every per-stage bit.
        const ALL_STAGES = Self::STAGE_VERTEX.bits()
            | Self::STAGE_HULL.bits()
            | Self::STAGE_DOMAIN.bits()
            | Self::STAGE_GEOMETRY.bits()
            | Self::STAGE_PIXEL.bits();
    }
}

impl StateUpdateMask {
    /// The per-stage bit for `stage`.
    pub const fn stage(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => Self::STAGE_VERTEX,
            ShaderStage::Hull => Self::STAGE_HULL,
            ShaderStage::Domain => Self::STAGE_DOMAIN,
            ShaderStage::Geometry => Self::STAGE_GEOMETRY,
            ShaderStage::Pixel => Self::STAGE_PIXEL,
        }
    }
}

sable_bitflags! {
    /// Which dynamic overrides the client has supplied.
    ///
    /// These are not dirty bits: an enabled override is consulted on every
    /// apply for as long as it stays enabled.
    pub struct DynamicConfigFlags: u8 {
        /// A constant blend color is set.
        const BLEND_CONSTANT = 1 << 0;
        /// Clear values are set.
        const CLEAR_VALUES = 1 << 1;
        /// A stencil reference value is set.
        const STENCIL_REFERENCE = 1 << 2;
    }
}

/// Clear values consumed by clearing render passes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommonClearValues {
    /// Per color attachment clear color.
    pub colors: [LinearRgba; MAX_COLOR_ATTACHMENTS],
    /// Depth clear value.
    pub depth: f32,
    /// Stencil clear value.
    pub stencil: u32,
}

impl Default for CommonClearValues {
    fn default() -> Self {
        Self {
            colors: [LinearRgba::TRANSPARENT; MAX_COLOR_ATTACHMENTS],
            depth: 1.0,
            stencil: 0,
        }
    }
}

/// Runtime overrides applied on top of the bound pipeline without creating
/// new descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DynamicPipelineConfig {
    /// Which overrides are supplied.
    pub enabled: DynamicConfigFlags,
    /// Constant color for constant-color blend factors.
    pub blend_constant: LinearRgba,
    /// Clear values for clearing passes.
    pub clear_values: CommonClearValues,
    /// Stencil reference value.
    pub stencil_reference: u32,
}

impl DynamicPipelineConfig {
    /// Supplies the blend constant. Returns whether anything changed.
    pub fn set_blend_constant(&mut self, color: LinearRgba) -> bool {
        let changed = !self.enabled.contains(DynamicConfigFlags::BLEND_CONSTANT)
            || self.blend_constant != color;
        self.enabled.insert(DynamicConfigFlags::BLEND_CONSTANT);
        self.blend_constant = color;
        changed
    }

    /// Supplies clear values. Returns whether anything changed.
    pub fn set_clear_values(&mut self, values: CommonClearValues) -> bool {
        let changed = !self.enabled.contains(DynamicConfigFlags::CLEAR_VALUES)
            || self.clear_values != values;
        self.enabled.insert(DynamicConfigFlags::CLEAR_VALUES);
        self.clear_values = values;
        changed
    }

    /// Supplies the stencil reference. Returns whether anything changed.
    pub fn set_stencil_reference(&mut self, reference: u32) -> bool {
        let changed = !self.enabled.contains(DynamicConfigFlags::STENCIL_REFERENCE)
            || self.stencil_reference != reference;
        self.enabled.insert(DynamicConfigFlags::STENCIL_REFERENCE);
        self.stencil_reference = reference;
        changed
    }
}

/// The descriptors currently bound on a command stream.
///
/// Every slot holds a strong reference, so a cache reset can never invalidate
/// what a stream has in flight.
#[derive(Debug, Clone, Default)]
pub struct CurrentPipelineBindings {
    /// The bound pipeline object.
    pub pipeline: Option<GraphicsPipelineStateObjectHandle>,
    /// Shader linkage of the bound pipeline.
    pub shader_linkage: Option<Arc<GraphicsShaderLinkageDescriptor>>,
    /// Blend state of the bound pipeline.
    pub blend: Option<Arc<BlendStateDescriptor>>,
    /// Rasterizer state of the bound pipeline.
    pub rasterizer: Option<Arc<RasterizerStateDescriptor>>,
    /// Depth/stencil state of the bound pipeline.
    pub depth_stencil: Option<Arc<DepthStencilStateDescriptor>>,
    /// Input layout of the bound pipeline.
    pub input_layout: Option<Arc<IaInputLayoutDescriptor>>,
    /// Vertex stream of the bound pipeline.
    pub vertex_stream: Option<Arc<IaVertexStreamDescriptor>>,
    /// Render target binding of the bound pipeline.
    pub render_target: Option<Arc<RenderTargetBindingDescriptor>>,
    /// Render pass of the bound pipeline.
    pub render_pass: Option<Arc<RenderPassDescriptor>>,
    /// Root signature of the bound pipeline.
    pub root_signature: Option<Arc<RootSignatureDescriptor>>,
}

impl CurrentPipelineBindings {
    fn adopt(&mut self, pipeline: &GraphicsPipelineStateObjectHandle) {
        let states = pipeline.states();
        self.pipeline = Some(Arc::clone(pipeline));
        self.shader_linkage = Some(Arc::clone(&states.separable.shader_linkage));
        self.blend = Some(Arc::clone(&states.separable.blend));
        self.rasterizer = Some(Arc::clone(&states.separable.rasterizer));
        self.depth_stencil = Some(Arc::clone(&states.separable.depth_stencil));
        self.input_layout = Some(Arc::clone(&states.separable.input_layout));
        self.vertex_stream = Some(Arc::clone(&states.vertex_stream));
        self.render_target = Some(Arc::clone(&states.render_target));
        self.render_pass = Some(Arc::clone(&states.render_pass));
        self.root_signature = Some(Arc::clone(&states.root_signature));
    }
}

/// Whole-pipeline-granularity controller state machine.
///
/// Tracks the bound pipeline by handle identity and accumulates a dirty mask
/// until the backend flushes it. It never talks to hardware itself; backends
/// embed it and drain the mask in their `apply_state_changes`.
#[derive(Debug, Default)]
pub struct GraphicsPipelineStateControllerBase {
    bindings: CurrentPipelineBindings,
    dirty: StateUpdateMask,
    dynamic: DynamicPipelineConfig,
}

impl GraphicsPipelineStateControllerBase {
    /// Creates a controller with nothing bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current binding slots.
    pub fn bindings(&self) -> &CurrentPipelineBindings {
        &self.bindings
    }

    /// The current dynamic overrides.
    pub fn dynamic_config(&self) -> &DynamicPipelineConfig {
        &self.dynamic
    }

    /// The accumulated not-yet-applied changes.
    pub fn pending_updates(&self) -> StateUpdateMask {
        self.dirty
    }

    /// Makes `pipeline` current, invalidating the whole pipeline slot.
    /// Binding the already-bound handle changes nothing and returns `false`.
    pub fn bind_graphics_pipeline(
        &mut self,
        pipeline: &GraphicsPipelineStateObjectHandle,
    ) -> bool {
        if let Some(current) = &self.bindings.pipeline {
            if Arc::ptr_eq(current, pipeline) {
                return false;
            }
        }
        self.bindings.adopt(pipeline);
        self.dirty.insert(StateUpdateMask::PIPELINE);
        true
    }

    /// Clears the pipeline slot and everything adopted from it. Returns
    /// `false` when nothing was bound.
    pub fn unbind_graphics_pipeline(&mut self) -> bool {
        if self.bindings.pipeline.is_none() {
            return false;
        }
        self.bindings = CurrentPipelineBindings::default();
        self.dirty.insert(StateUpdateMask::PIPELINE);
        true
    }

    /// Binds `pass` on its own, independent of any pipeline. Rebinding the
    /// identical descriptor changes nothing and returns `false`.
    pub fn set_render_pass(&mut self, pass: &Arc<RenderPassDescriptor>) -> bool {
        if let Some(current) = &self.bindings.render_pass {
            if Arc::ptr_eq(current, pass) {
                return false;
            }
        }
        self.bindings.render_pass = Some(Arc::clone(pass));
        self.dirty.insert(StateUpdateMask::RENDER_PASS);
        true
    }

    /// Clears the render pass slot. Returns `false` when already empty.
    pub fn reset_render_pass(&mut self) -> bool {
        if self.bindings.render_pass.take().is_none() {
            return false;
        }
        self.dirty.insert(StateUpdateMask::RENDER_PASS);
        true
    }

    /// Binds `target` on its own. Rebinding the identical descriptor changes
    /// nothing and returns `false`.
    pub fn set_render_target(&mut self, target: &Arc<RenderTargetBindingDescriptor>) -> bool {
        if let Some(current) = &self.bindings.render_target {
            if Arc::ptr_eq(current, target) {
                return false;
            }
        }
        self.bindings.render_target = Some(Arc::clone(target));
        self.dirty.insert(StateUpdateMask::RENDER_TARGET);
        true
    }

    /// Clears the render target slot. Returns `false` when already empty.
    pub fn reset_render_target(&mut self) -> bool {
        if self.bindings.render_target.take().is_none() {
            return false;
        }
        self.dirty.insert(StateUpdateMask::RENDER_TARGET);
        true
    }

    /// Binds `stream` on its own. Rebinding the identical descriptor changes
    /// nothing and returns `false`.
    pub fn set_vertex_stream(&mut self, stream: &Arc<IaVertexStreamDescriptor>) -> bool {
        if let Some(current) = &self.bindings.vertex_stream {
            if Arc::ptr_eq(current, stream) {
                return false;
            }
        }
        self.bindings.vertex_stream = Some(Arc::clone(stream));
        self.dirty.insert(StateUpdateMask::VERTEX_STREAM);
        true
    }

    /// Clears the vertex stream slot. Returns `false` when already empty.
    pub fn reset_vertex_stream(&mut self) -> bool {
        if self.bindings.vertex_stream.take().is_none() {
            return false;
        }
        self.dirty.insert(StateUpdateMask::VERTEX_STREAM);
        true
    }

    /// Supplies the blend constant override.
    pub fn set_blend_constant(&mut self, color: LinearRgba) -> bool {
        self.dynamic.set_blend_constant(color)
    }

    /// Supplies the clear value override.
    pub fn set_clear_values(&mut self, values: CommonClearValues) -> bool {
        self.dynamic.set_clear_values(values)
    }

    /// Supplies the stencil reference override.
    pub fn set_stencil_reference(&mut self, reference: u32) -> bool {
        self.dynamic.set_stencil_reference(reference)
    }

    /// Disables the overrides named in `mask`, handing their slots back to
    /// the bound pipeline's defaults. Returns `false` when none of them were
    /// enabled.
    pub fn reset_dynamic_config(&mut self, mask: DynamicConfigFlags) -> bool {
        if !self.dynamic.enabled.intersects(mask) {
            return false;
        }
        self.dynamic.enabled.remove(mask);
        true
    }

    /// Hands the pending mask to the backend and clears it. The second call
    /// in a row returns an empty mask, making redundant applies free.
    pub fn take_pending(&mut self) -> StateUpdateMask {
        std::mem::take(&mut self.dirty)
    }

    /// Drops every binding, override and pending change.
    pub fn reset(&mut self) {
        self.bindings = CurrentPipelineBindings::default();
        self.dirty = StateUpdateMask::EMPTY;
        self.dynamic = DynamicPipelineConfig::default();
    }

    pub(crate) fn bindings_mut(&mut self) -> &mut CurrentPipelineBindings {
        &mut self.bindings
    }

    pub(crate) fn mark(&mut self, mask: StateUpdateMask) {
        self.dirty.insert(mask);
    }

    pub(crate) fn unmark(&mut self, mask: StateUpdateMask) {
        self.dirty.remove(mask);
    }
}
