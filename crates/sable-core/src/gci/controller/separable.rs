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

//! Controller specializations that diff sub-states instead of whole
//! pipelines.
//!
//! On hardware with separable state, switching pipelines only has to rebind
//! what actually differs. These controllers compute that difference by
//! handle identity: sub-descriptors are deduplicated by the cache, so two
//! pipelines sharing a configuration share the `Arc`.

use std::sync::Arc;

use crate::gci::controller::{
    CommonClearValues, CurrentPipelineBindings, DynamicConfigFlags, DynamicPipelineConfig,
    GraphicsPipelineStateControllerBase, StateUpdateMask,
};
use crate::gci::resources::ShaderStage;
use crate::gci::state::pso::GraphicsPipelineStateObjectHandle;
use crate::gci::state::render_pass::RenderPassDescriptor;
use crate::gci::state::render_target::RenderTargetBindingDescriptor;
use crate::gci::state::vertex_stream::IaVertexStreamDescriptor;
use crate::math::LinearRgba;

fn slot_differs<T>(current: &Option<Arc<T>>, next: &Arc<T>) -> bool {
    match current {
        Some(bound) => !Arc::ptr_eq(bound, next),
        None => true,
    }
}

/// Sub-state-granularity controller state machine.
///
/// A pipeline switch marks only the sub-states whose descriptors actually
/// changed. The whole-pipeline bit is provisional: it is retracted when the
/// diff finds no changed sub-state at all, so a switch between two pipelines
/// assembled from identical descriptors flushes nothing.
#[derive(Debug, Default)]
pub struct GraphicsPipelineStateControllerSeparable {
    base: GraphicsPipelineStateControllerBase,
}

impl GraphicsPipelineStateControllerSeparable {
    /// Creates a controller with nothing bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current binding slots.
    pub fn bindings(&self) -> &CurrentPipelineBindings {
        self.base.bindings()
    }

    /// The current dynamic overrides.
    pub fn dynamic_config(&self) -> &DynamicPipelineConfig {
        self.base.dynamic_config()
    }

    /// The accumulated not-yet-applied changes.
    pub fn pending_updates(&self) -> StateUpdateMask {
        self.base.pending_updates()
    }

    /// Makes `pipeline` current, marking exactly the sub-states that differ
    /// from the previous binding. Binding the already-bound handle changes
    /// nothing and returns `false`.
    pub fn bind_graphics_pipeline(
        &mut self,
        pipeline: &GraphicsPipelineStateObjectHandle,
    ) -> bool {
        if let Some(current) = &self.base.bindings().pipeline {
            if Arc::ptr_eq(current, pipeline) {
                return false;
            }
        }

        let states = pipeline.states();
        let mut changed = StateUpdateMask::EMPTY;
        {
            let bindings = self.base.bindings();
            if slot_differs(&bindings.shader_linkage, &states.separable.shader_linkage) {
                changed.insert(StateUpdateMask::SHADER_LINKAGE);
            }
            if slot_differs(&bindings.blend, &states.separable.blend) {
                changed.insert(StateUpdateMask::BLEND);
            }
            if slot_differs(&bindings.rasterizer, &states.separable.rasterizer) {
                changed.insert(StateUpdateMask::RASTERIZER);
            }
            if slot_differs(&bindings.depth_stencil, &states.separable.depth_stencil) {
                changed.insert(StateUpdateMask::DEPTH_STENCIL);
            }
            if slot_differs(&bindings.input_layout, &states.separable.input_layout) {
                changed.insert(StateUpdateMask::INPUT_LAYOUT);
            }
            if slot_differs(&bindings.vertex_stream, &states.vertex_stream) {
                changed.insert(StateUpdateMask::VERTEX_STREAM);
            }
            if slot_differs(&bindings.render_target, &states.render_target) {
                changed.insert(StateUpdateMask::RENDER_TARGET);
            }
            if slot_differs(&bindings.render_pass, &states.render_pass) {
                changed.insert(StateUpdateMask::RENDER_PASS);
            }
            if slot_differs(&bindings.root_signature, &states.root_signature) {
                changed.insert(StateUpdateMask::ROOT_SIGNATURE);
            }
        }

        self.base.bindings_mut().adopt(pipeline);
        self.base.mark(changed.with(StateUpdateMask::PIPELINE));

        // The provisional whole-pipeline bit only survives while some
        // sub-state change (this one or an earlier pending one) backs it.
        if !self
            .base
            .pending_updates()
            .intersects(StateUpdateMask::SUB_STATE)
        {
            self.base.unmark(StateUpdateMask::PIPELINE);
        }
        true
    }

    /// Clears the pipeline slot and everything adopted from it.
    pub fn unbind_graphics_pipeline(&mut self) -> bool {
        self.base.unbind_graphics_pipeline()
    }

    /// Binds `pass` on its own, independent of any pipeline.
    pub fn set_render_pass(&mut self, pass: &Arc<RenderPassDescriptor>) -> bool {
        self.base.set_render_pass(pass)
    }

    /// Clears the render pass slot.
    pub fn reset_render_pass(&mut self) -> bool {
        self.base.reset_render_pass()
    }

    /// Binds `target` on its own.
    pub fn set_render_target(&mut self, target: &Arc<RenderTargetBindingDescriptor>) -> bool {
        self.base.set_render_target(target)
    }

    /// Clears the render target slot.
    pub fn reset_render_target(&mut self) -> bool {
        self.base.reset_render_target()
    }

    /// Binds `stream` on its own.
    pub fn set_vertex_stream(&mut self, stream: &Arc<IaVertexStreamDescriptor>) -> bool {
        self.base.set_vertex_stream(stream)
    }

    /// Clears the vertex stream slot.
    pub fn reset_vertex_stream(&mut self) -> bool {
        self.base.reset_vertex_stream()
    }

    /// Supplies the blend constant override.
    pub fn set_blend_constant(&mut self, color: LinearRgba) -> bool {
        self.base.set_blend_constant(color)
    }

    /// Supplies the clear value override.
    pub fn set_clear_values(&mut self, values: CommonClearValues) -> bool {
        self.base.set_clear_values(values)
    }

    /// Supplies the stencil reference override.
    pub fn set_stencil_reference(&mut self, reference: u32) -> bool {
        self.base.set_stencil_reference(reference)
    }

    /// Disables the overrides named in `mask`.
    pub fn reset_dynamic_config(&mut self, mask: DynamicConfigFlags) -> bool {
        self.base.reset_dynamic_config(mask)
    }

    /// Hands the pending mask to the backend and clears it.
    pub fn take_pending(&mut self) -> StateUpdateMask {
        self.base.take_pending()
    }

    /// Drops every binding, override and pending change.
    pub fn reset(&mut self) {
        self.base.reset()
    }

    pub(crate) fn mark(&mut self, mask: StateUpdateMask) {
        self.base.mark(mask);
    }

    pub(crate) fn unmark(&mut self, mask: StateUpdateMask) {
        self.base.unmark(mask);
    }
}

/// Shader-stage-granularity controller state machine.
///
/// Refines [`GraphicsPipelineStateControllerSeparable`] one level further:
/// when the shader linkage changes, the individual stages are compared and
/// only the ones with a different program are marked. A linkage swap that
/// rebinds the same programs in every stage flushes nothing.
#[derive(Debug, Default)]
pub struct GraphicsPipelineStateControllerSeparableShader {
    inner: GraphicsPipelineStateControllerSeparable,
}

impl GraphicsPipelineStateControllerSeparableShader {
    /// Creates a controller with nothing bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current binding slots.
    pub fn bindings(&self) -> &CurrentPipelineBindings {
        self.inner.bindings()
    }

    /// The current dynamic overrides.
    pub fn dynamic_config(&self) -> &DynamicPipelineConfig {
        self.inner.dynamic_config()
    }

    /// The accumulated not-yet-applied changes.
    pub fn pending_updates(&self) -> StateUpdateMask {
        self.inner.pending_updates()
    }

    /// Makes `pipeline` current, marking changed sub-states and, within a
    /// changed shader linkage, only the stages whose program differs.
    pub fn bind_graphics_pipeline(
        &mut self,
        pipeline: &GraphicsPipelineStateObjectHandle,
    ) -> bool {
        let previous_linkage = self.inner.bindings().shader_linkage.clone();
        if !self.inner.bind_graphics_pipeline(pipeline) {
            return false;
        }

        let next_linkage = &pipeline.states().separable.shader_linkage;
        let linkage_changed = match &previous_linkage {
            Some(previous) => !Arc::ptr_eq(previous, next_linkage),
            None => true,
        };
        if !linkage_changed {
            return true;
        }

        let mut stages = StateUpdateMask::EMPTY;
        match &previous_linkage {
            None => {
                for stage in ShaderStage::ALL {
                    if next_linkage.binding().stage(stage).is_some() {
                        stages.insert(StateUpdateMask::stage(stage));
                    }
                }
            }
            Some(previous) => {
                for stage in ShaderStage::ALL {
                    if previous.binding().stage(stage) != next_linkage.binding().stage(stage) {
                        stages.insert(StateUpdateMask::stage(stage));
                    }
                }
                // Distinct linkage descriptors binding the same program in
                // every stage need no stage flush; take the linkage bit back
                // and re-evaluate the whole-pipeline bit.
                if stages.is_empty() {
                    self.inner.unmark(StateUpdateMask::SHADER_LINKAGE);
                    if !self
                        .inner
                        .pending_updates()
                        .intersects(StateUpdateMask::SUB_STATE)
                    {
                        self.inner.unmark(StateUpdateMask::PIPELINE);
                    }
                }
            }
        }
        self.inner.mark(stages);
        true
    }

    /// Clears the pipeline slot and everything adopted from it.
    pub fn unbind_graphics_pipeline(&mut self) -> bool {
        self.inner.unbind_graphics_pipeline()
    }

    /// Binds `pass` on its own, independent of any pipeline.
    pub fn set_render_pass(&mut self, pass: &Arc<RenderPassDescriptor>) -> bool {
        self.inner.set_render_pass(pass)
    }

    /// Clears the render pass slot.
    pub fn reset_render_pass(&mut self) -> bool {
        self.inner.reset_render_pass()
    }

    /// Binds `target` on its own.
    pub fn set_render_target(&mut self, target: &Arc<RenderTargetBindingDescriptor>) -> bool {
        self.inner.set_render_target(target)
    }

    /// Clears the render target slot.
    pub fn reset_render_target(&mut self) -> bool {
        self.inner.reset_render_target()
    }

    /// Binds `stream` on its own.
    pub fn set_vertex_stream(&mut self, stream: &Arc<IaVertexStreamDescriptor>) -> bool {
        self.inner.set_vertex_stream(stream)
    }

    /// Clears the vertex stream slot.
    pub fn reset_vertex_stream(&mut self) -> bool {
        self.inner.reset_vertex_stream()
    }

    /// Supplies the blend constant override.
    pub fn set_blend_constant(&mut self, color: LinearRgba) -> bool {
        self.inner.set_blend_constant(color)
    }

    /// Supplies the clear value override.
    pub fn set_clear_values(&mut self, values: CommonClearValues) -> bool {
        self.inner.set_clear_values(values)
    }

    /// Supplies the stencil reference override.
    pub fn set_stencil_reference(&mut self, reference: u32) -> bool {
        self.inner.set_stencil_reference(reference)
    }

    /// Disables the overrides named in `mask`.
    pub fn reset_dynamic_config(&mut self, mask: DynamicConfigFlags) -> bool {
        self.inner.reset_dynamic_config(mask)
    }

    /// Hands the pending mask to the backend and clears it.
    pub fn take_pending(&mut self) -> StateUpdateMask {
        self.inner.take_pending()
    }

    /// Drops every binding, override and pending change.
    pub fn reset(&mut self) {
        self.inner.reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gci::cache::CachedPipelineState;
    use crate::gci::controller::tests::sample_pipeline;
    use crate::gci::resources::ShaderId;
    use crate::gci::state::common::{CompiledPipelineState, StateDescriptorId};
    use crate::gci::state::pso::GraphicsPipelineStateObjectStorage;
    use crate::gci::state::rasterizer::RasterizerConfig;
    use crate::gci::state::rasterizer::RasterizerStateDescriptor;
    use crate::gci::state::shader_linkage::{
        GraphicsShaderBinding, GraphicsShaderLinkageDescriptor,
    };

    #[test]
    fn first_bind_marks_every_changed_sub_state() {
        let storage = GraphicsPipelineStateObjectStorage::new();
        let pipeline = sample_pipeline(&storage, 100);
        let mut controller = GraphicsPipelineStateControllerSeparable::new();

        assert!(controller.bind_graphics_pipeline(&pipeline));
        let pending = controller.pending_updates();
        assert!(pending.contains(StateUpdateMask::PIPELINE));
        assert!(pending.contains(StateUpdateMask::SUB_STATE));
    }

    #[test]
    fn switching_marks_only_differing_sub_states() {
        let storage = GraphicsPipelineStateObjectStorage::new();
        let first = sample_pipeline(&storage, 100);
        // Same descriptors except the rasterizer.
        let mut info = first.states().clone();
        info.separable.rasterizer = Arc::new(RasterizerStateDescriptor::from_compiled(
            StateDescriptorId(500),
            &RasterizerConfig::default(),
            CompiledPipelineState::new(()),
        ));
        let second = storage
            .get_or_create(&info, || Some(CompiledPipelineState::new(())))
            .unwrap();

        let mut controller = GraphicsPipelineStateControllerSeparable::new();
        controller.bind_graphics_pipeline(&first);
        controller.take_pending();

        assert!(controller.bind_graphics_pipeline(&second));
        assert_eq!(
            controller.pending_updates(),
            StateUpdateMask::PIPELINE | StateUpdateMask::RASTERIZER
        );
    }

    #[test]
    fn distinct_pipelines_sharing_every_sub_state_flush_nothing() {
        let storage = GraphicsPipelineStateObjectStorage::new();
        let first = sample_pipeline(&storage, 100);
        // A second pipeline object assembled over the very same
        // sub-descriptors; a separate storage keeps the handles distinct.
        let other_storage = GraphicsPipelineStateObjectStorage::new();
        let second = other_storage
            .get_or_create(first.states(), || Some(CompiledPipelineState::new(())))
            .unwrap();
        assert!(!Arc::ptr_eq(&first, &second));

        let mut controller = GraphicsPipelineStateControllerSeparable::new();
        controller.bind_graphics_pipeline(&first);
        controller.take_pending();

        // Every sub-state diff reports unchanged, so the provisional
        // whole-pipeline bit is retracted and nothing needs flushing.
        assert!(controller.bind_graphics_pipeline(&second));
        assert!(controller.pending_updates().is_empty());
    }

    #[test]
    fn earlier_pending_bits_survive_a_no_change_switch() {
        let storage = GraphicsPipelineStateObjectStorage::new();
        let first = sample_pipeline(&storage, 100);
        let mut controller = GraphicsPipelineStateControllerSeparable::new();
        controller.bind_graphics_pipeline(&first);

        // Nothing was applied yet; switching back and forth must not lose
        // the pending work.
        let pending_before = controller.pending_updates();
        controller.bind_graphics_pipeline(&first);
        assert_eq!(controller.pending_updates(), pending_before);
    }

    #[test]
    fn stage_diff_marks_only_the_changed_stage() {
        let storage = GraphicsPipelineStateObjectStorage::new();
        let first = sample_pipeline(&storage, 100);

        // Same vertex shader, different pixel shader.
        let mut info = first.states().clone();
        info.separable.shader_linkage =
            Arc::new(GraphicsShaderLinkageDescriptor::from_compiled(
                StateDescriptorId(600),
                &GraphicsShaderBinding::vertex_pixel(ShaderId(1), ShaderId(99)),
                CompiledPipelineState::new(()),
            ));
        let second = storage
            .get_or_create(&info, || Some(CompiledPipelineState::new(())))
            .unwrap();

        let mut controller = GraphicsPipelineStateControllerSeparableShader::new();
        controller.bind_graphics_pipeline(&first);
        controller.take_pending();

        assert!(controller.bind_graphics_pipeline(&second));
        let pending = controller.pending_updates();
        assert!(pending.contains(StateUpdateMask::SHADER_LINKAGE));
        assert!(pending.contains(StateUpdateMask::STAGE_PIXEL));
        assert!(!pending.contains(StateUpdateMask::STAGE_VERTEX));
    }

    #[test]
    fn identical_stage_programs_retract_the_linkage_bit() {
        let storage = GraphicsPipelineStateObjectStorage::new();
        let first = sample_pipeline(&storage, 100);

        // A distinct linkage descriptor binding the same programs.
        let mut info = first.states().clone();
        info.separable.shader_linkage =
            Arc::new(GraphicsShaderLinkageDescriptor::from_compiled(
                StateDescriptorId(700),
                &GraphicsShaderBinding::vertex_pixel(ShaderId(1), ShaderId(2)),
                CompiledPipelineState::new(()),
            ));
        let second = storage
            .get_or_create(&info, || Some(CompiledPipelineState::new(())))
            .unwrap();

        let mut controller = GraphicsPipelineStateControllerSeparableShader::new();
        controller.bind_graphics_pipeline(&first);
        controller.take_pending();

        assert!(controller.bind_graphics_pipeline(&second));
        assert!(controller.pending_updates().is_empty());
    }

    #[test]
    fn first_bind_marks_only_populated_stages() {
        let storage = GraphicsPipelineStateObjectStorage::new();
        let pipeline = sample_pipeline(&storage, 100);
        let mut controller = GraphicsPipelineStateControllerSeparableShader::new();

        controller.bind_graphics_pipeline(&pipeline);
        let pending = controller.pending_updates();
        assert!(pending.contains(StateUpdateMask::STAGE_VERTEX | StateUpdateMask::STAGE_PIXEL));
        assert!(!pending.intersects(
            StateUpdateMask::STAGE_HULL
                | StateUpdateMask::STAGE_DOMAIN
                | StateUpdateMask::STAGE_GEOMETRY
        ));
    }
}
