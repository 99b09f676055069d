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

//! The headless pipeline state controller.

use std::sync::Arc;

use sable_core::gci::controller::{
    CommonClearValues, CurrentPipelineBindings, DynamicConfigFlags,
    GraphicsPipelineStateControllerSeparableShader, StateUpdateMask,
};
use sable_core::gci::error::PipelineStateError;
use sable_core::gci::PipelineStateDescriptor;
use sable_core::gci::state::pso::{GraphicsPipelineStateObjectHandle, PipelineStateObjectId};
use sable_core::gci::state::render_pass::RenderPassDescriptor;
use sable_core::gci::state::render_target::RenderTargetBindingDescriptor;
use sable_core::gci::state::vertex_stream::IaVertexStreamDescriptor;
use sable_core::gci::traits::{GraphicsPipelineStateController, PipelineStateDescriptorFactory};
use sable_core::math::LinearRgba;

/// One flushed batch of state changes, as the hardware would have seen it.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedStateBatch {
    /// The sub-states rebound in this batch.
    pub mask: StateUpdateMask,
    /// The pipeline current at flush time.
    pub pipeline: Option<PipelineStateObjectId>,
    /// Blend constant, when the override is enabled.
    pub blend_constant: Option<LinearRgba>,
    /// Clear values, when the override is enabled.
    pub clear_values: Option<CommonClearValues>,
    /// Stencil reference, when the override is enabled and meaningful.
    pub stencil_reference: Option<u32>,
}

/// A controller that records applied batches instead of talking to a GPU.
///
/// Wraps the stage-granular state machine from `sable-core` and adds the
/// backend half of `apply_state_changes`: dynamic render pass re-validation
/// and the actual (here, recorded) flush.
pub struct HeadlessPipelineStateController {
    state: GraphicsPipelineStateControllerSeparableShader,
    factory: Arc<dyn PipelineStateDescriptorFactory>,
    applied: Vec<AppliedStateBatch>,
}

impl HeadlessPipelineStateController {
    /// Creates a controller validating dynamic state through `factory`.
    pub fn new(factory: Arc<dyn PipelineStateDescriptorFactory>) -> Self {
        Self {
            state: GraphicsPipelineStateControllerSeparableShader::new(),
            factory,
            applied: Vec::new(),
        }
    }

    /// Every batch flushed so far, oldest first.
    pub fn applied_batches(&self) -> &[AppliedStateBatch] {
        &self.applied
    }

    /// The most recently flushed batch.
    pub fn last_applied(&self) -> Option<&AppliedStateBatch> {
        self.applied.last()
    }
}

impl GraphicsPipelineStateController for HeadlessPipelineStateController {
    fn bind_graphics_pipeline(&mut self, pipeline: &GraphicsPipelineStateObjectHandle) -> bool {
        self.state.bind_graphics_pipeline(pipeline)
    }

    fn unbind_graphics_pipeline(&mut self) -> bool {
        self.state.unbind_graphics_pipeline()
    }

    fn set_render_pass(&mut self, pass: &Arc<RenderPassDescriptor>) -> bool {
        self.state.set_render_pass(pass)
    }

    fn reset_render_pass(&mut self) -> bool {
        self.state.reset_render_pass()
    }

    fn set_render_target(&mut self, target: &Arc<RenderTargetBindingDescriptor>) -> bool {
        self.state.set_render_target(target)
    }

    fn reset_render_target(&mut self) -> bool {
        self.state.reset_render_target()
    }

    fn set_vertex_stream(&mut self, stream: &Arc<IaVertexStreamDescriptor>) -> bool {
        self.state.set_vertex_stream(stream)
    }

    fn reset_vertex_stream(&mut self) -> bool {
        self.state.reset_vertex_stream()
    }

    fn set_blend_constant(&mut self, color: LinearRgba) -> bool {
        self.state.set_blend_constant(color)
    }

    fn set_clear_values(&mut self, values: CommonClearValues) -> bool {
        self.state.set_clear_values(values)
    }

    fn set_stencil_reference(&mut self, reference: u32) -> bool {
        self.state.set_stencil_reference(reference)
    }

    fn reset_dynamic_config(&mut self, mask: DynamicConfigFlags) -> bool {
        self.state.reset_dynamic_config(mask)
    }

    fn bindings(&self) -> &CurrentPipelineBindings {
        self.state.bindings()
    }

    fn pending_updates(&self) -> StateUpdateMask {
        self.state.pending_updates()
    }

    fn apply_state_changes(&mut self) -> Result<StateUpdateMask, PipelineStateError> {
        if self.state.pending_updates().is_empty() {
            return Ok(StateUpdateMask::EMPTY);
        }

        // Dynamic passes are re-validated on every flush: their
        // configuration may have changed since the last one. Validation
        // failure leaves the pending mask untouched.
        if let Some(pass) = &self.state.bindings().render_pass {
            if pass.is_dynamic() {
                self.factory
                    .validate_dynamic_render_pass(&pass.configuration())?;
            }
        }

        let mask = self.state.take_pending();
        let bindings = self.state.bindings();
        let dynamic = self.state.dynamic_config();

        let uses_stencil = bindings
            .pipeline
            .as_ref()
            .map(|pipeline| pipeline.properties().uses_stencil)
            .unwrap_or(false);
        if dynamic.enabled.contains(DynamicConfigFlags::STENCIL_REFERENCE) && !uses_stencil {
            log::warn!("stencil reference override set but the bound pipeline has no stencil test");
        }

        let batch = AppliedStateBatch {
            mask,
            pipeline: bindings.pipeline.as_ref().map(|pipeline| pipeline.id()),
            blend_constant: dynamic
                .enabled
                .contains(DynamicConfigFlags::BLEND_CONSTANT)
                .then_some(dynamic.blend_constant),
            clear_values: dynamic
                .enabled
                .contains(DynamicConfigFlags::CLEAR_VALUES)
                .then_some(dynamic.clear_values),
            stencil_reference: (dynamic
                .enabled
                .contains(DynamicConfigFlags::STENCIL_REFERENCE)
                && uses_stencil)
                .then_some(dynamic.stencil_reference),
        };
        log::trace!("headless controller applied {:?}", batch.mask);
        self.applied.push(batch);
        Ok(mask)
    }

    fn reset(&mut self) {
        self.state.reset();
    }
}

impl std::fmt::Debug for HeadlessPipelineStateController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessPipelineStateController")
            .field("pending", &self.state.pending_updates())
            .field("applied_batches", &self.applied.len())
            .finish()
    }
}
