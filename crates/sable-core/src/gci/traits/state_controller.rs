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

//! The controller seam backends implement per command stream.

use std::sync::Arc;

use crate::gci::controller::{
    CommonClearValues, CurrentPipelineBindings, DynamicConfigFlags, StateUpdateMask,
};
use crate::gci::error::PipelineStateError;
use crate::gci::state::pso::GraphicsPipelineStateObjectHandle;
use crate::gci::state::render_pass::RenderPassDescriptor;
use crate::gci::state::render_target::RenderTargetBindingDescriptor;
use crate::gci::state::vertex_stream::IaVertexStreamDescriptor;
use crate::math::LinearRgba;

/// Tracks and flushes pipeline state for one command stream.
///
/// A controller is single-stream state: it is owned by whoever records the
/// stream and is not shared between threads. Every mutating method returns
/// whether it actually changed anything, so callers can skip redundant work.
///
/// Backends implement this by wrapping one of the controller state machines
/// from [`controller`](crate::gci::controller) and supplying the hardware
/// flush in [`apply_state_changes`](Self::apply_state_changes).
pub trait GraphicsPipelineStateController {
    /// Makes `pipeline` the current pipeline. Returns `false` when it is
    /// already bound.
    fn bind_graphics_pipeline(&mut self, pipeline: &GraphicsPipelineStateObjectHandle) -> bool;

    /// Clears the pipeline slot. Returns `false` when nothing was bound.
    fn unbind_graphics_pipeline(&mut self) -> bool;

    /// Binds a render pass independent of any pipeline. Dynamic passes bound
    /// this way are re-validated on every apply. Returns `false` when it is
    /// already bound.
    fn set_render_pass(&mut self, pass: &Arc<RenderPassDescriptor>) -> bool;

    /// Clears the render pass slot. Returns `false` when already empty.
    fn reset_render_pass(&mut self) -> bool;

    /// Binds a render target independent of any pipeline. Returns `false`
    /// when it is already bound.
    fn set_render_target(&mut self, target: &Arc<RenderTargetBindingDescriptor>) -> bool;

    /// Clears the render target slot. Returns `false` when already empty.
    fn reset_render_target(&mut self) -> bool;

    /// Binds vertex/index buffers independent of any pipeline. Returns
    /// `false` when they are already bound.
    fn set_vertex_stream(&mut self, stream: &Arc<IaVertexStreamDescriptor>) -> bool;

    /// Clears the vertex stream slot. Returns `false` when already empty.
    fn reset_vertex_stream(&mut self) -> bool;

    /// Sets the constant color consumed by constant-color blend factors.
    /// Returns `false` when the value is unchanged.
    fn set_blend_constant(&mut self, color: LinearRgba) -> bool;

    /// Sets the clear values used by clearing render passes. Returns `false`
    /// when the values are unchanged.
    fn set_clear_values(&mut self, values: CommonClearValues) -> bool;

    /// Sets the stencil reference value. Returns `false` when unchanged.
    fn set_stencil_reference(&mut self, reference: u32) -> bool;

    /// Disables the dynamic overrides named in `mask`, handing their slots
    /// back to pipeline defaults. Returns `false` when none were enabled.
    fn reset_dynamic_config(&mut self, mask: DynamicConfigFlags) -> bool;

    /// The current binding slots.
    fn bindings(&self) -> &CurrentPipelineBindings;

    /// The accumulated not-yet-applied state changes.
    fn pending_updates(&self) -> StateUpdateMask;

    /// Flushes pending changes to the hardware stream and clears the dirty
    /// mask. Returns the mask that was applied; applying with nothing
    /// pending is a cheap no-op returning an empty mask.
    fn apply_state_changes(&mut self) -> Result<StateUpdateMask, PipelineStateError>;

    /// Drops every binding and marks nothing pending, as after stream
    /// creation.
    fn reset(&mut self);
}
