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

//! Vertex and index buffer binding configuration and descriptor.

use crate::gci::cache::{CachedPipelineState, PipelineStateCacheUnit, PipelineStateDescriptorCache};
use crate::gci::resources::GpuBufferId;
use crate::gci::state::common::{
    CompiledPipelineState, PipelineStateDescriptor, PipelineStateDescriptorType, StateDescriptorId,
    MAX_VERTEX_BUFFER_BINDINGS,
};
use crate::gci::state::enums::{IndexFormat, PrimitiveTopology};
use crate::gci::traits::PipelineStateDescriptorFactory;

/// One vertex buffer bound to an input-assembler slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexBufferBinding {
    /// Buffer providing the vertex data.
    pub buffer: GpuBufferId,
    /// Distance in bytes between consecutive elements.
    pub stride: u32,
    /// Byte offset of the first element.
    pub offset: u64,
}

/// The index buffer feeding indexed draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexBufferBinding {
    /// Buffer providing the indices.
    pub buffer: GpuBufferId,
    /// Width of each index.
    pub format: IndexFormat,
    /// Byte offset of the first index.
    pub offset: u64,
}

/// The complete geometry-source assignment for a pipeline.
///
/// `vertex_buffers[i] == None` leaves input-assembler slot `i` unbound.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IaVertexStreamDefinition {
    /// Per-slot vertex buffer bindings.
    pub vertex_buffers: [Option<VertexBufferBinding>; MAX_VERTEX_BUFFER_BINDINGS],
    /// Index buffer, `None` for non-indexed geometry.
    pub index_buffer: Option<IndexBufferBinding>,
    /// Primitive assembly mode.
    pub topology: PrimitiveTopology,
}

impl Default for IaVertexStreamDefinition {
    fn default() -> Self {
        Self {
            vertex_buffers: [None; MAX_VERTEX_BUFFER_BINDINGS],
            index_buffer: None,
            topology: PrimitiveTopology::default(),
        }
    }
}

impl IaVertexStreamDefinition {
    /// A single-buffer triangle-list stream, the common case.
    pub fn single(buffer: VertexBufferBinding) -> Self {
        let mut definition = Self::default();
        definition.vertex_buffers[0] = Some(buffer);
        definition
    }

    /// Bit mask of input-assembler slots with a buffer bound.
    pub fn bound_slots(&self) -> u16 {
        let mut slots = 0u16;
        for (index, binding) in self.vertex_buffers.iter().enumerate() {
            if binding.is_some() {
                slots |= 1 << index;
            }
        }
        slots
    }

    /// True when indexed draws can be issued from this stream.
    pub fn is_indexed(&self) -> bool {
        self.index_buffer.is_some()
    }
}

/// A compiled, cache-owned vertex stream assignment.
#[derive(Debug)]
pub struct IaVertexStreamDescriptor {
    id: StateDescriptorId,
    bound_slots: u16,
    indexed: bool,
    topology: PrimitiveTopology,
    compiled: CompiledPipelineState,
}

impl IaVertexStreamDescriptor {
    /// Bit mask of bound input-assembler slots, precomputed at creation.
    pub fn bound_slots(&self) -> u16 {
        self.bound_slots
    }

    /// True when the stream carries an index buffer.
    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    /// Primitive assembly mode captured at creation.
    pub fn topology(&self) -> PrimitiveTopology {
        self.topology
    }

    /// The backend-opaque compiled state.
    pub fn compiled(&self) -> &CompiledPipelineState {
        &self.compiled
    }
}

impl PipelineStateDescriptor for IaVertexStreamDescriptor {
    fn descriptor_id(&self) -> StateDescriptorId {
        self.id
    }

    fn descriptor_type(&self) -> PipelineStateDescriptorType {
        PipelineStateDescriptorType::IaVertexStream
    }
}

impl CachedPipelineState for IaVertexStreamDescriptor {
    type Config = IaVertexStreamDefinition;

    const DESCRIPTOR_TYPE: PipelineStateDescriptorType = PipelineStateDescriptorType::IaVertexStream;

    fn compile(
        factory: &dyn PipelineStateDescriptorFactory,
        config: &Self::Config,
    ) -> Option<CompiledPipelineState> {
        factory.create_vertex_stream(config)
    }

    fn from_compiled(
        id: StateDescriptorId,
        config: &Self::Config,
        compiled: CompiledPipelineState,
    ) -> Self {
        Self {
            id,
            bound_slots: config.bound_slots(),
            indexed: config.is_indexed(),
            topology: config.topology,
            compiled,
        }
    }

    fn unit_of(cache: &PipelineStateDescriptorCache) -> &PipelineStateCacheUnit<Self> {
        cache.vertex_stream_unit()
    }
}
