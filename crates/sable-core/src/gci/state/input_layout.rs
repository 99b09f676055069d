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

//! Input-assembler vertex layout configuration and descriptor.

use crate::gci::cache::{CachedPipelineState, PipelineStateCacheUnit, PipelineStateDescriptorCache};
use crate::gci::state::common::{
    CompiledPipelineState, PipelineStateDescriptor, PipelineStateDescriptorType, StateDescriptorId,
    MAX_VERTEX_ATTRIBUTES, MAX_VERTEX_BUFFER_BINDINGS,
};
use crate::gci::state::enums::{VertexFormat, VertexStepMode};
use crate::gci::traits::PipelineStateDescriptorFactory;

/// One vertex attribute as the input assembler reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttributeDesc {
    /// Shader input location.
    pub location: u32,
    /// Element format.
    pub format: VertexFormat,
    /// Byte offset within the vertex.
    pub offset: u32,
    /// Vertex buffer slot the attribute is fetched from.
    pub buffer_slot: u32,
    /// Whether the slot advances per vertex or per instance.
    pub step_mode: VertexStepMode,
}

/// The full attribute layout a pipeline consumes.
///
/// Describes only how attributes are laid out, not which buffers are bound;
/// buffer bindings are a separate descriptor category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct IaInputLayoutDefinition {
    /// Attributes in declaration order.
    pub attributes: Vec<VertexAttributeDesc>,
}

impl IaInputLayoutDefinition {
    /// Validates attribute count, slot range and location uniqueness.
    /// Returns a human-readable reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        if self.attributes.len() > MAX_VERTEX_ATTRIBUTES {
            return Err(format!(
                "layout declares {} attributes, limit is {}",
                self.attributes.len(),
                MAX_VERTEX_ATTRIBUTES
            ));
        }
        let mut seen_locations = 0u32;
        for attr in &self.attributes {
            if attr.buffer_slot as usize >= MAX_VERTEX_BUFFER_BINDINGS {
                return Err(format!(
                    "attribute at location {} uses buffer slot {}, limit is {}",
                    attr.location, attr.buffer_slot, MAX_VERTEX_BUFFER_BINDINGS
                ));
            }
            if attr.location as usize >= MAX_VERTEX_ATTRIBUTES {
                return Err(format!(
                    "attribute location {} exceeds limit {}",
                    attr.location, MAX_VERTEX_ATTRIBUTES
                ));
            }
            let bit = 1u32 << attr.location;
            if seen_locations & bit != 0 {
                return Err(format!("duplicate attribute location {}", attr.location));
            }
            seen_locations |= bit;
        }
        Ok(())
    }

    /// The set of vertex buffer slots this layout reads, as a bit mask.
    pub fn used_buffer_slots(&self) -> u16 {
        let mut slots = 0u16;
        for attr in &self.attributes {
            slots |= 1 << attr.buffer_slot;
        }
        slots
    }
}

/// A compiled, cache-owned input layout.
#[derive(Debug)]
pub struct IaInputLayoutDescriptor {
    id: StateDescriptorId,
    attribute_count: u32,
    used_buffer_slots: u16,
    compiled: CompiledPipelineState,
}

impl IaInputLayoutDescriptor {
    /// Number of attributes in the layout.
    pub fn attribute_count(&self) -> u32 {
        self.attribute_count
    }

    /// Bit mask of vertex buffer slots the layout reads, precomputed at
    /// creation.
    pub fn used_buffer_slots(&self) -> u16 {
        self.used_buffer_slots
    }

    /// The backend-opaque compiled state.
    pub fn compiled(&self) -> &CompiledPipelineState {
        &self.compiled
    }
}

impl PipelineStateDescriptor for IaInputLayoutDescriptor {
    fn descriptor_id(&self) -> StateDescriptorId {
        self.id
    }

    fn descriptor_type(&self) -> PipelineStateDescriptorType {
        PipelineStateDescriptorType::IaInputLayout
    }
}

impl CachedPipelineState for IaInputLayoutDescriptor {
    type Config = IaInputLayoutDefinition;

    const DESCRIPTOR_TYPE: PipelineStateDescriptorType = PipelineStateDescriptorType::IaInputLayout;

    fn compile(
        factory: &dyn PipelineStateDescriptorFactory,
        config: &Self::Config,
    ) -> Option<CompiledPipelineState> {
        factory.create_input_layout(config)
    }

    fn from_compiled(
        id: StateDescriptorId,
        config: &Self::Config,
        compiled: CompiledPipelineState,
    ) -> Self {
        Self {
            id,
            attribute_count: config.attributes.len() as u32,
            used_buffer_slots: config.used_buffer_slots(),
            compiled,
        }
    }

    fn unit_of(cache: &PipelineStateDescriptorCache) -> &PipelineStateCacheUnit<Self> {
        cache.input_layout_unit()
    }
}
