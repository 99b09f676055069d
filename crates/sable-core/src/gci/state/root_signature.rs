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

//! Root signature (resource binding interface) configuration and descriptor.

use crate::gci::cache::{CachedPipelineState, PipelineStateCacheUnit, PipelineStateDescriptorCache};
use crate::gci::resources::ShaderStageFlags;
use crate::gci::state::common::{
    CompiledPipelineState, PipelineStateDescriptor, PipelineStateDescriptorType, StateDescriptorId,
};
use crate::gci::traits::PipelineStateDescriptorFactory;

/// What one root parameter binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootParameterKind {
    /// Inline constants, in 32-bit units.
    Constants {
        /// Number of 32-bit values.
        count: u32,
    },
    /// A single constant buffer view.
    ConstantBuffer,
    /// A single shader resource view.
    ShaderResource,
    /// A single unordered access view.
    UnorderedAccess,
    /// A table of descriptors resolved at bind time.
    DescriptorTable {
        /// Number of descriptors in the table.
        descriptor_count: u32,
    },
}

/// One entry of the binding interface shared by the pipeline's shaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RootParameter {
    /// What the parameter binds.
    pub kind: RootParameterKind,
    /// Register or binding index the shaders address it through.
    pub binding: u32,
    /// Stages allowed to read the parameter.
    pub visibility: ShaderStageFlags,
}

/// The full binding interface for a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RootSignatureDesc {
    /// Parameters in root order.
    pub parameters: Vec<RootParameter>,
}

impl RootSignatureDesc {
    /// Checks that bindings are unique within the signature.
    pub fn validate(&self) -> Result<(), String> {
        for (index, param) in self.parameters.iter().enumerate() {
            let duplicate = self.parameters[..index]
                .iter()
                .any(|earlier| earlier.binding == param.binding);
            if duplicate {
                return Err(format!("duplicate root binding {}", param.binding));
            }
        }
        Ok(())
    }

    /// Union of the visibility of every parameter.
    pub fn visible_stages(&self) -> ShaderStageFlags {
        let mut stages = ShaderStageFlags::EMPTY;
        for param in &self.parameters {
            stages.insert(param.visibility);
        }
        stages
    }
}

/// A compiled, cache-owned root signature.
#[derive(Debug)]
pub struct RootSignatureDescriptor {
    id: StateDescriptorId,
    parameter_count: u32,
    visible_stages: ShaderStageFlags,
    compiled: CompiledPipelineState,
}

impl RootSignatureDescriptor {
    /// Number of root parameters.
    pub fn parameter_count(&self) -> u32 {
        self.parameter_count
    }

    /// Union of parameter visibility, precomputed at creation.
    pub fn visible_stages(&self) -> ShaderStageFlags {
        self.visible_stages
    }

    /// The backend-opaque compiled state.
    pub fn compiled(&self) -> &CompiledPipelineState {
        &self.compiled
    }
}

impl PipelineStateDescriptor for RootSignatureDescriptor {
    fn descriptor_id(&self) -> StateDescriptorId {
        self.id
    }

    fn descriptor_type(&self) -> PipelineStateDescriptorType {
        PipelineStateDescriptorType::RootSignature
    }
}

impl CachedPipelineState for RootSignatureDescriptor {
    type Config = RootSignatureDesc;

    const DESCRIPTOR_TYPE: PipelineStateDescriptorType = PipelineStateDescriptorType::RootSignature;

    fn compile(
        factory: &dyn PipelineStateDescriptorFactory,
        config: &Self::Config,
    ) -> Option<CompiledPipelineState> {
        factory.create_root_signature(config)
    }

    fn from_compiled(
        id: StateDescriptorId,
        config: &Self::Config,
        compiled: CompiledPipelineState,
    ) -> Self {
        Self {
            id,
            parameter_count: config.parameters.len() as u32,
            visible_stages: config.visible_stages(),
            compiled,
        }
    }

    fn unit_of(cache: &PipelineStateDescriptorCache) -> &PipelineStateCacheUnit<Self> {
        cache.root_signature_unit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_bindings_are_rejected() {
        let desc = RootSignatureDesc {
            parameters: vec![
                RootParameter {
                    kind: RootParameterKind::ConstantBuffer,
                    binding: 0,
                    visibility: ShaderStageFlags::VERTEX,
                },
                RootParameter {
                    kind: RootParameterKind::ShaderResource,
                    binding: 0,
                    visibility: ShaderStageFlags::PIXEL,
                },
            ],
        };
        assert!(desc.validate().is_err());
    }

    #[test]
    fn visibility_is_unioned_across_parameters() {
        let desc = RootSignatureDesc {
            parameters: vec![
                RootParameter {
                    kind: RootParameterKind::Constants { count: 4 },
                    binding: 0,
                    visibility: ShaderStageFlags::VERTEX,
                },
                RootParameter {
                    kind: RootParameterKind::DescriptorTable {
                        descriptor_count: 8,
                    },
                    binding: 1,
                    visibility: ShaderStageFlags::PIXEL,
                },
            ],
        };
        assert!(desc.validate().is_ok());
        assert_eq!(
            desc.visible_stages(),
            ShaderStageFlags::VERTEX | ShaderStageFlags::PIXEL
        );
    }
}
