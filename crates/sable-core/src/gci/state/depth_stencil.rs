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

//! Depth and stencil test configuration and descriptor.

use crate::gci::cache::{CachedPipelineState, PipelineStateCacheUnit, PipelineStateDescriptorCache};
use crate::gci::state::common::{
    CompiledPipelineState, PipelineStateDescriptor, PipelineStateDescriptorType, StateDescriptorId,
};
use crate::gci::state::enums::{CompareFunction, StencilOperation};
use crate::gci::traits::PipelineStateDescriptorFactory;
use crate::sable_bitflags;

sable_bitflags! {
    /// Which parts of the depth/stencil stage are enabled.
    pub struct DepthStencilFlags: u8 {
        /// Depth testing is performed.
        const DEPTH_TEST = 1 << 0;
        /// Passing fragments write their depth.
        const DEPTH_WRITE = 1 << 1;
        /// Stencil testing is performed.
        const STENCIL_TEST = 1 << 2;
    }
}

/// Depth comparison settings, meaningful when `DEPTH_TEST` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DepthTestSettings {
    /// Comparison between incoming and stored depth.
    pub compare: CompareFunction,
}

/// The stencil operations applied to one face orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StencilFaceOps {
    /// Comparison between the reference value and the stored stencil.
    pub compare: CompareFunction,
    /// Applied when the stencil test fails.
    pub fail_op: StencilOperation,
    /// Applied when the stencil test passes but the depth test fails.
    pub depth_fail_op: StencilOperation,
    /// Applied when both tests pass.
    pub pass_op: StencilOperation,
}

/// Stencil settings, meaningful when `STENCIL_TEST` is set.
///
/// The stencil reference value is not part of this configuration; it is a
/// dynamic override supplied through the pipeline controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilTestSettings {
    /// Bits of the stored stencil consulted by the comparison.
    pub read_mask: u8,
    /// Bits of the stored stencil the operations may change.
    pub write_mask: u8,
    /// Operations for front-facing primitives.
    pub front: StencilFaceOps,
    /// Operations for back-facing primitives.
    pub back: StencilFaceOps,
}

impl Default for StencilTestSettings {
    fn default() -> Self {
        Self {
            read_mask: 0xFF,
            write_mask: 0xFF,
            front: StencilFaceOps::default(),
            back: StencilFaceOps::default(),
        }
    }
}

/// Complete depth/stencil configuration for a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DepthStencilConfig {
    /// Enabled stages.
    pub flags: DepthStencilFlags,
    /// Depth comparison, consulted when `DEPTH_TEST` is set.
    pub depth: DepthTestSettings,
    /// Stencil behavior, consulted when `STENCIL_TEST` is set.
    pub stencil: StencilTestSettings,
}

impl DepthStencilConfig {
    /// Standard opaque-geometry configuration: depth test and write with a
    /// less-or-equal comparison, stencil off.
    pub fn depth_read_write() -> Self {
        Self {
            flags: DepthStencilFlags::DEPTH_TEST | DepthStencilFlags::DEPTH_WRITE,
            depth: DepthTestSettings {
                compare: CompareFunction::LessEqual,
            },
            stencil: StencilTestSettings::default(),
        }
    }

    /// Everything disabled.
    pub fn disabled() -> Self {
        Self::default()
    }
}

/// A compiled, cache-owned depth/stencil state.
#[derive(Debug)]
pub struct DepthStencilStateDescriptor {
    id: StateDescriptorId,
    flags: DepthStencilFlags,
    compiled: CompiledPipelineState,
}

impl DepthStencilStateDescriptor {
    /// Enabled stages captured at creation.
    pub fn flags(&self) -> DepthStencilFlags {
        self.flags
    }

    /// True when this state performs stencil testing, so a dynamic stencil
    /// reference override is meaningful.
    pub fn uses_stencil(&self) -> bool {
        self.flags.contains(DepthStencilFlags::STENCIL_TEST)
    }

    /// The backend-opaque compiled state.
    pub fn compiled(&self) -> &CompiledPipelineState {
        &self.compiled
    }
}

impl PipelineStateDescriptor for DepthStencilStateDescriptor {
    fn descriptor_id(&self) -> StateDescriptorId {
        self.id
    }

    fn descriptor_type(&self) -> PipelineStateDescriptorType {
        PipelineStateDescriptorType::DepthStencil
    }
}

impl CachedPipelineState for DepthStencilStateDescriptor {
    type Config = DepthStencilConfig;

    const DESCRIPTOR_TYPE: PipelineStateDescriptorType = PipelineStateDescriptorType::DepthStencil;

    fn compile(
        factory: &dyn PipelineStateDescriptorFactory,
        config: &Self::Config,
    ) -> Option<CompiledPipelineState> {
        factory.create_depth_stencil_state(config)
    }

    fn from_compiled(
        id: StateDescriptorId,
        config: &Self::Config,
        compiled: CompiledPipelineState,
    ) -> Self {
        Self {
            id,
            flags: config.flags,
            compiled,
        }
    }

    fn unit_of(cache: &PipelineStateDescriptorCache) -> &PipelineStateCacheUnit<Self> {
        cache.depth_stencil_unit()
    }
}
