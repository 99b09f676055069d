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

//! The Graphics Core Interface (GCI).
//!
//! This module defines the "common language" for pipeline state across every
//! backend: the descriptor taxonomy and configuration value types
//! ([`state`]), the backend seam that compiles configurations
//! ([`traits::PipelineStateDescriptorFactory`]), the deduplicating
//! descriptor cache ([`cache`]), and the per-command-stream binding state
//! machine ([`controller`]).
//!
//! The GCI defines the 'what' of pipeline state management; the 'how' is
//! supplied by a concrete backend in the `sable-infra` crate which
//! implements these traits.

pub mod cache;
pub mod controller;
pub mod error;
pub mod resources;
pub mod state;
pub mod traits;

// Re-export the most important types for easier use.
pub use self::cache::{CachedPipelineState, PipelineStateCacheUnit, PipelineStateDescriptorCache};
pub use self::controller::{
    CommonClearValues, CurrentPipelineBindings, DynamicConfigFlags, DynamicPipelineConfig,
    GraphicsPipelineStateControllerBase, GraphicsPipelineStateControllerSeparable,
    GraphicsPipelineStateControllerSeparableShader, StateUpdateMask,
};
pub use self::error::PipelineStateError;
pub use self::resources::{GpuBufferId, ShaderId, ShaderStage, ShaderStageFlags, TextureId};
pub use self::state::*;
pub use self::traits::{GraphicsPipelineStateController, PipelineStateDescriptorFactory};
