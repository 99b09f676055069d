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

//! Render pass configuration and descriptor, including the mutable dynamic
//! variant that bypasses the cache.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::gci::cache::{CachedPipelineState, PipelineStateCacheUnit, PipelineStateDescriptorCache};
use crate::gci::state::common::{
    CompiledPipelineState, PipelineStateDescriptor, PipelineStateDescriptorType, StateDescriptorId,
    MAX_COLOR_ATTACHMENTS,
};
use crate::gci::state::enums::{AttachmentLoadOp, AttachmentStoreOp};
use crate::gci::traits::PipelineStateDescriptorFactory;

/// Load and store behavior for one attachment across a pass.
///
/// Clear values are not part of the pass configuration; they are dynamic
/// overrides supplied through the pipeline controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RenderPassAttachmentOps {
    /// What happens to the attachment contents when the pass begins.
    pub load: AttachmentLoadOp,
    /// What happens to the attachment contents when the pass ends.
    pub store: AttachmentStoreOp,
}

impl RenderPassAttachmentOps {
    /// Clear on load, store on end.
    pub const CLEAR_STORE: Self = Self {
        load: AttachmentLoadOp::Clear,
        store: AttachmentStoreOp::Store,
    };

    /// Preserve existing contents, store on end.
    pub const LOAD_STORE: Self = Self {
        load: AttachmentLoadOp::Load,
        store: AttachmentStoreOp::Store,
    };
}

/// Per-attachment load/store behavior for a whole pass.
///
/// `color_ops[i] == None` means the pass does not touch color attachment `i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RenderPassConfiguration {
    /// Per color attachment.
    pub color_ops: [Option<RenderPassAttachmentOps>; MAX_COLOR_ATTACHMENTS],
    /// Depth aspect of the depth/stencil attachment.
    pub depth_ops: Option<RenderPassAttachmentOps>,
    /// Stencil aspect of the depth/stencil attachment.
    pub stencil_ops: Option<RenderPassAttachmentOps>,
}

impl RenderPassConfiguration {
    /// Clear-and-store on color attachment 0 and the depth aspect.
    pub fn clear_color_depth() -> Self {
        let mut config = Self::default();
        config.color_ops[0] = Some(RenderPassAttachmentOps::CLEAR_STORE);
        config.depth_ops = Some(RenderPassAttachmentOps::CLEAR_STORE);
        config
    }

    /// True when any attachment is cleared on load, so clear-value
    /// overrides are meaningful for this pass.
    pub fn clears_anything(&self) -> bool {
        self.color_ops
            .iter()
            .flatten()
            .chain(self.depth_ops.iter())
            .chain(self.stencil_ops.iter())
            .any(|ops| ops.load == AttachmentLoadOp::Clear)
    }
}

static NEXT_DYNAMIC_PASS_ID: AtomicU64 = AtomicU64::new(StateDescriptorId::DYNAMIC_BASE.0);

enum PassPayload {
    /// Immutable, cache-owned pass.
    Cached {
        configuration: RenderPassConfiguration,
        compiled: CompiledPipelineState,
    },
    /// Mutable pass created outside the cache; reconfigured between frames.
    Dynamic {
        configuration: Mutex<RenderPassConfiguration>,
    },
}

impl std::fmt::Debug for PassPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PassPayload::Cached { configuration, .. } => f
                .debug_struct("Cached")
                .field("configuration", configuration)
                .finish_non_exhaustive(),
            PassPayload::Dynamic { .. } => f.debug_struct("Dynamic").finish_non_exhaustive(),
        }
    }
}

/// A render pass state, either cache-owned and immutable or dynamic and
/// reconfigurable in place.
#[derive(Debug)]
pub struct RenderPassDescriptor {
    id: StateDescriptorId,
    payload: PassPayload,
}

impl RenderPassDescriptor {
    /// Creates a dynamic pass that is never deduplicated or cached. Its
    /// identifier comes from a reserved range so it cannot collide with
    /// cache-assigned ones.
    pub fn new_dynamic(configuration: RenderPassConfiguration) -> Self {
        let raw = NEXT_DYNAMIC_PASS_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            id: StateDescriptorId(raw),
            payload: PassPayload::Dynamic {
                configuration: Mutex::new(configuration),
            },
        }
    }

    /// The current configuration. Cached passes return their immutable
    /// content; dynamic passes return a snapshot under their lock.
    pub fn configuration(&self) -> RenderPassConfiguration {
        match &self.payload {
            PassPayload::Cached { configuration, .. } => *configuration,
            PassPayload::Dynamic { configuration } => match configuration.lock() {
                Ok(guard) => *guard,
                Err(poisoned) => *poisoned.into_inner(),
            },
        }
    }

    /// Replaces the configuration of a dynamic pass. Returns `false` without
    /// touching anything when called on a cached pass.
    pub fn set_configuration(&self, new_configuration: RenderPassConfiguration) -> bool {
        match &self.payload {
            PassPayload::Cached { .. } => false,
            PassPayload::Dynamic { configuration } => {
                let mut guard = match configuration.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                *guard = new_configuration;
                true
            }
        }
    }

    /// The backend-opaque compiled state; dynamic passes have none.
    pub fn compiled(&self) -> Option<&CompiledPipelineState> {
        match &self.payload {
            PassPayload::Cached { compiled, .. } => Some(compiled),
            PassPayload::Dynamic { .. } => None,
        }
    }
}

impl PipelineStateDescriptor for RenderPassDescriptor {
    fn descriptor_id(&self) -> StateDescriptorId {
        self.id
    }

    fn descriptor_type(&self) -> PipelineStateDescriptorType {
        PipelineStateDescriptorType::RenderPassConfiguration
    }

    fn is_dynamic(&self) -> bool {
        matches!(self.payload, PassPayload::Dynamic { .. })
    }
}

impl CachedPipelineState for RenderPassDescriptor {
    type Config = RenderPassConfiguration;

    const DESCRIPTOR_TYPE: PipelineStateDescriptorType = PipelineStateDescriptorType::RenderPassConfiguration;

    fn compile(
        factory: &dyn PipelineStateDescriptorFactory,
        config: &Self::Config,
    ) -> Option<CompiledPipelineState> {
        factory.create_render_pass(config)
    }

    fn from_compiled(
        id: StateDescriptorId,
        config: &Self::Config,
        compiled: CompiledPipelineState,
    ) -> Self {
        Self {
            id,
            payload: PassPayload::Cached {
                configuration: *config,
                compiled,
            },
        }
    }

    fn unit_of(cache: &PipelineStateDescriptorCache) -> &PipelineStateCacheUnit<Self> {
        cache.render_pass_unit()
    }
}
