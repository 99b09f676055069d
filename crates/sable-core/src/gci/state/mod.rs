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

//! Pipeline state descriptor taxonomy.
//!
//! One module per descriptor category. Each defines a plain, hashable
//! configuration value type (the client-facing input) and the corresponding
//! immutable descriptor (identity + precomputed common properties +
//! backend-opaque compiled state) produced by the cache.

pub mod blend;
pub mod common;
pub mod depth_stencil;
pub mod enums;
pub mod input_layout;
pub mod pso;
pub mod rasterizer;
pub mod render_pass;
pub mod render_target;
pub mod root_signature;
pub mod shader_linkage;
pub mod vertex_stream;

pub use blend::{AttachmentBlendSettings, BlendConfig, BlendFlags, BlendStateDescriptor, BlendWriteMask};
pub use common::{
    config_hash, CompiledPipelineState, PipelineStateDescriptor, PipelineStateDescriptorType,
    PipelineStateDescriptorTypeFlags, RenderTargetAttachmentFlags, StateConfigHash,
    StateDescriptorId, StateDescriptorIdRequest, MAX_COLOR_ATTACHMENTS, MAX_VERTEX_ATTRIBUTES,
    MAX_VERTEX_BUFFER_BINDINGS,
};
pub use depth_stencil::{
    DepthStencilConfig, DepthStencilFlags, DepthStencilStateDescriptor, DepthTestSettings,
    StencilFaceOps, StencilTestSettings,
};
pub use enums::*;
pub use input_layout::{IaInputLayoutDefinition, IaInputLayoutDescriptor, VertexAttributeDesc};
pub use pso::{
    GraphicsPipelineStateObject, GraphicsPipelineStateObjectCreateInfo,
    GraphicsPipelineStateObjectHandle, GraphicsPipelineStateObjectProperties,
    GraphicsPipelineStateObjectStorage, PipelineStateObjectId, SeparableGraphicsStateSet,
};
pub use rasterizer::{DepthBiasSettings, RasterizerConfig, RasterizerStateDescriptor};
pub use render_pass::{RenderPassAttachmentOps, RenderPassConfiguration, RenderPassDescriptor};
pub use render_target::{
    RenderTargetAttachmentBinding, RenderTargetBindingDefinition, RenderTargetBindingDescriptor,
};
pub use root_signature::{
    RootParameter, RootParameterKind, RootSignatureDesc, RootSignatureDescriptor,
};
pub use shader_linkage::{GraphicsShaderBinding, GraphicsShaderLinkageDescriptor};
pub use vertex_stream::{
    IaVertexStreamDefinition, IaVertexStreamDescriptor, IndexBufferBinding, VertexBufferBinding,
};
