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

//! Error types for the pipeline state subsystem.
//!
//! Only *expected* failures are modeled as error values: configurations a
//! backend cannot realize, invalid creation info, and rejected dynamic state.
//! Cache invariant violations (descriptor ID aliasing) are programmer errors
//! and panic instead of returning a variant — see
//! [`cache`](crate::gci::cache).

use crate::gci::state::PipelineStateDescriptorType;
use std::fmt;

/// An error produced while creating or applying pipeline state.
#[derive(Debug)]
pub enum PipelineStateError {
    /// The backend cannot realize the supplied configuration for this
    /// descriptor category. This is an expected outcome (e.g. an unsupported
    /// format combination), not a bug.
    UnsupportedConfiguration {
        /// The category of the refused configuration.
        descriptor_type: PipelineStateDescriptorType,
        /// Backend- or cache-supplied details.
        details: String,
    },
    /// The backend cannot compile the requested monolithic pipeline state
    /// object.
    UnsupportedPipelineState {
        /// Backend-supplied details.
        details: String,
    },
    /// A `GraphicsPipelineStateObjectCreateInfo` failed validation before any
    /// descriptor was constructed.
    InvalidCreateInfo {
        /// What was wrong with the creation info.
        details: String,
    },
    /// A dynamic descriptor failed backend re-validation during
    /// `apply_state_changes`.
    DynamicStateRejected {
        /// Why the dynamic state was rejected.
        details: String,
    },
}

impl fmt::Display for PipelineStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStateError::UnsupportedConfiguration {
                descriptor_type,
                details,
            } => {
                write!(
                    f,
                    "Backend cannot realize {descriptor_type:?} configuration: {details}"
                )
            }
            PipelineStateError::UnsupportedPipelineState { details } => {
                write!(f, "Backend cannot compile pipeline state object: {details}")
            }
            PipelineStateError::InvalidCreateInfo { details } => {
                write!(f, "Invalid pipeline state creation info: {details}")
            }
            PipelineStateError::DynamicStateRejected { details } => {
                write!(f, "Dynamic pipeline state rejected on apply: {details}")
            }
        }
    }
}

impl std::error::Error for PipelineStateError {}
