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

//! The headless backend: no GPU, full observability.
//!
//! Compiled states retain a textual image of the configuration they came
//! from, factories count their invocations, and the controller records every
//! applied batch. Most of the pipeline state test surface runs against this
//! backend.

pub mod controller;
pub mod factory;

pub use controller::{AppliedStateBatch, HeadlessPipelineStateController};
pub use factory::{HeadlessCompiledState, HeadlessStateFactory};
