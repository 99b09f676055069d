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

//! Non-owning handles to GPU resources referenced by pipeline state.
//!
//! Shaders, textures and buffers are owned by the device layer; pipeline
//! configurations only *reference* them through these IDs.

use crate::sable_bitflags;

/// An opaque handle to a compiled shader owned by the device layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(pub usize);

/// An opaque handle to a GPU texture owned by the device layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub usize);

/// An opaque handle to a GPU buffer owned by the device layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GpuBufferId(pub usize);

/// One stage of the graphics shader pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex shader stage. The only mandatory stage.
    Vertex,
    /// Hull (tessellation control) shader stage.
    Hull,
    /// Domain (tessellation evaluation) shader stage.
    Domain,
    /// Geometry shader stage.
    Geometry,
    /// Pixel (fragment) shader stage.
    Pixel,
}

impl ShaderStage {
    /// All graphics stages in pipeline order.
    pub const ALL: [ShaderStage; 5] = [
        ShaderStage::Vertex,
        ShaderStage::Hull,
        ShaderStage::Domain,
        ShaderStage::Geometry,
        ShaderStage::Pixel,
    ];
}

sable_bitflags! {
    /// A set of graphics shader stages.
    pub struct ShaderStageFlags: u32 {
        /// Vertex shader stage.
        const VERTEX = 1 << 0;
        /// Hull shader stage.
        const HULL = 1 << 1;
        /// Domain shader stage.
        const DOMAIN = 1 << 2;
        /// Geometry shader stage.
        const GEOMETRY = 1 << 3;
        /// Pixel shader stage.
        const PIXEL = 1 << 4;
        /// Every graphics stage.
        const ALL_GRAPHICS = Self::VERTEX.bits()
            | Self::HULL.bits()
            | Self::DOMAIN.bits()
            | Self::GEOMETRY.bits()
            | Self::PIXEL.bits();
    }
}

impl ShaderStageFlags {
    /// Returns the flag for a single stage.
    pub const fn from_stage(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => Self::VERTEX,
            ShaderStage::Hull => Self::HULL,
            ShaderStage::Domain => Self::DOMAIN,
            ShaderStage::Geometry => Self::GEOMETRY,
            ShaderStage::Pixel => Self::PIXEL,
        }
    }

    /// Returns `true` if the set contains `stage`.
    pub const fn has_stage(&self, stage: ShaderStage) -> bool {
        self.contains(Self::from_stage(stage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_flags_round_trip() {
        for stage in ShaderStage::ALL {
            assert!(ShaderStageFlags::from_stage(stage).has_stage(stage));
        }
        let vp = ShaderStageFlags::VERTEX | ShaderStageFlags::PIXEL;
        assert!(vp.has_stage(ShaderStage::Vertex));
        assert!(!vp.has_stage(ShaderStage::Geometry));
        assert!(ShaderStageFlags::ALL_GRAPHICS.contains(vp));
    }
}
