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

//! Closed GPU state enums shared by the configuration value types.

/// A factor in a blend equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    /// The factor is `0.0`.
    Zero,
    /// The factor is `1.0`.
    One,
    /// The source color.
    SrcColor,
    /// `1.0 - source color`.
    OneMinusSrcColor,
    /// The source alpha component.
    SrcAlpha,
    /// `1.0 - source alpha`.
    OneMinusSrcAlpha,
    /// The destination color already in the framebuffer.
    DstColor,
    /// `1.0 - destination color`.
    OneMinusDstColor,
    /// The destination alpha component.
    DstAlpha,
    /// `1.0 - destination alpha`.
    OneMinusDstAlpha,
    /// The constant blend color (a dynamic pipeline override).
    ConstantColor,
    /// `1.0 - constant blend color`.
    OneMinusConstantColor,
}

/// The operation combining source and destination blend terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOperation {
    /// `source + destination`.
    Add,
    /// `source - destination`.
    Subtract,
    /// `destination - source`.
    ReverseSubtract,
    /// `min(source, destination)`.
    Min,
    /// `max(source, destination)`.
    Max,
}

/// The comparison function used for depth and stencil tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompareFunction {
    /// The test never passes.
    Never,
    /// Passes if the new value is less than the existing value.
    Less,
    /// Passes if the values are equal.
    Equal,
    /// Passes if the new value is less than or equal to the existing value.
    LessEqual,
    /// Passes if the new value is greater than the existing value.
    Greater,
    /// Passes if the values differ.
    NotEqual,
    /// Passes if the new value is greater than or equal to the existing value.
    GreaterEqual,
    /// The test always passes.
    #[default]
    Always,
}

/// An operation applied to a stencil buffer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StencilOperation {
    /// Keep the existing value.
    #[default]
    Keep,
    /// Set the value to zero.
    Zero,
    /// Replace the value with the stencil reference.
    Replace,
    /// Bitwise invert the value.
    Invert,
    /// Increment, clamping at the maximum value.
    IncrementClamp,
    /// Decrement, clamping at zero.
    DecrementClamp,
    /// Increment, wrapping to zero on overflow.
    IncrementWrap,
    /// Decrement, wrapping to the maximum value on underflow.
    DecrementWrap,
}

/// Which face of a triangle to cull.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    /// No culling.
    #[default]
    None,
    /// Cull front-facing triangles.
    Front,
    /// Cull back-facing triangles.
    Back,
}

/// Which winding order makes a triangle front-facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrontFace {
    /// Counter-clockwise winding is the front face.
    #[default]
    Ccw,
    /// Clockwise winding is the front face.
    Cw,
}

/// How polygons are rasterized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PolygonMode {
    /// Filled polygons.
    #[default]
    Fill,
    /// Wireframe outlines.
    Line,
    /// Vertices rendered as points.
    Point,
}

/// How vertices form geometric primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// Isolated points.
    PointList,
    /// Isolated lines.
    LineList,
    /// A connected line strip.
    LineStrip,
    /// Isolated triangles.
    #[default]
    TriangleList,
    /// A connected triangle strip.
    TriangleStrip,
}

/// Index buffer element format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    /// 16-bit unsigned indices.
    Uint16,
    /// 32-bit unsigned indices.
    Uint32,
}

/// Texture formats relevant to render-target and depth/stencil attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit RGBA, unsigned normalized.
    Rgba8Unorm,
    /// 8-bit RGBA, unsigned normalized, sRGB encoded.
    Rgba8UnormSrgb,
    /// 8-bit BGRA, unsigned normalized.
    Bgra8Unorm,
    /// 8-bit BGRA, unsigned normalized, sRGB encoded.
    Bgra8UnormSrgb,
    /// 16-bit float RGBA.
    Rgba16Float,
    /// 32-bit float RGBA.
    Rgba32Float,
    /// 16-bit float RG.
    Rg16Float,
    /// Single-channel 32-bit float.
    R32Float,
    /// 16-bit unsigned normalized depth.
    Depth16Unorm,
    /// 24-bit depth with 8-bit stencil.
    Depth24PlusStencil8,
    /// 32-bit float depth.
    Depth32Float,
}

impl TextureFormat {
    /// Returns `true` for depth and depth/stencil formats.
    pub const fn is_depth_format(&self) -> bool {
        matches!(
            self,
            TextureFormat::Depth16Unorm
                | TextureFormat::Depth24PlusStencil8
                | TextureFormat::Depth32Float
        )
    }

    /// Returns `true` for formats carrying a stencil aspect.
    pub const fn has_stencil_aspect(&self) -> bool {
        matches!(self, TextureFormat::Depth24PlusStencil8)
    }
}

/// The memory format of one vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    /// Four 8-bit unsigned integers.
    Uint8x4,
    /// Four 8-bit unsigned normalized values.
    Unorm8x4,
    /// Two 16-bit signed integers.
    Sint16x2,
    /// Two 16-bit floats.
    Float16x2,
    /// Four 16-bit floats.
    Float16x4,
    /// One 32-bit float.
    Float32,
    /// Two 32-bit floats.
    Float32x2,
    /// Three 32-bit floats.
    Float32x3,
    /// Four 32-bit floats.
    Float32x4,
    /// One 32-bit unsigned integer.
    Uint32,
    /// Two 32-bit unsigned integers.
    Uint32x2,
    /// Four 32-bit unsigned integers.
    Uint32x4,
}

/// How often the GPU advances through a vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VertexStepMode {
    /// Advance per vertex.
    #[default]
    Vertex,
    /// Advance per rendered instance.
    Instance,
}

/// What happens to an attachment's contents when a render pass begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AttachmentLoadOp {
    /// Preserve the existing contents.
    #[default]
    Load,
    /// Clear to the pass clear value.
    Clear,
    /// Contents are undefined; the pass will overwrite them.
    DontCare,
}

/// What happens to an attachment's contents when a render pass ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AttachmentStoreOp {
    /// Write results back to the attachment.
    #[default]
    Store,
    /// Results may be discarded (e.g. transient MSAA targets).
    DontCare,
}
