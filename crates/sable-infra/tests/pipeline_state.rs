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

//! End-to-end tests of the pipeline state cache and controller against the
//! headless backend.

use std::sync::{Arc, Barrier};
use std::thread;

use sable_core::gci::cache::PipelineStateDescriptorCache;
use sable_core::gci::controller::{CommonClearValues, StateUpdateMask};
use sable_core::gci::error::PipelineStateError;
use sable_core::gci::resources::{ShaderId, TextureId};
use sable_core::gci::state::blend::{AttachmentBlendSettings, BlendConfig, BlendStateDescriptor};
use sable_core::gci::state::common::{
    PipelineStateDescriptor, PipelineStateDescriptorType, PipelineStateDescriptorTypeFlags,
    StateDescriptorIdRequest,
};
use sable_core::gci::state::depth_stencil::{DepthStencilConfig, DepthStencilStateDescriptor};
use sable_core::gci::state::enums::TextureFormat;
use sable_core::gci::state::input_layout::{IaInputLayoutDefinition, IaInputLayoutDescriptor};
use sable_core::gci::state::pso::{
    GraphicsPipelineStateObjectCreateInfo, SeparableGraphicsStateSet,
};
use sable_core::gci::state::rasterizer::{RasterizerConfig, RasterizerStateDescriptor};
use sable_core::gci::state::render_pass::{RenderPassConfiguration, RenderPassDescriptor};
use sable_core::gci::state::render_target::{
    RenderTargetAttachmentBinding, RenderTargetBindingDefinition, RenderTargetBindingDescriptor,
};
use sable_core::gci::state::root_signature::{RootSignatureDesc, RootSignatureDescriptor};
use sable_core::gci::state::shader_linkage::{
    GraphicsShaderBinding, GraphicsShaderLinkageDescriptor,
};
use sable_core::gci::state::vertex_stream::{IaVertexStreamDefinition, IaVertexStreamDescriptor};
use sable_core::gci::traits::GraphicsPipelineStateController;
use sable_core::math::LinearRgba;
use sable_infra::graphics::headless::{HeadlessPipelineStateController, HeadlessStateFactory};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn cache_with_factory() -> (Arc<PipelineStateDescriptorCache>, Arc<HeadlessStateFactory>) {
    let factory = Arc::new(HeadlessStateFactory::new());
    let cache = Arc::new(PipelineStateDescriptorCache::new(factory.clone()));
    (cache, factory)
}

fn sample_create_info(
    cache: &PipelineStateDescriptorCache,
) -> GraphicsPipelineStateObjectCreateInfo {
    GraphicsPipelineStateObjectCreateInfo {
        separable: SeparableGraphicsStateSet {
            shader_linkage: cache
                .get_or_create::<GraphicsShaderLinkageDescriptor>(
                    &GraphicsShaderBinding::vertex_pixel(ShaderId(1), ShaderId(2)),
                    StateDescriptorIdRequest::Auto,
                )
                .unwrap(),
            blend: cache
                .get_or_create::<BlendStateDescriptor>(
                    &BlendConfig::single(AttachmentBlendSettings::ALPHA),
                    StateDescriptorIdRequest::Auto,
                )
                .unwrap(),
            rasterizer: cache
                .get_or_create::<RasterizerStateDescriptor>(
                    &RasterizerConfig::solid_cull_back(),
                    StateDescriptorIdRequest::Auto,
                )
                .unwrap(),
            depth_stencil: cache
                .get_or_create::<DepthStencilStateDescriptor>(
                    &DepthStencilConfig::depth_read_write(),
                    StateDescriptorIdRequest::Auto,
                )
                .unwrap(),
            input_layout: cache
                .get_or_create::<IaInputLayoutDescriptor>(
                    &IaInputLayoutDefinition::default(),
                    StateDescriptorIdRequest::Auto,
                )
                .unwrap(),
        },
        vertex_stream: cache
            .get_or_create::<IaVertexStreamDescriptor>(
                &IaVertexStreamDefinition::default(),
                StateDescriptorIdRequest::Auto,
            )
            .unwrap(),
        render_target: cache
            .get_or_create::<RenderTargetBindingDescriptor>(
                &RenderTargetBindingDefinition::single_color(
                    RenderTargetAttachmentBinding::base(
                        TextureId(1),
                        TextureFormat::Bgra8UnormSrgb,
                    ),
                ),
                StateDescriptorIdRequest::Auto,
            )
            .unwrap(),
        render_pass: cache
            .get_or_create::<RenderPassDescriptor>(
                &RenderPassConfiguration::clear_color_depth(),
                StateDescriptorIdRequest::Auto,
            )
            .unwrap(),
        root_signature: cache
            .get_or_create::<RootSignatureDescriptor>(
                &RootSignatureDesc::default(),
                StateDescriptorIdRequest::Auto,
            )
            .unwrap(),
    }
}

#[test]
fn equal_configs_from_many_threads_compile_once() {
    init_logging();
    let (cache, factory) = cache_with_factory();
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let cache = cache.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                cache
                    .get_or_create::<BlendStateDescriptor>(
                        &BlendConfig::single(AttachmentBlendSettings::ALPHA),
                        StateDescriptorIdRequest::Auto,
                    )
                    .unwrap()
            })
        })
        .collect();

    let descriptors: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    // Losers of the creation race adopt the winner's descriptor.
    for descriptor in &descriptors[1..] {
        assert!(Arc::ptr_eq(&descriptors[0], descriptor));
    }
    assert_eq!(
        factory.compile_count(PipelineStateDescriptorType::Blend),
        1
    );
    assert_eq!(cache.blend_unit().len(), 1);
}

#[test]
fn refused_category_surfaces_as_configuration_error() {
    init_logging();
    let (cache, factory) = cache_with_factory();
    factory.refuse(PipelineStateDescriptorTypeFlags::DEPTH_STENCIL);

    let err = cache
        .get_or_create::<DepthStencilStateDescriptor>(
            &DepthStencilConfig::depth_read_write(),
            StateDescriptorIdRequest::Auto,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineStateError::UnsupportedConfiguration {
            descriptor_type: PipelineStateDescriptorType::DepthStencil,
            ..
        }
    ));
    assert!(cache.depth_stencil_unit().is_empty());
}

#[test]
fn pipeline_objects_are_deduplicated_by_sub_state_identity() {
    init_logging();
    let (cache, factory) = cache_with_factory();
    let info = sample_create_info(&cache);

    let first = cache.create_graphics_pipeline_state_object(&info).unwrap();
    // Requesting the same sub-states again hits every cache on the way.
    let info_again = sample_create_info(&cache);
    let second = cache
        .create_graphics_pipeline_state_object(&info_again)
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(factory.pipeline_compile_count(), 1);
    assert_eq!(cache.pipeline_count(), 1);
}

#[test]
fn reset_never_invalidates_outstanding_state() {
    init_logging();
    let (cache, _factory) = cache_with_factory();
    let info = sample_create_info(&cache);
    let pipeline = cache.create_graphics_pipeline_state_object(&info).unwrap();

    cache.reset(PipelineStateDescriptorTypeFlags::ALL);
    assert_eq!(cache.descriptor_count(), 0);
    assert_eq!(cache.pipeline_count(), 0);

    // The pipeline and all its sub-descriptors are still fully usable.
    assert!(pipeline.properties().bound_attachments.bits() != 0);
    assert!(pipeline
        .separable_states()
        .shader_linkage
        .binding()
        .is_complete());
}

#[test]
fn controller_applies_bound_state_exactly_once() {
    init_logging();
    let (cache, factory) = cache_with_factory();
    let pipeline = cache
        .create_graphics_pipeline_state_object(&sample_create_info(&cache))
        .unwrap();
    let mut controller = HeadlessPipelineStateController::new(factory);

    assert!(controller.bind_graphics_pipeline(&pipeline));
    let applied = controller.apply_state_changes().unwrap();
    assert!(applied.contains(StateUpdateMask::PIPELINE));
    assert_eq!(controller.applied_batches().len(), 1);

    // Nothing pending: the second apply is a recorded-nothing no-op.
    assert_eq!(
        controller.apply_state_changes().unwrap(),
        StateUpdateMask::EMPTY
    );
    assert_eq!(controller.applied_batches().len(), 1);

    // Rebinding the same pipeline queues no work either.
    assert!(!controller.bind_graphics_pipeline(&pipeline));
    assert_eq!(
        controller.apply_state_changes().unwrap(),
        StateUpdateMask::EMPTY
    );
}

#[test]
fn dynamic_overrides_reach_the_applied_batch() {
    init_logging();
    let (cache, factory) = cache_with_factory();
    let pipeline = cache
        .create_graphics_pipeline_state_object(&sample_create_info(&cache))
        .unwrap();
    let mut controller = HeadlessPipelineStateController::new(factory);

    controller.bind_graphics_pipeline(&pipeline);
    assert!(controller.set_blend_constant(LinearRgba::WHITE));
    let mut clears = CommonClearValues::default();
    clears.colors[0] = LinearRgba::BLACK;
    assert!(controller.set_clear_values(clears));

    controller.apply_state_changes().unwrap();
    let batch = controller.last_applied().unwrap();
    assert_eq!(batch.blend_constant, Some(LinearRgba::WHITE));
    assert_eq!(batch.clear_values, Some(clears));
    // The sample pipeline has no stencil test, so the reference override
    // would be meaningless and is absent.
    assert_eq!(batch.stencil_reference, None);
}

#[test]
fn dynamic_render_pass_bypasses_the_cache_and_is_revalidated() {
    init_logging();
    let (cache, factory) = cache_with_factory();

    let mut info = sample_create_info(&cache);
    let passes_cached = cache.render_pass_unit().len();
    info.render_pass = Arc::new(RenderPassDescriptor::new_dynamic(
        RenderPassConfiguration::clear_color_depth(),
    ));
    assert!(info.render_pass.is_dynamic());
    // Creating the dynamic pass touched no cache unit.
    assert_eq!(cache.render_pass_unit().len(), passes_cached);

    let pipeline = cache.create_graphics_pipeline_state_object(&info).unwrap();
    assert!(pipeline.properties().dynamic_render_pass);

    let mut controller = HeadlessPipelineStateController::new(factory.clone());
    controller.bind_graphics_pipeline(&pipeline);
    controller.apply_state_changes().unwrap();

    // Reconfigure the pass in place and make the backend refuse it.
    assert!(info
        .render_pass
        .set_configuration(RenderPassConfiguration::default()));
    factory.refuse_dynamic_passes();
    controller.bind_graphics_pipeline(
        &cache
            .create_graphics_pipeline_state_object(&sample_create_info(&cache))
            .unwrap(),
    );
    controller.bind_graphics_pipeline(&pipeline);
    let err = controller.apply_state_changes().unwrap_err();
    assert!(matches!(
        err,
        PipelineStateError::DynamicStateRejected { .. }
    ));
    // Failed validation loses nothing; the work is still pending.
    assert!(!controller.pending_updates().is_empty());
}

#[test]
fn named_descriptors_resolve_across_call_sites() {
    init_logging();
    let (cache, factory) = cache_with_factory();
    let config = BlendConfig::single(AttachmentBlendSettings::ALPHA);

    let created = cache
        .get_or_create_named::<BlendStateDescriptor>(
            "ui-alpha",
            &config,
            StateDescriptorIdRequest::Auto,
        )
        .unwrap();
    assert!(cache.has_state_with_name::<BlendStateDescriptor>("ui-alpha"));

    // A later caller registering the same name and configuration adopts
    // the existing descriptor instead of compiling a second one.
    let adopted = cache
        .get_or_create_named::<BlendStateDescriptor>(
            "ui-alpha",
            &config,
            StateDescriptorIdRequest::Auto,
        )
        .unwrap();
    assert!(Arc::ptr_eq(&created, &adopted));
    assert_eq!(
        factory.compile_count(PipelineStateDescriptorType::Blend),
        1
    );

    let resolved = cache.blend_unit().get_by_name("ui-alpha").unwrap();
    assert!(Arc::ptr_eq(&created, &resolved));
}

#[test]
fn rejected_pipeline_assembly_is_an_error_not_a_panic() {
    init_logging();
    let (cache, factory) = cache_with_factory();
    let info = sample_create_info(&cache);
    factory.refuse_pipelines();

    let err = cache
        .create_graphics_pipeline_state_object(&info)
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineStateError::UnsupportedPipelineState { .. }
    ));
    assert_eq!(cache.pipeline_count(), 0);
}
