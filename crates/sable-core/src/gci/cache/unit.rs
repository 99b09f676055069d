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

//! The generic, per-category cache unit.

use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

use rustc_hash::FxHashMap;

use crate::gci::cache::aggregate::PipelineStateDescriptorCache;
use crate::gci::error::PipelineStateError;
use crate::gci::state::common::{
    config_hash, CompiledPipelineState, PipelineStateDescriptor, PipelineStateDescriptorType,
    StateConfigHash, StateDescriptorId, StateDescriptorIdRequest,
};
use crate::gci::traits::PipelineStateDescriptorFactory;

/// A descriptor type that can live in a [`PipelineStateCacheUnit`].
///
/// Ties together the category tag, the configuration value type, the factory
/// method that compiles it, and the unit that stores it inside the aggregate
/// cache.
pub trait CachedPipelineState: PipelineStateDescriptor + Send + Sync + Sized + 'static {
    /// The plain configuration value this descriptor is built from.
    type Config: Clone + fmt::Debug + Hash + Eq + Send + Sync;

    /// The category every instance of this descriptor belongs to.
    const DESCRIPTOR_TYPE: PipelineStateDescriptorType;

    /// Invokes the factory method matching this category.
    fn compile(
        factory: &dyn PipelineStateDescriptorFactory,
        config: &Self::Config,
    ) -> Option<CompiledPipelineState>;

    /// Builds the immutable descriptor around a freshly compiled state.
    fn from_compiled(
        id: StateDescriptorId,
        config: &Self::Config,
        compiled: CompiledPipelineState,
    ) -> Self;

    /// Selects this category's unit inside the aggregate cache.
    fn unit_of(cache: &PipelineStateDescriptorCache) -> &PipelineStateCacheUnit<Self>;
}

struct UnitEntry<S: CachedPipelineState> {
    config: S::Config,
    descriptor: Arc<S>,
}

struct UnitIndex<S: CachedPipelineState> {
    by_id: FxHashMap<StateDescriptorId, UnitEntry<S>>,
    // The hash is a lookup accelerator only; entries sharing a hash are
    // disambiguated by comparing configurations.
    by_hash: FxHashMap<StateConfigHash, Vec<StateDescriptorId>>,
    by_name: FxHashMap<String, StateDescriptorId>,
    next_auto: u64,
}

impl<S: CachedPipelineState> Default for UnitIndex<S> {
    fn default() -> Self {
        Self {
            by_id: FxHashMap::default(),
            by_hash: FxHashMap::default(),
            by_name: FxHashMap::default(),
            next_auto: StateDescriptorId::AUTO_BASE.0,
        }
    }
}

/// Content-addressed cache for one descriptor category.
///
/// A single lock covers lookup, compilation and insertion, so concurrent
/// ID-less requests for the same configuration coalesce on one descriptor:
/// the losers of the race adopt the winner's handle instead of compiling
/// twice. Explicit IDs stay individual entries regardless of content.
pub struct PipelineStateCacheUnit<S: CachedPipelineState> {
    index: Mutex<UnitIndex<S>>,
}

impl<S: CachedPipelineState> Default for PipelineStateCacheUnit<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: CachedPipelineState> PipelineStateCacheUnit<S> {
    /// Creates an empty unit.
    pub fn new() -> Self {
        Self {
            index: Mutex::new(UnitIndex::default()),
        }
    }

    /// The category this unit stores.
    pub fn descriptor_type(&self) -> PipelineStateDescriptorType {
        S::DESCRIPTOR_TYPE
    }

    fn lock(&self) -> MutexGuard<'_, UnitIndex<S>> {
        match self.index.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Returns the descriptor for `config`, compiling it on first sight.
    ///
    /// Auto-ID requests are content-addressed: identical configurations
    /// coalesce on the descriptor created first. Explicit IDs are honored
    /// individually; the hash index only accelerates ID-less retrieval, so
    /// two explicit IDs carrying identical content stay two descriptors.
    /// Re-requesting a registered explicit ID returns its descriptor when
    /// the content matches and panics on an aliasing mismatch.
    pub fn get_or_create(
        &self,
        factory: &dyn PipelineStateDescriptorFactory,
        config: &S::Config,
        id_request: StateDescriptorIdRequest,
    ) -> Result<Arc<S>, PipelineStateError> {
        let mut index = self.lock();
        let hash = config_hash(config);

        let id = match id_request {
            StateDescriptorIdRequest::Auto => {
                if let Some(existing) = Self::find(&index, hash, config) {
                    log::trace!(
                        "{:?} cache hit for config hash {:#018x}",
                        S::DESCRIPTOR_TYPE,
                        hash.0
                    );
                    return Ok(existing);
                }
                let id = StateDescriptorId(index.next_auto);
                index.next_auto += 1;
                id
            }
            StateDescriptorIdRequest::Explicit(id) => {
                assert!(
                    id < StateDescriptorId::DYNAMIC_BASE,
                    "explicit descriptor ids must stay below the reserved ranges"
                );
                if let Some(entry) = index.by_id.get(&id) {
                    if entry.config == *config {
                        log::trace!("{:?} cache hit for id {:?}", S::DESCRIPTOR_TYPE, id);
                        return Ok(Arc::clone(&entry.descriptor));
                    }
                    panic!(
                        "{:?} descriptor id {id:?} reused with different content: \
                         already holds {:?}, now requested for {config:?}",
                        S::DESCRIPTOR_TYPE,
                        entry.config,
                    );
                }
                id
            }
        };
        let compiled = S::compile(factory, config).ok_or_else(|| {
            log::warn!(
                "backend refused {:?} configuration {:?}",
                S::DESCRIPTOR_TYPE,
                config
            );
            PipelineStateError::UnsupportedConfiguration {
                descriptor_type: S::DESCRIPTOR_TYPE,
                details: format!("backend refused configuration {config:?}"),
            }
        })?;

        let descriptor = Arc::new(S::from_compiled(id, config, compiled));
        index.by_id.insert(
            id,
            UnitEntry {
                config: config.clone(),
                descriptor: Arc::clone(&descriptor),
            },
        );
        index.by_hash.entry(hash).or_default().push(id);
        log::debug!("{:?} descriptor created with id {:?}", S::DESCRIPTOR_TYPE, id);
        Ok(descriptor)
    }

    /// Like [`get_or_create`](Self::get_or_create), additionally registering
    /// the descriptor under `name` for later lookup.
    ///
    /// A name that is already registered must resolve to the same content;
    /// re-registering it with a different configuration is an aliasing bug
    /// and panics.
    pub fn get_or_create_named(
        &self,
        factory: &dyn PipelineStateDescriptorFactory,
        name: &str,
        config: &S::Config,
        id_request: StateDescriptorIdRequest,
    ) -> Result<Arc<S>, PipelineStateError> {
        {
            let index = self.lock();
            if let Some(&id) = index.by_name.get(name) {
                let entry = index
                    .by_id
                    .get(&id)
                    .unwrap_or_else(|| panic!("named descriptor {name:?} lost its entry"));
                assert!(
                    entry.config == *config,
                    "{:?} descriptor name {name:?} re-registered with different content",
                    S::DESCRIPTOR_TYPE,
                );
                return Ok(Arc::clone(&entry.descriptor));
            }
        }

        let descriptor = self.get_or_create(factory, config, id_request)?;
        let mut index = self.lock();
        match index.by_name.get(name) {
            // Another thread registered the name between our two critical
            // sections; the invariant still has to hold.
            Some(&id) => {
                assert!(
                    id == descriptor.descriptor_id(),
                    "{:?} descriptor name {name:?} raced to a different descriptor",
                    S::DESCRIPTOR_TYPE,
                );
            }
            None => {
                index
                    .by_name
                    .insert(name.to_owned(), descriptor.descriptor_id());
            }
        }
        Ok(descriptor)
    }

    /// Looks up a descriptor by its identity.
    pub fn get_by_id(&self, id: StateDescriptorId) -> Option<Arc<S>> {
        self.lock()
            .by_id
            .get(&id)
            .map(|entry| Arc::clone(&entry.descriptor))
    }

    /// Looks up a descriptor by its registered name.
    pub fn get_by_name(&self, name: &str) -> Option<Arc<S>> {
        let index = self.lock();
        let id = *index.by_name.get(name)?;
        index
            .by_id
            .get(&id)
            .map(|entry| Arc::clone(&entry.descriptor))
    }

    /// Looks up the descriptor already compiled for `config`, without
    /// creating one. Content-addressed: the hash narrows the candidates and
    /// configuration equality decides.
    pub fn get_for_config(&self, config: &S::Config) -> Option<Arc<S>> {
        let index = self.lock();
        Self::find(&index, config_hash(config), config)
    }

    /// True when `name` is registered.
    pub fn contains_name(&self, name: &str) -> bool {
        self.lock().by_name.contains_key(name)
    }

    /// Number of cached descriptors.
    pub fn len(&self) -> usize {
        self.lock().by_id.len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached descriptor and name registration.
    ///
    /// Descriptors are shared by `Arc`, so handles already given out remain
    /// fully usable; only the cache's own references go away. The auto-ID
    /// counter keeps running so IDs from before the reset are never
    /// reissued.
    pub fn reset(&self) {
        let mut index = self.lock();
        let dropped = index.by_id.len();
        index.by_id.clear();
        index.by_hash.clear();
        index.by_name.clear();
        if dropped > 0 {
            log::debug!("{:?} cache unit reset, {dropped} descriptors dropped", S::DESCRIPTOR_TYPE);
        }
    }

    fn find(index: &UnitIndex<S>, hash: StateConfigHash, config: &S::Config) -> Option<Arc<S>> {
        let candidates = index.by_hash.get(&hash)?;
        candidates.iter().find_map(|id| {
            let entry = index.by_id.get(id)?;
            (entry.config == *config).then(|| Arc::clone(&entry.descriptor))
        })
    }

}

impl<S: CachedPipelineState> fmt::Debug for PipelineStateCacheUnit<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineStateCacheUnit")
            .field("descriptor_type", &S::DESCRIPTOR_TYPE)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gci::state::blend::{AttachmentBlendSettings, BlendConfig, BlendStateDescriptor};
    use crate::gci::state::depth_stencil::DepthStencilConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Accepts everything except blend configurations using
    /// alpha-to-coverage, and counts factory invocations.
    struct CountingFactory {
        calls: AtomicUsize,
    }

    impl CountingFactory {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl PipelineStateDescriptorFactory for CountingFactory {
        fn create_blend_state(&self, config: &BlendConfig) -> Option<CompiledPipelineState> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if config
                .flags
                .contains(crate::gci::state::blend::BlendFlags::ALPHA_TO_COVERAGE)
            {
                return None;
            }
            Some(CompiledPipelineState::new(()))
        }

        fn create_depth_stencil_state(
            &self,
            _config: &DepthStencilConfig,
        ) -> Option<CompiledPipelineState> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Some(CompiledPipelineState::new(()))
        }

        fn create_rasterizer_state(
            &self,
            _config: &crate::gci::state::rasterizer::RasterizerConfig,
        ) -> Option<CompiledPipelineState> {
            Some(CompiledPipelineState::new(()))
        }

        fn create_shader_linkage(
            &self,
            _binding: &crate::gci::state::shader_linkage::GraphicsShaderBinding,
        ) -> Option<CompiledPipelineState> {
            Some(CompiledPipelineState::new(()))
        }

        fn create_input_layout(
            &self,
            _definition: &crate::gci::state::input_layout::IaInputLayoutDefinition,
        ) -> Option<CompiledPipelineState> {
            Some(CompiledPipelineState::new(()))
        }

        fn create_vertex_stream(
            &self,
            _definition: &crate::gci::state::vertex_stream::IaVertexStreamDefinition,
        ) -> Option<CompiledPipelineState> {
            Some(CompiledPipelineState::new(()))
        }

        fn create_render_target_binding(
            &self,
            _definition: &crate::gci::state::render_target::RenderTargetBindingDefinition,
        ) -> Option<CompiledPipelineState> {
            Some(CompiledPipelineState::new(()))
        }

        fn create_render_pass(
            &self,
            _configuration: &crate::gci::state::render_pass::RenderPassConfiguration,
        ) -> Option<CompiledPipelineState> {
            Some(CompiledPipelineState::new(()))
        }

        fn create_root_signature(
            &self,
            _desc: &crate::gci::state::root_signature::RootSignatureDesc,
        ) -> Option<CompiledPipelineState> {
            Some(CompiledPipelineState::new(()))
        }

        fn create_graphics_pipeline_state(
            &self,
            _info: &crate::gci::state::pso::GraphicsPipelineStateObjectCreateInfo,
        ) -> Option<CompiledPipelineState> {
            Some(CompiledPipelineState::new(()))
        }
    }

    #[test]
    fn identical_configs_compile_once() {
        let unit = PipelineStateCacheUnit::<BlendStateDescriptor>::new();
        let factory = CountingFactory::new();
        let config = BlendConfig::single(AttachmentBlendSettings::ALPHA);

        let a = unit
            .get_or_create(&factory, &config, StateDescriptorIdRequest::Auto)
            .unwrap();
        let b = unit
            .get_or_create(&factory, &config, StateDescriptorIdRequest::Auto)
            .unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(factory.calls(), 1);
        assert_eq!(unit.len(), 1);
    }

    #[test]
    fn re_requesting_a_registered_id_returns_its_descriptor() {
        let unit = PipelineStateCacheUnit::<BlendStateDescriptor>::new();
        let factory = CountingFactory::new();
        let config = BlendConfig::disabled();

        let first = unit
            .get_or_create(
                &factory,
                &config,
                StateDescriptorIdRequest::Explicit(StateDescriptorId(7)),
            )
            .unwrap();
        let again = unit
            .get_or_create(
                &factory,
                &config,
                StateDescriptorIdRequest::Explicit(StateDescriptorId(7)),
            )
            .unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(factory.calls(), 1);
    }

    #[test]
    fn distinct_explicit_ids_with_identical_content_stay_distinct() {
        let unit = PipelineStateCacheUnit::<BlendStateDescriptor>::new();
        let factory = CountingFactory::new();
        let config = BlendConfig::disabled();

        let first = unit
            .get_or_create(
                &factory,
                &config,
                StateDescriptorIdRequest::Explicit(StateDescriptorId(7)),
            )
            .unwrap();
        // The hash index accelerates ID-less retrieval only; a second
        // explicit ID is a second descriptor even for identical content.
        let second = unit
            .get_or_create(
                &factory,
                &config,
                StateDescriptorIdRequest::Explicit(StateDescriptorId(8)),
            )
            .unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.descriptor_id(), StateDescriptorId(7));
        assert_eq!(second.descriptor_id(), StateDescriptorId(8));
        assert_eq!(
            unit.get_by_id(StateDescriptorId(8)).unwrap().descriptor_id(),
            StateDescriptorId(8)
        );
        assert_eq!(factory.calls(), 2);
        assert_eq!(unit.len(), 2);
    }

    #[test]
    #[should_panic(expected = "reused with different content")]
    fn id_reuse_with_different_content_panics() {
        let unit = PipelineStateCacheUnit::<BlendStateDescriptor>::new();
        let factory = CountingFactory::new();
        unit.get_or_create(
            &factory,
            &BlendConfig::disabled(),
            StateDescriptorIdRequest::Explicit(StateDescriptorId(1)),
        )
        .unwrap();
        let _ = unit.get_or_create(
            &factory,
            &BlendConfig::single(AttachmentBlendSettings::ALPHA),
            StateDescriptorIdRequest::Explicit(StateDescriptorId(1)),
        );
    }

    #[test]
    fn auto_ids_come_from_the_reserved_range() {
        let unit = PipelineStateCacheUnit::<BlendStateDescriptor>::new();
        let factory = CountingFactory::new();
        let a = unit
            .get_or_create(
                &factory,
                &BlendConfig::disabled(),
                StateDescriptorIdRequest::Auto,
            )
            .unwrap();
        let b = unit
            .get_or_create(
                &factory,
                &BlendConfig::single(AttachmentBlendSettings::ALPHA),
                StateDescriptorIdRequest::Auto,
            )
            .unwrap();
        assert!(a.descriptor_id() >= StateDescriptorId::AUTO_BASE);
        assert_eq!(b.descriptor_id().0, a.descriptor_id().0 + 1);
    }

    #[test]
    fn refused_config_is_an_error_and_not_cached() {
        let unit = PipelineStateCacheUnit::<BlendStateDescriptor>::new();
        let factory = CountingFactory::new();
        let mut config = BlendConfig::disabled();
        config.flags = crate::gci::state::blend::BlendFlags::ALPHA_TO_COVERAGE;

        let err = unit
            .get_or_create(&factory, &config, StateDescriptorIdRequest::Auto)
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineStateError::UnsupportedConfiguration {
                descriptor_type: PipelineStateDescriptorType::Blend,
                ..
            }
        ));
        assert!(unit.is_empty());
        // Asking again retries the factory instead of caching the failure.
        let _ = unit.get_or_create(&factory, &config, StateDescriptorIdRequest::Auto);
        assert_eq!(factory.calls(), 2);
    }

    #[test]
    fn content_lookup_without_creation() {
        let unit = PipelineStateCacheUnit::<BlendStateDescriptor>::new();
        let factory = CountingFactory::new();
        let config = BlendConfig::single(AttachmentBlendSettings::ALPHA);

        assert!(unit.get_for_config(&config).is_none());
        let created = unit
            .get_or_create(&factory, &config, StateDescriptorIdRequest::Auto)
            .unwrap();
        let found = unit.get_for_config(&config).unwrap();
        assert!(Arc::ptr_eq(&created, &found));
        assert!(unit.get_for_config(&BlendConfig::disabled()).is_none());
        assert_eq!(factory.calls(), 1);
    }

    #[test]
    fn named_lookup_returns_the_registered_descriptor() {
        let unit = PipelineStateCacheUnit::<BlendStateDescriptor>::new();
        let factory = CountingFactory::new();
        let config = BlendConfig::single(AttachmentBlendSettings::ALPHA);

        let created = unit
            .get_or_create_named(&factory, "alpha", &config, StateDescriptorIdRequest::Auto)
            .unwrap();
        let looked_up = unit.get_by_name("alpha").unwrap();
        assert!(Arc::ptr_eq(&created, &looked_up));
    }

    #[test]
    fn repeated_named_registration_adopts_the_first_descriptor() {
        let unit = PipelineStateCacheUnit::<BlendStateDescriptor>::new();
        let factory = CountingFactory::new();
        let config = BlendConfig::single(AttachmentBlendSettings::ALPHA);

        let created = unit
            .get_or_create_named(&factory, "alpha", &config, StateDescriptorIdRequest::Auto)
            .unwrap();
        assert!(unit.contains_name("alpha"));

        let adopted = unit
            .get_or_create_named(&factory, "alpha", &config, StateDescriptorIdRequest::Auto)
            .unwrap();
        assert!(Arc::ptr_eq(&created, &adopted));
        assert_eq!(factory.calls(), 1);
    }

    #[test]
    #[should_panic(expected = "re-registered with different content")]
    fn name_aliasing_panics() {
        let unit = PipelineStateCacheUnit::<BlendStateDescriptor>::new();
        let factory = CountingFactory::new();
        unit.get_or_create_named(
            &factory,
            "opaque",
            &BlendConfig::disabled(),
            StateDescriptorIdRequest::Auto,
        )
        .unwrap();
        let _ = unit.get_or_create_named(
            &factory,
            "opaque",
            &BlendConfig::single(AttachmentBlendSettings::ALPHA),
            StateDescriptorIdRequest::Auto,
        );
    }

    #[test]
    fn reset_keeps_outstanding_descriptors_alive() {
        let unit = PipelineStateCacheUnit::<BlendStateDescriptor>::new();
        let factory = CountingFactory::new();
        let config = BlendConfig::single(AttachmentBlendSettings::ALPHA);

        let held = unit
            .get_or_create(&factory, &config, StateDescriptorIdRequest::Auto)
            .unwrap();
        let old_id = held.descriptor_id();
        unit.reset();
        assert!(unit.is_empty());
        assert!(unit.get_by_id(old_id).is_none());
        // The held handle is untouched and a recreation gets a fresh ID.
        assert_eq!(held.descriptor_id(), old_id);
        let recreated = unit
            .get_or_create(&factory, &config, StateDescriptorIdRequest::Auto)
            .unwrap();
        assert!(recreated.descriptor_id() > old_id);
    }
}
