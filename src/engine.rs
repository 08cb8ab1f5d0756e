//! The shadow engine: owner registry, coalesced scheduling, cache-aware
//! dispatch, and generation-checked handoff.

use crate::cache::{ShadowCache, ShadowCacheOpts, ShadowCacheStats};
use crate::foundation::core::{ContentKey, OwnerId, Size};
use crate::foundation::error::{DiffuseError, DiffuseResult};
use crate::host::{PresentationSink, ShadowSurface, SnapshotSource};
use crate::pipeline::build::{BuildParams, compose_shadow, placement_for};
use crate::recipe::ShadowRecipe;
use crate::schedule::coalescer::RefreshQueue;
use crate::schedule::workers::{BuildOutcome, WorkerPool};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

/// Engine configuration.
#[derive(Debug, Clone, Copy)]
pub struct ShadowEngineOpts {
    /// Override the number of build worker threads. `None` uses rayon
    /// defaults.
    pub workers: Option<usize>,
    /// Result cache sizing.
    pub cache: ShadowCacheOpts,
    /// Snapshot resolution relative to the owner's device scale, in `(0, 1]`.
    /// The default `0.5` captures at half resolution; shadows are blurred
    /// anyway, so the halved pixel count is invisible and much cheaper.
    pub capture_ratio: f32,
}

impl Default for ShadowEngineOpts {
    fn default() -> Self {
        Self {
            workers: None,
            cache: ShadowCacheOpts::default(),
            capture_ratio: 0.5,
        }
    }
}

/// Per-owner shadow configuration, supplied at registration and mutable
/// through the engine's setters.
///
/// `source` and `sink` are held weakly: the engine never keeps host-side
/// objects alive, and an owner whose host has gone away simply stops
/// producing or displaying shadows.
#[derive(Clone)]
pub struct OwnerConfig {
    /// Owner bounds in logical points.
    pub bounds: Size,
    /// Device pixels per logical point for this owner.
    pub device_scale: f32,
    /// Corner radius of the owner's content in logical points; `<= 0`
    /// disables the clip step.
    pub corner_radius: f64,
    /// Shadow appearance.
    pub recipe: ShadowRecipe,
    /// Cache identity; `None` disables caching for this owner.
    pub identity: Option<ContentKey>,
    /// Snapshot provider, upgraded by workers at build start.
    pub source: Weak<dyn SnapshotSource>,
    /// Display target, upgraded on the tick thread at handoff.
    pub sink: Weak<dyn PresentationSink>,
}

struct OwnerState {
    config: OwnerConfig,
    /// Bumped by every mutation and refresh; a completion whose dispatch
    /// generation no longer matches is stale and must not be displayed.
    generation: u64,
    /// One build at a time per owner; set at dispatch, cleared at
    /// completion.
    in_flight: bool,
}

/// Cumulative engine counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EngineStats {
    /// Refresh requests received.
    pub requests: u64,
    /// Requests merged into an already-pending entry.
    pub merged: u64,
    /// Builds dispatched to workers.
    pub builds: u64,
    /// Refreshes satisfied straight from the cache.
    pub cache_hits: u64,
    /// Completions discarded for a stale generation or removed owner.
    pub stale_discards: u64,
    /// Handoffs dropped because the sink was gone.
    pub dead_sink_drops: u64,
}

/// What one [`ShadowEngine::tick`] did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickStats {
    /// Finished builds applied (displayed or discarded).
    pub completions: usize,
    /// Builds dispatched to workers.
    pub dispatched: usize,
    /// Pending owners served from the cache.
    pub cache_hits: usize,
    /// Pending owners left for a later tick because a build was in flight.
    pub deferred: usize,
}

/// Coalescing shadow scheduler.
///
/// Hosts register owners, mutate their config, and call
/// [`request_refresh`](Self::request_refresh) as often as they like; requests
/// for the same owner merge until the next [`tick`](Self::tick). The host
/// calls `tick` from its interactive thread once per idle cycle (frame, event
/// loop turn, test step); `tick` hands finished shadows to sinks on the
/// calling thread and dispatches newly pending builds to the worker pool.
///
/// Per owner the engine enforces one in-flight build at a time and discards
/// completions from a superseded generation, so the displayed shadow always
/// corresponds to the latest requested state.
pub struct ShadowEngine {
    opts: ShadowEngineOpts,
    cache: Arc<ShadowCache>,
    pool: WorkerPool,
    queue: RefreshQueue,
    owners: HashMap<OwnerId, OwnerState>,
    next_owner: u64,
    stats: EngineStats,
}

impl ShadowEngine {
    /// Build an engine. Fails on a zero worker override or a capture ratio
    /// outside `(0, 1]`.
    pub fn new(opts: ShadowEngineOpts) -> DiffuseResult<Self> {
        if !opts.capture_ratio.is_finite() || opts.capture_ratio <= 0.0 || opts.capture_ratio > 1.0
        {
            return Err(DiffuseError::validation(
                "capture_ratio must be in (0, 1]",
            ));
        }
        Ok(Self {
            cache: Arc::new(ShadowCache::new(opts.cache)),
            pool: WorkerPool::new(opts.workers)?,
            queue: RefreshQueue::new(),
            owners: HashMap::new(),
            next_owner: 1,
            stats: EngineStats::default(),
            opts,
        })
    }

    /// Register a shadow owner. Zero-area bounds are accepted; they degrade
    /// to "no shadow" at build time rather than failing here.
    pub fn register(&mut self, config: OwnerConfig) -> DiffuseResult<OwnerId> {
        validate_scale(config.device_scale)?;
        let id = OwnerId::from_raw(self.next_owner);
        self.next_owner += 1;
        self.owners.insert(
            id,
            OwnerState {
                config,
                generation: 0,
                in_flight: false,
            },
        );
        Ok(id)
    }

    /// Remove an owner. An in-flight build for it finishes on its worker and
    /// is discarded at completion.
    pub fn remove(&mut self, owner: OwnerId) -> DiffuseResult<()> {
        self.owners
            .remove(&owner)
            .map(|_| ())
            .ok_or_else(|| DiffuseError::validation("unknown shadow owner"))
    }

    /// Replace an owner's recipe.
    pub fn set_recipe(&mut self, owner: OwnerId, recipe: ShadowRecipe) -> DiffuseResult<()> {
        self.mutate(owner, |c| c.recipe = recipe)
    }

    /// Replace an owner's cache identity. `None` disables caching.
    pub fn set_identity(
        &mut self,
        owner: OwnerId,
        identity: Option<ContentKey>,
    ) -> DiffuseResult<()> {
        self.mutate(owner, |c| c.identity = identity)
    }

    /// Replace an owner's logical bounds.
    pub fn set_bounds(&mut self, owner: OwnerId, bounds: Size) -> DiffuseResult<()> {
        self.mutate(owner, |c| c.bounds = bounds)
    }

    /// Replace an owner's content corner radius.
    pub fn set_corner_radius(&mut self, owner: OwnerId, radius: f64) -> DiffuseResult<()> {
        self.mutate(owner, |c| c.corner_radius = radius)
    }

    /// Replace an owner's device scale.
    pub fn set_device_scale(&mut self, owner: OwnerId, scale: f32) -> DiffuseResult<()> {
        validate_scale(scale)?;
        self.mutate(owner, |c| c.device_scale = scale)
    }

    /// Ask for the owner's shadow to be rebuilt on the next tick. Requests
    /// arriving while one is already pending merge into it.
    pub fn request_refresh(&mut self, owner: OwnerId) -> DiffuseResult<()> {
        let state = self
            .owners
            .get_mut(&owner)
            .ok_or_else(|| DiffuseError::validation("unknown shadow owner"))?;
        state.generation += 1;
        self.stats.requests += 1;
        self.queue.mark(owner);
        Ok(())
    }

    /// The injected idle-cycle signal. Applies finished builds (handing
    /// shadows to sinks on the calling thread), then drains the pending set
    /// and dispatches builds: cache hits are presented immediately, owners
    /// with a build in flight stay pending, everything else goes to the
    /// worker pool.
    pub fn tick(&mut self) -> TickStats {
        let mut tick = TickStats::default();

        while let Some(outcome) = self.pool.try_recv() {
            self.apply_outcome(outcome);
            tick.completions += 1;
        }

        for owner in self.queue.drain() {
            self.dispatch(owner, &mut tick);
        }
        tick
    }

    /// Drive ticks until no work is pending or in flight, blocking on build
    /// completions in between. Fails with a `Schedule` error when `timeout`
    /// elapses with work still outstanding. Intended for tests and batch
    /// drivers; interactive hosts call [`tick`](Self::tick) instead.
    pub fn settle(&mut self, timeout: Duration) -> DiffuseResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            self.tick();
            if self.queue.is_empty() && !self.owners.values().any(|o| o.in_flight) {
                return Ok(());
            }
            let remaining = deadline
                .checked_duration_since(Instant::now())
                .ok_or_else(|| {
                    DiffuseError::schedule("settle timed out with work outstanding")
                })?;
            let outcome = self.pool.recv_timeout(remaining)?;
            self.apply_outcome(outcome);
        }
    }

    /// Cumulative engine counters.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            merged: self.queue.merged(),
            ..self.stats
        }
    }

    /// Result cache counters.
    pub fn cache_stats(&self) -> ShadowCacheStats {
        self.cache.stats()
    }

    /// Drop every cached shadow.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn mutate(&mut self, owner: OwnerId, f: impl FnOnce(&mut OwnerConfig)) -> DiffuseResult<()> {
        let state = self
            .owners
            .get_mut(&owner)
            .ok_or_else(|| DiffuseError::validation("unknown shadow owner"))?;
        f(&mut state.config);
        state.generation += 1;
        Ok(())
    }

    fn apply_outcome(&mut self, outcome: BuildOutcome) {
        let Some(state) = self.owners.get_mut(&outcome.owner) else {
            // Removed mid-build; the result has nowhere to go.
            self.stats.stale_discards += 1;
            return;
        };
        state.in_flight = false;
        if outcome.generation != state.generation {
            tracing::trace!(
                owner = ?outcome.owner,
                built = outcome.generation,
                latest = state.generation,
                "discarding stale shadow"
            );
            self.stats.stale_discards += 1;
            return;
        }
        match state.config.sink.upgrade() {
            Some(sink) => sink.present(outcome.surface),
            None => self.stats.dead_sink_drops += 1,
        }
    }

    fn dispatch(&mut self, owner: OwnerId, tick: &mut TickStats) {
        let Some(state) = self.owners.get_mut(&owner) else {
            // Removed while pending.
            return;
        };
        if state.in_flight {
            // One build at a time per owner; stay pending for the tick that
            // follows the completion.
            self.queue.mark(owner);
            tick.deferred += 1;
            return;
        }

        if let Some(key) = &state.config.identity
            && let Some(image) = self.cache.get(key)
        {
            let surface = ShadowSurface {
                placement: placement_for(state.config.bounds, state.config.recipe.offset(), &image),
                opacity: state.config.recipe.opacity(),
                image,
            };
            match state.config.sink.upgrade() {
                Some(sink) => sink.present(Some(surface)),
                None => self.stats.dead_sink_drops += 1,
            }
            self.stats.cache_hits += 1;
            tick.cache_hits += 1;
            return;
        }

        let params = BuildParams {
            source: state.config.source.clone(),
            bounds: state.config.bounds,
            device_scale: state.config.device_scale,
            corner_radius: state.config.corner_radius,
            recipe: state.config.recipe.clone(),
            capture_ratio: self.opts.capture_ratio,
        };
        let generation = state.generation;
        let identity = state.config.identity.clone();
        let cache = Arc::clone(&self.cache);
        state.in_flight = true;
        self.stats.builds += 1;
        tick.dispatched += 1;

        self.pool.submit(move || {
            let surface = compose_shadow(&params);
            // Pixels are valid for the identity snapshotted at dispatch even
            // if the owner has moved on, so stale builds still warm the
            // cache.
            if let (Some(key), Some(surface)) = (identity, surface.as_ref()) {
                cache.put(key, surface.image.clone());
            }
            BuildOutcome {
                owner,
                generation,
                surface,
            }
        });
    }
}

fn validate_scale(scale: f32) -> DiffuseResult<()> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(DiffuseError::validation("device_scale must be > 0"));
    }
    Ok(())
}
