//! # Streaming Controller
//!
//! The top-level orchestrator. Once per host frame, [`StreamingController::tick`]:
//!
//! 1. Applies pipeline outcomes that arrived since the last tick
//! 2. Checks whether the observer entered a new chunk
//! 3. Re-evaluates the desired chunk set when needed and the evaluation interval elapsed:
//!    deactivates active chunks beyond the unload radius, cancels queued requests beyond
//!    it, and enqueues requests for chunks within the load radius
//! 4. Drains the load queue within the per-tick count and time budget: cache hits are
//!    reactivated, misses start the pipeline, which without workers runs to completion
//!    before the next request
//! 5. Applies outcomes produced during the tick and feeds idle workers
//!
//! ## Ownership
//!
//! A chunk lives in `in_flight` while the pipeline works on it and in the cache once
//! meshed. Unloading only deactivates; disposal of a cached chunk happens exclusively in
//! the cache's eviction callback, which also records the `ChunkEvicted` event.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use cgmath::Point3;
use log::{debug, error, info, trace, warn};
use web_time::Instant;

use super::config::StreamingConfig;
use super::error::StreamingError;
use super::evaluation::StreamingRegion;
use super::events::{StreamingDebugInfo, StreamingEvent, TickReport};
use crate::cache::{CacheStatistics, ChunkCache};
use crate::core::MtResource;
use crate::meshing::SurfaceMesher;
use crate::pipeline::{ChunkPipeline, StageOutput, TaskOutcome};
use crate::scheduling::{LoadQueue, LoadRequest, LoadTicket, TaskManager};
use crate::voxels::{
    Chunk, ChunkCoordinate, ChunkState, PresentationId, TerrainGenerator, VoxelType,
};

/// Streams chunks around a single observer.
pub struct StreamingController {
    config: StreamingConfig,
    region: StreamingRegion,
    pipeline: ChunkPipeline,
    tasks: TaskManager,
    cache: ChunkCache<ChunkCoordinate, Chunk>,
    active: HashSet<ChunkCoordinate>,
    queue: LoadQueue,
    in_flight: HashMap<ChunkCoordinate, Chunk>,
    events: MtResource<Vec<StreamingEvent>>,
    observer_position: Point3<f32>,
    observer_chunk: ChunkCoordinate,
    last_evaluated_chunk: Option<ChunkCoordinate>,
    evaluation_pending: bool,
    evaluated_once: bool,
    since_last_evaluation: Duration,
    next_timestamp: u64,
    next_ticket: LoadTicket,
    failed_loads: u64,
    shut_down: bool,
}

impl StreamingController {
    /// Validates `config`, spawns the pipeline workers and creates an empty controller.
    ///
    /// # Arguments
    /// * `config` - Streaming options; rejected if invalid
    /// * `generator` - Produces chunk voxels; called from worker threads
    /// * `mesher` - Extracts chunk geometry; called from worker threads
    ///
    /// # Errors
    /// [`StreamingError::Config`] for an invalid configuration and
    /// [`StreamingError::WorkerSpawn`] if a worker thread cannot be created.
    pub fn initialize(
        config: StreamingConfig,
        generator: Arc<dyn TerrainGenerator>,
        mesher: Arc<dyn SurfaceMesher>,
    ) -> Result<Self, StreamingError> {
        if let Err(reason) = config.validate() {
            error!("Refusing to start chunk streaming: {}", reason);
            return Err(reason.into());
        }

        let tasks = TaskManager::new(config.worker_threads, config.max_tasks_in_flight_per_worker)?;

        let events = MtResource::new(Vec::new());
        let eviction_sink = events.clone();
        let cache = ChunkCache::with_eviction_callback(
            config.cache_capacity,
            move |coordinate: &ChunkCoordinate, chunk: &mut Chunk| {
                let presentation = chunk.dispose();
                trace!("Chunk {} evicted from cache", coordinate);
                eviction_sink.get_mut().push(StreamingEvent::ChunkEvicted {
                    coordinate: *coordinate,
                    presentation,
                });
            },
        );

        info!(
            "Chunk streaming initialized: chunk size {}, load radius {}, unload radius {}, cache capacity {}, {} workers",
            config.chunk_size,
            config.load_radius,
            config.unload_radius,
            config.cache_capacity,
            config.worker_threads
        );

        Ok(StreamingController {
            region: StreamingRegion::from_config(&config),
            pipeline: ChunkPipeline::new(generator, mesher, config.chunk_size),
            tasks,
            cache,
            active: HashSet::new(),
            queue: LoadQueue::new(),
            in_flight: HashMap::new(),
            events,
            observer_position: Point3::new(0.0, 0.0, 0.0),
            observer_chunk: ChunkCoordinate::ZERO,
            last_evaluated_chunk: None,
            evaluation_pending: true,
            evaluated_once: false,
            since_last_evaluation: Duration::ZERO,
            next_timestamp: 0,
            next_ticket: 0,
            failed_loads: 0,
            shut_down: false,
            config,
        })
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    /// Moves the observer to a world-space position.
    pub fn set_observer_position(&mut self, position: Point3<f32>) {
        self.observer_position = position;
        self.observer_chunk =
            ChunkCoordinate::from_world(position, self.config.chunk_size, self.config.voxel_scale);
    }

    pub fn observer_position(&self) -> Point3<f32> {
        self.observer_position
    }

    pub fn observer_chunk(&self) -> ChunkCoordinate {
        self.observer_chunk
    }

    /// Runs one streaming step.
    ///
    /// `delta_time` is the host time since the previous tick; it paces evaluations. The
    /// load pass is bounded by wall-clock time measured from the start of this call. After
    /// [`shutdown`](Self::shutdown) this does nothing.
    pub fn tick(&mut self, delta_time: Duration) -> TickReport {
        let mut report = TickReport::default();
        if self.shut_down {
            return report;
        }

        let start = Instant::now();
        self.since_last_evaluation = self.since_last_evaluation.saturating_add(delta_time);

        self.collect_completions(&mut report);

        if self.last_evaluated_chunk != Some(self.observer_chunk) {
            self.evaluation_pending = true;
        }
        let interval_elapsed =
            !self.evaluated_once || self.since_last_evaluation >= self.config.evaluation_interval();
        if self.evaluation_pending && interval_elapsed {
            self.evaluate(&mut report);
        }

        self.load_pass(start, &mut report);
        self.collect_completions(&mut report);
        self.tasks.process_queued_tasks();

        report.queue_remaining = self.queue.len();
        report.in_flight = self.in_flight.len();
        report.elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        if report.any_activity() || report.evaluated {
            debug!(
                "Tick: {} processed, {} hits, {} dispatched, +{} -{} active, {} failed, {} queued, {} in flight ({:.2} ms)",
                report.requests_processed,
                report.cache_hits,
                report.loads_dispatched,
                report.chunks_activated,
                report.chunks_deactivated,
                report.load_failures,
                report.queue_remaining,
                report.in_flight,
                report.elapsed_ms
            );
        }

        report
    }

    /// Recomputes the desired set around the observer's chunk.
    fn evaluate(&mut self, report: &mut TickReport) {
        let center = self.observer_chunk;
        let region = self.region;

        let to_unload: Vec<ChunkCoordinate> = self
            .active
            .iter()
            .copied()
            .filter(|coordinate| region.should_unload(center, *coordinate))
            .collect();
        for coordinate in to_unload {
            if self.deactivate(coordinate) {
                report.chunks_deactivated += 1;
            }
        }

        let cancelled = self
            .queue
            .cancel_where(|request| region.should_unload(center, request.coordinate));
        report.requests_cancelled += cancelled.len();
        self.queue
            .reprioritize(|coordinate| region.distance(center, coordinate));

        // Refresh recency of everything still shown, nearest last, so the LRU victims are
        // hidden chunks first and then the far edge of the visible set.
        let mut shown: Vec<(ChunkCoordinate, f32)> = self
            .active
            .iter()
            .map(|coordinate| (*coordinate, region.distance(center, *coordinate)))
            .collect();
        shown.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        for (coordinate, _) in shown {
            self.cache.promote(&coordinate);
        }

        // A desired set larger than the cache would evict its own members every tick.
        let mut desired = region.desired_coordinates(center);
        desired.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        let capacity = self.cache.capacity();
        if desired.len() > capacity {
            debug!(
                "Desired set of {} chunks exceeds cache capacity {}; loading the nearest only",
                desired.len(),
                capacity
            );
            desired.truncate(capacity);
        }

        let timestamp = self.next_timestamp();
        for (coordinate, distance) in desired {
            if self.active.contains(&coordinate) || self.in_flight.contains_key(&coordinate) {
                continue;
            }
            self.queue
                .enqueue(LoadRequest::new(coordinate, distance, timestamp));
        }

        trace!(
            "Evaluated around {}: {} queued, {} cancelled",
            center,
            self.queue.len(),
            cancelled.len()
        );

        self.last_evaluated_chunk = Some(center);
        self.evaluation_pending = false;
        self.evaluated_once = true;
        self.since_last_evaluation = Duration::ZERO;
        report.evaluated = true;
    }

    /// Serves queued requests until the queue is empty or the budget is spent.
    ///
    /// Without workers the pipeline runs inside this loop, so generation and meshing of
    /// each dispatched chunk count against the time budget before the next request.
    fn load_pass(&mut self, start: Instant, report: &mut TickReport) {
        let max_time = self.config.max_tick_time();
        let inline = self.tasks.worker_count() == 0;

        while report.requests_processed < self.config.max_loads_per_tick {
            if self.queue.is_empty() {
                break;
            }
            if start.elapsed() >= max_time {
                report.time_budget_exceeded = true;
                break;
            }
            let Some(request) = self.queue.pop() else {
                break;
            };
            report.requests_processed += 1;

            let coordinate = request.coordinate;
            if self.active.contains(&coordinate) || self.in_flight.contains_key(&coordinate) {
                continue;
            }

            // Explicit requests may point outside the region; those stay cached-inactive.
            let wanted = !self.region.should_unload(self.observer_chunk, coordinate);
            let collision_enabled = self.config.collision_enabled;
            match self
                .cache
                .try_get_with(&coordinate, |chunk| wanted && chunk.activate(collision_enabled))
            {
                Some(activated) => {
                    report.cache_hits += 1;
                    if activated {
                        self.mark_active(coordinate, true, report);
                    }
                }
                None => {
                    self.dispatch_load(coordinate, report);
                    if inline {
                        self.collect_completions(report);
                    }
                }
            }
        }

        if report.requests_processed >= self.config.max_loads_per_tick && !self.queue.is_empty() {
            report.count_budget_reached = true;
        }
    }

    /// Creates a chunk for `coordinate` and starts its generation.
    fn dispatch_load(&mut self, coordinate: ChunkCoordinate, report: &mut TickReport) {
        let ticket = self.next_ticket;
        self.next_ticket += 1;

        let mut chunk = Chunk::new(coordinate, ticket, self.config.chunk_size);
        chunk.begin_generation();
        self.in_flight.insert(coordinate, chunk);

        trace!("Dispatching load of chunk {} (ticket {})", coordinate, ticket);
        self.tasks
            .publish_task(self.pipeline.generation_task(coordinate, ticket));
        report.loads_dispatched += 1;
    }

    /// Applies outcomes until none are immediately available.
    fn collect_completions(&mut self, report: &mut TickReport) {
        loop {
            let outcomes = self.tasks.process_completed_tasks();
            if outcomes.is_empty() {
                break;
            }
            for outcome in outcomes {
                self.handle_outcome(outcome, report);
            }
        }
    }

    fn handle_outcome(&mut self, outcome: TaskOutcome, report: &mut TickReport) {
        let TaskOutcome {
            coordinate,
            ticket,
            stage,
            result,
        } = outcome;

        let expected_state = match &result {
            Ok(StageOutput::Generated(_)) => Some(ChunkState::Generating),
            Ok(StageOutput::Meshed { .. }) => Some(ChunkState::Meshing),
            Err(_) => None,
        };
        let current = match self.in_flight.get(&coordinate) {
            Some(chunk) if chunk.ticket() == ticket => chunk.state(),
            _ => {
                trace!("Discarding stale {} outcome for chunk {}", stage, coordinate);
                return;
            }
        };
        if expected_state.is_some_and(|expected| expected != current) {
            warn!(
                "Discarding {} outcome for chunk {} in state {}",
                stage, coordinate, current
            );
            return;
        }

        match result {
            Err(failure) => {
                self.in_flight.remove(&coordinate);
                self.failed_loads += 1;
                report.load_failures += 1;
                warn!("Chunk load aborted: {}", failure);
                self.events.get_mut().push(StreamingEvent::ChunkLoadFailed {
                    coordinate,
                    stage,
                    reason: failure.to_string(),
                });
            }
            Ok(StageOutput::Generated(voxels)) => {
                let Some(chunk) = self.in_flight.get_mut(&coordinate) else {
                    return;
                };
                chunk.install_voxels(voxels);
                match chunk.take_voxels_for_meshing() {
                    Some(voxels) => {
                        self.tasks
                            .publish_task(self.pipeline.meshing_task(coordinate, ticket, voxels));
                    }
                    None => {
                        error!("Chunk {} lost its voxels before meshing", coordinate);
                        self.in_flight.remove(&coordinate);
                    }
                }
            }
            Ok(StageOutput::Meshed { voxels, geometry }) => {
                let Some(mut chunk) = self.in_flight.remove(&coordinate) else {
                    return;
                };
                chunk.complete_meshing(voxels, geometry);
                self.absorb(chunk, report);
            }
        }
    }

    /// Moves a meshed chunk into the cache and activates it if it is still wanted.
    fn absorb(&mut self, chunk: Chunk, report: &mut TickReport) {
        let coordinate = chunk.coordinate();

        if let Some((evicted, _)) = self.cache.put(coordinate, chunk) {
            // The callback has already disposed it and recorded `ChunkEvicted`.
            if self.forget_evicted(evicted) {
                report.chunks_deactivated += 1;
            }
        }

        if self.region.should_unload(self.observer_chunk, coordinate) {
            trace!("Chunk {} completed out of range; kept inactive", coordinate);
            return;
        }

        let collision_enabled = self.config.collision_enabled;
        if self
            .cache
            .peek_mut_with(&coordinate, |chunk| chunk.activate(collision_enabled))
            == Some(true)
        {
            self.mark_active(coordinate, false, report);
        }
    }

    /// Drops an evicted coordinate from the active set. An evicted chunk that is still
    /// inside the load region is requested again at the next evaluation.
    fn forget_evicted(&mut self, coordinate: ChunkCoordinate) -> bool {
        if !self.active.remove(&coordinate) {
            return false;
        }
        if self.region.should_load(self.observer_chunk, coordinate) {
            self.evaluation_pending = true;
        }
        true
    }

    fn mark_active(&mut self, coordinate: ChunkCoordinate, from_cache: bool, report: &mut TickReport) {
        self.active.insert(coordinate);
        report.chunks_activated += 1;
        self.events.get_mut().push(StreamingEvent::ChunkActivated {
            coordinate,
            from_cache,
        });
    }

    /// Hides an active chunk, leaving it in the cache.
    fn deactivate(&mut self, coordinate: ChunkCoordinate) -> bool {
        if !self.active.remove(&coordinate) {
            return false;
        }
        self.cache
            .peek_mut_with(&coordinate, |chunk| chunk.deactivate());
        self.events
            .get_mut()
            .push(StreamingEvent::ChunkDeactivated { coordinate });
        true
    }

    fn next_timestamp(&mut self) -> u64 {
        let timestamp = self.next_timestamp;
        self.next_timestamp += 1;
        timestamp
    }

    /// Queues a load for `coordinate` outside the regular evaluation.
    ///
    /// Returns `false` if the chunk is already active, in the pipeline or queued. A
    /// requested chunk outside the unload radius is loaded into the cache but not shown.
    pub fn request_chunk(&mut self, coordinate: ChunkCoordinate) -> bool {
        if self.shut_down
            || self.active.contains(&coordinate)
            || self.in_flight.contains_key(&coordinate)
        {
            return false;
        }
        let distance = self.region.distance(self.observer_chunk, coordinate);
        let timestamp = self.next_timestamp();
        self.queue
            .enqueue(LoadRequest::new(coordinate, distance, timestamp))
    }

    /// Re-runs evaluation on the next tick that the evaluation interval allows.
    pub fn force_evaluation(&mut self) {
        self.evaluation_pending = true;
    }

    /// Attaches a host presentation object to an active chunk.
    ///
    /// Returns the handle it replaces, or gives `presentation` back if the chunk is not
    /// active.
    pub fn attach_presentation(
        &mut self,
        coordinate: ChunkCoordinate,
        presentation: PresentationId,
    ) -> Result<Option<PresentationId>, PresentationId> {
        if !self.active.contains(&coordinate) {
            return Err(presentation);
        }
        self.cache
            .peek_mut_with(&coordinate, |chunk| chunk.attach_presentation(presentation))
            .ok_or(presentation)
    }

    /// Records that the host built collision for an active chunk.
    pub fn confirm_collision(&mut self, coordinate: ChunkCoordinate) -> bool {
        self.cache
            .peek_mut_with(&coordinate, |chunk| chunk.confirm_collision())
            .unwrap_or(false)
    }

    /// Voxel type at a world-space position.
    ///
    /// Reads a resident generated chunk when there is one and asks the generator otherwise.
    pub fn voxel_at(&self, position: Point3<f32>) -> VoxelType {
        let chunk_size = self.config.chunk_size;
        let voxel = ChunkCoordinate::world_to_voxel(position, self.config.voxel_scale);
        let coordinate = ChunkCoordinate::from_voxel(voxel, chunk_size);
        let local = ChunkCoordinate::voxel_to_local(voxel, chunk_size);

        self.cache
            .peek_with(&coordinate, |chunk| chunk.voxel_at_local(local))
            .flatten()
            .unwrap_or_else(|| {
                self.pipeline
                    .generator()
                    .voxel_at(voxel.x, voxel.y, voxel.z)
            })
    }

    /// Runs `f` on a chunk in the pipeline or the cache, without touching recency.
    pub fn with_chunk<R>(&self, coordinate: ChunkCoordinate, f: impl FnOnce(&Chunk) -> R) -> Option<R> {
        match self.in_flight.get(&coordinate) {
            Some(chunk) => Some(f(chunk)),
            None => self.cache.peek_with(&coordinate, f),
        }
    }

    /// Drops every active, cached, queued and in-flight chunk, disposing their resources.
    ///
    /// Cached chunks go through the eviction callback, so a `ChunkEvicted` event is
    /// recorded for each. Outcomes of tasks still running on workers are discarded when
    /// they arrive. The next tick re-evaluates from scratch.
    pub fn clear(&mut self) {
        let discarded_tasks = self.tasks.discard_pending();
        let cancelled = self.queue.len();
        self.queue.clear();

        let in_flight = self.in_flight.len();
        for (_, mut chunk) in self.in_flight.drain() {
            chunk.dispose();
        }

        self.active.clear();
        let evicted = self.cache.evict_all();

        self.last_evaluated_chunk = None;
        self.evaluation_pending = true;
        self.evaluated_once = false;

        info!(
            "Cleared chunk streaming: {} cached chunks disposed, {} loads and {} requests dropped, {} tasks discarded",
            evicted, in_flight, cancelled, discarded_tasks
        );
    }

    /// Stops the workers and clears all chunks. Further ticks do nothing.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.tasks.shutdown();
        self.clear();
        self.shut_down = true;
        info!("Chunk streaming shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Changes the cache capacity; chunks that no longer fit are evicted.
    pub fn set_cache_capacity(&mut self, capacity: usize) {
        for (coordinate, _) in self.cache.set_capacity(capacity) {
            self.forget_evicted(coordinate);
        }
        self.config.cache_capacity = capacity;
    }

    /// Takes every event recorded since the previous call.
    pub fn drain_events(&self) -> Vec<StreamingEvent> {
        self.events.take()
    }

    /// Snapshot of the cache counters.
    pub fn statistics(&self) -> CacheStatistics {
        self.cache.statistics()
    }

    pub fn active_chunk_count(&self) -> usize {
        self.active.len()
    }

    pub fn cached_chunk_count(&self) -> usize {
        self.cache.len()
    }

    pub fn pending_load_count(&self) -> usize {
        self.queue.len()
    }

    /// Chunks currently generating or meshing.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn failed_load_count(&self) -> u64 {
        self.failed_loads
    }

    pub fn is_active(&self, coordinate: ChunkCoordinate) -> bool {
        self.active.contains(&coordinate)
    }

    /// Active coordinates in ascending order.
    pub fn active_coordinates(&self) -> Vec<ChunkCoordinate> {
        let mut coordinates: Vec<_> = self.active.iter().copied().collect();
        coordinates.sort();
        coordinates
    }

    pub fn debug_info(&self) -> StreamingDebugInfo {
        let mut voxel_bytes = 0;
        let mut geometry_bytes = 0;
        self.cache.peek_each(|_, chunk| {
            voxel_bytes += chunk.voxel_bytes();
            geometry_bytes += chunk.geometry_bytes();
        });
        for chunk in self.in_flight.values() {
            voxel_bytes += chunk.voxel_bytes();
            geometry_bytes += chunk.geometry_bytes();
        }

        StreamingDebugInfo {
            observer_chunk: self.observer_chunk,
            active_chunks: self.active.len(),
            cached_chunks: self.cache.len(),
            cache_capacity: self.cache.capacity(),
            queued_requests: self.queue.len(),
            in_flight_loads: self.in_flight.len(),
            failed_loads: self.failed_loads,
            voxel_bytes,
            geometry_bytes,
            statistics: self.cache.statistics(),
        }
    }
}

impl Drop for StreamingController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meshing::CulledFaceMesher;
    use crate::voxels::NoiseTerrainGenerator;

    fn inline_config() -> StreamingConfig {
        StreamingConfig {
            chunk_size: 4,
            load_radius: 1.0,
            unload_radius: 2.0,
            evaluation_interval_ms: 0,
            max_loads_per_tick: 64,
            max_tick_time_ms: 10_000.0,
            worker_threads: 0,
            ..StreamingConfig::default()
        }
    }

    fn controller(config: StreamingConfig) -> StreamingController {
        StreamingController::initialize(
            config,
            Arc::new(NoiseTerrainGenerator::with_seed(3)),
            Arc::new(CulledFaceMesher::default()),
        )
        .unwrap()
    }

    #[test]
    fn first_tick_loads_region_inline() {
        let mut streaming = controller(inline_config());

        let report = streaming.tick(Duration::from_millis(16));

        assert!(report.evaluated);
        assert_eq!(report.requests_processed, 7);
        assert_eq!(report.loads_dispatched, 7);
        assert_eq!(report.chunks_activated, 7);
        assert_eq!(streaming.active_chunk_count(), 7);
        assert_eq!(streaming.cached_chunk_count(), 7);
        assert_eq!(streaming.in_flight_count(), 0);
        assert_eq!(
            streaming.with_chunk(ChunkCoordinate::ZERO, |chunk| chunk.state()),
            Some(ChunkState::Active)
        );
    }

    #[test]
    fn unchanged_chunk_skips_evaluation() {
        let mut streaming = controller(inline_config());
        streaming.tick(Duration::from_millis(16));

        streaming.set_observer_position(Point3::new(1.0, 1.0, 1.0));
        let report = streaming.tick(Duration::from_millis(16));

        assert!(!report.evaluated);
        assert_eq!(report.requests_processed, 0);
    }

    #[test]
    fn collision_is_pending_until_confirmed() {
        let mut streaming = controller(StreamingConfig {
            collision_enabled: true,
            ..inline_config()
        });
        streaming.tick(Duration::from_millis(16));

        assert_eq!(
            streaming.with_chunk(ChunkCoordinate::ZERO, Chunk::is_collision_pending),
            Some(true)
        );
        assert!(streaming.confirm_collision(ChunkCoordinate::ZERO));
        assert_eq!(
            streaming.with_chunk(ChunkCoordinate::ZERO, Chunk::has_collision),
            Some(true)
        );
        assert!(!streaming.confirm_collision(ChunkCoordinate::new(40, 0, 0)));
    }

    #[test]
    fn presentation_only_attaches_to_active_chunks() {
        let mut streaming = controller(inline_config());
        streaming.tick(Duration::from_millis(16));

        assert_eq!(
            streaming.attach_presentation(ChunkCoordinate::ZERO, PresentationId(1)),
            Ok(None)
        );
        assert_eq!(
            streaming.attach_presentation(ChunkCoordinate::ZERO, PresentationId(2)),
            Ok(Some(PresentationId(1)))
        );
        assert_eq!(
            streaming.attach_presentation(ChunkCoordinate::new(9, 9, 9), PresentationId(3)),
            Err(PresentationId(3))
        );
    }

    #[test]
    fn shrinking_capacity_drops_active_chunks() {
        let mut streaming = controller(inline_config());
        streaming.tick(Duration::from_millis(16));
        streaming.drain_events();

        streaming.set_cache_capacity(2);

        assert_eq!(streaming.cached_chunk_count(), 2);
        assert_eq!(streaming.active_chunk_count(), 2);
        let evicted = streaming
            .drain_events()
            .into_iter()
            .filter(|event| matches!(event, StreamingEvent::ChunkEvicted { .. }))
            .count();
        assert_eq!(evicted, 5);
    }

    #[test]
    fn evicting_active_chunk_counts_as_deactivation() {
        let mut streaming = controller(StreamingConfig {
            cache_capacity: 7,
            ..inline_config()
        });
        streaming.tick(Duration::from_millis(16));
        streaming.drain_events();

        let remote = ChunkCoordinate::new(30, 0, 0);
        assert!(streaming.request_chunk(remote));
        let report = streaming.tick(Duration::from_millis(16));

        assert_eq!(report.chunks_deactivated, 1);
        assert_eq!(streaming.active_chunk_count(), 6);
        assert!(!streaming.is_active(ChunkCoordinate::ZERO));
        let events = streaming.drain_events();
        assert!(events.contains(&StreamingEvent::ChunkEvicted {
            coordinate: ChunkCoordinate::ZERO,
            presentation: None,
        }));
        assert!(!events
            .iter()
            .any(|event| matches!(event, StreamingEvent::ChunkDeactivated { .. })));

        let report = streaming.tick(Duration::from_millis(16));
        assert!(report.evaluated);
        assert_eq!(streaming.active_chunk_count(), 7);
        assert!(streaming.is_active(ChunkCoordinate::ZERO));
        assert_eq!(streaming.with_chunk(remote, |chunk| chunk.state()), None);
    }

    #[test]
    fn debug_info_reports_memory() {
        let mut streaming = controller(inline_config());
        streaming.tick(Duration::from_millis(16));

        let info = streaming.debug_info();
        assert_eq!(info.active_chunks, 7);
        assert_eq!(info.cached_chunks, 7);
        assert!(info.voxel_bytes >= 7 * 64);
        assert_eq!(info.statistics.misses, 7);
        assert!(info.to_string().contains("active 7"));
    }

    #[test]
    fn shutdown_stops_ticking() {
        let mut streaming = controller(inline_config());
        streaming.tick(Duration::from_millis(16));

        streaming.shutdown();

        assert!(streaming.is_shut_down());
        assert_eq!(streaming.cached_chunk_count(), 0);
        assert_eq!(streaming.tick(Duration::from_millis(16)), TickReport::default());
        assert!(!streaming.request_chunk(ChunkCoordinate::ZERO));
    }
}
