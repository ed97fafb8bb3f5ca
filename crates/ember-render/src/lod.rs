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

//! Background level-of-detail selection.
//!
//! The worker wakes up `tick_rate` times per second, drains its command
//! queue, then walks the actor list and stores in every actor the LOD to
//! draw it with. It holds the LOD lock for the whole walk, so it never runs
//! while the render thread is inside a render pass or writing textures.

use crate::error::RendererError;
use crate::lock::LodLock;
use crossbeam_channel::{Receiver, Sender};
use ember_core::asset::ModelLod;
use ember_core::math::Vec3;
use ember_core::scene::ActorList;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Messages accepted by the worker.
#[derive(Debug, Clone)]
pub enum LodCommand {
    /// The camera moved.
    Camera(Vec3),
    /// Walk this actor list from now on.
    Actors(ActorList),
    /// Stop walking any actor list.
    ClearActors,
}

/// Index of the coarsest LOD whose distance threshold `distance` reaches.
/// LODs are ordered finest first; LOD 0 is used below every threshold.
pub fn select_lod(lods: &[ModelLod], distance: f32) -> usize {
    lods.iter()
        .rposition(|lod| distance >= lod.distance)
        .unwrap_or(0)
}

/// Updates the LOD of every actor in `actors` for a camera at `camera`.
/// Returns how many actors changed LOD.
///
/// Takes the LOD lock first and the actor list second, the same order the
/// render thread uses.
pub fn update_actor_lods(
    lock: &LodLock,
    actors: &ActorList,
    camera: Vec3,
) -> Result<usize, RendererError> {
    let _guard = lock.enter()?;
    let mut actors = actors
        .lock()
        .map_err(|_| RendererError::LockPoisoned("actors"))?;
    let mut changed = 0;
    for actor in actors.iter_mut() {
        let Some(model) = actor.model.as_ref() else {
            continue;
        };
        let lod = select_lod(&model.definition.lods, actor.position().distance(camera));
        if lod != actor.lod {
            actor.lod = lod;
            changed += 1;
        }
    }
    Ok(changed)
}

/// The LOD worker thread and its command queue.
pub struct LodWorker {
    tick_rate: u32,
    lock: LodLock,
    running: Arc<AtomicBool>,
    passes: Arc<AtomicU64>,
    handle: Option<thread::JoinHandle<()>>,
    stopped: bool,
    command_tx: Sender<LodCommand>,
    command_rx: Receiver<LodCommand>,
}

impl LodWorker {
    /// Creates a stopped worker that ticks `tick_rate` times per second.
    pub fn new(lock: LodLock, tick_rate: u32) -> Self {
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        Self {
            tick_rate: tick_rate.max(1),
            lock,
            running: Arc::new(AtomicBool::new(false)),
            passes: Arc::new(AtomicU64::new(0)),
            handle: None,
            stopped: false,
            command_tx,
            command_rx,
        }
    }

    /// Starts the background thread. Does nothing if it is already running.
    pub fn start(&mut self) {
        if self.running.load(Ordering::SeqCst) {
            return;
        }

        self.stopped = false;
        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let passes = Arc::clone(&self.passes);
        let lock = self.lock.clone();
        let command_rx = self.command_rx.clone();
        let tick_duration = Duration::from_secs_f32(1.0 / self.tick_rate as f32);

        let handle = thread::spawn(move || {
            let mut camera = Vec3::ZERO;
            let mut actors: Option<ActorList> = None;

            log::info!("LodWorker: Thread started.");

            while running.load(Ordering::Relaxed) {
                let start_time = Instant::now();

                while let Ok(command) = command_rx.try_recv() {
                    match command {
                        LodCommand::Camera(position) => camera = position,
                        LodCommand::Actors(list) => actors = Some(list),
                        LodCommand::ClearActors => actors = None,
                    }
                }

                if let Some(list) = actors.as_ref() {
                    match update_actor_lods(&lock, list, camera) {
                        Ok(changed) => {
                            if changed > 0 {
                                log::trace!("LodWorker: {} actors changed LOD", changed);
                            }
                            passes.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            log::error!("LodWorker: Stopping after fatal error: {}", e);
                            running.store(false, Ordering::SeqCst);
                            break;
                        }
                    }
                }

                let elapsed = start_time.elapsed();
                if elapsed < tick_duration {
                    thread::sleep(tick_duration - elapsed);
                }
            }
            log::info!("LodWorker: Thread stopped.");
        });

        self.handle = Some(handle);
    }

    /// Stops the background thread and waits for it to exit.
    pub fn stop(&mut self) {
        self.stopped = true;
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("LodWorker: Thread panicked");
            }
        }
    }

    /// Returns `true` while the thread is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst) && self.handle.is_some()
    }

    /// Commands are queued before the first start and while the thread
    /// runs. Once it has stopped, or exited on a fatal error, nothing drains
    /// the queue.
    fn accepts_commands(&self) -> bool {
        match self.handle {
            Some(_) => self.running.load(Ordering::SeqCst),
            None => !self.stopped,
        }
    }

    fn send(&self, command: LodCommand) {
        if !self.accepts_commands() {
            log::trace!("LodWorker: Not running, command dropped");
            return;
        }
        if let Err(e) = self.command_tx.send(command) {
            log::warn!("LodWorker: Failed to queue command: {}", e);
        }
    }

    /// Queues a camera position for the next pass.
    pub fn set_camera(&self, position: Vec3) {
        self.send(LodCommand::Camera(position));
    }

    /// Queues the actor list to walk.
    pub fn set_actors(&self, actors: ActorList) {
        self.send(LodCommand::Actors(actors));
    }

    /// Stops walking the current actor list until a new one is queued.
    pub fn clear_actors(&self) {
        self.send(LodCommand::ClearActors);
    }

    /// Number of completed passes over an actor list.
    pub fn pass_count(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }
}

impl Drop for LodWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::asset::{AssetId, Material, ModelDefinition, ShadingMode};
    use ember_core::math::Mat4;
    use ember_core::scene::{Actor, ActorId, ActorModel, ModelVertex};
    use std::sync::Mutex;

    fn lods(distances: &[f32]) -> Vec<ModelLod> {
        distances
            .iter()
            .enumerate()
            .map(|(id, distance)| ModelLod {
                id: id as u32,
                distance: *distance,
                vertices: vec![ModelVertex::default(); 3],
                slot_indices: vec![vec![0, 1, 2]],
            })
            .collect()
    }

    fn actor_at(id: u64, z: f32) -> Actor {
        let model = Arc::new(ModelDefinition {
            id: AssetId::from_name("rock"),
            name: "rock".into(),
            materials: vec![Arc::new(Material::new("stone", None, ShadingMode::Shaded))],
            skins: vec![vec![0]],
            lods: lods(&[0.0, 10.0, 50.0]),
        });
        let mut actor = Actor::new(
            ActorId(id),
            Some(ActorModel {
                definition: model,
                skin: 0,
            }),
        );
        actor.transform = Mat4::from_translation(Vec3::new(0.0, 0.0, z));
        actor
    }

    #[test]
    fn test_select_lod_picks_coarsest_reached_threshold() {
        let lods = lods(&[0.0, 10.0, 50.0]);
        assert_eq!(select_lod(&lods, 0.0), 0);
        assert_eq!(select_lod(&lods, 9.9), 0);
        assert_eq!(select_lod(&lods, 10.0), 1);
        assert_eq!(select_lod(&lods, 500.0), 2);
        assert_eq!(select_lod(&[], 5.0), 0);
    }

    #[test]
    fn test_update_sets_actor_lods_and_releases_locks() {
        let lock = LodLock::new();
        let actors: ActorList = Arc::new(Mutex::new(vec![
            actor_at(1, 5.0),
            actor_at(2, 20.0),
            actor_at(3, 80.0),
            Actor::new(ActorId(4), None),
        ]));
        let changed = update_actor_lods(&lock, &actors, Vec3::ZERO).unwrap();
        assert_eq!(changed, 2);
        let lods: Vec<_> = actors.lock().unwrap().iter().map(|a| a.lod).collect();
        assert_eq!(lods, vec![0, 1, 2, 0]);
        assert!(!lock.is_held());
    }

    #[test]
    fn test_poisoned_actor_list_is_fatal_and_releases_lod_lock() {
        let lock = LodLock::new();
        let actors: ActorList = Arc::new(Mutex::new(vec![actor_at(1, 5.0)]));
        let poison = Arc::clone(&actors);
        let _ = thread::spawn(move || {
            let _held = poison.lock().unwrap();
            panic!("poison the actor list");
        })
        .join();

        let err = update_actor_lods(&lock, &actors, Vec3::ZERO).unwrap_err();
        assert_eq!(err, RendererError::LockPoisoned("actors"));
        assert!(err.is_fatal());
        assert!(!lock.is_held());
    }

    #[test]
    fn test_worker_applies_queued_commands() {
        let lock = LodLock::new();
        let actors: ActorList = Arc::new(Mutex::new(vec![actor_at(1, 5.0)]));
        let mut worker = LodWorker::new(lock.clone(), 200);
        worker.set_actors(Arc::clone(&actors));
        worker.set_camera(Vec3::new(0.0, 0.0, 100.0));
        worker.start();
        assert!(worker.is_running());

        let deadline = Instant::now() + Duration::from_secs(5);
        while worker.pass_count() == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        worker.stop();

        assert!(worker.pass_count() > 0);
        assert!(!worker.is_running());
        assert_eq!(actors.lock().unwrap()[0].lod, 2);
        assert!(!lock.is_held());
    }

    fn wait_until(done: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_cleared_actor_list_is_not_walked() {
        let actors: ActorList = Arc::new(Mutex::new(vec![actor_at(1, 5.0)]));
        let mut worker = LodWorker::new(LodLock::new(), 200);
        worker.set_actors(Arc::clone(&actors));
        worker.set_camera(Vec3::new(0.0, 0.0, 100.0));
        worker.clear_actors();
        worker.start();

        wait_until(|| worker.command_rx.is_empty());
        thread::sleep(Duration::from_millis(50));
        worker.stop();

        assert_eq!(worker.pass_count(), 0);
        assert_eq!(actors.lock().unwrap()[0].lod, 0);
    }

    #[test]
    fn test_exited_worker_stops_queueing_commands() {
        let actors: ActorList = Arc::new(Mutex::new(vec![actor_at(1, 5.0)]));
        let poison = Arc::clone(&actors);
        let _ = thread::spawn(move || {
            let _held = poison.lock().unwrap();
            panic!("poison the actor list");
        })
        .join();

        let mut worker = LodWorker::new(LodLock::new(), 200);
        worker.set_actors(actors);
        worker.start();
        wait_until(|| !worker.is_running());
        assert!(!worker.is_running());

        for step in 0..100 {
            worker.set_camera(Vec3::new(step as f32, 0.0, 0.0));
        }
        assert!(worker.command_rx.is_empty());
    }

    #[test]
    fn test_stopped_worker_drops_commands() {
        let mut worker = LodWorker::new(LodLock::new(), 20);
        worker.start();
        worker.stop();
        worker.set_camera(Vec3::ONE);
        worker.clear_actors();
        assert!(worker.command_rx.is_empty());
    }

    #[test]
    fn test_stop_without_start_is_harmless() {
        let mut worker = LodWorker::new(LodLock::new(), 20);
        worker.stop();
        assert_eq!(worker.pass_count(), 0);
    }
}
