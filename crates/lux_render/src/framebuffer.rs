//! Progressive framebuffer.
//!
//! Owns the task queue and the accumulated image. Workers pull tasks with
//! [`Framebuffer::get_tasks`] and hand finished ones back through
//! [`Framebuffer::merge_tasks`], which folds their results into the
//! accumulators and queues the follow-up work: coarse tasks split into four
//! finer children, full-resolution tasks come back with more samples.
//!
//! A materializer thread turns the accumulators into a [`DisplayImage`]
//! every 30 ms so readers never wait on a full conversion.

use crate::task::{build_initial_tasks, Task, MAX_TASK_SPP};
use crate::RenderError;
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use lux_math::UVec2;
use lux_tracer::Spectrum;
use parking_lot::{Mutex, RwLock};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Interval between display refreshes.
pub const MATERIALIZE_INTERVAL: Duration = Duration::from_millis(30);

const DISPLAY_GAMMA: f32 = 2.2;

/// Row-major index of final pixel `(x, y)`, computed without `u32` overflow.
fn pixel_index(width: u32, x: u32, y: u32) -> usize {
    y as usize * width as usize + x as usize
}

/// Gamma-encoded RGBA8 snapshot of the framebuffer, rows top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayImage {
    pub width: u32,
    pub height: u32,
    /// Merge count the snapshot was taken at
    pub generation: u64,
    pub pixels: Vec<[u8; 4]>,
}

impl DisplayImage {
    /// Raw RGBA bytes, ready for texture upload or file output.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels[pixel_index(self.width, x, y)]
    }
}

/// Linear radiance to display-referred 8-bit RGBA.
pub fn color_to_rgba(color: Spectrum) -> [u8; 4] {
    let encode = |c: f32| {
        let c = if c.is_finite() { c.max(0.0) } else { 0.0 };
        (255.0 * c.powf(1.0 / DISPLAY_GAMMA).clamp(0.0, 1.0)) as u8
    };
    [encode(color.x), encode(color.y), encode(color.z), 255]
}

/// Running sums per final pixel.
#[derive(Debug, Clone)]
struct Accumulators {
    value: Vec<Spectrum>,
    weight: Vec<f32>,
    /// Pixel size of the task that last wrote each pixel
    pixel_size: Vec<u32>,
    splat: Vec<Spectrum>,
    light_paths: u64,
    generation: u64,
}

impl Accumulators {
    fn new(width: u32, height: u32, tasks: &[Task]) -> Self {
        let count = width as usize * height as usize;
        let mut pixel_size = vec![1; count];
        for task in tasks {
            for (cx, cy) in task.coarse_pixels() {
                let (min, max) = task.final_block(cx, cy);
                for y in min.y..max.y {
                    for x in min.x..max.x {
                        pixel_size[pixel_index(width, x, y)] = task.pixel_size;
                    }
                }
            }
        }
        Self {
            value: vec![Spectrum::ZERO; count],
            weight: vec![0.0; count],
            pixel_size,
            splat: vec![Spectrum::ZERO; count],
            light_paths: 0,
            generation: 0,
        }
    }

    /// Fold one task into the per-pixel sums.
    ///
    /// Equal pixel size accumulates, a finer task replaces the coarser
    /// estimate, and a coarser task arriving late is ignored.
    fn merge(&mut self, width: u32, task: &Task) {
        for (cx, cy) in task.coarse_pixels() {
            let i = task.index(cx, cy);
            let (value, weight) = (task.value[i], task.weight[i]);
            let (min, max) = task.final_block(cx, cy);
            for y in min.y..max.y {
                for x in min.x..max.x {
                    let p = pixel_index(width, x, y);
                    let stored = self.pixel_size[p];
                    if task.pixel_size == stored {
                        self.value[p] += value;
                        self.weight[p] += weight;
                    } else if task.pixel_size < stored {
                        self.value[p] = value;
                        self.weight[p] = weight;
                        self.pixel_size[p] = task.pixel_size;
                    }
                }
            }
        }

        for splat in &task.splats {
            self.splat[pixel_index(width, splat.pixel.x, splat.pixel.y)] += splat.value;
        }
        self.light_paths += task.light_path_count;
    }

    fn to_display(&self, width: u32, height: u32) -> DisplayImage {
        let splat_scale = if self.light_paths > 0 {
            (width as f64 * height as f64 / self.light_paths as f64) as f32
        } else {
            0.0
        };
        let pixels = self
            .value
            .iter()
            .zip(&self.weight)
            .zip(&self.splat)
            .map(|((&value, &weight), &splat)| {
                let mean = if weight > 0.0 { value / weight } else { Spectrum::ZERO };
                color_to_rgba(mean + splat * splat_scale)
            })
            .collect();
        DisplayImage {
            width,
            height,
            generation: self.generation,
            pixels,
        }
    }
}

struct Shared {
    width: u32,
    height: u32,
    queue: Mutex<VecDeque<Task>>,
    accum: RwLock<Accumulators>,
    generation: AtomicU64,
    output: Mutex<Option<Arc<DisplayImage>>>,
}

impl Shared {
    fn compute_image(&self) -> DisplayImage {
        let snapshot = self.accum.read().clone();
        snapshot.to_display(self.width, self.height)
    }

    /// Publish `image` unless a newer one is already installed.
    fn install(&self, image: Arc<DisplayImage>) {
        let mut output = self.output.lock();
        match output.as_ref() {
            Some(current) if current.generation >= image.generation => {}
            _ => *output = Some(image),
        }
    }

    fn cached_image(&self) -> Option<Arc<DisplayImage>> {
        let generation = self.generation.load(Ordering::Acquire);
        self.output
            .lock()
            .as_ref()
            .filter(|image| image.generation == generation)
            .cloned()
    }

    fn refresh(&self) {
        if self.cached_image().is_none() {
            self.install(Arc::new(self.compute_image()));
        }
    }
}

/// Shared progressive image and its work queue.
pub struct Framebuffer {
    shared: Arc<Shared>,
    stop_tx: Option<Sender<()>>,
    materializer: Option<JoinHandle<()>>,
}

impl Framebuffer {
    /// Build the initial task queue and start the materializer thread.
    pub fn new(width: u32, height: u32, task_grid_size: u32, seed: u64) -> Result<Self, RenderError> {
        if width == 0 || height == 0 || task_grid_size == 0 {
            return Err(RenderError::InvalidConfig(format!(
                "framebuffer {width}x{height} with task grid {task_grid_size}"
            )));
        }

        let mut rng = SmallRng::seed_from_u64(seed);
        let tasks = build_initial_tasks(width, height, task_grid_size, &mut rng);
        log::info!(
            "Framebuffer {}x{}: {} initial tasks of up to {}px",
            width,
            height,
            tasks.len(),
            task_grid_size
        );

        let shared = Arc::new(Shared {
            width,
            height,
            accum: RwLock::new(Accumulators::new(width, height, &tasks)),
            queue: Mutex::new(tasks.into()),
            generation: AtomicU64::new(0),
            output: Mutex::new(None),
        });

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let worker_shared = Arc::clone(&shared);
        let materializer = thread::Builder::new()
            .name("lux-materializer".into())
            .spawn(move || loop {
                match stop_rx.recv_timeout(MATERIALIZE_INTERVAL) {
                    Err(RecvTimeoutError::Timeout) => worker_shared.refresh(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        Ok(Self {
            shared,
            stop_tx: Some(stop_tx),
            materializer: Some(materializer),
        })
    }

    pub fn get_resolution(&self) -> UVec2 {
        UVec2::new(self.shared.width, self.shared.height)
    }

    /// Pop up to `n` tasks from the front of the queue.
    pub fn get_tasks(&self, n: usize) -> Vec<Task> {
        let mut queue = self.shared.queue.lock();
        let n = n.min(queue.len());
        queue.drain(..n).collect()
    }

    pub fn queued_tasks(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Fold finished tasks into the image and queue their follow-up work.
    pub fn merge_tasks(&self, tasks: Vec<Task>) {
        if tasks.is_empty() {
            return;
        }

        {
            let mut accum = self.shared.accum.write();
            for task in &tasks {
                accum.merge(self.shared.width, task);
            }
            accum.generation += 1;
            self.shared.generation.store(accum.generation, Ordering::Release);
        }

        let mut queue = self.shared.queue.lock();
        for mut task in tasks {
            if task.is_full_resolution() {
                task.spp = (task.spp + 1).min(MAX_TASK_SPP);
                task.clear();
                queue.push_back(task);
            } else {
                queue.extend(task.split());
            }
        }
    }

    /// Latest display image, recomputed when merges happened since the
    /// materializer last ran.
    pub fn get_image(&self) -> Arc<DisplayImage> {
        if let Some(image) = self.shared.cached_image() {
            return image;
        }
        let image = Arc::new(self.shared.compute_image());
        self.shared.install(Arc::clone(&image));
        image
    }

    /// Number of merges folded into the accumulators so far.
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::Acquire)
    }

    /// Pixel size of the estimate currently stored for final pixel `(x, y)`.
    pub fn pixel_size_at(&self, x: u32, y: u32) -> u32 {
        self.shared.accum.read().pixel_size[pixel_index(self.shared.width, x, y)]
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        drop(self.stop_tx.take());
        if let Some(handle) = self.materializer.take() {
            if handle.join().is_err() {
                log::error!("Materializer thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{PixelRange, Splat};

    fn fill(task: &mut Task, value: Spectrum) {
        for (cx, cy) in task.coarse_pixels().collect::<Vec<_>>() {
            task.add_sample(cx, cy, value);
        }
    }

    #[test]
    fn test_color_to_rgba() {
        assert_eq!(color_to_rgba(Spectrum::ZERO), [0, 0, 0, 255]);
        assert_eq!(color_to_rgba(Spectrum::ONE), [255, 255, 255, 255]);
        assert_eq!(color_to_rgba(Spectrum::splat(4.0)), [255, 255, 255, 255]);
        assert_eq!(color_to_rgba(Spectrum::new(f32::NAN, -1.0, 0.5))[..2], [0, 0]);
        // 0.5^(1/2.2) = 0.7297
        assert_eq!(color_to_rgba(Spectrum::splat(0.5))[2], 186);
    }

    #[test]
    fn test_pixel_index_does_not_wrap() {
        assert_eq!(pixel_index(4, 3, 2), 11);
        // 70000 * 70000 exceeds u32::MAX
        assert_eq!(pixel_index(70_000, 69_999, 69_999), 4_899_999_999);
        assert!(pixel_index(70_000, 0, 61_360) > u32::MAX as usize);
    }

    #[test]
    fn test_pixel_size_is_monotone() {
        let fb = Framebuffer::new(64, 48, 16, 3).unwrap();
        let points = [(0, 0), (17, 5), (63, 47), (40, 30)];
        let mut last: Vec<u32> = points.iter().map(|&(x, y)| fb.pixel_size_at(x, y)).collect();
        assert!(last.iter().all(|&ps| ps > 1));

        for _ in 0..40 {
            let mut tasks = fb.get_tasks(usize::MAX);
            for task in &mut tasks {
                fill(task, Spectrum::splat(0.25));
            }
            fb.merge_tasks(tasks);

            let now: Vec<u32> = points.iter().map(|&(x, y)| fb.pixel_size_at(x, y)).collect();
            for (before, after) in last.iter().zip(&now) {
                assert!(after <= before);
            }
            last = now;
        }
        assert!(last.iter().all(|&ps| ps == 1));

        let image = fb.get_image();
        let expected = color_to_rgba(Spectrum::splat(0.25));
        assert!(image.pixels.iter().all(|&p| p == expected));
    }

    #[test]
    fn test_full_resolution_tasks_requeue_with_more_samples() {
        let fb = Framebuffer::new(2, 2, 2, 0).unwrap();
        let mut tasks = fb.get_tasks(8);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].pixel_size, 2);

        fill(&mut tasks[0], Spectrum::ONE);
        fb.merge_tasks(tasks);
        let children = fb.get_tasks(8);
        assert_eq!(children.len(), 4);
        assert!(children.iter().all(|t| t.pixel_size == 1 && t.spp == 1));

        let mut tasks = children;
        for _ in 0..10 {
            for task in &mut tasks {
                fill(task, Spectrum::ONE);
            }
            fb.merge_tasks(tasks);
            tasks = fb.get_tasks(8);
            assert_eq!(tasks.len(), 4);
            assert!(tasks.iter().all(|t| t.weight.iter().all(|&w| w == 0.0)));
        }
        assert!(tasks.iter().all(|t| t.spp == MAX_TASK_SPP));
    }

    #[test]
    fn test_merge_policy() {
        let fb = Framebuffer::new(4, 4, 4, 0).unwrap();
        assert_eq!(fb.get_tasks(8).len(), 1);
        assert_eq!(fb.pixel_size_at(0, 0), 4);

        // Same size accumulates on top of the zeroed start.
        let mut coarse = Task::new(PixelRange::new(UVec2::ZERO, UVec2::ZERO), 4, 1);
        coarse.add_sample(0, 0, Spectrum::splat(1.0));
        fb.merge_tasks(vec![coarse.clone()]);
        assert_eq!(fb.get_image().pixel(3, 3), color_to_rgba(Spectrum::ONE));

        // Finer replaces.
        let mut fine = Task::new(PixelRange::new(UVec2::ZERO, UVec2::ZERO), 1, 1);
        fine.add_sample(0, 0, Spectrum::splat(0.25));
        fb.merge_tasks(vec![fine]);
        assert_eq!(fb.pixel_size_at(0, 0), 1);
        let image = fb.get_image();
        assert_eq!(image.pixel(0, 0), color_to_rgba(Spectrum::splat(0.25)));
        assert_eq!(image.pixel(1, 1), color_to_rgba(Spectrum::ONE));

        // Coarser arriving late is ignored where finer data exists.
        let mut late = coarse;
        late.clear();
        late.add_sample(0, 0, Spectrum::ZERO);
        fb.merge_tasks(vec![late]);
        let image = fb.get_image();
        assert_eq!(image.pixel(0, 0), color_to_rgba(Spectrum::splat(0.25)));
        assert_eq!(image.pixel(1, 1), color_to_rgba(Spectrum::splat(0.5)));
    }

    #[test]
    fn test_splats_are_normalized_by_light_paths() {
        let fb = Framebuffer::new(2, 1, 2, 0).unwrap();
        let mut task = Task::new(PixelRange::new(UVec2::ZERO, UVec2::new(1, 0)), 1, 1);
        task.light_path_count = 8;
        task.splats.push(Splat {
            pixel: UVec2::new(1, 0),
            value: Spectrum::splat(2.0),
        });
        fb.merge_tasks(vec![task]);

        // 2 * (2 * 1) / 8 = 0.5 on the splatted pixel only.
        let image = fb.get_image();
        assert_eq!(image.pixel(0, 0), color_to_rgba(Spectrum::ZERO));
        assert_eq!(image.pixel(1, 0), color_to_rgba(Spectrum::splat(0.5)));
    }

    #[test]
    fn test_get_image_is_idempotent() {
        let fb = Framebuffer::new(8, 8, 4, 1).unwrap();
        let mut tasks = fb.get_tasks(2);
        for task in &mut tasks {
            fill(task, Spectrum::new(0.2, 0.4, 0.8));
        }
        fb.merge_tasks(tasks);

        let first = fb.get_image();
        let second = fb.get_image();
        assert_eq!(first.generation, fb.generation());
        assert_eq!(first.as_bytes(), second.as_bytes());
        assert_eq!(first.as_bytes().len(), 8 * 8 * 4);
    }

    #[test]
    fn test_materializer_publishes_in_background() {
        let fb = Framebuffer::new(8, 8, 8, 0).unwrap();
        let mut tasks = fb.get_tasks(1);
        fill(&mut tasks[0], Spectrum::ONE);
        fb.merge_tasks(tasks);

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while fb.shared.cached_image().is_none() {
            assert!(std::time::Instant::now() < deadline, "materializer never ran");
            thread::sleep(MATERIALIZE_INTERVAL);
        }
        assert_eq!(fb.get_image().generation, 1);
    }
}
