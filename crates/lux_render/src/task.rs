//! Render tasks for progressive refinement.
//!
//! A task is a rectangle of coarse pixels. A coarse pixel at `pixel_size`
//! `p` stands for a `p x p` block of final pixels; the image starts out
//! blocky and every completed task is split into four children at half
//! the pixel size until it reaches full resolution.

use lux_math::UVec2;
use lux_tracer::Spectrum;
use rand::seq::SliceRandom;
use rand::Rng;

/// Samples per pixel never grow past this for a full-resolution task.
pub const MAX_TASK_SPP: u32 = 8;

/// Number of times an initial block may be coarsened.
const MAX_INITIAL_HALVINGS: u32 = 4;

/// Inclusive rectangle in coarse-pixel units of the owning task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRange {
    pub low: UVec2,
    pub high: UVec2,
}

impl PixelRange {
    pub fn new(low: UVec2, high: UVec2) -> Self {
        debug_assert!(low.x <= high.x && low.y <= high.y);
        Self { low, high }
    }

    pub fn width(&self) -> u32 {
        self.high.x - self.low.x + 1
    }

    pub fn height(&self) -> u32 {
        self.high.y - self.low.y + 1
    }

    pub fn size(&self) -> UVec2 {
        UVec2::new(self.width(), self.height())
    }

    pub fn area(&self) -> usize {
        self.width() as usize * self.height() as usize
    }
}

/// Light-tracing contribution landing on a final-resolution pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Splat {
    pub pixel: UVec2,
    pub value: Spectrum,
}

/// A unit of work handed to a render worker.
#[derive(Debug, Clone)]
pub struct Task {
    pub pixel_range: PixelRange,
    /// Final pixels per coarse pixel along each axis, always a power of two
    pub pixel_size: u32,
    /// Samples per coarse pixel
    pub spp: u32,
    /// Summed radiance per coarse pixel, row-major within `pixel_range`
    pub value: Vec<Spectrum>,
    /// Sample count per coarse pixel
    pub weight: Vec<f32>,
    pub splats: Vec<Splat>,
    /// Light subpaths traced while rendering this task
    pub light_path_count: u64,
}

impl Task {
    pub fn new(pixel_range: PixelRange, pixel_size: u32, spp: u32) -> Self {
        let area = pixel_range.area();
        Self {
            pixel_range,
            pixel_size,
            spp,
            value: vec![Spectrum::ZERO; area],
            weight: vec![0.0; area],
            splats: Vec::new(),
            light_path_count: 0,
        }
    }

    /// Row-major index of coarse pixel `(cx, cy)` in the result buffers.
    #[inline]
    pub fn index(&self, cx: u32, cy: u32) -> usize {
        let local_x = cx - self.pixel_range.low.x;
        let local_y = cy - self.pixel_range.low.y;
        local_y as usize * self.pixel_range.width() as usize + local_x as usize
    }

    /// Coarse pixel coordinates in row-major order.
    pub fn coarse_pixels(&self) -> impl Iterator<Item = (u32, u32)> {
        let PixelRange { low, high } = self.pixel_range;
        (low.y..=high.y).flat_map(move |cy| (low.x..=high.x).map(move |cx| (cx, cy)))
    }

    /// Final-resolution block `[min, max)` covered by coarse pixel `(cx, cy)`.
    pub fn final_block(&self, cx: u32, cy: u32) -> (UVec2, UVec2) {
        let min = UVec2::new(cx, cy) * self.pixel_size;
        (min, min + UVec2::splat(self.pixel_size))
    }

    pub fn add_sample(&mut self, cx: u32, cy: u32, value: Spectrum) {
        let i = self.index(cx, cy);
        self.value[i] += value;
        self.weight[i] += 1.0;
    }

    /// Drop results so the task can be rendered again.
    pub fn clear(&mut self) {
        self.value.fill(Spectrum::ZERO);
        self.weight.fill(0.0);
        self.splats.clear();
        self.light_path_count = 0;
    }

    pub fn is_full_resolution(&self) -> bool {
        self.pixel_size == 1
    }

    /// Four children at half the pixel size covering the same final pixels.
    ///
    /// Each child keeps the parent's range size; together they span the
    /// doubled range `[2 * low, 2 * high + 1]`.
    pub fn split(&self) -> [Task; 4] {
        debug_assert!(self.pixel_size > 1, "cannot split a full-resolution task");
        let size = self.pixel_range.size();
        let base = self.pixel_range.low * 2;
        let pixel_size = self.pixel_size / 2;
        let child = |ox: u32, oy: u32| {
            let low = base + UVec2::new(ox, oy) * size;
            Task::new(PixelRange::new(low, low + size - UVec2::ONE), pixel_size, 1)
        };
        [child(0, 0), child(1, 0), child(0, 1), child(1, 1)]
    }
}

/// Cover a `width x height` image with blocks of `grid_size` pixels,
/// coarsened as far as alignment allows, in random order.
pub fn build_initial_tasks<R: Rng + ?Sized>(
    width: u32,
    height: u32,
    grid_size: u32,
    rng: &mut R,
) -> Vec<Task> {
    let mut tasks = Vec::new();

    let mut y = 0;
    while y < height {
        let mut x = 0;
        while x < width {
            let mut low = UVec2::new(x, y);
            let mut range = UVec2::new(grid_size.min(width - x), grid_size.min(height - y));
            let mut pixel_size = 1;

            for _ in 0..MAX_INITIAL_HALVINGS {
                let halvable = range.cmpgt(UVec2::ONE).all()
                    && low.x % 2 == 0
                    && low.y % 2 == 0
                    && range.x % 2 == 0
                    && range.y % 2 == 0;
                if !halvable {
                    break;
                }
                low /= 2;
                range /= 2;
                pixel_size *= 2;
            }

            tasks.push(Task::new(
                PixelRange::new(low, low + range - UVec2::ONE),
                pixel_size,
                1,
            ));
            x += grid_size;
        }
        y += grid_size;
    }

    tasks.shuffle(rng);
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    /// Count how often each final pixel is covered by `tasks`.
    fn coverage(tasks: &[Task], width: u32, height: u32) -> Vec<u32> {
        let mut counts = vec![0u32; width as usize * height as usize];
        for task in tasks {
            for (cx, cy) in task.coarse_pixels() {
                let (min, max) = task.final_block(cx, cy);
                for y in min.y..max.y {
                    for x in min.x..max.x {
                        assert!(x < width && y < height, "block leaves the image");
                        counts[y as usize * width as usize + x as usize] += 1;
                    }
                }
            }
        }
        counts
    }

    #[test]
    fn test_split_into_quadrants() {
        let task = Task::new(PixelRange::new(UVec2::ZERO, UVec2::splat(31)), 32, 5);
        let children = task.split();

        let expected = [
            (UVec2::new(0, 0), UVec2::new(31, 31)),
            (UVec2::new(32, 0), UVec2::new(63, 31)),
            (UVec2::new(0, 32), UVec2::new(31, 63)),
            (UVec2::new(32, 32), UVec2::new(63, 63)),
        ];
        for (child, (low, high)) in children.iter().zip(expected) {
            assert_eq!(child.pixel_size, 16);
            assert_eq!(child.spp, 1);
            assert_eq!(child.pixel_range, PixelRange::new(low, high));
            assert_eq!(child.value.len(), 32 * 32);
        }

        let parent = coverage(std::slice::from_ref(&task), 1024, 1024);
        let split = coverage(&children, 1024, 1024);
        assert_eq!(parent, split);
    }

    #[test]
    fn test_split_offset_range() {
        let task = Task::new(PixelRange::new(UVec2::new(3, 1), UVec2::new(4, 2)), 4, 1);
        let parent = coverage(std::slice::from_ref(&task), 32, 16);
        let children = task.split();
        assert!(children.iter().all(|c| c.pixel_size == 2));
        assert_eq!(parent, coverage(&children, 32, 16));
    }

    #[test]
    fn test_initial_tasks_cover_image_once() {
        let mut rng = SmallRng::seed_from_u64(7);
        for (width, height) in [(64, 64), (100, 75), (33, 1), (17, 40)] {
            let tasks = build_initial_tasks(width, height, 32, &mut rng);
            let counts = coverage(&tasks, width, height);
            assert!(counts.iter().all(|&c| c == 1), "{width}x{height}");
        }
    }

    #[test]
    fn test_initial_tasks_are_coarsened() {
        let mut rng = SmallRng::seed_from_u64(1);
        let tasks = build_initial_tasks(100, 75, 32, &mut rng);
        assert_eq!(tasks.len(), 4 * 3);

        for task in &tasks {
            assert!(task.pixel_size.is_power_of_two());
            assert!(task.pixel_size <= 16);
            assert_eq!(task.spp, 1);
            assert_eq!(task.value.len(), task.pixel_range.area());
        }
        // A full interior block halves four times.
        assert!(tasks.iter().any(|t| t.pixel_size == 16 && t.pixel_range.size() == UVec2::splat(2)));
        // 100 - 96 = 4 wide column at x = 96 coarsens twice; 75 - 64 = 11 tall row cannot.
        assert!(tasks
            .iter()
            .any(|t| t.pixel_size == 1 && t.pixel_range.low.y == 64));
    }

    #[test]
    fn test_initial_order_depends_on_seed() {
        let order = |seed| {
            let mut rng = SmallRng::seed_from_u64(seed);
            build_initial_tasks(256, 256, 32, &mut rng)
                .iter()
                .map(|t| t.pixel_range.low * t.pixel_size)
                .collect::<Vec<_>>()
        };
        assert_eq!(order(3), order(3));
        assert_ne!(order(3), order(4));
    }

    #[test]
    fn test_add_sample_and_clear() {
        let mut task = Task::new(PixelRange::new(UVec2::new(2, 2), UVec2::new(3, 3)), 1, 1);
        task.add_sample(3, 2, Spectrum::ONE);
        task.add_sample(3, 2, Spectrum::ONE);
        assert_eq!(task.index(3, 2), 1);
        assert_eq!(task.value[1], Spectrum::splat(2.0));
        assert_eq!(task.weight[1], 2.0);

        task.clear();
        assert!(task.weight.iter().all(|&w| w == 0.0));
        assert!(task.splats.is_empty());
    }
}
