//! Scene assembly and the queries the integrators rely on.

use crate::aggregate::{Aggregate, HitRecord, NativeAggregate};
use crate::bvh::BvhAggregate;
use crate::light::{EnvironmentLight, LightRef, WorldSphere};
use crate::medium::Medium;
use crate::{Entity, PerspectiveCamera, SceneError, Spectrum};
use lux_math::{Distribution1D, Ray, Vec3, RAY_EPSILON};
use std::sync::Arc;

/// Upper bound on pass-through surfaces crossed by one shadow ray.
const MAX_PASS_THROUGH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregateKind {
    #[default]
    Bvh,
    Native,
}

enum SceneLight {
    /// Index into the scene's entities
    Area(usize),
    Environment,
}

#[derive(Default)]
pub struct SceneBuilder {
    camera: Option<PerspectiveCamera>,
    entities: Vec<Entity>,
    environments: Vec<Box<dyn EnvironmentLight>>,
    camera_medium: Option<Arc<dyn Medium>>,
    aggregate: AggregateKind,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Camera is initialized during [`SceneBuilder::build`].
    pub fn with_camera(mut self, camera: PerspectiveCamera) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn add_entity(mut self, entity: Entity) -> Self {
        self.entities.push(entity);
        self
    }

    pub fn with_environment(mut self, env: impl EnvironmentLight + 'static) -> Self {
        self.environments.push(Box::new(env));
        self
    }

    /// Medium the camera sits in. Also used for environment emission.
    pub fn with_camera_medium(mut self, medium: Arc<dyn Medium>) -> Self {
        self.camera_medium = Some(medium);
        self
    }

    pub fn with_aggregate(mut self, kind: AggregateKind) -> Self {
        self.aggregate = kind;
        self
    }

    pub fn build(self) -> Result<Scene, SceneError> {
        let mut camera = self.camera.ok_or(SceneError::MissingCamera)?;
        camera.initialize()?;

        if self.environments.len() > 1 {
            return Err(SceneError::DuplicateEnvironment);
        }
        let environment = self.environments.into_iter().next();

        let mut lights = Vec::new();
        let entities: Vec<Arc<Entity>> = self
            .entities
            .into_iter()
            .enumerate()
            .map(|(i, mut entity)| {
                if entity.is_emissive() {
                    entity.light_index = Some(lights.len());
                    lights.push(SceneLight::Area(i));
                }
                Arc::new(entity)
            })
            .collect();

        let aggregate: Box<dyn Aggregate> = match self.aggregate {
            AggregateKind::Bvh => Box::new(BvhAggregate::build(&entities)),
            AggregateKind::Native => Box::new(NativeAggregate::build(&entities)),
        };

        let bound = aggregate.world_bound().include(camera.position());
        let world = WorldSphere {
            center: bound.centroid(),
            radius: ((bound.max() - bound.min()).length() * 0.5).max(1e-3),
        };

        let environment_index = environment.as_ref().map(|_| {
            lights.push(SceneLight::Environment);
            lights.len() - 1
        });

        let mut scene = Scene {
            camera,
            entities,
            aggregate,
            environment,
            environment_index,
            camera_medium: self.camera_medium,
            lights,
            light_distribution: Distribution1D::new(&[]),
            world,
        };
        let powers: Vec<f32> = (0..scene.lights.len())
            .map(|i| scene.light_at(i).map_or(0.0, |light| light.power(&scene.world)))
            .collect();
        scene.light_distribution = Distribution1D::new(&powers);

        log::info!(
            "Scene built: {} entities, {} lights, world radius {:.3}",
            scene.entities.len(),
            scene.lights.len(),
            scene.world.radius
        );
        Ok(scene)
    }
}

/// Immutable scene shared by all render workers.
pub struct Scene {
    camera: PerspectiveCamera,
    entities: Vec<Arc<Entity>>,
    aggregate: Box<dyn Aggregate>,
    environment: Option<Box<dyn EnvironmentLight>>,
    environment_index: Option<usize>,
    camera_medium: Option<Arc<dyn Medium>>,
    lights: Vec<SceneLight>,
    light_distribution: Distribution1D,
    world: WorldSphere,
}

impl Scene {
    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn entities(&self) -> &[Arc<Entity>] {
        &self.entities
    }

    pub fn camera_medium(&self) -> Option<&dyn Medium> {
        self.camera_medium.as_deref()
    }

    pub fn environment(&self) -> Option<&dyn EnvironmentLight> {
        self.environment.as_deref()
    }

    pub fn world(&self) -> &WorldSphere {
        &self.world
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    pub fn has_intersection(&self, ray: &Ray) -> bool {
        self.aggregate.has_intersection(ray)
    }

    pub fn closest_intersection(&self, ray: &Ray) -> Option<HitRecord<'_>> {
        self.aggregate.closest_intersection(ray)
    }

    fn light_at(&self, index: usize) -> Option<LightRef<'_>> {
        match self.lights.get(index)? {
            SceneLight::Area(entity) => Some(LightRef::Area(self.entities[*entity].as_ref())),
            SceneLight::Environment => self.environment.as_deref().map(LightRef::Environment),
        }
    }

    /// Pick a light proportionally to its power. Returns the light and the
    /// probability of having picked it.
    pub fn sample_light(&self, u: f32) -> Option<(LightRef<'_>, f32)> {
        let (index, pdf) = self.light_distribution.sample_discrete(u)?;
        Some((self.light_at(index)?, pdf))
    }

    /// Probability that [`Scene::sample_light`] picks `light`.
    pub fn light_pdf(&self, light: LightRef<'_>) -> f32 {
        let index = match light {
            LightRef::Area(entity) => entity.light_index,
            LightRef::Environment(_) => self.environment_index,
        };
        index.map_or(0.0, |i| self.light_distribution.discrete_pdf(i))
    }

    /// Transmittance from `origin` along unit `dir` for `dist` (may be infinite),
    /// starting in `medium`. Pass-through surfaces switch media; any other
    /// surface blocks.
    pub fn transmittance(
        &self,
        origin: Vec3,
        dir: Vec3,
        dist: f32,
        medium: Option<&dyn Medium>,
    ) -> Spectrum {
        let mut tr = Spectrum::ONE;
        let mut origin = origin;
        let mut remaining = dist;
        let mut medium = medium;

        for _ in 0..MAX_PASS_THROUGH {
            let ray = Ray::with_range(origin, dir, RAY_EPSILON, remaining - RAY_EPSILON);
            match self.closest_intersection(&ray) {
                None => {
                    if let Some(m) = medium {
                        tr *= m.tr(origin, origin + dir * remaining);
                    }
                    return tr;
                }
                Some(hit) => {
                    if !hit.entity.material().is_pass_through() {
                        return Spectrum::ZERO;
                    }
                    if let Some(m) = medium {
                        tr *= m.tr(origin, hit.pos);
                    }
                    medium = hit.entity.media().toward(dir, hit.normal);
                    origin = hit.pos;
                    remaining -= hit.t;
                }
            }
        }
        Spectrum::ZERO
    }

    /// Transmittance of the segment between two points.
    pub fn transmittance_between(&self, a: Vec3, b: Vec3, medium: Option<&dyn Medium>) -> Spectrum {
        let d = b - a;
        let dist = d.length();
        if dist == 0.0 {
            return Spectrum::ONE;
        }
        self.transmittance(a, d / dist, dist, medium)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::ConstantEnvironment;
    use crate::medium::AbsorptionMedium;
    use crate::{IdealDiffuse, InvisibleSurface, MediumInterface, Quad, Sphere};
    use lux_math::Vec2;

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera::new()
            .with_resolution(4, 4)
            .with_position(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y)
            .with_fov(40.0)
    }

    fn diffuse() -> Arc<IdealDiffuse> {
        Arc::new(IdealDiffuse::new(Spectrum::splat(0.5)))
    }

    #[test]
    fn test_missing_camera() {
        assert!(matches!(SceneBuilder::new().build(), Err(SceneError::MissingCamera)));
    }

    #[test]
    fn test_duplicate_environment() {
        let result = SceneBuilder::new()
            .with_camera(camera())
            .with_environment(ConstantEnvironment::new(Spectrum::ONE))
            .with_environment(ConstantEnvironment::new(Spectrum::ONE))
            .build();
        assert!(matches!(result, Err(SceneError::DuplicateEnvironment)));
    }

    #[test]
    fn test_light_selection_by_power() {
        let small = Entity::new(Quad::new(Vec3::ZERO, Vec3::X, Vec3::Y).unwrap(), diffuse())
            .with_emission(Spectrum::ONE)
            .unwrap();
        let large = Entity::new(
            Quad::new(Vec3::new(0.0, 0.0, -2.0), Vec3::X * 3.0, Vec3::Y).unwrap(),
            diffuse(),
        )
        .with_emission(Spectrum::ONE)
        .unwrap();
        let scene = SceneBuilder::new()
            .with_camera(camera())
            .add_entity(small)
            .add_entity(large)
            .build()
            .unwrap();

        assert_eq!(scene.light_count(), 2);
        let (light, pdf) = scene.sample_light(0.9).unwrap();
        assert!((pdf - 0.75).abs() < 1e-5);
        assert!((scene.light_pdf(light) - pdf).abs() < 1e-6);
        let (_, pdf) = scene.sample_light(0.1).unwrap();
        assert!((pdf - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_no_lights() {
        let scene = SceneBuilder::new()
            .with_camera(camera())
            .add_entity(Entity::new(Sphere::new(Vec3::ZERO, 1.0).unwrap(), diffuse()))
            .build()
            .unwrap();
        assert_eq!(scene.light_count(), 0);
        assert!(scene.sample_light(0.5).is_none());
    }

    #[test]
    fn test_transmittance_through_boundary() {
        // Absorbing slab bounded by two invisible quads at z = 1 and z = -1
        let fog: Arc<dyn Medium> = Arc::new(AbsorptionMedium::new(Spectrum::splat(0.5)).unwrap());
        let boundary = |z: f32, facing: f32| {
            let (u, v) = if facing > 0.0 { (Vec3::X, Vec3::Y) } else { (Vec3::Y, Vec3::X) };
            Entity::new(
                Quad::new(Vec3::new(-5.0, -5.0, z), u * 10.0, v * 10.0).unwrap(),
                Arc::new(InvisibleSurface),
            )
            .with_media(MediumInterface::new(Some(fog.clone()), None))
        };
        let scene = SceneBuilder::new()
            .with_camera(camera())
            .add_entity(boundary(1.0, 1.0))
            .add_entity(boundary(-1.0, -1.0))
            .build()
            .unwrap();

        let tr = scene.transmittance_between(Vec3::new(0.0, 0.0, 3.0), Vec3::new(0.0, 0.0, -3.0), None);
        assert!((tr.x - (-1.0f32).exp()).abs() < 1e-3, "tr {tr}");

        // Opaque blocker
        let blocked = SceneBuilder::new()
            .with_camera(camera())
            .add_entity(Entity::new(
                Quad::new(Vec3::new(-5.0, -5.0, 0.0), Vec3::X * 10.0, Vec3::Y * 10.0).unwrap(),
                diffuse(),
            ))
            .build()
            .unwrap();
        let tr = blocked.transmittance_between(Vec3::new(0.0, 0.0, 3.0), Vec3::new(0.0, 0.0, -3.0), None);
        assert_eq!(tr, Spectrum::ZERO);
        let tr = blocked.transmittance(Vec3::new(0.0, 0.0, 3.0), Vec3::Z, f32::INFINITY, None);
        assert_eq!(tr, Spectrum::ONE);
    }

    #[test]
    fn test_environment_light_registered() {
        let scene = SceneBuilder::new()
            .with_camera(camera())
            .with_environment(ConstantEnvironment::new(Spectrum::splat(0.5)))
            .build()
            .unwrap();
        let (light, pdf) = scene.sample_light(0.3).unwrap();
        assert!(matches!(light, LightRef::Environment(_)));
        assert_eq!(pdf, 1.0);
        let s = light.sample_li(Vec3::ZERO, Vec2::splat(0.5), scene.world()).unwrap();
        assert!(s.dist.is_infinite());
    }

    #[test]
    fn test_native_aggregate_matches_bvh() {
        let build = |kind: AggregateKind| {
            let mut builder = SceneBuilder::new().with_camera(camera()).with_aggregate(kind);
            for i in 0..12 {
                let x = (i % 4) as f32 * 1.5 - 2.25;
                let y = (i / 4) as f32 * 1.5 - 1.5;
                builder = builder.add_entity(Entity::new(
                    Sphere::new(Vec3::new(x, y, -(i as f32) * 0.3), 0.6).unwrap(),
                    diffuse(),
                ));
            }
            builder
                .add_entity(Entity::new(
                    Quad::new(Vec3::new(-5.0, -5.0, -4.0), Vec3::X * 10.0, Vec3::Y * 10.0).unwrap(),
                    diffuse(),
                ))
                .build()
                .unwrap()
        };
        let bvh = build(AggregateKind::Bvh);
        let native = build(AggregateKind::Native);
        assert_eq!(bvh.world().radius, native.world().radius);

        for y in 0..16 {
            for x in 0..16 {
                let target = Vec3::new(x as f32 * 0.5 - 4.0, y as f32 * 0.5 - 4.0, -4.0);
                let origin = Vec3::new(0.3, -0.2, 5.0);
                let ray = Ray::new(origin, (target - origin).normalize());
                assert_eq!(bvh.has_intersection(&ray), native.has_intersection(&ray));
                let a = bvh.closest_intersection(&ray).map(|h| h.t);
                let b = native.closest_intersection(&ray).map(|h| h.t);
                match (a, b) {
                    (Some(ta), Some(tb)) => assert!((ta - tb).abs() < 1e-4),
                    (None, None) => {}
                    other => panic!("aggregates disagree: {other:?}"),
                }
            }
        }
    }
}
