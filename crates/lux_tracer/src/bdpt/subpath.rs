//! Camera and light random walks.

use super::vertex::{Vertex, VertexKind};
use super::BdptParams;
use crate::bsdf::TransportMode;
use crate::light::LightRef;
use crate::medium::Medium;
use crate::{spectrum, Sampler, Scene, Spectrum};
use bumpalo::collections::Vec as BumpVec;
use bumpalo::Bump;
use lux_math::sampling::UNIFORM_SPHERE_PDF;
use lux_math::{abs_dot, Ray, Vec2, Vec3};

/// Upper bound on invisible boundaries crossed between two vertices.
const MAX_BOUNDARY_CROSSINGS: usize = 64;

/// Camera subpath with the auxiliary buffers of its first diffuse hit.
pub struct CameraSubpath<'a> {
    pub vertices: BumpVec<'a, Vertex<'a>>,
    pub albedo: Spectrum,
    pub normal: Vec3,
    /// 1 when the auxiliary values may be used for denoising, else 0
    pub denoise: f32,
}

/// Russian roulette and length limits shared by both walks.
#[derive(Debug, Clone, Copy)]
struct WalkLimits {
    max_vertices: usize,
    min_depth: u32,
    cont_prob: f32,
}

/// Extend `path` by scattering from its last vertex along `ray`.
///
/// `pdf_dir` is the solid-angle density of `ray`'s direction at the last
/// vertex. Returns the number of vertices appended.
#[allow(clippy::too_many_arguments)]
fn random_walk<'a>(
    scene: &'a Scene,
    mut ray: Ray,
    mut medium: Option<&'a dyn Medium>,
    mut beta: Spectrum,
    pdf_dir: f32,
    mode: TransportMode,
    limits: WalkLimits,
    sampler: &mut Sampler,
    arena: &'a Bump,
    path: &mut BumpVec<'a, Vertex<'a>>,
) -> usize {
    let start = path.len();
    if limits.max_vertices == 0 {
        return 0;
    }
    let mut bounces = 0;
    let mut pdf_fwd = pdf_dir;
    let mut crossings = 0;

    loop {
        if spectrum::is_black(beta) {
            break;
        }
        let hit = scene.closest_intersection(&ray);

        let t_max = hit.map_or(f32::INFINITY, |h| h.t);
        let mut scattering = None;
        if let Some(m) = medium {
            let ms = m.sample_scattering(ray.origin, ray.direction, t_max, sampler, arena);
            beta *= ms.throughput;
            scattering = ms.scattering;
        }
        if spectrum::is_black(beta) {
            break;
        }

        let Some(prev) = path.last().copied() else {
            break;
        };
        let wr = -ray.direction;
        let mut pdf_rev;

        if let (Some(ms), Some(m)) = (scattering, medium) {
            let mut vertex = Vertex::new(
                VertexKind::Medium {
                    pos: ms.pos,
                    wr,
                    medium: m,
                    phase: ms.phase,
                },
                beta,
                0.0,
            );
            vertex.pdf_fwd = prev.convert_density(pdf_fwd, &vertex);
            path.push(vertex);
            bounces += 1;
            if bounces >= limits.max_vertices {
                break;
            }
            let Some(sample) = ms.phase.sample(wr, mode, sampler.sample3()) else {
                break;
            };
            if sample.pdf <= 0.0 {
                break;
            }
            beta *= sample.f / sample.pdf;
            pdf_fwd = sample.pdf;
            pdf_rev = ms.phase.pdf(wr, sample.dir);
            ray = Ray::spawn(ms.pos, sample.dir);
        } else {
            let Some(hit) = hit else {
                if mode == TransportMode::Radiance && scene.environment().is_some() {
                    let vertex = Vertex::new(
                        VertexKind::EnvironmentLight { dir: ray.direction },
                        beta,
                        pdf_fwd,
                    );
                    path.push(vertex);
                }
                break;
            };

            let entity = hit.entity;
            if entity.material().is_pass_through() {
                crossings += 1;
                if crossings > MAX_BOUNDARY_CROSSINGS {
                    break;
                }
                medium = entity.media().toward(ray.direction, hit.normal);
                ray = Ray::spawn(hit.pos, ray.direction);
                continue;
            }
            crossings = 0;

            let bsdf = entity.material().bsdf(&hit, arena);
            let mut vertex = Vertex::new(
                VertexKind::Surface {
                    pos: hit.pos,
                    nor: hit.normal,
                    uv: hit.uv,
                    wr,
                    med_in: entity.media().inside.as_deref(),
                    med_out: entity.media().outside.as_deref(),
                    bsdf,
                    entity,
                },
                beta,
                0.0,
            );
            vertex.pdf_fwd = prev.convert_density(pdf_fwd, &vertex);
            path.push(vertex);
            bounces += 1;
            if bounces >= limits.max_vertices {
                break;
            }

            let Some(sample) = bsdf.sample(wr, mode, sampler.sample3()) else {
                break;
            };
            if sample.pdf <= 0.0 || spectrum::is_black(sample.f) {
                break;
            }
            beta *= sample.f * abs_dot(sample.dir, hit.normal) / sample.pdf;
            pdf_fwd = sample.pdf;
            pdf_rev = bsdf.pdf(wr, sample.dir);
            if sample.is_delta {
                if let Some(last) = path.last_mut() {
                    last.is_delta = true;
                }
                pdf_fwd = 0.0;
                pdf_rev = 0.0;
            }
            medium = entity.media().toward(sample.dir, hit.normal);
            ray = Ray::spawn(hit.pos, sample.dir);
        }

        // Density of reaching the previous vertex backwards from the new one
        let n = path.len();
        if n >= 2 {
            let vertex = path[n - 1];
            path[n - 2].pdf_bwd = vertex.convert_density(pdf_rev, &path[n - 2]);
        }

        if bounces as u32 >= limits.min_depth {
            if sampler.sample1() >= limits.cont_prob {
                break;
            }
            beta /= limits.cont_prob;
        }
    }
    path.len() - start
}

/// Trace a camera subpath starting with the primary `ray`.
///
/// The first vertex is the camera itself; at most `max_vertices` vertices
/// are produced in total.
pub fn build_camera_subpath<'a>(
    max_vertices: usize,
    ray: Ray,
    scene: &'a Scene,
    sampler: &mut Sampler,
    arena: &'a Bump,
    params: &BdptParams,
) -> CameraSubpath<'a> {
    let mut subpath = CameraSubpath {
        vertices: BumpVec::with_capacity_in(max_vertices, arena),
        albedo: Spectrum::ZERO,
        normal: Vec3::ZERO,
        denoise: 0.0,
    };
    if max_vertices == 0 {
        return subpath;
    }

    let camera = scene.camera();
    subpath.vertices.push(Vertex::new(
        VertexKind::Camera {
            pos: camera.position(),
            nor: camera.forward(),
        },
        Spectrum::ONE,
        1.0,
    ));
    let (_, pdf_dir) = camera.pdf_we(ray.direction);
    let limits = WalkLimits {
        max_vertices: max_vertices - 1,
        min_depth: params.min_depth,
        cont_prob: params.cont_prob,
    };
    random_walk(
        scene,
        ray,
        scene.camera_medium(),
        Spectrum::ONE,
        pdf_dir,
        TransportMode::Radiance,
        limits,
        sampler,
        arena,
        &mut subpath.vertices,
    );

    let first_diffuse = subpath.vertices.iter().skip(1).find_map(|v| match v.kind {
        VertexKind::Surface { nor, bsdf, entity, .. } if !bsdf.is_delta() => Some((nor, bsdf, entity)),
        _ => None,
    });
    if let Some((nor, bsdf, entity)) = first_diffuse {
        subpath.albedo = bsdf.albedo();
        subpath.normal = nor;
        subpath.denoise = if entity.no_denoise() { 0.0 } else { 1.0 };
    }
    subpath
}

/// Trace a light subpath from a light picked by power.
///
/// Returns an empty path when the scene has no lights or emission sampling
/// fails.
pub fn build_light_subpath<'a>(
    max_vertices: usize,
    scene: &'a Scene,
    sampler: &mut Sampler,
    arena: &'a Bump,
    params: &BdptParams,
) -> BumpVec<'a, Vertex<'a>> {
    let mut path = BumpVec::with_capacity_in(max_vertices, arena);
    if max_vertices == 0 {
        return path;
    }
    let Some((light, pdf_choice)) = scene.sample_light(sampler.sample1()) else {
        return path;
    };
    let u_pos = sampler.sample2();
    let u_dir = sampler.sample2();
    let Some(le) = light.sample_le(u_pos, u_dir, scene.world()) else {
        return path;
    };
    if le.pdf_pos <= 0.0 || le.pdf_dir <= 0.0 || pdf_choice <= 0.0 || spectrum::is_black(le.radiance)
    {
        return path;
    }

    let (kind, medium) = match light {
        LightRef::Area(entity) => (
            VertexKind::AreaLight {
                pos: le.origin,
                nor: le.normal,
                uv: Vec2::ZERO,
                entity,
            },
            entity.media().toward(le.dir, le.normal),
        ),
        LightRef::Environment(_) => (
            VertexKind::EnvironmentLight { dir: -le.dir },
            scene.camera_medium(),
        ),
    };
    path.push(Vertex::new(kind, le.radiance, le.pdf_pos * pdf_choice));

    let beta = le.radiance * abs_dot(le.normal, le.dir) / (pdf_choice * le.pdf_pos * le.pdf_dir);
    let limits = WalkLimits {
        max_vertices: max_vertices - 1,
        min_depth: params.min_depth,
        cont_prob: params.cont_prob,
    };
    let added = random_walk(
        scene,
        Ray::spawn(le.origin, le.dir),
        medium,
        beta,
        le.pdf_dir,
        TransportMode::Importance,
        limits,
        sampler,
        arena,
        &mut path,
    );

    // Environment paths start at infinity: densities are per direction
    if matches!(light, LightRef::Environment(_)) && added > 0 {
        let mut pdf = le.pdf_pos;
        if let Some(n) = path[1].normal() {
            pdf *= abs_dot(n, le.dir);
        }
        path[1].pdf_fwd = pdf;
        path[0].pdf_fwd = scene.light_pdf(light) * UNIFORM_SPHERE_PDF;
    }
    path
}
