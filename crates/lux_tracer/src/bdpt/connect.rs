//! Strategy evaluation for one (s, t) pair and its balance-heuristic weight.
//!
//! `s` counts camera vertices and `t` light vertices taken from the two
//! subpaths. Subpaths are never modified; the vertices whose densities change
//! under a strategy are copied and patched locally.

use super::vertex::{Vertex, VertexKind};
use crate::bsdf::TransportMode;
use crate::light::LightRef;
use crate::{spectrum, Sampler, Scene, Spectrum};
use lux_math::{abs_dot, Vec2};

/// Where a strategy's radiance lands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Contribution {
    /// Radiance for the pixel that generated the camera subpath
    Pixel(Spectrum),
    /// Radiance for the film point reached by light tracing
    Splat(Vec2, Spectrum),
}

/// Geometry term between two finite vertices, including visibility.
fn geometry_term<'a>(scene: &'a Scene, a: &Vertex<'a>, b: &Vertex<'a>) -> Spectrum {
    let (Some(pa), Some((w, dist2))) = (a.position(), a.direction_to(b)) else {
        return Spectrum::ZERO;
    };
    let mut g = 1.0 / dist2;
    if let Some(n) = a.normal() {
        g *= abs_dot(n, w);
    }
    if let Some(n) = b.normal() {
        g *= abs_dot(n, w);
    }
    g * scene.transmittance(pa, w, dist2.sqrt(), a.medium_toward(scene, w))
}

/// Fraction of the balance heuristic for strategy (s, t).
///
/// `sampled` is the endpoint created for the strategy itself: the light
/// vertex when `t == 1`, the camera vertex when `s == 1`.
pub fn mis_weight<'a>(
    scene: &Scene,
    cam: &[Vertex<'a>],
    lig: &[Vertex<'a>],
    sampled: Option<&Vertex<'a>>,
    s: usize,
    t: usize,
) -> f32 {
    if s + t == 2 {
        return 1.0;
    }
    let remap0 = |f: f32| if f != 0.0 { f } else { 1.0 };

    let mut pt = cam[s - 1];
    let mut qs = if t > 0 { Some(lig[t - 1]) } else { None };
    match sampled {
        Some(v) if t == 1 => qs = Some(*v),
        Some(v) if s == 1 => pt = *v,
        _ => {}
    }
    let mut pt_minus = if s > 1 { Some(cam[s - 2]) } else { None };
    let mut qs_minus = if t > 1 { Some(lig[t - 2]) } else { None };

    // Connection endpoints are sampled, never reached through a delta lobe
    pt.is_delta = false;
    if let Some(q) = qs.as_mut() {
        q.is_delta = false;
    }

    pt.pdf_bwd = match &qs {
        Some(q) => q.pdf(scene, qs_minus.as_ref(), &pt),
        None => pt.pdf_light_origin(scene),
    };
    if let Some(pm) = pt_minus.as_mut() {
        pm.pdf_bwd = match &qs {
            Some(q) => pt.pdf(scene, Some(q), pm),
            None => pt.pdf_light(scene, pm),
        };
    }
    if let Some(q) = qs.as_mut() {
        q.pdf_bwd = pt.pdf(scene, pt_minus.as_ref(), q);
    }
    if let (Some(qm), Some(q)) = (qs_minus.as_mut(), &qs) {
        qm.pdf_bwd = q.pdf(scene, Some(&pt), qm);
    }

    let cam_at = |i: usize| {
        if i + 1 == s {
            pt
        } else if i + 2 == s {
            pt_minus.unwrap_or(cam[i])
        } else {
            cam[i]
        }
    };
    let lig_at = |i: usize| {
        if i + 1 == t {
            qs.unwrap_or(lig[i])
        } else if i + 2 == t {
            qs_minus.unwrap_or(lig[i])
        } else {
            lig[i]
        }
    };

    let mut sum_ri = 0.0;

    // Strategies with fewer camera vertices
    let mut ri = 1.0;
    for i in (1..s).rev() {
        let v = cam_at(i);
        ri *= remap0(v.pdf_bwd) / remap0(v.pdf_fwd);
        if !v.is_delta && !cam_at(i - 1).is_delta {
            sum_ri += ri;
        }
    }

    // Strategies with fewer light vertices
    let mut ri = 1.0;
    for i in (0..t).rev() {
        let v = lig_at(i);
        ri *= remap0(v.pdf_bwd) / remap0(v.pdf_fwd);
        let prev_delta = i > 0 && lig_at(i - 1).is_delta;
        if !v.is_delta && !prev_delta {
            sum_ri += ri;
        }
    }

    1.0 / (1.0 + sum_ri)
}

/// Evaluate strategy (s, t). Returns `None` when the strategy carries no
/// energy or produced a non-finite value.
pub fn connect<'a>(
    scene: &'a Scene,
    cam: &[Vertex<'a>],
    lig: &[Vertex<'a>],
    s: usize,
    t: usize,
    sampler: &mut Sampler,
    use_mis: bool,
) -> Option<Contribution> {
    if s == 0 || s > cam.len() || t > lig.len() {
        return None;
    }
    let pt = &cam[s - 1];
    if s > 1 && t > 0 && pt.is_infinite_light() {
        return None;
    }

    let mut sampled: Option<Vertex<'a>> = None;
    let mut film = None;
    let l = if t == 0 {
        if s < 2 || !pt.is_light() {
            return None;
        }
        pt.le(scene, &cam[s - 2]) * pt.accu_coef
    } else if s == 1 {
        let qs = &lig[t - 1];
        if !qs.is_connectible() || !qs.is_scattering_type() {
            return None;
        }
        let qs_pos = qs.position()?;
        let camera = scene.camera();
        let cwi = camera.sample_wi(qs_pos)?;
        if cwi.pdf <= 0.0 || spectrum::is_black(cwi.we) {
            return None;
        }
        let cam_vertex = Vertex::new(
            VertexKind::Camera {
                pos: camera.position(),
                nor: camera.forward(),
            },
            cwi.we / cwi.pdf,
            0.0,
        );
        let mut l = qs.accu_coef * qs.f(&cam_vertex, TransportMode::Importance) * cam_vertex.accu_coef;
        if let Some(n) = qs.normal() {
            l *= abs_dot(n, cwi.wi);
        }
        if !spectrum::is_black(l) {
            l *= scene.transmittance(qs_pos, cwi.wi, cwi.dist, qs.medium_toward(scene, cwi.wi));
        }
        sampled = Some(cam_vertex);
        film = Some(cwi.film);
        l
    } else if t == 1 {
        if !pt.is_connectible() || !pt.is_scattering_type() {
            return None;
        }
        let pt_pos = pt.position()?;
        let (light, pdf_choice) = scene.sample_light(sampler.sample1())?;
        let ls = light.sample_li(pt_pos, sampler.sample2(), scene.world())?;
        if ls.pdf <= 0.0 || pdf_choice <= 0.0 || spectrum::is_black(ls.radiance) {
            return None;
        }
        let kind = match light {
            LightRef::Area(entity) => VertexKind::AreaLight {
                pos: ls.pos,
                nor: ls.normal,
                uv: Vec2::ZERO,
                entity,
            },
            LightRef::Environment(_) => VertexKind::EnvironmentLight { dir: ls.wi },
        };
        let mut light_vertex = Vertex::new(kind, ls.radiance / (ls.pdf * pdf_choice), 0.0);
        light_vertex.pdf_fwd = light_vertex.pdf_light_origin(scene);

        let mut l = pt.accu_coef * pt.f(&light_vertex, TransportMode::Radiance) * light_vertex.accu_coef;
        if let Some(n) = pt.normal() {
            l *= abs_dot(n, ls.wi);
        }
        if !spectrum::is_black(l) {
            l *= scene.transmittance(pt_pos, ls.wi, ls.dist, pt.medium_toward(scene, ls.wi));
        }
        sampled = Some(light_vertex);
        l
    } else {
        let qs = &lig[t - 1];
        if !pt.is_connectible() || !qs.is_connectible() {
            return None;
        }
        if !pt.is_scattering_type() || !qs.is_scattering_type() {
            return None;
        }
        let mut l = qs.accu_coef
            * qs.f(pt, TransportMode::Importance)
            * pt.f(qs, TransportMode::Radiance)
            * pt.accu_coef;
        if !spectrum::is_black(l) {
            l *= geometry_term(scene, pt, qs);
        }
        l
    };

    if !spectrum::is_valid_contribution(l) {
        return None;
    }

    let weight = if s + t == 2 {
        1.0
    } else if use_mis {
        mis_weight(scene, cam, lig, sampled.as_ref(), s, t)
    } else {
        1.0 / (s + t) as f32
    };
    let l = l * weight;
    if !spectrum::is_valid_contribution(l) {
        return None;
    }

    Some(match film {
        Some(film) => Contribution::Splat(film, l),
        None => Contribution::Pixel(l),
    })
}
