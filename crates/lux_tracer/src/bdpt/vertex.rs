//! Path vertices and the density queries used to re-derive strategy pdfs.

use crate::bsdf::{Bsdf, TransportMode};
use crate::light::{self, LightRef};
use crate::medium::Medium;
use crate::{Entity, Scene, Spectrum};
use lux_math::sampling::UNIFORM_SPHERE_PDF;
use lux_math::{abs_dot, Vec2, Vec3};

/// Kind-specific payload of a [`Vertex`].
#[derive(Clone, Copy)]
pub enum VertexKind<'a> {
    Camera {
        pos: Vec3,
        /// Viewing direction
        nor: Vec3,
    },
    AreaLight {
        pos: Vec3,
        nor: Vec3,
        uv: Vec2,
        entity: &'a Entity,
    },
    EnvironmentLight {
        /// Direction towards the sampled point at infinity
        dir: Vec3,
    },
    Surface {
        pos: Vec3,
        /// Outward geometric normal
        nor: Vec3,
        uv: Vec2,
        /// Unit direction back towards the previous vertex
        wr: Vec3,
        med_in: Option<&'a dyn Medium>,
        med_out: Option<&'a dyn Medium>,
        bsdf: &'a dyn Bsdf,
        entity: &'a Entity,
    },
    Medium {
        pos: Vec3,
        /// Unit direction back towards the previous vertex
        wr: Vec3,
        medium: &'a dyn Medium,
        phase: &'a dyn Bsdf,
    },
}

/// One bounce of a camera or light subpath.
///
/// `pdf_fwd` is the density of this vertex under the strategy that created
/// it, `pdf_bwd` the density of generating it from the opposite direction.
/// Both are in area measure except for vertices at infinity.
#[derive(Clone, Copy)]
pub struct Vertex<'a> {
    pub kind: VertexKind<'a>,
    pub accu_coef: Spectrum,
    pub pdf_fwd: f32,
    pub pdf_bwd: f32,
    pub is_delta: bool,
}

impl<'a> Vertex<'a> {
    pub fn new(kind: VertexKind<'a>, accu_coef: Spectrum, pdf_fwd: f32) -> Self {
        Self {
            kind,
            accu_coef,
            pdf_fwd,
            pdf_bwd: 0.0,
            is_delta: false,
        }
    }

    /// Position of finite vertices.
    pub fn position(&self) -> Option<Vec3> {
        match self.kind {
            VertexKind::Camera { pos, .. }
            | VertexKind::AreaLight { pos, .. }
            | VertexKind::Surface { pos, .. }
            | VertexKind::Medium { pos, .. } => Some(pos),
            VertexKind::EnvironmentLight { .. } => None,
        }
    }

    /// Geometric normal of vertices on a surface.
    pub fn normal(&self) -> Option<Vec3> {
        match self.kind {
            VertexKind::AreaLight { nor, .. } | VertexKind::Surface { nor, .. } => Some(nor),
            _ => None,
        }
    }

    pub fn is_on_surface(&self) -> bool {
        self.normal().is_some()
    }

    pub fn is_infinite_light(&self) -> bool {
        matches!(self.kind, VertexKind::EnvironmentLight { .. })
    }

    /// Surface and medium vertices; the only interior connection points.
    pub fn is_scattering_type(&self) -> bool {
        matches!(self.kind, VertexKind::Surface { .. } | VertexKind::Medium { .. })
    }

    /// Light endpoints and surface hits on emitters.
    pub fn is_light(&self) -> bool {
        match self.kind {
            VertexKind::AreaLight { .. } | VertexKind::EnvironmentLight { .. } => true,
            VertexKind::Surface { entity, .. } => entity.is_emissive(),
            _ => false,
        }
    }

    pub fn is_connectible(&self) -> bool {
        match self.kind {
            VertexKind::Surface { bsdf, .. } => !bsdf.is_delta(),
            _ => true,
        }
    }

    /// Unit direction from `self` towards `other`, with its squared distance
    /// (infinite when either end is at infinity).
    pub fn direction_to(&self, other: &Vertex<'_>) -> Option<(Vec3, f32)> {
        if let VertexKind::EnvironmentLight { dir } = other.kind {
            return Some((dir, f32::INFINITY));
        }
        if let VertexKind::EnvironmentLight { dir } = self.kind {
            return Some((-dir, f32::INFINITY));
        }
        let d = other.position()? - self.position()?;
        let dist2 = d.length_squared();
        if dist2 == 0.0 {
            return None;
        }
        Some((d / dist2.sqrt(), dist2))
    }

    /// Medium entered when leaving this vertex along `dir`.
    pub fn medium_toward(&self, scene: &'a Scene, dir: Vec3) -> Option<&'a dyn Medium> {
        match self.kind {
            VertexKind::Surface {
                nor,
                med_in,
                med_out,
                ..
            } => {
                if dir.dot(nor) > 0.0 {
                    med_out
                } else {
                    med_in
                }
            }
            VertexKind::Medium { medium, .. } => Some(medium),
            VertexKind::AreaLight { nor, entity, .. } => entity.media().toward(dir, nor),
            VertexKind::Camera { .. } | VertexKind::EnvironmentLight { .. } => {
                scene.camera_medium()
            }
        }
    }

    /// Scattering function value towards `next`. Zero for endpoints.
    pub fn f(&self, next: &Vertex<'_>, mode: TransportMode) -> Spectrum {
        let Some((wi, _)) = self.direction_to(next) else {
            return Spectrum::ZERO;
        };
        match self.kind {
            VertexKind::Surface { wr, bsdf, .. } => bsdf.eval(wi, wr, mode),
            VertexKind::Medium { wr, phase, .. } => phase.eval(wi, wr, mode),
            _ => Spectrum::ZERO,
        }
    }

    /// Convert a solid-angle density at `self` into an area density at `next`.
    pub fn convert_density(&self, pdf: f32, next: &Vertex<'_>) -> f32 {
        if next.is_infinite_light() {
            return pdf;
        }
        let Some((w, dist2)) = self.direction_to(next) else {
            return 0.0;
        };
        let mut pdf = pdf / dist2;
        if let Some(n) = next.normal() {
            pdf *= abs_dot(n, w);
        }
        pdf
    }

    /// Area density of sampling `next` from `self`, having arrived from `prev`.
    pub fn pdf(&self, scene: &Scene, prev: Option<&Vertex<'_>>, next: &Vertex<'_>) -> f32 {
        if matches!(
            self.kind,
            VertexKind::AreaLight { .. } | VertexKind::EnvironmentLight { .. }
        ) {
            return self.pdf_light(scene, next);
        }

        let Some((wn, _)) = self.direction_to(next) else {
            return 0.0;
        };
        let wp = prev.and_then(|p| self.direction_to(p)).map(|(w, _)| w);

        let pdf = match (self.kind, wp) {
            (VertexKind::Camera { .. }, _) => scene.camera().pdf_we(wn).1,
            (VertexKind::Surface { bsdf, .. }, Some(wp)) => bsdf.pdf(wn, wp),
            (VertexKind::Medium { phase, .. }, Some(wp)) => phase.pdf(wn, wp),
            _ => 0.0,
        };
        self.convert_density(pdf, next)
    }

    /// Area density of a light path leaving this light vertex reaching `next`.
    pub fn pdf_light(&self, scene: &Scene, next: &Vertex<'_>) -> f32 {
        let Some((w, dist2)) = self.direction_to(next) else {
            return 0.0;
        };
        let mut pdf = match self.kind {
            VertexKind::EnvironmentLight { .. } => scene.world().disk_pdf(),
            VertexKind::AreaLight { nor, entity, .. } | VertexKind::Surface { nor, entity, .. } => {
                let (_, pdf_dir) = light::area_pdf_le(entity, nor, w);
                pdf_dir / dist2
            }
            _ => return 0.0,
        };
        if let Some(n) = next.normal() {
            pdf *= abs_dot(n, w);
        }
        pdf
    }

    /// Density of choosing this light and this point (or direction) on it.
    pub fn pdf_light_origin(&self, scene: &Scene) -> f32 {
        match self.kind {
            VertexKind::EnvironmentLight { .. } => match scene.environment() {
                Some(env) => scene.light_pdf(LightRef::Environment(env)) * UNIFORM_SPHERE_PDF,
                None => 0.0,
            },
            VertexKind::AreaLight { entity, .. } | VertexKind::Surface { entity, .. } => {
                scene.light_pdf(LightRef::Area(entity)) / entity.geometry().surface_area()
            }
            _ => 0.0,
        }
    }

    /// Radiance emitted from this vertex towards `toward`.
    pub fn le(&self, scene: &Scene, toward: &Vertex<'_>) -> Spectrum {
        if !self.is_light() {
            return Spectrum::ZERO;
        }
        let Some((w, _)) = self.direction_to(toward) else {
            return Spectrum::ZERO;
        };
        match self.kind {
            // Radiance arriving along -w comes from direction `dir`
            VertexKind::EnvironmentLight { dir } => scene
                .environment()
                .map_or(Spectrum::ZERO, |env| env.radiance(dir)),
            VertexKind::AreaLight { nor, entity, .. } | VertexKind::Surface { nor, entity, .. } => {
                entity.emitted(nor, w)
            }
            _ => Spectrum::ZERO,
        }
    }
}
