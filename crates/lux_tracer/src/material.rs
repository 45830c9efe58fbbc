//! Materials bind a scattering function to each hit.

use crate::bsdf::{Bsdf, LambertBsdf, MirrorBsdf, PassThroughBsdf};
use crate::{HitRecord, Spectrum};
use bumpalo::Bump;

/// Surface description shared by entities.
pub trait Material: Send + Sync {
    /// Scattering function at `hit`, allocated in the per-sample arena.
    fn bsdf<'a>(&self, hit: &HitRecord<'_>, arena: &'a Bump) -> &'a dyn Bsdf;

    /// True for surfaces that only delimit media. Shadow rays pass through them.
    fn is_pass_through(&self) -> bool {
        false
    }
}

/// Lambertian (diffuse) material.
#[derive(Debug, Clone)]
pub struct IdealDiffuse {
    albedo: Spectrum,
}

impl IdealDiffuse {
    /// Albedo is clamped to [0, 1] per channel.
    pub fn new(albedo: Spectrum) -> Self {
        Self {
            albedo: albedo.clamp(Spectrum::ZERO, Spectrum::ONE),
        }
    }
}

impl Material for IdealDiffuse {
    fn bsdf<'a>(&self, hit: &HitRecord<'_>, arena: &'a Bump) -> &'a dyn Bsdf {
        arena.alloc(LambertBsdf {
            albedo: self.albedo,
            normal: hit.normal,
        })
    }
}

#[derive(Debug, Clone)]
pub struct IdealMirror {
    reflectance: Spectrum,
}

impl IdealMirror {
    pub fn new(reflectance: Spectrum) -> Self {
        Self {
            reflectance: reflectance.clamp(Spectrum::ZERO, Spectrum::ONE),
        }
    }
}

impl Material for IdealMirror {
    fn bsdf<'a>(&self, hit: &HitRecord<'_>, arena: &'a Bump) -> &'a dyn Bsdf {
        arena.alloc(MirrorBsdf {
            reflectance: self.reflectance,
            normal: hit.normal,
        })
    }
}

/// Boundary between two media with no visible surface.
#[derive(Debug, Clone, Default)]
pub struct InvisibleSurface;

impl Material for InvisibleSurface {
    fn bsdf<'a>(&self, hit: &HitRecord<'_>, arena: &'a Bump) -> &'a dyn Bsdf {
        arena.alloc(PassThroughBsdf { normal: hit.normal })
    }

    fn is_pass_through(&self) -> bool {
        true
    }
}
