//! Scene entities: a shape with its material, media and optional emission.

use crate::geometry::Geometry;
use crate::medium::Medium;
use crate::{Material, SceneError, Spectrum};
use lux_math::Vec3;
use std::sync::Arc;

/// Media on either side of a surface. `None` is vacuum.
#[derive(Clone, Default)]
pub struct MediumInterface {
    pub inside: Option<Arc<dyn Medium>>,
    pub outside: Option<Arc<dyn Medium>>,
}

impl MediumInterface {
    pub fn new(inside: Option<Arc<dyn Medium>>, outside: Option<Arc<dyn Medium>>) -> Self {
        Self { inside, outside }
    }

    /// Medium entered when leaving the surface along `dir`.
    pub fn toward(&self, dir: Vec3, outward_normal: Vec3) -> Option<&dyn Medium> {
        if dir.dot(outward_normal) > 0.0 {
            self.outside.as_deref()
        } else {
            self.inside.as_deref()
        }
    }
}

pub struct Entity {
    geometry: Box<dyn Geometry>,
    material: Arc<dyn Material>,
    media: MediumInterface,
    emission: Option<Spectrum>,
    no_denoise: bool,
    pub(crate) light_index: Option<usize>,
}

impl Entity {
    pub fn new(geometry: impl Geometry + 'static, material: Arc<dyn Material>) -> Self {
        Self {
            geometry: Box::new(geometry),
            material,
            media: MediumInterface::default(),
            emission: None,
            no_denoise: false,
            light_index: None,
        }
    }

    /// Make the entity a one-sided diffuse emitter along its outward normal.
    pub fn with_emission(mut self, radiance: Spectrum) -> Result<Self, SceneError> {
        if !radiance.is_finite() || radiance.min_element() < 0.0 {
            return Err(SceneError::InvalidEmission(format!(
                "radiance must be finite and non-negative, got {radiance}"
            )));
        }
        self.emission = Some(radiance);
        Ok(self)
    }

    pub fn with_media(mut self, media: MediumInterface) -> Self {
        self.media = media;
        self
    }

    /// Exclude this entity from denoising.
    pub fn with_no_denoise(mut self) -> Self {
        self.no_denoise = true;
        self
    }

    pub fn geometry(&self) -> &dyn Geometry {
        self.geometry.as_ref()
    }

    pub fn material(&self) -> &dyn Material {
        self.material.as_ref()
    }

    pub fn media(&self) -> &MediumInterface {
        &self.media
    }

    /// Emitted radiance, if the entity is a light.
    pub fn emission(&self) -> Option<Spectrum> {
        self.emission
    }

    pub fn is_emissive(&self) -> bool {
        self.emission.is_some_and(|e| e.max_element() > 0.0)
    }

    pub fn no_denoise(&self) -> bool {
        self.no_denoise
    }

    /// Radiance leaving the surface towards `w`.
    pub fn emitted(&self, normal: Vec3, w: Vec3) -> Spectrum {
        match self.emission {
            Some(le) if normal.dot(w) > 0.0 => le,
            _ => Spectrum::ZERO,
        }
    }
}
