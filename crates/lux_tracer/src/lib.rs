//! lux tracer - light transport core
//!
//! Scene representation and the per-sample integrators:
//! - geometry, entities and BVH / linear aggregates
//! - scattering functions, materials and participating media
//! - area and environment lights, pinhole camera
//! - path tracing, ambient occlusion, G-buffer and bidirectional path tracing
//!
//! Everything here is single-sample and thread-agnostic. Scheduling, pixel
//! accumulation and display live in `lux_render`.

mod aggregate;
mod ao;
pub mod bdpt;
pub mod bsdf;
mod bvh;
mod camera;
mod entity;
mod error;
mod geometry;
pub mod light;
mod material;
pub mod medium;
mod path_tracing;
mod pixel;
mod quad;
mod sampler;
mod scene;
pub mod spectrum;
mod sphere;
mod triangle;

pub use aggregate::{Aggregate, HitRecord, NativeAggregate};
pub use ao::{trace_albedo_ao, trace_ao, trace_gbuffer, AlbedoAoParams, AoParams, GBufferChannel};
pub use bdpt::{trace_bdpt, BdptParams};
pub use bsdf::{Bsdf, BsdfSample, TransportMode};
pub use bvh::BvhAggregate;
pub use camera::{CameraWiSample, PerspectiveCamera};
pub use entity::{Entity, MediumInterface};
pub use error::SceneError;
pub use geometry::{Geometry, GeometryHit, GeometrySample};
pub use light::{ConstantEnvironment, EnvironmentLight, GradientSky};
pub use material::{IdealDiffuse, IdealMirror, InvisibleSurface, Material};
pub use medium::{AbsorptionMedium, HomogeneousMedium, Medium};
pub use path_tracing::{trace_nomis, trace_std, TraceParams};
pub use pixel::Pixel;
pub use quad::Quad;
pub use sampler::Sampler;
pub use scene::{AggregateKind, Scene, SceneBuilder};
pub use spectrum::Spectrum;
pub use sphere::Sphere;
pub use triangle::Triangle;
