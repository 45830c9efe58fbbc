//! Renderer configuration.

use crate::RenderError;
use lux_tracer::{AlbedoAoParams, AoParams, BdptParams, TraceParams};
use serde::{Deserialize, Serialize};

/// Largest subpath length accepted for either BDPT walk. Subpath storage is
/// reserved up front, so the budget bounds per-sample memory.
pub const MAX_SUBPATH_VERTICES: usize = 1024;

/// Integrator run for every pixel sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntegratorConfig {
    PathTracing(TraceParams),
    Bdpt(BdptParams),
    AmbientOcclusion(AoParams),
    AlbedoAo(AlbedoAoParams),
    Albedo,
    Normal,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        IntegratorConfig::Bdpt(BdptParams::default())
    }
}

impl IntegratorConfig {
    pub fn name(&self) -> &'static str {
        match self {
            IntegratorConfig::PathTracing(p) if p.use_mis => "path tracing",
            IntegratorConfig::PathTracing(_) => "path tracing (bsdf sampling)",
            IntegratorConfig::Bdpt(_) => "bdpt",
            IntegratorConfig::AmbientOcclusion(_) => "ambient occlusion",
            IntegratorConfig::AlbedoAo(_) => "albedo ao",
            IntegratorConfig::Albedo => "albedo",
            IntegratorConfig::Normal => "normal",
        }
    }

    fn validate(&self) -> Result<(), RenderError> {
        let invalid = |msg: String| Err(RenderError::InvalidConfig(msg));
        let check_cont_prob = |p: f32| {
            if p > 0.0 && p <= 1.0 {
                Ok(())
            } else {
                invalid(format!("cont_prob must lie in (0, 1], got {p}"))
            }
        };
        match self {
            IntegratorConfig::PathTracing(p) => {
                if p.max_depth == 0 {
                    return invalid("max_depth must be positive".into());
                }
                check_cont_prob(p.cont_prob)
            }
            IntegratorConfig::Bdpt(p) => {
                if !(2..=MAX_SUBPATH_VERTICES).contains(&p.max_camera_vertices) {
                    return invalid(format!(
                        "max_camera_vertices must lie in [2, {MAX_SUBPATH_VERTICES}], got {}",
                        p.max_camera_vertices
                    ));
                }
                if !(1..=MAX_SUBPATH_VERTICES).contains(&p.max_light_vertices) {
                    return invalid(format!(
                        "max_light_vertices must lie in [1, {MAX_SUBPATH_VERTICES}], got {}",
                        p.max_light_vertices
                    ));
                }
                check_cont_prob(p.cont_prob)
            }
            IntegratorConfig::AmbientOcclusion(AoParams {
                max_occlusion_distance,
                ..
            })
            | IntegratorConfig::AlbedoAo(AlbedoAoParams {
                max_occlusion_distance,
                ..
            }) => {
                if *max_occlusion_distance > 0.0 {
                    Ok(())
                } else {
                    invalid(format!(
                        "max_occlusion_distance must be positive, got {max_occlusion_distance}"
                    ))
                }
            }
            IntegratorConfig::Albedo | IntegratorConfig::Normal => Ok(()),
        }
    }
}

/// Progressive renderer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub width: u32,
    pub height: u32,
    /// Positive: exact thread count. Zero or negative: hardware parallelism
    /// reduced by that amount, at least one thread.
    pub worker_count: i32,
    /// Edge length of the initial task blocks in pixels
    pub task_grid_size: u32,
    /// Base seed; each worker derives its own stream from it
    pub seed: u64,
    pub integrator: IntegratorConfig,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            worker_count: 0,
            task_grid_size: 32,
            seed: 0,
            integrator: IntegratorConfig::default(),
        }
    }
}

impl RendererConfig {
    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, RenderError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RenderError> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidConfig(format!(
                "resolution must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.task_grid_size == 0 {
            return Err(RenderError::InvalidConfig(
                "task_grid_size must be positive".into(),
            ));
        }
        self.integrator.validate()
    }

    /// Number of worker threads to spawn.
    pub fn resolved_worker_count(&self) -> usize {
        if self.worker_count > 0 {
            return self.worker_count as usize;
        }
        let hardware = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1) as i64;
        (hardware + self.worker_count as i64).max(1) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RendererConfig::default();
        config.validate().unwrap();
        assert_eq!(config.task_grid_size, 32);
        assert_eq!(config.integrator, IntegratorConfig::Bdpt(BdptParams::default()));
    }

    #[test]
    fn test_from_json_with_defaults() {
        let config = RendererConfig::from_json(
            r#"{
                "width": 64,
                "height": 48,
                "worker_count": 2,
                "integrator": { "type": "path_tracing", "max_depth": 4, "use_mis": false }
            }"#,
        )
        .unwrap();
        assert_eq!(config.width, 64);
        assert_eq!(config.resolved_worker_count(), 2);
        match config.integrator {
            IntegratorConfig::PathTracing(p) => {
                assert_eq!(p.max_depth, 4);
                assert!(!p.use_mis);
                assert_eq!(p.specular_depth, TraceParams::default().specular_depth);
            }
            other => panic!("unexpected integrator {other:?}"),
        }

        let config = RendererConfig::from_json(r#"{ "integrator": { "type": "normal" } }"#).unwrap();
        assert_eq!(config.integrator, IntegratorConfig::Normal);
    }

    #[test]
    fn test_invalid_configs() {
        let zero = RendererConfig {
            width: 0,
            ..RendererConfig::default()
        };
        assert!(matches!(zero.validate(), Err(RenderError::InvalidConfig(_))));

        let grid = RendererConfig {
            task_grid_size: 0,
            ..RendererConfig::default()
        };
        assert!(grid.validate().is_err());

        let prob = RendererConfig {
            integrator: IntegratorConfig::Bdpt(BdptParams {
                cont_prob: 0.0,
                ..BdptParams::default()
            }),
            ..RendererConfig::default()
        };
        assert!(prob.validate().is_err());

        let ao = RendererConfig {
            integrator: IntegratorConfig::AmbientOcclusion(AoParams {
                max_occlusion_distance: -1.0,
                ..AoParams::default()
            }),
            ..RendererConfig::default()
        };
        assert!(ao.validate().is_err());

        assert!(matches!(
            RendererConfig::from_json("{ not json"),
            Err(RenderError::Parse(_))
        ));
    }

    #[test]
    fn test_subpath_budget_is_bounded() {
        let huge = RendererConfig::from_json(
            r#"{ "integrator": { "type": "bdpt", "max_camera_vertices": 100000000000 } }"#,
        );
        assert!(matches!(huge, Err(RenderError::InvalidConfig(_))));

        let light = RendererConfig {
            integrator: IntegratorConfig::Bdpt(BdptParams {
                max_light_vertices: MAX_SUBPATH_VERTICES + 1,
                ..BdptParams::default()
            }),
            ..RendererConfig::default()
        };
        assert!(light.validate().is_err());

        let edge = RendererConfig {
            integrator: IntegratorConfig::Bdpt(BdptParams {
                max_camera_vertices: MAX_SUBPATH_VERTICES,
                max_light_vertices: MAX_SUBPATH_VERTICES,
                ..BdptParams::default()
            }),
            ..RendererConfig::default()
        };
        edge.validate().unwrap();
    }

    #[test]
    fn test_worker_count_resolution() {
        let hardware = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        let config = RendererConfig::default();
        assert_eq!(config.resolved_worker_count(), hardware);

        let config = RendererConfig {
            worker_count: -1000,
            ..RendererConfig::default()
        };
        assert_eq!(config.resolved_worker_count(), 1);
    }
}
