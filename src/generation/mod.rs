//! Cloud field generation pipeline.
//!
//! Each regeneration runs:
//! 1. `NoiseGenerator` over the base density field (and the detail field if enabled)
//! 2. `LightMarch` into a scratch buffer
//! 3. `CopyLightIntensity` from the scratch buffer into the light channel
//!
//! Work happens on a back [`FieldSet`]; it's swapped to the front only when
//! every phase completed, so consumers never see a half-built field.

pub mod config;
pub mod density;
pub mod light;
pub mod state;

pub use config::{CloudConfig, DetailConfig, LayerConfig};
pub use density::DensityFieldGenerator;
pub use light::{LightFieldGenerator, LightParams};
pub use state::{select_trigger, GenerationState, StateMachine, Trigger, UpdateMode};

use std::time::{Duration, Instant};

use crate::animation::AnimationDriver;
use crate::compute::{ComputeBackend, CpuBackend, DispatchStats};
use crate::core::{Result, Vec3};
use crate::field::{DitherTexture, FieldSet};
use crate::layer::LayerStack;
use crate::render::material::MaterialParams;

/// Result of one generator phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseOutcome {
    Completed(DispatchStats),
    /// The backend had no kernel with this name; nothing was written.
    Skipped { kernel: &'static str },
}

impl PhaseOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn stats(&self) -> Option<DispatchStats> {
        match self {
            Self::Completed(stats) => Some(*stats),
            Self::Skipped { .. } => None,
        }
    }
}

/// Running totals over the pipeline's lifetime
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GenerationStats {
    /// Cycles whose fields reached the consumer
    pub cycles_published: u64,
    /// Cycles left unpublished because a phase was skipped
    pub cycles_stale: u64,
    pub phases_skipped: u64,
    pub cells_written: u64,
    pub cells_skipped: u64,
}

impl GenerationStats {
    fn record(&mut self, outcome: &PhaseOutcome) {
        match outcome {
            PhaseOutcome::Completed(stats) => {
                self.cells_written += stats.cells_written;
                self.cells_skipped += stats.cells_skipped;
            }
            PhaseOutcome::Skipped { .. } => self.phases_skipped += 1,
        }
    }
}

/// What one regeneration did
#[derive(Clone, Debug, PartialEq)]
pub struct CycleReport {
    pub trigger: Trigger,
    pub density: PhaseOutcome,
    pub detail: Option<PhaseOutcome>,
    /// `None` when the density phase didn't complete
    pub light: Option<PhaseOutcome>,
    pub published: bool,
    pub elapsed: Duration,
}

/// Owns the fields, generators and trigger logic for one cloud volume.
pub struct CloudPipeline<B: ComputeBackend = CpuBackend> {
    config: CloudConfig,
    backend: B,
    base_layers: LayerStack,
    detail_layers: Option<LayerStack>,
    density: DensityFieldGenerator,
    light: LightFieldGenerator,
    animation: AnimationDriver,
    state: StateMachine,
    /// Last published fields
    front: Option<FieldSet>,
    /// Fields being generated into
    back: Option<FieldSet>,
    dither: DitherTexture,
    stats: GenerationStats,
}

impl CloudPipeline<CpuBackend> {
    /// Pipeline on the rayon backend, seeded from the config.
    pub fn new(config: CloudConfig) -> Result<Self> {
        let backend = CpuBackend::new(config.seed);
        Self::with_backend(config, backend)
    }
}

impl<B: ComputeBackend> CloudPipeline<B> {
    pub fn with_backend(config: CloudConfig, backend: B) -> Result<Self> {
        config.validate()?;

        let dither = match config.dither_seed {
            Some(seed) => DitherTexture::new(seed),
            None => DitherTexture::from_entropy(),
        };
        let animation = AnimationDriver::new(
            config.animate,
            Vec3::from_array(config.animation_speed),
            Vec3::from_array(config.texture_offset),
        );

        let mut pipeline = Self {
            base_layers: config.base_stack()?,
            detail_layers: config.detail_stack()?,
            density: DensityFieldGenerator::new(config.dispatch_rounding),
            light: LightFieldGenerator::new(config.light_params(), config.dispatch_rounding),
            animation,
            state: StateMachine::new(),
            front: None,
            back: None,
            dither,
            stats: GenerationStats::default(),
            backend,
            config,
        };
        pipeline.back = Some(pipeline.allocate_fields()?);

        log::info!(
            "Cloud pipeline: {} grid, {} layers, detail {}, {} backend",
            pipeline.config.grid_dims()?,
            pipeline.base_layers.len(),
            pipeline.config.detail_size().map_or("off".to_string(), |s| format!("{}^3", s)),
            pipeline.backend.name()
        );

        Ok(pipeline)
    }

    /// Advance one frame: move the animation offset, then regenerate if the
    /// update mode or a manual request calls for it.
    pub fn update(&mut self, dt: f32, manual_requested: bool) -> Result<Option<CycleReport>> {
        self.animation.tick(dt);
        match select_trigger(self.config.update_mode, manual_requested) {
            Some(trigger) => self.regenerate(trigger).map(Some),
            None => Ok(None),
        }
    }

    /// Run a full density + light cycle now.
    ///
    /// The new fields replace the published ones only if every phase
    /// completed; otherwise the previous fields stay published.
    pub fn regenerate(&mut self, trigger: Trigger) -> Result<CycleReport> {
        self.state.begin(trigger)?;
        let start = Instant::now();

        let mut target = match self.back.take() {
            Some(fields) => fields,
            None => match self.allocate_fields() {
                Ok(fields) => fields,
                Err(e) => {
                    self.state.abort();
                    return Err(e);
                }
            },
        };

        let result = self.run_phases(&mut target);
        let (density, detail, light) = match result {
            Ok(outcomes) => outcomes,
            Err(e) => {
                self.state.abort();
                self.back = Some(target);
                return Err(e);
            }
        };

        let published = light.as_ref().is_some_and(PhaseOutcome::is_completed);
        if published {
            self.state.light_done()?;
            self.back = self.front.replace(target);
            self.stats.cycles_published += 1;
        } else {
            self.state.abort();
            self.back = Some(target);
            self.stats.cycles_stale += 1;
        }

        let report = CycleReport {
            trigger,
            density,
            detail,
            light,
            published,
            elapsed: start.elapsed(),
        };

        if published {
            log::info!(
                "Generated cloud fields ({}) in {:.1}ms",
                trigger.name(),
                report.elapsed.as_secs_f64() * 1000.0
            );
        } else {
            log::warn!("Cloud fields not published ({}): a phase was skipped", trigger.name());
        }

        Ok(report)
    }

    #[allow(clippy::type_complexity)]
    fn run_phases(
        &mut self,
        target: &mut FieldSet,
    ) -> Result<(PhaseOutcome, Option<PhaseOutcome>, Option<PhaseOutcome>)> {
        let offset = self.animation.offset();

        let density = self.density.generate(&self.backend, &self.base_layers, offset, &mut target.density)?;
        self.stats.record(&density);

        let detail = match (&self.detail_layers, target.detail.as_mut()) {
            (Some(stack), Some(field)) => {
                let outcome = self.density.generate_detail(&self.backend, stack, offset, field)?;
                self.stats.record(&outcome);
                Some(outcome)
            }
            _ => None,
        };

        let density_complete = density.is_completed() && detail.as_ref().is_none_or(PhaseOutcome::is_completed);
        if !density_complete {
            return Ok((density, detail, None));
        }
        self.state.density_done()?;

        let light = self.light.generate(&self.backend, &mut target.density)?;
        self.stats.record(&light);

        Ok((density, detail, Some(light)))
    }

    fn allocate_fields(&self) -> Result<FieldSet> {
        FieldSet::new(self.config.grid_dims()?, self.config.fit_bounds(), self.config.detail_size())
    }

    /// Replace the configuration.
    ///
    /// Layers, light and shading parameters apply from the next cycle. A
    /// change of grid resolution or detail size drops both field sets, so
    /// nothing is published until the next completed cycle.
    pub fn reconfigure(&mut self, config: CloudConfig) -> Result<()> {
        config.validate()?;

        let resized = config.grid_dims()? != self.config.grid_dims()?
            || config.texture_fit_size != self.config.texture_fit_size
            || config.detail_size() != self.config.detail_size();

        self.base_layers = config.base_stack()?;
        self.detail_layers = config.detail_stack()?;
        self.density = DensityFieldGenerator::new(config.dispatch_rounding);
        self.light = LightFieldGenerator::new(config.light_params(), config.dispatch_rounding);
        self.animation.set_enabled(config.animate);
        self.animation.set_speed(Vec3::from_array(config.animation_speed));
        if config.texture_offset != self.config.texture_offset {
            self.animation.set_offset(Vec3::from_array(config.texture_offset));
        }
        if let Some(seed) = config.dither_seed.filter(|&s| s != self.dither.seed()) {
            self.dither = DitherTexture::new(seed);
        }
        self.config = config;

        if resized {
            log::info!("Cloud grid resized to {}", self.config.grid_dims()?);
            self.front = None;
            self.back = Some(self.allocate_fields()?);
        }
        Ok(())
    }

    /// Published fields, `None` until the first cycle completes.
    pub fn fields(&self) -> Option<&FieldSet> {
        self.front.as_ref()
    }

    pub fn material_params(&self) -> MaterialParams {
        MaterialParams::from_config(&self.config, self.animation.offset())
    }

    pub fn config(&self) -> &CloudConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn base_layers(&self) -> &LayerStack {
        &self.base_layers
    }

    /// Edits take effect on the next cycle.
    pub fn base_layers_mut(&mut self) -> &mut LayerStack {
        &mut self.base_layers
    }

    pub fn detail_layers(&self) -> Option<&LayerStack> {
        self.detail_layers.as_ref()
    }

    pub fn detail_layers_mut(&mut self) -> Option<&mut LayerStack> {
        self.detail_layers.as_mut()
    }

    pub fn set_light_direction(&mut self, direction: Vec3) -> Result<()> {
        self.light.set_direction(direction)?;
        self.config.light_direction = direction.to_array();
        Ok(())
    }

    pub fn animation(&self) -> &AnimationDriver {
        &self.animation
    }

    pub fn animation_mut(&mut self) -> &mut AnimationDriver {
        &mut self.animation
    }

    pub fn dither(&self) -> &DitherTexture {
        &self.dither
    }

    pub fn state(&self) -> GenerationState {
        self.state.state()
    }

    pub fn stats(&self) -> GenerationStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::Kernel;
    use crate::field::GridDims;
    use crate::layer::{NoiseBank, NoiseLayer, NoiseType};
    use glam::UVec3;

    fn small_config() -> CloudConfig {
        CloudConfig {
            tex_size: 8,
            cloud_size: [8.0, 8.0, 8.0],
            texture_fit_size: [8.0, 8.0, 8.0],
            update_mode: UpdateMode::Manual,
            dither_seed: Some(1),
            ..Default::default()
        }
    }

    #[test]
    fn test_nothing_published_before_first_cycle() {
        let pipeline = CloudPipeline::new(small_config()).unwrap();
        assert!(pipeline.fields().is_none());
        assert_eq!(pipeline.state(), GenerationState::Idle);
    }

    #[test]
    fn test_single_value_layer_end_to_end() {
        let config = CloudConfig {
            tex_size: 4,
            texture_fit_size: [1.0, 1.0, 1.0],
            layers: vec![LayerConfig::new([0.0; 3], 1.0, 1.0, NoiseType::Value)],
            ..small_config()
        };
        let mut pipeline = CloudPipeline::new(config).unwrap();
        let report = pipeline.regenerate(Trigger::Manual).unwrap();
        assert!(report.published);

        let fields = pipeline.fields().unwrap();
        let density = &fields.density;
        assert_eq!(density.dims(), GridDims::cubic(4).unwrap());

        let noise = NoiseBank::new(pipeline.config().seed);
        let bounds = density.bounds();
        for i in 0..density.dims().cell_count() {
            let cell = density.dims().cell(i);
            let p = bounds.cell_center(cell, UVec3::splat(4));
            assert_eq!(density.density(cell), noise.sample(NoiseType::Value, p));
        }
    }

    #[test]
    fn test_regeneration_is_idempotent() {
        let mut pipeline = CloudPipeline::new(small_config()).unwrap();
        pipeline.regenerate(Trigger::Manual).unwrap();
        let first = pipeline.fields().unwrap().clone();

        // the second cycle writes into the other buffer
        pipeline.regenerate(Trigger::Manual).unwrap();
        assert_eq!(pipeline.fields().unwrap(), &first);
    }

    #[test]
    fn test_light_channel_populated() {
        let mut pipeline = CloudPipeline::new(small_config()).unwrap();
        pipeline.regenerate(Trigger::Tick).unwrap();

        let (lo, hi) = pipeline.fields().unwrap().density.light_range();
        assert!(lo >= 0.2 - 1e-3, "light floor {}", lo);
        assert!(hi <= 1.0 + 1e-3);
    }

    #[test]
    fn test_manual_mode_waits_for_request() {
        let mut pipeline = CloudPipeline::new(small_config()).unwrap();
        assert!(pipeline.update(0.016, false).unwrap().is_none());
        assert!(pipeline.fields().is_none());

        let report = pipeline.update(0.016, true).unwrap().unwrap();
        assert_eq!(report.trigger, Trigger::Manual);
        assert!(pipeline.fields().is_some());
    }

    #[test]
    fn test_continuous_mode_regenerates_each_frame() {
        let config = CloudConfig { update_mode: UpdateMode::Continuous, ..small_config() };
        let mut pipeline = CloudPipeline::new(config).unwrap();

        for _ in 0..3 {
            let report = pipeline.update(0.016, true).unwrap().unwrap();
            assert_eq!(report.trigger, Trigger::Tick);
        }
        assert_eq!(pipeline.stats().cycles_published, 3);
    }

    #[test]
    fn test_animation_moves_the_field() {
        let config = CloudConfig {
            animate: true,
            animation_speed: [10.0, 0.0, 0.0],
            ..small_config()
        };
        let mut pipeline = CloudPipeline::new(config).unwrap();
        pipeline.update(0.0, true).unwrap();
        let still = pipeline.fields().unwrap().density.clone();

        pipeline.update(0.5, true).unwrap();
        assert_eq!(pipeline.animation().offset(), Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(pipeline.material_params().texture_offset, Vec3::new(5.0, 0.0, 0.0));
        assert_ne!(pipeline.fields().unwrap().density.cells(), still.cells());
    }

    #[test]
    fn test_reconfigure_applies_new_texture_offset() {
        let mut pipeline = CloudPipeline::new(small_config()).unwrap();
        let config = CloudConfig {
            texture_offset: [3.0, 0.0, -2.0],
            ..small_config()
        };
        pipeline.reconfigure(config).unwrap();

        assert_eq!(pipeline.animation().offset(), Vec3::new(3.0, 0.0, -2.0));
        assert_eq!(pipeline.material_params().texture_offset, Vec3::new(3.0, 0.0, -2.0));
    }

    #[test]
    fn test_skipped_light_keeps_previous_fields() {
        let backend = CpuBackend::with_kernels(5, &[Kernel::NoiseGenerator]);
        let mut pipeline = CloudPipeline::with_backend(small_config(), backend).unwrap();

        let report = pipeline.regenerate(Trigger::Manual).unwrap();
        assert!(!report.published);
        assert!(report.density.is_completed());
        assert_eq!(report.light, Some(PhaseOutcome::Skipped { kernel: "LightMarch" }));
        assert!(pipeline.fields().is_none());
        assert_eq!(pipeline.state(), GenerationState::Idle);

        let stats = pipeline.stats();
        assert_eq!(stats.cycles_stale, 1);
        assert_eq!(stats.phases_skipped, 1);
        assert_eq!(stats.cycles_published, 0);
    }

    #[test]
    fn test_skipped_density_never_runs_light() {
        let backend = CpuBackend::with_kernels(5, &[Kernel::LightMarch, Kernel::CopyLightIntensity]);
        let mut pipeline = CloudPipeline::with_backend(small_config(), backend).unwrap();

        let report = pipeline.regenerate(Trigger::Manual).unwrap();
        assert_eq!(report.density, PhaseOutcome::Skipped { kernel: "NoiseGenerator" });
        assert_eq!(report.light, None);
        assert!(!report.published);
    }

    #[test]
    fn test_detail_field_generated_when_enabled() {
        let config = CloudConfig {
            detail: Some(DetailConfig { size: 8, ..Default::default() }),
            ..small_config()
        };
        let mut pipeline = CloudPipeline::new(config).unwrap();
        let report = pipeline.regenerate(Trigger::Manual).unwrap();

        assert!(report.detail.unwrap().is_completed());
        let detail = pipeline.fields().unwrap().detail.as_ref().unwrap();
        assert_eq!(detail.dims(), GridDims::cubic(8).unwrap());
    }

    #[test]
    fn test_layer_edits_apply_next_cycle() {
        let mut pipeline = CloudPipeline::new(small_config()).unwrap();
        pipeline.base_layers_mut().clear();
        pipeline.base_layers_mut()
            .add_layer(NoiseLayer::new(Vec3::ZERO, 1.0, 0.0, NoiseType::Perlin))
            .unwrap();
        pipeline.regenerate(Trigger::Manual).unwrap();

        let (lo, hi) = pipeline.fields().unwrap().density.density_range();
        assert_eq!((lo, hi), (0.0, 0.0));
    }

    #[test]
    fn test_reconfigure_resize_drops_fields() {
        let mut pipeline = CloudPipeline::new(small_config()).unwrap();
        pipeline.regenerate(Trigger::Manual).unwrap();
        assert!(pipeline.fields().is_some());

        // same size keeps the published fields
        let tweaked = CloudConfig { exposure: 3.0, ..small_config() };
        pipeline.reconfigure(tweaked).unwrap();
        assert!(pipeline.fields().is_some());
        assert_eq!(pipeline.material_params().exposure, 3.0);

        let bigger = CloudConfig { tex_size: 12, ..small_config() };
        pipeline.reconfigure(bigger).unwrap();
        assert!(pipeline.fields().is_none());

        pipeline.regenerate(Trigger::Manual).unwrap();
        assert_eq!(pipeline.fields().unwrap().density.dims(), GridDims::cubic(12).unwrap());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = CloudConfig { tex_size: 0, ..small_config() };
        assert!(CloudPipeline::new(config).is_err());
    }
}
