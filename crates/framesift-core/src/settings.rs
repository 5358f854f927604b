use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How the Save stage and the coordinator decide which frames reach disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityFilterType {
    /// Save every frame (when saving is enabled at all).
    #[serde(rename = "none")]
    None,
    /// Save frames whose quality reaches `minimumQuality`. Decided per
    /// frame inside the Save stage.
    #[serde(rename = "minimumQuality")]
    MinimumQuality,
    /// Defer saving: frames are queued and the best `acceptancePercent`
    /// of each batch is written by the coordinator.
    #[serde(rename = "acceptanceRate")]
    AcceptanceRate,
}

/// Gaussian sigmas for the two-blur quality estimator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EstimatorSettings {
    pub noise_sigma: f64,
    pub signal_sigma: f64,
}

impl Default for EstimatorSettings {
    fn default() -> Self {
        Self {
            noise_sigma: 1.5,
            signal_sigma: 6.0,
        }
    }
}

/// Immutable per-run configuration.
///
/// The coordinator shares one snapshot with every in-flight frame via
/// `Arc`; updates install a new snapshot that only frames admitted
/// afterwards will see. Field names serialize to the persisted key names
/// (`doCrop`, `estimator.noiseSigma`, ...).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessingSettings {
    /// Invert pixel values during Decode.
    pub negative: bool,

    pub do_crop: bool,
    /// Side length of the centered crop square, in pixels.
    pub crop_width: u32,
    /// Centroid threshold: grayscale pixels above this value contribute
    /// to the crop center.
    pub threshold: f64,

    /// Paint saturated preview pixels magenta.
    pub mark_clipped: bool,
    pub compute_histograms: bool,
    /// Replace each histogram bin count c with log2(c + 1).
    pub logarithmic_histograms: bool,

    pub estimate_quality: bool,

    pub save_images: bool,
    pub save_images_directory: PathBuf,

    pub filter_type: QualityFilterType,
    /// Acceptance floor for `MinimumQuality` filtering.
    pub minimum_quality: f64,
    /// 0..=100, share of each ranked batch written in `AcceptanceRate`
    /// filtering.
    pub acceptance_percent: u32,
    /// Queue length at which an acceptance-rate flush triggers.
    pub filter_queue_length: usize,

    /// Worker pool size. Defaults to the hardware thread count.
    pub max_workers: usize,
    /// Admission allows up to `overcommit_factor * max_workers` leased
    /// frames; completions can lag behind worker availability.
    pub overcommit_factor: usize,

    /// Last field so the TOML form keeps scalar keys ahead of the
    /// nested table.
    pub estimator: EstimatorSettings,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            negative: false,
            do_crop: false,
            crop_width: 512,
            threshold: 0.0,
            mark_clipped: false,
            compute_histograms: true,
            logarithmic_histograms: false,
            estimate_quality: true,
            save_images: false,
            save_images_directory: PathBuf::from("."),
            filter_type: QualityFilterType::None,
            minimum_quality: 0.0,
            acceptance_percent: 50,
            filter_queue_length: 16,
            max_workers: default_workers(),
            overcommit_factor: 2,
            estimator: EstimatorSettings::default(),
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl ProcessingSettings {
    /// Estimated peak memory for a source of the given geometry: queued
    /// save copies plus the working set of every leasable context.
    pub fn memory_estimate(
        &self,
        width: usize,
        height: usize,
        bytes_per_sample: usize,
        channels: usize,
    ) -> usize {
        let frame_area = width * height;
        let crop_area = if self.do_crop {
            (self.crop_width as usize * self.crop_width as usize).min(frame_area)
        } else {
            frame_area
        };
        let queued = crop_area * bytes_per_sample * channels * self.filter_queue_length;
        // Per context: native decoded + float + two blur planes + grayscale.
        let per_context = frame_area * channels * bytes_per_sample
            + frame_area * channels * 4 * 3
            + frame_area * 4;
        queued + self.overcommit_factor * self.max_workers * per_context
    }
}
