use std::path::PathBuf;
use std::sync::Arc;

use ndarray::Array2;

use crate::pixels::{CropRect, Decoded};
use crate::settings::ProcessingSettings;
use crate::sources::{Decoder, RawFrame};

/// Pipeline stages in canonical execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Decode,
    Render,
    Crop,
    EstimateQuality,
    Save,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decode => write!(f, "Decode"),
            Self::Render => write!(f, "Render"),
            Self::Crop => write!(f, "Crop"),
            Self::EstimateQuality => write!(f, "EstimateQuality"),
            Self::Save => write!(f, "Save"),
        }
    }
}

/// Failure record left on a context by the stage that failed.
#[derive(Clone, Debug)]
pub struct StageError {
    pub stage: Stage,
    pub message: String,
}

/// 256-bin per-channel preview histograms. Grayscale frames fill only
/// the red channel.
#[derive(Clone)]
pub struct Histograms {
    pub red: [f32; 256],
    pub green: [f32; 256],
    pub blue: [f32; 256],
}

impl Default for Histograms {
    fn default() -> Self {
        Self {
            red: [0.0; 256],
            green: [0.0; 256],
            blue: [0.0; 256],
        }
    }
}

impl Histograms {
    pub fn clear(&mut self) {
        self.red = [0.0; 256];
        self.green = [0.0; 256];
        self.blue = [0.0; 256];
    }
}

impl std::fmt::Debug for Histograms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Histograms").finish_non_exhaustive()
    }
}

/// 8-bit BGRA preview sized to the decoded frame. Alpha is always 255.
#[derive(Clone, Debug, Default)]
pub struct PreviewImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

impl PreviewImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height * 4],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RectStyle {
    SolidBlack,
    DottedWhite,
}

/// Overlay a consumer should draw on top of the rendered preview.
#[derive(Clone, Debug, PartialEq)]
pub enum PaintObject {
    Rectangle { rect: CropRect, style: RectStyle },
    Label { text: String },
}

/// Per-frame workspace carried through all pipeline stages.
///
/// Stages run in a fixed order, so each may rely on the fields filled by
/// its predecessors. Contexts are recycled through the coordinator's
/// pool; `reset` reinitializes the per-frame fields while keeping the
/// decoder and large buffers for reuse.
pub struct ProcessingContext {
    pub stage_success: bool,
    pub error: Option<StageError>,
    pub completed_stages: Vec<Stage>,

    /// Settings snapshot bound at admission; stable for this frame even
    /// if the coordinator installs a newer one meanwhile.
    pub settings: Arc<ProcessingSettings>,
    pub decoder: Option<Box<dyn Decoder>>,
    pub raw_frame: Option<RawFrame>,

    // Decode
    pub decoded: Option<Decoded>,
    pub decoded_float: Vec<Array2<f32>>,
    pub grayscale: Array2<f32>,

    // Crop
    pub crop_area: CropRect,

    // EstimateQuality
    pub blur_noise: Vec<Array2<f32>>,
    pub blur_signal: Vec<Array2<f32>>,
    pub quality: f32,

    // Render
    pub do_render: bool,
    pub only_render: bool,
    pub rendered: Option<PreviewImage>,
    pub histograms: Histograms,
    /// Stages append overlays here when `do_render` is set.
    pub paint_objects: Vec<PaintObject>,

    // Save
    /// Set by the Save stage whenever quality filtering is in effect,
    /// regardless of whether the image actually reached disk.
    pub accepted: bool,
    /// Deep copy of the cropped image for acceptance-rate batching; the
    /// coordinator moves it into the filter queue and swaps a recycled
    /// buffer back in.
    pub cloned: Option<Decoded>,
    pub filename: PathBuf,
}

impl ProcessingContext {
    pub fn new(settings: Arc<ProcessingSettings>) -> Self {
        Self {
            stage_success: true,
            error: None,
            completed_stages: Vec::new(),
            settings,
            decoder: None,
            raw_frame: None,
            decoded: None,
            decoded_float: Vec::new(),
            grayscale: Array2::zeros((0, 0)),
            crop_area: CropRect::default(),
            blur_noise: Vec::new(),
            blur_signal: Vec::new(),
            quality: 0.0,
            do_render: false,
            only_render: false,
            rendered: None,
            histograms: Histograms::default(),
            paint_objects: Vec::new(),
            accepted: false,
            cloned: None,
            filename: PathBuf::new(),
        }
    }

    /// Reinitialize for the next frame. The decoder, preview buffer and
    /// pixel matrices are kept so their allocations can be reused.
    pub fn reset(&mut self, settings: Arc<ProcessingSettings>) {
        self.stage_success = true;
        self.error = None;
        self.completed_stages.clear();
        self.settings = settings;
        self.raw_frame = None;
        self.crop_area = CropRect::default();
        self.quality = 0.0;
        self.do_render = false;
        self.only_render = false;
        self.paint_objects.clear();
        self.accepted = false;
        self.filename.clear();
    }

    /// The stage that failed, if any.
    pub fn failed_stage(&self) -> Option<Stage> {
        self.error.as_ref().map(|e| e.stage)
    }
}

impl std::fmt::Debug for ProcessingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessingContext")
            .field("stage_success", &self.stage_success)
            .field("completed_stages", &self.completed_stages)
            .field("quality", &self.quality)
            .field("accepted", &self.accepted)
            .field("filename", &self.filename)
            .finish_non_exhaustive()
    }
}
