use ndarray::{Array2, Array3};

use crate::context::{PreviewImage, ProcessingContext};
use crate::error::{Result, SiftError};
use crate::pixels::Decoded;

/// Saturated preview pixels are painted this BGR color when
/// `markClipped` is on.
const CLIPPED_BGR: [u8; 3] = [255, 0, 200];

enum EightBit {
    Gray(Array2<u8>),
    Color(Array3<u8>),
}

/// Produce the BGRA preview and optional 256-bin histograms from the
/// native decoded matrix. 16-bit input contributes its high byte; float
/// input is saturated into 8 bits first.
pub(super) fn run(ctx: &mut ProcessingContext) -> Result<()> {
    let settings = ctx.settings.clone();
    let decoded = ctx
        .decoded
        .as_ref()
        .ok_or_else(|| SiftError::Pipeline("render before decode".into()))?;

    let eight = match decoded {
        Decoded::Mono8(m) => EightBit::Gray(m.clone()),
        Decoded::Mono16(m) => EightBit::Gray(m.mapv(|v| (v >> 8) as u8)),
        Decoded::MonoF32(m) => EightBit::Gray(m.mapv(|v| v.clamp(0.0, 255.0) as u8)),
        Decoded::Bgr8(m) => EightBit::Color(m.clone()),
        Decoded::Bgr16(m) => EightBit::Color(m.mapv(|v| (v >> 8) as u8)),
    };

    let (h, w) = match &eight {
        EightBit::Gray(m) => m.dim(),
        EightBit::Color(m) => {
            let (h, w, _) = m.dim();
            (h, w)
        }
    };

    let preview = ctx.rendered.get_or_insert_with(PreviewImage::default);
    if preview.width != w || preview.height != h {
        *preview = PreviewImage::new(w, h);
    }

    let mut hists = if settings.compute_histograms {
        ctx.histograms.clear();
        Some(&mut ctx.histograms)
    } else {
        None
    };

    match eight {
        EightBit::Gray(m) => {
            for row in 0..h {
                for col in 0..w {
                    let gray = m[[row, col]];
                    if let Some(hists) = hists.as_deref_mut() {
                        hists.red[gray as usize] += 1.0;
                    }
                    let px = &mut preview.pixels[4 * (row * w + col)..4 * (row * w + col) + 4];
                    if gray == 255 && settings.mark_clipped {
                        px[..3].copy_from_slice(&CLIPPED_BGR);
                    } else {
                        px[0] = gray;
                        px[1] = gray;
                        px[2] = gray;
                    }
                    px[3] = 255;
                }
            }
            if settings.logarithmic_histograms {
                if let Some(hists) = hists {
                    log_bins(&mut hists.red);
                }
            }
        }
        EightBit::Color(m) => {
            for row in 0..h {
                for col in 0..w {
                    let b = m[[row, col, 0]];
                    let g = m[[row, col, 1]];
                    let r = m[[row, col, 2]];
                    if let Some(hists) = hists.as_deref_mut() {
                        hists.red[r as usize] += 1.0;
                        hists.green[g as usize] += 1.0;
                        hists.blue[b as usize] += 1.0;
                    }
                    let px = &mut preview.pixels[4 * (row * w + col)..4 * (row * w + col) + 4];
                    px[3] = 255;
                    if settings.mark_clipped && (r == 255 || g == 255 || b == 255) {
                        px[..3].copy_from_slice(&CLIPPED_BGR);
                    } else {
                        px[0] = b;
                        px[1] = g;
                        px[2] = r;
                    }
                }
            }
            if settings.logarithmic_histograms {
                if let Some(hists) = hists {
                    log_bins(&mut hists.red);
                    log_bins(&mut hists.green);
                    log_bins(&mut hists.blue);
                }
            }
        }
    }
    Ok(())
}

fn log_bins(bins: &mut [f32; 256]) {
    for bin in bins.iter_mut() {
        *bin = (*bin + 1.0).log2();
    }
}
