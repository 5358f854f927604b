use ndarray::Array2;
use rayon::prelude::*;

use crate::blur::PARALLEL_PIXEL_THRESHOLD;
use crate::context::{PaintObject, ProcessingContext, RectStyle};
use crate::error::{Result, SiftError};
use crate::pixels::CropRect;

/// Center a `cropWidth` square on the thresholded centroid of the
/// grayscale frame. Disabled cropping selects the full image. A square
/// extending past the image edges fails the frame.
pub(super) fn run(ctx: &mut ProcessingContext) -> Result<()> {
    let (h, w) = ctx.grayscale.dim();
    if h == 0 || w == 0 {
        return Err(SiftError::Pipeline("crop before decode".into()));
    }

    if !ctx.settings.do_crop {
        ctx.crop_area = CropRect::full(w, h);
        return Ok(());
    }

    let (center_row, center_col) =
        threshold_centroid(&ctx.grayscale, ctx.settings.threshold as f32);
    let rect = CropRect::centered_square(center_col, center_row, ctx.settings.crop_width);
    ctx.crop_area = rect;

    if !rect.fits_within(w, h) {
        if ctx.do_render {
            ctx.paint_objects.push(PaintObject::Label {
                text: "Out of bounds!".into(),
            });
        }
        return Err(SiftError::CropOutOfBounds);
    }

    if ctx.do_render {
        ctx.paint_objects.push(PaintObject::Rectangle {
            rect: rect.inflated(1),
            style: RectStyle::SolidBlack,
        });
        ctx.paint_objects.push(PaintObject::Rectangle {
            rect,
            style: RectStyle::DottedWhite,
        });
    }
    Ok(())
}

/// Centroid of the binary mask `pixel > threshold`, as
/// `(center_row, center_col)`. Falls back to the geometric center when
/// no pixel exceeds the threshold.
fn threshold_centroid(data: &Array2<f32>, threshold: f32) -> (f64, f64) {
    let (h, w) = data.dim();

    let (sum_row, sum_col, count) = if h * w >= PARALLEL_PIXEL_THRESHOLD {
        (0..h)
            .into_par_iter()
            .map(|row| {
                let mut sum_col = 0u64;
                let mut count = 0u64;
                for col in 0..w {
                    if data[[row, col]] > threshold {
                        sum_col += col as u64;
                        count += 1;
                    }
                }
                (row as u64 * count, sum_col, count)
            })
            .reduce(|| (0, 0, 0), |a, b| (a.0 + b.0, a.1 + b.1, a.2 + b.2))
    } else {
        let mut sums = (0u64, 0u64, 0u64);
        for row in 0..h {
            for col in 0..w {
                if data[[row, col]] > threshold {
                    sums.0 += row as u64;
                    sums.1 += col as u64;
                    sums.2 += 1;
                }
            }
        }
        sums
    };

    if count > 0 {
        (sum_row as f64 / count as f64, sum_col as f64 / count as f64)
    } else {
        (h as f64 / 2.0, w as f64 / 2.0)
    }
}
