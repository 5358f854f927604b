use ndarray::Array2;

use crate::blur::gaussian_blur;
use crate::context::ProcessingContext;
use crate::error::{Result, SiftError};

/// Signal-to-noise style sharpness estimate via two cascaded Gaussian
/// blurs: noise is the energy removed by the narrow blur, signal the
/// energy between the narrow and wide blurs. Color frames accumulate
/// over all planes.
/// Below this, residual energy is float rounding noise from blurring a
/// flat frame, not real image content.
const NOISE_FLOOR: f64 = 1e-6;

pub(super) fn run(ctx: &mut ProcessingContext) -> Result<()> {
    if ctx.decoded_float.is_empty() {
        return Err(SiftError::Pipeline("quality estimate before decode".into()));
    }
    let estimator = ctx.settings.estimator;

    ctx.blur_noise.clear();
    ctx.blur_signal.clear();
    let mut noise = 0.0f64;
    let mut signal = 0.0f64;

    for plane in &ctx.decoded_float {
        let blur_noise = gaussian_blur(plane, estimator.noise_sigma);
        let blur_signal = gaussian_blur(&blur_noise, estimator.signal_sigma);
        noise += squared_distance(plane, &blur_noise);
        signal += squared_distance(&blur_noise, &blur_signal);
        ctx.blur_noise.push(blur_noise);
        ctx.blur_signal.push(blur_signal);
    }

    ctx.quality = if noise <= NOISE_FLOOR {
        0.0
    } else {
        (signal / noise) as f32
    };
    Ok(())
}

fn squared_distance(a: &Array2<f32>, b: &Array2<f32>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = (x - y) as f64;
            d * d
        })
        .sum()
}
