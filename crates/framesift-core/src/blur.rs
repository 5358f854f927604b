use ndarray::Array2;
use rayon::prelude::*;

/// Minimum pixel count (h*w) to justify row-level parallelism.
pub(crate) const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Separable Gaussian blur with clamp-to-edge borders. The kernel radius
/// is derived from sigma; sigma <= 0 yields the identity.
pub fn gaussian_blur(data: &Array2<f32>, sigma: f64) -> Array2<f32> {
    let kernel = gaussian_kernel(sigma);
    if kernel.len() == 1 {
        return data.clone();
    }
    let rows = convolve_rows(data, &kernel);
    convolve_rows(&rows.reversed_axes(), &kernel).reversed_axes()
}

fn gaussian_kernel(sigma: f64) -> Vec<f32> {
    if sigma <= 0.0 {
        return vec![1.0];
    }
    let radius = (sigma * 3.0).ceil() as usize;
    let s2 = (2.0 * sigma * sigma) as f32;
    let mut kernel: Vec<f32> = (0..2 * radius + 1)
        .map(|i| {
            let x = i as f32 - radius as f32;
            (-x * x / s2).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }
    kernel
}

/// One horizontal pass. The vertical pass reuses this on the transposed
/// view.
fn convolve_rows(data: &Array2<f32>, kernel: &[f32]) -> Array2<f32> {
    let (h, w) = data.dim();
    let radius = kernel.len() / 2;

    let convolve_row = |row: usize| -> Vec<f32> {
        (0..w)
            .map(|col| {
                kernel
                    .iter()
                    .enumerate()
                    .map(|(ki, &kv)| {
                        let src = (col as isize + ki as isize - radius as isize)
                            .clamp(0, w as isize - 1) as usize;
                        data[[row, src]] * kv
                    })
                    .sum()
            })
            .collect()
    };

    let rows: Vec<Vec<f32>> = if h * w >= PARALLEL_PIXEL_THRESHOLD {
        (0..h).into_par_iter().map(convolve_row).collect()
    } else {
        (0..h).map(convolve_row).collect()
    };

    let mut result = Array2::<f32>::zeros((h, w));
    for (row, row_data) in rows.into_iter().enumerate() {
        for (col, val) in row_data.into_iter().enumerate() {
            result[[row, col]] = val;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn kernel_is_normalized() {
        let kernel = gaussian_kernel(2.5);
        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert_eq!(kernel.len(), 2 * 8 + 1);
    }

    #[test]
    fn zero_sigma_is_identity() {
        let data = Array2::from_shape_fn((6, 6), |(r, c)| (r * c) as f32);
        assert_eq!(gaussian_blur(&data, 0.0), data);
    }

    #[test]
    fn constant_image_is_unchanged() {
        let data = Array2::from_elem((12, 12), 3.5f32);
        let blurred = gaussian_blur(&data, 2.0);
        for v in blurred.iter() {
            assert!((v - 3.5).abs() < 1e-5);
        }
    }

    #[test]
    fn blur_reduces_peak() {
        let mut data = Array2::<f32>::zeros((11, 11));
        data[[5, 5]] = 1.0;
        let blurred = gaussian_blur(&data, 1.0);
        assert!(blurred[[5, 5]] < 0.5);
        assert!(blurred[[5, 5]] > blurred[[5, 7]]);
        let total: f32 = blurred.iter().sum();
        assert!((total - 1.0).abs() < 1e-4, "blur should preserve energy");
    }
}
