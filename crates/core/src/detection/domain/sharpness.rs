use ndarray::ArrayView2;

use crate::shared::constants::SHARPNESS_NORMALIZATION;

/// Variance of the 3x3 Laplacian response over a grayscale patch.
///
/// Kernel `[0,1,0; 1,-4,1; 0,1,0]`, evaluated at every pixel with
/// reflect-101 borders (`dcb|abcd|cba`), population variance. Higher means
/// more second-derivative edge energy, i.e. a sharper patch. Empty patches
/// score 0.
pub fn laplacian_variance(patch: ArrayView2<'_, u8>) -> f64 {
    let (h, w) = patch.dim();
    if h == 0 || w == 0 {
        return 0.0;
    }

    let at = |row: isize, col: isize| -> f64 {
        patch[[reflect101(row, h), reflect101(col, w)]] as f64
    };

    let count = (h * w) as f64;
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;

    for row in 0..h as isize {
        for col in 0..w as isize {
            let response = at(row - 1, col) + at(row + 1, col) + at(row, col - 1)
                + at(row, col + 1)
                - 4.0 * at(row, col);
            sum += response;
            sum_sq += response * response;
        }
    }

    let mean = sum / count;
    (sum_sq / count - mean * mean).max(0.0)
}

/// Monotonic, saturating map from sharpness to `[0, 1]`.
pub fn confidence_from_sharpness(sharpness: f64) -> f64 {
    if !sharpness.is_finite() || sharpness <= 0.0 {
        return 0.0;
    }
    (sharpness / SHARPNESS_NORMALIZATION).min(1.0)
}

fn reflect101(index: isize, len: usize) -> usize {
    let len = len as isize;
    if len == 1 {
        return 0;
    }
    let mut i = index;
    // Loop covers patches narrower than the kernel reach.
    loop {
        if i < 0 {
            i = -i;
        } else if i >= len {
            i = 2 * len - 2 - i;
        } else {
            return i as usize;
        }
    }
}
