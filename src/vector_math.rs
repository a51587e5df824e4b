use ndarray::{Array2, Axis};

const NORM_EPSILON: f32 = 1e-8;

/// Scales `vector` to unit length in place. Zero vectors are left untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm <= NORM_EPSILON {
        return;
    }
    for value in vector.iter_mut() {
        *value /= norm;
    }
}

/// Normalizes every row of `matrix` to unit length.
pub fn l2_normalize_rows(matrix: &mut Array2<f32>) {
    for mut row in matrix.axis_iter_mut(Axis(0)) {
        let norm = row.dot(&row).sqrt();
        if norm > NORM_EPSILON {
            row.mapv_inplace(|value| value / norm);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn approx_eq(left: f32, right: f32) -> bool {
        (left - right).abs() < 1e-5
    }

    #[test]
    fn normalize_produces_unit_length() {
        let mut vec = vec![3.0, 4.0];
        l2_normalize(&mut vec);
        assert!(approx_eq(vec[0], 0.6));
        assert!(approx_eq(vec[1], 0.8));
    }

    #[test]
    fn normalize_leaves_zero_vector_alone() {
        let mut vec = vec![0.0, 0.0, 0.0];
        l2_normalize(&mut vec);
        assert_eq!(vec, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn normalize_rows_handles_each_row_independently() {
        let mut matrix = array![[3.0_f32, 4.0], [0.0, 0.0], [0.0, 2.0]];
        l2_normalize_rows(&mut matrix);
        assert!(approx_eq(matrix[[0, 0]], 0.6));
        assert!(approx_eq(matrix[[0, 1]], 0.8));
        assert_eq!(matrix[[1, 0]], 0.0);
        assert!(approx_eq(matrix[[2, 1]], 1.0));
    }
}
