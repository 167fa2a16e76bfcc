use crate::errors::TensorError;
use crate::tensor::Matrix;

#[test]
fn test_new_is_column_major() {
    // 第0列为[1,2]，第1列为[3,4]，第2列为[5,6]
    let m = Matrix::new(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3);
    assert_eq!(m.shape(), [2, 3]);
    assert_eq!(m.get(0, 0), Some(1.0));
    assert_eq!(m.get(1, 0), Some(2.0));
    assert_eq!(m.get(0, 2), Some(5.0));
    assert_eq!(m.get(2, 0), None);
    assert_eq!(m.to_row_major_vec(), vec![1.0, 3.0, 5.0, 2.0, 4.0, 6.0]);
}

#[test]
fn test_from_row_major_matches_new() {
    let a = Matrix::from_row_major(&[1.0, 3.0, 5.0, 2.0, 4.0, 6.0], 2, 3);
    let b = Matrix::new(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3);
    assert_eq!(a, b);
}

#[test]
fn test_try_from_row_major_element_count_mismatch() {
    assert_eq!(
        Matrix::<f64>::try_from_row_major(&[1.0, 2.0, 3.0, 4.0, 5.0], 2, 3),
        Err(TensorError::ElementCountMismatch {
            data_len: 5,
            shape: [2, 3],
            expected: 6,
        })
    );
}

#[test]
fn test_sum() {
    let m = Matrix::from_row_major(&[1.0, -2.0, 3.5, 0.5], 2, 2);
    assert_eq!(m.sum(), 3.0);
    assert_eq!(Matrix::<f32>::zeros(0, 3).sum(), 0.0);
}

#[test]
fn test_try_new_element_count_mismatch() {
    let result = Matrix::<f32>::try_new(&[1.0, 2.0, 3.0], 2, 2);
    assert_eq!(
        result,
        Err(TensorError::ElementCountMismatch {
            data_len: 3,
            shape: [2, 2],
            expected: 4,
        })
    );
}

#[test]
fn test_reshaped_keeps_column_major_order() {
    let m = Matrix::new(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3);
    let r = m.reshaped(3, 2).unwrap();
    assert_eq!(r.shape(), [3, 2]);
    assert_eq!(r.to_col_major_vec(), m.to_col_major_vec());
    // 第1列是原先的第4~6个元素
    assert_eq!(r.get(0, 1), Some(4.0));
}

#[test]
fn test_reshaped_rejects_wrong_size() {
    let m = Matrix::<f64>::zeros(2, 3);
    assert!(matches!(
        m.reshaped(4, 2),
        Err(TensorError::ElementCountMismatch { .. })
    ));
}

#[test]
fn test_resize_keeps_content_when_shape_unchanged() {
    let mut m = Matrix::new(&[1.0, 2.0], 1, 2);
    m.resize(1, 2);
    assert_eq!(m.to_col_major_vec(), vec![1.0, 2.0]);
    m.resize(2, 2);
    assert_eq!(m.to_col_major_vec(), vec![0.0; 4]);
}

#[test]
fn test_add_assign_shape_mismatch() {
    let mut a = Matrix::<f32>::zeros(2, 2);
    let b = Matrix::<f32>::zeros(2, 3);
    assert!(matches!(
        a.add_assign(&b),
        Err(TensorError::OperatorError { .. })
    ));
}
