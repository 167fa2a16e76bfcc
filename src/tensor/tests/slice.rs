use crate::errors::TensorError;
use crate::tensor::Matrix;

fn sample_4x3() -> Matrix {
    Matrix::from_row_major(
        &[
            1.0, 2.0, 3.0, //
            4.0, 5.0, 6.0, //
            7.0, 8.0, 9.0, //
            10.0, 11.0, 12.0,
        ],
        4,
        3,
    )
}

#[test]
fn test_assign_row_slice_values_of() {
    let src = sample_4x3();
    let mut dst = Matrix::zeros(2, 3);
    dst.assign_row_slice_values_of(0..3, &src, 0..3, 1, 2).unwrap();
    assert_eq!(
        dst,
        Matrix::from_row_major(&[4.0, 5.0, 6.0, 7.0, 8.0, 9.0], 2, 3)
    );
}

#[test]
fn test_add_to_row_slice_values_of_only_touches_window() {
    let grad = Matrix::from_row_major(&[1.0, 1.0, 1.0, 2.0, 2.0, 2.0], 2, 3);
    let mut dst = sample_4x3();
    dst.add_to_row_slice_values_of(0..3, &grad, 0..3, 2, 2).unwrap();
    assert_eq!(
        dst,
        Matrix::from_row_major(
            &[
                1.0, 2.0, 3.0, //
                4.0, 5.0, 6.0, //
                8.0, 9.0, 10.0, //
                12.0, 13.0, 14.0,
            ],
            4,
            3
        )
    );
}

#[test]
fn test_row_slice_out_of_bounds() {
    let src = sample_4x3();
    let mut dst = Matrix::zeros(2, 3);
    assert_eq!(
        dst.assign_row_slice_values_of(0..3, &src, 0..3, 3, 2),
        Err(TensorError::RowRangeOutOfBounds {
            start: 3,
            end: 5,
            rows: 4,
        })
    );
}

#[test]
fn test_column_window_out_of_bounds() {
    let src = sample_4x3();
    let mut dst = Matrix::zeros(4, 3);
    assert!(matches!(
        dst.assign_cols_of(2..4, &src, 0..2, false),
        Err(TensorError::ColRangeOutOfBounds { .. })
    ));
}

#[test]
fn test_assign_to_row_slice_and_add_with_row_slice() {
    let top = Matrix::from_row_major(&[1.0, 2.0], 1, 2);
    let bottom = Matrix::from_row_major(&[3.0, 4.0, 5.0, 6.0], 2, 2);
    let mut stacked = Matrix::zeros(3, 2);
    stacked.assign_to_row_slice_values_of(0..2, &top, 0..2, 0).unwrap();
    stacked.assign_to_row_slice_values_of(0..2, &bottom, 0..2, 1).unwrap();
    assert_eq!(
        stacked,
        Matrix::from_row_major(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3, 2)
    );

    let mut grad_bottom = Matrix::from_row_major(&[1.0, 1.0, 1.0, 1.0], 2, 2);
    grad_bottom
        .add_with_row_slice_values_of(0..2, &stacked, 0..2, 1)
        .unwrap();
    assert_eq!(
        grad_bottom,
        Matrix::from_row_major(&[4.0, 5.0, 6.0, 7.0], 2, 2)
    );
}

#[test]
fn test_repeat_and_its_gradient() {
    let src = Matrix::from_row_major(&[1.0, 2.0, 3.0, 4.0], 2, 2);
    let mut tiled = Matrix::zeros(6, 2);
    tiled.assign_repeat_of(0..2, &src, 0..2, 3).unwrap();
    assert_eq!(
        tiled,
        Matrix::from_row_major(
            &[1.0, 2.0, 3.0, 4.0, 1.0, 2.0, 3.0, 4.0, 1.0, 2.0, 3.0, 4.0],
            6,
            2
        )
    );

    let mut grad = Matrix::zeros(2, 2);
    grad.add_to_row_repeat_values_of(0..2, &tiled, 0..2, 3).unwrap();
    assert_eq!(
        grad,
        Matrix::from_row_major(&[3.0, 6.0, 9.0, 12.0], 2, 2)
    );
}

#[test]
fn test_single_column_window() {
    let src = sample_4x3();
    let mut dst = Matrix::zeros(4, 3);
    dst.assign_cols_of(1..2, &src, 2..3, false).unwrap();
    assert_eq!(dst.get(0, 1), Some(3.0));
    assert_eq!(dst.get(3, 1), Some(12.0));
    assert_eq!(dst.get(0, 0), Some(0.0));
    dst.assign_cols_of(1..2, &src, 2..3, true).unwrap();
    assert_eq!(dst.get(3, 1), Some(24.0));
}
