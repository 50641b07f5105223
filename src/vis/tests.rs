// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;

use super::*;

#[test]
fn test_from_tuples() {
    let table =
        VisibilityTable::from_tuples([(1.0, 2.0, 3.0, -4.0, 0.5), (-1.0, 0.0, 1.0, 0.0, 2.0)])
            .unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.as_slice()[0].vis, c64::new(3.0, -4.0));
    assert_abs_diff_eq!(table.total_weight(), 2.5);
    assert_abs_diff_eq!(table.max_uv(), 2.0);
    assert!(table.check_imageable().is_ok());
}

#[test]
fn test_negative_weight_is_rejected() {
    let result = VisibilityTable::from_tuples([
        (0.0, 0.0, 1.0, 0.0, 1.0),
        (0.0, 0.0, 1.0, 0.0, -1.0),
    ]);
    assert_eq!(
        result,
        Err(DataError::NegativeWeight {
            index: 1,
            weight: -1.0
        })
    );
}

#[test]
fn test_non_finite_is_rejected() {
    let result = VisibilityTable::from_tuples([(f64::NAN, 0.0, 1.0, 0.0, 1.0)]);
    assert_eq!(result, Err(DataError::NonFinite { index: 0 }));
}

#[test]
fn test_empty_table_isnt_imageable() {
    let table = VisibilityTable::new(vec![]).unwrap();
    assert!(table.is_empty());
    assert_eq!(table.check_imageable(), Err(DataError::EmptyTable));
}

#[test]
fn test_all_flagged_isnt_imageable() {
    let mut vis = Visibility::new(1.0, 1.0, c64::new(1.0, 0.0), 1.0);
    vis.flagged = true;
    let table = VisibilityTable::new(vec![vis; 3]).unwrap();
    assert_eq!(table.num_unflagged(), 0);
    assert_eq!(table.check_imageable(), Err(DataError::AllFlagged { num: 3 }));
}

#[test]
fn test_zero_weights_arent_imageable() {
    let table =
        VisibilityTable::from_tuples([(1.0, 0.0, 1.0, 0.0, 0.0), (2.0, 0.0, 1.0, 0.0, 0.0)])
            .unwrap();
    assert_eq!(table.check_imageable(), Err(DataError::ZeroWeights));
}

#[test]
fn test_with_conjugates() {
    let mut flagged = Visibility::new(5.0, 5.0, c64::new(1.0, 1.0), 1.0);
    flagged.flagged = true;
    let table = VisibilityTable::new(vec![
        Visibility::new(1.0, -2.0, c64::new(3.0, 4.0), 0.5),
        flagged,
    ])
    .unwrap();

    let sym = table.with_conjugates();
    // The flagged visibility doesn't get a partner.
    assert_eq!(sym.len(), 3);
    let partner = sym.as_slice()[2];
    assert_abs_diff_eq!(partner.u, -1.0);
    assert_abs_diff_eq!(partner.v, 2.0);
    assert_abs_diff_eq!(partner.vis, c64::new(3.0, -4.0));
    assert_abs_diff_eq!(partner.weight, 0.5);
    // The input table is untouched.
    assert_eq!(table.len(), 2);
}
