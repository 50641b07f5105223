// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reconstruct simple skies from their visibilities.

use approx::assert_abs_diff_eq;

use super::{observe, Sky};
use xray_imager::{
    gridding::Kernel,
    params::{CleanParams, DeconvolverParams, MemParams},
    reconstruct, CancelToken, DataError, ImagingContext, ImagingError, ImagingGeometry,
    ImagingParams, TerminationReason, VisibilityTable,
};

const BRIGHT: (usize, usize) = (12, 20);
const FAINT: (usize, usize) = (20, 10);
const SKY: &Sky = &[(BRIGHT, 1.0), (FAINT, 0.5)];

fn clean_params(geometry: ImagingGeometry, kernel: Kernel) -> ImagingParams {
    let mut params = ImagingParams::new(geometry);
    params.grid.kernel = kernel;
    params.deconvolver = DeconvolverParams::Clean(CleanParams::default());
    params
}

#[test]
fn test_clean_recovers_two_point_sources() {
    let geometry = ImagingGeometry::new(32, 32, 1.0).unwrap();
    let table = observe(&geometry, SKY, 10, 1.0);
    for kernel in [Kernel::Nearest, Kernel::default()] {
        let params = clean_params(geometry, kernel);
        let ctx = ImagingContext::from_params(&params).unwrap();
        let result = reconstruct(&table, &params, &ctx, &CancelToken::new()).unwrap();

        // The dirty image peaks on the bright source.
        let dirty = &result.dirty;
        assert_eq!(dirty.dirty.peak().0, BRIGHT);
        assert_abs_diff_eq!(dirty.dirty.data[BRIGHT], 1.0, epsilon = 0.01);
        assert_abs_diff_eq!(dirty.beam.data[dirty.beam.reference_pixel], 1.0, epsilon = 1e-12);
        assert_eq!(dirty.gridding.num_out_of_grid, 0);

        // Sidelobes that wrap around the image edges are cleaned too, so the
        // default threshold (1% of the peak) is reached.
        let d = &result.diagnostics.deconvolution;
        assert_eq!(d.termination, TerminationReason::Converged, "{kernel:?}");
        assert!(d.iterations > 0);
        let initial = d.trace.first().metric;
        assert!(d.trace.last().metric <= 0.01 * initial);
        for pair in d.trace.windows(2) {
            assert!(pair[1].metric <= pair[0].metric, "{pair:?}");
        }

        // Every component is on a source, and the fluxes are recovered.
        let deconvolution = &result.deconvolution;
        for c in &deconvolution.components {
            assert!(c.position == BRIGHT || c.position == FAINT, "{c:?}");
        }
        let model = &deconvolution.model.data;
        let (bright, faint) = (model[BRIGHT], model[FAINT]);
        assert!(bright > 0.97 && bright <= 1.0, "{bright}");
        assert!(faint > 0.47 && faint <= 0.51, "{faint}");

        let restored = deconvolution.restored.as_ref().unwrap();
        assert_eq!(restored.peak().0, BRIGHT);
        assert_eq!(restored.pixel_scale, 1.0);
    }
}

#[test]
fn test_mem_recovers_two_point_sources() {
    let geometry = ImagingGeometry::new(32, 32, 1.0).unwrap();
    let table = observe(&geometry, SKY, 10, 1.0);
    for kernel in [Kernel::Nearest, Kernel::default()] {
        let mut params = ImagingParams::new(geometry);
        params.grid.kernel = kernel;
        params.deconvolver = DeconvolverParams::Mem(MemParams::default());
        let ctx = ImagingContext::from_params(&params).unwrap();
        let result = reconstruct(&table, &params, &ctx, &CancelToken::new()).unwrap();

        let d = &result.diagnostics.deconvolution;
        assert_eq!(d.termination, TerminationReason::Converged, "{kernel:?}");
        let chi2 = d.mem.unwrap().chi2;
        assert_abs_diff_eq!(chi2, 1.0, epsilon = 0.05);
        assert!(d.warnings.is_empty());

        let model = &result.deconvolution.model;
        assert_eq!(model.peak().0, BRIGHT);
        assert!(model.data.iter().all(|&v| v > 0.0));
    }
}

#[test]
fn test_diagnostics_merge_warnings() {
    let geometry = ImagingGeometry::new(32, 32, 1.0).unwrap();
    let mut table = observe(&geometry, SKY, 10, 1.0).as_slice().to_vec();
    // Beyond the edge of the grid.
    let mut outside = table[0];
    outside.u = 100.0;
    table.push(outside);
    let table = VisibilityTable::new(table).unwrap();

    let params = clean_params(geometry, Kernel::Nearest);
    let ctx = ImagingContext::from_params(&params).unwrap();
    let result = reconstruct(&table, &params, &ctx, &CancelToken::new()).unwrap();

    let d = &result.diagnostics;
    // Only the visibility is counted, not its Hermitian partner.
    assert_eq!(d.gridding.num_out_of_grid, 1);
    assert_eq!(d.warnings[0], xray_imager::NumericalWarning::OutOfGridSamples { num: 1 });
    assert_eq!(
        d.warnings.len(),
        result.dirty.warnings.len() + d.deconvolution.warnings.len()
    );

    let json = d.to_json().unwrap();
    assert!(json.contains("\"termination\": \"converged\""));
    assert!(json.contains("\"kind\": \"out-of-grid-samples\""));
}

#[test]
fn test_data_errors_come_before_gridding() {
    let geometry = ImagingGeometry::new(32, 32, 1.0).unwrap();
    let params = clean_params(geometry, Kernel::Nearest);
    let ctx = ImagingContext::from_params(&params).unwrap();

    let empty = VisibilityTable::new(vec![]).unwrap();
    assert!(matches!(
        reconstruct(&empty, &params, &ctx, &CancelToken::new()),
        Err(ImagingError::Data(DataError::EmptyTable))
    ));

    let zero_weights = VisibilityTable::from_tuples([(0.0, 0.0, 1.0, 0.0, 0.0)]).unwrap();
    assert!(matches!(
        reconstruct(&zero_weights, &params, &ctx, &CancelToken::new()),
        Err(ImagingError::Data(DataError::ZeroWeights))
    ));
}
