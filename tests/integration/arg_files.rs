// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Runs driven by argument files.

use std::{fs::File, io::Write};

use indoc::indoc;
use tempfile::tempdir;

use super::observe;
use xray_imager::{
    args::{GridArgs, MemArgs},
    reconstruct, ArgsError, CancelToken, ImagingArgs, ImagingContext, ImagingError,
    ImagingGeometry, TerminationReason,
};

#[test]
fn test_clean_from_a_toml_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("imaging.toml");
    let mut f = File::create(&path).unwrap();
    f.write_all(
        indoc! {r#"
            [grid]
            shape = [32]
            pixel_scale = 1.0
            kernel = "nearest"

            [deconvolution]
            algorithm = "clean"

            [clean]
            threshold_type = "fraction"
            threshold = 0.2
            beam_major = 3.0
        "#}
        .as_bytes(),
    )
    .unwrap();
    drop(f);

    let params = ImagingArgs {
        args_file: Some(path),
        ..Default::default()
    }
    .parse()
    .unwrap();
    let geometry = ImagingGeometry::new(32, 32, 1.0).unwrap();
    assert_eq!(params.grid.geometry, geometry);

    let table = observe(&geometry, &[((16, 16), 2.0)], 8, 1.0);
    let ctx = ImagingContext::from_params(&params).unwrap();
    let result = reconstruct(&table, &params, &ctx, &CancelToken::new()).unwrap();
    let d = &result.diagnostics.deconvolution;
    assert_eq!(d.termination, TerminationReason::Converged);
    assert!(result
        .deconvolution
        .components
        .iter()
        .all(|c| c.position == (16, 16)));
    let beam = d.restoring_beam.unwrap();
    assert_eq!(beam.major_fwhm, 3.0);
    assert_eq!(beam.minor_fwhm, 3.0);
    // A fixed beam means there's nothing to warn about.
    assert!(d.warnings.is_empty());
}

#[test]
fn test_mem_with_file_and_overrides() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("imaging.json");
    let mut f = File::create(&path).unwrap();
    f.write_all(
        indoc! {r#"
            {
                "grid": { "shape": [16, 16], "pixel_scale": 1.0, "kernel": "nearest" },
                "deconvolution": { "algorithm": "mem" },
                "mem": { "max_iterations": 3 }
            }
        "#}
        .as_bytes(),
    )
    .unwrap();
    drop(f);

    let args = ImagingArgs {
        args_file: Some(path),
        mem: MemArgs {
            max_iterations: Some(2),
            ..Default::default()
        },
        ..Default::default()
    };
    let params = args.parse().unwrap();
    let geometry = params.grid.geometry;
    let table = observe(&geometry, &[((5, 10), 1.0)], 5, 10.0);
    let ctx = ImagingContext::from_params(&params).unwrap();
    let result = reconstruct(&table, &params, &ctx, &CancelToken::new()).unwrap();

    let d = &result.diagnostics.deconvolution;
    assert_eq!(d.termination, TerminationReason::MaxIterations);
    assert_eq!(d.iterations, 2);
    assert!(d.mem.is_some());
    assert!(result.deconvolution.restored.is_none());
}

#[test]
fn test_args_errors_convert() {
    let args = ImagingArgs {
        grid: GridArgs {
            shape: Some(vec![32]),
            ..Default::default()
        },
        ..Default::default()
    };
    let err: ImagingError = args.parse().unwrap_err().into();
    assert!(matches!(
        err,
        ImagingError::Args(ArgsError::MissingPixelScale)
    ));
    assert_eq!(err.to_string(), "No pixel scale was specified");
}
