// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests on reading argument files and turning arguments into parameters.

use std::{fs::File, io::Write, path::PathBuf};

use approx::assert_abs_diff_eq;
use indoc::indoc;
use tempfile::{tempdir, TempDir};

use super::*;

fn write_arg_file(name: &str, contents: &str) -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join(name);
    let mut f = File::create(&path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    (dir, path)
}

fn minimal_args() -> ImagingArgs {
    ImagingArgs {
        grid: GridArgs {
            shape: Some(vec![64]),
            pixel_scale: Some(0.5),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn test_defaults() {
    let params = minimal_args().parse().unwrap();
    let geometry = ImagingGeometry::new(64, 64, 0.5).unwrap();
    assert_eq!(params, ImagingParams::new(geometry));
}

#[test]
fn test_missing_and_bad_geometry() {
    let mut args = minimal_args();
    args.grid.shape = None;
    assert!(matches!(args.parse(), Err(ArgsError::MissingGridShape)));

    let mut args = minimal_args();
    args.grid.pixel_scale = None;
    assert!(matches!(args.parse(), Err(ArgsError::MissingPixelScale)));

    let mut args = minimal_args();
    args.grid.shape = Some(vec![8, 8, 8]);
    assert!(matches!(args.parse(), Err(ArgsError::BadGridShape(s)) if s == vec![8, 8, 8]));

    let mut args = minimal_args();
    args.grid.shape = Some(vec![64, 7]);
    assert!(matches!(
        args.parse(),
        Err(ArgsError::Config(ConfigError::GridShape { rows: 64, cols: 7 }))
    ));
}

#[test]
fn test_unknown_names() {
    let mut args = minimal_args();
    args.grid.kernel = Some("bessel".to_string());
    match args.parse() {
        Err(ArgsError::UnknownName { what, got, valid }) => {
            assert_eq!(what, "kernel");
            assert_eq!(got, "bessel");
            assert_eq!(valid, "nearest, pillbox, gaussian-sinc, prolate-spheroidal");
        }
        other => panic!("Unexpected result: {other:?}"),
    }

    let mut args = minimal_args();
    args.deconvolution.algorithm = Some("wsclean".to_string());
    assert!(matches!(
        args.parse(),
        Err(ArgsError::UnknownName {
            what: "algorithm",
            ..
        })
    ));
}

#[test]
fn test_names_are_case_insensitive() {
    let mut args = minimal_args();
    args.grid.kernel = Some("Gaussian-Sinc".to_string());
    args.grid.weighting = Some("UNIFORM".to_string());
    args.deconvolution.algorithm = Some("MEM".to_string());
    let params = args.parse().unwrap();
    assert_eq!(params.grid.kernel.kernel_type(), KernelType::GaussianSinc);
    assert_eq!(params.grid.weighting, Weighting::Uniform);
    assert_eq!(params.deconvolver.deconvolver_type(), DeconvolverType::Mem);
}

#[test]
fn test_taper_needs_a_fwhm() {
    let mut args = minimal_args();
    args.grid.taper = Some("gaussian".to_string());
    assert!(matches!(args.parse(), Err(ArgsError::MissingTaperFwhm)));

    let mut args = minimal_args();
    args.grid.taper = Some("gaussian".to_string());
    args.grid.taper_fwhm = Some(0.3);
    let params = args.parse().unwrap();
    assert_eq!(params.grid.taper, UvTaper::Gaussian { fwhm: 0.3 });

    let mut args = minimal_args();
    args.grid.taper = Some("gaussian".to_string());
    args.grid.taper_fwhm = Some(-1.0);
    assert!(matches!(
        args.parse(),
        Err(ArgsError::Config(ConfigError::TaperFwhm(_)))
    ));
}

#[test]
fn test_clean_thresholds() {
    let mut args = minimal_args();
    args.clean.threshold_type = Some("absolute".to_string());
    assert!(matches!(
        args.clone().parse(),
        Err(ArgsError::MissingThreshold)
    ));

    args.clean.threshold = Some(0.02);
    let params = args.parse().unwrap();
    match params.deconvolver {
        DeconvolverParams::Clean(p) => assert_eq!(p.threshold, CleanThreshold::Absolute(0.02)),
        DeconvolverParams::Mem(_) => panic!("Expected CLEAN"),
    }

    let mut args = minimal_args();
    args.clean.threshold_type = Some("sigma".to_string());
    let params = args.parse().unwrap();
    match params.deconvolver {
        DeconvolverParams::Clean(p) => assert_eq!(
            p.threshold,
            CleanThreshold::NoiseSigma(DEFAULT_CLEAN_THRESHOLD_SIGMA)
        ),
        DeconvolverParams::Mem(_) => panic!("Expected CLEAN"),
    }
}

#[test]
fn test_restoring_beam() {
    let mut args = minimal_args();
    args.clean.beam_minor = Some(1.0);
    assert!(matches!(
        args.parse(),
        Err(ArgsError::IncompleteRestoringBeam)
    ));

    let mut args = minimal_args();
    args.clean.beam_major = Some(2.0);
    let params = args.parse().unwrap();
    match params.deconvolver {
        DeconvolverParams::Clean(p) => assert_eq!(
            p.restoring_beam,
            RestoringBeamSpec::Fixed {
                major: 2.0,
                minor: 2.0,
                pa: 0.0
            }
        ),
        DeconvolverParams::Mem(_) => panic!("Expected CLEAN"),
    }

    // The major axis can't be smaller than the minor axis.
    let mut args = minimal_args();
    args.clean.beam_major = Some(1.0);
    args.clean.beam_minor = Some(2.0);
    assert!(matches!(
        args.parse(),
        Err(ArgsError::Config(ConfigError::RestoringBeam { .. }))
    ));
}

#[test]
fn test_toml_arg_file() {
    let (_dir, path) = write_arg_file(
        "args.toml",
        indoc! {r#"
            [grid]
            shape = [32, 64]
            pixel_scale = 2.0
            kernel = "pillbox"
            kernel_support = 1.0
            oversample = 16
            weighting = "uniform"
            taper = "hann"
            normalisation = "transform"
            no_conjugates = true

            [deconvolution]
            algorithm = "mem"

            [mem]
            target_chi2 = 2.0
            max_iterations = 50

            [clean]
            gain = 5.0
        "#},
    );
    let args = ImagingArgs::from_file(&path).unwrap();
    assert_eq!(args.grid.shape, Some(vec![32, 64]));
    assert_eq!(args.mem.target_chi2, Some(2.0));
    assert!(args.grid.no_conjugates);
    assert!(!args.deconvolution.progress_bars);

    let params = ImagingArgs {
        args_file: Some(path),
        ..Default::default()
    }
    .parse()
    .unwrap();
    let geometry = params.grid.geometry;
    assert_eq!(geometry.shape(), (32, 64));
    assert_abs_diff_eq!(geometry.pixel_scale, 2.0);
    assert_eq!(params.grid.kernel, Kernel::Pillbox { support: 1.0 });
    assert_eq!(params.grid.oversample.get(), 16);
    assert_eq!(params.grid.weighting, Weighting::Uniform);
    assert_eq!(params.grid.taper, UvTaper::Hann);
    assert_eq!(params.normalisation, ImageNormalisation::Transform);
    assert!(!params.add_conjugates);
    // The invalid CLEAN gain is ignored because MEM was selected.
    match params.deconvolver {
        DeconvolverParams::Mem(p) => {
            assert_abs_diff_eq!(p.target_chi2, 2.0);
            assert_eq!(p.max_iterations, 50);
            assert_abs_diff_eq!(p.tolerance, DEFAULT_MEM_TOLERANCE);
        }
        DeconvolverParams::Clean(_) => panic!("Expected MEM"),
    }
}

#[test]
fn test_json_arg_file() {
    let (_dir, path) = write_arg_file(
        "args.json",
        indoc! {r#"
            {
                "grid": {
                    "shape": [16, 16],
                    "pixel_scale": 1.0,
                    "kernel": "nearest"
                },
                "clean": {
                    "gain": 0.2,
                    "threshold_type": "absolute",
                    "threshold": 0.001
                }
            }
        "#},
    );
    let params = ImagingArgs {
        args_file: Some(path),
        ..Default::default()
    }
    .parse()
    .unwrap();
    assert_eq!(params.grid.kernel, Kernel::Nearest);
    match params.deconvolver {
        DeconvolverParams::Clean(p) => {
            assert_abs_diff_eq!(p.gain, 0.2);
            assert_eq!(p.threshold, CleanThreshold::Absolute(0.001));
        }
        DeconvolverParams::Mem(_) => panic!("Expected CLEAN"),
    }
}

#[test]
fn test_merge_prefers_given_args() {
    let (_dir, path) = write_arg_file(
        "args.toml",
        indoc! {r#"
            [grid]
            shape = [32]
            pixel_scale = 2.0
            kernel = "pillbox"

            [clean]
            gain = 0.3
            max_iterations = 10
        "#},
    );
    let args = ImagingArgs {
        args_file: Some(path),
        grid: GridArgs {
            pixel_scale: Some(0.25),
            ..Default::default()
        },
        clean: CleanArgs {
            max_iterations: Some(20),
            ..Default::default()
        },
        ..Default::default()
    };
    let merged = args.merge().unwrap();
    assert!(merged.args_file.is_none());
    assert_eq!(merged.grid.shape, Some(vec![32]));
    assert_eq!(merged.grid.pixel_scale, Some(0.25));
    assert_eq!(merged.grid.kernel.as_deref(), Some("pillbox"));
    assert_eq!(merged.clean.gain, Some(0.3));
    assert_eq!(merged.clean.max_iterations, Some(20));
}

#[test]
fn test_bad_arg_files() {
    let (_dir, path) = write_arg_file("args.yaml", "grid: {}");
    assert!(matches!(
        ImagingArgs::from_file(&path),
        Err(ArgsError::ArgFile(_))
    ));

    let (_dir, path) = write_arg_file("args.toml", "[grid\nshape = 3");
    assert!(matches!(
        ImagingArgs::from_file(&path),
        Err(ArgsError::ArgFile(_))
    ));

    let dir = tempdir().unwrap();
    assert!(matches!(
        ImagingArgs::from_file(&dir.path().join("missing.json")),
        Err(ArgsError::IO(_))
    ));
}
