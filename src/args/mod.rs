// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! User-facing imaging arguments.
//!
//! Every argument is optional, so that arguments can come from a file, from
//! the caller, or both. Arguments are parsed into [`ImagingParams`], which
//! fills in defaults and validates everything.

mod error;
mod printers;
#[cfg(test)]
mod tests;

pub use error::ArgsError;
pub(crate) use printers::{display_warnings, InfoPrinter};

use std::{
    fs::File,
    io::Read,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    str::FromStr,
};

use itertools::Itertools;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    constants::*,
    gridding::{Kernel, KernelType, UvTaper, UvTaperType, Weighting},
    image::ImagingGeometry,
    params::{
        CleanParams, CleanThreshold, ConfigError, DeconvolverParams, DeconvolverType,
        GridParams, ImageNormalisation, ImagingParams, MemParams, RestoringBeamSpec,
        ThresholdType,
    },
};

lazy_static::lazy_static! {
    pub static ref ARG_FILE_TYPES_COMMA_SEPARATED: String = ArgFileTypes::iter().join(", ");

    pub static ref KERNEL_TYPES_COMMA_SEPARATED: String = KernelType::iter().join(", ");

    pub static ref WEIGHTINGS_COMMA_SEPARATED: String = Weighting::iter().join(", ");

    pub static ref TAPER_TYPES_COMMA_SEPARATED: String = UvTaperType::iter().join(", ");

    pub static ref NORMALISATIONS_COMMA_SEPARATED: String = ImageNormalisation::iter().join(", ");

    pub static ref DECONVOLVER_TYPES_COMMA_SEPARATED: String = DeconvolverType::iter().join(", ");

    pub static ref THRESHOLD_TYPES_COMMA_SEPARATED: String = ThresholdType::iter().join(", ");
}

/// The formats an argument file can be in, named by file extension.
#[derive(Debug, Display, EnumIter, EnumString)]
pub enum ArgFileTypes {
    #[strum(serialize = "toml")]
    Toml,
    #[strum(serialize = "json")]
    Json,
}

/// Parse `name` as one of the strum-named variants of `T`.
fn parse_name<T: FromStr>(name: &str, what: &'static str, valid: &str) -> Result<T, ArgsError> {
    T::from_str(&name.to_lowercase()).map_err(|_| ArgsError::UnknownName {
        what,
        got: name.to_string(),
        valid: valid.to_string(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridArgs {
    /// The number of image rows and columns. A single number makes a square
    /// image.
    pub shape: Option<Vec<usize>>,

    /// The angular size of a pixel. Visibility coordinates must be in the
    /// inverse of this unit.
    pub pixel_scale: Option<f64>,

    /// The gridding kernel family.
    pub kernel: Option<String>,

    /// The kernel support radius \[grid cells\]. Default depends on the
    /// kernel.
    pub kernel_support: Option<f64>,

    /// The number of kernel table entries per grid cell.
    pub oversample: Option<usize>,

    pub weighting: Option<String>,

    pub taper: Option<String>,

    /// The FWHM of a Gaussian uv taper \[inverse angle\].
    pub taper_fwhm: Option<f64>,

    /// The units of the output images.
    pub normalisation: Option<String>,

    /// Don't add the Hermitian partner of each visibility before gridding.
    #[serde(default)]
    pub no_conjugates: bool,
}

impl GridArgs {
    pub fn merge(self, other: Self) -> Self {
        Self {
            shape: self.shape.or(other.shape),
            pixel_scale: self.pixel_scale.or(other.pixel_scale),
            kernel: self.kernel.or(other.kernel),
            kernel_support: self.kernel_support.or(other.kernel_support),
            oversample: self.oversample.or(other.oversample),
            weighting: self.weighting.or(other.weighting),
            taper: self.taper.or(other.taper),
            taper_fwhm: self.taper_fwhm.or(other.taper_fwhm),
            normalisation: self.normalisation.or(other.normalisation),
            no_conjugates: self.no_conjugates || other.no_conjugates,
        }
    }

    fn parse(self) -> Result<(GridParams, ImageNormalisation, bool), ArgsError> {
        let GridArgs {
            shape,
            pixel_scale,
            kernel,
            kernel_support,
            oversample,
            weighting,
            taper,
            taper_fwhm,
            normalisation,
            no_conjugates,
        } = self;

        let (rows, cols) = match shape.ok_or(ArgsError::MissingGridShape)?.as_slice() {
            [n] => (*n, *n),
            [rows, cols] => (*rows, *cols),
            other => return Err(ArgsError::BadGridShape(other.to_vec())),
        };
        let pixel_scale = pixel_scale.ok_or(ArgsError::MissingPixelScale)?;
        let geometry = ImagingGeometry::new(rows, cols, pixel_scale)?;

        let kernel = match kernel {
            Some(k) => {
                let kernel_type: KernelType =
                    parse_name(&k, "kernel", &KERNEL_TYPES_COMMA_SEPARATED)?;
                Kernel::from_type(kernel_type, kernel_support)
            }
            None => Kernel::from_type(KernelType::ProlateSpheroidal, kernel_support),
        };
        let oversample = match oversample {
            Some(o) => NonZeroUsize::new(o).ok_or(ConfigError::Oversample)?,
            None => GridParams::new(geometry).oversample,
        };
        let weighting = match weighting {
            Some(w) => parse_name(&w, "weighting", &WEIGHTINGS_COMMA_SEPARATED)?,
            None => Weighting::default(),
        };
        let taper_type = match taper {
            Some(t) => parse_name(&t, "uv taper", &TAPER_TYPES_COMMA_SEPARATED)?,
            None => UvTaperType::None,
        };
        let taper = match taper_type {
            UvTaperType::None => UvTaper::None,
            UvTaperType::Gaussian => UvTaper::Gaussian {
                fwhm: taper_fwhm.ok_or(ArgsError::MissingTaperFwhm)?,
            },
            UvTaperType::Hann => UvTaper::Hann,
            UvTaperType::Blackman => UvTaper::Blackman,
        };
        let normalisation = match normalisation {
            Some(n) => parse_name(&n, "normalisation", &NORMALISATIONS_COMMA_SEPARATED)?,
            None => ImageNormalisation::default(),
        };

        let grid_params = GridParams {
            geometry,
            kernel,
            oversample,
            weighting,
            taper,
        };
        Ok((grid_params, normalisation, !no_conjugates))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeconvolutionArgs {
    /// The deconvolution algorithm. Default: clean.
    pub algorithm: Option<String>,

    /// Show a progress bar while deconvolving.
    #[serde(default)]
    pub progress_bars: bool,
}

impl DeconvolutionArgs {
    pub fn merge(self, other: Self) -> Self {
        Self {
            algorithm: self.algorithm.or(other.algorithm),
            progress_bars: self.progress_bars || other.progress_bars,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanArgs {
    /// The loop gain.
    pub gain: Option<f64>,

    /// How the threshold is interpreted. Default: fraction.
    pub threshold_type: Option<String>,

    pub threshold: Option<f64>,

    pub max_iterations: Option<usize>,

    pub stall_window: Option<usize>,

    /// The restoring-beam major-axis FWHM, in the units of the pixel scale.
    /// If not given, a beam is fitted to the dirty beam.
    pub beam_major: Option<f64>,

    /// The restoring-beam minor-axis FWHM. Default: the major axis.
    pub beam_minor: Option<f64>,

    /// The restoring-beam position angle \[radians\]. Default: 0.
    pub beam_pa: Option<f64>,
}

impl CleanArgs {
    pub fn merge(self, other: Self) -> Self {
        Self {
            gain: self.gain.or(other.gain),
            threshold_type: self.threshold_type.or(other.threshold_type),
            threshold: self.threshold.or(other.threshold),
            max_iterations: self.max_iterations.or(other.max_iterations),
            stall_window: self.stall_window.or(other.stall_window),
            beam_major: self.beam_major.or(other.beam_major),
            beam_minor: self.beam_minor.or(other.beam_minor),
            beam_pa: self.beam_pa.or(other.beam_pa),
        }
    }

    fn parse(self) -> Result<CleanParams, ArgsError> {
        let CleanArgs {
            gain,
            threshold_type,
            threshold,
            max_iterations,
            stall_window,
            beam_major,
            beam_minor,
            beam_pa,
        } = self;

        let threshold_type = match threshold_type {
            Some(t) => parse_name(&t, "threshold type", &THRESHOLD_TYPES_COMMA_SEPARATED)?,
            None => ThresholdType::FractionOfPeak,
        };
        let threshold_value = match (threshold_type, threshold) {
            (_, Some(v)) => v,
            (ThresholdType::Absolute, None) => return Err(ArgsError::MissingThreshold),
            (ThresholdType::FractionOfPeak, None) => DEFAULT_CLEAN_THRESHOLD_FRACTION,
            (ThresholdType::NoiseSigma, None) => DEFAULT_CLEAN_THRESHOLD_SIGMA,
        };

        let restoring_beam = match (beam_major, beam_minor, beam_pa) {
            (Some(major), minor, pa) => RestoringBeamSpec::Fixed {
                major,
                minor: minor.unwrap_or(major),
                pa: pa.unwrap_or(0.0),
            },
            (None, None, None) => RestoringBeamSpec::Fit,
            (None, _, _) => return Err(ArgsError::IncompleteRestoringBeam),
        };

        Ok(CleanParams {
            gain: gain.unwrap_or(DEFAULT_LOOP_GAIN),
            threshold: CleanThreshold::from_type(threshold_type, threshold_value),
            max_iterations: max_iterations.unwrap_or(DEFAULT_CLEAN_MAX_ITERATIONS),
            stall_window: stall_window.unwrap_or(DEFAULT_STALL_WINDOW),
            restoring_beam,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemArgs {
    /// The reduced chi-squared to aim for.
    pub target_chi2: Option<f64>,

    /// The fractional tolerance on the target chi-squared.
    pub tolerance: Option<f64>,

    pub entropy_weight: Option<f64>,

    /// The largest change of log-brightness in the first step.
    pub step_size: Option<f64>,

    pub max_iterations: Option<usize>,

    pub stall_window: Option<usize>,

    /// Chi-squared above this many times the target at a stall means the
    /// target is unreachable.
    pub unreachable_factor: Option<f64>,
}

impl MemArgs {
    pub fn merge(self, other: Self) -> Self {
        Self {
            target_chi2: self.target_chi2.or(other.target_chi2),
            tolerance: self.tolerance.or(other.tolerance),
            entropy_weight: self.entropy_weight.or(other.entropy_weight),
            step_size: self.step_size.or(other.step_size),
            max_iterations: self.max_iterations.or(other.max_iterations),
            stall_window: self.stall_window.or(other.stall_window),
            unreachable_factor: self.unreachable_factor.or(other.unreachable_factor),
        }
    }

    fn parse(self) -> MemParams {
        let d = MemParams::default();
        MemParams {
            target_chi2: self.target_chi2.unwrap_or(d.target_chi2),
            tolerance: self.tolerance.unwrap_or(d.tolerance),
            entropy_weight: self.entropy_weight.unwrap_or(d.entropy_weight),
            step_size: self.step_size.unwrap_or(d.step_size),
            max_iterations: self.max_iterations.unwrap_or(d.max_iterations),
            stall_window: self.stall_window.unwrap_or(d.stall_window),
            unreachable_factor: self.unreachable_factor.unwrap_or(d.unreachable_factor),
        }
    }
}

/// All of the arguments for imaging, grouped as they are in argument files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagingArgs {
    /// An argument file to read. Arguments set here take precedence over the
    /// file's.
    #[serde(skip)]
    pub args_file: Option<PathBuf>,

    #[serde(default)]
    pub grid: GridArgs,

    #[serde(default)]
    pub deconvolution: DeconvolutionArgs,

    #[serde(default)]
    pub clean: CleanArgs,

    #[serde(default)]
    pub mem: MemArgs,
}

impl ImagingArgs {
    /// Read arguments from a toml or json file. The format is decided by the
    /// file's extension.
    pub fn from_file(arg_file: &Path) -> Result<ImagingArgs, ArgsError> {
        debug!("Attempting to parse argument file {}", arg_file.display());

        let arg_file_type = arg_file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .and_then(|e| ArgFileTypes::from_str(&e).ok());

        let mut contents = String::new();
        match arg_file_type {
            Some(ArgFileTypes::Toml) => {
                debug!("Parsing toml file...");
                let mut fh = File::open(arg_file)?;
                fh.read_to_string(&mut contents)?;
                toml::from_str(&contents).map_err(|err| {
                    ArgsError::ArgFile(format!(
                        "Couldn't decode toml structure from {arg_file:?}:\n{err}"
                    ))
                })
            }
            Some(ArgFileTypes::Json) => {
                debug!("Parsing json file...");
                let mut fh = File::open(arg_file)?;
                fh.read_to_string(&mut contents)?;
                serde_json::from_str(&contents).map_err(|err| {
                    ArgsError::ArgFile(format!(
                        "Couldn't decode json structure from {arg_file:?}:\n{err}"
                    ))
                })
            }
            None => Err(ArgsError::ArgFile(format!(
                "Argument file '{arg_file:?}' doesn't have a recognised file extension! Valid extensions are: {}",
                *ARG_FILE_TYPES_COMMA_SEPARATED
            ))),
        }
    }

    /// Consolidate these arguments with those in `args_file`, if it's set,
    /// preferring these arguments over the file's.
    ///
    /// This function should only ever merge arguments, and not try to make
    /// sense of them.
    pub fn merge(self) -> Result<ImagingArgs, ArgsError> {
        let args = self;
        match args.args_file {
            Some(ref arg_file) => {
                debug!("Merging arguments with the argument file");
                // Ensure all of the file args are accounted for by pattern
                // matching.
                let ImagingArgs {
                    args_file: _,
                    grid,
                    deconvolution,
                    clean,
                    mem,
                } = ImagingArgs::from_file(arg_file)?;

                Ok(ImagingArgs {
                    args_file: None,
                    grid: args.grid.merge(grid),
                    deconvolution: args.deconvolution.merge(deconvolution),
                    clean: args.clean.merge(clean),
                    mem: args.mem.merge(mem),
                })
            }
            None => Ok(args),
        }
    }

    /// Merge with the argument file (if any), fill in defaults and validate,
    /// producing parameters ready for imaging.
    pub fn parse(self) -> Result<ImagingParams, ArgsError> {
        let ImagingArgs {
            args_file: _,
            grid,
            deconvolution,
            clean,
            mem,
        } = self.merge()?;
        trace!("{grid:#?}\n{deconvolution:#?}\n{clean:#?}\n{mem:#?}");

        let (grid, normalisation, add_conjugates) = grid.parse()?;
        let algorithm = match deconvolution.algorithm {
            Some(a) => parse_name(&a, "algorithm", &DECONVOLVER_TYPES_COMMA_SEPARATED)?,
            None => DeconvolverType::Clean,
        };
        // Only the selected algorithm's section is looked at.
        let deconvolver = match algorithm {
            DeconvolverType::Clean => DeconvolverParams::Clean(clean.parse()?),
            DeconvolverType::Mem => DeconvolverParams::Mem(mem.parse()),
        };

        let params = ImagingParams {
            grid,
            normalisation,
            add_conjugates,
            deconvolver,
            progress_bars: deconvolution.progress_bars,
        };
        params.validate()?;
        display_params(&params);
        Ok(params)
    }
}

/// Log a summary of imaging parameters.
pub(crate) fn display_params(params: &ImagingParams) {
    let GridParams {
        geometry,
        kernel,
        oversample,
        weighting,
        taper,
    } = params.grid;

    let mut printer = InfoPrinter::new("Imaging set up".into());
    printer.push_block(vec![
        format!(
            "Image: {} x {} pixels, pixel scale {}",
            geometry.rows, geometry.cols, geometry.pixel_scale
        )
        .into(),
        format!(
            "Grid cells: du = {:e}, dv = {:e}",
            geometry.cell_size_u(),
            geometry.cell_size_v()
        )
        .into(),
    ]);
    printer.push_block(vec![
        format!(
            "Kernel: {} (support {} cells, {oversample} samples per cell)",
            kernel.kernel_type(),
            kernel.support()
        )
        .into(),
        format!("Weighting: {weighting}").into(),
        format!("uv taper: {taper:?}").into(),
    ]);
    let conjugates = if params.add_conjugates {
        "with Hermitian partners"
    } else {
        "without Hermitian partners"
    };
    printer.push_line(
        format!(
            "Normalisation: {}, gridding {conjugates}",
            params.normalisation
        )
        .into(),
    );
    let deconvolver_block = match &params.deconvolver {
        DeconvolverParams::Clean(p) => vec![
            "Deconvolver: CLEAN".into(),
            format!("Loop gain {}, threshold {:?}", p.gain, p.threshold).into(),
            format!(
                "At most {} iterations; diverged after {} without improvement",
                p.max_iterations, p.stall_window
            )
            .into(),
            format!("Restoring beam: {:?}", p.restoring_beam).into(),
        ],
        DeconvolverParams::Mem(p) => vec![
            "Deconvolver: MEM".into(),
            format!(
                "Target chi2 {} (tolerance {}), entropy weight {}",
                p.target_chi2, p.tolerance, p.entropy_weight
            )
            .into(),
            format!(
                "At most {} iterations; stalled after {} without improvement",
                p.max_iterations, p.stall_window
            )
            .into(),
        ],
    };
    printer.push_block(deconvolver_block);
    printer.display();
}
