// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subcommand implementations. Each returns a domain `Result`; `main` turns
// errors into operator-facing messages.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use image::DynamicImage;
use rayon::prelude::*;
use scantron_core::config::GraderConfig;
use scantron_core::error::{GradeError, Result};
use scantron_core::human_errors::humanize_error;
use scantron_grader::io::{decode_image, open_image, save_image, to_png_bytes};
use scantron_grader::{CardRectifier, GradeReport, Grader};
use serde::Serialize;
use tracing::{info, warn};

/// Path argument that stands for standard input or standard output.
pub const STDIO: &str = "-";

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == STDIO
}

fn read_stdin() -> Result<Vec<u8>> {
    let mut data = Vec::new();
    std::io::stdin().lock().read_to_end(&mut data)?;
    Ok(data)
}

/// A card that could not be graded but did not stop the batch.
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub source: String,
    pub message: String,
    pub suggestion: String,
}

/// Result of grading a batch of card images.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub graded: Vec<GradeReport>,
    pub failed: Vec<Failure>,
}

/// Load the configuration at `path`, or the default one.
pub fn load_config(path: Option<&Path>) -> Result<GraderConfig> {
    match path {
        Some(path) => {
            let config = GraderConfig::from_json_file(path)?;
            info!(path = %path.display(), "Configuration loaded");
            Ok(config)
        }
        None => Ok(GraderConfig::default()),
    }
}

/// Grade every image in parallel. A `-` path reads one image from stdin.
///
/// Images that fail with an error worth skipping are listed in the report;
/// an error that affects every card (bad crop area, bad configuration)
/// aborts the batch.
pub fn grade(images: &[PathBuf], config: GraderConfig, jobs: Option<usize>) -> Result<BatchReport> {
    let piped = if images.iter().any(|path| is_stdio(path)) {
        Some(read_stdin()?)
    } else {
        None
    };
    grade_batch(images, config, jobs, piped.as_deref())
}

/// [`grade`] with the bytes standing in for `-` already read.
pub fn grade_batch(
    images: &[PathBuf],
    config: GraderConfig,
    jobs: Option<usize>,
    piped: Option<&[u8]>,
) -> Result<BatchReport> {
    let grader = Grader::new(config)?;

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(jobs) = jobs {
        builder = builder.num_threads(jobs);
    }
    let pool = builder
        .build()
        .map_err(|err| GradeError::InvalidConfig(format!("cannot start worker pool: {err}")))?;

    let results: Vec<(&PathBuf, Result<GradeReport>)> = pool.install(|| {
        images
            .par_iter()
            .map(|path| (path, grade_input(&grader, path, piped)))
            .collect()
    });

    let mut graded = Vec::new();
    let mut failed = Vec::new();
    for (path, result) in results {
        match result {
            Ok(report) => graded.push(report),
            Err(err) => {
                let human = humanize_error(&err);
                if !human.skip_and_continue {
                    return Err(err);
                }
                warn!(path = %path.display(), error = %err, "Skipping card");
                failed.push(Failure {
                    source: path.display().to_string(),
                    message: human.message,
                    suggestion: human.suggestion,
                });
            }
        }
    }

    info!(graded = graded.len(), failed = failed.len(), "Batch graded");
    Ok(BatchReport { graded, failed })
}

fn grade_input(grader: &Grader, path: &Path, piped: Option<&[u8]>) -> Result<GradeReport> {
    match piped {
        Some(data) if is_stdio(path) => {
            let mut report = grader.grade(&decode_image(data)?)?;
            report.source = Some(STDIO.to_string());
            Ok(report)
        }
        _ => grader.grade_file(path),
    }
}

/// Write `value` as pretty JSON to `output`, or to stdout.
pub fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            info!(path = %path.display(), "Report written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Rectify one image and save the flattened card. Either path may be `-`
/// for stdin or stdout; stdout receives PNG.
pub fn rectify(image: &Path, output: &Path, config: GraderConfig) -> Result<bool> {
    config.rectify.validate()?;
    let photo = if is_stdio(image) {
        decode_image(&read_stdin()?)?
    } else {
        open_image(image)?
    };
    let result = CardRectifier::new(config.rectify).rectify(&photo);
    if !result.warped {
        warn!(path = %image.display(), "No usable card outline; saved the resized photo unwarped");
    }
    write_image(&result.image, output, &mut std::io::stdout().lock())?;
    info!(path = %output.display(), warped = result.warped, "Rectified card written");
    Ok(result.warped)
}

fn write_image(image: &DynamicImage, output: &Path, stdout: &mut impl Write) -> Result<()> {
    if is_stdio(output) {
        stdout.write_all(&to_png_bytes(image)?)?;
        stdout.flush()?;
        Ok(())
    } else {
        save_image(image, output)
    }
}

/// Print the default configuration, or write it to `output`.
pub fn write_default_config(output: Option<&Path>) -> Result<()> {
    let config = GraderConfig::default();
    match output {
        Some(path) => {
            config.to_json_file(path)?;
            info!(path = %path.display(), "Default configuration written");
            Ok(())
        }
        None => write_json(&config, None),
    }
}
