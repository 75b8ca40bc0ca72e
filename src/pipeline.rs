//! Fixed five-step run: extract, analyze, plan, insert, verify.

use std::path::PathBuf;
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::docx::analyze_structure;
use crate::error::{Error, Warning};
use crate::extract::{extract_images_with_warnings, write_manifest};
use crate::insert::insert_batch;
use crate::planner::{InsertionPlanner, PlanRequest, validate_plan};

#[derive(Debug)]
pub struct RunSummary {
    pub planner: String,
    pub images_extracted: usize,
    pub decisions: usize,
    pub applied: usize,
    pub paragraphs_before: usize,
    pub paragraphs_after: usize,
    /// Output paragraph count equals the target's plus the applied images.
    pub verified: bool,
    pub warnings: Vec<Warning>,
    pub output_path: PathBuf,
}

fn check_config(config: &PipelineConfig) -> Result<(), Error> {
    for path in [&config.source, &config.target] {
        if !path.exists() {
            return Err(Error::DocumentNotFound(path.clone()));
        }
    }
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(Error::InvalidInput(errors.join("; ")));
    }
    Ok(())
}

pub fn run(config: &PipelineConfig, planner: &dyn InsertionPlanner) -> Result<RunSummary, Error> {
    let t0 = Instant::now();
    check_config(config)?;
    config.prepare_dirs()?;

    log::info!("Step 1/5: extracting images from {}", config.source.display());
    let (images, mut warnings) = extract_images_with_warnings(&config.source, &config.temp_dir)?;
    write_manifest(&config.temp_dir, &images)?;
    let t_extract = t0.elapsed();

    log::info!("Step 2/5: analyzing {}", config.target.display());
    let structure = analyze_structure(&config.target)?;
    let t_analyze = t0.elapsed();

    log::info!(
        "Step 3/5: planning {} images with the {} planner",
        images.len(),
        planner.name()
    );
    let plan = planner.plan(&PlanRequest::new(&structure, &images))?;
    let validated = validate_plan(&plan, &images);
    warnings.extend(validated.warnings);
    let t_plan = t0.elapsed();

    let output_path = config.output_path();
    log::info!("Step 4/5: inserting into {}", output_path.display());
    let report = insert_batch(
        &config.target,
        &output_path,
        &validated.insertions,
        &config.insert,
    )?;
    warnings.extend(report.warnings);
    let t_insert = t0.elapsed();

    log::info!("Step 5/5: verifying {}", output_path.display());
    let after = analyze_structure(&output_path)?;
    let expected = structure.total_paragraphs + report.applied;
    let verified = after.total_paragraphs == expected;
    if !verified {
        log::warn!(
            "Verification: expected {} paragraphs, found {}",
            expected,
            after.total_paragraphs
        );
    }
    let t_total = t0.elapsed();

    log::info!(
        "Timing: extract={:.1}ms, analyze={:.1}ms, plan={:.1}ms, insert={:.1}ms, verify={:.1}ms, total={:.1}ms",
        t_extract.as_secs_f64() * 1000.0,
        (t_analyze - t_extract).as_secs_f64() * 1000.0,
        (t_plan - t_analyze).as_secs_f64() * 1000.0,
        (t_insert - t_plan).as_secs_f64() * 1000.0,
        (t_total - t_insert).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
    );

    Ok(RunSummary {
        planner: planner.name().to_string(),
        images_extracted: images.len(),
        decisions: plan.len(),
        applied: report.applied,
        paragraphs_before: structure.total_paragraphs,
        paragraphs_after: after.total_paragraphs,
        verified,
        warnings,
        output_path: report.output_path,
    })
}
