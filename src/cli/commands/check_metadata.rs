//! Check-metadata command: pre-flight check of a submission metadata file

use super::shared::ProcessingStats;
use crate::app::models::metadata::{MandatoryFieldsValidator, MetadataValidator};
use crate::cli::args::CheckMetadataArgs;
use crate::{Error, Result};
use colored::*;

/// Report missing or unset mandatory fields; fails if there are any
pub fn run_check_metadata(args: CheckMetadataArgs) -> Result<ProcessingStats> {
    let validator = MandatoryFieldsValidator;
    let violations = validator.validate(&args.metadata_file)?;

    if violations.is_empty() {
        println!(
            "{} {}: all {} checks passed",
            "✓".green(),
            args.metadata_file.display(),
            validator.name()
        );
        return Ok(ProcessingStats::default());
    }

    println!(
        "{} {}: {} problems",
        "✗".red(),
        args.metadata_file.display(),
        violations.len()
    );
    for violation in &violations {
        println!("   {} {}", violation.path.yellow(), violation.message);
    }

    Err(Error::metadata_format(format!(
        "{} has {} missing or unset mandatory fields",
        args.metadata_file.display(),
        violations.len()
    )))
}
