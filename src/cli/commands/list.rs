//! List command: the registries an operator can choose from

use super::shared::ProcessingStats;
use crate::app::models::DepthMessageKind;
use crate::app::services::loaders::LoaderKind;
use crate::app::services::metadata_merger::MetadataRequirement;
use crate::app::services::writers::WriterKind;
use colored::*;

/// Print every registered loader, writer and depth message kind
pub fn run_list() -> ProcessingStats {
    println!("{}", "Loaders".bold());
    for kind in LoaderKind::ALL {
        println!(
            "   {:<15} {:<15} {:<6} {}",
            kind.label().cyan(),
            kind.id(),
            kind.suffix(),
            kind.description()
        );
    }

    println!("\n{}", "Writers".bold());
    for kind in WriterKind::ALL {
        let metadata = match kind.requirement() {
            MetadataRequirement::Required { .. } => "metadata required",
            MetadataRequirement::NotRequired => "metadata optional",
        };
        println!(
            "   {:<15} {:<15} {:<18} {}",
            kind.label().cyan(),
            kind.id(),
            metadata,
            kind.description()
        );
    }

    println!("\n{}", "Depth message kinds".bold());
    for kind in DepthMessageKind::ALL {
        println!("   {:<15} {}", kind.name().cyan(), kind.label());
    }

    ProcessingStats::default()
}
