//! Handler for `pcs check`.

use std::path::Path;

use console::Style;
use miette::Result;

use pcs_core::lockfile;
use pcs_solver::ConflictReport;
use pcs_util::progress::status;

pub fn exec(dir: &Path, include_dev: bool) -> Result<()> {
    status("Checking", &dir.display().to_string());

    let tree = lockfile::load_project(dir, include_dev)?;
    tracing::debug!("loaded {} packages from {}", tree.len(), dir.display());

    let report = ConflictReport::from_tree(&tree);
    print_report(&report);
    Ok(())
}

pub(crate) fn print_report(report: &ConflictReport) {
    if report.is_empty() {
        println!("{}", Style::new().green().apply_to(report));
    } else {
        println!("{report}");
    }
}
