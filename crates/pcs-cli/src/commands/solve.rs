//! Handler for `pcs solve`.

use std::path::Path;

use console::Style;
use miette::Result;

use pcs_core::config::Config;
use pcs_core::lockfile;
use pcs_core::version::VersionPolicy;
use pcs_registry::{NpmRegistryClient, PackageRepository};
use pcs_solver::{ConflictPackage, ConflictReport, ConflictSolver, NoConflictSituation, SolveOptions};
use pcs_util::errors::PcsError;
use pcs_util::progress::{status, status_warn};

use super::check::print_report;

/// Options of `pcs solve` that override `~/.pcs/config.toml`.
#[derive(Debug, Default)]
pub struct SolveArgs {
    pub package: Option<String>,
    pub bruteforce: bool,
    pub search_in_range: bool,
    pub max_solutions: Option<usize>,
    pub policy: Option<VersionPolicy>,
    pub registry: Option<String>,
    pub dump_cnf: bool,
    pub include_dev: bool,
}

pub async fn exec(dir: &Path, args: &SolveArgs) -> Result<()> {
    let config = merged_config(Config::load()?, args);

    status("Checking", &dir.display().to_string());
    let tree = lockfile::load_project(dir, args.include_dev)?;
    let report = ConflictReport::from_tree(&tree);

    let conflicts: Vec<&ConflictPackage> = match &args.package {
        Some(name) => match report.get(name) {
            Some(conflict) => vec![conflict],
            None => {
                println!("No version conflict on {name}.");
                return Ok(());
            }
        },
        None => report.conflicts.iter().collect(),
    };
    if conflicts.is_empty() {
        print_report(&report);
        return Ok(());
    }

    let client = NpmRegistryClient::from_config(&config.registry)?;
    let repo = PackageRepository::from_config(client, &config.registry);
    let options = SolveOptions::from(&config.solver);
    let solver = ConflictSolver::new(&repo, options);
    tracing::debug!("using {} against {}", options.kind, config.registry.url);

    let mut failed = 0usize;
    for conflict in conflicts {
        if !conflict.is_user_solvable() {
            status_warn(
                "Warning",
                &format!(
                    "{} is pulled in twice through the same dependency, upgrades may not separate it",
                    conflict.package_name
                ),
            );
        }

        if args.dump_cnf {
            match solver.encode_conflict(conflict).await? {
                Some(encoding) => print!("{}", encoding.cnf.to_dimacs()),
                None => status_warn("Skipping", "--dump-cnf needs a SAT solver"),
            }
            continue;
        }

        status("Solving", &conflict.package_name);
        match solver.solve_conflict(conflict).await {
            Ok(situations) => print_situations(conflict, &situations),
            Err(e) => {
                failed += 1;
                status_warn("Failed", &format!("{}: {e}", conflict.package_name));
            }
        }
    }

    if failed > 0 {
        return Err(PcsError::Resolution {
            message: format!("{failed} conflict(s) could not be solved"),
        }
        .into());
    }
    Ok(())
}

fn merged_config(mut config: Config, args: &SolveArgs) -> Config {
    config.solver.bruteforce |= args.bruteforce;
    config.solver.search_in_range |= args.search_in_range;
    if let Some(max) = args.max_solutions {
        config.solver.max_solutions = max.max(1);
    }
    if let Some(policy) = args.policy {
        config.solver.policy = policy;
    }
    if let Some(url) = &args.registry {
        config.registry.url = url.trim_end_matches('/').to_string();
    }
    config
}

fn print_situations(conflict: &ConflictPackage, situations: &[NoConflictSituation]) {
    let name = &conflict.package_name;
    if situations.is_empty() {
        println!("{}", Style::new().red().apply_to(format!("- {name}")));
        println!("    can't solve {name} conflict");
        return;
    }

    println!("{}", Style::new().green().apply_to(format!("- {name}")));
    let bold = Style::new().bold();
    let dim = Style::new().dim();
    for (i, situation) in situations.iter().enumerate() {
        let targets: Vec<String> = situation
            .target_packages
            .iter()
            .map(ToString::to_string)
            .collect();
        println!("    solution {}: {}", i + 1, targets.join(", "));
        for update in &situation.update_targets {
            if update.is_unchanged() {
                println!("      {}", dim.apply_to(update));
            } else {
                println!("      {}", bold.apply_to(update));
            }
        }
    }
}
