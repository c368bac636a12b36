//! CLI argument definitions for pcs.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use pcs_core::version::VersionPolicy;

#[derive(Parser, Debug)]
#[command(
    name = "pcs",
    version,
    about = "Find and solve version conflicts in npm dependency trees",
    long_about = "pcs reads package.json and package-lock.json, reports packages installed \
                  at more than one version, and searches the registry for upgrades of your \
                  direct dependencies that collapse each conflict onto a single version."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report packages installed at more than one version
    Check {
        /// Project directory
        #[arg(default_value = ".")]
        dir: PathBuf,
        /// Include devDependencies, optional and bundled packages
        #[arg(long)]
        include_dev: bool,
    },

    /// Search for upgrades that resolve each conflict
    Solve {
        /// Project directory
        #[arg(default_value = ".")]
        dir: PathBuf,
        /// Only solve the conflict on this package
        #[arg(short, long)]
        package: Option<String>,
        /// Use the brute-force solver instead of SAT
        #[arg(long)]
        bruteforce: bool,
        /// Let the SAT solver consider every version satisfying a range
        #[arg(long)]
        search_in_range: bool,
        /// Report up to this many solutions per conflict (SAT only)
        #[arg(long)]
        max_solutions: Option<usize>,
        /// Version picked for a dependency range: latest or lowest
        #[arg(long)]
        policy: Option<VersionPolicy>,
        /// Registry base URL
        #[arg(long, env = "PCS_REGISTRY")]
        registry: Option<String>,
        /// Print the SAT formula in DIMACS form instead of solving
        #[arg(long)]
        dump_cnf: bool,
        /// Include devDependencies, optional and bundled packages
        #[arg(long)]
        include_dev: bool,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}
