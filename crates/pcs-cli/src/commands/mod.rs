//! Command dispatch and handler modules.

mod check;
mod solve;

use miette::Result;

use crate::cli::{Cli, Command};

/// Route a parsed CLI invocation to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Check { dir, include_dev } => check::exec(&dir, include_dev),
        Command::Solve {
            dir,
            package,
            bruteforce,
            search_in_range,
            max_solutions,
            policy,
            registry,
            dump_cnf,
            include_dev,
        } => {
            let opts = solve::SolveArgs {
                package,
                bruteforce,
                search_in_range,
                max_solutions,
                policy,
                registry,
                dump_cnf,
                include_dev,
            };
            solve::exec(&dir, &opts).await
        }
    }
}
