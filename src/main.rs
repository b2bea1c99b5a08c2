use camino::{Utf8Path, Utf8PathBuf};
use log::info;
use owo_colors::OwoColorize;
use strata_driver::prelude::*;
use strata_resolver::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(clap::Subcommand, Debug)]
pub enum Cmd {
    /// Resolve one declaration, written `module:package/Outer.name`
    Resolve {
        manifest: Utf8PathBuf,
        declaration: String,
        #[arg(long, default_value = "bodies")]
        phase: ResolvePhase,
    },
    /// Resolve a class together with its direct members
    Members {
        manifest: Utf8PathBuf,
        class: String,
        #[arg(long, default_value = "signatures")]
        phase: ResolvePhase,
    },
    /// Resolve every declaration of the project
    Check { manifest: Utf8PathBuf },
    /// Print the member scope of a file
    Scope {
        manifest: Utf8PathBuf,
        module: String,
        file: Utf8PathBuf,
    },
}

fn main() -> miette::Result<()> {
    // Logging is off unless STRATA_LOG holds a filter, e.g. `strata_resolver=trace`
    if let Ok(filter) = EnvFilter::try_from_env("STRATA_LOG") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }

    let cli: Cli = clap::Parser::parse();

    match cli.command {
        Cmd::Resolve {
            manifest,
            declaration,
            phase,
        } => {
            let workspace = load(&manifest)?;
            let slice = workspace.resolve(&declaration, phase)?;

            print_slice(&workspace, &slice, 0);
        }
        Cmd::Members {
            manifest,
            class,
            phase,
        } => {
            let workspace = load(&manifest)?;
            let class = workspace.resolve_with_members(&class, phase)?;

            print_slice(&workspace, &class.class, 0);
            for member in class.members.values() {
                print_slice(&workspace, member, 2);
            }
        }
        Cmd::Check { manifest } => {
            let workspace = load(&manifest)?;
            let report = workspace.check();
            let failed = report.failures.len();

            for (id, error) in report.failures {
                eprintln!(
                    "{} {}",
                    "Failed".bold().red(),
                    workspace.display_id(&id).bold()
                );
                eprintln!("{:?}", miette::Report::new(error));
            }

            println!(
                "{} {} resolved, {} failed",
                "Checked".bold().bright_white(),
                report.resolved.green(),
                failed.red()
            );

            if report.truncated {
                println!("Stopped at the error limit");
            }

            if failed > 0 {
                return Err(miette::miette!("{failed} declarations failed to resolve"));
            }
        }
        Cmd::Scope {
            manifest,
            module,
            file,
        } => {
            let workspace = load(&manifest)?;
            let scope = workspace.scope(&module, &file)?;

            println!("{}", format!("{module}:{file}").bold().bright_white());
            for (name, ids) in scope.iter() {
                let ids = ids
                    .iter()
                    .map(|id| workspace.display_id(id))
                    .collect::<Vec<_>>();

                println!("  {} {}", name.cyan(), ids.join(", ").dimmed());
            }
        }
    }

    Ok(())
}

fn load(path: &Utf8Path) -> miette::Result<Workspace> {
    let manifest = Manifest::load(path)?;
    let workspace = Workspace::load(&manifest)?;

    info!("Loaded `{path}` with {} modules", workspace.modules().len());
    Ok(workspace)
}

fn print_slice(workspace: &Workspace, slice: &TypedSlice<DriverLanguage>, indent: usize) {
    println!(
        "{:indent$}{} {}",
        "",
        workspace.display_id(slice.id()).bold(),
        format!("({})", slice.phase()).dimmed()
    );

    for (phase, data) in slice.iter() {
        let data = match data {
            Resolved::Supertypes(ids) | Resolved::Body(ids) => {
                let ids = ids
                    .iter()
                    .map(|id| workspace.display_id(id))
                    .collect::<Vec<_>>();
                format!("[{}]", ids.join(", "))
            }
            data => data.to_string(),
        };

        println!("{:indent$}  {} {data}", "", format!("{:>10}", phase.name()).cyan());
    }
}
