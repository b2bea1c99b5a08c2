use std::io;

use camino::Utf8PathBuf;
use miette::Diagnostic;
use strata_resolver::error::ResolveError;
use strata_utils::dependency::CycleError;
use thiserror::Error;

pub type DriverResult<T> = Result<T, DriverError>;

#[derive(Debug, Error, Diagnostic)]
pub enum DriverError {
    #[error("could not read `{path}`")]
    #[diagnostic(code(strata::driver::io))]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed project manifest")]
    #[diagnostic(code(strata::driver::manifest))]
    Manifest(#[from] serde_json::Error),

    #[error("unknown module `{0}`")]
    #[diagnostic(code(strata::driver::unknown_module))]
    UnknownModule(String),

    #[error("module `{module}` has no file `{path}`")]
    #[diagnostic(code(strata::driver::unknown_file))]
    UnknownFile { module: String, path: Utf8PathBuf },

    #[error("module `{0}` is declared twice")]
    #[diagnostic(code(strata::driver::duplicate_module))]
    DuplicateModule(String),

    #[error("`{path}` is declared twice")]
    #[diagnostic(
        code(strata::driver::duplicate_declaration),
        help("Only functions may be overloaded.")
    )]
    DuplicateDeclaration { path: String },

    #[error("module dependencies form a cycle")]
    #[diagnostic(code(strata::driver::module_cycle), help("{0}"))]
    ModuleCycle(CycleError<String>),

    #[error("module `{module}` is still required by {}", dependents.join(", "))]
    #[diagnostic(code(strata::driver::module_in_use))]
    ModuleInUse {
        module: String,
        dependents: Vec<String>,
    },

    #[error("`{0}` is not a declaration path")]
    #[diagnostic(
        code(strata::driver::invalid_path),
        help("Write declarations as `module:package/Outer.name`, optionally followed by `#index`.")
    )]
    InvalidPath(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Resolve(#[from] ResolveError),
}
