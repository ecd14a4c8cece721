//! Script language: keyword registry, typed command AST, and the assembler
//! that turns line-oriented source into an executable [`Script`].

pub mod assembler;
pub mod command;
pub mod error;
pub mod expand;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub use assembler::ScriptAssembler;
pub use command::{
    AuthConfigCommand, CaptureCommand, Command, CopyCommand, EnvCommand, FromCommand,
    KubeConfigCommand, OutputCommand, RunCommand, WorkdirCommand,
};
pub use error::ParseError;
pub use expand::Vars;

use crate::machine::Machine;

/// Preamble keywords - each may appear at most once, before any action.
pub const CMD_FROM: &str = "FROM";
pub const CMD_WORKDIR: &str = "WORKDIR";
pub const CMD_AUTHCONFIG: &str = "AUTHCONFIG";
pub const CMD_KUBECONFIG: &str = "KUBECONFIG";
pub const CMD_ENV: &str = "ENV";

/// Action keywords - repeatable, executed in declaration order.
pub const CMD_COPY: &str = "COPY";
pub const CMD_RUN: &str = "RUN";
pub const CMD_CAPTURE: &str = "CAPTURE";
pub const CMD_OUTPUT: &str = "OUTPUT";

/// Fallback values applied when a preamble directive is absent.
///
/// Injected into the assembler explicitly rather than read from ambient
/// process state, so callers (and tests) control the fallback order.
#[derive(Debug, Clone)]
pub struct ScriptDefaults {
    /// Local root for collected artifacts when WORKDIR is absent.
    pub workdir: PathBuf,
    /// Cluster config when KUBECONFIG has no argument: $KUBECONFIG, else
    /// $HOME/.kube/config.
    pub kubeconfig: PathBuf,
}

impl Default for ScriptDefaults {
    fn default() -> Self {
        let kubeconfig = std::env::var_os("KUBECONFIG")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".kube").join("config")))
            .unwrap_or_else(|| PathBuf::from(".kube/config"));

        Self {
            workdir: PathBuf::from("/tmp/magpie"),
            kubeconfig,
        }
    }
}

/// A parsed script: the single-instance preamble directives plus the ordered
/// action list. Built once by [`ScriptAssembler`], immutable afterwards.
#[derive(Debug)]
pub struct Script {
    preambles: HashMap<&'static str, Command>,
    actions: Vec<Command>,
    defaults: ScriptDefaults,
}

impl Script {
    pub(crate) fn new(
        preambles: HashMap<&'static str, Command>,
        actions: Vec<Command>,
        defaults: ScriptDefaults,
    ) -> Self {
        Self {
            preambles,
            actions,
            defaults,
        }
    }

    /// Actions in declaration order. Execution order is significant.
    pub fn actions(&self) -> &[Command] {
        &self.actions
    }

    pub fn preamble(&self, keyword: &str) -> Option<&Command> {
        self.preambles.get(keyword)
    }

    /// Target machines from FROM, or the single implicit local machine.
    pub fn machines(&self) -> Vec<Machine> {
        match self.preambles.get(CMD_FROM) {
            Some(Command::From(from)) => from.machines().to_vec(),
            _ => vec![Machine::local()],
        }
    }

    /// Local artifact root from WORKDIR, or the injected default.
    pub fn workdir(&self) -> &Path {
        match self.preambles.get(CMD_WORKDIR) {
            Some(Command::Workdir(wd)) => wd.path(),
            _ => &self.defaults.workdir,
        }
    }

    /// Resolved cluster config path. The file itself is never opened here;
    /// the path is handed to the capture collaborator.
    pub fn kubeconfig(&self) -> &Path {
        match self.preambles.get(CMD_KUBECONFIG) {
            Some(Command::KubeConfig(kc)) => kc.path(),
            _ => &self.defaults.kubeconfig,
        }
    }

    /// Remote session credentials, when AUTHCONFIG was declared.
    pub fn auth(&self) -> Option<&AuthConfigCommand> {
        match self.preambles.get(CMD_AUTHCONFIG) {
            Some(Command::AuthConfig(auth)) => Some(auth),
            _ => None,
        }
    }
}

/// Whether `keyword` names a preamble directive.
pub fn is_preamble(keyword: &str) -> bool {
    matches!(
        keyword,
        CMD_FROM | CMD_WORKDIR | CMD_AUTHCONFIG | CMD_KUBECONFIG | CMD_ENV
    )
}
