//! Typed command AST and the keyword -> builder registry.
//!
//! Every command is fully validated when it is built: no action is ever
//! executed with malformed arguments.

use std::path::{Path, PathBuf};

use crate::machine::Machine;
use crate::script::error::ParseError;
use crate::script::{
    ScriptDefaults, CMD_AUTHCONFIG, CMD_CAPTURE, CMD_COPY, CMD_ENV, CMD_FROM, CMD_KUBECONFIG,
    CMD_OUTPUT, CMD_RUN, CMD_WORKDIR,
};

/// Closed set of script directives. Preamble variants establish run-wide
/// context; action variants perform work against a machine.
#[derive(Debug, Clone)]
pub enum Command {
    From(FromCommand),
    Workdir(WorkdirCommand),
    AuthConfig(AuthConfigCommand),
    KubeConfig(KubeConfigCommand),
    Env(EnvCommand),
    Copy(CopyCommand),
    Run(RunCommand),
    Capture(CaptureCommand),
    Output(OutputCommand),
}

impl Command {
    /// Position of the command in the script, for ordering and diagnostics.
    pub fn index(&self) -> usize {
        match self {
            Command::From(c) => c.index,
            Command::Workdir(c) => c.index,
            Command::AuthConfig(c) => c.index,
            Command::KubeConfig(c) => c.index,
            Command::Env(c) => c.index,
            Command::Copy(c) => c.index,
            Command::Run(c) => c.index,
            Command::Capture(c) => c.index,
            Command::Output(c) => c.index,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::From(_) => CMD_FROM,
            Command::Workdir(_) => CMD_WORKDIR,
            Command::AuthConfig(_) => CMD_AUTHCONFIG,
            Command::KubeConfig(_) => CMD_KUBECONFIG,
            Command::Env(_) => CMD_ENV,
            Command::Copy(_) => CMD_COPY,
            Command::Run(_) => CMD_RUN,
            Command::Capture(_) => CMD_CAPTURE,
            Command::Output(_) => CMD_OUTPUT,
        }
    }

    /// Raw (expanded) argument tokens the command was built from.
    pub fn args(&self) -> &[String] {
        match self {
            Command::From(c) => &c.args,
            Command::Workdir(c) => &c.args,
            Command::AuthConfig(c) => &c.args,
            Command::KubeConfig(c) => &c.args,
            Command::Env(c) => &c.args,
            Command::Copy(c) => &c.args,
            Command::Run(c) => &c.args,
            Command::Capture(c) => &c.args,
            Command::Output(c) => &c.args,
        }
    }
}

/// Builder function registered for one keyword.
pub type Builder = fn(usize, Vec<String>, &ScriptDefaults) -> Result<Command, ParseError>;

/// Maps a keyword to its builder, or `None` for unknown directives.
pub fn builder_for(keyword: &str) -> Option<Builder> {
    match keyword {
        CMD_FROM => Some(FromCommand::build),
        CMD_WORKDIR => Some(WorkdirCommand::build),
        CMD_AUTHCONFIG => Some(AuthConfigCommand::build),
        CMD_KUBECONFIG => Some(KubeConfigCommand::build),
        CMD_ENV => Some(EnvCommand::build),
        CMD_COPY => Some(CopyCommand::build),
        CMD_RUN => Some(RunCommand::build),
        CMD_CAPTURE => Some(CaptureCommand::build),
        CMD_OUTPUT => Some(OutputCommand::build),
        _ => None,
    }
}

fn invalid(line: usize, keyword: &'static str, reason: impl Into<String>) -> ParseError {
    ParseError::InvalidArgs {
        line,
        keyword,
        reason: reason.into(),
    }
}

fn reject_blank(line: usize, keyword: &'static str, args: &[String]) -> Result<(), ParseError> {
    if args.iter().any(|a| a.trim().is_empty()) {
        return Err(invalid(line, keyword, "blank argument"));
    }
    Ok(())
}

/// FROM - target machine selection.
#[derive(Debug, Clone)]
pub struct FromCommand {
    index: usize,
    args: Vec<String>,
    machines: Vec<Machine>,
}

impl FromCommand {
    fn build(index: usize, args: Vec<String>, _: &ScriptDefaults) -> Result<Command, ParseError> {
        if args.is_empty() {
            return Err(invalid(index, CMD_FROM, "requires at least one machine"));
        }
        reject_blank(index, CMD_FROM, &args)?;

        // Duplicate addresses are kept as-is: each entry runs independently.
        let machines = args
            .iter()
            .map(|token| Machine::parse(token).map_err(|reason| invalid(index, CMD_FROM, reason)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Command::From(FromCommand {
            index,
            args,
            machines,
        }))
    }

    pub fn machines(&self) -> &[Machine] {
        &self.machines
    }
}

/// WORKDIR - local root for collected artifacts.
#[derive(Debug, Clone)]
pub struct WorkdirCommand {
    index: usize,
    args: Vec<String>,
    path: PathBuf,
}

impl WorkdirCommand {
    fn build(index: usize, args: Vec<String>, _: &ScriptDefaults) -> Result<Command, ParseError> {
        if args.len() != 1 {
            return Err(invalid(index, CMD_WORKDIR, "requires exactly one path"));
        }
        reject_blank(index, CMD_WORKDIR, &args)?;

        let path = PathBuf::from(&args[0]);
        Ok(Command::Workdir(WorkdirCommand { index, args, path }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// AUTHCONFIG - credentials for remote sessions. The key file is never read
/// here; its path is handed to the session provider.
#[derive(Debug, Clone)]
pub struct AuthConfigCommand {
    index: usize,
    args: Vec<String>,
    username: String,
    private_key: PathBuf,
}

impl AuthConfigCommand {
    fn build(index: usize, args: Vec<String>, _: &ScriptDefaults) -> Result<Command, ParseError> {
        let mut username = None;
        let mut private_key = None;

        for arg in &args {
            match arg.split_once(':') {
                Some(("username", value)) if !value.is_empty() => {
                    username = Some(value.to_string());
                }
                Some(("private-key", value)) if !value.is_empty() => {
                    private_key = Some(PathBuf::from(value));
                }
                _ => {
                    return Err(invalid(
                        index,
                        CMD_AUTHCONFIG,
                        format!("unexpected argument '{arg}'"),
                    ));
                }
            }
        }

        let username =
            username.ok_or_else(|| invalid(index, CMD_AUTHCONFIG, "missing username:<name>"))?;
        let private_key = private_key
            .ok_or_else(|| invalid(index, CMD_AUTHCONFIG, "missing private-key:<path>"))?;

        Ok(Command::AuthConfig(AuthConfigCommand {
            index,
            args,
            username,
            private_key,
        }))
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn private_key(&self) -> &Path {
        &self.private_key
    }
}

/// KUBECONFIG - cluster config location. Searched in order: explicit
/// argument, then the injected default ($KUBECONFIG, then $HOME/.kube/config).
#[derive(Debug, Clone)]
pub struct KubeConfigCommand {
    index: usize,
    args: Vec<String>,
    path: PathBuf,
}

impl KubeConfigCommand {
    fn build(
        index: usize,
        args: Vec<String>,
        defaults: &ScriptDefaults,
    ) -> Result<Command, ParseError> {
        if args.len() > 1 {
            return Err(invalid(index, CMD_KUBECONFIG, "takes at most one path"));
        }
        reject_blank(index, CMD_KUBECONFIG, &args)?;

        let path = args
            .first()
            .map(PathBuf::from)
            .unwrap_or_else(|| defaults.kubeconfig.clone());

        Ok(Command::KubeConfig(KubeConfigCommand { index, args, path }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// ENV - key:value pairs injected into the expander for subsequent lines.
#[derive(Debug, Clone)]
pub struct EnvCommand {
    index: usize,
    args: Vec<String>,
    vars: Vec<(String, String)>,
}

impl EnvCommand {
    fn build(index: usize, args: Vec<String>, _: &ScriptDefaults) -> Result<Command, ParseError> {
        if args.is_empty() {
            return Err(invalid(index, CMD_ENV, "requires at least one key:value"));
        }

        // Split on the first colon only: values may themselves contain colons.
        let mut vars = Vec::with_capacity(args.len());
        for arg in &args {
            match arg.split_once(':') {
                Some((key, value)) if !key.is_empty() => {
                    vars.push((key.to_string(), value.to_string()));
                }
                _ => {
                    return Err(invalid(
                        index,
                        CMD_ENV,
                        format!("'{arg}' is not a key:value pair"),
                    ));
                }
            }
        }

        Ok(Command::Env(EnvCommand { index, args, vars }))
    }

    pub fn vars(&self) -> &[(String, String)] {
        &self.vars
    }
}

/// COPY - one or more source paths. Destination is always derived from the
/// source path and the active machine, never declared.
#[derive(Debug, Clone)]
pub struct CopyCommand {
    index: usize,
    args: Vec<String>,
    paths: Vec<PathBuf>,
}

impl CopyCommand {
    fn build(index: usize, args: Vec<String>, _: &ScriptDefaults) -> Result<Command, ParseError> {
        if args.is_empty() {
            return Err(invalid(index, CMD_COPY, "requires at least one path"));
        }
        reject_blank(index, CMD_COPY, &args)?;

        let paths = args.iter().map(PathBuf::from).collect();
        Ok(Command::Copy(CopyCommand { index, args, paths }))
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

/// RUN - a command line executed on the machine. The remainder of the line
/// is kept verbatim.
#[derive(Debug, Clone)]
pub struct RunCommand {
    index: usize,
    args: Vec<String>,
    command: String,
}

impl RunCommand {
    fn build(index: usize, args: Vec<String>, _: &ScriptDefaults) -> Result<Command, ParseError> {
        let command = args.first().map(|s| s.trim().to_string()).unwrap_or_default();
        if command.is_empty() {
            return Err(invalid(index, CMD_RUN, "requires a command line"));
        }

        Ok(Command::Run(RunCommand {
            index,
            args,
            command,
        }))
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

/// CAPTURE - cluster-resource selectors handed to the capture collaborator.
#[derive(Debug, Clone)]
pub struct CaptureCommand {
    index: usize,
    args: Vec<String>,
    selectors: Vec<String>,
}

impl CaptureCommand {
    fn build(index: usize, args: Vec<String>, _: &ScriptDefaults) -> Result<Command, ParseError> {
        if args.is_empty() {
            return Err(invalid(index, CMD_CAPTURE, "requires at least one selector"));
        }
        reject_blank(index, CMD_CAPTURE, &args)?;

        let selectors = args.clone();
        Ok(Command::Capture(CaptureCommand {
            index,
            args,
            selectors,
        }))
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn selectors(&self) -> &[String] {
        &self.selectors
    }
}

/// OUTPUT - bundle destination for the collected working tree.
#[derive(Debug, Clone)]
pub struct OutputCommand {
    index: usize,
    args: Vec<String>,
    path: PathBuf,
}

impl OutputCommand {
    fn build(index: usize, args: Vec<String>, _: &ScriptDefaults) -> Result<Command, ParseError> {
        if args.len() != 1 {
            return Err(invalid(index, CMD_OUTPUT, "requires exactly one path"));
        }
        reject_blank(index, CMD_OUTPUT, &args)?;

        // Accept both `OUTPUT /x.tar.gz` and the prefixed `OUTPUT path:/x.tar.gz`.
        let raw = args[0].strip_prefix("path:").unwrap_or(&args[0]);
        if raw.is_empty() {
            return Err(invalid(index, CMD_OUTPUT, "blank argument"));
        }

        let path = PathBuf::from(raw);
        Ok(Command::Output(OutputCommand { index, args, path }))
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> ScriptDefaults {
        ScriptDefaults {
            workdir: PathBuf::from("/tmp/out"),
            kubeconfig: PathBuf::from("/home/op/.kube/config"),
        }
    }

    fn build(keyword: &str, args: &[&str]) -> Result<Command, ParseError> {
        let builder = builder_for(keyword).expect("registered keyword");
        builder(1, args.iter().map(|s| s.to_string()).collect(), &defaults())
    }

    #[test]
    fn from_parses_machines_with_default_port() {
        let cmd = build(CMD_FROM, &["10.0.0.1", "10.0.0.2:2222", "local"]).unwrap();
        let Command::From(from) = cmd else {
            panic!("expected FROM")
        };
        assert_eq!(from.machines().len(), 3);
        assert_eq!(from.machines()[0].address(), "10.0.0.1:22");
        assert_eq!(from.machines()[1].address(), "10.0.0.2:2222");
        assert!(from.machines()[2].is_local());
    }

    #[test]
    fn from_rejects_bad_port() {
        assert!(build(CMD_FROM, &["host:notaport"]).is_err());
        assert!(build(CMD_FROM, &[]).is_err());
    }

    #[test]
    fn workdir_takes_exactly_one_path() {
        let cmd = build(CMD_WORKDIR, &["/tmp/collect"]).unwrap();
        let Command::Workdir(wd) = cmd else {
            panic!("expected WORKDIR")
        };
        assert_eq!(wd.path(), Path::new("/tmp/collect"));
        assert!(build(CMD_WORKDIR, &[]).is_err());
        assert!(build(CMD_WORKDIR, &["/a", "/b"]).is_err());
    }

    #[test]
    fn authconfig_requires_both_tokens_any_order() {
        let cmd = build(
            CMD_AUTHCONFIG,
            &["private-key:/home/op/.ssh/id_rsa", "username:op"],
        )
        .unwrap();
        let Command::AuthConfig(auth) = cmd else {
            panic!("expected AUTHCONFIG")
        };
        assert_eq!(auth.username(), "op");
        assert_eq!(auth.private_key(), Path::new("/home/op/.ssh/id_rsa"));

        assert!(build(CMD_AUTHCONFIG, &["username:op"]).is_err());
        assert!(build(CMD_AUTHCONFIG, &["private-key:/k"]).is_err());
        assert!(build(CMD_AUTHCONFIG, &["username:op", "bogus:x"]).is_err());
    }

    #[test]
    fn kubeconfig_falls_back_to_default() {
        let cmd = build(CMD_KUBECONFIG, &[]).unwrap();
        let Command::KubeConfig(kc) = cmd else {
            panic!("expected KUBECONFIG")
        };
        assert_eq!(kc.path(), Path::new("/home/op/.kube/config"));

        let cmd = build(CMD_KUBECONFIG, &["/etc/kube/conf"]).unwrap();
        let Command::KubeConfig(kc) = cmd else {
            panic!("expected KUBECONFIG")
        };
        assert_eq!(kc.path(), Path::new("/etc/kube/conf"));
    }

    #[test]
    fn env_splits_on_first_colon_only() {
        let cmd = build(CMD_ENV, &["search:/usr/bin:/bin", "mode:fast"]).unwrap();
        let Command::Env(env) = cmd else {
            panic!("expected ENV")
        };
        assert_eq!(
            env.vars()[0],
            ("search".to_string(), "/usr/bin:/bin".to_string())
        );
        assert_eq!(env.vars()[1], ("mode".to_string(), "fast".to_string()));

        assert!(build(CMD_ENV, &["novalue"]).is_err());
        assert!(build(CMD_ENV, &[":orphan"]).is_err());
    }

    #[test]
    fn copy_keeps_all_paths() {
        let cmd = build(CMD_COPY, &["/var/log/syslog", "/etc/hosts"]).unwrap();
        let Command::Copy(cp) = cmd else {
            panic!("expected COPY")
        };
        assert_eq!(cp.paths().len(), 2);
        assert!(build(CMD_COPY, &[]).is_err());
        assert!(build(CMD_COPY, &[" "]).is_err());
    }

    #[test]
    fn run_requires_nonblank_command() {
        let cmd = build(CMD_RUN, &["df -h /"]).unwrap();
        let Command::Run(run) = cmd else {
            panic!("expected RUN")
        };
        assert_eq!(run.command(), "df -h /");
        assert!(build(CMD_RUN, &["   "]).is_err());
        assert!(build(CMD_RUN, &[]).is_err());
    }

    #[test]
    fn output_accepts_path_prefix() {
        for arg in ["path:/tmp/out.tar.gz", "/tmp/out.tar.gz"] {
            let cmd = build(CMD_OUTPUT, &[arg]).unwrap();
            let Command::Output(out) = cmd else {
                panic!("expected OUTPUT")
            };
            assert_eq!(out.path(), Path::new("/tmp/out.tar.gz"));
        }
        assert!(build(CMD_OUTPUT, &["path:"]).is_err());
    }
}
