use magpie::script::{Command, ParseError, ScriptAssembler, ScriptDefaults};
use std::path::{Path, PathBuf};

fn assembler() -> ScriptAssembler {
    ScriptAssembler::new(ScriptDefaults {
        workdir: PathBuf::from("/tmp/magpie-test"),
        kubeconfig: PathBuf::from("/home/op/.kube/config"),
    })
}

#[test]
fn test_assemble_full_script() {
    let source = r#"
# collect from two nodes
FROM 10.0.0.1 10.0.0.2:2222
WORKDIR /tmp/collect
AUTHCONFIG username:op private-key:/home/op/.ssh/id_rsa
KUBECONFIG /etc/kube/conf
ENV logdir:/var/log

COPY /var/log/syslog
RUN df -h /
CAPTURE pods namespace:kube-system
OUTPUT path:/tmp/collected.tar.gz
"#;

    let script = assembler().assemble(source).expect("well-formed script");

    let machines = script.machines();
    assert_eq!(machines.len(), 2);
    assert_eq!(machines[0].address(), "10.0.0.1:22");
    assert_eq!(machines[1].address(), "10.0.0.2:2222");

    assert_eq!(script.workdir(), Path::new("/tmp/collect"));
    assert_eq!(script.kubeconfig(), Path::new("/etc/kube/conf"));

    let auth = script.auth().expect("authconfig declared");
    assert_eq!(auth.username(), "op");
    assert_eq!(auth.private_key(), Path::new("/home/op/.ssh/id_rsa"));

    let actions = script.actions();
    assert_eq!(actions.len(), 4);
    assert!(matches!(actions[0], Command::Copy(_)));
    assert!(matches!(actions[1], Command::Run(_)));
    assert!(matches!(actions[2], Command::Capture(_)));
    assert!(matches!(actions[3], Command::Output(_)));
}

#[test]
fn test_defaults_when_preambles_absent() {
    let script = assembler().assemble("COPY /etc/hosts").unwrap();

    let machines = script.machines();
    assert_eq!(machines.len(), 1);
    assert!(machines[0].is_local());
    assert_eq!(machines[0].dir_name(), "local");

    assert_eq!(script.workdir(), Path::new("/tmp/magpie-test"));
    assert_eq!(script.kubeconfig(), Path::new("/home/op/.kube/config"));
    assert!(script.auth().is_none());
}

#[test]
fn test_zero_actions_is_valid() {
    let script = assembler().assemble("WORKDIR /tmp/w\n").unwrap();
    assert!(script.actions().is_empty());
}

#[test]
fn test_duplicate_preamble_rejected() {
    let err = assembler()
        .assemble("WORKDIR /tmp/a\nWORKDIR /tmp/b\n")
        .unwrap_err();
    assert!(matches!(err, ParseError::DuplicatePreamble { keyword: "WORKDIR", .. }));
}

#[test]
fn test_preamble_after_action_rejected() {
    let err = assembler()
        .assemble("COPY /etc/hosts\nWORKDIR /tmp/w\n")
        .unwrap_err();
    assert!(matches!(
        err,
        ParseError::PreambleAfterAction { keyword: "WORKDIR", line: 2 }
    ));
}

#[test]
fn test_unknown_keyword_rejected() {
    let err = assembler().assemble("GATHER /etc\n").unwrap_err();
    match err {
        ParseError::UnknownKeyword { line, keyword } => {
            assert_eq!(line, 1);
            assert_eq!(keyword, "GATHER");
        }
        other => panic!("expected UnknownKeyword, got: {other:?}"),
    }
}

#[test]
fn test_build_error_reports_line_number() {
    let err = assembler()
        .assemble("FROM local\n\n# comment\nCOPY\n")
        .unwrap_err();
    assert!(matches!(err, ParseError::InvalidArgs { line: 4, keyword: "COPY", .. }));
}

#[test]
fn test_quoted_tokens_admit_whitespace() {
    let script = assembler()
        .assemble(r#"COPY "/var/log/my app" /etc/hosts"#)
        .unwrap();
    let Command::Copy(copy) = &script.actions()[0] else {
        panic!("expected COPY");
    };
    assert_eq!(copy.paths()[0], Path::new("/var/log/my app"));
    assert_eq!(copy.paths()[1], Path::new("/etc/hosts"));
}

#[test]
fn test_unbalanced_quote_rejected() {
    let err = assembler().assemble(r#"COPY "/var/log"#).unwrap_err();
    assert!(matches!(err, ParseError::UnbalancedQuote { line: 1 }));
}

#[test]
fn test_env_vars_expand_in_later_lines() {
    let source = "ENV logdir:/var/log suffix:old\nCOPY ${logdir}/syslog.${suffix}\n";
    let script = assembler().assemble(source).unwrap();

    let Command::Copy(copy) = &script.actions()[0] else {
        panic!("expected COPY");
    };
    assert_eq!(copy.paths()[0], Path::new("/var/log/syslog.old"));
}

#[test]
fn test_process_env_expands_and_unset_is_empty() {
    std::env::set_var("MAGPIE_SCRIPT_TEST_DIR", "/opt/data");
    let source = "RUN ls ${MAGPIE_SCRIPT_TEST_DIR}/x${MAGPIE_SCRIPT_TEST_UNSET}\n";
    let script = assembler().assemble(source).unwrap();

    let Command::Run(run) = &script.actions()[0] else {
        panic!("expected RUN");
    };
    assert_eq!(run.command(), "ls /opt/data/x");
}

#[test]
fn test_run_keeps_remainder_verbatim() {
    let script = assembler()
        .assemble("RUN journalctl -u kubelet | tail -n 50\n")
        .unwrap();
    let Command::Run(run) = &script.actions()[0] else {
        panic!("expected RUN");
    };
    assert_eq!(run.command(), "journalctl -u kubelet | tail -n 50");
}

#[test]
fn test_expansion_happens_before_validation() {
    // The port comes from a variable; validation must see the resolved text.
    std::env::set_var("MAGPIE_SCRIPT_TEST_PORT", "2200");
    let script = assembler()
        .assemble("FROM node-a:${MAGPIE_SCRIPT_TEST_PORT}\nCOPY /etc/hosts\n")
        .unwrap();
    assert_eq!(script.machines()[0].address(), "node-a:2200");
}
