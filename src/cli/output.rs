//! Human-readable output for dry runs and run summaries.

use crate::runtime::RunReport;
use crate::script::Script;

pub fn print_plan(script: &Script) {
    println!("workdir: {}", script.workdir().display());
    println!("kubeconfig: {}", script.kubeconfig().display());

    println!("machines:");
    for machine in script.machines() {
        println!("  {}", machine.address());
    }

    println!("actions:");
    for action in script.actions() {
        println!("  {:>3}  {} {}", action.index(), action.name(), action.args().join(" "));
    }
}

pub fn print_summary(report: &RunReport) {
    for machine in &report.machines {
        let failed = machine.outcomes.iter().filter(|o| o.is_failed()).count();
        let status = if machine.failed() { "FAILED" } else { "ok" };
        println!(
            "{}: {} ({} actions, {} failed)",
            machine.address,
            status,
            machine.outcomes.len(),
            failed
        );

        if let Some(error) = &machine.error {
            println!("  error: {error}");
        }
        for outcome in machine.outcomes.iter().filter(|o| o.is_failed()) {
            println!(
                "  {} #{}: {}",
                outcome.keyword,
                outcome.index,
                outcome.detail.as_deref().unwrap_or("failed")
            );
        }
    }

    let verdict = if report.failed() {
        "completed with failures"
    } else {
        "completed"
    };
    println!(
        "{} - artifacts under {}",
        verdict,
        report.workdir.display()
    );
}
