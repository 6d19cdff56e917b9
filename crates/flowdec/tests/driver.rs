//! Staged execution, failure handling and configuration of the driver.

mod common;

use std::io::Write;

use common::{decompile_until, decompiler};
use flowdec::{
    CfgError, DecompilerConfig, DisError, Decompiler, Error, Expr, InstrBuilder,
    ListingDisassembler, Pass, RunState, TextDisassembler, UnresolvedTargets,
};

/// `a = 1` at 0, then a jump out of the function at 1.
fn escaping_listing() -> ListingDisassembler {
    ListingDisassembler::new(vec![
        InstrBuilder::new(0).assign("a", Expr::Imm(1)).build_fall(),
        InstrBuilder::new(1).build_jump(0x100),
    ])
    .unwrap()
}

struct AlwaysFails;

impl Pass for AlwaysFails {
    fn name(&self) -> &'static str {
        "always_fails"
    }

    fn run(&self, _state: &mut RunState) -> flowdec::Result<()> {
        Err(Error::StepNotReached("never"))
    }
}

#[test]
fn test_flow_absent_before_basic_blocks() {
    let d = decompiler("return;");
    assert!(matches!(
        d.state().flow(),
        Err(Error::StepNotReached("basic_blocks"))
    ));
    assert!(d.state().completed.is_empty());
}

#[test]
fn test_run_until_then_resume() {
    let mut d = decompiler("a = 1;\nreturn a;");

    let state = d.run_until("ssa").unwrap();
    assert_eq!(state.completed, vec!["basic_blocks", "ssa"]);
    assert_eq!(state.next_step, 2);
    assert!(state.pruned_phis.is_none());

    let state = d.run_to_completion().unwrap();
    assert_eq!(state.completed, vec!["basic_blocks", "ssa", "pruned", "finalize"]);
    assert!(d.is_finished());
    assert_eq!(d.next_step(), None);
}

#[test]
fn test_run_until_past_step_is_noop() {
    let mut d = decompiler("a = 1;\nreturn a;");
    d.run_until("ssa").unwrap();
    let before = d.state().flow().unwrap().to_string();

    let state = d.run_until("basic_blocks").unwrap();
    assert_eq!(state.completed, vec!["basic_blocks", "ssa"]);
    assert_eq!(state.flow().unwrap().to_string(), before);
}

#[test]
fn test_unknown_step() {
    let mut d = decompiler("return;");
    let err = d.run_until("emit").unwrap_err();
    assert!(matches!(err, Error::UnknownStep(ref name) if name == "emit"));
    // Nothing ran and the driver is still usable.
    assert!(d.state().completed.is_empty());
    assert!(d.run_to_completion().is_ok());
}

#[test]
fn test_unresolved_target_fails_step() {
    let mut d = Decompiler::new(escaping_listing(), 0);
    let err = d.run_to_completion().unwrap_err();

    assert!(matches!(err, Error::StepFailed { step: "basic_blocks", .. }));
    assert!(matches!(
        err.root(),
        Error::Cfg(CfgError::UnresolvedTarget {
            from: 1,
            target: 0x100
        })
    ));
    assert!(d.state().flow.is_none());
    assert!(d.state().completed.is_empty());

    let again = d.run_until("ssa").unwrap_err();
    assert!(matches!(again, Error::Aborted { step: "basic_blocks" }));
}

#[test]
fn test_partial_state_after_late_failure() {
    let mut d = decompiler("a = 1;\nif (b) goto 3;\na = 2;\n3: return a;")
        .with_pass(AlwaysFails)
        .unwrap();
    let err = d.run_to_completion().unwrap_err();
    assert!(matches!(err, Error::StepFailed { step: "always_fails", .. }));

    let state = d.state();
    assert_eq!(state.completed, vec!["basic_blocks", "ssa", "pruned"]);
    assert_eq!(state.flow().unwrap().len(), 3);
    assert!(state.ssa_stats.is_some());
    assert!(!d.is_finished());
}

#[test]
fn test_steps_fixed_once_started() {
    let mut d = decompiler("a = 1;\nreturn a;");
    d.run_to_completion().unwrap();
    let err = d.with_pass(AlwaysFails).err().unwrap();
    assert!(matches!(err, Error::PipelineStarted(ref name) if name == "always_fails"));

    let mut d = decompiler("a = 1;\nreturn a;");
    d.run_until("basic_blocks").unwrap();
    assert!(matches!(
        d.with_pass(AlwaysFails),
        Err(Error::PipelineStarted(_))
    ));
}

#[test]
fn test_finalize_runs_once() {
    let mut d = decompiler("a = 1;\nreturn a;");
    d.run_to_completion().unwrap();
    let state = d.run_to_completion().unwrap();
    assert_eq!(state.completed, vec!["basic_blocks", "ssa", "pruned", "finalize"]);
    assert!(d.is_finished());
}

#[test]
fn test_record_unresolved_targets() {
    let config = DecompilerConfig::new().with_unresolved_targets(UnresolvedTargets::Record);
    let mut d = Decompiler::new(escaping_listing(), 0).with_config(config);
    let state = d.run_to_completion().unwrap();
    let flow = state.flow().unwrap();

    assert_eq!(flow.unresolved(), &[(1, 0x100)]);
    assert_eq!(flow.len(), 1);
    assert!(flow.blocks()[0].jump_to.is_empty());
}

#[test]
fn test_prune_disabled() {
    let src = "a = 1;\nif (b) goto 3;\na = 2;\n3: return b;";

    let state = decompile_until(src, "finalize");
    assert_eq!(state.pruned_phis, Some(1));

    let mut d = decompiler(src).with_config(DecompilerConfig::new().with_prune_phis(false));
    let state = d.run_to_completion().unwrap();
    assert_eq!(state.pruned_phis, Some(0));
    let flow = state.flow().unwrap();
    assert!(flow.block(flow.block_at(3).unwrap()).phi("a").is_some());
}

#[test]
fn test_entry_not_found() {
    let mut d = Decompiler::new(TextDisassembler::new("return;").unwrap(), 42);
    let err = d.run_to_completion().unwrap_err();
    assert!(matches!(err.root(), Error::Dis(DisError::EntryNotFound(42))));
}

#[test]
fn test_nonzero_entry() {
    let mut d = Decompiler::new(
        TextDisassembler::new("a = 1;\nb = 2;\nreturn b;").unwrap(),
        1,
    );
    let state = d.run_to_completion().unwrap();
    let flow = state.flow().unwrap();
    assert_eq!(flow.keys().collect::<Vec<_>>(), vec![1]);
    assert_eq!(flow.blocks()[0].items().collect::<Vec<_>>(), vec![1, 2]);
}

#[test]
fn test_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "// loop until zero").unwrap();
    writeln!(file, "1:  a = a - 1;").unwrap();
    writeln!(file, "    if (a != 0) goto 1;").unwrap();
    writeln!(file, "    return a;").unwrap();
    file.flush().unwrap();

    let dis = TextDisassembler::from_file(file.path()).unwrap();
    let mut d = Decompiler::new(dis, 0);
    let state = d.run_to_completion().unwrap();
    let flow = state.flow().unwrap();
    assert_eq!(flow.len(), 2);
    assert!(flow.blocks()[0].phi("a").is_some());
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = TextDisassembler::from_file(&dir.path().join("absent.ir")).unwrap_err();
    assert!(matches!(err, DisError::Io(_)));
}
