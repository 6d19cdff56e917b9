//! Independent decompilations running concurrently.

use flowdec::{
    CfgError, DecompilerConfig, Error, InstrBuilder, Job, ListingDisassembler, TextDisassembler,
    decompile_all,
};

const LOOP: &str = "
      s = 0;
      i = 0;
1:    if (i >= 8) goto 2;
      s = s + i;
      i = i + 1;
      goto 1;
2:    return s;
";

fn jobs(count: usize) -> Vec<Job> {
    (0..count)
        .map(|i| Job::new(format!("loop{i}"), TextDisassembler::new(LOOP).unwrap(), 0))
        .collect()
}

#[test]
fn test_runs_are_independent() {
    let pool = rayon::ThreadPoolBuilder::new().num_threads(4).build().unwrap();
    let outcomes = pool.install(|| decompile_all(jobs(16), DecompilerConfig::default()));

    assert_eq!(outcomes.len(), 16);
    let states: Vec<_> = outcomes
        .into_iter()
        .map(|o| o.result.unwrap())
        .collect();

    // Every run numbers its versions from zero, so identical input gives
    // identical output no matter how the runs interleave.
    let expected = states[0].flow().unwrap().to_string();
    for state in &states {
        assert_eq!(state.flow().unwrap().to_string(), expected);
        assert_eq!(state.ssa.current(), states[0].ssa.current());
        assert!(state.has_run("finalize"));
    }
}

#[test]
fn test_failure_is_isolated() {
    let mut work = jobs(3);
    let escaping = ListingDisassembler::new(vec![InstrBuilder::new(0).build_jump(0x40)]).unwrap();
    work.insert(1, Job::new("escaping", escaping, 0));

    let outcomes = decompile_all(work, DecompilerConfig::default());
    let names: Vec<&str> = outcomes.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["loop0", "escaping", "loop1", "loop2"]);

    for outcome in &outcomes {
        if outcome.name == "escaping" {
            let err = outcome.result.as_ref().err().unwrap();
            assert!(matches!(
                err.root(),
                Error::Cfg(CfgError::UnresolvedTarget { target: 0x40, .. })
            ));
        } else {
            assert!(outcome.result.is_ok());
        }
    }
}

#[test]
fn test_empty_batch() {
    assert!(decompile_all(Vec::new(), DecompilerConfig::default()).is_empty());
}
