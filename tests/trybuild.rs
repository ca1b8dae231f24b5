/// Compile-fail tests for the namespace check type-state
///
/// Illegal transitions must fail to compile, so a check cannot skip
/// observation, launch early or reuse a consumed state.

#[test]
fn typestate_compile_fail_tests() {
    let t = trybuild::TestCases::new();

    // Transitions out of order
    t.compile_fail("tests/typestate_compile_fail/observe_before_spawn.rs");
    t.compile_fail("tests/typestate_compile_fail/launch_before_observe.rs");

    // Skipped transitions
    t.compile_fail("tests/typestate_compile_fail/verify_from_spawned.rs");
    t.compile_fail("tests/typestate_compile_fail/verify_from_observed.rs");

    // State reuse
    t.compile_fail("tests/typestate_compile_fail/reuse_consumed_state.rs");
}
