use super::*;

#[test]
fn test_direct_mode_runs_each_line() {
    let mut r = Runtime::default();
    r.enter("print(1+1)");
    assert_eq!(run(&mut r), "2\n");
    r.enter("print(\"again\")");
    assert_eq!(run(&mut r), "again\n");
}

#[test]
fn test_program_mode_collects_lines() {
    let mut r = Runtime::default();
    r.enter("prog");
    assert_eq!(run(&mut r), "Program mode.\n");
    r.enter("x:int=4");
    r.enter("print(x*x)");
    assert_eq!(run(&mut r), "");
    assert!(r.is_program_mode());
    r.enter("run");
    assert_eq!(run(&mut r), "16\n");
    r.enter("run");
    assert_eq!(run(&mut r), "16\n");
    r.enter("dir");
    assert_eq!(run(&mut r), "Direct mode.\n");
    assert!(!r.is_program_mode());
}

#[test]
fn test_ops_listing() {
    let mut r = Runtime::default();
    r.enter("ops");
    assert_eq!(run(&mut r), "No opcodes.\n");
    r.enter("print(6)");
    assert_eq!(run(&mut r), "6\n");
    r.enter("ops");
    assert_eq!(run(&mut r), "0000 CONSTANT 0 (6)\n0002 PRINT\n0003 HALT\n");
}

#[test]
fn test_clear() {
    let mut r = Runtime::default();
    r.enter("prog");
    r.enter("print(1)");
    r.enter("clear");
    assert_eq!(run(&mut r), "Program mode.\nCleared.\n");
    r.enter("run");
    assert_eq!(run(&mut r), "");
    r.enter("ops");
    assert_eq!(run(&mut r), "0000 HALT\n");
}

#[test]
fn test_compile_error_clears_program() {
    let mut r = Runtime::default();
    r.enter("print(6)");
    run(&mut r);
    r.enter("print(x)");
    assert_eq!(run(&mut r), "UNDEFINED SYMBOL AT 6; 'x'\n");
    r.enter("ops");
    assert_eq!(run(&mut r), "No opcodes.\n");
}

#[test]
fn test_output_kept_before_runtime_error() {
    let mut r = Runtime::default();
    r.enter("print(1) print(1/0) print(2)");
    assert_eq!(run(&mut r), "1\nDIVISION BY ZERO IN 7\n");
}

#[test]
fn test_line_too_long() {
    let mut r = Runtime::new(&small());
    r.enter("print(123456789012345)");
    assert_eq!(run(&mut r), "LINE BUFFER OVERFLOW; LINE LONGER THAN 20\n");
}

#[test]
fn test_program_buffer_full() {
    let mut r = Runtime::new(&small());
    r.enter("prog");
    r.enter("print(1)");
    r.enter("print(22222)");
    r.enter("print(33333)");
    assert_eq!(
        run(&mut r),
        "Program mode.\nOUT OF MEMORY; PROGRAM BUFFER FULL\n"
    );
    r.enter("run");
    assert_eq!(run(&mut r), "1\n22222\n");
}

#[test]
fn test_interrupt() {
    let mut r = Runtime::default();
    r.enter("while(true) endwhile");
    assert_eq!(r.execute(100), Event::Running);
    r.interrupt();
    match r.execute(100) {
        Event::Errors(errors) => assert_eq!(errors[0].code(), crate::lang::ErrorCode::Break),
        event => panic!("{:?}", event),
    }
    assert_eq!(r.execute(100), Event::Stopped);
}

#[test]
fn test_runaway_loop() {
    let mut r = Runtime::default();
    r.enter("i:int=0 while(i>=0) i=i+1 endwhile");
    assert_eq!(run_cycles(&mut r, 10), "\n10 Execution cycles exceeded.\n");
}
