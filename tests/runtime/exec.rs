//! Interpreter behavior tests
//!
//! Arithmetic, comparison, branch, and call semantics over real programs.

use progvm_foundation::{EvalSlot, FunctionId};
use progvm_image::{ImageBuilder, Opcode};

use crate::util::{load_vm, s};

// =============================================================================
// Scalar and vector arithmetic
// =============================================================================

#[test]
fn float_arithmetic_chain() {
    let mut b = ImageBuilder::new();
    let x = b.slot(EvalSlot::from_float(10.0));
    let y = b.slot(EvalSlot::from_float(4.0));
    let t = b.slot(EvalSlot::ZERO);
    let out = b.global_float("result", 0.0);
    let entry = b.next_statement();
    b.emit(Opcode::SubF, s(x), s(y), s(t)); // 6
    b.emit(Opcode::MulF, s(t), s(y), s(t)); // 24
    b.emit(Opcode::DivF, s(t), s(x), s(out)); // 2.4
    b.emit(Opcode::Done, 0, 0, 0);
    b.function("main", entry, 37, 0, &[]);

    let mut vm = load_vm(&b);
    let main = vm.find_function("main").unwrap();
    vm.execute(main).expect("run failed");
    assert_eq!(vm.globals().get(out).unwrap().float(), 2.4);
}

#[test]
fn vector_add_scale_and_dot() {
    let mut b = ImageBuilder::new();
    let va = b.slot(EvalSlot::from_float(1.0));
    b.slot(EvalSlot::from_float(2.0));
    b.slot(EvalSlot::from_float(3.0));
    let vb = b.slot(EvalSlot::from_float(4.0));
    b.slot(EvalSlot::from_float(5.0));
    b.slot(EvalSlot::from_float(6.0));
    let two = b.slot(EvalSlot::from_float(2.0));
    let sum = b.slot(EvalSlot::ZERO);
    b.slot(EvalSlot::ZERO);
    b.slot(EvalSlot::ZERO);
    let scaled = b.slot(EvalSlot::ZERO);
    b.slot(EvalSlot::ZERO);
    b.slot(EvalSlot::ZERO);
    let dot = b.global_float("dot", 0.0);

    let entry = b.next_statement();
    b.emit(Opcode::AddV, s(va), s(vb), s(sum));
    b.emit(Opcode::MulFv, s(two), s(va), s(scaled));
    b.emit(Opcode::MulV, s(va), s(vb), s(dot));
    b.emit(Opcode::Done, 0, 0, 0);
    b.function("main", entry, 47, 0, &[]);

    let mut vm = load_vm(&b);
    let main = vm.find_function("main").unwrap();
    vm.execute(main).expect("run failed");

    assert_eq!(vm.globals().get(sum).unwrap().float(), 5.0);
    assert_eq!(vm.globals().get(sum.offset(2)).unwrap().float(), 9.0);
    assert_eq!(vm.globals().get(scaled.offset(1)).unwrap().float(), 4.0);
    // 1*4 + 2*5 + 3*6
    assert_eq!(vm.globals().get(dot).unwrap().float(), 32.0);
}

#[test]
fn bit_ops_truncate_floats() {
    let mut b = ImageBuilder::new();
    let a = b.slot(EvalSlot::from_float(6.9));
    let c = b.slot(EvalSlot::from_float(3.2));
    let out = b.global_float("bits", 0.0);
    let entry = b.next_statement();
    b.emit(Opcode::BitAnd, s(a), s(c), s(out));
    b.emit(Opcode::Done, 0, 0, 0);
    b.function("main", entry, 36, 0, &[]);

    let mut vm = load_vm(&b);
    let main = vm.find_function("main").unwrap();
    vm.execute(main).expect("run failed");
    // 6 & 3
    assert_eq!(vm.globals().get(out).unwrap().float(), 2.0);
}

// =============================================================================
// Branches
// =============================================================================

#[test]
fn counting_loop_sums_one_to_five() {
    let mut b = ImageBuilder::new();
    let i = b.slot(EvalSlot::ZERO);
    let one = b.slot(EvalSlot::from_float(1.0));
    let five = b.slot(EvalSlot::from_float(5.0));
    let acc = b.global_float("acc", 0.0);
    let cond = b.slot(EvalSlot::ZERO);

    let entry = b.next_statement();
    let top = b.emit(Opcode::AddF, s(i), s(one), s(i));
    b.emit(Opcode::AddF, s(acc), s(i), s(acc));
    b.emit(Opcode::Lt, s(i), s(five), s(cond));
    let jump = b.emit(Opcode::If, s(cond), 0, 0);
    b.patch_branch(jump, top);
    b.emit(Opcode::Done, 0, 0, 0);
    b.function("main", entry, 38, 0, &[]);

    let mut vm = load_vm(&b);
    let main = vm.find_function("main").unwrap();
    vm.execute(main).expect("run failed");
    assert_eq!(vm.globals().get(acc).unwrap().float(), 15.0);
}

#[test]
fn truthiness_is_raw_bits_but_logic_ops_are_numeric() {
    let mut b = ImageBuilder::new();
    let neg_zero = b.slot(EvalSlot::from_float(-0.0));
    let branched = b.global_float("branched", 0.0);
    let anded = b.global_float("anded", 9.0);
    let one = b.slot(EvalSlot::from_float(1.0));

    let entry = b.next_statement();
    // AND sees -0.0 as numerically zero.
    b.emit(Opcode::And, s(neg_zero), s(one), s(anded));
    // IF sees the sign bit and takes the branch.
    let jump = b.emit(Opcode::If, s(neg_zero), 0, 0);
    b.emit(Opcode::Done, 0, 0, 0);
    let taken = b.emit(Opcode::StoreF, s(one), s(branched), 0);
    b.emit(Opcode::Done, 0, 0, 0);
    b.patch_branch(jump, taken);
    b.function("main", entry, 37, 0, &[]);

    let mut vm = load_vm(&b);
    let main = vm.find_function("main").unwrap();
    vm.execute(main).expect("run failed");

    assert_eq!(vm.globals().get(anded).unwrap().float(), 0.0);
    assert_eq!(vm.globals().get(branched).unwrap().float(), 1.0);
}

// =============================================================================
// Strings and reference comparisons
// =============================================================================

#[test]
fn string_equality_is_by_content_not_offset() {
    let mut b = ImageBuilder::new();
    let first = b.string("gold_key");
    let second = b.string("gold_key");
    assert_ne!(first, second);

    let sa = b.slot(EvalSlot::from_string(first));
    let sb = b.slot(EvalSlot::from_string(second));
    let eq = b.global_float("eq", 0.0);
    let ne = b.global_float("ne", 0.0);

    let entry = b.next_statement();
    b.emit(Opcode::EqS, s(sa), s(sb), s(eq));
    b.emit(Opcode::NeS, s(sa), s(sb), s(ne));
    b.emit(Opcode::Done, 0, 0, 0);
    b.function("main", entry, 37, 0, &[]);

    let mut vm = load_vm(&b);
    let main = vm.find_function("main").unwrap();
    vm.execute(main).expect("run failed");

    assert_eq!(vm.globals().get(eq).unwrap().float(), 1.0);
    assert_eq!(vm.globals().get(ne).unwrap().float(), 0.0);
}

#[test]
fn function_reference_tests() {
    let mut b = ImageBuilder::new();
    let live = b.slot(EvalSlot::from_function(FunctionId::new(1)));
    let null = b.slot(EvalSlot::ZERO);
    let not_live = b.global_float("not_live", 9.0);
    let not_null = b.global_float("not_null", 9.0);

    let entry = b.next_statement();
    b.emit(Opcode::NotFnc, s(live), 0, s(not_live));
    b.emit(Opcode::NotFnc, s(null), 0, s(not_null));
    b.emit(Opcode::Done, 0, 0, 0);
    b.function("main", entry, 37, 0, &[]);

    let mut vm = load_vm(&b);
    let main = vm.find_function("main").unwrap();
    vm.execute(main).expect("run failed");

    assert_eq!(vm.globals().get(not_live).unwrap().float(), 0.0);
    assert_eq!(vm.globals().get(not_null).unwrap().float(), 1.0);
}

// =============================================================================
// Calls, parameters, return values
// =============================================================================

#[test]
fn parameters_arrive_and_return_value_comes_back() {
    let mut b = ImageBuilder::new();
    let seven = b.slot(EvalSlot::from_float(7.0));
    let fslot = b.slot(EvalSlot::from_function(FunctionId::new(1)));
    let out = b.global_float("out", 0.0);
    // Callee locals: parameter plus the sum and return padding.
    let local = b.slot(EvalSlot::ZERO);
    let sum = b.slot(EvalSlot::ZERO);
    b.slot(EvalSlot::ZERO);
    b.slot(EvalSlot::ZERO);

    let callee_entry = b.next_statement();
    b.emit(Opcode::AddF, s(local), s(local), s(sum));
    b.emit(Opcode::Return, s(sum), 0, 0);
    b.function("double", callee_entry, 36, 4, &[1]);

    let main_entry = b.next_statement();
    b.emit(Opcode::StoreF, s(seven), 4, 0);
    b.emit(Opcode::Call1, s(fslot), 0, 0);
    b.emit(Opcode::StoreF, 1, s(out), 0);
    b.emit(Opcode::Done, 0, 0, 0);
    b.function("main", main_entry, 40, 0, &[]);

    let mut vm = load_vm(&b);
    let main = vm.find_function("main").unwrap();
    vm.execute(main).expect("run failed");
    assert_eq!(vm.globals().get(out).unwrap().float(), 14.0);
}

#[test]
fn execute_twice_gives_the_same_answer() {
    let mut b = ImageBuilder::new();
    let x = b.slot(EvalSlot::from_float(2.0));
    let out = b.global_float("out", 0.0);
    let entry = b.next_statement();
    b.emit(Opcode::AddF, s(x), s(x), s(out));
    b.emit(Opcode::Done, 0, 0, 0);
    b.function("main", entry, 35, 0, &[]);

    let mut vm = load_vm(&b);
    let main = vm.find_function("main").unwrap();
    vm.execute(main).expect("first run failed");
    vm.execute(main).expect("second run failed");
    assert_eq!(vm.globals().get(out).unwrap().float(), 4.0);
}

// =============================================================================
// Profiling
// =============================================================================

#[test]
fn profile_counts_statements_per_function() {
    let mut b = ImageBuilder::new();
    let i = b.slot(EvalSlot::ZERO);
    let one = b.slot(EvalSlot::from_float(1.0));
    let ten = b.slot(EvalSlot::from_float(10.0));
    let cond = b.slot(EvalSlot::ZERO);

    let entry = b.next_statement();
    let top = b.emit(Opcode::AddF, s(i), s(one), s(i));
    b.emit(Opcode::Lt, s(i), s(ten), s(cond));
    let jump = b.emit(Opcode::If, s(cond), 0, 0);
    b.patch_branch(jump, top);
    b.emit(Opcode::Done, 0, 0, 0);
    b.function("spin_up", entry, 37, 0, &[]);

    let mut vm = load_vm(&b);
    let main = vm.find_function("spin_up").unwrap();
    vm.execute(main).expect("run failed");

    // 10 iterations of 3 statements plus the final DONE.
    assert_eq!(vm.profile_counters()[main.index()], 31);
    let report = vm.profile_report();
    assert_eq!(report.len(), 1);
    assert!(report[0].ends_with("spin_up"));
}
