use bitcoin::{
    blockdata::script::{Builder, PushBytesBuf},
    opcodes::{all, Opcode},
};
use scriptvm::{execute, execute_with_flags, ScriptError, VERIFY_NONE};

const A: &[u8] = b"A";
const B: &[u8] = b"B";
const C: &[u8] = b"C";
const D: &[u8] = b"D";

fn push(builder: Builder, item: &[u8]) -> Builder {
    builder.push_slice(PushBytesBuf::try_from(item.to_vec()).expect("short item"))
}

/// Pushes A, B, C, D (D on top), then applies `ops`.
fn abcd_then(ops: &[Opcode]) -> Vec<u8> {
    let mut builder = Builder::new();
    for item in [A, B, C, D] {
        builder = push(builder, item);
    }
    for op in ops {
        builder = builder.push_opcode(*op);
    }
    builder.into_script().into_bytes()
}

fn final_stack(script: &[u8]) -> Vec<Vec<u8>> {
    let execution = execute(script).expect("script completes");
    assert!(execution.is_valid());
    execution.stack().to_vec()
}

fn items(expected: &[&[u8]]) -> Vec<Vec<u8>> {
    expected.iter().map(|item| item.to_vec()).collect()
}

#[test]
fn swap_exchanges_the_top_pair() {
    let script = abcd_then(&[all::OP_SWAP]);
    assert_eq!(final_stack(&script), items(&[A, B, D, C]));
}

#[test]
fn rot_moves_third_item_to_top() {
    let script = abcd_then(&[all::OP_ROT]);
    assert_eq!(final_stack(&script), items(&[A, C, D, B]));
}

#[test]
fn two_swap_exchanges_pairs() {
    let script = abcd_then(&[all::OP_2SWAP]);
    assert_eq!(final_stack(&script), items(&[C, D, A, B]));
}

#[test]
fn two_over_copies_the_lower_pair() {
    let script = abcd_then(&[all::OP_2OVER]);
    assert_eq!(final_stack(&script), items(&[A, B, C, D, A, B]));
}

#[test]
fn tuck_inserts_copy_below_second() {
    let script = abcd_then(&[all::OP_TUCK]);
    assert_eq!(final_stack(&script), items(&[A, B, D, C, D]));
}

#[test]
fn nip_and_over() {
    assert_eq!(final_stack(&abcd_then(&[all::OP_NIP])), items(&[A, B, D]));
    assert_eq!(
        final_stack(&abcd_then(&[all::OP_OVER])),
        items(&[A, B, C, D, C])
    );
}

#[test]
fn pick_counts_depth_after_popping_the_index() {
    let script = abcd_then(&[all::OP_PUSHNUM_1, all::OP_PICK]);
    assert_eq!(final_stack(&script), items(&[A, B, C, D, C]));

    let script = abcd_then(&[all::OP_PUSHNUM_2, all::OP_PICK]);
    assert_eq!(final_stack(&script), items(&[A, B, C, D, B]));

    let script = abcd_then(&[all::OP_PUSHNUM_3, all::OP_PICK]);
    assert_eq!(final_stack(&script), items(&[A, B, C, D, A]));
}

#[test]
fn roll_moves_instead_of_copying() {
    let script = abcd_then(&[all::OP_PUSHNUM_3, all::OP_ROLL]);
    assert_eq!(final_stack(&script), items(&[B, C, D, A]));

    let script = abcd_then(&[all::OP_PUSHNUM_1, all::OP_ROLL]);
    assert_eq!(final_stack(&script), items(&[A, B, D, C]));
}

#[test]
fn pick_past_the_bottom_underflows() {
    let script = abcd_then(&[all::OP_PUSHNUM_4, all::OP_PICK]);
    let err = execute(&script).unwrap_err();
    assert_eq!(err.script_error(), Some(ScriptError::StackUnderflow));
}

#[test]
fn wide_index_overflows() {
    let mut builder = Builder::new();
    builder = push(builder, A);
    builder = push(builder, &[0x01; 9]);
    let script = builder.push_opcode(all::OP_ROLL).into_script().into_bytes();
    let err = execute(&script).unwrap_err();
    assert_eq!(err.script_error(), Some(ScriptError::NumericOverflow));
}

#[test]
fn two_rot_moves_the_deepest_pair() {
    let mut builder = Builder::new();
    let pushed: [&[u8]; 6] = [b"1", b"2", b"3", b"4", b"5", b"6"];
    for item in pushed {
        builder = push(builder, item);
    }
    let script = builder.push_opcode(all::OP_2ROT).into_script().into_bytes();
    let expected: [&[u8]; 6] = [b"3", b"4", b"5", b"6", b"1", b"2"];
    assert_eq!(final_stack(&script), items(&expected));
}

#[test]
fn dup_family_preserves_order() {
    assert_eq!(
        final_stack(&abcd_then(&[all::OP_2DUP])),
        items(&[A, B, C, D, C, D])
    );
    assert_eq!(
        final_stack(&abcd_then(&[all::OP_3DUP])),
        items(&[A, B, C, D, B, C, D])
    );
    assert_eq!(
        final_stack(&abcd_then(&[all::OP_DUP])),
        items(&[A, B, C, D, D])
    );
}

#[test]
fn depth_reports_item_count() {
    let script = abcd_then(&[all::OP_DEPTH]);
    let four: &[u8] = &[0x04];
    assert_eq!(final_stack(&script), items(&[A, B, C, D, four]));
}

#[test]
fn altstack_round_trip() {
    let script = abcd_then(&[
        all::OP_TOALTSTACK,
        all::OP_TOALTSTACK,
        all::OP_FROMALTSTACK,
    ]);
    let execution = execute(&script).unwrap();
    assert_eq!(execution.stack(), items(&[A, B, C]).as_slice());
    assert_eq!(execution.altstack(), items(&[D]).as_slice());
}

#[test]
fn suppressed_branch_skips_stack_ops() {
    let script = abcd_then(&[
        all::OP_PUSHBYTES_0,
        all::OP_IF,
        all::OP_2DROP,
        all::OP_2DROP,
        all::OP_2DROP,
        all::OP_ENDIF,
    ]);
    assert_eq!(final_stack(&script), items(&[A, B, C, D]));
}

#[test]
fn lenient_flags_keep_open_blocks() {
    let script = abcd_then(&[all::OP_PUSHNUM_1, all::OP_IF, all::OP_SWAP]);
    assert!(execute(&script).is_err());

    let execution = execute_with_flags(&script, VERIFY_NONE).unwrap();
    assert_eq!(execution.stack(), items(&[A, B, D, C]).as_slice());
    assert_eq!(execution.stats().open_conditionals(), 1);
}
