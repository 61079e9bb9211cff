use std::collections::VecDeque;

use lmc::{
    assemble, assemble_with, AsmErrorKind, Cpu, FaultKind, Image, OpcodeTable, Overflow,
    RunOutcome, RunStatus,
};

fn run_with(table: OpcodeTable, src: &str, inputs: &[u16]) -> (Cpu, Vec<u16>) {
    let program = assemble_with(src, &table).unwrap();
    let mut cpu = Cpu::new(table);
    cpu.load(&program.image);
    let mut inputs: VecDeque<u16> = inputs.iter().copied().collect();
    let mut outputs = Vec::new();
    let outcome = cpu
        .run_to_halt(&mut inputs, &mut outputs, Some(10_000))
        .unwrap();
    assert!(matches!(outcome, RunOutcome::Halted { .. }));
    (cpu, outputs)
}

fn run(src: &str, inputs: &[u16]) -> Vec<u16> {
    run_with(OpcodeTable::standard(), src, inputs).1
}

#[test]
fn adds_a_number_to_itself() {
    let src = "
        LDA five
        ADD five
        OUT
        HLT
five    DAT 5
";
    assert_eq!(
        assemble(src).unwrap(),
        Image::from_slice(&[504, 104, 902, 0, 5]).unwrap()
    );

    let (cpu, outputs) = run_with(OpcodeTable::standard(), src, &[]);
    assert_eq!(outputs, vec![10]);
    assert_eq!(cpu.registers().acc, 10);
    assert_eq!(cpu.registers().pc, 4);
    assert_eq!(cpu.status(), RunStatus::Halted);
}

#[test]
fn label_definitions_may_end_in_colon() {
    let src = "LDA five\nADD five\nOUT\nHLT\nfive: DAT 5";
    assert_eq!(
        assemble(src).unwrap(),
        Image::from_slice(&[504, 104, 902, 0, 5]).unwrap()
    );

    let (cpu, outputs) = run_with(OpcodeTable::standard(), src, &[]);
    assert_eq!(outputs, vec![10]);
    assert_eq!(cpu.registers().acc, 10);
    assert_eq!(cpu.registers().pc, 4);
}

#[test]
fn echoes_input() {
    assert_eq!(run("INP\nOUT\nHLT", &[7]), vec![7]);
}

#[test]
fn counts_down() {
    let src = "
        INP
loop    OUT
        SUB one
        BRZ done
        BRA loop
done    OUT
        HLT
one     DAT 1
";
    assert_eq!(run(src, &[3]), vec![3, 2, 1, 0]);
}

#[test]
fn sums_until_zero() {
    let src = "
loop    INP
        BRZ done
        ADD total
        STA total
        BRA loop
done    LDA total
        OUT
        HLT
total   DAT
";
    assert_eq!(run(src, &[5, 10, 20, 0]), vec![35]);
}

#[test]
fn multiplies_by_repeated_addition() {
    let src = "
        INP
        STA x
        INP
        STA y
loop    LDA y
        BRZ done
        SUB one
        STA y
        LDA acc
        ADD x
        STA acc
        BRA loop
done    LDA acc
        OUT
        HLT
x       DAT
y       DAT
acc     DAT 0
one     DAT 1
";
    assert_eq!(run(src, &[6, 7]), vec![42]);
    assert_eq!(run(src, &[9, 0]), vec![0]);
}

#[test]
fn brp_follows_tens_complement_sign() {
    let src = "
        INP
        BRP high
        OUT
        HLT
high    LDA marker
        OUT
        HLT
marker  DAT 111
";
    // -3 in ten's complement
    assert_eq!(run(src, &[997]), vec![111]);
    assert_eq!(run(src, &[3]), vec![3]);
}

#[test]
fn brz_only_on_zero() {
    let src = "
        INP
        BRZ zero
        OUT
        HLT
zero    LDA marker
        OUT
        HLT
marker  DAT 222
";
    assert_eq!(run(src, &[0]), vec![222]);
    assert_eq!(run(src, &[500]), vec![500]);
}

#[test]
fn classic_dialect_swaps_branch_opcodes() {
    let src = "
        INP
        BRZ zero
        HLT
zero    OUT
        HLT
";
    let classic = OpcodeTable::classic();
    let program = assemble_with(src, &classic).unwrap();
    assert_eq!(program.image[1], 703);
    let (_, outputs) = run_with(classic, src, &[0]);
    assert_eq!(outputs, vec![0]);
}

#[test]
fn org_places_data() {
    let image = assemble("ORG 50\nvalue DAT 77").unwrap();
    assert_eq!(image[50], 77);
    assert_eq!(image.cells().iter().filter(|&&v| v != 0).count(), 1);
}

#[test]
fn origin_overflow_points_at_address() {
    let err = assemble("INP\nORG 150\nDAT").unwrap_err();
    assert_eq!(
        err.kind,
        AsmErrorKind::AddressOverflow(Overflow::Origin { addr: 150 })
    );
    assert_eq!(err.line, 2);
    assert_eq!(err.span.offs(), 8);
    assert_eq!(err.span.len(), 3);
}

#[test]
fn reports_undefined_label() {
    let err = assemble("LDA nowhere\nHLT").unwrap_err();
    assert_eq!(
        err.kind,
        AsmErrorKind::UndefinedSymbol {
            name: "nowhere".to_string()
        }
    );
    assert_eq!(err.line, 1);

    let report = err.report("LDA nowhere\nHLT");
    assert_eq!(report.to_string(), "line 1: label `nowhere` is never defined");
}

#[test]
fn reports_duplicate_label() {
    let err = assemble("a DAT 1\nb DAT 2\nA DAT 3").unwrap_err();
    assert_eq!(
        err.kind,
        AsmErrorKind::DuplicateSymbol {
            name: "a".to_string(),
            first_line: 1
        }
    );
    assert_eq!(err.line, 3);
}

#[test]
fn rejects_programs_larger_than_memory() {
    let src = "DAT\n".repeat(101);
    let err = assemble(&src).unwrap_err();
    assert_eq!(
        err.kind,
        AsmErrorKind::AddressOverflow(Overflow::ProgramTooLarge)
    );
    assert!(assemble(&"DAT\n".repeat(100)).is_ok());
}

#[test]
fn running_into_data_faults() {
    let program = assemble_with("LDA 0\nvalue DAT 412", &OpcodeTable::standard()).unwrap();
    let mut cpu = Cpu::default();
    cpu.load(&program.image);
    let fault = cpu
        .run_to_halt(&mut VecDeque::new(), &mut Vec::new(), None)
        .unwrap_err();
    assert_eq!(
        fault.kind,
        FaultKind::UnimplementedOpcode { opcode: 4, addr: 1 }
    );
    assert_eq!(fault.registers.acc, 500);
    assert_eq!(cpu.status(), RunStatus::Aborted);
}

#[test]
fn loading_resets_registers() {
    let (mut cpu, _) = run_with(OpcodeTable::standard(), "INP\nOUT\nHLT", &[321]);
    assert_eq!(cpu.registers().acc, 321);

    let image = assemble("HLT").unwrap();
    cpu.load(&image);
    assert_eq!(cpu.registers().acc, 0);
    assert_eq!(cpu.registers().pc, 0);
    assert!(cpu.registers().zero);
    assert_eq!(cpu.status(), RunStatus::Running);
}

#[test]
fn infinite_loop_hits_step_limit() {
    let image = assemble("loop BRA loop").unwrap();
    let mut cpu = Cpu::default();
    cpu.load(&image);
    let outcome = cpu
        .run_to_halt(&mut VecDeque::new(), &mut Vec::new(), Some(500))
        .unwrap();
    assert_eq!(outcome, RunOutcome::Stopped { steps: 500 });
}

#[test]
fn image_text_survives_compile() {
    let image = assemble("INP\nOUT\nHLT").unwrap();
    let text = image.to_string();
    assert!(text.starts_with("901\n902\n000\n"));
    assert_eq!(text.lines().count(), 100);
    assert_eq!(text.parse::<Image>().unwrap(), image);
}
