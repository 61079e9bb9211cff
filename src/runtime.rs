use std::collections::VecDeque;

use crate::alu;
use crate::error::{Fault, FaultKind};
use crate::image::{Image, MEMORY_SIZE};
use crate::ops::{DecodeError, Instruction, OpcodeTable};
use crate::state::{MachineState, Registers};

/// Supplies values to `INP`. Returning `None` means input is exhausted.
pub trait Input {
    fn read(&mut self) -> Option<u16>;
}

/// Receives values from `OUT`.
pub trait Output {
    fn write(&mut self, value: u16);
}

/// Pre-supplied inputs, consumed from the front.
impl Input for VecDeque<u16> {
    fn read(&mut self) -> Option<u16> {
        self.pop_front()
    }
}

impl Output for Vec<u16> {
    fn write(&mut self, value: u16) {
        self.push(value)
    }
}

/// [`Input`] backed by a closure, see [`input_fn`].
pub struct InputFn<F>(F);

/// [`Output`] backed by a closure, see [`output_fn`].
pub struct OutputFn<F>(F);

pub fn input_fn<F: FnMut() -> Option<u16>>(f: F) -> InputFn<F> {
    InputFn(f)
}

pub fn output_fn<F: FnMut(u16)>(f: F) -> OutputFn<F> {
    OutputFn(f)
}

impl<F: FnMut() -> Option<u16>> Input for InputFn<F> {
    fn read(&mut self) -> Option<u16> {
        (self.0)()
    }
}

impl<F: FnMut(u16)> Output for OutputFn<F> {
    fn write(&mut self, value: u16) {
        (self.0)(value)
    }
}

/// Where the CPU is within its cycle.
///
/// Between calls to [`Cpu::step`] this is always `Ready` or `Halted`.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub enum Phase {
    #[default]
    Ready,
    Fetching,
    Decoding,
    Executing,
    Halted,
}

/// Outcome visible to a launcher.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RunStatus {
    Running,
    /// Stopped at `HLT`
    Halted,
    /// Stopped by a fault
    Aborted,
}

/// Why a run returned without a fault.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RunOutcome {
    /// Reached `HLT` after executing `steps` cycles.
    Halted { steps: u64 },
    /// Stopped between cycles before reaching `HLT`.
    Stopped { steps: u64 },
}

/// Fetch/decode/execute engine driving one machine.
#[derive(Clone, Debug)]
pub struct Cpu {
    state: MachineState,
    table: OpcodeTable,
    phase: Phase,
    /// Set once a cycle faults; the machine stays halted until reloaded.
    fault: Option<Fault>,
    /// Cycles executed since load
    steps: u64,
}

impl Cpu {
    pub fn new(table: OpcodeTable) -> Self {
        Cpu {
            state: MachineState::new(),
            table,
            phase: Phase::Ready,
            fault: None,
            steps: 0,
        }
    }

    pub fn load(&mut self, image: &Image) {
        self.state.load(image);
        self.restart();
    }

    /// Restore registers to their post-load values, keeping memory.
    pub fn reset(&mut self) {
        self.state.reset();
        self.restart();
    }

    /// Zero memory and reset registers.
    pub fn clear(&mut self) {
        self.state.clear();
        self.restart();
    }

    fn restart(&mut self) {
        self.phase = Phase::Ready;
        self.fault = None;
        self.steps = 0;
    }

    /// Perform one full instruction cycle. Returns whether the machine is halted.
    ///
    /// Stepping a halted machine does nothing; stepping an aborted one returns its fault again.
    pub fn step(&mut self, input: &mut dyn Input, output: &mut dyn Output) -> Result<bool, Fault> {
        if let Some(fault) = &self.fault {
            return Err(fault.clone());
        }
        if self.phase == Phase::Halted {
            return Ok(true);
        }

        self.steps += 1;
        match self.cycle(input, output) {
            Ok(halted) => Ok(halted),
            Err(kind) => {
                self.phase = Phase::Halted;
                let fault = Fault {
                    kind,
                    registers: self.state.registers(),
                };
                self.fault = Some(fault.clone());
                Err(fault)
            }
        }
    }

    fn cycle(&mut self, input: &mut dyn Input, output: &mut dyn Output) -> Result<bool, FaultKind> {
        // Fetch
        self.phase = Phase::Fetching;
        let addr = self.state.pc();
        self.state.set_mar(addr);
        self.state.read_mdr()?;
        self.state.set_cir(self.state.mdr());
        self.state.set_pc(((addr as usize + 1) % MEMORY_SIZE) as u8);

        // Decode
        self.phase = Phase::Decoding;
        let word = self.state.cir();
        let instr = self.table.decode(word).map_err(|err| match err {
            DecodeError::Reserved { opcode } => FaultKind::UnimplementedOpcode { opcode, addr },
            DecodeError::Invalid => FaultKind::InvalidInstruction { word, addr },
        })?;

        // Execute
        self.phase = Phase::Executing;
        match instr {
            Instruction::Hlt => {
                self.phase = Phase::Halted;
                return Ok(true);
            }
            Instruction::Add(operand) => {
                self.state.set_mar(operand);
                self.state.read_mdr()?;
                let (acc, carry) = alu::add(self.state.acc(), self.state.mdr());
                self.state.set_acc(acc);
                self.state.set_carry(carry);
            }
            Instruction::Sub(operand) => {
                self.state.set_mar(operand);
                self.state.read_mdr()?;
                let (acc, carry) = alu::sub(self.state.acc(), self.state.mdr());
                self.state.set_acc(acc);
                self.state.set_carry(carry);
            }
            Instruction::Sta(operand) => {
                self.state.set_mar(operand);
                self.state.set_mdr(self.state.acc());
                self.state.write_mdr()?;
            }
            Instruction::Lda(operand) => {
                self.state.set_mar(operand);
                self.state.read_mdr()?;
                self.state.set_acc(self.state.mdr());
            }
            Instruction::Bra(operand) => self.state.set_pc(operand),
            Instruction::Brp(operand) => {
                if self.state.is_positive() {
                    self.state.set_pc(operand)
                }
            }
            Instruction::Brz(operand) => {
                if self.state.is_zero() {
                    self.state.set_pc(operand)
                }
            }
            Instruction::Inp => {
                let value = input.read().ok_or(FaultKind::InputExhausted)?;
                if value >= alu::BASE {
                    return Err(FaultKind::InputOutOfRange { value });
                }
                self.state.set_acc(value);
            }
            Instruction::Out => output.write(self.state.acc()),
        }
        self.phase = Phase::Ready;
        Ok(false)
    }

    /// Step until `HLT`, a fault, or `step_limit` cycles have run in this call.
    pub fn run_to_halt(
        &mut self,
        input: &mut dyn Input,
        output: &mut dyn Output,
        step_limit: Option<u64>,
    ) -> Result<RunOutcome, Fault> {
        let mut remaining = step_limit;
        self.run_until(input, output, |_| match &mut remaining {
            Some(0) => true,
            Some(n) => {
                *n -= 1;
                false
            }
            None => false,
        })
    }

    /// Step until `HLT` or a fault, asking `should_stop` before every cycle.
    ///
    /// Cancellation only happens between cycles, so the machine is always consistent afterwards.
    pub fn run_until(
        &mut self,
        input: &mut dyn Input,
        output: &mut dyn Output,
        mut should_stop: impl FnMut(&Cpu) -> bool,
    ) -> Result<RunOutcome, Fault> {
        loop {
            if self.status() == RunStatus::Running && should_stop(self) {
                return Ok(RunOutcome::Stopped { steps: self.steps });
            }
            if self.step(input, output)? {
                return Ok(RunOutcome::Halted { steps: self.steps });
            }
        }
    }

    pub fn status(&self) -> RunStatus {
        match (self.phase, &self.fault) {
            (_, Some(_)) => RunStatus::Aborted,
            (Phase::Halted, None) => RunStatus::Halted,
            _ => RunStatus::Running,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn registers(&self) -> Registers {
        self.state.registers()
    }

    pub fn memory(&self) -> &Image {
        self.state.memory()
    }

    pub fn table(&self) -> &OpcodeTable {
        &self.table
    }

    /// Disassembly of the mailbox PC points at.
    pub fn next_instruction(&self) -> String {
        self.table.disassemble(self.memory()[self.state.pc() as usize])
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Cpu::new(OpcodeTable::standard())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpu(cells: &[u16]) -> Cpu {
        let mut cpu = Cpu::default();
        cpu.load(&Image::from_slice(cells).unwrap());
        cpu
    }

    fn run(cpu: &mut Cpu, inputs: &[u16]) -> Result<Vec<u16>, Fault> {
        let mut input: VecDeque<u16> = inputs.iter().copied().collect();
        let mut output = Vec::new();
        cpu.run_to_halt(&mut input, &mut output, Some(1000))?;
        Ok(output)
    }

    #[test]
    fn fetch_updates_registers() {
        // LDA 3; HLT; -; DAT 42
        let mut cpu = cpu(&[503, 0, 0, 42]);
        let halted = cpu.step(&mut VecDeque::new(), &mut Vec::new()).unwrap();
        assert!(!halted);
        let reg = cpu.registers();
        assert_eq!(reg.pc, 1);
        assert_eq!(reg.cir, 503);
        assert_eq!(reg.mar, 3);
        assert_eq!(reg.mdr, 42);
        assert_eq!(reg.acc, 42);
        assert_eq!(cpu.phase(), Phase::Ready);
    }

    #[test]
    fn add_and_output() {
        // LDA 4; ADD 4; OUT; HLT; DAT 5
        let mut cpu = cpu(&[504, 104, 902, 0, 5]);
        assert_eq!(run(&mut cpu, &[]), Ok(vec![10]));
        assert_eq!(cpu.registers().acc, 10);
        assert_eq!(cpu.registers().pc, 4);
        assert_eq!(cpu.status(), RunStatus::Halted);
        assert_eq!(cpu.steps(), 4);
    }

    #[test]
    fn arithmetic_folds() {
        // INP; ADD 6; OUT; SUB 7; OUT; HLT; DAT 1; DAT 2
        let mut cpu = cpu(&[901, 106, 902, 207, 902, 0, 1, 2]);
        assert_eq!(run(&mut cpu, &[999]), Ok(vec![0, 998]));
        assert!(!cpu.state().carry());
    }

    #[test]
    fn store_writes_memory() {
        // INP; STA 9; HLT
        let mut cpu = cpu(&[901, 309, 0]);
        let mut input = VecDeque::from([321]);
        let mut output = Vec::new();
        assert_eq!(cpu.step(&mut input, &mut output), Ok(false));
        assert_eq!(cpu.step(&mut input, &mut output), Ok(false));
        assert_eq!(cpu.memory()[9], 321);
        assert_eq!(cpu.registers().mdr, 321);
        assert_eq!(cpu.registers().mar, 9);

        // Fetching HLT reloads MAR and MDR from its own mailbox
        assert_eq!(cpu.step(&mut input, &mut output), Ok(true));
        assert_eq!(cpu.registers().mar, 2);
        assert_eq!(cpu.registers().mdr, 0);
        assert_eq!(cpu.memory()[9], 321);
    }

    #[test]
    fn echo() {
        let mut cpu = cpu(&[901, 902, 0]);
        assert_eq!(run(&mut cpu, &[7]), Ok(vec![7]));
    }

    #[test]
    fn brz_only_taken_on_zero() {
        // INP; BRZ 4; OUT; HLT; LDA 6; OUT; HLT (doubles as DAT 0)
        let program = [901, 804, 902, 0, 506, 902, 0];
        assert_eq!(run(&mut cpu(&program), &[0]), Ok(vec![0]));
        assert_eq!(run(&mut cpu(&program), &[1]), Ok(vec![1]));
        assert_eq!(run(&mut cpu(&program), &[500]), Ok(vec![500]));
    }

    #[test]
    fn brp_only_taken_at_or_above_500() {
        // INP; BRP 4; HLT; HLT; OUT; HLT
        let program = [901, 704, 0, 0, 902, 0];
        assert_eq!(run(&mut cpu(&program), &[500]), Ok(vec![500]));
        assert_eq!(run(&mut cpu(&program), &[999]), Ok(vec![999]));
        assert_eq!(run(&mut cpu(&program), &[499]), Ok(vec![]));
        assert_eq!(run(&mut cpu(&program), &[0]), Ok(vec![]));
    }

    #[test]
    fn bra_always_taken() {
        // BRA 2; OUT; HLT
        let mut cpu = cpu(&[602, 902, 0]);
        assert_eq!(run(&mut cpu, &[]), Ok(vec![]));
        assert_eq!(cpu.registers().pc, 3);
    }

    #[test]
    fn classic_table_swaps_branches() {
        let mut cpu = Cpu::new(OpcodeTable::classic());
        // INP; BRZ 4; HLT; HLT; OUT; HLT
        cpu.load(&Image::from_slice(&[901, 704, 0, 0, 902, 0]).unwrap());
        assert_eq!(run(&mut cpu, &[0]), Ok(vec![0]));
    }

    #[test]
    fn pc_wraps_around() {
        let mut cells = [0; MEMORY_SIZE];
        cells[99] = 901;
        let mut cpu = Cpu::default();
        cpu.load(&Image::new(cells).unwrap());
        cpu.state.set_pc(99);
        run(&mut cpu, &[5]).unwrap();
        assert_eq!(cpu.registers().pc, 1);
        assert_eq!(cpu.registers().acc, 5);
    }

    #[test]
    fn reserved_opcode_faults() {
        let mut cpu = cpu(&[901, 412]);
        let fault = run(&mut cpu, &[3]).unwrap_err();
        assert_eq!(
            fault.kind,
            FaultKind::UnimplementedOpcode { opcode: 4, addr: 1 }
        );
        assert_eq!(fault.registers.acc, 3);
        assert_eq!(fault.registers.cir, 412);
        assert_eq!(fault.registers.pc, 2);
        assert_eq!(cpu.status(), RunStatus::Aborted);

        // Stays faulted until reloaded
        assert_eq!(cpu.step(&mut VecDeque::new(), &mut Vec::new()), Err(fault));
        cpu.reset();
        assert_eq!(cpu.status(), RunStatus::Running);
    }

    #[test]
    fn invalid_io_operand_faults() {
        let mut cpu = cpu(&[903]);
        let fault = run(&mut cpu, &[]).unwrap_err();
        assert_eq!(
            fault.kind,
            FaultKind::InvalidInstruction { word: 903, addr: 0 }
        );
    }

    #[test]
    fn input_faults() {
        let mut cpu = cpu(&[901, 0]);
        assert_eq!(run(&mut cpu, &[]).unwrap_err().kind, FaultKind::InputExhausted);

        let mut cpu = self::cpu(&[901, 0]);
        assert_eq!(
            run(&mut cpu, &[1000]).unwrap_err().kind,
            FaultKind::InputOutOfRange { value: 1000 }
        );
    }

    #[test]
    fn step_limit_stops_between_cycles() {
        // BRA 0
        let mut cpu = cpu(&[600]);
        let outcome = cpu
            .run_to_halt(&mut VecDeque::new(), &mut Vec::new(), Some(25))
            .unwrap();
        assert_eq!(outcome, RunOutcome::Stopped { steps: 25 });
        assert_eq!(cpu.phase(), Phase::Ready);
        assert_eq!(cpu.status(), RunStatus::Running);
    }

    #[test]
    fn run_until_cancels() {
        // INP; OUT; BRA 0
        let mut cpu = cpu(&[901, 902, 600]);
        let mut input: VecDeque<u16> = (1..=10).collect();
        let mut seen = Vec::new();
        let outcome = cpu
            .run_until(&mut input, &mut seen, |cpu| {
                cpu.registers().pc == 0 && cpu.registers().acc == 3
            })
            .unwrap();
        assert!(matches!(outcome, RunOutcome::Stopped { .. }));
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn closures_as_io() {
        let mut cpu = cpu(&[901, 902, 901, 902, 0]);
        let mut next = 40;
        let mut sum = 0;
        let mut input = input_fn(|| {
            next += 1;
            Some(next)
        });
        let mut output = output_fn(|v| sum += v);
        let outcome = cpu.run_to_halt(&mut input, &mut output, None).unwrap();
        assert_eq!(outcome, RunOutcome::Halted { steps: 5 });
        drop(output);
        assert_eq!(sum, 41 + 42);
    }

    #[test]
    fn halted_machine_stays_halted() {
        let mut cpu = cpu(&[0, 901]);
        assert_eq!(cpu.step(&mut VecDeque::new(), &mut Vec::new()), Ok(true));
        assert_eq!(cpu.step(&mut VecDeque::new(), &mut Vec::new()), Ok(true));
        assert_eq!(cpu.registers().pc, 1);
        assert_eq!(cpu.steps(), 1);
    }

    #[test]
    fn next_instruction_disassembles() {
        let cpu = cpu(&[105]);
        assert_eq!(cpu.next_instruction(), "ADD 05");
    }
}
