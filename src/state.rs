use std::fmt;

use crate::alu::BASE;
use crate::error::FaultKind;
use crate::image::{Image, MEMORY_SIZE};

/// Snapshot of every register and flag.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct Registers {
    /// Accumulator
    pub acc: u16,
    /// Program counter
    pub pc: u8,
    /// Current instruction register
    pub cir: u16,
    /// Memory address register
    pub mar: u8,
    /// Memory data register
    pub mdr: u16,
    /// Set iff `acc == 0`
    pub zero: bool,
    /// Set iff `acc >= 500`
    pub positive: bool,
}

impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ACC={:03} PC={:02} CIR={:03} MAR={:02} MDR={:03} Z={} P={}",
            self.acc,
            self.pc,
            self.cir,
            self.mar,
            self.mdr,
            self.zero as u8,
            self.positive as u8,
        )
    }
}

/// Registers and mailboxes of one machine.
///
/// Every register and cell stays in range: values are folded before they are stored.
/// The Z and P flags are only ever derived from the accumulator in [`MachineState::set_acc`].
#[derive(Clone, Debug)]
pub struct MachineState {
    mem: Image,
    reg: Registers,
    /// Carry out of the last `ADD`/`SUB`
    carry: bool,
}

impl MachineState {
    pub fn new() -> Self {
        let mut state = MachineState {
            mem: Image::zeroed(),
            reg: Registers::default(),
            carry: false,
        };
        state.reset();
        state
    }

    /// Replace memory with `image` and reset every register.
    pub fn load(&mut self, image: &Image) {
        self.mem = image.clone();
        self.reset();
    }

    /// Reset registers to their power-on values, leaving memory untouched.
    pub fn reset(&mut self) {
        self.reg = Registers::default();
        self.carry = false;
        self.set_acc(0);
    }

    /// Zero every mailbox and reset registers.
    pub fn clear(&mut self) {
        self.mem = Image::zeroed();
        self.reset();
    }

    pub fn read(&self, addr: u16) -> Result<u16, FaultKind> {
        Self::check_addr(addr).map(|addr| self.mem[addr])
    }

    /// Store `value` folded into `0..1000`.
    pub fn write(&mut self, addr: u16, value: u16) -> Result<(), FaultKind> {
        let addr = Self::check_addr(addr)?;
        self.mem.set(addr as u8, value % BASE);
        Ok(())
    }

    fn check_addr(addr: u16) -> Result<usize, FaultKind> {
        match addr as usize {
            addr if addr < MEMORY_SIZE => Ok(addr),
            _ => Err(FaultKind::Address { addr }),
        }
    }

    /// Store `value` folded into `0..1000` and recompute the Z and P flags.
    pub fn set_acc(&mut self, value: u16) {
        let acc = value % BASE;
        self.reg.acc = acc;
        self.reg.zero = acc == 0;
        self.reg.positive = acc >= BASE / 2;
    }

    pub fn registers(&self) -> Registers {
        self.reg
    }

    pub fn memory(&self) -> &Image {
        &self.mem
    }

    pub fn acc(&self) -> u16 {
        self.reg.acc
    }

    pub fn pc(&self) -> u8 {
        self.reg.pc
    }

    pub fn cir(&self) -> u16 {
        self.reg.cir
    }

    pub fn mar(&self) -> u8 {
        self.reg.mar
    }

    pub fn mdr(&self) -> u16 {
        self.reg.mdr
    }

    pub fn is_zero(&self) -> bool {
        self.reg.zero
    }

    pub fn is_positive(&self) -> bool {
        self.reg.positive
    }

    pub fn carry(&self) -> bool {
        self.carry
    }

    // Micro-operations used by the CPU cycle

    pub(crate) fn set_pc(&mut self, addr: u8) {
        self.reg.pc = addr % MEMORY_SIZE as u8;
    }

    pub(crate) fn set_mar(&mut self, addr: u8) {
        self.reg.mar = addr % MEMORY_SIZE as u8;
    }

    pub(crate) fn set_mdr(&mut self, value: u16) {
        self.reg.mdr = value % BASE;
    }

    pub(crate) fn set_cir(&mut self, value: u16) {
        self.reg.cir = value % BASE;
    }

    pub(crate) fn set_carry(&mut self, carry: bool) {
        self.carry = carry;
    }

    /// MDR <- memory[MAR]
    pub(crate) fn read_mdr(&mut self) -> Result<(), FaultKind> {
        let value = self.read(u16::from(self.reg.mar))?;
        self.set_mdr(value);
        Ok(())
    }

    /// memory[MAR] <- MDR
    pub(crate) fn write_mdr(&mut self) -> Result<(), FaultKind> {
        self.write(u16::from(self.reg.mar), self.reg.mdr)
    }
}

impl Default for MachineState {
    fn default() -> Self {
        Self::new()
    }
}
