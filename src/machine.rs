use std::collections::HashSet;

use primitive_types::{H160, U256};
use thiserror::Error;
use tracing::{debug, trace};

use crate::memory::{Memory, MemoryError};
use crate::opcodes::{self, *};
use crate::stack::{Stack, StackError, STACK_LIMIT};
use crate::storage::Storage;
use crate::word;

/// Per-execution environment: the caller-supplied input plus the simulated
/// account the code runs as.
#[derive(Debug, Clone)]
pub struct Config {
    pub calldata: Vec<u8>,
    pub address: H160,
    pub caller: H160,
    pub callvalue: U256,
    pub stack_limit: usize,
    /// Optional step ceiling; exceeding it fails with ResourceExhausted.
    pub max_steps: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            calldata: Vec::new(),
            address: H160::zero(),
            caller: H160::zero(),
            callvalue: U256::zero(),
            stack_limit: STACK_LIMIT,
            max_steps: None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvmError {
    #[error("stack underflow")]
    StackUnderflow,
    #[error("stack overflow")]
    StackOverflow,
    #[error("invalid opcode 0x{0:02x}")]
    InvalidOpcode(u8),
    #[error("invalid jump destination {0}")]
    InvalidJump(U256),
    #[error("memory access out of bounds")]
    OutOfBounds,
    #[error("step limit exceeded")]
    ResourceExhausted,
}

impl From<StackError> for EvmError {
    fn from(e: StackError) -> Self {
        match e {
            StackError::Underflow => EvmError::StackUnderflow,
            StackError::Overflow => EvmError::StackOverflow,
        }
    }
}

impl From<MemoryError> for EvmError {
    fn from(_: MemoryError) -> Self {
        EvmError::OutOfBounds
    }
}

/// How an execution reached its terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    /// Normal termination: STOP or falling off the end of code yield empty
    /// output, RETURN yields the requested memory slice.
    Halted { output: Vec<u8> },
    /// Explicit abort via REVERT; storage writes are rolled back, the
    /// returned slice is kept.
    Reverted { output: Vec<u8> },
    /// Abnormal termination at `pc`; storage writes are rolled back.
    Failed { error: EvmError, pc: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Halt {
    Stop,
    Return,
    Revert,
}

#[derive(Debug, Clone)]
pub struct Evm {
    pub pc: usize,
    pub code: Vec<u8>,
    pub stack: Stack,
    pub memory: Memory,
    pub storage: Storage,
    pub calldata: Vec<u8>,
    pub return_data: Vec<u8>,
    pub halted: Option<Halt>,
    pub address: H160,
    pub caller: H160,
    pub callvalue: U256,
    pub steps: usize,
    pub max_steps: Option<usize>,
    jumpdests: HashSet<usize>,
}

impl Evm {
    pub fn new(code: Vec<u8>, cfg: Config) -> Self {
        let jumpdests = scan_jumpdests(&code);
        Self {
            pc: 0,
            code,
            stack: Stack::new(cfg.stack_limit),
            memory: Memory::new(),
            storage: Storage::new(),
            calldata: cfg.calldata,
            return_data: Vec::new(),
            halted: None,
            address: cfg.address,
            caller: cfg.caller,
            callvalue: cfg.callvalue,
            steps: 0,
            max_steps: cfg.max_steps,
            jumpdests,
        }
    }

    /// Runs to a terminal state. Storage mutations are all-or-nothing: a
    /// `Failed` or `Reverted` outcome restores the storage this execution
    /// started with.
    pub fn run(&mut self) -> ExecutionResult {
        let checkpoint = self.storage.checkpoint();
        while self.halted.is_none() {
            if let Err(error) = self.step() {
                let pc = self.pc;
                debug!(%error, pc, "execution failed");
                self.storage.revert(checkpoint);
                return ExecutionResult::Failed { error, pc };
            }
        }
        if self.halted == Some(Halt::Revert) {
            self.storage.revert(checkpoint);
            return ExecutionResult::Reverted {
                output: self.return_data.clone(),
            };
        }
        debug!(steps = self.steps, output_len = self.return_data.len(), "halted");
        ExecutionResult::Halted {
            output: self.return_data.clone(),
        }
    }

    pub fn step(&mut self) -> Result<(), EvmError> {
        let op = match self.code.get(self.pc) {
            Some(&op) => op,
            None => {
                // Running off the end of code is an implicit STOP.
                self.halted = Some(Halt::Stop);
                return Ok(());
            }
        };
        if let Some(limit) = self.max_steps {
            if self.steps >= limit {
                return Err(EvmError::ResourceExhausted);
            }
        }
        self.steps += 1;
        trace!(
            pc = self.pc,
            op = opcodes::name(op).unwrap_or("?"),
            depth = self.stack.len(),
            "step"
        );
        match op {
            STOP => {
                self.halted = Some(Halt::Stop);
            }

            // Arithmetic
            ADD => {
                self.binop(word::add)?;
                self.pc += 1;
            }
            MUL => {
                self.binop(word::mul)?;
                self.pc += 1;
            }
            SUB => {
                self.binop(word::sub)?;
                self.pc += 1;
            }
            DIV => {
                self.binop(word::div)?;
                self.pc += 1;
            }
            SDIV => {
                self.binop(word::sdiv)?;
                self.pc += 1;
            }
            MOD => {
                self.binop(word::rem)?;
                self.pc += 1;
            }
            SMOD => {
                self.binop(word::smod)?;
                self.pc += 1;
            }
            ADDMOD => {
                self.triop(word::addmod)?;
                self.pc += 1;
            }
            MULMOD => {
                self.triop(word::mulmod)?;
                self.pc += 1;
            }
            EXP => {
                self.binop(word::exp)?;
                self.pc += 1;
            }
            SIGNEXTEND => {
                self.binop(word::signextend)?;
                self.pc += 1;
            }

            // Comparisons and bitwise logic
            LT => {
                self.binop(|a, b| word::from_bool(a < b))?;
                self.pc += 1;
            }
            GT => {
                self.binop(|a, b| word::from_bool(a > b))?;
                self.pc += 1;
            }
            SLT => {
                self.binop(|a, b| word::from_bool(word::slt(a, b)))?;
                self.pc += 1;
            }
            SGT => {
                self.binop(|a, b| word::from_bool(word::sgt(a, b)))?;
                self.pc += 1;
            }
            EQ => {
                self.binop(|a, b| word::from_bool(a == b))?;
                self.pc += 1;
            }
            ISZERO => {
                self.unop(|a| word::from_bool(a.is_zero()))?;
                self.pc += 1;
            }
            AND => {
                self.binop(|a, b| a & b)?;
                self.pc += 1;
            }
            OR => {
                self.binop(|a, b| a | b)?;
                self.pc += 1;
            }
            XOR => {
                self.binop(|a, b| a ^ b)?;
                self.pc += 1;
            }
            NOT => {
                self.unop(|a| !a)?;
                self.pc += 1;
            }
            BYTE => {
                self.binop(word::byte)?;
                self.pc += 1;
            }

            // Keccak-256
            SHA3 => {
                let offset = self.pop_usize()?;
                let len = self.pop_usize()?;
                let hash = keccak256(self.memory.slice(offset, len)?);
                self.stack.push(U256::from_big_endian(&hash))?;
                self.pc += 1;
            }

            // Environment
            ADDRESS => {
                self.stack.push(word::address_to_word(self.address))?;
                self.pc += 1;
            }
            CALLER => {
                self.stack.push(word::address_to_word(self.caller))?;
                self.pc += 1;
            }
            CALLVALUE => {
                self.stack.push(self.callvalue)?;
                self.pc += 1;
            }
            CALLDATALOAD => {
                let offset = self.stack.pop()?;
                let mut buf = [0u8; 32];
                if let Some(o) = word::to_usize(offset) {
                    for (i, b) in buf.iter_mut().enumerate() {
                        *b = o
                            .checked_add(i)
                            .and_then(|j| self.calldata.get(j).copied())
                            .unwrap_or(0);
                    }
                }
                self.stack.push(U256::from_big_endian(&buf))?;
                self.pc += 1;
            }
            CALLDATASIZE => {
                self.stack.push(U256::from(self.calldata.len()))?;
                self.pc += 1;
            }
            CALLDATACOPY => {
                let dest = self.pop_usize()?;
                let src = self.pop_src_offset()?;
                let len = self.pop_usize()?;
                self.memory.copy_from(&self.calldata, src, dest, len)?;
                self.pc += 1;
            }
            CODESIZE => {
                self.stack.push(U256::from(self.code.len()))?;
                self.pc += 1;
            }
            CODECOPY => {
                let dest = self.pop_usize()?;
                let src = self.pop_src_offset()?;
                let len = self.pop_usize()?;
                self.memory.copy_from(&self.code, src, dest, len)?;
                self.pc += 1;
            }

            // Stack, memory, storage
            POP => {
                self.stack.pop()?;
                self.pc += 1;
            }
            MLOAD => {
                let offset = self.pop_usize()?;
                let v = self.memory.load_word(offset)?;
                self.stack.push(v)?;
                self.pc += 1;
            }
            MSTORE => {
                let offset = self.pop_usize()?;
                let value = self.stack.pop()?;
                self.memory.store_word(offset, value)?;
                self.pc += 1;
            }
            MSTORE8 => {
                let offset = self.pop_usize()?;
                let value = self.stack.pop()?;
                self.memory.store_byte(offset, value.byte(0))?;
                self.pc += 1;
            }
            SLOAD => {
                let key = self.stack.pop()?;
                self.stack.push(self.storage.load(key))?;
                self.pc += 1;
            }
            SSTORE => {
                let key = self.stack.pop()?;
                let value = self.stack.pop()?;
                trace!(%key, %value, "sstore");
                self.storage.store(key, value);
                self.pc += 1;
            }

            // Control flow
            JUMP => {
                let dest = self.stack.pop()?;
                self.pc = self.jump_target(dest)?;
            }
            JUMPI => {
                let dest = self.stack.pop()?;
                let cond = self.stack.pop()?;
                if cond.is_zero() {
                    self.pc += 1;
                } else {
                    self.pc = self.jump_target(dest)?;
                }
            }
            JUMPDEST => {
                self.pc += 1;
            }
            PC => {
                self.stack.push(U256::from(self.pc))?;
                self.pc += 1;
            }
            MSIZE => {
                self.stack.push(U256::from(self.memory.size()))?;
                self.pc += 1;
            }

            // PUSH1..PUSH32: immediate bytes past the end of code read zero.
            x if (PUSH1..=PUSH32).contains(&x) => {
                let n = push_width(x);
                let mut buf = [0u8; 32];
                for (i, b) in buf[32 - n..].iter_mut().enumerate() {
                    *b = self
                        .pc
                        .checked_add(1 + i)
                        .and_then(|j| self.code.get(j).copied())
                        .unwrap_or(0);
                }
                self.stack.push(U256::from_big_endian(&buf))?;
                self.pc += 1 + n;
            }

            x if (DUP1..=DUP16).contains(&x) => {
                let n = (x - DUP1 + 1) as usize;
                let v = self.stack.peek(n - 1)?;
                self.stack.push(v)?;
                self.pc += 1;
            }

            x if (SWAP1..=SWAP16).contains(&x) => {
                let n = (x - SWAP1 + 1) as usize;
                self.stack.swap(n)?;
                self.pc += 1;
            }

            RETURN => {
                let offset = self.pop_usize()?;
                let len = self.pop_usize()?;
                self.return_data = self.memory.slice(offset, len)?.to_vec();
                self.halted = Some(Halt::Return);
            }
            REVERT => {
                let offset = self.pop_usize()?;
                let len = self.pop_usize()?;
                self.return_data = self.memory.slice(offset, len)?.to_vec();
                self.halted = Some(Halt::Revert);
            }

            _ => return Err(EvmError::InvalidOpcode(op)),
        }
        Ok(())
    }

    fn binop(&mut self, f: impl Fn(U256, U256) -> U256) -> Result<(), EvmError> {
        let a = self.stack.pop()?;
        let b = self.stack.pop()?;
        self.stack.push(f(a, b))?;
        Ok(())
    }

    fn unop(&mut self, f: impl Fn(U256) -> U256) -> Result<(), EvmError> {
        let a = self.stack.pop()?;
        self.stack.push(f(a))?;
        Ok(())
    }

    fn triop(&mut self, f: impl Fn(U256, U256, U256) -> U256) -> Result<(), EvmError> {
        let a = self.stack.pop()?;
        let b = self.stack.pop()?;
        let n = self.stack.pop()?;
        self.stack.push(f(a, b, n))?;
        Ok(())
    }

    /// Pops a memory offset or length; values that cannot be addressed at
    /// all are out of bounds.
    fn pop_usize(&mut self) -> Result<usize, EvmError> {
        let v = self.stack.pop()?;
        word::to_usize(v).ok_or(EvmError::OutOfBounds)
    }

    /// Pops a copy-source offset. Reads past any source zero-fill, so an
    /// unaddressably large offset just reads all zeroes.
    fn pop_src_offset(&mut self) -> Result<usize, EvmError> {
        let v = self.stack.pop()?;
        Ok(word::to_usize(v).unwrap_or(usize::MAX))
    }

    fn jump_target(&self, dest: U256) -> Result<usize, EvmError> {
        word::to_usize(dest)
            .filter(|d| self.jumpdests.contains(d))
            .ok_or(EvmError::InvalidJump(dest))
    }
}

/// Runs `code` to completion against a caller-supplied storage instance.
///
/// The storage is mutated in place and may be shared across sequential
/// executions, e.g. an init run whose output becomes the code of the
/// runtime runs that follow.
pub fn execute(
    code: Vec<u8>,
    calldata: Vec<u8>,
    caller: H160,
    storage: &mut Storage,
) -> ExecutionResult {
    let mut evm = Evm::new(
        code,
        Config {
            calldata,
            caller,
            ..Config::default()
        },
    );
    evm.storage = std::mem::take(storage);
    let result = evm.run();
    *storage = evm.storage;
    result
}

/// Positions that are JUMPDEST instructions, skipping PUSH immediates so
/// data bytes can never become jump targets.
fn scan_jumpdests(code: &[u8]) -> HashSet<usize> {
    let mut set = HashSet::new();
    let mut pc = 0usize;
    while pc < code.len() {
        let op = code[pc];
        if op == JUMPDEST {
            set.insert(pc);
        }
        pc += 1 + push_width(op);
    }
    set
}

fn keccak256(data: &[u8]) -> [u8; 32] {
    use tiny_keccak::{Hasher, Keccak};
    let mut out = [0u8; 32];
    let mut hasher = Keccak::v256();
    hasher.update(data);
    hasher.finalize(&mut out);
    out
}
