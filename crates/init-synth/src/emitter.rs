//! Mnemonic emission and data-pointer navigation
//!
//! The emitter owns the machine-state mirror. Each appended mnemonic is
//! applied to the mirror with the same effect it will have at run time, and
//! anything the module layout forbids is rejected immediately.

use trit_vm::{
    combine,
    constants::{C0, C1, C2, MEMORY_SIZE},
    rotate_right, Mnemonic, Word,
};

use crate::{
    bootstrap::{LOW_LANDING, MODULE_ZERO_REENTRY},
    state::{CellKind, DataPointer, Location, MachineState, ModuleCell, HUB},
    Result, SynthError,
};

/// Appends mnemonics while keeping the machine-state mirror in step
#[derive(Debug, Clone)]
pub struct Emitter {
    state: MachineState,
    code: Vec<Mnemonic>,
    capacity: usize,
}

impl Emitter {
    /// Start from `state` with room for at most `capacity` mnemonics.
    pub fn new(state: MachineState, capacity: usize) -> Self {
        Self {
            state,
            code: Vec::new(),
            capacity,
        }
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn code(&self) -> &[Mnemonic] {
        &self.code
    }

    pub fn into_code(self) -> Vec<Mnemonic> {
        self.code
    }

    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.code.len())
    }

    /// Append `mnemonics` one by one.
    pub fn emit_all(&mut self, mnemonics: &[Mnemonic]) -> Result<()> {
        mnemonics.iter().try_for_each(|&m| self.emit(m))
    }

    /// Append a single mnemonic and apply it to the mirror.
    pub fn emit(&mut self, mnemonic: Mnemonic) -> Result<()> {
        if self.code.len() >= self.capacity {
            return Err(SynthError::OutOfSpace);
        }
        self.code.push(mnemonic);

        match mnemonic {
            Mnemonic::Nop => self.advance(),
            Mnemonic::MovD => self.jump(),
            Mnemonic::Opr => {
                self.combine_here()?;
                self.advance()
            }
            Mnemonic::Rot => {
                self.rotate_here()?;
                self.advance()
            }
            other => Err(SynthError::Inconsistency(format!(
                "mnemonic {} cannot be simulated",
                other.as_char()
            ))),
        }
    }

    fn advance(&mut self) -> Result<()> {
        self.state.pointer = match self.state.pointer {
            DataPointer::Raw(address) => {
                let next = (address + 1) % MEMORY_SIZE as Word;
                if next == MODULE_ZERO_REENTRY {
                    DataPointer::Module(Location::new(HUB, 0))
                } else {
                    DataPointer::Raw(next)
                }
            }
            DataPointer::Module(at) => {
                if at.position + 1 >= self.state.modules[at.module].len() {
                    return Err(SynthError::Addressing(format!(
                        "advanced past the end of module {}",
                        at.module
                    )));
                }
                DataPointer::Module(Location::new(at.module, at.position + 1))
            }
        };
        Ok(())
    }

    fn jump(&mut self) -> Result<()> {
        let last = self.state.last_preinitialized;
        self.state.pointer = match self.state.pointer {
            DataPointer::Module(at) => {
                let cell = self.module_cell(at)?;
                match cell.kind {
                    CellKind::Pointer(target) => DataPointer::Module(target),
                    _ => DataPointer::Raw((cell.value + 1) % MEMORY_SIZE as Word),
                }
            }
            DataPointer::Raw(address) if address >= last => {
                if self.state.is_raw_written(address) {
                    return Err(SynthError::Addressing(format!(
                        "move through rewritten cell {address}"
                    )));
                }
                if address % 2 != last % 2 {
                    return Err(SynthError::Addressing(format!(
                        "move through cell {address} with the wrong parity"
                    )));
                }
                DataPointer::Module(Location::new(HUB, 0))
            }
            DataPointer::Raw(1) => DataPointer::Raw(LOW_LANDING),
            DataPointer::Raw(address) => {
                return Err(SynthError::Addressing(format!(
                    "move through unknown raw cell {address}"
                )))
            }
        };
        Ok(())
    }

    fn combine_here(&mut self) -> Result<()> {
        match self.state.pointer {
            DataPointer::Module(at) => {
                let accumulator = self.state.accumulator;
                let cell = self.module_cell(at)?;
                match cell.kind {
                    CellKind::Pointer(_) | CellKind::Constant => {
                        return Err(SynthError::Addressing(format!(
                            "combine on read-only cell {}:{}",
                            at.module, at.position
                        )))
                    }
                    CellKind::SpecialDual if accumulator != C0 && accumulator != C1 => {
                        return Err(SynthError::Addressing(format!(
                            "combine on dual cell {}:{} with accumulator {accumulator}",
                            at.module, at.position
                        )))
                    }
                    _ => {}
                }
                let value = combine(accumulator, cell.value);
                self.set_module_value(at, value)?;
                self.state.accumulator = value;
            }
            DataPointer::Raw(address) => {
                if address < self.state.last_preinitialized {
                    return Err(SynthError::Addressing(format!(
                        "combine on preinitialized cell {address}"
                    )));
                }
                let value = combine(self.state.accumulator, self.state.raw_value(address));
                self.state.record_raw(address, value);
                self.state.accumulator = value;
            }
        }
        Ok(())
    }

    fn rotate_here(&mut self) -> Result<()> {
        let at = match self.state.pointer {
            DataPointer::Module(at) => at,
            DataPointer::Raw(address) => {
                return Err(SynthError::Addressing(format!(
                    "rotate on raw cell {address}"
                )))
            }
        };
        let cell = self.module_cell(at)?;
        match cell.kind {
            CellKind::Pointer(_) | CellKind::SpecialDual => {
                return Err(SynthError::Addressing(format!(
                    "rotate on protected cell {}:{}",
                    at.module, at.position
                )))
            }
            CellKind::Constant if ![C0, C1, C2].contains(&cell.value) => {
                return Err(SynthError::Addressing(format!(
                    "rotate would change constant cell {}:{}",
                    at.module, at.position
                )))
            }
            _ => {}
        }
        let value = rotate_right(cell.value);
        self.set_module_value(at, value)?;
        self.state.accumulator = value;
        Ok(())
    }

    fn module_cell(&self, at: Location) -> Result<ModuleCell> {
        self.state.cell(at).copied().ok_or_else(|| {
            SynthError::Addressing(format!("no cell {}:{}", at.module, at.position))
        })
    }

    fn set_module_value(&mut self, at: Location, value: Word) -> Result<()> {
        let cell = self.state.cell_mut(at).ok_or_else(|| {
            SynthError::Addressing(format!("no cell {}:{}", at.module, at.position))
        })?;
        cell.value = value;
        Ok(())
    }

    /// Move the data pointer to `target` and check that it arrived.
    pub fn set_pointer(&mut self, target: Location) -> Result<()> {
        self.navigate(target)?;
        if self.state.pointer != DataPointer::Module(target) {
            return Err(SynthError::Addressing(format!(
                "data pointer missed {}:{}",
                target.module, target.position
            )));
        }
        Ok(())
    }

    fn navigate(&mut self, target: Location) -> Result<()> {
        loop {
            let here = match self.state.pointer {
                DataPointer::Raw(address) => {
                    self.leave_raw(address)?;
                    continue;
                }
                DataPointer::Module(here) => here,
            };

            if here.module == target.module {
                return self.walk_within(target);
            }
            if here.module == HUB {
                self.enter_from_hub(target.module)?;
            } else {
                self.return_to_hub()?;
            }
        }
    }

    /// Take one step out of raw memory towards module 0. A parity fix may
    /// wrap the pointer to cell 0, so the caller re-checks the address.
    fn leave_raw(&mut self, address: Word) -> Result<()> {
        let last = self.state.last_preinitialized;
        if address >= last {
            if address % 2 != last % 2 {
                return self.emit(Mnemonic::Nop);
            }
            self.emit(Mnemonic::MovD)
        } else if address <= 1 {
            if address == 0 {
                self.emit(Mnemonic::Nop)?;
            }
            self.emit_all(&[Mnemonic::MovD, Mnemonic::Nop])
        } else {
            Err(SynthError::Addressing(format!(
                "cannot leave raw cell {address}"
            )))
        }
    }

    /// Walk forward inside the current module, taking pointer shortcuts that
    /// land no further than the target.
    fn walk_within(&mut self, target: Location) -> Result<()> {
        while let DataPointer::Module(here) = self.state.pointer {
            if here.position == target.position {
                return Ok(());
            }
            let shortcut = match self.module_cell(here)?.kind {
                CellKind::Pointer(dest) if dest.module == here.module => {
                    (dest.position > here.position && dest.position <= target.position)
                        || (dest.position <= target.position && here.position > target.position)
                }
                _ => false,
            };
            self.emit(if shortcut {
                Mnemonic::MovD
            } else {
                Mnemonic::Nop
            })?;
        }
        Err(SynthError::Addressing(
            "left the module while walking inside it".into(),
        ))
    }

    /// Walk around module 0 until a pointer into `module` is found.
    fn enter_from_hub(&mut self, module: usize) -> Result<()> {
        let start = self.current_location()?;
        let hub_len = self.state.modules[HUB].len();

        loop {
            let here = self.current_location()?;
            match self.module_cell(here)?.kind {
                CellKind::Pointer(dest) if dest.module == module => {
                    self.emit(Mnemonic::MovD)?;
                    break;
                }
                CellKind::Pointer(_) if here.position + 1 == hub_len => {
                    self.emit(Mnemonic::MovD)?
                }
                _ => self.emit(Mnemonic::Nop)?,
            }
            match self.state.pointer {
                DataPointer::Module(now) if now.module == HUB && now != start => {}
                _ => break,
            }
        }

        match self.state.pointer {
            DataPointer::Module(now) if now.module == module => Ok(()),
            _ => Err(SynthError::Addressing(format!(
                "module 0 has no pointer into module {module}"
            ))),
        }
    }

    /// Walk forward in an auxiliary module to its pointer back into module 0.
    fn return_to_hub(&mut self) -> Result<()> {
        loop {
            let here = self.current_location()?;
            match self.module_cell(here)?.kind {
                CellKind::Pointer(dest) if dest.module == HUB => {
                    self.emit(Mnemonic::MovD)?;
                    break;
                }
                _ => self.emit(Mnemonic::Nop)?,
            }
        }
        match self.state.pointer {
            DataPointer::Module(now) if now.module == HUB => Ok(()),
            _ => Err(SynthError::Addressing(
                "pointer back into module 0 missed".into(),
            )),
        }
    }

    fn current_location(&self) -> Result<Location> {
        match self.state.pointer {
            DataPointer::Module(at) => Ok(at),
            DataPointer::Raw(address) => Err(SynthError::Addressing(format!(
                "expected a module cell, found raw cell {address}"
            ))),
        }
    }
}
