//! Mirror of the machine state during synthesis
//!
//! Every mnemonic the emitter appends is applied to this mirror, so the
//! planner always sees the values the machine will hold when the emitted code
//! runs.

use std::collections::BTreeMap;

use trit_vm::{
    constants::{C0, C1, C2},
    Word,
};

use crate::bootstrap::{
    background_value, CARRY_CELLS, INITIAL_ACCUMULATOR, INITIAL_DESTINATION, INITIAL_POINTER,
    INITIAL_SCRATCH, INITIAL_WORK_VALUES,
};

/// Number of constant-generation modules
pub const MODULE_COUNT: usize = 4;

/// Index of the hub module
pub const HUB: usize = 0;

/// A cell inside one of the modules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub module: usize,
    pub position: usize,
}

impl Location {
    pub const fn new(module: usize, position: usize) -> Self {
        Self { module, position }
    }
}

/// Cells of module 0
pub mod hub {
    use super::Location;

    pub const ZERO: Location = Location::new(0, 0);
    pub const ONES: Location = Location::new(0, 5);
    pub const SCRATCH: Location = Location::new(0, 6);
    pub const TWOS: Location = Location::new(0, 11);
    pub const DESTINATION: Location = Location::new(0, 12);

    /// Carry cell for the given carry level (0 to 3)
    pub const fn carry(level: usize) -> Location {
        Location::new(0, 10 - level)
    }
}

/// Cells of the auxiliary modules 1 to 3
pub mod aux {
    pub const ZERO: usize = 0;
    pub const ONES: usize = 1;
    pub const DUAL: usize = 2;
    pub const WORK: usize = 3;
    pub const TWOS: usize = 4;
}

/// What a module cell does when the machine touches it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    /// Holds a fixed value; may be rotated only while it is 0, C1 or C2
    Constant,
    /// Freely mutable
    Variable,
    /// A move through this cell lands on another module cell
    Pointer(Location),
    /// May only be combined while the accumulator holds 0 or C1
    SpecialDual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleCell {
    pub kind: CellKind,
    pub value: Word,
}

impl ModuleCell {
    const fn constant(value: Word) -> Self {
        Self {
            kind: CellKind::Constant,
            value,
        }
    }

    const fn variable(value: Word) -> Self {
        Self {
            kind: CellKind::Variable,
            value,
        }
    }

    const fn pointer(module: usize, position: usize) -> Self {
        Self {
            kind: CellKind::Pointer(Location::new(module, position)),
            value: 0,
        }
    }

    const fn dual(value: Word) -> Self {
        Self {
            kind: CellKind::SpecialDual,
            value,
        }
    }
}

/// A fixed-size run of module cells
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub cells: Vec<ModuleCell>,
}

impl Module {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn hub() -> Self {
        let cells = vec![
            ModuleCell::constant(C0),
            ModuleCell::pointer(0, 12),
            ModuleCell::pointer(1, 1),
            ModuleCell::pointer(2, 1),
            ModuleCell::pointer(3, 1),
            ModuleCell::constant(C1),
            ModuleCell::variable(INITIAL_SCRATCH),
            ModuleCell::variable(CARRY_CELLS[0]),
            ModuleCell::variable(CARRY_CELLS[1]),
            ModuleCell::variable(CARRY_CELLS[2]),
            ModuleCell::variable(CARRY_CELLS[3]),
            ModuleCell::constant(C2),
            ModuleCell::variable(INITIAL_DESTINATION),
            ModuleCell::pointer(0, 6),
            ModuleCell::pointer(0, 0),
        ];
        Self { cells }
    }

    fn auxiliary(index: usize, work: Word) -> Self {
        let cells = vec![
            ModuleCell::constant(C0),
            ModuleCell::constant(C1),
            ModuleCell::dual(C2 - 1),
            ModuleCell::variable(work),
            ModuleCell::constant(C2),
            ModuleCell::pointer(index, 3),
            ModuleCell::pointer(index, 0),
            ModuleCell::pointer(0, 12),
        ];
        Self { cells }
    }
}

/// Where the data pointer currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataPointer {
    /// Plain memory outside the modules
    Raw(Word),
    /// Inside a module
    Module(Location),
}

/// Everything the synthesizer knows about the machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineState {
    pub accumulator: Word,
    pub pointer: DataPointer,
    pub modules: [Module; MODULE_COUNT],
    pub last_preinitialized: Word,
    raw_writes: BTreeMap<Word, Word>,
}

impl MachineState {
    /// State right after the bootstrap image has run.
    pub fn bootstrap(last_preinitialized: Word) -> Self {
        let (module, position) = INITIAL_POINTER;
        Self {
            accumulator: INITIAL_ACCUMULATOR,
            pointer: DataPointer::Module(Location::new(module, position)),
            modules: [
                Module::hub(),
                Module::auxiliary(1, INITIAL_WORK_VALUES[0]),
                Module::auxiliary(2, INITIAL_WORK_VALUES[1]),
                Module::auxiliary(3, INITIAL_WORK_VALUES[2]),
            ],
            last_preinitialized,
            raw_writes: BTreeMap::new(),
        }
    }

    pub fn cell(&self, at: Location) -> Option<&ModuleCell> {
        self.modules.get(at.module)?.cells.get(at.position)
    }

    pub fn cell_mut(&mut self, at: Location) -> Option<&mut ModuleCell> {
        self.modules.get_mut(at.module)?.cells.get_mut(at.position)
    }

    fn value_at(&self, at: Location) -> Word {
        self.cell(at).map(|c| c.value).unwrap_or_default()
    }

    /// Current value of the destination-pointer cell
    pub fn destination(&self) -> Word {
        self.value_at(hub::DESTINATION)
    }

    /// Current value of an auxiliary module's work cell
    pub fn work_value(&self, module: usize) -> Word {
        self.value_at(Location::new(module, aux::WORK))
    }

    /// Value of a raw cell above the preinitialized region
    pub fn raw_value(&self, address: Word) -> Word {
        self.raw_writes
            .get(&address)
            .copied()
            .unwrap_or_else(|| background_value(address, self.last_preinitialized))
    }

    pub fn is_raw_written(&self, address: Word) -> bool {
        self.raw_writes.contains_key(&address)
    }

    pub(crate) fn record_raw(&mut self, address: Word, value: Word) {
        self.raw_writes.insert(address, value);
    }
}
