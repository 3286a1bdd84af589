//! Memory layout
//!
//! Blocks are first collected into three separate regions: blocks with a
//! fixed offset, relative blocks that need run-time initialization and
//! relative code blocks that can be written straight into the program file.
//! [`Sections::merge`] then lays the regions over each other for a given
//! initialization-code budget.

use std::collections::BTreeMap;

use init_synth::is_marker_position;
use trit_vm::{
    constants::{C2, MEMORY_SIZE, OPCODE_PERIOD},
    is_valid_initial_byte, Word,
};

use crate::{
    cycle::start_symbol,
    program::{CodeBlock, DataBlock, DataExpr, Element, Program, Section, SourceSpan},
    CompileError, Result,
};

const PERIOD: usize = OPCODE_PERIOD as usize;

/// The marker must not sit below this address
pub const MIN_MARKER_POSITION: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellUsage {
    #[default]
    Unused,
    /// Code written directly into the program file
    PreinitializedCode,
    /// Code written by the initialization code
    Code,
    Data,
    /// Landing cell in front of a code block
    ReservedCode,
    /// Data word whose contents do not matter
    ReservedData,
}

impl CellUsage {
    pub fn is_used(self) -> bool {
        self != CellUsage::Unused
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryCell {
    pub usage: CellUsage,
    pub owner: Option<Element>,
    pub span: Option<SourceSpan>,
}

impl MemoryCell {
    fn is_used(&self) -> bool {
        self.usage.is_used()
    }
}

/// Whether a code block may start at a given residue modulo 94
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Impossible,
    NeedsInit,
    Preinitializable,
}

fn empty_region() -> Vec<MemoryCell> {
    vec![MemoryCell::default(); MEMORY_SIZE]
}

/// Residues modulo 94 at which `block` can start, and whether the block has
/// to be initialized at run time.
fn placements(index: usize, block: &CodeBlock) -> Result<([Placement; PERIOD], bool)> {
    let mut placements = [Placement::Preinitializable; PERIOD];
    if let Some(offset) = block.offset {
        for (residue, placement) in placements.iter_mut().enumerate() {
            if residue != offset as usize % PERIOD {
                *placement = Placement::Impossible;
            }
        }
    }

    let mut needs_init = false;
    for (position, word) in block.words.iter().enumerate() {
        for (start, placement) in placements.iter_mut().enumerate() {
            let residue = ((start + position) % PERIOD) as u32;
            if *placement == Placement::Impossible {
                continue;
            }
            match start_symbol(&word.cycle, residue) {
                None => *placement = Placement::Impossible,
                Some(symbol) if !is_valid_initial_byte(residue, symbol as u32) => {
                    if *placement == Placement::Preinitializable {
                        *placement = Placement::NeedsInit;
                    }
                }
                Some(_) => {}
            }
        }

        if placements.iter().all(|p| *p == Placement::Impossible) {
            return Err(CompileError::NoCycle {
                block: index,
                span: word.span,
            });
        }
        if !placements.contains(&Placement::Preinitializable) {
            needs_init = true;
        }
    }

    if !needs_init {
        for placement in placements.iter_mut() {
            if *placement == Placement::NeedsInit {
                *placement = Placement::Impossible;
            }
        }
    }

    Ok((placements, needs_init))
}

fn landing_cell(address: usize) -> usize {
    if address > 0 {
        address - 1
    } else {
        C2 as usize
    }
}

fn place_code(
    region: &mut [MemoryCell],
    index: usize,
    block: &CodeBlock,
    placements: &[Placement; PERIOD],
    needs_init: bool,
) -> bool {
    let fits = |region: &[MemoryCell], start: usize| {
        !region[landing_cell(start)].is_used()
            && (0..block.words.len()).all(|i| !region[(start + i) % MEMORY_SIZE].is_used())
    };

    let start = match block.offset {
        Some(offset) => {
            let start = offset as usize;
            if !fits(region, start) {
                return false;
            }
            start
        }
        None => {
            let found = (1..C2 as usize).find(|&start| {
                placements[start % PERIOD] != Placement::Impossible && fits(region, start)
            });
            match found {
                Some(start) => start,
                None => return false,
            }
        }
    };

    let usage = if needs_init {
        CellUsage::Code
    } else {
        CellUsage::PreinitializedCode
    };

    region[landing_cell(start)] = MemoryCell {
        usage: CellUsage::ReservedCode,
        owner: None,
        span: block.words.first().and_then(|w| w.span).map(SourceSpan::start),
    };
    for (i, word) in block.words.iter().enumerate() {
        region[(start + i) % MEMORY_SIZE] = MemoryCell {
            usage,
            owner: Some(Element::code(index, i)),
            span: word.span,
        };
    }
    true
}

fn place_data(region: &mut [MemoryCell], index: usize, block: &DataBlock) -> bool {
    let used_words = || {
        block
            .words
            .iter()
            .enumerate()
            .filter(|(_, w)| w.expr != DataExpr::Unused)
    };
    let fits = |region: &[MemoryCell], start: usize| {
        used_words().all(|(i, _)| !region[(start + i) % MEMORY_SIZE].is_used())
    };

    let start = match block.offset {
        Some(offset) if fits(region, offset as usize) => offset as usize,
        Some(_) => return false,
        None => match (0..C2 as usize).find(|&start| fits(region, start)) {
            Some(start) => start,
            None => return false,
        },
    };

    for (i, word) in used_words() {
        let usage = if word.expr == DataExpr::DontCare {
            CellUsage::ReservedData
        } else {
            CellUsage::Data
        };
        region[(start + i) % MEMORY_SIZE] = MemoryCell {
            usage,
            owner: Some(Element::data(index, i)),
            span: word.span,
        };
    }
    true
}

/// Blocks sorted into the three regions the final layout is assembled from
#[derive(Debug, Clone)]
pub struct Sections {
    fixed: Vec<MemoryCell>,
    to_initialize: Vec<MemoryCell>,
    preinitialized: Vec<MemoryCell>,
}

impl Sections {
    pub fn allocate(program: &Program) -> Result<Self> {
        let mut sections = Sections {
            fixed: empty_region(),
            to_initialize: empty_region(),
            preinitialized: empty_region(),
        };

        for (index, block) in program.code.iter().enumerate() {
            if block.words.is_empty() {
                continue;
            }
            let (placements, needs_init) = placements(index, block)?;
            let region = match (block.offset, needs_init) {
                (Some(_), _) => &mut sections.fixed,
                (None, true) => &mut sections.to_initialize,
                (None, false) => &mut sections.preinitialized,
            };
            if !place_code(region, index, block, &placements, needs_init) {
                return Err(match block.offset {
                    Some(_) => CompileError::OverlappingCode,
                    None => CompileError::SectionsTooBig,
                });
            }
        }

        for (index, block) in program.data.iter().enumerate() {
            if block.words.is_empty() {
                continue;
            }
            let region = match block.offset {
                Some(_) => &mut sections.fixed,
                None => &mut sections.to_initialize,
            };
            if !place_data(region, index, block) {
                return Err(match block.offset {
                    Some(_) => CompileError::OverlappingData,
                    None => CompileError::SectionsTooBig,
                });
            }
        }

        tracing::debug!(
            fixed = count_used(&sections.fixed),
            to_initialize = count_used(&sections.to_initialize),
            preinitialized = count_used(&sections.preinitialized),
            "sections allocated"
        );

        Ok(sections)
    }

    /// Lay the regions over each other, assuming the initialization code
    /// ends at `end_of_init_code`.
    ///
    /// The run-time initialized region goes to the top of memory, the end
    /// marker below it (but no higher than the budget allows) and the
    /// preinitialized region right below the marker.
    pub fn merge(&self, end_of_init_code: usize) -> Option<Layout> {
        let mut cells = self.fixed.clone();

        let mut init_start = MEMORY_SIZE as i64;
        if let Some(last) = last_used(&self.to_initialize) {
            let mut slack = (last + PERIOD - C2 as usize % PERIOD) % PERIOD;
            if slack == 0 {
                slack = PERIOD;
            }
            let highest = C2 as i64 - (PERIOD - slack) as i64 - last as i64;
            let start = fit_below(&cells, &self.to_initialize[..=last], highest)?;
            overlay(&mut cells, &self.to_initialize[..=last], start);
            init_start = start as i64;
        }

        let marker = (0..=init_start - 2)
            .rev()
            .map(|i| i as usize)
            .find(|&i| {
                is_marker_position(i)
                    && cells[i].usage != CellUsage::PreinitializedCode
                    && cells[i + 1].usage != CellUsage::PreinitializedCode
            })
            .filter(|&i| i >= MIN_MARKER_POSITION)?;

        let mut marker = marker.min(end_of_init_code + 1);
        while !is_marker_position(marker) {
            marker += 1;
        }

        if let Some(last) = last_used(&self.preinitialized) {
            let highest = marker as i64 - 1 - last as i64;
            if highest < 0 {
                return None;
            }
            let highest = highest - highest % PERIOD as i64;
            let start = fit_below(&cells, &self.preinitialized[..=last], highest)?;
            overlay(&mut cells, &self.preinitialized[..=last], start);
        }

        Some(Layout {
            cells,
            last_preinitialized: (marker + 1) as Word,
        })
    }
}

fn count_used(region: &[MemoryCell]) -> usize {
    region.iter().filter(|c| c.is_used()).count()
}

fn last_used(region: &[MemoryCell]) -> Option<usize> {
    region.iter().rposition(MemoryCell::is_used)
}

/// Highest start at or below `highest`, in steps of 94, where `part` fits
/// into `cells` without collisions.
fn fit_below(cells: &[MemoryCell], part: &[MemoryCell], highest: i64) -> Option<usize> {
    let mut start = highest;
    while start >= 0 {
        let base = start as usize;
        let collides = part
            .iter()
            .enumerate()
            .any(|(i, cell)| cell.is_used() && cells[base + i].is_used());
        if !collides {
            return Some(base);
        }
        start -= PERIOD as i64;
    }
    None
}

fn overlay(cells: &mut [MemoryCell], part: &[MemoryCell], start: usize) {
    for (i, cell) in part.iter().enumerate().filter(|(_, c)| c.is_used()) {
        cells[start + i] = *cell;
    }
}

/// Final placement of every cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub cells: Vec<MemoryCell>,
    pub last_preinitialized: Word,
}

impl Layout {
    pub fn addresses(&self) -> Addresses {
        let mut addresses = Addresses::default();
        for (address, cell) in self.cells.iter().enumerate() {
            let Some(element) = cell.owner else {
                continue;
            };
            addresses.elements.insert(element, address as Word);
            let base = (address + MEMORY_SIZE - element.index % MEMORY_SIZE) % MEMORY_SIZE;
            addresses
                .bases
                .entry((element.section, element.block))
                .or_insert(base as Word);
        }
        addresses
    }
}

/// Addresses assigned to block elements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Addresses {
    elements: BTreeMap<Element, Word>,
    bases: BTreeMap<(Section, usize), Word>,
}

impl Addresses {
    /// Address of `element`. Unused data words still take up a position
    /// in their block, so they resolve relative to the block start.
    pub fn get(&self, element: Element) -> Option<Word> {
        if let Some(address) = self.elements.get(&element) {
            return Some(*address);
        }
        let base = self.bases.get(&(element.section, element.block))?;
        Some(((*base as usize + element.index) % MEMORY_SIZE) as Word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cycle::XlatCycle,
        program::{CodeWord, DataWord},
    };
    use trit_vm::Opcode;

    fn code(offset: Option<Word>, ops: &[Opcode]) -> CodeBlock {
        CodeBlock {
            offset,
            words: ops
                .iter()
                .map(|op| CodeWord {
                    cycle: XlatCycle::Once(*op),
                    span: None,
                })
                .collect(),
        }
    }

    fn data(offset: Option<Word>, exprs: Vec<DataExpr>) -> DataBlock {
        DataBlock {
            offset,
            words: exprs
                .into_iter()
                .map(|expr| DataWord { expr, span: None })
                .collect(),
        }
    }

    fn program(code: Vec<CodeBlock>, data: Vec<DataBlock>) -> Program {
        Program {
            code,
            data,
            labels: BTreeMap::new(),
            entry: "ENTRY".into(),
        }
    }

    #[test]
    fn test_fixed_code_reserves_landing_cell() {
        let p = program(vec![code(Some(40000), &[Opcode::Halt, Opcode::Nop])], vec![]);
        let sections = Sections::allocate(&p).unwrap();
        assert_eq!(sections.fixed[39999].usage, CellUsage::ReservedCode);
        assert_eq!(sections.fixed[40000].owner, Some(Element::code(0, 0)));
        assert_eq!(sections.fixed[40001].owner, Some(Element::code(0, 1)));
    }

    #[test]
    fn test_landing_cell_of_address_zero_wraps() {
        let p = program(vec![code(Some(0), &[Opcode::Halt])], vec![]);
        let sections = Sections::allocate(&p).unwrap();
        assert_eq!(sections.fixed[C2 as usize].usage, CellUsage::ReservedCode);
    }

    #[test]
    fn test_overlapping_offsets() {
        let p = program(
            vec![code(Some(40000), &[Opcode::Halt]), code(Some(40001), &[Opcode::Halt])],
            vec![],
        );
        assert!(matches!(
            Sections::allocate(&p),
            Err(CompileError::OverlappingCode)
        ));

        let p = program(
            vec![code(Some(40000), &[Opcode::Halt])],
            vec![data(Some(40000), vec![DataExpr::Literal(1)])],
        );
        assert!(matches!(
            Sections::allocate(&p),
            Err(CompileError::OverlappingData)
        ));
    }

    #[test]
    fn test_unused_data_words_leave_gaps() {
        let p = program(
            vec![],
            vec![
                data(None, vec![DataExpr::Literal(1), DataExpr::Unused, DataExpr::DontCare]),
                data(None, vec![DataExpr::Literal(2)]),
            ],
        );
        let sections = Sections::allocate(&p).unwrap();
        let region = &sections.to_initialize;
        assert_eq!(region[0].usage, CellUsage::Data);
        assert_eq!(region[1].owner, Some(Element::data(1, 0)));
        assert_eq!(region[2].usage, CellUsage::ReservedData);
    }

    #[test]
    fn test_relative_code_skips_used_landing_cells() {
        let p = program(vec![code(None, &[Opcode::Nop]), code(None, &[Opcode::Nop])], vec![]);
        let sections = Sections::allocate(&p).unwrap();
        let region = &sections.preinitialized;
        assert_eq!(region[0].usage, CellUsage::ReservedCode);
        assert_eq!(region[1].owner, Some(Element::code(0, 0)));
        assert_eq!(region[2].usage, CellUsage::ReservedCode);
        assert_eq!(region[3].owner, Some(Element::code(1, 0)));
    }

    #[test]
    fn test_merge_places_marker_and_regions() {
        let p = program(
            vec![code(None, &[Opcode::Jmp, Opcode::Halt])],
            vec![data(None, vec![DataExpr::Literal(7); 3])],
        );
        let sections = Sections::allocate(&p).unwrap();
        let layout = sections.merge(MEMORY_SIZE).unwrap();
        let marker = layout.last_preinitialized as usize - 1;
        assert!(is_marker_position(marker));

        let addresses = layout.addresses();
        let data_start = addresses.get(Element::data(0, 0)).unwrap() as usize;
        assert!(data_start > marker + 1);
        assert!(data_start + 2 <= C2 as usize);

        let code_start = addresses.get(Element::code(0, 0)).unwrap() as usize;
        assert!(code_start + 1 < marker);
        assert_eq!(layout.cells[code_start].usage, CellUsage::PreinitializedCode);
    }

    #[test]
    fn test_budget_lowers_marker() {
        let p = program(vec![], vec![data(None, vec![DataExpr::Literal(7)])]);
        let sections = Sections::allocate(&p).unwrap();
        let layout = sections.merge(3000).unwrap();
        assert!(layout.last_preinitialized >= 3002);
        assert!(layout.last_preinitialized < 3002 + OPCODE_PERIOD);
        assert!(is_marker_position(layout.last_preinitialized as usize - 1));
    }

    #[test]
    fn test_fixed_cells_low_in_memory_block_the_marker() {
        let p = program(vec![], vec![data(Some(0), vec![DataExpr::Literal(7); 600])]);
        let sections = Sections::allocate(&p).unwrap();
        // data fills 0..600, but the marker only has to avoid preinitialized code
        assert!(sections.merge(MEMORY_SIZE).is_some());

        let p = program(vec![code(Some(1), &[Opcode::Nop; 600])], vec![
            data(None, vec![DataExpr::Literal(7)]),
        ]);
        let sections = Sections::allocate(&p).unwrap();
        let layout = sections.merge(MEMORY_SIZE).unwrap();
        assert!(layout.last_preinitialized > 600);
    }

    #[test]
    fn test_merge_is_deterministic() {
        let p = program(
            vec![code(None, &[Opcode::Out, Opcode::Halt]), code(Some(45000), &[Opcode::Jmp])],
            vec![data(None, vec![DataExpr::Literal(1), DataExpr::Literal(2)])],
        );
        let first = Sections::allocate(&p).unwrap().merge(10000).unwrap();
        let second = Sections::allocate(&p).unwrap().merge(10000).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unused_words_resolve_by_block_start() {
        let p = program(vec![], vec![data(Some(41000), vec![
            DataExpr::Literal(1),
            DataExpr::Unused,
        ])]);
        let layout = Sections::allocate(&p).unwrap().merge(MEMORY_SIZE).unwrap();
        assert_eq!(layout.addresses().get(Element::data(0, 1)), Some(41001));
        assert_eq!(layout.addresses().get(Element::data(1, 0)), None);
    }
}
