//! Data expressions and the per-cell target image

use init_synth::Diagnostics;
use trit_vm::{
    combine,
    constants::{C2, FIRST_PRINTABLE, LAST_PRINTABLE, MEMORY_SIZE},
    is_valid_initial_byte, normalize, rotate_left, rotate_right, Word,
};

use crate::{
    cycle::start_symbol,
    layout::{Addresses, CellUsage, Layout},
    program::{BinaryOp, DataExpr, Program},
    CompileError, Result,
};

/// Value of the landing cell in front of a code block when no other value
/// is known
const DEFAULT_LANDING: Word = 81;

/// Resolves labels against a finished layout.
pub struct Evaluator<'a> {
    program: &'a Program,
    addresses: &'a Addresses,
    diagnostics: Diagnostics,
}

impl<'a> Evaluator<'a> {
    pub fn new(program: &'a Program, addresses: &'a Addresses, diagnostics: Diagnostics) -> Self {
        Self {
            program,
            addresses,
            diagnostics,
        }
    }

    /// Evaluate a data expression to a word.
    ///
    /// Labels evaluate to the address before the labelled element, since
    /// the machine increments `c` and `d` after every jump.
    pub fn evaluate(&self, expr: &DataExpr) -> Result<Word> {
        match expr {
            DataExpr::Literal(value) => Ok(*value),
            DataExpr::Label { name, offset } => {
                let label = self.program.label(name)?;
                let address = self
                    .addresses
                    .get(label.target)
                    .ok_or_else(|| CompileError::UnplacedLabel(name.clone()))?;
                Ok(normalize(address as i64 + offset - 1))
            }
            DataExpr::Binary { op, lhs, rhs } => {
                let lhs = operand(self.evaluate(lhs)?)?;
                let rhs = operand(self.evaluate(rhs)?)?;
                self.binary(*op, lhs, rhs)
            }
            DataExpr::DontCare | DataExpr::Unused => Ok(0),
        }
    }

    fn binary(&self, op: BinaryOp, lhs: Word, rhs: Word) -> Result<Word> {
        let (l, r) = (lhs as i64, rhs as i64);
        let value = match op {
            BinaryOp::Add => l + r,
            BinaryOp::Sub => l - r,
            BinaryOp::Mul => l * r,
            BinaryOp::Div if r == 0 => return Err(CompileError::DivisionByZero),
            BinaryOp::Div => l / r,
            BinaryOp::Crazy => return Ok(combine(lhs, rhs)),
            BinaryOp::Rotl => return Ok(rotate_left(lhs, self.rotation(rhs, "left"))),
            BinaryOp::Rotr => {
                let amount = self.rotation(rhs, "right");
                return Ok((0..amount).fold(lhs, |v, _| rotate_right(v)));
            }
        };
        Ok(normalize(value))
    }

    fn rotation(&self, amount: Word, direction: &str) -> u32 {
        if amount >= 10 && self.diagnostics == Diagnostics::Report {
            tracing::warn!(amount, "rotate {direction} by 10 or more trits");
        }
        amount % 10
    }

    /// The value every cell must hold once initialization is done.
    ///
    /// Cells at or below the preinitialized boundary must already hold
    /// loadable bytes; everything else is written by generated code.
    pub fn image(&self, layout: &Layout) -> Result<Vec<Option<Word>>> {
        let last = layout.last_preinitialized;
        let mut image = vec![None; MEMORY_SIZE];
        let mut last_printable = DEFAULT_LANDING;

        for (address, cell) in layout.cells.iter().enumerate() {
            let address = address as Word;
            match cell.usage {
                CellUsage::Code | CellUsage::PreinitializedCode => {
                    let word = cell
                        .owner
                        .and_then(|e| self.program.code_word(e))
                        .ok_or(CompileError::InvalidPreinitializedCode(address))?;
                    let symbol = start_symbol(&word.cycle, address).ok_or(CompileError::NoCycle {
                        block: cell.owner.map_or(0, |e| e.block),
                        span: word.span,
                    })? as Word;
                    if address > last {
                        last_printable = symbol;
                    } else if !is_valid_initial_byte(address, symbol) {
                        return Err(CompileError::InvalidPreinitializedCode(address));
                    }
                    image[address as usize] = Some(symbol);
                }
                CellUsage::Data => {
                    if address <= last {
                        return Err(CompileError::DataInPreinitialized(address));
                    }
                    let word = cell
                        .owner
                        .and_then(|e| self.program.data_word(e))
                        .ok_or(CompileError::DataInPreinitialized(address))?;
                    let value = self.evaluate(&word.expr)?;
                    if (FIRST_PRINTABLE as Word..=LAST_PRINTABLE as Word).contains(&value) {
                        last_printable = value;
                    }
                    image[address as usize] = Some(value);
                }
                CellUsage::ReservedCode if address > last => {
                    let value = if address % 2 == last % 2 {
                        DEFAULT_LANDING
                    } else {
                        last_printable
                    };
                    image[address as usize] = Some(value);
                }
                CellUsage::ReservedCode | CellUsage::ReservedData | CellUsage::Unused => {}
            }
        }

        Ok(image)
    }
}

fn operand(value: Word) -> Result<Word> {
    if value > C2 {
        return Err(CompileError::OperandOutOfRange(value as i64));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        layout::Sections,
        program::{DataBlock, DataWord, Element, LabelDef, Program},
    };
    use std::collections::BTreeMap;
    use trit_vm::{constants::C1, Opcode};

    const BUDGET: usize = 10000;

    fn lit(value: Word) -> Box<DataExpr> {
        Box::new(DataExpr::Literal(value))
    }

    fn binary(op: BinaryOp, lhs: Word, rhs: Word) -> DataExpr {
        DataExpr::Binary {
            op,
            lhs: lit(lhs),
            rhs: lit(rhs),
        }
    }

    fn program(words: Vec<DataExpr>) -> Program {
        let mut labels = BTreeMap::new();
        labels.insert("ENTRY".to_string(), LabelDef {
            target: Element::data(0, 0),
            span: None,
        });
        Program {
            code: vec![],
            data: vec![DataBlock {
                offset: Some(40000),
                words: words
                    .into_iter()
                    .map(|expr| DataWord { expr, span: None })
                    .collect(),
            }],
            labels,
            entry: "ENTRY".into(),
        }
    }

    fn eval(p: &Program, expr: &DataExpr) -> Result<Word> {
        let layout = Sections::allocate(p)?.merge(BUDGET).ok_or(CompileError::NoMemory)?;
        let addresses = layout.addresses();
        Evaluator::new(p, &addresses, Diagnostics::Silent).evaluate(expr)
    }

    #[test]
    fn test_arithmetic_wraps() {
        let p = program(vec![DataExpr::Literal(0)]);
        assert_eq!(eval(&p, &binary(BinaryOp::Add, C2, 2)).unwrap(), 1);
        assert_eq!(eval(&p, &binary(BinaryOp::Sub, 0, 1)).unwrap(), C2);
        assert_eq!(eval(&p, &binary(BinaryOp::Mul, 3, 4)).unwrap(), 12);
        assert_eq!(eval(&p, &binary(BinaryOp::Div, 7, 2)).unwrap(), 3);
        assert!(matches!(
            eval(&p, &binary(BinaryOp::Div, 7, 0)),
            Err(CompileError::DivisionByZero)
        ));
        assert!(matches!(
            eval(&p, &binary(BinaryOp::Add, C2 + 1, 0)),
            Err(CompileError::OperandOutOfRange(_))
        ));
    }

    #[test]
    fn test_rotations_and_combine() {
        let p = program(vec![DataExpr::Literal(0)]);
        assert_eq!(eval(&p, &binary(BinaryOp::Rotr, 1, 1)).unwrap(), 19683);
        assert_eq!(eval(&p, &binary(BinaryOp::Rotl, 19683, 1)).unwrap(), 1);
        assert_eq!(eval(&p, &binary(BinaryOp::Rotr, 1, 11)).unwrap(), 19683);
        assert_eq!(eval(&p, &binary(BinaryOp::Rotl, 5, 0)).unwrap(), 5);
        assert_eq!(eval(&p, &binary(BinaryOp::Crazy, 0, 0)).unwrap(), C1);
    }

    #[test]
    fn test_label_points_before_element() {
        let p = program(vec![DataExpr::Literal(0)]);
        let label = |offset| DataExpr::Label {
            name: "ENTRY".into(),
            offset,
        };
        assert_eq!(eval(&p, &label(0)).unwrap(), 39999);
        assert_eq!(eval(&p, &label(3)).unwrap(), 40002);
        assert_eq!(eval(&p, &label(-40000)).unwrap(), C2);
    }

    #[test]
    fn test_image_values() {
        let p = program(vec![
            DataExpr::Literal(100),
            DataExpr::DontCare,
            DataExpr::Label {
                name: "ENTRY".into(),
                offset: 1,
            },
        ]);
        let layout = Sections::allocate(&p).unwrap().merge(BUDGET).unwrap();
        let addresses = layout.addresses();
        let image = Evaluator::new(&p, &addresses, Diagnostics::Silent)
            .image(&layout)
            .unwrap();
        assert_eq!(image[40000], Some(100));
        assert_eq!(image[40001], None);
        assert_eq!(image[40002], Some(40000));
        assert_eq!(image.iter().flatten().count(), 2);
    }

    #[test]
    fn test_landing_cells_follow_parity() {
        use crate::{
            cycle::XlatCycle,
            program::{CodeBlock, CodeWord},
        };

        let mut p = program(vec![DataExpr::Literal(100)]);
        for offset in [45001, 45012] {
            p.code.push(CodeBlock {
                offset: Some(offset),
                words: vec![CodeWord {
                    cycle: XlatCycle::Once(Opcode::Halt),
                    span: None,
                }],
            });
        }
        let layout = Sections::allocate(&p).unwrap().merge(BUDGET).unwrap();
        let last = layout.last_preinitialized;
        let addresses = layout.addresses();
        let image = Evaluator::new(&p, &addresses, Diagnostics::Silent)
            .image(&layout)
            .unwrap();

        let expected = |landing: Word, previous: Word| {
            if landing % 2 == last % 2 {
                DEFAULT_LANDING
            } else {
                previous
            }
        };
        let halt = Opcode::Halt.byte_at(45001) as Word;
        assert_eq!(image[45000], Some(expected(45000, 100)));
        assert_eq!(image[45011], Some(expected(45011, halt)));
        assert_eq!(image[45001], Some(halt));
    }

    #[test]
    fn test_data_below_boundary_is_rejected() {
        let mut p = program(vec![DataExpr::Literal(1)]);
        p.data[0].offset = Some(100);
        let layout = Sections::allocate(&p).unwrap().merge(MEMORY_SIZE).unwrap();
        let addresses = layout.addresses();
        assert!(matches!(
            Evaluator::new(&p, &addresses, Diagnostics::Silent).image(&layout),
            Err(CompileError::DataInPreinitialized(100))
        ));
    }
}
