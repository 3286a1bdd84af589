//! Resolved program input
//!
//! The assembler front end hands over a program whose labels are already
//! resolved to block elements. It arrives as JSON:
//!
//! ```json
//! {
//!   "code": [{ "offset": 40000, "words": [{ "cycle": { "once": "halt" } }] }],
//!   "data": [{ "words": [{ "expr": { "label": { "name": "stop" } } }] }],
//!   "labels": {
//!     "stop": { "section": "code", "block": 0, "index": 0 },
//!     "ENTRY": { "section": "data", "block": 0, "index": 0 }
//!   }
//! }
//! ```

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use trit_vm::{constants::C2, Word};

use crate::{cycle::XlatCycle, CompileError, Result};

pub const DEFAULT_ENTRY: &str = "ENTRY";

fn default_entry() -> String {
    DEFAULT_ENTRY.to_string()
}

/// Source range of an element, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceSpan {
    pub first_line: u32,
    pub first_column: u32,
    pub last_line: u32,
    pub last_column: u32,
}

impl SourceSpan {
    /// The span shrunk to its first character.
    pub fn start(self) -> SourceSpan {
        SourceSpan {
            last_line: self.first_line,
            last_column: self.first_column,
            ..self
        }
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} - {}:{}",
            self.first_line, self.first_column, self.last_line, self.last_column
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Code,
    Data,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Code => f.write_str("CODE"),
            Section::Data => f.write_str("DATA"),
        }
    }
}

/// One word of one block
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Element {
    pub section: Section,
    pub block: usize,
    pub index: usize,
}

impl Element {
    pub const fn code(block: usize, index: usize) -> Self {
        Self {
            section: Section::Code,
            block,
            index,
        }
    }

    pub const fn data(block: usize, index: usize) -> Self {
        Self {
            section: Section::Data,
            block,
            index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelDef {
    #[serde(flatten)]
    pub target: Element,
    #[serde(default)]
    pub span: Option<SourceSpan>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeWord {
    pub cycle: XlatCycle,
    #[serde(default)]
    pub span: Option<SourceSpan>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CodeBlock {
    #[serde(default)]
    pub offset: Option<Word>,
    pub words: Vec<CodeWord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    /// Rotate left by the right operand
    Rotl,
    /// Rotate right by the right operand
    Rotr,
    /// Tritwise combine, the machine's `opr`
    Crazy,
}

/// Value of a data word
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataExpr {
    Literal(Word),
    /// Address of a labelled element plus `offset`, minus one for the
    /// increment that follows every jump and `movd`.
    Label {
        name: String,
        #[serde(default)]
        offset: i64,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<DataExpr>,
        rhs: Box<DataExpr>,
    },
    /// Reserved, but the contents are irrelevant
    DontCare,
    /// Not reserved at all; only occupies a position in its block
    Unused,
}

impl DataExpr {
    fn labels<'a>(&'a self, found: &mut Vec<&'a str>) {
        match self {
            DataExpr::Label { name, .. } => found.push(name),
            DataExpr::Binary { lhs, rhs, .. } => {
                lhs.labels(found);
                rhs.labels(found);
            }
            DataExpr::Literal(_) | DataExpr::DontCare | DataExpr::Unused => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataWord {
    pub expr: DataExpr,
    #[serde(default)]
    pub span: Option<SourceSpan>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DataBlock {
    #[serde(default)]
    pub offset: Option<Word>,
    pub words: Vec<DataWord>,
}

/// A complete program with resolved labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    #[serde(default)]
    pub code: Vec<CodeBlock>,
    #[serde(default)]
    pub data: Vec<DataBlock>,
    #[serde(default)]
    pub labels: BTreeMap<String, LabelDef>,
    #[serde(default = "default_entry")]
    pub entry: String,
}

impl Program {
    pub fn from_json(input: &str) -> Result<Self> {
        let program: Program = serde_json::from_str(input)?;
        program.validate()?;
        Ok(program)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check labels, block offsets and the entry point.
    pub fn validate(&self) -> Result<()> {
        for (name, label) in &self.labels {
            if !self.contains(label.target) {
                return Err(CompileError::DanglingLabel {
                    label: name.clone(),
                    target: label.target,
                });
            }
        }

        let offsets = self
            .code
            .iter()
            .map(|b| b.offset)
            .chain(self.data.iter().map(|b| b.offset));
        if let Some(offset) = offsets.flatten().find(|&o| o > C2) {
            return Err(CompileError::InvalidOffset(offset));
        }

        for word in self.data.iter().flat_map(|b| &b.words) {
            if let DataExpr::Literal(value) = word.expr {
                if value > C2 {
                    return Err(CompileError::LiteralOutOfRange(value));
                }
            }

            let mut names = Vec::new();
            word.expr.labels(&mut names);
            if let Some(name) = names.into_iter().find(|n| !self.labels.contains_key(*n)) {
                return Err(CompileError::UnknownLabel(name.to_string()));
            }
        }

        self.entry_point().map(|_| ())
    }

    /// The data element the entry label points to.
    pub fn entry_point(&self) -> Result<Element> {
        match self.labels.get(&self.entry) {
            Some(label) if label.target.section == Section::Data => Ok(label.target),
            _ => Err(CompileError::MissingEntry(self.entry.clone())),
        }
    }

    pub fn label(&self, name: &str) -> Result<&LabelDef> {
        self.labels
            .get(name)
            .ok_or_else(|| CompileError::UnknownLabel(name.to_string()))
    }

    pub fn contains(&self, element: Element) -> bool {
        match element.section {
            Section::Code => self
                .code
                .get(element.block)
                .is_some_and(|b| element.index < b.words.len()),
            Section::Data => self
                .data
                .get(element.block)
                .is_some_and(|b| element.index < b.words.len()),
        }
    }

    pub fn data_word(&self, element: Element) -> Option<&DataWord> {
        self.data.get(element.block)?.words.get(element.index)
    }

    pub fn code_word(&self, element: Element) -> Option<&CodeWord> {
        self.code.get(element.block)?.words.get(element.index)
    }

    /// Labels that point at unused data words.
    pub fn labels_on_unused_words(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().filter_map(|(name, label)| {
            matches!(
                self.data_word(label.target),
                Some(DataWord {
                    expr: DataExpr::Unused,
                    ..
                })
            )
            .then_some(name.as_str())
        })
    }
}
