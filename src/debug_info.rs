//! Debugger side file
//!
//! A plain-text file with one `:SECTION:` header per block of lines, read by
//! debuggers to map machine addresses back to source positions.

use std::io::Write;

use sha2::{Digest, Sha256};
use trit_vm::Word;

use crate::{
    driver::CompiledProgram,
    layout::CellUsage,
    program::{Program, Section, SourceSpan},
    Result,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEntry {
    pub name: String,
    pub section: Section,
    pub address: Word,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePosition {
    pub address: Word,
    pub section: Section,
    pub span: Option<SourceSpan>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugInfo {
    pub labels: Vec<LabelEntry>,
    pub positions: Vec<SourcePosition>,
    pub steps_until_entry: usize,
    pub source_file: String,
    pub output_file: String,
    pub output_sha256: String,
}

impl DebugInfo {
    pub fn new(
        program: &Program,
        compiled: &CompiledProgram,
        source_file: impl Into<String>,
        output_file: impl Into<String>,
    ) -> Self {
        let labels = program
            .labels
            .iter()
            .filter_map(|(name, label)| {
                Some(LabelEntry {
                    name: name.clone(),
                    section: label.target.section,
                    address: compiled.addresses.get(label.target)?,
                })
            })
            .collect();

        let positions = compiled
            .layout
            .cells
            .iter()
            .enumerate()
            .filter_map(|(address, cell)| {
                let section = match cell.usage {
                    CellUsage::Code | CellUsage::PreinitializedCode => Section::Code,
                    CellUsage::Data | CellUsage::ReservedData => Section::Data,
                    CellUsage::ReservedCode | CellUsage::Unused => return None,
                };
                Some(SourcePosition {
                    address: address as Word,
                    section,
                    span: cell.span,
                })
            })
            .collect();

        Self {
            labels,
            positions,
            steps_until_entry: compiled.steps_until_entry,
            source_file: source_file.into(),
            output_file: output_file.into(),
            output_sha256: hex::encode(Sha256::digest(&compiled.bytes)),
        }
    }

    pub fn write(&self, mut out: impl Write) -> Result<()> {
        writeln!(out, ":LABELS:")?;
        for label in &self.labels {
            writeln!(out, "{}: {} {}", label.name, label.section, label.address)?;
        }

        writeln!(out, ":SOURCEPOSITIONS:")?;
        for position in &self.positions {
            match position.span {
                Some(span) => writeln!(out, "{}: {} {}", position.address, position.section, span)?,
                None => writeln!(out, "{}: {}", position.address, position.section)?,
            }
        }

        writeln!(out, ":EXECUTION_STEPS_UNTIL_ENTRY_POINT:")?;
        writeln!(out, "{}", self.steps_until_entry)?;
        writeln!(out, ":SOURCE_FILE:")?;
        writeln!(out, "{}", self.source_file)?;
        writeln!(out, ":MALBOLGE_FILE:")?;
        writeln!(out, "{}", self.output_file)?;
        writeln!(out, ":MALBOLGE_SHA256:")?;
        writeln!(out, "{}", self.output_sha256)?;
        Ok(())
    }

    pub fn to_text(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format() {
        let info = DebugInfo {
            labels: vec![LabelEntry {
                name: "ENTRY".into(),
                section: Section::Data,
                address: 50000,
            }],
            positions: vec![
                SourcePosition {
                    address: 40000,
                    section: Section::Code,
                    span: Some(SourceSpan {
                        first_line: 3,
                        first_column: 5,
                        last_line: 3,
                        last_column: 9,
                    }),
                },
                SourcePosition {
                    address: 50000,
                    section: Section::Data,
                    span: None,
                },
            ],
            steps_until_entry: 1234,
            source_file: "prog.json".into(),
            output_file: "prog.mb".into(),
            output_sha256: "00".into(),
        };

        assert_eq!(
            info.to_text().unwrap(),
            ":LABELS:\n\
             ENTRY: DATA 50000\n\
             :SOURCEPOSITIONS:\n\
             40000: CODE 3:5 - 3:9\n\
             50000: DATA\n\
             :EXECUTION_STEPS_UNTIL_ENTRY_POINT:\n\
             1234\n\
             :SOURCE_FILE:\n\
             prog.json\n\
             :MALBOLGE_FILE:\n\
             prog.mb\n\
             :MALBOLGE_SHA256:\n\
             00\n"
        );
    }
}
