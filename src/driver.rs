//! Budget search
//!
//! The size of the initialization code decides where the preinitialized
//! region ends, which in turn changes the layout and therefore the code.
//! The driver first compiles against the whole address space, then retries
//! from two thirds of that code size upwards until a layout and its
//! initialization code agree.

use init_synth::{synthesize, Diagnostics, SynthOptions, Synthesized};
use trit_vm::{constants::MEMORY_SIZE, Word};

use crate::{
    eval::Evaluator,
    layout::{Addresses, Layout, Sections},
    program::Program,
    CompileError, Result,
};

/// Added to the budget after every failed trial
pub const BUDGET_STEP: usize = 32;

#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    /// Skip the search and try the whole address space once
    pub fast: bool,
    pub diagnostics: Diagnostics,
}

/// A compiled program together with the layout it was built from
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    pub bytes: Vec<u8>,
    pub layout: Layout,
    pub addresses: Addresses,
    pub entry: Word,
    pub steps_until_entry: usize,
    /// First address after the initialization code
    pub init_code_end: usize,
}

impl CompiledProgram {
    pub fn last_preinitialized(&self) -> Word {
        self.layout.last_preinitialized
    }
}

pub fn compile(program: &Program, options: &CompileOptions) -> Result<CompiledProgram> {
    program.validate()?;
    for name in program.labels_on_unused_words() {
        tracing::warn!(label = name, "label points to an unused data word");
    }

    let sections = Sections::allocate(program)?;

    let baseline = sections.merge(MEMORY_SIZE).ok_or(CompileError::NoMemory)?;
    let baseline = trial(program, baseline, options.diagnostics)
        .inspect_err(|err| tracing::debug!(%err, "whole address space failed"))
        .ok();

    search(baseline, options.fast, |budget| {
        sections
            .merge(budget)
            .ok_or(CompileError::NoMemory)
            .and_then(|layout| trial(program, layout, Diagnostics::Silent))
    })
}

/// Try budgets from two thirds of the baseline code size upwards. The
/// baseline, built with the whole address space, is kept for when every
/// budget fails.
fn search<F>(
    baseline: Option<CompiledProgram>,
    fast: bool,
    mut attempt: F,
) -> Result<CompiledProgram>
where
    F: FnMut(usize) -> Result<CompiledProgram>,
{
    let mut budget = match &baseline {
        Some(compiled) => compiled.init_code_end * 2 / 3,
        None => MEMORY_SIZE * 2 / 3,
    };

    while budget < MEMORY_SIZE {
        if fast {
            budget = MEMORY_SIZE;
        }

        match attempt(budget) {
            Ok(compiled) => {
                tracing::info!(
                    budget,
                    last_preinitialized = compiled.last_preinitialized(),
                    steps = compiled.steps_until_entry,
                    "program compiled"
                );
                return Ok(compiled);
            }
            Err(err) => {
                tracing::debug!(budget, %err, "trial failed");
                budget += BUDGET_STEP;
            }
        }
    }

    match baseline {
        Some(compiled) => {
            tracing::info!(
                last_preinitialized = compiled.last_preinitialized(),
                steps = compiled.steps_until_entry,
                "using the layout of the whole address space"
            );
            Ok(compiled)
        }
        None => Err(CompileError::Exhausted),
    }
}

fn trial(program: &Program, layout: Layout, diagnostics: Diagnostics) -> Result<CompiledProgram> {
    let addresses = layout.addresses();
    let evaluator = Evaluator::new(program, &addresses, diagnostics);
    let image = evaluator.image(&layout).inspect_err(|err| {
        if diagnostics == Diagnostics::Report {
            tracing::warn!(%err, "memory image could not be built");
        }
    })?;

    let entry = addresses
        .get(program.entry_point()?)
        .ok_or_else(|| CompileError::UnplacedLabel(program.entry.clone()))?;

    let Synthesized {
        bytes,
        steps_until_entry,
        init_code_end,
    } = synthesize(&image, layout.last_preinitialized, entry, &SynthOptions { diagnostics })?;

    Ok(CompiledProgram {
        bytes,
        layout,
        addresses,
        entry,
        steps_until_entry,
        init_code_end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HALT_AT_40000: &str = r#"{
        "code": [{ "offset": 40000, "words": [{ "cycle": { "once": "halt" } }] }],
        "data": [{ "words": [{ "expr": { "label": { "name": "stop" } } }] }],
        "labels": {
            "stop": { "section": "code", "block": 0, "index": 0 },
            "ENTRY": { "section": "data", "block": 0, "index": 0 }
        }
    }"#;

    fn whole_space() -> CompiledProgram {
        let program = Program::from_json(HALT_AT_40000).unwrap();
        let sections = Sections::allocate(&program).unwrap();
        let layout = sections.merge(MEMORY_SIZE).unwrap();
        trial(&program, layout, Diagnostics::Silent).unwrap()
    }

    #[test]
    fn test_search_stops_at_first_success() {
        let baseline = whole_space();
        let expected = baseline.init_code_end * 2 / 3 + 2 * BUDGET_STEP;
        let mut tried = Vec::new();
        let compiled = search(Some(baseline.clone()), false, |budget| {
            tried.push(budget);
            if budget == expected {
                Ok(baseline.clone())
            } else {
                Err(CompileError::Exhausted)
            }
        })
        .unwrap();
        assert_eq!(compiled.bytes, baseline.bytes);
        assert_eq!(tried.len(), 3);
    }

    #[test]
    fn test_search_falls_back_to_whole_space() {
        let baseline = whole_space();
        let compiled =
            search(Some(baseline.clone()), false, |_| Err(CompileError::Exhausted)).unwrap();
        assert_eq!(compiled.bytes, baseline.bytes);
        assert_eq!(compiled.steps_until_entry, baseline.steps_until_entry);
    }

    #[test]
    fn test_search_without_baseline_is_exhausted() {
        let mut trials = 0;
        let result = search(None, false, |_| {
            trials += 1;
            Err(CompileError::Exhausted)
        });
        assert!(matches!(result, Err(CompileError::Exhausted)));
        assert_eq!(trials, (MEMORY_SIZE - MEMORY_SIZE * 2 / 3).div_ceil(BUDGET_STEP));
    }

    #[test]
    fn test_fast_search_tries_once() {
        let mut tried = Vec::new();
        let result = search(None, true, |budget| {
            tried.push(budget);
            Err(CompileError::Exhausted)
        });
        assert!(result.is_err());
        assert_eq!(tried, vec![MEMORY_SIZE]);
    }
}
