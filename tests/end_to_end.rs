use trit_forge::{
    compile, layout::CellUsage, CompileError, CompileOptions, DebugInfo, Element, Program,
};
use trit_vm::{Machine, Outcome};

const LIMIT: u64 = 10_000_000;

const HALT_AT_40000: &str = r#"{
    "code": [{ "offset": 40000, "words": [{ "cycle": { "once": "halt" } }] }],
    "data": [{ "words": [{ "expr": { "label": { "name": "stop" } } }] }],
    "labels": {
        "stop": { "section": "code", "block": 0, "index": 0 },
        "ENTRY": { "section": "data", "block": 0, "index": 0 }
    }
}"#;

const ECHO: &str = r#"{
    "code": [{
        "words": [
            { "cycle": { "once": "in" }, "span": { "first_line": 2, "first_column": 1, "last_line": 2, "last_column": 2 } },
            { "cycle": { "once": "out" } },
            { "cycle": { "once": "halt" } }
        ]
    }],
    "data": [{
        "words": [
            { "expr": { "label": { "name": "start" } } },
            { "expr": { "literal": 12345 } },
            { "expr": "dont_care" },
            { "expr": { "binary": { "op": "add", "lhs": { "literal": 58000 }, "rhs": { "literal": 2000 } } } },
            { "expr": { "literal": 0 } }
        ]
    }],
    "labels": {
        "start": { "section": "code", "block": 0, "index": 0 },
        "ENTRY": { "section": "data", "block": 0, "index": 0 }
    }
}"#;

fn data_address(compiled: &trit_forge::CompiledProgram, index: usize) -> usize {
    compiled.addresses.get(Element::data(0, index)).unwrap() as usize
}

#[test]
fn fixed_halt_runs_after_reported_steps() {
    let program = Program::from_json(HALT_AT_40000).unwrap();
    let compiled = compile(&program, &CompileOptions::default()).unwrap();

    assert_eq!(compiled.addresses.get(Element::code(0, 0)), Some(40000));
    assert!(compiled.init_code_end < compiled.last_preinitialized() as usize);
    assert_eq!(compiled.bytes.len(), compiled.last_preinitialized() as usize + 1);

    let mut machine = Machine::load(&compiled.bytes).unwrap();
    assert_eq!(machine.run(LIMIT), Outcome::Halted {
        steps: compiled.steps_until_entry as u64 + 1
    });
    assert_eq!(machine.registers().1, 40000);
}

#[test]
fn fast_mode_compiles_in_one_trial() {
    let program = Program::from_json(HALT_AT_40000).unwrap();
    let options = CompileOptions {
        fast: true,
        ..CompileOptions::default()
    };
    let fast = compile(&program, &options).unwrap();
    let searched = compile(&program, &CompileOptions::default()).unwrap();

    assert!(fast.bytes.len() >= searched.bytes.len());
    let mut machine = Machine::load(&fast.bytes).unwrap();
    assert!(matches!(machine.run(LIMIT), Outcome::Halted { .. }));
}

#[test]
fn preinitialized_code_echoes_input() {
    let program = Program::from_json(ECHO).unwrap();
    let compiled = compile(&program, &CompileOptions::default()).unwrap();

    let start = compiled.addresses.get(Element::code(0, 0)).unwrap() as usize;
    assert!(start < compiled.last_preinitialized() as usize);
    assert_eq!(compiled.layout.cells[start].usage, CellUsage::PreinitializedCode);

    let mut machine = Machine::load(&compiled.bytes).unwrap().with_input(b"A");
    assert!(matches!(machine.run(LIMIT), Outcome::Halted { .. }));
    assert_eq!(machine.output(), b"A");

    let memory = machine.memory();
    assert_eq!(memory[data_address(&compiled, 1)], 12345);
    assert_eq!(memory[data_address(&compiled, 3)], 951);
    assert_eq!(memory[data_address(&compiled, 4)], 0);
}

#[test]
fn entry_is_reached_after_reported_steps() {
    let program = Program::from_json(ECHO).unwrap();
    let compiled = compile(&program, &CompileOptions::default()).unwrap();
    let start = compiled.addresses.get(Element::code(0, 0)).unwrap();

    let mut machine = Machine::load(&compiled.bytes).unwrap();
    assert_eq!(machine.run_until(start, LIMIT), Outcome::Reached {
        steps: compiled.steps_until_entry as u64 + 1
    });
}

#[test]
fn halt_inside_bootstrap_area_is_rejected() {
    let program = Program::from_json(&HALT_AT_40000.replace("40000", "5")).unwrap();
    assert!(matches!(
        compile(&program, &CompileOptions::default()),
        Err(CompileError::Exhausted)
    ));
}

#[test]
fn entry_must_be_data() {
    let mut program = Program::from_json(HALT_AT_40000).unwrap();
    program.entry = "stop".into();
    assert!(matches!(
        compile(&program, &CompileOptions::default()),
        Err(CompileError::MissingEntry(_))
    ));
}

#[test]
fn debug_info_describes_layout() {
    let program = Program::from_json(ECHO).unwrap();
    let compiled = compile(&program, &CompileOptions::default()).unwrap();
    let start = compiled.addresses.get(Element::code(0, 0)).unwrap();

    let text = DebugInfo::new(&program, &compiled, "echo.json", "echo.mb")
        .to_text()
        .unwrap();

    assert!(text.starts_with(":LABELS:\n"));
    assert!(text.contains(&format!("start: CODE {start}\n")));
    assert!(text.contains(&format!("{start}: CODE 2:1 - 2:2\n")));
    assert!(text.contains(&format!(
        ":EXECUTION_STEPS_UNTIL_ENTRY_POINT:\n{}\n",
        compiled.steps_until_entry
    )));
    assert!(text.contains(":SOURCE_FILE:\necho.json\n:MALBOLGE_FILE:\necho.mb\n"));
}
