//! Per-cell initialization
//!
//! Writing one memory cell takes three phases: point the destination cell
//! (module 0, cell 12) just below the target address, build the accumulator
//! value that combines the cell's background value into the wanted one, then
//! move through the destination cell and combine.

use trit_vm::{
    constants::{C0, C1, C2},
    Mnemonic::{self, MovD, Nop, Opr, Rot},
    Word,
};

use crate::{
    bootstrap::background_value,
    emitter::Emitter,
    planner::{plan_constant, ConstantPlan},
    state::{aux, hub, DataPointer, Location},
    Result, SynthError,
};

/// The destination pointer is rebuilt when it would have to cross this
/// boundary (3^6)
const CARRY_BOUNDARY: Word = 729;

/// Distance covered by one cheap increment of the destination pointer
const INCREMENT: Word = 9;

/// Auxiliary module whose work cell is used to build `value`.
pub fn module_for(value: Word, last_preinitialized: Word) -> usize {
    if value <= 161 {
        3
    } else if value <= last_preinitialized {
        1
    } else {
        2
    }
}

/// Carry level of adding nine to `old`: how many of the 27, 81 and 243
/// buckets the sum crosses. Crossing a 729 bucket is not supported.
pub fn carry_level(old: Word) -> Result<usize> {
    let new = old + INCREMENT;
    let crosses = |bucket: Word| new / bucket > old / bucket;

    if !crosses(27) {
        return Ok(0);
    }
    if !crosses(81) {
        return Ok(1);
    }
    if !crosses(243) {
        return Ok(2);
    }
    if !crosses(CARRY_BOUNDARY) {
        return Ok(3);
    }
    Err(SynthError::Inconsistency(format!(
        "increment of destination {old} needs carry level 4"
    )))
}

impl Emitter {
    /// Move to `at` and emit `mnemonic` there.
    fn apply_at(&mut self, at: Location, mnemonic: Mnemonic) -> Result<()> {
        self.set_pointer(at)?;
        self.emit(mnemonic)
    }

    fn module_value(&self, at: Location) -> Word {
        self.state().cell(at).map(|c| c.value).unwrap_or_default()
    }

    /// Load `plan.value` into the accumulator, building it in the work cell
    /// of `module` unless it is one of the free constants.
    pub fn load_constant(&mut self, plan: ConstantPlan, module: usize) -> Result<()> {
        let constant = plan.value;
        let ones = Location::new(1, aux::ONES);
        let dual = Location::new(1, aux::DUAL);

        match constant {
            C1 => self.apply_at(ones, Rot)?,
            C2 => self.apply_at(Location::new(1, aux::TWOS), Rot)?,
            C0 => self.apply_at(hub::ZERO, Rot)?,
            v if v == C2 - 1 => {
                self.apply_at(hub::ZERO, Rot)?;
                self.apply_at(dual, Opr)?;
            }
            v if v == C2 - 2 => {
                self.apply_at(ones, Rot)?;
                self.apply_at(dual, Opr)?;
            }
            _ => self.build_in_work_cell(plan, module)?,
        }

        let accumulator = self.state().accumulator;
        if accumulator != constant {
            return Err(SynthError::Inconsistency(format!(
                "loaded {accumulator} instead of {constant}"
            )));
        }
        Ok(())
    }

    /// Combine the work cell with C2 (the accumulator ends up holding the
    /// result).
    fn combine_work_with_twos(&mut self, module: usize) -> Result<()> {
        self.apply_at(Location::new(module, aux::TWOS), Rot)?;
        self.apply_at(Location::new(module, aux::WORK), Opr)
    }

    fn build_in_work_cell(&mut self, plan: ConstantPlan, module: usize) -> Result<()> {
        let work = Location::new(module, aux::WORK);

        if plan.value == self.module_value(work) && plan.rotations == 0 {
            // combining with C2 twice is the identity and reloads the value
            self.combine_work_with_twos(module)?;
            return self.combine_work_with_twos(module);
        }

        let mut c2_outstanding = plan.c2_first;
        let mut rotations = plan.rotations;
        let mut target = plan.value;

        while rotations > 10 {
            self.apply_at(work, Rot)?;
            rotations -= 1;
        }
        for _ in rotations..10 {
            target = trit_vm::rotate_right(target);
        }

        for i in (10 - rotations)..=10 {
            let mut cell = self.module_value(work);
            if c2_outstanding {
                cell = trit_vm::combine(C2, cell);
            }
            let have = cell % 3;
            let want = target % 3;
            target = trit_vm::rotate_right(target);

            // which constant fixes this trit: Some(true) for 0, Some(false) for C1
            let fix_with_zero = match (have, want) {
                (0, 1) | (0, 2) | (1, 2) | (2, 1) => Some(false),
                (1, 0) | (2, 0) => Some(true),
                _ => None,
            };

            let mut c2_at_beginning = false;
            if let Some(with_zero) = fix_with_zero {
                c2_at_beginning = match (have, want) {
                    (0, 1) | (2, 0) => true,
                    (2, 1) | (1, 2) => c2_outstanding,
                    _ => false,
                };
                if c2_at_beginning {
                    c2_outstanding = !c2_outstanding;
                }
                if c2_outstanding {
                    self.combine_work_with_twos(module)?;
                    c2_outstanding = false;
                }
                let source = if with_zero { aux::ZERO } else { aux::ONES };
                self.apply_at(Location::new(module, source), Rot)?;
                self.apply_at(Location::new(module, aux::DUAL), Opr)?;
                self.apply_at(work, Opr)?;
            }

            if have != want && !c2_at_beginning {
                c2_outstanding = true;
            }
            if i == 10 {
                break;
            }
            self.apply_at(work, Rot)?;
        }

        if c2_outstanding {
            self.combine_work_with_twos(module)?;
        }
        Ok(())
    }

    /// Add nine to the destination cell with tritwise carries.
    pub fn increment_destination_by_nine(&mut self) -> Result<()> {
        let old = self.state().destination();
        let level = carry_level(old)?;

        self.apply_at(hub::ONES, Rot)?;
        self.apply_at(hub::SCRATCH, Opr)?;
        self.apply_at(hub::TWOS, Rot)?;
        self.apply_at(hub::DESTINATION, Opr)?;
        self.apply_at(hub::SCRATCH, Opr)?;
        self.apply_at(hub::carry(level), Opr)?;
        self.apply_at(hub::DESTINATION, Opr)?;

        let new = self.state().destination();
        if new != old + INCREMENT {
            return Err(SynthError::Inconsistency(format!(
                "destination increment produced {new} from {old}"
            )));
        }
        Ok(())
    }

    /// Make the destination cell hold `position - 1`, or a value less than
    /// nine below it.
    fn aim_destination(&mut self, position: Word) -> Result<()> {
        let last = self.state().last_preinitialized;
        let current = self.state().destination();
        let target = position - 1;
        let module = module_for(target, last);

        let out_of_reach = current + 1 > position
            || current + 1 + 2 * INCREMENT <= position
            || current / CARRY_BOUNDARY < (current + INCREMENT) / CARRY_BOUNDARY;

        if out_of_reach {
            let plan = match plan_constant(current, target, self.state().work_value(module)) {
                Some(plan) => plan,
                None => {
                    // force the destination to a value every target is reachable from
                    self.apply_at(Location::new(1, aux::ONES), Rot)?;
                    self.apply_at(hub::DESTINATION, Opr)?;
                    self.apply_at(hub::DESTINATION, Opr)?;
                    plan_constant(
                        self.state().destination(),
                        target,
                        self.state().work_value(module),
                    )
                    .ok_or_else(|| {
                        SynthError::Inconsistency(format!(
                            "no plan to aim the destination at {target}"
                        ))
                    })?
                }
            };
            self.load_constant(plan, module)?;
            self.apply_at(hub::DESTINATION, Opr)?;
        } else if current + 1 + INCREMENT <= position {
            self.increment_destination_by_nine()?;
        }

        let aimed = self.state().destination();
        if aimed >= position || aimed + INCREMENT < position {
            return Err(SynthError::Inconsistency(format!(
                "destination {aimed} does not reach {position}"
            )));
        }
        Ok(())
    }

    /// Move through the destination cell into raw memory and walk to
    /// `position`.
    fn walk_to(&mut self, position: Word) -> Result<()> {
        self.apply_at(hub::DESTINATION, MovD)?;
        loop {
            match self.state().pointer {
                DataPointer::Raw(address) if address == position => return Ok(()),
                DataPointer::Raw(_) => self.emit(Nop)?,
                DataPointer::Module(at) => {
                    return Err(SynthError::Addressing(format!(
                        "walk to {position} ended in module {}",
                        at.module
                    )))
                }
            }
        }
    }

    /// Emit the code that turns the background value at `position` into
    /// `value`.
    pub fn init_cell(&mut self, position: Word, value: Word) -> Result<()> {
        let last = self.state().last_preinitialized;
        if position <= last {
            return Err(SynthError::InvalidRequest(format!(
                "cell {position} lies in the preinitialized region"
            )));
        }
        if value > C2 {
            return Err(SynthError::InvalidRequest(format!(
                "value {value} for cell {position} is not a word"
            )));
        }

        let mut old = background_value(position, last);
        if old == value {
            return Ok(());
        }

        self.aim_destination(position)?;

        let module = module_for(value, last);
        let plan = match plan_constant(old, value, self.state().work_value(module)) {
            Some(plan) => plan,
            None => {
                // combining 0 into either background value yields C1
                self.apply_at(hub::ZERO, Rot)?;
                self.walk_to(position)?;
                self.emit(Opr)?;
                old = C1;
                plan_constant(old, value, self.state().work_value(module)).ok_or_else(|| {
                    SynthError::Inconsistency(format!("no plan to write {value} over {old}"))
                })?
            }
        };

        self.load_constant(plan, module)?;
        self.walk_to(position)?;
        self.emit(Opr)
    }

    /// Leave the data pointer on `entry`, ready for the final jump.
    pub fn jump_to_entry(&mut self, entry: Word) -> Result<()> {
        let last = self.state().last_preinitialized;
        if entry <= last {
            return Err(SynthError::InvalidRequest(format!(
                "entry point {entry} lies in the preinitialized region"
            )));
        }
        self.aim_destination(entry)?;
        self.walk_to(entry)
    }
}
