//! Fixed bootstrap image and the machine state it leaves behind
//!
//! The image is loaded verbatim at address 0. Executing it sets up four
//! constant-generation modules in low memory, leaves the accumulator and the
//! data pointer in a known state, and falls through into the generated code
//! that follows it. The layout below mirrors what the image builds.

use trit_vm::{
    constants::{C1, C2},
    Word,
};

/// Bootstrap code, already in position-dependent form for addresses `0..1433`.
#[rustfmt::skip]
pub const BOOTSTRAP_IMAGE: &[u8] = b"bP&A@?>=<;:9876543210/.-,+*)('&%$T\"!~}|;]yxwvutslUSRQ.yx+i)J9edF\
    b4`_^]\\yxwRQ)(TSRQ]m!G0KJIyxFvDa%_@?\"=<5:98765.-2+*/.-,+*)('&%$#\
    \"!~}|utyrqvutsrqjonmPkjihgfedc\\DDYAA\\>>Y;;V886L5322G//D,,G))>&&A\
    ##!7~5:{y7xvuu,10/.-,+*)('&%$#\"yb}|{zyxwvutmVqSohmOOjihafeHcEa`Y\
    AA\\[ZYRW:U7SLKP3NMLK-I,GFED&%%@?>=6;|9y70/4u210/o-n+k)\"!gg$#\"!x}\
    `{zyxZvYtsrqSoRmlkjLhKfedcEaD_^]\\>Z=XWVU7S6QPON0LKDI,GFEDCBA#?\"=\
    };438y6543s1r/o-&%*k('&%e#d!~}|^z]xwvuWsVqponPlOjihgIeHcba`B^A\\[\
    ZY;W:UTSR4PI2MLKJ,,AFE(&B;:?\"~<}{zz165v3s+*/pn,mk)jh&ge#db~a_{^\\\
    xwvoXsrqpRnmfkjMKg`_GG\\aDB^A?[><X;9U86R53ONM0KJC,+FEDC&A@?!!6||3\
    876w4-tr*/.-&+*)('&%$e\"!~}|utyxwvutWlkponmlOjchg`edGba`_XW\\?ZYRQ\
    VOT7RQPINML/JIHAFEDC&A@?>!<;{98yw5.-ss*/pn,+lj(!~ff{\"ca}`^z][wZX\
    tWUqTRnQOkNLhgfIdcFaZ_^A\\[Z<XW:U8SRQPOHML/JIHG*ED=%%:?>=~;:{876w\
    43210/(-,+*)('h%$d\"ca}|_z\\rqYYnsVTpoRPledLLafIGcbE`BXW??TY<:V97S\
    64P31M0.J-+G*(DCB%@?\"=<;|98765.3210p.-n+$)i'h%${\"!~}|{zyxwvuXVlk\
    pSQmlOjLbafIGcbE`BXW??TY<:V97S64P31M0.J-+G*(D'%A@?\"=<}:98y6543,1\
    r/.o,+*)j'&%eez!~a|^tsx[YutWUqjinQOkjMhJ`_dGEaDB^A?[><X;9U86R53O\
    20LKJ-HG*ED'BA@?>7~;:{y7x5.3210q.-n+*)jh&%$#\"c~}`{z]rwvutWrkpohm\
    PkjihafI^cba`_^A\\[>YXW:UTS5QP3NM0KJ-HGF?D'BA:?>=~;:z8765v32s0/.-\
    nl$#(ig%fd\"ca}|_]yrqvYWsVTpSQmPNjMKgJHdGEa`_B]\\?ZY<WVUTMR5PO20LK\
    .IHA))>CB%#?87}}49zx6wu3tr0qo-nl*ki'hf$ec!~}`{^yxwvotsrUponQlkMi\
    hKIe^]EEZ_B@\\?=Y<:V97S64P31M0.J-+GFE(C&A@?8=<;:{876w43s10qo-&%kk\
    \"'hf$ec!b`|_]y\\ZvYWsVTpSQmlkNiLgf_dcba`C^]\\?ZY;WV97SLK33HM0.J-+G\
    *(D'%A$\">!};|z8yw543t1r/(";

/// Accumulator value when the first generated instruction runs
pub const INITIAL_ACCUMULATOR: Word = 58328;

/// Data pointer when the first generated instruction runs: module 0, cell 8
pub const INITIAL_POINTER: (usize, usize) = (0, 8);

/// Initial value of the destination-pointer cell (module 0, cell 12)
pub const INITIAL_DESTINATION: Word = 68;

/// Initial value of the scratch cell (module 0, cell 6)
pub const INITIAL_SCRATCH: Word = C1;

/// Initial values of cell 3 in modules 1, 2 and 3
pub const INITIAL_WORK_VALUES: [Word; 3] = [126, 58688, 29495];

/// Carry cells of module 0 (cells 7 to 10), lowest carry level last
pub const CARRY_CELLS: [Word; 4] = [
    C2 - 2 * 9 - 2 * 27 - 2 * 81 - 2 * 243,
    C2 - 2 * 9 - 2 * 27 - 2 * 81,
    C2 - 2 * 9 - 2 * 27,
    C2 - 2 * 9,
];

/// Raw address reached by a move through raw cell 1
pub const LOW_LANDING: Word = 81;

/// A raw walk that reaches this address has re-entered module 0
pub const MODULE_ZERO_REENTRY: Word = 82;

/// Steps the initial jump skips before the first bootstrap instruction runs
pub const SKIPPED_STEPS: usize = 98;

/// Value of cells past the preinitialized region whose parity matches it
pub const PARITY_MATCH_VALUE: Word = 81;

/// Value of the remaining cells past the preinitialized region
pub const PARITY_MISMATCH_VALUE: Word = C1 - 81;

/// Value left in memory at `position` by the trailing marker and the fill rule.
pub fn background_value(position: Word, last_preinitialized: Word) -> Word {
    if position % 2 == last_preinitialized % 2 {
        PARITY_MATCH_VALUE
    } else {
        PARITY_MISMATCH_VALUE
    }
}
