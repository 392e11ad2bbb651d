//! Call frames: per-call argument and local slots.

/// Return address stored in the synthetic entry frame; returning through it
/// halts the machine instead of jumping.
pub const RETURN_SENTINEL: u64 = u64::MAX;

/// One activation record. Slots are native words; narrower values are
/// widened on store and truncated on use by the operand encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub return_addr: u64,
    args: Vec<u64>,
    locals: Vec<u64>,
}

impl Frame {
    pub fn new(return_addr: u64, args: Vec<u64>, num_locals: u8) -> Self {
        Self {
            return_addr,
            args,
            locals: vec![0; num_locals as usize],
        }
    }

    /// The frame the entry symbol runs in; its arguments are zeroed since
    /// nothing is on the stack before the first instruction.
    pub fn entry(num_args: u8, num_locals: u8) -> Self {
        Self::new(RETURN_SENTINEL, vec![0; num_args as usize], num_locals)
    }

    pub fn arg(&self, slot: u8) -> Option<u64> {
        self.args.get(slot as usize).copied()
    }

    pub fn local(&self, slot: u8) -> Option<u64> {
        self.locals.get(slot as usize).copied()
    }

    pub fn set_arg(&mut self, slot: u8, value: u64) -> bool {
        match self.args.get_mut(slot as usize) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    pub fn set_local(&mut self, slot: u8, value: u64) -> bool {
        match self.locals.get_mut(slot as usize) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }
}
