use std::fmt;

/// Link pack mode: how many bytes cross the link per slot.
///
/// The ordering matters: upscale moves right, downgrade moves left.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PackState {
    Idle,
    Pack1,
    Pack2,
    Pack4,
}

impl fmt::Display for PackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PackState::Idle => "IDLE",
            PackState::Pack1 => "1PACK",
            PackState::Pack2 => "2PACK",
            PackState::Pack4 => "4PACK",
        };
        f.write_str(s)
    }
}

impl PackState {
    /// Relative power weight of dwelling in this state for one cycle.
    pub fn power_weight(self) -> u64 {
        match self {
            PackState::Idle => 0,
            PackState::Pack1 => 1,
            PackState::Pack2 => 2,
            PackState::Pack4 => 4,
        }
    }
}
