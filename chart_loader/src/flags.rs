use std::ops::{BitOr, BitOrAssign};

/// Authoring flags as written by a source format, before note type resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RawNoteFlags(u16);

impl RawNoteFlags {
    pub const NONE: RawNoteFlags = RawNoteFlags(0);
    /// Flips the natural HOPO state (.chart `N 5`).
    pub const FORCED: RawNoteFlags = RawNoteFlags(1 << 0);
    pub const FORCED_HOPO: RawNoteFlags = RawNoteFlags(1 << 1);
    pub const FORCED_STRUM: RawNoteFlags = RawNoteFlags(1 << 2);
    pub const TAP: RawNoteFlags = RawNoteFlags(1 << 3);
    pub const INSTRUMENT_PLUS: RawNoteFlags = RawNoteFlags(1 << 4);
    pub const CYMBAL: RawNoteFlags = RawNoteFlags(1 << 5);
    pub const ACCENT: RawNoteFlags = RawNoteFlags(1 << 6);
    pub const GHOST: RawNoteFlags = RawNoteFlags(1 << 7);

    pub const fn contains(self, other: RawNoteFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: RawNoteFlags) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: RawNoteFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: RawNoteFlags) {
        self.0 &= !other.0;
    }
}

impl BitOr for RawNoteFlags {
    type Output = RawNoteFlags;

    fn bitor(self, rhs: RawNoteFlags) -> RawNoteFlags {
        RawNoteFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for RawNoteFlags {
    fn bitor_assign(&mut self, rhs: RawNoteFlags) {
        self.0 |= rhs.0;
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct FlagPriority {
    pub(crate) flag: RawNoteFlags,
    /// Present on a note, these keep `flag` from being added.
    pub(crate) blocked_by: RawNoteFlags,
    /// Adding `flag` clears these.
    pub(crate) removes: RawNoteFlags,
}

impl FlagPriority {
    const fn new(flag: RawNoteFlags, blocked_by: RawNoteFlags, removes: RawNoteFlags) -> Self {
        Self {
            flag,
            blocked_by,
            removes,
        }
    }

    pub(crate) fn try_apply(&self, flags: &mut RawNoteFlags) -> bool {
        if flags.intersects(self.blocked_by) {
            return false;
        }
        flags.insert(self.flag);
        flags.remove(self.removes);
        true
    }

    pub(crate) fn is_valid(&self, flags: RawNoteFlags) -> bool {
        if !flags.contains(self.flag) {
            return true;
        }
        !flags.intersects(self.blocked_by) && !flags.intersects(self.removes)
    }
}

pub(crate) const NOTE_FLAG_PRIORITIES: [FlagPriority; 6] = [
    FlagPriority::new(RawNoteFlags::FORCED, RawNoteFlags::TAP, RawNoteFlags::NONE),
    FlagPriority::new(RawNoteFlags::TAP, RawNoteFlags::NONE, RawNoteFlags::FORCED),
    FlagPriority::new(RawNoteFlags::INSTRUMENT_PLUS, RawNoteFlags::NONE, RawNoteFlags::NONE),
    FlagPriority::new(RawNoteFlags::CYMBAL, RawNoteFlags::NONE, RawNoteFlags::NONE),
    FlagPriority::new(RawNoteFlags::ACCENT, RawNoteFlags::NONE, RawNoteFlags::GHOST),
    FlagPriority::new(RawNoteFlags::GHOST, RawNoteFlags::ACCENT, RawNoteFlags::NONE),
];

fn priority_of(flag: RawNoteFlags) -> Option<&'static FlagPriority> {
    NOTE_FLAG_PRIORITIES.iter().find(|p| p.flag == flag)
}

/// Adds `flag` to `flags` honoring the priority table. Returns false when blocked.
pub(crate) fn try_apply_flag(flags: &mut RawNoteFlags, flag: RawNoteFlags) -> bool {
    match priority_of(flag) {
        Some(priority) => priority.try_apply(flags),
        None => {
            flags.insert(flag);
            true
        }
    }
}

pub(crate) fn are_flags_valid(flags: RawNoteFlags) -> bool {
    NOTE_FLAG_PRIORITIES.iter().all(|p| p.is_valid(flags))
}

pub(crate) fn are_flags_valid_for_all(notes: &[RawNoteFlags]) -> bool {
    notes.iter().all(|&flags| are_flags_valid(flags))
}

/// Resolves an unordered flag set into the set the priority table allows.
///
/// Application order does not matter for the table, so the flags are
/// applied in table order.
pub(crate) fn resolve_flags(flags: RawNoteFlags) -> RawNoteFlags {
    let mut out = RawNoteFlags::NONE;
    for priority in &NOTE_FLAG_PRIORITIES {
        if flags.contains(priority.flag) {
            priority.try_apply(&mut out);
        }
    }
    for extra in [RawNoteFlags::FORCED_HOPO, RawNoteFlags::FORCED_STRUM] {
        if flags.contains(extra) {
            out.insert(extra);
        }
    }
    if out != flags {
        log::debug!("note flags {flags:?} resolved to {out:?}");
    }
    out
}
