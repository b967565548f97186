//! Per-sample, per-channel provenance flags.
//!
//! Flags are additive facts about a sample's history, not mutually exclusive
//! states: a sample that started life as an original observation and was later
//! repaired during jitter correction carries both `Original` and
//! `DejitteredTwitch`. A [`FlagSet`] only ever grows; no operation clears a
//! flag once it is set.

use serde::{Deserialize, Serialize};

/// A single provenance fact about a sample/channel pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorrectionFlag {
    /// Value as delivered by the recording device.
    Original,
    /// Value synthesized by interpolation (missing sample or resampler tick).
    InterpolatedMissing,
    /// Value repaired as part of a transient deviation that returned to baseline.
    DejitteredTwitch,
    /// Value repaired as part of a permanent reference shift.
    DejitteredJump,
    /// Value re-expressed relative to a reference channel.
    ReReferenced,
    /// Value relocated by segment randomization (permutation baselines).
    Randomized,
}

impl CorrectionFlag {
    const ALL: [CorrectionFlag; 6] = [
        CorrectionFlag::Original,
        CorrectionFlag::InterpolatedMissing,
        CorrectionFlag::DejitteredTwitch,
        CorrectionFlag::DejitteredJump,
        CorrectionFlag::ReReferenced,
        CorrectionFlag::Randomized,
    ];

    fn bit(self) -> u8 {
        match self {
            CorrectionFlag::Original => 1 << 0,
            CorrectionFlag::InterpolatedMissing => 1 << 1,
            CorrectionFlag::DejitteredTwitch => 1 << 2,
            CorrectionFlag::DejitteredJump => 1 << 3,
            CorrectionFlag::ReReferenced => 1 << 4,
            CorrectionFlag::Randomized => 1 << 5,
        }
    }
}

/// Accumulated set of [`CorrectionFlag`]s for one sample of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlagSet(u8);

impl FlagSet {
    /// No provenance recorded (absent samples).
    pub const EMPTY: FlagSet = FlagSet(0);

    /// The flag set of a freshly observed sample.
    pub fn original() -> Self {
        FlagSet(CorrectionFlag::Original.bit())
    }

    /// Record an additional fact. Flags accumulate; this never clears.
    pub fn insert(&mut self, flag: CorrectionFlag) {
        self.0 |= flag.bit();
    }

    /// Copy of `self` with `flag` added.
    pub fn with(mut self, flag: CorrectionFlag) -> Self {
        self.insert(flag);
        self
    }

    pub fn contains(&self, flag: CorrectionFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    /// True if the sample was repaired by jitter correction (twitch or jump).
    pub fn is_dejittered(&self) -> bool {
        self.contains(CorrectionFlag::DejitteredTwitch)
            || self.contains(CorrectionFlag::DejitteredJump)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterate over the flags present in this set.
    pub fn iter(&self) -> impl Iterator<Item = CorrectionFlag> + '_ {
        CorrectionFlag::ALL
            .into_iter()
            .filter(move |f| self.contains(*f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_accumulate() {
        let mut flags = FlagSet::original();
        assert!(flags.contains(CorrectionFlag::Original));
        assert!(!flags.is_dejittered());

        flags.insert(CorrectionFlag::DejitteredTwitch);
        assert!(flags.contains(CorrectionFlag::Original), "insert must not clear");
        assert!(flags.is_dejittered());
    }

    #[test]
    fn test_empty_set() {
        let flags = FlagSet::EMPTY;
        assert!(flags.is_empty());
        assert_eq!(flags.iter().count(), 0);
    }

    #[test]
    fn test_iter_roundtrip() {
        let flags = FlagSet::original()
            .with(CorrectionFlag::DejitteredJump)
            .with(CorrectionFlag::ReReferenced);

        let collected: Vec<_> = flags.iter().collect();
        assert_eq!(
            collected,
            vec![
                CorrectionFlag::Original,
                CorrectionFlag::DejitteredJump,
                CorrectionFlag::ReReferenced,
            ]
        );
    }
}
