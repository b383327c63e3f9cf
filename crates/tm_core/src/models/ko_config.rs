//! Bracket/group configuration for categories with a group phase
//! followed by a single-elimination phase.
//!
//! The configuration round-trips through a compact legacy string encoding
//! (`"S;1;2:4"` = knockouts start at the semifinals, second-placed players
//! survive the group phase, 2 groups of 4) which is what gets persisted in
//! the category's parameter set.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TournamentError};

/// Bracket level at which the elimination phase starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KoStart {
    Final,
    Semi,
    Quarter,
    L16,
}

impl KoStart {
    /// Number of players entering the elimination phase at this level.
    pub fn capacity(self) -> usize {
        match self {
            KoStart::Final => 2,
            KoStart::Semi => 4,
            KoStart::Quarter => 8,
            KoStart::L16 => 16,
        }
    }

    /// Number of elimination rounds down to (and including) the final.
    pub fn rounds(self) -> u32 {
        match self {
            KoStart::Final => 1,
            KoStart::Semi => 2,
            KoStart::Quarter => 3,
            KoStart::L16 => 4,
        }
    }

    fn code(self) -> &'static str {
        match self {
            KoStart::Final => "F",
            KoStart::Semi => "S",
            KoStart::Quarter => "Q",
            KoStart::L16 => "L16",
        }
    }
}

/// "`count` groups of `size` members each".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDef {
    pub count: u32,
    pub size: u32,
}

impl GroupDef {
    pub fn new(count: u32, size: u32) -> Self {
        GroupDef { count, size }
    }

    /// Round-robin matches played across all groups of this definition.
    pub fn num_matches(&self) -> u32 {
        self.count * self.size * (self.size - 1) / 2
    }

    /// Rounds needed for a full round robin within one group.
    pub fn num_rounds(&self) -> u32 {
        if self.size % 2 == 0 {
            self.size - 1
        } else {
            self.size
        }
    }
}

/// Group phase + elimination phase configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KoConfig {
    pub start_level: KoStart,
    pub second_survives: bool,
    pub groups: Vec<GroupDef>,
}

impl KoConfig {
    pub fn new(start_level: KoStart, second_survives: bool, groups: Vec<GroupDef>) -> Self {
        KoConfig {
            start_level,
            second_survives,
            groups,
        }
    }

    pub fn num_groups(&self) -> u32 {
        self.groups.iter().map(|g| g.count).sum()
    }

    /// Total number of players the groups can hold.
    pub fn capacity(&self) -> usize {
        self.groups
            .iter()
            .map(|g| (g.count * g.size) as usize)
            .sum()
    }

    pub fn num_group_matches(&self) -> u32 {
        self.groups.iter().map(|g| g.num_matches()).sum()
    }

    /// Number of group-phase rounds; groups of different sizes play
    /// different numbers of rounds, the phase lasts as long as the
    /// largest group needs.
    pub fn num_group_rounds(&self) -> u32 {
        self.groups.iter().map(|g| g.num_rounds()).max().unwrap_or(0)
    }

    /// Players leaving the group phase for the elimination phase.
    pub fn num_qualifiers(&self) -> usize {
        let per_group = if self.second_survives { 2 } else { 1 };
        self.num_groups() as usize * per_group
    }

    /// Matches of the elimination phase, excluding an optional match for
    /// 3rd place.
    pub fn num_ko_matches(&self) -> u32 {
        self.start_level.capacity() as u32 - 1
    }

    pub fn num_matches(&self) -> u32 {
        self.num_group_matches() + self.num_ko_matches()
    }

    /// A configuration is valid for `opponent_count` players iff the
    /// groups hold exactly that many players, every group has at least
    /// three members and the number of qualifiers matches the capacity
    /// of the chosen elimination start level.
    pub fn is_valid(&self, opponent_count: usize) -> bool {
        if self.groups.is_empty() {
            return false;
        }
        if self.groups.iter().any(|g| g.count == 0 || g.size < 3) {
            return false;
        }
        if self.capacity() != opponent_count {
            return false;
        }
        self.num_qualifiers() == self.start_level.capacity()
    }
}

impl fmt::Display for KoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{};{}",
            self.start_level.code(),
            if self.second_survives { 1 } else { 0 }
        )?;
        for g in &self.groups {
            write!(f, ";{}:{}", g.count, g.size)?;
        }
        Ok(())
    }
}

impl FromStr for KoConfig {
    type Err = TournamentError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split(';');

        let start_level = match parts.next() {
            Some("F") => KoStart::Final,
            Some("S") => KoStart::Semi,
            Some("Q") => KoStart::Quarter,
            Some("L16") => KoStart::L16,
            _ => return Err(TournamentError::InvalidKoConfig),
        };

        let second_survives = match parts.next() {
            Some("0") => false,
            Some("1") => true,
            _ => return Err(TournamentError::InvalidKoConfig),
        };

        let mut groups = Vec::new();
        for part in parts {
            let (count, size) = part
                .split_once(':')
                .ok_or(TournamentError::InvalidKoConfig)?;
            let count: u32 = count
                .parse()
                .map_err(|_| TournamentError::InvalidKoConfig)?;
            let size: u32 = size.parse().map_err(|_| TournamentError::InvalidKoConfig)?;
            groups.push(GroupDef::new(count, size));
        }

        Ok(KoConfig::new(start_level, second_survives, groups))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_round_trip() {
        let cfg = KoConfig::new(
            KoStart::Semi,
            true,
            vec![GroupDef::new(2, 4), GroupDef::new(1, 5)],
        );
        let encoded = cfg.to_string();
        assert_eq!(encoded, "S;1;2:4;1:5");

        let decoded: KoConfig = encoded.parse().unwrap();
        assert_eq!(decoded, cfg);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<KoConfig>().is_err());
        assert!("X;1;2:4".parse::<KoConfig>().is_err());
        assert!("S;2;2:4".parse::<KoConfig>().is_err());
        assert!("S;1;2x4".parse::<KoConfig>().is_err());
        assert!("S;1;a:4".parse::<KoConfig>().is_err());
    }

    #[test]
    fn test_derived_counts() {
        // 2 groups of 4: 2 * 6 group matches, 3 group rounds
        let cfg = KoConfig::new(KoStart::Semi, true, vec![GroupDef::new(2, 4)]);
        assert_eq!(cfg.num_groups(), 2);
        assert_eq!(cfg.num_group_matches(), 12);
        assert_eq!(cfg.num_group_rounds(), 3);
        assert_eq!(cfg.num_qualifiers(), 4);
        assert_eq!(cfg.num_ko_matches(), 3);
        assert_eq!(cfg.num_matches(), 15);
    }

    #[test]
    fn test_mixed_group_sizes_use_longest_round_count() {
        let cfg = KoConfig::new(
            KoStart::Quarter,
            true,
            vec![GroupDef::new(3, 4), GroupDef::new(1, 5)],
        );
        // group of 5 plays 5 rounds, groups of 4 play 3
        assert_eq!(cfg.num_group_rounds(), 5);
        assert_eq!(cfg.num_qualifiers(), 8);
        assert!(cfg.is_valid(17));
    }

    #[test]
    fn test_validity() {
        // 2 groups of 4 with second survives -> 4 qualifiers -> semifinals
        let cfg = KoConfig::new(KoStart::Semi, true, vec![GroupDef::new(2, 4)]);
        assert!(cfg.is_valid(8));
        assert!(!cfg.is_valid(7));

        // only winners survive -> 2 qualifiers -> must start at the final
        let cfg = KoConfig::new(KoStart::Final, false, vec![GroupDef::new(2, 4)]);
        assert!(cfg.is_valid(8));
        let cfg = KoConfig::new(KoStart::Semi, false, vec![GroupDef::new(2, 4)]);
        assert!(!cfg.is_valid(8));

        // groups of less than three are never allowed
        let cfg = KoConfig::new(KoStart::Final, false, vec![GroupDef::new(2, 2)]);
        assert!(!cfg.is_valid(4));

        // no groups at all
        let cfg = KoConfig::new(KoStart::Final, false, vec![]);
        assert!(!cfg.is_valid(0));
    }
}
