//! Pure bracket and group-match generation.
//!
//! No store or UI dependency: input is a seeded competitor list, output
//! is an ordered set of match blueprints with explicit forward links
//! ("winner of match X proceeds to match Y, slot A"). Byes for
//! non-power-of-two fields are resolved here, by forwarding the sole
//! occupant and dropping the unplayed match.

use crate::models::Side;

/// Occupant of a bracket match slot.
///
/// `Seed` is a 1-based position in the seeding list; `WinnerOf`/`LoserOf`
/// are indices into the generated match list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketSlot {
    Seed(usize),
    WinnerOf(usize),
    LoserOf(usize),
    Bye,
}

/// Blueprint of one bracket match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketMatch {
    /// 1-based round within the bracket.
    pub round: u32,
    /// 1-based match number within the round.
    pub match_num: u32,
    pub slot1: BracketSlot,
    pub slot2: BracketSlot,
    /// Target (match index, slot) the winner proceeds to.
    pub winner_to: Option<(usize, Side)>,
    /// Target the loser proceeds to (semifinals feeding a 3rd-place match).
    pub loser_to: Option<(usize, Side)>,
    /// Final placement of the winner/loser, on terminal matches only.
    pub winner_rank: Option<u32>,
    pub loser_rank: Option<u32>,
}

impl BracketMatch {
    fn slot(&self, side: Side) -> BracketSlot {
        match side {
            Side::Slot1 => self.slot1,
            Side::Slot2 => self.slot2,
        }
    }

    fn set_slot(&mut self, side: Side, value: BracketSlot) {
        match side {
            Side::Slot1 => self.slot1 = value,
            Side::Slot2 => self.slot2 = value,
        }
    }

    fn has_bye(&self) -> bool {
        self.slot1 == BracketSlot::Bye || self.slot2 == BracketSlot::Bye
    }
}

/// Standard bracket seeding order for a field of `size` (power of two):
/// the returned vector lists the seed occupying each first-round slot,
/// so that seeds 1 and 2 can only meet in the final.
fn seeding_order(size: usize) -> Vec<usize> {
    debug_assert!(size.is_power_of_two());
    let mut order = vec![1usize];
    while order.len() < size {
        let mirror = order.len() * 2 + 1;
        order = order
            .iter()
            .flat_map(|&s| [s, mirror - s])
            .collect();
    }
    order
}

/// Generates a single-elimination bracket for `seed_count` competitors
/// (1-based seeds), optionally with a placement match for the beaten
/// semifinalists. Matches are ordered round by round; all links point
/// forward. Panics for fields of fewer than two competitors.
pub fn single_elimination(seed_count: usize, third_place: bool) -> Vec<BracketMatch> {
    assert!(seed_count >= 2, "a bracket needs at least two competitors");

    let size = seed_count.next_power_of_two();
    let rounds = size.trailing_zeros();
    let order = seeding_order(size);

    // round r (1-based) has size >> r matches; offsets[r] is the index of
    // its first match in the flat list
    let mut offsets = vec![0usize; rounds as usize + 2];
    for r in 1..=rounds as usize {
        offsets[r + 1] = offsets[r] + (size >> r);
    }

    let mut matches: Vec<BracketMatch> = Vec::with_capacity(size);
    for r in 1..=rounds {
        let count = size >> r;
        for j in 0..count {
            let (slot1, slot2) = if r == 1 {
                let s1 = order[2 * j];
                let s2 = order[2 * j + 1];
                let to_slot = |s: usize| {
                    if s <= seed_count {
                        BracketSlot::Seed(s)
                    } else {
                        BracketSlot::Bye
                    }
                };
                (to_slot(s1), to_slot(s2))
            } else {
                let prev = offsets[r as usize - 1];
                (
                    BracketSlot::WinnerOf(prev + 2 * j),
                    BracketSlot::WinnerOf(prev + 2 * j + 1),
                )
            };

            let winner_to = if r < rounds {
                let side = if j % 2 == 0 { Side::Slot1 } else { Side::Slot2 };
                Some((offsets[r as usize + 1] + j / 2, side))
            } else {
                None
            };

            matches.push(BracketMatch {
                round: r,
                match_num: j as u32 + 1,
                slot1,
                slot2,
                winner_to,
                loser_to: None,
                winner_rank: if r == rounds { Some(1) } else { None },
                loser_rank: if r == rounds { Some(2) } else { None },
            });
        }
    }

    // placement of the beaten semifinalists
    if rounds >= 2 {
        let semi_base = offsets[rounds as usize - 1];
        if third_place {
            let tp_index = matches.len();
            matches.push(BracketMatch {
                round: rounds,
                match_num: 2,
                slot1: BracketSlot::LoserOf(semi_base),
                slot2: BracketSlot::LoserOf(semi_base + 1),
                winner_to: None,
                loser_to: None,
                winner_rank: Some(3),
                loser_rank: Some(4),
            });
            matches[semi_base].loser_to = Some((tp_index, Side::Slot1));
            matches[semi_base + 1].loser_to = Some((tp_index, Side::Slot2));
        } else {
            // both beaten semifinalists share rank 3
            matches[semi_base].loser_rank = Some(3);
            matches[semi_base + 1].loser_rank = Some(3);
        }
    }

    resolve_byes(matches)
}

/// Removes matches with a bye, forwarding the sole occupant, and remaps
/// all indices so the remaining matches stay contiguously numbered.
fn resolve_byes(mut matches: Vec<BracketMatch>) -> Vec<BracketMatch> {
    let mut removed = vec![false; matches.len()];

    loop {
        let Some(idx) = matches
            .iter()
            .enumerate()
            .find(|(i, m)| !removed[*i] && m.has_bye())
            .map(|(i, _)| i)
        else {
            break;
        };

        removed[idx] = true;
        let m = matches[idx].clone();
        let occupant = match (m.slot1, m.slot2) {
            (BracketSlot::Bye, other) => other,
            (other, _) => other,
        };

        // the occupant advances without playing
        if let Some((target, side)) = m.winner_to {
            matches[target].set_slot(side, occupant);
        } else if let Some(rank) = m.winner_rank {
            // terminal match decided by forfeit of the opposite slot:
            // hand the rank to the source of the occupant
            match occupant {
                BracketSlot::WinnerOf(src) => {
                    matches[src].winner_rank = Some(rank);
                    matches[src].winner_to = None;
                }
                BracketSlot::LoserOf(src) => {
                    matches[src].loser_rank = Some(rank);
                    matches[src].loser_to = None;
                }
                _ => {}
            }
        }

        // nobody loses a bye
        if let Some((target, side)) = m.loser_to {
            matches[target].set_slot(side, BracketSlot::Bye);
        }
    }

    // compact and remap indices
    let mut remap = vec![usize::MAX; matches.len()];
    let mut out: Vec<BracketMatch> = Vec::new();
    for (i, m) in matches.iter().enumerate() {
        if !removed[i] {
            remap[i] = out.len();
            out.push(m.clone());
        }
    }
    for m in &mut out {
        for slot in [Side::Slot1, Side::Slot2] {
            match m.slot(slot) {
                BracketSlot::WinnerOf(src) => m.set_slot(slot, BracketSlot::WinnerOf(remap[src])),
                BracketSlot::LoserOf(src) => m.set_slot(slot, BracketSlot::LoserOf(remap[src])),
                _ => {}
            }
        }
        if let Some((t, s)) = m.winner_to {
            m.winner_to = Some((remap[t], s));
        }
        if let Some((t, s)) = m.loser_to {
            m.loser_to = Some((remap[t], s));
        }
    }

    // contiguous match numbers per round
    let mut current_round = 0;
    let mut num = 0;
    for m in &mut out {
        if m.round != current_round {
            current_round = m.round;
            num = 0;
        }
        num += 1;
        m.match_num = num;
    }

    out
}

/// Round-robin pairings for a group of `member_count` competitors
/// (0-based indices), computed with the circle method: one list of
/// pairings per round, every competitor at most once per round, every
/// pairing exactly once overall. Odd groups sit one member out per round.
pub fn round_robin_rounds(member_count: usize) -> Vec<Vec<(usize, usize)>> {
    if member_count < 2 {
        return Vec::new();
    }

    let m = if member_count % 2 == 0 {
        member_count
    } else {
        member_count + 1 // phantom member = bye
    };
    let mut ring: Vec<usize> = (0..m).collect();
    let mut rounds = Vec::with_capacity(m - 1);

    for _ in 0..m - 1 {
        let mut pairings = Vec::with_capacity(m / 2);
        for i in 0..m / 2 {
            let a = ring[i];
            let b = ring[m - 1 - i];
            if a < member_count && b < member_count {
                pairings.push((a, b));
            }
        }
        rounds.push(pairings);
        ring[1..].rotate_right(1);
    }

    rounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn seeds_in_round_one(matches: &[BracketMatch]) -> Vec<usize> {
        matches
            .iter()
            .filter(|m| m.round == 1)
            .flat_map(|m| [m.slot1, m.slot2])
            .filter_map(|s| match s {
                BracketSlot::Seed(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_four_seeds_with_third_place() {
        let b = single_elimination(4, true);
        // 2 semis + final + 3rd place
        assert_eq!(b.len(), 4);

        // seeds 1 and 2 sit in different semifinals
        assert_eq!(b[0].slot1, BracketSlot::Seed(1));
        assert_eq!(b[0].slot2, BracketSlot::Seed(4));
        assert_eq!(b[1].slot1, BracketSlot::Seed(2));
        assert_eq!(b[1].slot2, BracketSlot::Seed(3));

        // winners meet in the final, losers in the 3rd-place match
        assert_eq!(b[0].winner_to, Some((2, Side::Slot1)));
        assert_eq!(b[1].winner_to, Some((2, Side::Slot2)));
        assert_eq!(b[0].loser_to, Some((3, Side::Slot1)));
        assert_eq!(b[1].loser_to, Some((3, Side::Slot2)));

        assert_eq!(b[2].winner_rank, Some(1));
        assert_eq!(b[2].loser_rank, Some(2));
        assert_eq!(b[3].winner_rank, Some(3));
        assert_eq!(b[3].loser_rank, Some(4));

        // final and 3rd-place match share the last round
        assert_eq!(b[2].round, 2);
        assert_eq!(b[3].round, 2);
    }

    #[test]
    fn test_four_seeds_without_third_place() {
        let b = single_elimination(4, false);
        assert_eq!(b.len(), 3);
        // both semifinal losers get rank 3
        assert_eq!(b[0].loser_rank, Some(3));
        assert_eq!(b[1].loser_rank, Some(3));
        assert_eq!(b[0].loser_to, None);
    }

    #[test]
    fn test_byes_advance_the_sole_occupant() {
        // 6 seeds in a field of 8: seeds 1 and 2 skip the first round
        let b = single_elimination(6, false);
        // 8-bracket has 7 matches, two of which are byes
        assert_eq!(b.len(), 5);

        let semi1 = &b[2];
        let semi2 = &b[3];
        assert_eq!(semi1.slot1, BracketSlot::Seed(1));
        assert_eq!(semi2.slot1, BracketSlot::Seed(2));
        assert_eq!(semi1.slot2, BracketSlot::WinnerOf(0));
        assert_eq!(semi2.slot2, BracketSlot::WinnerOf(1));

        // round-1 matches hold the four remaining seeds
        let mut seeds = seeds_in_round_one(&b);
        seeds.sort_unstable();
        assert_eq!(seeds, vec![3, 4, 5, 6]);
    }

    #[test]
    fn test_three_seeds_collapse_the_placement_match() {
        let b = single_elimination(3, true);
        // seed 1's semifinal and the 3rd-place match both disappear
        assert_eq!(b.len(), 2);

        let semi = &b[0];
        assert_eq!(semi.slot1, BracketSlot::Seed(2));
        assert_eq!(semi.slot2, BracketSlot::Seed(3));
        // its loser takes 3rd place without playing
        assert_eq!(semi.loser_rank, Some(3));
        assert_eq!(semi.loser_to, None);

        let fin = &b[1];
        assert_eq!(fin.slot1, BracketSlot::Seed(1));
        assert_eq!(fin.slot2, BracketSlot::WinnerOf(0));
        assert_eq!(fin.winner_rank, Some(1));
    }

    #[test]
    fn test_two_seeds_is_a_single_final() {
        let b = single_elimination(2, true);
        assert_eq!(b.len(), 1);
        assert_eq!(b[0].winner_rank, Some(1));
        assert_eq!(b[0].loser_rank, Some(2));
        assert_eq!(b[0].loser_to, None);
    }

    #[test]
    fn test_round_robin_counts() {
        // even group: n-1 rounds, n/2 matches each
        let rounds = round_robin_rounds(4);
        assert_eq!(rounds.len(), 3);
        assert!(rounds.iter().all(|r| r.len() == 2));

        // odd group: n rounds with one member sitting out
        let rounds = round_robin_rounds(5);
        assert_eq!(rounds.len(), 5);
        assert!(rounds.iter().all(|r| r.len() == 2));
    }

    #[test]
    fn test_round_robin_everyone_meets_exactly_once() {
        for n in 2..=9 {
            let rounds = round_robin_rounds(n);
            let mut seen = HashSet::new();
            for round in &rounds {
                let mut active = HashSet::new();
                for &(a, b) in round {
                    assert!(active.insert(a), "{a} plays twice in one round");
                    assert!(active.insert(b), "{b} plays twice in one round");
                    let key = (a.min(b), a.max(b));
                    assert!(seen.insert(key), "{key:?} scheduled twice");
                }
            }
            assert_eq!(seen.len(), n * (n - 1) / 2);
        }
    }

    proptest! {
        #[test]
        fn prop_links_point_forward_and_agree_with_slots(
            seed_count in 2usize..40,
            third_place in proptest::bool::ANY,
        ) {
            let b = single_elimination(seed_count, third_place);

            // every competitor appears exactly once
            let mut seeds: Vec<usize> = b
                .iter()
                .flat_map(|m| [m.slot1, m.slot2])
                .filter_map(|s| match s {
                    BracketSlot::Seed(n) => Some(n),
                    _ => None,
                })
                .collect();
            seeds.sort_unstable();
            prop_assert_eq!(seeds, (1..=seed_count).collect::<Vec<_>>());

            for (i, m) in b.iter().enumerate() {
                // no unresolved byes survive generation
                prop_assert!(!m.has_bye());

                if let Some((t, side)) = m.winner_to {
                    prop_assert!(t > i);
                    prop_assert_eq!(b[t].slot(side), BracketSlot::WinnerOf(i));
                } else {
                    prop_assert!(m.winner_rank.is_some());
                }
                if let Some((t, side)) = m.loser_to {
                    prop_assert!(t > i);
                    prop_assert_eq!(b[t].slot(side), BracketSlot::LoserOf(i));
                }
            }

            // exactly one champion
            let champions = b.iter().filter(|m| m.winner_rank == Some(1)).count();
            prop_assert_eq!(champions, 1);
        }
    }
}
