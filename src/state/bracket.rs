//! Fixed single-elimination topology: which match feeds which slot, and the
//! inverse "feeds-into" adjacency used for propagation and reset cascades.

use std::collections::VecDeque;

use indexmap::IndexMap;
use thiserror::Error;
use uuid::Uuid;

use crate::state::tournament::{Match, MatchId, MatchScore, MatchStatus, Team, TeamSide};

/// Which outcome of the source match fills a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The source match winner advances.
    Winner,
    /// The source match loser drops into this slot.
    Loser,
}

/// Reference from a slot to the upstream match that fills it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feed {
    /// Upstream match.
    pub source: MatchId,
    /// Outcome of the upstream match that is taken.
    pub outcome: Outcome,
}

/// Static description of a bracket position.
#[derive(Debug, Clone, Copy)]
pub struct MatchBlueprint {
    /// Position in the bracket.
    pub id: MatchId,
    /// Canonical display label.
    pub label: &'static str,
    /// Upstream feed of slot A (`None` for seed matches).
    pub feed_a: Option<Feed>,
    /// Upstream feed of slot B (`None` for seed matches).
    pub feed_b: Option<Feed>,
}

impl MatchBlueprint {
    /// Upstream feed of `side`.
    pub fn feed(&self, side: TeamSide) -> Option<Feed> {
        match side {
            TeamSide::A => self.feed_a,
            TeamSide::B => self.feed_b,
        }
    }

    /// Seed matches receive their teams at bootstrap.
    pub fn is_seed(&self) -> bool {
        self.feed_a.is_none() && self.feed_b.is_none()
    }
}

const fn winner_of(source: MatchId) -> Option<Feed> {
    Some(Feed {
        source,
        outcome: Outcome::Winner,
    })
}

const fn loser_of(source: MatchId) -> Option<Feed> {
    Some(Feed {
        source,
        outcome: Outcome::Loser,
    })
}

/// The eight bracket positions in bootstrap order.
pub const BLUEPRINTS: [MatchBlueprint; 8] = [
    MatchBlueprint {
        id: MatchId::Qf1,
        label: "Group Stage 1",
        feed_a: None,
        feed_b: None,
    },
    MatchBlueprint {
        id: MatchId::Qf2,
        label: "Group Stage 2",
        feed_a: None,
        feed_b: None,
    },
    MatchBlueprint {
        id: MatchId::Qf3,
        label: "Group Stage 3",
        feed_a: None,
        feed_b: None,
    },
    MatchBlueprint {
        id: MatchId::Qf4,
        label: "Group Stage 4",
        feed_a: None,
        feed_b: None,
    },
    MatchBlueprint {
        id: MatchId::Sf1,
        label: "Semifinal 1",
        feed_a: winner_of(MatchId::Qf1),
        feed_b: winner_of(MatchId::Qf2),
    },
    MatchBlueprint {
        id: MatchId::Sf2,
        label: "Semifinal 2",
        feed_a: winner_of(MatchId::Qf3),
        feed_b: winner_of(MatchId::Qf4),
    },
    MatchBlueprint {
        id: MatchId::Final,
        label: "Final",
        feed_a: winner_of(MatchId::Sf1),
        feed_b: winner_of(MatchId::Sf2),
    },
    MatchBlueprint {
        id: MatchId::Third,
        label: "Third Place",
        feed_a: loser_of(MatchId::Sf1),
        feed_b: loser_of(MatchId::Sf2),
    },
];

/// Number of teams seeded into the group stage.
pub const SEED_COUNT: usize = 8;

/// Downstream edge: completing a match binds one of its teams into `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Downstream {
    /// Match receiving the team.
    pub target: MatchId,
    /// Slot of `target` being filled.
    pub side: TeamSide,
    /// Which team of the completed match is taken.
    pub outcome: Outcome,
}

/// Raised when a persisted bracket does not match the fixed topology.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BracketMismatch {
    /// Wrong number of matches.
    #[error("bracket has {0} matches, expected 8")]
    Size(usize),
    /// A match sits at the wrong position.
    #[error("bracket position {index} holds `{found}`, expected `{expected}`")]
    Position {
        /// Position in the bracket.
        index: usize,
        /// Id found at that position.
        found: MatchId,
        /// Id the topology puts there.
        expected: MatchId,
    },
    /// A match refers to a team missing from the leaderboard.
    #[error("match `{match_id}` refers to unknown team `{team}`")]
    UnknownTeam {
        /// Offending match.
        match_id: MatchId,
        /// Team id absent from the leaderboard.
        team: Uuid,
    },
    /// A match lists different sources than the topology.
    #[error("match `{0}` has sources that differ from the bracket topology")]
    Sources(MatchId),
}

/// Precomputed adjacency over [`BLUEPRINTS`].
#[derive(Debug, Clone)]
pub struct BracketTopology {
    downstream: IndexMap<MatchId, Vec<Downstream>>,
}

impl Default for BracketTopology {
    fn default() -> Self {
        Self::new()
    }
}

impl BracketTopology {
    /// Build the feeds-into adjacency by inverting every slot feed.
    pub fn new() -> Self {
        let mut downstream: IndexMap<MatchId, Vec<Downstream>> = BLUEPRINTS
            .iter()
            .map(|blueprint| (blueprint.id, Vec::new()))
            .collect();

        for blueprint in &BLUEPRINTS {
            for side in TeamSide::BOTH {
                if let Some(feed) = blueprint.feed(side) {
                    downstream.entry(feed.source).or_default().push(Downstream {
                        target: blueprint.id,
                        side,
                        outcome: feed.outcome,
                    });
                }
            }
        }

        Self { downstream }
    }

    /// Static description of `id`.
    pub fn blueprint(&self, id: MatchId) -> &'static MatchBlueprint {
        BLUEPRINTS
            .iter()
            .find(|blueprint| blueprint.id == id)
            .unwrap_or(&BLUEPRINTS[0])
    }

    /// Feed of `side` of match `id`.
    pub fn feed(&self, id: MatchId, side: TeamSide) -> Option<Feed> {
        self.blueprint(id).feed(side)
    }

    /// Matches directly fed by `id`.
    pub fn downstream(&self, id: MatchId) -> &[Downstream] {
        self.downstream.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every match whose source chain includes `id`, nearest first, without
    /// duplicates and excluding `id` itself.
    pub fn dependents(&self, id: MatchId) -> Vec<MatchId> {
        let mut ordered = Vec::new();
        let mut queue = VecDeque::from([id]);

        while let Some(current) = queue.pop_front() {
            for edge in self.downstream(current) {
                if edge.target != id && !ordered.contains(&edge.target) {
                    ordered.push(edge.target);
                    queue.push_back(edge.target);
                }
            }
        }

        ordered
    }

    /// Lay out a fresh bracket, pairing `seeds` two by two in input order.
    /// `seeds` must hold at least [`SEED_COUNT`] teams.
    pub fn build_bracket(&self, seeds: &[Team], best_of: u32) -> Vec<Match> {
        let mut pairs = seeds.chunks(2);
        BLUEPRINTS
            .iter()
            .map(|blueprint| {
                let (team_a, team_b) = if blueprint.is_seed() {
                    match pairs.next() {
                        Some([a, b, ..]) => (Some(a.clone()), Some(b.clone())),
                        Some([a]) => (Some(a.clone()), None),
                        _ => (None, None),
                    }
                } else {
                    (None, None)
                };

                Match {
                    id: blueprint.id,
                    label: blueprint.label.to_string(),
                    team_a,
                    team_b,
                    source_a: blueprint.feed_a.map(|feed| feed.source),
                    source_b: blueprint.feed_b.map(|feed| feed.source),
                    winner_id: None,
                    loser_id: None,
                    score: MatchScore::new(best_of),
                    status: MatchStatus::Pending,
                    current_challenge: None,
                    active_theme: None,
                    used_challenge_ids: Vec::new(),
                    disabled_themes: Vec::new(),
                }
            })
            .collect()
    }

    /// Check that a persisted bracket has the fixed ids, order and sources.
    pub fn verify(&self, bracket: &[Match]) -> Result<(), BracketMismatch> {
        if bracket.len() != BLUEPRINTS.len() {
            return Err(BracketMismatch::Size(bracket.len()));
        }

        for (index, (found, blueprint)) in bracket.iter().zip(BLUEPRINTS.iter()).enumerate() {
            if found.id != blueprint.id {
                return Err(BracketMismatch::Position {
                    index,
                    found: found.id,
                    expected: blueprint.id,
                });
            }
            let expected_a = blueprint.feed_a.map(|feed| feed.source);
            let expected_b = blueprint.feed_b.map(|feed| feed.source);
            if found.source_a != expected_a || found.source_b != expected_b {
                return Err(BracketMismatch::Sources(found.id));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeds() -> Vec<Team> {
        (1..=8)
            .map(|n| Team::new(format!("T{n}"), vec![format!("P{n}a"), format!("P{n}b")]))
            .collect()
    }

    #[test]
    fn group_winners_feed_semifinals_in_order() {
        let topology = BracketTopology::new();
        assert_eq!(
            topology.downstream(MatchId::Qf1),
            &[Downstream {
                target: MatchId::Sf1,
                side: TeamSide::A,
                outcome: Outcome::Winner,
            }]
        );
        assert_eq!(topology.downstream(MatchId::Qf4)[0].target, MatchId::Sf2);
        assert_eq!(topology.downstream(MatchId::Qf4)[0].side, TeamSide::B);
        assert!(topology.downstream(MatchId::Final).is_empty());
    }

    #[test]
    fn semifinals_feed_final_winners_and_third_losers() {
        let topology = BracketTopology::new();
        let edges = topology.downstream(MatchId::Sf2);
        assert_eq!(edges.len(), 2);
        assert!(edges.contains(&Downstream {
            target: MatchId::Final,
            side: TeamSide::B,
            outcome: Outcome::Winner,
        }));
        assert!(edges.contains(&Downstream {
            target: MatchId::Third,
            side: TeamSide::B,
            outcome: Outcome::Loser,
        }));
    }

    #[test]
    fn dependents_are_transitive() {
        let topology = BracketTopology::new();
        assert_eq!(
            topology.dependents(MatchId::Qf3),
            vec![MatchId::Sf2, MatchId::Final, MatchId::Third]
        );
        assert_eq!(
            topology.dependents(MatchId::Sf1),
            vec![MatchId::Final, MatchId::Third]
        );
        assert!(topology.dependents(MatchId::Third).is_empty());
    }

    #[test]
    fn built_bracket_binds_only_seed_slots() {
        let topology = BracketTopology::new();
        let teams = seeds();
        let bracket = topology.build_bracket(&teams, 5);

        assert_eq!(bracket.len(), 8);
        assert_eq!(bracket[0].team_a.as_ref().unwrap().id, teams[0].id);
        assert_eq!(bracket[0].team_b.as_ref().unwrap().id, teams[1].id);
        assert_eq!(bracket[3].team_b.as_ref().unwrap().id, teams[7].id);
        for m in &bracket[4..] {
            assert!(m.team_a.is_none() && m.team_b.is_none());
            assert!(m.source_a.is_some() && m.source_b.is_some());
        }
        assert_eq!(bracket[7].source_a, Some(MatchId::Sf1));
        assert!(topology.verify(&bracket).is_ok());
    }

    #[test]
    fn verify_rejects_tampered_sources() {
        let topology = BracketTopology::new();
        let mut bracket = topology.build_bracket(&seeds(), 5);
        bracket[6].source_b = Some(MatchId::Qf1);
        assert_eq!(
            topology.verify(&bracket),
            Err(BracketMismatch::Sources(MatchId::Final))
        );

        bracket.pop();
        assert_eq!(topology.verify(&bracket), Err(BracketMismatch::Size(7)));
    }
}
