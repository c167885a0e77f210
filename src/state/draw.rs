//! Theme selection and challenge draw policy.

use std::collections::HashSet;

use indexmap::IndexMap;
use rand::{Rng, seq::IndexedRandom};

use crate::state::tournament::{Challenge, Theme};

/// Read-only mapping from theme to its challenge pool.
pub type ContentPools = IndexMap<Theme, Vec<Challenge>>;

/// Themes that can actually be played: those with a non-empty pool, or every
/// theme when nothing was loaded.
pub fn theme_universe(pools: &ContentPools) -> Vec<Theme> {
    let stocked: Vec<Theme> = Theme::ALL
        .into_iter()
        .filter(|theme| pools.get(theme).is_some_and(|pool| !pool.is_empty()))
        .collect();

    if stocked.is_empty() {
        Theme::ALL.to_vec()
    } else {
        stocked
    }
}

/// Pick a theme uniformly among the enabled ones.
///
/// `avoid` is skipped while another enabled theme remains. Disabled themes are
/// advisory: when every theme is disabled the whole universe is used again.
pub fn pick_theme<R>(
    rng: &mut R,
    universe: &[Theme],
    disabled: &[Theme],
    avoid: Option<Theme>,
) -> Option<Theme>
where
    R: Rng + ?Sized,
{
    let mut candidates: Vec<Theme> = universe
        .iter()
        .copied()
        .filter(|theme| !disabled.contains(theme))
        .collect();
    if candidates.is_empty() {
        candidates = universe.to_vec();
    }

    if let Some(avoid) = avoid {
        if candidates.len() > 1 && candidates.contains(&avoid) {
            candidates.retain(|theme| *theme != avoid);
        }
    }

    candidates.choose(rng).copied()
}

/// Draw a challenge from `pool`, preferring ids absent from `used`.
///
/// Once every challenge of the pool has been used the full pool is eligible
/// again. Returns `None` only for an empty pool.
pub fn pick_challenge<'a, R>(
    rng: &mut R,
    pool: &'a [Challenge],
    used: &[String],
) -> Option<&'a Challenge>
where
    R: Rng + ?Sized,
{
    let used: HashSet<&str> = used.iter().map(String::as_str).collect();
    let fresh: Vec<&Challenge> = pool
        .iter()
        .filter(|challenge| !used.contains(challenge.id.as_str()))
        .collect();

    if fresh.is_empty() {
        pool.choose(rng)
    } else {
        fresh.choose(rng).copied()
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn challenge(id: &str, theme: Theme) -> Challenge {
        Challenge {
            id: id.to_string(),
            theme,
            prompt: format!("prompt {id}"),
            answer: format!("answer {id}"),
            metadata: None,
        }
    }

    #[test]
    fn universe_skips_empty_pools() {
        let mut pools = ContentPools::new();
        pools.insert(Theme::Lyrics, vec![challenge("l1", Theme::Lyrics)]);
        pools.insert(Theme::Emoji, Vec::new());
        assert_eq!(theme_universe(&pools), vec![Theme::Lyrics]);
        assert_eq!(theme_universe(&ContentPools::new()), Theme::ALL.to_vec());
    }

    #[test]
    fn avoided_theme_is_never_picked_while_alternatives_exist() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let theme = pick_theme(&mut rng, &Theme::ALL, &[], Some(Theme::Scene)).unwrap();
            assert_ne!(theme, Theme::Scene);
        }
    }

    #[test]
    fn avoided_theme_is_kept_when_it_is_the_only_enabled_one() {
        let mut rng = StdRng::seed_from_u64(3);
        let disabled = [Theme::Lyrics, Theme::Emoji, Theme::Trivia];
        let theme = pick_theme(&mut rng, &Theme::ALL, &disabled, Some(Theme::Scene));
        assert_eq!(theme, Some(Theme::Scene));
    }

    #[test]
    fn all_disabled_falls_back_to_universe() {
        let mut rng = StdRng::seed_from_u64(5);
        let theme = pick_theme(&mut rng, &Theme::ALL, &Theme::ALL, Some(Theme::Trivia)).unwrap();
        assert_ne!(theme, Theme::Trivia);
    }

    #[test]
    fn unused_challenges_are_preferred_then_pool_recycles() {
        let mut rng = StdRng::seed_from_u64(9);
        let pool = vec![challenge("t1", Theme::Trivia), challenge("t2", Theme::Trivia)];

        let used = vec!["t1".to_string()];
        for _ in 0..50 {
            assert_eq!(pick_challenge(&mut rng, &pool, &used).unwrap().id, "t2");
        }

        let exhausted = vec!["t1".to_string(), "t2".to_string()];
        assert!(pick_challenge(&mut rng, &pool, &exhausted).is_some());
        assert!(pick_challenge(&mut rng, &[], &exhausted).is_none());
    }
}
