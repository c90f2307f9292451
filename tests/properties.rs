//! Property tests over randomly drafted teams from the shipped ruleset

use std::path::PathBuf;

use hexbrawl::battle::{CombatEventKind, MatchContext, RosterEntry, TeamComposition};
use hexbrawl::rules::RuleTables;
use hexbrawl::{load_rules, simulate};
use proptest::prelude::*;

const POOL: [&str; 11] = [
    "knight",
    "sentinel",
    "duelist",
    "assassin",
    "headsman",
    "pyromancer",
    "hexer",
    "cleric",
    "warlock",
    "beastmaster",
    "martyr",
];

fn rules() -> RuleTables {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/rules/default.toml");
    let mut rules = load_rules(&path).unwrap();
    rules.config.max_ticks = 600;
    rules
}

/// Up to four units on distinct hexes of a 7x4 half
fn team() -> impl Strategy<Value = TeamComposition> {
    let cells: Vec<(i32, i32)> = (0..4).flat_map(|row| (0..7).map(move |col| (col, row))).collect();
    (
        prop::collection::vec((0..POOL.len(), 1u8..=3), 1..=4),
        prop::sample::subsequence(cells, 4),
    )
        .prop_map(|(picks, cells)| {
            let units = picks
                .into_iter()
                .zip(cells)
                .map(|((pick, star), (col, row))| RosterEntry::new(POOL[pick], col, row).with_star(star))
                .collect();
            TeamComposition::new(units)
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_same_seed_same_trace(a in team(), b in team(), seed in any::<u64>()) {
        let rules = rules();
        let first = simulate(&rules, &a, &b, seed).unwrap();
        let second = simulate(&rules, &a, &b, seed).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_match_terminates_with_one_end(a in team(), b in team(), seed in any::<u64>()) {
        let rules = rules();
        let report = simulate(&rules, &a, &b, seed).unwrap();
        prop_assert!(report.result.final_tick <= rules.config.max_ticks);
        let ends = report
            .events
            .iter()
            .filter(|event| matches!(event.event, CombatEventKind::CombatEnd { .. }))
            .count();
        prop_assert_eq!(ends, 1);
    }

    #[test]
    fn prop_health_stays_in_bounds(a in team(), b in team(), seed in any::<u64>()) {
        let rules = rules();
        let mut ctx = MatchContext::new(&rules, &a, &b, seed).unwrap();
        ctx.run_setup();
        while !ctx.is_finished() {
            ctx.run_tick();
            for unit in &ctx.units {
                prop_assert!(unit.health >= 0.0);
                prop_assert!(unit.health <= unit.max_health() + 1e-3);
                prop_assert!(unit.shield >= 0.0);
                prop_assert!(!unit.dead || unit.health == 0.0);
            }
        }
    }
}
