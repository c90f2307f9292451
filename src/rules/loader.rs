//! Load rule tables from TOML and team compositions from JSON

use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::battle::roster::TeamComposition;
use crate::core::config::MatchConfig;
use crate::core::error::Result;
use crate::rules::tables::{
    CrestDefinition, ItemDefinition, RuleTables, StarScaling, TraitDefinition, UnitTemplate,
};

/// On-disk layout of a rules file
#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(rename = "match", default)]
    match_config: MatchConfig,
    #[serde(default)]
    star_scaling: StarScaling,
    #[serde(default)]
    units: Vec<UnitTemplate>,
    #[serde(default)]
    items: Vec<ItemDefinition>,
    #[serde(default)]
    traits: Vec<TraitDefinition>,
    #[serde(default)]
    crests: Vec<CrestDefinition>,
}

/// Load and validate a rules file
pub fn load_rules(path: &Path) -> Result<RuleTables> {
    let content = fs::read_to_string(path)?;
    let rules = parse_rules(&content)?;
    debug!(
        path = %path.display(),
        units = rules.unit_count(),
        "Loaded rule tables"
    );
    Ok(rules)
}

/// Parse and validate rule tables from TOML text
pub fn parse_rules(content: &str) -> Result<RuleTables> {
    let file: RuleFile = toml::from_str(content)?;

    let mut rules = RuleTables::new(file.match_config).with_star_scaling(file.star_scaling);
    for template in file.units {
        rules.add_unit(template);
    }
    for item in file.items {
        rules.add_item(item);
    }
    for definition in file.traits {
        rules.add_trait(definition);
    }
    for crest in file.crests {
        rules.add_crest(crest);
    }

    rules.validate()?;
    Ok(rules)
}

/// Load a team composition from a JSON file
///
/// The composition is only checked against the rule tables when a match is
/// simulated.
pub fn load_team(path: &Path) -> Result<TeamComposition> {
    let content = fs::read_to_string(path)?;
    parse_team(&content)
}

pub fn parse_team(content: &str) -> Result<TeamComposition> {
    Ok(serde_json::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::abilities::{AbilityEffect, AbilityTrigger};
    use crate::core::error::ArenaError;
    use crate::rules::tables::{BonusMode, StatKind};

    const MINIMAL: &str = r#"
[match]
max_ticks = 600

[[traits]]
id = "guardian"
name = "Guardian"
tiers = [
    { threshold = 2, bonuses = [{ stat = "armor", amount = 20.0 }] },
    { threshold = 4, bonuses = [{ stat = "armor", amount = 50.0 }] },
]

[[units]]
id = "knight"
name = "Knight"
traits = ["guardian"]

[units.stats]
health = 650.0
armor = 40.0
max_mana = 80.0
starting_mana = 20.0

[units.ability]
name = "Bulwark"
trigger = { type = "mana_full" }
effect = { type = "shield", amount = 200.0 }
target = { type = "self" }

[[items]]
id = "giants_belt"
name = "Giant's Belt"
bonuses = [{ stat = "health", amount = 15.0, mode = "percent" }]
"#;

    #[test]
    fn test_parse_minimal_rules() {
        let rules = parse_rules(MINIMAL).unwrap();
        assert_eq!(rules.config.max_ticks, 600);
        assert_eq!(rules.config.tick_ms, 50);

        let knight = rules.template("knight").unwrap();
        assert_eq!(knight.stats.health, 650.0);
        // Unlisted stats fall back to defaults
        assert_eq!(knight.stats.range, 1);
        let ability = knight.ability.as_ref().unwrap();
        assert_eq!(ability.trigger, AbilityTrigger::ManaFull);
        assert!(matches!(ability.effect, AbilityEffect::Shield { .. }));

        let belt = rules.item("giants_belt").unwrap();
        assert_eq!(belt.bonuses[0].stat, StatKind::Health);
        assert_eq!(belt.bonuses[0].mode, BonusMode::Percent);

        assert_eq!(rules.trait_def("guardian").unwrap().tiers.len(), 2);
    }

    #[test]
    fn test_full_mana_pool_rejected() {
        let broken = MINIMAL.replace("starting_mana = 20.0", "starting_mana = 80.0");
        assert!(matches!(
            parse_rules(&broken),
            Err(ArenaError::InvalidRules(_))
        ));
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        assert!(matches!(
            parse_rules("[[units]\nid ="),
            Err(ArenaError::TomlError(_))
        ));
    }

    #[test]
    fn test_parse_team() {
        let team = parse_team(
            r#"{
                "units": [
                    { "template_id": "knight", "star_level": 2, "position": { "col": 3, "row": 3 }, "items": ["giants_belt"] }
                ],
                "crests": []
            }"#,
        )
        .unwrap();
        assert_eq!(team.units.len(), 1);
        assert_eq!(team.units[0].star_level, 2);
        assert!(team.trait_tiers.is_none());
    }

    #[test]
    fn test_shipped_rules_load() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/rules/default.toml");
        let rules = load_rules(&path).unwrap();
        assert!(rules.unit_count() >= 6);
    }
}
