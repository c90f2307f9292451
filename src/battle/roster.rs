//! Match input: team compositions and their validation

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::battle::battlefield::Battlefield;
use crate::battle::hex::OffsetCoord;
use crate::combat::stats::compute_trait_tiers;
use crate::core::error::{ArenaError, Result};
use crate::core::types::Side;
use crate::rules::tables::{RuleTables, UnitTemplate};

/// One unit on a player's board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub template_id: String,
    #[serde(default = "default_star")]
    pub star_level: u8,
    /// Side-local position: row 0 is this side's back row
    pub position: OffsetCoord,
    #[serde(default)]
    pub items: Vec<String>,
}

fn default_star() -> u8 {
    1
}

impl RosterEntry {
    pub fn new(template_id: &str, col: i32, row: i32) -> Self {
        Self {
            template_id: template_id.to_string(),
            star_level: 1,
            position: OffsetCoord::new(col, row),
            items: Vec::new(),
        }
    }

    pub fn with_star(mut self, star_level: u8) -> Self {
        self.star_level = star_level;
        self
    }

    pub fn with_items(mut self, items: &[&str]) -> Self {
        self.items = items.iter().map(|i| i.to_string()).collect();
        self
    }
}

/// Everything one player brings into a match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamComposition {
    pub units: Vec<RosterEntry>,
    #[serde(default)]
    pub crests: Vec<String>,
    /// Pre-resolved trait tiers (trait id → tier index); overrides counting
    #[serde(default)]
    pub trait_tiers: Option<BTreeMap<String, usize>>,
}

impl TeamComposition {
    pub fn new(units: Vec<RosterEntry>) -> Self {
        Self {
            units,
            ..Self::default()
        }
    }

    pub fn with_crests(mut self, crests: &[&str]) -> Self {
        self.crests = crests.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Check the composition against the rule tables
    pub fn validate(&self, side: Side, rules: &RuleTables) -> Result<()> {
        let config = &rules.config;

        if self.units.is_empty() {
            return Err(ArenaError::EmptyRoster(side));
        }
        if self.units.len() > config.max_units_per_side {
            return Err(ArenaError::RosterTooLarge {
                side,
                count: self.units.len(),
                max: config.max_units_per_side,
            });
        }

        let field = Battlefield::new(config.board_width, config.board_height);
        let mut occupied = BTreeSet::new();

        for entry in &self.units {
            if rules.template(&entry.template_id).is_none() {
                return Err(ArenaError::UnknownUnit(entry.template_id.clone()));
            }
            if entry.star_level == 0 || entry.star_level > config.max_star_level {
                return Err(ArenaError::InvalidStarLevel {
                    template_id: entry.template_id.clone(),
                    level: entry.star_level,
                    max: config.max_star_level,
                });
            }
            if entry.items.len() > config.max_items_per_unit {
                return Err(ArenaError::TooManyItems {
                    template_id: entry.template_id.clone(),
                    side,
                    count: entry.items.len(),
                    max: config.max_items_per_unit,
                });
            }
            if let Some(unknown) = entry.items.iter().find(|id| rules.item(id).is_none()) {
                return Err(ArenaError::UnknownItem(unknown.clone()));
            }

            let OffsetCoord { col, row } = entry.position;
            if !field.in_half(entry.position) {
                return Err(ArenaError::PositionOutOfBounds { side, col, row });
            }
            if !occupied.insert((col, row)) {
                return Err(ArenaError::PositionOccupied { side, col, row });
            }
        }

        if let Some(unknown) = self.crests.iter().find(|id| rules.crest(id).is_none()) {
            return Err(ArenaError::UnknownCrest(unknown.clone()));
        }

        if let Some(tiers) = &self.trait_tiers {
            for (trait_id, tier) in tiers {
                let definition = rules
                    .trait_def(trait_id)
                    .ok_or_else(|| ArenaError::UnknownTrait(trait_id.clone()))?;
                if *tier >= definition.tiers.len() {
                    return Err(ArenaError::InvalidTraitTier {
                        trait_id: trait_id.clone(),
                        tier: *tier,
                    });
                }
            }
        }

        Ok(())
    }

    /// Active trait tiers: the explicit override if given, else counted
    ///
    /// Call after [`Self::validate`].
    pub fn trait_tiers(&self, rules: &RuleTables) -> BTreeMap<String, usize> {
        if let Some(explicit) = &self.trait_tiers {
            return explicit.clone();
        }
        let templates: Vec<&UnitTemplate> = self
            .units
            .iter()
            .filter_map(|entry| rules.template(&entry.template_id))
            .collect();
        compute_trait_tiers(&templates, rules)
    }
}
