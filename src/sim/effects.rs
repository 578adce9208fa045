//! Relation-effects ledger: expiring guarantees, sanctions and trade pacts
//!
//! Entries are produced by diplomatic actions and keyed by the unordered
//! border edge. Each turn the ledger is ticked: expired entries are pruned and
//! the surviving sanctions and trade buffs yield per-country growth deltas for
//! the economy stage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::config::EffectsConfig;
use crate::core::types::{CountryCode, EdgeKey, Turn};

/// A security guarantee from `actor` to `target`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guarantee {
    pub actor: CountryCode,
    pub target: CountryCode,
    pub expiry_turn: Turn,
}

/// A sanctions regime imposed by `actor` on `target`; both sides pay
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sanction {
    pub actor: CountryCode,
    pub target: CountryCode,
    pub expiry_turn: Turn,
    pub growth_penalty_actor: f64,
    pub growth_penalty_target: f64,
}

/// Trade pact state on an edge
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradePact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buff_expiry_turn: Option<Turn>,
}

impl TradePact {
    pub fn is_empty(&self) -> bool {
        self.level.is_none() && self.buff_expiry_turn.is_none()
    }

    pub fn has_active_buff(&self, turn: Turn) -> bool {
        self.buff_expiry_turn.is_some_and(|expiry| expiry > turn)
    }
}

/// The ledger
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RelationEffects {
    pub guarantees_by_edge: BTreeMap<EdgeKey, Vec<Guarantee>>,
    pub sanctions_by_edge: BTreeMap<EdgeKey, Vec<Sanction>>,
    pub trade_by_edge: BTreeMap<EdgeKey, TradePact>,
}

/// Output of one ledger tick
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LedgerTick {
    pub effects: RelationEffects,
    /// Summed growth deltas; countries without an active entry are absent
    pub growth_delta: BTreeMap<CountryCode, f64>,
}

impl LedgerTick {
    pub fn growth_delta_for(&self, code: CountryCode) -> f64 {
        self.growth_delta.get(&code).copied().unwrap_or(0.0)
    }
}

impl RelationEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a guarantee, replacing one the same actor already gave the same target
    pub fn add_guarantee(&mut self, actor: CountryCode, target: CountryCode, expiry_turn: Turn) {
        let Some(key) = EdgeKey::new(actor, target) else {
            return;
        };
        let list = self.guarantees_by_edge.entry(key).or_default();
        list.retain(|g| !(g.actor == actor && g.target == target));
        list.push(Guarantee {
            actor,
            target,
            expiry_turn,
        });
    }

    pub fn add_sanction(
        &mut self,
        actor: CountryCode,
        target: CountryCode,
        expiry_turn: Turn,
        growth_penalty_actor: f64,
        growth_penalty_target: f64,
    ) {
        let Some(key) = EdgeKey::new(actor, target) else {
            return;
        };
        self.sanctions_by_edge.entry(key).or_default().push(Sanction {
            actor,
            target,
            expiry_turn,
            growth_penalty_actor,
            growth_penalty_target,
        });
    }

    /// Merge an update into an edge's trade pact; a pact left with neither
    /// level nor buff is removed
    pub fn update_trade(&mut self, a: CountryCode, b: CountryCode, update: TradePact) {
        let Some(key) = EdgeKey::new(a, b) else {
            return;
        };
        let prev = self.trade_by_edge.get(&key).copied().unwrap_or_default();
        let next = TradePact {
            level: update.level.or(prev.level),
            buff_expiry_turn: update.buff_expiry_turn.or(prev.buff_expiry_turn),
        };
        if next.is_empty() {
            self.trade_by_edge.remove(&key);
        } else {
            self.trade_by_edge.insert(key, next);
        }
    }

    /// Raise the pact level by one (capped) and refresh the growth buff
    pub fn record_trade_deal(&mut self, a: CountryCode, b: CountryCode, turn: Turn, config: &EffectsConfig) {
        let level = self.trade(a, b).and_then(|pact| pact.level).unwrap_or(0);
        self.update_trade(
            a,
            b,
            TradePact {
                level: Some((level + 1).min(config.trade_max_level)),
                buff_expiry_turn: Some(turn.saturating_add(config.trade_buff_turns)),
            },
        );
    }

    pub fn guarantees(&self, a: CountryCode, b: CountryCode) -> &[Guarantee] {
        EdgeKey::new(a, b)
            .and_then(|key| self.guarantees_by_edge.get(&key))
            .map_or(&[], Vec::as_slice)
    }

    pub fn sanctions(&self, a: CountryCode, b: CountryCode) -> &[Sanction] {
        EdgeKey::new(a, b)
            .and_then(|key| self.sanctions_by_edge.get(&key))
            .map_or(&[], Vec::as_slice)
    }

    pub fn trade(&self, a: CountryCode, b: CountryCode) -> Option<&TradePact> {
        EdgeKey::new(a, b).and_then(|key| self.trade_by_edge.get(&key))
    }

    /// Prune entries expiring at or before `turn` and total the growth deltas
    /// of what remains
    pub fn tick(&self, turn: Turn, config: &EffectsConfig) -> LedgerTick {
        let mut out = LedgerTick::default();

        for (key, list) in &self.guarantees_by_edge {
            let active: Vec<Guarantee> = list.iter().filter(|g| g.expiry_turn > turn).cloned().collect();
            if !active.is_empty() {
                out.effects.guarantees_by_edge.insert(*key, active);
            }
        }

        for (key, list) in &self.sanctions_by_edge {
            let active: Vec<Sanction> = list.iter().filter(|s| s.expiry_turn > turn).cloned().collect();
            if active.is_empty() {
                continue;
            }
            for sanction in &active {
                *out.growth_delta.entry(sanction.actor).or_default() += sanction.growth_penalty_actor;
                *out.growth_delta.entry(sanction.target).or_default() += sanction.growth_penalty_target;
            }
            out.effects.sanctions_by_edge.insert(*key, active);
        }

        for (key, pact) in &self.trade_by_edge {
            let buffed = pact.has_active_buff(turn);
            if pact.level.is_none() && !buffed {
                continue;
            }
            out.effects.trade_by_edge.insert(
                *key,
                TradePact {
                    level: pact.level,
                    buff_expiry_turn: pact.buff_expiry_turn.filter(|_| buffed),
                },
            );
            if buffed {
                *out.growth_delta.entry(key.low()).or_default() += config.trade_bonus;
                *out.growth_delta.entry(key.high()).or_default() += config.trade_bonus;
            }
        }

        out
    }

    /// Guarantees still in force after `turn`
    pub fn active_guarantees(&self, turn: Turn) -> usize {
        self.guarantees_by_edge
            .values()
            .flatten()
            .filter(|g| g.expiry_turn > turn)
            .count()
    }

    pub fn active_sanctions(&self, turn: Turn) -> usize {
        self.sanctions_by_edge
            .values()
            .flatten()
            .filter(|s| s.expiry_turn > turn)
            .count()
    }

    /// Pacts with a positive level or a live buff
    pub fn active_trade_pacts(&self, turn: Turn) -> usize {
        self.trade_by_edge
            .values()
            .filter(|pact| pact.level.unwrap_or(0) > 0 || pact.has_active_buff(turn))
            .count()
    }

    /// Drop entries whose endpoints fail `keep`
    pub fn retain_countries(&mut self, keep: impl Fn(CountryCode) -> bool) {
        let keep_key = |key: &EdgeKey| keep(key.low()) && keep(key.high());
        self.guarantees_by_edge.retain(|key, list| {
            list.retain(|g| keep_key(key) && key.contains(g.actor) && key.contains(g.target));
            !list.is_empty()
        });
        self.sanctions_by_edge.retain(|key, list| {
            list.retain(|s| keep_key(key) && key.contains(s.actor) && key.contains(s.target));
            !list.is_empty()
        });
        self.trade_by_edge.retain(|key, pact| keep_key(key) && !pact.is_empty());
    }
}
