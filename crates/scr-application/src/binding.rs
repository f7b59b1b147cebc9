//! Binding Policy Engine
//!
//! Decides, per reference, how an already-bound set reacts to a new
//! resolution. Pure function of the descriptor, the bound snapshot and the
//! current candidates; the lifecycle manager applies the outcome.

use crate::matching::{EffectiveReference, Resolution};
use scr_domain::value_objects::{ServiceId, ServiceRecord};
use std::collections::HashMap;

/// Changes to apply to one reference while the instance stays active
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RebindPlan {
    /// Bound records to release, in bound order
    pub unbind: Vec<ServiceRecord>,
    /// Records to bind, in rank order
    pub bind: Vec<ServiceRecord>,
    /// Records that stay bound but whose properties changed
    pub update: Vec<ServiceRecord>,
    /// The bound set once the plan is applied, in rank order
    pub target: Vec<ServiceRecord>,
}

impl RebindPlan {
    /// Whether the bound membership changes
    pub fn changes_membership(&self) -> bool {
        !self.unbind.is_empty() || !self.bind.is_empty()
    }
}

/// Outcome of [`BindingPolicyEngine::decide_rebind`]
#[derive(Debug, Clone, PartialEq)]
pub enum RebindDecision {
    /// Nothing to do for this reference
    NoChange,
    /// Apply the plan in place
    Rebind(RebindPlan),
    /// The instance must be deactivated; the next activation re-resolves
    Defer,
}

/// Stateless policy engine
pub struct BindingPolicyEngine;

impl BindingPolicyEngine {
    /// Decide how `old_bound` reacts to `resolution`
    pub fn decide_rebind(
        reference: &EffectiveReference,
        old_bound: &[ServiceRecord],
        resolution: &Resolution,
    ) -> RebindDecision {
        let descriptor = reference.descriptor();
        let current: HashMap<ServiceId, &ServiceRecord> = resolution
            .matching
            .iter()
            .map(|record| (record.id(), record))
            .collect();

        if !descriptor.is_dynamic() {
            if old_bound.iter().any(|old| !current.contains_key(&old.id())) {
                return RebindDecision::Defer;
            }
            if descriptor.is_greedy() {
                let preferred = Self::target_set(reference, old_bound, resolution);
                if !same_members(old_bound, &preferred) {
                    return RebindDecision::Defer;
                }
            }
            let update = changed_records(old_bound, &current);
            if update.is_empty() {
                return RebindDecision::NoChange;
            }
            let target = old_bound
                .iter()
                .map(|old| current.get(&old.id()).map_or_else(|| old.clone(), |r| (*r).clone()))
                .collect();
            return RebindDecision::Rebind(RebindPlan {
                update,
                target,
                ..RebindPlan::default()
            });
        }

        let target = Self::target_set(reference, old_bound, resolution);
        if target.len() < reference.minimum() {
            return RebindDecision::Defer;
        }

        let unbind: Vec<ServiceRecord> = old_bound
            .iter()
            .filter(|old| !target.iter().any(|t| t.id() == old.id()))
            .cloned()
            .collect();
        let bind: Vec<ServiceRecord> = target
            .iter()
            .filter(|t| !old_bound.iter().any(|old| old.id() == t.id()))
            .cloned()
            .collect();
        let update: Vec<ServiceRecord> = changed_records(old_bound, &current)
            .into_iter()
            .filter(|record| target.iter().any(|t| t.id() == record.id()))
            .collect();

        if unbind.is_empty() && bind.is_empty() && update.is_empty() {
            return RebindDecision::NoChange;
        }
        RebindDecision::Rebind(RebindPlan {
            unbind,
            bind,
            update,
            target,
        })
    }

    /// The set this reference should hold given its policy option
    fn target_set(
        reference: &EffectiveReference,
        old_bound: &[ServiceRecord],
        resolution: &Resolution,
    ) -> Vec<ServiceRecord> {
        let descriptor = reference.descriptor();
        if descriptor.cardinality.is_multiple() {
            return resolution.matching.clone();
        }
        if !descriptor.is_greedy()
            && let Some(kept) = old_bound
                .first()
                .and_then(|old| resolution.matching.iter().find(|r| r.id() == old.id()))
        {
            return vec![kept.clone()];
        }
        resolution.matching.iter().take(1).cloned().collect()
    }
}

fn same_members(a: &[ServiceRecord], b: &[ServiceRecord]) -> bool {
    a.len() == b.len() && a.iter().all(|x| b.iter().any(|y| y.id() == x.id()))
}

/// Bound records still present whose revision moved on
fn changed_records(
    old_bound: &[ServiceRecord],
    current: &HashMap<ServiceId, &ServiceRecord>,
) -> Vec<ServiceRecord> {
    old_bound
        .iter()
        .filter_map(|old| {
            current
                .get(&old.id())
                .filter(|now| now.revision() != old.revision())
                .map(|now| (*now).clone())
        })
        .collect()
}
