// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Merging repeated observations of the same physical damage.
//!
//! Overlapping photos report the same crack more than once. Two damages are
//! the same when their boxes overlap (regardless of the reported type, which
//! the model does not assign consistently across photos), or when they share
//! a type and have similar measured areas.
//!
//! With the default area threshold of 1.0 the area test accepts any two
//! positive areas, so it reduces to "same type, both measured".

use crate::config::DedupConfig;
use damage_locator_core::DetectedDamage;

/// Order-dependent merge of damage observations
#[derive(Debug, Clone, Copy, Default)]
pub struct Deduplicator {
    config: DedupConfig,
}

impl Deduplicator {
    pub fn new(config: DedupConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// Whether `a` and `b` describe the same damage
    pub fn is_same_damage(&self, a: &DetectedDamage, b: &DetectedDamage) -> bool {
        if let (Some(box_a), Some(box_b)) = (&a.bounding_box, &b.bounding_box) {
            if box_a.iou(box_b) > self.config.iou_threshold {
                return true;
            }
        }

        if a.damage_type != b.damage_type {
            return false;
        }
        match (a.area(), b.area()) {
            (Some(area_a), Some(area_b)) => {
                let larger = area_a.max(area_b);
                larger > 0.0
                    && (area_a - area_b).abs() / larger < self.config.max_relative_area_difference
            }
            _ => false,
        }
    }

    /// Whether `candidate` is a better observation than the stored one
    pub fn should_replace(&self, stored: &DetectedDamage, candidate: &DetectedDamage) -> bool {
        if candidate.confidence > stored.confidence + self.config.confidence_margin {
            return true;
        }
        match (stored.distance(), candidate.distance()) {
            (Some(stored_distance), Some(distance)) => {
                distance < stored_distance * self.config.closer_distance_ratio
            }
            _ => false,
        }
    }

    /// Merge duplicates, processing input in order.
    ///
    /// Each damage is compared against the unique list built so far; the
    /// first match decides. A better observation takes over the matched
    /// slot, so the output order follows first sightings.
    ///
    /// No two entries of the result match each other, so running the
    /// result through again leaves it unchanged.
    pub fn deduplicate(&self, damages: Vec<DetectedDamage>) -> Vec<DetectedDamage> {
        let mut unique: Vec<DetectedDamage> = Vec::with_capacity(damages.len());

        for damage in damages {
            match unique.iter().position(|kept| self.is_same_damage(kept, &damage)) {
                Some(slot) => {
                    if self.should_replace(&unique[slot], &damage) {
                        tracing::trace!(
                            replaced = %unique[slot].id,
                            by = %damage.id,
                            "Replacing duplicate observation"
                        );
                        unique[slot] = damage;
                        self.settle(&mut unique, slot);
                    }
                }
                None => unique.push(damage),
            }
        }

        unique
    }

    /// Merge entries that match the freshly replaced `slot`.
    ///
    /// Each merged pair keeps the earlier position; the later entry takes it
    /// over only when it is the better observation.
    fn settle(&self, unique: &mut Vec<DetectedDamage>, mut slot: usize) {
        while let Some(other) = (0..unique.len())
            .find(|&index| index != slot && self.is_same_damage(&unique[index], &unique[slot]))
        {
            let (first, second) = (other.min(slot), other.max(slot));
            let later = unique.remove(second);
            tracing::trace!(
                kept = %unique[first].id,
                merged = %later.id,
                "Merging observations joined by a replacement"
            );
            if self.should_replace(&unique[first], &later) {
                unique[first] = later;
            }
            slot = first;
        }
    }
}

/// [`Deduplicator::deduplicate`] with default thresholds
pub fn deduplicate(damages: Vec<DetectedDamage>) -> Vec<DetectedDamage> {
    Deduplicator::default().deduplicate(damages)
}
