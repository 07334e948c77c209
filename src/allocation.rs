//! Deterministic traffic-allocation data model.
//!
//! An [`ExperimentDefinition`] carves an integer allocation space into contiguous treatment
//! ranges. The evaluator hashes a request identifier (salted, when enabled) into the space and
//! serves the treatment whose range contains the hash. The core's job is to guarantee the data is
//! sound: ranges must exactly tile the allocation space, with no gaps and no overlaps.
use serde::{Deserialize, Serialize};

use crate::models::Timestamp;
use crate::{Error, Result};

/// A named experiment variant owning a contiguous sub-range of the allocation space.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentDefinition {
    /// Treatment code reported with the decision.
    pub treatment_code: String,
    /// Relative traffic weight. `id_end - id_start` is expected proportional to it.
    pub weight: u64,
    /// Inclusive start of the treatment's id range.
    pub id_start: u64,
    /// Exclusive end of the treatment's id range.
    pub id_end: u64,
}

/// Configuration of one experiment.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentDefinition {
    /// Experiment name.
    pub name: String,
    /// Experiment type label, passed through to decision logs.
    #[serde(rename = "type")]
    pub experiment_type: String,
    /// Treatments tiling the allocation space.
    pub treatments: Vec<TreatmentDefinition>,
    /// Salt combined with the request identifier before hashing.
    pub salt: String,
    /// Experiment is eligible from this instant (inclusive).
    #[serde(rename = "startTimeUTC")]
    pub start_time_utc: Timestamp,
    /// Experiment is eligible until this instant (exclusive).
    #[serde(rename = "endTimeUTC")]
    pub end_time_utc: Timestamp,
    /// Inclusive start of the allocation space.
    pub allocation_id_start: u64,
    /// Exclusive end of the allocation space.
    pub allocation_id_end: u64,
    /// When true, the request identifier is salted and hashed into the allocation space. When
    /// false, the raw numeric identifier is reduced into the space directly.
    pub hash_enabled: bool,
}

/// Maps an identifier to a shard in `[0, total_shards)`.
///
/// The production bucketing hash must match the downstream evaluator; this trait is the seam
/// where the confirmed algorithm is plugged in.
pub trait Sharder {
    /// Hash `input` to a value in `[0, total_shards)`.
    fn get_shard(&self, input: impl AsRef<[u8]>, total_shards: u64) -> u64;
}

/// The default sharder: first four bytes of the MD5 digest, big-endian, reduced modulo the shard
/// count.
pub struct Md5Sharder;

impl Sharder for Md5Sharder {
    fn get_shard(&self, input: impl AsRef<[u8]>, total_shards: u64) -> u64 {
        let hash = md5::compute(input);
        let value = u32::from_be_bytes(hash[0..4].try_into().unwrap());
        (value as u64) % total_shards
    }
}

impl ExperimentDefinition {
    /// Check the allocation-space invariants: a non-empty space and treatment ranges that tile
    /// `[allocation_id_start, allocation_id_end)` exactly once per point.
    pub fn validate(&self) -> Result<()> {
        if self.allocation_id_start >= self.allocation_id_end {
            return Err(Error::InvalidAllocation(format!(
                "experiment {:?}: allocation space [{}, {}) is empty",
                self.name, self.allocation_id_start, self.allocation_id_end
            )));
        }
        if self.treatments.is_empty() {
            return Err(Error::InvalidAllocation(format!(
                "experiment {:?}: no treatments",
                self.name
            )));
        }

        let mut ranges: Vec<&TreatmentDefinition> = self.treatments.iter().collect();
        ranges.sort_by_key(|treatment| treatment.id_start);

        let mut expected_start = self.allocation_id_start;
        for treatment in ranges {
            if treatment.id_start != expected_start {
                let kind = if treatment.id_start > expected_start {
                    "gap"
                } else {
                    "overlap"
                };
                return Err(Error::InvalidAllocation(format!(
                    "experiment {:?}: {} before treatment {:?} at id {}",
                    self.name, kind, treatment.treatment_code, treatment.id_start
                )));
            }
            if treatment.id_end <= treatment.id_start {
                return Err(Error::InvalidAllocation(format!(
                    "experiment {:?}: treatment {:?} range [{}, {}) is empty",
                    self.name, treatment.treatment_code, treatment.id_start, treatment.id_end
                )));
            }
            expected_start = treatment.id_end;
        }
        if expected_start != self.allocation_id_end {
            return Err(Error::InvalidAllocation(format!(
                "experiment {:?}: treatments end at {} but allocation space ends at {}",
                self.name, expected_start, self.allocation_id_end
            )));
        }

        Ok(())
    }

    /// Whether the experiment is eligible at `now` (`[start_time_utc, end_time_utc)`).
    pub fn is_eligible_at(&self, now: Timestamp) -> bool {
        self.start_time_utc <= now && now < self.end_time_utc
    }

    /// Deterministically bucket `subject_id` into a treatment.
    ///
    /// Returns `None` when the experiment is not eligible at `now`. With `hash_enabled`, the
    /// salted identifier is hashed into the allocation space; otherwise the identifier's numeric
    /// value (its byte-wise hashless reduction for non-numeric identifiers) is used directly.
    pub fn select_treatment(
        &self,
        subject_id: &str,
        sharder: &impl Sharder,
        now: Timestamp,
    ) -> Option<&TreatmentDefinition> {
        if !self.is_eligible_at(now) {
            return None;
        }

        let space = self.allocation_id_end - self.allocation_id_start;
        let offset = if self.hash_enabled {
            sharder.get_shard(format!("{}-{}", self.salt, subject_id), space)
        } else {
            let raw = subject_id
                .parse::<u64>()
                .unwrap_or_else(|_| subject_id.bytes().fold(0u64, |acc, b| acc.wrapping_add(b as u64)));
            raw % space
        };
        let allocation_id = self.allocation_id_start + offset;

        self.treatments
            .iter()
            .find(|treatment| treatment.id_start <= allocation_id && allocation_id < treatment.id_end)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{ExperimentDefinition, Md5Sharder, Sharder, TreatmentDefinition};
    use crate::Error;

    fn treatment(code: &str, id_start: u64, id_end: u64) -> TreatmentDefinition {
        TreatmentDefinition {
            treatment_code: code.to_owned(),
            weight: id_end - id_start,
            id_start,
            id_end,
        }
    }

    fn experiment(treatments: Vec<TreatmentDefinition>) -> ExperimentDefinition {
        ExperimentDefinition {
            name: "checkout-ranker".to_owned(),
            experiment_type: "model".to_owned(),
            treatments,
            salt: "s1".to_owned(),
            start_time_utc: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            end_time_utc: Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap(),
            allocation_id_start: 0,
            allocation_id_end: 100,
            hash_enabled: true,
        }
    }

    #[test]
    fn valid_tiling_passes() {
        let exp = experiment(vec![
            treatment("control", 0, 50),
            treatment("t1", 50, 80),
            treatment("t2", 80, 100),
        ]);
        assert!(exp.validate().is_ok());
    }

    #[test]
    fn gap_is_rejected() {
        let exp = experiment(vec![treatment("control", 0, 40), treatment("t1", 50, 100)]);
        assert!(matches!(exp.validate(), Err(Error::InvalidAllocation(_))));
    }

    #[test]
    fn overlap_is_rejected() {
        let exp = experiment(vec![treatment("control", 0, 60), treatment("t1", 50, 100)]);
        assert!(matches!(exp.validate(), Err(Error::InvalidAllocation(_))));
    }

    #[test]
    fn short_coverage_is_rejected() {
        let exp = experiment(vec![treatment("control", 0, 90)]);
        assert!(matches!(exp.validate(), Err(Error::InvalidAllocation(_))));
    }

    #[test]
    fn empty_allocation_space_is_rejected() {
        let mut exp = experiment(vec![treatment("control", 0, 100)]);
        exp.allocation_id_end = 0;
        assert!(matches!(exp.validate(), Err(Error::InvalidAllocation(_))));
    }

    #[test]
    fn unsorted_treatments_still_validate() {
        let exp = experiment(vec![treatment("t1", 50, 100), treatment("control", 0, 50)]);
        assert!(exp.validate().is_ok());
    }

    #[test]
    fn selection_is_deterministic_and_in_range() {
        let exp = experiment(vec![treatment("control", 0, 50), treatment("t1", 50, 100)]);
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        let first = exp.select_treatment("req-123", &Md5Sharder, now).unwrap();
        let second = exp.select_treatment("req-123", &Md5Sharder, now).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn selection_outside_window_returns_none() {
        let exp = experiment(vec![treatment("control", 0, 100)]);
        let before = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
        let at_end = exp.end_time_utc;

        assert!(exp.select_treatment("req-123", &Md5Sharder, before).is_none());
        assert!(exp.select_treatment("req-123", &Md5Sharder, at_end).is_none());
    }

    #[test]
    fn every_hash_lands_in_exactly_one_treatment() {
        let exp = experiment(vec![
            treatment("control", 0, 33),
            treatment("t1", 33, 66),
            treatment("t2", 66, 100),
        ]);
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        for i in 0..200 {
            let id = format!("req-{i}");
            assert!(exp.select_treatment(&id, &Md5Sharder, now).is_some());
        }
    }

    #[test]
    fn md5_sharder_stays_in_range() {
        for i in 0..100 {
            let shard = Md5Sharder.get_shard(format!("input-{i}"), 7);
            assert!(shard < 7);
        }
    }
}
