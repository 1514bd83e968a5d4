use std::collections::{BTreeMap, BTreeSet, HashSet};

use log::debug;

use crate::models::{ActivityRecord, MonthKey, MonthlyAggregate};

pub fn group_by_agent(records: Vec<ActivityRecord>) -> BTreeMap<i64, Vec<ActivityRecord>> {
    let mut agents: BTreeMap<i64, Vec<ActivityRecord>> = BTreeMap::new();
    for record in records {
        agents.entry(record.agent_id).or_default().push(record);
    }
    agents
}

/// Distinct players across the whole platform, timestamps not considered.
pub fn platform_player_count(records: &[ActivityRecord]) -> usize {
    records
        .iter()
        .map(|record| record.player_id.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// Distinct players over the records that carry a parseable timestamp.
pub fn distinct_players(records: &[ActivityRecord]) -> usize {
    records
        .iter()
        .filter(|record| record.created.is_some())
        .map(|record| record.player_id.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// Groups an agent's records by calendar month, oldest first. Records
/// without a parseable timestamp are dropped.
pub fn aggregate_monthly(records: &[ActivityRecord]) -> Vec<MonthlyAggregate> {
    let mut months: BTreeMap<MonthKey, (MonthlyAggregate, BTreeSet<&str>)> = BTreeMap::new();
    let mut dropped = 0usize;

    for record in records {
        let Some(created) = record.created.as_ref() else {
            dropped += 1;
            continue;
        };
        let key = MonthKey::of(created);
        let (entry, players) = months
            .entry(key)
            .or_insert_with(|| (MonthlyAggregate::empty(key), BTreeSet::new()));

        entry.ngr += record.ngr;
        entry.commission += record.commission;
        entry.deposit_count += record.deposit_count;
        entry.withdrawal_count += record.withdrawal_count;
        entry.deposit_total += record.deposit_total;
        entry.withdrawal_total += record.withdrawal_total;
        entry.casino_ggr += record.casino_ggr;
        entry.sportsbook_ggr += record.sportsbook_ggr;
        players.insert(record.player_id.as_str());
    }

    if dropped > 0 {
        debug!("dropped {dropped} records without a parseable timestamp");
    }

    months
        .into_values()
        .map(|(mut aggregate, players)| {
            aggregate.active_players = players.len();
            aggregate
        })
        .collect()
}

/// Partitions an agent's records into per-month sets of player ids.
pub fn monthly_player_sets(records: &[ActivityRecord]) -> BTreeMap<MonthKey, BTreeSet<String>> {
    let mut months: BTreeMap<MonthKey, BTreeSet<String>> = BTreeMap::new();
    for record in records {
        if let Some(created) = record.created.as_ref() {
            months
                .entry(MonthKey::of(created))
                .or_default()
                .insert(record.player_id.clone());
        }
    }
    months
}
