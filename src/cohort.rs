//! Player-level cohort analysis: month-over-month retention and the split of
//! each month's actives into new and returning players.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{GrowthRow, MonthKey, RetentionRow};

pub type MonthlyPlayers = BTreeMap<MonthKey, BTreeSet<String>>;

/// One row per consecutive pair of observed months.
pub fn retention(agent_id: i64, months: &MonthlyPlayers) -> Vec<RetentionRow> {
    let ordered: Vec<(&MonthKey, &BTreeSet<String>)> = months.iter().collect();
    ordered
        .windows(2)
        .map(|pair| {
            let (previous_month, previous) = pair[0];
            let (month, current) = pair[1];
            let retained = previous.intersection(current).count();
            RetentionRow {
                agent_id,
                previous_month: *previous_month,
                month: *month,
                previous_players: previous.len(),
                retained_players: retained,
                retention_rate: percentage(retained, previous.len()),
            }
        })
        .collect()
}

/// Players seen in any month committed so far.
#[derive(Debug, Default)]
struct PlayerHistory {
    seen: BTreeSet<String>,
}

struct MonthDiff {
    new_players: usize,
    returning_players: usize,
}

impl PlayerHistory {
    /// New players were never seen before. Returning players were seen
    /// before, missed the previous month and came back.
    fn diff(&self, current: &BTreeSet<String>, previous: &BTreeSet<String>) -> MonthDiff {
        let new: BTreeSet<&String> = current.difference(&self.seen).collect();
        let returning = current
            .difference(previous)
            .filter(|player| !new.contains(player))
            .count();
        MonthDiff {
            new_players: new.len(),
            returning_players: returning,
        }
    }

    fn commit(&mut self, current: &BTreeSet<String>) {
        self.seen.extend(current.iter().cloned());
    }
}

pub fn organic_growth(agent_id: i64, months: &MonthlyPlayers) -> Vec<GrowthRow> {
    let mut history = PlayerHistory::default();
    let mut previous: Option<&BTreeSet<String>> = None;
    let mut rows = Vec::with_capacity(months.len());

    for (month, current) in months {
        let diff = match previous {
            None => MonthDiff {
                new_players: current.len(),
                returning_players: 0,
            },
            Some(previous) => history.diff(current, previous),
        };
        history.commit(current);

        rows.push(GrowthRow {
            agent_id,
            month: *month,
            total_players: current.len(),
            new_players: diff.new_players,
            returning_players: diff.returning_players,
            pct_new: percentage(diff.new_players, current.len()),
        });
        previous = Some(current);
    }

    rows
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}
