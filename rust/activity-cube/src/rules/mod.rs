//! Recording rules that pre-aggregate every grouping/legend combination.
//!
//! Rules are rebuilt from the dimension whitelist and the scenario list on
//! every call; nothing is persisted except through [`write_rules_file`].

mod document;

pub use document::{write_rules_file, RulesDocument};

use crate::{
    dimension::Dimension,
    promql::{Node, RangeWindow, Selector, ACTIVITY_METRIC},
    time::parse_duration,
};
use anyhow::{bail, Context};
use std::collections::BTreeMap;

/// Labels every pre-aggregated series keeps.
const BASE_LABELS: [&str; 4] = ["sys_id", "sys_scope", "sys_type", "datname"];

const GROUP_PREFIX: &str = "activity_cube_recording_rules";

/// A pre-aggregation window: average over `duration`, evaluated every `step`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeScenario {
    duration: String,
    step: String,
    step_millis: i64,
}

impl TimeScenario {
    pub fn new(duration: &str, step: &str) -> anyhow::Result<Self> {
        let duration = duration.trim();
        let step = step.trim();
        parse_duration(duration)
            .with_context(|| format!("invalid scenario duration '{duration}'"))?;
        let step_millis = parse_duration(step)
            .with_context(|| format!("invalid scenario step '{step}'"))?
            .num_milliseconds();

        Ok(Self {
            duration: duration.to_string(),
            step: step.to_string(),
            step_millis,
        })
    }

    /// Parses `duration:step`, e.g. `6h:10m`.
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let Some((duration, step)) = raw.split_once(':') else {
            bail!("scenario '{raw}' must be of the form duration:step");
        };
        Self::new(duration, step)
    }

    /// Comma-separated list of scenarios.
    pub fn parse_list(raw: &str) -> anyhow::Result<Vec<Self>> {
        let scenarios = raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(Self::parse)
            .collect::<anyhow::Result<Vec<_>>>()?;
        if scenarios.is_empty() {
            bail!("at least one rule scenario is required");
        }
        Ok(scenarios)
    }

    pub fn duration(&self) -> &str {
        &self.duration
    }

    pub fn step(&self) -> &str {
        &self.step
    }

    fn suffix(&self) -> String {
        self.step.replace('.', "_")
    }
}

pub fn default_scenarios() -> Vec<TimeScenario> {
    vec![TimeScenario {
        duration: "6h".to_string(),
        step: "10m".to_string(),
        step_millis: 600_000,
    }]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingRule {
    pub record: String,
    pub expr: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingRuleGroup {
    pub name: String,
    pub interval: String,
    pub rules: Vec<RecordingRule>,
}

/// Rules for the built-in scenario list.
pub fn generate_all() -> Vec<RecordingRuleGroup> {
    generate_for(&default_scenarios())
}

/// One group per distinct step, ordered by interval ascending.
pub fn generate_for(scenarios: &[TimeScenario]) -> Vec<RecordingRuleGroup> {
    let mut groups: BTreeMap<(i64, &str), RecordingRuleGroup> = BTreeMap::new();

    for scenario in scenarios {
        let group = groups
            .entry((scenario.step_millis, scenario.step.as_str()))
            .or_insert_with(|| RecordingRuleGroup {
                name: format!("{GROUP_PREFIX}_{}", scenario.suffix()),
                interval: scenario.step.clone(),
                rules: Vec::new(),
            });

        for dim in Dimension::ALL {
            for legend in Dimension::legends() {
                group.rules.push(RecordingRule {
                    record: rule_name(scenario, dim, legend),
                    expr: rule_expr(scenario, dim, legend).render(),
                });
            }
        }
    }

    groups.into_values().collect()
}

fn rule_name(scenario: &TimeScenario, dim: Dimension, legend: Dimension) -> String {
    format!(
        "{ACTIVITY_METRIC}:sum_by_{dim}__{legend}_{}",
        scenario.suffix()
    )
}

fn rule_expr(scenario: &TimeScenario, dim: Dimension, legend: Dimension) -> Node {
    let extra = if dim.is_time() {
        vec![legend]
    } else if dim == legend {
        vec![dim]
    } else {
        vec![dim, legend]
    };

    let mut by = BASE_LABELS.to_vec();
    by.extend(
        extra
            .iter()
            .filter_map(|extra| extra.label())
            .filter(|label| *label != Dimension::Datname.as_str()),
    );

    let sum = Node::sum_by(by, Selector::activity().into());
    if dim.is_time() {
        sum
    } else {
        Node::avg_over_time(
            sum,
            RangeWindow::with_step(scenario.duration.as_str(), scenario.step.as_str()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn find<'a>(group: &'a RecordingRuleGroup, record: &str) -> &'a RecordingRule {
        group
            .rules
            .iter()
            .find(|rule| rule.record == record)
            .unwrap_or_else(|| panic!("missing rule {record}"))
    }

    #[test]
    fn default_scenario_yields_one_group_of_56_rules() {
        let groups = generate_all();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "activity_cube_recording_rules_10m");
        assert_eq!(groups[0].interval, "10m");
        assert_eq!(groups[0].rules.len(), 56);
    }

    #[test]
    fn rule_names_are_unique() {
        let groups = generate_all();
        let mut names: Vec<_> = groups[0].rules.iter().map(|r| r.record.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 56);
    }

    #[test]
    fn time_rules_have_no_window() {
        let groups = generate_all();
        let group = &groups[0];

        assert_eq!(
            find(group, "cc_pg_stat_activity:sum_by_time__usename_10m").expr,
            "sum by(sys_id, sys_scope, sys_type, datname, usename)(cc_pg_stat_activity{})"
        );
        assert_eq!(
            find(group, "cc_pg_stat_activity:sum_by_time__datname_10m").expr,
            "sum by(sys_id, sys_scope, sys_type, datname)(cc_pg_stat_activity{})"
        );
    }

    #[test]
    fn dimension_rules_average_over_scenario() {
        let groups = generate_all();
        let group = &groups[0];

        assert_eq!(
            find(group, "cc_pg_stat_activity:sum_by_query__query_10m").expr,
            "avg_over_time(sum by(sys_id, sys_scope, sys_type, datname, query)(cc_pg_stat_activity{})[6h:10m])"
        );
        assert_eq!(
            find(group, "cc_pg_stat_activity:sum_by_datname__datname_10m").expr,
            "avg_over_time(sum by(sys_id, sys_scope, sys_type, datname)(cc_pg_stat_activity{})[6h:10m])"
        );
        assert_eq!(
            find(group, "cc_pg_stat_activity:sum_by_usename__wait_event_name_10m").expr,
            "avg_over_time(sum by(sys_id, sys_scope, sys_type, datname, usename, wait_event_name)(cc_pg_stat_activity{})[6h:10m])"
        );
        assert_eq!(
            find(group, "cc_pg_stat_activity:sum_by_client_addr__datname_10m").expr,
            "avg_over_time(sum by(sys_id, sys_scope, sys_type, datname, client_addr)(cc_pg_stat_activity{})[6h:10m])"
        );
    }

    #[test]
    fn groups_are_keyed_and_sorted_by_step() {
        let scenarios = TimeScenario::parse_list("1d:1h, 6h:10m, 2h:10m, 30m:1.5m").unwrap();
        let groups = generate_for(&scenarios);

        let intervals: Vec<_> = groups.iter().map(|g| g.interval.as_str()).collect();
        let names: Vec<_> = groups.iter().map(|g| g.name.as_str()).collect();
        let sizes: Vec<_> = groups.iter().map(|g| g.rules.len()).collect();
        assert_eq!(intervals, vec!["1.5m", "10m", "1h"]);
        assert_eq!(
            names,
            vec![
                "activity_cube_recording_rules_1_5m",
                "activity_cube_recording_rules_10m",
                "activity_cube_recording_rules_1h",
            ]
        );
        assert_eq!(sizes, vec![56, 112, 56]);
    }

    #[test]
    fn scenario_parsing_rejects_bad_input() {
        assert!(TimeScenario::parse("6h").is_err());
        assert!(TimeScenario::parse("6h:soon").is_err());
        assert!(TimeScenario::parse_list(" , ").is_err());
        assert_eq!(TimeScenario::parse("6h:10m").unwrap(), default_scenarios()[0]);
    }
}
