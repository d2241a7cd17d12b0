//! Label matchers for the activity selector.
//!
//! Every user-supplied value is regex-escaped before it reaches a matcher;
//! label names only ever come from [`Dimension`].

use super::{split_values, ActivityPlan, BLANK_PLACEHOLDER, CPU_WAIT_EVENT};
use crate::{
    dimension::Dimension,
    error::{Result, ServiceError},
    promql::Selector,
};

const WAIT_EVENT_TYPE_LABEL: &str = "wait_event_type";
const WAIT_EVENT_LABEL: &str = "wait_event";

pub(super) fn build(plan: &ActivityPlan) -> Selector {
    let mut selector = Selector::activity().regex_match(
        Dimension::Datname.as_str(),
        alternation(plan.databases.iter().map(String::as_str)),
    );

    // Always matches; kept for parity with existing dashboards.
    if plan.dim == Dimension::Query {
        selector.insert(Dimension::Query.as_str(), ".*");
    }

    for (label, pattern) in &plan.filter {
        selector.insert(*label, pattern.clone());
    }

    selector
}

/// Matchers restricting `dim` to the comma-separated `selected` values.
pub(super) fn filter_matchers(
    dim: Dimension,
    selected: &str,
) -> Result<Vec<(&'static str, String)>> {
    match dim {
        Dimension::Time => Ok(Vec::new()),
        Dimension::WaitEventName => wait_event_matchers(selected),
        other => {
            let values: Vec<_> = split_values(selected).map(blank_to_empty).collect();
            if values.is_empty() {
                return Ok(Vec::new());
            }
            Ok(vec![(other.as_str(), alternation(values))])
        }
    }
}

// Values arrive as `type:event`; the legend shows idle backends as `CPU`.
fn wait_event_matchers(selected: &str) -> Result<Vec<(&'static str, String)>> {
    let mut types = Vec::new();
    let mut events = Vec::new();

    for value in split_values(selected) {
        let (wait_type, event) = if value == CPU_WAIT_EVENT {
            ("", "")
        } else {
            value.split_once(':').ok_or_else(|| {
                ServiceError::InvalidFilterSelector(format!(
                    "wait event '{value}' must be of the form type:event"
                ))
            })?
        };

        types.push(blank_to_empty(wait_type));
        events.push(if event == CPU_WAIT_EVENT {
            ""
        } else {
            blank_to_empty(event)
        });
    }

    if types.is_empty() {
        return Ok(Vec::new());
    }

    Ok(vec![
        (WAIT_EVENT_TYPE_LABEL, alternation(types)),
        (WAIT_EVENT_LABEL, alternation(events)),
    ])
}

fn blank_to_empty(value: &str) -> &str {
    if value == BLANK_PLACEHOLDER {
        ""
    } else {
        value
    }
}

fn alternation<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    values
        .into_iter()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn general_filter_escapes_and_maps_blank() {
        let matchers =
            filter_matchers(Dimension::ApplicationName, "psql, app.v2,<empty>").unwrap();
        assert_eq!(
            matchers,
            vec![("application_name", r"psql|app\.v2|".to_string())]
        );
    }

    #[test]
    fn wait_event_filter_splits_pairs() {
        let matchers =
            filter_matchers(Dimension::WaitEventName, "Lock:relation,IO:DataFileRead,CPU").unwrap();
        assert_eq!(
            matchers,
            vec![
                ("wait_event_type", "Lock|IO|".to_string()),
                ("wait_event", "relation|DataFileRead|".to_string()),
            ]
        );
    }

    #[test]
    fn wait_event_cpu_and_blank_events_mean_empty() {
        let matchers =
            filter_matchers(Dimension::WaitEventName, "Activity:CPU,<empty>:<empty>").unwrap();
        assert_eq!(matchers[0].1, "Activity|");
        assert_eq!(matchers[1].1, "|");
    }

    #[test]
    fn wait_event_without_separator_is_rejected() {
        let err = filter_matchers(Dimension::WaitEventName, "Lock:relation,ClientRead").unwrap_err();
        assert!(matches!(err, ServiceError::InvalidFilterSelector(_)));
    }

    #[test]
    fn separator_only_selection_adds_no_matcher() {
        assert!(filter_matchers(Dimension::Usename, ",,").unwrap().is_empty());
        assert!(filter_matchers(Dimension::WaitEventName, " , ").unwrap().is_empty());
    }

    #[test]
    fn injection_attempts_are_escaped() {
        let matchers = filter_matchers(Dimension::Usename, r#"x"} or vector(1) #"#).unwrap();
        assert_eq!(matchers[0].1, r#"x"\} or vector\(1\) \#"#);
    }
}
