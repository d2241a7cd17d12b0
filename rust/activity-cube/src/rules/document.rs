//! Rule configuration document in the format the store's ruler loads.

use super::RecordingRuleGroup;
use anyhow::Context;
use std::{fmt, path::Path};
use tracing::info;

/// Renders groups as a `groups:` document. Expressions are written verbatim
/// and every group block ends with one blank line.
pub struct RulesDocument<'a>(pub &'a [RecordingRuleGroup]);

impl fmt::Display for RulesDocument<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "groups:")?;
        for group in self.0 {
            writeln!(f, "  - name: {}", group.name)?;
            writeln!(f, "    interval: {}", group.interval)?;
            writeln!(f, "    rules:")?;
            for rule in &group.rules {
                writeln!(f, "      - record: {}", rule.record)?;
                writeln!(f, "        expr: {}", rule.expr)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Writes the document for `groups` to `path`, creating parent directories.
pub async fn write_rules_file(path: &Path, groups: &[RecordingRuleGroup]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let document = RulesDocument(groups).to_string();
    tokio::fs::write(path, document)
        .await
        .with_context(|| format!("failed to write recording rules to {}", path.display()))?;

    let rules: usize = groups.iter().map(|group| group.rules.len()).sum();
    info!(path = %path.display(), groups = groups.len(), rules, "wrote recording rules");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{generate_all, RecordingRule};
    use pretty_assertions::assert_eq;

    fn group(name: &str, interval: &str, records: &[(&str, &str)]) -> RecordingRuleGroup {
        RecordingRuleGroup {
            name: name.to_string(),
            interval: interval.to_string(),
            rules: records
                .iter()
                .map(|(record, expr)| RecordingRule {
                    record: record.to_string(),
                    expr: expr.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn renders_exact_layout() {
        let groups = vec![
            group("g_1m", "1m", &[("a:sum", "sum(a{})"), ("b:sum", r#"sum(b{x=~"y"})"#)]),
            group("g_10m", "10m", &[("c:sum", "sum by(x)(c{})")]),
        ];

        let expected = concat!(
            "groups:\n",
            "  - name: g_1m\n",
            "    interval: 1m\n",
            "    rules:\n",
            "      - record: a:sum\n",
            "        expr: sum(a{})\n",
            "      - record: b:sum\n",
            "        expr: sum(b{x=~\"y\"})\n",
            "\n",
            "  - name: g_10m\n",
            "    interval: 10m\n",
            "    rules:\n",
            "      - record: c:sum\n",
            "        expr: sum by(x)(c{})\n",
            "\n",
        );
        assert_eq!(RulesDocument(&groups).to_string(), expected);
    }

    #[test]
    fn default_document_lists_every_rule() {
        let groups = generate_all();
        let document = RulesDocument(&groups).to_string();

        assert!(document.starts_with(
            "groups:\n  - name: activity_cube_recording_rules_10m\n    interval: 10m\n    rules:\n"
        ));
        assert_eq!(document.matches("      - record: ").count(), 56);
        assert_eq!(document.matches("        expr: ").count(), 56);
        assert!(document.ends_with(")\n\n"));
    }

    #[tokio::test]
    async fn writes_document_to_nested_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules").join("activity.yml");
        let groups = generate_all();

        write_rules_file(&path, &groups).await.unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(written, RulesDocument(&groups).to_string());
    }
}
