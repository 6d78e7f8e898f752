use std::collections::BTreeMap;
use std::fmt::Write as _;

use audioplug_sdk::FactoryInfo;
use serde::Serialize;

use crate::finding::{Category, Severity};
use crate::harness::{TestResult, TestStatus};

#[derive(Debug, Clone, Serialize)]
pub struct ClassReport {
    pub cid: String,
    pub name: String,
    pub sub_categories: String,
    pub results: Vec<TestResult>,
}

impl ClassReport {
    pub fn passed(&self) -> bool {
        self.results
            .iter()
            .all(|result| result.status != TestStatus::Failed)
    }

    pub fn result(&self, name: &str) -> Option<&TestResult> {
        self.results.iter().find(|result| result.name == name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub factory: FactoryInfo,
    pub classes: Vec<ClassReport>,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        self.classes.iter().all(ClassReport::passed)
    }

    /// Violations per category over the whole run.
    pub fn violation_categories(&self) -> BTreeMap<Category, usize> {
        let mut counts = BTreeMap::new();
        for finding in self
            .classes
            .iter()
            .flat_map(|class| &class.results)
            .flat_map(|result| result.violations())
        {
            *counts.entry(finding.category).or_insert(0) += 1;
        }
        counts
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_text(&self, verbose: bool) -> String {
        let mut out = String::new();
        let vendor = if self.factory.vendor.is_empty() {
            "unknown vendor"
        } else {
            &self.factory.vendor
        };
        let _ = writeln!(out, "factory: {vendor}");

        let (mut passed, mut failed, mut skipped) = (0usize, 0usize, 0usize);
        for class in &self.classes {
            let _ = writeln!(out, "\n{} [{}] {}", class.name, class.sub_categories, class.cid);
            for result in &class.results {
                let tag = match result.status {
                    TestStatus::Passed => {
                        passed += 1;
                        "PASS"
                    }
                    TestStatus::Failed => {
                        failed += 1;
                        "FAIL"
                    }
                    TestStatus::Skipped => {
                        skipped += 1;
                        "SKIP"
                    }
                };
                let _ = write!(out, "  {tag} {}/{}", result.suite, result.name);
                if let Some(message) = &result.message {
                    let _ = write!(out, ": {message}");
                }
                out.push('\n');
                for finding in &result.findings {
                    let shown = verbose
                        || (result.status == TestStatus::Failed
                            && finding.severity == Severity::Violation);
                    if shown {
                        let marker = match finding.severity {
                            Severity::Violation => "!",
                            Severity::Advisory => "~",
                        };
                        let _ = writeln!(out, "      {marker} {} {}", finding.category, finding.message);
                    }
                }
            }
        }

        let _ = writeln!(out, "\n{passed} passed, {failed} failed, {skipped} skipped");
        let categories = self.violation_categories();
        if !categories.is_empty() {
            let _ = writeln!(out, "violations:");
            for (category, count) in categories {
                let _ = writeln!(out, "  {category} x{count}");
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::Suite;
    use crate::finding::Finding;

    fn result(status: TestStatus, findings: Vec<Finding>) -> TestResult {
        TestResult {
            name: "events",
            suite: Suite::Processing,
            status,
            message: None,
            findings,
        }
    }

    fn finding(category: Category, severity: Severity) -> Finding {
        Finding {
            category,
            severity,
            message: "detail".into(),
            test: Some("events".into()),
        }
    }

    #[test]
    fn failures_are_enumerated_by_category() {
        let report = RunReport {
            factory: FactoryInfo::default(),
            classes: vec![ClassReport {
                cid: "00".into(),
                name: "Thing".into(),
                sub_categories: "Fx".into(),
                results: vec![
                    result(
                        TestStatus::Failed,
                        vec![
                            finding(Category::EventOutOfOrder, Severity::Violation),
                            finding(Category::EventOutOfOrder, Severity::Violation),
                            finding(Category::RepeatedActivation, Severity::Advisory),
                        ],
                    ),
                    result(TestStatus::Passed, vec![]),
                ],
            }],
        };
        assert!(!report.passed());
        let categories = report.violation_categories();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[&Category::EventOutOfOrder], 2);

        let text = report.render_text(false);
        assert!(text.contains("FAIL processing/events"));
        assert!(text.contains("events.out-of-order x2"));
        assert!(!text.contains("lifecycle.repeated-activation"));
        assert!(report.render_text(true).contains("lifecycle.repeated-activation"));

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["classes"][0]["results"][0]["status"], "failed");
        assert_eq!(
            json["classes"][0]["results"][0]["findings"][0]["category"],
            "events.out-of-order"
        );
    }
}
