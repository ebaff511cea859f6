//! Result Interpreter
//!
//! Turns the engine's JSON report into findings. Only contracts from the
//! synthesized test file count, sub-tests are ANDed (setup excluded), VM faults
//! are inconclusive, and two or more failing techniques escalate to an
//! aggregate high-severity finding.

use alloy_primitives::Address;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use crate::core::harness::Technique;
use crate::core::supply::SupplyReport;
use crate::models::types::{Finding, FindingSeverity, Label};
use crate::utils::constants::{
    AGGREGATE_ALERT_ID, AGGREGATE_CONFIDENCE, AGGREGATE_THRESHOLD, SETUP_TEST_NAME,
    SINGLE_TECHNIQUE_CONFIDENCE, TEST_FILE_PATH, VM_FAULT_MARKER,
};

/// Result of one test function
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubTestResult {
    /// Older forge releases
    #[serde(default)]
    pub success: Option<bool>,
    /// Newer forge releases (`"Success"`, `"Failure"`, `"Skipped"`)
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub counterexample: Option<Value>,
}

impl SubTestResult {
    /// Missing verdicts count as passing
    pub fn passed(&self) -> bool {
        match (self.success, self.status.as_deref()) {
            (Some(success), _) => success,
            (None, Some(status)) => !status.eq_ignore_ascii_case("failure"),
            (None, None) => true,
        }
    }

    fn is_vm_fault(&self) -> bool {
        self.reason
            .as_deref()
            .map(|r| r.trim_start().starts_with(VM_FAULT_MARKER))
            .unwrap_or(false)
    }
}

/// Results of one test contract
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractResult {
    #[serde(default)]
    pub test_results: IndexMap<String, SubTestResult>,
}

/// Engine report keyed by `path:Contract`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestReport {
    pub contracts: IndexMap<String, ContractResult>,
}

impl TestReport {
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// Fold another report in (line-delimited output)
    pub fn merge(&mut self, other: TestReport) {
        for (key, result) in other.contracts {
            self.contracts
                .entry(key)
                .or_default()
                .test_results
                .extend(result.test_results);
        }
    }
}

/// A technique whose invariant was falsified
#[derive(Debug, Clone, PartialEq)]
pub struct TechniqueFailure {
    pub technique: Technique,
    pub reason: String,
    pub counterexample: Option<Value>,
}

/// Conclusive failures, one per technique
pub fn failed_techniques(report: &TestReport) -> Vec<TechniqueFailure> {
    let prefix = format!("{}:", TEST_FILE_PATH);
    let mut failures: BTreeMap<Technique, TechniqueFailure> = BTreeMap::new();

    for (key, result) in &report.contracts {
        let Some(contract_name) = key.strip_prefix(&prefix) else {
            continue;
        };
        let Some(technique) = Technique::from_test_contract_name(contract_name) else {
            debug!("Ignoring unknown test contract {}", contract_name);
            continue;
        };

        let failing: Vec<&SubTestResult> = result
            .test_results
            .iter()
            .filter(|(name, _)| name.as_str() != SETUP_TEST_NAME)
            .map(|(_, sub)| sub)
            .filter(|sub| !sub.passed())
            .collect();
        if failing.is_empty() {
            continue;
        }

        let Some(conclusive) = failing.iter().find(|sub| !sub.is_vm_fault()) else {
            debug!(
                "⚪ {} failed with a VM fault only, treating as inconclusive",
                technique.name()
            );
            continue;
        };

        failures.entry(technique).or_insert_with(|| TechniqueFailure {
            technique,
            reason: conclusive.reason.clone().unwrap_or_default(),
            counterexample: conclusive.counterexample.clone(),
        });
    }

    failures.into_values().collect()
}

fn technique_alert_id(technique: Technique) -> String {
    format!("HARD-RUG-PULL-{}-DYNAMIC", technique.alert_tag())
}

fn labelled(finding: Finding, deployer: Address, contract: Address, confidence: f64) -> Finding {
    finding
        .with_label(Label::address(deployer, "scam", confidence))
        .with_label(Label::address(contract, "scam-contract", confidence))
}

/// Findings for one verified contract
pub fn interpret(
    report: &TestReport,
    deployer: Address,
    contract: Address,
    supply: &SupplyReport,
) -> Vec<Finding> {
    let failures = failed_techniques(report);
    let deployer_hex = deployer.to_checksum(None);
    let contract_hex = contract.to_checksum(None);
    let mut findings = Vec::with_capacity(failures.len() + 1);

    for failure in &failures {
        let description = format!(
            "{} deployed a token contract {} that may result in a hard rug pull ({})",
            deployer_hex,
            contract_hex,
            failure.technique.name()
        );
        let mut finding = Finding::new(
            technique_alert_id(failure.technique),
            description,
            FindingSeverity::Medium,
        )
        .with_metadata("attacker_deployer_address", deployer_hex.clone())
        .with_metadata("token_contract_address", contract_hex.clone())
        .with_metadata("failure_reason", failure.reason.clone());

        if let Some(counterexample) = &failure.counterexample {
            finding = finding.with_metadata("counterexample", counterexample.to_string());
        }
        if failure.technique == Technique::HiddenMint && !supply.is_empty() {
            finding = finding.with_metadata("supply_increasing_functions", supply.describe());
        }

        findings.push(labelled(
            finding,
            deployer,
            contract,
            SINGLE_TECHNIQUE_CONFIDENCE,
        ));
    }

    if failures.len() >= AGGREGATE_THRESHOLD {
        let techniques: Vec<String> = failures.iter().map(|f| f.technique.alert_tag()).collect();
        let description = format!(
            "{} deployed a token contract {} that may result in a hard rug pull",
            deployer_hex, contract_hex
        );
        let finding = Finding::new(AGGREGATE_ALERT_ID, description, FindingSeverity::High)
            .with_metadata("attacker_deployer_address", deployer_hex.clone())
            .with_metadata("token_contract_address", contract_hex.clone())
            .with_metadata("rugpull_techniques", techniques.join(", "));
        findings.push(labelled(finding, deployer, contract, AGGREGATE_CONFIDENCE));
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report(value: Value) -> TestReport {
        serde_json::from_value(value).unwrap()
    }

    fn addrs() -> (Address, Address) {
        (Address::repeat_byte(0xde), Address::repeat_byte(0xc0))
    }

    #[test]
    fn test_sub_test_verdicts() {
        let legacy = SubTestResult {
            success: Some(false),
            ..Default::default()
        };
        assert!(!legacy.passed());
        let modern = SubTestResult {
            status: Some("Success".into()),
            ..Default::default()
        };
        assert!(modern.passed());
        let failed = SubTestResult {
            status: Some("Failure".into()),
            ..Default::default()
        };
        assert!(!failed.passed());
        assert!(SubTestResult::default().passed());
    }

    #[test]
    fn test_honeypot_single_finding() {
        let (deployer, contract) = addrs();
        let report = report(json!({
            "test/test.sol:DynamicHoneypotTest": {
                "duration": "1s",
                "test_results": {
                    "setUp()": {"success": true},
                    "invariant_honeypot()": {
                        "success": false,
                        "reason": "assertion failed: 0 <= 0",
                        "counterexample": {"sequence": []}
                    }
                }
            },
            "test/test.sol:DynamicHiddenMintTest": {
                "test_results": {"invariant_hiddenMint()": {"success": true}}
            }
        }));

        let findings = interpret(&report, deployer, contract, &SupplyReport::default());
        assert_eq!(findings.len(), 1);
        let finding = &findings[0];
        assert_eq!(finding.alert_id, "HARD-RUG-PULL-HONEYPOT-DYNAMIC");
        assert_eq!(finding.severity, FindingSeverity::Medium);
        assert_eq!(
            finding.metadata.get("failure_reason").map(String::as_str),
            Some("assertion failed: 0 <= 0")
        );
        assert!(finding.metadata.contains_key("counterexample"));
        assert_eq!(finding.labels.len(), 2);
        assert_eq!(finding.labels[0].label, "scam");
        assert_eq!(finding.labels[1].label, "scam-contract");
        assert_eq!(finding.labels[0].confidence, SINGLE_TECHNIQUE_CONFIDENCE);
    }

    #[test]
    fn test_two_techniques_escalate() {
        let (deployer, contract) = addrs();
        let report = report(json!({
            "test/test.sol:DynamicHoneypotTest": {
                "test_results": {"invariant_honeypot()": {"status": "Failure", "reason": "revert"}}
            },
            "test/test.sol:DynamicHiddenMintTest": {
                "test_results": {"invariant_hiddenMint()": {"status": "Failure", "reason": "assertion failed"}}
            }
        }));
        let mut supply = SupplyReport::default();
        supply.public.insert("mint".to_string());

        let findings = interpret(&report, deployer, contract, &supply);
        assert_eq!(findings.len(), 3);

        let medium = findings
            .iter()
            .filter(|f| f.severity == FindingSeverity::Medium)
            .count();
        assert_eq!(medium, 2);

        let aggregate = findings.last().unwrap();
        assert_eq!(aggregate.alert_id, AGGREGATE_ALERT_ID);
        assert_eq!(aggregate.severity, FindingSeverity::High);
        assert_eq!(
            aggregate.metadata.get("rugpull_techniques").map(String::as_str),
            Some("HONEYPOT, HIDDENMINT")
        );
        assert_eq!(aggregate.labels[0].confidence, AGGREGATE_CONFIDENCE);

        let mint = findings
            .iter()
            .find(|f| f.alert_id == "HARD-RUG-PULL-HIDDENMINT-DYNAMIC")
            .unwrap();
        assert_eq!(
            mint.metadata.get("supply_increasing_functions").map(String::as_str),
            Some("mint")
        );
    }

    #[test]
    fn test_vm_fault_is_inconclusive() {
        let (deployer, contract) = addrs();
        let report = report(json!({
            "test/test.sol:DynamicHiddenTransferRevertTest": {
                "test_results": {
                    "invariant_hiddenTransferRevert()": {
                        "success": false,
                        "reason": "EvmError: OutOfGas"
                    }
                }
            }
        }));
        assert!(failed_techniques(&report).is_empty());
        assert!(interpret(&report, deployer, contract, &SupplyReport::default()).is_empty());
    }

    #[test]
    fn test_setup_and_foreign_keys_ignored() {
        let report = report(json!({
            "test/test.sol:DynamicHoneypotTest": {
                "test_results": {"setUp()": {"success": false, "reason": "setup failed"}}
            },
            "test/Other.t.sol:DynamicHiddenMintTest": {
                "test_results": {"invariant_hiddenMint()": {"success": false, "reason": "x"}}
            },
            "test/test.sol:SomethingElse": {
                "test_results": {"testFoo()": {"success": false, "reason": "x"}}
            }
        }));
        assert!(failed_techniques(&report).is_empty());
    }

    #[test]
    fn test_merge_line_delimited_reports() {
        let mut first = report(json!({
            "test/test.sol:DynamicHoneypotTest": {
                "test_results": {"invariant_honeypot()": {"success": true}}
            }
        }));
        first.merge(report(json!({
            "test/test.sol:DynamicFakeOwnershipRenunciationTest": {
                "test_results": {"invariant_fakeOwnershipRenunciation()": {"success": false, "reason": "owner restored"}}
            }
        })));
        assert_eq!(first.contracts.len(), 2);
        let failures = failed_techniques(&first);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].technique, Technique::FakeOwnershipRenunciation);
        assert_eq!(failures[0].reason, "owner restored");
    }
}
