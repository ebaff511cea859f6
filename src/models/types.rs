//! Type definitions for Rug Sentry
//! Events flowing in, tasks flowing through, findings flowing out

use alloy_primitives::{Address, Bytes, B256};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A contract-creation transaction as delivered by the event source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxEvent {
    /// Chain id of the network the transaction was mined on
    pub network: u64,
    /// Transaction hash
    pub hash: B256,
    /// Sender (deployer)
    pub from: Address,
    /// Destination, `None` for contract creation
    pub to: Option<Address>,
    /// Sender account nonce
    pub nonce: u64,
    /// Raw call data (init code + constructor arguments)
    pub input: Bytes,
    /// Block the transaction was included in
    pub block_number: u64,
    /// Created contract address when the event source already knows it
    #[serde(default)]
    pub created_address: Option<Address>,
}

impl TxEvent {
    /// Address of the contract created by this transaction, if it is a creation
    pub fn created_contract_address(&self) -> Option<Address> {
        if self.to.is_some() {
            return None;
        }
        Some(
            self.created_address
                .unwrap_or_else(|| self.from.create(self.nonce)),
        )
    }
}

/// A contract waiting for dynamic verification
#[derive(Debug, Clone)]
pub struct PendingTask {
    /// Unique task id (for log correlation)
    pub id: Uuid,
    /// Originating event
    pub event: TxEvent,
    /// Address of the created contract
    pub contract_address: Address,
    /// Source supplied by the caller; fetched from the explorer when absent
    pub source: Option<String>,
}

impl PendingTask {
    pub fn new(event: TxEvent, contract_address: Address) -> Self {
        Self {
            id: Uuid::new_v4(),
            event,
            contract_address,
            source: None,
        }
    }

    /// Attach already-known source code so the worker skips retrieval
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Finding severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FindingSeverity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl FindingSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingSeverity::Info => "INFO",
            FindingSeverity::Low => "LOW",
            FindingSeverity::Medium => "MEDIUM",
            FindingSeverity::High => "HIGH",
            FindingSeverity::Critical => "CRITICAL",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            FindingSeverity::Info => "ℹ️",
            FindingSeverity::Low => "🟡",
            FindingSeverity::Medium => "🟠",
            FindingSeverity::High => "🔴",
            FindingSeverity::Critical => "💀",
        }
    }
}

/// Finding type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FindingType {
    Suspicious,
}

/// Kind of entity a label points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityType {
    Address,
}

/// Entity label attached to a finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub entity_type: EntityType,
    pub entity: String,
    pub label: String,
    pub confidence: f64,
}

impl Label {
    pub fn address(entity: Address, label: impl Into<String>, confidence: f64) -> Self {
        Self {
            entity_type: EntityType::Address,
            entity: entity.to_checksum(None),
            label: label.into(),
            confidence,
        }
    }
}

/// A finalized finding, ready for the alerting transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub name: String,
    pub alert_id: String,
    pub description: String,
    pub severity: FindingSeverity,
    pub finding_type: FindingType,
    pub metadata: IndexMap<String, String>,
    pub labels: Vec<Label>,
    pub created_at: DateTime<Utc>,
}

impl Finding {
    pub fn new(
        alert_id: impl Into<String>,
        description: impl Into<String>,
        severity: FindingSeverity,
    ) -> Self {
        let alert_id = alert_id.into();
        Self {
            name: alert_id.clone(),
            alert_id,
            description: description.into(),
            severity,
            finding_type: FindingType::Suspicious,
            metadata: IndexMap::new(),
            labels: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "{} {} [{}] {}",
            self.severity.emoji(),
            self.alert_id,
            self.severity.as_str(),
            self.description
        )
    }
}

/// Snapshot of pipeline counters
#[derive(Debug, Default, Clone, Serialize)]
pub struct PipelineStatsSnapshot {
    pub submitted: u64,
    pub processed: u64,
    pub failed: u64,
    pub findings: u64,
    pub queued: usize,
}
