//! Agent entry point
//!
//! `RugPullAgent::handle_transaction` is the fast path: derive the created
//! address, enqueue, hand back whatever the worker staged since last time.
//! `ContractInspector` is the slow path the worker runs for each contract.

use std::sync::Arc;

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, info};

use crate::core::classifier::classify;
use crate::core::decoder::{constructor_signature, decode_constructor_args, extract_constructor_args};
use crate::core::harness::synthesize;
use crate::core::interpreter::interpret;
use crate::core::pipeline::TaskPipeline;
use crate::core::traits::{ChainReader, SourceProvider, TaskProcessor, VerificationEngine};
use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::models::types::{Finding, PendingTask, TxEvent};
use crate::utils::constants::SEEN_CONTRACTS_CAP;

/// Event-handling entry point
pub struct RugPullAgent {
    pipeline: Arc<TaskPipeline>,
    processor: Arc<dyn TaskProcessor>,
    /// Contracts already queued (creation events can be delivered twice)
    seen: DashMap<Address, ()>,
}

impl RugPullAgent {
    pub fn new(pipeline: Arc<TaskPipeline>, processor: Arc<dyn TaskProcessor>) -> Self {
        Self {
            pipeline,
            processor,
            seen: DashMap::new(),
        }
    }

    /// Start the background consumer; safe to call repeatedly
    pub fn initialize(&self) -> bool {
        self.pipeline.start_consumer(self.processor.clone())
    }

    pub fn pipeline(&self) -> &Arc<TaskPipeline> {
        &self.pipeline
    }

    /// Queue the contract created by `event` and return staged findings
    ///
    /// Starts the consumer on first use when called inside a Tokio runtime.
    /// Outside one, the contract is still queued and waits for `initialize`.
    pub fn handle_transaction(&self, event: &TxEvent) -> Vec<Finding> {
        self.enqueue(event, None);
        self.pipeline.drain_findings()
    }

    /// Same as `handle_transaction` for callers that already hold the source
    pub fn handle_transaction_with_source(&self, event: &TxEvent, source: &str) -> Vec<Finding> {
        self.enqueue(event, Some(source));
        self.pipeline.drain_findings()
    }

    fn enqueue(&self, event: &TxEvent, source: Option<&str>) {
        self.initialize();

        let Some(contract) = event.created_contract_address() else {
            return;
        };
        if self.seen.len() > SEEN_CONTRACTS_CAP {
            self.seen.clear();
        }
        if self.seen.insert(contract, ()).is_some() {
            debug!("🔁 {} already queued", contract);
            return;
        }

        let mut task = PendingTask::new(event.clone(), contract);
        if let Some(source) = source {
            task = task.with_source(source);
        }
        let queued = self.pipeline.submit(task);
        info!(
            "📥 Queued {} deployed by {} (block {}, queue: {})",
            contract, event.from, event.block_number, queued
        );
    }
}

/// Slow path for one queued contract
pub struct ContractInspector {
    sources: Arc<dyn SourceProvider>,
    chain: Arc<dyn ChainReader>,
    engine: Arc<dyn VerificationEngine>,
}

impl ContractInspector {
    pub fn new(
        sources: Arc<dyn SourceProvider>,
        chain: Arc<dyn ChainReader>,
        engine: Arc<dyn VerificationEngine>,
    ) -> Self {
        Self {
            sources,
            chain,
            engine,
        }
    }

    async fn source_for(&self, task: &PendingTask) -> AppResult<String> {
        if let Some(source) = &task.source {
            return Ok(source.clone());
        }
        self.sources
            .fetch_source(task.event.network, task.contract_address)
            .await?
            .ok_or_else(|| {
                AppError::new(
                    ErrorCode::SourceNotFound,
                    format!("no verified source for {}", task.contract_address),
                )
            })
    }
}

#[async_trait]
impl TaskProcessor for ContractInspector {
    async fn process(&self, task: &PendingTask) -> AppResult<Vec<Finding>> {
        let contract = task.contract_address;
        let source = self.source_for(task).await?;

        let profile = classify(&source)?;
        if !profile.is_testable() {
            debug!("⏭️ {} ({}) is neither token nor ownable", contract, profile.entry_name);
            return Ok(Vec::new());
        }

        let signature = constructor_signature(&profile)?;
        let runtime = self.chain.get_code(contract).await?;
        let takes_arguments = signature
            .as_ref()
            .map(|s| !s.params.is_empty())
            .unwrap_or(false);

        let blob = match extract_constructor_args(&task.event.input, &runtime) {
            Some(blob) => blob,
            None if !takes_arguments => Bytes::new(),
            None => {
                return Err(AppError::new(
                    ErrorCode::BytecodeSuffixNotFound,
                    format!("runtime code of {} not found in deployment input", contract),
                ))
            }
        };
        let args = decode_constructor_args(signature.as_ref(), &blob)?;

        let harness = synthesize(&source, &profile, &args)?;
        info!(
            "🧪 Verifying {} ({}) with {} invariant test(s) at block {}",
            contract,
            profile.entry_name,
            harness.suite.contracts.len(),
            task.event.block_number
        );

        let report = self
            .engine
            .run(&harness.render(), task.event.block_number)
            .await;
        if report.is_empty() {
            debug!("Engine returned no results for {}", contract);
        }

        Ok(interpret(&report, task.event.from, contract, &profile.supply))
    }
}
