//! Core Module - Contract intelligence and dynamic verification
//!
//! Classifier, constructor decoder, harness synthesizer, task pipeline and
//! result interpreter, wired together by the agent.

pub mod agent;
pub mod classifier;
pub mod decoder;
pub mod harness;
pub mod interpreter;
pub mod pipeline;
pub mod supply;
pub mod traits;

pub use agent::{ContractInspector, RugPullAgent};
pub use classifier::{classify, classify_with_entry, ContractProfile};
pub use decoder::{ConstructorSignature, DecodedArguments, ParamType};
pub use harness::{Harness, InjectionPlan, Technique, TestSuite};
pub use interpreter::{interpret, TestReport};
pub use pipeline::{PipelineStats, TaskPipeline};
pub use supply::SupplyReport;
pub use traits::{ChainReader, SourceProvider, TaskProcessor, VerificationEngine};
