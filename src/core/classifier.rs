//! Contract Classifier
//!
//! Parses a (flattened) Solidity compilation unit, resolves the inheritance
//! graph, picks the entry contract and aggregates its capability profile:
//!
//! 1. Collect every contract-like declaration
//! 2. Resolve the dependency tree (a contract is resolved once all its bases are)
//! 3. Select the entry contract (most-derived deployable contract)
//! 4. Walk the entry and every ancestor exactly once, collecting functions,
//!    public getters and events
//! 5. Match the accumulated surface against the token / ownable interfaces

use indexmap::IndexMap;
use solang_parser::pt::{
    self, ContractPart, ContractTy, FunctionAttribute, FunctionTy, SourceUnitPart,
    VariableAttribute, Visibility,
};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

use crate::core::supply::{self, SupplyReport};
use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::{
    BALANCE_VARIABLE_NAME, MINT_FUNCTION_NAME, OWNABLE_REQUIRED_EVENTS,
    OWNABLE_REQUIRED_FUNCTIONS, TOKEN_REQUIRED_EVENTS, TOKEN_REQUIRED_FUNCTIONS,
};

/// File number handed to solang for single-unit parsing
const SOURCE_FILE_NO: usize = 0;

/// Capability profile of the entry contract of a compilation unit
#[derive(Debug, Clone)]
pub struct ContractProfile {
    /// Name of the entry (most-derived) contract
    pub entry_name: String,
    /// AST node of the entry contract
    pub entry_contract: pt::ContractDefinition,
    /// Contract name -> direct base names, in resolution order
    pub dependency_tree: IndexMap<String, Vec<String>>,
    /// Entry contract followed by every ancestor, each once, in visit order
    pub inheritance_chain: Vec<String>,
    /// public / external / default-visibility functions and public getters
    pub callable_functions: BTreeSet<String>,
    /// internal / private functions
    pub internal_functions: BTreeSet<String>,
    /// Declared events
    pub events: BTreeSet<String>,
    /// Every contract, interface and library name declared in the unit
    pub declared_types: BTreeSet<String>,
    pub is_token_contract: bool,
    pub is_ownable_contract: bool,
    /// A `_balances` mapping exists somewhere in the inheritance chain
    pub has_balance_variable: bool,
    /// Functions that can raise total supply
    pub supply: SupplyReport,
}

impl ContractProfile {
    /// Function is callable or internal anywhere in the chain
    pub fn has_function(&self, name: &str) -> bool {
        self.callable_functions.contains(name) || self.internal_functions.contains(name)
    }

    /// The conventional mint entry point is available to an injected constructor
    pub fn has_mint_function(&self) -> bool {
        self.has_function(MINT_FUNCTION_NAME)
    }

    /// Worth running dynamic tests against
    pub fn is_testable(&self) -> bool {
        self.is_token_contract || self.is_ownable_contract
    }
}

/// Token interface check over an accumulated surface
pub fn is_token_contract(callable: &BTreeSet<String>, events: &BTreeSet<String>) -> bool {
    TOKEN_REQUIRED_FUNCTIONS.iter().all(|f| callable.contains(*f))
        && TOKEN_REQUIRED_EVENTS.iter().all(|e| events.contains(*e))
}

/// Ownable interface check over an accumulated surface
pub fn is_ownable_contract(callable: &BTreeSet<String>, events: &BTreeSet<String>) -> bool {
    OWNABLE_REQUIRED_FUNCTIONS.iter().all(|f| callable.contains(*f))
        && OWNABLE_REQUIRED_EVENTS.iter().all(|e| events.contains(*e))
}

/// Classify a compilation unit, selecting the entry contract automatically
pub fn classify(source: &str) -> AppResult<ContractProfile> {
    classify_inner(source, None)
}

/// Classify a compilation unit around a caller-chosen entry contract
pub fn classify_with_entry(source: &str, entry: &str) -> AppResult<ContractProfile> {
    classify_inner(source, Some(entry))
}

/// Parse source into a solang source unit, surfacing the parser's diagnostics
pub fn parse_source(source: &str) -> AppResult<pt::SourceUnit> {
    solang_parser::parse(source, SOURCE_FILE_NO)
        .map(|(unit, _comments)| unit)
        .map_err(|diagnostics| {
            let messages: Vec<String> = diagnostics.iter().map(|d| d.message.clone()).collect();
            AppError::parse_failed(messages.join("; "))
        })
}

/// Byte span of a parser location
pub(crate) fn span(loc: &pt::Loc) -> Option<(usize, usize)> {
    match loc {
        pt::Loc::File(_, start, end) => Some((*start, *end)),
        _ => None,
    }
}

/// Byte span of a block statement (function and constructor bodies)
pub(crate) fn block_span(stmt: &pt::Statement) -> Option<(usize, usize)> {
    match stmt {
        pt::Statement::Block { loc, .. } => span(loc),
        _ => None,
    }
}

/// Name of a base specifier as written (`A` or `Lib.A`)
fn base_name(base: &pt::Base) -> String {
    base.name
        .identifiers
        .iter()
        .map(|ident| ident.name.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

fn contract_name(contract: &pt::ContractDefinition) -> Option<&str> {
    contract.name.as_ref().map(|ident| ident.name.as_str())
}

fn is_deployable(contract: &pt::ContractDefinition) -> bool {
    matches!(contract.ty, ContractTy::Contract(_))
}

/// Declared contracts keyed by name (first declaration wins)
struct ContractIndex<'a> {
    contracts: IndexMap<String, &'a pt::ContractDefinition>,
}

impl<'a> ContractIndex<'a> {
    fn new(unit: &'a pt::SourceUnit) -> Self {
        let mut contracts = IndexMap::new();
        for part in &unit.0 {
            if let SourceUnitPart::ContractDefinition(contract) = part {
                if let Some(name) = contract_name(contract) {
                    contracts.entry(name.to_string()).or_insert(&**contract);
                }
            }
        }
        Self { contracts }
    }

    fn get(&self, name: &str) -> Option<&'a pt::ContractDefinition> {
        self.contracts.get(name).copied()
    }

    /// Repeatedly resolve contracts whose bases are all resolved
    fn resolve_dependency_tree(&self) -> AppResult<IndexMap<String, Vec<String>>> {
        let mut tree: IndexMap<String, Vec<String>> = IndexMap::new();

        loop {
            let mut progress = false;
            for (name, contract) in &self.contracts {
                if tree.contains_key(name) {
                    continue;
                }
                let bases: Vec<String> = contract.base.iter().map(base_name).collect();
                if bases.iter().all(|b| tree.contains_key(b)) {
                    tree.insert(name.clone(), bases);
                    progress = true;
                }
            }
            if !progress {
                break;
            }
        }

        if tree.len() != self.contracts.len() {
            for (name, contract) in &self.contracts {
                if tree.contains_key(name) {
                    continue;
                }
                if let Some(missing) = contract
                    .base
                    .iter()
                    .map(base_name)
                    .find(|b| !self.contracts.contains_key(b))
                {
                    return Err(AppError::unresolved_base(name, &missing));
                }
            }
            return Err(AppError::parse_failed("cyclic inheritance"));
        }

        Ok(tree)
    }
}

/// Surface accumulated over an inheritance chain
#[derive(Default)]
struct Capabilities {
    chain: Vec<String>,
    callable: BTreeSet<String>,
    internal: BTreeSet<String>,
    events: BTreeSet<String>,
    has_balance_variable: bool,
}

impl Capabilities {
    fn absorb(&mut self, contract: &pt::ContractDefinition) {
        for part in &contract.parts {
            match part {
                ContractPart::FunctionDefinition(func) => {
                    if !matches!(func.ty, FunctionTy::Function) {
                        continue;
                    }
                    let Some(name) = func.name.as_ref().map(|n| n.name.clone()) else {
                        continue;
                    };
                    if function_is_callable(func) {
                        self.callable.insert(name);
                    } else {
                        self.internal.insert(name);
                    }
                }
                ContractPart::VariableDefinition(var) => {
                    let Some(name) = var.name.as_ref().map(|n| n.name.as_str()) else {
                        continue;
                    };
                    if variable_is_public(var) {
                        self.callable.insert(name.to_string());
                    }
                    if name == BALANCE_VARIABLE_NAME && is_mapping(&var.ty) {
                        self.has_balance_variable = true;
                    }
                }
                ContractPart::EventDefinition(event) => {
                    if let Some(name) = &event.name {
                        self.events.insert(name.name.clone());
                    }
                }
                _ => {}
            }
        }
    }
}

fn function_is_callable(func: &pt::FunctionDefinition) -> bool {
    let visibility = func.attributes.iter().find_map(|attr| match attr {
        FunctionAttribute::Visibility(v) => Some(v),
        _ => None,
    });
    matches!(
        visibility,
        None | Some(Visibility::Public(_)) | Some(Visibility::External(_))
    )
}

fn variable_is_public(var: &pt::VariableDefinition) -> bool {
    var.attrs
        .iter()
        .any(|attr| matches!(attr, VariableAttribute::Visibility(Visibility::Public(_))))
}

fn is_mapping(ty: &pt::Expression) -> bool {
    matches!(ty, pt::Expression::Type(_, pt::Type::Mapping { .. }))
}

/// Visit `entry` and every ancestor once, keyed by name
fn collect_capabilities(index: &ContractIndex<'_>, entry: &str) -> Capabilities {
    let mut caps = Capabilities::default();
    let mut visited: HashSet<String> = HashSet::new();
    let mut worklist: Vec<String> = vec![entry.to_string()];

    while let Some(name) = worklist.pop() {
        if !visited.insert(name.clone()) {
            continue;
        }
        let Some(contract) = index.get(&name) else {
            continue;
        };
        caps.absorb(contract);
        caps.chain.push(name);

        // reversed so the first declared base is visited first
        for base in contract.base.iter().rev() {
            let base = base_name(base);
            if !visited.contains(&base) {
                worklist.push(base);
            }
        }
    }

    caps
}

/// Most-derived deployable contract with the widest callable surface
///
/// Ties go to the contract resolved last.
fn select_entry(
    index: &ContractIndex<'_>,
    tree: &IndexMap<String, Vec<String>>,
) -> AppResult<String> {
    let inherited: HashSet<&str> = tree.values().flatten().map(String::as_str).collect();

    let deployable: Vec<&String> = tree
        .keys()
        .filter(|name| index.get(name).map(is_deployable).unwrap_or(false))
        .collect();

    let leaves: Vec<&String> = deployable
        .iter()
        .copied()
        .filter(|name| !inherited.contains(name.as_str()))
        .collect();

    let candidates = if leaves.is_empty() { deployable } else { leaves };

    let mut best: Option<(&String, usize)> = None;
    for name in candidates {
        let surface = collect_capabilities(index, name).callable.len();
        match best {
            Some((_, best_surface)) if surface < best_surface => {}
            _ => best = Some((name, surface)),
        }
    }

    best.map(|(name, _)| name.clone())
        .ok_or_else(|| AppError::no_entry_contract("no deployable contract in source"))
}

fn classify_inner(source: &str, entry: Option<&str>) -> AppResult<ContractProfile> {
    let unit = parse_source(source)?;
    let index = ContractIndex::new(&unit);
    let dependency_tree = index.resolve_dependency_tree()?;

    let entry_name = match entry {
        Some(name) => {
            if !dependency_tree.contains_key(name) {
                return Err(AppError::no_entry_contract(format!(
                    "entry contract {} not declared",
                    name
                )));
            }
            name.to_string()
        }
        None => select_entry(&index, &dependency_tree)?,
    };

    let entry_contract = index
        .get(&entry_name)
        .cloned()
        .ok_or_else(|| AppError::no_entry_contract(entry_name.clone()))?;

    let caps = collect_capabilities(&index, &entry_name);
    let chain_defs: Vec<&pt::ContractDefinition> =
        caps.chain.iter().filter_map(|name| index.get(name)).collect();
    let supply = supply::scan(&chain_defs);

    let profile = ContractProfile {
        entry_name,
        entry_contract,
        dependency_tree,
        inheritance_chain: caps.chain,
        is_token_contract: is_token_contract(&caps.callable, &caps.events),
        is_ownable_contract: is_ownable_contract(&caps.callable, &caps.events),
        callable_functions: caps.callable,
        internal_functions: caps.internal,
        events: caps.events,
        declared_types: index.contracts.keys().cloned().collect(),
        has_balance_variable: caps.has_balance_variable,
        supply,
    };

    debug!(
        "🔎 Classified {} | token: {} | ownable: {} | chain: {:?}",
        profile.entry_name,
        profile.is_token_contract,
        profile.is_ownable_contract,
        profile.inheritance_chain
    );

    Ok(profile)
}
