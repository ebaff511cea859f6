//! Harness Synthesizer
//!
//! Two independent transformations over a classified contract:
//!
//! 1. Constructor injection: mint a large supply to the deployer and take
//!    ownership, so every test starts from a funded, ownership-known state.
//!    The insertion point comes from the parser's byte spans; the rest of the
//!    source is left untouched.
//! 2. Invariant tests: one forge-std contract per technique, each deploying a
//!    private instance of the target and owning exactly one invariant.

use std::fmt::Write as _;

use tracing::debug;

use crate::core::classifier::{block_span, span, ContractProfile};
use crate::core::decoder::{find_constructor, DecodedArguments};
use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::{
    FORGE_STD_IMPORT, HARNESS_SEED_AMOUNT, HARNESS_TIME_WARP, HARNESS_TRANSFER_AMOUNT,
    INJECTED_MINT_AMOUNT, MINT_FUNCTION_NAME, TEST_CONTRACT_PREFIX, TEST_CONTRACT_SUFFIX,
    TRANSFER_OWNERSHIP_FUNCTION_NAME,
};
use crate::utils::literals::{address_literal, random_address};

/// Rug-pull techniques with a dedicated invariant test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Technique {
    Honeypot,
    HiddenMint,
    HiddenTransfer,
    HiddenFeeModifier,
    HiddenTransferRevert,
    FakeOwnershipRenunciation,
}

impl Technique {
    pub const ALL: [Technique; 6] = [
        Technique::Honeypot,
        Technique::HiddenMint,
        Technique::HiddenTransfer,
        Technique::HiddenFeeModifier,
        Technique::HiddenTransferRevert,
        Technique::FakeOwnershipRenunciation,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Technique::Honeypot => "Honeypot",
            Technique::HiddenMint => "HiddenMint",
            Technique::HiddenTransfer => "HiddenTransfer",
            Technique::HiddenFeeModifier => "HiddenFeeModifier",
            Technique::HiddenTransferRevert => "HiddenTransferRevert",
            Technique::FakeOwnershipRenunciation => "FakeOwnershipRenunciation",
        }
    }

    /// `DynamicHoneypotTest`
    pub fn test_contract_name(&self) -> String {
        format!("{}{}{}", TEST_CONTRACT_PREFIX, self.name(), TEST_CONTRACT_SUFFIX)
    }

    pub fn from_test_contract_name(name: &str) -> Option<Self> {
        let inner = name
            .strip_prefix(TEST_CONTRACT_PREFIX)?
            .strip_suffix(TEST_CONTRACT_SUFFIX)?;
        Self::ALL.into_iter().find(|t| t.name() == inner)
    }

    /// Upper-case tag used in alert ids (`HIDDENMINT`)
    pub fn alert_tag(&self) -> String {
        self.name().to_uppercase()
    }

    /// Token techniques need the fungible-token surface, the rest need ownable
    pub fn applies_to(&self, profile: &ContractProfile) -> bool {
        match self {
            Technique::FakeOwnershipRenunciation => profile.is_ownable_contract,
            _ => profile.is_token_contract,
        }
    }

    fn invariant_name(&self) -> String {
        let name = self.name();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => format!("invariant_{}{}", first.to_ascii_lowercase(), chars.as_str()),
            None => "invariant".to_string(),
        }
    }

    fn needs_seeding(&self) -> bool {
        !matches!(
            self,
            Technique::HiddenMint | Technique::FakeOwnershipRenunciation
        )
    }
}

/// Where to splice code into the source, and what
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionPlan {
    /// Byte offset of the closing brace the code goes in front of
    pub offset: usize,
    pub code: String,
    /// `true` when statements are appended to an existing constructor
    pub extends_constructor: bool,
}

impl InjectionPlan {
    /// Source with the code spliced in and the forge-std import appended
    pub fn apply(&self, source: &str) -> String {
        let mut out = String::with_capacity(source.len() + self.code.len() + 64);
        out.push_str(&source[..self.offset]);
        out.push_str(&self.code);
        out.push_str(&source[self.offset..]);
        out.push_str("\n\n");
        out.push_str(FORGE_STD_IMPORT);
        out.push('\n');
        out
    }
}

/// Statements run at the end of construction
fn injected_statements(profile: &ContractProfile) -> Vec<String> {
    let mut statements = Vec::new();
    if profile.is_token_contract && profile.has_mint_function() {
        statements.push(format!(
            "{}(msg.sender, {});",
            MINT_FUNCTION_NAME, INJECTED_MINT_AMOUNT
        ));
    }
    if profile.is_ownable_contract {
        statements.push(format!("{}(msg.sender);", TRANSFER_OWNERSHIP_FUNCTION_NAME));
    }
    statements
}

/// Offset of the last `}` inside a span
fn closing_brace(source: &str, (start, end): (usize, usize)) -> Option<usize> {
    source
        .get(start..end)
        .and_then(|text| text.rfind('}'))
        .map(|pos| start + pos)
}

/// Compute the constructor injection for the entry contract
pub fn plan_injection(source: &str, profile: &ContractProfile) -> AppResult<InjectionPlan> {
    let statements = injected_statements(profile);

    if let Some(constructor) = find_constructor(&profile.entry_contract) {
        let offset = constructor
            .body
            .as_ref()
            .and_then(block_span)
            .and_then(|body| closing_brace(source, body))
            .ok_or_else(|| AppError::parse_failed("constructor body has no location"))?;

        let mut code = String::new();
        for statement in &statements {
            let _ = write!(code, "\n        {}", statement);
        }
        if !code.is_empty() {
            code.push_str("\n    ");
        }
        return Ok(InjectionPlan {
            offset,
            code,
            extends_constructor: true,
        });
    }

    let offset = span(&profile.entry_contract.loc)
        .and_then(|contract| closing_brace(source, contract))
        .ok_or_else(|| AppError::parse_failed("entry contract has no location"))?;

    let mut code = String::from("\n    constructor() public {");
    for statement in &statements {
        let _ = write!(code, "\n        {}", statement);
    }
    code.push_str("\n    }\n");

    Ok(InjectionPlan {
        offset,
        code,
        extends_constructor: false,
    })
}

/// One synthesized invariant-test contract
#[derive(Debug, Clone)]
pub struct TestContract {
    pub technique: Technique,
    pub name: String,
    pub code: String,
}

/// All test contracts synthesized for one target
#[derive(Debug, Clone, Default)]
pub struct TestSuite {
    pub contracts: Vec<TestContract>,
}

impl TestSuite {
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    pub fn techniques(&self) -> Vec<Technique> {
        self.contracts.iter().map(|c| c.technique).collect()
    }

    pub fn render(&self) -> String {
        self.contracts
            .iter()
            .map(|c| c.code.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Everything the verification engine needs for one target
#[derive(Debug, Clone)]
pub struct Harness {
    pub plan: InjectionPlan,
    /// Original source with the injection applied and forge-std imported
    pub injected_source: String,
    pub suite: TestSuite,
}

impl Harness {
    /// Complete test file contents
    pub fn render(&self) -> String {
        format!("{}\n{}", self.injected_source, self.suite.render())
    }
}

/// Actors shared by the test contracts of one synthesis
struct Actors {
    holder: String,
    recipient: String,
    new_owner: String,
}

impl Actors {
    fn random() -> Self {
        Self {
            holder: address_literal(&random_address()),
            recipient: address_literal(&random_address()),
            new_owner: address_literal(&random_address()),
        }
    }
}

/// Technique-specific pieces of a test contract
#[derive(Default)]
struct Body {
    state: Vec<String>,
    setup: Vec<String>,
    helpers: Vec<String>,
    invariant: Vec<String>,
}

fn technique_body(technique: Technique) -> Body {
    match technique {
        Technique::Honeypot => Body {
            setup: vec!["skipInvariant = !_seed(HOLDER);".into()],
            invariant: vec![
                "uint256 before = subject.balanceOf(RECIPIENT);".into(),
                "vm.prank(HOLDER);".into(),
                "try subject.transfer(RECIPIENT, AMOUNT) {} catch {}".into(),
                "assertGt(subject.balanceOf(RECIPIENT), before);".into(),
            ],
            ..Default::default()
        },
        Technique::HiddenMint => Body {
            state: vec!["uint256 internal initialSupply;".into()],
            setup: vec![
                "initialSupply = subject.totalSupply();".into(),
                "skipInvariant = initialSupply == 0;".into(),
                "excludeSender(address(this));".into(),
            ],
            invariant: vec!["assertLe(subject.totalSupply(), initialSupply);".into()],
            ..Default::default()
        },
        Technique::HiddenTransfer => Body {
            state: vec!["uint256 internal recorded;".into()],
            setup: vec![
                "skipInvariant = !_seed(HOLDER);".into(),
                "if (!skipInvariant) {".into(),
                "    vm.prank(HOLDER);".into(),
                "    try subject.transfer(RECIPIENT, AMOUNT) {} catch {}".into(),
                "    recorded = subject.balanceOf(RECIPIENT);".into(),
                "    skipInvariant = recorded == 0;".into(),
                "}".into(),
                "excludeSender(HOLDER);".into(),
                "excludeSender(RECIPIENT);".into(),
            ],
            invariant: vec!["assertGe(subject.balanceOf(RECIPIENT), recorded);".into()],
            ..Default::default()
        },
        Technique::HiddenFeeModifier => Body {
            state: vec!["uint256 internal initialFee;".into()],
            setup: vec![
                "skipInvariant = !_seed(HOLDER);".into(),
                "if (!skipInvariant) {".into(),
                "    (bool measured, uint256 fee) = _measureFee();".into(),
                "    skipInvariant = !measured;".into(),
                "    initialFee = fee;".into(),
                "}".into(),
                "excludeSender(HOLDER);".into(),
            ],
            helpers: vec![[
                "function _measureFee() internal returns (bool, uint256) {",
                "    if (subject.balanceOf(HOLDER) < AMOUNT) return (false, 0);",
                "    uint256 before = subject.balanceOf(RECIPIENT);",
                "    vm.prank(HOLDER);",
                "    try subject.transfer(RECIPIENT, AMOUNT) {} catch {",
                "        return (false, 0);",
                "    }",
                "    uint256 afterwards = subject.balanceOf(RECIPIENT);",
                "    if (afterwards < before || afterwards - before > AMOUNT) return (false, 0);",
                "    return (true, AMOUNT - (afterwards - before));",
                "}",
            ]
            .join("\n")],
            invariant: vec![
                "(bool measured, uint256 fee) = _measureFee();".into(),
                "if (!measured) return;".into(),
                "assertEq(fee, initialFee);".into(),
            ],
        },
        Technique::HiddenTransferRevert => Body {
            setup: vec!["skipInvariant = !_seed(HOLDER);".into(), "excludeSender(HOLDER);".into()],
            invariant: vec![
                "uint256 balance = subject.balanceOf(HOLDER);".into(),
                "if (balance == 0) return;".into(),
                "vm.prank(HOLDER);".into(),
                "subject.transfer(RECIPIENT, balance);".into(),
            ],
            ..Default::default()
        },
        Technique::FakeOwnershipRenunciation => Body {
            setup: vec![
                "try subject.transferOwnership(NEW_OWNER) {} catch {}".into(),
                "skipInvariant = subject.owner() != NEW_OWNER;".into(),
                "excludeSender(NEW_OWNER);".into(),
            ],
            invariant: vec!["assertTrue(subject.owner() != address(this));".into()],
            ..Default::default()
        },
    }
}

fn seed_helper(use_deal: bool) -> String {
    let mut helper = String::from(
        "function _seed(address account) internal returns (bool) {\n\
         \x20   uint256 available = subject.balanceOf(address(this));\n\
         \x20   uint256 amount = available < SEED ? available / 2 : SEED;\n\
         \x20   if (amount > 0) {\n\
         \x20       try subject.transfer(account, amount) {} catch {}\n\
         \x20   }\n",
    );
    if use_deal {
        helper.push_str(
            "    if (subject.balanceOf(account) == 0) {\n\
             \x20       deal(address(subject), account, SEED);\n\
             \x20   }\n",
        );
    }
    helper.push_str("    return subject.balanceOf(account) > 0;\n}");
    helper
}

fn push_block(out: &mut String, block: &str, indent: &str) {
    for line in block.lines() {
        if line.is_empty() {
            out.push('\n');
        } else {
            let _ = writeln!(out, "{}{}", indent, line);
        }
    }
}

fn render_test_contract(
    technique: Technique,
    profile: &ContractProfile,
    args: &DecodedArguments,
    actors: &Actors,
) -> TestContract {
    let name = technique.test_contract_name();
    let target = &profile.entry_name;
    let body = technique_body(technique);
    let mut out = String::new();

    let _ = writeln!(out, "contract {} is Test {{", name);
    let _ = writeln!(out, "    {} internal subject;", target);
    out.push_str("    bool internal skipInvariant;\n");
    let _ = writeln!(out, "    address internal constant HOLDER = {};", actors.holder);
    let _ = writeln!(out, "    address internal constant RECIPIENT = {};", actors.recipient);
    let _ = writeln!(out, "    address internal constant NEW_OWNER = {};", actors.new_owner);
    let _ = writeln!(out, "    uint256 internal constant AMOUNT = {};", HARNESS_TRANSFER_AMOUNT);
    let _ = writeln!(out, "    uint256 internal constant SEED = {};", HARNESS_SEED_AMOUNT);
    for line in &body.state {
        let _ = writeln!(out, "    {}", line);
    }

    out.push_str("\n    function setUp() public {\n");
    for line in &args.setup {
        let _ = writeln!(out, "        {}", line);
    }
    let _ = writeln!(out, "        subject = new {}({});", target, args.call_list());
    for line in &body.setup {
        let _ = writeln!(out, "        {}", line);
    }
    out.push_str("        targetContract(address(subject));\n");
    let _ = writeln!(out, "        vm.warp(block.timestamp + {});", HARNESS_TIME_WARP);
    out.push_str("    }\n");

    if technique.needs_seeding() {
        out.push('\n');
        push_block(&mut out, &seed_helper(profile.has_balance_variable), "    ");
    }
    for helper in &body.helpers {
        out.push('\n');
        push_block(&mut out, helper, "    ");
    }

    let _ = writeln!(out, "\n    function {}() public {{", technique.invariant_name());
    out.push_str("        if (skipInvariant) return;\n");
    for line in &body.invariant {
        let _ = writeln!(out, "        {}", line);
    }
    out.push_str("    }\n}\n");

    TestContract {
        technique,
        name,
        code: out,
    }
}

/// Invariant tests for every technique the profile exposes
pub fn synthesize_suite(profile: &ContractProfile, args: &DecodedArguments) -> TestSuite {
    let actors = Actors::random();
    let contracts = Technique::ALL
        .into_iter()
        .filter(|t| t.applies_to(profile))
        .map(|t| render_test_contract(t, profile, args, &actors))
        .collect();
    TestSuite { contracts }
}

/// Injection plus test suite for one target
pub fn synthesize(
    source: &str,
    profile: &ContractProfile,
    args: &DecodedArguments,
) -> AppResult<Harness> {
    let plan = plan_injection(source, profile)?;
    let injected_source = plan.apply(source);
    let suite = synthesize_suite(profile, args);

    debug!(
        "🧪 Synthesized {} tests for {} (constructor {})",
        suite.contracts.len(),
        profile.entry_name,
        if plan.extends_constructor { "extended" } else { "injected" }
    );

    Ok(Harness {
        plan,
        injected_source,
        suite,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::{classify, parse_source, tests::ERC20_SOURCE};
    use solang_parser::pt;

    const BARE_TOKEN: &str = r#"
pragma solidity ^0.8.0;
contract Bare {
    mapping(address => uint256) private _balances;
    uint256 private _totalSupply;
    event Transfer(address indexed from, address indexed to, uint256 value);
    event Approval(address indexed owner, address indexed spender, uint256 value);
    function name() public pure returns (string memory) { return "Bare"; }
    function symbol() public pure returns (string memory) { return "BARE"; }
    function decimals() public pure returns (uint8) { return 18; }
    function totalSupply() public view returns (uint256) { return _totalSupply; }
    function balanceOf(address a) public view returns (uint256) { return _balances[a]; }
    function transfer(address to, uint256 v) public returns (bool) { _balances[msg.sender] -= v; _balances[to] += v; return true; }
    function transferFrom(address, address, uint256) public pure returns (bool) { return false; }
    function approve(address, uint256) public pure returns (bool) { return true; }
    function allowance(address, address) public pure returns (uint256) { return 0; }
    function _mint(address to, uint256 v) internal { _totalSupply += v; _balances[to] += v; }
}
"#;

    fn args(literals: &[&str]) -> DecodedArguments {
        DecodedArguments {
            literals: literals.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Members of forge-std `Test` a test contract must not redeclare
    const FORGE_STD_MEMBERS: [&str; 14] = [
        "vm",
        "skip",
        "rewind",
        "hoax",
        "startHoax",
        "changePrank",
        "deal",
        "deployCode",
        "makeAddr",
        "bound",
        "excludeSender",
        "excludeContract",
        "fail",
        "failed",
    ];

    fn declared_members(code: &str) -> Vec<String> {
        let unit = parse_source(&format!("{}\n{}", FORGE_STD_IMPORT, code)).unwrap();
        let mut names = Vec::new();
        for part in &unit.0 {
            let pt::SourceUnitPart::ContractDefinition(contract) = part else {
                continue;
            };
            for item in &contract.parts {
                match item {
                    pt::ContractPart::VariableDefinition(var) => {
                        names.extend(var.name.as_ref().map(|n| n.name.clone()))
                    }
                    pt::ContractPart::FunctionDefinition(func) => {
                        names.extend(func.name.as_ref().map(|n| n.name.clone()))
                    }
                    _ => {}
                }
            }
        }
        names
    }

    #[test]
    fn test_technique_names_round_trip() {
        for technique in Technique::ALL {
            let name = technique.test_contract_name();
            assert_eq!(Technique::from_test_contract_name(&name), Some(technique));
        }
        assert_eq!(Technique::Honeypot.test_contract_name(), "DynamicHoneypotTest");
        assert_eq!(Technique::HiddenMint.alert_tag(), "HIDDENMINT");
        assert_eq!(Technique::from_test_contract_name("DynamicUnknownTest"), None);
        assert_eq!(Technique::from_test_contract_name("Honeypot"), None);
    }

    #[test]
    fn test_injects_constructor_when_missing() {
        let profile = classify(BARE_TOKEN).unwrap();
        let plan = plan_injection(BARE_TOKEN, &profile).unwrap();
        assert!(!plan.extends_constructor);

        let injected = plan.apply(BARE_TOKEN);
        assert_eq!(injected.matches("constructor()").count(), 1);
        assert_eq!(
            injected.matches("_mint(msg.sender, 1000000000000000000000000);").count(),
            1
        );
        assert!(!injected.contains("transferOwnership(msg.sender);"));
        assert!(injected.trim_end().ends_with(FORGE_STD_IMPORT));

        // the constructor lands inside the contract body
        let unit = parse_source(&injected).unwrap();
        assert!(!unit.0.is_empty());
        let reprofiled = classify(&injected).unwrap();
        assert!(crate::core::decoder::find_constructor(&reprofiled.entry_contract).is_some());
    }

    #[test]
    fn test_no_mint_call_without_mint_function() {
        let source = BARE_TOKEN.replace(
            "    function _mint(address to, uint256 v) internal { _totalSupply += v; _balances[to] += v; }\n",
            "",
        );
        let profile = classify(&source).unwrap();
        assert!(profile.is_token_contract);
        assert!(!profile.has_mint_function());
        let plan = plan_injection(&source, &profile).unwrap();
        assert!(!plan.code.contains("_mint"));
        assert!(plan.code.contains("constructor() public {"));
    }

    #[test]
    fn test_existing_constructor_is_extended() {
        let profile = classify(ERC20_SOURCE).unwrap();
        let plan = plan_injection(ERC20_SOURCE, &profile).unwrap();
        assert!(plan.extends_constructor);

        let injected = plan.apply(ERC20_SOURCE);
        let original_body = "        _mint(msg.sender, supply);";
        let start = injected.find(original_body).unwrap();
        let tail = &injected[start..];
        let mint = tail.find("_mint(msg.sender, 1000000000000000000000000);").unwrap();
        let owner = tail.find("transferOwnership(msg.sender);").unwrap();
        assert!(mint < owner);
        // still a single MoonToken constructor
        let moon = &injected[injected.find("contract MoonToken").unwrap()..];
        assert_eq!(moon.matches("constructor(").count(), 1);
    }

    #[test]
    fn test_suite_covers_profile() {
        let profile = classify(ERC20_SOURCE).unwrap();
        let suite = synthesize_suite(&profile, &args(&["\"Moon\"", "\"MOON\"", "1000"]));
        assert_eq!(suite.techniques(), Technique::ALL.to_vec());

        for contract in &suite.contracts {
            assert!(contract.code.starts_with(&format!("contract {} is Test {{", contract.name)));
            assert!(contract.code.contains("subject = new MoonToken(\"Moon\", \"MOON\", 1000);"));
            assert!(contract.code.contains("vm.warp(block.timestamp + 365 days);"));
            assert!(contract.code.contains("if (skipInvariant) return;"));
            assert_eq!(contract.code.matches("function invariant_").count(), 1);
        }

        let honeypot = &suite.contracts[0].code;
        assert!(honeypot.contains("function invariant_honeypot() public {"));
        assert!(honeypot.contains("deal(address(subject), account, SEED);"));
    }

    #[test]
    fn test_ownable_only_profile_gets_one_test() {
        let source = r#"
pragma solidity ^0.8.0;
contract Vault {
    address private _owner;
    event OwnershipTransferred(address indexed previousOwner, address indexed newOwner);
    constructor() { _owner = msg.sender; }
    function owner() public view returns (address) { return _owner; }
    function transferOwnership(address n) public { emit OwnershipTransferred(_owner, n); _owner = n; }
}
"#;
        let profile = classify(source).unwrap();
        let harness = synthesize(source, &profile, &DecodedArguments::default()).unwrap();
        assert_eq!(
            harness.suite.techniques(),
            vec![Technique::FakeOwnershipRenunciation]
        );
        let injected = &harness.injected_source;
        let assigned = injected.find("_owner = msg.sender;").unwrap();
        let transferred = injected.find("transferOwnership(msg.sender);").unwrap();
        let getter = injected.find("function owner()").unwrap();
        assert!(assigned < transferred && transferred < getter);
        let rendered = harness.render();
        assert!(rendered.contains("subject = new Vault();"));
        assert!(rendered.contains("assertTrue(subject.owner() != address(this));"));
        assert!(!rendered.contains("function _seed"));
    }

    #[test]
    fn test_actor_literals_are_checksummed() {
        let profile = classify(BARE_TOKEN).unwrap();
        let suite = synthesize_suite(&profile, &DecodedArguments::default());
        let code = &suite.contracts[0].code;
        let line = code
            .lines()
            .find(|l| l.contains("constant HOLDER"))
            .unwrap();
        let literal = line.trim().trim_end_matches(';').rsplit(' ').next().unwrap();
        let parsed: alloy_primitives::Address = literal.parse().unwrap();
        assert_eq!(parsed.to_checksum(None), literal);
    }

    #[test]
    fn test_no_member_shadows_forge_std() {
        let profile = classify(ERC20_SOURCE).unwrap();
        let suite = synthesize_suite(&profile, &args(&["\"Moon\"", "\"MOON\"", "1000"]));
        for contract in &suite.contracts {
            let members = declared_members(&contract.code);
            assert!(members.contains(&"subject".to_string()));
            for member in &members {
                assert!(
                    !FORGE_STD_MEMBERS.contains(&member.as_str()) && !member.starts_with("target"),
                    "{} redeclares {}",
                    contract.name,
                    member
                );
            }
        }
    }

    #[test]
    fn test_rendered_harness_parses() {
        let profile = classify(ERC20_SOURCE).unwrap();
        let harness = synthesize(
            ERC20_SOURCE,
            &profile,
            &args(&["\"Moon\"", "\"MOON\"", "1000"]),
        )
        .unwrap();
        let unit = parse_source(&harness.render()).unwrap();
        let contracts: Vec<String> = unit
            .0
            .iter()
            .filter_map(|part| match part {
                pt::SourceUnitPart::ContractDefinition(c) => c.name.as_ref().map(|n| n.name.clone()),
                _ => None,
            })
            .collect();
        for technique in Technique::ALL {
            assert!(contracts.contains(&technique.test_contract_name()));
        }
        assert!(contracts.contains(&"MoonToken".to_string()));
    }

    #[test]
    fn test_argument_setup_precedes_deployment() {
        let profile = classify(BARE_TOKEN).unwrap();
        let decoded = DecodedArguments {
            literals: vec!["ctorArg0".to_string()],
            setup: vec![
                "address[] memory ctorArg0 = new address[](1);".to_string(),
                "ctorArg0[0] = 0x1111111111111111111111111111111111111111;".to_string(),
            ],
        };
        let suite = synthesize_suite(&profile, &decoded);
        let code = &suite.contracts[0].code;
        let declared = code.find("address[] memory ctorArg0").unwrap();
        let assigned = code.find("ctorArg0[0] = ").unwrap();
        let deployed = code.find("subject = new Bare(ctorArg0);").unwrap();
        assert!(declared < assigned && assigned < deployed);
        assert!(parse_source(&format!("{}\n{}", FORGE_STD_IMPORT, suite.render())).is_ok());
    }
}
