//! Static supply scanner
//!
//! Finds functions that can raise total supply, directly (`_totalSupply += x`,
//! `_totalSupply = _totalSupply.add(x)`, `_totalSupply = a + b`) or by calling
//! another supply-raising function of the same contract. Walks the function
//! bodies of the entry contract's inheritance chain and iterates to a fixed
//! point over the internal call graph.

use serde::Serialize;
use solang_parser::pt::{self, CatchClause, ContractPart, Expression, FunctionTy, Statement};
use std::collections::BTreeSet;

use crate::utils::constants::TOTAL_SUPPLY_VARIABLE_NAME;

/// Supply-raising functions split by reachability
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SupplyReport {
    /// Callable from outside the contract
    pub public: BTreeSet<String>,
    /// Only reachable through other functions
    pub internal: BTreeSet<String>,
}

impl SupplyReport {
    pub fn is_empty(&self) -> bool {
        self.public.is_empty() && self.internal.is_empty()
    }

    /// Comma-joined names, public first
    pub fn describe(&self) -> String {
        self.public
            .iter()
            .chain(self.internal.iter())
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// What one function body does to the supply
#[derive(Debug, Default)]
struct BodyFacts {
    raises_supply: bool,
    /// Functions of this contract called by name (`f()`, `this.f()`, `super.f()`)
    calls: BTreeSet<String>,
}

impl BodyFacts {
    fn statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Block { statements, .. } => {
                for inner in statements {
                    self.statement(inner);
                }
            }
            Statement::Expression(_, expr) | Statement::Emit(_, expr) => self.expression(expr),
            Statement::VariableDefinition(_, _, init) => {
                if let Some(init) = init {
                    self.expression(init);
                }
            }
            Statement::Return(_, value) => {
                if let Some(value) = value {
                    self.expression(value);
                }
            }
            Statement::If(_, cond, then, otherwise) => {
                self.expression(cond);
                self.statement(then);
                if let Some(otherwise) = otherwise {
                    self.statement(otherwise);
                }
            }
            Statement::While(_, cond, body) => {
                self.expression(cond);
                self.statement(body);
            }
            Statement::DoWhile(_, body, cond) => {
                self.statement(body);
                self.expression(cond);
            }
            Statement::For(_, init, _, _, body) => {
                if let Some(init) = init {
                    self.statement(init);
                }
                if let Some(body) = body {
                    self.statement(body);
                }
            }
            Statement::Try(_, call, returns, catches) => {
                self.expression(call);
                if let Some((_, block)) = returns {
                    self.statement(block);
                }
                for clause in catches {
                    match clause {
                        CatchClause::Simple(_, _, block) | CatchClause::Named(_, _, _, block) => {
                            self.statement(block)
                        }
                    }
                }
            }
            Statement::Revert(_, _, args) => {
                for arg in args {
                    self.expression(arg);
                }
            }
            _ => {}
        }
    }

    fn expression(&mut self, expr: &Expression) {
        match expr {
            Expression::AssignAdd(_, lhs, rhs) => {
                if is_total_supply(lhs) {
                    self.raises_supply = true;
                }
                self.expression(rhs);
            }
            Expression::Assign(_, lhs, rhs) => {
                if is_total_supply(lhs) && adds_to(rhs) {
                    self.raises_supply = true;
                }
                self.expression(lhs);
                self.expression(rhs);
            }
            Expression::PreIncrement(_, operand) | Expression::PostIncrement(_, operand) => {
                if is_total_supply(operand) {
                    self.raises_supply = true;
                }
            }
            Expression::FunctionCall(_, callee, args) => {
                if let Some(name) = own_function(callee) {
                    self.calls.insert(name);
                }
                self.expression(callee);
                for arg in args {
                    self.expression(arg);
                }
            }
            Expression::NamedFunctionCall(_, callee, args) => {
                if let Some(name) = own_function(callee) {
                    self.calls.insert(name);
                }
                self.expression(callee);
                for arg in args {
                    self.expression(&arg.expr);
                }
            }
            Expression::FunctionCallBlock(_, callee, _)
            | Expression::MemberAccess(_, callee, _)
            | Expression::Parenthesis(_, callee)
            | Expression::Not(_, callee) => self.expression(callee),
            Expression::ArraySubscript(_, base, index) => {
                self.expression(base);
                if let Some(index) = index {
                    self.expression(index);
                }
            }
            Expression::ConditionalOperator(_, cond, yes, no) => {
                self.expression(cond);
                self.expression(yes);
                self.expression(no);
            }
            Expression::Add(_, l, r)
            | Expression::Subtract(_, l, r)
            | Expression::Multiply(_, l, r)
            | Expression::Divide(_, l, r)
            | Expression::Modulo(_, l, r)
            | Expression::Equal(_, l, r)
            | Expression::NotEqual(_, l, r)
            | Expression::Less(_, l, r)
            | Expression::More(_, l, r)
            | Expression::LessEqual(_, l, r)
            | Expression::MoreEqual(_, l, r)
            | Expression::And(_, l, r)
            | Expression::Or(_, l, r)
            | Expression::AssignSubtract(_, l, r)
            | Expression::AssignMultiply(_, l, r)
            | Expression::AssignDivide(_, l, r) => {
                self.expression(l);
                self.expression(r);
            }
            Expression::ArrayLiteral(_, items) => {
                for item in items {
                    self.expression(item);
                }
            }
            _ => {}
        }
    }
}

fn is_total_supply(expr: &Expression) -> bool {
    match expr {
        Expression::Variable(ident) => ident.name == TOTAL_SUPPLY_VARIABLE_NAME,
        Expression::Parenthesis(_, inner) => is_total_supply(inner),
        _ => false,
    }
}

/// `a + b`, `a.add(b)`, possibly parenthesised or behind a ternary
fn adds_to(expr: &Expression) -> bool {
    match expr {
        Expression::Add(..) => true,
        Expression::FunctionCall(_, callee, _) => {
            matches!(callee.as_ref(), Expression::MemberAccess(_, _, member) if member.name == "add")
        }
        Expression::Parenthesis(_, inner) => adds_to(inner),
        Expression::ConditionalOperator(_, _, yes, no) => adds_to(yes) || adds_to(no),
        _ => false,
    }
}

/// Name of a function of the scanned contract being called, if any
fn own_function(callee: &Expression) -> Option<String> {
    match callee {
        Expression::Variable(ident) => Some(ident.name.clone()),
        Expression::MemberAccess(_, base, member) => match base.as_ref() {
            Expression::Variable(ident) if ident.name == "this" || ident.name == "super" => {
                Some(member.name.clone())
            }
            _ => None,
        },
        Expression::FunctionCallBlock(_, inner, _) => own_function(inner),
        _ => None,
    }
}

struct ScannedFunction {
    name: String,
    callable: bool,
    facts: BodyFacts,
}

fn scan_functions(contracts: &[&pt::ContractDefinition]) -> Vec<ScannedFunction> {
    let mut functions = Vec::new();
    for contract in contracts {
        for part in &contract.parts {
            let ContractPart::FunctionDefinition(func) = part else {
                continue;
            };
            if !matches!(func.ty, FunctionTy::Function) {
                continue;
            }
            let (Some(name), Some(body)) = (&func.name, &func.body) else {
                continue;
            };
            let callable = !func.attributes.iter().any(|attr| {
                matches!(
                    attr,
                    pt::FunctionAttribute::Visibility(
                        pt::Visibility::Internal(_) | pt::Visibility::Private(_)
                    )
                )
            });
            let mut facts = BodyFacts::default();
            facts.statement(body);
            functions.push(ScannedFunction {
                name: name.name.clone(),
                callable,
                facts,
            });
        }
    }
    functions
}

/// Scan the given contracts for supply-raising functions
pub fn scan(contracts: &[&pt::ContractDefinition]) -> SupplyReport {
    let functions = scan_functions(contracts);
    let mut report = SupplyReport::default();
    let mut flagged: BTreeSet<String> = BTreeSet::new();

    loop {
        let mut exploring = false;
        for func in &functions {
            if flagged.contains(&func.name) {
                continue;
            }
            if func.facts.raises_supply || !func.facts.calls.is_disjoint(&flagged) {
                flagged.insert(func.name.clone());
                if func.callable {
                    report.public.insert(func.name.clone());
                } else {
                    report.internal.insert(func.name.clone());
                }
                exploring = true;
            }
        }
        if !exploring {
            break;
        }
    }

    report
}
