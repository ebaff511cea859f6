//! Constructor Decoder
//!
//! Recovers the constructor argument blob from deployment call data and turns
//! it into Solidity literals that can be spliced into a `new Target(...)` call.
//!
//! The blob is whatever follows the last occurrence of the tail of the deployed
//! runtime code inside the deployment input: init code embeds the runtime code
//! verbatim and solc appends ABI-encoded arguments after it.

use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::Bytes;
use solang_parser::pt::{self, ContractPart, FunctionTy};
use std::fmt;

use crate::core::classifier::ContractProfile;
use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::utils::constants::{ARGUMENT_LOCAL_PREFIX, RUNTIME_SUFFIX_LEN};
use crate::utils::literals::{
    address_literal, dynamic_bytes_literal, fixed_bytes_literal, string_literal,
};

/// Constructor argument bytes appended after the runtime code
///
/// Returns `None` when the runtime code is empty or its tail never occurs in
/// the deployment input (proxy factories, CREATE2 deployers, etc).
pub fn extract_constructor_args(deploy_data: &[u8], runtime_code: &[u8]) -> Option<Bytes> {
    if runtime_code.is_empty() {
        return None;
    }
    let suffix_len = runtime_code.len().min(RUNTIME_SUFFIX_LEN);
    let suffix = &runtime_code[runtime_code.len() - suffix_len..];
    let position = deploy_data
        .windows(suffix_len)
        .rposition(|window| window == suffix)?;
    Some(Bytes::copy_from_slice(&deploy_data[position + suffix_len..]))
}

/// Declared type of one constructor parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    /// `uint256`, `address`, `bytes32`, `string`, ...
    Elementary(String),
    /// `address payable`
    Payable,
    /// Contract or interface reference, an address on the wire
    Contract(String),
    /// `base[length]` or `base[]`
    Array {
        base: Box<ParamType>,
        length: Option<usize>,
    },
}

impl ParamType {
    /// Canonical ABI type string
    ///
    /// Dimensions are appended outermost last, so `uint8[2][]` is a dynamic
    /// array of `uint8[2]`.
    pub fn abi_type(&self) -> String {
        match self {
            ParamType::Elementary(name) => name.clone(),
            ParamType::Payable | ParamType::Contract(_) => "address".to_string(),
            ParamType::Array { base, length } => match length {
                Some(len) => format!("{}[{}]", base.abi_type(), len),
                None => format!("{}[]", base.abi_type()),
            },
        }
    }

    /// Type as declared in Solidity source (`address payable`, `IRouter[]`)
    pub fn sol_type(&self) -> String {
        match self {
            ParamType::Elementary(name) => name.clone(),
            ParamType::Payable => "address payable".to_string(),
            ParamType::Contract(name) => name.clone(),
            ParamType::Array { base, length } => match length {
                Some(len) => format!("{}[{}]", base.sol_type(), len),
                None => format!("{}[]", base.sol_type()),
            },
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.abi_type())
    }
}

/// Ordered constructor parameter types of the entry contract
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstructorSignature {
    pub params: Vec<ParamType>,
}

impl ConstructorSignature {
    /// `(uint256,address[])`
    pub fn abi_tuple(&self) -> String {
        let types: Vec<String> = self.params.iter().map(ParamType::abi_type).collect();
        format!("({})", types.join(","))
    }
}

/// Decoded constructor arguments as Solidity source
///
/// Arrays cannot be passed as inline literals (those are fixed-size memory
/// arrays), so each one is built in a local declared by `setup` and the
/// literal is the local's name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedArguments {
    pub literals: Vec<String>,
    /// Statements that must run before the `new Target(...)` call
    pub setup: Vec<String>,
}

impl DecodedArguments {
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    /// Comma-separated argument list for a call expression
    pub fn call_list(&self) -> String {
        self.literals.join(", ")
    }
}

/// Entry contract constructor, if it declares one
pub(crate) fn find_constructor(contract: &pt::ContractDefinition) -> Option<&pt::FunctionDefinition> {
    contract.parts.iter().find_map(|part| match part {
        ContractPart::FunctionDefinition(func) if matches!(func.ty, FunctionTy::Constructor) => {
            Some(&**func)
        }
        _ => None,
    })
}

/// Constructor signature of the profile's entry contract
///
/// `Ok(None)` when the entry contract has no constructor at all.
pub fn constructor_signature(profile: &ContractProfile) -> AppResult<Option<ConstructorSignature>> {
    let Some(constructor) = find_constructor(&profile.entry_contract) else {
        return Ok(None);
    };

    let mut params = Vec::with_capacity(constructor.params.len());
    for (_, param) in &constructor.params {
        let Some(param) = param else {
            return Err(AppError::unsupported_type("constructor parameter without a type"));
        };
        params.push(param_type(&param.ty, profile)?);
    }

    Ok(Some(ConstructorSignature { params }))
}

fn param_type(expr: &pt::Expression, profile: &ContractProfile) -> AppResult<ParamType> {
    match expr {
        pt::Expression::Type(_, pt::Type::AddressPayable | pt::Type::Payable) => Ok(ParamType::Payable),
        pt::Expression::Type(_, ty) => elementary_type(ty).map(ParamType::Elementary),
        pt::Expression::ArraySubscript(_, base, dimension) => {
            let length = match dimension {
                None => None,
                Some(dim) => Some(array_length(dim)?),
            };
            Ok(ParamType::Array {
                base: Box::new(param_type(base, profile)?),
                length,
            })
        }
        pt::Expression::Variable(ident) if profile.declared_types.contains(&ident.name) => {
            Ok(ParamType::Contract(ident.name.clone()))
        }
        other => Err(AppError::unsupported_type(format!(
            "constructor parameter type {}",
            other
        ))),
    }
}

fn elementary_type(ty: &pt::Type) -> AppResult<String> {
    let name = match ty {
        pt::Type::Address => "address".to_string(),
        pt::Type::Bool => "bool".to_string(),
        pt::Type::String => "string".to_string(),
        pt::Type::DynamicBytes => "bytes".to_string(),
        pt::Type::Int(bits) => format!("int{}", bits),
        pt::Type::Uint(bits) => format!("uint{}", bits),
        pt::Type::Bytes(len) => format!("bytes{}", len),
        other => {
            return Err(AppError::unsupported_type(format!(
                "constructor parameter type {}",
                other
            )))
        }
    };
    Ok(name)
}

fn array_length(expr: &pt::Expression) -> AppResult<usize> {
    match expr {
        pt::Expression::NumberLiteral(_, value, exponent, ..) if exponent.is_empty() => value
            .replace('_', "")
            .parse::<usize>()
            .map_err(|_| AppError::unsupported_type(format!("array length {}", value))),
        other => Err(AppError::unsupported_type(format!(
            "non-literal array length {}",
            other
        ))),
    }
}

/// Decode the argument blob against the signature, all or nothing
///
/// A missing constructor is treated as an empty signature: any bytes left
/// after the runtime code are then unexpected.
pub fn decode_constructor_args(
    signature: Option<&ConstructorSignature>,
    blob: &[u8],
) -> AppResult<DecodedArguments> {
    let params = signature.map(|s| s.params.as_slice()).unwrap_or_default();

    if params.is_empty() {
        if blob.is_empty() {
            return Ok(DecodedArguments::default());
        }
        return Err(AppError::new(
            ErrorCode::UnexpectedConstructorArgs,
            format!("{} argument bytes for a constructor without parameters", blob.len()),
        ));
    }

    let types = params
        .iter()
        .map(|param| {
            DynSolType::parse(&param.abi_type()).map_err(|e| {
                AppError::unsupported_type(format!("{}: {}", param.abi_type(), e))
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    let decoded = DynSolType::Tuple(types)
        .abi_decode_params(blob)
        .map_err(|e| AppError::abi_decode(e.to_string()))?;

    let values = match decoded {
        DynSolValue::Tuple(values) => values,
        other => vec![other],
    };
    if values.len() != params.len() {
        return Err(AppError::abi_decode(format!(
            "expected {} values, decoded {}",
            params.len(),
            values.len()
        )));
    }

    let mut writer = LiteralWriter::default();
    let literals = values
        .iter()
        .zip(params.iter())
        .map(|(value, param)| writer.render(value, param))
        .collect::<AppResult<Vec<_>>>()?;

    Ok(DecodedArguments {
        literals,
        setup: writer.setup,
    })
}

/// Renders decoded values, declaring array locals as it goes
#[derive(Default)]
struct LiteralWriter {
    setup: Vec<String>,
    next_local: usize,
}

impl LiteralWriter {
    fn render(&mut self, value: &DynSolValue, param: &ParamType) -> AppResult<String> {
        match (param, value) {
            (
                ParamType::Array { base, length },
                DynSolValue::Array(items) | DynSolValue::FixedArray(items),
            ) => self.render_array(items, base, *length, param),
            (ParamType::Array { .. }, _) => {
                Err(AppError::abi_decode("non-array value for an array type"))
            }
            (ParamType::Payable, DynSolValue::Address(address)) => {
                Ok(format!("payable({})", address_literal(address)))
            }
            (ParamType::Contract(name), DynSolValue::Address(address)) => {
                Ok(format!("{}({})", name, address_literal(address)))
            }
            (ParamType::Elementary(_), value) => elementary_literal(value),
            (param, other) => Err(AppError::abi_decode(format!(
                "{:?} decoded for {}",
                other,
                param.sol_type()
            ))),
        }
    }

    fn render_array(
        &mut self,
        items: &[DynSolValue],
        base: &ParamType,
        length: Option<usize>,
        param: &ParamType,
    ) -> AppResult<String> {
        // nested arrays declare their locals first
        let elements = items
            .iter()
            .map(|item| self.render(item, base))
            .collect::<AppResult<Vec<_>>>()?;

        let local = format!("{}{}", ARGUMENT_LOCAL_PREFIX, self.next_local);
        self.next_local += 1;
        let ty = param.sol_type();
        match length {
            Some(_) => self.setup.push(format!("{} memory {};", ty, local)),
            None => self.setup.push(format!(
                "{} memory {} = new {}({});",
                ty,
                local,
                ty,
                items.len()
            )),
        }
        for (index, element) in elements.iter().enumerate() {
            self.setup.push(format!("{}[{}] = {};", local, index, element));
        }
        Ok(local)
    }
}

fn elementary_literal(value: &DynSolValue) -> AppResult<String> {
    let literal = match value {
        DynSolValue::Bool(b) => b.to_string(),
        DynSolValue::Int(i, _) => i.to_string(),
        DynSolValue::Uint(u, _) => u.to_string(),
        DynSolValue::Address(address) => address_literal(address),
        DynSolValue::FixedBytes(word, size) => fixed_bytes_literal(&word[..*size]),
        DynSolValue::Bytes(bytes) => dynamic_bytes_literal(bytes),
        DynSolValue::String(s) => string_literal(s),
        other => {
            return Err(AppError::unsupported_type(format!(
                "cannot render {:?} as a literal",
                other
            )))
        }
    };
    Ok(literal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::classify;
    use alloy_primitives::{Address, B256, I256, U256};
    use std::str::FromStr;

    const RUNTIME: [u8; 20] = [
        0x60, 0x80, 0x60, 0x40, 0x52, 0x34, 0x80, 0x15, 0x61, 0x00, 0x10, 0x57, 0x60, 0x00,
        0x80, 0xfd, 0x5b, 0x50, 0x00, 0x33,
    ];

    fn deployment(args: &[u8]) -> Vec<u8> {
        let mut data = vec![0xfe; 12];
        data.extend_from_slice(&RUNTIME);
        data.extend_from_slice(args);
        data
    }

    const RICH_CONSTRUCTOR: &str = r#"
pragma solidity ^0.8.0;
interface IRouter { function factory() external view returns (address); }
contract Launch {
    constructor(
        uint256 supply,
        address payable treasury,
        string memory label,
        bytes32 salt,
        uint8[2] memory split,
        address[] memory holders,
        IRouter router,
        int16 offset
    ) {}
}
"#;

    #[test]
    fn test_extract_args_after_runtime() {
        let args = [0xaa; 64];
        let blob = extract_constructor_args(&deployment(&args), &RUNTIME).unwrap();
        assert_eq!(blob.as_ref(), &args[..]);
    }

    #[test]
    fn test_extract_uses_last_occurrence() {
        // runtime tail repeated inside the init code must not shift the blob
        let mut data = RUNTIME.to_vec();
        data.extend_from_slice(&deployment(&[0x01; 32]));
        let blob = extract_constructor_args(&data, &RUNTIME).unwrap();
        assert_eq!(blob.as_ref(), &[0x01; 32][..]);
    }

    #[test]
    fn test_extract_not_found() {
        assert!(extract_constructor_args(&[0xfe; 64], &RUNTIME).is_none());
        assert!(extract_constructor_args(&deployment(&[]), &[]).is_none());
    }

    #[test]
    fn test_extract_empty_blob_when_nothing_follows() {
        let blob = extract_constructor_args(&deployment(&[]), &RUNTIME).unwrap();
        assert!(blob.is_empty());
    }

    #[test]
    fn test_signature_from_declared_types() {
        let profile = classify(RICH_CONSTRUCTOR).unwrap();
        let signature = constructor_signature(&profile).unwrap().unwrap();
        let rendered: Vec<String> = signature.params.iter().map(ParamType::abi_type).collect();
        assert_eq!(
            rendered,
            vec![
                "uint256", "address", "string", "bytes32", "uint8[2]", "address[]", "address",
                "int16"
            ]
        );
    }

    #[test]
    fn test_nested_dimensions_render_outermost_last() {
        let ty = ParamType::Array {
            base: Box::new(ParamType::Array {
                base: Box::new(ParamType::Elementary("uint8".into())),
                length: Some(2),
            }),
            length: None,
        };
        assert_eq!(ty.abi_type(), "uint8[2][]");
        let signature = ConstructorSignature {
            params: vec![ParamType::Elementary("address".into()), ty],
        };
        assert_eq!(signature.abi_tuple(), "(address,uint8[2][])");
    }

    #[test]
    fn test_no_constructor() {
        let profile = classify("pragma solidity ^0.8.0; contract Plain { uint256 public x; }").unwrap();
        assert!(constructor_signature(&profile).unwrap().is_none());
        assert!(decode_constructor_args(None, &[]).unwrap().is_empty());
        let err = decode_constructor_args(None, &[0u8; 32]).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnexpectedConstructorArgs);
    }

    #[test]
    fn test_struct_parameter_unsupported() {
        let source = r#"
pragma solidity ^0.8.0;
contract Vault {
    struct Terms { uint256 fee; }
    constructor(Terms memory terms) {}
}
"#;
        let profile = classify(source).unwrap();
        let err = constructor_signature(&profile).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedParameterType);
    }

    #[test]
    fn test_decode_round_trip() {
        let profile = classify(RICH_CONSTRUCTOR).unwrap();
        let signature = constructor_signature(&profile).unwrap().unwrap();

        let treasury = Address::from_str("0xdac17f958d2ee523a2206206994597c13d831ec7").unwrap();
        let holder = Address::repeat_byte(0x11);
        let router = Address::repeat_byte(0x22);
        let salt = B256::repeat_byte(0xab);

        let encoded = DynSolValue::Tuple(vec![
            DynSolValue::Uint(U256::from(10u64).pow(U256::from(24u64)), 256),
            DynSolValue::Address(treasury),
            DynSolValue::String("Moon \"Coin\"".to_string()),
            DynSolValue::FixedBytes(salt, 32),
            DynSolValue::FixedArray(vec![
                DynSolValue::Uint(U256::from(40u64), 8),
                DynSolValue::Uint(U256::from(60u64), 8),
            ]),
            DynSolValue::Array(vec![DynSolValue::Address(holder)]),
            DynSolValue::Address(router),
            DynSolValue::Int(I256::from_str("-7").unwrap(), 16),
        ])
        .abi_encode_params();

        let blob = extract_constructor_args(&deployment(&encoded), &RUNTIME).unwrap();
        let decoded = decode_constructor_args(Some(&signature), &blob).unwrap();

        assert_eq!(
            decoded.literals,
            vec![
                "1000000000000000000000000".to_string(),
                "payable(0xdAC17F958D2ee523a2206206994597C13D831ec7)".to_string(),
                "\"Moon \\\"Coin\\\"\"".to_string(),
                format!("0x{}", "ab".repeat(32)),
                "ctorArg0".to_string(),
                "ctorArg1".to_string(),
                format!("IRouter({})", router.to_checksum(None)),
                "-7".to_string(),
            ]
        );
        assert_eq!(
            decoded.setup,
            vec![
                "uint8[2] memory ctorArg0;".to_string(),
                "ctorArg0[0] = 40;".to_string(),
                "ctorArg0[1] = 60;".to_string(),
                "address[] memory ctorArg1 = new address[](1);".to_string(),
                format!("ctorArg1[0] = {};", holder.to_checksum(None)),
            ]
        );
        assert!(decoded
            .call_list()
            .starts_with("1000000000000000000000000, payable(0xdAC1"));
    }

    #[test]
    fn test_truncated_blob_is_a_hard_failure() {
        let signature = ConstructorSignature {
            params: vec![
                ParamType::Elementary("uint256".into()),
                ParamType::Elementary("string".into()),
            ],
        };
        let err = decode_constructor_args(Some(&signature), &[0u8; 40]).unwrap_err();
        assert_eq!(err.code, ErrorCode::AbiDecodeFailed);
    }

    #[test]
    fn test_empty_dynamic_array() {
        let signature = ConstructorSignature {
            params: vec![ParamType::Array {
                base: Box::new(ParamType::Elementary("address".into())),
                length: None,
            }],
        };
        let encoded = DynSolValue::Tuple(vec![DynSolValue::Array(vec![])]).abi_encode_params();
        let decoded = decode_constructor_args(Some(&signature), &encoded).unwrap();
        assert_eq!(decoded.literals, vec!["ctorArg0".to_string()]);
        assert_eq!(
            decoded.setup,
            vec!["address[] memory ctorArg0 = new address[](0);".to_string()]
        );
    }

    #[test]
    fn test_declared_types_survive_rendering() {
        let source = r#"
pragma solidity ^0.8.0;
interface IRouter { function factory() external view returns (address); }
contract Pool {
    constructor(address payable fee, address[] memory team, uint256[] memory caps, IRouter router, IRouter[] memory hops) {}
}
"#;
        let profile = classify(source).unwrap();
        let signature = constructor_signature(&profile).unwrap().unwrap();
        let declared: Vec<String> = signature.params.iter().map(ParamType::sol_type).collect();
        assert_eq!(
            declared,
            vec!["address payable", "address[]", "uint256[]", "IRouter", "IRouter[]"]
        );
        assert_eq!(signature.abi_tuple(), "(address,address[],uint256[],address,address[])");

        let fee = Address::repeat_byte(0x33);
        let team = [Address::repeat_byte(0x11), Address::repeat_byte(0x12)];
        let router = Address::repeat_byte(0x22);
        let encoded = DynSolValue::Tuple(vec![
            DynSolValue::Address(fee),
            DynSolValue::Array(team.iter().map(|a| DynSolValue::Address(*a)).collect()),
            DynSolValue::Array(vec![DynSolValue::Uint(U256::from(5u64), 256)]),
            DynSolValue::Address(router),
            DynSolValue::Array(vec![DynSolValue::Address(router)]),
        ])
        .abi_encode_params();
        let decoded = decode_constructor_args(Some(&signature), &encoded).unwrap();

        assert_eq!(
            decoded.call_list(),
            format!(
                "payable({}), ctorArg0, ctorArg1, IRouter({}), ctorArg2",
                fee.to_checksum(None),
                router.to_checksum(None)
            )
        );
        assert_eq!(
            decoded.setup,
            vec![
                "address[] memory ctorArg0 = new address[](2);".to_string(),
                format!("ctorArg0[0] = {};", team[0].to_checksum(None)),
                format!("ctorArg0[1] = {};", team[1].to_checksum(None)),
                "uint256[] memory ctorArg1 = new uint256[](1);".to_string(),
                "ctorArg1[0] = 5;".to_string(),
                "IRouter[] memory ctorArg2 = new IRouter[](1);".to_string(),
                format!("ctorArg2[0] = IRouter({});", router.to_checksum(None)),
            ]
        );
    }

    #[test]
    fn test_nested_arrays_declare_inner_locals_first() {
        let signature = ConstructorSignature {
            params: vec![ParamType::Array {
                base: Box::new(ParamType::Array {
                    base: Box::new(ParamType::Elementary("uint256".into())),
                    length: None,
                }),
                length: None,
            }],
        };
        let encoded = DynSolValue::Tuple(vec![DynSolValue::Array(vec![
            DynSolValue::Array(vec![DynSolValue::Uint(U256::from(5u64), 256)]),
            DynSolValue::Array(vec![]),
        ])])
        .abi_encode_params();
        let decoded = decode_constructor_args(Some(&signature), &encoded).unwrap();
        assert_eq!(decoded.literals, vec!["ctorArg2".to_string()]);
        assert_eq!(
            decoded.setup,
            vec![
                "uint256[] memory ctorArg0 = new uint256[](1);".to_string(),
                "ctorArg0[0] = 5;".to_string(),
                "uint256[] memory ctorArg1 = new uint256[](0);".to_string(),
                "uint256[][] memory ctorArg2 = new uint256[][](2);".to_string(),
                "ctorArg2[0] = ctorArg0;".to_string(),
                "ctorArg2[1] = ctorArg1;".to_string(),
            ]
        );
    }
}
