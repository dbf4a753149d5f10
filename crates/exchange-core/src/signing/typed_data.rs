//! EIP-712 typed structured data hashing.
//!
//! Encodes a schema-described message into the 32-byte digest a verifying
//! contract recomputes on chain:
//!
//! ```text
//! digest      = keccak256(0x19 ‖ 0x01 ‖ domainSeparator ‖ hashStruct(primaryType, message))
//! hashStruct  = keccak256(typeHash ‖ encodeData)
//! typeHash    = keccak256(encodeType)
//! ```
//!
//! Every message is validated against its schema before any hashing takes
//! place. A message with a missing, extra or mistyped field is rejected.

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::{keccak256, Address, B256, I256, U256};

use super::domain::Eip712Domain;
use crate::error::SchemaError;

/// Name of the domain type every schema must declare.
pub const DOMAIN_TYPE: &str = "EIP712Domain";

/// A single `(type name)` member of a struct type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedField {
    pub name: String,
    pub ty: String,
}

impl TypedField {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }
}

/// Struct type definitions keyed by type name.
///
/// Field order within a type is significant: it fixes the byte layout of
/// the struct hash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypedDataSchema {
    types: BTreeMap<String, Vec<TypedField>>,
}

impl TypedDataSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type from `(name, type)` pairs, in declaration order.
    pub fn with_type(mut self, type_name: &str, fields: &[(&str, &str)]) -> Self {
        self.insert(
            type_name,
            fields
                .iter()
                .map(|(name, ty)| TypedField::new(*name, *ty))
                .collect(),
        );
        self
    }

    pub fn insert(&mut self, type_name: impl Into<String>, fields: Vec<TypedField>) {
        self.types.insert(type_name.into(), fields);
    }

    pub fn remove(&mut self, type_name: &str) -> Option<Vec<TypedField>> {
        self.types.remove(type_name)
    }

    pub fn fields(&self, type_name: &str) -> Option<&[TypedField]> {
        self.types.get(type_name).map(Vec::as_slice)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }
}

/// A value in a typed-data message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    Address(Address),
    Uint(U256),
    Int(I256),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    FixedBytes(Vec<u8>),
    Array(Vec<TypedValue>),
    Struct(TypedMessage),
}

/// Field name to value mapping for one struct instance.
pub type TypedMessage = BTreeMap<String, TypedValue>;

/// Solidity value types that encode to a single word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Atomic {
    Address,
    Bool,
    String,
    Bytes,
    Uint(usize),
    Int(usize),
    FixedBytes(usize),
}

fn parse_atomic(ty: &str) -> Option<Atomic> {
    match ty {
        "address" => return Some(Atomic::Address),
        "bool" => return Some(Atomic::Bool),
        "string" => return Some(Atomic::String),
        "bytes" => return Some(Atomic::Bytes),
        _ => {}
    }

    if let Some(bits) = ty.strip_prefix("uint") {
        return parse_int_width(bits).map(Atomic::Uint);
    }
    if let Some(bits) = ty.strip_prefix("int") {
        return parse_int_width(bits).map(Atomic::Int);
    }
    if let Some(len) = ty.strip_prefix("bytes") {
        return match len.parse::<usize>() {
            Ok(n) if (1..=32).contains(&n) => Some(Atomic::FixedBytes(n)),
            _ => None,
        };
    }
    None
}

fn parse_int_width(bits: &str) -> Option<usize> {
    match bits.parse::<usize>() {
        Ok(n) if n > 0 && n <= 256 && n % 8 == 0 => Some(n),
        _ => None,
    }
}

/// Split `T[]` / `T[k]` into the element type and optional fixed length.
///
/// Returns `None` for non-array types. A malformed length yields an element
/// type equal to the whole input, which then fails type resolution.
fn split_array(ty: &str) -> Option<(&str, Option<usize>)> {
    let inner = ty.strip_suffix(']')?;
    let open = inner.rfind('[')?;
    let len = &inner[open + 1..];
    if len.is_empty() {
        return Some((&inner[..open], None));
    }
    match len.parse::<usize>() {
        Ok(n) => Some((&inner[..open], Some(n))),
        Err(_) => Some((ty, None)),
    }
}

/// Strip every array suffix: `Person[][2]` -> `Person`.
fn base_type(mut ty: &str) -> &str {
    while let Some((elem, _)) = split_array(ty) {
        if elem == ty {
            break;
        }
        ty = elem;
    }
    ty
}

fn mismatch(field: &str, ty: &str) -> SchemaError {
    SchemaError::TypeMismatch {
        field: field.to_string(),
        expected: ty.to_string(),
    }
}

/// Hashes typed messages against a borrowed schema.
#[derive(Debug, Clone, Copy)]
pub struct TypedDataEncoder<'a> {
    schema: &'a TypedDataSchema,
}

impl<'a> TypedDataEncoder<'a> {
    pub fn new(schema: &'a TypedDataSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &'a TypedDataSchema {
        self.schema
    }

    /// Check that `message` is a complete, well-typed `primary_type` instance.
    pub fn validate(&self, primary_type: &str, message: &TypedMessage) -> Result<(), SchemaError> {
        if !self.schema.contains(DOMAIN_TYPE) {
            return Err(SchemaError::MissingType(DOMAIN_TYPE.to_string()));
        }
        self.validate_struct(primary_type, message)
    }

    /// Compute the EIP-712 signing digest of `message` under `domain`.
    pub fn hash(
        &self,
        primary_type: &str,
        message: &TypedMessage,
        domain: &Eip712Domain,
    ) -> Result<B256, SchemaError> {
        self.validate(primary_type, message)?;
        let domain_separator = self.domain_separator(domain)?;
        let struct_hash = self.hash_struct(primary_type, message)?;
        Ok(typed_data_digest(domain_separator, struct_hash))
    }

    /// Hash the domain using the members the schema declares for it.
    pub fn domain_separator(&self, domain: &Eip712Domain) -> Result<B256, SchemaError> {
        let fields = self
            .schema
            .fields(DOMAIN_TYPE)
            .ok_or_else(|| SchemaError::MissingType(DOMAIN_TYPE.to_string()))?;

        let mut all = domain.to_message();
        let values: TypedMessage = fields
            .iter()
            .filter_map(|f| all.remove(&f.name).map(|v| (f.name.clone(), v)))
            .collect();

        self.struct_hash(DOMAIN_TYPE, &values)
    }

    /// `keccak256(typeHash ‖ encodeData(values))`.
    ///
    /// `values` is validated against `type_name` first.
    pub fn struct_hash(&self, type_name: &str, values: &TypedMessage) -> Result<B256, SchemaError> {
        self.validate_struct(type_name, values)?;
        self.hash_struct(type_name, values)
    }

    pub fn type_hash(&self, type_name: &str) -> Result<B256, SchemaError> {
        Ok(keccak256(self.encode_type(type_name)?.as_bytes()))
    }

    /// Canonical type string: the type itself, then every referenced struct
    /// type in alphabetical order.
    pub fn encode_type(&self, type_name: &str) -> Result<String, SchemaError> {
        let mut deps = BTreeSet::new();
        self.collect_dependencies(type_name, &mut deps)?;
        deps.remove(type_name);

        let mut out = self.render_type(type_name)?;
        for dep in &deps {
            out.push_str(&self.render_type(dep)?);
        }
        Ok(out)
    }

    // Callers validate before hashing.
    fn hash_struct(&self, type_name: &str, values: &TypedMessage) -> Result<B256, SchemaError> {
        let fields = self.type_fields(type_name)?;

        let mut encoded = Vec::with_capacity(32 * (fields.len() + 1));
        encoded.extend_from_slice(self.type_hash(type_name)?.as_slice());

        for field in fields {
            let value = values
                .get(&field.name)
                .ok_or_else(|| SchemaError::MissingField {
                    type_name: type_name.to_string(),
                    field: field.name.clone(),
                })?;
            encoded.extend_from_slice(self.encode_field(&field.name, &field.ty, value)?.as_slice());
        }

        Ok(keccak256(&encoded))
    }

    fn type_fields(&self, type_name: &str) -> Result<&'a [TypedField], SchemaError> {
        self.schema
            .fields(type_name)
            .ok_or_else(|| SchemaError::MissingType(type_name.to_string()))
    }

    fn render_type(&self, type_name: &str) -> Result<String, SchemaError> {
        let members = self
            .type_fields(type_name)?
            .iter()
            .map(|f| format!("{} {}", f.ty, f.name))
            .collect::<Vec<_>>()
            .join(",");
        Ok(format!("{}({})", type_name, members))
    }

    fn collect_dependencies(
        &self,
        type_name: &str,
        found: &mut BTreeSet<String>,
    ) -> Result<(), SchemaError> {
        if found.contains(type_name) {
            return Ok(());
        }
        let fields = self.type_fields(type_name)?;
        found.insert(type_name.to_string());

        for field in fields {
            let base = base_type(&field.ty);
            if parse_atomic(base).is_some() {
                continue;
            }
            if !self.schema.contains(base) {
                return Err(SchemaError::UnknownType {
                    field: field.name.clone(),
                    ty: field.ty.clone(),
                });
            }
            self.collect_dependencies(base, found)?;
        }
        Ok(())
    }

    fn validate_struct(&self, type_name: &str, message: &TypedMessage) -> Result<(), SchemaError> {
        let fields = self.type_fields(type_name)?;

        for field in fields {
            let value = message
                .get(&field.name)
                .ok_or_else(|| SchemaError::MissingField {
                    type_name: type_name.to_string(),
                    field: field.name.clone(),
                })?;
            self.validate_value(&field.name, &field.ty, value)?;
        }

        if let Some(extra) = message
            .keys()
            .find(|key| !fields.iter().any(|f| &f.name == *key))
        {
            return Err(SchemaError::UnexpectedField {
                type_name: type_name.to_string(),
                field: extra.clone(),
            });
        }
        Ok(())
    }

    fn validate_value(&self, field: &str, ty: &str, value: &TypedValue) -> Result<(), SchemaError> {
        if let Some((elem, len)) = split_array(ty) {
            if elem == ty {
                return Err(SchemaError::UnknownType {
                    field: field.to_string(),
                    ty: ty.to_string(),
                });
            }
            let TypedValue::Array(items) = value else {
                return Err(mismatch(field, ty));
            };
            if len.is_some_and(|n| n != items.len()) {
                return Err(mismatch(field, ty));
            }
            return items
                .iter()
                .try_for_each(|item| self.validate_value(field, elem, item));
        }

        if let Some(atomic) = parse_atomic(ty) {
            let out_of_range = || SchemaError::OutOfRange {
                field: field.to_string(),
                ty: ty.to_string(),
            };
            return match (atomic, value) {
                (Atomic::Address, TypedValue::Address(_))
                | (Atomic::Bool, TypedValue::Bool(_))
                | (Atomic::String, TypedValue::String(_))
                | (Atomic::Bytes, TypedValue::Bytes(_)) => Ok(()),
                (Atomic::Uint(bits), TypedValue::Uint(v)) => {
                    if v.bit_len() > bits {
                        Err(out_of_range())
                    } else {
                        Ok(())
                    }
                }
                (Atomic::Int(bits), TypedValue::Int(v)) => {
                    if int_fits(v, bits) {
                        Ok(())
                    } else {
                        Err(out_of_range())
                    }
                }
                (Atomic::FixedBytes(n), TypedValue::FixedBytes(b)) => {
                    if b.len() == n {
                        Ok(())
                    } else {
                        Err(mismatch(field, ty))
                    }
                }
                _ => Err(mismatch(field, ty)),
            };
        }

        if self.schema.contains(ty) {
            let TypedValue::Struct(inner) = value else {
                return Err(mismatch(field, ty));
            };
            return self.validate_struct(ty, inner);
        }

        Err(SchemaError::UnknownType {
            field: field.to_string(),
            ty: ty.to_string(),
        })
    }

    fn encode_field(&self, field: &str, ty: &str, value: &TypedValue) -> Result<B256, SchemaError> {
        if let Some((elem, _)) = split_array(ty) {
            let TypedValue::Array(items) = value else {
                return Err(mismatch(field, ty));
            };
            let mut encoded = Vec::with_capacity(32 * items.len());
            for item in items {
                encoded.extend_from_slice(self.encode_field(field, elem, item)?.as_slice());
            }
            return Ok(keccak256(&encoded));
        }

        match parse_atomic(ty) {
            Some(atomic) => match (atomic, value) {
                (Atomic::String, TypedValue::String(s)) => Ok(keccak256(s.as_bytes())),
                (Atomic::Bytes, TypedValue::Bytes(b)) => Ok(keccak256(b)),
                // Addresses are left-padded from 20 bytes to a full word.
                (Atomic::Address, TypedValue::Address(a)) => {
                    Ok(B256::left_padding_from(a.as_slice()))
                }
                (Atomic::Bool, TypedValue::Bool(b)) => {
                    Ok(B256::from(U256::from(*b as u8).to_be_bytes::<32>()))
                }
                (Atomic::Uint(_), TypedValue::Uint(v)) => Ok(B256::from(v.to_be_bytes::<32>())),
                (Atomic::Int(_), TypedValue::Int(v)) => Ok(B256::from(v.to_be_bytes::<32>())),
                (Atomic::FixedBytes(n), TypedValue::FixedBytes(b)) => {
                    if b.len() != n {
                        return Err(SchemaError::OutOfRange {
                            field: field.to_string(),
                            ty: ty.to_string(),
                        });
                    }
                    Ok(B256::right_padding_from(b))
                }
                _ => Err(mismatch(field, ty)),
            },
            None => match value {
                TypedValue::Struct(inner) => self.hash_struct(ty, inner),
                _ => Err(mismatch(field, ty)),
            },
        }
    }
}

fn int_fits(value: &I256, bits: usize) -> bool {
    if bits == 256 {
        return true;
    }
    let (sign, abs) = value.into_sign_and_abs();
    let limit = U256::from(1u8) << (bits - 1);
    if sign.is_negative() {
        abs <= limit
    } else {
        abs < limit
    }
}

/// `keccak256("\x19\x01" ‖ domainSeparator ‖ structHash)`.
pub fn typed_data_digest(domain_separator: B256, struct_hash: B256) -> B256 {
    let mut data = [0u8; 66];
    data[0] = 0x19;
    data[1] = 0x01;
    data[2..34].copy_from_slice(domain_separator.as_slice());
    data[34..].copy_from_slice(struct_hash.as_slice());
    keccak256(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256};

    fn mail_schema() -> TypedDataSchema {
        TypedDataSchema::new()
            .with_type(
                DOMAIN_TYPE,
                &[
                    ("name", "string"),
                    ("version", "string"),
                    ("chainId", "uint256"),
                    ("verifyingContract", "address"),
                ],
            )
            .with_type("Person", &[("name", "string"), ("wallet", "address")])
            .with_type(
                "Mail",
                &[("from", "Person"), ("to", "Person"), ("contents", "string")],
            )
    }

    fn mail_domain() -> Eip712Domain {
        Eip712Domain::custom(
            "Ether Mail",
            "1",
            1,
            address!("CcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"),
        )
    }

    fn person(name: &str, wallet: Address) -> TypedValue {
        TypedValue::Struct(TypedMessage::from([
            ("name".to_string(), TypedValue::String(name.to_string())),
            ("wallet".to_string(), TypedValue::Address(wallet)),
        ]))
    }

    fn mail_message() -> TypedMessage {
        TypedMessage::from([
            (
                "from".to_string(),
                person("Cow", address!("CD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826")),
            ),
            (
                "to".to_string(),
                person("Bob", address!("bBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB")),
            ),
            (
                "contents".to_string(),
                TypedValue::String("Hello, Bob!".to_string()),
            ),
        ])
    }

    #[test]
    fn test_encode_type_lists_dependencies() {
        let schema = mail_schema();
        let encoder = TypedDataEncoder::new(&schema);
        assert_eq!(
            encoder.encode_type("Mail").unwrap(),
            "Mail(Person from,Person to,string contents)Person(string name,address wallet)"
        );
        assert_eq!(
            encoder.type_hash("Mail").unwrap(),
            b256!("a0cedeb2dc280ba39b857546d74f5549c3a1d7bdc2dd96bf881f76108e23dac2")
        );
    }

    #[test]
    fn test_mail_reference_vectors() {
        let schema = mail_schema();
        let encoder = TypedDataEncoder::new(&schema);

        assert_eq!(
            encoder.domain_separator(&mail_domain()).unwrap(),
            b256!("f2cee375fa42b42143804025fc449deafd50cc031ca257e0b194a650a912090f")
        );
        assert_eq!(
            encoder.struct_hash("Mail", &mail_message()).unwrap(),
            b256!("c52c0ee5d84264471806290a3f2c4cecfc5490626bf912d01f240d7a274b371e")
        );
        assert_eq!(
            encoder.hash("Mail", &mail_message(), &mail_domain()).unwrap(),
            b256!("be609aee343fb3c4b28e1df9e632fca64fcfaede20f02e86244efddf30957bd2")
        );
    }

    #[test]
    fn test_domain_separator_matches_fixed_layout() {
        let schema = mail_schema();
        let encoder = TypedDataEncoder::new(&schema);
        let domain = mail_domain();
        assert_eq!(encoder.domain_separator(&domain).unwrap(), domain.separator());
    }

    #[test]
    fn test_hash_is_deterministic() {
        let schema = mail_schema();
        let encoder = TypedDataEncoder::new(&schema);
        let a = encoder.hash("Mail", &mail_message(), &mail_domain()).unwrap();
        let b = encoder.hash("Mail", &mail_message(), &mail_domain()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_field_order_changes_digest() {
        let schema = mail_schema();
        let reordered = mail_schema().with_type(
            "Mail",
            &[("to", "Person"), ("from", "Person"), ("contents", "string")],
        );
        let a = TypedDataEncoder::new(&schema)
            .hash("Mail", &mail_message(), &mail_domain())
            .unwrap();
        let b = TypedDataEncoder::new(&reordered)
            .hash("Mail", &mail_message(), &mail_domain())
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_missing_primary_type_rejected() {
        let mut schema = mail_schema();
        schema.remove("Mail");
        let encoder = TypedDataEncoder::new(&schema);
        assert_eq!(
            encoder.validate("Mail", &mail_message()),
            Err(SchemaError::MissingType("Mail".to_string()))
        );
        assert!(encoder.hash("Mail", &mail_message(), &mail_domain()).is_err());
    }

    #[test]
    fn test_missing_domain_type_rejected() {
        let mut schema = mail_schema();
        schema.remove(DOMAIN_TYPE);
        let encoder = TypedDataEncoder::new(&schema);
        assert_eq!(
            encoder.validate("Mail", &mail_message()),
            Err(SchemaError::MissingType(DOMAIN_TYPE.to_string()))
        );
    }

    #[test]
    fn test_missing_field_rejected() {
        let schema = mail_schema();
        let encoder = TypedDataEncoder::new(&schema);
        let mut message = mail_message();
        message.remove("contents");

        assert_eq!(
            encoder.validate("Mail", &message),
            Err(SchemaError::MissingField {
                type_name: "Mail".to_string(),
                field: "contents".to_string(),
            })
        );
    }

    #[test]
    fn test_undeclared_field_rejected() {
        let schema = mail_schema();
        let encoder = TypedDataEncoder::new(&schema);
        let mut message = mail_message();
        message.insert("cc".to_string(), TypedValue::String("Alice".to_string()));

        assert!(matches!(
            encoder.validate("Mail", &message),
            Err(SchemaError::UnexpectedField { .. })
        ));
    }

    #[test]
    fn test_unknown_field_type_rejected() {
        let schema = mail_schema().with_type("Note", &[("author", "Writer")]);
        let encoder = TypedDataEncoder::new(&schema);
        let message = TypedMessage::from([(
            "author".to_string(),
            TypedValue::String("x".to_string()),
        )]);

        assert_eq!(
            encoder.validate("Note", &message),
            Err(SchemaError::UnknownType {
                field: "author".to_string(),
                ty: "Writer".to_string(),
            })
        );
        assert!(encoder.encode_type("Note").is_err());
    }

    #[test]
    fn test_nested_struct_validated() {
        let schema = mail_schema();
        let encoder = TypedDataEncoder::new(&schema);
        let mut message = mail_message();
        message.insert(
            "to".to_string(),
            TypedValue::Struct(TypedMessage::from([(
                "name".to_string(),
                TypedValue::String("Bob".to_string()),
            )])),
        );

        assert_eq!(
            encoder.validate("Mail", &message),
            Err(SchemaError::MissingField {
                type_name: "Person".to_string(),
                field: "wallet".to_string(),
            })
        );
    }

    #[test]
    fn test_value_type_mismatch_rejected() {
        let schema = mail_schema();
        let encoder = TypedDataEncoder::new(&schema);
        let mut message = mail_message();
        message.insert("contents".to_string(), TypedValue::Uint(U256::from(1u8)));

        assert!(matches!(
            encoder.validate("Mail", &message),
            Err(SchemaError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_integer_width_enforced() {
        let schema = TypedDataSchema::new()
            .with_type(DOMAIN_TYPE, &[("name", "string")])
            .with_type("Tick", &[("side", "uint8"), ("delta", "int8")]);
        let encoder = TypedDataEncoder::new(&schema);

        let ok = TypedMessage::from([
            ("side".to_string(), TypedValue::Uint(U256::from(255u16))),
            ("delta".to_string(), TypedValue::Int(I256::try_from(-128i64).unwrap())),
        ]);
        assert!(encoder.validate("Tick", &ok).is_ok());

        let too_wide = TypedMessage::from([
            ("side".to_string(), TypedValue::Uint(U256::from(256u16))),
            ("delta".to_string(), TypedValue::Int(I256::ZERO)),
        ]);
        assert!(matches!(
            encoder.validate("Tick", &too_wide),
            Err(SchemaError::OutOfRange { .. })
        ));

        let too_negative = TypedMessage::from([
            ("side".to_string(), TypedValue::Uint(U256::ZERO)),
            ("delta".to_string(), TypedValue::Int(I256::try_from(-129i64).unwrap())),
        ]);
        assert!(matches!(
            encoder.validate("Tick", &too_negative),
            Err(SchemaError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_struct_hash_rejects_invalid_message() {
        let schema = TypedDataSchema::new()
            .with_type(DOMAIN_TYPE, &[("name", "string")])
            .with_type("Tick", &[("side", "uint8"), ("tag", "bytes4")]);
        let encoder = TypedDataEncoder::new(&schema);
        let tick = |side: u16, tag: Vec<u8>| {
            TypedMessage::from([
                ("side".to_string(), TypedValue::Uint(U256::from(side))),
                ("tag".to_string(), TypedValue::FixedBytes(tag)),
            ])
        };

        assert!(encoder.struct_hash("Tick", &tick(1, vec![0; 4])).is_ok());

        assert!(matches!(
            encoder.struct_hash("Tick", &tick(256, vec![0; 4])),
            Err(SchemaError::OutOfRange { .. })
        ));

        let mut extra = tick(1, vec![0; 4]);
        extra.insert("memo".to_string(), TypedValue::Bool(true));
        assert!(matches!(
            encoder.struct_hash("Tick", &extra),
            Err(SchemaError::UnexpectedField { .. })
        ));

        // Longer than a word: rejected instead of padded.
        assert!(encoder.struct_hash("Tick", &tick(1, vec![0xab; 40])).is_err());
        assert_eq!(
            encoder.encode_field("tag", "bytes4", &TypedValue::FixedBytes(vec![0xab; 40])),
            Err(SchemaError::OutOfRange {
                field: "tag".to_string(),
                ty: "bytes4".to_string(),
            })
        );
    }

    #[test]
    fn test_arrays_hash_concatenated_elements() {
        let schema = TypedDataSchema::new()
            .with_type(DOMAIN_TYPE, &[("name", "string")])
            .with_type("Batch", &[("ids", "uint256[]"), ("tags", "bytes4[2]")]);
        let encoder = TypedDataEncoder::new(&schema);

        let message = TypedMessage::from([
            (
                "ids".to_string(),
                TypedValue::Array(vec![
                    TypedValue::Uint(U256::from(1u8)),
                    TypedValue::Uint(U256::from(2u8)),
                ]),
            ),
            (
                "tags".to_string(),
                TypedValue::Array(vec![
                    TypedValue::FixedBytes(vec![0xde, 0xad, 0xbe, 0xef]),
                    TypedValue::FixedBytes(vec![0, 0, 0, 1]),
                ]),
            ),
        ]);
        assert!(encoder.validate("Batch", &message).is_ok());

        let mut ids = Vec::new();
        ids.extend_from_slice(&U256::from(1u8).to_be_bytes::<32>());
        ids.extend_from_slice(&U256::from(2u8).to_be_bytes::<32>());
        let encoded = encoder
            .encode_field("ids", "uint256[]", &message["ids"])
            .unwrap();
        assert_eq!(encoded, keccak256(&ids));

        let mut short = message.clone();
        short.insert(
            "tags".to_string(),
            TypedValue::Array(vec![TypedValue::FixedBytes(vec![0, 0, 0, 1])]),
        );
        assert!(encoder.validate("Batch", &short).is_err());
    }

    #[test]
    fn test_split_array() {
        assert_eq!(split_array("uint256[]"), Some(("uint256", None)));
        assert_eq!(split_array("Person[3]"), Some(("Person", Some(3))));
        assert_eq!(split_array("uint256"), None);
        assert_eq!(base_type("Person[][2]"), "Person");
    }
}
