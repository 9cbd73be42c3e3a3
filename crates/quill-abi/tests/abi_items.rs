//! Contract-level tests: JSON ABI, calls, logs and reverts

use quill_abi::{
    format_call, parse_abi, AbiCodec, AbiItem, Address, CodecConfig, ContractError, DecodeError, DecodeMode, Event,
    Function, H256, Value,
};

const TOKEN_ABI: &str = r#"[
    {
        "type": "constructor",
        "inputs": [{"name": "supply", "type": "uint256"}],
        "stateMutability": "nonpayable"
    },
    {
        "type": "function",
        "name": "balanceOf",
        "inputs": [{"name": "owner", "type": "address"}],
        "outputs": [{"name": "", "type": "uint256"}],
        "stateMutability": "view"
    },
    {
        "type": "function",
        "name": "batch",
        "inputs": [{
            "name": "transfers",
            "type": "tuple[]",
            "components": [
                {"name": "to", "type": "address"},
                {"name": "amount", "type": "uint256"},
                {"name": "memo", "type": "string"}
            ]
        }],
        "outputs": [],
        "stateMutability": "nonpayable"
    },
    {
        "type": "event",
        "name": "Approval",
        "inputs": [
            {"name": "owner", "type": "address", "indexed": true},
            {"name": "spender", "type": "address", "indexed": true},
            {"name": "value", "type": "uint256", "indexed": false}
        ],
        "anonymous": false
    },
    {
        "type": "error",
        "name": "InsufficientBalance",
        "inputs": [
            {"name": "available", "type": "uint256"},
            {"name": "required", "type": "uint256"}
        ]
    },
    {"type": "fallback", "stateMutability": "payable"}
]"#;

fn address_topic(addr: &Address) -> H256 {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(addr.as_bytes());
    H256::from_bytes(word)
}

fn find_function<'a>(items: &'a [AbiItem], name: &str) -> &'a Function {
    items
        .iter()
        .find_map(|item| match item {
            AbiItem::Function(f) if f.name() == Some(name) => Some(f),
            _ => None,
        })
        .unwrap()
}

// ==================== JSON ABI ====================

#[test]
fn test_token_abi_items() {
    let items = parse_abi(TOKEN_ABI).unwrap();
    assert_eq!(items.len(), 6);

    let balance_of = find_function(&items, "balanceOf");
    assert_eq!(balance_of.canonical_signature(), "balanceOf(address)");
    assert_eq!(balance_of.selector_hex(), "70a08231");

    let batch = find_function(&items, "batch");
    assert_eq!(batch.canonical_signature(), "batch((address,uint256,string)[])");
    assert_eq!(items[0].name(), None);
    assert_eq!(items[5].name(), None);
}

#[test]
fn test_batch_call_round_trip() {
    let items = parse_abi(TOKEN_ABI).unwrap();
    let batch = find_function(&items, "batch");
    let args = vec![Value::Array(vec![
        Value::Tuple(vec![
            Value::Address(Address::from_bytes([0x01; 20])),
            Value::uint(5u64),
            Value::string("rent"),
        ]),
        Value::Tuple(vec![
            Value::Address(Address::from_bytes([0x02; 20])),
            Value::uint(7u64),
            Value::string(""),
        ]),
    ])];

    let call = batch.encode_call(&args).unwrap();
    assert_eq!(call.len(), batch.measure_call_length(&args).unwrap());
    assert_eq!(batch.decode_call(&call).unwrap(), args);

    let formatted = format_call(&call).unwrap();
    assert_eq!(formatted.lines().count(), 1 + (call.len() - 4) / 32);
    assert!(formatted.starts_with(&format!("ID       {}", batch.selector_hex())));
}

#[test]
fn test_view_return() {
    let items = parse_abi(TOKEN_ABI).unwrap();
    let balance_of = find_function(&items, "balanceOf");
    let mut ret = [0u8; 32];
    ret[30] = 0x01;
    assert_eq!(balance_of.decode_single_return(&ret).unwrap(), Value::uint(256u64));
}

// ==================== Events ====================

#[test]
fn test_approval_log() {
    let items = parse_abi(TOKEN_ABI).unwrap();
    let approval: &Event = items
        .iter()
        .find_map(|item| match item {
            AbiItem::Event(e) => Some(e),
            _ => None,
        })
        .unwrap();
    assert_eq!(
        approval.signature_hash().to_hex(),
        "0x8c5be1e5ebec7d5bd14f71427d1e84f3dd0314c0f7b2291e5b200ac8c7c3b925"
    );

    let owner = Address::from_bytes([0xaa; 20]);
    let spender = Address::from_bytes([0xbb; 20]);
    let topics = [approval.signature_hash(), address_topic(&owner), address_topic(&spender)];
    let mut data = [0u8; 32];
    data[31] = 42;

    let args = approval.decode_args(&topics, &data).unwrap();
    assert_eq!(
        args,
        vec![Value::Address(owner), Value::Address(spender), Value::uint(42u64)]
    );
}

// ==================== Errors ====================

#[test]
fn test_revert_from_abi() {
    let items = parse_abi(TOKEN_ABI).unwrap();
    let err: &ContractError = items
        .iter()
        .find_map(|item| match item {
            AbiItem::Error(e) => Some(e),
            _ => None,
        })
        .unwrap();
    assert_eq!(err.selector_hex(), "cf479181");

    let revert = err.encode_revert(&[Value::uint(1u64), Value::uint(2u64)]).unwrap();
    assert_eq!(err.decode_revert(&revert).unwrap(), vec![Value::uint(1u64), Value::uint(2u64)]);
}

// ==================== Codec facade ====================

#[test]
fn test_codec_from_config_json() {
    let config: CodecConfig = serde_json::from_str(r#"{"decode_mode": "lenient", "max_type_length": 64}"#).unwrap();
    assert_eq!(config.decode_mode, DecodeMode::Lenient);
    let codec = AbiCodec::new(config);

    let call = codec
        .encode_call("transfer(address,uint256)", &[Value::Address(Address::ZERO), Value::uint(1u64)])
        .unwrap();
    assert_eq!(hex::encode(&call[..4]), "a9059cbb");
    assert!(codec.parse_signature(&format!("f({})", "uint8,".repeat(20))).is_err());
}

#[test]
fn test_misaligned_call_is_rejected() {
    assert_eq!(
        format_call(&[0u8; 37]).unwrap_err(),
        DecodeError::MisalignedCall { len: 37 }
    );
}
