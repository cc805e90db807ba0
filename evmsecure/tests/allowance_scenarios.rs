mod support;

use std::{collections::HashMap, sync::Arc, time::Duration};

use ethers::types::{Address, U256};

use evmsecure::{AllowanceAggregator, NoBackoff, RequestKind, SecurityService};
use evmsecure_blockchain::ChainDataClient;
use evmsecure_common::{
    display_address, AllowanceSettings, KnownSpenderRegistry, NetworkKind, SecurityError,
    SpenderDiscovery, SpenderRisk,
};
use support::{address, into_client, token, FakeChain, RecordingBackoff};

fn uniswap_v2_router() -> Address {
    "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D".parse().unwrap()
}

fn settings(discovery: SpenderDiscovery) -> AllowanceSettings {
    AllowanceSettings {
        batch_size: 5,
        batch_delay: Duration::ZERO,
        max_tokens: 100,
        discovery,
    }
}

fn aggregator(fake: &Arc<FakeChain>, discovery: SpenderDiscovery) -> AllowanceAggregator {
    AllowanceAggregator::new(
        into_client(fake),
        Arc::new(KnownSpenderRegistry::builtin()),
        settings(discovery),
    )
    .with_backoff(Arc::new(NoBackoff))
}

#[tokio::test]
async fn test_invalid_owner_makes_no_calls() {
    let fake = Arc::new(FakeChain::new());
    let err = tokio_test::assert_err!(
        aggregator(&fake, SpenderDiscovery::ApprovalEvents)
            .get_allowances("0xnot-an-address")
            .await
    );
    assert!(matches!(err, SecurityError::InvalidAddress(_)));
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_token_history_failure_propagates() {
    let owner = address(0xab);
    let mut fake = FakeChain::new();
    fake.failing_history = true;
    let fake = Arc::new(fake);

    let err = aggregator(&fake, SpenderDiscovery::ApprovalEvents)
        .get_allowances(&display_address(&owner))
        .await
        .unwrap_err();
    assert_eq!(err, SecurityError::Network("invalid tokentx result".to_string()));
    assert_eq!(fake.count("get_token_metadata"), 0);
}

#[tokio::test]
async fn test_known_and_unknown_spenders() {
    let owner = address(0xab);
    let usdc = token(0x10, "USDC", 6);
    let router = uniswap_v2_router();
    let stranger = address(0x99);
    let revoked = address(0x98);

    let mut fake = FakeChain::new();
    fake.transfers.insert(owner, vec![usdc.address]);
    fake.metadata.insert(usdc.address, usdc.clone());
    fake.approvals.insert(
        (usdc.address, owner),
        vec![router, stranger, router, revoked],
    );
    fake.allowances.insert((usdc.address, owner, router), U256::MAX);
    fake.allowances
        .insert((usdc.address, owner, stranger), U256::from(1_000_000u64));
    fake.allowances.insert((usdc.address, owner, revoked), U256::zero());
    let fake = Arc::new(fake);

    let result = aggregator(&fake, SpenderDiscovery::ApprovalEvents)
        .get_allowances(&display_address(&owner))
        .await
        .unwrap();

    assert_eq!(result.address, owner);
    assert_eq!(result.chain_id, 1);
    assert!(result.timestamp > 0);
    assert_eq!(result.allowances.len(), 2);
    assert!(result.allowances.iter().all(|a| !a.amount.is_zero()));

    let known = &result.allowances[0];
    assert_eq!(known.spender, router);
    assert_eq!(known.symbol, "USDC");
    assert_eq!(known.decimals, 6);
    assert_eq!(known.spender_info.name, "Uniswap V2 Router");
    assert_eq!(known.spender_info.risk, SpenderRisk::Low);

    let unknown = &result.allowances[1];
    assert_eq!(unknown.spender, stranger);
    assert_eq!(unknown.spender_info.name, "Unknown Protocol");
    assert_eq!(unknown.spender_info.protocol, "Unknown");
    assert_eq!(unknown.spender_info.risk, SpenderRisk::Unknown);

    // Mỗi spender chỉ được đọc một lần
    assert_eq!(fake.count("get_allowance"), 3);
}

#[tokio::test]
async fn test_metadata_failure_uses_sentinel() {
    let owner = address(0xab);
    let mystery = address(0x20);
    let spender = address(0x77);

    let mut fake = FakeChain::new();
    fake.transfers.insert(owner, vec![mystery]);
    fake.approvals.insert((mystery, owner), vec![spender]);
    fake.allowances
        .insert((mystery, owner, spender), U256::exp10(18));
    let fake = Arc::new(fake);

    let result = aggregator(&fake, SpenderDiscovery::ApprovalEvents)
        .get_allowances(&display_address(&owner))
        .await
        .unwrap();

    assert_eq!(result.allowances.len(), 1);
    let allowance = &result.allowances[0];
    assert_eq!(allowance.symbol, "UNKNOWN");
    assert_eq!(allowance.name, "Unknown Token");
    assert_eq!(allowance.decimals, 18);
}

#[tokio::test]
async fn test_failed_reads_degrade() {
    let owner = address(0xab);
    let dai = token(0x10, "DAI", 18);
    let weth = token(0x11, "WETH", 18);
    let spender = address(0x77);
    let broken = address(0x78);

    let mut fake = FakeChain::new();
    fake.transfers.insert(owner, vec![dai.address, weth.address]);
    fake.metadata.insert(dai.address, dai.clone());
    fake.metadata.insert(weth.address, weth.clone());
    fake.failing_logs.insert(dai.address);
    fake.approvals.insert((weth.address, owner), vec![broken, spender]);
    fake.failing_allowances.insert((weth.address, broken));
    fake.allowances
        .insert((weth.address, owner, spender), U256::from(5u64));
    let fake = Arc::new(fake);

    let result = aggregator(&fake, SpenderDiscovery::ApprovalEvents)
        .get_allowances(&display_address(&owner))
        .await
        .unwrap();

    assert_eq!(result.allowances.len(), 1);
    assert_eq!(result.allowances[0].token, weth.address);
    assert_eq!(result.allowances[0].spender, spender);
}

#[tokio::test]
async fn test_allowlist_discovery_reads_every_known_spender() {
    let owner = address(0xab);
    let usdt = token(0x10, "USDT", 6);
    let router = uniswap_v2_router();

    let mut fake = FakeChain::new();
    fake.transfers.insert(owner, vec![usdt.address]);
    fake.metadata.insert(usdt.address, usdt.clone());
    fake.allowances
        .insert((usdt.address, owner, router), U256::from(42u64));
    let fake = Arc::new(fake);

    let registry = KnownSpenderRegistry::builtin();
    let result = aggregator(&fake, SpenderDiscovery::KnownSpenderAllowlist)
        .get_allowances(&display_address(&owner))
        .await
        .unwrap();

    assert_eq!(result.allowances.len(), 1);
    assert_eq!(result.allowances[0].spender, router);
    assert_eq!(fake.count("get_allowance"), registry.len());
    assert_eq!(fake.count("get_approval_spenders"), 0);
}

#[tokio::test]
async fn test_batches_and_token_cap() {
    let owner = address(0xab);
    let tokens: Vec<Address> = (1..=9u8).map(address).collect();

    let mut fake = FakeChain::new();
    fake.transfers.insert(owner, tokens);
    let fake = Arc::new(fake);

    let backoff = Arc::new(RecordingBackoff::default());
    let aggregator = AllowanceAggregator::new(
        into_client(&fake),
        Arc::new(KnownSpenderRegistry::builtin()),
        AllowanceSettings {
            batch_size: 3,
            batch_delay: Duration::from_secs(1),
            max_tokens: 7,
            discovery: SpenderDiscovery::ApprovalEvents,
        },
    )
    .with_backoff(backoff.clone());

    let result = aggregator
        .get_allowances(&display_address(&owner))
        .await
        .unwrap();

    assert!(result.allowances.is_empty());
    // 7 token -> 3 batch, không nghỉ sau batch cuối
    assert_eq!(fake.count("get_token_metadata"), 7);
    assert_eq!(*backoff.pauses.lock().unwrap(), vec![0, 1]);
}

#[tokio::test]
async fn test_service_renders_allowance_report() {
    let owner = address(0xab);
    let usdc = token(0x10, "USDC", 6);
    let router = uniswap_v2_router();

    let mut fake = FakeChain::new();
    fake.chain_id = 11_155_111;
    fake.transfers.insert(owner, vec![usdc.address]);
    fake.metadata.insert(usdc.address, usdc.clone());
    fake.approvals.insert((usdc.address, owner), vec![router]);
    fake.allowances.insert(
        (usdc.address, owner, router),
        (U256::one() << 96) - U256::one(),
    );
    let fake = Arc::new(fake);

    let mut clients: HashMap<NetworkKind, Arc<dyn ChainDataClient>> = HashMap::new();
    clients.insert(NetworkKind::Sepolia, into_client(&fake));
    let service = SecurityService::new(
        clients,
        Arc::new(KnownSpenderRegistry::builtin()),
        settings(SpenderDiscovery::ApprovalEvents),
        Duration::from_secs(5),
    )
    .with_backoff(Arc::new(NoBackoff));

    let text = format!("allowances for {} on Sepolia", display_address(&owner));
    let message = service.respond(RequestKind::Allowances, &text).await;
    assert_eq!(
        message,
        format!(
            "Found 1 token allowances for {}:\n\n\
             USDC (USDC Token):\n- Spender: Uniswap V2 Router\n- Protocol: Uniswap\n- Amount: Unlimited\n- Risk Level: LOW\n\n",
            display_address(&owner)
        )
    );

    // Mainnet chưa được cấu hình
    let text = format!("allowances for {}", display_address(&owner));
    let message = service.respond(RequestKind::Allowances, &text).await;
    assert!(message.starts_with("Analysis could not complete"));
}
