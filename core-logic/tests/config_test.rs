use core_logic::config::{ChainConfig, DelayRange, ProxyConfig};
use std::time::Duration;

#[test]
fn test_delay_range_defaults() {
    let range = DelayRange::default();
    assert_eq!(range.min_secs, 10);
    assert_eq!(range.max_secs, 30);
    assert!(range.is_valid());
}

#[test]
fn test_delay_range_sample_within_bounds() {
    let range = DelayRange::new(2, 5);
    for _ in 0..200 {
        let d = range.sample();
        assert!(d >= Duration::from_secs(2));
        assert!(d <= Duration::from_secs(5));
    }
}

#[test]
fn test_delay_range_fixed_value() {
    let range = DelayRange::new(7, 7);
    assert_eq!(range.sample(), Duration::from_secs(7));
    assert_eq!(DelayRange::zero().sample(), Duration::ZERO);
}

#[test]
fn test_delay_range_inverted_is_invalid_but_sampleable() {
    let range = DelayRange::new(9, 3);
    assert!(!range.is_valid());
    let d = range.sample();
    assert!(d >= Duration::from_secs(3) && d <= Duration::from_secs(9));
}

#[test]
fn test_proxy_config_no_auth() {
    let proxy = ProxyConfig {
        url: "http://proxy.example.com:8080".to_string(),
        username: None,
        password: None,
    };

    assert!(proxy.username.is_none());
    assert!(proxy.password.is_none());
}

#[test]
fn test_chain_config() {
    let config = ChainConfig {
        name: "opBNB".to_string(),
        rpc_endpoint: "https://opbnb-mainnet-rpc.bnbchain.org".to_string(),
        chain_id: 204,
    };

    assert_eq!(config.name, "opBNB");
    assert_eq!(config.chain_id, 204);
}
