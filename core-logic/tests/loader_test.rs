use core_logic::{ConfigError, CoreError, KeyLoader, ProxyManager, WalletError};
use std::io::Write;

const KEY_A: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
const KEY_B: &str = "0x8da4ef21b864d2cc526dbdb2a120bd2874c36c9d0a1fb7f8c63d7f7a8b41de8f";

fn write_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_keys_loaded_in_order_skipping_comments() {
    let file = write_file(&format!("# main keys\n{}\n\n{}\n", KEY_A, KEY_B));

    let keys = KeyLoader::load_from(file.path()).unwrap();

    assert_eq!(keys.len(), 2);
    assert_eq!(keys[0].as_str(), KEY_A);
    assert_eq!(keys[1].as_str(), KEY_B.trim_start_matches("0x"));
}

#[test]
fn test_short_key_reports_line() {
    let file = write_file(&format!("{}\nabcdef\n", KEY_A));

    let err = KeyLoader::load_from(file.path()).unwrap_err();
    assert!(matches!(
        err,
        CoreError::Wallet(WalletError::InvalidKeyLength { line: 2, length: 6 })
    ));
}

#[test]
fn test_non_hex_key_rejected() {
    let bad = "z".repeat(64);
    let file = write_file(&bad);

    let err = KeyLoader::load_from(file.path()).unwrap_err();
    assert!(matches!(
        err,
        CoreError::Wallet(WalletError::InvalidKeyFormat { line: 1 })
    ));
}

#[test]
fn test_missing_key_file() {
    let err = KeyLoader::load_from("/definitely/not/here.txt").unwrap_err();
    assert!(matches!(
        err,
        CoreError::Config(ConfigError::FileNotFound { .. })
    ));
}

#[test]
fn test_proxies_loaded_and_invalid_lines_skipped() {
    let file = write_file("1.1.1.1:80\n# comment\nbroken\nu:p@2.2.2.2:3128\n");

    let proxies = ProxyManager::load_from(file.path()).unwrap();

    assert_eq!(proxies.len(), 2);
    assert_eq!(proxies[0].url, "http://1.1.1.1:80");
    assert_eq!(proxies[1].url, "http://2.2.2.2:3128");
    assert_eq!(proxies[1].username.as_deref(), Some("u"));
}

#[test]
fn test_missing_proxy_file_means_no_proxies() {
    let proxies = ProxyManager::load_from("/definitely/not/proxies.txt").unwrap();
    assert!(proxies.is_empty());
}
