// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PORTÃO DE SEGURANÇA DE URL
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Só HTTP(S) e nunca endereços privados, loopback ou link-local.
// Nenhuma chamada de rede é feita aqui.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::net::{Ipv4Addr, Ipv6Addr};

use url::{Host, Url};

/// Verifica se a URL pode ser lida.
///
/// Rejeita esquemas diferentes de `http`/`https` e hosts em
/// 10.x, 172.16–31.x, 192.168.x, 127.x, 0.x, 169.254.x (e `localhost`/`::1`).
pub fn is_safe_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };

    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }

    match parsed.host() {
        Some(Host::Ipv4(ip)) => !is_blocked_ipv4(ip),
        Some(Host::Ipv6(ip)) => !is_blocked_ipv6(ip),
        Some(Host::Domain(domain)) => !domain.eq_ignore_ascii_case("localhost"),
        None => false,
    }
}

fn is_blocked_ipv4(ip: Ipv4Addr) -> bool {
    let [a, b, _, _] = ip.octets();
    a == 10
        || (a == 172 && (16..=31).contains(&b))
        || (a == 192 && b == 168)
        || a == 127
        || a == 0
        || (a == 169 && b == 254)
}

fn is_blocked_ipv6(ip: Ipv6Addr) -> bool {
    if ip.is_loopback() || ip.is_unspecified() {
        return true;
    }
    // fe80::/10
    if (ip.segments()[0] & 0xffc0) == 0xfe80 {
        return true;
    }
    ip.to_ipv4_mapped().map(is_blocked_ipv4).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_urls_are_safe() {
        assert!(is_safe_url("https://www.rust-lang.org/learn"));
        assert!(is_safe_url("http://93.184.216.34/page"));
        assert!(is_safe_url("https://172.32.0.1/"));
        assert!(is_safe_url("https://10example.com/"));
    }

    #[test]
    fn test_private_ranges_are_rejected() {
        for url in [
            "http://10.0.0.1/admin",
            "http://172.16.5.4/",
            "http://172.31.255.255/",
            "http://192.168.1.1/router",
            "http://127.0.0.1:8080/",
            "http://0.0.0.0/",
            "http://169.254.169.254/latest/meta-data",
            "http://localhost/",
            "http://[::1]/",
            "http://[fe80::1]/",
        ] {
            assert!(!is_safe_url(url), "{} deveria ser rejeitada", url);
        }
    }

    #[test]
    fn test_non_http_schemes_are_rejected() {
        assert!(!is_safe_url("ftp://example.com/file"));
        assert!(!is_safe_url("file:///etc/passwd"));
        assert!(!is_safe_url("javascript:alert(1)"));
        assert!(!is_safe_url("not a url"));
    }
}
