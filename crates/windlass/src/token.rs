//! Coin catalog: user-facing symbols to fully-qualified on-chain coin types.
//!
//! Pure lookup tables shared by every adapter. Unknown inputs never fail:
//! forward resolution passes the caller's text through (the chain rejects
//! nonsense at build time), reverse resolution falls back to a short label.

/// The network's native coin.
pub const NATIVE_COIN: &str = "0x1::aptos_coin::AptosCoin";

/// Known coins, symbol first. Bridged stables/majors share one issuer
/// address with per-asset struct names.
const CATALOG: &[(&str, &str)] = &[
    ("APT", NATIVE_COIN),
    (
        "USDC",
        "0xf22bede237a07e121b56d91a491eb7bcdfd1f5907926a9e58338f964a01b17fa::asset::USDC",
    ),
    (
        "USDT",
        "0xf22bede237a07e121b56d91a491eb7bcdfd1f5907926a9e58338f964a01b17fa::asset::USDT",
    ),
    (
        "WETH",
        "0xf22bede237a07e121b56d91a491eb7bcdfd1f5907926a9e58338f964a01b17fa::asset::WETH",
    ),
];

/// Resolve user text (symbol or already-qualified coin type) to a coin type.
///
/// Unknown symbols pass through untouched so the node, not this table, is
/// the authority on what exists.
pub fn resolve_coin_type(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.contains("::") {
        return trimmed.to_owned();
    }
    match normalized_symbol(trimmed) {
        Some(coin_type) => coin_type.to_owned(),
        None => trimmed.to_owned(),
    }
}

fn normalized_symbol(symbol: &str) -> Option<&'static str> {
    let lower = symbol.to_ascii_lowercase();
    let canonical = match lower.as_str() {
        "apt" | "aptos" => "APT",
        other => other,
    };
    CATALOG
        .iter()
        .find(|(sym, _)| sym.eq_ignore_ascii_case(canonical))
        .map(|(_, coin_type)| *coin_type)
}

/// Short display label for a coin type, for human-readable summaries.
///
/// Known types map back to their symbol; anything else falls back to the
/// struct-name segment (or a generic label) rather than failing.
pub fn symbol_for(coin_type: &str) -> String {
    let trimmed = coin_type.trim();
    if let Some((sym, _)) = CATALOG.iter().find(|(_, ct)| *ct == trimmed) {
        return (*sym).to_owned();
    }
    match trimmed.rsplit("::").next() {
        Some(seg) if !seg.is_empty() && seg != trimmed => seg.to_owned(),
        _ => "token".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_resolve_case_insensitively() {
        assert_eq!(resolve_coin_type("APT"), NATIVE_COIN);
        assert_eq!(resolve_coin_type("apt"), NATIVE_COIN);
        assert_eq!(resolve_coin_type("Aptos"), NATIVE_COIN);
        assert!(resolve_coin_type("usdc").ends_with("::asset::USDC"), "usdc resolves");
    }

    #[test]
    fn qualified_types_pass_through() {
        let t = "0xabc::lp::Pool";
        assert_eq!(resolve_coin_type(t), t);
    }

    #[test]
    fn unknown_symbols_pass_through() {
        assert_eq!(resolve_coin_type("XYZ"), "XYZ");
    }

    #[test]
    fn reverse_lookup_falls_back_to_struct_name() {
        assert_eq!(symbol_for(NATIVE_COIN), "APT");
        assert_eq!(symbol_for("0xabc::coin::DOODLE"), "DOODLE");
        assert_eq!(symbol_for("weird"), "token");
    }
}
