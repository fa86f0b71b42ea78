use crate::errors::ValidationError;
use serde_json::Value;

/// Basis points in one whole (100%).
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Coerce an extracted JSON value into a positive integer amount.
///
/// The extractor returns amounts as either a JSON number or a string; both
/// are accepted. Zero, negative, fractional and non-numeric values are
/// rejected. Amounts flow through the pipeline exactly as entered.
pub fn coerce_amount(field: &'static str, v: &Value) -> Result<u64, ValidationError> {
    let invalid = |detail: &str| ValidationError::InvalidAmount {
        field,
        detail: detail.to_owned(),
    };

    let n = match v {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| invalid("must be a positive integer"))?,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Err(invalid("empty"));
            }
            if s.starts_with('-') {
                return Err(invalid("must be positive"));
            }
            s.parse::<u64>()
                .map_err(|e| invalid(&format!("not an integer: {e}")))?
        }
        Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => {
            return Err(invalid("must be a number or numeric string"));
        }
    };

    if n == 0 {
        return Err(invalid("must be greater than zero"));
    }
    Ok(n)
}

/// Parse a slippage tolerance expressed in percent ("0.5", 0.5, "1") into
/// basis points, without float arithmetic.
///
/// At most two fractional digits are meaningful (1 bp resolution); more is
/// rejected rather than silently rounded. Anything above 100% is rejected.
pub fn parse_slippage_bps(v: &Value) -> Result<u32, ValidationError> {
    let text = match v {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_owned(),
        Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => {
            return Err(ValidationError::InvalidSlippage(
                "must be a number or numeric string".to_owned(),
            ));
        }
    };
    slippage_pct_to_bps(&text)
}

fn slippage_pct_to_bps(s: &str) -> Result<u32, ValidationError> {
    let invalid = |detail: &str| ValidationError::InvalidSlippage(format!("{detail}: {s:?}"));

    if s.is_empty() {
        return Err(invalid("empty"));
    }
    if s.starts_with('-') {
        return Err(invalid("must be non-negative"));
    }

    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if frac.len() > 2 {
        return Err(invalid("at most two decimal places (1 bp resolution)"));
    }

    let whole_v: u32 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_e| invalid("not a number"))?
    };
    let mut frac_padded = frac.to_owned();
    while frac_padded.len() < 2 {
        frac_padded.push('0');
    }
    let frac_v: u32 = if frac_padded.is_empty() {
        0
    } else {
        frac_padded.parse().map_err(|_e| invalid("not a number"))?
    };

    let bps = whole_v
        .checked_mul(100)
        .and_then(|w| w.checked_add(frac_v))
        .ok_or_else(|| invalid("overflow"))?;

    if u64::from(bps) > BPS_DENOMINATOR {
        return Err(invalid("above 100%"));
    }
    Ok(bps)
}

/// Minimum acceptable output after applying a slippage tolerance to a
/// reference amount. Integer math, rounds down.
pub fn min_out_after_slippage(amount: u64, slippage_bps: u32) -> u64 {
    let keep = BPS_DENOMINATOR.saturating_sub(u64::from(slippage_bps));
    let scaled = u128::from(amount) * u128::from(keep) / u128::from(BPS_DENOMINATOR);
    u64::try_from(scaled).unwrap_or(u64::MAX)
}
