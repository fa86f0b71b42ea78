//! Operation kinds, raw extracted intents, and the validator that is the
//! sole gate between the schema-less extractor and the typed pipeline.

use crate::amount::{coerce_amount, parse_slippage_bps};
use crate::errors::ValidationError;
use crate::token::resolve_coin_type;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Profile label used when the extractor does not supply one.
pub const DEFAULT_PROFILE: &str = "Main Account";

/// Slippage tolerance applied when the extractor does not supply one (0.5%).
pub const DEFAULT_SLIPPAGE_BPS: u32 = 50;

/// The action requested by the caller. Fixed before extraction runs; the
/// extractor only fills in parameters, never picks the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    Lend,
    Borrow,
    Repay,
    Withdraw,
    Swap,
    AddLiquidity,
    RemoveLiquidity,
    Stake,
    Unstake,
    #[serde(rename = "create-account-profile")]
    CreateProfile,
}

impl OperationKind {
    /// Wire tag, identical to the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lend => "lend",
            Self::Borrow => "borrow",
            Self::Repay => "repay",
            Self::Withdraw => "withdraw",
            Self::Swap => "swap",
            Self::AddLiquidity => "add-liquidity",
            Self::RemoveLiquidity => "remove-liquidity",
            Self::Stake => "stake",
            Self::Unstake => "unstake",
            Self::CreateProfile => "create-account-profile",
        }
    }
}

/// Untyped field map as returned by the extractor. Consumed once.
pub type RawIntent = serde_json::Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LendingIntent {
    pub coin_type: String,
    pub amount: u64,
    pub profile: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapIntent {
    pub coin_in: String,
    pub coin_out: String,
    pub amount_in: u64,
    pub slippage_bps: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddLiquidityIntent {
    pub coin_a: String,
    pub coin_b: String,
    pub amount_a: u64,
    pub amount_b: u64,
    pub slippage_bps: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveLiquidityIntent {
    pub coin_a: String,
    pub coin_b: String,
    pub lp_amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakeIntent {
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileIntent {
    pub profile: String,
}

/// A per-kind typed record. Construction goes through [`validate`] only, so
/// holding one is proof the request passed the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatedIntent {
    Lend(LendingIntent),
    Borrow(LendingIntent),
    Repay(LendingIntent),
    Withdraw(LendingIntent),
    Swap(SwapIntent),
    AddLiquidity(AddLiquidityIntent),
    RemoveLiquidity(RemoveLiquidityIntent),
    Stake(StakeIntent),
    Unstake(StakeIntent),
    CreateProfile(ProfileIntent),
}

impl ValidatedIntent {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Lend(_) => OperationKind::Lend,
            Self::Borrow(_) => OperationKind::Borrow,
            Self::Repay(_) => OperationKind::Repay,
            Self::Withdraw(_) => OperationKind::Withdraw,
            Self::Swap(_) => OperationKind::Swap,
            Self::AddLiquidity(_) => OperationKind::AddLiquidity,
            Self::RemoveLiquidity(_) => OperationKind::RemoveLiquidity,
            Self::Stake(_) => OperationKind::Stake,
            Self::Unstake(_) => OperationKind::Unstake,
            Self::CreateProfile(_) => OperationKind::CreateProfile,
        }
    }
}

fn field<'a>(raw: &'a RawIntent, key: &str) -> Option<&'a Value> {
    raw.get(key).filter(|v| !v.is_null())
}

fn field_str<'a>(raw: &'a RawIntent, key: &str) -> Option<&'a str> {
    field(raw, key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn require_str<'a>(raw: &'a RawIntent, key: &'static str) -> Result<&'a str, ValidationError> {
    field_str(raw, key).ok_or(ValidationError::MissingField(key))
}

fn require_amount(raw: &RawIntent, key: &'static str) -> Result<u64, ValidationError> {
    let v = field(raw, key).ok_or(ValidationError::MissingField(key))?;
    coerce_amount(key, v)
}

fn profile_or_default(raw: &RawIntent) -> String {
    field_str(raw, "profile").map_or_else(|| DEFAULT_PROFILE.to_owned(), str::to_owned)
}

fn slippage_or_default(raw: &RawIntent) -> Result<u32, ValidationError> {
    match field(raw, "slippage") {
        Some(v) => parse_slippage_bps(v),
        None => Ok(DEFAULT_SLIPPAGE_BPS),
    }
}

/// Validate a raw extracted intent against the fixed schema of `kind`.
///
/// Pure over its inputs. Optional fields default deterministically; every
/// path either produces a fully-typed intent or names the offending field.
pub fn validate(kind: OperationKind, raw: &RawIntent) -> Result<ValidatedIntent, ValidationError> {
    match kind {
        OperationKind::Lend => lending(raw).map(ValidatedIntent::Lend),
        OperationKind::Borrow => lending(raw).map(ValidatedIntent::Borrow),
        OperationKind::Repay => lending(raw).map(ValidatedIntent::Repay),
        OperationKind::Withdraw => lending(raw).map(ValidatedIntent::Withdraw),
        OperationKind::Swap => {
            let amount_in = require_amount(raw, "amountIn")?;
            let coin_in = resolve_coin_type(require_str(raw, "tokenIn")?);
            let coin_out = resolve_coin_type(require_str(raw, "tokenOut")?);
            let slippage_bps = slippage_or_default(raw)?;
            Ok(ValidatedIntent::Swap(SwapIntent {
                coin_in,
                coin_out,
                amount_in,
                slippage_bps,
            }))
        }
        OperationKind::AddLiquidity => {
            let coin_a = resolve_coin_type(require_str(raw, "tokenA")?);
            let coin_b = resolve_coin_type(require_str(raw, "tokenB")?);
            let amount_a = require_amount(raw, "amountA")?;
            let amount_b = require_amount(raw, "amountB")?;
            let slippage_bps = slippage_or_default(raw)?;
            Ok(ValidatedIntent::AddLiquidity(AddLiquidityIntent {
                coin_a,
                coin_b,
                amount_a,
                amount_b,
                slippage_bps,
            }))
        }
        OperationKind::RemoveLiquidity => {
            let coin_a = resolve_coin_type(require_str(raw, "tokenA")?);
            let coin_b = resolve_coin_type(require_str(raw, "tokenB")?);
            let lp_amount = require_amount(raw, "amount")?;
            Ok(ValidatedIntent::RemoveLiquidity(RemoveLiquidityIntent {
                coin_a,
                coin_b,
                lp_amount,
            }))
        }
        OperationKind::Stake => {
            let amount = require_amount(raw, "amount")?;
            Ok(ValidatedIntent::Stake(StakeIntent { amount }))
        }
        OperationKind::Unstake => {
            let amount = require_amount(raw, "amount")?;
            Ok(ValidatedIntent::Unstake(StakeIntent { amount }))
        }
        OperationKind::CreateProfile => Ok(ValidatedIntent::CreateProfile(ProfileIntent {
            profile: profile_or_default(raw),
        })),
    }
}

fn lending(raw: &RawIntent) -> Result<LendingIntent, ValidationError> {
    let coin_type = resolve_coin_type(require_str(raw, "token")?);
    let amount = require_amount(raw, "amount")?;
    Ok(LendingIntent {
        coin_type,
        amount,
        profile: profile_or_default(raw),
    })
}
