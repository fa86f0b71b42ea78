//! Protocol adapter registry: pure mappings from a validated intent to a
//! fully-resolved entry-function call.
//!
//! One builder per protocol concern, dispatched by a total `match` over the
//! intent variants, so an unhandled operation is a compile error rather than
//! a runtime surprise. Adapters never perform I/O; argument wire encoding
//! (hex for byte vectors, decimal strings for u64) belongs to the chain
//! client, not here.

use crate::amount::min_out_after_slippage;
use crate::intent::{
    AddLiquidityIntent, LendingIntent, ProfileIntent, RemoveLiquidityIntent, StakeIntent,
    SwapIntent, ValidatedIntent,
};
use crate::token::symbol_for;

/// Deployed lending controller (profile-based money market).
const LENDING_ADDRESS: &str =
    "0x9770fa9c725cbd97eb50b2be5f7416efdfd1f1554beb0750d4dae4c64e860da3";

/// Deployed swap/liquidity router and its curve types.
const SWAP_ADDRESS: &str =
    "0x190d44266241744264b964a37b8f09863167a12d3e70cda39376cfb4e3561e12";

/// Deployed liquid-staking router.
const STAKING_ADDRESS: &str =
    "0x8f396e4246b2ba87b51c0739ef5ea4f26515a98375308c31ac2ec1e42142a57f";

/// A positional entry-function argument, typed so tests can assert on call
/// shape without caring about wire encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryArg {
    U64(u64),
    Bool(bool),
    /// UTF-8 text passed on-chain as a byte vector (profile labels).
    Utf8(String),
}

/// A fully-resolved on-chain call: `0xADDR::module::name`, ordered type
/// arguments, ordered positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallDescriptor {
    pub function: String,
    pub type_args: Vec<String>,
    pub args: Vec<EntryArg>,
}

fn entry(address: &str, module: &str, name: &str) -> String {
    format!("{address}::{module}::{name}")
}

/// Resolve a validated intent into its protocol call. Deterministic: the
/// same intent always produces the same descriptor.
pub fn resolve(intent: &ValidatedIntent) -> CallDescriptor {
    match intent {
        ValidatedIntent::Lend(i) => lending_deposit(i, false),
        ValidatedIntent::Repay(i) => lending_deposit(i, true),
        ValidatedIntent::Withdraw(i) => lending_withdraw(i, false),
        ValidatedIntent::Borrow(i) => lending_withdraw(i, true),
        ValidatedIntent::Swap(i) => swap(i),
        ValidatedIntent::AddLiquidity(i) => add_liquidity(i),
        ValidatedIntent::RemoveLiquidity(i) => remove_liquidity(i),
        ValidatedIntent::Stake(i) => stake_router(i, "stake"),
        ValidatedIntent::Unstake(i) => stake_router(i, "unstake"),
        ValidatedIntent::CreateProfile(i) => register_profile(i),
    }
}

/// The lending controller folds four user operations onto two entry
/// functions: `deposit(profile, amount, repay_only)` and
/// `withdraw(profile, amount, allow_borrow)`.
fn lending_deposit(i: &LendingIntent, repay_only: bool) -> CallDescriptor {
    CallDescriptor {
        function: entry(LENDING_ADDRESS, "controller", "deposit"),
        type_args: vec![i.coin_type.clone()],
        args: vec![
            EntryArg::Utf8(i.profile.clone()),
            EntryArg::U64(i.amount),
            EntryArg::Bool(repay_only),
        ],
    }
}

fn lending_withdraw(i: &LendingIntent, allow_borrow: bool) -> CallDescriptor {
    CallDescriptor {
        function: entry(LENDING_ADDRESS, "controller", "withdraw"),
        type_args: vec![i.coin_type.clone()],
        args: vec![
            EntryArg::Utf8(i.profile.clone()),
            EntryArg::U64(i.amount),
            EntryArg::Bool(allow_borrow),
        ],
    }
}

fn register_profile(i: &ProfileIntent) -> CallDescriptor {
    CallDescriptor {
        function: entry(LENDING_ADDRESS, "controller", "register_user"),
        type_args: vec![],
        args: vec![EntryArg::Utf8(i.profile.clone())],
    }
}

fn curve_type() -> String {
    entry(SWAP_ADDRESS, "curves", "Uncorrelated")
}

fn swap(i: &SwapIntent) -> CallDescriptor {
    let min_out = min_out_after_slippage(i.amount_in, i.slippage_bps);
    CallDescriptor {
        function: entry(SWAP_ADDRESS, "scripts_v2", "swap"),
        type_args: vec![i.coin_in.clone(), i.coin_out.clone(), curve_type()],
        args: vec![EntryArg::U64(i.amount_in), EntryArg::U64(min_out)],
    }
}

fn add_liquidity(i: &AddLiquidityIntent) -> CallDescriptor {
    let min_a = min_out_after_slippage(i.amount_a, i.slippage_bps);
    let min_b = min_out_after_slippage(i.amount_b, i.slippage_bps);
    CallDescriptor {
        function: entry(SWAP_ADDRESS, "scripts_v2", "add_liquidity"),
        type_args: vec![i.coin_a.clone(), i.coin_b.clone(), curve_type()],
        args: vec![
            EntryArg::U64(i.amount_a),
            EntryArg::U64(min_a),
            EntryArg::U64(i.amount_b),
            EntryArg::U64(min_b),
        ],
    }
}

fn remove_liquidity(i: &RemoveLiquidityIntent) -> CallDescriptor {
    // No reference quote is available to a pure adapter, so minimum-out
    // values are zero and the burn amount bounds the position.
    CallDescriptor {
        function: entry(SWAP_ADDRESS, "scripts_v2", "remove_liquidity"),
        type_args: vec![i.coin_a.clone(), i.coin_b.clone(), curve_type()],
        args: vec![
            EntryArg::U64(i.lp_amount),
            EntryArg::U64(0),
            EntryArg::U64(0),
        ],
    }
}

fn stake_router(i: &StakeIntent, name: &str) -> CallDescriptor {
    CallDescriptor {
        function: entry(STAKING_ADDRESS, "stake_router", name),
        type_args: vec![],
        args: vec![EntryArg::U64(i.amount)],
    }
}

/// Human-readable one-line summary of an intent, used verbatim in the
/// pending callback and as the body of the success callback.
pub fn describe(intent: &ValidatedIntent) -> String {
    match intent {
        ValidatedIntent::Lend(i) => format!(
            "Supplying {} {} to lending profile \"{}\"",
            i.amount,
            symbol_for(&i.coin_type),
            i.profile
        ),
        ValidatedIntent::Borrow(i) => format!(
            "Borrowing {} {} against profile \"{}\"",
            i.amount,
            symbol_for(&i.coin_type),
            i.profile
        ),
        ValidatedIntent::Repay(i) => format!(
            "Repaying {} {} on profile \"{}\"",
            i.amount,
            symbol_for(&i.coin_type),
            i.profile
        ),
        ValidatedIntent::Withdraw(i) => format!(
            "Withdrawing {} {} from profile \"{}\"",
            i.amount,
            symbol_for(&i.coin_type),
            i.profile
        ),
        ValidatedIntent::Swap(i) => format!(
            "Swapping {} {} for {} (max slippage {} bps)",
            i.amount_in,
            symbol_for(&i.coin_in),
            symbol_for(&i.coin_out),
            i.slippage_bps
        ),
        ValidatedIntent::AddLiquidity(i) => format!(
            "Adding liquidity: {} {} + {} {}",
            i.amount_a,
            symbol_for(&i.coin_a),
            i.amount_b,
            symbol_for(&i.coin_b)
        ),
        ValidatedIntent::RemoveLiquidity(i) => format!(
            "Removing {} LP from the {}/{} pool",
            i.lp_amount,
            symbol_for(&i.coin_a),
            symbol_for(&i.coin_b)
        ),
        ValidatedIntent::Stake(i) => format!("Staking {} APT", i.amount),
        ValidatedIntent::Unstake(i) => format!("Unstaking {} APT", i.amount),
        ValidatedIntent::CreateProfile(i) => {
            format!("Creating lending profile \"{}\"", i.profile)
        }
    }
}
