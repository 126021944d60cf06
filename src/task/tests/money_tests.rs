//! Unit tests for wei/ether conversion and fee arithmetic.

use crate::task::domain::{PLATFORM_FEE_PERCENT, TaskDomainError, WEI_PER_ETHER, WeiAmount};
use rstest::rstest;

#[rstest]
#[case("0.001")]
#[case("1")]
#[case("100")]
fn ether_string_round_trips(#[case] input: &str) -> eyre::Result<()> {
    let amount = WeiAmount::from_ether(input)?;
    assert_eq!(amount.to_ether_string(), input);
    Ok(())
}

#[rstest]
#[case("0.05", 50_000_000_000_000_000)]
#[case("1", WEI_PER_ETHER)]
#[case("0.000000000000000001", 1)]
#[case("2.5", 2_500_000_000_000_000_000)]
fn ether_parsing_scales_by_ten_to_the_eighteenth(
    #[case] input: &str,
    #[case] expected_wei: u128,
) -> eyre::Result<()> {
    assert_eq!(WeiAmount::from_ether(input)?.as_wei(), expected_wei);
    Ok(())
}

#[rstest]
#[case("")]
#[case(".")]
#[case("1.2.3")]
#[case("abc")]
#[case("-1")]
#[case("1,5")]
// 19 fractional digits would require sub-wei precision.
#[case("0.0000000000000000001")]
fn malformed_ether_strings_are_rejected(#[case] input: &str) {
    assert!(matches!(
        WeiAmount::from_ether(input),
        Err(TaskDomainError::InvalidEtherAmount(_) | TaskDomainError::AmountOverflow)
    ));
}

#[rstest]
fn platform_fee_is_three_percent() -> eyre::Result<()> {
    let value = WeiAmount::from_ether("0.1")?;
    let fee = value.platform_fee(PLATFORM_FEE_PERCENT)?;
    let deposit = value.deposit_with_fee(PLATFORM_FEE_PERCENT)?;

    assert_eq!(fee.to_ether_string(), "0.003");
    assert_eq!(deposit.to_ether_string(), "0.103");
    Ok(())
}

#[rstest]
fn deposit_for_create_scenario_matches_expected_total() -> eyre::Result<()> {
    let value = WeiAmount::from_ether("0.05")?;
    let deposit = value.deposit_with_fee(PLATFORM_FEE_PERCENT)?;
    assert_eq!(deposit.to_ether_string(), "0.0515");
    Ok(())
}

#[rstest]
fn checked_arithmetic_guards_overflow() {
    let max = WeiAmount::from_wei(u128::MAX);
    assert!(max.checked_add(WeiAmount::from_wei(1)).is_none());
    assert!(max.deposit_with_fee(PLATFORM_FEE_PERCENT).is_err());
    assert_eq!(
        WeiAmount::ZERO.checked_sub(WeiAmount::from_wei(1)),
        None
    );
}

#[rstest]
fn display_formats_as_ether() -> eyre::Result<()> {
    let amount = WeiAmount::from_ether("0.103")?;
    assert_eq!(amount.to_string(), "0.103 ETH");
    Ok(())
}

#[rstest]
fn zero_fee_on_zero_value() -> eyre::Result<()> {
    assert_eq!(
        WeiAmount::ZERO.platform_fee(PLATFORM_FEE_PERCENT)?,
        WeiAmount::ZERO
    );
    Ok(())
}
