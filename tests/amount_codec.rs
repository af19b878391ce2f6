// tests/amount_codec.rs
// ===================================
// Text <-> fixed-point amount conversion as typed and displayed on the swap screen

use num_bigint::BigUint;
use pretty_assertions::assert_eq;

use keeper_swap::math::amount::AmountFormatter;

#[test]
fn test_round_trip_across_precisions() {
    let formatter = AmountFormatter::default();
    let values: Vec<BigUint> = [
        "0",
        "1",
        "7",
        "10",
        "999",
        "1000",
        "123456789",
        "100000010000000",
        "18446744073709551615",
        "340282366920938463463374607431768211455",
    ]
    .iter()
    .map(|v| v.parse().unwrap())
    .collect();

    for digits in 0..=16 {
        for value in &values {
            let text = formatter.amount_to_string(value, digits, None);
            let unformatted = formatter.unformat(&text);
            assert_eq!(
                formatter.string_to_amount(&unformatted, digits),
                (value.clone(), digits),
                "value {} at {} digits rendered as {:?}",
                value,
                digits,
                text
            );
        }
    }
}

#[test]
fn test_user_typed_amounts() {
    let formatter = AmountFormatter::default();

    assert_eq!(formatter.string_to_amount("300", 9), (BigUint::from(300_000_000_000u64), 9));
    assert_eq!(formatter.string_to_amount("0.5", 6), (BigUint::from(500_000u64), 6));
    assert_eq!(formatter.string_to_amount("1 000.25", 2), (BigUint::from(100_025u64), 2));
    assert_eq!(formatter.string_to_amount("", 9), (BigUint::from(0u8), 9));
    assert_eq!(formatter.string_to_amount("1.2.3", 9), (BigUint::from(0u8), 9));
}

#[test]
fn test_locale_separators() {
    let formatter = AmountFormatter::new(",", ".");

    let amount = BigUint::from(1_234_567_891u64);
    let text = formatter.amount_to_string(&amount, 3, None);
    assert_eq!(text, "1.234.567,891");
    assert_eq!(formatter.string_to_amount(&formatter.unformat(&text), 3), (amount, 3));
}

#[test]
fn test_display_limits_fraction_digits() {
    let formatter = AmountFormatter::default();
    let fee = BigUint::from(4_683_703u64);

    assert_eq!(formatter.amount_to_string(&fee, 6, Some(4)), "4.6837");
    assert_eq!(formatter.amount_to_string(&fee, 6, Some(0)), "4");
    assert_eq!(formatter.amount_to_string(&BigUint::from(2_500_000_000u64), 9, None), "2.5");
}
