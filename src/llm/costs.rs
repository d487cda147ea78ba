//! Per-token pricing for known models.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// (input, output) USD cost per token for a model, matched by prefix.
///
/// Unknown models are priced at zero so cost logging never blocks a call.
pub fn model_cost(model: &str) -> (Decimal, Decimal) {
    const PRICES: &[(&str, Decimal, Decimal)] = &[
        ("gemini-1.5-flash", dec!(0.000000075), dec!(0.0000003)),
        ("gemini-1.5-pro", dec!(0.00000125), dec!(0.000005)),
        ("gemini-pro", dec!(0.0000005), dec!(0.0000015)),
        ("claude-3-5-haiku", dec!(0.0000008), dec!(0.000004)),
        ("claude-sonnet", dec!(0.000003), dec!(0.000015)),
        ("claude-3-5-sonnet", dec!(0.000003), dec!(0.000015)),
        ("gpt-4o-mini", dec!(0.00000015), dec!(0.0000006)),
        ("gpt-4o", dec!(0.0000025), dec!(0.00001)),
    ];

    PRICES
        .iter()
        .find(|(prefix, _, _)| model.starts_with(prefix))
        .map(|(_, input, output)| (*input, *output))
        .unwrap_or((Decimal::ZERO, Decimal::ZERO))
}
