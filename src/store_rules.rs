//! Checks and conversions for stores that report prices only as localized
//! text and sell one unit per purchase (the Microsoft Store).

#![cfg_attr(not(target_os = "windows"), allow(dead_code))]

use crate::Error;

/// Reads the number out of a localized price such as `"$1,234.50"`,
/// `"1.234,56 €"` or `"¥1,234"`.
///
/// The last `,` or `.` is the decimal separator, unless it is followed by
/// exactly three digits and no other separator kind is present: then it groups
/// thousands. Spaces, apostrophes and currency marks are dropped.
pub(crate) fn parse_localized_price(text: &str) -> crate::Result<f64> {
    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    if !kept.chars().any(|c| c.is_ascii_digit()) {
        return Err(Error::platform(format!("unparseable price: {text:?}")));
    }

    let digits_only = |s: &str| s.chars().filter(char::is_ascii_digit).collect::<String>();
    let normalized = match kept.rfind(|c: char| c == ',' || c == '.') {
        None => kept,
        Some(index) => {
            let separator = &kept[index..index + 1];
            let other = if separator == "," { '.' } else { ',' };
            let (whole, fraction) = (&kept[..index], &kept[index + 1..]);
            let grouping = fraction.len() == 3 && !kept.contains(other);
            if grouping {
                digits_only(&kept)
            } else {
                format!("{}.{}", digits_only(whole), digits_only(fraction))
            }
        }
    };

    normalized
        .parse::<f64>()
        .map_err(|e| Error::platform(format!("unparseable price {text:?}: {e}")))
}

/// The Microsoft Store purchase call has no quantity, it always buys one unit.
pub(crate) fn ensure_single_unit(quantity: u32) -> crate::Result<()> {
    if quantity != 1 {
        return Err(Error::platform(format!(
            "The Microsoft Store sells one unit per purchase, got quantity {quantity}"
        )));
    }
    Ok(())
}
