//! Phone number normalization.
//!
//! Turns whatever the user typed or pasted into the digit string a
//! click-to-chat link expects. Rules are applied in priority order and the
//! first one that matches wins:
//!
//! 1. keep digits, plus a `+` only when it is the first kept character
//! 2. nothing left ⇒ rejected
//! 3. `05…` (domestic mobile) ⇒ `9725…`, even when a country code was chosen
//! 4. `+…` ⇒ already international, drop the `+`
//! 5. `00…` ⇒ international dialing prefix, drop it
//! 6. explicit country code ⇒ drop one trunk `0`, prepend the code
//! 7. otherwise ⇒ digits as typed

use crate::domain::NormalizedNumber;

/// Calling code assumed for numbers dialed as `05…`.
pub const DOMESTIC_MOBILE_COUNTRY_CODE: &str = "972";

const DOMESTIC_MOBILE_PREFIX: &str = "05";
const INTERNATIONAL_PREFIX: &str = "00";

/// Normalize free text into an international number.
///
/// `country_code` is the user's explicit selection; `None`, an empty string or
/// a code without digits all mean "automatic".
pub fn normalize(raw: &str, country_code: Option<&str>) -> Option<NormalizedNumber> {
    let (plus, digits) = clean(raw);
    if digits.is_empty() {
        return None;
    }

    if digits.starts_with(DOMESTIC_MOBILE_PREFIX) {
        return NormalizedNumber::parse(&format!(
            "{DOMESTIC_MOBILE_COUNTRY_CODE}{}",
            &digits[1..]
        ));
    }

    if plus {
        return NormalizedNumber::parse(&digits);
    }

    if let Some(rest) = digits.strip_prefix(INTERNATIONAL_PREFIX) {
        return NormalizedNumber::parse(rest);
    }

    if let Some(code) = country_code.map(country_code_digits).filter(|c| !c.is_empty()) {
        let local = digits.strip_prefix('0').unwrap_or(&digits);
        return NormalizedNumber::parse(&format!("{code}{local}"));
    }

    NormalizedNumber::parse(&digits)
}

/// Split input into (leading plus present, digits).
fn clean(raw: &str) -> (bool, String) {
    let mut plus = false;
    let mut digits = String::with_capacity(raw.len());
    let mut first = true;
    for ch in raw.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            first = false;
        } else if ch == '+' {
            // Only the first kept character can be the international marker.
            if first {
                plus = true;
            }
            first = false;
        }
    }
    (plus, digits)
}

/// Digits of a country code selection (`"+44"` ⇒ `"44"`).
pub fn country_code_digits(code: &str) -> String {
    code.chars().filter(|c| c.is_ascii_digit()).collect()
}
