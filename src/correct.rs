//! State-code correction for the best candidate text, run before the
//! normalization cascade.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::tables::PlateTables;

lazy_static! {
    static ref MF_PLATE: Regex = Regex::new(r"MF[0-9]{1,2}[A-Z]{1,3}[0-9]{1,4}").unwrap();
    static ref O_IN_DIGITS: Regex =
        Regex::new(r"^([A-Z]{2})([O0-9]{1,2})([A-Z]{1,4})([O0-9]{1,4})$").unwrap();
}

/// Apply the prefix confusion table, the MF safety net, and the O→0 fix for
/// district and number positions.
pub fn correct_state_code(text: &str, tables: &PlateTables) -> String {
    if text.len() < 2 || !text.is_char_boundary(2) {
        return text.to_string();
    }

    let mut out = text.to_string();

    if let Some(sub) = tables
        .prefix_confusions()
        .iter()
        .find(|s| out.starts_with(s.from.as_str()))
    {
        out = format!("{}{}", sub.to, &out[2..]);
        debug!(from = %sub.from, to = %sub.to, text = %out, "state_prefix_fixed");
    }

    // Overlaps the table entry on purpose; custom tables may omit MF.
    if out.starts_with("MF") && MF_PLATE.is_match(&out) {
        out = format!("MH{}", &out[2..]);
        debug!(text = %out, "mf_prefix_fixed");
    }

    if out.contains('O') {
        if let Some(caps) = O_IN_DIGITS.captures(&out) {
            let fixed = format!(
                "{}{}{}{}",
                &caps[1],
                caps[2].replace('O', "0"),
                &caps[3],
                caps[4].replace('O', "0")
            );
            if fixed != out {
                debug!(before = %out, after = %fixed, "digit_o_fixed");
                out = fixed;
            }
        }
    }

    out
}
