use rust_decimal::Decimal;

pub fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Like `format_duration`, but keeps fractional seconds (invocation run times)
pub fn format_seconds(secs: Decimal) -> String {
    if secs.fract().is_zero() && !secs.is_sign_negative() {
        if let Ok(whole) = u64::try_from(secs) {
            return format_duration(whole);
        }
    }
    if secs < Decimal::ONE {
        format!("{}ms", (secs * Decimal::ONE_THOUSAND).normalize())
    } else {
        format!("{}s", secs.normalize())
    }
}

/// USD amount with 8 decimal places, enough for per-request prices
pub fn format_usd(amount: Decimal) -> String {
    format!("${:.8}", amount.round_dp(8))
}
