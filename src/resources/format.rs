//! Number and text helpers shared by the renderers.

pub const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// Reference SOL price used for USD estimates in the stake overview.
pub const REFERENCE_SOL_PRICE_USD: f64 = 176.53;

/// Lamports as SOL with a K/M suffix, two decimals.
pub fn format_lamports(lamports: f64) -> String {
  scaled(lamports / LAMPORTS_PER_SOL, 2, &[(1e6, "M"), (1e3, "K")])
}

/// Lamports as a SOL amount with unit, used for validator stake.
pub fn format_stake(lamports: f64) -> String {
  let sol = lamports / LAMPORTS_PER_SOL;
  if sol >= 1e6 {
    format!("{:.2}M SOL", sol / 1e6)
  } else if sol >= 1e3 {
    format!("{:.2}K SOL", sol / 1e3)
  } else {
    format!("{:.2} SOL", sol)
  }
}

pub fn lamports_to_usd(lamports: f64) -> f64 {
  lamports / LAMPORTS_PER_SOL * REFERENCE_SOL_PRICE_USD
}

/// Dollar amounts with B/M/K suffix, two decimals.
pub fn format_dollars(amount: f64) -> String {
  scaled(amount, 2, &[(1e9, "B"), (1e6, "M"), (1e3, "K")])
}

/// Large market figures: one decimal when suffixed, two otherwise.
pub fn format_large_number(num: f64) -> String {
  for (threshold, suffix) in [(1e9, "B"), (1e6, "M"), (1e3, "K")] {
    if num >= threshold {
      return format!("{:.1}{}", num / threshold, suffix);
    }
  }
  format!("{:.2}", num)
}

fn scaled(value: f64, decimals: usize, units: &[(f64, &str)]) -> String {
  for (threshold, suffix) in units {
    if value >= *threshold {
      return format!("{:.*}{}", decimals, value / threshold, suffix);
    }
  }
  format!("{:.*}", decimals, value)
}

/// Integer with comma thousands separators.
pub fn group_thousands(n: u64) -> String {
  let digits = n.to_string();
  let mut out = String::with_capacity(digits.len() + digits.len() / 3);
  for (i, c) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      out.push(',');
    }
    out.push(c);
  }
  out
}

/// Whole numbers without a fraction, everything else as is.
pub fn format_number(value: f64) -> String {
  if value.fract() == 0.0 && value.abs() < 1e15 {
    format!("{}", value as i64)
  } else {
    format!("{}", value)
  }
}

/// `#`/`-` bar of `width` cells filled to `percent`.
pub fn bar(percent: f64, width: usize) -> String {
  let filled = ((width as f64 * percent / 100.0).round().max(0.0) as usize).min(width);
  format!("{}{}", "#".repeat(filled), "-".repeat(width - filled))
}

/// Seconds as `{h}h {m}m`.
pub fn format_hours_minutes(seconds: f64) -> String {
  let total = seconds.max(0.0) as u64;
  format!("{}h {}m", total / 3600, (total % 3600) / 60)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_format_lamports() {
    assert_eq!(format_lamports(2.5e18), "2500.00M");
    assert_eq!(format_lamports(1.234e12), "1.23K");
    assert_eq!(format_lamports(5e8), "0.50");
  }

  #[test]
  fn test_format_stake() {
    assert_eq!(format_stake(1.5e16), "15.00M SOL");
    assert_eq!(format_stake(2.5e12), "2.50K SOL");
    assert_eq!(format_stake(1e9), "1.00 SOL");
  }

  #[test]
  fn test_format_dollars() {
    assert_eq!(format_dollars(3.2e9), "3.20B");
    assert_eq!(format_dollars(999.0), "999.00");
  }

  #[test]
  fn test_format_large_number() {
    assert_eq!(format_large_number(81_234_567_890.0), "81.2B");
    assert_eq!(format_large_number(2_500_000.0), "2.5M");
    assert_eq!(format_large_number(12.0), "12.00");
  }

  #[test]
  fn test_group_thousands() {
    assert_eq!(group_thousands(0), "0");
    assert_eq!(group_thousands(999), "999");
    assert_eq!(group_thousands(1000), "1,000");
    assert_eq!(group_thousands(1234567), "1,234,567");
  }

  #[test]
  fn test_format_number() {
    assert_eq!(format_number(3000.0), "3000");
    assert_eq!(format_number(412.5), "412.5");
  }

  #[test]
  fn test_bar_is_clamped() {
    assert_eq!(bar(50.0, 10), "#####-----");
    assert_eq!(bar(150.0, 4), "####");
    assert_eq!(bar(-5.0, 4), "----");
  }

  #[test]
  fn test_format_hours_minutes() {
    assert_eq!(format_hours_minutes(4440.0), "1h 14m");
    assert_eq!(format_hours_minutes(-3.0), "0h 0m");
  }
}
