#[macro_use]
extern crate log;

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pico_totp::{base32, rfc6238};

#[derive(Debug, Subcommand)]
enum Commands {
  /// Print the current code and how long it stays valid
  Code {
    #[arg(long)]
    json: bool,
  },
  /// Show the previous, current and next codes
  Window,
  /// Check a code, accepting one step of clock drift
  #[command(arg_required_else_help = true)]
  Verify {
    code: String,
  },
  /// Print a fresh code every time the step rolls over
  Watch {
    #[arg(long, help = "stop after this many codes")]
    count: Option<u32>,
  },
  /// Base32-encode a secret for provisioning
  #[command(arg_required_else_help = true)]
  Encode {
    text: String,
  },
}

#[derive(Debug, Parser)]
struct Cli {
  #[arg(long, help = "base32 secret, falls back to $totp_secret")]
  secret: Option<String>,
  #[arg(long, default_value_t = 30)]
  step: u32,
  #[arg(long, default_value_t = 6)]
  digits: u8,
  #[arg(long, help = "unix time to start from instead of the system clock")]
  time: Option<u64>,
  #[command(subcommand)]
  command: Commands,
}

/// Wall clock seeded from `--time`, advancing in real time.
struct Clock {
  base: u64,
  started: Instant,
}

impl Clock {
  fn new(base: Option<u64>) -> Self {
    Self {
      base: base.unwrap_or_else(rfc6238::unix_time),
      started: Instant::now(),
    }
  }

  fn now(&self) -> u64 {
    self.base.saturating_add(self.started.elapsed().as_secs())
  }
}

fn secret(arg: Option<String>) -> Result<String> {
  match arg {
    Some(secret) => Ok(secret),
    None => std::env::var("totp_secret").context("no --secret given and totp_secret is not set"),
  }
}

#[derive(Debug, serde::Serialize)]
struct CodeView {
  code: String,
  counter: u64,
  time_remaining: u32,
}

#[derive(Debug, tabled::Tabled)]
struct WindowRow {
  step: &'static str,
  counter: u64,
  starts_at: u64,
  code: String,
}

fn window(time: u64, secret: &str, step: u32, digits: u8) -> Result<Vec<WindowRow>> {
  let counter = rfc6238::counter(time, step)?;
  let mut rows = Vec::new();
  for (label, c) in [("previous", counter.checked_sub(1)), ("current", Some(counter)), ("next", counter.checked_add(1))] {
    let Some(c) = c else { continue };
    let Some(starts_at) = c.checked_mul(step as u64) else { continue };
    let (otp, _) = rfc6238::generate(starts_at, secret, step, digits)?;
    rows.push(WindowRow { step: label, counter: c, starts_at, code: otp.to_string() });
  }
  Ok(rows)
}

async fn watch(clock: &Clock, secret: &str, step: u32, digits: u8, count: Option<u32>) -> Result<()> {
  let mut interval = tokio::time::interval(Duration::from_secs(1));
  let mut last = None;
  let mut printed = 0;
  loop {
    interval.tick().await;
    let now = clock.now();
    let counter = rfc6238::counter(now, step)?;
    if last == Some(counter) {
      continue;
    }
    let (otp, remaining) = rfc6238::generate(now, secret, step, digits)?;
    println!("TOTP: {}, valid for {} seconds", otp, remaining);
    last = Some(counter);
    printed += 1;
    if count.is_some_and(|n| printed >= n) {
      return Ok(());
    }
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  dotenvy::dotenv().ok();
  let _logger = flexi_logger::Logger::try_with_env_or_str("info")?.start()?;
  let args = Cli::parse();
  info!("{:?} step={} digits={}", args.command, args.step, args.digits);
  let clock = Clock::new(args.time);

  match args.command {
    Commands::Encode { text } => {
      println!("{}", base32::encode(text.as_bytes()));
    }
    Commands::Code { json } => {
      let secret = secret(args.secret)?;
      let now = clock.now();
      let (otp, remaining) = rfc6238::generate(now, &secret, args.step, args.digits)?;
      if json {
        let view = CodeView {
          code: otp.to_string(),
          counter: rfc6238::counter(now, args.step)?,
          time_remaining: remaining,
        };
        println!("{}", serde_json::to_string(&view)?);
      } else {
        println!("TOTP: {}, valid for {} seconds", otp, remaining);
      }
    }
    Commands::Window => {
      let secret = secret(args.secret)?;
      let rows = window(clock.now(), &secret, args.step, args.digits)?;
      println!("{}", tabled::Table::new(&rows));
    }
    Commands::Verify { code } => {
      let secret = secret(args.secret)?;
      if rfc6238::verify(clock.now(), &secret, args.step, args.digits, code.trim())? {
        println!("valid");
      } else {
        anyhow::bail!("code {} rejected", code);
      }
    }
    Commands::Watch { count } => {
      let secret = secret(args.secret)?;
      watch(&clock, &secret, args.step, args.digits, count).await?;
    }
  }
  Ok(())
}

#[cfg(test)]
mod test {
  use super::*;

  const RFC_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

  #[test]
  fn test_window() {
    let rows = window(59, RFC_SECRET, 30, 6).unwrap();
    let codes = rows.iter().map(|r| (r.step, r.counter, r.code.as_str())).collect::<Vec<_>>();
    assert_eq!(codes, vec![("previous", 0, "755224"), ("current", 1, "287082"), ("next", 2, "359152")]);
  }

  #[test]
  fn test_window_at_epoch() {
    let rows = window(0, RFC_SECRET, 30, 6).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].step, "current");
  }

  #[test]
  fn test_clock_seeded() {
    let clock = Clock::new(Some(1111111109));
    assert!(clock.now() >= 1111111109);
  }

  #[test]
  fn test_cli_parse() {
    let args = Cli::parse_from(["pico_totp", "--secret", RFC_SECRET, "--digits", "8", "code", "--json"]);
    assert_eq!(args.step, 30);
    assert_eq!(args.digits, 8);
    assert!(matches!(args.command, Commands::Code { json: true }));
  }

  #[tokio::test]
  async fn test_watch_bounded() {
    let clock = Clock::new(Some(59));
    watch(&clock, RFC_SECRET, 30, 6, Some(1)).await.unwrap();
  }
}
