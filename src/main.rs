use std::time::Duration;

use env_logger::Env;
use log::{error, info, LevelFilter};
use structopt::StructOpt;

mod backoff;
mod clock;
mod display;
mod elapsed;
mod error;
mod event;
mod format;
mod ntp;
mod time_source;

use crate::backoff::Backoff;
use crate::clock::Clock;
use crate::display::{ConsoleDisplay, Display, Layout};
use crate::event::ReferenceEvent;
use crate::ntp::SntpClock;
use crate::time_source::{HostClock, TimeSource};

#[derive(Debug, StructOpt)]
#[structopt(name = "countup", about = "A count-up clock since a fixed event")]
struct Config {
    /// Reference event in local time, "YYYY-MM-DD HH:MM" [default: 2013-01-13 18:55]
    #[structopt(short = "e", long = "event")]
    event: Option<ReferenceEvent>,
    /// Also show running totals of days, minutes and seconds
    #[structopt(long = "totals")]
    totals: bool,
    /// SNTP server to sync against, as host:port; uses the host clock if unset
    #[structopt(long = "ntp")]
    ntp: Option<String>,
    /// Seconds to wait for an SNTP reply
    #[structopt(long = "ntp-timeout", default_value = "5")]
    ntp_timeout: u64,
    /// Shortest retry delay after a failed sync, in milliseconds
    #[structopt(long = "backoff-min", default_value = "500")]
    backoff_min: u64,
    /// Longest retry delay after a failed sync, in milliseconds
    #[structopt(long = "backoff-max", default_value = "60000")]
    backoff_max: u64,
    /// Verbose level (repeat for more verbosity)
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    verbose: u8,
    /// Disable logging
    #[structopt(short = "q", long = "quiet")]
    quiet: bool,
    /// Prepend timestamps to log lines
    #[structopt(short = "t", long = "timestamps")]
    timestamps: bool,
}

fn errx<M: AsRef<str>>(code: i32, message: M) -> ! {
    error!("{}", message.as_ref());
    std::process::exit(code);
}

async fn run<S: TimeSource, D: Display>(clock: Clock<S, D>) {
    #[cfg(unix)]
    let mut term = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(term) => term,
        Err(err) => errx(exitcode::OSERR, format!("signal(), error: {}", err)),
    };

    #[cfg(unix)]
    let terminated = term.recv();
    #[cfg(not(unix))]
    let terminated = std::future::pending::<Option<()>>();

    tokio::select! {
        _ = clock.run() => {}
        _ = tokio::signal::ctrl_c() => info!("shutdown, signal: interrupt"),
        _ = terminated => info!("shutdown, signal: terminate"),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let opt = Config::from_args();

    let log_level = if opt.quiet {
        LevelFilter::Off
    } else {
        match opt.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_env(Env::default())
        .format_timestamp(if opt.timestamps {
            Some(env_logger::fmt::TimestampPrecision::Millis)
        } else {
            None
        })
        .init();

    if opt.backoff_min == 0 || opt.backoff_min > opt.backoff_max {
        errx(
            exitcode::USAGE,
            "backoff-min must be non-zero and no larger than backoff-max",
        );
    }

    let layout = if opt.totals {
        Layout::Extended
    } else {
        Layout::Basic
    };
    let backoff = Backoff::new(
        Duration::from_millis(opt.backoff_min),
        Duration::from_millis(opt.backoff_max),
    );
    let display = ConsoleDisplay::new(std::io::stdout());
    let event = opt.event.unwrap_or_default();

    info!(
        "start, event: {}, layout: {:?}, time source: {}",
        event,
        layout,
        opt.ntp.as_deref().unwrap_or("host clock")
    );

    match opt.ntp {
        Some(server) => {
            let source = SntpClock::new(server, Duration::from_secs(opt.ntp_timeout));
            run(Clock::new(source, display, event, layout, backoff)).await
        }
        None => run(Clock::new(HostClock, display, event, layout, backoff)).await,
    }

    std::process::exit(exitcode::OK);
}
