use log::error;

use tlconv::errors::*;
use tlconv::*;

use tlconv::args::*;

// Rust doesn't trap a unix signal appropriately occasionally: https://github.com/rust-lang/rust/issues/46016
fn reset_signal_pipe_handler() -> Result<()> {
    #[cfg(target_family = "unix")]
    {
        use nix::sys::signal;

        unsafe {
            signal::signal(signal::Signal::SIGPIPE, signal::SigHandler::SigDfl)
                .chain_err(|| "Internal error: cannot trap signal")?;
        }
    }

    Ok(())
}

fn main() {
    reset_signal_pipe_handler().unwrap();

    if let Err(ref e) = run() {
        let mut s = e.to_string();

        for e in e.iter().skip(1) {
            s.push_str(&format!("\n\tcaused by: {}", e));
        }

        // with `RUST_BACKTRACE=1`.
        if let Some(backtrace) = e.backtrace() {
            s.push_str(&format!("\n\tbacktrace:\n{:?}", backtrace));
        }

        error!("{}", s);

        ::std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let opts = parse_args();

    stderrlog::new()
        .module(module_path!())
        .show_level(false)
        .quiet(opts.quiet)
        .verbosity(opts.verbose + 1) // The user needs warnings
        .timestamp(opts.ts.unwrap_or(stderrlog::Timestamp::Off))
        .init()
        .unwrap();

    let input = opts.input.unwrap();
    let output = opts.output.unwrap();

    println!(
        "Converting {} to {}...",
        input.to_string_lossy(),
        output.to_string_lossy()
    );

    let list = TradesList::open(&input)?;
    let trades = list.positions()?;
    write_csv(&output, &trades)?;

    if trades.is_empty() {
        println!("No trades found to convert");
    } else {
        println!(
            "Successfully converted {} trades to {}",
            trades.len(),
            output.to_string_lossy()
        );
    }
    Ok(())
}
