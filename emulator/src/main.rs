mod board;
mod net;
mod options;

use std::env;
use std::process;

use crossterm::style::Stylize;
use embassy_futures::block_on;
use mission_core::link::LinkOutcome;
use mission_core::mission::{MissionReport, MissionSequencer};

use board::HostBoard;
use options::{Options, USAGE};

fn main() {
    let options = Options::parse(env::args().skip(1)).unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });
    if options.help {
        println!("{USAGE}");
        return;
    }

    println!(
        "Mission emulator: profile {}, {} clock, {} link, log {}",
        options.profile.tag(),
        if options.realtime { "real-time" } else { "simulated" },
        if options.network { "socket" } else { "simulated" },
        options.log_path.display()
    );

    let parts = board::assemble(&options);
    let mut sequencer = match block_on(MissionSequencer::boot(options.config, parts)) {
        Ok(sequencer) => sequencer,
        Err(failure) => {
            eprintln!("{} {}", "halted".red().bold(), failure.fault());
            process::exit(1);
        }
    };

    let report = block_on(sequencer.execute());
    print_report(&report, &sequencer);
}

fn print_report(report: &MissionReport, sequencer: &MissionSequencer<HostBoard>) {
    println!();
    println!("{}", "Mission report".bold());
    println!("  final phase        {}", report.final_phase);
    if let Some(at) = report.triggered_at {
        println!("  triggered at       {}", at.since_boot());
    }
    println!("  wake               {}", outcome(report.wake));
    println!("  start recording    {}", outcome(report.start_recording));
    println!("  stop recording     {}", outcome(report.stop_recording));
    println!(
        "  samples            {} descent, {} recording, {} invalid",
        report.descent_samples, report.recording_samples, report.invalid_samples
    );
    println!("  thermal faults     {}", report.thermal_faults);
    println!(
        "  releases           {} fired, {} suppressed",
        report.releases_fired, report.releases_suppressed
    );
    if report.log_entries_dropped > 0 {
        println!(
            "  {}",
            format!("{} log entries lost", report.log_entries_dropped).yellow()
        );
    }

    let lamp = sequencer.lights().output();
    println!(
        "  lamp               peak {}, now {}",
        lamp.levels().iter().max().copied().unwrap_or(0),
        lamp.level()
    );
    println!(
        "  burnwire           {} activation(s)",
        sequencer.release().output().activations()
    );
    if let Some(link) = sequencer.remote().link().simulated() {
        println!(
            "  camera             {} wake packet(s), {} request(s)",
            link.wake_packets().len(),
            link.requests().count()
        );
    }
    println!("  panel              {}", sequencer.context().indicators.render());
    println!(
        "  log file           {}",
        sequencer.context().log.sink().path().display()
    );
}

fn outcome(outcome: Option<LinkOutcome>) -> String {
    match outcome {
        Some(LinkOutcome::Sent) => "sent".green().to_string(),
        Some(LinkOutcome::Unreachable) => "unreachable".red().to_string(),
        None => "skipped".dark_grey().to_string(),
    }
}
