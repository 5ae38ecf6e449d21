//! Command line driver for one proof session over TCP.
//!
//! The verifier listens, the prover connects:
//!
//! ```text
//! zkram V 5000      # terminal 1
//! zkram P 5000      # terminal 2
//! ```

use std::env;
use std::process::ExitCode;
use std::time::Instant;

use zkram::protocols::demo::PartitionDemo;
use zkram::protocols::prover::prove;
use zkram::protocols::verifier::verify;
use zkram::utilities::link::{MeasureLink, NetLink};
use zkram::ProtocolError;

fn usage() -> ExitCode {
    eprintln!("usage: zkram <P|V> <port>");
    ExitCode::from(1)
}

fn run_prover(port: u16) -> Result<ExitCode, ProtocolError> {
    let mut link = NetLink::connect("127.0.0.1", port)?;
    let body = PartitionDemo::reference();

    let start = Instant::now();
    let outcome = prove(&mut link, &body)?;
    let elapsed = start.elapsed().as_secs_f64();

    println!("proof complete in {elapsed:.3} s");
    println!("correlations: {}", outcome.n_ots);
    println!("channel elements: {}", outcome.n_messages);
    println!("zero digest: {}", hex::encode(outcome.zero_digest));
    Ok(ExitCode::SUCCESS)
}

fn run_verifier(port: u16) -> Result<ExitCode, ProtocolError> {
    let mut net = NetLink::listen(port)?;
    let mut link = MeasureLink::new(&mut net);
    let body = PartitionDemo::reference();

    let start = Instant::now();
    let outcome = verify(&mut link, &body)?;
    let elapsed = start.elapsed().as_secs_f64();

    println!("session complete in {elapsed:.3} s");
    println!("correlations: {}", outcome.n_ots);
    println!("channel elements: {}", outcome.n_messages);
    println!("traffic: {} bytes", link.traffic());
    println!("zero digest: {}", hex::encode(outcome.zero_digest));

    if outcome.accepted {
        println!("proof ACCEPTED");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("proof REJECTED");
        Ok(ExitCode::from(3))
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        return usage();
    }
    let Ok(port) = args[2].parse::<u16>() else {
        return usage();
    };

    let result = match args[1].as_str() {
        "P" => run_prover(port),
        "V" => run_verifier(port),
        _ => return usage(),
    };

    match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("session failed: {error}");
            ExitCode::from(2)
        }
    }
}
