use std::io::{self, BufRead};
use std::thread;

use crossbeam_channel::{bounded, select, Receiver};
use gelfprims_client::Message;
use tracing::{info, warn};

use crate::cmd::{check_message, PipeArgs};
use crate::exit::{client_error, io_error, CliError, CliResult, FAILURE, INTERNAL, SUCCESS};
use crate::output::{print_report, DeliveryReport, OutputFormat};

enum Input {
    Line(io::Result<String>),
    Eof,
    Interrupted,
}

pub fn run(args: PipeArgs, format: OutputFormat) -> CliResult<i32> {
    // Every line shares the same fields, so a bad field fails up front
    // instead of once per line.
    check_message(&args.client.decorate(Message::new("-")))?;

    let mut client = args.client.connect()?;
    let lines = spawn_stdin_reader()?;
    let interrupted = install_ctrlc_handler()?;

    let mut queued = 0u64;
    loop {
        let input = select! {
            recv(lines) -> line => line.map_or(Input::Eof, Input::Line),
            recv(interrupted) -> _ => Input::Interrupted,
        };

        match input {
            Input::Line(Ok(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                client
                    .queue_msg(args.client.decorate(Message::new(line)))
                    .map_err(|err| client_error("queue failed", err))?;
                queued += 1;
            }
            Input::Line(Err(err)) => {
                warn!(error = %err, "stdin read failed, draining queued messages");
                client
                    .close()
                    .map_err(|err| client_error("close failed", err))?;
                return Err(io_error("reading stdin failed", err));
            }
            Input::Eof => break,
            Input::Interrupted => {
                info!(queued, "interrupted, draining queued messages");
                break;
            }
        }
    }

    client
        .close()
        .map_err(|err| client_error("close failed", err))?;

    let stats = client.stats();
    let report = DeliveryReport::new(
        &args.client.uri,
        client.config().compression,
        client.config().frame_size,
        queued,
        stats,
    );
    print_report(&report, format);

    Ok(if stats.dropped > 0 { FAILURE } else { SUCCESS })
}

fn spawn_stdin_reader() -> CliResult<Receiver<io::Result<String>>> {
    let (tx, rx) = bounded(64);
    thread::Builder::new()
        .name("gelfprims-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .map_err(|err| io_error("failed to start stdin reader", err))?;
    Ok(rx)
}

fn install_ctrlc_handler() -> CliResult<Receiver<()>> {
    let (tx, rx) = bounded(1);
    ctrlc::set_handler(move || {
        let _ = tx.try_send(());
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))?;
    Ok(rx)
}
