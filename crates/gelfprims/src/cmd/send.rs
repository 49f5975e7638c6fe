use gelfprims_client::Message;
use tracing::debug;

use crate::cmd::{check_message, SendArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_report, DeliveryReport, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let mut message = Message::new(args.message);
    if let Some(full) = args.full {
        message = message.with_full_message(full);
    }
    let message = args.client.decorate(message);
    check_message(&message)?;

    let mut client = args.client.connect()?;
    let drops = client.drops();

    client
        .queue_msg(message)
        .map_err(|err| client_error("queue failed", err))?;
    client
        .close()
        .map_err(|err| client_error("close failed", err))?;
    debug!(stats = ?client.stats(), "send finished");

    let report = DeliveryReport::new(
        &args.client.uri,
        client.config().compression,
        client.config().frame_size,
        1,
        client.stats(),
    );
    print_report(&report, format);

    match drops.try_recv() {
        Ok(event) => Err(client_error("message dropped", event.error)),
        Err(_) => Ok(SUCCESS),
    }
}
