use anyhow::Context;
use log::{info, warn};
use scancore::drive::{DriveController, OperatorEvent};
use scancore::scheduler::ShutdownSignal;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

pub const OPERATOR_HELP: &str = "operator: w/a/s/d drive, x stop, r release, q quit";

/// Reads one operator event per line and forwards it to the motors.
///
/// `q`/`quit` requests shutdown of the whole run. Unknown input is reported
/// and skipped. Returns the number of events forwarded.
pub async fn run_operator<R>(
    input: R,
    mut drive: DriveController,
    shutdown: ShutdownSignal,
) -> anyhow::Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut handled = 0;

    while let Some(line) = lines.next_line().await.context("reading operator input")? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("q") || trimmed.eq_ignore_ascii_case("quit") {
            info!("operator requested shutdown");
            shutdown.trigger();
            break;
        }
        match trimmed.parse::<OperatorEvent>() {
            Ok(event) => {
                let command = drive
                    .handle(event)
                    .with_context(|| format!("forwarding {event:?} to the motors"))?;
                info!("operator {:?} -> {:?}", event, command);
                handled += 1;
            }
            Err(err) => warn!("{err}; {OPERATOR_HELP}"),
        }
        if shutdown.is_triggered() {
            break;
        }
    }
    Ok(handled)
}
