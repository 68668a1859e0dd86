use std::error::Error;
use std::io::Write;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::{status_label, EscrowStatus, EscrowStore, EscrowTransaction, NewEscrow};

pub const USAGE: &str = "Usage: gametrust-escrow <command>

Commands:
  show
  create <buyer_id> <seller_id> <account_id> <listing_title> <amount>
  status <in_escrow|released|disputed|refunded> [reason]
  confirm
  dispute [reason]
  refund
  clear
  label <status>";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Show,
    Create(NewEscrow),
    Status {
        status: String,
        reason: Option<String>,
    },
    Confirm,
    Dispute {
        reason: Option<String>,
    },
    Refund,
    Clear,
    Label(String),
}

impl Command {
    /// Parses command-line arguments (without the program name).
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Self, Box<dyn Error>> {
        let args: Vec<&str> = args.iter().map(|arg| arg.as_ref()).collect();
        let command = match args.as_slice() {
            ["show"] => Command::Show,
            ["create", buyer, seller, account, title, amount] => {
                let amount = Decimal::from_str(amount)
                    .map_err(|_| format!("Invalid amount '{}'", amount))?;
                Command::Create(NewEscrow::new(*buyer, *seller, *account, *title, amount))
            }
            ["status", status] => Command::Status {
                status: status.to_string(),
                reason: None,
            },
            ["status", status, reason] => Command::Status {
                status: status.to_string(),
                reason: Some(reason.to_string()),
            },
            ["confirm"] => Command::Confirm,
            ["dispute"] => Command::Dispute { reason: None },
            ["dispute", reason] => Command::Dispute {
                reason: Some(reason.to_string()),
            },
            ["refund"] => Command::Refund,
            ["clear"] => Command::Clear,
            ["label", status] => Command::Label(status.to_string()),
            _ => return Err(USAGE.into()),
        };
        Ok(command)
    }
}

/// Loads the escrow from the store's storage, runs `command` against it and
/// writes the result to the provided writer.
///
/// # Errors
/// Returns an error if:
/// * The store rejects the operation (invalid input, no active escrow, ...)
/// * The storage medium fails
/// * Writing to the output fails
pub fn run<W>(store: &EscrowStore, command: Command, mut writer: W) -> Result<(), Box<dyn Error>>
where
    W: Write,
{
    // A discarded or unreadable record is reported by `show`; every other
    // command fails on its own if there is nothing to act on.
    let loaded = store.load();

    match command {
        Command::Show => {
            if let Err(err) = &loaded {
                writeln!(writer, "Warning: {}", err)?;
            }
            match store.escrow() {
                Some(escrow) => write_escrow(&mut writer, &escrow)?,
                None => writeln!(writer, "No active escrow")?,
            }
        }
        Command::Create(input) => write_escrow(&mut writer, &store.create(input)?)?,
        Command::Status { status, reason } => {
            write_escrow(&mut writer, &store.update_status(&status, reason.as_deref())?)?
        }
        Command::Confirm => write_escrow(&mut writer, &store.confirm_delivery()?)?,
        Command::Dispute { reason } => write_escrow(
            &mut writer,
            &store.transition(EscrowStatus::Disputed, reason.as_deref())?,
        )?,
        Command::Refund => write_escrow(&mut writer, &store.refund()?)?,
        Command::Clear => {
            store.clear()?;
            writeln!(writer, "Escrow cleared")?;
        }
        Command::Label(status) => writeln!(writer, "{}", status_label(Some(&status)))?,
    }
    writer.flush()?;
    Ok(())
}

fn write_escrow<W: Write>(writer: &mut W, escrow: &EscrowTransaction) -> Result<(), Box<dyn Error>> {
    writeln!(writer, "{}", serde_json::to_string_pretty(escrow)?)?;
    Ok(())
}
